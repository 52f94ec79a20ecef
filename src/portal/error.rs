use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::types::PolicyId;

/// Errors of the portal's HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// A dashboard call the page cannot do without failed.
    #[error("Dashboard error: {0}")]
    Upstream(#[from] crate::error::Error),

    /// The requested policy is not in the catalogue.
    #[error("No API in the catalogue for policy {0}")]
    NotFound(PolicyId),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A page template failed to parse or render.
    #[error("Template error: {0}")]
    Render(#[from] tera::Error),
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()).into_response(),
            Self::Upstream(_) => {
                tracing::error!(error = %self, "Dashboard request failed");
                (StatusCode::BAD_GATEWAY, "Dashboard unavailable").into_response()
            }
            Self::Config(_) | Self::Render(_) => {
                tracing::error!(error = %self, "Portal internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
