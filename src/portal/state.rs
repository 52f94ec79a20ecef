use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::{AppConfig, PortalSettings};
use super::error::PortalError;
use super::views::Views;
use crate::upstream::DashboardClient;

/// Shared state for the pipeline and the route handlers.
#[derive(Clone)]
pub struct AppState {
    pub(super) client: Arc<DashboardClient>,
    pub(super) settings: PortalSettings,
    pub(super) views: Arc<Views>,
}

impl AppState {
    /// Build the state with a fresh dashboard client and the page templates.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Render`] if a bundled template fails to parse.
    pub fn new(config: AppConfig) -> Result<Self, PortalError> {
        let client = DashboardClient::new(config.dashboard);
        Ok(Self::with_client(client, config.settings, Views::new()?))
    }

    pub(super) fn with_client(
        client: DashboardClient,
        settings: PortalSettings,
        views: Views,
    ) -> Self {
        Self {
            client: Arc::new(client),
            settings,
            views: Arc::new(views),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.settings.cookie_key.clone()
    }
}
