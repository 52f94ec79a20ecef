use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use super::context::RequestContext;

/// Where unauthenticated requests to gated routes are sent.
pub const UNAUTHENTICATED_REDIRECT: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A developer is attached to the request.
    Logged,
}

/// Route guard over a set of required roles.
///
/// ```rust,ignore
/// Router::new()
///     .route("/dashboard", get(dashboard))
///     .route_layer(middleware::from_fn_with_state(Guard::requiring(&[Role::Logged]), enforce));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Guard {
    roles: &'static [Role],
}

impl Guard {
    #[must_use]
    pub const fn requiring(roles: &'static [Role]) -> Self {
        Self { roles }
    }

    /// Whether the loaded context satisfies every required role.
    #[must_use]
    pub fn admits(&self, context: Option<&RequestContext>) -> bool {
        self.roles.iter().all(|role| match role {
            Role::Logged => context.is_some_and(|ctx| ctx.developer.is_some()),
        })
    }
}

/// Runs after the context loader and before the handler.
pub(crate) async fn enforce(State(guard): State<Guard>, request: Request, next: Next) -> Response {
    if guard.admits(request.extensions().get::<RequestContext>()) {
        return next.run(request).await;
    }

    tracing::debug!(path = %request.uri().path(), "Unauthenticated request to gated route");
    Redirect::to(UNAUTHENTICATED_REDIRECT).into_response()
}
