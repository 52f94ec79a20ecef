use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::PrivateCookieJar;

use super::error::PortalError;
use super::state::AppState;
use crate::session::Session;
use crate::types::{Catalogue, Developer, PortalConfig};
use crate::upstream::DashboardClient;

/// Everything a page needs, loaded fresh for every request.
///
/// Inserted into the request extensions by [`load_context`]; handlers take
/// it as `Extension<RequestContext>`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Session as read from the cookie, with a stale developer already cleared.
    pub session: Session,
    pub developer: Option<Developer>,
    pub catalogue: Catalogue,
    pub portal_config: PortalConfig,
}

impl RequestContext {
    #[must_use]
    pub fn developer(&self) -> Option<&Developer> {
        self.developer.as_ref()
    }
}

/// Resolve the session's developer.
///
/// Any failure, including a record for a different email, clears the session
/// and the request carries on anonymously.
async fn resolve_developer(
    client: &DashboardClient,
    session: &mut Session,
) -> Option<Developer> {
    let email = session.developer_email()?.to_string();

    match client.get_developer(&email).await {
        Ok(developer) if developer.email.eq_ignore_ascii_case(&email) => Some(developer),
        Ok(developer) => {
            tracing::warn!(
                session_email = %email,
                dashboard_email = %developer.email,
                "Developer lookup returned another identity; clearing session"
            );
            session.clear();
            None
        }
        Err(e) => {
            tracing::info!(error = %e, "Developer lookup failed; clearing session");
            session.clear();
            None
        }
    }
}

/// Per-request pipeline: resolve identity, load catalogue and configuration,
/// run the route, then persist the session.
///
/// A session returned by the handler as a response part wins over the one
/// read here; otherwise the cookie is only touched when the developer was
/// dropped as stale. A failed catalogue or configuration fetch answers 502
/// without running the route.
pub(crate) async fn load_context(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie = &state.settings.cookie;
    let mut session = Session::from_jar(&jar, cookie);
    let had_developer = session.developer_email().is_some();

    let developer = resolve_developer(&state.client, &mut session).await;
    let session_dropped = had_developer && session.developer_email().is_none();

    let loaded = async {
        let catalogue = state.client.get_catalogue().await?;
        let portal_config = state.client.get_portal_config().await?;
        Ok::<_, PortalError>((catalogue, portal_config))
    }
    .await;

    let mut response = match loaded {
        Ok((catalogue, portal_config)) => {
            request.extensions_mut().insert(RequestContext {
                session: session.clone(),
                developer,
                catalogue,
                portal_config,
            });
            next.run(request).await
        }
        // The stale session is still dropped when the page itself fails.
        Err(e) => e.into_response(),
    };

    let jar = match response.extensions_mut().remove::<Session>() {
        Some(updated) => updated.write(jar, cookie),
        None if session_dropped => session.write(jar, cookie),
        None => return response,
    };

    (jar, response).into_response()
}
