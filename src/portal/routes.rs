use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Extension, Form, Router, middleware};
use serde::Deserialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::context::{self, RequestContext};
use super::error::PortalError;
use super::gate::{self, Guard, Role};
use super::state::AppState;
use crate::session::Session;
use crate::types::{
    AccessRequest, AccessRequestFields, ActivityTotals, NewDeveloper, PolicyId,
};
use crate::upstream::ActivityWindow;

/// Key request schema version understood by the dashboard.
const ACCESS_REQUEST_VERSION: &str = "v2";

/// Build the portal router.
///
/// Every route runs behind the context loader; `/dashboard` and
/// `/request/{policy_id}` additionally require a logged-in developer.
pub fn portal_routes(state: AppState) -> Router {
    let gated = Router::new()
        .route("/dashboard", get(dashboard))
        .route(
            "/request/{policy_id}",
            get(request_form).post(request_access),
        )
        .route_layer(middleware::from_fn_with_state(
            Guard::requiring(&[Role::Logged]),
            gate::enforce,
        ));

    Router::new()
        .route("/", get(home))
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
        .merge(gated)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            context::load_context,
        ))
        .with_state(state)
}

// ── Home & dashboard ───────────────────────────────────────────────

async fn home(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, PortalError> {
    if ctx.developer.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    Ok(state.views.home(&ctx.catalogue)?.into_response())
}

async fn dashboard(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, PortalError> {
    let Some(developer) = ctx.developer() else {
        return Ok(Redirect::to(gate::UNAUTHENTICATED_REDIRECT).into_response());
    };

    let window = ActivityWindow::last_30_days(OffsetDateTime::now_utc().date());
    let activity = state
        .client
        .get_key_activity(&developer.activity_key_list(), &window)
        .await?;
    let totals = ActivityTotals::from_rows(&activity.data);

    Ok(state
        .views
        .dashboard(developer, &totals, &ctx.catalogue)?
        .into_response())
}

// ── Registration ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RegisterForm {
    email: String,
    password: String,
    name: String,
    location: String,
}

async fn register_form(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, PortalError> {
    Ok(state.views.register(ctx.developer(), None)?.into_response())
}

async fn register(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, PortalError> {
    let developer = NewDeveloper::new(&form.email, form.password, form.name, form.location);

    match state.client.create_developer(&developer).await {
        Ok(id) => {
            tracing::info!(developer_id = %id, "Developer registered");
            Ok((Session::for_developer(form.email), Redirect::to("/")).into_response())
        }
        Err(e) => {
            let body = e.into_rejection_body()?;
            tracing::info!("Developer registration rejected by dashboard");
            Ok(state.views.register(ctx.developer(), Some(&body))?.into_response())
        }
    }
}

// ── Login & logout ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login_form(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, PortalError> {
    Ok(state.views.login(ctx.developer(), None)?.into_response())
}

async fn login(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<LoginForm>,
) -> Result<Response, PortalError> {
    let verified = state
        .client
        .verify_credentials(&form.email, &form.password)
        .await?;

    if !verified {
        if state.settings.enforce_login_credentials {
            tracing::info!("Login refused: credentials not verified");
            let page = state
                .views
                .login(ctx.developer(), Some("Password does not match"))?;
            return Ok(page.into_response());
        }
        // Sessions are established whatever the dashboard answered unless
        // enforcement is switched on.
        tracing::warn!("Credentials not verified; establishing session anyway");
    }

    Ok((Session::for_developer(form.email), Redirect::to("/")).into_response())
}

async fn logout(Extension(ctx): Extension<RequestContext>) -> (Session, Redirect) {
    let mut session = ctx.session;
    session.clear();
    (session, Redirect::to("/"))
}

// ── Access requests ────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AccessRequestForm {
    usecase: String,
    traffic: String,
}

async fn request_form(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(policy_id): Path<PolicyId>,
) -> Result<Response, PortalError> {
    let Some(developer) = ctx.developer() else {
        return Ok(Redirect::to(gate::UNAUTHENTICATED_REDIRECT).into_response());
    };
    let api = ctx
        .catalogue
        .find(&policy_id)
        .ok_or_else(|| PortalError::NotFound(policy_id.clone()))?;

    Ok(state
        .views
        .request_access(developer, api, &policy_id, None)?
        .into_response())
}

async fn request_access(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(policy_id): Path<PolicyId>,
    Form(form): Form<AccessRequestForm>,
) -> Result<Response, PortalError> {
    let Some(developer) = ctx.developer() else {
        return Ok(Redirect::to(gate::UNAUTHENTICATED_REDIRECT).into_response());
    };
    let api = ctx
        .catalogue
        .find(&policy_id)
        .ok_or_else(|| PortalError::NotFound(policy_id.clone()))?;

    let request = AccessRequest {
        by_user: developer.id.clone(),
        fields: AccessRequestFields {
            usecase: form.usecase,
            traffic: form.traffic,
        },
        date_created: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
        version: ACCESS_REQUEST_VERSION,
        for_plan: policy_id.clone(),
    };

    let request_id = match state.client.create_access_request(&request).await {
        Ok(id) => id,
        Err(e) => {
            let body = e.into_rejection_body()?;
            tracing::info!(policy_id = %policy_id, "Access request rejected by dashboard");
            let page = state
                .views
                .request_access(developer, api, &policy_id, Some(&body))?;
            return Ok(page.into_response());
        }
    };
    tracing::info!(request_id = %request_id, policy_id = %policy_id, "Access request filed");

    if !ctx.portal_config.require_key_approval {
        match state.client.approve_access_request(&request_id).await {
            Ok(()) => tracing::info!(request_id = %request_id, "Access request auto-approved"),
            Err(e) => {
                tracing::warn!(error = %e, request_id = %request_id, "Auto-approval failed");
            }
        }
    }

    Ok(Redirect::to("/").into_response())
}
