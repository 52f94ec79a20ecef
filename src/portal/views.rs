//! Server-rendered pages. Markup is intentionally plain.

use axum::response::Html;
use serde::Serialize;
use tera::{Context, Tera};

use super::error::PortalError;
use crate::types::{ActivityTotals, Catalogue, CatalogueApi, Developer, PolicyId};

const TEMPLATES: [(&str, &str); 7] = [
    ("layout.html", include_str!("../../templates/layout.html")),
    ("api_entry.html", include_str!("../../templates/api_entry.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("dashboard.html", include_str!("../../templates/dashboard.html")),
    ("register.html", include_str!("../../templates/register.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("request_access.html", include_str!("../../templates/request_access.html")),
];

/// Catalogue entry as the dashboard page shows it.
#[derive(Serialize)]
struct DashboardApi<'a> {
    #[serde(flatten)]
    api: &'a CatalogueApi,
    subscribed: bool,
    request_path: String,
}

/// The page templates, parsed once at startup.
///
/// Templates end in `.html`, so every interpolated value is autoescaped.
pub(crate) struct Views {
    tera: Tera,
}

impl Views {
    /// # Errors
    ///
    /// Returns [`PortalError::Render`] if a bundled template fails to parse.
    pub(crate) fn new() -> Result<Self, PortalError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)?;
        Ok(Self { tera })
    }

    fn render(
        &self,
        template: &str,
        developer: Option<&Developer>,
        error: Option<&str>,
        mut context: Context,
    ) -> Result<Html<String>, PortalError> {
        context.insert("developer", &developer);
        context.insert("error", &error);
        self.tera.render(template, &context).map(Html).map_err(|e| {
            tracing::error!(template, error = %e, "Template rendering failed");
            PortalError::Render(e)
        })
    }

    pub(super) fn home(&self, catalogue: &Catalogue) -> Result<Html<String>, PortalError> {
        let mut context = Context::new();
        context.insert("apis", &catalogue.apis);
        self.render("home.html", None, None, context)
    }

    pub(super) fn dashboard(
        &self,
        developer: &Developer,
        totals: &ActivityTotals,
        catalogue: &Catalogue,
    ) -> Result<Html<String>, PortalError> {
        let apis: Vec<DashboardApi<'_>> = catalogue
            .apis
            .iter()
            .map(|api| DashboardApi {
                api,
                subscribed: developer.is_subscribed_to(&api.policy_id),
                request_path: request_path(&api.policy_id),
            })
            .collect();

        let mut context = Context::new();
        context.insert("totals", totals);
        context.insert("apis", &apis);
        self.render("dashboard.html", Some(developer), None, context)
    }

    pub(super) fn register(
        &self,
        developer: Option<&Developer>,
        error: Option<&str>,
    ) -> Result<Html<String>, PortalError> {
        self.render("register.html", developer, error, Context::new())
    }

    pub(super) fn login(
        &self,
        developer: Option<&Developer>,
        error: Option<&str>,
    ) -> Result<Html<String>, PortalError> {
        self.render("login.html", developer, error, Context::new())
    }

    pub(super) fn request_access(
        &self,
        developer: &Developer,
        api: &CatalogueApi,
        policy_id: &PolicyId,
        error: Option<&str>,
    ) -> Result<Html<String>, PortalError> {
        let mut context = Context::new();
        context.insert("api", api);
        context.insert("request_path", &request_path(policy_id));
        self.render("request_access.html", Some(developer), error, context)
    }
}

fn request_path(policy_id: &PolicyId) -> String {
    urlencoding::encode(&policy_id.0).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn developer() -> Developer {
        serde_json::from_value(serde_json::json!({
            "id": "d1",
            "email": "dev@example.com",
            "fields": {"Name": "<b>Ada</b>", "Location": "London"},
            "subscriptions": {"p1": "key1"}
        }))
        .unwrap()
    }

    fn catalogue() -> Catalogue {
        serde_json::from_value(serde_json::json!({
            "apis": [
                {"name": "Weather", "policy_id": "p1"},
                {"name": "Maps & Tiles", "policy_id": "p 2"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_bundled_templates_parse() {
        assert!(Views::new().is_ok());
    }

    #[test]
    fn test_error_body_is_escaped() {
        let views = Views::new().unwrap();
        let Html(page) = views
            .login(None, Some("<script>alert(1)</script>"))
            .unwrap();
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn test_anonymous_header_offers_login() {
        let views = Views::new().unwrap();
        let Html(page) = views.register(None, None).unwrap();
        assert!(page.contains(r#"href="/login""#));
        assert!(!page.contains("Logout"));
    }

    #[test]
    fn test_dashboard_escapes_names_and_encodes_paths() {
        let views = Views::new().unwrap();
        let totals = ActivityTotals::default();
        let Html(page) = views
            .dashboard(&developer(), &totals, &catalogue())
            .unwrap();

        assert!(page.contains("Hello &lt;b&gt;Ada&lt;&#x2F;b&gt;!"));
        assert!(page.contains("Maps &amp; Tiles"));
        assert!(page.contains(r#"href="/request/p%202""#));
        assert!(page.contains("Already subscribed"));
    }
}
