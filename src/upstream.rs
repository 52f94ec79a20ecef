use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use time::Date;
use time::macros::format_description;
use url::Url;

use crate::error::Error;
use crate::types::{
    AccessRequest, ActivityPage, ApiMessage, Catalogue, Developer, DeveloperId, NewDeveloper,
    PortalConfig, RequestId,
};

/// Base URL used when none is configured.
pub const DEFAULT_DASHBOARD_URL: &str = "https://admin.cloud.tyk.io/";

/// Dashboard connection settings.
///
/// The API key is a constructor parameter; the base URL defaults to
/// [`DEFAULT_DASHBOARD_URL`].
///
/// ```rust,ignore
/// let config = DashboardConfig::new("secret")
///     .with_base_url("https://dashboard.internal/".parse()?);
/// ```
#[derive(Clone)]
#[non_exhaustive]
pub struct DashboardConfig {
    pub(crate) base_url: Url,
    pub(crate) api_key: String,
}

impl DashboardConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_DASHBOARD_URL.parse().expect("valid default URL"),
            api_key: api_key.into(),
        }
    }

    /// Override the dashboard base URL.
    ///
    /// Endpoint paths are resolved below the URL's path, so a dashboard
    /// served under a prefix keeps that prefix.
    #[must_use]
    pub fn with_base_url(mut self, mut url: Url) -> Self {
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = url;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl std::fmt::Debug for DashboardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Date range of the dashboard activity panel, formatted `DD/MM/YYYY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityWindow {
    pub from: String,
    pub to: String,
}

impl ActivityWindow {
    /// The 30 days leading up to and including `today`.
    #[must_use]
    pub fn last_30_days(today: Date) -> Self {
        let format = format_description!("[day]/[month]/[year]");
        let start = today.saturating_sub(time::Duration::days(30));
        // The format only has numeric components, which cannot fail to render.
        Self {
            from: start.format(format).unwrap_or_default(),
            to: today.format(format).unwrap_or_default(),
        }
    }
}

/// Client for the dashboard's portal and analytics API.
///
/// One instance is shared by every request so the connection pool stays warm.
pub struct DashboardClient {
    config: DashboardConfig,
    http: reqwest::Client,
}

impl DashboardClient {
    #[must_use]
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Look up a developer by email.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] when the dashboard does not know the email.
    pub async fn get_developer(&self, email: &str) -> Result<Developer, Error> {
        let path = format!(
            "api/portal/developers/email/{}",
            urlencoding::encode(email)
        );
        let response = self.request(Method::GET, &path)?.send().await?;
        Self::read_json(response, "developer lookup").await
    }

    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::Rejected`] on a non-success status.
    pub async fn get_catalogue(&self) -> Result<Catalogue, Error> {
        let response = self
            .request(Method::GET, "api/portal/catalogue")?
            .send()
            .await?;
        Self::read_json(response, "catalogue fetch").await
    }

    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::Rejected`] on a non-success status.
    pub async fn get_portal_config(&self) -> Result<PortalConfig, Error> {
        let response = self
            .request(Method::GET, "api/portal/configuration")?
            .send()
            .await?;
        Self::read_json(response, "portal configuration fetch").await
    }

    /// Daily aggregated analytics for a comma-separated key list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::Rejected`] on a non-success status.
    pub async fn get_key_activity(
        &self,
        keys: &str,
        window: &ActivityWindow,
    ) -> Result<ActivityPage, Error> {
        let path = format!(
            "api/activity/keys/aggregate/{keys}/{}/{}?p=-1&res=day",
            window.from, window.to
        );
        let response = self.request(Method::GET, &path)?.send().await?;
        Self::read_json(response, "key activity").await
    }

    /// Ask the dashboard whether the password matches the developer's.
    ///
    /// A non-success status means "not verified" and is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<bool, Error> {
        #[derive(Serialize)]
        struct Credentials<'a> {
            username: &'a str,
            password: &'a str,
        }

        let response = self
            .request(Method::POST, "api/portal/developers/verify_credentials")?
            .json(&Credentials {
                username: email,
                password,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Credential verification refused");
        }
        Ok(status.is_success())
    }

    /// Register a developer. Returns the id the dashboard assigned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] with the dashboard's explanation
    /// (duplicate email, missing field, ...).
    pub async fn create_developer(&self, developer: &NewDeveloper) -> Result<DeveloperId, Error> {
        let response = self
            .request(Method::POST, "api/portal/developers")?
            .json(developer)
            .send()
            .await?;
        let message: ApiMessage = Self::read_json(response, "developer creation").await?;
        Ok(DeveloperId(message.message))
    }

    /// File a key request. Returns the request id from the response's `Message`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::Rejected`] on a non-success status.
    pub async fn create_access_request(
        &self,
        request: &AccessRequest,
    ) -> Result<RequestId, Error> {
        let response = self
            .request(Method::POST, "api/portal/requests")?
            .json(request)
            .send()
            .await?;
        let message: ApiMessage = Self::read_json(response, "access request").await?;
        Ok(RequestId(message.message))
    }

    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::Rejected`] on a non-success status.
    pub async fn approve_access_request(&self, id: &RequestId) -> Result<(), Error> {
        let path = format!("api/portal/requests/approve/{}", urlencoding::encode(&id.0));
        let response = self.request(Method::PUT, &path)?.send().await?;
        Self::ensure_success(response, "access request approval").await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, Error> {
        let url = self.config.base_url.join(path)?;
        Ok(self
            .http
            .request(method, url)
            .header(AUTHORIZATION, &self.config.api_key))
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<T, Error> {
        let response = Self::ensure_success(response, operation).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| Error::Decode { operation, source })
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Rejected {
            operation,
            status,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;
    use time::macros::date;

    use super::*;
    use crate::types::{AccessRequestFields, PolicyId};

    fn client_for(server: &mockito::ServerGuard) -> DashboardClient {
        let config = DashboardConfig::new("secret").with_base_url(server.url().parse().unwrap());
        DashboardClient::new(config)
    }

    #[test]
    fn test_window_spans_thirty_days() {
        let window = ActivityWindow::last_30_days(date!(2024 - 03 - 31));
        assert_eq!(window.from, "01/03/2024");
        assert_eq!(window.to, "31/03/2024");
    }

    #[test]
    fn test_window_crosses_year_boundary() {
        let window = ActivityWindow::last_30_days(date!(2024 - 01 - 15));
        assert_eq!(window.from, "16/12/2023");
        assert_eq!(window.to, "15/01/2024");
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config =
            DashboardConfig::new("k").with_base_url("https://dash.example.com/tyk".parse().unwrap());
        assert_eq!(config.base_url().as_str(), "https://dash.example.com/tyk/");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = DashboardConfig::new("super-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("admin.cloud.tyk.io"));
    }

    #[tokio::test]
    async fn test_get_developer_sends_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                Matcher::Regex(r"^/api/portal/developers/email/dev%40example\.com$".into()),
            )
            .match_header("authorization", "secret")
            .with_status(200)
            .with_body(json!({"id": "d1", "email": "dev@example.com"}).to_string())
            .create_async()
            .await;

        let developer = client_for(&server)
            .get_developer("dev@example.com")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(developer.id, DeveloperId::from("d1".to_string()));
    }

    #[tokio::test]
    async fn test_rejection_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/portal/catalogue")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let err = client_for(&server).get_catalogue().await.unwrap_err();
        match &err {
            Error::Rejected { status, body, .. } => {
                assert_eq!(*status, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.into_rejection_body().unwrap(), "forbidden");
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/portal/configuration")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = client_for(&server).get_portal_config().await.unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[tokio::test]
    async fn test_verify_credentials_maps_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/portal/developers/verify_credentials")
            .match_body(Matcher::Json(json!({"username": "dev@example.com", "password": "good"})))
            .with_status(200)
            .with_body(r#"{"Status":"OK"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/api/portal/developers/verify_credentials")
            .match_body(Matcher::Json(json!({"username": "dev@example.com", "password": "bad"})))
            .with_status(401)
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(client.verify_credentials("dev@example.com", "good").await.unwrap());
        assert!(!client.verify_credentials("dev@example.com", "bad").await.unwrap());
    }

    #[tokio::test]
    async fn test_access_request_returns_message_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/portal/requests")
            .match_body(Matcher::PartialJson(json!({
                "by_user": "d1",
                "version": "v2",
                "for_plan": "p1",
                "fields": {"usecase": "testing", "traffic": "100"}
            })))
            .with_status(200)
            .with_body(r#"{"Status":"OK","Message":"req123","Meta":null}"#)
            .create_async()
            .await;

        let request = AccessRequest {
            by_user: DeveloperId::from("d1".to_string()),
            fields: AccessRequestFields {
                usecase: "testing".into(),
                traffic: "100".into(),
            },
            date_created: "2024-03-31T12:00:00Z".into(),
            version: "v2",
            for_plan: PolicyId::from("p1".to_string()),
        };
        let id = client_for(&server)
            .create_access_request(&request)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(id, RequestId::from("req123".to_string()));
    }

    #[tokio::test]
    async fn test_activity_path_and_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                Matcher::Regex(r"^/api/activity/keys/aggregate/k1,k2,/01/03/2024/31/03/2024".into()),
            )
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("p".into(), "-1".into()),
                Matcher::UrlEncoded("res".into(), "day".into()),
            ]))
            .with_status(200)
            .with_body(json!({"data": [{"hits": 4}]}).to_string())
            .create_async()
            .await;

        let window = ActivityWindow::last_30_days(date!(2024 - 03 - 31));
        let page = client_for(&server)
            .get_key_activity("k1,k2,", &window)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page.data.len(), 1);
    }

    #[tokio::test]
    async fn test_approve_uses_put() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/portal/requests/approve/req123")
            .with_status(200)
            .create_async()
            .await;

        client_for(&server)
            .approve_access_request(&RequestId::from("req123".to_string()))
            .await
            .unwrap();

        mock.assert_async().await;
    }
}
