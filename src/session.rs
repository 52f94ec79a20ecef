//! Cookie-carried portal session.
//!
//! The only server-side notion of "who is logged in" is the developer email
//! stored in a private (encrypted and authenticated) cookie. A [`Session`] is
//! read from the jar before dispatch, travels through the request as a plain
//! value, and is written back after the handler returns.

use std::convert::Infallible;

use axum::response::{IntoResponseParts, ResponseParts};
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Default name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "devportal_session";

/// Cookie attributes shared by every session write.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub ttl_days: i64,
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: SESSION_COOKIE_NAME.into(),
            ttl_days: 30,
            secure: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    developer_email: Option<String>,
}

impl Session {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_developer(email: impl Into<String>) -> Self {
        Self {
            developer_email: Some(email.into()),
        }
    }

    #[must_use]
    pub fn developer_email(&self) -> Option<&str> {
        self.developer_email.as_deref()
    }

    /// Drop the developer from the session (logout or stale identity).
    pub fn clear(&mut self) {
        self.developer_email = None;
    }

    /// Read the session from the cookie jar. Undecryptable cookies are
    /// already filtered out by the jar and read as anonymous.
    #[must_use]
    pub fn from_jar(jar: &PrivateCookieJar, settings: &CookieSettings) -> Self {
        let developer_email = jar
            .get(&settings.name)
            .map(|c| c.value().to_string())
            .filter(|email| !email.is_empty());
        Self { developer_email }
    }

    /// Write the session into the jar: set the cookie or remove it.
    #[must_use]
    pub fn write(&self, jar: PrivateCookieJar, settings: &CookieSettings) -> PrivateCookieJar {
        match &self.developer_email {
            Some(email) => jar.add(session_cookie(settings, email)),
            None => jar.remove(clear_session_cookie(&settings.name)),
        }
    }
}

/// Handlers return a `Session` as a response part to replace the current one.
/// The context loader picks it up from the response extensions.
impl IntoResponseParts for Session {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        res.extensions_mut().insert(self);
        Ok(res)
    }
}

fn session_cookie(settings: &CookieSettings, email: &str) -> Cookie<'static> {
    Cookie::build((settings.name.clone(), email.to_string()))
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::days(settings.ttl_days))
        .build()
}

fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}
