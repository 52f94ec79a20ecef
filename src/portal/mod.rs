//! The portal's HTTP surface.
//!
//! Every request goes through the same pipeline:
//!
//! 1. [`load_context`](context::load_context) reads the session cookie,
//!    resolves the developer (dropping a stale session), and loads the
//!    catalogue and portal configuration from the dashboard.
//! 2. Gated routes run the [`Guard`] next and redirect anonymous visitors.
//! 3. The handler renders a page or redirects, optionally returning a new
//!    [`Session`](crate::Session) which the loader writes back to the cookie.
//!
//! ```rust,ignore
//! use devportal::portal::{AppConfig, AppState, portal_routes};
//!
//! let config = AppConfig::from_env()?;
//! let app = portal_routes(AppState::new(config)?);
//! ```

mod config;
mod context;
mod error;
mod gate;
mod routes;
mod state;
mod views;


pub use config::{AppConfig, DEFAULT_PORT};
pub use context::RequestContext;
pub use error::PortalError;
pub use gate::{Guard, Role};
pub use routes::portal_routes;
pub use state::AppState;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
