#![doc = include_str!("../README.md")]

pub mod error;
pub mod portal;
pub mod session;
pub mod types;
pub mod upstream;

// Re-exports for convenient access
pub use error::Error;
pub use portal::{AppConfig, AppState, PortalError, portal_routes};
pub use session::Session;
pub use types::{
    AccessRequest, ActivityTotals, Catalogue, CatalogueApi, Developer, DeveloperId, KeyId,
    NewDeveloper, PolicyId, PortalConfig, RequestId,
};
pub use upstream::{ActivityWindow, DashboardClient, DashboardConfig};
