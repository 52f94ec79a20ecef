/// Errors raised by the dashboard client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The dashboard could not be reached or the transfer failed.
    #[error("dashboard unavailable: {0}")]
    Http(#[from] reqwest::Error),

    /// The dashboard answered with a non-success status.
    #[error("{operation} rejected with status {status}: {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The dashboard answered 2xx but the body did not match the expected shape.
    #[error("malformed {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid dashboard URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Take the raw upstream body out of a rejected call so it can be shown
    /// back to the developer. Any other error is handed back unchanged.
    ///
    /// # Errors
    ///
    /// Returns `self` when the error is not [`Error::Rejected`].
    pub fn into_rejection_body(self) -> Result<String, Self> {
        match self {
            Self::Rejected { body, .. } => Ok(body),
            other => Err(other),
        }
    }
}
