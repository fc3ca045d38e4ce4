use thiserror::Error;

pub type Result<T> = std::result::Result<T, AmpreError>;

#[derive(Debug, Error)]
pub enum AmpreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed AMPRE response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("AMPRE API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl AmpreError {
    /// Upstream status code, when the request reached the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            AmpreError::Http(e) => e.status().map(|s| s.as_u16()),
            AmpreError::Api { status, .. } => Some(*status),
            AmpreError::Decode(_) => None,
        }
    }
}
