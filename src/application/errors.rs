// Failure taxonomy for a single fetch
use thiserror::Error;

/// Why a fetch produced no series. Terminal for the invocation that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("no network connectivity")]
    NoConnectivity,
    #[error("request timed out")]
    Timeout,
    #[error("payload could not be parsed")]
    InvalidPayload,
    #[error("server rejected the request")]
    ServerRejected,
    #[error("unclassified failure: {0}")]
    Unclassified(String),
}

impl FetchError {
    /// Text shown on the widget's info row.
    pub fn status_text(&self) -> &'static str {
        match self {
            Self::NoConnectivity => "No internet connection",
            Self::Timeout => "Connection timed out",
            Self::InvalidPayload => "Invalid data received",
            Self::ServerRejected => "Server error",
            Self::Unclassified(_) => "Unknown error",
        }
    }
}
