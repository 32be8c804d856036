use std::fmt;

use blotter_core::BadResponse;

use crate::storage::StorageError;

/// The page no longer has the shape the parser expects.
///
/// Always fatal for the day being harvested: it means the upstream site
/// changed, not that one record is bad.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("did not find expected page header(s): {}", .0.join(", "))]
    MissingHeaders(Vec<String>),
    #[error("page header '{0}' appears more than once")]
    DuplicateHeader(String),
    #[error("could not parse dispatch URL from row {row}")]
    RowLink { row: usize },
    #[error("could not parse dispatch number from row {row}")]
    RowIdentifier { row: usize },
    #[error("could not find details on page")]
    MissingDetails,
}

/// Network faults that are not HTTP error statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    InvalidUrl,
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: u64 },
    Decode,
    Network,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::InvalidUrl => write!(f, "invalid url"),
            TransportKind::Timeout => write!(f, "timeout"),
            TransportKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            TransportKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual})")
            }
            TransportKind::Decode => write!(f, "undecodable body"),
            TransportKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The server answered with a status of 400 or above.
    #[error(transparent)]
    BadResponse(#[from] BadResponse),
    #[error("{method} request to {url} failed: {kind}: {message}")]
    Transport {
        method: String,
        url: String,
        kind: TransportKind,
        message: String,
    },
    #[error("could not build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    pub(crate) fn transport(
        method: &reqwest::Method,
        url: &str,
        kind: TransportKind,
        message: impl Into<String>,
    ) -> Self {
        FetchError::Transport {
            method: method.to_string(),
            url: url.to_string(),
            kind,
            message: message.into(),
        }
    }

    pub fn transport_kind(&self) -> Option<TransportKind> {
        match self {
            FetchError::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn bad_response(&self) -> Option<&BadResponse> {
        match self {
            FetchError::BadResponse(bad) => Some(bad),
            _ => None,
        }
    }
}

/// Anything that aborts a day, a range or a sync run.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
