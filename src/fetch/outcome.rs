//! Classification of physical request attempts
//!
//! Every physical attempt ends in exactly one [`FetchOutcome`]. The outcome is
//! what the retry policy looks at; [`FetchError`] is what the caller sees once
//! the scheduler stops retrying.

use reqwest::StatusCode;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use thiserror::Error;

/// Transport-level failure classes that matter for retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The peer reset or aborted the connection mid-flight
    ConnectionReset,
    /// The attempt exceeded its timeout
    Timeout,
    /// Anything else (DNS, refused connection, TLS, decoding)
    Other,
}

impl TransportErrorKind {
    /// Classifies an error by walking its source chain
    ///
    /// The first `io::Error` found decides the kind; an error chain without
    /// one is `Other`.
    pub fn from_error_chain(err: &(dyn StdError + 'static)) -> Self {
        let mut current = Some(err);
        while let Some(e) = current {
            if let Some(io_err) = e.downcast_ref::<io::Error>() {
                return Self::from_io_kind(io_err.kind());
            }
            current = e.source();
        }
        Self::Other
    }

    fn from_io_kind(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::ConnectionReset,
            io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Other,
        }
    }

    /// Whether an attempt that failed this way may be retried
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::ConnectionReset | Self::Timeout)
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionReset => write!(f, "connection reset"),
            Self::Timeout => write!(f, "timeout"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Result of one physical network attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 2xx response with its body
    Success(String),
    /// HTTP 429
    RateLimited,
    /// HTTP 503 or 504
    ServerUnavailable(u16),
    /// The request never produced a complete response
    TransportError {
        kind: TransportErrorKind,
        message: String,
    },
    /// Any other non-2xx status
    ClientError(u16),
}

impl FetchOutcome {
    /// Classifies a response status that is not a success
    pub fn from_failed_status(status: StatusCode) -> Self {
        match status {
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                Self::ServerUnavailable(status.as_u16())
            }
            _ => Self::ClientError(status.as_u16()),
        }
    }

    /// Classifies a reqwest failure (send or body read)
    pub fn from_transport_error(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else {
            TransportErrorKind::from_error_chain(err)
        };

        Self::TransportError {
            kind,
            message: err.to_string(),
        }
    }

    /// Converts the outcome into the body or the error the caller would see
    pub fn into_result(self, url: &str) -> Result<String, FetchError> {
        let url = url.to_string();
        match self {
            Self::Success(body) => Ok(body),
            Self::RateLimited => Err(FetchError::RateLimited { url }),
            Self::ServerUnavailable(status) => Err(FetchError::ServerUnavailable { url, status }),
            Self::TransportError { kind, message } => {
                Err(FetchError::Transport { url, kind, message })
            }
            Self::ClientError(status) => Err(FetchError::Client { url, status }),
        }
    }
}

/// Errors surfaced by a logical fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP 429: Too Many Requests for {url}")]
    RateLimited { url: String },

    #[error("HTTP {status}: service unavailable for {url}")]
    ServerUnavailable { url: String, status: u16 },

    #[error("Transport error ({kind}) for {url}: {message}")]
    Transport {
        url: String,
        kind: TransportErrorKind,
        message: String,
    },

    #[error("HTTP {status} for {url}")]
    Client { url: String, status: u16 },

    #[error("Retries exhausted for {url} after {attempts} attempts: {last_cause}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_cause: Box<FetchError>,
    },
}

impl FetchError {
    /// HTTP status behind this error, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
            Self::ServerUnavailable { status, .. } | Self::Client { status, .. } => Some(*status),
            Self::Transport { .. } => None,
            Self::RetriesExhausted { last_cause, .. } => last_cause.status(),
        }
    }
}
