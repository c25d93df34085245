use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("rate limited by server")]
    RateLimited,
    #[error("not signed in or session expired")]
    Unauthorized,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("request queue shut down")]
    QueueClosed,
    #[error("local storage: {0}")]
    Storage(String),
}

impl ApiError {
    /// Only 429s are retried by the queue; everything else settles at once.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }

    /// Failures where cached data is a reasonable stand-in.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }

    /// Failures after which a saved copy is served instead. The server
    /// rejecting the session or throttling is reported as is.
    pub fn allows_cached_fallback(&self) -> bool {
        !matches!(self, Self::Unauthorized | Self::RateLimited)
    }

    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => Self::Unauthorized,
            429 => Self::RateLimited,
            _ => Self::Http { status, body },
        }
    }
}

pub(crate) fn map_reqwest_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else if e.is_decode() {
        ApiError::Decode(e.to_string())
    } else {
        ApiError::Transport(e.to_string())
    }
}
