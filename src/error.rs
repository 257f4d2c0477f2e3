use serde::Serialize;
use thiserror::Error;

/// Transport and status failures from the weather provider, normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream rate limit exceeded")]
    RateLimited,
    #[error("upstream unavailable: {message}")]
    Unavailable { status: Option<u16>, message: String },
    #[error("upstream rejected the request ({status}): {message}")]
    BadRequest { status: u16, message: String },
}

impl UpstreamError {
    /// Timeouts, transport failures and 5xx responses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Unavailable { status, .. } => status.is_none_or(|s| s >= 500),
            Self::RateLimited | Self::BadRequest { .. } => false,
        }
    }

    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => Self::RateLimited,
            400..=499 => Self::BadRequest { status, message },
            _ => Self::Unavailable {
                status: Some(status),
                message,
            },
        }
    }

    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Unavailable {
                status: None,
                message: err.to_string(),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearFailure {
    pub year: i32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("all {} historical year requests failed", .0.len())]
    AllYearsFailed(Vec<YearFailure>),
    #[error("request exceeded the configured time limit")]
    RequestTimeout,
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Upstream(UpstreamError::Timeout) => "UPSTREAM_TIMEOUT",
            Self::Upstream(UpstreamError::RateLimited) => "UPSTREAM_RATE_LIMITED",
            Self::Upstream(UpstreamError::Unavailable { .. }) => "UPSTREAM_UNAVAILABLE",
            Self::Upstream(UpstreamError::BadRequest { .. }) => "UPSTREAM_BAD_REQUEST",
            Self::AllYearsFailed(_) => "ALL_HISTORICAL_YEARS_FAILED",
            Self::RequestTimeout => "REQUEST_TIMEOUT",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Upstream(UpstreamError::Timeout) | Self::RequestTimeout => 504,
            Self::Upstream(UpstreamError::RateLimited) => 429,
            Self::Upstream(UpstreamError::Unavailable {
                status: Some(503), ..
            }) => 503,
            Self::Upstream(UpstreamError::Unavailable { .. } | UpstreamError::BadRequest { .. })
            | Self::AllYearsFailed(_) => 502,
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::AllYearsFailed(failures) => serde_json::to_value(failures).ok(),
            Self::Upstream(UpstreamError::BadRequest { status, .. }) => {
                Some(serde_json::json!({ "upstreamStatus": status }))
            }
            _ => None,
        }
    }
}
