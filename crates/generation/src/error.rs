use crate::scheduler::ChunkState;
use codedoc_cache::ErrorKind;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Failure reported by a text-generation backend for one call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("backend timed out")]
    Timeout,

    #[error("backend error: {0}")]
    Backend(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl BackendError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Timeout => ErrorKind::Timeout,
            Self::Backend(_) => ErrorKind::BackendError,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Invalid scheduler settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid chunk state transition {from:?} -> {to:?}")]
    InvalidTransition { from: ChunkState, to: ChunkState },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_result_kinds() {
        let limited = BackendError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(limited.kind(), ErrorKind::RateLimited);
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(BackendError::Timeout.kind(), ErrorKind::Timeout);
        assert_eq!(BackendError::Backend("500".into()).kind(), ErrorKind::BackendError);
        assert_eq!(BackendError::InvalidInput("too long".into()).kind(), ErrorKind::InvalidInput);
        assert_eq!(BackendError::Timeout.retry_after(), None);
    }
}
