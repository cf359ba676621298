use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Success,
    Failed,
    /// Served from cache, or nothing to generate
    Skipped,
}

/// Why a chunk ended without an explanation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    Timeout,
    BackendError,
    InvalidInput,
    RetriesExhausted,
    Cancelled,
}

impl ErrorKind {
    /// Whether another attempt may succeed
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout | Self::BackendError)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::BackendError => "backend_error",
            Self::InvalidInput => "invalid_input",
            Self::RetriesExhausted => "retries_exhausted",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of documenting one chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub fingerprint: Fingerprint,
    #[serde(default)]
    pub explanation_text: String,
    pub status: GenerationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Unix milliseconds
    pub generated_at: u64,
    pub attempts: u32,
}

impl GenerationResult {
    #[must_use]
    pub fn success(fingerprint: Fingerprint, explanation_text: String, attempts: u32) -> Self {
        Self {
            fingerprint,
            explanation_text,
            status: GenerationStatus::Success,
            error_kind: None,
            generated_at: unix_ms_now(),
            attempts,
        }
    }

    #[must_use]
    pub fn failed(fingerprint: Fingerprint, error_kind: ErrorKind, attempts: u32) -> Self {
        Self {
            fingerprint,
            explanation_text: String::new(),
            status: GenerationStatus::Failed,
            error_kind: Some(error_kind),
            generated_at: unix_ms_now(),
            attempts,
        }
    }

    /// Nothing worth sending to the backend (blank chunk)
    #[must_use]
    pub fn empty(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            explanation_text: String::new(),
            status: GenerationStatus::Skipped,
            error_kind: None,
            generated_at: unix_ms_now(),
            attempts: 0,
        }
    }

    /// Re-label a stored result as served from cache.
    ///
    /// Successful explanations become `Skipped`; a reused failure keeps its
    /// `Failed` status and error kind.
    #[must_use]
    pub fn into_cache_hit(mut self) -> Self {
        if self.status == GenerationStatus::Success {
            self.status = GenerationStatus::Skipped;
        }
        self
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == GenerationStatus::Failed
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.error_kind == Some(ErrorKind::Cancelled)
    }
}

pub(crate) fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn serializes_without_empty_error_kind() {
        let fp = Fingerprint::compute("v1", "x");
        let ok = GenerationResult::success(fp.clone(), "Adds numbers.".into(), 1);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "success");
        assert!(json.get("error_kind").is_none());

        let failed = GenerationResult::failed(fp, ErrorKind::RetriesExhausted, 3);
        let json = serde_json::to_string(&failed).unwrap();
        let back: GenerationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, failed);
    }

    #[test]
    fn cache_hit_relabels_success_only() {
        let fp = Fingerprint::compute("v1", "x");
        let hit = GenerationResult::success(fp.clone(), "text".into(), 2).into_cache_hit();
        assert_eq!(hit.status, GenerationStatus::Skipped);
        assert_eq!(hit.explanation_text, "text");

        let failed = GenerationResult::failed(fp, ErrorKind::Timeout, 3).into_cache_hit();
        assert_eq!(failed.status, GenerationStatus::Failed);
    }

    #[test]
    fn retryable_kinds() {
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(ErrorKind::BackendError.is_retryable());
        assert!(!ErrorKind::InvalidInput.is_retryable());
        assert!(!ErrorKind::Cancelled.is_retryable());
    }
}
