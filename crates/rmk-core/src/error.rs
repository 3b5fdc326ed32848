//! Error taxonomy shared by every kernel component.
//!
//! Mirrors the five buckets in the design's error-handling section:
//! transport-transient, logical-permanent, policy-denial, downstream-soft,
//! and fatal. Callers match on the variant to decide whether to retry.

use thiserror::Error;

/// Kernel-wide error type.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RmkError {
    /// Connection refused, timeout, or other transient transport failure.
    /// Safe to retry with backoff.
    #[error("transient transport failure: {0}")]
    Transient(String),

    /// Schema mismatch, quota exceeded, malformed request. Never retried.
    #[error("permanent failure: {0}")]
    Permanent(String),

    /// Policy engine returned Deny. `resource` and `action` are logged at
    /// info level by the caller, not embedded in the user-facing message.
    #[error("access denied: not authorized for {action} on this resource")]
    PolicyDenied {
        /// The action that was denied (Read/Write/Admin).
        action: String,
    },

    /// An optional downstream collaborator (embedder, summarizer, insighter,
    /// classifier) failed; the caller degrades gracefully rather than
    /// propagating this to the request's result.
    #[error("downstream service degraded: {0}")]
    DownstreamSoft(String),

    /// Configuration or boot-time error. Propagates to process exit.
    #[error("fatal configuration error: {0}")]
    Fatal(String),

    /// Namespace failed validation against `^(user|group)_[A-Za-z0-9_-]+$`.
    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    /// A rate limiter rejected a call; carries a retry-after hint in seconds.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds the caller should wait before retrying.
        retry_after_secs: u64,
    },

    /// Serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Catch-all for errors that don't need a typed variant.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RmkError {
    /// True for errors a caller should retry with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, RmkError::Transient(_) | RmkError::RateLimited { .. })
    }

    /// Maps any error to a user-safe message, discarding internal detail.
    /// Pair with a generated opaque reference ID for support correlation.
    #[must_use]
    pub fn user_safe_message(&self) -> String {
        match self {
            RmkError::PolicyDenied { action } => {
                format!("access denied: not authorized for {action} on this resource")
            }
            RmkError::RateLimited { retry_after_secs } => {
                format!("too many requests, please retry in {retry_after_secs}s")
            }
            RmkError::InvalidNamespace(_) => "invalid request".to_string(),
            _ => "an internal error occurred".to_string(),
        }
    }
}

/// Kernel-wide result alias.
pub type RmkResult<T> = std::result::Result<T, RmkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_retryable() {
        assert!(RmkError::Transient("timeout".into()).is_retryable());
        assert!(RmkError::RateLimited { retry_after_secs: 2 }.is_retryable());
        assert!(!RmkError::Permanent("schema".into()).is_retryable());
    }

    #[test]
    fn policy_denied_message_has_no_private_fields() {
        let err = RmkError::PolicyDenied {
            action: "Read".to_string(),
        };
        let msg = err.user_safe_message();
        assert!(msg.contains("Read"));
        assert!(!msg.contains("uid"));
    }

    #[test]
    fn other_errors_never_leak_detail() {
        let err = RmkError::Permanent("dgraph schema error: secret-column-xyz".into());
        assert_eq!(err.user_safe_message(), "an internal error occurred");
    }
}
