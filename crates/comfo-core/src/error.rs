// ── Core error types ──
//
// User-facing errors from comfo-core. Consumers never see raw RPC codes:
// the `From<ApiError>` impl below is the single place transport failures
// are classified into actionable outcomes. Transient conditions (unit
// unreachable, unit too slow) become `CannotConnect` / `Timeout`;
// anything else is a contract violation surfaced as `Api` with the
// detail preserved for diagnostics.

use comfo_api::{ApiError, ErrorCode};
use thiserror::Error;

/// Unified error type for the core crate.
///
/// `Clone + PartialEq` so refresh outcomes can be fanned out to every
/// waiter of a coalesced burst and asserted on in tests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The unit is unreachable. Likely transient; the next poll retries.
    #[error("cannot connect to the unit: {reason}")]
    CannotConnect { reason: String },

    /// The unit answered too slowly, or a whole refresh batch exceeded
    /// its budget. Likely transient.
    #[error("request timed out: {reason}")]
    Timeout { reason: String },

    /// A write operation was given a bad value. Raised before any
    /// network call.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Any other transport failure: a protocol-contract violation, not
    /// retried automatically.
    #[error("device API error: {message}")]
    Api { message: String },

    /// The coordinator was stopped while the caller was waiting.
    #[error("coordinator is stopped")]
    Stopped,
}

impl CoreError {
    /// Whether a retry on the next poll tick is worthwhile.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::CannotConnect { .. } | Self::Timeout { .. })
    }
}

// ── Classification of transport errors ───────────────────────────────

impl From<ApiError> for CoreError {
    fn from(err: ApiError) -> Self {
        match err.code {
            ErrorCode::Unavailable => CoreError::CannotConnect {
                reason: err.message,
            },
            ErrorCode::DeadlineExceeded => CoreError::Timeout {
                reason: err.message,
            },
            // Every remaining code, known or not, is a bug-level
            // condition. Keep the full error text for diagnostics.
            _ => CoreError::Api {
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn unavailable_classifies_as_cannot_connect() {
        let err = CoreError::from(ApiError::unavailable("connection refused"));
        assert_eq!(
            err,
            CoreError::CannotConnect {
                reason: "connection refused".into()
            }
        );
        assert!(err.is_transient());
    }

    #[test]
    fn deadline_exceeded_classifies_as_timeout() {
        let err = CoreError::from(ApiError::deadline_exceeded("no answer in 5s"));
        assert_eq!(
            err,
            CoreError::Timeout {
                reason: "no answer in 5s".into()
            }
        );
        assert!(err.is_transient());
    }

    #[test]
    fn classification_is_total_over_all_codes() {
        for code in ErrorCode::iter() {
            let classified = CoreError::from(ApiError::new(code, "boom"));
            match code {
                ErrorCode::Unavailable => {
                    assert!(matches!(classified, CoreError::CannotConnect { .. }));
                }
                ErrorCode::DeadlineExceeded => {
                    assert!(matches!(classified, CoreError::Timeout { .. }));
                }
                _ => assert!(
                    matches!(classified, CoreError::Api { .. }),
                    "code {code} must classify as Api"
                ),
            }
        }
    }

    #[test]
    fn api_variant_preserves_detail() {
        let err = CoreError::from(ApiError::new(ErrorCode::Internal, "bad frame"));
        assert_eq!(
            err,
            CoreError::Api {
                message: "device rpc failed (internal): bad frame".into()
            }
        );
        assert!(!err.is_transient());
    }
}
