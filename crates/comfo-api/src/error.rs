use thiserror::Error;

/// RPC error codes the unit's transport can report.
///
/// The set mirrors the Twirp/gRPC status-code vocabulary the unit's RPC
/// bridge speaks. `Unknown` is the catch-all for codes introduced by
/// firmware we have not seen; callers must treat the set as total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    Canceled,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    PermissionDenied,
    Unimplemented,
    Internal,
    Unavailable,
    Unknown,
}

impl ErrorCode {
    /// Whether the condition is likely transient: the unit being
    /// unreachable or too slow. Everything else indicates a contract
    /// violation and is not worth an automatic retry.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Unavailable | Self::DeadlineExceeded)
    }
}

/// A failure reported by the unit's RPC transport.
///
/// Every operation on [`ComfoClient`](crate::ComfoClient) fails with
/// exactly this type; `comfo-core` classifies it into a user-facing
/// outcome in one place.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("device rpc failed ({code}): {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The unit is unreachable (connection refused, no route, ...).
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unavailable, message)
    }

    /// The unit did not answer within the transport deadline.
    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DeadlineExceeded, message)
    }

    pub fn is_transient(&self) -> bool {
        self.code.is_transient()
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn display_includes_code_and_message() {
        let err = ApiError::unavailable("connection refused");
        assert_eq!(
            err.to_string(),
            "device rpc failed (unavailable): connection refused"
        );
    }

    #[test]
    fn only_unavailable_and_deadline_are_transient() {
        for code in ErrorCode::iter() {
            let expected =
                matches!(code, ErrorCode::Unavailable | ErrorCode::DeadlineExceeded);
            assert_eq!(code.is_transient(), expected, "code {code}");
        }
    }
}
