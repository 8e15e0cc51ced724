//! Error types returned by the merge engine.

use thiserror::Error;

/// Everything that can go wrong in the list document model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LdmError {
    /// A caller passed a negative length/offset or an otherwise malformed
    /// request. Recoverable: the caller should not retry unmodified.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A tree-level invariant was violated mid-operation (for example, two
    /// `DATA` nodes found in a single-point bucket). Indicates a bug in the
    /// engine; the document should be treated as unsafe to continue using.
    #[error("internal invariant violation: {0}")]
    Internal(String),

    /// `self_test` found corruption: non-contiguous local offsets,
    /// out-of-order positions, or mismatched conflict sets. Always
    /// terminal for the instance that raised it.
    #[error("fatal corruption detected: {0}")]
    Fatal(String),
}

impl LdmError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        LdmError::InvalidArgument(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        LdmError::Internal(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        LdmError::Fatal(msg.into())
    }
}
