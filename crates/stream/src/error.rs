//! Error types for the export stream
//!
//! Every variant signals an engine invariant violation. None is locally
//! recoverable: callers abort the containing execution context.

use outflow_common::TxnId;
use thiserror::Error;

/// Result type for export stream operations
pub type Result<T> = std::result::Result<T, StreamError>;

/// Fatal conditions raised by the export stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("active transactions moving backwards: {current} precedes open transaction {open}")]
    TxnMovingBackwards { open: TxnId, current: TxnId },

    #[error("truncating the future: rollback mark {mark} is past stream offset {uso}")]
    TruncatingTheFuture { mark: u64, uso: u64 },

    #[error("default capacity {capacity} is less than required buffer size {required}")]
    CapacityTooSmall { required: usize, capacity: usize },

    #[error("default capacity is only settable before the stream is used")]
    ReconfigureAfterUse,

    #[error("export buffer capacity must be positive")]
    InvalidCapacity,

    #[error("tuple reported a zero maximum serialized size")]
    CorruptTuple,

    #[error("failed to claim a {bytes}-byte export buffer")]
    AllocationFailure { bytes: usize },

    #[error("write of {required} bytes exceeds the {remaining} bytes left in the buffer")]
    BufferOverrun { required: usize, remaining: usize },

    #[error("generation moving backwards: {requested} does not advance {current}")]
    GenerationMovingBackwards { current: i64, requested: i64 },

    #[error("stream signature {existing:?} cannot be changed to {requested:?}")]
    SignatureMismatch { existing: String, requested: String },
}
