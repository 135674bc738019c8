//! Per-partition export tuple stream buffer
//!
//! This crate accumulates the row-change records a partitioned engine
//! produces, frames them into fixed-capacity byte blocks tagged with
//! transaction and schema-generation metadata, tracks commit progress
//! against in-flight transactions, and hands fully committed blocks to an
//! out-of-engine sink.
//!
//! ## Architecture
//!
//! The stream handles:
//! - Universal stream offset (USO) accounting, with speculative append and
//!   rollback to any prior mark
//! - The commit/pending-block state machine deciding when bytes are durable
//!   enough to release downstream
//! - End-of-stream injection when the schema generation advances mid-stream
//! - Block allocation and chain extension preserving per-tuple append
//!   atomicity
//!
//! The engine provides:
//! - The tuple, via the [`ExportTuple`] collaborator trait
//! - The sink, via the [`ExportSink`] trait injected at construction
//! - Transaction ids and durability watermarks on every call
//!
//! Everything runs on the partition's owning execution thread; only the
//! sink's queue crosses to another thread.

pub mod block;
pub mod config;
pub mod error;
pub mod serialize;
pub mod sink;
pub mod stream;
pub mod tuple;

mod chain;
mod commit;

pub use block::{ExportBuffer, StreamBlock};
pub use config::{ExportStreamConfig, DEFAULT_BUFFER_CAPACITY, MAX_BUFFER_AGE_MS};
pub use error::{Result, StreamError};
pub use serialize::ExportWriter;
pub use sink::{ChannelSink, CollectingSink, ExportSink, PushedBuffer};
pub use stream::{ExportTupleStream, METADATA_COLUMN_COUNT};
pub use tuple::{set_null, ExportTuple};

// Shared scalar types, re-exported for convenience
pub use outflow_common::{ExportOp, TxnId};
