//! Common types for the outflow export stream
//!
//! This crate defines:
//! - Transaction IDs (engine-assigned, totally ordered i64 watermarks)
//! - Export operation tags (insert/delete) and their wire encoding

mod operation;
mod txn_id;

pub use operation::ExportOp;
pub use txn_id::TxnId;
