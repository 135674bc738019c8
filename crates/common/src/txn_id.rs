//! Transaction identifier as assigned by the partitioned engine
//!
//! The engine hands every export call a pair of these: the global durable
//! watermark and the id of the transaction driving the call. All the export
//! stream ever does with them is compare, so a totally ordered i64 newtype
//! is all that's needed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine-assigned transaction identifier
///
/// Ids are totally ordered and move forward in time. Zero is the initial
/// value of a fresh stream's open and committed frontiers, before any
/// transaction has touched it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TxnId(i64);

impl TxnId {
    /// Wrap an engine-assigned transaction id
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for TxnId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
