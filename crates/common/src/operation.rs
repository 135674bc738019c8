//! Export operation tags

use serde::{Deserialize, Serialize};

/// The kind of row change an exported tuple represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportOp {
    /// Row was inserted
    Insert,
    /// Row was deleted
    Delete,
}

impl ExportOp {
    /// The value serialized into the row's operation metadata column
    pub const fn wire_tag(self) -> i64 {
        match self {
            ExportOp::Insert => 1,
            ExportOp::Delete => 0,
        }
    }
}
