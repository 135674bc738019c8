//! Commit tracking for the export stream
//!
//! Two (txn, USO) pairs: the *open* frontier (the newest transaction whose
//! bytes may still be in the current block) and the *committed* frontier
//! (the USO prefix known to belong to durably committed transactions). The
//! committed USO is the drain horizon: pending blocks are released to the
//! sink only once fully covered by it.

use crate::error::{Result, StreamError};
use outflow_common::TxnId;

/// Open and committed transaction frontiers for one partition's stream
#[derive(Debug, Default)]
pub(crate) struct CommitTracker {
    /// Most recent txn whose writes may still be in the current block
    open_txn: TxnId,
    /// USO at the moment `open_txn` first appeared
    open_uso: u64,
    /// Newest txn known to be fully committed
    committed_txn: TxnId,
    /// USO up through which bytes belong to `committed_txn` or earlier
    committed_uso: u64,
}

impl CommitTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn open_txn(&self) -> TxnId {
        self.open_txn
    }

    pub(crate) fn committed_txn(&self) -> TxnId {
        self.committed_txn
    }

    pub(crate) fn committed_uso(&self) -> u64 {
        self.committed_uso
    }

    /// True until the first transaction touches the stream
    pub(crate) fn is_pristine(&self) -> bool {
        self.open_txn == TxnId::default()
            && self.open_uso == 0
            && self.committed_txn == TxnId::default()
    }

    /// Advance the frontiers for an operation of `current_txn`, given the
    /// engine's durable watermark `last_committed_txn`
    ///
    /// `uso` is the stream's USO at the time of the call. The engine may
    /// execute transactions slightly out of strict id order (single-partition
    /// sneak-in, speculative execution), so `current_txn == open_txn` is
    /// normal; only a backwards move is fatal.
    pub(crate) fn commit(
        &mut self,
        uso: u64,
        last_committed_txn: TxnId,
        current_txn: TxnId,
    ) -> Result<()> {
        if current_txn < self.open_txn {
            return Err(StreamError::TxnMovingBackwards {
                open: self.open_txn,
                current: current_txn,
            });
        }

        // more data for the ongoing transaction with no new committed data
        if current_txn == self.open_txn && last_committed_txn == self.committed_txn {
            return Ok(());
        }

        // A newer txn means everything so far belonged to the old open txn,
        // which is now committed at its boundary.
        if self.open_txn < current_txn {
            self.committed_uso = uso;
            self.committed_txn = self.open_txn;
            self.open_txn = current_txn;
            self.open_uso = uso;
        }

        // The durable watermark may have caught up with the open txn itself.
        if self.open_txn <= last_committed_txn {
            self.committed_uso = uso;
            self.committed_txn = self.open_txn;
        }

        Ok(())
    }
}
