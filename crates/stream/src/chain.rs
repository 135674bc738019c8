//! The buffer chain: one current block plus a FIFO of sealed blocks
//!
//! Blocks in `pending` are byte-contiguous in USO and strictly ordered;
//! `current`, when present, starts exactly where the last pending block
//! ends. Sealing never copies bytes: `extend` moves the current block onto
//! the queue and allocates a fresh one.

use crate::block::StreamBlock;
use crate::error::{Result, StreamError};
use std::collections::VecDeque;

pub(crate) struct BufferChain {
    default_capacity: usize,
    pub(crate) current: Option<StreamBlock>,
    pub(crate) pending: VecDeque<StreamBlock>,
}

impl BufferChain {
    pub(crate) fn new(default_capacity: usize) -> Self {
        Self {
            default_capacity,
            current: None,
            pending: VecDeque::new(),
        }
    }

    pub(crate) fn default_capacity(&self) -> usize {
        self.default_capacity
    }

    /// Seal the current block into the pending queue and allocate a new one
    ///
    /// Every block is allocated at the default capacity; `min_length` only
    /// gates the request. The new block starts at `uso` and is tagged with
    /// the stream's generation and signature.
    pub(crate) fn extend(
        &mut self,
        min_length: usize,
        uso: u64,
        generation: Option<i64>,
        signature: &str,
    ) -> Result<()> {
        if min_length > self.default_capacity {
            return Err(StreamError::CapacityTooSmall {
                required: min_length,
                capacity: self.default_capacity,
            });
        }

        if let Some(sealed) = self.current.take() {
            self.pending.push_back(sealed);
        }

        let mut block = StreamBlock::new(self.default_capacity, uso)?;
        if let Some(generation) = generation {
            block.set_generation_id(generation);
        }
        block.set_signature(signature);
        self.current = Some(block);
        Ok(())
    }

    /// Drop the current block and every pending block
    pub(crate) fn cleanup(&mut self) {
        self.current = None;
        self.pending.clear();
    }

    /// Re-size the chain's blocks; resets the chain
    pub(crate) fn set_default_capacity(&mut self, capacity: usize) {
        self.cleanup();
        self.default_capacity = capacity;
    }
}
