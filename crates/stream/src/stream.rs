//! The per-partition export tuple stream
//!
//! Accumulates row-change records into fixed-capacity blocks, tracks commit
//! progress against in-flight transactions, and hands fully committed
//! blocks to the sink. Every committed write in the partition passes
//! through here, from the partition's owning execution thread; there is no
//! internal synchronization.
//!
//! The stream maintains a single monotone byte counter, the universal
//! stream offset (USO). `append_tuple` returns the USO the row started at,
//! which is the caller's rollback token: `rollback_to` rewinds the stream
//! to any such mark as long as no commit has advanced past it.

use crate::block::StreamBlock;
use crate::chain::BufferChain;
use crate::commit::CommitTracker;
use crate::config::{ExportStreamConfig, MAX_BUFFER_AGE_MS};
use crate::error::{Result, StreamError};
use crate::serialize::ExportWriter;
use crate::sink::ExportSink;
use crate::tuple::ExportTuple;
use outflow_common::{ExportOp, TxnId};

/// Metadata columns prefixed to every exported row:
/// txn id, timestamp, sequence number, partition id, site id, operation tag.
pub const METADATA_COLUMN_COUNT: usize = 6;

/// A partition's export tuple stream
///
/// Generic over the sink so the engine injects its top-end connection at
/// construction; the stream never reaches for ambient state.
pub struct ExportTupleStream<S: ExportSink> {
    partition_id: i64,
    site_id: i64,
    sink: S,

    /// Universal stream offset: total bytes ever appended (minus rollbacks)
    uso: u64,
    chain: BufferChain,
    tracker: CommitTracker,

    /// Identity of the exported table; set once
    signature: String,
    /// Schema/catalog epoch of bytes currently being written
    generation: Option<i64>,
    /// Generation of the last block walked by the drainer; drives
    /// end-of-stream injection
    prev_block_generation: Option<i64>,

    last_flush_ms: i64,
}

impl<S: ExportSink> ExportTupleStream<S> {
    /// Create a stream for one partition, with its first block allocated
    pub fn new(config: ExportStreamConfig, sink: S) -> Result<Self> {
        if config.default_capacity == 0 {
            return Err(StreamError::InvalidCapacity);
        }

        let mut stream = Self {
            partition_id: config.partition_id,
            site_id: config.site_id,
            sink,
            uso: 0,
            chain: BufferChain::new(config.default_capacity),
            tracker: CommitTracker::new(),
            signature: String::new(),
            generation: None,
            prev_block_generation: None,
            last_flush_ms: 0,
        };
        stream.extend_chain(config.default_capacity)?;
        Ok(stream)
    }

    /// Current universal stream offset
    pub fn uso(&self) -> u64 {
        self.uso
    }

    /// USO up through which bytes are known durably committed
    pub fn committed_uso(&self) -> u64 {
        self.tracker.committed_uso()
    }

    pub fn partition_id(&self) -> i64 {
        self.partition_id
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn generation(&self) -> Option<i64> {
        self.generation
    }

    /// Sealed blocks still waiting on commit progress
    pub fn pending_len(&self) -> usize {
        self.chain.pending.len()
    }

    /// Re-size the stream's blocks; only callable before first use
    pub fn set_default_capacity(&mut self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(StreamError::InvalidCapacity);
        }
        if self.uso != 0 || !self.tracker.is_pristine() {
            return Err(StreamError::ReconfigureAfterUse);
        }

        tracing::debug!(capacity, "resetting export stream block capacity");
        self.chain.set_default_capacity(capacity);
        self.extend_chain(capacity)
    }

    /// Install the exported table's signature and advance the generation
    ///
    /// If a prior generation was in effect, its bytes are quiesced first:
    /// committed at the new generation's watermark, sealed, and drained, so
    /// the drainer can close the old generation before new bytes flow.
    pub fn set_signature_and_generation(&mut self, signature: &str, generation: i64) -> Result<()> {
        if let Some(existing) = self.generation {
            if generation <= existing {
                return Err(StreamError::GenerationMovingBackwards {
                    current: existing,
                    requested: generation,
                });
            }
        }
        if !self.signature.is_empty() && self.signature != signature {
            return Err(StreamError::SignatureMismatch {
                existing: self.signature.clone(),
                requested: signature.to_string(),
            });
        }

        if self.generation.is_some() {
            tracing::debug!(
                old_generation = self.generation,
                new_generation = generation,
                "quiescing export stream for generation change"
            );
            let watermark = TxnId::new(generation);
            self.tracker.commit(self.uso, watermark, watermark)?;
            self.extend_chain(0)?;
            self.drain_pending()?;
        }

        self.signature = signature.to_string();
        self.generation = Some(generation);
        Ok(())
    }

    /// Serialize one tuple with its metadata header into the stream
    ///
    /// Advances the commit frontiers for `txn_id` first, extends the chain
    /// if the generation advanced or the block cannot hold the row, and
    /// returns the USO the row starts at - the caller's rollback token.
    #[allow(clippy::too_many_arguments)]
    pub fn append_tuple<T: ExportTuple>(
        &mut self,
        last_committed_txn: TxnId,
        txn_id: TxnId,
        seq_no: i64,
        timestamp: i64,
        generation_id: i64,
        tuple: &T,
        op: ExportOp,
    ) -> Result<u64> {
        // Transaction ids applied to this stream only move forward in time.
        if txn_id < self.tracker.open_txn() {
            return Err(StreamError::TxnMovingBackwards {
                open: self.tracker.open_txn(),
                current: txn_id,
            });
        }

        self.tracker.commit(self.uso, last_committed_txn, txn_id)?;

        // Upper bound on the bytes this row can take.
        let (row_header_size, tuple_max_length) = compute_row_size(tuple)?;

        if self.generation.is_none_or(|current| generation_id > current) {
            // Seal the old generation's block; the new one carries the new tag.
            self.generation = Some(generation_id);
            self.extend_chain(self.chain.default_capacity())?;
        }

        if self.chain.current.is_none() {
            // A prior rollback may have discarded the current block.
            self.extend_chain(self.chain.default_capacity())?;
        }

        let offset = self.chain.current.as_ref().map_or(0, |b| b.offset());
        if offset + tuple_max_length > self.chain.default_capacity() {
            self.extend_chain(tuple_max_length)?;
        }

        // The row about to be written is not yet in any pending block.
        self.drain_pending()?;

        let generation = self.generation;
        let current = self
            .chain
            .current
            .as_mut()
            .expect("extend installed a current block");

        // First row of the block stamps its framing.
        if current.offset() == 0 {
            if let Some(generation) = generation {
                current.set_generation_id(generation);
            }
            current.set_signature(&self.signature);
        }

        let region = current.mutable_data();
        let (header, body) = region.split_at_mut(row_header_size);

        // A zeroed header marks every column non-null; the null bitmap
        // follows the 4-byte length prefix.
        header.fill(0);
        let (length_prefix, null_bitmap) = header.split_at_mut(4);

        let mut out = ExportWriter::new(body);
        out.write_i64(txn_id.value())?;
        out.write_i64(timestamp)?;
        out.write_i64(seq_no)?;
        out.write_i64(self.partition_id)?;
        out.write_i64(self.site_id)?;
        out.write_i64(op.wire_tag())?;

        tuple.serialize_to_export(&mut out, METADATA_COLUMN_COUNT, null_bitmap)?;
        let body_length = out.position();

        // The row length excludes its own 4-byte prefix but includes the
        // null bitmap.
        let row_length = (body_length + row_header_size - 4) as i32;
        ExportWriter::new(length_prefix).write_i32(row_length)?;

        current.consumed(row_header_size + body_length)?;

        let starting_uso = self.uso;
        self.uso += (row_header_size + body_length) as u64;
        Ok(starting_uso)
    }

    /// Discard all appended data at or after `mark`
    ///
    /// Must be called before any intervening commit advances the committed
    /// USO past `mark`.
    pub fn rollback_to(&mut self, mark: u64) -> Result<()> {
        if mark > self.uso {
            return Err(StreamError::TruncatingTheFuture {
                mark,
                uso: self.uso,
            });
        }

        tracing::debug!(mark, uso = self.uso, "rolling back export stream");
        self.uso = mark;

        // Working newest to oldest: throw away blocks entirely after the
        // mark, truncate the block containing it.
        match self.chain.current.as_mut() {
            Some(current) if current.starting_uso() < mark => current.truncate_to(mark),
            _ => {
                self.chain.current = None;
                while let Some(mut block) = self.chain.pending.pop_back() {
                    if block.starting_uso() >= mark {
                        continue;
                    }
                    block.truncate_to(mark);
                    self.chain.current = Some(block);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Seal and drain on a timer, so committed bytes leave the stream even
    /// when no tuples arrive
    ///
    /// A negative `now_ms` forces the flush; otherwise it runs only once
    /// the current block is older than [`MAX_BUFFER_AGE_MS`].
    pub fn periodic_flush(
        &mut self,
        now_ms: i64,
        last_committed_txn: TxnId,
        current_txn: TxnId,
    ) -> Result<()> {
        if now_ms >= 0 && now_ms - self.last_flush_ms <= MAX_BUFFER_AGE_MS {
            return Ok(());
        }
        if now_ms > 0 {
            self.last_flush_ms = now_ms;
        }

        // The engine hands us whatever txn executed most recently, relevant
        // to this stream or not; feed the tracker whichever of it and the
        // open txn keeps ids moving forward.
        let txn = current_txn.max(self.tracker.open_txn());

        self.extend_chain(0)?;
        self.tracker.commit(self.uso, last_committed_txn, txn)?;
        self.drain_pending()
    }

    fn extend_chain(&mut self, min_length: usize) -> Result<()> {
        self.chain
            .extend(min_length, self.uso, self.generation, &self.signature)
    }

    /// Walk the pending queue, closing generations and releasing every
    /// block fully covered by the committed USO
    fn drain_pending(&mut self) -> Result<()> {
        loop {
            let (block_generation, starting_uso, end_uso) = match self.chain.pending.front() {
                Some(block) => (block.generation_id(), block.starting_uso(), block.end_uso()),
                None => break,
            };

            // A generation boundary closes the prior generation before any
            // of the new one's bytes are delivered.
            if let (Some(prev), Some(generation)) = (self.prev_block_generation, block_generation)
            {
                if generation > prev {
                    let mut eos = StreamBlock::new(0, starting_uso)?;
                    eos.set_generation_id(prev);
                    eos.set_signature(&self.signature);
                    eos.set_end_of_stream(true);
                    self.push_block(eos);
                }
            }
            self.prev_block_generation = block_generation;

            // Release only once the entire block is committed.
            if self.tracker.committed_uso() < end_uso {
                break;
            }
            if let Some(block) = self.chain.pending.pop_front() {
                self.push_block(block);
            }
        }
        Ok(())
    }

    /// Hand one block to the sink
    ///
    /// Data blocks transfer their bytes; empty end-of-stream blocks become
    /// data-less notifications; empty data blocks are dropped. Blocks are
    /// stamped on first use, so an unstamped block is empty and silent.
    fn push_block(&mut self, block: StreamBlock) {
        let Some(generation_id) = block.generation_id() else {
            return;
        };

        if block.offset() > 0 {
            tracing::debug!(
                generation_id,
                starting_uso = block.starting_uso(),
                length = block.offset(),
                end_of_stream = block.end_of_stream(),
                "pushing export block"
            );
            let end_of_stream = block.end_of_stream();
            let signature = block.signature().to_string();
            let buffer = block.into_buffer();
            self.sink.push_export_buffer(
                generation_id,
                self.partition_id,
                &signature,
                Some(buffer),
                false,
                end_of_stream,
            );
        } else if block.end_of_stream() {
            tracing::debug!(generation_id, "closing export generation");
            self.sink.push_export_buffer(
                generation_id,
                self.partition_id,
                block.signature(),
                None,
                false,
                true,
            );
        }
    }
}

/// Row size bounds for one tuple: (row header size, max total row size)
///
/// The row header is a 4-byte length prefix plus a null bitmap covering
/// metadata and table columns. Metadata is six 8-byte fields.
fn compute_row_size<T: ExportTuple>(tuple: &T) -> Result<(usize, usize)> {
    // round the column count up to the next multiple of 8, then to bytes
    let column_count = tuple.value_count() + METADATA_COLUMN_COUNT;
    let null_mask_bytes = ((column_count + 7) & !7) >> 3;
    let row_header_size = 4 + null_mask_bytes;

    let metadata_size = METADATA_COLUMN_COUNT * 8;

    let data_size = tuple.max_export_serialized_size();
    if data_size == 0 {
        return Err(StreamError::CorruptTuple);
    }

    Ok((row_header_size, row_header_size + metadata_size + data_size))
}
