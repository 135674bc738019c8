//! Stream blocks - the unit of handoff to the export sink
//!
//! A block is a fixed-capacity byte buffer plus framing metadata: the USO of
//! its first byte, how many bytes have been consumed, the generation and
//! table signature of its contents, and an end-of-stream flag. The chain
//! owns a block until it is either dropped or handed off; handoff moves the
//! backing bytes out as an [`ExportBuffer`] and drops the metadata.

use crate::error::{Result, StreamError};

/// A capacity-bounded export buffer with framing metadata
#[derive(Debug)]
pub struct StreamBlock {
    data: Box<[u8]>,
    starting_uso: u64,
    offset: usize,
    generation_id: Option<i64>,
    signature: String,
    end_of_stream: bool,
}

/// The byte-owning handle released to the sink when a block is pushed
///
/// `data` is exactly the consumed prefix of the block; the range it covers
/// is `[starting_uso, starting_uso + data.len())`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBuffer {
    /// USO of the first byte in `data`
    pub starting_uso: u64,
    /// The block's bytes, truncated to the consumed length
    pub data: Vec<u8>,
}

impl StreamBlock {
    /// Allocate a block of `capacity` bytes starting at `starting_uso`
    pub(crate) fn new(capacity: usize, starting_uso: u64) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| StreamError::AllocationFailure { bytes: capacity })?;
        data.resize(capacity, 0);

        Ok(Self {
            data: data.into_boxed_slice(),
            starting_uso,
            offset: 0,
            generation_id: None,
            signature: String::new(),
            end_of_stream: false,
        })
    }

    /// USO of the block's first byte
    pub fn starting_uso(&self) -> u64 {
        self.starting_uso
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// USO one past the block's last consumed byte
    pub fn end_uso(&self) -> u64 {
        self.starting_uso + self.offset as u64
    }

    /// Capacity left for further appends
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Generation of the block's contents, if stamped
    pub fn generation_id(&self) -> Option<i64> {
        self.generation_id
    }

    /// Identity of the exported table
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Whether this block closes its generation
    pub fn end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    /// The unconsumed tail of the buffer, for the appender to write into
    pub(crate) fn mutable_data(&mut self) -> &mut [u8] {
        &mut self.data[self.offset..]
    }

    /// Record `bytes` more bytes as consumed
    pub(crate) fn consumed(&mut self, bytes: usize) -> Result<()> {
        if bytes > self.remaining() {
            return Err(StreamError::BufferOverrun {
                required: bytes,
                remaining: self.remaining(),
            });
        }
        self.offset += bytes;
        Ok(())
    }

    /// Cut the block back so it ends at stream offset `mark`
    ///
    /// Called at most once in a block's lifetime, during rollback.
    pub(crate) fn truncate_to(&mut self, mark: u64) {
        self.offset = mark.saturating_sub(self.starting_uso) as usize;
    }

    pub(crate) fn set_generation_id(&mut self, generation_id: i64) {
        self.generation_id = Some(generation_id);
    }

    pub(crate) fn set_signature(&mut self, signature: &str) {
        self.signature = signature.to_string();
    }

    pub(crate) fn set_end_of_stream(&mut self, end_of_stream: bool) {
        self.end_of_stream = end_of_stream;
    }

    /// Move the backing bytes out for handoff, dropping the metadata
    pub(crate) fn into_buffer(self) -> ExportBuffer {
        let mut data = self.data.into_vec();
        data.truncate(self.offset);
        ExportBuffer {
            starting_uso: self.starting_uso,
            data,
        }
    }
}
