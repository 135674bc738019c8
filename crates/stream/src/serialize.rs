//! Export row serialization
//!
//! Bounds-checked writes into a raw buffer. All multi-byte integers go out
//! in network (big-endian) byte order; variable-length payloads are
//! length-prefixed with an i32.

use crate::error::{Result, StreamError};

/// Writer positioned over the body region of an export row
pub struct ExportWriter<'a> {
    buf: &'a mut [u8],
    position: usize,
}

impl<'a> ExportWriter<'a> {
    /// Wrap a buffer; writes start at its first byte
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, position: 0 }
    }

    /// Bytes written so far
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left before the buffer is full
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.position
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.remaining() {
            return Err(StreamError::BufferOverrun {
                required: bytes.len(),
                remaining: self.remaining(),
            });
        }
        self.buf[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        Ok(())
    }

    /// Write a big-endian i64
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_raw(&value.to_be_bytes())
    }

    /// Write a big-endian i32
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_raw(&value.to_be_bytes())
    }

    /// Write a length-prefixed byte payload: big-endian i32 length, then the bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_i32(bytes.len() as i32)?;
        self.write_raw(bytes)
    }
}
