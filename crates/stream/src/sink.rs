//! The export sink - the out-of-engine consumer of finished blocks
//!
//! The sink is the only boundary the stream crosses: `push_export_buffer`
//! enqueues and returns, and the receiving side owns the bytes from then
//! on. Two implementations ship with the crate: [`ChannelSink`] forwards
//! blocks onto a tokio channel for another thread to drain, and
//! [`CollectingSink`] records them in memory for tests and tooling.

use crate::block::ExportBuffer;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Consumer of committed export blocks
///
/// `sync` is carried for interface compatibility with the top end; this
/// core always passes `false`.
pub trait ExportSink {
    /// Take ownership of a finished block
    ///
    /// `buffer` is `None` for a data-less end-of-stream notification.
    fn push_export_buffer(
        &mut self,
        generation_id: i64,
        partition_id: i64,
        signature: &str,
        buffer: Option<ExportBuffer>,
        sync: bool,
        end_of_stream: bool,
    );
}

/// One `push_export_buffer` call, as observed by the sink side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushedBuffer {
    pub generation_id: i64,
    pub partition_id: i64,
    pub signature: String,
    pub buffer: Option<ExportBuffer>,
    pub sync: bool,
    pub end_of_stream: bool,
}

/// Sink that forwards blocks onto an unbounded channel
///
/// The receiver half lives on the consumer thread. A send to a closed
/// channel is ignored; the consumer going away must not fail the partition's
/// execution thread.
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<PushedBuffer>,
}

impl ChannelSink {
    /// Create a sink and the receiver to drain it from
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PushedBuffer>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ExportSink for ChannelSink {
    fn push_export_buffer(
        &mut self,
        generation_id: i64,
        partition_id: i64,
        signature: &str,
        buffer: Option<ExportBuffer>,
        sync: bool,
        end_of_stream: bool,
    ) {
        let _ = self.sender.send(PushedBuffer {
            generation_id,
            partition_id,
            signature: signature.to_string(),
            buffer,
            sync,
            end_of_stream,
        });
    }
}

/// In-memory sink recording every pushed block
///
/// Clones share the same storage, so a test can keep one handle and hand
/// the other to the stream.
#[derive(Clone, Default)]
pub struct CollectingSink {
    pushed: Arc<Mutex<Vec<PushedBuffer>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything pushed so far
    pub fn pushed(&self) -> Vec<PushedBuffer> {
        self.pushed.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.pushed.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pushed.lock().is_empty()
    }
}

impl ExportSink for CollectingSink {
    fn push_export_buffer(
        &mut self,
        generation_id: i64,
        partition_id: i64,
        signature: &str,
        buffer: Option<ExportBuffer>,
        sync: bool,
        end_of_stream: bool,
    ) {
        self.pushed.lock().push(PushedBuffer {
            generation_id,
            partition_id,
            signature: signature.to_string(),
            buffer,
            sync,
            end_of_stream,
        });
    }
}
