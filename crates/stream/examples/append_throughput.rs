//! Benchmark for appending 1 million tuples to the export stream
//!
//! Measures append throughput end to end: rows are serialized into blocks,
//! committed in batches, and drained through a channel sink.

use outflow_stream::{
    ChannelSink, ExportOp, ExportStreamConfig, ExportTuple, ExportTupleStream, ExportWriter,
    Result, TxnId,
};
use std::io::{self, Write};
use std::time::Instant;

/// Two-column bench tuple: an id and a short string payload
struct BenchTuple {
    id: i64,
    payload: String,
}

impl ExportTuple for BenchTuple {
    fn value_count(&self) -> usize {
        2
    }

    fn max_export_serialized_size(&self) -> usize {
        8 + 4 + self.payload.len()
    }

    fn serialize_to_export(
        &self,
        out: &mut ExportWriter<'_>,
        _skip_columns: usize,
        _null_bitmap: &mut [u8],
    ) -> Result<()> {
        out.write_i64(self.id)?;
        out.write_bytes(self.payload.as_bytes())
    }
}

fn main() {
    println!("=== 1 Million Append Benchmark ===\n");

    const NUM_APPENDS: usize = 1_000_000;
    const APPENDS_PER_TXN: usize = 100;
    const PROGRESS_INTERVAL: usize = 100_000;

    let (sink, mut receiver) = ChannelSink::new();
    let mut stream = ExportTupleStream::new(ExportStreamConfig::new(0, 0), sink)
        .expect("failed to create stream");
    stream
        .set_signature_and_generation("bench_table", 1)
        .expect("failed to configure stream");

    println!("Starting {} appends...", NUM_APPENDS);
    let start_time = Instant::now();

    for i in 0..NUM_APPENDS {
        let txn = TxnId::new((i / APPENDS_PER_TXN) as i64 + 2);
        let last_committed = TxnId::new((i / APPENDS_PER_TXN) as i64 + 1);

        let tuple = BenchTuple {
            id: i as i64,
            payload: format!("message_{}", i % 1000),
        };

        stream
            .append_tuple(
                last_committed,
                txn,
                i as i64,
                2_000_000_000 + i as i64,
                1,
                &tuple,
                ExportOp::Insert,
            )
            .expect("append failed");

        if (i + 1) % PROGRESS_INTERVAL == 0 {
            eprint!(".");
            io::stderr().flush().unwrap();
        }
    }

    // Seal and release whatever the last transactions left behind.
    let final_txn = TxnId::new((NUM_APPENDS / APPENDS_PER_TXN) as i64 + 2);
    stream
        .periodic_flush(-1, final_txn, final_txn)
        .expect("flush failed");

    let elapsed = start_time.elapsed();

    let mut blocks = 0u64;
    let mut bytes = 0u64;
    while let Ok(pushed) = receiver.try_recv() {
        blocks += 1;
        if let Some(buffer) = pushed.buffer {
            bytes += buffer.data.len() as u64;
        }
    }

    println!("\n\nAppended {} rows in {:.2?}", NUM_APPENDS, elapsed);
    println!(
        "Throughput: {:.0} appends/sec",
        NUM_APPENDS as f64 / elapsed.as_secs_f64()
    );
    println!("Sink received {} blocks, {} bytes", blocks, bytes);
}
