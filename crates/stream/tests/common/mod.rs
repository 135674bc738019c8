//! Common fixtures for export stream integration tests
#![allow(dead_code)]

use outflow_stream::{
    set_null, CollectingSink, ExportStreamConfig, ExportTuple, ExportTupleStream, ExportWriter,
    PushedBuffer, Result, METADATA_COLUMN_COUNT,
};

pub const PARTITION_ID: i64 = 7;
pub const SITE_ID: i64 = 3;

/// A single test column value
#[derive(Debug, Clone)]
pub enum TestValue {
    Int(i64),
    Str(String),
    Null,
}

/// Tuple fixture serializing i64 and length-prefixed string columns
#[derive(Debug, Clone)]
pub struct TestTuple {
    pub values: Vec<TestValue>,
}

impl TestTuple {
    pub fn ints(values: &[i64]) -> Self {
        Self {
            values: values.iter().map(|&v| TestValue::Int(v)).collect(),
        }
    }
}

impl ExportTuple for TestTuple {
    fn value_count(&self) -> usize {
        self.values.len()
    }

    fn max_export_serialized_size(&self) -> usize {
        self.values
            .iter()
            .map(|value| match value {
                TestValue::Int(_) => 8,
                TestValue::Str(s) => 4 + s.len(),
                TestValue::Null => 0,
            })
            .sum()
    }

    fn serialize_to_export(
        &self,
        out: &mut ExportWriter<'_>,
        skip_columns: usize,
        null_bitmap: &mut [u8],
    ) -> Result<()> {
        for (i, value) in self.values.iter().enumerate() {
            match value {
                TestValue::Int(v) => out.write_i64(*v)?,
                TestValue::Str(s) => out.write_bytes(s.as_bytes())?,
                TestValue::Null => set_null(null_bitmap, skip_columns + i),
            }
        }
        Ok(())
    }
}

/// Exact on-wire size of a row holding `tuple` (the fixture serializes
/// every non-null column at its maximum size)
pub fn row_size(tuple: &TestTuple) -> usize {
    let column_count = tuple.value_count() + METADATA_COLUMN_COUNT;
    let null_mask_bytes = ((column_count + 7) & !7) >> 3;
    4 + null_mask_bytes + METADATA_COLUMN_COUNT * 8 + tuple.max_export_serialized_size()
}

/// Stream over a collecting sink; the returned sink handle observes pushes
pub fn new_stream(capacity: usize) -> (ExportTupleStream<CollectingSink>, CollectingSink) {
    let sink = CollectingSink::new();
    let config = ExportStreamConfig::new(PARTITION_ID, SITE_ID).with_default_capacity(capacity);
    let stream = ExportTupleStream::new(config, sink.clone()).unwrap();
    (stream, sink)
}

/// The `[starting_uso, end_uso)` ranges of the data blocks the sink saw
pub fn data_ranges(pushed: &[PushedBuffer]) -> Vec<(u64, u64)> {
    pushed
        .iter()
        .filter_map(|p| p.buffer.as_ref())
        .map(|b| (b.starting_uso, b.starting_uso + b.data.len() as u64))
        .collect()
}
