//! Integration tests for the export stream: append, commit, flush, rollback

mod common;

use common::{data_ranges, new_stream, row_size, TestTuple, TestValue, PARTITION_ID, SITE_ID};
use outflow_stream::{ExportOp, StreamError, TxnId};

#[test]
fn test_single_insert_committed_on_flush() {
    let (mut stream, sink) = new_stream(1024);
    let tuple = TestTuple::ints(&[42, 99]);
    let row = row_size(&tuple) as u64;

    let token = stream
        .append_tuple(TxnId::new(10), TxnId::new(11), 1, 1000, 5, &tuple, ExportOp::Insert)
        .unwrap();
    assert_eq!(token, 0);

    stream
        .periodic_flush(-1, TxnId::new(11), TxnId::new(11))
        .unwrap();

    let pushed = sink.pushed();
    assert_eq!(pushed.len(), 1, "exactly one block reaches the sink");

    let block = &pushed[0];
    assert_eq!(block.generation_id, 5);
    assert_eq!(block.partition_id, PARTITION_ID);
    assert!(!block.end_of_stream);
    assert!(!block.sync);

    let buffer = block.buffer.as_ref().expect("data block carries bytes");
    assert_eq!(buffer.starting_uso, 0);
    assert_eq!(buffer.data.len() as u64, row);
}

#[test]
fn test_row_wire_layout() {
    let (mut stream, sink) = new_stream(1024);
    let tuple = TestTuple {
        values: vec![
            TestValue::Int(0x0102030405060708),
            TestValue::Str("ab".to_string()),
        ],
    };
    // 8 columns -> 1 null byte; header 5; body 48 + 8 + 6; row 67
    assert_eq!(row_size(&tuple), 67);

    stream
        .append_tuple(TxnId::new(10), TxnId::new(11), 9, 1234, 5, &tuple, ExportOp::Insert)
        .unwrap();
    stream
        .periodic_flush(-1, TxnId::new(11), TxnId::new(11))
        .unwrap();

    let pushed = sink.pushed();
    let data = &pushed[0].buffer.as_ref().unwrap().data;

    let mut expected = Vec::new();
    expected.extend_from_slice(&63i32.to_be_bytes()); // row length, excluding the prefix
    expected.push(0x00); // null bitmap: every column present
    expected.extend_from_slice(&11i64.to_be_bytes()); // txn id
    expected.extend_from_slice(&1234i64.to_be_bytes()); // timestamp
    expected.extend_from_slice(&9i64.to_be_bytes()); // seq no
    expected.extend_from_slice(&PARTITION_ID.to_be_bytes());
    expected.extend_from_slice(&SITE_ID.to_be_bytes());
    expected.extend_from_slice(&1i64.to_be_bytes()); // insert tag
    expected.extend_from_slice(&0x0102030405060708i64.to_be_bytes());
    expected.extend_from_slice(&2i32.to_be_bytes());
    expected.extend_from_slice(b"ab");

    assert_eq!(data, &expected);
}

#[test]
fn test_null_column_sets_bitmap_bit() {
    let (mut stream, sink) = new_stream(1024);
    let tuple = TestTuple {
        values: vec![TestValue::Int(5), TestValue::Null],
    };
    // null table column writes nothing: body 48 + 8; row 61
    assert_eq!(row_size(&tuple), 61);

    stream
        .append_tuple(TxnId::new(10), TxnId::new(11), 1, 1000, 5, &tuple, ExportOp::Delete)
        .unwrap();
    stream
        .periodic_flush(-1, TxnId::new(11), TxnId::new(11))
        .unwrap();

    let pushed = sink.pushed();
    let data = &pushed[0].buffer.as_ref().unwrap().data;

    assert_eq!(data.len(), 61);
    assert_eq!(&data[..4], &57i32.to_be_bytes());
    // table column 1 is row column 7: high-to-low bit order in byte 0
    assert_eq!(data[4], 0x01);
    // delete operation tag
    assert_eq!(&data[45..53], &0i64.to_be_bytes());
}

#[test]
fn test_rollback_discards_uncommitted() {
    let (mut stream, sink) = new_stream(1024);
    let tuple = TestTuple::ints(&[42, 99]);

    let token = stream
        .append_tuple(TxnId::new(10), TxnId::new(11), 1, 1000, 5, &tuple, ExportOp::Insert)
        .unwrap();
    stream.rollback_to(token).unwrap();

    stream
        .periodic_flush(-1, TxnId::new(11), TxnId::new(11))
        .unwrap();

    assert!(sink.is_empty(), "rolled-back bytes never reach the sink");
    assert_eq!(stream.uso(), 0);
}

#[test]
fn test_rollback_then_reappend_matches_fresh_stream() {
    let a = TestTuple::ints(&[1, 2]);
    let b = TestTuple::ints(&[3, 4]);
    let c = TestTuple::ints(&[5, 6]);

    // append a, speculatively append b, roll b back, append c
    let (mut rolled, rolled_sink) = new_stream(1024);
    rolled
        .append_tuple(TxnId::new(10), TxnId::new(11), 1, 1000, 5, &a, ExportOp::Insert)
        .unwrap();
    let mark = rolled
        .append_tuple(TxnId::new(10), TxnId::new(11), 2, 1001, 5, &b, ExportOp::Insert)
        .unwrap();
    rolled.rollback_to(mark).unwrap();
    rolled
        .append_tuple(TxnId::new(10), TxnId::new(11), 3, 1002, 5, &c, ExportOp::Insert)
        .unwrap();
    rolled
        .periodic_flush(-1, TxnId::new(11), TxnId::new(11))
        .unwrap();

    // the same stream with b never appended
    let (mut fresh, fresh_sink) = new_stream(1024);
    fresh
        .append_tuple(TxnId::new(10), TxnId::new(11), 1, 1000, 5, &a, ExportOp::Insert)
        .unwrap();
    fresh
        .append_tuple(TxnId::new(10), TxnId::new(11), 3, 1002, 5, &c, ExportOp::Insert)
        .unwrap();
    fresh
        .periodic_flush(-1, TxnId::new(11), TxnId::new(11))
        .unwrap();

    assert_eq!(rolled_sink.pushed(), fresh_sink.pushed());
}

#[test]
fn test_txn_moving_backwards_is_fatal() {
    let (mut stream, _sink) = new_stream(1024);
    let tuple = TestTuple::ints(&[1, 2]);

    stream
        .append_tuple(TxnId::new(10), TxnId::new(12), 1, 1000, 5, &tuple, ExportOp::Insert)
        .unwrap();
    let err = stream
        .append_tuple(TxnId::new(10), TxnId::new(11), 2, 1001, 5, &tuple, ExportOp::Insert)
        .unwrap_err();

    assert_eq!(
        err,
        StreamError::TxnMovingBackwards {
            open: TxnId::new(12),
            current: TxnId::new(11),
        }
    );
}

#[test]
fn test_block_boundary_split() {
    let tuple = TestTuple::ints(&[1, 2]);
    let row = row_size(&tuple) as u64;
    // two rows cannot share one block
    let (mut stream, sink) = new_stream(128);
    assert!(2 * row > 128);

    stream
        .append_tuple(TxnId::new(10), TxnId::new(11), 1, 1000, 5, &tuple, ExportOp::Insert)
        .unwrap();
    stream
        .append_tuple(TxnId::new(10), TxnId::new(11), 2, 1001, 5, &tuple, ExportOp::Insert)
        .unwrap();
    stream
        .periodic_flush(-1, TxnId::new(11), TxnId::new(11))
        .unwrap();

    let ranges = data_ranges(&sink.pushed());
    assert_eq!(ranges, vec![(0, row), (row, 2 * row)]);
}

#[test]
fn test_aged_flush_emits_nothing() {
    let (mut stream, sink) = new_stream(1024);

    stream
        .periodic_flush(0, TxnId::new(0), TxnId::new(0))
        .unwrap();
    stream
        .periodic_flush(4001, TxnId::new(0), TxnId::new(0))
        .unwrap();

    assert!(sink.is_empty(), "empty non-eos blocks are dropped");
}

#[test]
fn test_flush_age_trigger() {
    let (mut stream, sink) = new_stream(1024);
    let tuple = TestTuple::ints(&[1, 2]);

    stream
        .append_tuple(TxnId::new(10), TxnId::new(11), 1, 1000, 5, &tuple, ExportOp::Insert)
        .unwrap();

    // too young: nothing sealed, nothing pushed
    stream
        .periodic_flush(1000, TxnId::new(11), TxnId::new(11))
        .unwrap();
    assert!(sink.is_empty());

    // past MAX_BUFFER_AGE_MS: sealed, committed, pushed
    stream
        .periodic_flush(5001, TxnId::new(11), TxnId::new(11))
        .unwrap();
    assert_eq!(data_ranges(&sink.pushed()).len(), 1);
}

#[test]
fn test_partial_commit_holds_block() {
    let (mut stream, sink) = new_stream(1024);
    let tuple = TestTuple::ints(&[1, 2]);
    let row = row_size(&tuple) as u64;

    stream
        .append_tuple(TxnId::new(10), TxnId::new(11), 1, 1000, 5, &tuple, ExportOp::Insert)
        .unwrap();

    // txn 11 is still open: its block must not be released
    stream
        .periodic_flush(-1, TxnId::new(10), TxnId::new(11))
        .unwrap();
    assert!(sink.is_empty(), "partial commit never releases bytes");

    // the watermark reaches txn 11
    stream
        .periodic_flush(-1, TxnId::new(11), TxnId::new(11))
        .unwrap();
    assert_eq!(data_ranges(&sink.pushed()), vec![(0, row)]);
}

#[test]
fn test_no_redelivery_across_flushes() {
    let (mut stream, sink) = new_stream(1024);
    let tuple = TestTuple::ints(&[1, 2]);
    let row = row_size(&tuple) as u64;

    for (txn, last) in [(11i64, 10i64), (12, 11), (13, 12)] {
        stream
            .append_tuple(TxnId::new(last), TxnId::new(txn), 1, 1000, 5, &tuple, ExportOp::Insert)
            .unwrap();
    }
    stream
        .periodic_flush(-1, TxnId::new(13), TxnId::new(13))
        .unwrap();

    for (txn, last) in [(14i64, 13i64), (15, 14)] {
        stream
            .append_tuple(TxnId::new(last), TxnId::new(txn), 1, 1000, 5, &tuple, ExportOp::Insert)
            .unwrap();
    }
    stream
        .periodic_flush(-1, TxnId::new(15), TxnId::new(15))
        .unwrap();

    let ranges = data_ranges(&sink.pushed());
    assert_eq!(ranges, vec![(0, 3 * row), (3 * row, 5 * row)]);

    // further flushes deliver no byte range twice
    stream
        .periodic_flush(-1, TxnId::new(15), TxnId::new(15))
        .unwrap();
    stream
        .periodic_flush(-1, TxnId::new(15), TxnId::new(15))
        .unwrap();
    assert_eq!(data_ranges(&sink.pushed()).len(), 2);
}
