//! End-to-end reads against a scripted in-memory service.
//!
//! Each test wires a `MemoryTransport` with an overview, an availability
//! window and a bulk handler, then drives `QsetClient` and checks both the
//! events it produced and the requests it made.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::NaiveDate;
use futures::StreamExt;
use qset_core::{
    api, DecodeCause, MemoryTransport, Params, Progress, QsetClient, QsetError, Query, ReadEvent,
    RetryConfig, SubRange, TransportError, Value,
};
use qset_codec::{CodecError, Map};

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn overview(kind: &str, width: &str) -> Bytes {
    Bytes::from(format!(
        r#"{{"type": "{kind}", "columns": [["ticker", "str"], ["date", "date"], ["close", "decimal"]], "max_request_range": "{width}"}}"#
    ))
}

fn window(min: &str, max: &str) -> Bytes {
    Bytes::from(format!(r#"{{"minStartRange": "{min}", "maxStartRange": "{max}"}}"#))
}

fn envelope(rows: Vec<Vec<Value>>) -> Bytes {
    let mut m = Map::new();
    m.insert("total".into(), Value::from(rows.len() as i64));
    m.insert(
        "values".into(),
        Value::Array(rows.into_iter().map(Value::Array).collect()),
    );
    Bytes::from(qset_codec::encode(&Value::Map(m)).unwrap())
}

/// One row per sub-range, dated at its start, for each requested column.
fn row_for(params: &Params) -> Vec<Value> {
    let start = params.get("start").unwrap();
    let date = NaiveDate::parse_from_str(&start[..10], "%Y-%m-%d").unwrap();
    params
        .get_all("columns")
        .into_iter()
        .map(|c| match c {
            "ticker" => Value::from("AAPL"),
            "date" => Value::Date(date),
            _ => Value::Decimal("101.2500".parse().unwrap()),
        })
        .collect()
}

fn service(width: &str, min: &str, max: &str) -> Arc<MemoryTransport> {
    let t = Arc::new(MemoryTransport::new());
    let ov = overview("asset", width);
    let win = window(min, max);
    t.route(api::DATASET_OVERVIEW, move |_| Ok(ov.clone()));
    t.route(api::ASSET_DATASET_RANGE, move |_| Ok(win.clone()));
    t.route(api::ASSET_DATASET, |p| Ok(envelope(vec![row_for(p)])));
    t
}

fn client(t: &Arc<MemoryTransport>) -> QsetClient<Arc<MemoryTransport>> {
    QsetClient::new(Arc::clone(t), RetryConfig::immediate(3))
}

fn bulk_windows(t: &MemoryTransport) -> Vec<(String, String)> {
    t.calls()
        .into_iter()
        .filter(|c| c.path == api::ASSET_DATASET)
        .map(|c| {
            (
                c.params.get("start").unwrap().to_string(),
                c.params.get("end").unwrap().to_string(),
            )
        })
        .collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn query_is_clamped_to_available_window() {
    let t = service("31d", "2020-06-01T00:00:00", "2021-01-01T00:00:00");
    let query = Query::parse("2019-01-01", "2030-01-01").unwrap();
    let table = client(&t).get_dataset("prices", query).await.unwrap();

    let windows = bulk_windows(&t);
    assert_eq!(windows.len(), 7);
    assert_eq!(windows[0].0, "2020-06-01T00:00:00");
    assert_eq!(windows[6].1, "2021-01-01T00:00:00");
    assert!(windows.iter().all(|(s, _)| s.as_str() >= "2020-06-01"));
    assert_eq!(table.len(), 7);
}

#[tokio::test]
async fn calendar_month_chunks_are_aligned() {
    let t = service("31d", "2000-01-01", "2100-01-01");
    let query = Query::parse("2020-01-15", "2020-03-25").unwrap();
    client(&t).get_dataset("prices", query).await.unwrap();

    assert_eq!(
        bulk_windows(&t),
        vec![
            ("2020-01-15T00:00:00".into(), "2020-02-01T00:00:00".into()),
            ("2020-02-01T00:00:00".into(), "2020-03-01T00:00:00".into()),
            ("2020-03-01T00:00:00".into(), "2020-03-25T00:00:00".into()),
        ]
    );
}

#[tokio::test]
async fn fixed_width_chunks_truncate_the_last_one() {
    let t = service("7d", "2000-01-01", "2100-01-01");
    let query = Query::parse("2020-01-01", "2020-01-20").unwrap();
    client(&t).get_dataset("prices", query).await.unwrap();

    let windows = bulk_windows(&t);
    assert_eq!(windows.len(), 3);
    assert_eq!(windows[2], ("2020-01-15T00:00:00".into(), "2020-01-20T00:00:00".into()));
}

#[tokio::test]
async fn columns_come_first_and_exactly_once() {
    let t = service("31d", "2000-01-01", "2100-01-01");
    let query = Query::parse("2020-01-01", "2020-04-01")
        .unwrap()
        .with_columns(["close", "ticker"]);
    let events: Vec<_> = client(&t)
        .iter_dataset("prices", query)
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(events.len(), 4);
    assert_eq!(events[0], ReadEvent::Columns(vec!["close".into(), "ticker".into()]));
    assert!(events[1..].iter().all(|e| matches!(e, ReadEvent::Values(_))));

    // requested columns are forwarded in order
    let bulk = t.calls().into_iter().find(|c| c.path == api::ASSET_DATASET).unwrap();
    assert_eq!(bulk.params.get_all("columns"), vec!["close", "ticker"]);
}

#[tokio::test]
async fn empty_chunks_are_skipped() {
    let t = service("31d", "2000-01-01", "2100-01-01");
    t.route(api::ASSET_DATASET, |p| {
        if p.get("start") == Some("2020-02-01T00:00:00") {
            Ok(envelope(vec![]))
        } else {
            Ok(envelope(vec![row_for(p)]))
        }
    });
    let query = Query::parse("2020-01-01", "2020-04-01").unwrap();
    let events: Vec<_> = client(&t)
        .iter_dataset("prices", query)
        .map(Result::unwrap)
        .collect()
        .await;

    // columns + January + March
    assert_eq!(events.len(), 3);
    assert_eq!(t.call_count(api::ASSET_DATASET), 3);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let t = service("31d", "2000-01-01", "2100-01-01");
    t.enqueue(api::ASSET_DATASET, Err(TransportError::Status { status: 502, body: "bad gateway".into() }));
    t.enqueue(api::ASSET_DATASET, Err(TransportError::Timeout { ms: 30_000 }));
    let query = Query::parse("2020-01-01", "2020-02-01").unwrap();
    let table = client(&t).get_dataset("prices", query).await.unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(t.call_count(api::ASSET_DATASET), 3);
}

#[tokio::test]
async fn exhausted_retries_end_the_read() {
    let t = service("31d", "2000-01-01", "2100-01-01");
    t.route(api::ASSET_DATASET, |_| Err(TransportError::Http("connection reset".into())));
    let query = Query::parse("2020-01-01", "2020-06-01").unwrap();
    let events: Vec<_> = client(&t).iter_dataset("prices", query).collect().await;

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], Ok(ReadEvent::Columns(_))));
    match &events[1] {
        Err(QsetError::Transport { attempts, path, .. }) => {
            assert_eq!(*attempts, 3);
            assert_eq!(path, api::ASSET_DATASET);
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    // later sub-ranges were never requested
    assert_eq!(t.call_count(api::ASSET_DATASET), 3);
}

#[tokio::test]
async fn rejected_requests_are_not_retried() {
    let t = service("31d", "2000-01-01", "2100-01-01");
    t.route(api::DATASET_OVERVIEW, |_| {
        Err(TransportError::Status { status: 403, body: "invalid api key".into() })
    });
    let query = Query::parse("2020-01-01", "2020-02-01").unwrap();
    let err = client(&t).get_dataset("prices", query).await.unwrap_err();

    assert!(matches!(err, QsetError::Rejected { status: 403, .. }));
    assert_eq!(t.calls().len(), 1);
}

#[tokio::test]
async fn unsupported_kind_stops_before_range_lookup() {
    let t = service("31d", "2000-01-01", "2100-01-01");
    let ov = overview("field", "1d");
    t.route(api::DATASET_OVERVIEW, move |_| Ok(ov.clone()));
    let query = Query::parse("2020-01-01", "2020-02-01").unwrap();
    let err = client(&t).get_dataset("weather", query).await.unwrap_err();

    assert!(matches!(err, QsetError::UnsupportedDatasetKind { .. }));
    assert_eq!(t.call_count(api::ASSET_DATASET_RANGE), 0);
}

#[tokio::test]
async fn undecodable_chunk_keeps_payload() {
    let t = service("31d", "2000-01-01", "2100-01-01");
    t.route(api::ASSET_DATASET, |_| Ok(Bytes::from_static(&[0xd4, 0x09, 0x00])));
    let query = Query::parse("2020-01-01", "2020-02-01").unwrap();
    let err = client(&t).get_dataset("prices", query).await.unwrap_err();

    match err {
        QsetError::Decode { payload, cause, .. } => {
            assert!(matches!(cause, DecodeCause::Codec(CodecError::UnknownExtension { tag: 9 })));
            assert_eq!(&payload[..], &[0xd4, 0x09, 0x00]);
        }
        other => panic!("expected decode error, got {other:?}"),
    }
}

fn bulk_body(entries: Vec<(&str, Value)>) -> Bytes {
    let mut m = Map::new();
    for (k, v) in entries {
        m.insert(k.into(), v);
    }
    Bytes::from(qset_codec::encode(&Value::Map(m)).unwrap())
}

async fn read_with_bulk_body(body: Bytes) -> QsetError {
    let t = service("31d", "2000-01-01", "2100-01-01");
    t.route(api::ASSET_DATASET, move |_| Ok(body.clone()));
    let query = Query::parse("2020-01-01", "2020-02-01").unwrap().with_columns(["ticker"]);
    client(&t).get_dataset("prices", query).await.unwrap_err()
}

#[tokio::test]
async fn malformed_chunks_are_decode_errors() {
    let row = || Value::Array(vec![Value::Array(vec![Value::from("AAPL")])]);
    let cases = vec![
        ("missing 'values'", bulk_body(vec![("rows", row())])),
        ("missing 'total'", bulk_body(vec![("values", row())])),
        ("'values' is a nil", bulk_body(vec![("total", Value::from(0i64)), ("values", Value::Nil)])),
        ("'total' is 0 but 1 rows", bulk_body(vec![("total", Value::from(0i64)), ("values", row())])),
    ];

    for (expected, body) in cases {
        let len = body.len();
        match read_with_bulk_body(body).await {
            QsetError::Decode { cause: DecodeCause::Protocol(reason), payload, .. } => {
                assert!(reason.contains(expected), "{reason} should mention {expected}");
                assert_eq!(payload.len(), len);
            }
            other => panic!("expected decode error for {expected}, got {other:?}"),
        }
    }
}

#[derive(Default)]
struct Recorded {
    total: Option<usize>,
    advanced: Vec<SubRange>,
    finished: bool,
}

struct RecordingProgress(Arc<Mutex<Recorded>>);

impl Progress for RecordingProgress {
    fn start(&mut self, _label: &str, total: usize) {
        self.0.lock().unwrap().total = Some(total);
    }

    fn advance(&mut self, range: &SubRange) {
        self.0.lock().unwrap().advanced.push(*range);
    }

    fn finish(&mut self) {
        self.0.lock().unwrap().finished = true;
    }
}

#[tokio::test]
async fn progress_sees_every_sub_range() {
    let t = service("31d", "2000-01-01", "2100-01-01");
    t.route(api::ASSET_DATASET, |_| Ok(envelope(vec![])));
    let seen = Arc::new(Mutex::new(Recorded::default()));
    let handle = Arc::clone(&seen);
    let client = client(&t).with_progress(move |_| {
        Box::new(RecordingProgress(Arc::clone(&handle))) as Box<dyn Progress>
    });

    let query = Query::parse("2020-01-15", "2020-03-25").unwrap();
    let table = client.get_dataset("prices", query).await.unwrap();
    assert!(table.is_empty());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.total, Some(3));
    assert_eq!(seen.advanced.len(), 3);
    assert!(seen.finished);
}
