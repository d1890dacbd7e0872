//! SQLite sink tests through the public setup path
#![cfg(feature = "sqlite")]

use rusqlite::Connection;
use serde_json::json;
use sinklog::{Level, LoggerHandle, SinkKind};

#[test]
fn test_rows_follow_insertion_order() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("db/log.db");
    let logger = LoggerHandle::setup(&json!({
        "sqlite": {"db_config": {"db_path": db_path.to_string_lossy(), "table": "app_logs"}}
    }))
    .unwrap();
    assert_eq!(logger.sinks()[0].sink.kind(), SinkKind::Sqlite);
    assert_eq!(logger.min_level(), Some(Level::Info));

    logger.debug(sinklog::SourceLocation::new("a.py", "skip", 1), "below threshold");
    logger.info(sinklog::SourceLocation::new("a.py", "first", 10), "one");
    logger.error(sinklog::SourceLocation::new("b.py", "second", 20), "two");

    let conn = Connection::open(&db_path).unwrap();
    let mut stmt = conn
        .prepare("SELECT filename, funcName, lineno, level, message, created FROM app_logs ORDER BY id")
        .unwrap();
    let rows: Vec<(String, String, i64, i64, String, String)> = stmt
        .query_map([], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?))
        })
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].0.as_str(), rows[0].1.as_str(), rows[0].2, rows[0].3), ("a.py", "first", 10, 20));
    assert_eq!((rows[1].0.as_str(), rows[1].1.as_str(), rows[1].2, rows[1].3), ("b.py", "second", 20, 40));
    assert_eq!(rows[1].4, "two");
    assert!(rows[0].5 <= rows[1].5);
}

#[test]
fn test_existing_table_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("log.db");
    let config = json!({"sqlite": {"db_config": {"db_path": db_path.to_string_lossy()}}});

    for round in 0..2 {
        let logger = LoggerHandle::setup(&config).unwrap();
        sinklog::info!(logger, "round {}", round);
    }

    let conn = Connection::open(&db_path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM logs", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn test_exception_text_stored_with_message() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("log.db");
    let logger = LoggerHandle::setup(&json!({
        "sqlite": {"db_config": {"db_path": db_path.to_string_lossy()}}
    }))
    .unwrap();

    let _ = sinklog::guarded!(logger).call(|| Err::<(), _>("bad input"));

    let conn = Connection::open(&db_path).unwrap();
    let message: String = conn
        .query_row("SELECT message FROM logs", [], |r| r.get(0))
        .unwrap();
    assert!(message.starts_with("test_exception_text_stored_with_message failed: bad input\n"));
}
