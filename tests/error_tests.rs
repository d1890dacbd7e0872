//! Error formatting tests
use sinklog::error::*;
use sinklog::{SinkKind, config_error, delivery_error, sink_error};
use std::path::PathBuf;

#[test]
fn test_sink_activation_display_includes_source() {
    let err = config_error!(SinkActivation {
        sink: SinkKind::Slack,
        source: sink_error!(MissingSetting {
            sink: SinkKind::Slack,
            field: "webhook_url",
        }),
    });
    assert_eq!(
        err.to_string(),
        "Configuration error: Failed to activate slack sink: slack: required setting 'webhook_url' is missing or empty"
    );
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_invalid_level_lists_valid_values() {
    let err = "LOUD".parse::<sinklog::Level>().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid log level 'LOUD', valid values: DEBUG, INFO, WARNING, ERROR, CRITICAL"
    );
}

#[test]
fn test_delivery_errors() {
    let err = delivery_error!(Timeout {
        sink: SinkKind::Mariadb,
        seconds: 30,
    });
    assert_eq!(err.to_string(), "mariadb: timed out after 30s");

    let err = delivery_error!(Write {
        path: PathBuf::from("log/log.log"),
        reason: "No space left on device".to_string(),
    });
    assert_eq!(
        Error::from(err).to_string(),
        "Delivery error: Failed to write log/log.log: No space left on device"
    );
}

#[test]
fn test_query_error_converts() {
    let err: Error = QueryError::InvalidIdentifier {
        name: "bad name".to_string(),
    }
    .into();
    assert_eq!(err.to_string(), "Query error: 'bad name' is not a valid SQL identifier");
}

#[test]
fn test_io_error_converts() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: Error = io.into();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_error_macros_accept_shorthand_fields() {
    let field = "table";
    let err = sink_error!(MissingSetting {
        sink: SinkKind::Sqlite,
        field,
    });
    assert_eq!(err.to_string(), "sqlite: required setting 'table' is missing or empty");

    let reason = "Lock wait timeout exceeded".to_string();
    let err = delivery_error!(Database {
        sink: SinkKind::Mariadb,
        reason,
    });
    assert!(err.to_string().contains("Lock wait timeout exceeded"));
}
