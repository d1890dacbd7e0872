//! Configuration resolver tests
use serde_json::json;
use sinklog::config::*;
use sinklog::error::{ConfigError, Error};
use sinklog::{Level, SinkKind};
use std::path::PathBuf;

// ==================== Template Tests ====================

#[test]
fn test_template_has_every_sink() {
    let template = LoggerConfiguration::template();
    let kinds: Vec<SinkKind> = template.active_sinks().into_iter().map(|(k, _)| k).collect();
    assert_eq!(kinds, SinkKind::ALL.to_vec());
}

#[test]
fn test_template_defaults() {
    let template = LoggerConfiguration::template();
    assert_eq!(template.console.unwrap().alert_level, Level::Debug);
    assert_eq!(template.file.unwrap().file_path, "log/log.log");
    let rotating = template.rotating.unwrap();
    assert_eq!(rotating.max_bytes, 1024 * 1024);
    assert_eq!(rotating.backup_count, 5);
    assert_eq!(template.sqlite.unwrap().db_config.table, "logs");
    assert_eq!(template.mariadb.unwrap().db_config.port, 3306);
    assert_eq!(template.discord.unwrap().alert_level, Level::Warning);
}

// ==================== Resolve Tests ====================

#[test]
fn test_list_selector_console_only() {
    let config = LoggerConfiguration::resolve(&json!(["console"])).unwrap();
    assert_eq!(config.active_sinks(), vec![(SinkKind::Console, Level::Debug)]);
}

#[test]
fn test_empty_mapping_activates_nothing() {
    let config = LoggerConfiguration::resolve(&json!({})).unwrap();
    assert!(config.is_empty());
}

#[test]
fn test_partial_mapping_keeps_template_defaults() {
    let config = LoggerConfiguration::resolve(&json!({"discord": {"alert_level": "ERROR"}})).unwrap();
    let discord = config.discord.unwrap();
    assert_eq!(discord.alert_level, Level::Error);
    assert_eq!(discord.webhook_url, "");
    assert_eq!(discord.username, "");
    assert!(config.console.is_none());
}

#[test]
fn test_nested_partial_merge() {
    let config = LoggerConfiguration::resolve(&json!({
        "mariadb": {"db_config": {"host": "db.internal", "port": 3307}}
    }))
    .unwrap();
    let mariadb = config.mariadb.unwrap();
    assert_eq!(mariadb.alert_level, Level::Info);
    assert_eq!(mariadb.db_config.host, "db.internal");
    assert_eq!(mariadb.db_config.port, 3307);
    assert_eq!(mariadb.db_config.table, "logs");
}

#[test]
fn test_numeric_alert_level() {
    let config = LoggerConfiguration::resolve(&json!({"file": {"alert_level": 40}})).unwrap();
    assert_eq!(config.file.unwrap().alert_level, Level::Error);
}

#[test]
fn test_unknown_top_level_key_ignored() {
    let config = LoggerConfiguration::resolve(&json!({"console": {}, "syslog": {}})).unwrap();
    assert_eq!(config.active_sinks().len(), 1);
}

#[test]
fn test_unknown_sink_in_list() {
    let err = LoggerConfiguration::resolve(&json!(["console", "syslog"])).unwrap_err();
    match err {
        Error::Config(ConfigError::UnknownSink { name, valid }) => {
            assert_eq!(name, "syslog");
            assert_eq!(valid.len(), 8);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_invalid_level_name() {
    let err = LoggerConfiguration::resolve(&json!({"console": {"alert_level": "LOUD"}})).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::InvalidLogLevel { .. })));
}

#[test]
fn test_invalid_when() {
    let err = LoggerConfiguration::resolve(&json!({"timed_rotating": {"when": "fortnight"}})).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_scalar_input_rejected() {
    let err = LoggerConfiguration::resolve(&json!("console")).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidInput { found: "a string" })
    ));
}

// ==================== Merge Tests ====================

#[test]
fn test_merge_is_idempotent() {
    let template = LoggerConfiguration::template_tree().unwrap();
    let partial = json!({"rotating": {"max_bytes": 10}});
    let once = merge_tree(&template, &partial).unwrap();
    let twice = merge_tree(&once, &partial).unwrap();
    assert_eq!(once, twice);
    assert_eq!(once["rotating"]["backup_count"], 5);
}

// ==================== File Loading Tests ====================

#[test]
fn test_from_file_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sinklog.toml");
    std::fs::write(
        &path,
        r#"
[rotating]
alert_level = "warning"
max_bytes = 2048

[sqlite.db_config]
table = "app_logs"
"#,
    )
    .unwrap();

    let config = LoggerConfiguration::from_file(&path).unwrap();
    let rotating = config.rotating.unwrap();
    assert_eq!(rotating.alert_level, Level::Warning);
    assert_eq!(rotating.max_bytes, 2048);
    let sqlite = config.sqlite.unwrap();
    assert_eq!(sqlite.db_config.table, "app_logs");
    assert_eq!(sqlite.db_config.db_path, "db/log.db");
}

#[test]
fn test_from_file_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logger.json");
    std::fs::write(&path, r#"{"slack": {"service_name": "billing"}}"#).unwrap();

    let config = LoggerConfiguration::from_file(&path).unwrap();
    assert_eq!(config.slack.unwrap().service_name, "billing");
}

#[test]
fn test_from_file_missing() {
    let err = LoggerConfiguration::from_file("does/not/exist.toml").unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::NotFound(_))));
}

#[test]
fn test_from_str_parse_failure() {
    let err = LoggerConfiguration::from_str("[console", ConfigFormat::Toml, PathBuf::from("x.toml"))
        .unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ParseFailed { .. })));
}

#[test]
fn test_format_from_path() {
    assert_eq!(ConfigFormat::from_path(std::path::Path::new("a.JSON")), ConfigFormat::Json);
    assert_eq!(ConfigFormat::from_path(std::path::Path::new("a.toml")), ConfigFormat::Toml);
    assert_eq!(ConfigFormat::from_path(std::path::Path::new("a")), ConfigFormat::Toml);
}
