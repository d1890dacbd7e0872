use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::sink::SinkKind;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration related error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Sink initialization error
    #[error("Sink initialization error: {0}")]
    Sink(#[from] SinkError),

    /// Record delivery error
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// SQL generation error
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// Refusing to overwrite an existing file
    #[error("Configuration file already exists: {path} (use --force to overwrite)")]
    AlreadyExists { path: PathBuf },

    /// Configuration file parse failed
    #[error("Failed to parse configuration file {path}: {reason}")]
    ParseFailed { path: PathBuf, reason: String },

    /// Input is neither a list of sink names nor a mapping
    #[error("Logger configuration must be a list of sink names or a mapping, got {found}")]
    InvalidInput { found: &'static str },

    /// Sink kind not present in the template
    #[error("Unknown sink '{name}', valid sinks: {}", valid.join(", "))]
    UnknownSink { name: String, valid: Vec<String> },

    /// Invalid log level
    #[error("Invalid log level '{level}', valid values: {}", valid_levels.join(", "))]
    InvalidLogLevel {
        level: String,
        valid_levels: Vec<String>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value {field} = '{value}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// A configured sink could not be activated
    #[error("Failed to activate {sink} sink: {source}")]
    SinkActivation {
        sink: SinkKind,
        #[source]
        source: SinkError,
    },

    /// Sink support not compiled in
    #[error("The {sink} sink requires the '{feature}' feature")]
    FeatureDisabled { sink: SinkKind, feature: &'static str },

    /// Global `log` backend already registered
    #[error("A global logger has already been installed")]
    LoggerAlreadySet,
}

/// Sink 初始化错误
#[derive(Debug, Error)]
pub enum SinkError {
    /// Required setting is empty
    #[error("{sink}: required setting '{field}' is missing or empty")]
    MissingSetting { sink: SinkKind, field: &'static str },

    /// Setting present but unusable
    #[error("{sink}: invalid setting '{field}': {reason}")]
    InvalidSetting {
        sink: SinkKind,
        field: &'static str,
        reason: String,
    },

    /// Create directory failed
    #[error("Failed to create directory {path}: {reason}")]
    CreateDirectoryFailed { path: PathBuf, reason: String },

    /// Open file failed
    #[error("Failed to open {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    /// Database or HTTP client could not be created
    #[error("{sink}: connection failed: {reason}")]
    Connect { sink: SinkKind, reason: String },

    /// Log table could not be created
    #[error("{sink}: failed to prepare log table '{table}': {reason}")]
    Schema {
        sink: SinkKind,
        table: String,
        reason: String,
    },

    /// Background worker could not be started
    #[error("{sink}: failed to start worker: {reason}")]
    Worker { sink: SinkKind, reason: String },
}

/// 单条记录投递错误（在 LoggerHandle 内部吞掉，只输出诊断）
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// File write failed
    #[error("Failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    /// File rotation failed
    #[error("Failed to rotate {path}: {reason}")]
    Rotate { path: PathBuf, reason: String },

    /// Insert failed
    #[error("{sink}: insert failed: {reason}")]
    Database { sink: SinkKind, reason: String },

    /// Background dispatcher is gone
    #[error("{sink}: dispatcher is closed")]
    Dispatch { sink: SinkKind },

    /// Sink did not answer in time
    #[error("{sink}: timed out after {seconds}s")]
    Timeout { sink: SinkKind, seconds: u64 },

    /// A previous writer panicked while holding the sink
    #[error("{sink}: sink state poisoned")]
    Poisoned { sink: SinkKind },
}

/// SQL 生成错误
#[derive(Debug, Error)]
pub enum QueryError {
    /// Statement requires at least one column
    #[error("{statement} statement requires at least one column")]
    EmptyColumns { statement: &'static str },

    /// Table or column name is not a plain identifier
    #[error("'{name}' is not a valid SQL identifier")]
    InvalidIdentifier { name: String },
}

/// 应用程序 Result 类型别名
pub type Result<T> = std::result::Result<T, Error>;

// 辅助宏，用于快速创建错误
#[macro_export]
macro_rules! config_error {
    ($variant:ident { $($field:ident $(: $value:expr)?),+ $(,)? }) => {
        $crate::error::Error::Config($crate::error::ConfigError::$variant {
            $($field $(: $value)?),+
        })
    };
}

#[macro_export]
macro_rules! sink_error {
    ($variant:ident { $($field:ident $(: $value:expr)?),+ $(,)? }) => {
        $crate::error::SinkError::$variant {
            $($field $(: $value)?),+
        }
    };
}

#[macro_export]
macro_rules! delivery_error {
    ($variant:ident { $($field:ident $(: $value:expr)?),+ $(,)? }) => {
        $crate::error::DeliveryError::$variant {
            $($field $(: $value)?),+
        }
    };
}
