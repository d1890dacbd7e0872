//! 日志记录模型：级别、调用点与不可变的 LogRecord

use crate::constants::{LINE_TIME_FORMAT, LOG_LEVELS};
use crate::error::ConfigError;
use chrono::{DateTime, Local, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 日志级别，数值与常见日志库保持一致（DEBUG=10 … CRITICAL=50）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    Debug = 10,
    Info = 20,
    Warning = 30,
    Error = 40,
    Critical = 50,
}

impl Level {
    /// 全部级别（升序）
    pub const ALL: [Level; 5] = [
        Level::Debug,
        Level::Info,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    /// 级别名称（大写）
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// 数值形式，写入数据库 `level` 列
    pub fn number(self) -> u8 {
        self as u8
    }

    /// 从数值解析
    pub fn from_number(n: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|l| u64::from(l.number()) == n)
    }

    /// 从配置树中的值解析（名称或数值）
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ConfigError> {
        match value {
            serde_json::Value::String(s) => s.parse(),
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(Self::from_number)
                .ok_or_else(|| invalid_level(&n.to_string())),
            other => Err(invalid_level(&other.to_string())),
        }
    }
}

fn invalid_level(level: &str) -> ConfigError {
    ConfigError::InvalidLogLevel {
        level: level.to_string(),
        valid_levels: LOG_LEVELS.iter().map(|s| (*s).to_string()).collect(),
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARNING" | "WARN" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" | "FATAL" => Ok(Level::Critical),
            _ => Err(invalid_level(s)),
        }
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Name(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Name(name) => name.parse().map_err(de::Error::custom),
            Raw::Number(n) => {
                Level::from_number(n).ok_or_else(|| de::Error::custom(invalid_level(&n.to_string())))
            }
        }
    }
}

/// 记录的来源位置（文件、函数、行号）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: String,
    pub function: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, function: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            function: function.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}:{}", self.file, self.function, self.line)
    }
}

/// 单条日志记录，创建后不再修改；每个 sink 独立消费
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub created: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub location: SourceLocation,
    /// 完整的异常/错误跟踪文本
    pub exception: Option<String>,
}

impl LogRecord {
    pub fn new(level: Level, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            created: Utc::now(),
            level,
            message: message.into(),
            location,
            exception: None,
        }
    }

    #[must_use]
    pub fn with_exception(mut self, trace: impl Into<String>) -> Self {
        self.exception = Some(trace.into());
        self
    }

    #[must_use]
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    /// 消息正文；带异常文本时追加在下一行
    pub fn full_message(&self) -> String {
        match &self.exception {
            Some(trace) => format!("{}\n{}", self.message, trace),
            None => self.message.clone(),
        }
    }

    /// 文本 sink 共用的行格式：
    /// `[timestamp] LEVEL\tfile - function:line -> message`
    pub fn render_line(&self) -> String {
        format!(
            "[{}] {}\t{} -> {}",
            self.created
                .with_timezone(&Local)
                .format(LINE_TIME_FORMAT),
            self.level,
            self.location,
            self.full_message()
        )
    }
}

/// 去掉 `function_name!` 生成的路径前缀与闭包后缀，只保留函数名
#[doc(hidden)]
pub fn trim_function_path(path: &'static str) -> &'static str {
    let mut path = path.strip_suffix("::__here").unwrap_or(path);
    while let Some(stripped) = path.strip_suffix("::{{closure}}") {
        path = stripped;
    }
    path.rsplit("::").next().unwrap_or(path)
}

/// 当前所在函数的名称
#[macro_export]
macro_rules! function_name {
    () => {{
        fn __here() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::record::trim_function_path(type_name_of(__here))
    }};
}

/// 当前调用点的 SourceLocation
#[macro_export]
macro_rules! source_location {
    () => {
        $crate::record::SourceLocation::new(file!(), $crate::function_name!(), line!())
    };
}
