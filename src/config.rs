//! 日志配置：完整模板、部分配置的递归合并与解析

use crate::error::{ConfigError, Error, Result};
use crate::record::Level;
use crate::sink::SinkKind;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// `sinklog init` 生成的配置文件：启用控制台与按天轮转文件，其余 sink 以注释给出
pub const CONFIG_TEMPLATE_TOML: &str = r#"# sinklog 日志配置文件
# 只有出现的 sink 会被启用；未填写的键使用默认值
# alert_level: DEBUG, INFO, WARNING, ERROR, CRITICAL

[console]
alert_level = "DEBUG"
# stdout 或 stderr
stream = "stderr"

[timed_rotating]
alert_level = "DEBUG"
file_path = "log/log.log"
# S, M, H, D, MIDNIGHT, W0-W6 (W0 = 周一)
when = "MIDNIGHT"
interval = 1
backup_count = 7
delay = false
utc = false

# [file]
# alert_level = "INFO"
# file_path = "log/log.log"

# [rotating]
# alert_level = "DEBUG"
# file_path = "log/log.log"
# max_bytes = 1048576
# backup_count = 5

# [sqlite]
# alert_level = "INFO"
# [sqlite.db_config]
# db_path = "db/log.db"
# table = "logs"

# [mariadb]
# alert_level = "INFO"
# [mariadb.db_config]
# host = "localhost"
# port = 3306
# user = "user"
# password = "password"
# db = "db"
# table = "logs"

# [discord]
# alert_level = "WARNING"
# webhook_url = "https://discord.com/api/webhooks/..."
# username = ""
# avatar_url = ""

# [slack]
# alert_level = "WARNING"
# webhook_url = "https://hooks.slack.com/services/..."
# service_name = ""
"#;

/// 控制台输出流
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub alert_level: Level,
    pub stream: ConsoleStream,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            alert_level: Level::Debug,
            stream: ConsoleStream::Stderr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    pub alert_level: Level,
    /// 日志文件路径
    pub file_path: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            alert_level: Level::Info,
            file_path: "log/log.log".to_string(),
        }
    }
}

/// 按大小轮转
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotatingConfig {
    pub alert_level: Level,
    pub file_path: String,
    /// 达到该字节数前轮转；0 表示不轮转
    pub max_bytes: u64,
    /// 保留的历史文件数；0 表示不轮转
    pub backup_count: u32,
    /// 仅支持 UTF-8（或留空）
    pub encoding: Option<String>,
    /// 首次写入时才打开文件
    pub delay: bool,
}

impl Default for RotatingConfig {
    fn default() -> Self {
        Self {
            alert_level: Level::Debug,
            file_path: "log/log.log".to_string(),
            max_bytes: 1024 * 1024,
            backup_count: 5,
            encoding: None,
            delay: false,
        }
    }
}

/// 按时间轮转的间隔单位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationWhen {
    Seconds,
    Minutes,
    Hours,
    Days,
    Midnight,
    /// 每周指定星期几的零点（0 = 周一）
    Weekday(u8),
}

impl RotationWhen {
    pub fn as_str(self) -> &'static str {
        match self {
            RotationWhen::Seconds => "S",
            RotationWhen::Minutes => "M",
            RotationWhen::Hours => "H",
            RotationWhen::Days => "D",
            RotationWhen::Midnight => "MIDNIGHT",
            RotationWhen::Weekday(0) => "W0",
            RotationWhen::Weekday(1) => "W1",
            RotationWhen::Weekday(2) => "W2",
            RotationWhen::Weekday(3) => "W3",
            RotationWhen::Weekday(4) => "W4",
            RotationWhen::Weekday(5) => "W5",
            RotationWhen::Weekday(_) => "W6",
        }
    }
}

impl fmt::Display for RotationWhen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RotationWhen {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let when = match upper.as_str() {
            "S" => RotationWhen::Seconds,
            "M" => RotationWhen::Minutes,
            "H" => RotationWhen::Hours,
            "D" => RotationWhen::Days,
            "MIDNIGHT" => RotationWhen::Midnight,
            w if w.len() == 2 && w.starts_with('W') => match w.as_bytes()[1] {
                d @ b'0'..=b'6' => RotationWhen::Weekday(d - b'0'),
                _ => return Err(invalid_when(s)),
            },
            _ => return Err(invalid_when(s)),
        };
        Ok(when)
    }
}

fn invalid_when(value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: "timed_rotating.when".to_string(),
        value: value.to_string(),
        reason: "expected one of S, M, H, D, MIDNIGHT, W0-W6".to_string(),
    }
}

impl Serialize for RotationWhen {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RotationWhen {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// 按时间轮转
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedRotatingConfig {
    pub alert_level: Level,
    pub file_path: String,
    pub when: RotationWhen,
    /// 间隔倍数，例如 when = D, interval = 1 表示每天
    pub interval: u32,
    pub backup_count: u32,
    pub encoding: Option<String>,
    pub delay: bool,
    /// 使用 UTC 计算轮转边界与文件后缀
    pub utc: bool,
}

impl Default for TimedRotatingConfig {
    fn default() -> Self {
        Self {
            alert_level: Level::Debug,
            file_path: "log/log.log".to_string(),
            when: RotationWhen::Days,
            interval: 1,
            backup_count: 5,
            encoding: None,
            delay: false,
            utc: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteDbConfig {
    /// SQLite 数据库文件路径
    pub db_path: String,
    /// 表名
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteConfig {
    pub alert_level: Level,
    pub db_config: SqliteDbConfig,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            alert_level: Level::Info,
            db_config: SqliteDbConfig {
                db_path: "db/log.db".to_string(),
                table: "logs".to_string(),
            },
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct MariadbDbConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    /// 数据库名
    pub db: String,
    pub port: u16,
    pub table: String,
}

// 不在 Debug 输出中暴露密码
impl fmt::Debug for MariadbDbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MariadbDbConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("db", &self.db)
            .field("port", &self.port)
            .field("table", &self.table)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MariadbConfig {
    pub alert_level: Level,
    pub db_config: MariadbDbConfig,
}

impl Default for MariadbConfig {
    fn default() -> Self {
        Self {
            alert_level: Level::Info,
            db_config: MariadbDbConfig {
                host: "localhost".to_string(),
                user: "user".to_string(),
                password: "password".to_string(),
                db: "db".to_string(),
                port: 3306,
                table: "logs".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub alert_level: Level,
    pub webhook_url: String,
    /// 显示名称，留空则使用 Webhook 默认值
    pub username: String,
    pub avatar_url: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            alert_level: Level::Warning,
            webhook_url: String::new(),
            username: String::new(),
            avatar_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackConfig {
    pub alert_level: Level,
    pub webhook_url: String,
    /// 显示在标题中的服务名
    pub service_name: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            alert_level: Level::Warning,
            webhook_url: String::new(),
            service_name: String::new(),
        }
    }
}

/// 解析完成的日志配置：`None` 表示该 sink 未启用
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoggerConfiguration {
    pub console: Option<ConsoleConfig>,
    pub file: Option<FileConfig>,
    pub rotating: Option<RotatingConfig>,
    pub timed_rotating: Option<TimedRotatingConfig>,
    pub sqlite: Option<SqliteConfig>,
    pub mariadb: Option<MariadbConfig>,
    pub discord: Option<DiscordConfig>,
    pub slack: Option<SlackConfig>,
}

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.json` 按 JSON 解析，其余按 TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

impl LoggerConfiguration {
    /// 启用全部 sink 的完整模板
    pub fn template() -> Self {
        Self {
            console: Some(ConsoleConfig::default()),
            file: Some(FileConfig::default()),
            rotating: Some(RotatingConfig::default()),
            timed_rotating: Some(TimedRotatingConfig::default()),
            sqlite: Some(SqliteConfig::default()),
            mariadb: Some(MariadbConfig::default()),
            discord: Some(DiscordConfig::default()),
            slack: Some(SlackConfig::default()),
        }
    }

    /// 模板的树形表示，用于合并
    pub fn template_tree() -> Result<Value> {
        serde_json::to_value(Self::template()).map_err(|e| {
            Error::Config(ConfigError::InvalidValue {
                field: "template".to_string(),
                value: String::new(),
                reason: e.to_string(),
            })
        })
    }

    /// 解析配置输入：
    /// - 列表：按名称原样选取模板中的 sink
    /// - 映射：只启用映射中出现的 sink，并与模板递归合并
    pub fn resolve(input: &Value) -> Result<Self> {
        let template = Self::template_tree()?;
        let Value::Object(template) = template else {
            return Err(Error::Config(ConfigError::InvalidInput {
                found: "non-mapping template",
            }));
        };

        let mut resolved = Map::new();
        match input {
            Value::Array(names) => {
                for name in names {
                    let Value::String(name) = name else {
                        return Err(Error::Config(ConfigError::InvalidValue {
                            field: "sinks".to_string(),
                            value: name.to_string(),
                            reason: "sink names must be strings".to_string(),
                        }));
                    };
                    let section = template.get(name).ok_or_else(|| unknown_sink(name))?;
                    resolved.insert(name.clone(), section.clone());
                }
            }
            Value::Object(partial) => {
                for (kind, section) in &template {
                    if let Some(supplied) = partial.get(kind) {
                        resolved.insert(kind.clone(), merge_at(section, supplied, kind)?);
                    }
                }
                for key in partial.keys().filter(|k| !template.contains_key(*k)) {
                    debug!("Ignoring unknown logger configuration key: {key}");
                }
            }
            other => {
                return Err(Error::Config(ConfigError::InvalidInput {
                    found: json_type_name(other),
                }));
            }
        }

        let config = Self::from_sections(&resolved)?;
        info!(
            "Logger configuration resolved: {}",
            config
                .active_sinks()
                .iter()
                .map(|(kind, level)| format!("{kind}({level})"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(config)
    }

    fn from_sections(sections: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            console: parse_section(sections, SinkKind::Console)?,
            file: parse_section(sections, SinkKind::File)?,
            rotating: parse_section(sections, SinkKind::Rotating)?,
            timed_rotating: parse_section(sections, SinkKind::TimedRotating)?,
            sqlite: parse_section(sections, SinkKind::Sqlite)?,
            mariadb: parse_section(sections, SinkKind::Mariadb)?,
            discord: parse_section(sections, SinkKind::Discord)?,
            slack: parse_section(sections, SinkKind::Slack)?,
        })
    }

    /// 从文件加载（只读取一次）
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| Error::Config(ConfigError::NotFound(path.to_path_buf())))?;
        Self::from_str(&content, ConfigFormat::from_path(path), path.to_path_buf())
    }

    /// 从字符串解析
    pub fn from_str(content: &str, format: ConfigFormat, path: PathBuf) -> Result<Self> {
        let tree: Value = match format {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
        .map_err(|reason| Error::Config(ConfigError::ParseFailed { path, reason }))?;

        Self::resolve(unwrap_sink_list(&tree))
    }

    /// 按声明顺序列出启用的 sink 及其阈值
    pub fn active_sinks(&self) -> Vec<(SinkKind, Level)> {
        let levels = [
            self.console.as_ref().map(|c| c.alert_level),
            self.file.as_ref().map(|c| c.alert_level),
            self.rotating.as_ref().map(|c| c.alert_level),
            self.timed_rotating.as_ref().map(|c| c.alert_level),
            self.sqlite.as_ref().map(|c| c.alert_level),
            self.mariadb.as_ref().map(|c| c.alert_level),
            self.discord.as_ref().map(|c| c.alert_level),
            self.slack.as_ref().map(|c| c.alert_level),
        ];
        SinkKind::ALL
            .into_iter()
            .zip(levels)
            .filter_map(|(kind, level)| level.map(|l| (kind, l)))
            .collect()
    }

    /// 是否没有任何 sink 被启用
    pub fn is_empty(&self) -> bool {
        self.active_sinks().is_empty()
    }
}

/// 配置文件中 `sinks = [...]` 等价于直接给出列表（TOML 顶层不能是数组）
fn unwrap_sink_list(input: &Value) -> &Value {
    match input {
        Value::Object(map) if map.len() == 1 => match map.get("sinks") {
            Some(list @ Value::Array(_)) => list,
            _ => input,
        },
        _ => input,
    }
}

fn unknown_sink(name: &str) -> Error {
    Error::Config(ConfigError::UnknownSink {
        name: name.to_string(),
        valid: SinkKind::ALL.iter().map(|k| k.as_str().to_string()).collect(),
    })
}

fn parse_section<T: DeserializeOwned>(
    sections: &Map<String, Value>,
    kind: SinkKind,
) -> Result<Option<T>> {
    let Some(section) = sections.get(kind.as_str()) else {
        return Ok(None);
    };

    // 先单独校验级别，给出更明确的错误
    if let Some(level) = section.get("alert_level") {
        Level::from_value(level)?;
    }

    serde_json::from_value(section.clone())
        .map(Some)
        .map_err(|e| {
            Error::Config(ConfigError::InvalidValue {
                field: kind.as_str().to_string(),
                value: section.to_string(),
                reason: e.to_string(),
            })
        })
}

/// 以模板为准递归合并：
/// - 部分配置中出现的叶子覆盖模板默认值，嵌套映射继续递归
/// - 部分配置中缺失的键保留模板默认值
/// - 模板中不存在的键被丢弃
pub fn merge_tree(template: &Value, partial: &Value) -> Result<Value> {
    merge_at(template, partial, "")
}

fn merge_at(template: &Value, partial: &Value, path: &str) -> Result<Value> {
    match (template, partial) {
        (Value::Object(template), Value::Object(partial)) => {
            let mut merged = Map::new();
            for (key, default) in template {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                let value = match partial.get(key) {
                    Some(supplied) if default.is_object() => {
                        merge_at(default, supplied, &child_path)?
                    }
                    Some(supplied) => supplied.clone(),
                    None => default.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Ok(Value::Object(merged))
        }
        (Value::Object(_), other) => Err(Error::Config(ConfigError::InvalidValue {
            field: path.to_string(),
            value: other.to_string(),
            reason: "expected a mapping".to_string(),
        })),
        (_, supplied) => Ok(supplied.clone()),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
