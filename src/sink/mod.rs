/// Sink 模块 - 负责把 LogRecord 投递到各个后端
///
/// 支持的目标:
/// - 控制台 / 普通文件 / 按大小轮转文件 / 按时间轮转文件
/// - SQLite (文件型嵌入式数据库)
/// - MariaDB (网络型关系数据库)
/// - Discord / Slack Webhook (后台异步投递)
use crate::config::LoggerConfiguration;
use crate::error::{ConfigError, DeliveryError, Error, Result, SinkError};
use crate::record::{Level, LogRecord};
use log::info;
use std::fmt;
use std::time::Duration;

mod console;
pub mod discord;
mod file;
mod memory;
mod rotating;
pub mod slack;

#[cfg(feature = "mariadb")]
mod mariadb;
#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(feature = "webhook")]
mod webhook;

pub use console::ConsoleSink;
pub use file::FileSink;
pub use memory::MemorySink;
pub use rotating::{RotatingFileSink, TimedRotatingFileSink};

#[cfg(feature = "mariadb")]
pub use mariadb::MariadbSink;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSink;
#[cfg(feature = "webhook")]
pub use webhook::{WebhookFormat, WebhookSink};

/// Sink 种类（配置中的顶层键）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Console,
    File,
    Rotating,
    TimedRotating,
    Sqlite,
    Mariadb,
    Discord,
    Slack,
    /// 进程内捕获，不出现在配置中
    Memory,
}

impl SinkKind {
    /// 可配置的 sink，按声明顺序
    pub const ALL: [SinkKind; 8] = [
        SinkKind::Console,
        SinkKind::File,
        SinkKind::Rotating,
        SinkKind::TimedRotating,
        SinkKind::Sqlite,
        SinkKind::Mariadb,
        SinkKind::Discord,
        SinkKind::Slack,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SinkKind::Console => "console",
            SinkKind::File => "file",
            SinkKind::Rotating => "rotating",
            SinkKind::TimedRotating => "timed_rotating",
            SinkKind::Sqlite => "sqlite",
            SinkKind::Mariadb => "mariadb",
            SinkKind::Discord => "discord",
            SinkKind::Slack => "slack",
            SinkKind::Memory => "memory",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink 基础 trait - 所有后端必须实现此接口
pub trait RecordSink {
    /// 写入单条记录；同步 sink 在返回前完成 I/O，Webhook 只负责投递到后台
    fn emit(&self, record: &LogRecord) -> std::result::Result<(), DeliveryError>;

    /// 刷新缓冲区 (默认实现: 无操作)
    fn flush(&self) -> std::result::Result<(), DeliveryError> {
        Ok(())
    }

    /// 获取 sink 种类 (用于诊断输出)
    fn kind(&self) -> SinkKind;
}

/// 全部 sink 的统一枚举
#[derive(Debug)]
pub enum Sink {
    Console(ConsoleSink),
    File(FileSink),
    Rotating(RotatingFileSink),
    TimedRotating(TimedRotatingFileSink),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteSink),
    #[cfg(feature = "mariadb")]
    Mariadb(MariadbSink),
    #[cfg(feature = "webhook")]
    Webhook(WebhookSink),
    Memory(MemorySink),
}

impl Sink {
    fn as_record_sink(&self) -> &dyn RecordSink {
        match self {
            Sink::Console(s) => s,
            Sink::File(s) => s,
            Sink::Rotating(s) => s,
            Sink::TimedRotating(s) => s,
            #[cfg(feature = "sqlite")]
            Sink::Sqlite(s) => s,
            #[cfg(feature = "mariadb")]
            Sink::Mariadb(s) => s,
            #[cfg(feature = "webhook")]
            Sink::Webhook(s) => s,
            Sink::Memory(s) => s,
        }
    }

    pub fn kind(&self) -> SinkKind {
        self.as_record_sink().kind()
    }

    /// 关闭后台投递线程，最多等待 `grace`；返回是否在时限内完成
    pub fn close(&self, #[allow(unused_variables)] grace: Duration) -> bool {
        match self {
            #[cfg(feature = "webhook")]
            Sink::Webhook(s) => s.close(grace),
            _ => true,
        }
    }
}

impl RecordSink for Sink {
    fn emit(&self, record: &LogRecord) -> std::result::Result<(), DeliveryError> {
        self.as_record_sink().emit(record)
    }

    fn flush(&self) -> std::result::Result<(), DeliveryError> {
        self.as_record_sink().flush()
    }

    fn kind(&self) -> SinkKind {
        Sink::kind(self)
    }
}

/// 带阈值的 sink
#[derive(Debug)]
pub struct ConfiguredSink {
    pub threshold: Level,
    pub sink: Sink,
}

impl ConfiguredSink {
    pub fn new(threshold: Level, sink: Sink) -> Self {
        Self { threshold, sink }
    }

    /// 记录级别不低于阈值时接收
    pub fn accepts(&self, level: Level) -> bool {
        level >= self.threshold
    }
}

fn activated<T>(kind: SinkKind, result: std::result::Result<T, SinkError>) -> Result<T> {
    result.map_err(|source| Error::Config(ConfigError::SinkActivation { sink: kind, source }))
}

#[allow(dead_code)]
fn feature_disabled(kind: SinkKind, feature: &'static str) -> Error {
    Error::Config(ConfigError::FeatureDisabled {
        sink: kind,
        feature,
    })
}

/// 按声明顺序创建配置中启用的全部 sink；任一 sink 初始化失败即整体失败
pub fn activate(config: &LoggerConfiguration) -> Result<Vec<ConfiguredSink>> {
    let mut sinks = Vec::new();

    if let Some(c) = &config.console {
        let sink = activated(SinkKind::Console, ConsoleSink::new(c))?;
        sinks.push(ConfiguredSink::new(c.alert_level, Sink::Console(sink)));
    }

    if let Some(c) = &config.file {
        let sink = activated(SinkKind::File, FileSink::new(c))?;
        sinks.push(ConfiguredSink::new(c.alert_level, Sink::File(sink)));
    }

    if let Some(c) = &config.rotating {
        let sink = activated(SinkKind::Rotating, RotatingFileSink::new(c))?;
        sinks.push(ConfiguredSink::new(c.alert_level, Sink::Rotating(sink)));
    }

    if let Some(c) = &config.timed_rotating {
        let sink = activated(SinkKind::TimedRotating, TimedRotatingFileSink::new(c))?;
        sinks.push(ConfiguredSink::new(c.alert_level, Sink::TimedRotating(sink)));
    }

    if let Some(c) = &config.sqlite {
        #[cfg(feature = "sqlite")]
        {
            let sink = activated(SinkKind::Sqlite, SqliteSink::new(c))?;
            sinks.push(ConfiguredSink::new(c.alert_level, Sink::Sqlite(sink)));
        }
        #[cfg(not(feature = "sqlite"))]
        {
            let _ = c;
            return Err(feature_disabled(SinkKind::Sqlite, "sqlite"));
        }
    }

    if let Some(c) = &config.mariadb {
        #[cfg(feature = "mariadb")]
        {
            let sink = activated(SinkKind::Mariadb, MariadbSink::new(c))?;
            sinks.push(ConfiguredSink::new(c.alert_level, Sink::Mariadb(sink)));
        }
        #[cfg(not(feature = "mariadb"))]
        {
            let _ = c;
            return Err(feature_disabled(SinkKind::Mariadb, "mariadb"));
        }
    }

    if let Some(c) = &config.discord {
        #[cfg(feature = "webhook")]
        {
            let sink = activated(SinkKind::Discord, WebhookSink::discord(c))?;
            sinks.push(ConfiguredSink::new(c.alert_level, Sink::Webhook(sink)));
        }
        #[cfg(not(feature = "webhook"))]
        {
            let _ = c;
            return Err(feature_disabled(SinkKind::Discord, "webhook"));
        }
    }

    if let Some(c) = &config.slack {
        #[cfg(feature = "webhook")]
        {
            let sink = activated(SinkKind::Slack, WebhookSink::slack(c))?;
            sinks.push(ConfiguredSink::new(c.alert_level, Sink::Webhook(sink)));
        }
        #[cfg(not(feature = "webhook"))]
        {
            let _ = c;
            return Err(feature_disabled(SinkKind::Slack, "webhook"));
        }
    }

    for s in &sinks {
        info!("Activated {} sink (threshold: {})", s.sink.kind(), s.threshold);
    }

    Ok(sinks)
}
