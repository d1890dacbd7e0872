//! 日志门面：持有已激活的 sink 列表，把每条记录分发给阈值满足的 sink

use crate::config::LoggerConfiguration;
use crate::error::{ConfigError, DeliveryError, Error, Result};
use crate::record::{Level, LogRecord, SourceLocation};
use crate::sink::{self, ConfiguredSink, RecordSink, Sink, SinkKind};
use log::{LevelFilter, Metadata, Record};
use serde_json::Value;
use std::cell::Cell;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 本 crate 自身的 `log` 目标前缀，桥接时忽略，避免自我递归
const OWN_TARGET: &str = "sinklog";

thread_local! {
    /// 当前线程是否处于投递路径（sink 工作线程，或正在转发一条 `log` 记录）
    static DELIVERING: Cell<bool> = const { Cell::new(false) };
}

/// 把当前线程标记为 sink 工作线程：线程内依赖库（HTTP 客户端、数据库驱动）产生的 `log` 记录不再转发
#[cfg_attr(not(any(feature = "mariadb", feature = "webhook")), allow(dead_code))]
pub(crate) fn mark_sink_thread() {
    DELIVERING.with(|flag| flag.set(true));
}

fn is_delivering() -> bool {
    DELIVERING.with(Cell::get)
}

/// 转发期间置位，结束时恢复原值
struct DeliveryScope {
    previous: bool,
}

impl DeliveryScope {
    fn enter() -> Self {
        Self {
            previous: DELIVERING.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for DeliveryScope {
    fn drop(&mut self) {
        DELIVERING.with(|flag| flag.set(self.previous));
    }
}

/// 日志门面。克隆共享同一组 sink，可在任意线程并发调用
#[derive(Debug, Clone)]
pub struct LoggerHandle {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    sinks: Vec<ConfiguredSink>,
}

impl LoggerHandle {
    /// 按配置激活全部 sink
    pub fn from_config(config: &LoggerConfiguration) -> Result<Self> {
        let sinks = sink::activate(config)?;
        Ok(Self::with_sinks(sinks))
    }

    /// 直接由 `(阈值, sink)` 构造，顺序即分发顺序
    pub fn from_sinks(sinks: impl IntoIterator<Item = (Level, Sink)>) -> Self {
        Self::with_sinks(
            sinks
                .into_iter()
                .map(|(threshold, sink)| ConfiguredSink::new(threshold, sink))
                .collect(),
        )
    }

    fn with_sinks(sinks: Vec<ConfiguredSink>) -> Self {
        Self {
            inner: Arc::new(Inner { sinks }),
        }
    }

    /// 解析配置输入（sink 名称列表或部分配置映射）并激活
    pub fn setup(input: &Value) -> Result<Self> {
        let config = LoggerConfiguration::resolve(input)?;
        Self::from_config(&config)
    }

    /// 从配置文件加载并激活
    pub fn setup_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = LoggerConfiguration::from_file(path)?;
        Self::from_config(&config)
    }

    pub fn sinks(&self) -> &[ConfiguredSink] {
        &self.inner.sinks
    }

    /// 所有 sink 中最低的阈值；没有 sink 时为 `None`
    pub fn min_level(&self) -> Option<Level> {
        self.inner.sinks.iter().map(|s| s.threshold).min()
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        self.inner.sinks.iter().any(|s| s.accepts(level))
    }

    /// 按声明顺序分发，返回各 sink 的投递失败；一个 sink 失败不影响其他 sink
    pub fn deliver(&self, record: &LogRecord) -> Vec<(SinkKind, DeliveryError)> {
        self.inner
            .sinks
            .iter()
            .filter(|s| s.accepts(record.level))
            .filter_map(|s| s.sink.emit(record).err().map(|e| (s.sink.kind(), e)))
            .collect()
    }

    /// 分发记录，失败只输出诊断
    pub fn emit(&self, record: &LogRecord) {
        for (kind, err) in self.deliver(record) {
            eprintln!("sinklog: {kind} sink failed to write record: {err}");
        }
    }

    pub fn log(&self, level: Level, location: SourceLocation, message: impl Into<String>) {
        if self.is_enabled(level) {
            self.emit(&LogRecord::new(level, message, location));
        }
    }

    pub fn debug(&self, location: SourceLocation, message: impl Into<String>) {
        self.log(Level::Debug, location, message);
    }

    pub fn info(&self, location: SourceLocation, message: impl Into<String>) {
        self.log(Level::Info, location, message);
    }

    pub fn warning(&self, location: SourceLocation, message: impl Into<String>) {
        self.log(Level::Warning, location, message);
    }

    pub fn error(&self, location: SourceLocation, message: impl Into<String>) {
        self.log(Level::Error, location, message);
    }

    pub fn critical(&self, location: SourceLocation, message: impl Into<String>) {
        self.log(Level::Critical, location, message);
    }

    pub fn flush(&self) {
        for s in &self.inner.sinks {
            if let Err(e) = s.sink.flush() {
                eprintln!("sinklog: {} sink failed to flush: {e}", s.sink.kind());
            }
        }
    }

    /// 刷新文件 sink 并关闭 Webhook 投递线程，总共最多等待 `grace`。
    /// 所有投递都在时限内结束时返回 `true`
    pub fn shutdown(&self, grace: Duration) -> bool {
        self.flush();
        let deadline = Instant::now() + grace;
        let mut finished = true;
        for s in &self.inner.sinks {
            let remaining = deadline.saturating_duration_since(Instant::now());
            finished &= s.sink.close(remaining);
        }
        finished
    }

    /// 注册为全局 `log` 后端，之后 `log::info!` 等宏的记录也会分发到各 sink
    pub fn install(&self) -> Result<()> {
        log::set_boxed_logger(Box::new(LogBridge {
            handle: self.clone(),
        }))
        .map_err(|_| Error::Config(ConfigError::LoggerAlreadySet))?;
        log::set_max_level(level_filter(self.min_level()));
        Ok(())
    }
}

fn level_filter(min: Option<Level>) -> LevelFilter {
    match min {
        None => LevelFilter::Off,
        Some(Level::Debug) => LevelFilter::Trace,
        Some(Level::Info) => LevelFilter::Info,
        Some(Level::Warning) => LevelFilter::Warn,
        Some(Level::Error | Level::Critical) => LevelFilter::Error,
    }
}

/// `log` 级别映射（Trace 并入 DEBUG）
pub fn from_log_level(level: log::Level) -> Level {
    match level {
        log::Level::Error => Level::Error,
        log::Level::Warn => Level::Warning,
        log::Level::Info => Level::Info,
        log::Level::Debug | log::Level::Trace => Level::Debug,
    }
}

fn is_own_target(target: &str) -> bool {
    target == OWN_TARGET
        || target
            .strip_prefix(OWN_TARGET)
            .is_some_and(|rest| rest.starts_with("::"))
}

#[derive(Debug)]
struct LogBridge {
    handle: LoggerHandle,
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        !is_delivering()
            && !is_own_target(metadata.target())
            && self.handle.is_enabled(from_log_level(metadata.level()))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _scope = DeliveryScope::enter();

        let location = SourceLocation::new(
            record.file().unwrap_or("<unknown>"),
            record.module_path().unwrap_or(record.target()),
            record.line().unwrap_or(0),
        );
        self.handle.emit(&LogRecord::new(
            from_log_level(record.level()),
            record.args().to_string(),
            location,
        ));
    }

    fn flush(&self) {
        self.handle.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn here() -> SourceLocation {
        SourceLocation::new("logger.rs", "test", 1)
    }

    #[test]
    fn test_threshold_filtering() {
        let warn = MemorySink::new();
        let all = MemorySink::new();
        let logger = LoggerHandle::from_sinks([
            (Level::Warning, Sink::Memory(warn.clone())),
            (Level::Debug, Sink::Memory(all.clone())),
        ]);

        logger.info(here(), "routine");
        logger.error(here(), "broken");

        assert_eq!(warn.messages(), vec!["broken"]);
        assert_eq!(all.messages(), vec!["routine", "broken"]);
        assert_eq!(logger.min_level(), Some(Level::Debug));
    }

    #[test]
    fn test_no_sinks_is_silent() {
        let logger = LoggerHandle::from_sinks(Vec::<(Level, Sink)>::new());
        assert!(logger.deliver(&LogRecord::new(Level::Critical, "x", here())).is_empty());
        assert_eq!(logger.min_level(), None);
        assert!(logger.shutdown(Duration::ZERO));
    }

    #[test]
    fn test_own_target_detection() {
        assert!(is_own_target("sinklog"));
        assert!(is_own_target("sinklog::sink::rotating"));
        assert!(!is_own_target("sinklogger"));
        assert!(!is_own_target("app::jobs"));
    }

    #[test]
    fn test_bridge_ignores_sink_threads() {
        use log::Log;

        let memory = MemorySink::new();
        let bridge = LogBridge {
            handle: LoggerHandle::from_sinks([(Level::Debug, Sink::Memory(memory.clone()))]),
        };
        let metadata = Metadata::builder()
            .level(log::Level::Debug)
            .target("hyper_util::client::legacy::pool")
            .build();
        assert!(bridge.enabled(&metadata));

        std::thread::scope(|s| {
            s.spawn(|| {
                mark_sink_thread();
                assert!(!bridge.enabled(&metadata));
                bridge.log(
                    &Record::builder()
                        .metadata(metadata.clone())
                        .args(format_args!("checkout waiting for idle connection"))
                        .build(),
                );
            });
        });
        assert!(memory.is_empty());
        assert!(bridge.enabled(&metadata));
    }

    #[test]
    fn test_delivery_scope_restores_flag() {
        assert!(!is_delivering());
        {
            let _outer = DeliveryScope::enter();
            {
                let _inner = DeliveryScope::enter();
                assert!(is_delivering());
            }
            assert!(is_delivering());
        }
        assert!(!is_delivering());
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(from_log_level(log::Level::Trace), Level::Debug);
        assert_eq!(from_log_level(log::Level::Warn), Level::Warning);
        assert_eq!(level_filter(Some(Level::Critical)), LevelFilter::Error);
        assert_eq!(level_filter(None), LevelFilter::Off);
    }
}
