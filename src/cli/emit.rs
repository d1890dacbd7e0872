use log::{debug, warn};
use sinklog::config::LoggerConfiguration;
use sinklog::error::{Error, Result};
use sinklog::{Level, LogRecord, LoggerHandle, SourceLocation};
use std::time::Duration;

/// 通过配置的 sink 发送一条记录；任一 sink 拒绝时以第一个失败作为错误返回
pub fn handle_emit(cfg: &LoggerConfiguration, level: &str, message: &str, grace: u64) -> Result<()> {
    let level: Level = level.parse()?;
    let logger = LoggerHandle::from_config(cfg)?;

    let record = LogRecord::new(level, message, SourceLocation::new("<cli>", "emit", 0));
    let failures = logger.deliver(&record);
    for (kind, err) in &failures {
        warn!("{kind} sink rejected the record: {err}");
    }
    debug!(
        "Record delivered to {} of {} sink(s)",
        logger
            .sinks()
            .iter()
            .filter(|s| s.accepts(level))
            .count()
            .saturating_sub(failures.len()),
        logger.sinks().len()
    );

    if !logger.shutdown(Duration::from_secs(grace)) {
        warn!("Webhook deliveries still pending after {grace}s");
    }
    match failures.into_iter().next() {
        Some((_, err)) => Err(Error::Delivery(err)),
        None => Ok(()),
    }
}
