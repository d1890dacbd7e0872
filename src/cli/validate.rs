use log::info;
use sinklog::config::LoggerConfiguration;
use sinklog::error::Result;
use sinklog::LoggerHandle;
use std::time::Duration;

/// 验证配置：解析并实际激活每个 sink
pub fn handle_validate(cfg: &LoggerConfiguration) -> Result<()> {
    if cfg.is_empty() {
        eprintln!("No sinks configured: records will be discarded");
        return Ok(());
    }

    let logger = LoggerHandle::from_config(cfg)?;
    for sink in logger.sinks() {
        info!("{} sink active (alert level: {})", sink.sink.kind(), sink.threshold);
        println!("{:<16} {}", sink.sink.kind(), sink.threshold);
    }
    logger.shutdown(Duration::ZERO);

    eprintln!("Configuration is valid: {} sink(s) activated", logger.sinks().len());
    Ok(())
}
