//! sinklog - 多目标结构化日志与函数调用埋点
//!
//! 一条记录按阈值分发到控制台、文件、轮转文件、SQLite、MariaDB、Discord、Slack 等 sink。
//!
//! ```ignore
//! let logger = sinklog::LoggerHandle::setup(&serde_json::json!(["console"]))?;
//! sinklog::info!(logger, "started with {} workers", 4);
//! let rows = sinklog::traced!(logger).call(|| load_rows());
//! ```
pub mod config;
pub mod constants;
pub mod error;
pub mod instrument;
pub mod logger;
pub mod record;
pub mod retry;
pub mod sink;
pub mod sql;

mod macros;

pub use config::LoggerConfiguration;
pub use error::{Error, Result};
pub use instrument::{Instrument, Mode};
pub use logger::LoggerHandle;
pub use record::{Level, LogRecord, SourceLocation};
pub use sink::{ConfiguredSink, MemorySink, RecordSink, Sink, SinkKind};
