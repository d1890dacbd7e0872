//! 函数调用埋点
//!
//! - Traced：调用前记录 `[START]`，成功后记录 `[END]`，失败时记录 ERROR 与 `[KILLED]`
//! - Guarded：只在失败时记录 ERROR
//!
//! 两种模式都会吞掉失败（包括 panic），失败时返回 `None`。
//! 记录的来源位置在包装时确定（`traced!` / `guarded!` 宏捕获调用点），而不是埋点代码自身的位置。

use crate::logger::LoggerHandle;
use crate::record::{Level, LogRecord, SourceLocation};
use futures_util::FutureExt;
use std::any::Any;
use std::fmt::{Debug, Display};
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// 埋点模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Traced,
    Guarded,
}

/// 一次调用的结果
#[derive(Debug)]
pub enum Outcome<T> {
    Succeeded(T),
    Failed {
        /// 错误的简要描述
        message: String,
        /// 完整的跟踪文本
        trace: String,
    },
}

impl<T> Outcome<T> {
    fn from_result<E: Display + Debug>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Succeeded(value),
            Err(e) => Outcome::Failed {
                message: e.to_string(),
                trace: format!("{e:?}"),
            },
        }
    }

    fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Outcome::Failed {
            trace: format!("panicked: {message}"),
            message,
        }
    }
}

/// 包装器：持有门面、被包装函数的位置与模式
#[derive(Debug, Clone)]
pub struct Instrument {
    logger: LoggerHandle,
    location: SourceLocation,
    mode: Mode,
}

impl Instrument {
    pub fn new(logger: &LoggerHandle, location: SourceLocation, mode: Mode) -> Self {
        Self {
            logger: logger.clone(),
            location,
            mode,
        }
    }

    pub fn traced(logger: &LoggerHandle, location: SourceLocation) -> Self {
        Self::new(logger, location, Mode::Traced)
    }

    pub fn guarded(logger: &LoggerHandle, location: SourceLocation) -> Self {
        Self::new(logger, location, Mode::Guarded)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// 同步调用
    pub fn call<T, E, F>(&self, f: F) -> Option<T>
    where
        E: Display + Debug,
        F: FnOnce() -> Result<T, E>,
    {
        let probe = Probe::start(self);
        let outcome = match catch_unwind(AssertUnwindSafe(f)) {
            Ok(result) => Outcome::from_result(result),
            Err(payload) => Outcome::from_panic(payload.as_ref()),
        };
        probe.finish(outcome)
    }

    /// 异步调用；future 在调用方的运行时中执行
    pub async fn call_async<T, E, F, Fut>(&self, f: F) -> Option<T>
    where
        E: Display + Debug,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let probe = Probe::start(self);
        let outcome = match AssertUnwindSafe(async move { f().await }).catch_unwind().await {
            Ok(result) => Outcome::from_result(result),
            Err(payload) => Outcome::from_panic(payload.as_ref()),
        };
        probe.finish(outcome)
    }
}

/// 一次调用的埋点状态，同步与异步路径共用
#[derive(Debug)]
struct Probe<'a> {
    instrument: &'a Instrument,
}

impl<'a> Probe<'a> {
    fn start(instrument: &'a Instrument) -> Self {
        let probe = Self { instrument };
        if instrument.mode == Mode::Traced {
            probe.record(Level::Info, format!("[START] {}", probe.name()));
        }
        probe
    }

    fn finish<T>(self, outcome: Outcome<T>) -> Option<T> {
        match outcome {
            Outcome::Succeeded(value) => {
                if self.instrument.mode == Mode::Traced {
                    self.record(Level::Info, format!("[END] {}", self.name()));
                }
                Some(value)
            }
            Outcome::Failed { message, trace } => {
                let record = LogRecord::new(
                    Level::Error,
                    format!("{} failed: {message}", self.name()),
                    self.instrument.location.clone(),
                )
                .with_exception(trace);
                self.instrument.logger.emit(&record);
                if self.instrument.mode == Mode::Traced {
                    self.record(Level::Info, format!("[KILLED] {}", self.name()));
                }
                None
            }
        }
    }

    fn name(&self) -> &str {
        &self.instrument.location.function
    }

    fn record(&self, level: Level, message: String) {
        self.instrument
            .logger
            .log(level, self.instrument.location.clone(), message);
    }
}
