//! 有限次数重试

use crate::constants::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY};
use crate::logger::LoggerHandle;
use crate::record::{Level, SourceLocation};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

fn report<E: Display>(logger: Option<&LoggerHandle>, location: &SourceLocation, attempt: u32, err: &E) {
    if let Some(logger) = logger {
        logger.log(
            Level::Warning,
            location.clone(),
            format!("{} failed for {attempt} times: {err}", location.function),
        );
    }
}

/// 最多执行 `attempts` 次，每次失败记录 WARNING 并等待 `delay`（最后一次失败后不等待）。
/// 全部失败时返回 `None`
pub fn retry<T, E, F>(
    logger: Option<&LoggerHandle>,
    location: &SourceLocation,
    attempts: u32,
    delay: Duration,
    mut f: F,
) -> Option<T>
where
    E: Display,
    F: FnMut() -> Result<T, E>,
{
    for attempt in 1..=attempts {
        match f() {
            Ok(value) => return Some(value),
            Err(e) => {
                report(logger, location, attempt, &e);
                if attempt < attempts {
                    std::thread::sleep(delay);
                }
            }
        }
    }
    None
}

/// [`retry`] 的异步版本，等待使用 `tokio::time::sleep`
pub async fn retry_async<T, E, F, Fut>(
    logger: Option<&LoggerHandle>,
    location: &SourceLocation,
    attempts: u32,
    delay: Duration,
    mut f: F,
) -> Option<T>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    for attempt in 1..=attempts {
        match f().await {
            Ok(value) => return Some(value),
            Err(e) => {
                report(logger, location, attempt, &e);
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
    None
}

/// 默认策略：最多 3 次，间隔 5 秒
pub fn retry_default<T, E, F>(logger: Option<&LoggerHandle>, location: &SourceLocation, f: F) -> Option<T>
where
    E: Display,
    F: FnMut() -> Result<T, E>,
{
    retry(logger, location, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY, f)
}

pub async fn retry_async_default<T, E, F, Fut>(
    logger: Option<&LoggerHandle>,
    location: &SourceLocation,
    f: F,
) -> Option<T>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_async(logger, location, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY, f).await
}
