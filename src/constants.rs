//! 公共常量
//! 提供：
//! - 合法日志级别常量 LOG_LEVELS
//! - 文本行与数据库使用的时间格式
//! - Webhook / 数据库超时
//! - 重试默认值

use std::time::Duration;

/// 合法的日志级别（统一来源，按严重程度升序）
pub const LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

/// 文本 sink 行首时间戳格式，例如 `2025-01-01 12:00:00,123`
pub const LINE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// 数据库 `created` 列的时间格式
pub const DB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Webhook 单次投递的超时时间
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(60);

/// 数据库连接建立的超时时间
pub const DB_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// 单条记录写入数据库的最长等待时间
pub const DB_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// 重试辅助函数的默认尝试次数
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// 重试辅助函数的默认间隔
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
