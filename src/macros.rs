//! 在调用点捕获文件、函数与行号的便捷宏

/// 以指定级别记录格式化消息
///
/// ```ignore
/// sinklog::log!(logger, sinklog::Level::Info, "processed {} rows", n);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, $crate::source_location!(), format!($($arg)+))
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::record::Level::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::record::Level::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::record::Level::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::record::Level::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::record::Level::Critical, $($arg)+)
    };
}

/// 以当前函数为被包装对象创建 Traced 埋点
///
/// ```ignore
/// fn sync_job(logger: &LoggerHandle) -> Option<usize> {
///     sinklog::traced!(logger).call(|| do_sync())
/// }
/// ```
#[macro_export]
macro_rules! traced {
    ($logger:expr) => {
        $crate::instrument::Instrument::traced(&$logger, $crate::source_location!())
    };
}

/// 以当前函数为被包装对象创建 Guarded 埋点
#[macro_export]
macro_rules! guarded {
    ($logger:expr) => {
        $crate::instrument::Instrument::guarded(&$logger, $crate::source_location!())
    };
}
