//! Discord Webhook 消息格式

use crate::record::{Level, LogRecord};
use chrono::SecondsFormat;
use serde_json::{Value, json};

/// 在 Markdown 中有特殊含义、需要转义的字符
const MARKDOWN_CHARS: [char; 5] = ['*', '`', '_', '~', '>'];

/// 转义 Markdown 特殊字符，避免文件名、函数名被渲染成格式
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Embed 侧边颜色（十进制 RGB）
pub fn color(level: Level) -> u32 {
    match level {
        Level::Debug => 10_066_329,
        Level::Info => 16_777_215,
        Level::Warning => 16_776_960,
        Level::Error => 16_711_680,
        Level::Critical => 10_038_562,
    }
}

/// 构造 Webhook 请求体：一个 embed，标题为级别，描述中包含来源与代码块包裹的消息
pub fn build_payload(record: &LogRecord, username: &str, avatar_url: &str) -> Value {
    let location = &record.location;
    let description = format!(
        "@ {} \\- {} : {}\n```\n{}```",
        sanitize(&location.file),
        sanitize(&location.function),
        location.line,
        record.full_message()
    );

    let mut payload = json!({
        "embeds": [{
            "title": record.level.as_str(),
            "description": description,
            "timestamp": record.created.to_rfc3339_opts(SecondsFormat::Micros, true),
            "color": color(record.level),
        }]
    });

    if let Value::Object(map) = &mut payload {
        if !username.is_empty() {
            map.insert("username".to_string(), Value::String(username.to_string()));
        }
        if !avatar_url.is_empty() {
            map.insert("avatar_url".to_string(), Value::String(avatar_url.to_string()));
        }
    }
    payload
}
