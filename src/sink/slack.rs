//! Slack Webhook 消息格式

use crate::record::{Level, LogRecord};
use serde_json::{Value, json};

/// 标题前的级别图标
pub fn emoji(level: Level) -> &'static str {
    match level {
        Level::Debug => "🔵",
        Level::Info => "⚪",
        Level::Warning => "🟠",
        Level::Error => "🔴",
        Level::Critical => "🟣",
    }
}

/// Attachment 侧边颜色
pub fn color(level: Level) -> &'static str {
    match level {
        Level::Debug => "#999999",
        Level::Info => "#ffffff",
        Level::Warning => "#ffa500",
        Level::Error => "#ff0000",
        Level::Critical => "#992d22",
    }
}

/// 构造请求体。Slack 的 mrkdwn 与 Discord 规则不同，消息不做转义
pub fn build_payload(record: &LogRecord, service_name: &str) -> Value {
    let mut header = format!("{}{}", emoji(record.level), record.level);
    if !service_name.is_empty() {
        header.push_str(" - ");
        header.push_str(service_name);
    }

    let location = &record.location;
    let body = format!(
        "@ `{} - {} : {}`\n```\n{}\n```",
        location.file,
        location.function,
        location.line,
        record.full_message()
    );

    json!({
        "attachments": [{
            "color": color(record.level),
            "blocks": [
                {
                    "type": "header",
                    "text": { "type": "plain_text", "text": header, "emoji": true }
                },
                {
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": body }
                }
            ]
        }]
    })
}
