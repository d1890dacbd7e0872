//! Webhook sink：Discord / Slack
//!
//! `emit` 只构造请求体并交给后台投递线程，立即返回。
//! 投递线程持有自己的 tokio 运行时，每条记录一个独立任务，失败只输出到 stderr，不重试。

use super::{RecordSink, SinkKind, discord, slack};
use crate::config::{DiscordConfig, SlackConfig};
use crate::constants::WEBHOOK_TIMEOUT;
use crate::error::{DeliveryError, SinkError};
use crate::logger::mark_sink_thread;
use crate::record::LogRecord;
use crate::{delivery_error, sink_error};
use log::{debug, info};
use reqwest::{Client, Url};
use serde_json::Value;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinSet;

/// 消息格式与显示身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookFormat {
    Discord {
        username: String,
        avatar_url: String,
    },
    Slack {
        service_name: String,
    },
}

impl WebhookFormat {
    pub fn kind(&self) -> SinkKind {
        match self {
            WebhookFormat::Discord { .. } => SinkKind::Discord,
            WebhookFormat::Slack { .. } => SinkKind::Slack,
        }
    }

    pub fn payload(&self, record: &LogRecord) -> Value {
        match self {
            WebhookFormat::Discord {
                username,
                avatar_url,
            } => discord::build_payload(record, username, avatar_url),
            WebhookFormat::Slack { service_name } => slack::build_payload(record, service_name),
        }
    }
}

#[derive(Debug)]
pub struct WebhookSink {
    url: Url,
    format: WebhookFormat,
    dispatcher: Dispatcher,
}

impl WebhookSink {
    pub fn discord(config: &DiscordConfig) -> Result<Self, SinkError> {
        Self::new(
            &config.webhook_url,
            WebhookFormat::Discord {
                username: config.username.clone(),
                avatar_url: config.avatar_url.clone(),
            },
        )
    }

    pub fn slack(config: &SlackConfig) -> Result<Self, SinkError> {
        Self::new(
            &config.webhook_url,
            WebhookFormat::Slack {
                service_name: config.service_name.clone(),
            },
        )
    }

    pub fn new(webhook_url: &str, format: WebhookFormat) -> Result<Self, SinkError> {
        let kind = format.kind();
        let url = parse_url(kind, webhook_url)?;
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| {
                sink_error!(Connect {
                    sink: kind,
                    reason: e.to_string(),
                })
            })?;
        let dispatcher = Dispatcher::start(kind, client, url.clone())?;
        info!("{kind} webhook sink ready: {}", url.host_str().unwrap_or_default());
        Ok(Self {
            url,
            format,
            dispatcher,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn format(&self) -> &WebhookFormat {
        &self.format
    }

    /// 停止接收新记录，等待已提交的投递在 `grace` 内结束
    pub fn close(&self, grace: Duration) -> bool {
        self.dispatcher.close(grace)
    }
}

impl RecordSink for WebhookSink {
    fn emit(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        self.dispatcher.submit(self.format.payload(record))
    }

    fn kind(&self) -> SinkKind {
        self.format.kind()
    }
}

fn parse_url(kind: SinkKind, webhook_url: &str) -> Result<Url, SinkError> {
    if webhook_url.trim().is_empty() {
        return Err(sink_error!(MissingSetting {
            sink: kind,
            field: "webhook_url",
        }));
    }
    let url = Url::parse(webhook_url.trim()).map_err(|e| {
        sink_error!(InvalidSetting {
            sink: kind,
            field: "webhook_url",
            reason: e.to_string(),
        })
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(sink_error!(InvalidSetting {
            sink: kind,
            field: "webhook_url",
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }));
    }
    Ok(url)
}

/// 后台投递线程
#[derive(Debug)]
struct Dispatcher {
    kind: SinkKind,
    sender: Mutex<Option<UnboundedSender<Value>>>,
    done: Mutex<Option<Receiver<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    fn start(kind: SinkKind, client: Client, url: Url) -> Result<Self, SinkError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name(format!("sinklog-{kind}"))
            .on_thread_start(mark_sink_thread)
            .enable_all()
            .build()
            .map_err(|e| {
                sink_error!(Worker {
                    sink: kind,
                    reason: e.to_string(),
                })
            })?;

        let (sender, receiver) = unbounded_channel();
        let (done_tx, done_rx) = mpsc::sync_channel(1);
        let worker = thread::Builder::new()
            .name(format!("sinklog-{kind}-dispatch"))
            .spawn(move || {
                mark_sink_thread();
                runtime.block_on(dispatch_loop(kind, client, Arc::new(url), receiver));
                let _ = done_tx.send(());
            })
            .map_err(|e| {
                sink_error!(Worker {
                    sink: kind,
                    reason: e.to_string(),
                })
            })?;

        Ok(Self {
            kind,
            sender: Mutex::new(Some(sender)),
            done: Mutex::new(Some(done_rx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    fn submit(&self, payload: Value) -> Result<(), DeliveryError> {
        let sender = self
            .sender
            .lock()
            .map_err(|_| delivery_error!(Poisoned { sink: self.kind }))?;
        match sender.as_ref() {
            Some(tx) => tx
                .send(payload)
                .map_err(|_| delivery_error!(Dispatch { sink: self.kind })),
            None => Err(delivery_error!(Dispatch { sink: self.kind })),
        }
    }

    fn close(&self, grace: Duration) -> bool {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let Some(done) = self.done.lock().ok().and_then(|mut d| d.take()) else {
            return true;
        };

        match done.recv_timeout(grace) {
            Err(RecvTimeoutError::Timeout) => {
                debug!("{} webhook dispatcher still busy after {grace:?}", self.kind);
                false
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(worker) = self.worker.lock().ok().and_then(|mut w| w.take()) {
                    let _ = worker.join();
                }
                true
            }
        }
    }
}

async fn dispatch_loop(
    kind: SinkKind,
    client: Client,
    url: Arc<Url>,
    mut receiver: UnboundedReceiver<Value>,
) {
    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            payload = receiver.recv() => match payload {
                Some(payload) => {
                    in_flight.spawn(deliver(kind, client.clone(), Arc::clone(&url), payload));
                }
                None => break,
            },
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }
    while in_flight.join_next().await.is_some() {}
}

async fn deliver(kind: SinkKind, client: Client, url: Arc<Url>, payload: Value) {
    match client.post(url.as_str()).json(&payload).send().await {
        Ok(response) if response.status().is_success() => {}
        Ok(response) => {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            eprintln!("sinklog: {kind} webhook returned {status}: {body}");
        }
        Err(e) => eprintln!("sinklog: {kind} webhook delivery failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_url_is_missing_setting() {
        let err = WebhookSink::discord(&DiscordConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            SinkError::MissingSetting {
                sink: SinkKind::Discord,
                field: "webhook_url"
            }
        ));
    }

    #[test]
    fn test_non_http_url_rejected() {
        let err = WebhookSink::slack(&SlackConfig {
            webhook_url: "ftp://example.com/hook".to_string(),
            ..SlackConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, SinkError::InvalidSetting { sink: SinkKind::Slack, .. }));
    }

    #[test]
    fn test_submit_after_close_fails() {
        let sink = WebhookSink::slack(&SlackConfig {
            webhook_url: "http://127.0.0.1:1/hook".to_string(),
            ..SlackConfig::default()
        })
        .unwrap();
        assert!(sink.close(Duration::from_secs(5)));
        assert!(sink.close(Duration::ZERO));

        let record = LogRecord::new(
            crate::record::Level::Error,
            "late",
            crate::record::SourceLocation::new("a.rs", "f", 1),
        );
        assert!(matches!(sink.emit(&record), Err(DeliveryError::Dispatch { .. })));
    }
}
