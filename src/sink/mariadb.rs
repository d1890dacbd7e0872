//! MariaDB sink
//!
//! sqlx 的连接只能在 tokio 运行时中使用，而 `emit` 可能在任意线程（包括其他运行时内部）调用，
//! 因此连接由专用工作线程持有，调用方通过通道提交并同步等待结果。

use super::{RecordSink, SinkKind};
use crate::config::{MariadbConfig, MariadbDbConfig};
use crate::constants::{DB_CONNECT_TIMEOUT, DB_WRITE_TIMEOUT};
use crate::error::{DeliveryError, SinkError};
use crate::logger::mark_sink_thread;
use crate::record::LogRecord;
use crate::sql::{LogRow, MARIADB, log_statements};
use crate::{delivery_error, sink_error};
use log::{debug, info};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

type Reply = Result<(), String>;

#[derive(Debug)]
struct InsertRequest {
    row: LogRow,
    reply: SyncSender<Reply>,
}

/// MariaDB sink - 每条记录一次 INSERT
#[derive(Debug)]
pub struct MariadbSink {
    table: String,
    sender: Option<UnboundedSender<InsertRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl MariadbSink {
    /// 连接数据库并建表；失败时返回 `SinkError`
    pub fn new(config: &MariadbConfig) -> Result<Self, SinkError> {
        let db = &config.db_config;
        for (field, value) in [("host", &db.host), ("user", &db.user), ("db", &db.db), ("table", &db.table)] {
            if value.trim().is_empty() {
                return Err(sink_error!(MissingSetting {
                    sink: SinkKind::Mariadb,
                    field,
                }));
            }
        }

        let schema_error = |reason: String| {
            sink_error!(Schema {
                sink: SinkKind::Mariadb,
                table: db.table.clone(),
                reason,
            })
        };
        let sql = log_statements(&MARIADB, &db.table).map_err(|e| schema_error(e.to_string()))?;

        let (sender, receiver) = unbounded_channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let options = connect_options(db);
        let statements = Statements {
            create: MARIADB.bind_positional(&sql.create),
            insert: MARIADB.bind_positional(&sql.insert),
            table: db.table.clone(),
        };

        let worker = thread::Builder::new()
            .name("sinklog-mariadb".to_string())
            .spawn(move || run_worker(&options, &statements, receiver, &ready_tx))
            .map_err(|e| {
                sink_error!(Worker {
                    sink: SinkKind::Mariadb,
                    reason: e.to_string(),
                })
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(sink_error!(Worker {
                    sink: SinkKind::Mariadb,
                    reason: "worker exited before connecting".to_string(),
                }));
            }
        }

        info!(
            "MariaDB sink ready: {}@{}:{}/{} (table: {})",
            db.user, db.host, db.port, db.db, db.table
        );
        Ok(Self {
            table: db.table.clone(),
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl RecordSink for MariadbSink {
    fn emit(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(delivery_error!(Dispatch { sink: SinkKind::Mariadb }))?;
        let (reply, response) = mpsc::sync_channel(1);
        sender
            .send(InsertRequest {
                row: LogRow::from_record(record),
                reply,
            })
            .map_err(|_| delivery_error!(Dispatch { sink: SinkKind::Mariadb }))?;

        match response.recv_timeout(DB_WRITE_TIMEOUT) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(delivery_error!(Database {
                sink: SinkKind::Mariadb,
                reason,
            })),
            Err(RecvTimeoutError::Timeout) => Err(delivery_error!(Timeout {
                sink: SinkKind::Mariadb,
                seconds: DB_WRITE_TIMEOUT.as_secs(),
            })),
            Err(RecvTimeoutError::Disconnected) => {
                Err(delivery_error!(Dispatch { sink: SinkKind::Mariadb }))
            }
        }
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Mariadb
    }
}

impl Drop for MariadbSink {
    fn drop(&mut self) {
        // 关闭通道后工作线程处理完剩余请求即退出
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[derive(Debug)]
struct Statements {
    create: String,
    insert: String,
    table: String,
}

fn connect_options(db: &MariadbDbConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&db.host)
        .port(db.port)
        .username(&db.user)
        .password(&db.password)
        .database(&db.db)
        .disable_statement_logging()
}

fn run_worker(
    options: &MySqlConnectOptions,
    statements: &Statements,
    mut receiver: UnboundedReceiver<InsertRequest>,
    ready: &SyncSender<Result<(), SinkError>>,
) {
    mark_sink_thread();
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .on_thread_start(mark_sink_thread)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            let _ = ready.send(Err(sink_error!(Worker {
                sink: SinkKind::Mariadb,
                reason: e.to_string(),
            })));
            return;
        }
    };

    runtime.block_on(async move {
        let mut conn = match connect(options, statements).await {
            Ok(conn) => conn,
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };
        let _ = ready.send(Ok(()));

        while let Some(request) = receiver.recv().await {
            let row = request.row;
            let result = sqlx::query(&statements.insert)
                .bind(row.created)
                .bind(row.level)
                .bind(row.message)
                .bind(row.filename)
                .bind(row.func_name)
                .bind(row.lineno)
                .execute(&mut conn)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string());
            // 调用方可能已超时离开
            let _ = request.reply.send(result);
        }

        if let Err(e) = conn.close().await {
            debug!("MariaDB connection close failed: {e}");
        }
    });
}

async fn connect(
    options: &MySqlConnectOptions,
    statements: &Statements,
) -> Result<MySqlConnection, SinkError> {
    let connect_error = |reason: String| {
        sink_error!(Connect {
            sink: SinkKind::Mariadb,
            reason,
        })
    };

    let mut conn = tokio::time::timeout(DB_CONNECT_TIMEOUT, MySqlConnection::connect_with(options))
        .await
        .map_err(|_| {
            connect_error(format!(
                "timed out after {}s",
                DB_CONNECT_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|e| connect_error(e.to_string()))?;

    sqlx::query(&statements.create)
        .execute(&mut conn)
        .await
        .map_err(|e| {
            sink_error!(Schema {
                sink: SinkKind::Mariadb,
                table: statements.table.clone(),
                reason: e.to_string(),
            })
        })?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Level;

    fn config(host: &str, port: u16, table: &str) -> MariadbConfig {
        MariadbConfig {
            alert_level: Level::Info,
            db_config: MariadbDbConfig {
                host: host.to_string(),
                user: "user".to_string(),
                password: "password".to_string(),
                db: "db".to_string(),
                port,
                table: table.to_string(),
            },
        }
    }

    #[test]
    fn test_unreachable_host_fails_to_connect() {
        let err = MariadbSink::new(&config("127.0.0.1", 1, "logs")).unwrap_err();
        assert!(matches!(err, SinkError::Connect { sink: SinkKind::Mariadb, .. }), "{err}");
    }

    #[test]
    fn test_missing_host() {
        let err = MariadbSink::new(&config("", 3306, "logs")).unwrap_err();
        assert!(matches!(err, SinkError::MissingSetting { field: "host", .. }));
    }

    #[test]
    fn test_invalid_table_rejected_before_connecting() {
        let err = MariadbSink::new(&config("127.0.0.1", 1, "logs`x")).unwrap_err();
        assert!(matches!(err, SinkError::Schema { .. }));
    }

    #[test]
    fn test_password_hidden_in_debug() {
        let text = format!("{:?}", config("h", 1, "t"));
        assert!(!text.contains("password\""));
        assert!(text.contains("***"));
    }
}
