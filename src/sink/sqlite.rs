use super::{RecordSink, SinkKind};
use crate::config::SqliteConfig;
use crate::error::{DeliveryError, SinkError};
use crate::record::LogRecord;
use crate::sql::{LogRow, SQLITE, log_statements};
use crate::{delivery_error, sink_error};
use log::info;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// SQLite sink - 每条记录一次 INSERT，连接在 sink 生命周期内复用
#[derive(Debug)]
pub struct SqliteSink {
    db_path: String,
    table: String,
    insert_sql: String,
    conn: Mutex<Connection>,
}

impl SqliteSink {
    pub fn new(config: &SqliteConfig) -> Result<Self, SinkError> {
        let db = &config.db_config;
        if db.db_path.trim().is_empty() {
            return Err(sink_error!(MissingSetting {
                sink: SinkKind::Sqlite,
                field: "db_path",
            }));
        }
        if db.table.trim().is_empty() {
            return Err(sink_error!(MissingSetting {
                sink: SinkKind::Sqlite,
                field: "table",
            }));
        }

        let schema_error = |reason: String| {
            sink_error!(Schema {
                sink: SinkKind::Sqlite,
                table: db.table.clone(),
                reason,
            })
        };
        let sql = log_statements(&SQLITE, &db.table).map_err(|e| schema_error(e.to_string()))?;

        // 确保目录存在
        let path = Path::new(&db.db_path);
        if let Some(parent) = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty() && !p.exists())
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                sink_error!(CreateDirectoryFailed {
                    path: parent.to_path_buf(),
                    reason: e.to_string(),
                })
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            sink_error!(Connect {
                sink: SinkKind::Sqlite,
                reason: format!("failed to open {}: {e}", db.db_path),
            })
        })?;
        conn.busy_timeout(Duration::from_secs(5)).map_err(|e| {
            sink_error!(Connect {
                sink: SinkKind::Sqlite,
                reason: e.to_string(),
            })
        })?;
        conn.execute(&sql.create, [])
            .map_err(|e| schema_error(e.to_string()))?;

        info!("SQLite sink ready: {} (table: {})", db.db_path, db.table);
        Ok(Self {
            db_path: db.db_path.clone(),
            table: db.table.clone(),
            insert_sql: sql.insert,
            conn: Mutex::new(conn),
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl RecordSink for SqliteSink {
    fn emit(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        let row = LogRow::from_record(record);
        let conn = self
            .conn
            .lock()
            .map_err(|_| delivery_error!(Poisoned { sink: SinkKind::Sqlite }))?;
        conn.execute(
            &self.insert_sql,
            rusqlite::params![
                row.created_text(),
                row.level,
                row.message,
                row.filename,
                row.func_name,
                row.lineno,
            ],
        )
        .map_err(|e| {
            delivery_error!(Database {
                sink: SinkKind::Sqlite,
                reason: e.to_string(),
            })
        })?;
        Ok(())
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Sqlite
    }
}
