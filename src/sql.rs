//! SQL 方言与查询生成器
//!
//! 只负责生成 SQL 文本，不执行、不转义；所有值都通过绑定参数传给调用方的执行层。

use crate::constants::DB_TIME_FORMAT;
use crate::error::{self, QueryError};
use crate::record::LogRecord;
use chrono::{Local, NaiveDateTime};

/// 列类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    /// 自增主键列
    Identifier,
    Integer,
    DateTime,
    Text,
}

/// 方言关键字（列修饰符）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    PrimaryKey,
    AutoIncrement,
    NotNull,
}

/// 列定义：名称、类型与零个或多个修饰符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub modifiers: &'static [Keyword],
}

impl ColumnSpec {
    pub const fn new(name: &'static str, sql_type: SqlType, modifiers: &'static [Keyword]) -> Self {
        Self {
            name,
            sql_type,
            modifiers,
        }
    }

    /// 是否由数据库自动生成（插入时跳过）
    pub fn is_generated(&self) -> bool {
        self.modifiers.contains(&Keyword::AutoIncrement)
    }
}

/// 数据库方言：占位符与关键字/类型替换表。无状态，全局只读共享。
#[derive(Debug, PartialEq, Eq)]
pub struct Dialect {
    pub name: &'static str,
    pub placeholder: &'static str,
    auto_increment: &'static str,
    identifier_type: &'static str,
}

/// SQLite：`?` 占位符，`AUTOINCREMENT`
pub static SQLITE: Dialect = Dialect {
    name: "sqlite",
    placeholder: "?",
    auto_increment: "AUTOINCREMENT",
    identifier_type: "INTEGER",
};

/// MariaDB / MySQL：`%s` 风格占位符，`AUTO_INCREMENT`
///
/// sqlx 的 MySQL 驱动使用 `?` 绑定，执行层在发送前用 [`Dialect::bind_positional`] 转换。
pub static MARIADB: Dialect = Dialect {
    name: "mariadb",
    placeholder: "%s",
    auto_increment: "AUTO_INCREMENT",
    identifier_type: "BIGINT",
};

impl Dialect {
    fn keyword(&self, keyword: Keyword) -> &'static str {
        match keyword {
            Keyword::PrimaryKey => "PRIMARY KEY",
            Keyword::AutoIncrement => self.auto_increment,
            Keyword::NotNull => "NOT NULL",
        }
    }

    fn type_name(&self, sql_type: SqlType) -> &'static str {
        match sql_type {
            SqlType::Identifier => self.identifier_type,
            SqlType::Integer => "INTEGER",
            SqlType::DateTime => "DATETIME",
            SqlType::Text => "TEXT",
        }
    }

    fn column_definition(&self, column: &ColumnSpec) -> String {
        // PRIMARY KEY 必须位于 AUTOINCREMENT 之前（SQLite 语法要求，MariaDB 两者皆可）
        let mut parts = vec![column.name, self.type_name(column.sql_type)];
        for keyword in [Keyword::PrimaryKey, Keyword::AutoIncrement, Keyword::NotNull] {
            if column.modifiers.contains(&keyword) {
                parts.push(self.keyword(keyword));
            }
        }
        parts.join(" ")
    }

    fn placeholders(&self, count: usize) -> String {
        vec![self.placeholder; count].join(", ")
    }

    /// 生成 `CREATE TABLE IF NOT EXISTS`
    pub fn create_table(&self, table: &str, columns: &[ColumnSpec]) -> Result<String, QueryError> {
        validate_identifier(table)?;
        if columns.is_empty() {
            return Err(QueryError::EmptyColumns {
                statement: "CREATE TABLE",
            });
        }
        let columns_str = columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("CREATE TABLE IF NOT EXISTS {table} ({columns_str})"))
    }

    /// 生成参数化 `INSERT`
    pub fn insert(&self, table: &str, columns: &[&str]) -> Result<String, QueryError> {
        validate_identifier(table)?;
        if columns.is_empty() {
            return Err(QueryError::EmptyColumns { statement: "INSERT" });
        }
        Ok(format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            self.placeholders(columns.len())
        ))
    }

    /// 生成参数化 `UPDATE`，WHERE 条件以 AND 连接
    pub fn update(&self, table: &str, columns: &[&str], wheres: &[&str]) -> Result<String, QueryError> {
        validate_identifier(table)?;
        if columns.is_empty() {
            return Err(QueryError::EmptyColumns { statement: "UPDATE" });
        }
        let assign = |cols: &[&str], sep: &str| {
            cols.iter()
                .map(|c| format!("{c} = {}", self.placeholder))
                .collect::<Vec<_>>()
                .join(sep)
        };
        let mut sql = format!("UPDATE {table} SET {}", assign(columns, ", "));
        if !wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&assign(wheres, " AND "));
        }
        Ok(sql)
    }

    /// 把本方言的占位符替换为驱动使用的 `?`
    pub fn bind_positional(&self, sql: &str) -> String {
        if self.placeholder == "?" {
            sql.to_string()
        } else {
            sql.replace(self.placeholder, "?")
        }
    }
}

/// 表名只允许 `[A-Za-z_][A-Za-z0-9_]*`，因为它会直接拼进 SQL 文本
pub fn validate_identifier(name: &str) -> Result<(), QueryError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(QueryError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

/// 日志表结构（所有数据库 sink 共用）
pub const LOG_TABLE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new(
        "id",
        SqlType::Identifier,
        &[Keyword::PrimaryKey, Keyword::AutoIncrement],
    ),
    ColumnSpec::new("created", SqlType::DateTime, &[]),
    ColumnSpec::new("level", SqlType::Integer, &[]),
    ColumnSpec::new("message", SqlType::Text, &[]),
    ColumnSpec::new("filename", SqlType::Text, &[]),
    ColumnSpec::new("funcName", SqlType::Text, &[]),
    ColumnSpec::new("lineno", SqlType::Integer, &[]),
];

/// 插入时使用的列（跳过自增列）
pub fn log_insert_columns() -> Vec<&'static str> {
    LOG_TABLE_COLUMNS
        .iter()
        .filter(|c| !c.is_generated())
        .map(|c| c.name)
        .collect()
}

/// 日志表的建表与插入语句
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStatements {
    pub create: String,
    pub insert: String,
}

/// 按方言生成日志表语句；表名不合法时返回 `Error::Query`
pub fn log_statements(dialect: &Dialect, table: &str) -> error::Result<LogStatements> {
    Ok(LogStatements {
        create: dialect.create_table(table, LOG_TABLE_COLUMNS)?,
        insert: dialect.insert(table, &log_insert_columns())?,
    })
}

/// 一条日志在数据库中的行值，字段顺序与 [`log_insert_columns`] 一致
#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    /// 本地时间
    pub created: NaiveDateTime,
    pub level: i64,
    /// 含异常文本的完整消息
    pub message: String,
    pub filename: String,
    pub func_name: String,
    pub lineno: i64,
}

impl LogRow {
    pub fn from_record(record: &LogRecord) -> Self {
        Self {
            created: record.created.with_timezone(&Local).naive_local(),
            level: i64::from(record.level.number()),
            message: record.full_message(),
            filename: record.location.file.clone(),
            func_name: record.location.function.clone(),
            lineno: i64::from(record.location.line),
        }
    }

    /// `created` 的文本形式（SQLite 以 TEXT 存储 DATETIME）
    pub fn created_text(&self) -> String {
        self.created.format(DB_TIME_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Level, SourceLocation};

    #[test]
    fn test_log_row_from_record() {
        let record = LogRecord::new(Level::Error, "boom", SourceLocation::new("a.rs", "run", 9))
            .with_exception("trace");
        let row = LogRow::from_record(&record);
        assert_eq!(row.level, 40);
        assert_eq!(row.message, "boom\ntrace");
        assert_eq!(row.func_name, "run");
        assert_eq!(row.lineno, 9);
        assert_eq!(row.created_text().len(), "2025-01-01 00:00:00.000000".len());
    }

    #[test]
    fn test_create_table_sqlite() {
        let sql = SQLITE.create_table("logs", LOG_TABLE_COLUMNS).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS logs (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             created DATETIME, level INTEGER, message TEXT, filename TEXT, funcName TEXT, \
             lineno INTEGER)"
        );
    }

    #[test]
    fn test_create_table_mariadb() {
        let sql = MARIADB.create_table("logs", LOG_TABLE_COLUMNS).unwrap();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS logs (id BIGINT PRIMARY KEY AUTO_INCREMENT, "));
        assert!(!sql.contains("AUTOINCREMENT"));
    }

    #[test]
    fn test_insert_placeholders() {
        let cols = log_insert_columns();
        assert_eq!(cols.len(), 6);
        assert_eq!(
            SQLITE.insert("logs", &cols).unwrap(),
            "INSERT INTO logs (created, level, message, filename, funcName, lineno) VALUES (?, ?, ?, ?, ?, ?)"
        );
        assert_eq!(
            MARIADB.insert("logs", &cols).unwrap(),
            "INSERT INTO logs (created, level, message, filename, funcName, lineno) VALUES (%s, %s, %s, %s, %s, %s)"
        );
    }

    #[test]
    fn test_update_query() {
        assert_eq!(
            SQLITE.update("logs", &["message", "level"], &["id", "lineno"]).unwrap(),
            "UPDATE logs SET message = ?, level = ? WHERE id = ? AND lineno = ?"
        );
        assert_eq!(
            MARIADB.update("logs", &["message"], &["id"]).unwrap(),
            "UPDATE logs SET message = %s WHERE id = %s"
        );
    }

    #[test]
    fn test_dialects_differ_only_in_tokens() {
        let cols = log_insert_columns();
        let sqlite = SQLITE.insert("logs", &cols).unwrap();
        let mariadb = MARIADB.insert("logs", &cols).unwrap();
        assert_ne!(sqlite, mariadb);
        assert_eq!(MARIADB.bind_positional(&mariadb), sqlite);

        let sqlite_ddl = SQLITE.create_table("logs", LOG_TABLE_COLUMNS).unwrap();
        let mariadb_ddl = MARIADB.create_table("logs", LOG_TABLE_COLUMNS).unwrap();
        assert_eq!(
            mariadb_ddl
                .replace("AUTO_INCREMENT", "AUTOINCREMENT")
                .replace("id BIGINT", "id INTEGER"),
            sqlite_ddl
        );
    }

    #[test]
    fn test_invalid_identifier_rejected() {
        assert!(SQLITE.insert("logs; DROP TABLE x", &["a"]).is_err());
        assert!(SQLITE.create_table("1logs", LOG_TABLE_COLUMNS).is_err());
        assert!(SQLITE.insert("logs", &[]).is_err());
    }

    #[test]
    fn test_log_statements_reject_bad_table() {
        let sql = log_statements(&MARIADB, "app_logs").unwrap();
        assert!(sql.create.starts_with("CREATE TABLE IF NOT EXISTS app_logs"));
        assert!(sql.insert.ends_with("VALUES (%s, %s, %s, %s, %s, %s)"));

        let err = log_statements(&SQLITE, "logs; DROP TABLE x").unwrap_err();
        assert!(matches!(
            err,
            error::Error::Query(QueryError::InvalidIdentifier { .. })
        ));
    }
}
