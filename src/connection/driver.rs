//! sqlx-backed [`Connection`] for PostgreSQL and MySQL/MariaDB.
//!
//! The adapter owns a current-thread tokio runtime and blocks on every call,
//! so the rest of the tool stays synchronous. Queries go over the text
//! protocol and every column is decoded as text first, then narrowed to a
//! [`Value`] from the column's declared type. Bind parameters are rendered
//! as literals through the platform for the same reason.

use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Column, Connection as _, Row as _, TypeInfo};
use tokio::runtime::Runtime;

use super::{Connection, Row, Value};
use crate::error::{Error, Result};
use crate::platform::{self, Platform, PlatformKind};

enum Backend {
    Postgres(PgConnection),
    MySql(MySqlConnection),
}

/// Live database connection opened from a URL
pub struct SqlxConnection {
    runtime: Runtime,
    backend: Backend,
    platform: Box<dyn Platform>,
    platform_name: &'static str,
    in_transaction: bool,
}

impl SqlxConnection {
    /// Open a connection, picking the driver from the URL scheme.
    ///
    /// `postgres://`/`postgresql://` and `mysql://`/`mariadb://` are
    /// supported. Oracle URLs parse but have no driver.
    pub fn open(url: &str) -> Result<Self> {
        let (scheme, _) = url
            .split_once("://")
            .ok_or_else(|| Error::invalid_config(format!("database URL lacks a scheme: {}", redact(url))))?;
        let kind: PlatformKind = scheme.parse()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (backend, platform_name) = match kind {
            PlatformKind::Postgres => {
                let conn = runtime.block_on(PgConnection::connect(url))?;
                (Backend::Postgres(conn), "pgsql")
            }
            PlatformKind::MySql => {
                let url = url.replacen("mariadb://", "mysql://", 1);
                let conn = runtime.block_on(MySqlConnection::connect(&url))?;
                (Backend::MySql(conn), "mysql")
            }
            PlatformKind::Oracle => {
                return Err(Error::UnsupportedPlatform(
                    "oracle (no driver is bundled; use the platform for SQL generation only)"
                        .to_string(),
                ))
            }
        };

        tracing::debug!(platform = platform_name, url = %redact(url), "connected");

        Ok(Self {
            runtime,
            backend,
            platform: platform::create_for_kind(kind),
            platform_name,
            in_transaction: false,
        })
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    fn run_raw(&mut self, sql: &str) -> Result<u64> {
        let Self {
            runtime, backend, ..
        } = self;
        let affected = runtime.block_on(async {
            match backend {
                Backend::Postgres(conn) => sqlx::raw_sql(sql)
                    .execute(&mut *conn)
                    .await
                    .map(|r| r.rows_affected()),
                Backend::MySql(conn) => sqlx::raw_sql(sql)
                    .execute(&mut *conn)
                    .await
                    .map(|r| r.rows_affected()),
            }
        })?;
        Ok(affected)
    }

    /// Substitute positional placeholders with quoted literals, highest index first
    fn inline_params(&self, sql: &str, params: &[Value]) -> String {
        if params.is_empty() {
            return sql.to_string();
        }
        match self.platform.kind() {
            PlatformKind::MySql => {
                let mut out = String::with_capacity(sql.len());
                let mut values = params.iter().peekable();
                for c in sql.chars() {
                    match values.peek() {
                        Some(value) if c == '?' => {
                            out.push_str(&self.platform.quote_literal(value));
                            values.next();
                        }
                        _ => out.push(c),
                    }
                }
                out
            }
            _ => {
                let mut out = sql.to_string();
                for (i, value) in params.iter().enumerate().rev() {
                    out = out.replace(
                        &self.platform.placeholder(i + 1),
                        &self.platform.quote_literal(value),
                    );
                }
                out
            }
        }
    }
}

impl Connection for SqlxConnection {
    fn platform_name(&self) -> &str {
        self.platform_name
    }

    fn execute(&mut self, sql: &str) -> Result<u64> {
        self.run_raw(sql)
    }

    fn fetch_rows(&mut self, sql: &str) -> Result<Vec<Row>> {
        let Self {
            runtime, backend, ..
        } = self;
        runtime.block_on(async {
            match backend {
                Backend::Postgres(conn) => {
                    let rows = sqlx::raw_sql(sql).fetch_all(&mut *conn).await?;
                    rows.iter().map(pg_row).collect::<Result<Vec<Row>>>()
                }
                Backend::MySql(conn) => {
                    let rows = sqlx::raw_sql(sql).fetch_all(&mut *conn).await?;
                    rows.iter().map(mysql_row).collect::<Result<Vec<Row>>>()
                }
            }
        })
    }

    fn fetch_column(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Value>> {
        let sql = self.inline_params(sql, params);
        let rows = self.fetch_rows(&sql)?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Null))
            .collect())
    }

    fn quote(&self, value: &Value) -> String {
        self.platform.quote_literal(value)
    }

    fn begin(&mut self) -> Result<()> {
        let sql = match self.backend {
            Backend::Postgres(_) => "BEGIN",
            Backend::MySql(_) => "START TRANSACTION",
        };
        self.run_raw(sql)?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.run_raw("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let result = self.run_raw("ROLLBACK");
        self.in_transaction = false;
        result.map(|_| ())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }
}

fn pg_row(row: &PgRow) -> Result<Row> {
    let mut out = Row::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let raw: Option<String> = row.try_get_unchecked(i)?;
        out.insert(
            column.name().to_string(),
            narrow(column.type_info().name(), raw),
        );
    }
    Ok(out)
}

fn mysql_row(row: &MySqlRow) -> Result<Row> {
    let mut out = Row::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let raw: Option<String> = row.try_get_unchecked(i)?;
        out.insert(
            column.name().to_string(),
            narrow(column.type_info().name(), raw),
        );
    }
    Ok(out)
}

/// Turn a text-protocol value into a typed scalar using the column type name
fn narrow(type_name: &str, raw: Option<String>) -> Value {
    let Some(text) = raw else {
        return Value::Null;
    };
    let type_name = type_name.to_ascii_uppercase();

    match type_name.as_str() {
        "BOOL" | "BOOLEAN" => match text.as_str() {
            "t" | "true" | "1" => Value::Bool(true),
            "f" | "false" | "0" => Value::Bool(false),
            _ => Value::Text(text),
        },
        "FLOAT4" | "FLOAT8" | "FLOAT" | "DOUBLE" | "REAL" => {
            text.parse().map(Value::Float).unwrap_or(Value::Text(text))
        }
        t if t.contains("INT") && !t.contains("INTERVAL") && !t.contains("POINT") => {
            text.parse().map(Value::Int).unwrap_or(Value::Text(text))
        }
        _ => Value::Text(text),
    }
}

/// Hide the password part of a URL for logs and errors
pub fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let creds = &url[scheme_end + 3..at];
            match creds.split_once(':') {
                Some((user, _)) => format!("{}{}:***{}", &url[..scheme_end + 3], user, &url[at..]),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}
