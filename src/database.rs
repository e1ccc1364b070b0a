//! Database connection bootstrap
//!
//! The dispatcher only needs to know whether a connection could be
//! established for the current request. [`Connector`] is the seam; the
//! shipped [`PgConnector`] logs in to PostgreSQL with the configured
//! credentials and keeps the session open for the lifetime of the request.

use crate::config::DatabaseConfig;
use chrono::{DateTime, Local};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection as _;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;

/// Connection bootstrap failure
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The server answered but refused the login (bad credentials, unknown database, ...)
    #[error("database at {addr} rejected the connection: {source}")]
    Rejected {
        addr: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("database at {addr} is unreachable: {source}")]
    Unreachable {
        addr: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("database at {addr} did not answer within {timeout_ms} ms")]
    Timeout { addr: String, timeout_ms: u64 },
    /// `connect` was called from a thread with no tokio runtime behind it
    #[error("no async runtime available to reach the database at {addr}")]
    NoRuntime { addr: String },
}

impl ConnectionError {
    fn from_sqlx(addr: String, source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::Database(_) => Self::Rejected { addr, source },
            source => Self::Unreachable { addr, source },
        }
    }

    /// SQLSTATE reported by the server, if it refused the login
    pub fn sqlstate(&self) -> Option<String> {
        match self {
            Self::Rejected {
                source: sqlx::Error::Database(db),
                ..
            } => db.code().map(|code| code.into_owned()),
            _ => None,
        }
    }
}

/// Request-scoped database connection
#[derive(Debug)]
pub struct Connection {
    address: Option<String>,
    database: String,
    username: String,
    established_at: DateTime<Local>,
    _session: Option<PgConnection>,
}

impl Connection {
    /// Connection placeholder used when no database is configured
    pub fn detached(config: &DatabaseConfig) -> Self {
        Self {
            address: None,
            database: config.database.clone(),
            username: config.username.clone(),
            established_at: Local::now(),
            _session: None,
        }
    }

    /// `host:port` of the server, `None` for a detached connection
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub const fn established_at(&self) -> DateTime<Local> {
        self.established_at
    }
}

/// Database connection service
pub trait Connector: Send + Sync {
    fn connect(&self, config: &DatabaseConfig) -> Result<Connection, ConnectionError>;
}

/// Connector that logs in to PostgreSQL with sqlx
///
/// Dispatch runs on the blocking pool, so the async login is driven with
/// the ambient runtime handle. Calling it from an async task panics in
/// `Handle::block_on`; outside any runtime it fails with
/// [`ConnectionError::NoRuntime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PgConnector;

impl PgConnector {
    fn options(config: &DatabaseConfig) -> PgConnectOptions {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username);
        if !config.password.is_empty() {
            options = options.password(&config.password);
        }
        if !config.database.is_empty() {
            options = options.database(&config.database);
        }
        options
    }
}

impl Connector for PgConnector {
    fn connect(&self, config: &DatabaseConfig) -> Result<Connection, ConnectionError> {
        let addr = format!("{}:{}", config.host, config.port);
        let Ok(runtime) = Handle::try_current() else {
            return Err(ConnectionError::NoRuntime { addr });
        };

        let options = Self::options(config);
        let timeout_ms = config.connect_timeout_ms.max(1);
        let attempt = runtime.block_on(async {
            tokio::time::timeout(
                Duration::from_millis(timeout_ms),
                PgConnection::connect_with(&options),
            )
            .await
        });

        match attempt {
            Ok(Ok(session)) => Ok(Connection {
                address: Some(addr),
                database: config.database.clone(),
                username: config.username.clone(),
                established_at: Local::now(),
                _session: Some(session),
            }),
            Ok(Err(source)) => Err(ConnectionError::from_sqlx(addr, source)),
            Err(_) => Err(ConnectionError::Timeout { addr, timeout_ms }),
        }
    }
}

/// Connector used when the database is disabled; always succeeds
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledConnector;

impl Connector for DisabledConnector {
    fn connect(&self, config: &DatabaseConfig) -> Result<Connection, ConnectionError> {
        Ok(Connection::detached(config))
    }
}

/// Pick the connector matching the configuration
pub fn connector_for(config: &DatabaseConfig) -> Arc<dyn Connector> {
    if config.enabled {
        Arc::new(PgConnector)
    } else {
        Arc::new(DisabledConnector)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn db_config(port: u16) -> DatabaseConfig {
        DatabaseConfig {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port,
            username: "nobody".to_string(),
            password: "definitely-wrong".to_string(),
            database: "shop".to_string(),
            connect_timeout_ms: 2000,
        }
    }

    async fn connect_blocking(cfg: DatabaseConfig) -> Result<Connection, ConnectionError> {
        tokio::task::spawn_blocking(move || PgConnector.connect(&cfg))
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bad_credentials_are_rejected() {
        let port = fake_server::refusing_logins();

        let err = connect_blocking(db_config(port)).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Rejected { .. }), "{err:?}");
        assert_eq!(err.sqlstate().as_deref(), Some("28P01"));
        assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_plain_tcp_socket_is_not_a_database() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut cfg = db_config(port);
        cfg.connect_timeout_ms = 200;

        // Handshake completes in the backlog, the login never gets an answer
        let err = connect_blocking(cfg).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Timeout { timeout_ms: 200, .. }), "{err:?}");
        drop(listener);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_closed_port_is_unreachable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = connect_blocking(db_config(port)).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Unreachable { .. }), "{err:?}");
        assert_eq!(err.sqlstate(), None);
    }

    #[test]
    fn test_connect_without_runtime() {
        let err = PgConnector.connect(&db_config(5432)).unwrap_err();
        assert!(matches!(err, ConnectionError::NoRuntime { .. }));
    }

    #[test]
    fn test_disabled_connector_always_succeeds() {
        let mut cfg = db_config(1);
        cfg.enabled = false;
        let conn = connector_for(&cfg).connect(&cfg).unwrap();
        assert!(conn.address().is_none());
        assert_eq!(conn.database(), "shop");
        assert_eq!(conn.username(), "nobody");
    }
}
