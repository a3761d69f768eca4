use std::path::PathBuf;

use anyhow::Context;
use sqlx::postgres::PgConnectOptions;

const DEFAULT_SECRET_KEY: &str = "my-secret-key";
const CLOUD_SQL_SOCKET_ROOT: &str = "/cloudsql";

/// Where the database server is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbAddress {
    Tcp { host: String, port: u16 },
    /// Unix socket directory of a managed (Cloud SQL) instance.
    Socket(PathBuf),
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub name: String,
    pub user: String,
    pub password: String,
    pub address: DbAddress,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .database(&self.name)
            .username(&self.user)
            .password(&self.password);
        match &self.address {
            DbAddress::Tcp { host, port } => options.host(host).port(*port),
            DbAddress::Socket(dir) => options.socket(dir),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub secret_key: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let address = if lookup("APP_ENV").as_deref() == Some("production") {
            let instance = lookup("INSTANCE_CONNECTION_NAME")
                .context("INSTANCE_CONNECTION_NAME is required when APP_ENV=production")?;
            DbAddress::Socket(PathBuf::from(CLOUD_SQL_SOCKET_ROOT).join(instance))
        } else {
            DbAddress::Tcp {
                host: var("DB_HOST", "localhost"),
                port: var("DB_PORT", "5432")
                    .parse()
                    .context("DB_PORT must be a valid port number")?,
            }
        };

        let database = DatabaseConfig {
            name: var("DB_NAME", "formapp"),
            user: var("DB_USER", "postgres"),
            password: var("DB_PASSWORD", "postgres"),
            address,
        };

        let secret_key = match lookup("SECRET_KEY") {
            Some(secret) => secret,
            None => {
                tracing::warn!("SECRET_KEY not set; using the built-in development key");
                DEFAULT_SECRET_KEY.to_string()
            }
        };

        Ok(Self {
            database,
            secret_key,
            host: var("APP_HOST", "0.0.0.0"),
            port: var("APP_PORT", "8080")
                .parse()
                .context("APP_PORT must be a valid port number")?,
        })
    }
}
