use anyhow::Context;
use axum::async_trait;
use sqlx::{postgres::PgConnectOptions, Connection, PgConnection};
use tracing::{debug, instrument, warn};

pub const INSERT_USER_SQL: &str = r#"
    INSERT INTO users (first_name, last_name, email, favourite_colour)
    VALUES ($1, $2, $3, $4)
    RETURNING id
"#;

/// Write side of the `users` table. Callers validate before inserting.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        favourite_colour: &str,
    ) -> anyhow::Result<i64>;
}

/// Opens a new connection for every insert; no pooling.
#[derive(Clone)]
pub struct PgUserStore {
    options: PgConnectOptions,
}

impl PgUserStore {
    pub fn new(options: PgConnectOptions) -> Self {
        Self { options }
    }

    async fn connect(&self) -> anyhow::Result<PgConnection> {
        PgConnection::connect_with(&self.options)
            .await
            .context("connect to database")
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        let mut conn = self.connect().await?;
        sqlx::migrate!("./migrations")
            .run(&mut conn)
            .await
            .context("run migrations")?;
        conn.close().await.context("close connection")?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip(self, first_name, last_name, email))]
    async fn insert_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        favourite_colour: &str,
    ) -> anyhow::Result<i64> {
        // Dropping `conn` or `tx` on an early return closes the connection
        // and rolls back.
        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await.context("begin transaction")?;

        let id: i64 = sqlx::query_scalar(INSERT_USER_SQL)
            .bind(first_name)
            .bind(last_name)
            .bind(email)
            .bind(favourite_colour)
            .fetch_one(&mut *tx)
            .await
            .context("insert user")?;

        tx.commit().await.context("commit insert")?;
        debug!(id, "user row committed");

        if let Err(e) = conn.close().await {
            warn!(error = %e, "closing database connection failed");
        }
        Ok(id)
    }
}
