use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::config::AppConfig;
use crate::db::{PgUserStore, UserStore};
use crate::views::Views;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub views: Arc<Views>,
    flash_key: Key,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = PgUserStore::new(config.database.connect_options());
        if let Err(e) = store.run_migrations().await {
            tracing::warn!(error = %e, "migrations failed; continuing");
        }

        Self::from_parts(config, Arc::new(store))
    }

    pub fn from_parts(config: Arc<AppConfig>, users: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let views = Arc::new(Views::new().context("compile page templates")?);
        let flash_key = cookie_key(&config.secret_key);
        Ok(Self {
            config,
            users,
            views,
            flash_key,
        })
    }
}

/// `Key::from` needs 64 bytes; hashing lets any secret length sign cookies.
fn cookie_key(secret: &str) -> Key {
    Key::from(Sha512::digest(secret.as_bytes()).as_slice())
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.flash_key.clone()
    }
}
