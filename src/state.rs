use std::sync::Arc;

use crate::{
    auth::{jwt::JwtKeys, password::CredentialHasher, services::AuthService},
    config::AppConfig,
    db,
    users::{memory::InMemoryUserStore, postgres::PgUserStore, store::UserStore},
};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let users: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                let pool = db::connect(url).await?;
                db::migrate(&pool).await?;
                Arc::new(PgUserStore::new(pool))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory user store");
                Arc::new(InMemoryUserStore::new())
            }
        };

        Ok(Self::from_parts(&config, users, CredentialHasher::default()))
    }

    pub fn from_parts(
        config: &AppConfig,
        users: Arc<dyn UserStore>,
        hasher: CredentialHasher,
    ) -> Self {
        let keys = JwtKeys::from(&config.jwt);
        let auth = Arc::new(AuthService::new(users, hasher, keys));
        Self { auth }
    }
}
