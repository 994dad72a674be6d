use std::sync::Arc;

use anyhow::Context;

use userdesk_infra::{AppConfig, InMemoryUserStore, PostgresUserStore, StoreBackend, UserStore};

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppServices {
    users: Arc<dyn UserStore>,
}

impl AppServices {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryUserStore::new()))
    }

    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }
}

/// Wire the configured store backend.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    match &config.store {
        StoreBackend::Memory => {
            tracing::info!("using in-memory user store");
            Ok(AppServices::in_memory())
        }
        StoreBackend::Postgres { database_url } => {
            let store = PostgresUserStore::connect(database_url)
                .await
                .context("failed to connect to postgres")?;
            store
                .migrate()
                .await
                .context("failed to migrate users table")?;
            tracing::info!("using postgres user store");
            Ok(AppServices::new(Arc::new(store)))
        }
    }
}
