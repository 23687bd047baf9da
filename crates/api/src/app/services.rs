//! Store selection and service wiring.

use std::sync::Arc;

use storefront_infra::{CartService, CartStore, CatalogStore, InMemoryStore, PostgresStore, StoreResult};

use crate::config::DatabaseConfig;

/// Shared handles used by request handlers.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<dyn CatalogStore>,
    pub carts: CartService<Arc<dyn CartStore>>,
}

impl AppServices {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            catalog: store.clone(),
            carts: CartService::new(store as Arc<dyn CartStore>),
        }
    }

    /// Connect to Postgres and make sure the schema exists.
    pub async fn postgres(db: &DatabaseConfig) -> StoreResult<Self> {
        let store = PostgresStore::connect(&db.url, db.max_connections, db.connect_timeout).await?;
        store.ensure_schema().await?;
        let store = Arc::new(store);
        Ok(Self {
            catalog: store.clone(),
            carts: CartService::new(store as Arc<dyn CartStore>),
        })
    }
}

pub async fn build_services(database: Option<&DatabaseConfig>) -> StoreResult<AppServices> {
    match database {
        Some(db) => {
            tracing::info!(max_connections = db.max_connections, "using postgres stores");
            AppServices::postgres(db).await
        }
        None => {
            tracing::info!("using in-memory stores");
            Ok(AppServices::in_memory())
        }
    }
}
