//! Infrastructure layer: catalog/cart storage backends and the cart service.

pub mod cart_service;
pub mod error;
pub mod store;

pub use cart_service::CartService;
pub use error::{StoreError, StoreResult};
pub use store::{CartStore, CatalogStore, InMemoryStore, PostgresStore};
