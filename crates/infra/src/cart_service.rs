//! Cart orchestration.
//!
//! ```text
//! AddItem(user, product, quantity?)
//!   ↓
//! 1. default quantity to 1
//!   ↓
//! 2. store.add_item: resolve product, get-or-create cart, insert-or-increment
//!    (one atomic unit inside the store)
//!   ↓
//! 3. return the resulting line
//! ```
//!
//! The user identity is always an explicit argument; the service never reads
//! ambient request state.

use tracing::instrument;

use storefront_cart::{CartItem, CartView, Quantity};
use storefront_core::{ProductId, UserId};

use crate::{CartStore, StoreResult};

#[derive(Debug, Clone)]
pub struct CartService<S> {
    store: S,
}

impl<S: CartStore> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Return the user's cart, creating it on first access. Idempotent.
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    pub async fn get_or_create_cart(&self, user_id: UserId) -> StoreResult<CartView> {
        self.store.get_or_create_cart(user_id).await
    }

    /// Add a product to the user's cart, incrementing an existing line.
    ///
    /// `quantity` defaults to 1. Fails with `NotFound("product")` when the
    /// product does not exist, in which case nothing is written.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id), err)]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Option<Quantity>,
    ) -> StoreResult<CartItem> {
        let quantity = quantity.unwrap_or_default();
        let item = self.store.add_item(user_id, product_id, quantity).await?;
        tracing::info!(quantity = item.quantity.get(), "cart line updated");
        Ok(item)
    }
}
