//! Storage boundaries for the catalog and carts.
//!
//! Both traits are implemented by [`InMemoryStore`] (dev/test) and
//! [`PostgresStore`]. Every cart operation is atomic within its store: the
//! get-or-create of the cart and the insert-or-increment of the line happen
//! as one unit, so `(cart, product)` never maps to two lines.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use storefront_cart::{CartItem, CartView, Quantity};
use storefront_catalog::{Category, Product, ProductQuery, Slug};
use storefront_core::{ProductId, UserId};

use crate::StoreResult;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Product and category persistence plus product querying.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>>;

    /// Fails with `NotFound("product")` when absent.
    async fn get_product(&self, id: ProductId) -> StoreResult<Product>;

    /// Fails with `Validation` when `category_id` does not exist.
    async fn insert_product(&self, product: Product) -> StoreResult<Product>;

    /// Overwrite an existing product. Fails with `NotFound("product")` when absent.
    async fn update_product(&self, product: Product) -> StoreResult<Product>;

    /// Delete a product together with any cart lines referencing it.
    async fn delete_product(&self, id: ProductId) -> StoreResult<()>;

    async fn list_categories(&self) -> StoreResult<Vec<Category>>;

    /// Fails with `NotFound("category")` when absent.
    async fn get_category(&self, slug: &Slug) -> StoreResult<Category>;

    /// Fails with `Conflict` when the slug is taken.
    async fn insert_category(&self, category: Category) -> StoreResult<Category>;

    /// Rename / re-slug the category currently at `slug`.
    async fn update_category(&self, slug: &Slug, name: String, new_slug: Slug) -> StoreResult<Category>;

    /// Delete a category; its products are detached, not deleted.
    async fn delete_category(&self, slug: &Slug) -> StoreResult<()>;

    /// Products belonging to the category at `slug`, refined by `query`.
    async fn list_category_products(&self, slug: &Slug, query: &ProductQuery) -> StoreResult<Vec<Product>>;
}

/// Per-user carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Return the user's cart with its lines, creating an empty cart first if
    /// the user has none.
    async fn get_or_create_cart(&self, user_id: UserId) -> StoreResult<CartView>;

    /// Atomically ensure the user's cart exists and add `quantity` of the
    /// product to it (insert or increment). Fails with `NotFound("product")`
    /// without side effects when the product does not exist.
    async fn add_item(&self, user_id: UserId, product_id: ProductId, quantity: Quantity) -> StoreResult<CartItem>;
}

#[async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        (**self).list_products(query).await
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        (**self).get_product(id).await
    }

    async fn insert_product(&self, product: Product) -> StoreResult<Product> {
        (**self).insert_product(product).await
    }

    async fn update_product(&self, product: Product) -> StoreResult<Product> {
        (**self).update_product(product).await
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        (**self).delete_product(id).await
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        (**self).list_categories().await
    }

    async fn get_category(&self, slug: &Slug) -> StoreResult<Category> {
        (**self).get_category(slug).await
    }

    async fn insert_category(&self, category: Category) -> StoreResult<Category> {
        (**self).insert_category(category).await
    }

    async fn update_category(&self, slug: &Slug, name: String, new_slug: Slug) -> StoreResult<Category> {
        (**self).update_category(slug, name, new_slug).await
    }

    async fn delete_category(&self, slug: &Slug) -> StoreResult<()> {
        (**self).delete_category(slug).await
    }

    async fn list_category_products(&self, slug: &Slug, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        (**self).list_category_products(slug, query).await
    }
}

#[async_trait]
impl<S> CartStore for Arc<S>
where
    S: CartStore + ?Sized,
{
    async fn get_or_create_cart(&self, user_id: UserId) -> StoreResult<CartView> {
        (**self).get_or_create_cart(user_id).await
    }

    async fn add_item(&self, user_id: UserId, product_id: ProductId, quantity: Quantity) -> StoreResult<CartItem> {
        (**self).add_item(user_id, product_id, quantity).await
    }
}
