//! In-memory store for tests/dev.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use storefront_cart::{Cart, CartItem, CartLine, CartView, Quantity, add_or_increment};
use storefront_catalog::{Category, Product, ProductQuery, Slug};
use storefront_core::{CategoryId, DomainError, ProductId, UserId};

use super::{CartStore, CatalogStore};
use crate::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    categories: HashMap<CategoryId, Category>,
    carts: HashMap<UserId, Cart>,
    /// Insertion-ordered; unique per `(cart_id, product_id)`.
    cart_items: Vec<CartItem>,
}

impl Tables {
    fn category_by_slug(&self, slug: &Slug) -> StoreResult<&Category> {
        self.categories
            .values()
            .find(|c| &c.slug == slug)
            .ok_or_else(|| StoreError::not_found("category"))
    }

    fn ensure_category_exists(&self, id: Option<CategoryId>) -> StoreResult<()> {
        match id {
            Some(id) if !self.categories.contains_key(&id) => Err(DomainError::validation(format!(
                "referenced record does not exist: category {id}"
            ))
            .into()),
            _ => Ok(()),
        }
    }

    fn ensure_slug_free(&self, slug: &Slug, except: Option<CategoryId>) -> StoreResult<()> {
        let taken = self
            .categories
            .values()
            .any(|c| &c.slug == slug && Some(c.id) != except);
        if taken {
            return Err(DomainError::conflict(format!("category slug '{slug}' already exists")).into());
        }
        Ok(())
    }

    fn cart_for(&mut self, user_id: UserId) -> Cart {
        self.carts
            .entry(user_id)
            .or_insert_with(|| {
                tracing::info!(user_id = %user_id, "created cart");
                Cart::new(user_id, Utc::now())
            })
            .clone()
    }
}

/// Process-local catalog and cart store.
///
/// A single lock guards every table, so each operation (including the whole
/// add-to-cart sequence) runs as one critical section.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn cart_view_for(&self, user_id: UserId) -> StoreResult<CartView> {
        let mut tables = self.write()?;
        let cart = tables.cart_for(user_id);

        let items = tables
            .cart_items
            .iter()
            .filter(|i| i.cart_id == cart.id)
            .filter_map(|i| {
                tables.products.get(&i.product_id).map(|p| CartLine {
                    item: i.clone(),
                    product_name: p.name.clone(),
                    unit_price: p.price,
                })
            })
            .collect();

        Ok(CartView { cart, items })
    }

    fn add_item_locked(&self, user_id: UserId, product_id: ProductId, quantity: Quantity) -> StoreResult<CartItem> {
        let mut tables = self.write()?;
        if !tables.products.contains_key(&product_id) {
            return Err(StoreError::not_found("product"));
        }

        let cart = tables.cart_for(user_id);
        let item = add_or_increment(&mut tables.cart_items, cart.id, product_id, quantity)?;
        Ok(item)
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        let tables = self.read()?;
        Ok(query.apply(tables.products.values().cloned()))
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        self.read()?
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("product"))
    }

    async fn insert_product(&self, product: Product) -> StoreResult<Product> {
        let mut tables = self.write()?;
        tables.ensure_category_exists(product.category_id)?;
        if tables.products.contains_key(&product.id) {
            return Err(DomainError::conflict(format!("product {} already exists", product.id)).into());
        }
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, product: Product) -> StoreResult<Product> {
        let mut tables = self.write()?;
        tables.ensure_category_exists(product.category_id)?;
        match tables.products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(product)
            }
            None => Err(StoreError::not_found("product")),
        }
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.products.remove(&id).is_none() {
            return Err(StoreError::not_found("product"));
        }
        tables.cart_items.retain(|i| i.product_id != id);
        Ok(())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let mut out: Vec<Category> = self.read()?.categories.values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.slug.as_str().cmp(b.slug.as_str())));
        Ok(out)
    }

    async fn get_category(&self, slug: &Slug) -> StoreResult<Category> {
        self.read()?.category_by_slug(slug).cloned()
    }

    async fn insert_category(&self, category: Category) -> StoreResult<Category> {
        let mut tables = self.write()?;
        tables.ensure_slug_free(&category.slug, None)?;
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, slug: &Slug, name: String, new_slug: Slug) -> StoreResult<Category> {
        let mut tables = self.write()?;
        let id = tables.category_by_slug(slug)?.id;
        tables.ensure_slug_free(&new_slug, Some(id))?;

        let category = Category { id, name, slug: new_slug };
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn delete_category(&self, slug: &Slug) -> StoreResult<()> {
        let mut tables = self.write()?;
        let id = tables.category_by_slug(slug)?.id;
        tables.categories.remove(&id);
        for product in tables.products.values_mut() {
            if product.category_id == Some(id) {
                product.category_id = None;
            }
        }
        Ok(())
    }

    async fn list_category_products(&self, slug: &Slug, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        let tables = self.read()?;
        let id = tables.category_by_slug(slug)?.id;
        Ok(query.apply(
            tables
                .products
                .values()
                .filter(|p| p.category_id == Some(id))
                .cloned(),
        ))
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn get_or_create_cart(&self, user_id: UserId) -> StoreResult<CartView> {
        self.cart_view_for(user_id)
    }

    async fn add_item(&self, user_id: UserId, product_id: ProductId, quantity: Quantity) -> StoreResult<CartItem> {
        self.add_item_locked(user_id, product_id, quantity)
    }
}
