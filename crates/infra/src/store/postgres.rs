//! Postgres-backed catalog and cart store.
//!
//! Constraint violations are mapped to domain errors by
//! [`map_sqlx_error`](crate::error::map_sqlx_error); everything else surfaces
//! as [`StoreError::Database`].
//!
//! ## Cart atomicity
//!
//! `add_item` runs in one transaction:
//! 1. lock the product row (`FOR KEY SHARE`) or fail with `NotFound`
//! 2. `INSERT INTO carts ... ON CONFLICT (user_id) DO UPDATE ... RETURNING`
//! 3. `INSERT INTO cart_items ... ON CONFLICT (cart_id, product_id) DO UPDATE
//!    SET quantity = cart_items.quantity + EXCLUDED.quantity RETURNING`
//!
//! The unique constraints on `carts.user_id` and `cart_items(cart_id,
//! product_id)` make concurrent adds serialize on the conflicting row instead
//! of producing duplicates.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use storefront_cart::{Cart, CartItem, CartLine, CartView, Quantity};
use storefront_catalog::{Category, Product, ProductFilter, ProductQuery, Slug};
use storefront_core::{CartId, CartItemId, CategoryId, DomainError, ProductId, UserId};

use super::{CartStore, CatalogStore};
use crate::error::map_sqlx_error;
use crate::{StoreError, StoreResult};

const SCHEMA: &str = include_str!("../../schema.sql");

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.price, p.stock, p.category_id, p.created_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32, connect_timeout: Duration) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn begin(&self, operation: &'static str) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| map_sqlx_error(operation, e))
    }

    async fn category_id_by_slug(&self, slug: &Slug) -> StoreResult<CategoryId> {
        let id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM categories WHERE slug = $1")
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("category_id_by_slug", e))?;
        id.map(CategoryId::from_uuid)
            .ok_or_else(|| StoreError::not_found("category"))
    }

    async fn query_products(&self, category: Option<CategoryId>, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE TRUE"));

        if let Some(category) = category {
            qb.push(" AND p.category_id = ").push_bind(*category.as_uuid());
        }

        for filter in &query.filters {
            match filter {
                ProductFilter::Price(p) => {
                    qb.push(" AND p.price ")
                        .push(p.op.sql_operator())
                        .push(" ")
                        .push_bind(p.value);
                }
                ProductFilter::Stock(p) => {
                    qb.push(" AND p.stock ")
                        .push(p.op.sql_operator())
                        .push(" ")
                        .push_bind(p.value);
                }
            }
        }

        for term in &query.search_terms {
            qb.push(" AND (strpos(lower(p.name), ")
                .push_bind(term.clone())
                .push(") > 0 OR strpos(lower(p.description), ")
                .push_bind(term.clone())
                .push(") > 0)");
        }

        qb.push(" ORDER BY ");
        for o in &query.ordering {
            qb.push("p.")
                .push(o.field.column())
                .push(if o.descending { " DESC, " } else { " ASC, " });
        }
        qb.push("p.created_at ASC, p.id ASC");

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_products", e))?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn upsert_cart(tx: &mut Transaction<'static, Postgres>, user_id: UserId) -> StoreResult<Cart> {
        let candidate = Cart::new(user_id, Utc::now());
        let row = sqlx::query_as::<_, CartRow>(
            r#"
            INSERT INTO carts (id, user_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, created_at
            "#,
        )
        .bind(*candidate.id.as_uuid())
        .bind(*user_id.as_uuid())
        .bind(candidate.created_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("upsert_cart", e))?;
        Ok(row.0)
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    #[instrument(skip(self, query), err)]
    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        self.query_products(None, query).await
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;
        row.map(|r| r.0).ok_or_else(|| StoreError::not_found("product"))
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn insert_product(&self, product: Product) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products AS p (id, name, description, price, stock, category_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING p.id, p.name, p.description, p.price, p.stock, p.category_id, p.created_at
            "#,
        )
        .bind(*product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.category_id.map(|c| *c.as_uuid()))
        .bind(product.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(row.0)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update_product(&self, product: Product) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE products AS p
            SET name = $2, description = $3, price = $4, stock = $5, category_id = $6
            WHERE p.id = $1
            RETURNING p.id, p.name, p.description, p.price, p.stock, p.category_id, p.created_at
            "#,
        )
        .bind(*product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.category_id.map(|c| *c.as_uuid()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;
        row.map(|r| r.0).ok_or_else(|| StoreError::not_found("product"))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product"));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>("SELECT id, name, slug FROM categories ORDER BY name, slug")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    #[instrument(skip(self), fields(slug = %slug), err)]
    async fn get_category(&self, slug: &Slug) -> StoreResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>("SELECT id, name, slug FROM categories WHERE slug = $1")
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;
        row.map(|r| r.0).ok_or_else(|| StoreError::not_found("category"))
    }

    #[instrument(skip(self, category), fields(slug = %category.slug), err)]
    async fn insert_category(&self, category: Category) -> StoreResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (id, name, slug) VALUES ($1, $2, $3) RETURNING id, name, slug",
        )
        .bind(*category.id.as_uuid())
        .bind(&category.name)
        .bind(category.slug.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(row.0)
    }

    #[instrument(skip(self, name), fields(slug = %slug, new_slug = %new_slug), err)]
    async fn update_category(&self, slug: &Slug, name: String, new_slug: Slug) -> StoreResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "UPDATE categories SET name = $2, slug = $3 WHERE slug = $1 RETURNING id, name, slug",
        )
        .bind(slug.as_str())
        .bind(&name)
        .bind(new_slug.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_category", e))?;
        row.map(|r| r.0).ok_or_else(|| StoreError::not_found("category"))
    }

    #[instrument(skip(self), fields(slug = %slug), err)]
    async fn delete_category(&self, slug: &Slug) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE slug = $1")
            .bind(slug.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("category"));
        }
        Ok(())
    }

    #[instrument(skip(self, query), fields(slug = %slug), err)]
    async fn list_category_products(&self, slug: &Slug, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        let category = self.category_id_by_slug(slug).await?;
        self.query_products(Some(category), query).await
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn get_or_create_cart(&self, user_id: UserId) -> StoreResult<CartView> {
        let mut tx = self.begin("get_or_create_cart").await?;
        let cart = Self::upsert_cart(&mut tx, user_id).await?;

        let items = sqlx::query_as::<_, CartLineRow>(
            r#"
            SELECT ci.id, ci.cart_id, ci.product_id, ci.quantity, p.name, p.price
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id
            "#,
        )
        .bind(*cart.id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("get_or_create_cart", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("get_or_create_cart", e))?;

        Ok(CartView {
            cart,
            items: items.into_iter().map(|r| r.0).collect(),
        })
    }

    #[instrument(
        skip(self),
        fields(user_id = %user_id, product_id = %product_id, quantity = quantity.get()),
        err
    )]
    async fn add_item(&self, user_id: UserId, product_id: ProductId, quantity: Quantity) -> StoreResult<CartItem> {
        let mut tx = self.begin("add_item").await?;

        // Holds off a concurrent product delete until commit.
        let product: Option<Uuid> = sqlx::query_scalar("SELECT id FROM products WHERE id = $1 FOR KEY SHARE")
            .bind(*product_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("add_item", e))?;
        if product.is_none() {
            return Err(StoreError::not_found("product"));
        }

        let cart = Self::upsert_cart(&mut tx, user_id).await?;

        let candidate = CartItem::new(cart.id, product_id, quantity);
        let row = sqlx::query_as::<_, CartItemRow>(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING id, cart_id, product_id, quantity
            "#,
        )
        .bind(*candidate.id.as_uuid())
        .bind(*cart.id.as_uuid())
        .bind(*product_id.as_uuid())
        .bind(quantity.get())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("add_item", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("add_item", e))?;
        Ok(row.0)
    }
}

fn decode_error(err: DomainError) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

struct ProductRow(Product);

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Product {
            id: ProductId::from_uuid(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            stock: row.try_get("stock")?,
            category_id: row
                .try_get::<Option<Uuid>, _>("category_id")?
                .map(CategoryId::from_uuid),
            created_at: row.try_get("created_at")?,
        }))
    }
}

struct CategoryRow(Category);

impl<'r> FromRow<'r, PgRow> for CategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let slug: String = row.try_get("slug")?;
        Ok(Self(Category {
            id: CategoryId::from_uuid(row.try_get("id")?),
            name: row.try_get("name")?,
            slug: Slug::parse(&slug).map_err(decode_error)?,
        }))
    }
}

struct CartRow(Cart);

impl<'r> FromRow<'r, PgRow> for CartRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Cart {
            id: CartId::from_uuid(row.try_get("id")?),
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            created_at: row.try_get("created_at")?,
        }))
    }
}

struct CartItemRow(CartItem);

impl<'r> FromRow<'r, PgRow> for CartItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let quantity: i32 = row.try_get("quantity")?;
        Ok(Self(CartItem {
            id: CartItemId::from_uuid(row.try_get("id")?),
            cart_id: CartId::from_uuid(row.try_get("cart_id")?),
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            quantity: Quantity::new(i64::from(quantity)).map_err(decode_error)?,
        }))
    }
}

struct CartLineRow(CartLine);

impl<'r> FromRow<'r, PgRow> for CartLineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let CartItemRow(item) = CartItemRow::from_row(row)?;
        Ok(Self(CartLine {
            item,
            product_name: row.try_get("name")?,
            unit_price: row.try_get("price")?,
        }))
    }
}
