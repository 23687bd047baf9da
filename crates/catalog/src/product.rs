use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainError, DomainResult, Entity, ProductId};

/// Maximum product name length (characters).
pub const MAX_NAME_LEN: usize = 255;

/// Prices are stored with at most this many fractional digits.
pub const PRICE_SCALE: u32 = 2;

/// Prices must stay below this bound (ten integer digits).
const MAX_PRICE_EXCLUSIVE: i64 = 10_000_000_000;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for creating a product, or for replacing one wholesale (PUT).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        validate_name(&self.name)?;
        validate_price(self.price)?;
        validate_stock(self.stock)?;
        Ok(())
    }

    /// Validate and materialize a new product record.
    pub fn into_product(self, id: ProductId, created_at: DateTime<Utc>) -> DomainResult<Product> {
        self.validate()?;
        Ok(Product {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
            price: self.price.normalize(),
            stock: self.stock,
            category_id: self.category_id,
            created_at,
        })
    }
}

/// Partial update (PATCH). `None` leaves the field untouched.
///
/// `category_id` is doubly optional: absent keeps the category, `null`
/// detaches the product from its category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<CategoryId>>,
}

impl Product {
    /// Replace every mutable field (PUT semantics). Identity and creation time
    /// are preserved.
    pub fn replace(&mut self, input: NewProduct) -> DomainResult<()> {
        let replaced = input.into_product(self.id, self.created_at)?;
        *self = replaced;
        Ok(())
    }

    /// Apply a partial update. Validation happens before any field changes, so
    /// a rejected patch leaves the product untouched.
    pub fn apply_patch(&mut self, patch: ProductPatch) -> DomainResult<()> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(price) = patch.price {
            validate_price(price)?;
        }
        if let Some(stock) = patch.stock {
            validate_stock(stock)?;
        }

        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price) = patch.price {
            self.price = price.normalize();
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> DomainResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(format!(
            "name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> DomainResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(DomainError::validation("price cannot be negative"));
    }
    if price >= Decimal::from(MAX_PRICE_EXCLUSIVE) {
        return Err(DomainError::validation("price is too large"));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(DomainError::validation(format!(
            "price cannot have more than {PRICE_SCALE} decimal places"
        )));
    }
    Ok(())
}

fn validate_stock(stock: i32) -> DomainResult<()> {
    if stock < 0 {
        return Err(DomainError::validation("stock cannot be negative"));
    }
    Ok(())
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
