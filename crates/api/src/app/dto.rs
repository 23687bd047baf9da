//! Request bodies and response shapes that differ from the domain types.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use storefront_cart::{CartView, Quantity, QuantityInput};
use storefront_core::{DomainError, DomainResult, ProductId};

/// Body of `POST /cart/`.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<QuantityInput>,
}

impl AddItemRequest {
    /// Validate the body. A missing quantity stays `None` (the service
    /// defaults it to 1).
    pub fn parse(&self) -> DomainResult<(ProductId, Option<Quantity>)> {
        let product_id = self
            .product_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| DomainError::validation("product_id is required"))?
            .parse::<ProductId>()?;
        let quantity = self.quantity.as_ref().map(QuantityInput::coerce).transpose()?;
        Ok((product_id, quantity))
    }
}

pub fn cart_to_json(view: &CartView) -> JsonValue {
    let items: Vec<JsonValue> = view
        .items
        .iter()
        .map(|line| {
            let quantity = line.item.quantity.get();
            json!({
                "id": line.item.id.to_string(),
                "product_id": line.item.product_id.to_string(),
                "product_name": line.product_name,
                "unit_price": line.unit_price,
                "quantity": quantity,
                "line_total": line.unit_price * Decimal::from(quantity),
            })
        })
        .collect();

    let total: Decimal = view
        .items
        .iter()
        .map(|l| l.unit_price * Decimal::from(l.item.quantity.get()))
        .sum();

    json!({
        "id": view.cart.id.to_string(),
        "user_id": view.cart.user_id.to_string(),
        "created_at": view.cart.created_at.to_rfc3339(),
        "items": items,
        "total": total,
    })
}
