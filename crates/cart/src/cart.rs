use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_core::{CartId, CartItemId, DomainResult, Entity, ProductId, UserId};

use crate::Quantity;

/// A user's cart. At most one exists per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(user_id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            id: CartId::new(),
            user_id,
            created_at,
        }
    }
}

impl Entity for Cart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One product line in a cart. Unique per `(cart_id, product_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

impl CartItem {
    pub fn new(cart_id: CartId, product_id: ProductId, quantity: Quantity) -> Self {
        Self {
            id: CartItemId::new(),
            cart_id,
            product_id,
            quantity,
        }
    }

    pub fn increment(&mut self, by: Quantity) -> DomainResult<()> {
        self.quantity = self.quantity.checked_add(by)?;
        Ok(())
    }
}

impl Entity for CartItem {
    type Id = CartItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Add `quantity` of `product_id` to a cart's lines.
///
/// Creates the line when the product is not in the cart yet, otherwise
/// increments the existing line. Returns the resulting line. On overflow the
/// lines are left unchanged.
pub fn add_or_increment(
    lines: &mut Vec<CartItem>,
    cart_id: CartId,
    product_id: ProductId,
    quantity: Quantity,
) -> DomainResult<CartItem> {
    if let Some(line) = lines
        .iter_mut()
        .find(|l| l.cart_id == cart_id && l.product_id == product_id)
    {
        line.increment(quantity)?;
        return Ok(line.clone());
    }

    let line = CartItem::new(cart_id, product_id, quantity);
    lines.push(line.clone());
    Ok(line)
}

/// A cart line joined with the product details current at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub item: CartItem,
    pub product_name: String,
    pub unit_price: Decimal,
}

/// A cart with its lines, as returned by get-or-create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub cart: Cart,
    pub items: Vec<CartLine>,
}

impl CartView {
    pub fn quantity_of(&self, product_id: ProductId) -> Option<Quantity> {
        self.items
            .iter()
            .find(|l| l.item.product_id == product_id)
            .map(|l| l.item.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn q(v: i64) -> Quantity {
        Quantity::new(v).unwrap()
    }

    #[test]
    fn first_add_creates_line_then_increments() {
        let cart = CartId::new();
        let (p1, p2) = (ProductId::new(), ProductId::new());
        let mut lines = Vec::new();

        let a = add_or_increment(&mut lines, cart, p1, q(2)).unwrap();
        let b = add_or_increment(&mut lines, cart, p1, q(3)).unwrap();
        let c = add_or_increment(&mut lines, cart, p2, Quantity::default()).unwrap();

        assert_eq!(a.id, b.id);
        assert_eq!(b.quantity.get(), 5);
        assert_eq!(c.quantity.get(), 1);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn lines_are_scoped_to_their_cart() {
        let p = ProductId::new();
        let mut lines = Vec::new();

        add_or_increment(&mut lines, CartId::new(), p, q(1)).unwrap();
        add_or_increment(&mut lines, CartId::new(), p, q(1)).unwrap();

        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.quantity.get() == 1));
    }

    #[test]
    fn overflow_leaves_line_untouched() {
        let cart = CartId::new();
        let p = ProductId::new();
        let mut lines = Vec::new();
        add_or_increment(&mut lines, cart, p, q(i64::from(i32::MAX))).unwrap();

        assert!(add_or_increment(&mut lines, cart, p, q(1)).is_err());
        assert_eq!(lines[0].quantity.get(), i32::MAX);
    }

    proptest! {
        /// Property: repeated adds of one product keep a single line whose
        /// quantity is the sum of the requested quantities.
        #[test]
        fn repeated_adds_sum_into_one_line(adds in prop::collection::vec(1i64..1_000i64, 1..30)) {
            let cart = CartId::new();
            let p = ProductId::new();
            let mut lines = Vec::new();

            for a in &adds {
                add_or_increment(&mut lines, cart, p, q(*a)).unwrap();
            }

            prop_assert_eq!(lines.len(), 1);
            prop_assert_eq!(i64::from(lines[0].quantity.get()), adds.iter().sum::<i64>());
        }
    }
}
