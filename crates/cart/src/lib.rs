//! Cart domain module.
//!
//! Per-user carts, cart lines and the add-or-increment rule, as pure domain
//! logic. Atomicity of get-or-create + increment is a storage concern and
//! lives with the stores in `storefront-infra`.

pub mod cart;
pub mod quantity;

pub use cart::{Cart, CartItem, CartLine, CartView, add_or_increment};
pub use quantity::{Quantity, QuantityInput};
