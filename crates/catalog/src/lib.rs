//! Catalog domain module.
//!
//! Products, categories and the product query model, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Stores in
//! `storefront-infra` persist these types and evaluate [`ProductQuery`].

pub mod category;
pub mod product;
pub mod query;

pub use category::{Category, CategoryPatch, NewCategory, Slug};
pub use product::{NewProduct, Product, ProductPatch};
pub use query::{Comparison, OrderField, Ordering, Predicate, ProductFilter, ProductQuery};
