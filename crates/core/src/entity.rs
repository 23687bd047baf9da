//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Products, categories, carts and cart items are all entities: two records
/// with equal fields but different ids are different records.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
