//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity; they are immutable and compared by their
/// attribute values. In this workspace a cart `Quantity` or a category `Slug`
/// are value objects, while a `Product` is an entity.
///
/// Constructors of value objects validate their input, so holding one is proof
/// that the value is well-formed:
///
/// ```ignore
/// let q = Quantity::new(3)?;      // ok
/// let bad = Quantity::new(0);     // Err(DomainError::Validation(..))
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
