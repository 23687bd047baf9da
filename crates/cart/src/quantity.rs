use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, ValueObject};

/// A strictly positive cart quantity.
///
/// Bounded by `i32::MAX` so it always fits the storage column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(i32);

impl ValueObject for Quantity {}

impl Quantity {
    /// Quantity used when a request does not specify one.
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: i64) -> DomainResult<Self> {
        if value <= 0 {
            return Err(DomainError::validation("quantity must be a positive integer"));
        }
        let value = i32::try_from(value)
            .map_err(|_| DomainError::validation(format!("quantity cannot exceed {}", i32::MAX)))?;
        Ok(Self(value))
    }

    pub fn get(self) -> i32 {
        self.0
    }

    pub fn checked_add(self, other: Quantity) -> DomainResult<Quantity> {
        self.0
            .checked_add(other.0)
            .map(Quantity)
            .ok_or_else(|| DomainError::validation(format!("quantity cannot exceed {}", i32::MAX)))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        QuantityInput::deserialize(deserializer)?
            .coerce()
            .map_err(serde::de::Error::custom)
    }
}

/// Quantity as it arrives on the wire, before coercion.
///
/// Clients send either a JSON number or a numeric string (`"3"`); both are
/// accepted as long as they denote a positive integer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
    Int(i64),
    Float(f64),
    Text(String),
}

impl QuantityInput {
    pub fn coerce(&self) -> DomainResult<Quantity> {
        match self {
            Self::Int(v) => Quantity::new(*v),
            Self::Float(v) => {
                if v.fract() != 0.0 || !v.is_finite() {
                    return Err(DomainError::validation("quantity must be a whole number"));
                }
                if *v > i64::MAX as f64 || *v < i64::MIN as f64 {
                    return Err(DomainError::validation("quantity is out of range"));
                }
                Quantity::new(*v as i64)
            }
            Self::Text(s) => {
                let v = s.trim().parse::<i64>().map_err(|_| {
                    DomainError::validation(format!("quantity '{s}' is not an integer"))
                })?;
                Quantity::new(v)
            }
        }
    }
}
