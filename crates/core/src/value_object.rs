//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two transaction
/// records with the same action, symbol, quantity, price and timestamp are the
/// same record. To "modify" one, build a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Symbol(String);
///
/// impl ValueObject for Symbol {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
