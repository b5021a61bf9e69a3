use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The type of a [`Value`](crate::Value), as assigned to query tree nodes during analysis.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// The type of a bare `NULL` literal. Only `NULL` inhabits it.
    Nothing,

    /// `true` or `false`.
    Bool,

    /// [`i64`].
    Int,

    /// [`u64`].
    UnsignedInt,

    /// [`f64`]: a IEEE 754 floating-point 64-bit real value.
    Double,

    /// Variable-length character string.
    Text,

    /// `T` or `NULL`.
    Nullable(Box<ValueType>),

    /// Fixed-arity heterogeneous tuple.
    Tuple(Vec<ValueType>),

    /// Variable-length homogeneous array.
    Array(Box<ValueType>),

    /// Ordered list of key/value pairs.
    Map(Box<ValueType>, Box<ValueType>),
}

impl ValueType {
    /// Wrap `self` in [`ValueType::Nullable`], unless it already is nullable.
    #[must_use]
    pub fn nullable(self) -> Self {
        match self {
            Self::Nullable(_) | Self::Nothing => self,
            ty => Self::Nullable(Box::new(ty)),
        }
    }

    /// Returns the type with a single outer [`ValueType::Nullable`] removed.
    pub fn strip_nullable(&self) -> &ValueType {
        match self {
            Self::Nullable(inner) => inner,
            ty => ty,
        }
    }

    /// The nesting depth of the type, counting arrays and tuples as one level each. A map counts
    /// as an array of `(key, value)` tuples.
    ///
    /// Nullability does not contribute to depth. This is what decides whether a constant on the
    /// right-hand side of `IN` is one element, or a collection of elements, of the left-hand
    /// side's type.
    ///
    /// ```rust
    /// use queryplan_data::ValueType;
    ///
    /// assert_eq!(ValueType::Int.depth(), 0);
    /// assert_eq!(ValueType::Array(Box::new(ValueType::Int)).depth(), 1);
    /// let pair = ValueType::Tuple(vec![ValueType::Int, ValueType::Text]);
    /// assert_eq!(pair.depth(), 1);
    /// assert_eq!(ValueType::Array(Box::new(pair)).depth(), 2);
    /// ```
    pub fn depth(&self) -> usize {
        match self {
            Self::Nullable(inner) => inner.depth(),
            Self::Array(inner) => 1 + inner.depth(),
            Self::Tuple(elements) => 1 + elements.iter().map(Self::depth).max().unwrap_or(0),
            Self::Map(key, value) => 2 + key.depth().max(value.depth()),
            Self::Nothing
            | Self::Bool
            | Self::Int
            | Self::UnsignedInt
            | Self::Double
            | Self::Text => 0,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => f.write_str("Nothing"),
            Self::Bool => f.write_str("Bool"),
            Self::Int => f.write_str("Int64"),
            Self::UnsignedInt => f.write_str("UInt64"),
            Self::Double => f.write_str("Float64"),
            Self::Text => f.write_str("String"),
            Self::Nullable(inner) => write!(f, "Nullable({inner})"),
            Self::Tuple(elements) => write!(f, "Tuple({})", elements.iter().join(", ")),
            Self::Array(inner) => write!(f, "Array({inner})"),
            Self::Map(key, value) => write!(f, "Map({key}, {value})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullable_does_not_add_depth() {
        let ty = ValueType::Array(Box::new(ValueType::Int.nullable())).nullable();
        assert_eq!(ty.depth(), 1);
    }

    #[test]
    fn map_depth() {
        let ty = ValueType::Map(Box::new(ValueType::Text), Box::new(ValueType::Int));
        assert_eq!(ty.depth(), 2);
    }

    #[test]
    fn nullable_is_idempotent() {
        assert_eq!(
            ValueType::Int.nullable().nullable(),
            ValueType::Nullable(Box::new(ValueType::Int))
        );
        assert_eq!(ValueType::Nothing.nullable(), ValueType::Nothing);
    }

    #[test]
    fn display() {
        let ty = ValueType::Tuple(vec![
            ValueType::Int.nullable(),
            ValueType::Array(Box::new(ValueType::Text)),
        ]);
        assert_eq!(ty.to_string(), "Tuple(Nullable(Int64), Array(String))");
    }
}
