//! Runtime values and their types.
//!
//! [`Value`] is the representation of literal data the planner has to reason about: constants
//! folded by analysis, and the elements of prepared sets. [`ValueType`] is the type analysis
//! assigns to every expression.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;

use itertools::Itertools;
use queryplan_errors::{PlanError, PlanResult};
use serde::{Deserialize, Serialize};

pub mod arbitrary;
mod size;
mod r#type;

pub use crate::r#type::ValueType;
pub use crate::size::SizeOf;

/// A single literal value.
///
/// Equality, ordering and hashing are total: `NULL` equals `NULL`, and floating-point values are
/// compared by their canonical bit pattern (so `-0.0 == 0.0` and `NaN == NaN`). Whether `NULL`
/// should *match* `NULL` in a membership test is a decision made by the set, not by the value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    UnsignedInt(u64),
    /// A floating point 64-bit real value.
    Double(f64),
    /// A string.
    Text(String),
    /// A tuple of values, possibly of different types.
    Tuple(Vec<Value>),
    /// An array of values of the same type.
    Array(Vec<Value>),
    /// A map, as an ordered list of key/value pairs.
    Map(Vec<(Value, Value)>),
}

fn canonical_bits(f: f64) -> u64 {
    if f.is_nan() {
        f64::NAN.to_bits()
    } else if f == 0.0 {
        0.0f64.to_bits()
    } else {
        f.to_bits()
    }
}

impl Value {
    /// Checks if this value is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the type analysis would assign to this value written as a literal.
    ///
    /// Composite values take the types of their first non-null element; if any element is
    /// `NULL` the element type is made nullable.
    pub fn natural_type(&self) -> ValueType {
        fn element_type<'a, I>(values: I) -> ValueType
        where
            I: Iterator<Item = &'a Value> + Clone,
        {
            let ty = values
                .clone()
                .find(|v| !v.is_null())
                .map(Value::natural_type)
                .unwrap_or(ValueType::Nothing);
            if values.clone().any(Value::is_null) {
                ty.nullable()
            } else {
                ty
            }
        }

        match self {
            Value::Null => ValueType::Nothing,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::UnsignedInt(_) => ValueType::UnsignedInt,
            Value::Double(_) => ValueType::Double,
            Value::Text(_) => ValueType::Text,
            Value::Tuple(vs) => ValueType::Tuple(
                vs.iter()
                    .map(|v| match v {
                        Value::Null => ValueType::Nothing,
                        v => v.natural_type(),
                    })
                    .collect(),
            ),
            Value::Array(vs) => ValueType::Array(Box::new(element_type(vs.iter()))),
            Value::Map(entries) => ValueType::Map(
                Box::new(element_type(entries.iter().map(|(k, _)| k))),
                Box::new(element_type(entries.iter().map(|(_, v)| v))),
            ),
        }
    }

    /// Convert this value to the given type, if it can be represented *exactly*.
    ///
    /// Returns `Ok(None)` if the value has no exact representation in `ty` (eg `1.5` as an
    /// integer, or `-1` as an unsigned integer); such a value can never compare equal to a value
    /// of type `ty`. `NULL` converts to `NULL` regardless of nullability, leaving the decision of
    /// what to do with it to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidSetElement`] if the *shape* of the value does not match the
    /// type, eg a tuple with the wrong number of elements, or a scalar where a tuple is expected.
    pub fn coerce_to(&self, ty: &ValueType) -> PlanResult<Option<Value>> {
        if self.is_null() {
            return Ok(Some(Value::Null));
        }

        Ok(match (self, ty) {
            (_, ValueType::Nullable(inner)) => return self.coerce_to(inner),
            (_, ValueType::Nothing) => None,

            (Value::Bool(b), ValueType::Bool) => Some(Value::Bool(*b)),
            (Value::Int(0) | Value::UnsignedInt(0), ValueType::Bool) => Some(Value::Bool(false)),
            (Value::Int(1) | Value::UnsignedInt(1), ValueType::Bool) => Some(Value::Bool(true)),
            (Value::Text(s), ValueType::Bool) => match s.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },

            (Value::Bool(b), ValueType::Int) => Some(Value::Int(i64::from(*b))),
            (Value::Int(i), ValueType::Int) => Some(Value::Int(*i)),
            (Value::UnsignedInt(u), ValueType::Int) => i64::try_from(*u).ok().map(Value::Int),
            (Value::Double(f), ValueType::Int) => double_to_i64(*f).map(Value::Int),
            (Value::Text(s), ValueType::Int) => s.trim().parse().ok().map(Value::Int),

            (Value::Bool(b), ValueType::UnsignedInt) => Some(Value::UnsignedInt(u64::from(*b))),
            (Value::Int(i), ValueType::UnsignedInt) => {
                u64::try_from(*i).ok().map(Value::UnsignedInt)
            }
            (Value::UnsignedInt(u), ValueType::UnsignedInt) => Some(Value::UnsignedInt(*u)),
            (Value::Double(f), ValueType::UnsignedInt) => {
                double_to_i64(*f).and_then(|i| u64::try_from(i).ok().map(Value::UnsignedInt))
            }
            (Value::Text(s), ValueType::UnsignedInt) => {
                s.trim().parse().ok().map(Value::UnsignedInt)
            }

            (Value::Int(i), ValueType::Double) => {
                let f = *i as f64;
                // `f as i64` saturates, so compare in a wider type
                (f as i128 == i128::from(*i)).then_some(Value::Double(f))
            }
            (Value::UnsignedInt(u), ValueType::Double) => {
                let f = *u as f64;
                (f as u128 == u128::from(*u)).then_some(Value::Double(f))
            }
            (Value::Double(f), ValueType::Double) => Some(Value::Double(*f)),
            (Value::Text(s), ValueType::Double) => s.trim().parse().ok().map(Value::Double),

            (Value::Text(s), ValueType::Text) => Some(Value::Text(s.clone())),

            (Value::Tuple(vs), ValueType::Tuple(tys)) => {
                if vs.len() != tys.len() {
                    return Err(PlanError::InvalidSetElement(format!(
                        "expected a tuple of {} elements, got {self}",
                        tys.len()
                    )));
                }
                coerce_all(vs.iter().zip(tys))?.map(Value::Tuple)
            }
            (_, ValueType::Tuple(tys)) => {
                return Err(PlanError::InvalidSetElement(format!(
                    "expected a tuple of {} elements, got {self}",
                    tys.len()
                )))
            }
            (Value::Array(vs), ValueType::Array(inner)) => {
                coerce_all(vs.iter().map(|v| (v, inner.as_ref())))?.map(Value::Array)
            }
            (Value::Map(entries), ValueType::Map(key_ty, value_ty)) => {
                let mut res = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    match (k.coerce_to(key_ty)?, v.coerce_to(value_ty)?) {
                        (Some(k), Some(v)) => res.push((k, v)),
                        _ => return Ok(None),
                    }
                }
                Some(Value::Map(res))
            }
            (Value::Tuple(_) | Value::Array(_) | Value::Map(_), _)
            | (_, ValueType::Array(_) | ValueType::Map(_, _)) => {
                return Err(PlanError::InvalidSetElement(format!(
                    "cannot use {self} as a value of type {ty}"
                )))
            }

            _ => None,
        })
    }
}

fn double_to_i64(f: f64) -> Option<i64> {
    if f.fract() != 0.0 || !f.is_finite() || f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return None;
    }
    Some(f as i64)
}

fn coerce_all<'a, I>(pairs: I) -> PlanResult<Option<Vec<Value>>>
where
    I: Iterator<Item = (&'a Value, &'a ValueType)>,
{
    let mut res = Vec::new();
    for (v, ty) in pairs {
        match v.coerce_to(ty)? {
            Some(v) => res.push(v),
            None => return Ok(None),
        }
    }
    Ok(Some(res))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Int(_) => 2,
                Value::UnsignedInt(_) => 3,
                Value::Double(_) => 4,
                Value::Text(_) => 5,
                Value::Tuple(_) => 6,
                Value::Array(_) => 7,
                Value::Map(_) => 8,
            }
        }

        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::UnsignedInt(a), Value::UnsignedInt(b)) => a.cmp(b),
            (Value::Double(a), Value::Double(b)) => {
                if canonical_bits(*a) == canonical_bits(*b) {
                    Ordering::Equal
                } else {
                    a.total_cmp(b)
                }
            }
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Tuple(a), Value::Tuple(b)) | (Value::Array(a), Value::Array(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(n) => n.hash(state),
            Value::UnsignedInt(n) => n.hash(state),
            Value::Double(f) => canonical_bits(*f).hash(state),
            Value::Text(t) => t.hash(state),
            Value::Tuple(vs) | Value::Array(vs) => vs.hash(state),
            Value::Map(entries) => entries.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::UnsignedInt(n) => write!(f, "{n}"),
            Value::Double(n) => write!(f, "{n}"),
            Value::Text(t) => write!(f, "'{}'", t.replace('\'', "''")),
            Value::Tuple(vs) => write!(f, "({})", vs.iter().join(", ")),
            Value::Array(vs) => write!(f, "[{}]", vs.iter().join(", ")),
            Value::Map(entries) => write!(
                f,
                "{{{}}}",
                entries.iter().map(|(k, v)| format!("{k}: {v}")).join(", ")
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::UnsignedInt(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T> From<Option<T>> for Value
where
    Value: From<T>,
{
    fn from(o: Option<T>) -> Self {
        o.map(Value::from).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use test_strategy::proptest;

    use super::*;
    use crate::arbitrary::arbitrary_value;

    fn hash_of(value: &Value) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn null_position_affects_hash() {
        let null_first = Value::Tuple(vec![Value::Null, Value::Int(1)]);
        let null_last = Value::Tuple(vec![Value::Int(1), Value::Null]);
        assert_ne!(hash_of(&null_first), hash_of(&null_last));
        assert_ne!(
            hash_of(&Value::Array(vec![Value::Null])),
            hash_of(&Value::Array(vec![]))
        );
        assert_ne!(
            hash_of(&Value::Tuple(vec![1.into()])),
            hash_of(&Value::Array(vec![1.into()]))
        );
    }

    #[test]
    fn equal_values_hash_equal() {
        assert_eq!(hash_of(&Value::Double(0.0)), hash_of(&Value::Double(-0.0)));
        assert_eq!(
            hash_of(&Value::Tuple(vec![Value::Null, "a".into()])),
            hash_of(&Value::Tuple(vec![Value::Null, "a".into()]))
        );
    }

    #[test]
    fn integer_to_double_only_when_exact() {
        assert_eq!(
            Value::Int(1 << 53).coerce_to(&ValueType::Double).unwrap(),
            Some(Value::Double(9007199254740992.0))
        );
        assert_eq!(
            Value::Int(i64::MIN).coerce_to(&ValueType::Double).unwrap(),
            Some(Value::Double(-9.223372036854775808e18))
        );
        assert_eq!(
            Value::Int((1 << 53) + 1)
                .coerce_to(&ValueType::Double)
                .unwrap(),
            None
        );
        assert_eq!(
            Value::Int(i64::MAX).coerce_to(&ValueType::Double).unwrap(),
            None
        );
        assert_eq!(
            Value::UnsignedInt(u64::MAX)
                .coerce_to(&ValueType::Double)
                .unwrap(),
            None
        );
    }

    #[test]
    fn null_equals_null() {
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Null, Value::Int(0));
    }

    #[test]
    fn doubles_compare_canonically() {
        assert_eq!(Value::Double(-0.0), Value::Double(0.0));
        assert_eq!(Value::Double(f64::NAN), Value::Double(-f64::NAN));
    }

    #[test]
    fn coerce_numbers_exactly() {
        assert_eq!(
            Value::Double(2.0).coerce_to(&ValueType::Int).unwrap(),
            Some(Value::Int(2))
        );
        assert_eq!(Value::Double(2.5).coerce_to(&ValueType::Int).unwrap(), None);
        assert_eq!(
            Value::Int(-1).coerce_to(&ValueType::UnsignedInt).unwrap(),
            None
        );
        assert_eq!(
            Value::UnsignedInt(3).coerce_to(&ValueType::Int).unwrap(),
            Some(Value::Int(3))
        );
        assert_eq!(
            Value::from("42").coerce_to(&ValueType::Int).unwrap(),
            Some(Value::Int(42))
        );
        assert_eq!(Value::from("abc").coerce_to(&ValueType::Int).unwrap(), None);
        assert_eq!(Value::Int(1).coerce_to(&ValueType::Text).unwrap(), None);
    }

    #[test]
    fn coerce_null_is_null() {
        assert_eq!(
            Value::Null.coerce_to(&ValueType::Int).unwrap(),
            Some(Value::Null)
        );
    }

    #[test]
    fn coerce_tuple_arity_mismatch() {
        let ty = ValueType::Tuple(vec![ValueType::Int, ValueType::Int]);
        let err = Value::Tuple(vec![1.into()]).coerce_to(&ty).unwrap_err();
        assert!(matches!(err, PlanError::InvalidSetElement(_)));
        let err = Value::Int(1).coerce_to(&ty).unwrap_err();
        assert!(matches!(err, PlanError::InvalidSetElement(_)));
    }

    #[test]
    fn coerce_tuple_elementwise() {
        let ty = ValueType::Tuple(vec![ValueType::Int, ValueType::Text.nullable()]);
        assert_eq!(
            Value::Tuple(vec![Value::UnsignedInt(1), Value::Null])
                .coerce_to(&ty)
                .unwrap(),
            Some(Value::Tuple(vec![Value::Int(1), Value::Null]))
        );
        assert_eq!(
            Value::Tuple(vec![Value::Double(1.5), "a".into()])
                .coerce_to(&ty)
                .unwrap(),
            None
        );
    }

    #[test]
    fn natural_type_of_array_with_null() {
        let v = Value::Array(vec![Value::Null, 1.into(), 2.into()]);
        assert_eq!(
            v.natural_type(),
            ValueType::Array(Box::new(ValueType::Int.nullable()))
        );
    }

    #[test]
    fn display() {
        let v = Value::Tuple(vec![1.into(), "it's".into(), Value::Null]);
        assert_eq!(v.to_string(), "(1, 'it''s', NULL)");
    }

    #[proptest]
    fn coerce_to_natural_type_is_identity(#[strategy(arbitrary_value())] v: Value) {
        assert_eq!(v.coerce_to(&v.natural_type()).unwrap(), Some(v));
    }
}
