//! Utilities for generating arbitrary values with [`proptest`]

use proptest::collection::vec;
use proptest::prelude::*;

use crate::Value;

/// Generate an arbitrary non-null scalar [`Value`]
pub fn arbitrary_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<u64>().prop_map(Value::UnsignedInt),
        any::<f64>().prop_map(Value::Double),
        "[a-z]{0,8}".prop_map(Value::Text),
    ]
}

/// Generate an arbitrary [`Value::Int`], or `NULL` with the given probability
pub fn arbitrary_nullable_int(null_probability: f64) -> impl Strategy<Value = Value> {
    prop::option::weighted(1.0 - null_probability, any::<i64>()).prop_map(Value::from)
}

/// Generate an arbitrary array of same-typed scalars, some of which may be `NULL`
pub fn arbitrary_homogeneous_array() -> impl Strategy<Value = Value> {
    prop_oneof![
        vec(arbitrary_nullable_int(0.1), 0..16),
        vec(
            prop::option::weighted(0.9, "[a-z]{0,8}").prop_map(Value::from),
            0..16
        ),
        vec(any::<bool>().prop_map(Value::Bool), 0..4),
    ]
    .prop_map(Value::Array)
}

/// Generate an arbitrary [`Value`]: a scalar, `NULL`, a tuple of scalars, or an array of
/// same-typed scalars
pub fn arbitrary_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => arbitrary_scalar(),
        1 => Just(Value::Null),
        2 => vec(prop_oneof![4 => arbitrary_scalar(), 1 => Just(Value::Null)], 0..4)
            .prop_map(Value::Tuple),
        2 => arbitrary_homogeneous_array(),
    ]
}
