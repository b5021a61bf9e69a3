//! Helpers for `IN` predicates: recognizing them, and building sets from constant right-hand
//! sides.

use std::fmt;

use queryplan_data::{Value, ValueType};
use queryplan_errors::{unsupported, PlanError, PlanResult};
use tracing::trace;

use crate::set::PreparedSet;
use crate::settings::PlannerSettings;

/// One of the membership-test functions, eg `in` or `globalNotNullIn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InFunction {
    pub negated: bool,
    pub global: bool,
    pub null_in: bool,
}

impl InFunction {
    /// Recognize the name of a membership-test function.
    ///
    /// ```
    /// use queryplan::set_utils::InFunction;
    ///
    /// let f = InFunction::from_name("globalNotIn").unwrap();
    /// assert!(f.global && f.negated && !f.null_in);
    /// assert_eq!(f.name(), "globalNotIn");
    /// assert!(InFunction::from_name("notEquals").is_none());
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        let (global, rest) = match name.strip_prefix("global") {
            Some(rest) => (true, rest),
            None => (false, name),
        };
        let (negated, null_in) = match (global, rest) {
            (false, "in") | (true, "In") => (false, false),
            (false, "notIn") | (true, "NotIn") => (true, false),
            (false, "nullIn") | (true, "NullIn") => (false, true),
            (false, "notNullIn") | (true, "NotNullIn") => (true, true),
            _ => return None,
        };
        Some(Self {
            negated,
            global,
            null_in,
        })
    }

    pub fn name(&self) -> &'static str {
        match (self.global, self.negated, self.null_in) {
            (false, false, false) => "in",
            (false, true, false) => "notIn",
            (false, false, true) => "nullIn",
            (false, true, true) => "notNullIn",
            (true, false, false) => "globalIn",
            (true, true, false) => "globalNotIn",
            (true, false, true) => "globalNullIn",
            (true, true, true) => "globalNotNullIn",
        }
    }
}

impl fmt::Display for InFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Is `name` the name of a membership-test function?
pub fn is_name_of_in_function(name: &str) -> bool {
    InFunction::from_name(name).is_some()
}

/// Build a ready [`PreparedSet`] from the constant right-hand side of an `IN`.
///
/// `expression_type` is the type of the left-hand side; `value` and `value_type` are the constant
/// and its type. If the constant has the same nesting depth as the left-hand side it is a single
/// element, and if it is one level deeper it is a collection (tuple, array or map) of elements.
/// Map entries are elements of the form `(key, value)`.
///
/// Each element is converted to `expression_type`; elements with no exact representation in that
/// type can never match, and are left out. `NULL` elements are kept only if the settings ask for
/// `transform_null_in`.
///
/// # Errors
///
/// * [`PlanError::Unsupported`] if the depth of `value_type` is neither that of
///   `expression_type` nor one more.
/// * [`PlanError::InvalidSetElement`] if an element does not have the shape of
///   `expression_type`, eg a tuple with the wrong number of elements.
/// * [`PlanError::SetSizeLimitExceeded`] if the set exceeds its limits in throw mode.
pub fn make_set_for_constant_value(
    expression_type: &ValueType,
    value: &Value,
    value_type: &ValueType,
    settings: &PlannerSettings,
) -> PlanResult<PreparedSet> {
    let lhs_depth = expression_type.depth();
    let rhs_depth = value_type.depth();

    let elements: Vec<Value> = if lhs_depth == rhs_depth {
        vec![value.clone()]
    } else if lhs_depth + 1 == rhs_depth {
        collection_elements(value)?
    } else {
        unsupported!(
            "Unsupported value type at the right side of IN: {value_type}. \
             Expected {expression_type} or a collection of it"
        )
    };

    let (element_types, arity) = match expression_type.strip_nullable() {
        ValueType::Tuple(tys) => (tys.clone(), Some(tys.len())),
        _ => (vec![expression_type.clone()], None),
    };

    let mut rows = Vec::with_capacity(elements.len());
    for element in &elements {
        let Some(coerced) = element.coerce_to(expression_type)? else {
            trace!(%element, %expression_type, "Skipping set element with no exact conversion");
            continue;
        };
        let row = match (coerced, arity) {
            (Value::Tuple(vs), Some(_)) => vs,
            (Value::Null, Some(n)) => vec![Value::Null; n],
            (v, Some(n)) => {
                return Err(PlanError::InvalidSetElement(format!(
                    "expected a tuple of {n} elements, got {v}"
                )))
            }
            (v, None) => vec![v],
        };
        rows.push(row);
    }

    PreparedSet::new_ready(
        settings.size_limits_for_set(),
        true,
        settings.transform_null_in,
        element_types,
        rows,
    )
}

fn collection_elements(value: &Value) -> PlanResult<Vec<Value>> {
    Ok(match value {
        Value::Null => vec![],
        Value::Tuple(vs) | Value::Array(vs) => vs.clone(),
        Value::Map(entries) => entries
            .iter()
            .map(|(k, v)| Value::Tuple(vec![k.clone(), v.clone()]))
            .collect(),
        _ => {
            return Err(PlanError::InvalidSetElement(format!(
                "expected a collection of elements, got {value}"
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use queryplan_data::arbitrary::arbitrary_homogeneous_array;
    use test_strategy::proptest;

    use super::*;
    use crate::settings::OverflowMode;

    fn int_array(values: &[Option<i64>]) -> (Value, ValueType) {
        let value = Value::Array(values.iter().map(|v| Value::from(*v)).collect());
        let ty = value.natural_type();
        (value, ty)
    }

    #[test]
    fn in_function_names() {
        for name in [
            "in",
            "notIn",
            "nullIn",
            "notNullIn",
            "globalIn",
            "globalNotIn",
            "globalNullIn",
            "globalNotNullIn",
        ] {
            let f = InFunction::from_name(name).unwrap();
            assert_eq!(f.name(), name);
            assert!(is_name_of_in_function(name));
        }

        for name in ["IN", "globalin", "global", "notin", "equals", ""] {
            assert!(!is_name_of_in_function(name), "{name}");
        }
    }

    #[test]
    fn array_of_ints() {
        let (value, ty) = int_array(&[Some(1), Some(2), Some(3)]);
        let set =
            make_set_for_constant_value(&ValueType::Int, &value, &ty, &Default::default()).unwrap();
        assert!(set.is_ready());
        assert!(set.fill_set_elements());
        for i in 1..=3 {
            assert!(set.contains(&Value::Int(i)).unwrap());
        }
        assert!(!set.contains(&Value::Int(4)).unwrap());
        assert_eq!(
            set.elements(),
            Some(vec![vec![1.into()], vec![2.into()], vec![3.into()]])
        );
    }

    #[test]
    fn scalar_is_single_element() {
        let set = make_set_for_constant_value(
            &ValueType::Int,
            &Value::Int(7),
            &ValueType::Int,
            &Default::default(),
        )
        .unwrap();
        assert_eq!(set.len(), Some(1));
        assert!(set.contains(&Value::Int(7)).unwrap());
    }

    #[test]
    fn null_skipped_without_transform_null_in() {
        let (value, ty) = int_array(&[Some(1), None]);
        let set = make_set_for_constant_value(
            &ValueType::Int.nullable(),
            &value,
            &ty,
            &Default::default(),
        )
        .unwrap();
        assert_eq!(set.len(), Some(1));
        assert!(!set.contains(&Value::Null).unwrap());
    }

    #[test]
    fn null_matches_with_transform_null_in() {
        let (value, ty) = int_array(&[Some(1), None]);
        let settings = PlannerSettings {
            transform_null_in: true,
            ..Default::default()
        };
        let set =
            make_set_for_constant_value(&ValueType::Int.nullable(), &value, &ty, &settings)
                .unwrap();
        assert_eq!(set.len(), Some(2));
        assert!(set.contains(&Value::Null).unwrap());
        assert!(set.contains(&Value::Int(1)).unwrap());
    }

    #[test]
    fn inexact_elements_are_skipped() {
        let value = Value::Tuple(vec![Value::Double(1.0), Value::Double(1.5), Value::Int(-1)]);
        let ty = value.natural_type();
        let set =
            make_set_for_constant_value(&ValueType::UnsignedInt, &value, &ty, &Default::default())
                .unwrap();
        assert_eq!(set.elements(), Some(vec![vec![Value::UnsignedInt(1)]]));
    }

    #[test]
    fn tuple_target() {
        let target = ValueType::Tuple(vec![ValueType::Int, ValueType::Text]);
        let value = Value::Tuple(vec![
            Value::Tuple(vec![1.into(), "a".into()]),
            Value::Tuple(vec![2.into(), "b".into()]),
        ]);
        let ty = value.natural_type();
        let set = make_set_for_constant_value(&target, &value, &ty, &Default::default()).unwrap();
        assert_eq!(set.element_types(), Some(vec![ValueType::Int, ValueType::Text]));
        assert!(set
            .contains(&Value::Tuple(vec![1.into(), "a".into()]))
            .unwrap());
        assert!(!set
            .contains(&Value::Tuple(vec![1.into(), "b".into()]))
            .unwrap());
    }

    #[test]
    fn tuple_target_wrong_arity() {
        let target = ValueType::Tuple(vec![ValueType::Int, ValueType::Int]);
        let value = Value::Array(vec![
            Value::Tuple(vec![1.into(), 2.into()]),
            Value::Tuple(vec![1.into(), 2.into(), 3.into()]),
        ]);
        let ty = ValueType::Array(Box::new(target.clone()));
        let err = make_set_for_constant_value(&target, &value, &ty, &Default::default())
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidSetElement(_)), "{err}");
    }

    #[test]
    fn map_entries_are_pairs() {
        let target = ValueType::Tuple(vec![ValueType::Text, ValueType::Int]);
        let value = Value::Map(vec![("a".into(), 1.into()), ("b".into(), 2.into())]);
        let ty = value.natural_type();
        let set = make_set_for_constant_value(&target, &value, &ty, &Default::default()).unwrap();
        assert_eq!(set.len(), Some(2));
        assert!(set.contains_row(&[Value::from("b"), Value::from(2)]).unwrap());
    }

    #[test]
    fn unsupported_depth() {
        let value = Value::Array(vec![Value::Array(vec![1.into()])]);
        let ty = value.natural_type();
        let err =
            make_set_for_constant_value(&ValueType::Int, &value, &ty, &Default::default())
                .unwrap_err();
        assert!(err.is_unsupported());
        assert!(err
            .to_string()
            .contains("Unsupported value type at the right side of IN"));
    }

    #[test]
    fn overflow_throw() {
        let (value, ty) = int_array(&[Some(1), Some(2), Some(3)]);
        let settings = PlannerSettings {
            max_rows_in_set: 2,
            ..Default::default()
        };
        let err = make_set_for_constant_value(&ValueType::Int, &value, &ty, &settings).unwrap_err();
        assert!(err.is_set_size_limit_exceeded());
    }

    #[test]
    fn overflow_break() {
        let (value, ty) = int_array(&[Some(1), Some(2), Some(3)]);
        let settings = PlannerSettings {
            max_rows_in_set: 2,
            set_overflow_mode: OverflowMode::Break,
            ..Default::default()
        };
        let set = make_set_for_constant_value(&ValueType::Int, &value, &ty, &settings).unwrap();
        assert_eq!(set.len(), Some(2));
        assert!(set.is_truncated());
        assert!(set.contains(&Value::Int(1)).unwrap());
        assert!(!set.contains(&Value::Int(3)).unwrap());
    }

    #[proptest]
    fn constant_set_membership(values: Vec<i64>, needle: i64) {
        let (value, ty) = int_array(&values.iter().copied().map(Some).collect::<Vec<_>>());
        let set =
            make_set_for_constant_value(&ValueType::Int, &value, &ty, &Default::default()).unwrap();
        assert_eq!(
            set.contains(&Value::Int(needle)).unwrap(),
            values.contains(&needle)
        );
    }

    #[proptest]
    fn constant_array_contains_its_elements(
        #[strategy(arbitrary_homogeneous_array())] array: Value,
    ) {
        let ty = array.natural_type();
        let (ValueType::Array(element_type), Value::Array(elements)) = (&ty, &array) else {
            panic!("expected an array, got {array}");
        };
        let set =
            make_set_for_constant_value(element_type, &array, &ty, &Default::default()).unwrap();
        for element in elements {
            assert_eq!(set.contains(element).unwrap(), !element.is_null());
        }
    }
}
