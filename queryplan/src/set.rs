//! Prepared sets: the runtime structure used to answer `IN` membership tests.
//!
//! A [`PreparedSet`] is created either already filled (for constant collections, and for sets
//! owned by a set-backed storage) or *pending*, in which case it is filled exactly once later on,
//! in place, by whoever executes the subquery that defines it. Every plan node that references
//! the set holds the same [`Arc`](std::sync::Arc) to it, so a pending set becomes ready for all
//! of them at once.

use std::collections::HashSet;

use parking_lot::RwLock;
use queryplan_data::{SizeOf, Value, ValueType};
use queryplan_errors::{invariant_eq, PlanError, PlanResult};
use tracing::warn;

use crate::settings::SizeLimits;

type Row = Vec<Value>;

#[derive(Debug)]
enum SetState {
    Pending,
    Ready(SetData),
}

#[derive(Debug)]
struct SetData {
    element_types: Vec<ValueType>,
    rows: HashSet<Row, ahash::RandomState>,
    /// Rows in insertion order, if the set was asked to retain them
    elements: Option<Vec<Row>>,
    bytes: u64,
    truncated: bool,
}

/// A set of rows supporting membership tests, shared by every predicate that references it.
#[derive(Debug)]
pub struct PreparedSet {
    limits: SizeLimits,
    fill_set_elements: bool,
    transform_null_in: bool,
    state: RwLock<SetState>,
}

impl PreparedSet {
    /// Create a new set that has not been filled yet.
    ///
    /// If `fill_set_elements` is true, the set will also retain its rows in insertion order, for
    /// consumers (such as index analysis) that need to enumerate them.
    pub fn new_pending(
        limits: SizeLimits,
        fill_set_elements: bool,
        transform_null_in: bool,
    ) -> Self {
        Self {
            limits,
            fill_set_elements,
            transform_null_in,
            state: RwLock::new(SetState::Pending),
        }
    }

    /// Create a new set and fill it with `rows`.
    pub fn new_ready<I>(
        limits: SizeLimits,
        fill_set_elements: bool,
        transform_null_in: bool,
        element_types: Vec<ValueType>,
        rows: I,
    ) -> PlanResult<Self>
    where
        I: IntoIterator<Item = Row>,
    {
        let set = Self::new_pending(limits, fill_set_elements, transform_null_in);
        set.fill(element_types, rows)?;
        Ok(set)
    }

    /// Fill a pending set with `rows`, transitioning it to ready.
    ///
    /// Rows are checked against the set's [`SizeLimits`] as they are inserted. Rows containing
    /// `NULL` are dropped unless the set was created with `transform_null_in`.
    ///
    /// # Errors
    ///
    /// * [`PlanError::SetSizeLimitExceeded`] if the limits are exceeded in throw mode. The set is
    ///   left pending.
    /// * [`PlanError::SetAlreadyFilled`] if the set was already filled.
    pub fn fill<I>(&self, element_types: Vec<ValueType>, rows: I) -> PlanResult<()>
    where
        I: IntoIterator<Item = Row>,
    {
        if let SetState::Ready(data) = &*self.state.read() {
            return Err(PlanError::SetAlreadyFilled(data.describe()));
        }

        let mut builder = SetBuilder::new(
            element_types,
            self.limits,
            self.fill_set_elements,
            self.transform_null_in,
        );
        for row in rows {
            if !builder.insert_row(row)? {
                break;
            }
        }
        let data = builder.finish();

        let mut state = self.state.write();
        if let SetState::Ready(existing) = &*state {
            return Err(PlanError::SetAlreadyFilled(existing.describe()));
        }
        *state = SetState::Ready(data);
        Ok(())
    }

    /// Has this set been filled?
    pub fn is_ready(&self) -> bool {
        matches!(*self.state.read(), SetState::Ready(_))
    }

    pub fn limits(&self) -> SizeLimits {
        self.limits
    }

    pub fn transform_null_in(&self) -> bool {
        self.transform_null_in
    }

    pub fn fill_set_elements(&self) -> bool {
        self.fill_set_elements
    }

    /// Does the set contain `value`?
    ///
    /// For sets over more than one column, `value` must be a tuple with one element per column.
    /// The value is converted to the set's element types first; a value with no exact
    /// representation in those types is never contained.
    pub fn contains(&self, value: &Value) -> PlanResult<bool> {
        let state = self.state.read();
        let SetState::Ready(data) = &*state else {
            return Err(PlanError::SetNotReady("(pending)".to_owned()));
        };

        match (value, data.element_types.len()) {
            (_, 1) => self.contains_in(data, std::slice::from_ref(value)),
            (Value::Tuple(vs), _) => self.contains_in(data, vs),
            (value, n) => Err(PlanError::InvalidSetElement(format!(
                "expected a tuple of {n} elements, got {value}"
            ))),
        }
    }

    /// Does the set contain the row formed by `values`, one per column?
    pub fn contains_row(&self, values: &[Value]) -> PlanResult<bool> {
        let state = self.state.read();
        let SetState::Ready(data) = &*state else {
            return Err(PlanError::SetNotReady("(pending)".to_owned()));
        };
        self.contains_in(data, values)
    }

    fn contains_in(&self, data: &SetData, values: &[Value]) -> PlanResult<bool> {
        if values.len() != data.element_types.len() {
            return Err(PlanError::InvalidSetElement(format!(
                "expected {} values, got {}",
                data.element_types.len(),
                values.len()
            )));
        }

        let mut row = Vec::with_capacity(values.len());
        for (value, ty) in values.iter().zip(&data.element_types) {
            if value.is_null() && !self.transform_null_in {
                return Ok(false);
            }
            match value.coerce_to(ty)? {
                Some(v) => row.push(v),
                None => return Ok(false),
            }
        }

        Ok(data.rows.contains(&row))
    }

    /// The number of rows in the set, or `None` if it is still pending.
    pub fn len(&self) -> Option<usize> {
        match &*self.state.read() {
            SetState::Pending => None,
            SetState::Ready(data) => Some(data.rows.len()),
        }
    }

    /// Returns `Some(true)` if the set is ready and has no rows.
    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|n| n == 0)
    }

    /// The estimated number of bytes held by the set's rows, or `None` if it is still pending.
    pub fn bytes(&self) -> Option<u64> {
        match &*self.state.read() {
            SetState::Pending => None,
            SetState::Ready(data) => Some(data.bytes),
        }
    }

    /// Did the set stop accepting rows because it hit its limits in break mode?
    pub fn is_truncated(&self) -> bool {
        match &*self.state.read() {
            SetState::Pending => false,
            SetState::Ready(data) => data.truncated,
        }
    }

    pub fn element_types(&self) -> Option<Vec<ValueType>> {
        match &*self.state.read() {
            SetState::Pending => None,
            SetState::Ready(data) => Some(data.element_types.clone()),
        }
    }

    /// The rows of the set in insertion order, if the set is ready and retains them.
    pub fn elements(&self) -> Option<Vec<Row>> {
        match &*self.state.read() {
            SetState::Pending => None,
            SetState::Ready(data) => data.elements.clone(),
        }
    }
}

impl SetData {
    fn describe(&self) -> String {
        format!(
            "({} rows of {})",
            self.rows.len(),
            itertools::join(&self.element_types, ", ")
        )
    }
}

/// Accumulates rows for a [`PreparedSet`], enforcing its limits and null handling.
struct SetBuilder {
    limits: SizeLimits,
    transform_null_in: bool,
    data: SetData,
}

impl SetBuilder {
    fn new(
        element_types: Vec<ValueType>,
        limits: SizeLimits,
        fill_set_elements: bool,
        transform_null_in: bool,
    ) -> Self {
        Self {
            limits,
            transform_null_in,
            data: SetData {
                element_types,
                rows: Default::default(),
                elements: fill_set_elements.then(Vec::new),
                bytes: 0,
                truncated: false,
            },
        }
    }

    /// Insert a row, returning `Ok(false)` once the builder stops accepting rows.
    fn insert_row(&mut self, row: Row) -> PlanResult<bool> {
        invariant_eq!(
            row.len(),
            self.data.element_types.len(),
            "rows inserted into a set must have one value per column"
        );

        if self.data.truncated {
            return Ok(false);
        }
        if !self.transform_null_in && row.iter().any(Value::is_null) {
            return Ok(true);
        }
        if self.data.rows.contains(&row) {
            return Ok(true);
        }

        let rows = self.data.rows.len() as u64 + 1;
        let bytes = self.data.bytes + row.deep_size_of();
        if !self.limits.check(rows, bytes)? {
            warn!(
                max_rows = self.limits.max_rows,
                max_bytes = self.limits.max_bytes,
                rows = rows - 1,
                "Set size limit reached, truncating set"
            );
            self.data.truncated = true;
            return Ok(false);
        }

        self.data.bytes = bytes;
        if let Some(elements) = &mut self.data.elements {
            elements.push(row.clone());
        }
        self.data.rows.insert(row);
        Ok(true)
    }

    fn finish(self) -> SetData {
        self.data
    }
}
