//! Query plan construction.
//!
//! This crate takes a resolved query tree (see [`tree`]) and prepares what its plan needs before
//! any plan nodes are built. Currently that means the sets behind `IN` predicates: see
//! [`collect_sets`] for the pass that finds and registers them, [`context`] for the registry they
//! are registered in, and [`set`] for the sets themselves.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use queryplan::context::{GlobalPlannerContext, PlannerContext};
//! use queryplan::settings::PlannerSettings;
//! use queryplan::tree::{ColumnNode, ConstantNode, FunctionNode, ListNode, QueryTreeNode};
//! use queryplan::collect_sets;
//! use queryplan_data::{Value, ValueType};
//!
//! // a IN (1, 2, 3)
//! let rhs = QueryTreeNode::from(ListNode {
//!     items: (1..=3)
//!         .map(|i| QueryTreeNode::from(ConstantNode::from_value(Value::Int(i))).into_ref())
//!         .collect(),
//! })
//! .into_ref();
//! let predicate = QueryTreeNode::from(FunctionNode::new(
//!     "in",
//!     vec![
//!         QueryTreeNode::from(ColumnNode::new("a", Some("db.t"), ValueType::Int)).into_ref(),
//!         rhs.clone(),
//!     ],
//!     ValueType::Bool,
//! ))
//! .into_ref();
//!
//! let global = Arc::new(GlobalPlannerContext::new());
//! let ctx = PlannerContext::new(Arc::clone(&global), Arc::new(PlannerSettings::default()));
//! collect_sets(&predicate, &ctx).unwrap();
//!
//! let set = global
//!     .get_set_or_none(&GlobalPlannerContext::set_key(&rhs))
//!     .unwrap();
//! assert!(set.set().contains(&Value::Int(2)).unwrap());
//! ```

mod collect_sets;
pub mod context;
pub mod set;
pub mod set_utils;
pub mod settings;
pub mod storage;
pub mod tree;

pub use crate::collect_sets::collect_sets;
pub use crate::context::{GlobalPlannerContext, PlannerContext};
pub use crate::set::PreparedSet;
pub use crate::settings::PlannerSettings;
