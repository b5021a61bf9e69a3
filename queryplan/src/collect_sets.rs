//! Collect the sets needed by the `IN` predicates of a query scope.
//!
//! For each membership test in the scope, the right-hand side is turned into a [`PreparedSet`]
//! and registered in the [`GlobalPlannerContext`] under a key derived from its structure:
//!
//! * a table backed by a set storage contributes that storage's set, shared rather than copied;
//! * a constant is built into a set right away;
//! * a subquery (or union) gets an empty, pending set, along with a link back to the subquery so
//!   that execution can fill the set before the plan needs it.
//!
//! Anything else on the right-hand side of `IN` is an error. Sets for predicates inside nested
//! subqueries are left for the planning of those subqueries.
//!
//! [`GlobalPlannerContext`]: crate::context::GlobalPlannerContext

use std::sync::Arc;

use queryplan_errors::{internal, invariant_eq, unsupported, PlanError, PlanResult};
use tracing::{debug, trace, trace_span};

use crate::context::{GlobalPlannerContext, PlannerContext, PlannerSet, SetSource};
use crate::set::PreparedSet;
use crate::set_utils::{make_set_for_constant_value, InFunction};
use crate::tree::visit::{walk_node, Visitor};
use crate::tree::{FunctionNode, QueryTreeNode, QueryTreeNodeRef};

struct CollectSetsVisitor<'a> {
    planner_context: &'a PlannerContext,
}

impl CollectSetsVisitor<'_> {
    fn collect_set(&self, function: &FunctionNode, in_function: InFunction) -> PlanResult<()> {
        invariant_eq!(
            function.arguments.len(),
            2,
            "{in_function} must have exactly two arguments"
        );
        let in_first_argument = &function.arguments[0];
        let in_second_argument = &function.arguments[1];

        let global_planner_context = self.planner_context.global_planner_context();
        let settings = self.planner_context.settings();

        let set_key = GlobalPlannerContext::set_key(in_second_argument);
        if global_planner_context.get_set_or_none(&set_key).is_some() {
            trace!(%set_key, function = %in_function, "Set already collected");
            return Ok(());
        }

        let planner_set =
            global_planner_context.get_or_try_register_set_with(set_key.clone(), || {
                // Tables on the right-hand side of IN are replaced with subqueries during
                // analysis, except for tables backed by a set
                if let Some(storage_set) = in_second_argument
                    .as_table()
                    .and_then(|table| table.storage.as_set_storage())
                {
                    return Ok(PlannerSet::ready(
                        storage_set.get_set(),
                        SetSource::Storage,
                    ));
                }

                if let Some(constant) = in_second_argument.constant_value() {
                    let Some(expression_type) = in_first_argument.result_type() else {
                        internal!(
                            "{} node on the left-hand side of {in_function} has no type",
                            in_first_argument.node_type()
                        )
                    };
                    let set = make_set_for_constant_value(
                        &expression_type,
                        &constant.value,
                        &constant.ty,
                        settings,
                    )?;
                    return Ok(PlannerSet::ready(Arc::new(set), SetSource::Constant));
                }

                if in_second_argument.is_query_or_union() {
                    let set = PreparedSet::new_pending(
                        settings.size_limits_for_set(),
                        false,
                        settings.transform_null_in,
                    );
                    return Ok(PlannerSet::pending(
                        Arc::new(set),
                        Arc::clone(in_second_argument),
                    ));
                }

                unsupported!(
                    "Function {} is supported only if second argument is constant or table \
                     expression",
                    function.name
                )
            })?;

        debug!(
            %set_key,
            function = %in_function,
            source = %planner_set.source(),
            ready = planner_set.set().is_ready(),
            "Collected set"
        );
        Ok(())
    }
}

impl<'ast> Visitor<'ast> for CollectSetsVisitor<'_> {
    type Error = PlanError;

    fn visit_node(&mut self, node: &'ast QueryTreeNodeRef) -> Result<(), Self::Error> {
        if let Some(function) = node.as_function() {
            if let Some(in_function) = InFunction::from_name(&function.name) {
                self.collect_set(function, in_function)?;
            }
        }
        walk_node(self, node)
    }

    fn need_child_visit(&self, _parent: &'ast QueryTreeNode, child: &'ast QueryTreeNode) -> bool {
        !child.is_query_or_union()
    }
}

/// Collect and register the sets for every `IN` predicate in the query scope rooted at `node`.
///
/// `node` itself is always visited, whatever its kind, but nested queries and unions below it
/// are not. Sets already registered under the same key are reused as-is, so running this more
/// than once over the same tree (or over trees sharing a right-hand side) builds each set once.
///
/// # Errors
///
/// * [`PlanError::Unsupported`] if the right-hand side of an `IN` is not a set-backed table, a
///   constant, or a subquery, or if a constant has an unsupported type.
/// * Any error from building a constant set, such as [`PlanError::SetSizeLimitExceeded`].
///
/// Sets registered before an error is returned stay registered.
pub fn collect_sets(node: &QueryTreeNodeRef, planner_context: &PlannerContext) -> PlanResult<()> {
    let span = trace_span!("collect_sets", node = %node.node_type());
    let _guard = span.enter();

    CollectSetsVisitor { planner_context }.visit_node(node)
}
