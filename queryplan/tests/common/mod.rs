//! Query tree builders shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use queryplan::context::{GlobalPlannerContext, PlannerContext};
use queryplan::settings::PlannerSettings;
use queryplan::storage::{Storage, StorageMemory};
use queryplan::tree::{
    ColumnNode, ConstantNode, FunctionNode, ListNode, QueryNode, QueryTreeNode, QueryTreeNodeRef,
    TableNode, UnionMode, UnionNode,
};
use queryplan_data::{Value, ValueType};

pub fn planner_context(settings: PlannerSettings) -> PlannerContext {
    PlannerContext::new(Arc::new(GlobalPlannerContext::new()), Arc::new(settings))
}

pub fn column(table: &str, name: &str, ty: ValueType) -> QueryTreeNodeRef {
    QueryTreeNode::from(ColumnNode::new(name, Some(table), ty)).into_ref()
}

pub fn int_column(table: &str, name: &str) -> QueryTreeNodeRef {
    column(table, name, ValueType::Int)
}

pub fn constant<V: Into<Value>>(value: V) -> QueryTreeNodeRef {
    QueryTreeNode::from(ConstantNode::from_value(value.into())).into_ref()
}

pub fn list(items: Vec<QueryTreeNodeRef>) -> QueryTreeNodeRef {
    QueryTreeNode::from(ListNode { items }).into_ref()
}

pub fn int_list(values: &[i64]) -> QueryTreeNodeRef {
    list(values.iter().map(|v| constant(*v)).collect())
}

pub fn table(storage: Arc<dyn Storage>) -> QueryTreeNodeRef {
    QueryTreeNode::from(TableNode::new(storage)).into_ref()
}

pub fn memory_table(name: &str) -> QueryTreeNodeRef {
    table(Arc::new(StorageMemory::new(name)))
}

pub fn function(name: &str, arguments: Vec<QueryTreeNodeRef>) -> QueryTreeNodeRef {
    QueryTreeNode::from(FunctionNode::new(name, arguments, ValueType::Bool)).into_ref()
}

pub fn in_fn(name: &str, lhs: QueryTreeNodeRef, rhs: QueryTreeNodeRef) -> QueryTreeNodeRef {
    function(name, vec![lhs, rhs])
}

/// `SELECT <projection> FROM <from> [WHERE <where_clause>]`
pub fn select(
    projection: Vec<QueryTreeNodeRef>,
    from: QueryTreeNodeRef,
    where_clause: Option<QueryTreeNodeRef>,
) -> QueryTreeNodeRef {
    QueryTreeNode::from(QueryNode {
        projection,
        join_tree: Some(from),
        where_clause,
        ..Default::default()
    })
    .into_ref()
}

pub fn union_all(queries: Vec<QueryTreeNodeRef>) -> QueryTreeNodeRef {
    QueryTreeNode::from(UnionNode {
        mode: UnionMode::All,
        queries,
    })
    .into_ref()
}
