//! Structural hashing of query tree nodes.
//!
//! Two nodes with the same structure hash the same, regardless of where they live in memory or
//! which tree they belong to. This is what lets the planner recognize that two occurrences of
//! `x IN (1, 2, 3)` can share a set.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::{QueryTreeNode, QueryTreeNodeRef};

/// A 128-bit structural hash of a query tree node, as two independent 64-bit halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TreeHash {
    pub first: u64,
    pub second: u64,
}

/// Seeds for the two halves of a [`TreeHash`]
const SEEDS: [u64; 2] = [0x5345_545f_4b45_5931, 0x5345_545f_4b45_5932];

impl QueryTreeNode {
    /// Compute the structural hash of this node and everything below it.
    ///
    /// Covers the node kind, function names, argument hashes, result types, constant values with
    /// their types, column identity (table, name and type), the name of a table's storage, the
    /// clauses of a query, and the mode of a union. Table aliases are not included.
    pub fn tree_hash(&self) -> TreeHash {
        let [first, second] = SEEDS.map(|seed| {
            let mut hasher = DefaultHasher::new();
            seed.hash(&mut hasher);
            self.hash_structure(&mut hasher);
            hasher.finish()
        });
        TreeHash { first, second }
    }

    fn hash_structure<H: Hasher>(&self, state: &mut H) {
        self.node_type().hash(state);
        match self {
            QueryTreeNode::Function(function) => {
                function.name.hash(state);
                hash_nodes(&function.arguments, state);
                function.result_type.hash(state);
                function.constant_value.hash(state);
            }
            QueryTreeNode::Constant(constant) => constant.value.hash(state),
            QueryTreeNode::Column(column) => {
                column.table.hash(state);
                column.name.hash(state);
                column.ty.hash(state);
            }
            QueryTreeNode::List(list) => hash_nodes(&list.items, state),
            QueryTreeNode::Table(table) => table.storage.name().hash(state),
            QueryTreeNode::Join(join) => {
                join.kind.hash(state);
                join.left.hash_structure(state);
                join.right.hash_structure(state);
                hash_opt_node(join.on.as_ref(), state);
            }
            QueryTreeNode::Query(query) => {
                hash_nodes(&query.projection, state);
                hash_opt_node(query.join_tree.as_ref(), state);
                hash_opt_node(query.where_clause.as_ref(), state);
                hash_nodes(&query.group_by, state);
                hash_opt_node(query.having.as_ref(), state);
                hash_nodes(&query.order_by, state);
                query.limit.hash(state);
            }
            QueryTreeNode::Union(union) => {
                union.mode.hash(state);
                hash_nodes(&union.queries, state);
            }
        }
    }
}

fn hash_nodes<H: Hasher>(nodes: &[QueryTreeNodeRef], state: &mut H) {
    nodes.len().hash(state);
    for node in nodes {
        node.hash_structure(state);
    }
}

fn hash_opt_node<H: Hasher>(node: Option<&QueryTreeNodeRef>, state: &mut H) {
    match node {
        Some(node) => {
            true.hash(state);
            node.hash_structure(state);
        }
        None => false.hash(state),
    }
}
