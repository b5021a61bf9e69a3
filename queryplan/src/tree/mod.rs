//! The resolved query tree, as produced by analysis and consumed by the planner.
//!
//! Nodes are immutable once built and shared via [`QueryTreeNodeRef`], so that the planner (and
//! anything it hands nodes to, such as the execution of a subquery that fills a set) can hold on
//! to subtrees without copying them.

use std::fmt;
use std::sync::Arc;

use derive_more::From;
use queryplan_data::{Value, ValueType};
use serde::{Deserialize, Serialize};

use crate::storage::Storage;

mod hash;
pub mod visit;

pub use self::hash::TreeHash;

pub type QueryTreeNodeRef = Arc<QueryTreeNode>;

/// The kind of a [`QueryTreeNode`], without its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryTreeNodeType {
    Function,
    Constant,
    Column,
    List,
    Table,
    Join,
    Query,
    Union,
}

impl fmt::Display for QueryTreeNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Function => "FUNCTION",
            Self::Constant => "CONSTANT",
            Self::Column => "COLUMN",
            Self::List => "LIST",
            Self::Table => "TABLE",
            Self::Join => "JOIN",
            Self::Query => "QUERY",
            Self::Union => "UNION",
        };
        f.write_str(name)
    }
}

/// A constant value together with its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstantValue {
    pub value: Value,
    pub ty: ValueType,
}

impl ConstantValue {
    pub fn new(value: Value, ty: ValueType) -> Self {
        Self { value, ty }
    }
}

/// A call to a function or operator, eg `plus(a, 1)` or `in(a, (1, 2))`.
#[derive(Debug, Clone)]
pub struct FunctionNode {
    pub name: String,
    pub arguments: Vec<QueryTreeNodeRef>,
    pub result_type: ValueType,
    /// The value of the call, if analysis was able to fold it to a constant
    pub constant_value: Option<ConstantValue>,
}

impl FunctionNode {
    pub fn new<N: Into<String>>(
        name: N,
        arguments: Vec<QueryTreeNodeRef>,
        result_type: ValueType,
    ) -> Self {
        Self {
            name: name.into(),
            arguments,
            result_type,
            constant_value: None,
        }
    }

    #[must_use]
    pub fn with_constant_value(mut self, constant_value: ConstantValue) -> Self {
        self.constant_value = Some(constant_value);
        self
    }
}

/// A literal.
#[derive(Debug, Clone)]
pub struct ConstantNode {
    pub value: ConstantValue,
}

impl ConstantNode {
    pub fn new(value: Value, ty: ValueType) -> Self {
        Self {
            value: ConstantValue::new(value, ty),
        }
    }

    /// A literal with the type analysis would assign to it when written on its own.
    pub fn from_value(value: Value) -> Self {
        let ty = value.natural_type();
        Self::new(value, ty)
    }
}

/// A reference to a column of a table expression.
#[derive(Debug, Clone)]
pub struct ColumnNode {
    pub name: String,
    /// Name of the storage the column comes from, if it comes from one
    pub table: Option<String>,
    pub ty: ValueType,
}

impl ColumnNode {
    pub fn new<N: Into<String>>(name: N, table: Option<&str>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            table: table.map(ToOwned::to_owned),
            ty,
        }
    }
}

/// A parenthesized list of expressions, eg the `(1, 2, 3)` in `a IN (1, 2, 3)`.
#[derive(Debug, Clone)]
pub struct ListNode {
    pub items: Vec<QueryTreeNodeRef>,
}

/// A reference to a table in a `FROM` clause, or on the right-hand side of `IN`.
#[derive(Debug, Clone)]
pub struct TableNode {
    pub storage: Arc<dyn Storage>,
    pub alias: Option<String>,
}

impl TableNode {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            alias: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone)]
pub struct JoinNode {
    pub left: QueryTreeNodeRef,
    pub right: QueryTreeNodeRef,
    pub kind: JoinKind,
    pub on: Option<QueryTreeNodeRef>,
}

/// A `SELECT` query, either the root of the tree or a subquery within it.
#[derive(Debug, Clone, Default)]
pub struct QueryNode {
    pub projection: Vec<QueryTreeNodeRef>,
    pub join_tree: Option<QueryTreeNodeRef>,
    pub where_clause: Option<QueryTreeNodeRef>,
    pub group_by: Vec<QueryTreeNodeRef>,
    pub having: Option<QueryTreeNodeRef>,
    pub order_by: Vec<QueryTreeNodeRef>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnionMode {
    All,
    Distinct,
}

/// A `UNION` of two or more queries.
#[derive(Debug, Clone)]
pub struct UnionNode {
    pub mode: UnionMode,
    pub queries: Vec<QueryTreeNodeRef>,
}

/// A node of the resolved query tree.
#[derive(Debug, Clone, From)]
pub enum QueryTreeNode {
    Function(FunctionNode),
    Constant(ConstantNode),
    Column(ColumnNode),
    List(ListNode),
    Table(TableNode),
    Join(JoinNode),
    Query(QueryNode),
    Union(UnionNode),
}

impl QueryTreeNode {
    /// Wrap this node in a [`QueryTreeNodeRef`].
    pub fn into_ref(self) -> QueryTreeNodeRef {
        Arc::new(self)
    }

    pub fn node_type(&self) -> QueryTreeNodeType {
        match self {
            QueryTreeNode::Function(_) => QueryTreeNodeType::Function,
            QueryTreeNode::Constant(_) => QueryTreeNodeType::Constant,
            QueryTreeNode::Column(_) => QueryTreeNodeType::Column,
            QueryTreeNode::List(_) => QueryTreeNodeType::List,
            QueryTreeNode::Table(_) => QueryTreeNodeType::Table,
            QueryTreeNode::Join(_) => QueryTreeNodeType::Join,
            QueryTreeNode::Query(_) => QueryTreeNodeType::Query,
            QueryTreeNode::Union(_) => QueryTreeNodeType::Union,
        }
    }

    /// Is this node a query scope of its own (a `SELECT` or a `UNION`)?
    pub fn is_query_or_union(&self) -> bool {
        matches!(
            self.node_type(),
            QueryTreeNodeType::Query | QueryTreeNodeType::Union
        )
    }

    /// The direct children of this node, in evaluation order.
    pub fn children(&self) -> Vec<&QueryTreeNodeRef> {
        match self {
            QueryTreeNode::Function(function) => function.arguments.iter().collect(),
            QueryTreeNode::List(list) => list.items.iter().collect(),
            QueryTreeNode::Constant(_) | QueryTreeNode::Column(_) | QueryTreeNode::Table(_) => {
                vec![]
            }
            QueryTreeNode::Join(join) => [&join.left, &join.right]
                .into_iter()
                .chain(join.on.as_ref())
                .collect(),
            QueryTreeNode::Query(query) => query
                .projection
                .iter()
                .chain(query.join_tree.as_ref())
                .chain(query.where_clause.as_ref())
                .chain(query.group_by.iter())
                .chain(query.having.as_ref())
                .chain(query.order_by.iter())
                .collect(),
            QueryTreeNode::Union(union) => union.queries.iter().collect(),
        }
    }

    /// The constant value of this node, if it has one.
    ///
    /// Literals are constant; so are function calls that analysis folded, and lists whose items
    /// are all constant (which fold to a tuple).
    pub fn constant_value(&self) -> Option<ConstantValue> {
        match self {
            QueryTreeNode::Constant(constant) => Some(constant.value.clone()),
            QueryTreeNode::Function(function) => function.constant_value.clone(),
            QueryTreeNode::List(list) => {
                let (values, types) = list
                    .items
                    .iter()
                    .map(|item| item.constant_value().map(|c| (c.value, c.ty)))
                    .collect::<Option<(Vec<_>, Vec<_>)>>()?;
                Some(ConstantValue::new(
                    Value::Tuple(values),
                    ValueType::Tuple(types),
                ))
            }
            _ => None,
        }
    }

    /// The type of the value this node evaluates to, if it is an expression.
    pub fn result_type(&self) -> Option<ValueType> {
        match self {
            QueryTreeNode::Function(function) => Some(function.result_type.clone()),
            QueryTreeNode::Constant(constant) => Some(constant.value.ty.clone()),
            QueryTreeNode::Column(column) => Some(column.ty.clone()),
            QueryTreeNode::List(list) => list
                .items
                .iter()
                .map(|item| item.result_type())
                .collect::<Option<Vec<_>>>()
                .map(ValueType::Tuple),
            QueryTreeNode::Table(_)
            | QueryTreeNode::Join(_)
            | QueryTreeNode::Query(_)
            | QueryTreeNode::Union(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionNode> {
        match self {
            QueryTreeNode::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableNode> {
        match self {
            QueryTreeNode::Table(table) => Some(table),
            _ => None,
        }
    }
}
