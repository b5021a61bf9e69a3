//! Walker for the query tree.
//!
//! Implementors of [`Visitor`] override [`Visitor::visit_node`] to act on nodes, and call
//! [`walk_node`] to continue into children. Which children get walked at all is decided by
//! [`Visitor::need_child_visit`], which lets a pass stay within a single query scope.

use super::{QueryTreeNode, QueryTreeNodeRef};

/// A pre-order traversal of a query tree.
///
/// # Examples
///
/// Counting the function calls in the current scope:
///
/// ```
/// use queryplan::tree::visit::{walk_node, Visitor};
/// use queryplan::tree::{ColumnNode, FunctionNode, QueryTreeNode, QueryTreeNodeRef};
/// use queryplan_data::ValueType;
///
/// #[derive(Default)]
/// struct FunctionCounter(usize);
///
/// impl<'ast> Visitor<'ast> for FunctionCounter {
///     type Error = std::convert::Infallible;
///
///     fn visit_node(&mut self, node: &'ast QueryTreeNodeRef) -> Result<(), Self::Error> {
///         if node.as_function().is_some() {
///             self.0 += 1;
///         }
///         walk_node(self, node)
///     }
/// }
///
/// let column = QueryTreeNode::from(ColumnNode::new("a", None, ValueType::Int)).into_ref();
/// let inner = QueryTreeNode::from(FunctionNode::new("negate", vec![column], ValueType::Int))
///     .into_ref();
/// let outer = QueryTreeNode::from(FunctionNode::new("abs", vec![inner], ValueType::Int))
///     .into_ref();
///
/// let mut counter = FunctionCounter::default();
/// counter.visit_node(&outer).unwrap();
/// assert_eq!(counter.0, 2);
/// ```
pub trait Visitor<'ast>: Sized {
    /// Errors that can be thrown during execution of this visitor
    type Error;

    fn visit_node(&mut self, node: &'ast QueryTreeNodeRef) -> Result<(), Self::Error> {
        walk_node(self, node)
    }

    /// Should `child` of `parent` be visited?
    fn need_child_visit(&self, _parent: &'ast QueryTreeNode, _child: &'ast QueryTreeNode) -> bool {
        true
    }
}

/// Visit each child of `node` that `visitor` asks to visit, in order.
pub fn walk_node<'ast, V: Visitor<'ast>>(
    visitor: &mut V,
    node: &'ast QueryTreeNodeRef,
) -> Result<(), V::Error> {
    for child in node.children() {
        if visitor.need_child_visit(node, child) {
            visitor.visit_node(child)?;
        }
    }
    Ok(())
}
