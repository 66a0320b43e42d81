//! Tree traversal: before → left → visit → right → after
//!
//! 각 hook은 노드를 소유권으로 받아 (변환된) 노드를 돌려주며, `None`을 돌려주면
//! 해당 서브트리가 제거됩니다.

use super::node::Node;
use crate::error::PxfResult;

/// Hooks invoked around each node of a filter tree.
pub trait TreeVisitor {
    /// Called when entering a node, before its left child.
    fn before(&mut self, node: Node, _level: usize) -> PxfResult<Option<Node>> {
        Ok(Some(node))
    }

    /// Called between the left and right children.
    fn visit(&mut self, node: Node, _level: usize) -> PxfResult<Option<Node>> {
        Ok(Some(node))
    }

    /// Called when leaving a node, after both children.
    fn after(&mut self, node: Node, _level: usize) -> PxfResult<Option<Node>> {
        Ok(Some(node))
    }
}

/// Traverse `root` with a single visitor, returning the rewritten tree.
pub fn traverse<V>(root: Option<Node>, visitor: &mut V) -> PxfResult<Option<Node>>
where
    V: TreeVisitor + ?Sized,
{
    match root {
        Some(node) => traverse_node(node, visitor, 0),
        None => Ok(None),
    }
}

/// Run each visitor over the output of the previous one.
pub fn traverse_all(
    root: Option<Node>,
    visitors: &mut [&mut dyn TreeVisitor],
) -> PxfResult<Option<Node>> {
    let mut current = root;
    for visitor in visitors.iter_mut() {
        current = traverse(current, &mut **visitor)?;
    }
    Ok(current)
}

fn traverse_node<V>(node: Node, visitor: &mut V, level: usize) -> PxfResult<Option<Node>>
where
    V: TreeVisitor + ?Sized,
{
    let Some(mut node) = visitor.before(node, level)? else {
        return Ok(None);
    };

    if let Node::Operator(op) = &mut node {
        if let Some(left) = op.left.take() {
            op.left = traverse_node(*left, visitor, level + 1)?.map(Box::new);
        }
    }

    let Some(mut node) = visitor.visit(node, level)? else {
        return Ok(None);
    };

    if let Node::Operator(op) = &mut node {
        if let Some(right) = op.right.take() {
            op.right = traverse_node(*right, visitor, level + 1)?.map(Box::new);
        }
    }

    visitor.after(node, level)
}
