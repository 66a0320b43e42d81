//! Pruners that cut a filter tree down to what a store can evaluate.
//!
//! - `AND`에서 자식 하나가 제거되면 남은 자식을 승격
//! - `OR`에서 자식이 하나라도 제거되면 `OR` 전체를 제거
//! - `NOT`의 자식이 제거되면 `NOT`도 제거

use super::node::{Node, OperatorNode};
use super::traverser::TreeVisitor;
use super::{Operator, OperatorSet};
use crate::error::PxfResult;
use crate::types::{ColumnDescriptor, DataType};
use tracing::debug;

/// Fix up logical operators after their children have been pruned.
fn prune_logical(node: Node) -> Option<Node> {
    let Node::Operator(mut op) = node else {
        return Some(node);
    };
    let children = op.child_count();
    match op.operator {
        Operator::And if children == 1 => {
            let promoted = op.take_only_child();
            debug!(?promoted, "child was promoted higher in the tree");
            promoted
        }
        Operator::Or if children <= 1 => {
            debug!(children, "OR pruned, it needs two children");
            None
        }
        Operator::And | Operator::Not if children == 0 => {
            debug!(operator = %op.operator, "pruned operator without children");
            None
        }
        _ => Some(Node::Operator(op)),
    }
}

/// Removes operators outside a supported set.
#[derive(Debug, Clone)]
pub struct SupportedOperatorPruner {
    supported: OperatorSet,
}

impl SupportedOperatorPruner {
    pub fn new(supported: OperatorSet) -> Self {
        Self { supported }
    }
}

impl TreeVisitor for SupportedOperatorPruner {
    fn visit(&mut self, node: Node, _level: usize) -> PxfResult<Option<Node>> {
        if let Node::Operator(op) = &node {
            if !self.supported.contains(op.operator) {
                debug!(operator = %op.operator, "operator is not supported");
                return Ok(None);
            }
        }
        Ok(Some(node))
    }

    fn after(&mut self, node: Node, _level: usize) -> PxfResult<Option<Node>> {
        Ok(prune_logical(node))
    }
}

/// Removes comparisons on columns whose type is outside a supported set.
#[derive(Debug, Clone)]
pub struct SupportedDataTypePruner<'a> {
    columns: &'a [ColumnDescriptor],
    supported: Vec<DataType>,
}

impl<'a> SupportedDataTypePruner<'a> {
    pub fn new(columns: &'a [ColumnDescriptor], supported: impl IntoIterator<Item = DataType>) -> Self {
        Self {
            columns,
            supported: supported.into_iter().collect(),
        }
    }

    fn is_supported(&self, op: &OperatorNode) -> bool {
        let Some(index) = op.column_index() else {
            return true;
        };
        match self.columns.get(index) {
            Some(column) => self.supported.contains(&column.data_type),
            None => false,
        }
    }
}

impl TreeVisitor for SupportedDataTypePruner<'_> {
    fn visit(&mut self, node: Node, _level: usize) -> PxfResult<Option<Node>> {
        if let Node::Operator(op) = &node {
            if !op.operator.is_logical() && !self.is_supported(op) {
                debug!(column = ?op.column_index(), "column type is not supported");
                return Ok(None);
            }
        }
        Ok(Some(node))
    }

    fn after(&mut self, node: Node, _level: usize) -> PxfResult<Option<Node>> {
        Ok(prune_logical(node))
    }
}
