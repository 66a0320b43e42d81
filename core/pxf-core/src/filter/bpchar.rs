//! Expands comparisons on blank-padded `char(n)` columns.
//!
//! 저장 시 padding 또는 trimming 여부를 알 수 없으므로, 두 형태를 모두 비교하도록
//! `(c = 'a ' OR c = 'a')` 형태로 변환합니다. `<>`는 `AND`로 결합합니다.

use super::node::{Node, OperatorNode, ScalarOperand};
use super::traverser::TreeVisitor;
use super::Operator;
use crate::error::PxfResult;
use crate::types::{ColumnDescriptor, DataType};

#[derive(Debug, Clone)]
pub struct BpCharOperatorTransformer<'a> {
    columns: &'a [ColumnDescriptor],
}

impl<'a> BpCharOperatorTransformer<'a> {
    pub fn new(columns: &'a [ColumnDescriptor]) -> Self {
        Self { columns }
    }

    /// Declared width of the column, from its first type modifier.
    fn width(&self, index: usize) -> Option<usize> {
        self.columns
            .get(index)?
            .type_modifiers
            .as_ref()?
            .first()
            .and_then(|w| usize::try_from(*w).ok())
    }
}

impl TreeVisitor for BpCharOperatorTransformer<'_> {
    fn after(&mut self, node: Node, _level: usize) -> PxfResult<Option<Node>> {
        let Node::Operator(op) = &node else {
            return Ok(Some(node));
        };
        if op.operator.is_logical() {
            return Ok(Some(node));
        }
        let (Some(Node::ColumnIndex(index)), Some(Node::Scalar(scalar))) =
            (op.left.as_deref(), op.right.as_deref())
        else {
            return Ok(Some(node));
        };
        if scalar.data_type != DataType::Bpchar {
            return Ok(Some(node));
        }

        let value = scalar.value.as_str();
        let length = value.chars().count();
        let padded = self
            .width(*index)
            .filter(|width| length < *width)
            .map(|width| format!("{}{}", value, " ".repeat(width - length)));
        let trimmed = value.ends_with(' ').then(|| value.trim_end().to_string());
        if padded.is_none() && trimmed.is_none() {
            return Ok(Some(node));
        }

        let combine = if op.operator == Operator::NotEquals {
            Operator::And
        } else {
            Operator::Or
        };
        let (operator, column) = (op.operator, Node::ColumnIndex(*index));
        let variant = |value: String| {
            Node::Operator(OperatorNode::new(
                operator,
                Some(column.clone()),
                Some(Node::Scalar(ScalarOperand {
                    data_type: DataType::Bpchar,
                    value,
                })),
            ))
        };

        let mut result = node.clone();
        for value in [padded, trimmed].into_iter().flatten() {
            result = Node::operator(combine, result, variant(value));
        }
        Ok(Some(result))
    }
}
