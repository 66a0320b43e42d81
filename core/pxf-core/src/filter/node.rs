use super::Operator;
use crate::types::DataType;

/// A node of a parsed filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Operator(OperatorNode),
    /// Reference to a column of the tuple description by ordinal
    ColumnIndex(usize),
    Scalar(ScalarOperand),
    Collection(CollectionOperand),
}

/// Operator with up to two children. Comparison operators keep the column on
/// the left and the literal on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorNode {
    pub operator: Operator,
    pub left: Option<Box<Node>>,
    pub right: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarOperand {
    pub data_type: DataType,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionOperand {
    /// Array type of the collection, e.g. `INT8ARRAY`
    pub data_type: DataType,
    pub values: Vec<String>,
}

/// Literal side of a comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueOperand<'a> {
    Scalar(&'a ScalarOperand),
    Collection(&'a CollectionOperand),
}

impl Node {
    pub fn operator(operator: Operator, left: Node, right: Node) -> Node {
        Node::Operator(OperatorNode::new(operator, Some(left), Some(right)))
    }

    pub fn unary(operator: Operator, child: Node) -> Node {
        Node::Operator(OperatorNode::new(operator, Some(child), None))
    }

    pub fn scalar(data_type: DataType, value: impl Into<String>) -> Node {
        Node::Scalar(ScalarOperand {
            data_type,
            value: value.into(),
        })
    }

    pub fn as_operator(&self) -> Option<&OperatorNode> {
        match self {
            Node::Operator(op) => Some(op),
            _ => None,
        }
    }

    pub fn is_operand(&self) -> bool {
        !matches!(self, Node::Operator(_))
    }

    /// Number of present children.
    pub fn child_count(&self) -> usize {
        match self {
            Node::Operator(op) => op.child_count(),
            _ => 0,
        }
    }
}

impl OperatorNode {
    pub fn new(operator: Operator, left: Option<Node>, right: Option<Node>) -> Self {
        Self {
            operator,
            left: left.map(Box::new),
            right: right.map(Box::new),
        }
    }

    pub fn child_count(&self) -> usize {
        self.left.is_some() as usize + self.right.is_some() as usize
    }

    /// Column referenced by a comparison, wherever it sits.
    pub fn column_index(&self) -> Option<usize> {
        [self.left.as_deref(), self.right.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|child| match child {
                Node::ColumnIndex(index) => Some(*index),
                _ => None,
            })
    }

    /// Literal side of a comparison, if any.
    pub fn value_operand(&self) -> Option<ValueOperand<'_>> {
        [self.left.as_deref(), self.right.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|child| match child {
                Node::Scalar(scalar) => Some(ValueOperand::Scalar(scalar)),
                Node::Collection(collection) => Some(ValueOperand::Collection(collection)),
                _ => None,
            })
    }

    /// Remaining child of a node that lost one of its two children.
    pub fn take_only_child(&mut self) -> Option<Node> {
        self.left.take().or_else(|| self.right.take()).map(|child| *child)
    }
}
