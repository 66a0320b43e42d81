use super::leaf::{LeafOperator, LeafType, Literal, PredicateLeaf};
use super::{ExpressionTree, SearchArgument, TruthValue};
use crate::error::{PxfError, PxfResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
    Not,
}

#[derive(Debug)]
struct Frame {
    connective: Connective,
    children: Vec<ExpressionTree>,
}

impl Frame {
    fn new(connective: Connective) -> Self {
        Self {
            connective,
            children: Vec::new(),
        }
    }

    fn name(&self) -> &'static str {
        match self.connective {
            Connective::And => "(and)",
            Connective::Or => "(or)",
            Connective::Not => "(not)",
        }
    }
}

/// Incrementally builds a [`SearchArgument`] from nested start/end blocks.
///
/// The outermost block is an implicit AND.
#[derive(Debug)]
pub struct SearchArgumentBuilder {
    stack: Vec<Frame>,
    leaves: Vec<PredicateLeaf>,
}

impl Default for SearchArgumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchArgumentBuilder {
    pub fn new() -> Self {
        Self {
            stack: vec![Frame::new(Connective::And)],
            leaves: Vec::new(),
        }
    }

    pub fn start_and(&mut self) -> &mut Self {
        self.stack.push(Frame::new(Connective::And));
        self
    }

    pub fn start_or(&mut self) -> &mut Self {
        self.stack.push(Frame::new(Connective::Or));
        self
    }

    pub fn start_not(&mut self) -> &mut Self {
        self.stack.push(Frame::new(Connective::Not));
        self
    }

    /// Close the innermost open block.
    pub fn end(&mut self) -> PxfResult<&mut Self> {
        if self.stack.len() <= 1 {
            return Err(PxfError::InvalidArguments(
                "Can't end an expression that was never started.".to_string(),
            ));
        }
        let Some(frame) = self.stack.pop() else {
            return Err(PxfError::IllegalState("builder stack is empty".to_string()));
        };
        if frame.children.is_empty() {
            return Err(PxfError::InvalidArguments(format!(
                "Can't create expression {} with no children.",
                frame.name()
            )));
        }
        let node = match frame.connective {
            Connective::And => ExpressionTree::And(frame.children),
            Connective::Or => ExpressionTree::Or(frame.children),
            Connective::Not => {
                let mut children = frame.children;
                if children.len() != 1 {
                    return Err(PxfError::InvalidArguments(format!(
                        "Can't create not expression with {} children.",
                        children.len()
                    )));
                }
                ExpressionTree::not(children.remove(0))
            }
        };
        self.push(node);
        Ok(self)
    }

    pub fn less_than(&mut self, column: &str, leaf_type: LeafType, literal: Literal) -> &mut Self {
        self.add_leaf(LeafOperator::LessThan, column, leaf_type, Some(literal), Vec::new())
    }

    pub fn less_than_equals(
        &mut self,
        column: &str,
        leaf_type: LeafType,
        literal: Literal,
    ) -> &mut Self {
        self.add_leaf(LeafOperator::LessThanEquals, column, leaf_type, Some(literal), Vec::new())
    }

    pub fn equals(&mut self, column: &str, leaf_type: LeafType, literal: Literal) -> &mut Self {
        self.add_leaf(LeafOperator::Equals, column, leaf_type, Some(literal), Vec::new())
    }

    pub fn null_safe_equals(
        &mut self,
        column: &str,
        leaf_type: LeafType,
        literal: Literal,
    ) -> &mut Self {
        self.add_leaf(LeafOperator::NullSafeEquals, column, leaf_type, Some(literal), Vec::new())
    }

    pub fn is_null(&mut self, column: &str, leaf_type: LeafType) -> &mut Self {
        self.add_leaf(LeafOperator::IsNull, column, leaf_type, None, Vec::new())
    }

    pub fn in_list(
        &mut self,
        column: &str,
        leaf_type: LeafType,
        literals: Vec<Literal>,
    ) -> PxfResult<&mut Self> {
        if literals.is_empty() {
            return Err(PxfError::InvalidArguments(
                "Can't create in expression with no arguments".to_string(),
            ));
        }
        Ok(self.add_leaf(LeafOperator::In, column, leaf_type, None, literals))
    }

    pub fn between(
        &mut self,
        column: &str,
        leaf_type: LeafType,
        lower: Literal,
        upper: Literal,
    ) -> &mut Self {
        self.add_leaf(LeafOperator::Between, column, leaf_type, None, vec![lower, upper])
    }

    /// Add a constant truth value.
    pub fn literal(&mut self, value: TruthValue) -> &mut Self {
        self.push(ExpressionTree::Constant(value));
        self
    }

    /// Normalize and finish: push NOT down, fold "maybe", flatten, CNF, flatten,
    /// then renumber leaves in order of first use.
    pub fn build(mut self) -> PxfResult<SearchArgument> {
        if self.stack.len() != 1 {
            return Err(PxfError::InvalidArguments(format!(
                "Failed to end {} operations.",
                self.stack.len()
            )));
        }
        let Some(root) = self.stack.pop() else {
            return Err(PxfError::IllegalState("builder stack is empty".to_string()));
        };

        let expression = ExpressionTree::And(root.children)
            .push_down_not()
            .fold_maybe()
            .flatten()
            .convert_to_cnf()
            .flatten();

        let mut reorder = vec![None; self.leaves.len()];
        let mut next = 0;
        expression.compact_leaves(&mut next, &mut reorder);
        let expression = expression.rewrite_leaves(&reorder);

        let mut leaves: Vec<Option<PredicateLeaf>> = vec![None; next];
        for (old, leaf) in self.leaves.into_iter().enumerate() {
            if let Some(Some(new)) = reorder.get(old) {
                leaves[*new] = Some(leaf);
            }
        }
        Ok(SearchArgument::new(leaves.into_iter().flatten().collect(), expression))
    }

    fn add_leaf(
        &mut self,
        operator: LeafOperator,
        column: &str,
        leaf_type: LeafType,
        literal: Option<Literal>,
        literals: Vec<Literal>,
    ) -> &mut Self {
        let leaf = PredicateLeaf {
            operator,
            leaf_type,
            column: column.to_string(),
            literal,
            literals,
        };
        let index = match self.leaves.iter().position(|existing| *existing == leaf) {
            Some(index) => index,
            None => {
                self.leaves.push(leaf);
                self.leaves.len() - 1
            }
        };
        self.push(ExpressionTree::Leaf(index));
        self
    }

    fn push(&mut self, node: ExpressionTree) {
        if let Some(frame) = self.stack.last_mut() {
            frame.children.push(node);
        }
    }
}
