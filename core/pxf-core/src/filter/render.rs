//! Renders a filter tree as a SQL-like predicate string.
//!
//! - indexed: `_1_ >= 2016-01-03`
//! - named: `cdate > 2008-02-01`, 컬럼 이름 quote 및 값 quote 선택 가능

use super::node::{Node, OperatorNode, ValueOperand};
use super::traverser::{traverse, TreeVisitor};
use super::Operator;
use crate::error::{PxfError, PxfResult};
use crate::types::ColumnDescriptor;
use std::fmt;

#[derive(Debug, Clone)]
enum ColumnNaming<'a> {
    /// `_<index>_`
    Index,
    Name {
        columns: &'a [ColumnDescriptor],
        quote: String,
    },
}

/// Tree visitor accumulating a predicate string.
#[derive(Debug, Clone)]
pub struct PredicateRenderer<'a> {
    naming: ColumnNaming<'a>,
    value_quote: Option<String>,
    output: String,
}

impl<'a> PredicateRenderer<'a> {
    /// Columns rendered by ordinal, `_3_ IS NOT NULL`.
    pub fn indexed() -> Self {
        Self {
            naming: ColumnNaming::Index,
            value_quote: None,
            output: String::new(),
        }
    }

    /// Columns rendered by name from the tuple description.
    pub fn named(columns: &'a [ColumnDescriptor]) -> Self {
        Self {
            naming: ColumnNaming::Name {
                columns,
                quote: String::new(),
            },
            value_quote: None,
            output: String::new(),
        }
    }

    /// Wrap column names in `quote` (e.g. `"` or `` ` ``).
    pub fn with_column_quote(mut self, quote: impl Into<String>) -> Self {
        if let ColumnNaming::Name { quote: q, .. } = &mut self.naming {
            *q = quote.into();
        }
        self
    }

    /// Wrap literal values in `quote`.
    pub fn with_value_quote(mut self, quote: impl Into<String>) -> Self {
        self.value_quote = Some(quote.into());
        self
    }

    pub fn columns(&self) -> Option<&'a [ColumnDescriptor]> {
        match self.naming {
            ColumnNaming::Name { columns, .. } => Some(columns),
            ColumnNaming::Index => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.output
    }

    pub fn reset(&mut self) {
        self.output.clear();
    }

    /// Render `root` from scratch; the tree itself is left untouched.
    pub fn render(&mut self, root: Option<&Node>) -> PxfResult<String> {
        self.reset();
        traverse(root.cloned(), self)?;
        Ok(self.output.clone())
    }

    fn column(&self, index: usize) -> PxfResult<String> {
        match &self.naming {
            ColumnNaming::Index => Ok(format!("_{}_", index)),
            ColumnNaming::Name { columns, quote } => {
                let column = columns.get(index).ok_or_else(|| {
                    PxfError::InvalidArguments(format!("column index {} is out of range", index))
                })?;
                Ok(format!("{quote}{}{quote}", column.name))
            }
        }
    }

    fn quoted(&self, value: &str) -> String {
        match &self.value_quote {
            Some(quote) => format!("{quote}{value}{quote}"),
            None => value.to_string(),
        }
    }

    fn render_leaf(&mut self, op: &OperatorNode) -> PxfResult<()> {
        let Some(index) = op.column_index() else {
            return Err(PxfError::InvalidArguments(format!(
                "operator {} has no column operand",
                op.operator
            )));
        };
        let column = self.column(index)?;
        let value = op.value_operand();

        let rendered = match (op.operator, value) {
            (Operator::IsNull | Operator::IsNotNull, _) => {
                format!("{} {}", column, op.operator.symbol())
            }
            (Operator::Noop, Some(ValueOperand::Scalar(scalar))) if scalar.value == "true" => {
                column
            }
            (Operator::Noop, Some(ValueOperand::Scalar(scalar))) => {
                format!("{} = {}", column, self.quoted(&scalar.value))
            }
            (operator, Some(ValueOperand::Collection(collection))) => {
                let values: Vec<String> =
                    collection.values.iter().map(|v| self.quoted(v)).collect();
                format!("{} {} ({})", column, operator.symbol(), values.join(","))
            }
            (operator, Some(ValueOperand::Scalar(scalar))) => {
                format!("{} {} {}", column, operator.symbol(), self.quoted(&scalar.value))
            }
            (operator, None) => {
                return Err(PxfError::InvalidArguments(format!(
                    "operator {} has no value operand",
                    operator
                )));
            }
        };
        self.output.push_str(&rendered);
        Ok(())
    }
}

impl TreeVisitor for PredicateRenderer<'_> {
    fn before(&mut self, node: Node, _level: usize) -> PxfResult<Option<Node>> {
        if let Node::Operator(op) = &node {
            match op.operator {
                Operator::And | Operator::Or => self.output.push('('),
                Operator::Not => self.output.push_str("NOT ("),
                _ => {}
            }
        }
        Ok(Some(node))
    }

    fn visit(&mut self, node: Node, _level: usize) -> PxfResult<Option<Node>> {
        if let Node::Operator(op) = &node {
            match op.operator {
                Operator::And => self.output.push_str(" AND "),
                Operator::Or => self.output.push_str(" OR "),
                Operator::Not => {}
                _ => self.render_leaf(op)?,
            }
        }
        Ok(Some(node))
    }

    fn after(&mut self, node: Node, _level: usize) -> PxfResult<Option<Node>> {
        if let Node::Operator(op) = &node {
            if op.operator.is_logical() {
                self.output.push(')');
            }
        }
        Ok(Some(node))
    }
}

impl fmt::Display for PredicateRenderer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.output)
    }
}
