//! Filter tree → search argument
//!
//! 예: `( _1_ < 5 OR _1_ > 10 ) AND ( _2_ IS NOT NULL )`
//!
//! ```text
//! startAnd
//!   startOr
//!     lessThan
//!     startNot lessThanEquals end
//!   end
//!   startNot isNull end
//! end
//! ```

use super::builder::SearchArgumentBuilder;
use super::leaf::{LeafType, Literal};
use super::SearchArgument;
use crate::datetime::{self, TimeZoneMode};
use crate::error::{PxfError, PxfResult};
use crate::filter::{Node, Operator, OperatorNode, TreeVisitor, ValueOperand};
use crate::types::{ColumnDescriptor, DataType};
use std::str::FromStr;
use tracing::{debug, trace};

/// Literal value of a comparison after conversion.
#[derive(Debug, Clone, PartialEq)]
enum FilterValue {
    Scalar(Literal),
    List(Vec<Literal>),
}

impl FilterValue {
    fn leaf_type(&self) -> PxfResult<LeafType> {
        match self {
            FilterValue::Scalar(literal) => Ok(literal.leaf_type()),
            FilterValue::List(literals) => literals
                .first()
                .map(Literal::leaf_type)
                .ok_or_else(|| {
                    PxfError::InvalidArguments("Unknown type for literal []".to_string())
                }),
        }
    }
}

/// Tree visitor feeding a [`SearchArgumentBuilder`].
#[derive(Debug)]
pub struct SearchArgumentVisitor<'a> {
    builder: SearchArgumentBuilder,
    columns: &'a [ColumnDescriptor],
    zone: TimeZoneMode,
}

impl<'a> SearchArgumentVisitor<'a> {
    pub fn new(columns: &'a [ColumnDescriptor]) -> Self {
        Self {
            builder: SearchArgumentBuilder::new(),
            columns,
            zone: TimeZoneMode::Utc,
        }
    }

    /// Zone used to interpret timestamp literals.
    pub fn with_time_zone(mut self, zone: TimeZoneMode) -> Self {
        self.zone = zone;
        self
    }

    pub fn into_builder(self) -> SearchArgumentBuilder {
        self.builder
    }

    pub fn build(self) -> PxfResult<SearchArgument> {
        self.builder.build()
    }

    fn build_leaf(&mut self, op: &OperatorNode) -> PxfResult<()> {
        let index = op.column_index().ok_or_else(|| {
            PxfError::InvalidArguments(format!("operator {} has no column operand", op.operator))
        })?;
        let column = self.columns.get(index).ok_or_else(|| {
            PxfError::InvalidArguments(format!("column index {} is out of range", index))
        })?;
        let name = column.name.as_str();

        let value = match op.value_operand() {
            Some(ValueOperand::Collection(collection)) => {
                let element_type = collection.data_type.type_elem().ok_or_else(|| {
                    PxfError::UnsupportedType(format!(
                        "DataType {} unsupported",
                        collection.data_type
                    ))
                })?;
                let literals = collection
                    .values
                    .iter()
                    .map(|v| convert_literal(element_type, v, self.zone))
                    .collect::<PxfResult<Vec<_>>>()?;
                Some(FilterValue::List(literals))
            }
            Some(ValueOperand::Scalar(scalar)) => Some(FilterValue::Scalar(convert_literal(
                scalar.data_type,
                &scalar.value,
                self.zone,
            )?)),
            None => None,
        };
        let leaf_type = match &value {
            Some(value) => value.leaf_type()?,
            None => LeafType::String,
        };

        // a bare boolean column arrives as NOOP
        let operator = match op.operator {
            Operator::Noop => Operator::Equals,
            other => other,
        };
        trace!(column = name, %operator, ?value, "building search argument leaf");

        let builder = &mut self.builder;
        match (operator, value) {
            (Operator::IsNull, _) => {
                builder.is_null(name, leaf_type);
            }
            (Operator::IsNotNull, _) => {
                builder.start_not().is_null(name, leaf_type).end()?;
            }
            (Operator::In, Some(FilterValue::List(literals))) => {
                builder.in_list(name, leaf_type, literals)?;
            }
            (Operator::In, _) => {
                return Err(PxfError::InvalidArguments(
                    "filterValue should be instance of List for IN operation".to_string(),
                ));
            }
            (operator, Some(FilterValue::Scalar(literal))) => match operator {
                Operator::LessThan => {
                    builder.less_than(name, leaf_type, literal);
                }
                Operator::GreaterThan => {
                    builder
                        .start_not()
                        .less_than_equals(name, leaf_type, literal)
                        .end()?;
                }
                Operator::LessThanOrEqual => {
                    builder.less_than_equals(name, leaf_type, literal);
                }
                Operator::GreaterThanOrEqual => {
                    builder.start_not().less_than(name, leaf_type, literal).end()?;
                }
                Operator::Equals => {
                    builder.equals(name, leaf_type, literal);
                }
                Operator::NotEquals => {
                    builder.start_not().equals(name, leaf_type, literal).end()?;
                }
                other => {
                    debug!(operator = %other, "filter push-down is not supported for operation");
                }
            },
            (operator, _) => {
                debug!(%operator, "filter push-down is not supported for operation");
            }
        }
        Ok(())
    }
}

impl TreeVisitor for SearchArgumentVisitor<'_> {
    fn before(&mut self, node: Node, level: usize) -> PxfResult<Option<Node>> {
        if let Node::Operator(op) = &node {
            if op.operator.is_logical() || level == 0 {
                match op.operator {
                    Operator::Or => self.builder.start_or(),
                    Operator::Not => self.builder.start_not(),
                    // a single bare predicate still needs its own block
                    _ => self.builder.start_and(),
                };
            }
        }
        Ok(Some(node))
    }

    fn visit(&mut self, node: Node, _level: usize) -> PxfResult<Option<Node>> {
        if let Node::Operator(op) = &node {
            if !op.operator.is_logical() {
                self.build_leaf(op)?;
            }
        }
        Ok(Some(node))
    }

    fn after(&mut self, node: Node, level: usize) -> PxfResult<Option<Node>> {
        if let Node::Operator(op) = &node {
            if op.operator.is_logical() || level == 0 {
                self.builder.end()?;
            }
        }
        Ok(Some(node))
    }
}

fn parse_number<T: FromStr>(data_type: DataType, value: &str) -> PxfResult<T> {
    value.trim().parse::<T>().map_err(|_| {
        PxfError::IllegalState(format!(
            "failed to parse number data {} for type {}",
            value, data_type
        ))
    })
}

/// Convert literal text to the native value of the declared type.
pub fn convert_literal(data_type: DataType, value: &str, zone: TimeZoneMode) -> PxfResult<Literal> {
    Ok(match data_type {
        DataType::Bigint => Literal::Long(parse_number::<i64>(data_type, value)?),
        DataType::Integer => Literal::Long(parse_number::<i32>(data_type, value)? as i64),
        DataType::Smallint => Literal::Long(parse_number::<i32>(data_type, value)? as i64),
        DataType::Real => {
            // widen through the decimal text to keep the float's digits
            let narrow = parse_number::<f32>(data_type, value)?;
            Literal::Float(parse_number::<f64>(data_type, &narrow.to_string())?)
        }
        DataType::Numeric | DataType::Float8 => {
            Literal::Float(parse_number::<f64>(data_type, value)?)
        }
        DataType::Text | DataType::Varchar | DataType::Bpchar => Literal::String(value.to_string()),
        DataType::Boolean => Literal::Boolean(value.eq_ignore_ascii_case("true")),
        DataType::Date => Literal::Date(datetime::parse_date(value)?),
        DataType::Timestamp => Literal::Timestamp(datetime::parse_timestamp(value, zone)?),
        DataType::Time | DataType::Bytea => {
            return Err(PxfError::InvalidArguments(format!(
                "Unknown type for literal {}",
                value
            )));
        }
        other => {
            return Err(PxfError::UnsupportedType(format!(
                "DataType {} unsupported",
                other
            )));
        }
    })
}
