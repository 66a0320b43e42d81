//! Predicate leaves, typed literals and min/max statistics evaluation.

use super::TruthValue;
use crate::decimal::Decimal;
use crate::datetime::{self, TimeZoneMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Comparison performed by a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeafOperator {
    Equals,
    NullSafeEquals,
    LessThan,
    LessThanEquals,
    In,
    Between,
    IsNull,
}

impl LeafOperator {
    pub fn name(&self) -> &'static str {
        match self {
            LeafOperator::Equals => "EQUALS",
            LeafOperator::NullSafeEquals => "NULL_SAFE_EQUALS",
            LeafOperator::LessThan => "LESS_THAN",
            LeafOperator::LessThanEquals => "LESS_THAN_EQUALS",
            LeafOperator::In => "IN",
            LeafOperator::Between => "BETWEEN",
            LeafOperator::IsNull => "IS_NULL",
        }
    }
}

/// Type tag of the literals of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeafType {
    Long,
    Float,
    String,
    Date,
    Decimal,
    Timestamp,
    Boolean,
}

/// A literal already converted to its native representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Long(i64),
    Float(f64),
    String(String),
    /// Days since 1970-01-01
    Date(i32),
    Decimal(Decimal),
    Timestamp(DateTime<Utc>),
    Boolean(bool),
}

impl Literal {
    /// Leaf type derived from the runtime value.
    pub fn leaf_type(&self) -> LeafType {
        match self {
            Literal::Long(_) => LeafType::Long,
            Literal::Float(_) => LeafType::Float,
            Literal::String(_) => LeafType::String,
            Literal::Date(_) => LeafType::Date,
            Literal::Decimal(_) => LeafType::Decimal,
            Literal::Timestamp(_) => LeafType::Timestamp,
            Literal::Boolean(_) => LeafType::Boolean,
        }
    }

    /// Order two literals; `None` when they are not comparable.
    pub fn compare(&self, other: &Literal) -> Option<Ordering> {
        match (self, other) {
            (Literal::Long(a), Literal::Long(b)) => Some(a.cmp(b)),
            (Literal::Long(a), Literal::Float(b)) => (*a as f64).partial_cmp(b),
            (Literal::Float(a), Literal::Long(b)) => a.partial_cmp(&(*b as f64)),
            (Literal::Float(a), Literal::Float(b)) => a.partial_cmp(b),
            (Literal::Decimal(a), Literal::Decimal(b)) => Some(a.cmp(b)),
            (Literal::Decimal(a), Literal::Long(b)) => Some(a.cmp(&Decimal::from_i64(*b))),
            (Literal::Long(a), Literal::Decimal(b)) => Some(Decimal::from_i64(*a).cmp(b)),
            (Literal::Decimal(a), Literal::Float(b)) => a.to_f64().partial_cmp(b),
            (Literal::Float(a), Literal::Decimal(b)) => a.partial_cmp(&b.to_f64()),
            (Literal::String(a), Literal::String(b)) => Some(a.cmp(b)),
            (Literal::Date(a), Literal::Date(b)) => Some(a.cmp(b)),
            (Literal::Timestamp(a), Literal::Timestamp(b)) => Some(a.cmp(b)),
            (Literal::Boolean(a), Literal::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Long(v) => write!(f, "{}", v),
            Literal::Float(v) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e7 {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            Literal::String(v) => f.write_str(v),
            Literal::Date(days) => f.write_str(&datetime::format_date(*days)),
            Literal::Decimal(v) => write!(f, "{}", v),
            Literal::Timestamp(instant) => {
                let text = datetime::format_timestamp(*instant, TimeZoneMode::Utc);
                if text.contains('.') {
                    f.write_str(&text)
                } else {
                    write!(f, "{}.0", text)
                }
            }
            Literal::Boolean(v) => write!(f, "{}", v),
        }
    }
}

/// One comparison of a column against literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateLeaf {
    pub operator: LeafOperator,
    pub leaf_type: LeafType,
    pub column: String,
    pub literal: Option<Literal>,
    pub literals: Vec<Literal>,
}

/// Min/max/null summary of one column over a storage unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnStatistics {
    pub min: Option<Literal>,
    pub max: Option<Literal>,
    pub has_null: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Before,
    Min,
    Middle,
    Max,
    After,
}

fn location(point: &Literal, min: &Literal, max: &Literal) -> Option<Location> {
    match point.compare(min)? {
        Ordering::Less => return Some(Location::Before),
        Ordering::Equal => return Some(Location::Min),
        Ordering::Greater => {}
    }
    Some(match point.compare(max)? {
        Ordering::Greater => Location::After,
        Ordering::Equal => Location::Max,
        Ordering::Less => Location::Middle,
    })
}

impl PredicateLeaf {
    /// What the leaf may evaluate to for rows summarized by `stats`.
    pub fn evaluate(&self, stats: Option<&ColumnStatistics>) -> TruthValue {
        let Some(stats) = stats else {
            return TruthValue::YesNoNull;
        };
        let (Some(min), Some(max)) = (&stats.min, &stats.max) else {
            // no values at all: either every row is null or nothing is known
            return if !stats.has_null {
                TruthValue::YesNoNull
            } else if self.operator == LeafOperator::IsNull {
                TruthValue::Yes
            } else {
                TruthValue::Null
            };
        };
        self.evaluate_range(min, max, stats.has_null)
            .unwrap_or(TruthValue::YesNoNull)
    }

    fn evaluate_range(&self, min: &Literal, max: &Literal, has_null: bool) -> Option<TruthValue> {
        use TruthValue::*;
        let single_value = min.compare(max) == Some(Ordering::Equal);
        let value = match self.operator {
            LeafOperator::Equals | LeafOperator::NullSafeEquals => {
                let loc = location(self.literal.as_ref()?, min, max)?;
                if self.operator == LeafOperator::NullSafeEquals {
                    return Some(if matches!(loc, Location::Before | Location::After) {
                        No
                    } else {
                        YesNo
                    });
                }
                if single_value && loc == Location::Min {
                    Yes
                } else if matches!(loc, Location::Before | Location::After) {
                    No
                } else {
                    YesNo
                }
            }
            LeafOperator::LessThan => match location(self.literal.as_ref()?, min, max)? {
                Location::After => Yes,
                Location::Before | Location::Min => No,
                _ => YesNo,
            },
            LeafOperator::LessThanEquals => match location(self.literal.as_ref()?, min, max)? {
                Location::After | Location::Max => Yes,
                Location::Before => No,
                _ => YesNo,
            },
            LeafOperator::In => {
                let mut result = No;
                for literal in &self.literals {
                    let loc = location(literal, min, max)?;
                    if single_value {
                        if loc == Location::Min {
                            result = Yes;
                            break;
                        }
                    } else if matches!(loc, Location::Min | Location::Middle | Location::Max) {
                        result = YesNo;
                        break;
                    }
                }
                result
            }
            LeafOperator::Between => {
                let (low, high) = (self.literals.first()?, self.literals.get(1)?);
                let low_loc = location(low, min, max)?;
                let high_loc = location(high, min, max)?;
                if matches!(low_loc, Location::Before | Location::Min)
                    && matches!(high_loc, Location::Max | Location::After)
                {
                    Yes
                } else if low_loc == Location::After || high_loc == Location::Before {
                    No
                } else {
                    YesNo
                }
            }
            LeafOperator::IsNull => return Some(if has_null { YesNo } else { No }),
        };
        Some(value.with_null(has_null))
    }
}

impl fmt::Display for PredicateLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {}", self.operator.name(), self.column)?;
        if let Some(literal) = &self.literal {
            write!(f, " {}", literal)?;
        } else {
            for literal in &self.literals {
                write!(f, " {}", literal)?;
            }
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TruthValue::*;

    fn leaf(operator: LeafOperator, literal: Literal) -> PredicateLeaf {
        PredicateLeaf {
            operator,
            leaf_type: literal.leaf_type(),
            column: "x".to_string(),
            literal: Some(literal),
            literals: Vec::new(),
        }
    }

    fn stats(min: i64, max: i64, has_null: bool) -> ColumnStatistics {
        ColumnStatistics {
            min: Some(Literal::Long(min)),
            max: Some(Literal::Long(max)),
            has_null,
        }
    }

    #[test]
    fn display_leaves() {
        assert_eq!(
            leaf(LeafOperator::Equals, Literal::Long(1)).to_string(),
            "(EQUALS x 1)"
        );
        assert_eq!(
            leaf(LeafOperator::LessThan, Literal::Float(1200.0)).to_string(),
            "(LESS_THAN x 1200.0)"
        );
        assert_eq!(
            leaf(LeafOperator::LessThan, Literal::Date(13910)).to_string(),
            "(LESS_THAN x 2008-02-01)"
        );
        let in_list = PredicateLeaf {
            operator: LeafOperator::In,
            leaf_type: LeafType::Long,
            column: "id".to_string(),
            literal: None,
            literals: vec![Literal::Long(194), Literal::Long(82756)],
        };
        assert_eq!(in_list.to_string(), "(IN id 194 82756)");
    }

    #[test]
    fn equals_against_range() {
        let eq = |v| leaf(LeafOperator::Equals, Literal::Long(v));
        assert_eq!(eq(5).evaluate(Some(&stats(1, 10, false))), YesNo);
        assert_eq!(eq(11).evaluate(Some(&stats(1, 10, false))), No);
        assert_eq!(eq(0).evaluate(Some(&stats(1, 10, true))), NoNull);
        assert_eq!(eq(7).evaluate(Some(&stats(7, 7, false))), Yes);
        assert_eq!(eq(7).evaluate(Some(&stats(7, 7, true))), YesNull);
    }

    #[test]
    fn less_than_against_range() {
        let lt = |v| leaf(LeafOperator::LessThan, Literal::Long(v));
        let le = |v| leaf(LeafOperator::LessThanEquals, Literal::Long(v));
        assert_eq!(lt(11).evaluate(Some(&stats(1, 10, false))), Yes);
        assert_eq!(lt(1).evaluate(Some(&stats(1, 10, false))), No);
        assert_eq!(lt(5).evaluate(Some(&stats(1, 10, false))), YesNo);
        assert_eq!(le(10).evaluate(Some(&stats(1, 10, false))), Yes);
        assert_eq!(le(0).evaluate(Some(&stats(1, 10, false))), No);
    }

    #[test]
    fn in_and_null_checks() {
        let in_list = |values: &[i64]| PredicateLeaf {
            operator: LeafOperator::In,
            leaf_type: LeafType::Long,
            column: "x".to_string(),
            literal: None,
            literals: values.iter().map(|v| Literal::Long(*v)).collect(),
        };
        assert_eq!(in_list(&[20, 30]).evaluate(Some(&stats(1, 10, false))), No);
        assert_eq!(in_list(&[20, 3]).evaluate(Some(&stats(1, 10, false))), YesNo);
        assert_eq!(in_list(&[4, 5]).evaluate(Some(&stats(5, 5, false))), Yes);

        let is_null = PredicateLeaf {
            operator: LeafOperator::IsNull,
            leaf_type: LeafType::String,
            column: "x".to_string(),
            literal: None,
            literals: Vec::new(),
        };
        assert_eq!(is_null.evaluate(Some(&stats(1, 10, false))), No);
        assert_eq!(is_null.evaluate(Some(&stats(1, 10, true))), YesNo);
        let all_null = ColumnStatistics {
            has_null: true,
            ..Default::default()
        };
        assert_eq!(is_null.evaluate(Some(&all_null)), Yes);
        assert_eq!(
            leaf(LeafOperator::Equals, Literal::Long(1)).evaluate(Some(&all_null)),
            Null
        );
    }

    #[test]
    fn incomparable_or_missing_statistics() {
        let eq = leaf(LeafOperator::Equals, Literal::String("a".to_string()));
        assert_eq!(eq.evaluate(Some(&stats(1, 10, false))), YesNoNull);
        assert_eq!(eq.evaluate(None), YesNoNull);
        let float = leaf(LeafOperator::LessThan, Literal::Float(0.5));
        assert_eq!(float.evaluate(Some(&stats(1, 10, false))), No);
    }
}
