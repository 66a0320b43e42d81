use std::fmt;

/// Comparison and logical operators of a filter tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Noop,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Equals,
    NotEquals,
    Like,
    IsNull,
    IsNotNull,
    In,
    And,
    Or,
    Not,
}

impl Operator {
    /// Operator for an `o<code>` token.
    pub fn from_code(code: i32) -> Option<Operator> {
        Some(match code {
            0 => Operator::Noop,
            1 => Operator::LessThan,
            2 => Operator::GreaterThan,
            3 => Operator::LessThanOrEqual,
            4 => Operator::GreaterThanOrEqual,
            5 => Operator::Equals,
            6 => Operator::NotEquals,
            7 => Operator::Like,
            8 => Operator::IsNull,
            9 => Operator::IsNotNull,
            10 => Operator::In,
            _ => return None,
        })
    }

    /// Operator for an `l<code>` token.
    pub fn from_logical_code(code: i32) -> Option<Operator> {
        Some(match code {
            0 => Operator::And,
            1 => Operator::Or,
            2 => Operator::Not,
            _ => return None,
        })
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::And | Operator::Or | Operator::Not)
    }

    /// Operators that take a single operand.
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull | Operator::Not)
    }

    /// Equivalent operator once the operands are swapped (`5 > a` becomes `a < 5`).
    pub fn flipped(&self) -> Operator {
        match self {
            Operator::LessThan => Operator::GreaterThan,
            Operator::GreaterThan => Operator::LessThan,
            Operator::LessThanOrEqual => Operator::GreaterThanOrEqual,
            Operator::GreaterThanOrEqual => Operator::LessThanOrEqual,
            other => *other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operator::Noop => "NOOP",
            Operator::LessThan => "LESS_THAN",
            Operator::GreaterThan => "GREATER_THAN",
            Operator::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            Operator::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            Operator::Equals => "EQUALS",
            Operator::NotEquals => "NOT_EQUALS",
            Operator::Like => "LIKE",
            Operator::IsNull => "IS_NULL",
            Operator::IsNotNull => "IS_NOT_NULL",
            Operator::In => "IN",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
        }
    }

    /// SQL spelling used when rendering predicates.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Noop => "",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThanOrEqual => ">=",
            Operator::Equals => "=",
            Operator::NotEquals => "<>",
            Operator::Like => "LIKE",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::In => "IN",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
        }
    }

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compact set of operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperatorSet(u16);

impl OperatorSet {
    pub const NONE: OperatorSet = OperatorSet(0);

    pub const ALL: OperatorSet = OperatorSet::of(&[
        Operator::Noop,
        Operator::LessThan,
        Operator::GreaterThan,
        Operator::LessThanOrEqual,
        Operator::GreaterThanOrEqual,
        Operator::Equals,
        Operator::NotEquals,
        Operator::Like,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::In,
        Operator::And,
        Operator::Or,
        Operator::Not,
    ]);

    pub const fn of(operators: &[Operator]) -> OperatorSet {
        let mut bits = 0u16;
        let mut i = 0;
        while i < operators.len() {
            bits |= operators[i].bit();
            i += 1;
        }
        OperatorSet(bits)
    }

    pub fn contains(&self, operator: Operator) -> bool {
        self.0 & operator.bit() != 0
    }

    pub fn with(self, operator: Operator) -> OperatorSet {
        OperatorSet(self.0 | operator.bit())
    }

    pub fn without(self, operator: Operator) -> OperatorSet {
        OperatorSet(self.0 & !operator.bit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(Operator::from_code(0), Some(Operator::Noop));
        assert_eq!(Operator::from_code(10), Some(Operator::In));
        assert_eq!(Operator::from_code(11), None);
        assert_eq!(Operator::from_logical_code(2), Some(Operator::Not));
        assert_eq!(Operator::from_logical_code(3), None);
    }

    #[test]
    fn flipping() {
        assert_eq!(Operator::LessThan.flipped(), Operator::GreaterThan);
        assert_eq!(Operator::GreaterThanOrEqual.flipped(), Operator::LessThanOrEqual);
        assert_eq!(Operator::Equals.flipped(), Operator::Equals);
    }

    #[test]
    fn operator_set() {
        let set = OperatorSet::of(&[Operator::Equals, Operator::And]);
        assert!(set.contains(Operator::Equals));
        assert!(!set.contains(Operator::Or));
        assert!(set.with(Operator::Or).contains(Operator::Or));
        assert!(!set.without(Operator::And).contains(Operator::And));
        assert!(OperatorSet::ALL.contains(Operator::Not));
        assert!(!OperatorSet::NONE.contains(Operator::Noop));
    }
}
