//! Parser for the serialized filter string sent by the engine.
//!
//! 필터 문자열은 후위 표기(postfix)입니다:
//! - `a<idx>` 컬럼 인덱스
//! - `c<oid>s<len>d<data>` 스칼라 상수
//! - `m<oid>s<len>d<data>...` 리스트 상수
//! - `o<code>` 비교 연산자, `l<code>` 논리 연산자

use super::node::{CollectionOperand, Node, OperatorNode, ScalarOperand};
use super::Operator;
use crate::error::{PxfError, PxfResult};
use crate::types::DataType;

/// Stack-based postfix parser. One instance per filter string.
pub struct FilterParser<'a> {
    filter: &'a str,
    bytes: &'a [u8],
    index: usize,
    stack: Vec<Node>,
}

/// Parse a filter string into its tree. `None` input is rejected.
pub fn parse(filter: Option<&str>) -> PxfResult<Node> {
    match filter {
        Some(filter) => FilterParser::new(filter).parse(),
        None => Err(PxfError::NullFilter),
    }
}

impl<'a> FilterParser<'a> {
    pub fn new(filter: &'a str) -> Self {
        Self {
            filter,
            bytes: filter.as_bytes(),
            index: 0,
            stack: Vec::new(),
        }
    }

    pub fn parse(mut self) -> PxfResult<Node> {
        while let Some(&opcode) = self.bytes.get(self.index) {
            self.index += 1;
            match opcode {
                b'a' => {
                    let column = self.parse_int()?;
                    let column = usize::try_from(column).map_err(|_| {
                        self.error(format!("invalid column index {} at {}", column, self.index))
                    })?;
                    self.stack.push(Node::ColumnIndex(column));
                }
                b'c' => {
                    let data_type = self.parse_data_type()?;
                    let value = self.parse_scalar_value()?;
                    self.stack.push(Node::Scalar(ScalarOperand { data_type, value }));
                }
                b'm' => {
                    let data_type = self.parse_data_type()?;
                    if !data_type.is_array() {
                        return Err(self.error(format!(
                            "expected non-scalar datatype, but got datatype with oid = {}",
                            data_type.oid()
                        )));
                    }
                    let values = self.parse_list_values()?;
                    self.stack
                        .push(Node::Collection(CollectionOperand { data_type, values }));
                }
                b'o' => {
                    let code = self.parse_int()?;
                    let operator = Operator::from_code(code)
                        .ok_or_else(|| self.error(format!("unknown op ending at {}", self.index)))?;
                    self.push_operator(operator)?;
                }
                b'l' => {
                    let code = self.parse_int()?;
                    let operator = Operator::from_logical_code(code)
                        .ok_or_else(|| self.error(format!("unknown op ending at {}", self.index)))?;
                    self.push_operator(operator)?;
                }
                other => {
                    return Err(self.error(format!(
                        "unknown opcode {}({}) at {}",
                        other as char,
                        other,
                        self.index - 1
                    )));
                }
            }
        }

        match self.stack.len() {
            0 => Err(self.error("filter parsing ended with no result")),
            1 => match self.stack.pop() {
                Some(node @ Node::Operator(_)) => Ok(node),
                _ => Err(self.error("filter parsing failed, missing operators?")),
            },
            _ => Err(self.error("Stack not empty, missing operators?")),
        }
    }

    fn push_operator(&mut self, operator: Operator) -> PxfResult<()> {
        let node = if operator.is_unary() {
            let child = self.pop_operand(operator)?;
            OperatorNode::new(operator, Some(child), None)
        } else {
            let right = self.pop_operand(operator)?;
            let left = self.pop_operand(operator)?;
            // keep the column on the left: `5 > a` becomes `a < 5`
            if !operator.is_logical()
                && !matches!(left, Node::ColumnIndex(_))
                && matches!(right, Node::ColumnIndex(_))
            {
                OperatorNode::new(operator.flipped(), Some(right), Some(left))
            } else {
                OperatorNode::new(operator, Some(left), Some(right))
            }
        };
        self.stack.push(Node::Operator(node));
        Ok(())
    }

    fn pop_operand(&mut self, operator: Operator) -> PxfResult<Node> {
        self.stack.pop().ok_or_else(|| {
            self.error(format!(
                "missing operands for op {} at {}",
                operator.name(),
                self.index
            ))
        })
    }

    /// Signed integer argument that must fit in 32 bits.
    fn parse_int(&mut self) -> PxfResult<i32> {
        let start = self.index;
        if self.bytes.get(self.index) == Some(&b'-') {
            self.index += 1;
        }
        while self.bytes.get(self.index).is_some_and(u8::is_ascii_digit) {
            self.index += 1;
        }
        let digits = &self.filter[start..self.index];
        if digits.is_empty() || digits == "-" {
            self.index = start;
            return Err(self.error(format!("numeric argument expected at {}", start)));
        }
        let value: i64 = digits
            .parse()
            .map_err(|_| self.error(format!("invalid numeric argument {}", digits)))?;
        i32::try_from(value).map_err(|_| {
            self.error(format!(
                "value {} larger than intmax ending at {}",
                value, self.index
            ))
        })
    }

    fn parse_data_type(&mut self) -> PxfResult<DataType> {
        let start = self.index;
        if !self
            .bytes
            .get(self.index)
            .is_some_and(|b| b.is_ascii_digit() || *b == b'-')
        {
            return Err(self.error(format!("datatype OID should follow at {}", start)));
        }
        let oid = self.parse_int()?;
        match DataType::from_oid(oid) {
            DataType::Unsupported => {
                Err(self.error(format!("invalid DataType OID at {}", self.index - 1)))
            }
            data_type => Ok(data_type),
        }
    }

    fn parse_scalar_value(&mut self) -> PxfResult<String> {
        if self.bytes.get(self.index) != Some(&b's') {
            return Err(self.error(format!(
                "data length delimiter 's' expected at {}",
                self.index
            )));
        }
        self.index += 1;
        let length = self.parse_length()?;
        if self.index + length > self.bytes.len() {
            return Err(self.error(format!(
                "data size larger than filter string starting at {}",
                self.index
            )));
        }
        if self.bytes.get(self.index) != Some(&b'd') {
            return Err(self.error(format!("data delimiter 'd' expected at {}", self.index)));
        }
        self.index += 1;
        self.take_data(length)
    }

    fn parse_list_values(&mut self) -> PxfResult<Vec<String>> {
        let mut values = Vec::new();
        while self.bytes.get(self.index) == Some(&b's') {
            self.index += 1;
            let length = self.parse_length()?;
            if self.bytes.get(self.index) != Some(&b'd') {
                return Err(self.error(format!("data delimiter 'd' expected at {}", self.index)));
            }
            self.index += 1;
            if self.index + length > self.bytes.len() {
                return Err(self.error("filter string is shorter than expected"));
            }
            values.push(self.take_data(length)?);
        }
        Ok(values)
    }

    fn parse_length(&mut self) -> PxfResult<usize> {
        let start = self.index;
        let length = self.parse_int()?;
        usize::try_from(length)
            .map_err(|_| self.error(format!("invalid data length {} at {}", length, start)))
    }

    fn take_data(&mut self, length: usize) -> PxfResult<String> {
        let end = self.index + length;
        let data = self
            .bytes
            .get(self.index..end)
            .ok_or_else(|| self.error("filter string is shorter than expected"))?;
        let value = String::from_utf8_lossy(data).into_owned();
        self.index = end;
        Ok(value)
    }

    fn error(&self, message: impl Into<String>) -> PxfError {
        PxfError::filter_syntax(message, self.filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(filter: &str) -> String {
        parse(Some(filter)).unwrap_err().to_string()
    }

    fn assert_parse_error(filter: &str, message: &str) {
        assert_eq!(
            parse_err(filter),
            format!("{} (filter string: '{}')", message, filter)
        );
    }

    // ── Structure ──

    #[test]
    fn parses_simple_comparison() {
        let node = parse(Some("a1c20s1d1o2")).unwrap();
        assert_eq!(
            node,
            Node::operator(
                Operator::GreaterThan,
                Node::ColumnIndex(1),
                Node::scalar(DataType::Bigint, "1")
            )
        );
    }

    #[test]
    fn constant_before_column_is_swapped() {
        let node = parse(Some("c20s1d1a1o1")).unwrap();
        assert_eq!(
            node,
            Node::operator(
                Operator::GreaterThan,
                Node::ColumnIndex(1),
                Node::scalar(DataType::Bigint, "1")
            )
        );
        let node = parse(Some("c20s1d1a1o4")).unwrap();
        assert_eq!(node.as_operator().unwrap().operator, Operator::LessThanOrEqual);
    }

    #[test]
    fn parses_logical_tree() {
        let node = parse(Some("a1c20s1d1o2a2c25s3dabco5l0")).unwrap();
        let and = node.as_operator().unwrap();
        assert_eq!(and.operator, Operator::And);
        assert_eq!(and.left.as_deref().unwrap().as_operator().unwrap().operator, Operator::GreaterThan);
        assert_eq!(and.right.as_deref().unwrap().as_operator().unwrap().operator, Operator::Equals);
    }

    #[test]
    fn parses_unary_operators() {
        let node = parse(Some("a3o8")).unwrap();
        assert_eq!(node, Node::unary(Operator::IsNull, Node::ColumnIndex(3)));
        let node = parse(Some("a1c20s1d0o5l2")).unwrap();
        let not = node.as_operator().unwrap();
        assert_eq!(not.operator, Operator::Not);
        assert_eq!(not.child_count(), 1);
    }

    #[test]
    fn parses_collection() {
        let node = parse(Some("a0m1016s3d194s5d82756o10")).unwrap();
        let op = node.as_operator().unwrap();
        assert_eq!(op.operator, Operator::In);
        assert_eq!(
            op.right.as_deref(),
            Some(&Node::Collection(CollectionOperand {
                data_type: DataType::Int8Array,
                values: vec!["194".to_string(), "82756".to_string()],
            }))
        );
    }

    #[test]
    fn parses_empty_and_multibyte_values() {
        let node = parse(Some("a1c25s0do5")).unwrap();
        assert_eq!(
            node.as_operator().unwrap().right.as_deref(),
            Some(&Node::scalar(DataType::Text, ""))
        );
        let node = parse(Some("a1c25s4dñúo5")).unwrap();
        assert_eq!(
            node.as_operator().unwrap().right.as_deref(),
            Some(&Node::scalar(DataType::Text, "ñú"))
        );
    }

    #[test]
    fn parses_max_int_column() {
        assert!(parse(Some("a2147483647o8")).is_ok());
    }

    // ── Errors ──

    #[test]
    fn empty_and_null_filters() {
        assert_parse_error("", "filter parsing ended with no result");
        assert_eq!(
            parse(None).unwrap_err().to_string(),
            "filter parsing ended with no result (null filter string)"
        );
    }

    #[test]
    fn unknown_opcodes() {
        assert_parse_error("g is not an operand", "unknown opcode g(103) at 0");
        assert_parse_error(
            "m1007s1d1s1d2s2d123",
            "unknown opcode 3(51) at 18",
        );
        assert_parse_error("o100", "unknown op ending at 4");
        assert_parse_error("l7", "unknown op ending at 2");
    }

    #[test]
    fn numeric_arguments() {
        for filter in ["a", "aa", "o", "ohno"] {
            assert_parse_error(filter, "numeric argument expected at 1");
        }
        assert_parse_error(
            "a12345678901234567890123456789",
            "invalid numeric argument 12345678901234567890123456789",
        );
        assert_parse_error(
            "a-12345678901234567890123456789",
            "invalid numeric argument -12345678901234567890123456789",
        );
        assert_parse_error(
            "a12345678901223456",
            "value 12345678901223456 larger than intmax ending at 18",
        );
        assert_parse_error(
            "a-12345678901223456",
            "value -12345678901223456 larger than intmax ending at 19",
        );
        assert_parse_error(
            "a2147483648o8",
            "value 2147483648 larger than intmax ending at 11",
        );
    }

    #[test]
    fn constant_syntax() {
        assert_parse_error("cs", "datatype OID should follow at 1");
        assert_parse_error("c5", "invalid DataType OID at 1");
        assert_parse_error("m1122", "invalid DataType OID at 4");
        assert_parse_error("c20x", "data length delimiter 's' expected at 3");
        assert_parse_error("c20sd", "numeric argument expected at 4");
        assert_parse_error("c20s1500", "data size larger than filter string starting at 8");
        assert_parse_error("c20s1x", "data delimiter 'd' expected at 5");
        assert_parse_error("c20s5d", "data size larger than filter string starting at 5");
    }

    #[test]
    fn list_syntax() {
        assert_parse_error(
            "m20",
            "expected non-scalar datatype, but got datatype with oid = 20",
        );
        assert_parse_error(
            "m1007s1d1s1d2s2d3",
            "filter string is shorter than expected",
        );
    }

    #[test]
    fn missing_operators() {
        for filter in [
            "c20s3ds9r",
            "a1234567890",
            "c20s1d1",
            "c25s0d",
            "c700s3d9.0",
            "c701s8d-10.0001",
        ] {
            assert_parse_error(filter, "filter parsing failed, missing operators?");
        }
        for filter in ["c20s1d1c20s1d1", "c20s1d1a1", "a1c700s1d1"] {
            assert_parse_error(filter, "Stack not empty, missing operators?");
        }
    }

    #[test]
    fn missing_operands() {
        assert_parse_error("o1a3", "missing operands for op LESS_THAN at 2");
        assert_parse_error("a2o1", "missing operands for op LESS_THAN at 4");
        assert_parse_error("l0", "missing operands for op AND at 2");
    }
}
