//! Engine type model: data type OIDs, column descriptors and row fields.

use crate::decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine data types, identified by their catalog OID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Bytea,
    Bigint,
    Smallint,
    Integer,
    Text,
    Real,
    Float8,
    Bpchar,
    Varchar,
    Date,
    Time,
    Timestamp,
    TimestampWithTimeZone,
    Numeric,
    Uuid,

    BoolArray,
    ByteaArray,
    Int2Array,
    Int4Array,
    TextArray,
    BpcharArray,
    VarcharArray,
    Int8Array,
    Float4Array,
    Float8Array,
    TimestampArray,
    DateArray,
    TimeArray,
    TimestampWithTimeZoneArray,
    NumericArray,
    UuidArray,

    Unsupported,
}

impl DataType {
    const OIDS: [(DataType, i32); 32] = [
        (DataType::Boolean, 16),
        (DataType::Bytea, 17),
        (DataType::Bigint, 20),
        (DataType::Smallint, 21),
        (DataType::Integer, 23),
        (DataType::Text, 25),
        (DataType::Real, 700),
        (DataType::Float8, 701),
        (DataType::Bpchar, 1042),
        (DataType::Varchar, 1043),
        (DataType::Date, 1082),
        (DataType::Time, 1083),
        (DataType::Timestamp, 1114),
        (DataType::TimestampWithTimeZone, 1184),
        (DataType::Numeric, 1700),
        (DataType::Uuid, 2950),
        (DataType::BoolArray, 1000),
        (DataType::ByteaArray, 1001),
        (DataType::Int2Array, 1005),
        (DataType::Int4Array, 1007),
        (DataType::TextArray, 1009),
        (DataType::BpcharArray, 1014),
        (DataType::VarcharArray, 1015),
        (DataType::Int8Array, 1016),
        (DataType::Float4Array, 1021),
        (DataType::Float8Array, 1022),
        (DataType::TimestampArray, 1115),
        (DataType::DateArray, 1182),
        (DataType::TimeArray, 1183),
        (DataType::TimestampWithTimeZoneArray, 1185),
        (DataType::NumericArray, 1231),
        (DataType::UuidArray, 2951),
    ];

    const ARRAYS: [(DataType, DataType); 16] = [
        (DataType::Boolean, DataType::BoolArray),
        (DataType::Bytea, DataType::ByteaArray),
        (DataType::Smallint, DataType::Int2Array),
        (DataType::Integer, DataType::Int4Array),
        (DataType::Text, DataType::TextArray),
        (DataType::Bpchar, DataType::BpcharArray),
        (DataType::Varchar, DataType::VarcharArray),
        (DataType::Bigint, DataType::Int8Array),
        (DataType::Real, DataType::Float4Array),
        (DataType::Float8, DataType::Float8Array),
        (DataType::Timestamp, DataType::TimestampArray),
        (DataType::Date, DataType::DateArray),
        (DataType::Time, DataType::TimeArray),
        (DataType::TimestampWithTimeZone, DataType::TimestampWithTimeZoneArray),
        (DataType::Numeric, DataType::NumericArray),
        (DataType::Uuid, DataType::UuidArray),
    ];

    /// Map an OID to its type; unknown OIDs map to [`DataType::Unsupported`].
    pub fn from_oid(oid: i32) -> DataType {
        Self::OIDS
            .iter()
            .find(|(_, o)| *o == oid)
            .map(|(t, _)| *t)
            .unwrap_or(DataType::Unsupported)
    }

    /// Catalog OID, `-1` for unsupported types.
    pub fn oid(&self) -> i32 {
        Self::OIDS
            .iter()
            .find(|(t, _)| t == self)
            .map(|(_, o)| *o)
            .unwrap_or(-1)
    }

    pub fn is_array(&self) -> bool {
        Self::ARRAYS.iter().any(|(_, array)| array == self)
    }

    /// Element type of an array type.
    pub fn type_elem(&self) -> Option<DataType> {
        Self::ARRAYS
            .iter()
            .find(|(_, array)| array == self)
            .map(|(elem, _)| *elem)
    }

    /// Array type whose elements are of this type.
    pub fn array_type(&self) -> Option<DataType> {
        Self::ARRAYS
            .iter()
            .find(|(elem, _)| elem == self)
            .map(|(_, array)| *array)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Boolean => "BOOLEAN",
            DataType::Bytea => "BYTEA",
            DataType::Bigint => "BIGINT",
            DataType::Smallint => "SMALLINT",
            DataType::Integer => "INTEGER",
            DataType::Text => "TEXT",
            DataType::Real => "REAL",
            DataType::Float8 => "FLOAT8",
            DataType::Bpchar => "BPCHAR",
            DataType::Varchar => "VARCHAR",
            DataType::Date => "DATE",
            DataType::Time => "TIME",
            DataType::Timestamp => "TIMESTAMP",
            DataType::TimestampWithTimeZone => "TIMESTAMP_WITH_TIME_ZONE",
            DataType::Numeric => "NUMERIC",
            DataType::Uuid => "UUID",
            DataType::BoolArray => "BOOLARRAY",
            DataType::ByteaArray => "BYTEAARRAY",
            DataType::Int2Array => "INT2ARRAY",
            DataType::Int4Array => "INT4ARRAY",
            DataType::TextArray => "TEXTARRAY",
            DataType::BpcharArray => "BPCHARARRAY",
            DataType::VarcharArray => "VARCHARARRAY",
            DataType::Int8Array => "INT8ARRAY",
            DataType::Float4Array => "FLOAT4ARRAY",
            DataType::Float8Array => "FLOAT8ARRAY",
            DataType::TimestampArray => "TIMESTAMPARRAY",
            DataType::DateArray => "DATEARRAY",
            DataType::TimeArray => "TIMEARRAY",
            DataType::TimestampWithTimeZoneArray => "TIMESTAMP_WITH_TIMEZONE_ARRAY",
            DataType::NumericArray => "NUMERICARRAY",
            DataType::UuidArray => "UUIDARRAY",
            DataType::Unsupported => "UNSUPPORTED_TYPE",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One output column of the request's tuple description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: DataType,
    pub index: usize,
    pub type_name: String,
    pub type_modifiers: Option<Vec<i32>>,
    pub projected: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: DataType, index: usize) -> Self {
        Self {
            name: name.into(),
            data_type,
            index,
            type_name: data_type.name().to_lowercase(),
            type_modifiers: None,
            projected: true,
        }
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    pub fn with_modifiers(mut self, modifiers: Vec<i32>) -> Self {
        self.type_modifiers = Some(modifiers);
        self
    }

    pub fn with_projected(mut self, projected: bool) -> Self {
        self.projected = projected;
        self
    }

    pub fn type_code(&self) -> i32 {
        self.data_type.oid()
    }
}

/// Native value of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Boolean(bool),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    /// Days since 1970-01-01
    Date(i32),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Boolean(v) => write!(f, "{}", v),
            FieldValue::Short(v) => write!(f, "{}", v),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Long(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write!(f, "{}", v),
            FieldValue::Decimal(v) => write!(f, "{}", v),
            FieldValue::Text(v) => f.write_str(v),
            FieldValue::Bytes(v) => write!(f, "\\x{}", hex::encode(v)),
            FieldValue::Date(days) => f.write_str(&crate::datetime::format_date(*days)),
        }
    }
}

/// A field of a row, tagged with the engine type OID it decodes to.
#[derive(Debug, Clone, PartialEq)]
pub struct OneField {
    pub type_oid: i32,
    pub val: Option<FieldValue>,
}

impl OneField {
    pub fn new(type_oid: i32, val: Option<FieldValue>) -> Self {
        Self { type_oid, val }
    }

    pub fn null(type_oid: i32) -> Self {
        Self { type_oid, val: None }
    }

    pub fn is_null(&self) -> bool {
        self.val.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oid_lookup() {
        assert_eq!(DataType::from_oid(20), DataType::Bigint);
        assert_eq!(DataType::from_oid(1185), DataType::TimestampWithTimeZoneArray);
        assert_eq!(DataType::from_oid(5), DataType::Unsupported);
        assert_eq!(DataType::Numeric.oid(), 1700);
        assert_eq!(DataType::Unsupported.oid(), -1);
    }

    #[test]
    fn every_oid_maps_back() {
        for (data_type, oid) in DataType::OIDS {
            assert_eq!(DataType::from_oid(oid), data_type);
            assert_eq!(data_type.oid(), oid);
        }
    }

    #[test]
    fn array_element_types() {
        assert!(DataType::Int8Array.is_array());
        assert!(!DataType::Bigint.is_array());
        assert_eq!(DataType::Int8Array.type_elem(), Some(DataType::Bigint));
        assert_eq!(DataType::Bigint.array_type(), Some(DataType::Int8Array));
        assert_eq!(DataType::Text.type_elem(), None);
    }

    #[test]
    fn field_value_text() {
        assert_eq!(FieldValue::Date(0).to_string(), "1970-01-01");
        assert_eq!(FieldValue::Bytes(vec![0xde, 0xad]).to_string(), "\\xdead");
        assert_eq!(FieldValue::Text("a b".into()).to_string(), "a b");
    }

    #[test]
    fn column_descriptor_defaults() {
        let column = ColumnDescriptor::new("amt", DataType::Numeric, 3).with_modifiers(vec![38, 10]);
        assert!(column.projected);
        assert_eq!(column.type_name, "numeric");
        assert_eq!(column.type_code(), 1700);
        assert_eq!(column.type_modifiers, Some(vec![38, 10]));
    }
}
