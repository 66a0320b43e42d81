//! ORC column vector ↔ engine field mapping.
//!
//! | ORC category | lane | engine type (OID) |
//! |---|---|---|
//! | boolean | long | BOOLEAN (16) |
//! | tinyint, smallint | long | SMALLINT (21) |
//! | int | long | INTEGER (23) |
//! | bigint | long | BIGINT (20) |
//! | date | long | DATE (1082) |
//! | float | double | REAL (700) |
//! | double | double | FLOAT8 (701) |
//! | decimal | decimal | NUMERIC (1700) |
//! | string / char / varchar | bytes | TEXT (25) / BPCHAR (1042) / VARCHAR (1043) |
//! | binary | bytes | BYTEA (17) |
//! | timestamp | timestamp | TIMESTAMP (1114) |
//! | timestamp with local time zone | timestamp | TIMESTAMP_WITH_TIME_ZONE (1184) |
//! | array<T> | list | array type of T |

use super::type_description::{Category, TypeDescription};
use super::utilities;
use super::vector::{ColumnVector, ListVector, VectorData};
use crate::datetime::{self, TimeZoneMode};
use crate::decimal::Decimal;
use crate::error::{PxfError, PxfResult};
use crate::pg::{self, PgArrayBuilder};
use crate::types::{DataType, FieldValue, OneField};
use tracing::{debug, trace, warn};

/// Decoder for one column of a read batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnReader {
    Boolean,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Text,
    Decimal,
    Binary,
    Date,
    Timestamp,
    TimestampWithZone,
    /// One-dimensional list, rendered as an array literal.
    List(Category),
}

impl ColumnReader {
    /// Reader and engine type for an ORC column.
    pub fn for_type(schema: &TypeDescription) -> PxfResult<(ColumnReader, DataType)> {
        let mapped = match schema.category() {
            Category::Boolean => (ColumnReader::Boolean, DataType::Boolean),
            Category::Byte | Category::Short => (ColumnReader::Short, DataType::Smallint),
            Category::Int => (ColumnReader::Integer, DataType::Integer),
            Category::Long => (ColumnReader::Long, DataType::Bigint),
            Category::Float => (ColumnReader::Float, DataType::Real),
            Category::Double => (ColumnReader::Double, DataType::Float8),
            Category::String => (ColumnReader::Text, DataType::Text),
            Category::Varchar => (ColumnReader::Text, DataType::Varchar),
            Category::Char => (ColumnReader::Text, DataType::Bpchar),
            Category::Date => (ColumnReader::Date, DataType::Date),
            Category::Timestamp => (ColumnReader::Timestamp, DataType::Timestamp),
            Category::TimestampInstant => {
                (ColumnReader::TimestampWithZone, DataType::TimestampWithTimeZone)
            }
            Category::Binary => (ColumnReader::Binary, DataType::Bytea),
            Category::Decimal => (ColumnReader::Decimal, DataType::Numeric),
            Category::List => {
                let element = schema.element().map(TypeDescription::category);
                let array_type = element.and_then(array_data_type);
                match (element, array_type) {
                    (Some(element), Some(array_type)) => (ColumnReader::List(element), array_type),
                    _ => return Err(unsupported_for_reading(schema.category())),
                }
            }
            other => return Err(unsupported_for_reading(other)),
        };
        Ok(mapped)
    }

    /// Decode the first `size` logical rows of `vector`.
    pub fn read(
        &self,
        vector: &ColumnVector,
        size: usize,
        oid: i32,
        zone: TimeZoneMode,
    ) -> PxfResult<Vec<OneField>> {
        let mut result = Vec::with_capacity(size);
        if let ColumnReader::List(element) = self {
            let VectorData::List(list) = &vector.data else {
                return Err(lane_mismatch(*self));
            };
            // a repeating list is serialized once
            let repeated = if vector.is_repeating {
                Some(serialize_list_row(vector, list, 0, *element, oid, zone)?)
            } else {
                None
            };
            for row in 0..size {
                let value = match &repeated {
                    Some(value) => value.clone(),
                    None => serialize_list_row(vector, list, row, *element, oid, zone)?,
                };
                result.push(OneField::new(oid, value.map(FieldValue::Text)));
            }
            return Ok(result);
        }

        for row in 0..size {
            let row_id = vector.row_index(row);
            let value = if vector.no_nulls || !vector.is_null[row_id] {
                Some(self.decode(vector, row_id, zone)?)
            } else {
                None
            };
            result.push(OneField::new(oid, value));
        }
        Ok(result)
    }

    fn decode(&self, vector: &ColumnVector, row: usize, zone: TimeZoneMode) -> PxfResult<FieldValue> {
        let value = match (self, &vector.data) {
            (ColumnReader::Boolean, VectorData::Long(v)) => FieldValue::Boolean(v[row] == 1),
            (ColumnReader::Short, VectorData::Long(v)) => FieldValue::Short(v[row] as i16),
            (ColumnReader::Integer, VectorData::Long(v)) => FieldValue::Integer(v[row] as i32),
            (ColumnReader::Long, VectorData::Long(v)) => FieldValue::Long(v[row]),
            (ColumnReader::Date, VectorData::Long(v)) => FieldValue::Date(v[row] as i32),
            (ColumnReader::Float, VectorData::Double(v)) => FieldValue::Float(v[row] as f32),
            (ColumnReader::Double, VectorData::Double(v)) => FieldValue::Double(v[row]),
            (ColumnReader::Decimal, VectorData::Decimal(v)) => FieldValue::Decimal(v[row]),
            (ColumnReader::Text, VectorData::Bytes(b)) => {
                FieldValue::Text(String::from_utf8_lossy(b.get(row)).into_owned())
            }
            (ColumnReader::Binary, VectorData::Bytes(b)) => FieldValue::Bytes(b.get(row).to_vec()),
            (ColumnReader::Timestamp, VectorData::Timestamp(ts)) => {
                let instant = ts.get(row).ok_or_else(|| invalid_timestamp(ts.time[row]))?;
                let text = datetime::format_timestamp(instant, zone);
                trace!(millis = ts.time[row], %text, "converted timestamp");
                FieldValue::Text(text)
            }
            (ColumnReader::TimestampWithZone, VectorData::Timestamp(ts)) => {
                let instant = ts.get(row).ok_or_else(|| invalid_timestamp(ts.time[row]))?;
                FieldValue::Text(datetime::format_timestamp_with_zone(instant, zone))
            }
            _ => return Err(lane_mismatch(*self)),
        };
        Ok(value)
    }
}

/// Array type whose elements come from an ORC list of `element`.
pub fn array_data_type(element: Category) -> Option<DataType> {
    Some(match element {
        Category::Boolean => DataType::BoolArray,
        Category::Byte | Category::Short => DataType::Int2Array,
        Category::Int => DataType::Int4Array,
        Category::Long => DataType::Int8Array,
        Category::Float => DataType::Float4Array,
        Category::Double => DataType::Float8Array,
        Category::String => DataType::TextArray,
        Category::Varchar => DataType::VarcharArray,
        Category::Char => DataType::BpcharArray,
        Category::Binary => DataType::ByteaArray,
        Category::Date => DataType::DateArray,
        Category::Timestamp => DataType::TimestampArray,
        Category::TimestampInstant => DataType::TimestampWithTimeZoneArray,
        Category::Decimal => DataType::NumericArray,
        _ => return None,
    })
}

fn serialize_list_row(
    vector: &ColumnVector,
    list: &ListVector,
    row: usize,
    element: Category,
    oid: i32,
    zone: TimeZoneMode,
) -> PxfResult<Option<String>> {
    if vector.is_null[row] && !vector.no_nulls {
        return Ok(None);
    }
    let child = list.child.as_ref();
    let (offset, length) = (list.offsets[row], list.lengths[row]);

    let mut builder = PgArrayBuilder::new();
    builder.start_array();
    for child_row in offset..offset + length {
        let child_row = child.row_index(child_row);
        if child.is_null_at(child_row) {
            builder.add_element(None);
            continue;
        }
        match (&child.data, element) {
            (VectorData::Bytes(bytes), Category::Binary)
                if oid == DataType::ByteaArray.oid() =>
            {
                builder.add_element_no_escaping(&pg::encode_and_escape_bytea_hex(bytes.get(child_row)));
            }
            (VectorData::Bytes(bytes), _) => {
                builder.add_element(Some(&String::from_utf8_lossy(bytes.get(child_row))));
            }
            (VectorData::Long(values), Category::Boolean) => {
                builder.add_element_no_escaping(if values[child_row] == 1 { "t" } else { "f" });
            }
            (VectorData::Long(values), Category::Date) => {
                builder.add_element(Some(&datetime::format_date(values[child_row] as i32)));
            }
            (VectorData::Long(values), _) => {
                builder.add_element_no_escaping(&values[child_row].to_string());
            }
            (VectorData::Double(values), Category::Float) => {
                builder.add_element_no_escaping(&(values[child_row] as f32).to_string());
            }
            (VectorData::Double(values), _) => {
                builder.add_element_no_escaping(&values[child_row].to_string());
            }
            (VectorData::Decimal(values), _) => {
                builder.add_element_no_escaping(&values[child_row].to_string());
            }
            (VectorData::Timestamp(ts), _) => {
                let instant = ts
                    .get(child_row)
                    .ok_or_else(|| invalid_timestamp(ts.time[child_row]))?;
                let text = if oid == DataType::TimestampWithTimeZoneArray.oid() {
                    datetime::format_timestamp_with_zone(instant, zone)
                } else {
                    datetime::format_timestamp(instant, zone)
                };
                builder.add_element(Some(&text));
            }
            _ => return Err(unsupported_for_reading(Category::List)),
        }
    }
    builder.end_array();
    Ok(Some(builder.into_string()))
}

/// Encoder for one column of a write batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnWriter {
    Boolean,
    Integral,
    Floating,
    Text,
    Date,
    Timestamp(TimeZoneMode),
    TimestampInstant,
    Binary,
    Decimal {
        precision: u8,
        scale: u8,
        strict: bool,
    },
    List {
        element: Category,
        writer: Box<ColumnWriter>,
    },
}

impl ColumnWriter {
    /// Writer for an ORC column; `zone` is the writer zone for plain timestamps.
    pub fn for_type(schema: &TypeDescription, zone: TimeZoneMode, strict: bool) -> PxfResult<Self> {
        let writer = match schema.category() {
            Category::List => {
                let element = schema
                    .element()
                    .filter(|e| e.category().is_primitive())
                    .ok_or_else(|| unsupported_for_writing(Category::List))?;
                ColumnWriter::List {
                    element: element.category(),
                    writer: Box::new(Self::for_type(element, zone, strict)?),
                }
            }
            Category::Boolean => ColumnWriter::Boolean,
            Category::Byte | Category::Short | Category::Int | Category::Long => {
                ColumnWriter::Integral
            }
            Category::Float | Category::Double => ColumnWriter::Floating,
            Category::String | Category::Varchar | Category::Char => ColumnWriter::Text,
            Category::Date => ColumnWriter::Date,
            Category::Timestamp => ColumnWriter::Timestamp(zone),
            Category::TimestampInstant => ColumnWriter::TimestampInstant,
            Category::Binary => ColumnWriter::Binary,
            Category::Decimal => ColumnWriter::Decimal {
                precision: schema.precision(),
                scale: schema.scale(),
                strict,
            },
            other => return Err(unsupported_for_writing(other)),
        };
        Ok(writer)
    }

    /// Encode a non-null `value` into `row` of `vector`.
    pub fn write(&self, vector: &mut ColumnVector, row: usize, value: &FieldValue) -> PxfResult<()> {
        match self {
            ColumnWriter::List { element, writer } => {
                return write_list(vector, row, value, *element, writer);
            }
            ColumnWriter::Decimal {
                precision,
                scale,
                strict,
            } => return write_decimal(vector, row, value, *precision, *scale, *strict),
            _ => {}
        }
        match (self, &mut vector.data) {
            (ColumnWriter::Boolean, VectorData::Long(v)) => {
                v[row] = match value {
                    FieldValue::Boolean(b) => *b as i64,
                    FieldValue::Text(text) => pg::parse_bool_literal(text)? as i64,
                    other => return Err(unexpected_value(other, "boolean")),
                };
            }
            (ColumnWriter::Integral, VectorData::Long(v)) => {
                v[row] = match value {
                    FieldValue::Short(n) => *n as i64,
                    FieldValue::Integer(n) => *n as i64,
                    FieldValue::Long(n) => *n,
                    FieldValue::Text(text) => text
                        .trim()
                        .parse()
                        .map_err(|_| PxfError::runtime(format!("For input string: \"{}\"", text)))?,
                    other => return Err(unexpected_value(other, "integer")),
                };
            }
            (ColumnWriter::Floating, VectorData::Double(v)) => {
                v[row] = match value {
                    FieldValue::Float(n) => *n as f64,
                    FieldValue::Double(n) => *n,
                    FieldValue::Short(n) => *n as f64,
                    FieldValue::Integer(n) => *n as f64,
                    FieldValue::Long(n) => *n as f64,
                    FieldValue::Text(text) => text
                        .trim()
                        .parse()
                        .map_err(|_| PxfError::runtime(format!("For input string: \"{}\"", text)))?,
                    other => return Err(unexpected_value(other, "floating point")),
                };
            }
            (ColumnWriter::Text, VectorData::Bytes(bytes)) => match value {
                FieldValue::Text(text) => bytes.set_val(row, text.as_bytes()),
                other => bytes.set_val(row, other.to_string().as_bytes()),
            },
            (ColumnWriter::Binary, VectorData::Bytes(bytes)) => match value {
                FieldValue::Bytes(data) => bytes.set_val(row, data),
                FieldValue::Text(text) => bytes.set_val(row, &pg::parse_bytea_literal(text)?),
                other => return Err(unexpected_value(other, "binary")),
            },
            (ColumnWriter::Date, VectorData::Long(v)) => {
                v[row] = match value {
                    FieldValue::Date(days) => *days as i64,
                    FieldValue::Text(text) => datetime::parse_date(text)? as i64,
                    other => return Err(unexpected_value(other, "date")),
                };
            }
            (ColumnWriter::Timestamp(zone), VectorData::Timestamp(ts)) => match value {
                FieldValue::Text(text) => ts.set(row, datetime::parse_timestamp(text, *zone)?),
                other => return Err(unexpected_value(other, "timestamp")),
            },
            (ColumnWriter::TimestampInstant, VectorData::Timestamp(ts)) => match value {
                FieldValue::Text(text) => ts.set(row, datetime::parse_timestamp_with_zone(text)?),
                other => return Err(unexpected_value(other, "timestamp with time zone")),
            },
            _ => return Err(lane_mismatch_writer(self)),
        }
        Ok(())
    }
}

fn write_decimal(
    vector: &mut ColumnVector,
    row: usize,
    value: &FieldValue,
    precision: u8,
    scale: u8,
    strict: bool,
) -> PxfResult<()> {
    let converted = match value {
        FieldValue::Decimal(d) => Some(*d),
        FieldValue::Text(text) => Decimal::create(text)?,
        FieldValue::Long(n) => Some(Decimal::from_i64(*n)),
        FieldValue::Integer(n) => Some(Decimal::from_i64(*n as i64)),
        FieldValue::Short(n) => Some(Decimal::from_i64(*n as i64)),
        other => return Err(unexpected_value(other, "decimal")),
    };
    match converted.and_then(|d| d.fit(precision, scale)) {
        Some(decimal) => match &mut vector.data {
            VectorData::Decimal(values) => values[row] = decimal,
            _ => {
                return Err(lane_mismatch_writer(&ColumnWriter::Decimal {
                    precision,
                    scale,
                    strict,
                }));
            }
        },
        None if strict => {
            return Err(PxfError::runtime(format!(
                "Numeric value {} exceeds ORC precision and cannot be rounded.",
                value
            )));
        }
        None => {
            // stored as NULL, the same way Hive does
            vector.set_null(row);
            warn!(
                "Ignored numeric value {} as it exceeds ORC precision and cannot be rounded.",
                value
            );
        }
    }
    Ok(())
}

fn write_list(
    vector: &mut ColumnVector,
    row: usize,
    value: &FieldValue,
    element: Category,
    writer: &ColumnWriter,
) -> PxfResult<()> {
    let literal = value.to_string();
    let data = utilities::parse_postgres_array(&literal, element)?;
    let batch_len = vector.len();
    let VectorData::List(list) = &mut vector.data else {
        return Err(lane_mismatch_writer(writer));
    };

    let offset = list.child_count;
    list.offsets[row] = offset;
    list.lengths[row] = data.len();
    list.child_count += data.len();
    if list.child_count > list.child.len() {
        // grow by the average row length seen so far
        let average = list.child_count as f64 / (row + 1) as f64;
        let new_size = ((average * batch_len as f64).ceil() as usize).max(list.child_count);
        list.child.ensure_size(new_size, true);
        debug!(
            new_size,
            child_count = list.child_count,
            row,
            batch_len,
            average,
            "increasing the list child size"
        );
    }

    let child = list.child.as_mut();
    for (i, item) in data.iter().enumerate() {
        let child_row = offset + i;
        match item {
            None => child.set_null(child_row),
            Some(item) => writer.write(child, child_row, item).map_err(|_| {
                utilities::element_error(&item.to_string(), element, &literal)
            })?,
        }
    }
    Ok(())
}

fn unsupported_for_reading(category: Category) -> PxfError {
    PxfError::UnsupportedType(format!(
        "ORC type '{}' is not supported for reading.",
        category.name()
    ))
}

fn unsupported_for_writing(category: Category) -> PxfError {
    PxfError::runtime(format!("Unsupported ORC type {}", category))
}

fn unexpected_value(value: &FieldValue, expected: &str) -> PxfError {
    PxfError::runtime(format!("Value {:?} cannot be written as {}", value, expected))
}

fn invalid_timestamp(millis: i64) -> PxfError {
    PxfError::runtime(format!("timestamp {} ms is out of range", millis))
}

fn lane_mismatch(reader: ColumnReader) -> PxfError {
    PxfError::IllegalState(format!("column vector does not match reader {:?}", reader))
}

fn lane_mismatch_writer(writer: &ColumnWriter) -> PxfError {
    PxfError::IllegalState(format!("column vector does not match writer {:?}", writer))
}
