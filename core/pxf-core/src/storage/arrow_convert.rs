//! ORC types and batches ↔ Arrow schemas and RecordBatches.
//!
//! | ORC type | Arrow type |
//! |---|---|
//! | boolean | Boolean |
//! | tinyint / smallint / int / bigint | Int8 / Int16 / Int32 / Int64 |
//! | float / double | Float32 / Float64 |
//! | string, char(n), varchar(n) | Utf8 |
//! | binary | Binary |
//! | date | Date32 |
//! | timestamp | Timestamp(ns) |
//! | timestamp with local time zone | Timestamp(ns, "UTC") |
//! | decimal(p,s) | Utf8 (decimal text, keeps per-value scale) |
//! | array<T> | List(T) |
//!
//! 원래 ORC 타입 문자열은 필드 메타데이터 `orc.type`에 보존됩니다.

use crate::decimal::Decimal;
use crate::error::{PxfError, PxfResult};
use crate::orc::{Category, ColumnVector, TypeDescription, VectorData, VectorizedRowBatch};
use arrow::array::{
    Array, ArrayRef, AsArray, BinaryArray, BooleanArray, Date32Array, Float32Array, Float64Array,
    Int16Array, Int32Array, Int64Array, Int8Array, ListArray, StringArray,
    TimestampNanosecondArray,
};
use arrow::buffer::{NullBuffer, OffsetBuffer};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use arrow::datatypes::{
    ArrowPrimitiveType, DataType as ArrowType, Date32Type, Field, Float32Type, Float64Type,
    Int16Type, Int32Type, Int64Type, Int8Type, Schema, SchemaRef, TimeUnit,
    TimestampNanosecondType,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Field metadata key holding the ORC type string.
pub const ORC_TYPE_KEY: &str = "orc.type";

const LIST_ITEM: &str = "item";
const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MILLI: i64 = 1_000_000;

fn unsupported(orc_type: &TypeDescription) -> PxfError {
    PxfError::UnsupportedType(format!("ORC type {} cannot be stored", orc_type))
}

/// Arrow type used to store an ORC type.
pub fn to_arrow_type(orc_type: &TypeDescription) -> PxfResult<ArrowType> {
    Ok(match orc_type.category() {
        Category::Boolean => ArrowType::Boolean,
        Category::Byte => ArrowType::Int8,
        Category::Short => ArrowType::Int16,
        Category::Int => ArrowType::Int32,
        Category::Long => ArrowType::Int64,
        Category::Float => ArrowType::Float32,
        Category::Double => ArrowType::Float64,
        Category::String | Category::Char | Category::Varchar | Category::Decimal => ArrowType::Utf8,
        Category::Binary => ArrowType::Binary,
        Category::Date => ArrowType::Date32,
        Category::Timestamp => ArrowType::Timestamp(TimeUnit::Nanosecond, None),
        Category::TimestampInstant => {
            ArrowType::Timestamp(TimeUnit::Nanosecond, Some("UTC".into()))
        }
        Category::List => {
            let element = orc_type.element().ok_or_else(|| unsupported(orc_type))?;
            ArrowType::List(Arc::new(Field::new(LIST_ITEM, to_arrow_type(element)?, true)))
        }
        Category::Map | Category::Struct | Category::Union => return Err(unsupported(orc_type)),
    })
}

/// Arrow schema for a top-level ORC struct.
pub fn to_arrow_schema(schema: &TypeDescription) -> PxfResult<SchemaRef> {
    if schema.category() != Category::Struct {
        return Err(PxfError::InvalidArguments(format!(
            "top-level type must be a struct, got {}",
            schema
        )));
    }
    let fields = schema
        .field_names()
        .iter()
        .zip(schema.children())
        .map(|(name, child)| {
            let metadata = HashMap::from([(ORC_TYPE_KEY.to_string(), child.to_string())]);
            Ok(Field::new(name, to_arrow_type(child)?, true).with_metadata(metadata))
        })
        .collect::<PxfResult<Vec<_>>>()?;
    Ok(Arc::new(Schema::new(fields)))
}

/// ORC struct for an Arrow schema; `orc.type` metadata wins over inference.
pub fn from_arrow_schema(schema: &Schema) -> PxfResult<TypeDescription> {
    let mut orc = TypeDescription::create_struct();
    for field in schema.fields() {
        let child = match field.metadata().get(ORC_TYPE_KEY) {
            Some(type_string) => type_string.parse()?,
            None => from_arrow_type(field.data_type())?,
        };
        orc.add_field(field.name().clone(), child);
    }
    Ok(orc)
}

fn from_arrow_type(data_type: &ArrowType) -> PxfResult<TypeDescription> {
    let category = match data_type {
        ArrowType::Boolean => Category::Boolean,
        ArrowType::Int8 => Category::Byte,
        ArrowType::Int16 => Category::Short,
        ArrowType::Int32 => Category::Int,
        ArrowType::Int64 => Category::Long,
        ArrowType::Float32 => Category::Float,
        ArrowType::Float64 => Category::Double,
        ArrowType::Utf8 | ArrowType::LargeUtf8 => Category::String,
        ArrowType::Binary | ArrowType::LargeBinary => Category::Binary,
        ArrowType::Date32 => Category::Date,
        ArrowType::Timestamp(_, None) => Category::Timestamp,
        ArrowType::Timestamp(_, Some(_)) => Category::TimestampInstant,
        ArrowType::Decimal128(precision, scale) => {
            let scale = u8::try_from(*scale).unwrap_or(0);
            return TypeDescription::new(Category::Decimal)
                .with_scale(scale)?
                .with_precision(*precision);
        }
        ArrowType::List(item) | ArrowType::LargeList(item) => {
            return Ok(TypeDescription::create_list(from_arrow_type(item.data_type())?));
        }
        // described so the column can be listed, never decoded
        ArrowType::Struct(fields) => {
            let mut orc = TypeDescription::create_struct();
            for field in fields {
                orc.add_field(field.name().clone(), from_arrow_type(field.data_type())?);
            }
            return Ok(orc);
        }
        other => {
            return Err(PxfError::UnsupportedType(format!(
                "Arrow type {} has no ORC equivalent",
                other
            )));
        }
    };
    Ok(TypeDescription::new(category))
}

/// First `batch.size` rows of `batch` as a RecordBatch of `arrow_schema`.
pub fn batch_to_record_batch(
    batch: &VectorizedRowBatch,
    schema: &TypeDescription,
    arrow_schema: &SchemaRef,
) -> PxfResult<RecordBatch> {
    let rows: Vec<usize> = (0..batch.size).collect();
    let columns = schema
        .children()
        .iter()
        .zip(&batch.cols)
        .map(|(orc_type, vector)| vector_to_array(vector, orc_type, &rows))
        .collect::<PxfResult<Vec<_>>>()?;
    let options = RecordBatchOptions::new().with_row_count(Some(batch.size));
    Ok(RecordBatch::try_new_with_options(
        Arc::clone(arrow_schema),
        columns,
        &options,
    )?)
}

/// Values of the logical `rows` of a fixed-width lane, `None` for nulls.
fn lane<'a, T, U>(
    vector: &'a ColumnVector,
    values: &'a [T],
    rows: &'a [usize],
    convert: impl Fn(&T) -> U + 'a,
) -> impl Iterator<Item = Option<U>> + 'a {
    rows.iter()
        .map(move |&r| (!vector.is_null_at(r)).then(|| convert(&values[vector.row_index(r)])))
}

fn epoch_nanos(millis: i64, nanos: i32) -> PxfResult<i64> {
    millis
        .div_euclid(1000)
        .checked_mul(NANOS_PER_SECOND)
        .and_then(|seconds| seconds.checked_add(i64::from(nanos)))
        .ok_or_else(|| {
            PxfError::runtime(format!(
                "timestamp {} ms is outside the storable nanosecond range",
                millis
            ))
        })
}

fn vector_to_array(
    vector: &ColumnVector,
    orc_type: &TypeDescription,
    rows: &[usize],
) -> PxfResult<ArrayRef> {
    let array: ArrayRef = match (&vector.data, orc_type.category()) {
        (VectorData::Long(v), Category::Boolean) => {
            Arc::new(lane(vector, v, rows, |x| *x == 1).collect::<BooleanArray>())
        }
        (VectorData::Long(v), Category::Byte) => {
            Arc::new(lane(vector, v, rows, |x| *x as i8).collect::<Int8Array>())
        }
        (VectorData::Long(v), Category::Short) => {
            Arc::new(lane(vector, v, rows, |x| *x as i16).collect::<Int16Array>())
        }
        (VectorData::Long(v), Category::Int) => {
            Arc::new(lane(vector, v, rows, |x| *x as i32).collect::<Int32Array>())
        }
        (VectorData::Long(v), Category::Long) => {
            Arc::new(lane(vector, v, rows, |x| *x).collect::<Int64Array>())
        }
        (VectorData::Long(v), Category::Date) => {
            Arc::new(lane(vector, v, rows, |x| *x as i32).collect::<Date32Array>())
        }
        (VectorData::Double(v), Category::Float) => {
            Arc::new(lane(vector, v, rows, |x| *x as f32).collect::<Float32Array>())
        }
        (VectorData::Double(v), Category::Double) => {
            Arc::new(lane(vector, v, rows, |x| *x).collect::<Float64Array>())
        }
        (VectorData::Decimal(v), Category::Decimal) => {
            Arc::new(lane(vector, v, rows, Decimal::to_string).collect::<StringArray>())
        }
        (VectorData::Bytes(bytes), Category::Binary) => Arc::new(
            rows.iter()
                .map(|&r| (!vector.is_null_at(r)).then(|| bytes.get(vector.row_index(r))))
                .collect::<BinaryArray>(),
        ),
        (VectorData::Bytes(bytes), Category::String | Category::Char | Category::Varchar) => {
            Arc::new(
                rows.iter()
                    .map(|&r| {
                        (!vector.is_null_at(r)).then(|| {
                            String::from_utf8_lossy(bytes.get(vector.row_index(r))).into_owned()
                        })
                    })
                    .collect::<StringArray>(),
            )
        }
        (VectorData::Timestamp(ts), category) => {
            let nanos = rows
                .iter()
                .map(|&r| {
                    if vector.is_null_at(r) {
                        return Ok(None);
                    }
                    let i = vector.row_index(r);
                    epoch_nanos(ts.time[i], ts.nanos[i]).map(Some)
                })
                .collect::<PxfResult<Vec<_>>>()?;
            let array = TimestampNanosecondArray::from(nanos);
            if category == Category::TimestampInstant {
                Arc::new(array.with_timezone("UTC"))
            } else {
                Arc::new(array)
            }
        }
        (VectorData::List(list), Category::List) => {
            let element = orc_type.element().ok_or_else(|| unsupported(orc_type))?;
            let mut offsets = Vec::with_capacity(rows.len() + 1);
            let mut validity = Vec::with_capacity(rows.len());
            let mut child_rows = Vec::new();
            offsets.push(0i32);
            for &r in rows {
                let null = vector.is_null_at(r);
                if !null {
                    let i = vector.row_index(r);
                    child_rows.extend(list.offsets[i]..list.offsets[i] + list.lengths[i]);
                }
                validity.push(!null);
                offsets.push(i32::try_from(child_rows.len()).map_err(|_| {
                    PxfError::runtime("list column exceeds the maximum number of elements")
                })?);
            }
            let values = vector_to_array(&list.child, element, &child_rows)?;
            let item = Arc::new(Field::new(LIST_ITEM, values.data_type().clone(), true));
            Arc::new(ListArray::try_new(
                item,
                OffsetBuffer::new(offsets.into()),
                values,
                Some(NullBuffer::from(validity)),
            )?)
        }
        _ => return Err(unsupported(orc_type)),
    };
    Ok(array)
}

/// Copy `array` into rows `0..array.len()` of `vector`.
///
/// Decimal text is fitted to the column's precision and scale; a value that
/// cannot be represented becomes null, or an error when `strict`.
pub fn array_to_vector(
    array: &dyn Array,
    orc_type: &TypeDescription,
    vector: &mut ColumnVector,
    strict: bool,
) -> PxfResult<()> {
    let len = array.len();
    vector.ensure_size(len, false);
    vector.is_repeating = false;
    vector.no_nulls = true;
    vector.is_null[..len].fill(false);
    for row in (0..len).filter(|r| array.is_null(*r)) {
        vector.set_null(row);
    }

    let mismatch = || {
        PxfError::IllegalState(format!(
            "column of type {} cannot hold Arrow data of type {}",
            orc_type,
            array.data_type()
        ))
    };

    // rows whose value could not be stored
    let mut dropped = Vec::new();
    match (&mut vector.data, orc_type.category()) {
        (VectorData::Long(v), Category::Boolean) => {
            let values = array.as_boolean_opt().ok_or_else(mismatch)?;
            for (row, slot) in v.iter_mut().enumerate().take(len) {
                *slot = i64::from(values.value(row));
            }
        }
        (VectorData::Long(v), Category::Byte) => {
            copy_primitive::<Int8Type, _>(array, v, i64::from).ok_or_else(mismatch)?
        }
        (VectorData::Long(v), Category::Short) => {
            copy_primitive::<Int16Type, _>(array, v, i64::from).ok_or_else(mismatch)?
        }
        (VectorData::Long(v), Category::Int) => {
            copy_primitive::<Int32Type, _>(array, v, i64::from).ok_or_else(mismatch)?
        }
        (VectorData::Long(v), Category::Long) => {
            copy_primitive::<Int64Type, _>(array, v, |x| x).ok_or_else(mismatch)?
        }
        (VectorData::Long(v), Category::Date) => {
            copy_primitive::<Date32Type, _>(array, v, i64::from).ok_or_else(mismatch)?
        }
        (VectorData::Double(v), Category::Float) => {
            copy_primitive::<Float32Type, _>(array, v, f64::from).ok_or_else(mismatch)?
        }
        (VectorData::Double(v), Category::Double) => {
            copy_primitive::<Float64Type, _>(array, v, |x| x).ok_or_else(mismatch)?
        }
        (VectorData::Decimal(v), Category::Decimal) => {
            let values = array.as_string_opt::<i32>().ok_or_else(mismatch)?;
            let (precision, scale) = (orc_type.precision(), orc_type.scale());
            for row in (0..len).filter(|r| array.is_valid(*r)) {
                let text = values.value(row);
                match Decimal::create(text)?.and_then(|d| d.fit(precision, scale)) {
                    Some(decimal) => v[row] = decimal,
                    None if strict => {
                        return Err(PxfError::runtime(format!(
                            "Numeric value {} exceeds ORC precision and cannot be rounded.",
                            text
                        )));
                    }
                    None => {
                        warn!(
                            "Ignored numeric value {} as it exceeds ORC precision and cannot be rounded.",
                            text
                        );
                        dropped.push(row);
                    }
                }
            }
        }
        (VectorData::Bytes(bytes), Category::Binary) => {
            let values = array.as_binary_opt::<i32>().ok_or_else(mismatch)?;
            for row in (0..len).filter(|r| array.is_valid(*r)) {
                bytes.set_val(row, values.value(row));
            }
        }
        (VectorData::Bytes(bytes), Category::String | Category::Char | Category::Varchar) => {
            let values = array.as_string_opt::<i32>().ok_or_else(mismatch)?;
            for row in (0..len).filter(|r| array.is_valid(*r)) {
                bytes.set_val(row, values.value(row).as_bytes());
            }
        }
        (VectorData::Timestamp(ts), Category::Timestamp | Category::TimestampInstant) => {
            let values = array
                .as_primitive_opt::<TimestampNanosecondType>()
                .ok_or_else(mismatch)?;
            for row in 0..len {
                let nanos = values.value(row);
                let fraction = nanos.rem_euclid(NANOS_PER_SECOND);
                ts.time[row] =
                    nanos.div_euclid(NANOS_PER_SECOND) * 1000 + fraction / NANOS_PER_MILLI;
                ts.nanos[row] = fraction as i32;
            }
        }
        (VectorData::List(list), Category::List) => {
            let element = orc_type.element().ok_or_else(|| unsupported(orc_type))?;
            let values = array.as_list_opt::<i32>().ok_or_else(mismatch)?;
            let offsets = values.value_offsets();
            let base = offsets.first().copied().unwrap_or(0);
            for row in 0..len {
                list.offsets[row] = (offsets[row] - base) as usize;
                list.lengths[row] = (offsets[row + 1] - offsets[row]) as usize;
            }
            let total = (offsets[len] - base) as usize;
            let children = values.values().slice(base as usize, total);
            list.child.reset();
            array_to_vector(children.as_ref(), element, &mut list.child, strict)?;
            list.child_count = total;
        }
        _ => return Err(mismatch()),
    }

    for row in dropped {
        vector.set_null(row);
    }
    Ok(())
}

fn copy_primitive<T, V>(
    array: &dyn Array,
    out: &mut [V],
    convert: impl Fn(T::Native) -> V,
) -> Option<()>
where
    T: ArrowPrimitiveType,
{
    let values = array.as_primitive_opt::<T>()?;
    for (slot, value) in out.iter_mut().zip(values.values().iter()) {
        *slot = convert(*value);
    }
    Some(())
}
