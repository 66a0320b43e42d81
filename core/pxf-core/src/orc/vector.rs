//! Column vectors: 배치 단위 컬럼 버퍼
//!
//! 각 벡터는 null 배열과 `is_repeating` 플래그를 가지며, 값은 하나의 lane에 저장됩니다.
//!
//! | ORC category | lane |
//! |---|---|
//! | boolean, tinyint, smallint, int, bigint, date | `Long` |
//! | float, double | `Double` |
//! | decimal | `Decimal` |
//! | string, char, varchar, binary | `Bytes` |
//! | timestamp, timestamp with local time zone | `Timestamp` |
//! | array | `List` |
//! | map, struct, uniontype | `Struct` |

use super::type_description::{Category, TypeDescription};
use crate::datetime;
use crate::decimal::Decimal;
use chrono::{DateTime, Utc};

/// Rows per batch unless configured otherwise.
pub const DEFAULT_SIZE: usize = 1024;

/// Byte-range lane: every row points into one shared buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BytesVector {
    pub buffer: Vec<u8>,
    pub start: Vec<usize>,
    pub length: Vec<usize>,
}

impl BytesVector {
    fn with_len(len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            start: vec![0; len],
            length: vec![0; len],
        }
    }

    /// Copy `value` into the shared buffer and point `row` at it.
    pub fn set_val(&mut self, row: usize, value: &[u8]) {
        self.start[row] = self.buffer.len();
        self.length[row] = value.len();
        self.buffer.extend_from_slice(value);
    }

    pub fn get(&self, row: usize) -> &[u8] {
        let start = self.start[row];
        self.buffer
            .get(start..start + self.length[row])
            .unwrap_or_default()
    }
}

/// Timestamp lane: epoch milliseconds plus nanos-of-second.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimestampVector {
    pub time: Vec<i64>,
    pub nanos: Vec<i32>,
}

impl TimestampVector {
    pub fn set(&mut self, row: usize, instant: DateTime<Utc>) {
        let (millis, nanos) = datetime::parts_from_instant(instant);
        self.time[row] = millis;
        self.nanos[row] = nanos;
    }

    pub fn get(&self, row: usize) -> Option<DateTime<Utc>> {
        datetime::instant_from_parts(self.time[row], self.nanos[row])
    }
}

/// List lane: per-row (offset, length) into a child vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ListVector {
    pub offsets: Vec<usize>,
    pub lengths: Vec<usize>,
    /// Child slots in use.
    pub child_count: usize,
    pub child: Box<ColumnVector>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VectorData {
    Long(Vec<i64>),
    Double(Vec<f64>),
    Decimal(Vec<Decimal>),
    Bytes(BytesVector),
    Timestamp(TimestampVector),
    List(ListVector),
    Struct(Vec<ColumnVector>),
}

/// One column of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnVector {
    pub no_nulls: bool,
    pub is_repeating: bool,
    pub is_null: Vec<bool>,
    pub data: VectorData,
}

impl ColumnVector {
    /// Allocate a vector of `len` rows for an ORC type.
    pub fn for_type(schema: &TypeDescription, len: usize) -> Self {
        let data = match schema.category() {
            Category::Boolean
            | Category::Byte
            | Category::Short
            | Category::Int
            | Category::Long
            | Category::Date => VectorData::Long(vec![0; len]),
            Category::Float | Category::Double => VectorData::Double(vec![0.0; len]),
            Category::Decimal => VectorData::Decimal(vec![Decimal::ZERO; len]),
            Category::String | Category::Char | Category::Varchar | Category::Binary => {
                VectorData::Bytes(BytesVector::with_len(len))
            }
            Category::Timestamp | Category::TimestampInstant => {
                VectorData::Timestamp(TimestampVector {
                    time: vec![0; len],
                    nanos: vec![0; len],
                })
            }
            Category::List => {
                let child = match schema.element() {
                    Some(element) => ColumnVector::for_type(element, len),
                    None => ColumnVector::for_type(&TypeDescription::new(Category::String), len),
                };
                VectorData::List(ListVector {
                    offsets: vec![0; len],
                    lengths: vec![0; len],
                    child_count: 0,
                    child: Box::new(child),
                })
            }
            Category::Map | Category::Struct | Category::Union => VectorData::Struct(
                schema
                    .children()
                    .iter()
                    .map(|child| ColumnVector::for_type(child, len))
                    .collect(),
            ),
        };
        Self {
            no_nulls: true,
            is_repeating: false,
            is_null: vec![false; len],
            data,
        }
    }

    /// Allocated rows.
    pub fn len(&self) -> usize {
        self.is_null.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_null.is_empty()
    }

    /// Physical row holding the value of logical row `row`.
    pub fn row_index(&self, row: usize) -> usize {
        if self.is_repeating { 0 } else { row }
    }

    /// Null state of logical row `row`.
    pub fn is_null_at(&self, row: usize) -> bool {
        !self.no_nulls && self.is_null[self.row_index(row)]
    }

    pub fn set_null(&mut self, row: usize) {
        self.no_nulls = false;
        self.is_null[row] = true;
    }

    /// Back to an empty, null-free state; allocation is kept.
    pub fn reset(&mut self) {
        self.no_nulls = true;
        self.is_repeating = false;
        self.is_null.fill(false);
        match &mut self.data {
            VectorData::Bytes(bytes) => bytes.buffer.clear(),
            VectorData::List(list) => {
                list.child_count = 0;
                list.child.reset();
            }
            VectorData::Struct(fields) => fields.iter_mut().for_each(ColumnVector::reset),
            _ => {}
        }
    }

    /// Grow to at least `size` rows. With `preserve`, existing values are kept.
    pub fn ensure_size(&mut self, size: usize, preserve: bool) {
        if size <= self.len() {
            return;
        }
        if !preserve {
            self.is_null.clear();
        }
        let repeated_null = self.is_repeating && self.is_null.first().copied().unwrap_or(false);
        self.is_null.resize(size, repeated_null);
        match &mut self.data {
            VectorData::Long(values) => resize(values, size, preserve),
            VectorData::Double(values) => resize(values, size, preserve),
            VectorData::Decimal(values) => resize(values, size, preserve),
            VectorData::Bytes(bytes) => {
                resize(&mut bytes.start, size, preserve);
                resize(&mut bytes.length, size, preserve);
                if !preserve {
                    bytes.buffer.clear();
                }
            }
            VectorData::Timestamp(ts) => {
                resize(&mut ts.time, size, preserve);
                resize(&mut ts.nanos, size, preserve);
            }
            VectorData::List(list) => {
                resize(&mut list.offsets, size, preserve);
                resize(&mut list.lengths, size, preserve);
            }
            VectorData::Struct(fields) => {
                for field in fields {
                    field.ensure_size(size, preserve);
                }
            }
        }
    }

    /// Materialize a repeating vector into `size` explicit rows.
    pub fn flatten_repeating(&mut self, size: usize) {
        if !self.is_repeating {
            return;
        }
        self.is_repeating = false;
        let size = size.min(self.len());
        if size == 0 {
            return;
        }
        let null = self.is_null[0];
        self.is_null[..size].fill(null);
        match &mut self.data {
            VectorData::Long(values) => fill_from_first(values, size),
            VectorData::Double(values) => fill_from_first(values, size),
            VectorData::Decimal(values) => fill_from_first(values, size),
            VectorData::Bytes(bytes) => {
                fill_from_first(&mut bytes.start, size);
                fill_from_first(&mut bytes.length, size);
            }
            VectorData::Timestamp(ts) => {
                fill_from_first(&mut ts.time, size);
                fill_from_first(&mut ts.nanos, size);
            }
            VectorData::List(list) => {
                fill_from_first(&mut list.offsets, size);
                fill_from_first(&mut list.lengths, size);
            }
            VectorData::Struct(fields) => {
                for field in fields {
                    field.is_repeating = true;
                    field.flatten_repeating(size);
                }
            }
        }
    }
}

fn resize<T: Clone + Default>(values: &mut Vec<T>, size: usize, preserve: bool) {
    if !preserve {
        values.clear();
    }
    values.resize(size, T::default());
}

fn fill_from_first<T: Clone>(values: &mut [T], size: usize) {
    if let Some(first) = values.first().cloned() {
        values[..size].fill(first);
    }
}

/// A batch of column vectors, one per field of the batch schema.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorizedRowBatch {
    /// Logical rows in use.
    pub size: usize,
    pub cols: Vec<ColumnVector>,
    max_size: usize,
}

impl VectorizedRowBatch {
    /// Allocate one vector per struct field of `schema`.
    pub fn for_schema(schema: &TypeDescription, max_size: usize) -> Self {
        let cols = match schema.category() {
            Category::Struct => schema
                .children()
                .iter()
                .map(|child| ColumnVector::for_type(child, max_size))
                .collect(),
            _ => vec![ColumnVector::for_type(schema, max_size)],
        };
        Self {
            size: 0,
            cols,
            max_size,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn num_cols(&self) -> usize {
        self.cols.len()
    }

    pub fn reset(&mut self) {
        self.size = 0;
        self.cols.iter_mut().for_each(ColumnVector::reset);
    }
}
