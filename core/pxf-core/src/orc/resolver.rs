//! Vectorized resolver: column batches ↔ rows of engine fields.
//!
//! 읽기 시에는 읽기 스키마의 각 컬럼마다 [`ColumnReader`]를, 쓰기 시에는
//! 쓰기 스키마의 각 컬럼마다 [`ColumnWriter`]를 한 번만 준비해 재사용합니다.

use super::mapping::{ColumnReader, ColumnWriter};
use super::type_description::{Category, TypeDescription};
use super::vector::VectorizedRowBatch;
use crate::context::{Metadata, RequestContext};
use crate::datetime::TimeZoneMode;
use crate::error::{PxfError, PxfResult};
use crate::types::{ColumnDescriptor, OneField};
use ahash::AHashMap;
use tracing::{debug, trace};

/// Option switching column matching from names to positions.
pub const MAP_BY_POSITION_OPTION: &str = "MAP_BY_POSITION";

struct ReadPlan {
    schema: TypeDescription,
    /// Reader and output OID per read-schema column; `None` for composite types
    readers: Vec<Option<(ColumnReader, i32)>>,
    /// Read-schema position by field name, exact and lower-case
    fields: AHashMap<String, usize>,
}

impl ReadPlan {
    fn new(schema: &TypeDescription) -> PxfResult<Self> {
        let mut readers = Vec::with_capacity(schema.children().len());
        let mut fields = AHashMap::with_capacity(schema.children().len() * 2);
        for (i, (name, child)) in schema.field_names().iter().zip(schema.children()).enumerate() {
            fields.insert(name.clone(), i);
            fields.entry(name.to_lowercase()).or_insert(i);
            let category = child.category();
            if category.is_primitive() || category == Category::List {
                let (reader, data_type) = ColumnReader::for_type(child)?;
                readers.push(Some((reader, data_type.oid())));
            } else {
                readers.push(None);
            }
        }
        Ok(Self {
            schema: schema.clone(),
            readers,
            fields,
        })
    }
}

pub struct OrcVectorizedResolver {
    columns: Vec<ColumnDescriptor>,
    metadata: Option<Metadata>,
    positional: bool,
    batch_size: usize,
    zone: TimeZoneMode,
    strict_decimal: bool,
    read_plan: Option<ReadPlan>,
    writers: Option<Vec<ColumnWriter>>,
    batch: Option<VectorizedRowBatch>,
}

impl OrcVectorizedResolver {
    /// Resolver for a request whose accessor has already been opened.
    pub fn new(context: &RequestContext) -> PxfResult<Self> {
        let config = context.config();
        Ok(Self {
            columns: context.columns().to_vec(),
            metadata: context.metadata().cloned(),
            positional: context.option_bool(MAP_BY_POSITION_OPTION, false),
            batch_size: context.batch_size()?,
            zone: TimeZoneMode::from_utc_flag(config.orc_write_timezone_utc),
            strict_decimal: config.strict_decimal_overflow,
            read_plan: None,
            writers: None,
            batch: None,
        })
    }

    /// Largest number of records accepted by [`Self::set_fields_for_batch`].
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Decode a batch into `batch.size` rows, one field per tuple description column.
    pub fn fields_for_batch(&mut self, batch: &VectorizedRowBatch) -> PxfResult<Vec<Vec<OneField>>> {
        self.ensure_read_plan()?;
        let Some(plan) = self.read_plan.as_ref() else {
            return Err(no_schema());
        };

        let size = batch.size;
        let mut rows: Vec<Vec<OneField>> = (0..size)
            .map(|_| Vec::with_capacity(self.columns.len()))
            .collect();

        // position in the read schema, advanced for every resolved column
        let mut column_index = 0;
        for column in &self.columns {
            let oid = column.type_code();
            let resolved = if !column.projected {
                None
            } else if self.positional {
                plan.schema.children().get(column_index).map(|t| (column_index, t))
            } else {
                plan.fields
                    .get(&column.name)
                    .map(|i| (*i, &plan.schema.children()[*i]))
            };

            let fields = match resolved {
                None => {
                    trace!(column = %column.name, "column is not projected or not in the file");
                    vec![OneField::null(oid); size]
                }
                Some((index, orc_type)) => {
                    let Some((reader, type_oid)) = plan.readers.get(index).copied().flatten()
                    else {
                        return Err(PxfError::UnsupportedType(format!(
                            "Unable to resolve column '{}' with category '{}'. Only primitive and lists of primitive types are supported.",
                            plan.schema.field_names()[index],
                            orc_type.category()
                        )));
                    };
                    let vector = batch.cols.get(index).ok_or_else(|| {
                        PxfError::IllegalState(format!(
                            "batch has {} columns, column {} was requested",
                            batch.num_cols(),
                            index
                        ))
                    })?;
                    column_index += 1;
                    reader.read(vector, size, type_oid, self.zone)?
                }
            };

            for (row, field) in rows.iter_mut().zip(fields) {
                row.push(field);
            }
        }
        Ok(rows)
    }

    /// Encode records into the reused write batch.
    ///
    /// Returns `None` for an empty record set, which ends the write.
    pub fn set_fields_for_batch(
        &mut self,
        records: &[Vec<OneField>],
    ) -> PxfResult<Option<&VectorizedRowBatch>> {
        if records.is_empty() {
            return Ok(None);
        }
        if records.len() > self.batch_size {
            return Err(PxfError::runtime(format!(
                "Provided set of {} records is greater than the batch size of {}",
                records.len(),
                self.batch_size
            )));
        }
        self.ensure_writers()?;
        let (Some(writers), Some(Metadata::WriterOptions(options))) =
            (self.writers.as_ref(), self.metadata.as_ref())
        else {
            return Err(no_schema());
        };

        let batch = match self.batch.take() {
            Some(mut batch) => {
                batch.reset();
                batch
            }
            None => VectorizedRowBatch::for_schema(&options.schema, self.batch_size),
        };
        let batch = self.batch.insert(batch);

        for (row, record) in records.iter().enumerate() {
            if record.len() > writers.len() {
                return Err(PxfError::IllegalState(format!(
                    "record has {} fields but the write schema has {} columns",
                    record.len(),
                    writers.len()
                )));
            }
            for ((field, writer), vector) in record.iter().zip(writers).zip(batch.cols.iter_mut()) {
                match &field.val {
                    None => vector.set_null(row),
                    Some(value) => writer.write(vector, row, value)?,
                }
            }
            batch.size = row + 1;
        }
        Ok(Some(&*batch))
    }

    fn ensure_read_plan(&mut self) -> PxfResult<()> {
        if self.read_plan.is_some() {
            return Ok(());
        }
        let Some(Metadata::ReadSchema(schema)) = &self.metadata else {
            return Err(no_schema());
        };
        let plan = ReadPlan::new(schema)?;
        debug!(schema = %plan.schema, positional = self.positional, "prepared column readers");
        self.read_plan = Some(plan);
        Ok(())
    }

    fn ensure_writers(&mut self) -> PxfResult<()> {
        if self.writers.is_some() {
            return Ok(());
        }
        let Some(Metadata::WriterOptions(options)) = &self.metadata else {
            return Err(no_schema());
        };
        let zone = TimeZoneMode::from_utc_flag(options.use_utc_timestamp);
        let writers = options
            .schema
            .children()
            .iter()
            .map(|child| ColumnWriter::for_type(child, zone, self.strict_decimal))
            .collect::<PxfResult<Vec<_>>>()?;
        debug!(schema = %options.schema, "prepared column writers");
        self.writers = Some(writers);
        Ok(())
    }
}

fn no_schema() -> PxfError {
    PxfError::runtime("No ORC schema detected in request context")
}
