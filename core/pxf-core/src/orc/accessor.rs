//! Vectorized accessor: opens a file and moves whole batches in and out of it.
//!
//! 읽기 시에는 요청 컬럼으로 projection된 읽기 스키마와 search argument를 만들고,
//! 쓰기 시에는 tuple description으로 쓰기 스키마를 만들어 context metadata로
//! resolver에 넘깁니다.

use super::resolver::MAP_BY_POSITION_OPTION;
use super::schema_builder::OrcSchemaBuilder;
use super::type_description::TypeDescription;
use super::vector::VectorizedRowBatch;
use crate::context::{Metadata, RequestContext, WriterOptions};
use crate::datetime::TimeZoneMode;
use crate::error::{PxfError, PxfResult};
use crate::filter::{
    parse, traverse, traverse_all, BpCharOperatorTransformer, Operator, OperatorSet,
    SupportedOperatorPruner,
};
use crate::sarg::{SearchArgument, SearchArgumentVisitor};
use crate::storage::{CompressionKind, ParquetReader, ParquetWriter, ReadOptions, RecordReader, WriteOptions};
use crate::types::ColumnDescriptor;
use ahash::AHashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Operators a search argument can express.
pub const SUPPORTED_OPERATORS: OperatorSet = OperatorSet::of(&[
    Operator::Noop,
    Operator::LessThan,
    Operator::GreaterThan,
    Operator::LessThanOrEqual,
    Operator::GreaterThanOrEqual,
    Operator::Equals,
    Operator::NotEquals,
    Operator::IsNull,
    Operator::IsNotNull,
    Operator::In,
    Operator::And,
    Operator::Or,
    Operator::Not,
]);

/// User option naming the write codec.
pub const COMPRESSION_CODEC_OPTION: &str = "COMPRESSION_CODEC";

const FILE_SUFFIX: &str = ".parquet";

#[derive(Default)]
pub struct OrcVectorizedAccessor {
    positional: bool,
    batch_index: usize,
    total_rows_read: usize,
    read_time: Duration,
    records: Option<RecordReader>,
    batch: Option<VectorizedRowBatch>,
    writer: Option<ParquetWriter>,
    file_name: Option<PathBuf>,
}

impl OrcVectorizedAccessor {
    pub fn new(context: &RequestContext) -> Self {
        Self {
            positional: context.option_bool(MAP_BY_POSITION_OPTION, false),
            ..Self::default()
        }
    }

    /// Open the data source file with projection and predicate pushdown.
    ///
    /// Stores the read schema in the context for the resolver.
    pub fn open_for_read(&mut self, context: &mut RequestContext) -> PxfResult<bool> {
        let reader = ParquetReader::open(Path::new(context.data_source()))?;
        let file_schema = reader.schema();
        let (read_schema, file_columns) =
            build_read_schema(file_schema, context.columns(), self.positional);
        let search_argument = self.search_argument(context, file_schema)?;
        if let Some(sarg) = &search_argument {
            debug!("Search argument: {}", sarg);
        }

        let batch_size = context.batch_size()?;
        let start = Instant::now();
        let records = reader.rows(ReadOptions {
            schema: read_schema.clone(),
            columns: file_columns,
            search_argument,
            batch_size,
            strict_decimal: context.config().strict_decimal_overflow,
        })?;
        self.read_time += start.elapsed();

        self.batch = Some(VectorizedRowBatch::for_schema(&read_schema, batch_size));
        self.records = Some(records);
        context.set_metadata(Metadata::ReadSchema(read_schema));
        Ok(true)
    }

    /// Next batch of the file, `None` once all batches are exhausted.
    ///
    /// The batch is refilled by the next call.
    pub fn read_next_batch(&mut self) -> PxfResult<Option<&VectorizedRowBatch>> {
        let (Some(records), Some(batch)) = (self.records.as_mut(), self.batch.as_mut()) else {
            return Err(PxfError::IllegalState(
                "accessor is not open for read".to_string(),
            ));
        };
        let start = Instant::now();
        let has_next = records.next_batch(batch)?;
        self.read_time += start.elapsed();
        if !has_next {
            return Ok(None);
        }
        self.total_rows_read += batch.size;
        self.batch_index += 1;
        Ok(Some(&*batch))
    }

    /// Index of the last batch returned, starting at 1.
    pub fn batch_index(&self) -> usize {
        self.batch_index
    }

    pub fn close_for_read(&mut self) -> PxfResult<()> {
        info!(
            "Read {} rows in {} batches, {} ms reading",
            self.total_rows_read,
            self.batch_index,
            self.read_time.as_millis()
        );
        self.records = None;
        self.batch = None;
        Ok(())
    }

    /// Create the output file under the data source directory.
    ///
    /// Stores the writer options in the context for the resolver.
    pub fn open_for_write(&mut self, context: &mut RequestContext) -> PxfResult<bool> {
        let schema = OrcSchemaBuilder::build_schema(context.columns())?;
        let compression = match context.option(COMPRESSION_CODEC_OPTION) {
            Some(codec) => codec.parse::<CompressionKind>()?,
            None => CompressionKind::default(),
        };
        debug!("Using compression: {}", compression);
        let use_utc_timestamp = context.config().orc_write_timezone_utc;
        debug!("Using UTC for writer timezone: {}", use_utc_timestamp);

        let file_name = Path::new(context.data_source())
            .join(format!("part-{:05}{}", context.fragment_index(), FILE_SUFFIX));
        let options = WriteOptions {
            compression,
            max_row_group_size: None,
        };
        self.writer = Some(ParquetWriter::create(&file_name, &schema, &options)?);
        self.file_name = Some(file_name);

        context.set_metadata(Metadata::WriterOptions(WriterOptions {
            schema,
            compression,
            use_utc_timestamp,
        }));
        Ok(true)
    }

    /// Path of the file being written.
    pub fn file_name(&self) -> Option<&Path> {
        self.file_name.as_deref()
    }

    /// Append a batch produced by the resolver; the batch is not reset here.
    pub fn write_next_batch(&mut self, batch: &VectorizedRowBatch) -> PxfResult<bool> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(PxfError::IllegalState(
                "accessor is not open for write".to_string(),
            ));
        };
        debug!("Adding VectorizedRowBatch with {} rows", batch.size);
        writer.write_batch(batch)?;
        Ok(true)
    }

    /// Finish the file; returns the number of rows written.
    pub fn close_for_write(&mut self) -> PxfResult<usize> {
        let Some(writer) = self.writer.take() else {
            return Ok(0);
        };
        let rows = writer.close()?;
        if let Some(file_name) = &self.file_name {
            info!("Wrote {} rows to {}", rows, file_name.display());
        }
        Ok(rows)
    }

    /// Search argument for the request filter; `None` without a filter or
    /// when nothing in it can be pushed down.
    fn search_argument(
        &self,
        context: &RequestContext,
        file_schema: &TypeDescription,
    ) -> PxfResult<Option<SearchArgument>> {
        if !context.has_filter() {
            return Ok(None);
        }
        let columns = file_named_columns(file_schema, context.columns(), self.positional);
        let zone = TimeZoneMode::from_utc_flag(context.config().orc_write_timezone_utc);
        build_search_argument(context.filter(), &columns, SUPPORTED_OPERATORS, zone)
    }
}

/// Read schema of the projected columns plus the file field index of each.
///
/// By position, the i-th column reads the i-th file field under the file's
/// name; by name, a column matches a field exactly or by lower-case name and
/// keeps its own name. Unmatched columns are left out.
pub(crate) fn build_read_schema(
    file_schema: &TypeDescription,
    columns: &[ColumnDescriptor],
    positional: bool,
) -> (TypeDescription, Vec<usize>) {
    let mut read_schema = TypeDescription::create_struct();
    let mut file_columns = Vec::new();
    let names = file_schema.field_names();
    let types = file_schema.children();

    if positional {
        for (i, column) in columns.iter().enumerate().take(names.len()) {
            if !column.projected {
                continue;
            }
            read_schema.add_field(names[i].clone(), types[i].clone());
            file_columns.push(i);
        }
    } else {
        let fields = field_index(file_schema);
        for column in columns.iter().filter(|c| c.projected) {
            if let Some(&i) = fields.get(column.name.as_str()) {
                read_schema.add_field(column.name.clone(), types[i].clone());
                file_columns.push(i);
            }
        }
    }
    (read_schema, file_columns)
}

/// Field position by name, exact and lower-cased; exact names win.
fn field_index(schema: &TypeDescription) -> AHashMap<String, usize> {
    let names = schema.field_names();
    let mut fields = AHashMap::with_capacity(names.len() * 2);
    for (i, name) in names.iter().enumerate() {
        fields.insert(name.clone(), i);
    }
    for (i, name) in names.iter().enumerate() {
        fields.entry(name.to_lowercase()).or_insert(i);
    }
    fields
}

/// Columns renamed to the file fields they read, so predicates name stored columns.
pub(crate) fn file_named_columns(
    file_schema: &TypeDescription,
    columns: &[ColumnDescriptor],
    positional: bool,
) -> Vec<ColumnDescriptor> {
    let names = file_schema.field_names();
    if positional {
        return columns
            .iter()
            .zip(names)
            .map(|(column, name)| ColumnDescriptor {
                name: name.clone(),
                ..column.clone()
            })
            .collect();
    }
    let fields = field_index(file_schema);
    columns
        .iter()
        .map(|column| match fields.get(column.name.as_str()) {
            Some(&i) => ColumnDescriptor {
                name: names[i].clone(),
                ..column.clone()
            },
            None => column.clone(),
        })
        .collect()
}

/// Parse `filter`, drop what `supported` cannot express, expand `char(n)`
/// comparisons and translate the rest.
pub(crate) fn build_search_argument(
    filter: Option<&str>,
    columns: &[ColumnDescriptor],
    supported: OperatorSet,
    zone: TimeZoneMode,
) -> PxfResult<Option<SearchArgument>> {
    let root = parse(filter)?;
    let Some(pruned) = traverse(Some(root), &mut SupportedOperatorPruner::new(supported))? else {
        debug!("no part of the filter can be pushed down");
        return Ok(None);
    };
    let mut bpchar = BpCharOperatorTransformer::new(columns);
    let mut visitor = SearchArgumentVisitor::new(columns).with_time_zone(zone);
    traverse_all(Some(pruned), &mut [&mut bpchar, &mut visitor])?;
    visitor.build().map(Some)
}
