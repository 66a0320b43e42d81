//! Hive accessor: partition elimination, projection and predicate pushdown
//! for one fragment of a Hive table.
//!
//! 프래그먼트 속성에서 파티션 키/타입/값과 Hive 컬럼 순서를 읽고, 필터가 이
//! 파티션을 배제하면 읽기를 건너뜁니다.

use super::{
    COLUMNS_PROPERTY, COLUMN_NAME_DELIMITER_PROPERTY, HIVE_DEFAULT_PARTITION, HIVE_PARTITIONS_DELIM,
    PARTITION_COLUMNS_PROPERTY, PARTITION_COLUMN_TYPES_PROPERTY, PARTITION_COLUMN_VALUES_PROPERTY,
};
use crate::context::{Metadata, RequestContext};
use crate::datetime::{self, TimeZoneMode};
use crate::decimal::Decimal;
use crate::error::{PxfError, PxfResult};
use crate::filter::{
    parse, traverse_all, Node, Operator, OperatorSet, SupportedDataTypePruner, SupportedOperatorPruner,
    ValueOperand,
};
use crate::orc::{TypeDescription, VectorizedRowBatch};
use crate::sarg::{SearchArgument, SearchArgumentVisitor};
use crate::storage::{ParquetReader, ReadOptions, RecordReader};
use crate::types::{ColumnDescriptor, DataType};
use ahash::AHashMap;
use std::path::Path;
use tracing::{debug, info};

const UNSUPPORTED_WRITE: &str = "Hive accessor does not support write operation.";

/// Which operators and column types a file format can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushdownProfile {
    #[default]
    Parquet,
    Orc,
}

impl PushdownProfile {
    pub fn operators(&self) -> OperatorSet {
        match self {
            PushdownProfile::Parquet => OperatorSet::of(&[
                Operator::Noop,
                Operator::LessThan,
                Operator::GreaterThan,
                Operator::LessThanOrEqual,
                Operator::GreaterThanOrEqual,
                Operator::Equals,
                Operator::NotEquals,
                Operator::In,
                Operator::Or,
                Operator::And,
                Operator::Not,
            ]),
            PushdownProfile::Orc => OperatorSet::of(&[
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
                Operator::Or,
                Operator::And,
                Operator::Not,
            ]),
        }
    }

    pub fn data_types(&self) -> &'static [DataType] {
        match self {
            PushdownProfile::Parquet => &[
                DataType::Bigint,
                DataType::Integer,
                DataType::Smallint,
                DataType::Real,
                DataType::Float8,
                DataType::Text,
                DataType::Varchar,
                DataType::Bpchar,
                DataType::Boolean,
                DataType::Time,
                DataType::Bytea,
            ],
            PushdownProfile::Orc => &[
                DataType::Bigint,
                DataType::Integer,
                DataType::Smallint,
                DataType::Real,
                DataType::Numeric,
                DataType::Float8,
                DataType::Text,
                DataType::Varchar,
                DataType::Bpchar,
                DataType::Boolean,
                DataType::Date,
                DataType::Timestamp,
                DataType::Time,
                DataType::Bytea,
            ],
        }
    }
}

/// Partition key of the fragment being read, with its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HivePartition {
    pub name: String,
    pub type_name: String,
    pub value: String,
}

pub struct HiveAccessor {
    profile: PushdownProfile,
    predicate_pushdown: bool,
    partitions: Vec<HivePartition>,
    /// Position in the Hive schema of each tuple description column
    hive_indexes: Vec<Option<usize>>,
    search_argument: Option<SearchArgument>,
    records: Option<RecordReader>,
    batch: Option<VectorizedRowBatch>,
    batches_read: usize,
}

impl HiveAccessor {
    pub fn new(context: &RequestContext) -> PxfResult<Self> {
        let predicate_pushdown = context.config().hive_predicate_pushdown;
        if predicate_pushdown {
            debug!("Predicate pushdown for Hive is enabled");
        } else {
            debug!("Predicate pushdown for Hive has been disabled in configuration");
        }
        Ok(Self {
            profile: PushdownProfile::default(),
            predicate_pushdown,
            partitions: partition_fields(context)?,
            hive_indexes: hive_indexes(context)?,
            search_argument: None,
            records: None,
            batch: None,
            batches_read: 0,
        })
    }

    pub fn with_profile(mut self, profile: PushdownProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn partitions(&self) -> &[HivePartition] {
        &self.partitions
    }

    pub fn hive_indexes(&self) -> &[Option<usize>] {
        &self.hive_indexes
    }

    /// Search argument pushed to the reader by the last open.
    pub fn search_argument(&self) -> Option<&SearchArgument> {
        self.search_argument.as_ref()
    }

    /// Open the fragment file unless the filter excludes this partition.
    ///
    /// Returns `false` when the partition holds no matching rows; nothing is
    /// opened then.
    pub fn open_for_read(&mut self, context: &mut RequestContext) -> PxfResult<bool> {
        if !self.is_partition_selected(context)? {
            debug!(data_source = context.data_source(), "partition filtered out");
            return Ok(false);
        }

        let reader = ParquetReader::open(Path::new(context.data_source()))?;
        let (read_schema, file_columns) = self.projection(reader.schema(), context.columns());
        self.search_argument = self.pushdown_filter(context, reader.schema())?;
        if let Some(sarg) = &self.search_argument {
            debug!("Added SARG={}", sarg.to_base64()?);
        }

        let batch_size = context.batch_size()?;
        let records = reader.rows(ReadOptions {
            schema: read_schema.clone(),
            columns: file_columns,
            search_argument: self.search_argument.clone(),
            batch_size,
            strict_decimal: context.config().strict_decimal_overflow,
        })?;
        self.batch = Some(VectorizedRowBatch::for_schema(&read_schema, batch_size));
        self.records = Some(records);
        context.set_metadata(Metadata::ReadSchema(read_schema));
        Ok(true)
    }

    pub fn read_next_batch(&mut self) -> PxfResult<Option<&VectorizedRowBatch>> {
        let (Some(records), Some(batch)) = (self.records.as_mut(), self.batch.as_mut()) else {
            return Err(PxfError::IllegalState(
                "accessor is not open for read".to_string(),
            ));
        };
        if !records.next_batch(batch)? {
            return Ok(None);
        }
        self.batches_read += 1;
        Ok(Some(&*batch))
    }

    pub fn close_for_read(&mut self) -> PxfResult<()> {
        if let Some(records) = &self.records {
            info!("Read {} rows in {} batches", records.rows_read(), self.batches_read);
        }
        self.records = None;
        self.batch = None;
        Ok(())
    }

    pub fn open_for_write(&mut self, _context: &mut RequestContext) -> PxfResult<bool> {
        Err(PxfError::UnsupportedOperation(UNSUPPORTED_WRITE.to_string()))
    }

    pub fn write_next_batch(&mut self, _batch: &VectorizedRowBatch) -> PxfResult<bool> {
        Err(PxfError::UnsupportedOperation(UNSUPPORTED_WRITE.to_string()))
    }

    pub fn close_for_write(&mut self) -> PxfResult<()> {
        Err(PxfError::UnsupportedOperation(UNSUPPORTED_WRITE.to_string()))
    }

    /// Whether rows of this fragment's partition may satisfy the filter.
    ///
    /// Only filters made of `AND`s are checked; any `OR` or `NOT` keeps the
    /// partition.
    pub fn is_partition_selected(&self, context: &RequestContext) -> PxfResult<bool> {
        if !context.has_filter() {
            return Ok(true);
        }
        let root = parse(context.filter())?;
        if !only_conjunctions(&root) {
            return Ok(true);
        }
        let selected = self.partition_equality(context, &root)?;
        debug!(
            data_source = context.data_source(),
            filter = ?context.filter(),
            selected,
            "partition check"
        );
        Ok(selected)
    }

    fn partition_equality(&self, context: &RequestContext, node: &Node) -> PxfResult<bool> {
        let Node::Operator(op) = node else {
            return Ok(true);
        };
        if op.operator.is_logical() {
            let mut allowed = true;
            if let Some(left) = &op.left {
                allowed = self.partition_equality(context, left)?;
            }
            if let Some(right) = &op.right {
                allowed = allowed && self.partition_equality(context, right)?;
            }
            return Ok(allowed);
        }
        // range comparisons are left to the reader
        if op.operator != Operator::Equals {
            return Ok(true);
        }

        let Some(ValueOperand::Scalar(scalar)) = op.value_operand() else {
            return Err(PxfError::InvalidArguments(format!(
                "OperatorNode {} does not contain a scalar operand",
                op.operator
            )));
        };
        let Some(index) = op.column_index() else {
            return Ok(true);
        };
        let column = context.column(index)?;
        match self.partitions.iter().find(|p| p.name == column.name) {
            Some(partition) => {
                let mut keep = scalar.value == partition.value;
                if !keep && partition.value != HIVE_DEFAULT_PARTITION {
                    keep = typed_equals(&scalar.value, partition)?;
                }
                Ok(keep)
            }
            // not a partition column, the file may have matching rows
            None => Ok(true),
        }
    }

    /// Read schema over the projected columns found in the Hive schema, and
    /// the file field index of each.
    fn projection(
        &self,
        file_schema: &TypeDescription,
        columns: &[ColumnDescriptor],
    ) -> (TypeDescription, Vec<usize>) {
        let mut read_schema = TypeDescription::create_struct();
        let mut file_columns = Vec::new();
        for (column, hive_index) in columns.iter().zip(&self.hive_indexes) {
            let Some(index) = hive_index.filter(|_| column.projected) else {
                continue;
            };
            match file_schema.children().get(index) {
                Some(field_type) => {
                    read_schema.add_field(column.name.clone(), field_type.clone());
                    file_columns.push(index);
                }
                None => debug!(column = %column.name, index, "column is not in the file"),
            }
        }
        (read_schema, file_columns)
    }

    /// Search argument for the filter, pruned to the supported data types
    /// and operators of the profile.
    fn pushdown_filter(
        &self,
        context: &RequestContext,
        file_schema: &TypeDescription,
    ) -> PxfResult<Option<SearchArgument>> {
        if !self.predicate_pushdown || !context.has_filter() {
            return Ok(None);
        }
        // predicates name the stored fields
        let names = file_schema.field_names();
        let columns: Vec<ColumnDescriptor> = context
            .columns()
            .iter()
            .zip(&self.hive_indexes)
            .map(|(column, index)| match index.and_then(|i| names.get(i)) {
                Some(name) => ColumnDescriptor {
                    name: name.clone(),
                    ..column.clone()
                },
                None => column.clone(),
            })
            .collect();

        let root = parse(context.filter())?;
        let mut types = SupportedDataTypePruner::new(&columns, self.profile.data_types().iter().copied());
        let mut operators = SupportedOperatorPruner::new(self.profile.operators());
        let mut visitor = SearchArgumentVisitor::new(&columns)
            .with_time_zone(TimeZoneMode::from_utc_flag(context.config().orc_write_timezone_utc));
        let pruned = traverse_all(Some(root), &mut [&mut types, &mut operators])?;
        if pruned.is_none() {
            return Ok(None);
        }
        traverse_all(pruned, &mut [&mut visitor])?;
        visitor.build().map(Some)
    }
}

/// True when every logical operator of the tree is an `AND`.
fn only_conjunctions(node: &Node) -> bool {
    let Node::Operator(op) = node else {
        return true;
    };
    if !op.operator.is_logical() {
        return true;
    }
    if op.operator != Operator::And {
        return false;
    }
    [op.left.as_deref(), op.right.as_deref()]
        .into_iter()
        .flatten()
        .all(only_conjunctions)
}

/// Compare a filter value to a partition value as the partition key's type.
fn typed_equals(filter_value: &str, partition: &HivePartition) -> PxfResult<bool> {
    fn number<T: std::str::FromStr>(text: &str) -> PxfResult<T> {
        text.trim()
            .parse()
            .map_err(|_| PxfError::runtime(format!("For input string: \"{}\"", text)))
    }

    let value = partition.value.as_str();
    let base_type = partition
        .type_name
        .split('(')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let equal = match base_type.as_str() {
        "boolean" => filter_value.eq_ignore_ascii_case("true") == value.eq_ignore_ascii_case("true"),
        "tinyint" | "smallint" => number::<i16>(filter_value)? == number::<i16>(value)?,
        "int" => number::<i32>(filter_value)? == number::<i32>(value)?,
        "bigint" => number::<i64>(filter_value)? == number::<i64>(value)?,
        "float" => number::<f32>(filter_value)? == number::<f32>(value)?,
        "double" => number::<f64>(filter_value)? == number::<f64>(value)?,
        "timestamp" => {
            datetime::parse_timestamp(filter_value, TimeZoneMode::Utc)?
                == datetime::parse_timestamp(value, TimeZoneMode::Utc)?
        }
        "date" => datetime::parse_date(filter_value)? == datetime::parse_date(value)?,
        "decimal" => Decimal::create(filter_value)? == Decimal::create(value)?,
        "binary" => filter_value.as_bytes() == value.as_bytes(),
        // string, varchar and char already compared as text
        _ => false,
    };
    Ok(equal)
}

/// Partition keys, types and values of the fragment.
fn partition_fields(context: &RequestContext) -> PxfResult<Vec<HivePartition>> {
    let columns = context.fragment_property(PARTITION_COLUMNS_PROPERTY).unwrap_or_default();
    let types = context.fragment_property(PARTITION_COLUMN_TYPES_PROPERTY).unwrap_or_default();
    if columns.trim().is_empty() || types.trim().is_empty() {
        return Ok(Vec::new());
    }
    let values = context.fragment_property(PARTITION_COLUMN_VALUES_PROPERTY).unwrap_or_default();

    let keys: Vec<&str> = columns.trim().split('/').collect();
    let key_types: Vec<&str> = types.trim().split(':').collect();
    let key_values: Vec<&str> = values.trim().split(HIVE_PARTITIONS_DELIM).collect();
    if keys.len() != key_types.len() || keys.len() != key_values.len() {
        return Err(PxfError::InvalidArguments(format!(
            "The partition keys and partition key types length does not match. partKeys.length={} partKeyTypes.length={}",
            keys.len(),
            key_types.len()
        )));
    }
    Ok(keys
        .into_iter()
        .zip(key_types)
        .zip(key_values)
        .map(|((name, type_name), value)| HivePartition {
            name: name.to_string(),
            type_name: type_name.to_string(),
            value: value.to_string(),
        })
        .collect())
}

/// Hive schema position of every tuple description column, matched by
/// exact then lower-case name.
fn hive_indexes(context: &RequestContext) -> PxfResult<Vec<Option<usize>>> {
    let columns = context.fragment_property(COLUMNS_PROPERTY).ok_or_else(|| {
        PxfError::InvalidArguments(format!("The \"{}\" property cannot be null", COLUMNS_PROPERTY))
    })?;
    let delimiter = context
        .fragment_property(COLUMN_NAME_DELIMITER_PROPERTY)
        .unwrap_or(",");
    let positions: AHashMap<&str, usize> = columns
        .trim()
        .split(delimiter)
        .enumerate()
        .map(|(i, name)| (name, i))
        .collect();

    Ok(context
        .columns()
        .iter()
        .map(|column| {
            positions
                .get(column.name.as_str())
                .or_else(|| positions.get(column.name.to_lowercase().as_str()))
                .copied()
        })
        .collect())
}
