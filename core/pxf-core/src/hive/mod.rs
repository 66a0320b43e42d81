//! Hive 파티션 프루닝과 predicate pushdown
//!
//! - [`HivePartitionPruner`]: 파티션 키에 대한 조건만 남기는 필터 트리 pruner
//! - [`HivePartitionFilterBuilder`]: 메타스토어용 파티션 필터 문자열
//! - [`HiveAccessor`]: 프래그먼트 단위 파티션 배제, projection, search argument
//! - [`MetastoreClient`] / [`InMemoryMetastore`]: 메타스토어 인터페이스
//! - [`HiveDataFragmenter`]: 파티션별 데이터 파일 → 프래그먼트

pub mod accessor;
pub mod fragmenter;
pub mod metastore;
pub mod partition_filter;
pub mod partition_pruner;

#[cfg(test)]
mod tests;

pub use accessor::{HiveAccessor, HivePartition, PushdownProfile};
pub use fragmenter::{Fragment, HiveDataFragmenter};
pub use metastore::{
    extract_table_from_name, extract_tables_from_pattern, FieldSchema, InMemoryMetastore,
    MetastoreClient, Partition, Table, TableName, TableType,
};
pub use partition_filter::HivePartitionFilterBuilder;
pub use partition_pruner::HivePartitionPruner;

/// Fragment property: comma-separated Hive column names
pub const COLUMNS_PROPERTY: &str = "columns";
/// Fragment property: `:`-separated Hive column types
pub const COLUMN_TYPES_PROPERTY: &str = "columns.types";
pub const COLUMN_NAME_DELIMITER_PROPERTY: &str = "column.name.delimiter";
/// Fragment property: `/`-separated partition key names
pub const PARTITION_COLUMNS_PROPERTY: &str = "partition_columns";
/// Fragment property: `:`-separated partition key types
pub const PARTITION_COLUMN_TYPES_PROPERTY: &str = "partition_columns.types";
/// Fragment property: partition values joined by [`HIVE_PARTITIONS_DELIM`]
pub const PARTITION_COLUMN_VALUES_PROPERTY: &str = "pxf.meta.table.partition.column.values";
/// Fragment property: whether the fragmenter already filtered partitions
pub const FILTER_IN_FRAGMENTER_PROPERTY: &str = "pxf.hive.filter.in.fragmenter";

pub const HIVE_PARTITIONS_DELIM: &str = "!HPAD!";
/// Value Hive stores for a null partition key
pub const HIVE_DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";
