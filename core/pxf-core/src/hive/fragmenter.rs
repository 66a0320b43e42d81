//! Splits a Hive table into one fragment per data file of each selected partition.
//!
//! 요청에 필터가 있고 테이블에 파티션 키가 있으면 메타스토어에 파티션 필터를
//! 넘겨 필요한 파티션만 받아옵니다. 파티션 디렉터리 목록은 rayon으로 병렬 수집합니다.

use super::metastore::{extract_table_from_name, FieldSchema, MetastoreClient, Partition, Table, TableType};
use super::partition_filter::HivePartitionFilterBuilder;
use super::{
    COLUMNS_PROPERTY, COLUMN_TYPES_PROPERTY, FILTER_IN_FRAGMENTER_PROPERTY, HIVE_PARTITIONS_DELIM,
    PARTITION_COLUMNS_PROPERTY, PARTITION_COLUMN_TYPES_PROPERTY, PARTITION_COLUMN_VALUES_PROPERTY,
};
use crate::context::RequestContext;
use crate::error::{PxfError, PxfResult};
use ahash::AHashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// One unit of work: a data file plus the properties its accessor needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub source: String,
    pub index: usize,
    pub properties: BTreeMap<String, String>,
}

impl Fragment {
    /// Request context for reading this fragment.
    pub fn request_context(&self, template: &RequestContext) -> RequestContext {
        template
            .clone()
            .with_data_source(self.source.clone())
            .with_fragment_index(self.index)
            .with_fragment_properties(self.properties.clone())
    }
}

pub struct HiveDataFragmenter {
    client: Arc<dyn MetastoreClient>,
}

impl HiveDataFragmenter {
    pub fn new(client: Arc<dyn MetastoreClient>) -> Self {
        Self { client }
    }

    /// Fragments of the table named by the request's data source.
    pub fn get_fragments(&self, context: &RequestContext) -> PxfResult<Vec<Fragment>> {
        let name = extract_table_from_name(context.data_source())?;
        let table = self.client.get_table(&name.db_name, &name.table_name)?;
        debug!(db = %name.db_name, table = %name.table_name, table_type = ?table.table_type, "fetched table");
        if table.table_type == TableType::VirtualView {
            return Err(PxfError::UnsupportedOperation(
                "Hive views are not supported by PXF".to_string(),
            ));
        }

        let filter = self.partition_filter(context, &table)?;
        let partitions = if filter.is_empty() {
            self.client.list_partitions(&name.db_name, &name.table_name, None)?
        } else {
            debug!("Filter String for Hive partition retrieval : {}", filter);
            let partitions =
                self.client
                    .list_partitions_by_filter(&name.db_name, &name.table_name, &filter, None)?;
            if partitions.is_empty() {
                debug!(
                    "Table - {}.{} Has no matched partitions for the filter : {}",
                    name.db_name, name.table_name, filter
                );
                return Ok(Vec::new());
            }
            debug!(
                "Table - {}.{} Matched partitions list size: {}",
                name.db_name,
                name.table_name,
                partitions.len()
            );
            partitions
        };
        let filter_in_fragmenter = !filter.is_empty();

        let units: Vec<Vec<Fragment>> = if partitions.is_empty() {
            vec![table_fragments(&table, None, filter_in_fragmenter)?]
        } else {
            partitions
                .par_iter()
                .map(|partition| table_fragments(&table, Some(partition), filter_in_fragmenter))
                .collect::<PxfResult<_>>()?
        };

        let mut fragments: Vec<Fragment> = units.into_iter().flatten().collect();
        for (index, fragment) in fragments.iter_mut().enumerate() {
            fragment.index = index;
        }
        debug!(fragments = fragments.len(), "fragmented table");
        Ok(fragments)
    }

    /// Partition filter for the metastore; empty when the table is not
    /// partitioned, the request has no filter, or nothing applies to partition keys.
    fn partition_filter(&self, context: &RequestContext, table: &Table) -> PxfResult<String> {
        if !context.has_filter() || table.partition_keys.is_empty() {
            return Ok(String::new());
        }
        let partition_keys: AHashMap<String, String> = table
            .partition_keys
            .iter()
            .map(|key| (key.name.clone(), key.type_name.clone()))
            .collect();
        HivePartitionFilterBuilder::new(context.columns(), &partition_keys)
            .with_integral_pushdown(context.config().hive_integral_pushdown)
            .build_filter_string(context.filter())
    }
}

/// Fragments for the files under the table location, or under a partition's.
fn table_fragments(
    table: &Table,
    partition: Option<&Partition>,
    filter_in_fragmenter: bool,
) -> PxfResult<Vec<Fragment>> {
    let location = partition.map_or(table.location.as_str(), |p| p.location.as_str());
    let properties = fragment_properties(table, partition, filter_in_fragmenter);
    Ok(data_files(Path::new(location))?
        .into_iter()
        .map(|path| Fragment {
            source: path.to_string_lossy().into_owned(),
            index: 0,
            properties: properties.clone(),
        })
        .collect())
}

fn fragment_properties(
    table: &Table,
    partition: Option<&Partition>,
    filter_in_fragmenter: bool,
) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    properties.insert(COLUMNS_PROPERTY.to_string(), names(&table.columns, ","));
    properties.insert(
        COLUMN_TYPES_PROPERTY.to_string(),
        type_names(&table.columns, ":"),
    );
    properties.insert(
        FILTER_IN_FRAGMENTER_PROPERTY.to_string(),
        filter_in_fragmenter.to_string(),
    );
    if let Some(partition) = partition {
        properties.insert(
            PARTITION_COLUMNS_PROPERTY.to_string(),
            names(&table.partition_keys, "/"),
        );
        properties.insert(
            PARTITION_COLUMN_TYPES_PROPERTY.to_string(),
            type_names(&table.partition_keys, ":"),
        );
        properties.insert(
            PARTITION_COLUMN_VALUES_PROPERTY.to_string(),
            partition.values.join(HIVE_PARTITIONS_DELIM),
        );
    }
    properties
}

fn names(fields: &[FieldSchema], separator: &str) -> String {
    fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(separator)
}

fn type_names(fields: &[FieldSchema], separator: &str) -> String {
    fields.iter().map(|f| f.type_name.as_str()).collect::<Vec<_>>().join(separator)
}

/// Regular files of a directory, hidden (`.`/`_`) files excluded, sorted by
/// name. A missing directory has no files.
fn data_files(location: &Path) -> PxfResult<Vec<PathBuf>> {
    if location.is_file() {
        return Ok(vec![location.to_path_buf()]);
    }
    let entries = match fs::read_dir(location) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(location = %location.display(), "location does not exist");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let hidden = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || name.starts_with('_'));
        if !hidden && entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
