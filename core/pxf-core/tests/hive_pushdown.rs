// Hive 통합 테스트: 메타스토어 → fragmenter → HiveAccessor → resolver

use pxf_core::config::PxfConfig;
use pxf_core::error::PxfResult;
use pxf_core::hive::{
    FieldSchema, HiveAccessor, HiveDataFragmenter, InMemoryMetastore, MetastoreClient, Partition,
    Table,
};
use pxf_core::orc::{OrcVectorizedAccessor, OrcVectorizedResolver};
use pxf_core::types::{ColumnDescriptor, DataType, FieldValue, OneField};
use pxf_core::RequestContext;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Write `ids` as (t1, num) rows into `dir/part-00000.parquet`.
fn write_partition(dir: &Path, ids: &[i32]) -> PxfResult<()> {
    let columns = vec![
        ColumnDescriptor::new("t1", DataType::Text, 0),
        ColumnDescriptor::new("num", DataType::Integer, 1),
    ];
    let mut ctx = RequestContext::new(columns).with_data_source(dir.to_string_lossy());
    let mut accessor = OrcVectorizedAccessor::new(&ctx);
    accessor.open_for_write(&mut ctx)?;
    let mut resolver = OrcVectorizedResolver::new(&ctx)?;
    let records: Vec<Vec<OneField>> = ids
        .iter()
        .map(|id| {
            vec![
                OneField::new(25, Some(FieldValue::Text(format!("row{}", id)))),
                OneField::new(23, Some(FieldValue::Integer(*id))),
            ]
        })
        .collect();
    if let Some(batch) = resolver.set_fields_for_batch(&records)? {
        accessor.write_next_batch(batch)?;
    }
    accessor.close_for_write()?;
    Ok(())
}

/// Table `default.events (t1 string, num int) partitioned by (fmt string)`.
fn events_table(root: &Path) -> PxfResult<Arc<InMemoryMetastore>> {
    pxf_core::logging::init_test();
    let metastore = Arc::new(InMemoryMetastore::new());
    let location = root.join("events");
    metastore.create_table(
        Table::new("default", "events", location.to_string_lossy())
            .with_columns(vec![FieldSchema::new("t1", "string"), FieldSchema::new("num", "int")])
            .with_partition_keys(vec![FieldSchema::new("fmt", "string")]),
    );
    for (fmt, ids) in [("rc1", vec![1, 2, 3]), ("seq", vec![4, 5, 6])] {
        let dir = location.join(format!("fmt={}", fmt));
        write_partition(&dir, &ids)?;
        metastore.add_partition("default", "events", Partition::new([fmt], dir.to_string_lossy()))?;
    }
    Ok(metastore)
}

fn tuple() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("t1", DataType::Text, 0),
        ColumnDescriptor::new("num", DataType::Integer, 1),
        ColumnDescriptor::new("fmt", DataType::Text, 2),
    ]
}

/// Rows of every fragment, read the way a segment would.
fn scan(metastore: Arc<InMemoryMetastore>, template: &RequestContext) -> PxfResult<Vec<Vec<OneField>>> {
    let fragments = HiveDataFragmenter::new(metastore).get_fragments(template)?;
    let mut rows = Vec::new();
    for fragment in &fragments {
        let mut ctx = fragment.request_context(template);
        let mut accessor = HiveAccessor::new(&ctx)?;
        if !accessor.open_for_read(&mut ctx)? {
            continue;
        }
        let mut resolver = OrcVectorizedResolver::new(&ctx)?;
        while let Some(batch) = accessor.read_next_batch()? {
            rows.extend(resolver.fields_for_batch(batch)?);
        }
        accessor.close_for_read()?;
    }
    Ok(rows)
}

fn nums(rows: &[Vec<OneField>]) -> Vec<Option<FieldValue>> {
    rows.iter().map(|row| row[1].val.clone()).collect()
}

#[test]
fn test_full_scan() -> PxfResult<()> {
    let dir = TempDir::new()?;
    let metastore = events_table(dir.path())?;
    let template = RequestContext::new(tuple()).with_data_source("default.events");
    let rows = scan(metastore, &template)?;
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0][0].val, Some(FieldValue::Text("row1".to_string())));
    // partition values are not stored in the files
    assert!(rows.iter().all(|row| row[2].is_null()));
    Ok(())
}

#[test]
fn test_partition_filter_in_fragmenter() -> PxfResult<()> {
    let dir = TempDir::new()?;
    let metastore = events_table(dir.path())?;
    // num > 1 AND fmt = 'seq'
    let template = RequestContext::new(tuple())
        .with_data_source("events")
        .with_filter("a1c23s1d1o2a2c25s3dseqo5l0");
    let rows = scan(metastore, &template)?;
    assert_eq!(
        nums(&rows),
        vec![
            Some(FieldValue::Integer(4)),
            Some(FieldValue::Integer(5)),
            Some(FieldValue::Integer(6)),
        ]
    );
    Ok(())
}

#[test]
fn test_row_groups_skipped_in_selected_partition() -> PxfResult<()> {
    let dir = TempDir::new()?;
    let metastore = events_table(dir.path())?;
    // num > 100 AND fmt = 'rc1'
    let template = RequestContext::new(tuple())
        .with_data_source("events")
        .with_filter("a1c23s3d100o2a2c25s3drc1o5l0");
    assert!(scan(metastore, &template)?.is_empty());
    Ok(())
}

#[test]
fn test_or_filter_reads_every_partition() -> PxfResult<()> {
    let dir = TempDir::new()?;
    let metastore = events_table(dir.path())?;
    // fmt = 'rc1' OR t1 = 'row5'
    let template = RequestContext::new(tuple())
        .with_data_source("events")
        .with_filter("a2c25s3drc1o5a0c25s4drow5o5l1");
    assert_eq!(scan(metastore, &template)?.len(), 6);
    Ok(())
}

#[test]
fn test_pushdown_disabled() -> PxfResult<()> {
    let dir = TempDir::new()?;
    let metastore = events_table(dir.path())?;
    let config = PxfConfig {
        hive_predicate_pushdown: false,
        ..PxfConfig::default()
    };
    // num > 100 AND fmt = 'rc1'
    let template = RequestContext::new(tuple())
        .with_data_source("events")
        .with_filter("a1c23s3d100o2a2c25s3drc1o5l0")
        .with_config(config);
    // no search argument: the row group is returned to the engine
    assert_eq!(scan(metastore, &template)?.len(), 3);
    Ok(())
}

#[test]
fn test_search_argument_uses_file_fields() -> PxfResult<()> {
    let dir = TempDir::new()?;
    let metastore = events_table(dir.path())?;
    let columns = vec![
        ColumnDescriptor::new("T1", DataType::Text, 0),
        ColumnDescriptor::new("NUM", DataType::Integer, 1),
    ];
    let partitions = metastore.list_partitions("default", "events", Some(1))?;
    let file = Path::new(&partitions[0].location).join("part-00000.parquet");
    let mut ctx = RequestContext::new(columns)
        .with_data_source(file.to_string_lossy())
        .with_filter("a1c23s1d2o5")
        .with_fragment_properties([("columns", "t1,num"), ("columns.types", "string:int")]);

    let mut accessor = HiveAccessor::new(&ctx)?;
    assert_eq!(accessor.hive_indexes(), &[Some(0), Some(1)]);
    assert!(accessor.open_for_read(&mut ctx)?);
    let sarg = accessor.search_argument().map(|s| s.leaves().to_vec()).unwrap_or_default();
    assert_eq!(sarg.len(), 1);
    assert_eq!(sarg[0].column, "num");

    let mut resolver = OrcVectorizedResolver::new(&ctx)?;
    let mut rows = Vec::new();
    while let Some(batch) = accessor.read_next_batch()? {
        rows.extend(resolver.fields_for_batch(batch)?);
    }
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1][1].val, Some(FieldValue::Integer(2)));
    Ok(())
}
