use super::*;
use crate::config::PxfConfig;
use crate::context::RequestContext;
use crate::error::PxfError;
use crate::filter::{parse, traverse, Operator, OperatorSet, PredicateRenderer};
use crate::types::{ColumnDescriptor, DataType};
use ahash::AHashMap;
use proptest::prelude::*;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("t1", DataType::Text, 0),
        ColumnDescriptor::new("fmt", DataType::Text, 1),
        ColumnDescriptor::new("prt", DataType::Text, 2),
        ColumnDescriptor::new("day", DataType::Integer, 3),
    ]
}

fn partition_keys() -> AHashMap<String, String> {
    [("fmt", "string"), ("prt", "string"), ("day", "int")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn partition_filter(filter: &str, integral: bool) -> String {
    let columns = columns();
    let keys = partition_keys();
    HivePartitionFilterBuilder::new(&columns, &keys)
        .with_integral_pushdown(integral)
        .build_filter_string(Some(filter))
        .unwrap()
}

// fmt = 'rc1' AND prt = 'a'
const FMT_AND_PRT: &str = "a1c25s3drc1o5a2c25s1dao5l0";
// t1 = 'row1' AND fmt = 'seq'
const T1_AND_FMT: &str = "a0c25s4drow1o5a1c25s3dseqo5l0";
// fmt = 'rc1' OR t1 = 'row1'
const FMT_OR_T1: &str = "a1c25s3drc1o5a0c25s4drow1o5l1";

// ── Partition pruning ──

#[test]
fn partition_only_tree_is_unchanged() {
    let columns = columns();
    let keys = partition_keys();
    let tree = parse(Some(FMT_AND_PRT)).unwrap();
    let mut pruner = HivePartitionPruner::new(
        OperatorSet::of(&[Operator::Equals, Operator::And]),
        false,
        &keys,
        &columns,
    );
    let pruned = traverse(Some(tree.clone()), &mut pruner).unwrap();
    assert_eq!(pruned, Some(tree));

    let rendered = PredicateRenderer::named(&columns)
        .with_value_quote("\"")
        .render(pruned.as_ref())
        .unwrap();
    assert_eq!(rendered, "(fmt = \"rc1\" AND prt = \"a\")");
    assert_eq!(partition_filter(FMT_AND_PRT, false), rendered);
}

#[test]
fn and_drops_non_partition_column() {
    assert_eq!(partition_filter(T1_AND_FMT, false), "fmt = \"seq\"");
}

#[test]
fn or_with_non_partition_column_is_dropped() {
    assert_eq!(partition_filter(FMT_OR_T1, false), "");
}

const PREDICATES: [&str; 8] = [
    "a0c25s4drow1o5",
    "a1c25s3drc1o5",
    "a1c25s3dseqo6",
    "a2c25s1dao2",
    "a2c25s1dco3",
    "a2c25s2da%o7",
    "a3c23s1d5o5",
    "a3c23s1d5o1",
];

/// Serialized filter over `columns()` built from `PREDICATES`.
fn serialized_filter() -> impl Strategy<Value = String> {
    (0..PREDICATES.len())
        .prop_map(|i| PREDICATES[i].to_string())
        .prop_recursive(3, 16, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("{l}{r}l0")),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("{l}{r}l1")),
                inner.prop_map(|child| format!("{child}l2")),
            ]
        })
}

proptest! {
    #[test]
    fn rendering_is_repeatable(filter in serialized_filter(), integral in any::<bool>()) {
        let first = partition_filter(&filter, integral);
        let second = partition_filter(&filter, integral);
        prop_assert_eq!(&first, &second);
        prop_assert!(!first.contains("t1"), "{} leaks a data column", first);
        prop_assert!(!first.contains("NOT") && !first.contains("LIKE"));
    }
}

#[test]
fn integral_keys_need_pushdown_and_equality() {
    // day = 5
    assert_eq!(partition_filter("a3c23s1d5o5", false), "");
    assert_eq!(partition_filter("a3c23s1d5o5", true), "day = \"5\"");
    // day <> 5
    assert_eq!(partition_filter("a3c23s1d5o6", true), "day <> \"5\"");
    // day < 5
    assert_eq!(partition_filter("a3c23s1d5o1", true), "");
}

#[test]
fn string_key_supports_ranges() {
    // prt > 'a' AND prt <= 'c'
    assert_eq!(
        partition_filter("a2c25s1dao2a2c25s1dco3l0", false),
        "(prt > \"a\" AND prt <= \"c\")"
    );
    // LIKE is not a metastore operator
    assert_eq!(partition_filter("a2c25s2da%o7", false), "");
}

#[test]
fn key_type_is_case_insensitive() {
    let columns = columns();
    let keys: AHashMap<String, String> = [("fmt".to_string(), "STRING".to_string())].into_iter().collect();
    let rendered = HivePartitionFilterBuilder::new(&columns, &keys)
        .build_filter_string(Some("a1c25s3drc1o5"))
        .unwrap();
    assert_eq!(rendered, "fmt = \"rc1\"");
}

#[test]
fn integral_key_type_is_case_sensitive() {
    let columns = columns();
    let keys: AHashMap<String, String> = [("day".to_string(), "INT".to_string())].into_iter().collect();
    let rendered = HivePartitionFilterBuilder::new(&columns, &keys)
        .with_integral_pushdown(true)
        .build_filter_string(Some("a3c23s1d5o5"))
        .unwrap();
    assert_eq!(rendered, "");
    assert_eq!(partition_filter("a3c23s1d5o5", true), "day = \"5\"");
}

#[test]
fn not_is_never_sent_to_the_metastore() {
    // NOT (fmt = 'rc1')
    assert_eq!(partition_filter("a1c25s3drc1o5l2", false), "");
}

// ── Accessor partition selection ──

fn fragment_context(filter: Option<&str>, properties: &[(&str, &str)]) -> RequestContext {
    let ctx = RequestContext::new(columns()).with_fragment_properties(properties.iter().copied());
    match filter {
        Some(filter) => ctx.with_filter(filter),
        None => ctx,
    }
}

const STRING_PARTITIONS: [(&str, &str); 4] = [
    (COLUMNS_PROPERTY, "t1,num"),
    (PARTITION_COLUMNS_PROPERTY, "fmt/prt"),
    (PARTITION_COLUMN_TYPES_PROPERTY, "string:string"),
    (PARTITION_COLUMN_VALUES_PROPERTY, "rc1!HPAD!a"),
];

fn selected(filter: Option<&str>, properties: &[(&str, &str)]) -> bool {
    let ctx = fragment_context(filter, properties);
    HiveAccessor::new(&ctx)
        .unwrap()
        .is_partition_selected(&ctx)
        .unwrap()
}

#[test]
fn partition_fields_from_properties() {
    let ctx = fragment_context(None, &STRING_PARTITIONS);
    let accessor = HiveAccessor::new(&ctx).unwrap();
    assert_eq!(
        accessor.partitions(),
        &[
            HivePartition {
                name: "fmt".into(),
                type_name: "string".into(),
                value: "rc1".into(),
            },
            HivePartition {
                name: "prt".into(),
                type_name: "string".into(),
                value: "a".into(),
            },
        ]
    );
    assert_eq!(accessor.hive_indexes(), &[Some(0), None, None, None]);
}

#[test]
fn equality_on_partition_values() {
    assert!(selected(None, &STRING_PARTITIONS));
    assert!(selected(Some("a1c25s3drc1o5"), &STRING_PARTITIONS));
    assert!(!selected(Some("a1c25s3dseqo5"), &STRING_PARTITIONS));
    assert!(selected(Some(FMT_AND_PRT), &STRING_PARTITIONS));
    // prt = 'b'
    assert!(!selected(Some("a1c25s3drc1o5a2c25s1dbo5l0"), &STRING_PARTITIONS));
}

#[test]
fn non_partition_columns_keep_the_partition() {
    assert!(!selected(Some(T1_AND_FMT), &STRING_PARTITIONS));
    // t1 = 'row1' AND fmt = 'rc1'
    assert!(selected(Some("a0c25s4drow1o5a1c25s3drc1o5l0"), &STRING_PARTITIONS));
    assert!(selected(Some("a0c25s4drow1o5"), &STRING_PARTITIONS));
}

#[test]
fn or_not_and_ranges_keep_the_partition() {
    // fmt = 'seq' OR prt = 'b'
    assert!(selected(Some("a1c25s3dseqo5a2c25s1dbo5l1"), &STRING_PARTITIONS));
    // NOT (fmt = 'rc1')
    assert!(selected(Some("a1c25s3drc1o5l2"), &STRING_PARTITIONS));
    // fmt > 'zzz'
    assert!(selected(Some("a1c25s3dzzzo2"), &STRING_PARTITIONS));
}

#[test]
fn typed_partition_values() {
    let int_key = [
        (COLUMNS_PROPERTY, "t1"),
        (PARTITION_COLUMNS_PROPERTY, "day"),
        (PARTITION_COLUMN_TYPES_PROPERTY, "int"),
        (PARTITION_COLUMN_VALUES_PROPERTY, "05"),
    ];
    assert!(selected(Some("a3c23s1d5o5"), &int_key));
    assert!(!selected(Some("a3c23s1d6o5"), &int_key));

    let default_partition = [
        (COLUMNS_PROPERTY, "t1"),
        (PARTITION_COLUMNS_PROPERTY, "day"),
        (PARTITION_COLUMN_TYPES_PROPERTY, "int"),
        (PARTITION_COLUMN_VALUES_PROPERTY, HIVE_DEFAULT_PARTITION),
    ];
    assert!(!selected(Some("a3c23s1d5o5"), &default_partition));

    let decimal_key = [
        (COLUMNS_PROPERTY, "t1"),
        (PARTITION_COLUMNS_PROPERTY, "day"),
        (PARTITION_COLUMN_TYPES_PROPERTY, "decimal(4,2)"),
        (PARTITION_COLUMN_VALUES_PROPERTY, "1.50"),
    ];
    assert!(selected(Some("a3c1700s3d1.5o5"), &decimal_key));

    let boolean_key = [
        (COLUMNS_PROPERTY, "t1"),
        (PARTITION_COLUMNS_PROPERTY, "day"),
        (PARTITION_COLUMN_TYPES_PROPERTY, "boolean"),
        (PARTITION_COLUMN_VALUES_PROPERTY, "TRUE"),
    ];
    assert!(selected(Some("a3c16s4dtrueo5"), &boolean_key));

    let bigint_key = [
        (COLUMNS_PROPERTY, "t1"),
        (PARTITION_COLUMNS_PROPERTY, "day"),
        (PARTITION_COLUMN_TYPES_PROPERTY, "bigint"),
        (PARTITION_COLUMN_VALUES_PROPERTY, "007"),
    ];
    assert!(selected(Some("a3c20s1d7o5"), &bigint_key));
}

#[test]
fn typed_value_that_does_not_parse() {
    let int_key = [
        (COLUMNS_PROPERTY, "t1"),
        (PARTITION_COLUMNS_PROPERTY, "day"),
        (PARTITION_COLUMN_TYPES_PROPERTY, "int"),
        (PARTITION_COLUMN_VALUES_PROPERTY, "5"),
    ];
    let ctx = fragment_context(Some("a3c25s3dabco5"), &int_key);
    let err = HiveAccessor::new(&ctx)
        .unwrap()
        .is_partition_selected(&ctx)
        .unwrap_err();
    assert_eq!(err.to_string(), "For input string: \"abc\"");
}

#[test]
fn partition_property_lengths_must_match() {
    let ctx = fragment_context(
        None,
        &[
            (COLUMNS_PROPERTY, "t1"),
            (PARTITION_COLUMNS_PROPERTY, "fmt/prt"),
            (PARTITION_COLUMN_TYPES_PROPERTY, "string"),
            (PARTITION_COLUMN_VALUES_PROPERTY, "rc1!HPAD!a"),
        ],
    );
    let err = HiveAccessor::new(&ctx).err().unwrap();
    assert_eq!(
        err.to_string(),
        "The partition keys and partition key types length does not match. partKeys.length=2 partKeyTypes.length=1"
    );
}

#[test]
fn columns_property_is_required() {
    let ctx = fragment_context(None, &[(PARTITION_COLUMNS_PROPERTY, "fmt")]);
    let err = HiveAccessor::new(&ctx).err().unwrap();
    assert_eq!(err.to_string(), "The \"columns\" property cannot be null");
}

#[test]
fn hive_indexes_match_lower_case_names() {
    let ctx = RequestContext::new(vec![
        ColumnDescriptor::new("NUM", DataType::Integer, 0),
        ColumnDescriptor::new("t1", DataType::Text, 1),
        ColumnDescriptor::new("gone", DataType::Text, 2),
    ])
    .with_fragment_properties([(COLUMNS_PROPERTY, "t1|num"), (COLUMN_NAME_DELIMITER_PROPERTY, "|")]);
    let accessor = HiveAccessor::new(&ctx).unwrap();
    assert_eq!(accessor.hive_indexes(), &[Some(1), Some(0), None]);
    assert!(accessor.partitions().is_empty());
}

#[test]
fn writing_is_not_supported() {
    let mut ctx = fragment_context(None, &STRING_PARTITIONS);
    let mut accessor = HiveAccessor::new(&ctx).unwrap();
    let err = accessor.open_for_write(&mut ctx).unwrap_err();
    assert!(matches!(err, PxfError::UnsupportedOperation(_)));
    assert_eq!(err.to_string(), "Hive accessor does not support write operation.");
    assert!(accessor.close_for_write().is_err());
}

#[test]
fn filtered_out_partition_is_not_opened() {
    // the data source does not exist; it must not be touched
    let mut ctx = fragment_context(Some("a1c25s3dseqo5"), &STRING_PARTITIONS)
        .with_data_source("/nonexistent/part-00000.parquet");
    let mut accessor = HiveAccessor::new(&ctx).unwrap();
    assert!(!accessor.open_for_read(&mut ctx).unwrap());
    assert!(ctx.metadata().is_none());
}

#[test]
fn pushdown_profiles() {
    let parquet = PushdownProfile::default();
    assert_eq!(parquet, PushdownProfile::Parquet);
    assert!(!parquet.operators().contains(Operator::IsNull));
    assert!(!parquet.data_types().contains(&DataType::Numeric));

    let orc = PushdownProfile::Orc;
    assert!(orc.operators().contains(Operator::IsNotNull));
    assert!(orc.data_types().contains(&DataType::Timestamp));

    let ctx = fragment_context(None, &STRING_PARTITIONS);
    let accessor = HiveAccessor::new(&ctx).unwrap().with_profile(PushdownProfile::Orc);
    assert!(accessor.search_argument().is_none());
}

// ── Fragmenter ──

struct Warehouse {
    dir: TempDir,
    metastore: Arc<InMemoryMetastore>,
}

fn touch(path: &std::path::Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
}

fn warehouse() -> Warehouse {
    crate::logging::init_test();
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let metastore = Arc::new(InMemoryMetastore::new());
    metastore.create_table(
        Table::new("default", "events", root.join("events").to_string_lossy())
            .with_columns(vec![FieldSchema::new("t1", "string")])
            .with_partition_keys(vec![
                FieldSchema::new("fmt", "string"),
                FieldSchema::new("prt", "string"),
            ]),
    );
    for (fmt, prt, files) in [("rc1", "a", 2), ("seq", "b", 1), ("rc1", "b", 0)] {
        let location = root.join(format!("events/fmt={}/prt={}", fmt, prt));
        for i in 0..files {
            touch(&location.join(format!("part-{:05}.parquet", i)));
        }
        if files > 0 {
            touch(&location.join("_SUCCESS"));
            touch(&location.join(".part-00000.parquet.crc"));
        }
        metastore
            .add_partition(
                "default",
                "events",
                Partition::new([fmt, prt], location.to_string_lossy()),
            )
            .unwrap();
    }

    let flat = root.join("flat");
    touch(&flat.join("part-00000.parquet"));
    metastore.create_table(
        Table::new("sales", "flat", flat.to_string_lossy())
            .with_columns(vec![FieldSchema::new("t1", "string")]),
    );
    metastore.create_table(
        Table::new("sales", "recent", "").with_table_type(TableType::VirtualView),
    );
    Warehouse { dir, metastore }
}

fn fragments(warehouse: &Warehouse, table: &str, filter: Option<&str>) -> Vec<Fragment> {
    let mut ctx = RequestContext::new(columns()).with_data_source(table);
    if let Some(filter) = filter {
        ctx = ctx.with_filter(filter);
    }
    HiveDataFragmenter::new(warehouse.metastore.clone())
        .get_fragments(&ctx)
        .unwrap()
}

#[test]
fn fragments_of_matching_partitions() {
    let warehouse = warehouse();
    let fragments = fragments(&warehouse, "events", Some(FMT_AND_PRT));
    assert_eq!(fragments.len(), 2);
    for (i, fragment) in fragments.iter().enumerate() {
        assert_eq!(fragment.index, i);
        assert!(fragment.source.ends_with(&format!("fmt=rc1/prt=a/part-{:05}.parquet", i)));
        assert_eq!(fragment.properties[PARTITION_COLUMN_VALUES_PROPERTY], "rc1!HPAD!a");
        assert_eq!(fragment.properties[PARTITION_COLUMNS_PROPERTY], "fmt/prt");
        assert_eq!(fragment.properties[PARTITION_COLUMN_TYPES_PROPERTY], "string:string");
        assert_eq!(fragment.properties[COLUMNS_PROPERTY], "t1");
        assert_eq!(fragment.properties[FILTER_IN_FRAGMENTER_PROPERTY], "true");
    }
    assert!(warehouse.dir.path().exists());
}

#[test]
fn unprunable_filter_lists_every_partition() {
    let warehouse = warehouse();
    let fragments = fragments(&warehouse, "default.events", Some(FMT_OR_T1));
    assert_eq!(fragments.len(), 3);
    assert!(fragments
        .iter()
        .all(|f| f.properties[FILTER_IN_FRAGMENTER_PROPERTY] == "false"));
}

#[test]
fn no_matching_partition_means_no_fragments() {
    let warehouse = warehouse();
    assert!(fragments(&warehouse, "events", Some("a1c25s3dorco5")).is_empty());
}

#[test]
fn unpartitioned_table_uses_its_location() {
    let warehouse = warehouse();
    let fragments = fragments(&warehouse, "sales.flat", Some(T1_AND_FMT));
    assert_eq!(fragments.len(), 1);
    assert!(!fragments[0].properties.contains_key(PARTITION_COLUMNS_PROPERTY));
    assert_eq!(fragments[0].properties[FILTER_IN_FRAGMENTER_PROPERTY], "false");
}

#[test]
fn views_and_unknown_tables() {
    let warehouse = warehouse();
    let fragmenter = HiveDataFragmenter::new(warehouse.metastore.clone());

    let ctx = RequestContext::new(columns()).with_data_source("sales.recent");
    let err = fragmenter.get_fragments(&ctx).unwrap_err();
    assert_eq!(err.to_string(), "Hive views are not supported by PXF");

    let ctx = RequestContext::new(columns()).with_data_source("sales.missing");
    let err = fragmenter.get_fragments(&ctx).unwrap_err();
    assert!(matches!(err, PxfError::NoSuchObject(_)));
}

#[test]
fn fragment_feeds_the_accessor() {
    let warehouse = warehouse();
    let fragment = fragments(&warehouse, "events", Some(T1_AND_FMT))
        .into_iter()
        .next();
    // fmt = 'seq' selects the single seq partition
    let fragment = fragment.unwrap();
    assert!(fragment.source.contains("fmt=seq"));

    let template = RequestContext::new(columns())
        .with_filter(T1_AND_FMT)
        .with_config(PxfConfig::default());
    let ctx = fragment.request_context(&template);
    assert_eq!(ctx.fragment_index(), fragment.index);
    let accessor = HiveAccessor::new(&ctx).unwrap();
    assert_eq!(accessor.partitions()[0].value, "seq");
    assert!(accessor.is_partition_selected(&ctx).unwrap());
}

#[test]
fn fragments_serialize() {
    let warehouse = warehouse();
    let fragments = fragments(&warehouse, "events", Some(FMT_AND_PRT));
    let json = serde_json::to_string(&fragments).unwrap();
    let back: Vec<Fragment> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, fragments);
}
