use super::*;
use crate::filter::{parse, traverse};
use crate::types::{ColumnDescriptor, DataType};
use ahash::AHashMap;

fn columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", DataType::Integer, 0),
        ColumnDescriptor::new("cdate", DataType::Date, 1),
        ColumnDescriptor::new("amt", DataType::Float8, 2),
        ColumnDescriptor::new("grade", DataType::Text, 3),
        ColumnDescriptor::new("b", DataType::Boolean, 4),
    ]
}

fn build(filter: &str) -> PxfResult<SearchArgument> {
    let columns = columns();
    let tree = parse(Some(filter))?;
    let mut visitor = SearchArgumentVisitor::new(&columns);
    traverse(Some(tree), &mut visitor)?;
    visitor.build()
}

fn sarg(filter: &str) -> String {
    build(filter).unwrap().to_string()
}

// ── Tree → search argument ──

#[test]
fn not_is_null() {
    assert_eq!(sarg("a1o8l2"), "leaf-0 = (IS_NULL cdate), expr = (not leaf-0)");
}

#[test]
fn single_equals() {
    assert_eq!(sarg("a0c20s1d1o5"), "leaf-0 = (EQUALS id 1), expr = leaf-0");
}

#[test]
fn nested_ands_are_flattened() {
    assert_eq!(
        sarg("a1c25s10d2008-02-01o2a1c25s10d2008-12-01o1l0a2c20s4d1200o2l0"),
        "leaf-0 = (LESS_THAN_EQUALS cdate 2008-02-01), \
         leaf-1 = (LESS_THAN cdate 2008-12-01), \
         leaf-2 = (LESS_THAN_EQUALS amt 1200), \
         expr = (and (not leaf-0) leaf-1 (not leaf-2))"
    );
}

#[test]
fn or_over_and_becomes_cnf() {
    assert_eq!(
        sarg("a1c1082s10d2008-02-01o2a1c1082s10d2008-12-01o1a0c23s4d1200o2l0l1"),
        "leaf-0 = (LESS_THAN_EQUALS cdate 2008-02-01), \
         leaf-1 = (LESS_THAN cdate 2008-12-01), \
         leaf-2 = (LESS_THAN_EQUALS id 1200), \
         expr = (and (or (not leaf-0) leaf-1) (or (not leaf-0) (not leaf-2)))"
    );
}

#[test]
fn simple_or() {
    assert_eq!(
        sarg("a1c25s10d2008-02-01o2a2c20s4d1200o2l1"),
        "leaf-0 = (LESS_THAN_EQUALS cdate 2008-02-01), \
         leaf-1 = (LESS_THAN_EQUALS amt 1200), \
         expr = (or (not leaf-0) (not leaf-1))"
    );
}

#[test]
fn is_not_null() {
    assert_eq!(sarg("a3o9"), "leaf-0 = (IS_NULL grade), expr = (not leaf-0)");
}

#[test]
fn in_requires_a_list() {
    let err = build("a3c25s3dbado10").unwrap_err();
    assert_eq!(
        err.to_string(),
        "filterValue should be instance of List for IN operation"
    );
}

#[test]
fn in_list() {
    assert_eq!(
        sarg("a0m1016s3d194s5d82756o10"),
        "leaf-0 = (IN id 194 82756), expr = leaf-0"
    );
}

#[test]
fn boolean_columns() {
    assert_eq!(
        sarg("a4c16s4dtrueo0l2"),
        "leaf-0 = (EQUALS b true), expr = (not leaf-0)"
    );
    assert_eq!(sarg("a4c16s4dtrueo0"), "leaf-0 = (EQUALS b true), expr = leaf-0");
}

#[test]
fn not_equals() {
    assert_eq!(sarg("a0c23s1d5o6"), "leaf-0 = (EQUALS id 5), expr = (not leaf-0)");
}

#[test]
fn duplicate_leaves_are_shared() {
    let sarg = build("a0c23s1d5o5a0c23s1d5o5l1").unwrap();
    assert_eq!(sarg.leaves().len(), 1);
    assert_eq!(sarg.to_string(), "leaf-0 = (EQUALS id 5), expr = (or leaf-0 leaf-0)");
}

#[test]
fn leaf_types_follow_literal_values() {
    let sarg = build("a2c701s3d1.5o1a2c700s3d1.1o1l0a3c1043s1dxo5l0").unwrap();
    let types: Vec<LeafType> = sarg.leaves().iter().map(|l| l.leaf_type).collect();
    assert_eq!(types, vec![LeafType::Float, LeafType::Float, LeafType::String]);
    assert_eq!(sarg.leaves()[1].literal, Some(Literal::Float(1.1)));
}

// ── Literal conversion ──

#[test]
fn conversion_errors() {
    let zone = crate::datetime::TimeZoneMode::Utc;
    assert_eq!(
        convert_literal(DataType::Integer, "12x", zone).unwrap_err().to_string(),
        "failed to parse number data 12x for type INTEGER"
    );
    assert_eq!(
        convert_literal(DataType::Time, "10:00:00", zone).unwrap_err().to_string(),
        "Unknown type for literal 10:00:00"
    );
    assert_eq!(
        convert_literal(DataType::Uuid, "abc", zone).unwrap_err().to_string(),
        "DataType UUID unsupported"
    );
    assert_eq!(
        convert_literal(DataType::Boolean, "TRUE", zone).unwrap(),
        Literal::Boolean(true)
    );
    assert_eq!(
        convert_literal(DataType::Boolean, "yes", zone).unwrap(),
        Literal::Boolean(false)
    );
}

#[test]
fn timestamp_literals() {
    let sarg = build("a1c1114s19d2013-07-23 21:00:00o1").unwrap();
    assert_eq!(
        sarg.to_string(),
        "leaf-0 = (LESS_THAN cdate 2013-07-23 21:00:00.0), expr = leaf-0"
    );
}

// ── Builder ──

#[test]
fn builder_validates_blocks() {
    let mut builder = SearchArgument::builder();
    builder.start_or();
    let err = builder.end().unwrap_err();
    assert_eq!(err.to_string(), "Can't create expression (or) with no children.");

    let mut builder = SearchArgument::builder();
    builder.start_and().equals("x", LeafType::Long, Literal::Long(1));
    let err = builder.build().unwrap_err();
    assert_eq!(err.to_string(), "Failed to end 2 operations.");

    let mut builder = SearchArgument::builder();
    builder
        .start_not()
        .equals("x", LeafType::Long, Literal::Long(1))
        .equals("y", LeafType::Long, Literal::Long(2));
    assert!(builder.end().is_err());

    let mut builder = SearchArgument::builder();
    assert!(builder.in_list("x", LeafType::Long, Vec::new()).is_err());
}

#[test]
fn empty_builder_is_maybe() {
    let sarg = SearchArgument::builder().build().unwrap();
    assert_eq!(sarg.to_string(), "expr = YES_NO_NULL");
    assert_eq!(sarg.evaluate(&[]), TruthValue::YesNoNull);
}

#[test]
fn maybe_constants_fold_away() {
    let mut builder = SearchArgument::builder();
    builder
        .start_and()
        .literal(TruthValue::YesNoNull)
        .less_than("x", LeafType::Long, Literal::Long(3));
    builder.end().unwrap();
    builder
        .start_or()
        .literal(TruthValue::YesNoNull)
        .equals("unused", LeafType::Long, Literal::Long(1));
    builder.end().unwrap();
    let sarg = builder.build().unwrap();
    assert_eq!(sarg.to_string(), "leaf-0 = (LESS_THAN x 3), expr = leaf-0");
}

// ── Statistics & serialization ──

#[test]
fn evaluate_against_statistics() {
    let sarg = build("a0c23s2d10o2a3c25s1dao5l0").unwrap();
    let mut stats = AHashMap::new();
    stats.insert(
        "id".to_string(),
        ColumnStatistics {
            min: Some(Literal::Long(1)),
            max: Some(Literal::Long(5)),
            has_null: false,
        },
    );
    stats.insert(
        "grade".to_string(),
        ColumnStatistics {
            min: Some(Literal::String("a".to_string())),
            max: Some(Literal::String("c".to_string())),
            has_null: false,
        },
    );
    // id > 10 cannot hold when max(id) = 5
    let result = sarg.evaluate_statistics(|name| stats.get(name));
    assert_eq!(result, TruthValue::No);
    assert!(!result.is_needed());

    stats.get_mut("id").unwrap().max = Some(Literal::Long(50));
    assert!(sarg.evaluate_statistics(|name| stats.get(name)).is_needed());
    assert_eq!(
        sarg.evaluate_statistics(|_| None),
        TruthValue::YesNoNull
    );
}

#[test]
fn base64_hand_off() {
    let sarg = build("a1c1082s10d2008-02-01o2a1c1082s10d2008-12-01o1a0c23s4d1200o2l0l1").unwrap();
    let encoded = sarg.to_base64().unwrap();
    let decoded = SearchArgument::from_base64(&encoded).unwrap();
    assert_eq!(decoded, sarg);
    assert!(SearchArgument::from_base64("not base64!").is_err());
}
