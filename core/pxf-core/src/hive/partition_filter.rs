//! Filter string for listing partitions by filter in the metastore.

use super::partition_pruner::HivePartitionPruner;
use crate::error::PxfResult;
use crate::filter::{parse, traverse, Operator, OperatorSet, PredicateRenderer};
use crate::types::ColumnDescriptor;
use ahash::AHashMap;
use tracing::debug;

/// Operators the metastore accepts in a partition filter.
pub const SUPPORTED_OPERATORS: OperatorSet = OperatorSet::of(&[
    Operator::Equals,
    Operator::LessThan,
    Operator::GreaterThan,
    Operator::LessThanOrEqual,
    Operator::GreaterThanOrEqual,
    Operator::NotEquals,
    Operator::And,
    Operator::Or,
]);

const HIVE_API_QUOTE: &str = "\"";

/// Renders the partition-key part of a filter, e.g. `(fmt = "rc1" AND prt = "a")`.
pub struct HivePartitionFilterBuilder<'a> {
    columns: &'a [ColumnDescriptor],
    partition_keys: &'a AHashMap<String, String>,
    integral_pushdown: bool,
}

impl<'a> HivePartitionFilterBuilder<'a> {
    pub fn new(columns: &'a [ColumnDescriptor], partition_keys: &'a AHashMap<String, String>) -> Self {
        Self {
            columns,
            partition_keys,
            integral_pushdown: false,
        }
    }

    /// Allow `=`/`<>` on integral partition keys
    /// (`hive.metastore.integral.jdo.pushdown`).
    pub fn with_integral_pushdown(mut self, enabled: bool) -> Self {
        self.integral_pushdown = enabled;
        self
    }

    /// Empty when no part of `filter` applies to partition keys.
    pub fn build_filter_string(&self, filter: Option<&str>) -> PxfResult<String> {
        let root = parse(filter)?;
        let mut pruner = HivePartitionPruner::new(
            SUPPORTED_OPERATORS,
            self.integral_pushdown,
            self.partition_keys,
            self.columns,
        );
        let pruned = traverse(Some(root), &mut pruner)?;
        let rendered = PredicateRenderer::named(self.columns)
            .with_value_quote(HIVE_API_QUOTE)
            .render(pruned.as_ref())?;
        debug!(filter = %rendered, "partition filter");
        Ok(rendered)
    }
}
