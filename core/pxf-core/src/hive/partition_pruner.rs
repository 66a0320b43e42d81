//! Pruner keeping only comparisons the metastore can evaluate on partition keys.
//!
//! P는 파티션 컬럼에 대한 지원 조건, NP는 그 외 조건:
//! - `P <op> P` → 그대로
//! - `P AND NP` → `P`
//! - `P OR NP` → 필터 없음
//! - `NP <op> NP` → 필터 없음

use crate::error::PxfResult;
use crate::filter::{Node, Operator, OperatorNode, OperatorSet, SupportedOperatorPruner, TreeVisitor};
use crate::types::ColumnDescriptor;
use ahash::AHashMap;
use tracing::trace;

const STRING_TYPE_NAME: &str = "string";
const INTEGRAL_TYPE_NAMES: [&str; 4] = ["tinyint", "smallint", "int", "bigint"];

pub struct HivePartitionPruner<'a> {
    operators: SupportedOperatorPruner,
    integral_pushdown: bool,
    /// Partition key name → Hive type name
    partition_keys: &'a AHashMap<String, String>,
    columns: &'a [ColumnDescriptor],
}

impl<'a> HivePartitionPruner<'a> {
    pub fn new(
        supported: OperatorSet,
        integral_pushdown: bool,
        partition_keys: &'a AHashMap<String, String>,
        columns: &'a [ColumnDescriptor],
    ) -> Self {
        Self {
            operators: SupportedOperatorPruner::new(supported),
            integral_pushdown,
            partition_keys,
            columns,
        }
    }

    /// Logical operators always pass; comparisons pass when they are on a
    /// string partition key, or on an integral one with `=`/`<>` when
    /// integral pushdown is enabled.
    fn can_push_down(&self, op: &OperatorNode) -> bool {
        if op.operator.is_logical() {
            return true;
        }
        let Some(column) = op.column_index().and_then(|i| self.columns.get(i)) else {
            return false;
        };
        let Some(key_type) = self.partition_keys.get(&column.name) else {
            trace!(column = %column.name, "not a partition column, ignoring filter");
            return false;
        };

        let integral_supported = self.integral_pushdown
            && matches!(op.operator, Operator::Equals | Operator::NotEquals);
        // integral type names are matched exactly, only `string` ignores case
        let can_push_down = key_type.eq_ignore_ascii_case(STRING_TYPE_NAME)
            || (integral_supported && INTEGRAL_TYPE_NAMES.contains(&key_type.as_str()));
        if !can_push_down {
            trace!(
                column = %column.name,
                key_type = %key_type,
                "partition column is not supported for push-down, ignoring filter"
            );
        }
        can_push_down
    }
}

impl TreeVisitor for HivePartitionPruner<'_> {
    fn visit(&mut self, node: Node, level: usize) -> PxfResult<Option<Node>> {
        if let Node::Operator(op) = &node {
            if !self.can_push_down(op) {
                return Ok(None);
            }
        }
        self.operators.visit(node, level)
    }

    fn after(&mut self, node: Node, level: usize) -> PxfResult<Option<Node>> {
        self.operators.after(node, level)
    }
}
