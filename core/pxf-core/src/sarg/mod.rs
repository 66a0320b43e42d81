//! Search argument: 스토리지 단위(stripe / row group) 건너뛰기용 술어
//!
//! 필터 트리를 [`SearchArgumentVisitor`]로 [`SearchArgumentBuilder`]에 옮기고,
//! `build()`가 NOT push-down → flatten → CNF 변환으로 정규화합니다.
//! 결과는 min/max/null 통계에 대해 YES / NO / MAYBE로 평가할 수 있습니다.

mod builder;
mod expression;
mod leaf;
mod visitor;

#[cfg(test)]
mod tests;

pub use builder::SearchArgumentBuilder;
pub use expression::{ExpressionTree, TruthValue, CNF_COMBINATIONS_THRESHOLD};
pub use leaf::{ColumnStatistics, LeafOperator, LeafType, Literal, PredicateLeaf};
pub use visitor::{convert_literal, SearchArgumentVisitor};

use crate::error::{PxfError, PxfResult};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized predicate: deduplicated leaves plus a CNF expression over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchArgument {
    leaves: Vec<PredicateLeaf>,
    expression: ExpressionTree,
}

impl SearchArgument {
    pub(crate) fn new(leaves: Vec<PredicateLeaf>, expression: ExpressionTree) -> Self {
        Self { leaves, expression }
    }

    pub fn builder() -> SearchArgumentBuilder {
        SearchArgumentBuilder::new()
    }

    pub fn leaves(&self) -> &[PredicateLeaf] {
        &self.leaves
    }

    pub fn expression(&self) -> &ExpressionTree {
        &self.expression
    }

    /// Evaluate with precomputed leaf values, in leaf order.
    pub fn evaluate(&self, leaf_values: &[TruthValue]) -> TruthValue {
        self.expression.evaluate(leaf_values)
    }

    /// Evaluate against per-column statistics looked up by column name.
    pub fn evaluate_statistics<'s, F>(&self, statistics: F) -> TruthValue
    where
        F: Fn(&str) -> Option<&'s ColumnStatistics>,
    {
        let values: Vec<TruthValue> = self
            .leaves
            .iter()
            .map(|leaf| leaf.evaluate(statistics(&leaf.column)))
            .collect();
        self.evaluate(&values)
    }

    pub fn to_bytes(&self) -> PxfResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> PxfResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Base64 of the bincode form, for passing through string-valued options.
    pub fn to_base64(&self) -> PxfResult<String> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    pub fn from_base64(encoded: &str) -> PxfResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| PxfError::Serialization(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for SearchArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, leaf) in self.leaves.iter().enumerate() {
            write!(f, "leaf-{} = {}, ", i, leaf)?;
        }
        write!(f, "expr = {}", self.expression)
    }
}
