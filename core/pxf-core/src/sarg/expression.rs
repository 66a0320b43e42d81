//! Three-valued logic and the normalized expression tree of a search argument.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of OR clauses produced when distributing OR over AND.
pub const CNF_COMBINATIONS_THRESHOLD: usize = 256;

/// Possible outcomes of a predicate over a set of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TruthValue {
    Yes,
    No,
    Null,
    YesNull,
    NoNull,
    YesNo,
    YesNoNull,
}

impl TruthValue {
    pub fn not(self) -> TruthValue {
        match self {
            TruthValue::Yes => TruthValue::No,
            TruthValue::No => TruthValue::Yes,
            TruthValue::YesNull => TruthValue::NoNull,
            TruthValue::NoNull => TruthValue::YesNull,
            TruthValue::Null | TruthValue::YesNo | TruthValue::YesNoNull => self,
        }
    }

    pub fn and(self, right: TruthValue) -> TruthValue {
        use TruthValue::*;
        if right == self {
            return self;
        }
        if right == No || self == No {
            return No;
        }
        if right == NoNull || self == NoNull {
            return NoNull;
        }
        if right == Yes {
            return self;
        }
        if self == Yes {
            return right;
        }
        if self == Null {
            return if right == YesNull { Null } else { NoNull };
        }
        if right == Null {
            return if self == YesNull { Null } else { NoNull };
        }
        YesNoNull
    }

    pub fn or(self, right: TruthValue) -> TruthValue {
        use TruthValue::*;
        if right == self {
            return self;
        }
        if right == Yes || self == Yes {
            return Yes;
        }
        if right == YesNull || self == YesNull {
            return YesNull;
        }
        if right == No {
            return self;
        }
        if self == No {
            return right;
        }
        if self == Null {
            return if right == NoNull { Null } else { YesNull };
        }
        if right == Null {
            return if self == NoNull { Null } else { YesNull };
        }
        YesNoNull
    }

    /// Whether rows described by this value may satisfy the predicate.
    pub fn is_needed(self) -> bool {
        !matches!(self, TruthValue::No | TruthValue::Null | TruthValue::NoNull)
    }

    /// Add the possibility of a null outcome.
    pub(crate) fn with_null(self, has_null: bool) -> TruthValue {
        if !has_null {
            return self;
        }
        match self {
            TruthValue::Yes => TruthValue::YesNull,
            TruthValue::No => TruthValue::NoNull,
            TruthValue::YesNo => TruthValue::YesNoNull,
            other => other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TruthValue::Yes => "YES",
            TruthValue::No => "NO",
            TruthValue::Null => "NULL",
            TruthValue::YesNull => "YES_NULL",
            TruthValue::NoNull => "NO_NULL",
            TruthValue::YesNo => "YES_NO",
            TruthValue::YesNoNull => "YES_NO_NULL",
        }
    }
}

impl fmt::Display for TruthValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Boolean expression over predicate leaves, referenced by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpressionTree {
    And(Vec<ExpressionTree>),
    Or(Vec<ExpressionTree>),
    Not(Box<ExpressionTree>),
    Leaf(usize),
    Constant(TruthValue),
}

impl ExpressionTree {
    pub const MAYBE: ExpressionTree = ExpressionTree::Constant(TruthValue::YesNoNull);

    pub fn not(child: ExpressionTree) -> ExpressionTree {
        ExpressionTree::Not(Box::new(child))
    }

    fn is_maybe(&self) -> bool {
        matches!(self, ExpressionTree::Constant(TruthValue::YesNoNull))
    }

    /// Evaluate with the truth value of each leaf.
    pub fn evaluate(&self, leaves: &[TruthValue]) -> TruthValue {
        match self {
            ExpressionTree::And(children) => children
                .iter()
                .map(|c| c.evaluate(leaves))
                .reduce(TruthValue::and)
                .unwrap_or(TruthValue::YesNoNull),
            ExpressionTree::Or(children) => children
                .iter()
                .map(|c| c.evaluate(leaves))
                .reduce(TruthValue::or)
                .unwrap_or(TruthValue::YesNoNull),
            ExpressionTree::Not(child) => child.evaluate(leaves).not(),
            ExpressionTree::Leaf(leaf) => leaves
                .get(*leaf)
                .copied()
                .unwrap_or(TruthValue::YesNoNull),
            ExpressionTree::Constant(value) => *value,
        }
    }

    /// Move negations down to the leaves using De Morgan's laws.
    pub(crate) fn push_down_not(self) -> ExpressionTree {
        match self {
            ExpressionTree::Not(child) => match *child {
                ExpressionTree::Not(grandchild) => grandchild.push_down_not(),
                ExpressionTree::Constant(value) => ExpressionTree::Constant(value.not()),
                ExpressionTree::And(kids) => ExpressionTree::Or(
                    kids.into_iter()
                        .map(|kid| ExpressionTree::not(kid).push_down_not())
                        .collect(),
                ),
                ExpressionTree::Or(kids) => ExpressionTree::And(
                    kids.into_iter()
                        .map(|kid| ExpressionTree::not(kid).push_down_not())
                        .collect(),
                ),
                leaf @ ExpressionTree::Leaf(_) => ExpressionTree::not(leaf),
            },
            ExpressionTree::And(kids) => {
                ExpressionTree::And(kids.into_iter().map(Self::push_down_not).collect())
            }
            ExpressionTree::Or(kids) => {
                ExpressionTree::Or(kids.into_iter().map(Self::push_down_not).collect())
            }
            other => other,
        }
    }

    /// Drop "maybe" constants from AND, let them absorb OR.
    pub(crate) fn fold_maybe(self) -> ExpressionTree {
        match self {
            ExpressionTree::And(kids) => {
                let mut folded = Vec::with_capacity(kids.len());
                for kid in kids {
                    let kid = kid.fold_maybe();
                    if !kid.is_maybe() {
                        folded.push(kid);
                    }
                }
                if folded.is_empty() {
                    ExpressionTree::MAYBE
                } else {
                    ExpressionTree::And(folded)
                }
            }
            ExpressionTree::Or(kids) => {
                let mut folded = Vec::with_capacity(kids.len());
                for kid in kids {
                    let kid = kid.fold_maybe();
                    if kid.is_maybe() {
                        return kid;
                    }
                    folded.push(kid);
                }
                if folded.is_empty() {
                    ExpressionTree::MAYBE
                } else {
                    ExpressionTree::Or(folded)
                }
            }
            ExpressionTree::Not(child) => ExpressionTree::not(child.fold_maybe()),
            other => other,
        }
    }

    /// Splice nested AND/OR into their parent and unwrap singletons.
    pub(crate) fn flatten(self) -> ExpressionTree {
        match self {
            ExpressionTree::And(kids) => {
                let mut flat = Vec::with_capacity(kids.len());
                for kid in kids {
                    match kid.flatten() {
                        ExpressionTree::And(grandkids) => flat.extend(grandkids),
                        other => flat.push(other),
                    }
                }
                Self::unwrap_singleton(flat, ExpressionTree::And)
            }
            ExpressionTree::Or(kids) => {
                let mut flat = Vec::with_capacity(kids.len());
                for kid in kids {
                    match kid.flatten() {
                        ExpressionTree::Or(grandkids) => flat.extend(grandkids),
                        other => flat.push(other),
                    }
                }
                Self::unwrap_singleton(flat, ExpressionTree::Or)
            }
            ExpressionTree::Not(child) => ExpressionTree::not(child.flatten()),
            other => other,
        }
    }

    fn unwrap_singleton(
        mut kids: Vec<ExpressionTree>,
        wrap: fn(Vec<ExpressionTree>) -> ExpressionTree,
    ) -> ExpressionTree {
        if kids.len() == 1 {
            kids.remove(0)
        } else {
            wrap(kids)
        }
    }

    /// Conjunctive normal form; too many combinations degrade to "maybe".
    pub(crate) fn convert_to_cnf(self) -> ExpressionTree {
        match self {
            ExpressionTree::And(kids) => {
                ExpressionTree::And(kids.into_iter().map(Self::convert_to_cnf).collect())
            }
            ExpressionTree::Not(child) => ExpressionTree::not(child.convert_to_cnf()),
            ExpressionTree::Or(kids) => {
                let kids: Vec<ExpressionTree> =
                    kids.into_iter().map(Self::convert_to_cnf).collect();
                let mut non_and = Vec::new();
                let mut and_list = Vec::new();
                for kid in kids {
                    match kid {
                        ExpressionTree::And(grandkids) => and_list.push(grandkids),
                        ExpressionTree::Or(grandkids) => non_and.extend(grandkids),
                        other => non_and.push(other),
                    }
                }
                if and_list.is_empty() {
                    return ExpressionTree::Or(non_and);
                }
                if !within_combination_threshold(&and_list) {
                    return ExpressionTree::MAYBE;
                }
                ExpressionTree::And(all_combinations(&and_list, &non_and))
            }
            other => other,
        }
    }

    /// Renumber leaves in depth-first order of first use.
    pub(crate) fn compact_leaves(&self, next: &mut usize, reorder: &mut [Option<usize>]) {
        match self {
            ExpressionTree::Leaf(leaf) => {
                if let Some(slot) = reorder.get_mut(*leaf) {
                    if slot.is_none() {
                        *slot = Some(*next);
                        *next += 1;
                    }
                }
            }
            ExpressionTree::And(kids) | ExpressionTree::Or(kids) => {
                for kid in kids {
                    kid.compact_leaves(next, reorder);
                }
            }
            ExpressionTree::Not(child) => child.compact_leaves(next, reorder),
            ExpressionTree::Constant(_) => {}
        }
    }

    pub(crate) fn rewrite_leaves(self, reorder: &[Option<usize>]) -> ExpressionTree {
        match self {
            ExpressionTree::Leaf(leaf) => {
                ExpressionTree::Leaf(reorder.get(leaf).copied().flatten().unwrap_or(leaf))
            }
            ExpressionTree::And(kids) => ExpressionTree::And(
                kids.into_iter().map(|k| k.rewrite_leaves(reorder)).collect(),
            ),
            ExpressionTree::Or(kids) => ExpressionTree::Or(
                kids.into_iter().map(|k| k.rewrite_leaves(reorder)).collect(),
            ),
            ExpressionTree::Not(child) => ExpressionTree::not(child.rewrite_leaves(reorder)),
            constant => constant,
        }
    }
}

fn within_combination_threshold(and_list: &[Vec<ExpressionTree>]) -> bool {
    let mut combinations: usize = 1;
    for kids in and_list {
        combinations = combinations.saturating_mul(kids.len());
        if combinations > CNF_COMBINATIONS_THRESHOLD {
            return false;
        }
    }
    true
}

/// One OR per choice of a child from every AND, each prefixed by the non-AND terms.
fn all_combinations(
    and_list: &[Vec<ExpressionTree>],
    non_and: &[ExpressionTree],
) -> Vec<ExpressionTree> {
    let mut result: Vec<Vec<ExpressionTree>> = Vec::new();
    for (position, kids) in and_list.iter().enumerate() {
        if position == 0 {
            for kid in kids {
                let mut or = non_and.to_vec();
                or.push(kid.clone());
                result.push(or);
            }
        } else {
            let work = std::mem::take(&mut result);
            for kid in kids {
                for or in &work {
                    let mut copy = or.clone();
                    copy.push(kid.clone());
                    result.push(copy);
                }
            }
        }
    }
    result.into_iter().map(ExpressionTree::Or).collect()
}

impl fmt::Display for ExpressionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionTree::And(kids) | ExpressionTree::Or(kids) => {
                let name = if matches!(self, ExpressionTree::And(_)) {
                    "and"
                } else {
                    "or"
                };
                write!(f, "({}", name)?;
                for kid in kids {
                    write!(f, " {}", kid)?;
                }
                f.write_str(")")
            }
            ExpressionTree::Not(child) => write!(f, "(not {})", child),
            ExpressionTree::Leaf(leaf) => write!(f, "leaf-{}", leaf),
            ExpressionTree::Constant(value) => write!(f, "{}", value),
        }
    }
}
