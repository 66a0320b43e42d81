//! 필터 트리: 파싱, 순회, 가지치기, 렌더링
//!
//! 엔진이 보낸 직렬화된 필터 문자열을 [`Node`] 트리로 파싱하고,
//! [`TreeVisitor`] 체인으로 지원되지 않는 조건을 제거한 뒤 문자열이나
//! search argument로 변환합니다.

mod bpchar;
mod node;
mod operator;
mod parser;
mod pruner;
mod render;
mod traverser;


pub use bpchar::BpCharOperatorTransformer;
pub use node::{CollectionOperand, Node, OperatorNode, ScalarOperand, ValueOperand};
pub use operator::{Operator, OperatorSet};
pub use parser::{parse, FilterParser};
pub use pruner::{SupportedDataTypePruner, SupportedOperatorPruner};
pub use render::PredicateRenderer;
pub use traverser::{traverse, traverse_all, TreeVisitor};
