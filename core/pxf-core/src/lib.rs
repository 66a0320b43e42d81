//! # PXF Core: Vectorized ORC Resolution and Hive Pushdown
//!
//! PXF Core는 외부 컬럼형 파일을 Greenplum 행으로 변환하고, 엔진이 보낸 필터를
//! 스토리지와 메타스토어가 이해할 수 있는 형태로 내려보내는 라이브러리입니다.
//! 컬럼 파일은 Apache Arrow / Parquet 위에 ORC 타입 체계로 저장됩니다.
//!
//! ## 주요 특징
//!
//! - **Vectorized resolution**: ORC 컬럼 벡터 배치 ↔ 행 필드 (읽기/쓰기)
//! - **Filter tree**: 직렬화된 필터 파싱, 가지치기, 문자열 렌더링
//! - **Search argument**: row group 통계 기반 건너뛰기
//! - **Hive pushdown**: 파티션 필터 문자열, 프래그먼트 단위 파티션 배제
//!
//! ## 빠른 시작
//!
//! ### 파티션 필터
//!
//! ```rust
//! use ahash::AHashMap;
//! use pxf_core::hive::HivePartitionFilterBuilder;
//! use pxf_core::types::{ColumnDescriptor, DataType};
//!
//! # fn main() -> pxf_core::PxfResult<()> {
//! let columns = vec![
//!     ColumnDescriptor::new("t1", DataType::Text, 0),
//!     ColumnDescriptor::new("fmt", DataType::Text, 1),
//! ];
//! let mut keys = AHashMap::new();
//! keys.insert("fmt".to_string(), "string".to_string());
//!
//! // t1 = 'row1' AND fmt = 'seq'
//! let filter = HivePartitionFilterBuilder::new(&columns, &keys)
//!     .build_filter_string(Some("a0c25s4drow1o5a1c25s3dseqo5l0"))?;
//! assert_eq!(filter, "fmt = \"seq\"");
//! # Ok(())
//! # }
//! ```
//!
//! ### 읽기 파이프라인
//!
//! ```text
//! Fragment → Accessor (open, projection, search argument) → VectorizedRowBatch
//!          → Resolver → Vec<OneField> rows
//! ```
//!
//! ## 모듈 구조
//!
//! - [`filter`]: 필터 트리 파서, visitor, pruner, renderer
//! - [`sarg`]: search argument 빌더와 평가
//! - [`orc`]: ORC 타입, 컬럼 벡터, accessor, resolver
//! - [`storage`]: Parquet 기반 컬럼 파일 저장소
//! - [`hive`]: Hive 메타스토어, fragmenter, 파티션 pushdown

pub mod config;
pub mod context;
pub mod datetime;
pub mod decimal;
pub mod error;
pub mod filter;
pub mod hive;
pub mod orc;
pub mod pg;
pub mod sarg;
pub mod storage;
pub mod types;

// Logging utilities
pub mod logging;

// Re-export commonly used types
pub use config::PxfConfig;
pub use context::RequestContext;
pub use error::{PxfError, PxfResult};
