//! ORC 컬럼 벡터 해석: vectorized column resolution
//!
//! - [`TypeDescription`]: ORC 타입 트리와 타입 문자열
//! - [`OrcSchemaBuilder`]: 테이블 컬럼 → 쓰기 스키마
//! - [`VectorizedRowBatch`] / [`ColumnVector`]: 배치 버퍼
//! - [`OrcVectorizedResolver`]: 배치 ↔ 행 변환
//! - [`OrcVectorizedAccessor`]: 파일 열기, 배치 읽기/쓰기

pub mod accessor;
pub mod mapping;
pub mod resolver;
pub mod schema_builder;
pub mod type_description;
pub mod utilities;
pub mod vector;


pub use accessor::OrcVectorizedAccessor;
pub use mapping::{ColumnReader, ColumnWriter};
pub use resolver::{OrcVectorizedResolver, MAP_BY_POSITION_OPTION};
pub use schema_builder::OrcSchemaBuilder;
pub use type_description::{Category, TypeDescription};
pub use vector::{BytesVector, ColumnVector, ListVector, TimestampVector, VectorData, VectorizedRowBatch};
