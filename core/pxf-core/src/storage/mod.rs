//! 컬럼 파일 저장소: Parquet-backed column store
//!
//! ORC 배치를 Arrow RecordBatch로 옮겨 Parquet 파일에 쓰고, 읽을 때는
//! projection과 row group 통계 기반 건너뛰기를 적용합니다.

pub mod arrow_convert;
pub mod compression;
pub mod parquet_io;
pub mod row_group_filter;

pub use arrow_convert::{from_arrow_schema, to_arrow_schema, ORC_TYPE_KEY};
pub use compression::CompressionKind;
pub use parquet_io::{ParquetReader, ParquetWriter, ReadOptions, RecordReader, WriteOptions};
pub use row_group_filter::{select_row_groups, RowGroupFilter};
