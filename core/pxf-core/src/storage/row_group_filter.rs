//! Row-group skipping driven by a search argument.
//!
//! 각 row group의 컬럼 청크 통계(min/max/null count)를 [`ColumnStatistics`]로
//! 바꿔 search argument를 평가하고, 결과가 `NO` 계열이면 해당 row group을 건너뜁니다.

use crate::orc::{Category, TypeDescription};
use crate::sarg::{ColumnStatistics, Literal, SearchArgument};
use ahash::AHashMap;
use chrono::DateTime;
use parquet::file::metadata::{ColumnChunkMetaData, ParquetMetaData, RowGroupMetaData};
use parquet::file::statistics::Statistics;
use tracing::debug;

/// Statistics of the top-level primitive columns of one row group.
pub struct RowGroupFilter<'a> {
    statistics: AHashMap<&'a str, ColumnStatistics>,
}

impl<'a> RowGroupFilter<'a> {
    /// Collect statistics for the fields of `schema` present in `row_group`.
    pub fn new(row_group: &'a RowGroupMetaData, schema: &'a TypeDescription) -> Self {
        let chunks: AHashMap<&str, &ColumnChunkMetaData> = row_group
            .columns()
            .iter()
            .filter_map(|chunk| match chunk.column_path().parts() {
                [name] => Some((name.as_str(), chunk)),
                _ => None,
            })
            .collect();

        let statistics = schema
            .field_names()
            .iter()
            .zip(schema.children())
            .filter_map(|(name, orc_type)| {
                let chunk = chunks.get(name.as_str())?;
                Some((name.as_str(), column_statistics(chunk, orc_type)?))
            })
            .collect();
        Self { statistics }
    }

    /// Whether rows of this row group may satisfy `sarg`.
    pub fn apply(&self, sarg: &SearchArgument) -> bool {
        sarg.evaluate_statistics(|column| self.statistics.get(column))
            .is_needed()
    }
}

/// Ordinals of the row groups that may hold matching rows.
pub fn select_row_groups(
    metadata: &ParquetMetaData,
    schema: &TypeDescription,
    sarg: &SearchArgument,
) -> Vec<usize> {
    let selected: Vec<usize> = metadata
        .row_groups()
        .iter()
        .enumerate()
        .filter(|(_, row_group)| RowGroupFilter::new(row_group, schema).apply(sarg))
        .map(|(ordinal, _)| ordinal)
        .collect();
    debug!(
        "with row groups {:?} of {}",
        selected,
        metadata.num_row_groups()
    );
    selected
}

fn column_statistics(
    chunk: &ColumnChunkMetaData,
    orc_type: &TypeDescription,
) -> Option<ColumnStatistics> {
    chunk_statistics(chunk.statistics()?, chunk.num_values(), orc_type)
}

/// Chunk statistics as literals of the column's ORC type; `None` when unusable.
///
/// Missing bounds only mean something when the null count covers every value
/// of the chunk. Otherwise nothing is known and the row group is kept.
fn chunk_statistics(
    stats: &Statistics,
    num_values: i64,
    orc_type: &TypeDescription,
) -> Option<ColumnStatistics> {
    let has_null = stats.null_count_opt().is_none_or(|nulls| nulls > 0);

    macro_rules! bounds {
        ($s:expr, $literal:expr) => {
            ($s.min_opt().map($literal), $s.max_opt().map($literal))
        };
    }

    let (min, max) = match (orc_type.category(), stats) {
        (Category::Boolean, Statistics::Boolean(s)) => bounds!(s, |v: &bool| Literal::Boolean(*v)),
        (
            Category::Byte | Category::Short | Category::Int | Category::Long,
            Statistics::Int32(s),
        ) => bounds!(s, |v: &i32| Literal::Long(i64::from(*v))),
        (Category::Long, Statistics::Int64(s)) => bounds!(s, |v: &i64| Literal::Long(*v)),
        (Category::Date, Statistics::Int32(s)) => bounds!(s, |v: &i32| Literal::Date(*v)),
        (Category::Float, Statistics::Float(s)) => {
            bounds!(s, |v: &f32| Literal::Float(f64::from(*v)))
        }
        (Category::Double, Statistics::Double(s)) => bounds!(s, |v: &f64| Literal::Float(*v)),
        (Category::Timestamp | Category::TimestampInstant, Statistics::Int64(s)) => {
            bounds!(s, |v: &i64| Literal::Timestamp(DateTime::from_timestamp_nanos(*v)))
        }
        (Category::String | Category::Char | Category::Varchar, Statistics::ByteArray(s)) => {
            let text = |v: &parquet::data_type::ByteArray| {
                v.as_utf8().ok().map(|t| Literal::String(t.to_string()))
            };
            (s.min_opt().and_then(text), s.max_opt().and_then(text))
        }
        // decimal text does not order numerically; binary is never a leaf
        _ => return None,
    };
    if min.is_none() || max.is_none() {
        let all_null = stats
            .null_count_opt()
            .is_some_and(|nulls| i64::try_from(nulls).is_ok_and(|n| n == num_values));
        if !all_null {
            return None;
        }
    }
    Some(ColumnStatistics { min, max, has_null })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sarg::LeafType;
    use arrow::array::{Int32Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use parquet::file::properties::WriterProperties;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    /// Three row groups: ids 0..10, 10..20, 20..30; names null in the last one.
    fn write_file() -> (NamedTempFile, Arc<ParquetMetaData>) {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, true),
            Field::new("name", DataType::Utf8, true),
        ]));
        let tmp = NamedTempFile::new().unwrap();
        let props = WriterProperties::builder().set_max_row_group_size(10).build();
        let mut writer =
            ArrowWriter::try_new(tmp.reopen().unwrap(), Arc::clone(&schema), Some(props)).unwrap();
        for group in 0..3 {
            let ids: Vec<i32> = (group * 10..group * 10 + 10).collect();
            let names: Vec<Option<String>> = ids
                .iter()
                .map(|id| (group < 2).then(|| format!("n{:02}", id)))
                .collect();
            let batch = RecordBatch::try_new(
                Arc::clone(&schema),
                vec![
                    Arc::new(Int32Array::from(ids)),
                    Arc::new(StringArray::from(names)),
                ],
            )
            .unwrap();
            writer.write(&batch).unwrap();
        }
        writer.close().unwrap();

        let builder = ParquetRecordBatchReaderBuilder::try_new(tmp.reopen().unwrap()).unwrap();
        let metadata = Arc::clone(builder.metadata());
        (tmp, metadata)
    }

    fn orc_schema() -> TypeDescription {
        "struct<id:int,name:string>".parse().unwrap()
    }

    #[test]
    fn equality_keeps_one_row_group() {
        let (_tmp, metadata) = write_file();
        assert_eq!(metadata.num_row_groups(), 3);

        let mut builder = SearchArgument::builder();
        builder.equals("id", LeafType::Long, Literal::Long(15));
        let sarg = builder.build().unwrap();
        assert_eq!(select_row_groups(&metadata, &orc_schema(), &sarg), vec![1]);
    }

    #[test]
    fn range_and_strings() {
        let (_tmp, metadata) = write_file();

        let mut builder = SearchArgument::builder();
        builder.less_than("id", LeafType::Long, Literal::Long(10));
        let sarg = builder.build().unwrap();
        assert_eq!(select_row_groups(&metadata, &orc_schema(), &sarg), vec![0]);

        let mut builder = SearchArgument::builder();
        builder.equals("name", LeafType::String, Literal::String("n12".into()));
        let sarg = builder.build().unwrap();
        assert_eq!(select_row_groups(&metadata, &orc_schema(), &sarg), vec![1]);
    }

    #[test]
    fn null_only_row_group() {
        let (_tmp, metadata) = write_file();

        let mut builder = SearchArgument::builder();
        builder.is_null("name", LeafType::String);
        let sarg = builder.build().unwrap();
        assert_eq!(select_row_groups(&metadata, &orc_schema(), &sarg), vec![2]);
    }

    #[test]
    fn chunk_without_bounds_or_null_count_is_kept() {
        let int = TypeDescription::new(Category::Int);
        let unknown = Statistics::int32(None, None, None, None, false);
        assert!(chunk_statistics(&unknown, 10, &int).is_none());

        // no bounds and fewer nulls than values: still unknown
        let partial = Statistics::int32(None, None, None, Some(4), false);
        assert!(chunk_statistics(&partial, 10, &int).is_none());

        let mut builder = SearchArgument::builder();
        builder.equals("id", LeafType::Long, Literal::Long(15));
        let sarg = builder.build().unwrap();
        let filter = RowGroupFilter {
            statistics: AHashMap::new(),
        };
        assert!(filter.apply(&sarg));
    }

    #[test]
    fn all_null_chunk_keeps_only_null_checks() {
        let int = TypeDescription::new(Category::Int);
        let all_null = Statistics::int32(None, None, None, Some(10), false);
        let stats = chunk_statistics(&all_null, 10, &int).unwrap();
        assert!(stats.has_null);

        let filter = RowGroupFilter {
            statistics: [("id", stats)].into_iter().collect(),
        };
        let mut builder = SearchArgument::builder();
        builder.equals("id", LeafType::Long, Literal::Long(15));
        assert!(!filter.apply(&builder.build().unwrap()));

        let mut builder = SearchArgument::builder();
        builder.is_null("id", LeafType::Long);
        assert!(filter.apply(&builder.build().unwrap()));
    }

    #[test]
    fn unknown_column_keeps_everything() {
        let (_tmp, metadata) = write_file();

        let mut builder = SearchArgument::builder();
        builder.equals("missing", LeafType::Long, Literal::Long(1));
        let sarg = builder.build().unwrap();
        assert_eq!(select_row_groups(&metadata, &orc_schema(), &sarg), vec![0, 1, 2]);
    }
}
