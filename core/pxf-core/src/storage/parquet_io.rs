//! Parquet file store for column batches.
//!
//! 쓰기: [`VectorizedRowBatch`] → RecordBatch → Parquet (코덱은 [`CompressionKind`]).
//! 읽기: 컬럼 projection과 search argument 기반 row group 건너뛰기 후 배치 단위로 디코딩.

use super::arrow_convert::{
    array_to_vector, batch_to_record_batch, from_arrow_schema, to_arrow_schema, to_arrow_type,
};
use super::compression::CompressionKind;
use super::row_group_filter::select_row_groups;
use crate::error::{PxfError, PxfResult};
use crate::orc::{Category, TypeDescription, VectorizedRowBatch};
use crate::sarg::SearchArgument;
use arrow::compute::cast;
use arrow::datatypes::{DataType as ArrowType, SchemaRef};
use arrow::record_batch::RecordBatchReader;
use parquet::arrow::ArrowWriter;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::file::metadata::ParquetMetaData;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Settings for a new file.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub compression: CompressionKind,
    /// Rows per row group; the Parquet default when `None`
    pub max_row_group_size: Option<usize>,
}

/// Appends batches of one schema to a new file.
pub struct ParquetWriter {
    writer: ArrowWriter<File>,
    schema: TypeDescription,
    arrow_schema: SchemaRef,
    rows: usize,
}

impl ParquetWriter {
    /// Create `path` (and missing parent directories) for batches of `schema`.
    pub fn create(path: &Path, schema: &TypeDescription, options: &WriteOptions) -> PxfResult<Self> {
        let arrow_schema = to_arrow_schema(schema)?;
        let mut props =
            WriterProperties::builder().set_compression(options.compression.to_parquet_compression()?);
        if let Some(size) = options.max_row_group_size {
            props = props.set_max_row_group_size(size);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let writer = ArrowWriter::try_new(file, Arc::clone(&arrow_schema), Some(props.build()))?;
        debug!(path = %path.display(), compression = %options.compression, "created file");
        Ok(Self {
            writer,
            schema: schema.clone(),
            arrow_schema,
            rows: 0,
        })
    }

    pub fn schema(&self) -> &TypeDescription {
        &self.schema
    }

    /// Append the first `batch.size` rows.
    pub fn write_batch(&mut self, batch: &VectorizedRowBatch) -> PxfResult<()> {
        if batch.size == 0 {
            return Ok(());
        }
        let record_batch = batch_to_record_batch(batch, &self.schema, &self.arrow_schema)?;
        self.writer.write(&record_batch)?;
        self.rows += batch.size;
        trace!(rows = batch.size, total = self.rows, "wrote batch");
        Ok(())
    }

    /// Finish the file; returns the number of rows written.
    pub fn close(self) -> PxfResult<usize> {
        self.writer.close()?;
        Ok(self.rows)
    }
}

/// What to read from an opened file.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Schema of the produced batches
    pub schema: TypeDescription,
    /// File field index per read-schema field
    pub columns: Vec<usize>,
    pub search_argument: Option<SearchArgument>,
    pub batch_size: usize,
    /// Fail instead of nulling decimal text that cannot be represented
    pub strict_decimal: bool,
}

/// An opened file: schema and footer metadata.
pub struct ParquetReader {
    path: PathBuf,
    schema: TypeDescription,
    metadata: Arc<ParquetMetaData>,
}

impl ParquetReader {
    pub fn open(path: &Path) -> PxfResult<Self> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
        let schema = from_arrow_schema(builder.schema())?;
        debug!(path = %path.display(), schema = %schema, "opened file");
        Ok(Self {
            path: path.to_path_buf(),
            schema,
            metadata: Arc::clone(builder.metadata()),
        })
    }

    /// File schema as an ORC struct.
    pub fn schema(&self) -> &TypeDescription {
        &self.schema
    }

    pub fn num_rows(&self) -> usize {
        usize::try_from(self.metadata.file_metadata().num_rows()).unwrap_or(0)
    }

    pub fn num_row_groups(&self) -> usize {
        self.metadata.num_row_groups()
    }

    /// Batches of the projected columns, skipping row groups the search argument rules out.
    pub fn rows(&self, options: ReadOptions) -> PxfResult<RecordReader> {
        let fields = self.schema.field_names();
        if options.columns.len() != options.schema.children().len() {
            return Err(PxfError::InvalidArguments(format!(
                "read schema has {} fields but {} file columns were given",
                options.schema.children().len(),
                options.columns.len()
            )));
        }
        if let Some(index) = options.columns.iter().find(|i| **i >= fields.len()) {
            return Err(PxfError::InvalidArguments(format!(
                "file column {} is out of range, {} has {} columns",
                index,
                self.path.display(),
                fields.len()
            )));
        }

        let mut builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&self.path)?)?
            .with_batch_size(options.batch_size.max(1));
        let mask = ProjectionMask::roots(builder.parquet_schema(), options.columns.iter().copied());
        builder = builder.with_projection(mask);
        if let Some(sarg) = &options.search_argument {
            let row_groups = select_row_groups(&self.metadata, &self.schema, sarg);
            builder = builder.with_row_groups(row_groups);
        }
        let inner = builder.build()?;

        // projected batches keep file order; find each read field by its file name
        let projected = inner.schema();
        let mut decoders = Vec::with_capacity(options.columns.len());
        for (index, orc_type) in options.columns.iter().zip(options.schema.children()) {
            let position = projected.index_of(&fields[*index])?;
            let target = if orc_type.category().is_primitive() || orc_type.category() == Category::List {
                Some(to_arrow_type(orc_type)?)
            } else {
                None
            };
            decoders.push((position, target));
        }

        Ok(RecordReader {
            inner,
            schema: options.schema,
            decoders,
            strict_decimal: options.strict_decimal,
            rows_read: 0,
        })
    }
}

/// Batch iterator over one file.
pub struct RecordReader {
    inner: ParquetRecordBatchReader,
    schema: TypeDescription,
    /// Projected column position and Arrow type per read field; composite fields are not decoded
    decoders: Vec<(usize, Option<ArrowType>)>,
    strict_decimal: bool,
    rows_read: usize,
}

impl RecordReader {
    pub fn schema(&self) -> &TypeDescription {
        &self.schema
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Fill `batch` with the next rows; `false` once the file is exhausted.
    pub fn next_batch(&mut self, batch: &mut VectorizedRowBatch) -> PxfResult<bool> {
        batch.reset();
        let Some(record_batch) = self.inner.next().transpose()? else {
            return Ok(false);
        };

        let fields = self.schema.children();
        for (i, ((position, target), orc_type)) in self.decoders.iter().zip(fields).enumerate() {
            let Some(target) = target else {
                continue;
            };
            let column = record_batch.column(*position);
            let column = if column.data_type() == target {
                Arc::clone(column)
            } else {
                cast(column, target)?
            };
            let num_cols = batch.num_cols();
            let vector = batch.cols.get_mut(i).ok_or_else(|| {
                PxfError::IllegalState(format!(
                    "batch has {} columns, the read schema has {}",
                    num_cols,
                    fields.len()
                ))
            })?;
            array_to_vector(column.as_ref(), orc_type, vector, self.strict_decimal)?;
        }
        batch.size = record_batch.num_rows();
        self.rows_read += batch.size;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orc::VectorData;
    use crate::sarg::{LeafType, Literal};
    use tempfile::TempDir;

    fn schema() -> TypeDescription {
        "struct<id:bigint,name:string,score:double>".parse().unwrap()
    }

    fn fill(batch: &mut VectorizedRowBatch, start: i64, rows: usize) {
        batch.reset();
        for row in 0..rows {
            let id = start + row as i64;
            if let VectorData::Long(v) = &mut batch.cols[0].data {
                v[row] = id;
            }
            if let VectorData::Bytes(b) = &mut batch.cols[1].data {
                b.set_val(row, format!("name_{}", id).as_bytes());
            }
            if let VectorData::Double(v) = &mut batch.cols[2].data {
                v[row] = id as f64 * 0.5;
            }
        }
        batch.cols[2].set_null(0);
        batch.size = rows;
    }

    fn write_file(dir: &TempDir, options: &WriteOptions) -> PathBuf {
        let path = dir.path().join("nested").join("part-0.parquet");
        let mut writer = ParquetWriter::create(&path, &schema(), options).unwrap();
        let mut batch = VectorizedRowBatch::for_schema(&schema(), 10);
        for start in [0, 10, 20] {
            fill(&mut batch, start, 10);
            writer.write_batch(&batch).unwrap();
        }
        batch.reset();
        writer.write_batch(&batch).unwrap();
        assert_eq!(writer.close().unwrap(), 30);
        path
    }

    fn read_all(reader: &ParquetReader, options: ReadOptions) -> Vec<i64> {
        let mut batch = VectorizedRowBatch::for_schema(&options.schema, options.batch_size);
        let mut records = reader.rows(options).unwrap();
        let mut ids = Vec::new();
        while records.next_batch(&mut batch).unwrap() {
            if let VectorData::Long(v) = &batch.cols[0].data {
                ids.extend_from_slice(&v[..batch.size]);
            }
        }
        ids
    }

    #[test]
    fn write_then_read_projection() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, &WriteOptions::default());

        let reader = ParquetReader::open(&path).unwrap();
        assert_eq!(reader.schema(), &schema());
        assert_eq!(reader.num_rows(), 30);

        // read score and id, in that order
        let read_schema: TypeDescription = "struct<score:double,id:bigint>".parse().unwrap();
        let options = ReadOptions {
            schema: read_schema.clone(),
            columns: vec![2, 0],
            search_argument: None,
            batch_size: 8,
            strict_decimal: false,
        };
        let mut batch = VectorizedRowBatch::for_schema(&read_schema, 8);
        let mut records = reader.rows(options).unwrap();
        assert!(records.next_batch(&mut batch).unwrap());
        assert_eq!(batch.size, 8);
        assert!(batch.cols[0].is_null_at(0));
        assert!(matches!(&batch.cols[0].data, VectorData::Double(v) if v[3] == 1.5));
        assert!(matches!(&batch.cols[1].data, VectorData::Long(v) if v[3] == 3));

        let mut total = batch.size;
        while records.next_batch(&mut batch).unwrap() {
            total += batch.size;
        }
        assert_eq!(total, 30);
        assert_eq!(records.rows_read(), 30);
        assert_eq!(batch.size, 0);
    }

    #[test]
    fn search_argument_skips_row_groups() {
        let dir = TempDir::new().unwrap();
        let options = WriteOptions {
            compression: CompressionKind::Snappy,
            max_row_group_size: Some(10),
        };
        let path = write_file(&dir, &options);
        let reader = ParquetReader::open(&path).unwrap();
        assert_eq!(reader.num_row_groups(), 3);

        let mut builder = SearchArgument::builder();
        builder.equals("id", LeafType::Long, Literal::Long(25));
        let ids = read_all(
            &reader,
            ReadOptions {
                schema: "struct<id:bigint>".parse().unwrap(),
                columns: vec![0],
                search_argument: Some(builder.build().unwrap()),
                batch_size: 100,
                strict_decimal: false,
            },
        );
        // whole row group, row-level filtering is left to the engine
        assert_eq!(ids, (20..30).collect::<Vec<_>>());
    }

    #[test]
    fn every_codec_but_lzo() {
        let dir = TempDir::new().unwrap();
        for kind in CompressionKind::ALL {
            let path = dir.path().join(format!("{}.parquet", kind));
            let options = WriteOptions {
                compression: *kind,
                max_row_group_size: None,
            };
            let created = ParquetWriter::create(&path, &schema(), &options);
            if *kind == CompressionKind::Lzo {
                assert!(created.is_err());
                continue;
            }
            let mut writer = created.unwrap();
            let mut batch = VectorizedRowBatch::for_schema(&schema(), 4);
            fill(&mut batch, 0, 4);
            writer.write_batch(&batch).unwrap();
            writer.close().unwrap();
            assert_eq!(ParquetReader::open(&path).unwrap().num_rows(), 4);
        }
    }

    #[test]
    fn invalid_projection() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, &WriteOptions::default());
        let reader = ParquetReader::open(&path).unwrap();

        let options = ReadOptions {
            schema: "struct<id:bigint>".parse().unwrap(),
            columns: vec![7],
            search_argument: None,
            batch_size: 10,
            strict_decimal: false,
        };
        assert!(matches!(reader.rows(options), Err(PxfError::InvalidArguments(_))));

        let options = ReadOptions {
            schema: "struct<id:bigint>".parse().unwrap(),
            columns: vec![0, 1],
            search_argument: None,
            batch_size: 10,
            strict_decimal: false,
        };
        assert!(reader.rows(options).is_err());
    }

    #[test]
    fn missing_file() {
        let dir = TempDir::new().unwrap();
        let err = ParquetReader::open(&dir.path().join("absent.parquet")).err().unwrap();
        assert!(matches!(err, PxfError::Io { .. }));
    }
}
