//! In-memory tables parsed from cached CSV files

use crate::error::{Error, Result};
use arrow::{
    array::ArrayRef,
    compute::concat_batches,
    csv::{reader::Format, ReaderBuilder},
    datatypes::SchemaRef,
    record_batch::RecordBatch,
    util::pretty::pretty_format_batches,
};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{
    fmt,
    fs::{self, File},
    io::{BufRead, BufReader},
    path::Path,
    sync::Arc,
};
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const BATCH_SIZE: usize = 8_192;

/// Named, ordered columns over an ordered sequence of rows.
///
/// Column types are inferred from the whole file: numeric columns come out
/// as integers or floats, everything else as strings.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    batch: RecordBatch,
}

impl Table {
    /// Parse a CSV file with a header row.
    pub fn read_csv(path: &Path, delimiter: u8) -> Result<Self> {
        let csv_err = |source| Error::Csv {
            path: path.to_path_buf(),
            source,
        };

        let format = Format::default()
            .with_header(true)
            .with_delimiter(delimiter);
        let (schema, records) = format
            .infer_schema(open_skipping_bom(path)?, None)
            .map_err(csv_err)?;
        let schema = Arc::new(schema);
        debug!(path = %path.display(), records, columns = schema.fields().len(), "inferred schema");

        let reader = ReaderBuilder::new(schema.clone())
            .with_header(true)
            .with_delimiter(delimiter)
            .with_batch_size(BATCH_SIZE)
            .build(open_skipping_bom(path)?)
            .map_err(csv_err)?;
        let batches = reader.collect::<Result<Vec<_>, _>>().map_err(csv_err)?;
        let batch = concat_batches(&schema, &batches).map_err(csv_err)?;
        Ok(Self { batch })
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    /// First column with this name.
    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        let idx = self.batch.schema_ref().index_of(name).ok()?;
        Some(self.batch.column(idx))
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows(), self.num_columns())
    }

    /// The first `n` rows (fewer if the table is shorter).
    pub fn head(&self, n: usize) -> Table {
        Table {
            batch: self.batch.slice(0, n.min(self.num_rows())),
        }
    }

    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_record_batch(self) -> RecordBatch {
        self.batch
    }

    /// Write the table as a Snappy-compressed Parquet file, returning its size.
    pub fn write_parquet(&self, path: &Path) -> Result<u64> {
        let parquet_err = |source| Error::Parquet {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(Error::io(path))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer =
            ArrowWriter::try_new(file, self.batch.schema(), Some(props)).map_err(parquet_err)?;
        writer.write(&self.batch).map_err(parquet_err)?;
        writer.close().map_err(parquet_err)?;
        Ok(fs::metadata(path).map_err(Error::io(path))?.len())
    }
}

impl From<RecordBatch> for Table {
    fn from(batch: RecordBatch) -> Self {
        Self { batch }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered =
            pretty_format_batches(std::slice::from_ref(&self.batch)).map_err(|_| fmt::Error)?;
        write!(f, "{rendered}")
    }
}

/// Statistics Canada files start with a UTF-8 byte order mark, which would
/// otherwise end up in the first column name.
fn open_skipping_bom(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(Error::io(path))?;
    let mut reader = BufReader::new(file);
    if reader.fill_buf().map_err(Error::io(path))?.starts_with(UTF8_BOM) {
        reader.consume(UTF8_BOM.len());
    }
    Ok(reader)
}
