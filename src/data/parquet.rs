//! Parquet reader and atomic writer for `Frame`

use super::frame::{ColumnData, Frame};
use crate::error::{PipelineError, Result};
use arrow::array::{Array, ArrayRef, Float64Array, StringArray, TimestampMicrosecondArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum ColumnKind {
    Numeric,
    Text,
    Timestamp,
}

fn column_kind(name: &str, data_type: &DataType) -> Result<ColumnKind> {
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Ok(ColumnKind::Text),
        DataType::Dictionary(_, value) if matches!(**value, DataType::Utf8 | DataType::LargeUtf8) => {
            Ok(ColumnKind::Text)
        }
        DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64 => {
            Ok(ColumnKind::Timestamp)
        }
        DataType::Boolean | DataType::Null => Ok(ColumnKind::Numeric),
        dt if dt.is_numeric() => Ok(ColumnKind::Numeric),
        other => Err(PipelineError::UnsupportedColumn {
            column: name.to_string(),
            data_type: other.to_string(),
        }),
    }
}

fn empty_column(kind: ColumnKind) -> ColumnData {
    match kind {
        ColumnKind::Numeric => ColumnData::Numeric(Vec::new()),
        ColumnKind::Text => ColumnData::Text(Vec::new()),
        ColumnKind::Timestamp => ColumnData::Timestamp(Vec::new()),
    }
}

fn unsupported(name: &str, array: &ArrayRef) -> PipelineError {
    PipelineError::UnsupportedColumn {
        column: name.to_string(),
        data_type: array.data_type().to_string(),
    }
}

fn append_array(name: &str, data: &mut ColumnData, array: &ArrayRef) -> Result<()> {
    match data {
        ColumnData::Numeric(values) => {
            let casted = cast(array, &DataType::Float64)?;
            let floats = casted
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| unsupported(name, array))?;
            values.extend(floats.iter().map(|v| v.filter(|x| !x.is_nan())));
        }
        ColumnData::Text(values) => {
            let casted = cast(array, &DataType::Utf8)?;
            let strings = casted
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| unsupported(name, array))?;
            values.extend(strings.iter().map(|v| v.map(str::to_string)));
        }
        ColumnData::Timestamp(values) => {
            let casted = cast(array, &DataType::Timestamp(TimeUnit::Microsecond, None))?;
            let stamps = casted
                .as_any()
                .downcast_ref::<TimestampMicrosecondArray>()
                .ok_or_else(|| unsupported(name, array))?;
            values.extend(
                stamps
                    .iter()
                    .map(|v| v.and_then(DateTime::from_timestamp_micros)),
            );
        }
    }
    Ok(())
}

/// Read a whole parquet file into a `Frame`
pub fn read_frame(path: &Path) -> Result<Frame> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let mut columns: Vec<(String, ColumnData)> = schema
        .fields()
        .iter()
        .map(|f| Ok((f.name().clone(), empty_column(column_kind(f.name(), f.data_type())?))))
        .collect::<Result<_>>()?;

    for batch in reader {
        let batch = batch?;
        for (i, (name, data)) in columns.iter_mut().enumerate() {
            append_array(name, data, batch.column(i))?;
        }
    }

    let mut frame = Frame::new();
    for (name, data) in columns {
        frame.push_column(name, data)?;
    }

    tracing::debug!(
        path = ?path,
        rows = frame.num_rows(),
        columns = frame.num_columns(),
        "Read parquet table"
    );

    Ok(frame)
}

/// Write a `Frame` to parquet; the target only appears once fully written
pub fn write_frame(path: &Path, frame: &Frame) -> Result<()> {
    let mut staged = StagedWrites::new();
    staged.frame(path, frame)?;
    staged.commit()
}

fn encode_frame(path: &Path, frame: &Frame) -> Result<(Arc<Schema>, RecordBatch)> {
    if frame.num_columns() == 0 {
        return Err(PipelineError::Schema(format!(
            "refusing to write {} without columns",
            path.display()
        )));
    }

    let fields: Vec<Field> = frame
        .columns()
        .iter()
        .map(|c| {
            let data_type = match c.data {
                ColumnData::Numeric(_) => DataType::Float64,
                ColumnData::Text(_) => DataType::Utf8,
                ColumnData::Timestamp(_) => {
                    DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
                }
            };
            Field::new(c.name.clone(), data_type, true)
        })
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let arrays: Vec<ArrayRef> = frame
        .columns()
        .iter()
        .map(|c| -> ArrayRef {
            match &c.data {
                ColumnData::Numeric(v) => Arc::new(Float64Array::from(v.clone())),
                ColumnData::Text(v) => Arc::new(StringArray::from(v.clone())),
                ColumnData::Timestamp(v) => Arc::new(
                    TimestampMicrosecondArray::from(
                        v.iter()
                            .map(|t| t.map(|t| t.timestamp_micros()))
                            .collect::<Vec<_>>(),
                    )
                    .with_timezone("UTC"),
                ),
            }
        })
        .collect();

    let batch = RecordBatch::try_new(schema.clone(), arrays)?;
    Ok((schema, batch))
}

/// Temporary sibling used while `path` is being written
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Outputs of one run, written to temporary siblings and moved into place
/// together.
///
/// No target is touched before `commit`. Dropping an uncommitted set removes
/// its temporary files.
#[derive(Debug, Default)]
pub struct StagedWrites {
    pending: Vec<(PathBuf, PathBuf)>,
}

impl StagedWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the future contents of `path` to its temporary sibling
    pub fn stage<F>(&mut self, path: &Path, write: F) -> Result<()>
    where
        F: FnOnce(File) -> Result<()>,
    {
        if path.is_dir() {
            return Err(std::io::Error::other(format!(
                "cannot replace directory {} with a file",
                path.display()
            ))
            .into());
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = temp_path(path);
        let file = File::create(&tmp)?;
        if let Err(e) = write(file) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        self.pending.push((tmp, path.to_path_buf()));
        Ok(())
    }

    /// Stage `frame` as a SNAPPY-compressed parquet file
    pub fn frame(&mut self, path: &Path, frame: &Frame) -> Result<()> {
        let (schema, batch) = encode_frame(path, frame)?;
        self.stage(path, |file| {
            let props = WriterProperties::builder()
                .set_compression(Compression::SNAPPY)
                .build();
            let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
            writer.write(&batch)?;
            writer.close()?;
            Ok(())
        })?;
        tracing::debug!(path = ?path, rows = frame.num_rows(), "Staged parquet table");
        Ok(())
    }

    /// Rename every staged file over its target
    pub fn commit(mut self) -> Result<()> {
        while !self.pending.is_empty() {
            let (tmp, path) = self.pending.remove(0);
            if let Err(e) = fs::rename(&tmp, &path) {
                let _ = fs::remove_file(&tmp);
                return Err(e.into());
            }
            tracing::debug!(path = ?path, "Committed file");
        }
        Ok(())
    }
}

impl Drop for StagedWrites {
    fn drop(&mut self) {
        for (tmp, _) in &self.pending {
            let _ = fs::remove_file(tmp);
        }
    }
}
