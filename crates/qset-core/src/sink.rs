//! Consumers for reader events.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use futures::{Stream, TryStreamExt};

use crate::error::{QsetError, Result};
use crate::types::{DatasetTable, ReadEvent};

/// Something that folds a stream of [`ReadEvent`]s.
pub trait ReadSink {
    fn on_event(&mut self, event: ReadEvent) -> Result<()>;

    /// Called once after the last event of a successful read.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Feed every event of `stream` into `sink`, then finish it.
///
/// Stops at the first error from either side; `finish` is not called then.
pub async fn drain<S, K>(stream: S, sink: &mut K) -> Result<()>
where
    S: Stream<Item = Result<ReadEvent>>,
    K: ReadSink + ?Sized,
{
    futures::pin_mut!(stream);
    while let Some(event) = stream.try_next().await? {
        sink.on_event(event)?;
    }
    sink.finish()
}

/// Collects a read into memory.
#[derive(Debug, Default)]
pub struct TableSink {
    table: DatasetTable,
}

impl TableSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_table(self) -> DatasetTable {
        self.table
    }
}

impl ReadSink for TableSink {
    fn on_event(&mut self, event: ReadEvent) -> Result<()> {
        match event {
            ReadEvent::Columns(columns) => self.table.columns = columns,
            ReadEvent::Values(rows) => self.table.rows.extend(rows),
        }
        Ok(())
    }
}

/// Writes a read as CSV, one record per row, as chunks arrive.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    rows_written: u64,
}

impl CsvSink<BufWriter<File>> {
    /// Create `path` for writing. Fails with
    /// [`QsetError::DestinationExists`] if anything is already there.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => QsetError::DestinationExists {
                    path: path.to_path_buf(),
                },
                _ => QsetError::Io(e),
            })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
            rows_written: 0,
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| QsetError::Io(e.into_error()))
    }
}

impl<W: Write> ReadSink for CsvSink<W> {
    fn on_event(&mut self, event: ReadEvent) -> Result<()> {
        match event {
            ReadEvent::Columns(columns) => self.writer.write_record(&columns)?,
            ReadEvent::Values(rows) => {
                for row in rows {
                    self.writer.write_record(row.iter().map(ToString::to_string))?;
                    self.rows_written += 1;
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
