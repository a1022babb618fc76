//! Conversion of foreign recording sources into stored arrays.
//!
//! An importer reads a whole recording, creates the array for an identifier
//! through an [`ArrayStore`], and writes every channel into it. The array is
//! left closed afterwards.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::channel::Channel;
use crate::errors::StoreError;
use crate::metadata::ArrayMetadata;
use crate::store::ArrayStore;

const IMPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::import");

/// Errors raised while importing a recording.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The source could not be opened.
    #[error("failed to open recording source '{path}': {source}")]
    Open {
        /// Source path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The CSV reader rejected the input.
    #[error("failed to read CSV input: {0}")]
    Csv(#[from] csv::Error),
    /// A cell did not hold a floating-point number.
    #[error("row {row}, column {column}: '{value}' is not a number")]
    InvalidValue {
        /// Zero-based data row.
        row: usize,
        /// Zero-based column.
        column: usize,
        /// Offending cell text.
        value: String,
    },
    /// A row had a different number of columns than there are channels.
    #[error("row {row} holds {actual} columns; expected one per channel ({expected})")]
    ColumnCount {
        /// Zero-based data row.
        row: usize,
        /// Expected column count.
        expected: usize,
        /// Columns found.
        actual: usize,
    },
    /// The source held no samples.
    #[error("recording source holds no samples")]
    Empty,
    /// The recording has more samples than the attribute block can describe.
    #[error("recording holds {0} samples, more than an array can describe")]
    TooLarge(usize),
    /// The store rejected the array.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Converts a foreign recording into a stored array.
pub trait RecordingImporter {
    /// Imports the recording as `id`, returning the metadata it was stored with.
    fn import(&self, store: &dyn ArrayStore, id: &str) -> Result<ArrayMetadata, ImportError>;
}

/// Imports comma-separated samples: one row per time sample, one column per
/// channel in wire order (LL, LP, RP, RL).
#[derive(Debug, Clone)]
pub struct CsvImporter {
    path: PathBuf,
    sample_rate: u32,
    has_headers: bool,
}

impl CsvImporter {
    /// Creates an importer for the CSV file at `path` sampled at `sample_rate` Hz.
    pub fn new(path: impl Into<PathBuf>, sample_rate: u32) -> Self {
        Self {
            path: path.into(),
            sample_rate,
            has_headers: false,
        }
    }

    /// Treats the first line as a header row and skips it.
    #[must_use]
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    /// Source path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses channel columns from `reader`.
    ///
    /// Returns one sample vector per channel, all of equal length.
    pub fn read_channels<R: Read>(&self, reader: R) -> Result<Vec<Vec<f32>>, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(self.has_headers)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut channels = vec![Vec::new(); Channel::COUNT];
        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            if record.len() != Channel::COUNT {
                return Err(ImportError::ColumnCount {
                    row,
                    expected: Channel::COUNT,
                    actual: record.len(),
                });
            }
            for ((column, cell), samples) in record.iter().enumerate().zip(channels.iter_mut()) {
                let value = cell.parse::<f32>().map_err(|_| ImportError::InvalidValue {
                    row,
                    column,
                    value: cell.to_owned(),
                })?;
                samples.push(value);
            }
        }
        Ok(channels)
    }

    fn store(
        &self,
        store: &dyn ArrayStore,
        id: &str,
        channels: &[Vec<f32>],
    ) -> Result<ArrayMetadata, ImportError> {
        let rows = channels.first().map_or(0, Vec::len);
        if rows == 0 {
            return Err(ImportError::Empty);
        }
        let samples = u32::try_from(rows).map_err(|_| ImportError::TooLarge(rows))?;
        let metadata = ArrayMetadata::new(self.sample_rate, samples, samples, Channel::COUNT as u32);
        store.create(id, metadata)?;
        store.open(id)?;
        let written = Channel::ALL
            .iter()
            .zip(channels)
            .try_for_each(|(channel, samples)| store.write_channel(id, *channel, 0..rows, samples));
        let closed = store.close(id);
        written?;
        closed?;
        Ok(metadata)
    }
}

impl RecordingImporter for CsvImporter {
    fn import(&self, store: &dyn ArrayStore, id: &str) -> Result<ArrayMetadata, ImportError> {
        let file = File::open(&self.path).map_err(|source| ImportError::Open {
            path: self.path.clone(),
            source,
        })?;
        let channels = self.read_channels(BufReader::new(file))?;
        let metadata = self.store(store, id, &channels)?;
        info!(
            target: IMPORT_TARGET,
            id,
            path = %self.path.display(),
            samples = metadata.sample_count,
            sample_rate = metadata.sample_rate,
            "imported recording"
        );
        Ok(metadata)
    }
}
