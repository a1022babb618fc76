//! Positioned-I/O handle over one array file.
//!
//! Every access reads or writes the file at an explicit offset, so a file
//! shortened behind an open handle (for example, by another process
//! re-creating the recording) surfaces as [`StoreError::Corrupt`] rather than
//! as a fault.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use crate::errors::StoreError;
use crate::hyperslab::Hyperslab;
use crate::metadata::ArrayMetadata;

use super::layout::{self, HEADER_LEN, HeaderError, VALUE_LEN};

/// Open array file with its metadata decoded.
#[derive(Debug)]
pub(crate) struct ArrayHandle {
    id: String,
    path: PathBuf,
    metadata: ArrayMetadata,
    file: File,
}

impl ArrayHandle {
    /// Writes a new zeroed array file.
    ///
    /// With `truncate` an existing file is replaced, otherwise an existing file
    /// yields an `AlreadyExists` IO error.
    pub(crate) fn create(path: &Path, metadata: &ArrayMetadata, truncate: bool) -> io::Result<()> {
        let len = layout::file_len(metadata).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "array body is too large")
        })?;
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        if truncate {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let mut file = options.open(path)?;
        file.write_all(&layout::encode_header(metadata))?;
        file.set_len(len)?;
        file.sync_all()
    }

    /// Opens an existing array file and checks its length against the header.
    pub(crate) fn open(path: &Path, id: &str) -> Result<Self, StoreError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => StoreError::not_found(id),
                _ => StoreError::io(id, source),
            })?;
        let actual = file
            .metadata()
            .map_err(|source| StoreError::io(id, source))?
            .len();
        if actual < position(HEADER_LEN) {
            let short = HeaderError::Short(usize::try_from(actual).unwrap_or(usize::MAX));
            return Err(StoreError::corrupt(path, short.describe()));
        }
        let mut header = [0_u8; HEADER_LEN];
        file.read_exact_at(&mut header, 0)
            .map_err(|source| StoreError::io(id, source))?;
        let metadata = layout::decode_header(&header)
            .map_err(|error| StoreError::corrupt(path, error.describe()))?;
        let expected = layout::file_len(&metadata)
            .ok_or_else(|| StoreError::corrupt(path, "attribute block describes an oversized body"))?;
        if actual != expected {
            return Err(StoreError::corrupt(
                path,
                format!("file holds {actual} bytes but the metadata requires {expected}"),
            ));
        }
        Ok(Self {
            id: id.to_owned(),
            path: path.to_path_buf(),
            metadata,
            file,
        })
    }

    pub(crate) fn metadata(&self) -> ArrayMetadata {
        self.metadata
    }

    /// Copies the selected region into `out` in row-major order.
    ///
    /// The selection must already be validated against the array shape.
    pub(crate) fn read(&self, slab: &Hyperslab, out: &mut [f32]) -> Result<(), StoreError> {
        let [first_row, first_column] = slab.offset;
        let [rows, width] = slab.count;
        if width == 0 || rows == 0 {
            return Ok(());
        }
        let span = self.read_rows(first_row, rows)?;
        let selected = first_column * VALUE_LEN..(first_column + width) * VALUE_LEN;
        for (row, destination) in span.chunks_exact(self.row_len()).zip(out.chunks_exact_mut(width)) {
            for (value, bytes) in destination
                .iter_mut()
                .zip(row[selected.clone()].chunks_exact(VALUE_LEN))
            {
                *value = decode_value(bytes);
            }
        }
        Ok(())
    }

    /// Copies `input` into the selected region and syncs the file.
    ///
    /// The touched rows are read, patched, and written back whole, so a
    /// shortened file is detected before anything is written.
    pub(crate) fn write(&mut self, slab: &Hyperslab, input: &[f32]) -> Result<(), StoreError> {
        let [first_row, first_column] = slab.offset;
        let [rows, width] = slab.count;
        if width == 0 || rows == 0 {
            return Ok(());
        }
        let mut span = self.read_rows(first_row, rows)?;
        let selected = first_column * VALUE_LEN..(first_column + width) * VALUE_LEN;
        let row_len = self.row_len();
        for (row, source) in span.chunks_exact_mut(row_len).zip(input.chunks_exact(width)) {
            for (bytes, value) in row[selected.clone()].chunks_exact_mut(VALUE_LEN).zip(source) {
                bytes.copy_from_slice(&value.to_le_bytes());
            }
        }
        let offset = layout::element_offset(&self.metadata, first_row, 0);
        self.file
            .write_all_at(&span, position(offset))
            .map_err(|source| self.access_error(source))?;
        self.file
            .sync_data()
            .map_err(|source| StoreError::io(self.id.as_str(), source))
    }

    fn row_len(&self) -> usize {
        self.metadata.columns() * VALUE_LEN
    }

    /// Reads `rows` whole rows starting at `first_row`.
    fn read_rows(&self, first_row: usize, rows: usize) -> Result<Vec<u8>, StoreError> {
        let mut span = vec![0_u8; rows * self.row_len()];
        let offset = layout::element_offset(&self.metadata, first_row, 0);
        self.file
            .read_exact_at(&mut span, position(offset))
            .map_err(|source| self.access_error(source))?;
        Ok(span)
    }

    fn access_error(&self, source: io::Error) -> StoreError {
        if source.kind() == io::ErrorKind::UnexpectedEof {
            StoreError::corrupt(
                &self.path,
                "file is shorter than its metadata requires; it changed while open",
            )
        } else {
            StoreError::io(self.id.as_str(), source)
        }
    }
}

fn position(offset: usize) -> u64 {
    u64::try_from(offset).unwrap_or(u64::MAX)
}

fn decode_value(bytes: &[u8]) -> f32 {
    let mut raw = [0_u8; VALUE_LEN];
    raw.copy_from_slice(bytes);
    f32::from_le_bytes(raw)
}
