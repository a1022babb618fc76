//! Capability set shared by array storage backends.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::channel::{Channel, ChannelIndex};
use crate::errors::StoreError;
use crate::metadata::ArrayMetadata;

/// Behaviour of [`ArrayStore::create`] when the identifier already has storage.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CreatePolicy {
    /// Discard the existing array and allocate a fresh zeroed one.
    ///
    /// Repeating `create` is idempotent-destructive: any previously written
    /// samples are lost and an open handle for the identifier is evicted.
    #[default]
    Truncate,
    /// Fail with [`StoreError::AlreadyExists`] and leave the array untouched.
    RefuseExisting,
}

/// Errors encountered while parsing a [`CreatePolicy`] from text.
pub type CreatePolicyParseError = strum::ParseError;

/// Create, open, slice, and close arrays keyed by recording identifier.
///
/// `open` acquires a cached backend handle; reads and writes borrow that handle
/// for a single call and fail with [`StoreError::NotOpen`] when it is absent.
/// Row ranges are half-open and channels resolve to columns through the store's
/// [`ChannelIndex`].
pub trait ArrayStore: Send + Sync {
    /// Allocates storage for a zeroed `row_count × column_count` array and
    /// persists `metadata` alongside it.
    fn create(&self, id: &str, metadata: ArrayMetadata) -> Result<(), StoreError>;

    /// Reports whether `id` has backing storage. Does not open the array.
    fn exists(&self, id: &str) -> bool;

    /// Opens `id` and caches its handle. Opening an open array is a no-op.
    fn open(&self, id: &str) -> Result<(), StoreError>;

    /// Reports whether `id` currently has a cached handle.
    fn is_open(&self, id: &str) -> bool;

    /// Reads the attribute block of an open array.
    fn metadata(&self, id: &str) -> Result<ArrayMetadata, StoreError>;

    /// Reads `rows` of the column holding `channel` into `out`.
    ///
    /// `out.len()` must equal `rows.len()`.
    fn read_channel(
        &self,
        id: &str,
        channel: Channel,
        rows: Range<usize>,
        out: &mut [f32],
    ) -> Result<(), StoreError>;

    /// Reads `rows` of every column into `out` in row-major order.
    ///
    /// `out.len()` must equal `rows.len() * column_count`.
    fn read_rows(&self, id: &str, rows: Range<usize>, out: &mut [f32]) -> Result<(), StoreError>;

    /// Writes `input` into `rows` of the column holding `channel`.
    fn write_channel(
        &self,
        id: &str,
        channel: Channel,
        rows: Range<usize>,
        input: &[f32],
    ) -> Result<(), StoreError>;

    /// Releases the handle for `id`.
    ///
    /// Closing is idempotent and not reference-counted: one call releases the
    /// identifier no matter how many times it was opened.
    fn close(&self, id: &str) -> Result<(), StoreError>;

    /// Channel-to-column mapping used by this store.
    fn channel_index(&self) -> &ChannelIndex;
}
