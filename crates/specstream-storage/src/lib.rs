//! Array storage engine for multichannel recordings.
//!
//! Each recording identifier names one 2-D `f32` array: rows are time samples
//! and columns are channels. The [`ArrayStore`] trait describes the capability
//! set shared by every backend; [`FileArrayStore`] implements it on top of
//! plain files with a fixed-size metadata attribute block in front of
//! the row-major body.
//!
//! Opening an array is separated from reading it. Open handles live in a
//! [`HandleCache`], so repeated slice requests against the same recording do
//! not pay the file-open cost again. The cache holds at most one handle per
//! identifier and guards each handle with its own lock, so concurrent requests
//! against different recordings never contend.
//!
//! Channels are never addressed by raw column number at the API boundary: a
//! [`ChannelIndex`] value resolves each [`Channel`] to its physical column.

mod cache;
mod channel;
mod errors;
mod file;
mod hyperslab;
pub mod import;
mod metadata;
mod store;

pub use cache::HandleCache;
pub use channel::{Channel, ChannelIndex, ChannelIndexError, UnknownChannel};
pub use errors::StoreError;
pub use file::{ARRAY_EXTENSION, FileArrayStore, array_file_name};
pub use hyperslab::{Hyperslab, SelectionError};
pub use metadata::ArrayMetadata;
pub use store::{ArrayStore, CreatePolicy, CreatePolicyParseError};

/// Tracing target for storage operations.
pub(crate) const STORE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::store");
