//! File-backed [`ArrayStore`] implementation.
//!
//! Every recording lives in its own `<identifier>.ssa` file under the store
//! root. The metadata attribute block sits in a fixed-size header so it can be
//! read without touching the body. Handles read and write the body with
//! positioned I/O.

mod handle;
mod layout;

use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::STORE_TARGET;
use crate::cache::HandleCache;
use crate::channel::{Channel, ChannelIndex};
use crate::errors::StoreError;
use crate::hyperslab::Hyperslab;
use crate::metadata::ArrayMetadata;
use crate::store::{ArrayStore, CreatePolicy};

use self::handle::ArrayHandle;

pub use self::layout::{ARRAY_EXTENSION, array_file_name};

/// Array store keeping one file per recording.
#[derive(Debug)]
pub struct FileArrayStore {
    root: PathBuf,
    channels: ChannelIndex,
    create_policy: CreatePolicy,
    handles: HandleCache<ArrayHandle>,
}

impl FileArrayStore {
    /// Creates a store rooted at `root` using the default create policy.
    pub fn new(root: impl Into<PathBuf>, channels: ChannelIndex) -> Self {
        Self {
            root: root.into(),
            channels,
            create_policy: CreatePolicy::default(),
            handles: HandleCache::new(),
        }
    }

    /// Replaces the behaviour of `create` on existing arrays.
    #[must_use]
    pub fn with_create_policy(mut self, policy: CreatePolicy) -> Self {
        self.create_policy = policy;
        self
    }

    /// Directory holding the array files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Behaviour of `create` on existing arrays.
    #[must_use]
    pub fn create_policy(&self) -> CreatePolicy {
        self.create_policy
    }

    /// Path of the file backing `id`.
    pub fn array_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(array_file_name(id)?))
    }

    fn read_selection(
        &self,
        id: &str,
        slab: &Hyperslab,
        out: &mut [f32],
    ) -> Result<(), StoreError> {
        self.handles.with_read(id, |handle| {
            let metadata = handle.metadata();
            slab.validate(metadata.shape())
                .and_then(|()| slab.check_buffer(out.len()))
                .map_err(|error| StoreError::from_selection(id, &error))?;
            handle.read(slab, out)
        })?
    }

    fn selection(id: &str, rows: Range<usize>, column: usize) -> Result<Hyperslab, StoreError> {
        Hyperslab::column(rows, column).map_err(|error| StoreError::from_selection(id, &error))
    }
}

impl ArrayStore for FileArrayStore {
    fn create(&self, id: &str, metadata: ArrayMetadata) -> Result<(), StoreError> {
        metadata.validate()?;
        let path = self.array_path(id)?;
        let created = match self.create_policy {
            // No open of `id` may run between eviction and re-creation.
            CreatePolicy::Truncate => {
                let (evicted, created) = self
                    .handles
                    .evict_with(id, || ArrayHandle::create(&path, &metadata, true))?;
                if evicted {
                    debug!(target: STORE_TARGET, id, "evicted open handle before truncating");
                }
                created
            }
            CreatePolicy::RefuseExisting => ArrayHandle::create(&path, &metadata, false),
        };
        created.map_err(|source| {
            if source.kind() == io::ErrorKind::AlreadyExists {
                StoreError::AlreadyExists { id: id.to_owned() }
            } else {
                StoreError::io(id, source)
            }
        })?;
        debug!(
            target: STORE_TARGET,
            id,
            rows = metadata.row_count,
            columns = metadata.column_count,
            sample_rate = metadata.sample_rate,
            "created array"
        );
        Ok(())
    }

    fn exists(&self, id: &str) -> bool {
        self.array_path(id).is_ok_and(|path| path.is_file())
    }

    fn open(&self, id: &str) -> Result<(), StoreError> {
        let path = self.array_path(id)?;
        let inserted = self
            .handles
            .open_with(id, || ArrayHandle::open(&path, id))?;
        if inserted {
            debug!(target: STORE_TARGET, id, path = %path.display(), "opened array");
        }
        Ok(())
    }

    fn is_open(&self, id: &str) -> bool {
        self.handles.contains(id).unwrap_or(false)
    }

    fn metadata(&self, id: &str) -> Result<ArrayMetadata, StoreError> {
        self.handles.with_read(id, ArrayHandle::metadata)
    }

    fn read_channel(
        &self,
        id: &str,
        channel: Channel,
        rows: Range<usize>,
        out: &mut [f32],
    ) -> Result<(), StoreError> {
        let slab = Self::selection(id, rows, self.channels.column(channel))?;
        self.read_selection(id, &slab, out)
    }

    fn read_rows(&self, id: &str, rows: Range<usize>, out: &mut [f32]) -> Result<(), StoreError> {
        let columns = self.metadata(id)?.columns();
        let slab = Hyperslab::all_columns(rows, columns)
            .map_err(|error| StoreError::from_selection(id, &error))?;
        self.read_selection(id, &slab, out)
    }

    fn write_channel(
        &self,
        id: &str,
        channel: Channel,
        rows: Range<usize>,
        input: &[f32],
    ) -> Result<(), StoreError> {
        let slab = Self::selection(id, rows, self.channels.column(channel))?;
        self.handles.with_write(id, |handle| {
            let metadata = handle.metadata();
            slab.validate(metadata.shape())
                .and_then(|()| slab.check_buffer(input.len()))
                .map_err(|error| StoreError::from_selection(id, &error))?;
            handle.write(&slab, input)
        })?
    }

    fn close(&self, id: &str) -> Result<(), StoreError> {
        if self.handles.evict(id)? {
            debug!(target: STORE_TARGET, id, "closed array");
        }
        Ok(())
    }

    fn channel_index(&self) -> &ChannelIndex {
        &self.channels
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    struct StoreFixture {
        _dir: TempDir,
        store: FileArrayStore,
    }

    #[fixture]
    fn fixture() -> StoreFixture {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileArrayStore::new(dir.path(), ChannelIndex::default());
        StoreFixture { _dir: dir, store }
    }

    #[rstest]
    fn array_path_appends_extension(fixture: StoreFixture) {
        let path = fixture.store.array_path("007").expect("path");
        assert_eq!(path, fixture.store.root().join("007.ssa"));
    }

    #[rstest]
    fn metadata_is_readable_without_touching_the_body(fixture: StoreFixture) {
        let store = &fixture.store;
        let metadata = ArrayMetadata::new(256, 1024, 1024, 4);
        store.create("007", metadata).expect("create");

        let path = store.array_path("007").expect("path");
        let bytes = std::fs::read(&path).expect("read file");
        let header = layout::decode_header(&bytes[..layout::HEADER_LEN]).expect("header");
        assert_eq!(header, metadata);
    }

    #[rstest]
    fn short_files_are_reported_as_corrupt(fixture: StoreFixture) {
        let store = &fixture.store;
        let metadata = ArrayMetadata::new(256, 1024, 1024, 4);
        store.create("007", metadata).expect("create");
        let path = store.array_path("007").expect("path");
        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .expect("open file");
        file.set_len(100).expect("shrink file");

        let error = store.open("007").expect_err("corrupt");
        assert!(matches!(error, StoreError::Corrupt { .. }));
        assert!(!store.is_open("007"));
    }

    #[rstest]
    fn truncating_create_evicts_open_handle(fixture: StoreFixture) {
        let store = &fixture.store;
        let metadata = ArrayMetadata::new(256, 16, 16, 4);
        store.create("007", metadata).expect("create");
        store.open("007").expect("open");

        store.create("007", metadata).expect("recreate");
        assert!(!store.is_open("007"));
    }

    #[rstest]
    fn read_rows_returns_row_major_values(fixture: StoreFixture) {
        let store = &fixture.store;
        store
            .create("007", ArrayMetadata::new(256, 3, 3, 4))
            .expect("create");
        store.open("007").expect("open");
        for channel in Channel::ALL {
            let base = f32::from(u8::try_from(channel.ordinal()).expect("small")) * 10.0;
            store
                .write_channel("007", channel, 0..3, &[base, base + 1.0, base + 2.0])
                .expect("write");
        }

        let mut out = vec![0.0_f32; 12];
        store.read_rows("007", 0..3, &mut out).expect("read rows");
        assert_eq!(
            out,
            vec![0.0, 10.0, 20.0, 30.0, 1.0, 11.0, 21.0, 31.0, 2.0, 12.0, 22.0, 32.0]
        );
    }

    #[rstest]
    fn array_shrunk_by_another_store_reports_corrupt(fixture: StoreFixture) {
        let store = &fixture.store;
        store
            .create("007", ArrayMetadata::new(256, 4096, 4096, 4))
            .expect("create");
        store.open("007").expect("open");

        let importer = FileArrayStore::new(store.root(), ChannelIndex::default());
        importer
            .create("007", ArrayMetadata::new(256, 16, 16, 4))
            .expect("re-create smaller");

        let mut out = [0.0_f32; 10];
        let error = store
            .read_channel("007", Channel::LeftLateral, 4000..4010, &mut out)
            .expect_err("rows are gone");
        assert!(matches!(error, StoreError::Corrupt { .. }));
        let error = store
            .write_channel("007", Channel::LeftLateral, 4000..4010, &[1.0; 10])
            .expect_err("rows are gone");
        assert!(matches!(error, StoreError::Corrupt { .. }));

        store.close("007").expect("close");
        store.open("007").expect("reopen");
        assert_eq!(store.metadata("007").expect("metadata").row_count, 16);
    }

    #[rstest]
    fn truncating_create_racing_reads_only_sees_complete_files(fixture: StoreFixture) {
        let store = &fixture.store;
        let shapes = [
            ArrayMetadata::new(256, 4096, 4096, 4),
            ArrayMetadata::new(256, 64, 64, 4),
        ];
        store.create("007", shapes[0]).expect("create");

        thread::scope(|scope| {
            scope.spawn(|| {
                for metadata in shapes.iter().cycle().take(20) {
                    store.create("007", *metadata).expect("re-create");
                }
            });
            scope.spawn(|| {
                let mut out = [0.0_f32; 8];
                for _ in 0..200 {
                    store.open("007").expect("open sees a complete file");
                    match store.read_channel("007", Channel::LeftLateral, 0..8, &mut out) {
                        Ok(()) | Err(StoreError::NotOpen { .. }) => {}
                        Err(error) => panic!("unexpected read failure: {error}"),
                    }
                }
            });
        });
    }
}
