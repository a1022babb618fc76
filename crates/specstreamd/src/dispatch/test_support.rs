//! Fixtures shared by dispatch tests.

use std::sync::Arc;

use rstest::fixture;
use specstream_analysis::{SpectrogramAnalyzer, StftAnalyzer};
use specstream_storage::{ArrayMetadata, ArrayStore, Channel, ChannelIndex, FileArrayStore};
use tempfile::TempDir;

pub(crate) const SAMPLE_RATE: u32 = 256;
pub(crate) const ROWS: u32 = 1024;

/// Store holding recording `"007"`: four seconds of a distinct tone per
/// channel.
pub(crate) struct RecordingFixture {
    _dir: TempDir,
    store: Arc<FileArrayStore>,
}

impl RecordingFixture {
    pub(crate) fn store(&self) -> Arc<dyn ArrayStore> {
        self.store.clone()
    }

    pub(crate) fn analyzer(&self) -> Arc<dyn SpectrogramAnalyzer> {
        Arc::new(StftAnalyzer::default())
    }
}

#[fixture]
pub(crate) fn recording() -> RecordingFixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = FileArrayStore::new(dir.path(), ChannelIndex::default());
    store
        .create("007", ArrayMetadata::new(SAMPLE_RATE, ROWS, ROWS, 4))
        .expect("create recording");
    store.open("007").expect("open recording");
    for channel in Channel::ALL {
        let tone = tone(8.0 * (channel.ordinal() as f32 + 1.0));
        store
            .write_channel("007", channel, 0..ROWS as usize, &tone)
            .expect("write channel");
    }
    store.close("007").expect("close recording");
    RecordingFixture {
        _dir: dir,
        store: Arc::new(store),
    }
}

fn tone(frequency: f32) -> Vec<f32> {
    (0..ROWS)
        .map(|row| {
            let t = row as f32 / SAMPLE_RATE as f32;
            (std::f32::consts::TAU * frequency * t).sin()
        })
        .collect()
}
