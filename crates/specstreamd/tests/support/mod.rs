//! Shared fixtures for end-to-end tests.

#![allow(dead_code, reason = "each test binary uses a subset of these helpers")]

use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde_json::{Value, json};
use specstream_config::Config;
use specstream_protocol::Frame;
use specstream_storage::{ArrayMetadata, ArrayStore, Channel, ChannelIndex, FileArrayStore};
use specstreamd::{
    ListenerHandle, SPECTROGRAM_PATH, StaticConfigLoader, StructuredHealthReporter, bootstrap_with,
};
use tempfile::TempDir;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

pub const SAMPLE_RATE: u32 = 256;
pub const ROWS: u32 = 1024;

pub type Client = WebSocket<MaybeTlsStream<TcpStream>>;

/// Writes recording `id`: four seconds at 256 Hz, one tone per channel.
pub fn write_recording(data_dir: &std::path::Path, id: &str) {
    let store = FileArrayStore::new(data_dir, ChannelIndex::default());
    store
        .create(id, ArrayMetadata::new(SAMPLE_RATE, ROWS, ROWS, 4))
        .expect("create recording");
    store.open(id).expect("open recording");
    for channel in Channel::ALL {
        let frequency = 10.0 * (channel.ordinal() as f32 + 1.0);
        let samples: Vec<f32> = (0..ROWS)
            .map(|row| {
                let t = row as f32 / SAMPLE_RATE as f32;
                (std::f32::consts::TAU * frequency * t).sin()
            })
            .collect();
        store
            .write_channel(id, channel, 0..ROWS as usize, &samples)
            .expect("write channel");
    }
    store.close(id).expect("close recording");
}

pub fn test_config(data_dir: &std::path::Path) -> Config {
    Config {
        host: "127.0.0.1".to_owned(),
        port: 0,
        data_dir: Utf8PathBuf::from_path_buf(data_dir.to_path_buf()).expect("utf8 data dir"),
        worker_threads: 2,
        log_filter: "warn".to_owned(),
        ..Config::default()
    }
}

/// Running server over a temporary data directory holding `"007"`.
pub struct RunningServer {
    _dir: TempDir,
    handle: Option<ListenerHandle>,
}

impl RunningServer {
    pub fn start() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        write_recording(dir.path(), "007");
        let loader = StaticConfigLoader::new(test_config(dir.path()));
        let server = bootstrap_with(&loader, Arc::new(StructuredHealthReporter::new()))
            .expect("bootstrap server");
        let handle = server.listen().expect("start listener");
        Self {
            _dir: dir,
            handle: Some(handle),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.handle
            .as_ref()
            .map(ListenerHandle::local_addr)
            .expect("listener running")
    }

    pub fn url(&self, path: &str) -> String {
        format!("ws://{}{path}", self.addr())
    }

    pub fn connect(&self) -> Client {
        let (client, _) =
            tungstenite::connect(self.url(SPECTROGRAM_PATH)).expect("connect client");
        if let MaybeTlsStream::Plain(stream) = client.get_ref() {
            stream
                .set_read_timeout(Some(Duration::from_secs(10)))
                .expect("set client timeout");
        }
        client
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.shutdown();
            handle.join().expect("join listener");
        }
    }
}

pub fn request(mrn: &str, start_time: f64, end_time: f64, channel: i64) -> Message {
    let body = json!({
        "type": "request_file_spectrogram",
        "content": {"mrn": mrn, "startTime": start_time, "endTime": end_time, "channel": channel}
    });
    Message::Text(body.to_string())
}

/// Reads the next data message and decodes it as a frame.
pub fn next_frame(client: &mut Client) -> Frame {
    loop {
        match client.read().expect("read frame") {
            Message::Text(text) => return Frame::decode(text.as_bytes()).expect("decode frame"),
            Message::Binary(bytes) => return Frame::decode(&bytes).expect("decode frame"),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            Message::Close(_) => panic!("server closed the connection"),
        }
    }
}

pub fn action(frame: &Frame) -> Value {
    frame.header()["content"]["action"].clone()
}
