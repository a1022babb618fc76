//! Routes decoded inbound messages to their handlers.

use std::sync::Arc;

use specstream_analysis::SpectrogramAnalyzer;
use specstream_protocol::Inbound;
use specstream_storage::ArrayStore;
use tracing::{debug, info, warn};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::response::Responder;
use super::spectrogram::SpectrogramHandler;

/// Decodes each message and dispatches it by type.
pub(crate) struct MessageRouter {
    spectrogram: SpectrogramHandler,
}

impl MessageRouter {
    pub(crate) fn new(store: Arc<dyn ArrayStore>, analyzer: Arc<dyn SpectrogramAnalyzer>) -> Self {
        Self {
            spectrogram: SpectrogramHandler::new(store, analyzer),
        }
    }

    /// Handles one inbound message.
    ///
    /// Decoding and request failures are answered with an error frame;
    /// messages of unknown type are logged and otherwise ignored.
    pub(crate) fn route(&self, bytes: &[u8], responder: &Responder<'_>) {
        let message = match Inbound::parse(bytes) {
            Ok(message) => message,
            Err(source) => {
                let error = DispatchError::from(source);
                warn!(target: DISPATCH_TARGET, %error, kind = error.kind(), "malformed message");
                responder.send_error(&error);
                return;
            }
        };

        match message {
            Inbound::Spectrogram(request) => {
                debug!(
                    target: DISPATCH_TARGET,
                    mrn = %request.mrn,
                    channel = %request.channel,
                    start_time = request.start_time,
                    end_time = request.end_time,
                    "dispatching spectrogram request"
                );
                if let Err(error) = self.spectrogram.handle(&request, responder) {
                    warn!(
                        target: DISPATCH_TARGET,
                        mrn = %request.mrn,
                        %error,
                        kind = error.kind(),
                        "spectrogram request failed"
                    );
                    responder.send_error(&error);
                }
            }
            Inbound::Information(content) => {
                info!(target: DISPATCH_TARGET, %content, "client information");
            }
            Inbound::Unknown { kind, .. } => {
                warn!(target: DISPATCH_TARGET, kind, "ignoring message of unknown type");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;
    use crate::dispatch::test_support::{RecordingFixture, recording};
    use crate::transport::{Outbox, RecordingSink};

    fn route_all(fixture: &RecordingFixture, messages: &[&[u8]]) -> Vec<Value> {
        let router = MessageRouter::new(fixture.store(), fixture.analyzer());
        let (sink, sent) = RecordingSink::new();
        let outbox = Outbox::spawn(sink).expect("spawn outbox");
        {
            let responder = Responder::new(&outbox);
            for message in messages {
                router.route(message, &responder);
            }
        }
        outbox.finish();
        let frames = sent.lock().expect("sent lock");
        frames.iter().map(|frame| frame.header().clone()).collect()
    }

    #[rstest]
    fn spectrogram_requests_stream_four_frames(recording: RecordingFixture) {
        let headers = route_all(
            &recording,
            &[br#"{"type":"request_file_spectrogram","content":{"mrn":"007","startTime":0,"endTime":4,"channel":0}}"#],
        );
        let actions: Vec<_> = headers
            .iter()
            .map(|header| header["content"]["action"].clone())
            .collect();
        assert_eq!(
            actions,
            vec![
                json!("new"),
                json!("update"),
                json!("change_points"),
                json!("change_points")
            ]
        );
        assert_eq!(headers[2]["content"]["type"], json!("change_points"));
        assert_eq!(headers[3]["content"]["type"], json!("summed_signal"));
    }

    #[rstest]
    #[case::unknown_type(&br#"{"type":"subscribe","content":{}}"#[..])]
    #[case::information(&br#"{"type":"information","content":"viewer ready"}"#[..])]
    fn non_request_messages_send_nothing(recording: RecordingFixture, #[case] message: &[u8]) {
        assert!(route_all(&recording, &[message]).is_empty());
    }

    #[rstest]
    #[case::not_json(&b"{oops"[..], "malformed_message")]
    #[case::bad_channel(
        &br#"{"type":"request_file_spectrogram","content":{"mrn":"007","startTime":0,"endTime":4,"channel":9}}"#[..],
        "invalid_channel"
    )]
    #[case::missing_recording(
        &br#"{"type":"request_file_spectrogram","content":{"mrn":"404","startTime":0,"endTime":4,"channel":0}}"#[..],
        "not_found"
    )]
    #[case::empty_window(
        &br#"{"type":"request_file_spectrogram","content":{"mrn":"007","startTime":3,"endTime":3,"channel":0}}"#[..],
        "invalid_window"
    )]
    fn failures_produce_one_error_frame(
        recording: RecordingFixture,
        #[case] message: &[u8],
        #[case] kind: &str,
    ) {
        let headers = route_all(&recording, &[message]);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0]["type"], json!("error"));
        assert_eq!(headers[0]["content"]["action"], json!("error"));
        assert_eq!(headers[0]["content"]["kind"], json!(kind));
    }

    #[rstest]
    fn a_failed_request_does_not_block_the_next(recording: RecordingFixture) {
        let headers = route_all(
            &recording,
            &[
                br#"{"type":"request_file_spectrogram","content":{"mrn":"404","startTime":0,"endTime":4,"channel":0}}"#,
                br#"{"type":"request_file_spectrogram","content":{"mrn":"007","startTime":0,"endTime":4,"channel":1}}"#,
            ],
        );
        assert_eq!(headers.len(), 5);
        assert_eq!(headers[0]["type"], json!("error"));
        assert_eq!(headers[1]["content"]["canvasId"], json!("LP"));
    }
}
