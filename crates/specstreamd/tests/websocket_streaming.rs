//! End-to-end spectrogram streaming over WebSocket.

mod support;

use std::thread;

use rstest::{fixture, rstest};
use serde_json::json;
use tungstenite::Message;
use tungstenite::http::StatusCode;

use support::{RunningServer, action, next_frame, request};

#[fixture]
fn server() -> RunningServer {
    RunningServer::start()
}

#[rstest]
fn request_streams_new_update_and_both_vectors(server: RunningServer) {
    let mut client = server.connect();
    client
        .send(request("007", 0.0, 4.0, 0))
        .expect("send request");

    let frames: Vec<_> = (0..4).map(|_| next_frame(&mut client)).collect();
    let actions: Vec<_> = frames.iter().map(action).collect();
    assert_eq!(
        actions,
        vec![
            json!("new"),
            json!("update"),
            json!("change_points"),
            json!("change_points")
        ]
    );

    let new = &frames[0].header()["content"];
    assert_eq!(new["canvasId"], json!("LL"));
    assert_eq!(new["fs"], json!(256));
    assert_eq!(new["startTime"], json!(0.0));
    assert_eq!(new["endTime"], json!(4.0));
    assert!(frames[0].payload().is_none());

    let blocks = new["nblocks"].as_u64().expect("nblocks") as usize;
    let freqs = new["nfreqs"].as_u64().expect("nfreqs") as usize;
    assert_eq!(frames[1].payload().map(<[f32]>::len), Some(blocks * freqs));
    assert_eq!(frames[2].header()["content"]["type"], json!("change_points"));
    assert_eq!(frames[3].header()["content"]["type"], json!("summed_signal"));
    assert_eq!(frames[3].payload().map(<[f32]>::len), Some(blocks));
}

#[rstest]
fn missing_recordings_get_an_error_frame_and_the_server_keeps_serving(server: RunningServer) {
    let mut client = server.connect();
    client
        .send(request("does-not-exist", 0.0, 4.0, 0))
        .expect("send request");

    let error = next_frame(&mut client);
    assert_eq!(error.header()["type"], json!("error"));
    assert_eq!(error.header()["content"]["kind"], json!("not_found"));

    client
        .send(request("007", 0.0, 4.0, 3))
        .expect("send second request");
    let new = next_frame(&mut client);
    assert_eq!(action(&new), json!("new"));
    assert_eq!(new.header()["content"]["canvasId"], json!("RL"));

    let mut other = server.connect();
    other
        .send(request("007", 1.0, 3.0, 1))
        .expect("send from second client");
    assert_eq!(action(&next_frame(&mut other)), json!("new"));
}

#[rstest]
fn unknown_message_types_produce_no_frames(server: RunningServer) {
    let mut client = server.connect();
    client
        .send(Message::Text(r#"{"type":"subscribe","content":{}}"#.to_owned()))
        .expect("send unknown type");
    client
        .send(Message::Text(
            r#"{"type":"information","content":{"viewer":"eeg"}}"#.to_owned(),
        ))
        .expect("send information");
    client
        .send(request("007", 0.0, 4.0, 2))
        .expect("send request");

    // The first frame back answers the request; nothing was sent for the
    // two messages before it.
    let first = next_frame(&mut client);
    assert_eq!(action(&first), json!("new"));
    assert_eq!(first.header()["content"]["canvasId"], json!("RP"));
}

#[rstest]
#[case::not_json(Message::Text("not json".to_owned()), "malformed_message")]
#[case::out_of_range_channel(request("007", 0.0, 4.0, 4), "invalid_channel")]
#[case::binary_garbage(Message::Binary(vec![0xff, 0x00]), "malformed_message")]
fn bad_requests_get_error_frames(
    server: RunningServer,
    #[case] message: Message,
    #[case] kind: &str,
) {
    let mut client = server.connect();
    client.send(message).expect("send message");
    let error = next_frame(&mut client);
    assert_eq!(error.header()["content"]["action"], json!("error"));
    assert_eq!(error.header()["content"]["kind"], json!(kind));
}

#[rstest]
fn other_paths_are_refused_with_not_found(server: RunningServer) {
    match tungstenite::connect(server.url("/elsewhere")) {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
        Err(other) => panic!("expected an HTTP refusal, got {other}"),
        Ok(_) => panic!("upgrade on an unknown path should be refused"),
    }
}

#[rstest]
fn concurrent_clients_each_receive_their_own_frames(server: RunningServer) {
    let server = &server;
    thread::scope(|scope| {
        let workers: Vec<_> = (0..2_i64)
            .map(|channel| {
                scope.spawn(move || {
                    let mut client = server.connect();
                    client
                        .send(request("007", 0.0, 4.0, channel))
                        .expect("send request");
                    (0..4).map(|_| next_frame(&mut client)).collect::<Vec<_>>()
                })
            })
            .collect();
        let canvases = ["LL", "LP"];
        for (worker, canvas) in workers.into_iter().zip(canvases) {
            let frames = worker.join().expect("client thread");
            assert_eq!(frames.len(), 4);
            for frame in &frames {
                assert_eq!(frame.header()["content"]["canvasId"], json!(canvas));
            }
        }
    });
}
