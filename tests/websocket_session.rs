//! Runs against a real websocket server on localhost
//!
//! The server side is a minimal `tokio-tungstenite` acceptor that checks the
//! submission payload and replays a scripted sequence of simulator messages.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use websim::{
    FrameSink, SessionOutcome, SimulationClient, SimulationError, SimulationFrame,
    SimulatorConfig, StatusPhase,
};

#[derive(Default)]
struct Recorder {
    frames: Vec<i64>,
    completed: bool,
}

impl FrameSink for Recorder {
    fn render(&mut self, frame: &SimulationFrame) {
        self.frames.push(frame.frame_number);
    }

    fn complete(&mut self) {
        self.completed = true;
    }
}

fn tree() -> websim::BehaviorTree {
    websim::BehaviorTree::from_value(json!({
        "root": "n1",
        "nodes": { "n1": { "id": "n1", "name": "GoToPos", "properties": { "xGoal": 1 } } }
    }))
}

fn frames(numbers: std::ops::Range<i64>) -> String {
    let frames: Vec<_> = numbers
        .map(|n| {
            json!({
                "frame_number": n,
                "robots": [{ "id": 1, "team": "A", "x": n * 10, "y": 0, "orientation": 0.0 }],
                "ball": { "x": 0, "y": n }
            })
        })
        .collect();
    json!({ "body": { "simulator_output": frames } }).to_string()
}

fn status(code: i64) -> String {
    json!({ "body": { "simulator_status": code } }).to_string()
}

/// Accept one connection, return the submission it received after replaying `script`.
///
/// With `close_early` the server sends a close frame after the script instead of
/// waiting for the client to hang up.
async fn serve_once(script: Vec<String>, close_early: bool) -> (u16, JoinHandle<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let submission = match ws.next().await {
            Some(Ok(Message::Text(text))) => serde_json::from_str::<Value>(&text).unwrap(),
            other => panic!("expected submission, got {other:?}"),
        };

        for message in script {
            ws.send(Message::Text(message)).await.unwrap();
        }

        if close_early {
            let _ = ws.close(None).await;
        }
        // Drain until the client's close handshake completes
        while let Some(Ok(_)) = ws.next().await {}
        submission
    });

    (port, server)
}

fn config(port: u16) -> SimulatorConfig {
    SimulatorConfig {
        host: "127.0.0.1".to_string(),
        port,
        lookahead_frames: 5,
        ..SimulatorConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn plays_a_full_simulation_over_websocket() {
    let script = vec![status(2), status(3), status(4), status(5), frames(0..12), status(6), frames(12..20), status(8)];
    let (port, server) = serve_once(script, false).await;

    let mut client = SimulationClient::new(config(port)).unwrap();
    let run = client.submit(tree(), 17u64).unwrap();

    let mut recorder = Recorder::default();
    let summary = tokio::time::timeout(Duration::from_secs(10), run.play(&mut recorder))
        .await
        .expect("run finishes in time")
        .unwrap();

    assert!(summary.is_complete(), "{summary:?}");
    assert_eq!(summary.session, SessionOutcome::Completed { frames_received: 20 });
    assert_eq!(recorder.frames, (0..20).collect::<Vec<_>>());
    assert!(recorder.completed);

    let submission = server.await.unwrap();
    assert_eq!(submission["action"], "SIM");
    assert_eq!(submission["values"]["assignment_id"], 17);
    assert_eq!(submission["values"]["tree"]["root"], "n1");

    let snapshot = client.status().current();
    assert_eq!(snapshot.phase, StatusPhase::Finished);
    assert!(snapshot.controls_enabled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_closing_mid_run_abandons_playback() {
    let (port, server) = serve_once(vec![status(4), frames(0..3)], true).await;

    let mut client = SimulationClient::new(config(port)).unwrap();
    let run = client.submit(tree(), 5u64).unwrap();

    let mut recorder = Recorder::default();
    let summary = tokio::time::timeout(Duration::from_secs(10), run.play(&mut recorder))
        .await
        .expect("run ends in time")
        .unwrap();

    assert!(matches!(summary.session, SessionOutcome::Abandoned { frames_received: 3, .. }));
    assert!(!summary.playback.is_complete());
    assert!(!recorder.completed);
    server.await.unwrap();

    let snapshot = client.status().current();
    assert_eq!(snapshot.phase, StatusPhase::Finished);
    assert!(snapshot.controls_enabled);
    assert!(!client.is_busy());
}

#[tokio::test]
async fn unreachable_simulator_abandons_run() {
    // Bind then drop to get a port nothing listens on
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut client = SimulationClient::new(config(port)).unwrap();
    let run = client.submit(tree(), 1u64).unwrap();
    let summary = run.play(&mut Recorder::default()).await.unwrap();

    assert!(matches!(summary.session, SessionOutcome::Abandoned { frames_received: 0, .. }));
    let notification = client.status().current().display.notification().cloned().unwrap();
    assert!(notification.message.starts_with("Simulation failed"));
}

#[tokio::test]
async fn invalid_config_is_rejected_before_connecting() {
    let config = SimulatorConfig { host: String::new(), ..SimulatorConfig::default() };
    assert!(matches!(SimulationClient::new(config), Err(SimulationError::Config { .. })));
}
