//! Scripts against a simulated drone on loopback.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tello_link::{Endpoint, LinkError, TelloLink};
use tello_proto::ResponseCode;
use tello_script::{ScriptError, ScriptRunner};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Drone that answers each command via `answer` and reports what it received.
async fn drone(
    answer: fn(&str) -> Option<&'static str>,
) -> (Endpoint, mpsc::UnboundedReceiver<(String, Instant)>) {
    let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
    let endpoint = Endpoint::new("127.0.0.1", socket.local_addr().unwrap().port(), 0);
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            let Ok((n, from)) = socket.recv_from(&mut buf).await else { return };
            let cmd = String::from_utf8_lossy(&buf[..n]).into_owned();
            let _ = tx.send((cmd.clone(), Instant::now()));
            if let Some(reply) = answer(&cmd) {
                let _ = socket.send_to(reply.as_bytes(), from).await;
            }
        }
    });
    (endpoint, rx)
}

async fn connected(endpoint: Endpoint) -> TelloLink {
    let link = TelloLink::without_observer(endpoint);
    link.connect().await.unwrap();
    link
}

#[tokio::test]
async fn delay_separates_commands() {
    let (endpoint, mut seen) = drone(|_| Some("ok\r\n")).await;
    let link = connected(endpoint).await;

    let report = ScriptRunner::new(link.clone())
        .spawn("command\ndelay 2\ntakeoff".to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.commands, 2);
    assert!(report.elapsed >= Duration::from_secs(2));

    let (first, at_first) = seen.recv().await.unwrap();
    let (second, at_second) = seen.recv().await.unwrap();
    assert_eq!(first, "command");
    assert_eq!(second, "takeoff");
    assert!(at_second.duration_since(at_first) >= Duration::from_secs(2));
    assert!(link.is_connected());
}

#[tokio::test]
async fn error_reply_sends_emergency_and_stops() {
    let (endpoint, mut seen) = drone(|cmd| match cmd {
        "command" => Some("error\r\n"),
        _ => Some("ok\r\n"),
    })
    .await;
    let link = connected(endpoint).await;

    let err = ScriptRunner::new(link).run("command\ndelay 1\ntakeoff\nland").await.unwrap_err();
    match err {
        ScriptError::Aborted { line, command, response } => {
            assert_eq!(line, 1);
            assert_eq!(command, "command");
            assert_eq!(response.code, ResponseCode::Error);
        }
        other => panic!("expected abort, got {other:?}"),
    }

    let (first, _) = seen.recv().await.unwrap();
    assert_eq!(first, "command");
    let (second, _) = tokio::time::timeout(Duration::from_secs(1), seen.recv()).await.unwrap().unwrap();
    assert_eq!(second, "emergency");
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(seen.try_recv().is_err(), "takeoff must never be sent");
}

#[tokio::test]
async fn value_reply_also_aborts() {
    let (endpoint, _seen) = drone(|cmd| match cmd {
        "battery?" => Some("87\r\n"),
        _ => Some("ok\r\n"),
    })
    .await;
    let link = connected(endpoint).await;

    let err = ScriptRunner::new(link).run("command\nbattery?\nland").await.unwrap_err();
    assert!(matches!(err, ScriptError::Aborted { line: 2, .. }));
}

#[tokio::test]
async fn set_timeout_applies_to_following_commands() {
    // never answers takeoff
    let (endpoint, _seen) = drone(|cmd| (cmd == "command").then_some("ok")).await;
    let link = connected(endpoint).await;

    let started = Instant::now();
    let err = ScriptRunner::new(link.clone())
        .run("command\nset timeout 1\ntakeoff")
        .await
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    match err {
        ScriptError::Link { line, source, .. } => {
            assert_eq!(line, 3);
            assert!(matches!(source, LinkError::ResponseTimeout { .. }));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(!link.is_connected());
}
