//! End-to-end session tests against an in-process fake pitch detector.
//!
//! The fake server accepts one WebSocket connection, asserts on the binary
//! audio frames it receives, and plays back scripted JSON messages.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use chordbook_core::frame::BLOCK_SIZE;
use chordbook_core::session::{ConnectionStatus, SessionConfig, TunerEvent, TunerSession};
use chordbook_core::tuning::Intonation;
use chordbook_core::TunerError;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("ws://{}", listener.local_addr().unwrap());
    (listener, endpoint)
}

#[tokio::test]
async fn session_streams_audio_and_classifies_measurements() {
    let (listener, endpoint) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        // Expect one audio block: exactly 2 bytes per sample, PCM16 LE.
        let payload = loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Binary(b) => break b,
                _ => continue,
            }
        };
        assert_eq!(payload.len(), BLOCK_SIZE * 2);
        // 0.25 scales to 8191 (0.25 * 32767 truncated)
        assert_eq!(&payload[0..2], &8191i16.to_le_bytes());

        ws.send(Message::Text(
            r#"{"type":"pitch","frequency":110.0,"cents":-2.0}"#.into(),
        ))
        .await
        .unwrap();
        // Unknown message kinds and malformed frames must both be ignored.
        ws.send(Message::Text(r#"{"type":"hello","version":2}"#.into()))
            .await
            .unwrap();
        ws.send(Message::Text("{not json".into())).await.unwrap();
        ws.send(Message::Text(
            r#"{"type":"pitch","frequency":185.9,"cents":8.3}"#.into(),
        ))
        .await
        .unwrap();
        ws.send(Message::Close(None)).await.unwrap();
    });

    let (mut session, mut events) = TunerSession::connect(SessionConfig::new(endpoint))
        .await
        .unwrap();
    assert_eq!(session.status(), ConnectionStatus::Connected);
    assert!(session.last_measurement().is_none());

    let feed = session.sample_feed();
    assert!(feed.send(vec![0.25f32; BLOCK_SIZE]));

    // First measurement: A2 at -2 cents is in tune.
    match events.recv().await.unwrap() {
        TunerEvent::Measurement(m) => {
            assert_eq!(m.frequency, 110.0);
            assert_eq!(m.string_index, Some(4));
            assert_eq!(m.intonation, Intonation::InTune);
        }
        other => panic!("expected measurement, got {other:?}"),
    }

    // Second measurement: near G3, sharp. The bad frames in between were
    // dropped without killing the connection.
    match events.recv().await.unwrap() {
        TunerEvent::Measurement(m) => {
            assert_eq!(m.string_index, Some(2));
            assert_eq!(m.intonation, Intonation::Sharp);
        }
        other => panic!("expected measurement, got {other:?}"),
    }
    assert!(session.last_measurement().is_some());

    match events.recv().await.unwrap() {
        TunerEvent::Disconnected { .. } => {}
        other => panic!("expected disconnect, got {other:?}"),
    }
    assert_eq!(session.status(), ConnectionStatus::Disconnected);

    // A dead session rejects capture cleanly and stays idle.
    let err = session.start_capture().unwrap_err();
    assert!(matches!(err, TunerError::InvalidState(_)));
    assert!(!session.is_capturing());

    server.await.unwrap();
}

#[tokio::test]
async fn tuning_can_change_while_idle_and_session_closes_cleanly() {
    let (listener, endpoint) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        // 75 Hz: nearest to E2 (82.41) in standard, D2 (73.42) in drop D.
        ws.send(Message::Text(
            r#"{"type":"pitch","frequency":75.0,"cents":1.0}"#.into(),
        ))
        .await
        .unwrap();
        // Hold the socket open until the client closes.
        while let Some(Ok(msg)) = ws.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    let (mut session, mut events) = TunerSession::connect(SessionConfig::new(endpoint))
        .await
        .unwrap();

    match events.recv().await.unwrap() {
        TunerEvent::Measurement(m) => assert_eq!(m.string_index, Some(5)),
        other => panic!("expected measurement, got {other:?}"),
    }

    // Switch to Drop D while idle; the tuning is allowed to change.
    session.select_tuning(1).unwrap();
    assert_eq!(session.tuning().name, "Drop D");

    session.close().await;
    server.await.unwrap();
}

#[tokio::test]
async fn silent_detector_trips_the_idle_timeout() {
    let (listener, endpoint) = bind().await;

    // Accepts and drains the audio frames but never sends a measurement.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let mut config = SessionConfig::new(endpoint);
    config.idle_timeout = Some(Duration::from_millis(200));
    let (mut session, mut events) = TunerSession::connect(config).await.unwrap();
    let feed = session.sample_feed();

    // Keep outbound audio flowing so the link counts as active; the timeout
    // must still fire off inbound silence alone.
    let reason = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            feed.send(vec![0.0f32; BLOCK_SIZE]);
            tokio::select! {
                event = events.recv() => match event {
                    Some(TunerEvent::Disconnected { reason }) => break reason,
                    Some(TunerEvent::Measurement(_)) => {
                        panic!("server never sent a measurement")
                    }
                    None => panic!("event stream ended without a disconnect"),
                },
                _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            }
        }
    })
    .await
    .expect("idle timeout never reported disconnection");

    assert!(reason.contains("silent"), "unexpected reason: {reason}");
    assert_eq!(session.status(), ConnectionStatus::Disconnected);
    server.abort();
}

#[tokio::test]
async fn connect_gives_up_after_bounded_attempts() {
    // Bind then drop to get a port nothing listens on.
    let (listener, endpoint) = bind().await;
    drop(listener);

    let mut config = SessionConfig::new(endpoint);
    config.max_connect_attempts = 2;
    config.initial_backoff = Duration::from_millis(10);

    let started = std::time::Instant::now();
    let err = TunerSession::connect(config).await.unwrap_err();
    assert!(matches!(err, TunerError::Connection(_)));
    // Two attempts with one 10 ms backoff in between, not an endless loop.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn full_audio_queue_drops_blocks_instead_of_blocking() {
    let (listener, endpoint) = bind().await;

    // A server that accepts the handshake but never reads, so the socket
    // send buffer and the audio queue both fill up.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let _ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let mut config = SessionConfig::new(endpoint);
    config.audio_queue_blocks = 2;
    let (session, _events) = TunerSession::connect(config).await.unwrap();

    let feed = session.sample_feed();
    let mut dropped = false;
    for _ in 0..64 {
        if !feed.send(vec![0.0f32; BLOCK_SIZE]) {
            dropped = true;
            break;
        }
    }
    assert!(dropped, "a bounded queue must eventually refuse blocks");

    drop(session);
    server.abort();
}
