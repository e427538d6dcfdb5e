//! # Tuner Session Controller
//!
//! Bridges raw microphone audio to the remote pitch detector over one duplex
//! WebSocket and converts returned measurements into a nearest-string,
//! in-tune/flat/sharp classification for display.
//!
//! ## Architecture
//! - **Producer**: the CPAL callback ([`crate::audio`]) feeds fixed-size
//!   sample blocks into a bounded channel.
//! - **I/O task**: a single `tokio::select!` loop owns the socket. It drains
//!   the audio channel, encodes PCM16 and sends binary frames in capture
//!   order; independently it parses inbound JSON frames, classifies them
//!   against the active tuning and emits [`TunerEvent`]s. The two directions
//!   are ordered among themselves, never relative to each other.
//! - **Observers**: connection status and the latest measurement are exposed
//!   through watch channels; renderers only read derived state.
//!
//! Connecting is bounded: a fixed number of attempts with exponential
//! backoff, never an infinite silent retry. Losing the connection while
//! capturing stops capture explicitly rather than letting frames vanish into
//! a dead socket.

use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::audio::{self, CaptureHandle};
use crate::error::TunerError;
use crate::frame;
use crate::protocol::{self, DetectorMessage};
use crate::tuning::{self, Intonation, TuningProfile, TUNINGS};

/// Connection state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Capture sub-state, orthogonal to the connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
}

/// One classified pitch measurement, ready for display. Ephemeral: each is
/// superseded by the next detection cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Detected frequency in Hz (0 means silence)
    pub frequency: f32,
    /// Deviation from the nearest note in cents
    pub cents: f32,
    /// Nearest string in the active profile, `None` for silence
    pub string_index: Option<usize>,
    /// Flat / in tune / sharp against the ±5-cent band
    pub intonation: Intonation,
}

/// Events delivered to the session's consumer.
#[derive(Debug, Clone)]
pub enum TunerEvent {
    Measurement(Measurement),
    /// The connection closed or errored. The session is Disconnected and
    /// stays so until the caller opens a new one.
    Disconnected { reason: String },
}

/// Session configuration. `endpoint` is the full WebSocket URL, typically
/// from [`protocol::tuner_endpoint`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub endpoint: String,
    /// Connection attempts before giving up (at least 1).
    pub max_connect_attempts: u32,
    /// Backoff before the second attempt; doubles each retry.
    pub initial_backoff: Duration,
    /// Bounded audio queue depth, in blocks. When full, new blocks drop.
    pub audio_queue_blocks: usize,
    /// Liveness check: if set and audio is being sent but nothing inbound
    /// arrives within this window, the session reports disconnection.
    pub idle_timeout: Option<Duration>,
}

impl SessionConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            max_connect_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            audio_queue_blocks: 8,
            idle_timeout: None,
        }
    }
}

/// The pure state machine behind the session: all guard rules live here so
/// they can be tested without audio hardware or a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionState {
    pub status: ConnectionStatus,
    pub capture: CaptureState,
    pub tuning_index: usize,
}

impl SessionState {
    fn new() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            capture: CaptureState::Idle,
            tuning_index: 0,
        }
    }

    /// Guards the Idle → Capturing transition. Starting while already
    /// capturing is a no-op (`Ok(false)`); starting while not connected is
    /// rejected and leaves capture Idle.
    fn begin_capture(&mut self) -> Result<bool, TunerError> {
        if self.capture == CaptureState::Capturing {
            return Ok(false);
        }
        if self.status != ConnectionStatus::Connected {
            return Err(TunerError::InvalidState(
                "cannot start capture while disconnected",
            ));
        }
        self.capture = CaptureState::Capturing;
        Ok(true)
    }

    /// Capturing → Idle. Idempotent.
    fn end_capture(&mut self) {
        self.capture = CaptureState::Idle;
    }

    /// Replaces the active tuning. Disallowed mid-capture so measurements
    /// are never matched against a table that no longer fits the audio.
    fn select_tuning(&mut self, index: usize) -> Result<(), TunerError> {
        if self.capture == CaptureState::Capturing {
            return Err(TunerError::InvalidState(
                "cannot change tuning while capturing",
            ));
        }
        if index >= TUNINGS.len() {
            return Err(TunerError::InvalidState("unknown tuning index"));
        }
        self.tuning_index = index;
        Ok(())
    }
}

/// Producer handle into the session's bounded audio queue.
///
/// [`TunerSession::start_capture`] wires the microphone to one of these;
/// alternative producers (tests, prerecorded audio) can feed blocks
/// directly.
#[derive(Debug, Clone)]
pub struct SampleFeed {
    tx: mpsc::Sender<Vec<f32>>,
}

impl SampleFeed {
    /// Queues one block without blocking. Returns `false` when the block was
    /// dropped because the queue is full or the connection is gone.
    pub fn send(&self, block: Vec<f32>) -> bool {
        self.tx.try_send(block).is_ok()
    }
}

/// A live tuner session: owns the microphone handle and the socket I/O task.
///
/// Not `Send` — the capture handle wraps a platform audio stream; keep the
/// session on the task that created it.
#[derive(Debug)]
pub struct TunerSession {
    state: SessionState,
    audio_tx: mpsc::Sender<Vec<f32>>,
    capture: Option<CaptureHandle>,
    status_rx: watch::Receiver<ConnectionStatus>,
    tuning_tx: watch::Sender<usize>,
    measurement_rx: watch::Receiver<Option<Measurement>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    io_task: Option<tokio::task::JoinHandle<()>>,
}

impl TunerSession {
    /// Opens the duplex stream to the detector and spawns the I/O task.
    ///
    /// Dials at most `config.max_connect_attempts` times with exponential
    /// backoff between attempts. On success the session is `Connected` and
    /// the returned receiver delivers [`TunerEvent`]s until disconnection.
    /// A session connects exactly once; reconnection means dropping it and
    /// connecting a new one.
    pub async fn connect(
        config: SessionConfig,
    ) -> Result<(Self, mpsc::Receiver<TunerEvent>), TunerError> {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);

        let ws = dial(&config, &status_tx).await?;
        info!(endpoint = %config.endpoint, "tuner connected");
        status_tx.send_replace(ConnectionStatus::Connected);

        let (audio_tx, audio_rx) = mpsc::channel(config.audio_queue_blocks.max(1));
        let (event_tx, event_rx) = mpsc::channel(64);
        let (tuning_tx, tuning_rx) = watch::channel(0usize);
        let (measurement_tx, measurement_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let io_task = tokio::spawn(run_io(IoTask {
            ws,
            audio_rx,
            event_tx,
            tuning_rx,
            measurement_tx,
            status_tx,
            idle_timeout: config.idle_timeout,
            shutdown_rx,
        }));

        let mut state = SessionState::new();
        state.status = ConnectionStatus::Connected;

        Ok((
            Self {
                state,
                audio_tx,
                capture: None,
                status_rx,
                tuning_tx,
                measurement_rx,
                shutdown_tx: Some(shutdown_tx),
                io_task: Some(io_task),
            },
            event_rx,
        ))
    }

    /// Current connection status.
    pub fn status(&mut self) -> ConnectionStatus {
        self.sync_status();
        self.state.status
    }

    pub fn is_capturing(&self) -> bool {
        self.state.capture == CaptureState::Capturing
    }

    /// The active tuning profile.
    pub fn tuning(&self) -> &'static TuningProfile {
        &TUNINGS[self.state.tuning_index]
    }

    /// The most recent classified measurement, if any arrived yet.
    pub fn last_measurement(&self) -> Option<Measurement> {
        self.measurement_rx.borrow().clone()
    }

    /// Producer handle for feeding sample blocks without a microphone.
    pub fn sample_feed(&self) -> SampleFeed {
        SampleFeed {
            tx: self.audio_tx.clone(),
        }
    }

    /// Requests microphone access and starts streaming audio blocks.
    ///
    /// Fails with `InvalidState` when the session is not connected and with
    /// `PermissionDenied` when the microphone cannot be opened; either way
    /// capture stays Idle. Starting while already capturing is a no-op.
    pub fn start_capture(&mut self) -> Result<(), TunerError> {
        self.sync_status();
        if !self.state.begin_capture()? {
            return Ok(());
        }
        match audio::start_capture(self.audio_tx.clone()) {
            Ok(handle) => {
                debug!("capture started");
                self.capture = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.state.end_capture();
                Err(e)
            }
        }
    }

    /// Releases the microphone. The audio callback is detached before the
    /// device is released, so no block is queued after this returns.
    /// Idempotent: stopping an idle session is a no-op.
    pub fn stop_capture(&mut self) {
        if self.capture.take().is_some() {
            debug!("capture stopped");
        }
        self.state.end_capture();
    }

    /// Replaces the active tuning profile by index into [`TUNINGS`].
    ///
    /// Fails with `InvalidState` while capturing.
    pub fn select_tuning(&mut self, index: usize) -> Result<(), TunerError> {
        self.state.select_tuning(index)?;
        self.tuning_tx.send_replace(index);
        Ok(())
    }

    /// Stops capture and closes the connection, waiting for the I/O task to
    /// send the close frame and exit.
    pub async fn close(mut self) {
        self.stop_capture();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.io_task.take() {
            let _ = task.await;
        }
    }

    /// Folds the I/O task's status into the state machine. A lost connection
    /// also stops capture: an explicit transition instead of letting frames
    /// drop silently into a closed socket.
    fn sync_status(&mut self) {
        let status = *self.status_rx.borrow();
        if status == ConnectionStatus::Disconnected
            && self.state.capture == CaptureState::Capturing
        {
            warn!("connection lost while capturing; stopping capture");
            self.stop_capture();
        }
        self.state.status = status;
    }
}

impl Drop for TunerSession {
    fn drop(&mut self) {
        // Mic first, then the socket.
        self.capture = None;
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Dials the endpoint with bounded retry and exponential backoff.
async fn dial(
    config: &SessionConfig,
    status_tx: &watch::Sender<ConnectionStatus>,
) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>, TunerError> {
    let attempts = config.max_connect_attempts.max(1);
    let mut backoff = config.initial_backoff;
    let mut last_err = String::new();

    for attempt in 1..=attempts {
        match connect_async(config.endpoint.as_str()).await {
            Ok((ws, _response)) => return Ok(ws),
            Err(e) => {
                warn!(attempt, error = %e, "tuner connection attempt failed");
                last_err = e.to_string();
                if attempt < attempts {
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    status_tx.send_replace(ConnectionStatus::Disconnected);
    Err(TunerError::Connection(last_err))
}

struct IoTask {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    audio_rx: mpsc::Receiver<Vec<f32>>,
    event_tx: mpsc::Sender<TunerEvent>,
    tuning_rx: watch::Receiver<usize>,
    measurement_tx: watch::Sender<Option<Measurement>>,
    status_tx: watch::Sender<ConnectionStatus>,
    idle_timeout: Option<Duration>,
    shutdown_rx: oneshot::Receiver<()>,
}

/// The single task that owns the socket: outbound audio frames and inbound
/// measurements interleave here, each direction strictly ordered.
async fn run_io(task: IoTask) {
    let IoTask {
        ws,
        mut audio_rx,
        event_tx,
        tuning_rx,
        measurement_tx,
        status_tx,
        idle_timeout,
        mut shutdown_rx,
    } = task;

    let (mut sink, mut stream) = ws.split();
    let mut last_inbound = Instant::now();
    let mut last_outbound: Option<Instant> = None;
    // Liveness granularity; only consulted when idle_timeout is set. An
    // interval keeps ticking across loop iterations, so a busy socket cannot
    // starve the check.
    let check_period = idle_timeout.unwrap_or(Duration::from_secs(60)) / 2;
    let mut liveness = tokio::time::interval(check_period);
    liveness.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let reason: Option<String> = loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                let _ = sink.send(Message::Close(None)).await;
                break None;
            }

            block = audio_rx.recv() => match block {
                Some(samples) => {
                    let payload = frame::encode_pcm16_le(&samples);
                    last_outbound = Some(Instant::now());
                    if let Err(e) = sink.send(Message::Binary(payload)).await {
                        break Some(format!("send failed: {e}"));
                    }
                }
                // All producers (session + feeds) are gone.
                None => break None,
            },

            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    last_inbound = Instant::now();
                    handle_text(&text, &tuning_rx, &measurement_tx, &event_tx);
                }
                Some(Ok(Message::Close(frame))) => {
                    let detail = frame
                        .map(|f| format!("code {}", f.code))
                        .unwrap_or_else(|| "no close frame".into());
                    break Some(format!("connection closed ({detail})"));
                }
                Some(Ok(_)) => {} // ping/pong and stray binary frames
                Some(Err(e)) => break Some(format!("transport error: {e}")),
                None => break Some("connection closed".into()),
            },

            _ = liveness.tick(), if idle_timeout.is_some() => {
                let timeout = idle_timeout.unwrap();
                let capturing = last_outbound
                    .map(|t| t.elapsed() < timeout)
                    .unwrap_or(false);
                if capturing && last_inbound.elapsed() > timeout {
                    break Some("detector went silent".into());
                }
            }
        }
    };

    status_tx.send_replace(ConnectionStatus::Disconnected);
    if let Some(reason) = reason {
        info!(%reason, "tuner disconnected");
        let _ = event_tx.try_send(TunerEvent::Disconnected { reason });
    }
}

/// Parses one inbound text frame and, for pitch messages, classifies it
/// against the active tuning. Malformed frames are logged and dropped.
fn handle_text(
    text: &str,
    tuning_rx: &watch::Receiver<usize>,
    measurement_tx: &watch::Sender<Option<Measurement>>,
    event_tx: &mpsc::Sender<TunerEvent>,
) {
    match protocol::parse_message(text) {
        Ok(DetectorMessage::Pitch { frequency, cents }) => {
            let profile = &TUNINGS[*tuning_rx.borrow()];
            let measurement = Measurement {
                frequency,
                cents,
                string_index: tuning::nearest_string(frequency, profile),
                intonation: tuning::classify_cents(cents),
            };
            measurement_tx.send_replace(Some(measurement.clone()));
            // try_send: a slow consumer loses superseded measurements, the
            // I/O loop never blocks on it.
            let _ = event_tx.try_send(TunerEvent::Measurement(measurement));
        }
        Ok(DetectorMessage::Unknown) => {
            debug!("ignoring unrecognized detector message");
        }
        Err(e) => {
            warn!(error = %e, "dropping malformed detector message");
        }
    }
}
