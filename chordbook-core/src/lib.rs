// chordbook-core/src/lib.rs

//! The core logic for the chordbook client.
//! This crate owns the tuner session (microphone capture, PCM16 framing,
//! the duplex connection to the pitch-detection service, nearest-string
//! classification), chord transposition, and the thin REST boundary to the
//! song/playlist backend. It is completely headless and contains no
//! terminal or GUI code.

pub mod api;
pub mod audio;
pub mod chords;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod session;
pub mod tuning;

pub use error::{ApiError, TunerError};
pub use session::{
    ConnectionStatus, Measurement, SessionConfig, TunerEvent, TunerSession,
};
pub use tuning::{Intonation, TuningProfile, TUNINGS};
