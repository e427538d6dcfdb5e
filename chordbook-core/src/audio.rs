//! # Audio Capture Module
//!
//! Real-time microphone capture using CPAL (Cross-Platform Audio Library).
//! The input callback accumulates samples and pushes fixed-size blocks into a
//! bounded channel; the session's I/O task drains the channel, frames the
//! blocks as PCM16 and sends them to the pitch-detection service.
//!
//! ## Features
//! - Automatic input device selection (mono, f32, supporting 44.1 kHz)
//! - Fixed-size block production in capture order
//! - Drop-on-full backpressure: a stale block is discarded, never queued
//! - Synchronous, idempotent teardown via [`CaptureHandle`]

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use tokio::sync::mpsc::Sender;
use tracing::{debug, warn};

use crate::error::TunerError;
use crate::frame::{BLOCK_SIZE, SAMPLE_RATE};

/// Owns the live input stream. Dropping the handle detaches the audio
/// callback before the device is released, so no block can be produced after
/// teardown begins.
pub struct CaptureHandle {
    _stream: cpal::Stream,
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle").finish_non_exhaustive()
    }
}

/// Starts audio capture from the default input device.
///
/// This function:
/// 1. Selects the default audio input device
/// 2. Picks a mono f32 configuration whose rate range contains 44.1 kHz
/// 3. Sets up a callback that emits [`BLOCK_SIZE`]-sample blocks into `sender`
///
/// The callback never blocks: a full channel drops the block, since stale
/// audio is worse than missing audio for a live tuner.
///
/// # Errors
/// All failures map to [`TunerError::PermissionDenied`] — a refused
/// microphone grant and a missing/unusable device are indistinguishable at
/// this layer.
pub fn start_capture(sender: Sender<Vec<f32>>) -> Result<CaptureHandle, TunerError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| TunerError::PermissionDenied("no input device available".into()))?;

    debug!(
        device = %device.name().unwrap_or_else(|_| "<unnamed>".into()),
        "using audio input device"
    );

    let configs = device
        .supported_input_configs()
        .map_err(|e| TunerError::PermissionDenied(e.to_string()))?
        .collect::<Vec<_>>();
    let supported = find_supported_config(configs, SAMPLE_RATE)
        .ok_or_else(|| TunerError::PermissionDenied("no mono f32 input format available".into()))?;

    let config: cpal::StreamConfig = supported
        .with_sample_rate(cpal::SampleRate(SAMPLE_RATE))
        .into();

    let err_fn = |err| warn!("audio stream error: {err}");

    // Accumulates callback data until a full block is available.
    let mut pending: Vec<f32> = Vec::with_capacity(BLOCK_SIZE * 2);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                pending.extend_from_slice(data);

                while pending.len() >= BLOCK_SIZE {
                    let block = pending[..BLOCK_SIZE].to_vec();
                    if sender.try_send(block).is_err() {
                        // Consumer is behind or gone; drop rather than queue.
                        debug!("audio block dropped");
                    }
                    pending.drain(..BLOCK_SIZE);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| TunerError::PermissionDenied(e.to_string()))?;

    stream
        .play()
        .map_err(|e| TunerError::PermissionDenied(e.to_string()))?;

    Ok(CaptureHandle { _stream: stream })
}

/// Finds a supported audio configuration for the target sample rate: mono,
/// f32, and a sample-rate range that contains `target_rate`. A range that
/// does not contain the target cannot be opened at it, so such devices yield
/// `None` and the caller reports the error instead.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
        .find(|c| c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0)
}
