//! Audio output - cpal stream hosting the mixer
//!
//! Desktop output path. The mixer moves into the cpal callback; everything
//! the tick thread needs afterwards (the device clock) was cloned out
//! before. Stream errors are logged, not propagated - by the time they can
//! occur the engine is already running and per-tick conditions never halt
//! it.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::info;

use crate::error::OutputError;

use super::mixer::Mixer;

/// A running output stream. Dropping it stops playback.
pub struct OutputHandle {
    _stream: cpal::Stream,
    sample_rate: u32,
    channels: usize,
}

impl OutputHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

/// Sample rate and channel count of the default output device.
///
/// Queried before the engine is built so the sample bank and mixer are laid
/// out for the real device format.
pub fn probe_default_output() -> Result<(u32, usize), OutputError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(OutputError::NoDevice)?;
    let config = device
        .default_output_config()
        .map_err(|e| OutputError::StreamOpenFailed {
            reason: format!("failed to get default output config: {:?}", e),
        })?;
    Ok((config.sample_rate().0, config.channels() as usize))
}

/// Open the default output device and start rendering `mixer` into it.
///
/// The mixer must have been built for the probed sample rate and channel
/// count; call [Mixer::prime] before handing it over.
pub fn start(mut mixer: Mixer) -> Result<OutputHandle, OutputError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(OutputError::NoDevice)?;
    let config = device
        .default_output_config()
        .map_err(|e| OutputError::StreamOpenFailed {
            reason: format!("failed to get default output config: {:?}", e),
        })?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let stream_config: cpal::StreamConfig = config.clone().into();

    let err_fn = |err| eprintln!("Output stream error: {}", err);

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    mixer.render(data);
                },
                err_fn,
                None,
            )
            .map_err(|e| OutputError::StreamOpenFailed {
                reason: format!("{:?}", e),
            })?,
        other => {
            return Err(OutputError::UnsupportedFormat {
                format: format!("{:?}", other),
            })
        }
    };

    stream.play().map_err(|e| OutputError::StreamOpenFailed {
        reason: format!("{:?}", e),
    })?;

    info!(
        "[Output] Stream started ({} Hz, {} channels)",
        sample_rate, channels
    );

    Ok(OutputHandle {
        _stream: stream,
        sample_rate,
        channels,
    })
}
