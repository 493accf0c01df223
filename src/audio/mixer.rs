//! Mixer - callback-side voice rendering and the device frame clock
//!
//! Runs inside the audio device callback (or is driven directly in headless
//! mode). Per block: drain pending voice commands, mix every active voice
//! into the interleaved output buffer, advance the device clock. Real-time
//! safe: no allocation, no locks, bounded work per block.

use rtrb::Consumer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::sample::Sample;
use super::voice::{VoiceCommand, VoiceShared};

/// Shared monotonic device clock, counted in output frames.
///
/// The callback advances it; everyone else converts frames to seconds for
/// scheduling. Tick timing is never sample-accurate, so scheduled starts
/// are expressed against this clock instead.
#[derive(Debug, Clone)]
pub struct DeviceClock {
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl DeviceClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    #[inline]
    pub fn now_frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn now_seconds(&self) -> f64 {
        self.now_frames() as f64 / self.sample_rate as f64
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Absolute frame for "now + offset". Negative offsets clamp to now:
    /// "as soon as possible, compensating for known output-path latency".
    pub fn frames_after(&self, offset_seconds: f64) -> u64 {
        let now = self.now_frames();
        let offset_frames = (offset_seconds * self.sample_rate as f64).round() as i64;
        if offset_frames <= 0 {
            now
        } else {
            now.saturating_add(offset_frames as u64)
        }
    }

    #[inline]
    fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::Relaxed);
    }
}

/// Callback-owned playback state for one voice slot.
struct MixerVoice {
    sample: Arc<Sample>,
    shared: Arc<VoiceShared>,
    position: f64,
    rate: f32,
    start_frame: u64,
    active: bool,
}

impl MixerVoice {
    fn apply(&mut self, command: &VoiceCommand) {
        // Superseding an active voice restarts it; that is the documented
        // reclamation behavior, not an error.
        self.position = 0.0;
        self.rate = command.rate;
        self.start_frame = command.start_frame;
        self.active = true;
        self.shared.set_playing(true);
    }

    /// Next output sample, linear-interpolated at the playback rate.
    /// Returns `None` once the clip is exhausted.
    #[inline]
    fn next_sample(&mut self) -> Option<f32> {
        let frames = &self.sample.frames;
        let index = self.position as usize;
        if index >= frames.len() {
            return None;
        }
        let frac = (self.position - index as f64) as f32;
        let current = frames[index];
        let next = if index + 1 < frames.len() {
            frames[index + 1]
        } else {
            0.0
        };
        self.position += self.rate as f64;
        Some(current + (next - current) * frac)
    }
}

/// Voice mixer driven by the audio callback.
pub struct Mixer {
    voices: Vec<MixerVoice>,
    commands: Consumer<VoiceCommand>,
    clock: DeviceClock,
    channels: usize,
}

impl Mixer {
    pub(crate) fn new(
        voices: Vec<(Arc<Sample>, Arc<VoiceShared>)>,
        commands: Consumer<VoiceCommand>,
        clock: DeviceClock,
        channels: usize,
    ) -> Self {
        let voices = voices
            .into_iter()
            .map(|(sample, shared)| MixerVoice {
                sample,
                shared,
                position: 0.0,
                rate: 1.0,
                start_frame: 0,
                active: false,
            })
            .collect();
        Self {
            voices,
            commands,
            clock,
            channels,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// One-time prime pass before the first real trigger.
    ///
    /// Touches every voice's sample data and runs the mix loop once into a
    /// silent scratch block, so page faults and lazy setup happen here, not
    /// on the first trigger. Does not start any voice or move the clock.
    pub fn prime(&mut self) {
        let mut acc = 0.0f32;
        for voice in &self.voices {
            for &frame in &voice.sample.frames {
                acc += frame;
            }
        }
        std::hint::black_box(acc);

        let mut scratch = vec![0.0f32; 256 * self.channels];
        self.mix_block(&mut scratch, self.clock.now_frames());
        log::info!("[Mixer] Primed {} voices", self.voices.len());
    }

    /// Render one interleaved output block and advance the device clock.
    pub fn render(&mut self, out: &mut [f32]) {
        while let Ok(command) = self.commands.pop() {
            if let Some(voice) = self.voices.get_mut(command.slot) {
                voice.apply(&command);
            }
        }

        let block_start = self.clock.now_frames();
        let frame_count = self.mix_block(out, block_start);
        self.clock.advance(frame_count as u64);
    }

    fn mix_block(&mut self, out: &mut [f32], block_start: u64) -> usize {
        let channels = self.channels;
        let frame_count = out.len() / channels;

        for i in 0..frame_count {
            let device_frame = block_start + i as u64;
            let mut mixed = 0.0f32;

            for voice in &mut self.voices {
                if !voice.active || device_frame < voice.start_frame {
                    continue;
                }
                match voice.next_sample() {
                    Some(sample) => mixed += sample,
                    None => {
                        voice.active = false;
                        voice.shared.set_playing(false);
                    }
                }
            }

            let clamped = mixed.clamp(-1.0, 1.0);
            for ch in 0..channels {
                out[i * channels + ch] = clamped;
            }
        }

        frame_count
    }

    /// True while any voice is active (scheduled or sounding).
    pub fn any_active(&self) -> bool {
        self.voices.iter().any(|v| v.active)
    }
}
