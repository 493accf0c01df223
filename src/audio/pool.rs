//! AudioPlaybackPool - pre-warmed voice pools per sound
//!
//! Hides sample-decode and allocation latency from the trigger path. Every
//! registered sound gets a fixed set of voices bound at startup; a trigger
//! selects the first idle voice, or forcibly reclaims the least-recently-
//! started one when the pool is exhausted - audible truncation is traded
//! for response latency, and pool exhaustion is never an error.
//!
//! All three play operations return without blocking: they reduce to one
//! push onto the lock-free command queue the mixer drains.

use log::warn;
use rtrb::{Producer, RingBuffer};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::PlaybackError;

use super::mixer::{DeviceClock, Mixer};
use super::sample::{Sample, SampleBank};
use super::voice::{VoiceCommand, VoiceShared};

/// Default number of voices bound to each sound.
pub const DEFAULT_VOICES_PER_SOUND: usize = 3;

#[derive(Debug)]
struct PooledVoice {
    /// Global mixer slot this voice renders through.
    slot: usize,
    shared: Arc<VoiceShared>,
    /// Issue-order stamp for least-recently-started reclamation.
    last_started_seq: u64,
}

#[derive(Debug)]
struct VoicePool {
    voices: Vec<PooledVoice>,
    rate_scale: f32,
}

impl VoicePool {
    /// First idle voice, else the least-recently-started one.
    ///
    /// The busy flag read here may be stale by one callback block; that can
    /// only make us restart a voice that just finished, which is harmless.
    fn select(&mut self, seq: u64) -> usize {
        let index = self
            .voices
            .iter()
            .position(|voice| !voice.shared.is_playing())
            .unwrap_or_else(|| {
                self.voices
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, voice)| voice.last_started_seq)
                    .map(|(i, _)| i)
                    .expect("voice pool is never empty")
            });
        self.voices[index].last_started_seq = seq;
        self.voices[index].slot
    }
}

/// Owner of all voice pools; the tick-thread half of the playback path.
pub struct PlaybackPool {
    pools: BTreeMap<String, VoicePool>,
    commands: Producer<VoiceCommand>,
    clock: DeviceClock,
    next_seq: u64,
}

impl PlaybackPool {
    pub(crate) fn new(
        bank: &SampleBank,
        voices_per_sound: usize,
        commands: Producer<VoiceCommand>,
        clock: DeviceClock,
    ) -> (Self, Vec<(Arc<Sample>, Arc<VoiceShared>)>) {
        let device_rate = clock.sample_rate();
        let mut pools = BTreeMap::new();
        let mut bindings = Vec::with_capacity(bank.len() * voices_per_sound);

        for (name, sample) in bank.iter() {
            let mut voices = Vec::with_capacity(voices_per_sound);
            for _ in 0..voices_per_sound {
                let shared = Arc::new(VoiceShared::new());
                voices.push(PooledVoice {
                    slot: bindings.len(),
                    shared: Arc::clone(&shared),
                    last_started_seq: 0,
                });
                bindings.push((Arc::clone(sample), shared));
            }
            pools.insert(
                name.clone(),
                VoicePool {
                    voices,
                    rate_scale: sample.rate_scale(device_rate),
                },
            );
        }

        (
            Self {
                pools,
                commands,
                clock,
                next_seq: 1,
            },
            bindings,
        )
    }

    /// Play `sound` as soon as possible at its natural pitch.
    pub fn play_immediate(&mut self, sound: &str) -> Result<(), PlaybackError> {
        self.trigger(sound, 1.0, 0)
    }

    /// Play `sound` at `device clock now + offset_seconds`.
    ///
    /// A negative offset means "as soon as possible, compensating for known
    /// output-path latency". Never blocks waiting for the start time.
    pub fn play_scheduled(&mut self, sound: &str, offset_seconds: f64) -> Result<(), PlaybackError> {
        let start_frame = self.clock.frames_after(offset_seconds);
        self.trigger(sound, 1.0, start_frame)
    }

    /// Play `sound` immediately with its playback rate scaled by
    /// `pitch_multiplier`.
    pub fn play_pitched(&mut self, sound: &str, pitch_multiplier: f32) -> Result<(), PlaybackError> {
        self.trigger(sound, pitch_multiplier, 0)
    }

    fn trigger(
        &mut self,
        sound: &str,
        pitch_multiplier: f32,
        start_frame: u64,
    ) -> Result<(), PlaybackError> {
        let pool = self
            .pools
            .get_mut(sound)
            .ok_or_else(|| PlaybackError::UnknownSound {
                sound: sound.to_string(),
            })?;

        let seq = self.next_seq;
        self.next_seq += 1;
        let slot = pool.select(seq);

        // Rate always carries the sample's source-rate compensation, so a
        // voice reused for an unpitched sound is reset to its natural rate.
        let command = VoiceCommand {
            slot,
            start_frame,
            rate: pitch_multiplier * pool.rate_scale,
        };
        if self.commands.push(command).is_err() {
            warn!(
                "[PlaybackPool] Command queue full, dropping trigger for '{}'",
                sound
            );
        }
        Ok(())
    }

    /// Registered sound count, for diagnostics.
    pub fn sound_count(&self) -> usize {
        self.pools.len()
    }

    pub fn contains(&self, sound: &str) -> bool {
        self.pools.contains_key(sound)
    }

    pub fn clock(&self) -> &DeviceClock {
        &self.clock
    }
}

/// Wire a pool and its mixer around a shared command queue and clock.
///
/// The pool stays on the tick thread; the mixer moves into the device
/// callback (or is driven directly in headless mode). Call
/// [Mixer::prime] once before the first trigger.
pub fn build_pipeline(
    bank: &SampleBank,
    voices_per_sound: usize,
    sample_rate: u32,
    channels: usize,
) -> (PlaybackPool, Mixer) {
    let capacity = (bank.len() * voices_per_sound * 4).max(64);
    let (producer, consumer) = RingBuffer::new(capacity);
    let clock = DeviceClock::new(sample_rate);
    let (pool, bindings) = PlaybackPool::new(bank, voices_per_sound, producer, clock.clone());
    let mixer = Mixer::new(bindings, consumer, clock, channels);
    (pool, mixer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sample::SoundSource;

    fn click_bank(names: &[&str]) -> SampleBank {
        let mut sources = BTreeMap::new();
        for &name in names {
            sources.insert(name.to_string(), SoundSource::Click);
        }
        let (bank, diagnostics) = SampleBank::load(&sources, 48_000);
        assert!(diagnostics.is_empty());
        bank
    }

    fn pool_with_consumer(
        names: &[&str],
        voices_per_sound: usize,
    ) -> (PlaybackPool, rtrb::Consumer<VoiceCommand>) {
        let bank = click_bank(names);
        let (producer, consumer) = RingBuffer::new(64);
        let clock = DeviceClock::new(48_000);
        let (pool, _bindings) = PlaybackPool::new(&bank, voices_per_sound, producer, clock);
        (pool, consumer)
    }

    #[test]
    fn test_unknown_sound_reports_without_side_effects() {
        let (mut pool, mut consumer) = pool_with_consumer(&["kick"], 3);
        let err = pool.play_immediate("cowbell").unwrap_err();
        assert!(matches!(err, PlaybackError::UnknownSound { ref sound } if sound == "cowbell"));
        assert!(consumer.pop().is_err(), "no command may be issued");
    }

    #[test]
    fn test_idle_voices_rotate_before_reclamation() {
        let (mut pool, mut consumer) = pool_with_consumer(&["kick"], 3);

        // Mark each selected voice busy, as the mixer would.
        let mut slots = Vec::new();
        for _ in 0..3 {
            pool.play_immediate("kick").unwrap();
            let command = consumer.pop().unwrap();
            slots.push(command.slot);
            let voice_pool = pool.pools.get("kick").unwrap();
            voice_pool
                .voices
                .iter()
                .find(|v| v.slot == command.slot)
                .unwrap()
                .shared
                .set_playing(true);
        }
        slots.sort_unstable();
        slots.dedup();
        assert_eq!(slots.len(), 3, "three triggers must use three distinct voices");
    }

    #[test]
    fn test_exhausted_pool_reclaims_least_recently_started() {
        let (mut pool, mut consumer) = pool_with_consumer(&["kick"], 2);

        let mut started = Vec::new();
        for _ in 0..2 {
            pool.play_immediate("kick").unwrap();
            let command = consumer.pop().unwrap();
            started.push(command.slot);
            pool.pools
                .get("kick")
                .unwrap()
                .voices
                .iter()
                .find(|v| v.slot == command.slot)
                .unwrap()
                .shared
                .set_playing(true);
        }

        // All voices busy: the next trigger must reclaim the first-started
        // voice, and the one after it the second.
        pool.play_immediate("kick").unwrap();
        assert_eq!(consumer.pop().unwrap().slot, started[0]);
        pool.play_immediate("kick").unwrap();
        assert_eq!(consumer.pop().unwrap().slot, started[1]);
    }

    #[test]
    fn test_pitched_rate_then_reset_on_reuse() {
        let (mut pool, mut consumer) = pool_with_consumer(&["note"], 1);

        pool.play_pitched("note", 1.5).unwrap();
        let pitched = consumer.pop().unwrap();
        assert!((pitched.rate - 1.5).abs() < 1e-6);

        // Same voice reused unpitched: rate must come back to 1.0.
        pool.play_immediate("note").unwrap();
        let reset = consumer.pop().unwrap();
        assert_eq!(reset.slot, pitched.slot);
        assert!((reset.rate - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_schedule_offset_starts_now() {
        let (mut pool, mut consumer) = pool_with_consumer(&["kick"], 1);
        pool.play_scheduled("kick", -0.05).unwrap();
        let command = consumer.pop().unwrap();
        assert_eq!(command.start_frame, 0, "negative offset clamps to the present");
    }

    #[test]
    fn test_positive_schedule_offset_lands_in_the_future() {
        let (mut pool, mut consumer) = pool_with_consumer(&["kick"], 1);
        pool.play_scheduled("kick", 0.25).unwrap();
        let command = consumer.pop().unwrap();
        assert_eq!(command.start_frame, 12_000);
    }

    #[test]
    fn test_build_pipeline_end_to_end() {
        let bank = click_bank(&["kick", "snare"]);
        let (mut pool, mut mixer) = build_pipeline(&bank, 2, 48_000, 2);
        mixer.prime();

        pool.play_immediate("kick").unwrap();
        let mut out = vec![0.0f32; 512 * 2];
        mixer.render(&mut out);
        assert!(
            out.iter().any(|&s| s != 0.0),
            "a triggered click must be audible in the next block"
        );
    }
}
