//! Engine - per-tick trigger orchestration
//!
//! Ties the pipeline together once per tick: sample the tracking frame,
//! feed channel values through the state machine, and for every firing
//! channel resolve sound and pitch, issue the playback-pool call, and fan
//! the resulting [TriggerEvent] out to listeners. The engine holds no
//! opinion on how the tick loop is driven; whatever external scheduler owns
//! the real-time loop calls [Engine::tick] with elapsed wall-clock time.
//!
//! Everything in a tick executes synchronously and in bounded time: no
//! blocking I/O, no allocation beyond the per-tick firing list, no waiting
//! on the audio device.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::audio::pool::build_pipeline;
use crate::audio::sample::SampleBank;
use crate::audio::{Mixer, PlaybackPool};
use crate::config::{EngineConfig, EngineMode};
use crate::error::{log_playback_error, ConfigError};
use crate::music::{pitch_multiplier, sequence_len, NoteSequence, Scale};
use crate::tracking::{ExpressionFrame, SignalSampler};
use crate::trigger::{Channel, Firing, TriggerEvent, TriggerListener, TriggerStateMachine};

/// How the pitched channel resolves a fire into audio.
enum NotePlan {
    /// One base sample, pitch-shifted through a generated scale.
    Pitched {
        sound: String,
        scale: Scale,
        base_offset: i8,
        sequence: NoteSequence,
    },
    /// Ordered list of discrete pre-rendered clips.
    Clips {
        clips: Vec<String>,
        sequence: NoteSequence,
    },
}

/// The expression-to-audio trigger engine.
///
/// Build with [Engine::new], register listeners, then drive [Engine::tick]
/// from the host frame loop. The returned [Mixer] belongs in the audio
/// device callback (or is rendered manually in headless mode).
pub struct Engine {
    config: EngineConfig,
    mode: EngineMode,
    sampler: SignalSampler,
    state_machine: TriggerStateMachine,
    notes: Option<NotePlan>,
    pool: PlaybackPool,
    listeners: Vec<Box<dyn TriggerListener>>,
    clock_seconds: f64,
}

impl Engine {
    /// Validate `config`, decode sounds, and wire the playback pipeline for
    /// a device running at `sample_rate` with `channels` output channels.
    ///
    /// Missing sound assets are reported and leave their channels as
    /// no-ops; only an inconsistent configuration is fatal. The mixer is
    /// primed before this returns, so the first real trigger pays no
    /// decode or allocation cost.
    pub fn new(
        config: EngineConfig,
        sample_rate: u32,
        channels: usize,
    ) -> Result<(Self, Mixer), ConfigError> {
        config.validate()?;

        let (bank, diagnostics) = SampleBank::load(&config.sounds, sample_rate);
        if !diagnostics.is_empty() {
            warn!(
                missing = diagnostics.len(),
                "some sound assets failed to load; their channels are no-ops"
            );
        }
        for (channel, binding) in [
            (Channel::Smile, &config.bindings.smile),
            (Channel::JawOpen, &config.bindings.jaw_open),
            (Channel::BrowRaise, &config.bindings.brow_raise),
        ] {
            match binding {
                Some(sound) if !bank.contains(sound) => {
                    warn!(
                        channel = channel.name(),
                        sound = sound.as_str(),
                        "bound sound is unavailable; channel will not play"
                    );
                }
                None => debug!(channel = channel.name(), "no sound bound"),
                _ => {}
            }
        }

        let notes = Self::build_note_plan(&config);

        let (pool, mut mixer) =
            build_pipeline(&bank, config.pool.voices_per_sound, sample_rate, channels);
        mixer.prime();

        let mode = config.mode;
        let state_machine = TriggerStateMachine::new(config.channel_settings(mode));

        info!(
            sounds = bank.len(),
            voices_per_sound = config.pool.voices_per_sound,
            mode = ?mode,
            sample_rate,
            "engine ready"
        );

        Ok((
            Self {
                config,
                mode,
                sampler: SignalSampler::new(),
                state_machine,
                notes,
                pool,
                listeners: Vec::new(),
                clock_seconds: 0.0,
            },
            mixer,
        ))
    }

    fn build_note_plan(config: &EngineConfig) -> Option<NotePlan> {
        if let Some(clips) = &config.notes.clips {
            // validate() rejected empty clip lists already.
            return Some(NotePlan::Clips {
                clips: clips.clone(),
                sequence: NoteSequence::new(clips.len(), config.notes.selection),
            });
        }
        match &config.notes.sound {
            Some(sound) => {
                let len = sequence_len(config.notes.scale, config.notes.octave_span);
                Some(NotePlan::Pitched {
                    sound: sound.clone(),
                    scale: config.notes.scale,
                    base_offset: config.notes.base_offset,
                    sequence: NoteSequence::new(len, config.notes.selection),
                })
            }
            None => {
                debug!("pitched channel has no sound configured");
                None
            }
        }
    }

    /// Subscribe to fire events. Any number of listeners may register;
    /// delivery is synchronous, in registration order, best-effort.
    pub fn add_listener(&mut self, listener: Box<dyn TriggerListener>) {
        self.listeners.push(listener);
    }

    /// Advance the engine by one tick.
    ///
    /// `frame` is this tick's tracking data; `None` means no face is
    /// currently tracked and leaves every channel silent. Returns the
    /// events emitted this tick (also delivered to listeners).
    pub fn tick(
        &mut self,
        elapsed: Duration,
        frame: Option<&ExpressionFrame>,
    ) -> Vec<TriggerEvent> {
        let values = self.sampler.sample(frame);
        let firings = self.state_machine.tick(elapsed, &values);

        let mut events = Vec::with_capacity(firings.len());
        for firing in firings {
            if let Some(event) = self.dispatch(firing) {
                for listener in &mut self.listeners {
                    listener.on_trigger(&event);
                }
                events.push(event);
            }
        }

        self.clock_seconds += elapsed.as_secs_f64();
        events
    }

    /// Resolve one firing into audio and an event.
    ///
    /// Returns `None` when the channel is suppressed or has nothing to
    /// play - in that case nothing is heard, so nothing is reported.
    fn dispatch(&mut self, firing: Firing) -> Option<TriggerEvent> {
        // Percussion mode drops the eye blink channel entirely: no event,
        // no audio, no note advance.
        if self.mode == EngineMode::Percussion && firing.channel == Channel::EyeBlink {
            return None;
        }

        let note_index = match firing.channel {
            Channel::EyeBlink => Some(self.play_note()?),
            _ => {
                self.play_percussive(firing.channel)?;
                None
            }
        };

        Some(TriggerEvent {
            channel: firing.channel,
            timestamp: self.clock_seconds,
            magnitude: firing.value,
            note_index,
        })
    }

    /// Fire the pitched channel; returns the note index actually used.
    fn play_note(&mut self) -> Option<usize> {
        let plan = self.notes.as_mut()?;
        match plan {
            NotePlan::Pitched {
                sound,
                scale,
                base_offset,
                sequence,
            } => {
                let index = sequence.next_index();
                let multiplier = pitch_multiplier(*scale, index, *base_offset);
                match self.pool.play_pitched(sound, multiplier) {
                    Ok(()) => {
                        debug!(index, multiplier, "note fired");
                        Some(index)
                    }
                    Err(err) => {
                        log_playback_error(&err, "pitched note dispatch");
                        None
                    }
                }
            }
            NotePlan::Clips { clips, sequence } => {
                let index = sequence.next_index();
                match self.pool.play_immediate(&clips[index]) {
                    Ok(()) => Some(index),
                    Err(err) => {
                        log_playback_error(&err, "note clip dispatch");
                        None
                    }
                }
            }
        }
    }

    /// Fire a percussive channel through its bound sound.
    fn play_percussive(&mut self, channel: Channel) -> Option<()> {
        let sound = match channel {
            Channel::Smile => self.config.bindings.smile.as_deref()?,
            Channel::JawOpen => self.config.bindings.jaw_open.as_deref()?,
            Channel::BrowRaise => self.config.bindings.brow_raise.as_deref()?,
            Channel::EyeBlink => return None,
        };

        let offset = self.config.scheduling_offset_seconds;
        let result = if offset != 0.0 {
            self.pool.play_scheduled(sound, offset)
        } else {
            self.pool.play_immediate(sound)
        };

        match result {
            Ok(()) => Some(()),
            Err(err) => {
                log_playback_error(&err, channel.name());
                None
            }
        }
    }

    /// Switch operating mode at runtime.
    ///
    /// Applies the mode's cooldowns and force-resets every channel's timer
    /// and edge state so the new mode starts from a clean state machine.
    pub fn set_mode(&mut self, mode: EngineMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        for (channel, settings) in self.config.channel_settings(mode) {
            self.state_machine.set_cooldown(channel, settings.cooldown);
        }
        self.state_machine.force_reset();
        info!(mode = ?mode, "operating mode switched");
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    /// Seconds of accumulated tick time since engine start.
    pub fn engine_time(&self) -> f64 {
        self.clock_seconds
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pool(&self) -> &PlaybackPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::FeatureId;

    fn blink_frame(value: f32) -> ExpressionFrame {
        ExpressionFrame::new(vec![
            (FeatureId::EyeBlinkLeft, value),
            (FeatureId::EyeBlinkRight, value),
        ])
    }

    fn open_eyes_frame() -> ExpressionFrame {
        blink_frame(0.0)
    }

    fn engine(config: EngineConfig) -> (Engine, Mixer) {
        Engine::new(config, 48_000, 2).expect("engine should build")
    }

    #[test]
    fn test_invalid_config_refuses_to_start() {
        let mut config = EngineConfig::default();
        config.pool.voices_per_sound = 0;
        assert!(Engine::new(config, 48_000, 2).is_err());
    }

    #[test]
    fn test_blink_advances_sequence_and_reports_index() {
        let (mut engine, _mixer) = engine(EngineConfig::default());
        let tick = Duration::from_millis(16);

        let mut indices = Vec::new();
        for _ in 0..8 {
            // Blink, then open: each pair is one rising edge.
            for event in engine.tick(tick, Some(&blink_frame(0.9))) {
                indices.push(event.note_index.expect("blink events carry an index"));
            }
            engine.tick(Duration::from_millis(200), Some(&open_eyes_frame()));
        }
        // Default scale is pentatonic, octave span 0: five notes, cyclic.
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 0, 1, 2]);
    }

    #[test]
    fn test_percussion_mode_suppresses_blink() {
        let mut config = EngineConfig::default();
        config.mode = EngineMode::Percussion;
        let (mut engine, _mixer) = engine(config);
        let tick = Duration::from_millis(16);

        for _ in 0..5 {
            let events = engine.tick(tick, Some(&blink_frame(0.9)));
            assert!(events.is_empty(), "blink must not fire in percussion mode");
            engine.tick(Duration::from_millis(200), Some(&open_eyes_frame()));
        }
    }

    #[test]
    fn test_percussion_suppression_does_not_advance_sequence() {
        let mut config = EngineConfig::default();
        config.mode = EngineMode::Percussion;
        let (mut engine, _mixer) = engine(config);
        let tick = Duration::from_millis(16);

        // Blink repeatedly while suppressed.
        for _ in 0..3 {
            engine.tick(tick, Some(&blink_frame(0.9)));
            engine.tick(Duration::from_millis(200), Some(&open_eyes_frame()));
        }

        // Back to standard: the sequence starts at index 0, untouched.
        engine.set_mode(EngineMode::Standard);
        let events = engine.tick(tick, Some(&blink_frame(0.9)));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].note_index, Some(0));
    }

    #[test]
    fn test_unbound_channel_emits_nothing() {
        let mut config = EngineConfig::default();
        config.bindings.jaw_open = None;
        let (mut engine, _mixer) = engine(config);

        let frame = ExpressionFrame::new(vec![(FeatureId::JawOpen, 0.9)]);
        let events = engine.tick(Duration::from_millis(16), Some(&frame));
        assert!(events.is_empty(), "unbound channel is a silent no-op");
    }

    #[test]
    fn test_missing_asset_channel_is_no_op_not_fatal() {
        let mut config = EngineConfig::default();
        config.bindings.smile = Some("does_not_exist".to_string());
        let (mut engine, _mixer) = engine(config);

        let frame = ExpressionFrame::new(vec![
            (FeatureId::MouthSmileLeft, 0.8),
            (FeatureId::MouthSmileRight, 0.8),
        ]);
        let events = engine.tick(Duration::from_millis(16), Some(&frame));
        assert!(events.is_empty());
    }

    #[test]
    fn test_no_face_ticks_are_quiet() {
        let (mut engine, _mixer) = engine(EngineConfig::default());
        for _ in 0..100 {
            let events = engine.tick(Duration::from_millis(16), None);
            assert!(events.is_empty());
        }
    }

    #[test]
    fn test_event_timestamps_accumulate_tick_time() {
        let (mut engine, _mixer) = engine(EngineConfig::default());
        let tick = Duration::from_millis(10);

        // 50 quiet ticks, then a blink: the event is stamped at 0.5s.
        for _ in 0..50 {
            engine.tick(tick, Some(&open_eyes_frame()));
        }
        let events = engine.tick(tick, Some(&blink_frame(0.9)));
        assert_eq!(events.len(), 1);
        assert!((events[0].timestamp - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_listener_sees_same_index_as_audio_path() {
        struct Recorder(std::rc::Rc<std::cell::RefCell<Vec<TriggerEvent>>>);
        impl TriggerListener for Recorder {
            fn on_trigger(&mut self, event: &TriggerEvent) {
                self.0.borrow_mut().push(event.clone());
            }
        }

        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let (mut engine, _mixer) = engine(EngineConfig::default());
        engine.add_listener(Box::new(Recorder(seen.clone())));

        let tick = Duration::from_millis(16);
        let returned = engine.tick(tick, Some(&blink_frame(0.9)));
        assert_eq!(&*seen.borrow(), &returned);
        assert_eq!(seen.borrow()[0].note_index, Some(0));
    }

    #[test]
    fn test_clip_mode_uses_clip_list_length() {
        let mut config = EngineConfig::default();
        config.notes.clips = Some(vec![
            "note".to_string(),
            "smile_hit".to_string(),
            "brow_hit".to_string(),
        ]);
        let (mut engine, _mixer) = engine(config);
        let tick = Duration::from_millis(16);

        let mut indices = Vec::new();
        for _ in 0..4 {
            for event in engine.tick(tick, Some(&blink_frame(0.9))) {
                indices.push(event.note_index.unwrap());
            }
            engine.tick(Duration::from_millis(200), Some(&open_eyes_frame()));
        }
        assert_eq!(indices, vec![0, 1, 2, 0]);
    }
}
