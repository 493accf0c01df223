//! Configuration management for the trigger engine
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling tuning without recompilation: per-channel thresholds and
//! cooldowns, scale selection, pool sizing, operating mode, and the
//! latency-compensation scheduling offset. Loaded once at startup - none of
//! this is on the hot path. Validation fails fast so the engine never
//! starts in an inconsistent state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::audio::pool::DEFAULT_VOICES_PER_SOUND;
use crate::audio::sample::SoundSource;
use crate::error::ConfigError;
use crate::music::{Scale, SelectionMode};
use crate::trigger::{Channel, ChannelSettings, DebouncePolicy};

/// Complete engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub notes: NoteConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub mode: EngineMode,
    /// Named sound sources available to the playback pool.
    #[serde(default = "default_sounds")]
    pub sounds: BTreeMap<String, SoundSource>,
    /// Which sound each percussive channel plays.
    #[serde(default)]
    pub bindings: BindingConfig,
    /// Latency-compensation offset applied to percussive triggers, seconds.
    /// Negative plays earlier relative to the device's output latency; 0
    /// uses the immediate path.
    #[serde(default)]
    pub scheduling_offset_seconds: f64,
    /// Cooldown applied to every channel while in percussion mode.
    #[serde(default = "default_percussion_cooldown")]
    pub percussion_cooldown_seconds: f32,
}

/// Per-channel threshold and cooldown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Fire threshold in [0, 1]
    pub threshold: f32,
    /// Minimum seconds between fires on this channel
    pub cooldown_seconds: f32,
}

/// Tuning for all four channels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChannelsConfig {
    pub smile: ChannelConfig,
    pub eye_blink: ChannelConfig,
    pub jaw_open: ChannelConfig,
    pub brow_raise: ChannelConfig,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            smile: ChannelConfig {
                threshold: 0.5,
                cooldown_seconds: 0.1,
            },
            eye_blink: ChannelConfig {
                threshold: 0.5,
                cooldown_seconds: 0.1,
            },
            jaw_open: ChannelConfig {
                threshold: 0.4,
                cooldown_seconds: 0.1,
            },
            brow_raise: ChannelConfig {
                threshold: 0.4,
                cooldown_seconds: 0.1,
            },
        }
    }
}

/// Note selection for the pitched (eye blink) channel.
///
/// Two modes: a generated scale over a single base sample (`sound` set), or
/// an ordered list of discrete pre-rendered clips (`clips` set, which takes
/// precedence). With neither, the channel is a silent no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteConfig {
    /// Base sample for pitched playback.
    #[serde(default)]
    pub sound: Option<String>,
    /// Discrete clip names, one per note; overrides `sound` when present.
    #[serde(default)]
    pub clips: Option<Vec<String>>,
    #[serde(default = "default_scale")]
    pub scale: Scale,
    /// Octaves beyond the first, in [0, 3]
    #[serde(default)]
    pub octave_span: u8,
    /// Transposition in [-12, 12] semitones
    #[serde(default)]
    pub base_offset: i8,
    #[serde(default = "default_selection")]
    pub selection: SelectionMode,
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            sound: Some("note".to_string()),
            clips: None,
            scale: default_scale(),
            octave_span: 0,
            base_offset: 0,
            selection: default_selection(),
        }
    }
}

/// Voice pool sizing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Voices pre-created per sound
    pub voices_per_sound: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            voices_per_sound: DEFAULT_VOICES_PER_SOUND,
        }
    }
}

/// Operating mode.
///
/// Percussion suppresses the eye blink channel entirely and shortens every
/// cooldown for snappier response; it is a configuration variant of the
/// same engine, not a separate implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    #[default]
    Standard,
    Percussion,
}

/// Sound bound to each percussive channel; `None` leaves it silent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingConfig {
    #[serde(default)]
    pub smile: Option<String>,
    #[serde(default)]
    pub jaw_open: Option<String>,
    #[serde(default)]
    pub brow_raise: Option<String>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            smile: Some("smile_hit".to_string()),
            jaw_open: Some("jaw_hit".to_string()),
            brow_raise: Some("brow_hit".to_string()),
        }
    }
}

fn default_scale() -> Scale {
    Scale::Pentatonic
}

fn default_selection() -> SelectionMode {
    SelectionMode::Sequential
}

fn default_percussion_cooldown() -> f32 {
    0.05
}

/// Synthesized defaults so the engine makes sound with no assets on disk.
fn default_sounds() -> BTreeMap<String, SoundSource> {
    let mut sounds = BTreeMap::new();
    sounds.insert("smile_hit".to_string(), SoundSource::Tone { freq_hz: 660.0 });
    sounds.insert("jaw_hit".to_string(), SoundSource::Click);
    sounds.insert("brow_hit".to_string(), SoundSource::Tone { freq_hz: 330.0 });
    sounds.insert("note".to_string(), SoundSource::Tone { freq_hz: 440.0 });
    sounds
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channels: ChannelsConfig::default(),
            notes: NoteConfig::default(),
            pool: PoolConfig::default(),
            mode: EngineMode::default(),
            sounds: default_sounds(),
            bindings: BindingConfig::default(),
            scheduling_offset_seconds: 0.0,
            percussion_cooldown_seconds: default_percussion_cooldown(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file.
    ///
    /// Falls back to defaults (with a logged warning) if the file is absent
    /// or unparsable; validation still runs at engine construction.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Fail-fast startup validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, channel) in [
            ("smile", self.channels.smile),
            ("eye_blink", self.channels.eye_blink),
            ("jaw_open", self.channels.jaw_open),
            ("brow_raise", self.channels.brow_raise),
        ] {
            if !(0.0..=1.0).contains(&channel.threshold) {
                return Err(ConfigError::ThresholdOutOfRange {
                    channel: name.to_string(),
                    value: channel.threshold,
                });
            }
            if channel.cooldown_seconds < 0.0 {
                return Err(ConfigError::NegativeCooldown {
                    channel: name.to_string(),
                    seconds: channel.cooldown_seconds,
                });
            }
        }

        if self.percussion_cooldown_seconds < 0.0 {
            return Err(ConfigError::NegativeCooldown {
                channel: "percussion override".to_string(),
                seconds: self.percussion_cooldown_seconds,
            });
        }

        if self.notes.octave_span > 3 {
            return Err(ConfigError::OctaveSpanOutOfRange {
                octave_span: self.notes.octave_span,
            });
        }
        if !(-12..=12).contains(&self.notes.base_offset) {
            return Err(ConfigError::BaseOffsetOutOfRange {
                semitones: self.notes.base_offset,
            });
        }
        if let Some(clips) = &self.notes.clips {
            if clips.is_empty() {
                return Err(ConfigError::EmptyNoteClipList);
            }
        }

        if self.pool.voices_per_sound == 0 {
            return Err(ConfigError::PoolSizeZero);
        }
        if self.sounds.is_empty() {
            return Err(ConfigError::NoSoundsConfigured);
        }

        Ok(())
    }

    /// State-machine settings for `mode`.
    ///
    /// Percussion mode overrides every cooldown with the snappier value;
    /// debounce policy is fixed per channel: the smile channel is the
    /// magnitude-valued level trigger, the rest fire on rising edges only.
    pub fn channel_settings(&self, mode: EngineMode) -> [(Channel, ChannelSettings); 4] {
        let cooldown = |configured: f32| -> Duration {
            let seconds = match mode {
                EngineMode::Standard => configured,
                EngineMode::Percussion => self.percussion_cooldown_seconds,
            };
            Duration::from_secs_f32(seconds.max(0.0))
        };

        [
            (
                Channel::Smile,
                ChannelSettings {
                    threshold: self.channels.smile.threshold,
                    cooldown: cooldown(self.channels.smile.cooldown_seconds),
                    policy: DebouncePolicy::Level,
                },
            ),
            (
                Channel::EyeBlink,
                ChannelSettings {
                    threshold: self.channels.eye_blink.threshold,
                    cooldown: cooldown(self.channels.eye_blink.cooldown_seconds),
                    policy: DebouncePolicy::RisingEdge,
                },
            ),
            (
                Channel::JawOpen,
                ChannelSettings {
                    threshold: self.channels.jaw_open.threshold,
                    cooldown: cooldown(self.channels.jaw_open.cooldown_seconds),
                    policy: DebouncePolicy::RisingEdge,
                },
            ),
            (
                Channel::BrowRaise,
                ChannelSettings {
                    threshold: self.channels.brow_raise.threshold,
                    cooldown: cooldown(self.channels.brow_raise.cooldown_seconds),
                    policy: DebouncePolicy::RisingEdge,
                },
            ),
        ]
    }
}
