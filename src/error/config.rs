// Configuration validation errors

use std::fmt;

/// Startup configuration errors.
///
/// The engine refuses to start with an inconsistent configuration; every
/// variant carries enough context to point at the offending field.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A channel threshold is outside [0, 1]
    ThresholdOutOfRange { channel: String, value: f32 },

    /// A channel cooldown is negative
    NegativeCooldown { channel: String, seconds: f32 },

    /// Octave span is outside [0, 3]
    OctaveSpanOutOfRange { octave_span: u8 },

    /// Base offset is outside [-12, 12] semitones
    BaseOffsetOutOfRange { semitones: i8 },

    /// Voice pool size must be at least 1
    PoolSizeZero,

    /// Clip-list note mode was selected with an empty clip list
    EmptyNoteClipList,

    /// No sounds were registered at all
    NoSoundsConfigured,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ThresholdOutOfRange { channel, value } => {
                write!(
                    f,
                    "threshold for {} must be within [0, 1] (got {})",
                    channel, value
                )
            }
            ConfigError::NegativeCooldown { channel, seconds } => {
                write!(
                    f,
                    "cooldown for {} must be >= 0 seconds (got {})",
                    channel, seconds
                )
            }
            ConfigError::OctaveSpanOutOfRange { octave_span } => {
                write!(f, "octave span must be within [0, 3] (got {})", octave_span)
            }
            ConfigError::BaseOffsetOutOfRange { semitones } => {
                write!(
                    f,
                    "base offset must be within [-12, 12] semitones (got {})",
                    semitones
                )
            }
            ConfigError::PoolSizeZero => {
                write!(f, "voices_per_sound must be at least 1")
            }
            ConfigError::EmptyNoteClipList => {
                write!(f, "note clip list is empty; a zero-length note sequence cannot play")
            }
            ConfigError::NoSoundsConfigured => {
                write!(f, "no sounds configured; every channel would be silent")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
