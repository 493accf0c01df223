// Playback diagnostics - reported, never fatal

use log::warn;
use std::fmt;

/// Per-tick recoverable playback conditions.
///
/// None of these stop the engine: a missing asset turns its channel into a
/// no-op, an unknown sound id produces no sound, and both are surfaced as
/// diagnostics only.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// A configured sound asset could not be loaded
    MissingAsset { sound: String, reason: String },

    /// A play request named a sound that was never registered
    UnknownSound { sound: String },

    /// A note index fell outside the configured clip list
    NoteIndexOutOfRange { index: usize, len: usize },
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::MissingAsset { sound, reason } => {
                write!(f, "asset for sound '{}' is unavailable: {}", sound, reason)
            }
            PlaybackError::UnknownSound { sound } => {
                write!(f, "sound '{}' is not registered with the playback pool", sound)
            }
            PlaybackError::NoteIndexOutOfRange { index, len } => {
                write!(
                    f,
                    "note index {} is out of range for clip list of length {}",
                    index, len
                )
            }
        }
    }
}

impl std::error::Error for PlaybackError {}

/// Log a playback diagnostic with its context.
///
/// Kept as a helper so every absorb site reports the same way.
pub fn log_playback_error(err: &PlaybackError, context: &str) {
    warn!("Playback diagnostic in {}: {}", context, err);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sound_message() {
        let err = PlaybackError::UnknownSound {
            sound: "kick".to_string(),
        };
        assert!(err.to_string().contains("kick"));
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn test_note_index_message() {
        let err = PlaybackError::NoteIndexOutOfRange { index: 9, len: 5 };
        let text = err.to_string();
        assert!(text.contains('9') && text.contains('5'), "got: {}", text);
    }
}
