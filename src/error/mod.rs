// Error types for the expression-to-audio trigger engine
//
// ConfigError is the only fatal class and may only surface during startup
// validation. PlaybackError covers the per-tick recoverable conditions
// (missing assets, unknown sounds) that are logged and absorbed without
// stopping the engine. OutputError belongs to the optional live audio
// device path.

mod config;
mod output;
mod playback;

pub use config::ConfigError;
pub use output::OutputError;
pub use playback::{log_playback_error, PlaybackError};
