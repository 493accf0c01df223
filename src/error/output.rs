// Audio output errors

use std::fmt;

/// Errors opening the audio output path.
///
/// These only occur when live output is requested; the engine itself runs
/// headless without a device.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputError {
    /// No default output device was found
    NoDevice,

    /// Failed to open or start the output stream
    StreamOpenFailed { reason: String },

    /// The device offered a sample format other than f32
    UnsupportedFormat { format: String },
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::NoDevice => write!(f, "no default output device found"),
            OutputError::StreamOpenFailed { reason } => {
                write!(f, "failed to open audio output stream: {}", reason)
            }
            OutputError::UnsupportedFormat { format } => {
                write!(f, "unsupported output sample format: {}", format)
            }
        }
    }
}

impl std::error::Error for OutputError {}
