//! Scale generation - pure pitch math
//!
//! Maps a scale selection, octave span, and base-note offset onto semitone
//! offsets and playback-rate multipliers. All functions here are pure and
//! deterministic; the playback pool applies the resulting multiplier as a
//! sample playback rate, so a multiplier of 2.0 is one octave up.

use serde::{Deserialize, Serialize};

/// Semitone interval sets within one octave, ascending.
const MAJOR: &[i32] = &[0, 2, 4, 5, 7, 9, 11];
const MINOR: &[i32] = &[0, 2, 3, 5, 7, 8, 10];
const PENTATONIC: &[i32] = &[0, 2, 4, 7, 9];
const BLUES: &[i32] = &[0, 3, 5, 6, 7, 10];
const CHROMATIC: &[i32] = &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Musical scale selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Major,
    Minor,
    Pentatonic,
    Blues,
    Chromatic,
}

impl Scale {
    /// Ascending semitone intervals of this scale within one octave.
    pub fn intervals(&self) -> &'static [i32] {
        match self {
            Scale::Major => MAJOR,
            Scale::Minor => MINOR,
            Scale::Pentatonic => PENTATONIC,
            Scale::Blues => BLUES,
            Scale::Chromatic => CHROMATIC,
        }
    }
}

/// Number of playable notes for a scale spanning `octave_span + 1` octaves.
///
/// # Examples
/// ```
/// use facebeat::music::{sequence_len, Scale};
/// assert_eq!(sequence_len(Scale::Pentatonic, 0), 5);
/// assert_eq!(sequence_len(Scale::Major, 1), 14);
/// ```
#[inline]
pub fn sequence_len(scale: Scale, octave_span: u8) -> usize {
    scale.intervals().len() * (octave_span as usize + 1)
}

/// Semitone offset of note `index` within the generated sequence.
///
/// Indices walk the scale bottom to top, folding into the next octave every
/// `intervals.len()` steps, with `base_offset` added on top.
#[inline]
pub fn semitone_offset(scale: Scale, index: usize, base_offset: i8) -> i32 {
    let intervals = scale.intervals();
    let n = intervals.len();
    intervals[index % n] + 12 * (index / n) as i32 + base_offset as i32
}

/// Playback-rate multiplier for note `index`: `2^(semitones / 12)`.
///
/// # Examples
/// ```
/// use facebeat::music::{pitch_multiplier, Scale};
/// let unison = pitch_multiplier(Scale::Major, 0, 0);
/// assert!((unison - 1.0).abs() < 1e-6);
/// ```
#[inline]
pub fn pitch_multiplier(scale: Scale, index: usize, base_offset: i8) -> f32 {
    let semitones = semitone_offset(scale, index, base_offset);
    (2.0_f64).powf(semitones as f64 / 12.0) as f32
}
