//! Note sequencing - cursor and random index selection
//!
//! A [NoteSequence] owns the index-selection policy for the pitched channel:
//! sequential mode walks a cyclic cursor, random mode draws a uniform index
//! on every fire with no guarantee against immediate repetition.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// How the next note index is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Sequential,
    Random,
}

/// Cyclic note-index generator over a fixed sequence length.
///
/// The cursor only moves in sequential mode; random draws leave it alone so
/// switching modes mid-session resumes the sequence where it left off.
#[derive(Debug)]
pub struct NoteSequence {
    len: usize,
    mode: SelectionMode,
    cursor: usize,
    rng: StdRng,
}

impl NoteSequence {
    /// Create a sequence over `len` notes.
    ///
    /// `len` must be non-zero; the configuration layer rejects zero-length
    /// sequences before an engine can be built.
    pub fn new(len: usize, mode: SelectionMode) -> Self {
        debug_assert!(len > 0, "zero-length note sequence");
        Self {
            len,
            mode,
            cursor: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Sequence with a deterministic RNG, for tests of random mode.
    #[cfg(test)]
    pub fn with_seed(len: usize, mode: SelectionMode, seed: u64) -> Self {
        Self {
            len,
            mode,
            cursor: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index the next fire should use. Advances the cursor in sequential
    /// mode; draws uniformly in random mode.
    pub fn next_index(&mut self) -> usize {
        match self.mode {
            SelectionMode::Sequential => {
                let index = self.cursor;
                self.cursor = (self.cursor + 1) % self.len;
                index
            }
            SelectionMode::Random => self.rng.gen_range(0..self.len),
        }
    }

    /// Rewind the cursor to the start of the sequence.
    ///
    /// Only an explicit configuration reload calls this; firing never does.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}
