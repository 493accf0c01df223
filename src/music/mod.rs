// Music module - scale generation and note sequencing
//
// Pure pitch math lives in `scale`; the stateful cursor/random index policy
// lives in `sequence`. Nothing in here touches the audio device: the engine
// resolves an index and a pitch multiplier, then hands both to the playback
// pool.

pub mod scale;
pub mod sequence;

pub use scale::{pitch_multiplier, semitone_offset, sequence_len, Scale};
pub use sequence::{NoteSequence, SelectionMode};
