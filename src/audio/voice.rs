//! Voice control blocks shared across the callback boundary
//!
//! A voice's mutable playback state (position, active flag) is owned by the
//! mixer inside the device callback. The tick thread sees only this shared
//! control block: a busy flag the callback writes and the pool reads. The
//! flag may be stale by one callback block; the pool tolerates that because
//! a forced restart command is always safe to issue.

use std::sync::atomic::{AtomicBool, Ordering};

/// Cross-thread view of one voice.
#[derive(Debug, Default)]
pub struct VoiceShared {
    playing: AtomicBool,
}

impl VoiceShared {
    pub fn new() -> Self {
        Self::default()
    }

    /// Possibly-stale busy flag; read-only on the tick side.
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Relaxed);
    }
}

/// Start (or forcibly restart) one voice slot.
///
/// Pushed by the pool, drained by the mixer. A command for a busy slot
/// supersedes whatever the slot was doing - that IS the reclamation path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceCommand {
    /// Global voice slot index (pool and mixer share the layout).
    pub slot: usize,
    /// Absolute device frame at which playback starts; a frame in the past
    /// (including 0) means "as soon as possible".
    pub start_frame: u64,
    /// Playback rate: pitch multiplier folded with the sample's
    /// source-rate compensation. 1.0-equivalent for unpitched sounds.
    pub rate: f32,
}
