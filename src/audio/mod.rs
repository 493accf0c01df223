// Audio module - low-latency sample playback
//
// The trigger path never touches the audio device directly. The tick thread
// owns a [PlaybackPool] that selects voices and pushes start commands into a
// lock-free SPSC queue; the device callback owns a [Mixer] that drains the
// queue and renders. All sample decoding and allocation happens at startup,
// so a trigger costs a queue push and a few atomic reads.

pub mod mixer;
pub mod output;
pub mod pool;
pub mod sample;
pub mod voice;

pub use mixer::{DeviceClock, Mixer};
pub use output::OutputHandle;
pub use pool::{build_pipeline, PlaybackPool};
pub use sample::{Sample, SampleBank, SoundSource};
pub use voice::{VoiceCommand, VoiceShared};
