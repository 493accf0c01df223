// Trigger module - channels, fire events, and the observer boundary
//
// A [Channel] is one trackable expression signal. When the state machine
// fires one, the dispatcher resolves audio and then fans a [TriggerEvent]
// out to every registered [TriggerListener] - the sole contract between the
// audio core and presentation code.

use serde::{Deserialize, Serialize};

use crate::tracking::ChannelValues;

pub mod state_machine;

pub use state_machine::{ChannelSettings, DebouncePolicy, Firing, TriggerStateMachine};

/// One trackable expression signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Smile,
    EyeBlink,
    JawOpen,
    BrowRaise,
}

impl Channel {
    /// All channels, in evaluation order.
    pub const ALL: [Channel; 4] = [
        Channel::Smile,
        Channel::EyeBlink,
        Channel::JawOpen,
        Channel::BrowRaise,
    ];

    /// This channel's value within a sampled tick.
    pub fn value_in(&self, values: &ChannelValues) -> f32 {
        match self {
            Channel::Smile => values.smile,
            Channel::EyeBlink => values.eye_blink,
            Channel::JawOpen => values.jaw_open,
            Channel::BrowRaise => values.brow_raise,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Smile => "smile",
            Channel::EyeBlink => "eye_blink",
            Channel::JawOpen => "jaw_open",
            Channel::BrowRaise => "brow_raise",
        }
    }
}

/// Immutable record of one firing edge.
///
/// `note_index` is populated only for the pitched channel and is exactly the
/// index the audio path used, so a visual representation of "which note
/// played" can never disagree with what was heard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub channel: Channel,
    /// Seconds of accumulated engine tick time at the firing edge.
    pub timestamp: f64,
    /// Channel value at the firing edge (signed for Smile).
    pub magnitude: f32,
    /// Resolved note index, pitched channel only.
    pub note_index: Option<usize>,
}

/// Observer interface for trigger events.
///
/// Delivery is synchronous within the firing tick and at-most-once per
/// firing edge. Implementations must not block; the engine does not wait
/// for or depend on any acknowledgment.
pub trait TriggerListener {
    fn on_trigger(&mut self, event: &TriggerEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_in_picks_matching_field() {
        let values = ChannelValues {
            smile: 0.1,
            eye_blink: 0.2,
            jaw_open: 0.3,
            brow_raise: 0.4,
        };
        assert_eq!(Channel::Smile.value_in(&values), 0.1);
        assert_eq!(Channel::EyeBlink.value_in(&values), 0.2);
        assert_eq!(Channel::JawOpen.value_in(&values), 0.3);
        assert_eq!(Channel::BrowRaise.value_in(&values), 0.4);
    }

    #[test]
    fn test_event_serializes_with_channel_name() {
        let event = TriggerEvent {
            channel: Channel::EyeBlink,
            timestamp: 1.25,
            magnitude: 0.8,
            note_index: Some(3),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"eye_blink\""), "got: {}", json);
        assert!(json.contains("\"note_index\":3"), "got: {}", json);
    }
}
