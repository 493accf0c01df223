//! TriggerStateMachine - per-channel edge detection and cooldown debounce
//!
//! Converts continuous channel values into discrete fire events. Each
//! channel runs {Idle, Armed, Cooling}: Idle arms when the value reaches the
//! threshold with cooldown elapsed, Armed emits exactly one fire for that
//! edge and drops into Cooling, Cooling returns to Idle when the wall-clock
//! cooldown runs out regardless of the current value.
//!
//! Two debounce policies:
//! - Level: re-fires every time the cooldown expires while the value is
//!   still held above threshold (the smile channel).
//! - RisingEdge: fires only on a below -> above transition; a sustained
//!   expression never re-fires (blink, jaw, brow). Without this, a held
//!   expression would retrigger every frame and overwhelm the voice pool.

use std::time::Duration;

use crate::tracking::ChannelValues;

use super::Channel;

/// Debounce policy for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebouncePolicy {
    /// Fire whenever the value sits at/above threshold with cooldown elapsed.
    Level,
    /// Fire only on the below -> above transition.
    RisingEdge,
}

/// Static per-channel tuning.
#[derive(Debug, Clone, Copy)]
pub struct ChannelSettings {
    pub threshold: f32,
    pub cooldown: Duration,
    pub policy: DebouncePolicy,
}

/// One firing edge produced by a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Firing {
    pub channel: Channel,
    /// Channel value at the edge.
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Cooling,
}

#[derive(Debug)]
struct ChannelState {
    channel: Channel,
    settings: ChannelSettings,
    phase: Phase,
    cooldown_remaining: Duration,
    was_above: bool,
}

impl ChannelState {
    fn new(channel: Channel, settings: ChannelSettings) -> Self {
        Self {
            channel,
            settings,
            phase: Phase::Idle,
            cooldown_remaining: Duration::ZERO,
            was_above: false,
        }
    }

    /// Advance this channel by `elapsed` and evaluate `value`.
    ///
    /// The Armed phase is instantaneous within a tick: arming, firing, and
    /// entering Cooling all happen here, so a fire can never be observed
    /// twice for one edge.
    fn tick(&mut self, elapsed: Duration, value: f32) -> Option<Firing> {
        self.cooldown_remaining = self.cooldown_remaining.saturating_sub(elapsed);
        if self.phase == Phase::Cooling && self.cooldown_remaining.is_zero() {
            self.phase = Phase::Idle;
        }

        let above = value >= self.settings.threshold;
        let edge_ok = match self.settings.policy {
            DebouncePolicy::Level => true,
            DebouncePolicy::RisingEdge => !self.was_above,
        };

        let fired = if self.phase == Phase::Idle && above && edge_ok {
            self.phase = Phase::Cooling;
            self.cooldown_remaining = self.settings.cooldown;
            Some(Firing {
                channel: self.channel,
                value,
            })
        } else {
            None
        };

        self.was_above = above;
        fired
    }

    fn force_reset(&mut self) {
        self.phase = Phase::Idle;
        self.cooldown_remaining = Duration::ZERO;
        self.was_above = false;
    }
}

/// Edge detector and cooldown timer for all four channels.
#[derive(Debug)]
pub struct TriggerStateMachine {
    channels: Vec<ChannelState>,
}

impl TriggerStateMachine {
    /// Build from per-channel settings; one entry per [Channel].
    pub fn new(settings: impl IntoIterator<Item = (Channel, ChannelSettings)>) -> Self {
        let channels = settings
            .into_iter()
            .map(|(channel, settings)| ChannelState::new(channel, settings))
            .collect();
        Self { channels }
    }

    /// Evaluate one tick. Returns at most one [Firing] per channel.
    ///
    /// Cooldowns decrement by wall-clock `elapsed`, not frame count, so
    /// behavior is frame-rate independent.
    pub fn tick(&mut self, elapsed: Duration, values: &ChannelValues) -> Vec<Firing> {
        let mut firings = Vec::with_capacity(self.channels.len());
        for state in &mut self.channels {
            let value = state.channel.value_in(values);
            if let Some(firing) = state.tick(elapsed, value) {
                firings.push(firing);
            }
        }
        firings
    }

    /// Rewrite a single channel's cooldown (e.g. a mode-switch override).
    pub fn set_cooldown(&mut self, channel: Channel, cooldown: Duration) {
        if let Some(state) = self.channels.iter_mut().find(|s| s.channel == channel) {
            state.settings.cooldown = cooldown;
        }
    }

    /// Force every channel back to a clean Idle state (mode switch).
    pub fn force_reset(&mut self) {
        for state in &mut self.channels {
            state.force_reset();
        }
    }

    /// Remaining cooldown for a channel, for diagnostics.
    pub fn cooldown_remaining(&self, channel: Channel) -> Option<Duration> {
        self.channels
            .iter()
            .find(|s| s.channel == channel)
            .map(|s| s.cooldown_remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(policy: DebouncePolicy, cooldown_ms: u64) -> TriggerStateMachine {
        TriggerStateMachine::new([(
            Channel::Smile,
            ChannelSettings {
                threshold: 0.5,
                cooldown: Duration::from_millis(cooldown_ms),
                policy,
            },
        )])
    }

    fn smile(value: f32) -> ChannelValues {
        ChannelValues {
            smile: value,
            ..ChannelValues::silent()
        }
    }

    #[test]
    fn test_level_mode_fires_once_per_cooldown_period() {
        // threshold 0.5, cooldown 0.2s, 60Hz ticks, value held above for 1s:
        // expect fires at t ~= 0, 0.2, 0.4, 0.6, 0.8 - five, not sixty.
        let mut sm = machine(DebouncePolicy::Level, 200);
        let tick = Duration::from_secs_f64(1.0 / 60.0);

        let mut fires = 0;
        for _ in 0..60 {
            fires += sm.tick(tick, &smile(0.8)).len();
        }
        assert_eq!(fires, 5, "sustained level-mode input must fire once per cooldown");
    }

    #[test]
    fn test_rising_edge_never_refires_while_sustained() {
        let mut sm = machine(DebouncePolicy::RisingEdge, 50);
        let tick = Duration::from_millis(10);

        let mut fires = 0;
        for _ in 0..100 {
            fires += sm.tick(tick, &smile(0.9)).len();
        }
        assert_eq!(fires, 1, "a held expression fires exactly once");

        // Release, then re-raise: one more fire.
        sm.tick(tick, &smile(0.0));
        let refires = sm.tick(tick, &smile(0.9)).len();
        assert_eq!(refires, 1);
    }

    #[test]
    fn test_rising_edge_respects_cooldown() {
        let mut sm = machine(DebouncePolicy::RisingEdge, 100);
        let tick = Duration::from_millis(10);

        assert_eq!(sm.tick(tick, &smile(0.9)).len(), 1);
        // Rapid release/press inside the cooldown window is debounced.
        assert_eq!(sm.tick(tick, &smile(0.0)).len(), 0);
        assert_eq!(sm.tick(tick, &smile(0.9)).len(), 0);

        // Release and wait out the cooldown.
        sm.tick(Duration::from_millis(200), &smile(0.0));
        assert_eq!(sm.tick(tick, &smile(0.9)).len(), 1);
    }

    #[test]
    fn test_below_threshold_never_fires() {
        let mut sm = machine(DebouncePolicy::Level, 0);
        let tick = Duration::from_millis(16);
        for _ in 0..50 {
            assert!(sm.tick(tick, &smile(0.49)).is_empty());
        }
    }

    #[test]
    fn test_cooling_returns_to_idle_regardless_of_value() {
        let mut sm = machine(DebouncePolicy::Level, 100);
        let tick = Duration::from_millis(10);

        assert_eq!(sm.tick(tick, &smile(0.9)).len(), 1);
        // Held above threshold through the whole cooldown; the next expiry
        // tick fires again without the value ever dropping.
        let mut fires = 0;
        for _ in 0..10 {
            fires += sm.tick(tick, &smile(0.9)).len();
        }
        assert_eq!(fires, 1);
    }

    #[test]
    fn test_zero_cooldown_level_fires_every_tick() {
        let mut sm = machine(DebouncePolicy::Level, 0);
        let tick = Duration::from_millis(16);
        let mut fires = 0;
        for _ in 0..10 {
            fires += sm.tick(tick, &smile(0.8)).len();
        }
        assert_eq!(fires, 10);
    }

    #[test]
    fn test_force_reset_clears_cooldown_and_edge_state() {
        let mut sm = machine(DebouncePolicy::RisingEdge, 10_000);
        let tick = Duration::from_millis(10);

        assert_eq!(sm.tick(tick, &smile(0.9)).len(), 1);
        sm.force_reset();
        assert_eq!(
            sm.cooldown_remaining(Channel::Smile),
            Some(Duration::ZERO)
        );
        // Edge state cleared too: the very next above-threshold tick fires.
        assert_eq!(sm.tick(tick, &smile(0.9)).len(), 1);
    }

    #[test]
    fn test_frame_rate_independence() {
        // Same wall-clock history at 30Hz and 120Hz produces the same count.
        let run = |tick_ms: u64, ticks: usize| -> usize {
            let mut sm = machine(DebouncePolicy::Level, 200);
            let tick = Duration::from_millis(tick_ms);
            (0..ticks).map(|_| sm.tick(tick, &smile(0.8)).len()).sum()
        };
        // One second of sustained input either way.
        assert_eq!(run(33, 30), run(8, 125));
        assert_eq!(run(33, 30), 5);
    }
}
