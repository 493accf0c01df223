//! SignalSampler - raw blend-shape frames to normalized channel values
//!
//! Reduces a sparse coefficient frame to the four channel scalars:
//! Smile = (smileL + smileR) - (frownL + frownR), EyeBlink = avg(L, R),
//! JawOpen and BrowRaise read single coefficients. The first frame seen
//! builds a feature -> slot index so later frames are O(1) lookups; if a
//! tracker dropout reshuffles or omits features, lookup falls back to a
//! linear scan for that feature.

use log::debug;
use std::collections::HashMap;

use super::{ExpressionFrame, FeatureId};

/// The four normalized channel values for one tick.
///
/// Smile is signed (smile minus frown) and may leave [0, 1]; the others are
/// plain coefficients in [0, 1]. A missing coefficient reads as 0.0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelValues {
    pub smile: f32,
    pub eye_blink: f32,
    pub jaw_open: f32,
    pub brow_raise: f32,
}

impl ChannelValues {
    /// All channels at rest; what a "no face" tick produces.
    pub fn silent() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default)]
pub struct SignalSampler {
    slot_index: HashMap<FeatureId, usize>,
    index_built: bool,
}

impl SignalSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduce this tick's frame to channel values.
    ///
    /// `None` (no face tracked) yields [ChannelValues::silent] so the state
    /// machine sees a quiet tick rather than stale values.
    pub fn sample(&mut self, frame: Option<&ExpressionFrame>) -> ChannelValues {
        let frame = match frame {
            Some(frame) if !frame.is_empty() => frame,
            _ => return ChannelValues::silent(),
        };

        if !self.index_built {
            for (slot, &(feature, _)) in frame.coefficients().iter().enumerate() {
                self.slot_index.insert(feature, slot);
            }
            self.index_built = true;
            debug!("[SignalSampler] Indexed {} feature slots", self.slot_index.len());
        }

        let smile_left = self.coefficient(frame, FeatureId::MouthSmileLeft);
        let smile_right = self.coefficient(frame, FeatureId::MouthSmileRight);
        let frown_left = self.coefficient(frame, FeatureId::MouthFrownLeft);
        let frown_right = self.coefficient(frame, FeatureId::MouthFrownRight);
        let blink_left = self.coefficient(frame, FeatureId::EyeBlinkLeft);
        let blink_right = self.coefficient(frame, FeatureId::EyeBlinkRight);

        ChannelValues {
            smile: (smile_left + smile_right) - (frown_left + frown_right),
            eye_blink: (blink_left + blink_right) / 2.0,
            jaw_open: self.coefficient(frame, FeatureId::JawOpen),
            brow_raise: self.coefficient(frame, FeatureId::BrowInnerUp),
        }
    }

    /// O(1) indexed lookup with a linear-scan fallback.
    ///
    /// The cached slot is trusted only if the feature identity at that slot
    /// still matches; trackers drop or reorder features on partial frames.
    fn coefficient(&self, frame: &ExpressionFrame, feature: FeatureId) -> f32 {
        let coefficients = frame.coefficients();

        if let Some(&slot) = self.slot_index.get(&feature) {
            if let Some(&(found, value)) = coefficients.get(slot) {
                if found == feature {
                    return value;
                }
            }
        }

        coefficients
            .iter()
            .find(|(found, _)| *found == feature)
            .map(|&(_, value)| value)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_frame() -> ExpressionFrame {
        ExpressionFrame::new(vec![
            (FeatureId::MouthSmileLeft, 0.6),
            (FeatureId::MouthSmileRight, 0.5),
            (FeatureId::MouthFrownLeft, 0.1),
            (FeatureId::MouthFrownRight, 0.1),
            (FeatureId::EyeBlinkLeft, 0.8),
            (FeatureId::EyeBlinkRight, 0.6),
            (FeatureId::JawOpen, 0.45),
            (FeatureId::BrowInnerUp, 0.3),
        ])
    }

    #[test]
    fn test_channel_arithmetic() {
        let mut sampler = SignalSampler::new();
        let values = sampler.sample(Some(&full_frame()));

        assert!((values.smile - 0.9).abs() < 1e-6, "smile = {}", values.smile);
        assert!((values.eye_blink - 0.7).abs() < 1e-6);
        assert!((values.jaw_open - 0.45).abs() < 1e-6);
        assert!((values.brow_raise - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_smile_goes_negative_on_frown() {
        let mut sampler = SignalSampler::new();
        let frame = ExpressionFrame::new(vec![
            (FeatureId::MouthFrownLeft, 0.7),
            (FeatureId::MouthFrownRight, 0.6),
        ]);
        let values = sampler.sample(Some(&frame));
        assert!(values.smile < 0.0, "frowning must drive smile negative");
    }

    #[test]
    fn test_no_face_is_silent() {
        let mut sampler = SignalSampler::new();
        sampler.sample(Some(&full_frame()));
        assert_eq!(sampler.sample(None), ChannelValues::silent());
    }

    #[test]
    fn test_index_survives_reordered_frame() {
        let mut sampler = SignalSampler::new();
        sampler.sample(Some(&full_frame()));

        // Same features, different slot order: cached slots no longer match,
        // so the fallback scan must still find every value.
        let reordered = ExpressionFrame::new(vec![
            (FeatureId::JawOpen, 0.9),
            (FeatureId::MouthSmileLeft, 0.2),
            (FeatureId::MouthSmileRight, 0.2),
        ]);
        let values = sampler.sample(Some(&reordered));
        assert!((values.jaw_open - 0.9).abs() < 1e-6);
        assert!((values.smile - 0.4).abs() < 1e-6);
        assert_eq!(values.brow_raise, 0.0, "absent feature reads as zero");
    }

    #[test]
    fn test_empty_frame_is_silent() {
        let mut sampler = SignalSampler::new();
        let values = sampler.sample(Some(&ExpressionFrame::new(vec![])));
        assert_eq!(values, ChannelValues::silent());
    }
}
