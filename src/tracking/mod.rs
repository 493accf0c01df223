// Tracking module - the input boundary to the face-tracking collaborator
//
// The engine never talks to a camera or ML subsystem directly. It consumes
// per-tick [ExpressionFrame]s through the [ExpressionSource] trait; a frame
// is a sparse list of (feature, coefficient) pairs in whatever order the
// tracker emits them, plus an implicit validity flag (no frame this tick
// means no face is currently tracked).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod sampler;

pub use sampler::{ChannelValues, SignalSampler};

/// Facial feature identities the engine knows how to read.
///
/// Names follow the ARKit blend-shape locations the original trackers use;
/// a source may emit more features than these, the sampler ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureId {
    MouthSmileLeft,
    MouthSmileRight,
    MouthFrownLeft,
    MouthFrownRight,
    EyeBlinkLeft,
    EyeBlinkRight,
    JawOpen,
    BrowInnerUp,
}

/// One tick's worth of raw tracking data: sparse (feature, coefficient)
/// pairs, coefficients nominally in [0, 1].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionFrame {
    coefficients: Vec<(FeatureId, f32)>,
}

impl ExpressionFrame {
    pub fn new(coefficients: Vec<(FeatureId, f32)>) -> Self {
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &[(FeatureId, f32)] {
        &self.coefficients
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }
}

/// Per-tick provider of tracking frames.
///
/// Returning `None` means "no face currently tracked" and must leave every
/// channel silent downstream; the engine polls again next tick.
pub trait ExpressionSource {
    fn next_frame(&mut self) -> Option<ExpressionFrame>;
}

/// Serialized form of one scripted frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptFrame {
    /// False simulates a tracking dropout for this tick.
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default)]
    pub coefficients: HashMap<FeatureId, f32>,
}

fn default_valid() -> bool {
    true
}

/// Deterministic [ExpressionSource] that replays a frame-by-frame timeline.
///
/// Stands in for the AR tracker in the CLI and in integration tests. Once
/// the script runs out it keeps reporting "no face".
#[derive(Debug)]
pub struct ScriptedSource {
    frames: Vec<ScriptFrame>,
    position: usize,
}

impl ScriptedSource {
    pub fn new(frames: Vec<ScriptFrame>) -> Self {
        Self { frames, position: 0 }
    }

    /// Remaining frames in the script.
    pub fn remaining(&self) -> usize {
        self.frames.len().saturating_sub(self.position)
    }
}

impl ExpressionSource for ScriptedSource {
    fn next_frame(&mut self) -> Option<ExpressionFrame> {
        let frame = self.frames.get(self.position)?;
        self.position += 1;
        if !frame.valid {
            return None;
        }
        let coefficients = frame
            .coefficients
            .iter()
            .map(|(&feature, &value)| (feature, value))
            .collect();
        Some(ExpressionFrame::new(coefficients))
    }
}
