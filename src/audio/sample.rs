//! SampleBank - sound assets decoded once at startup
//!
//! Every configured sound is decoded (or synthesized) into a mono f32
//! buffer before the engine starts, so the trigger path never touches the
//! filesystem. A sound that fails to load is reported and simply absent
//! from the bank; channels bound to it become no-ops.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::PlaybackError;

/// Duration of the synthesized click burst in milliseconds
const CLICK_DURATION_MS: f32 = 20.0;

/// Duration of the synthesized tone in milliseconds
const TONE_DURATION_MS: f32 = 150.0;

/// Where a sound's audio comes from.
///
/// `Click` and `Tone` exist so the demo CLI and tests run without shipping
/// WAV assets; both are deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SoundSource {
    /// WAV file on disk
    File { path: PathBuf },
    /// 20ms seeded white-noise burst
    Click,
    /// Short decaying sine tone
    Tone { freq_hz: f32 },
}

/// One decoded sound: mono f32 frames at `source_rate`.
#[derive(Debug)]
pub struct Sample {
    pub name: String,
    pub frames: Vec<f32>,
    pub source_rate: u32,
}

impl Sample {
    /// Playback-rate factor that makes this sample sound at its recorded
    /// pitch on a device running at `device_rate`.
    #[inline]
    pub fn rate_scale(&self, device_rate: u32) -> f32 {
        self.source_rate as f32 / device_rate as f32
    }
}

/// Registry of decoded sounds, keyed by configured name.
#[derive(Debug, Default)]
pub struct SampleBank {
    samples: BTreeMap<String, Arc<Sample>>,
}

impl SampleBank {
    /// Decode every configured sound.
    ///
    /// Load failures are returned as diagnostics, not errors: the bank is
    /// still usable, minus the missing sounds.
    pub fn load(
        sources: &BTreeMap<String, SoundSource>,
        device_rate: u32,
    ) -> (Self, Vec<PlaybackError>) {
        let mut samples = BTreeMap::new();
        let mut diagnostics = Vec::new();

        for (name, source) in sources {
            match decode(name, source, device_rate) {
                Ok(sample) => {
                    info!(
                        "[SampleBank] Loaded '{}' ({} frames @ {} Hz)",
                        name,
                        sample.frames.len(),
                        sample.source_rate
                    );
                    samples.insert(name.clone(), Arc::new(sample));
                }
                Err(err) => {
                    warn!("[SampleBank] {}", err);
                    diagnostics.push(err);
                }
            }
        }

        (Self { samples }, diagnostics)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Sample>> {
        self.samples.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.samples.contains_key(name)
    }

    /// Sounds in deterministic (sorted) order; voice slots are laid out in
    /// this order so the pool and the mixer agree.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<Sample>)> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn decode(name: &str, source: &SoundSource, device_rate: u32) -> Result<Sample, PlaybackError> {
    match source {
        SoundSource::File { path } => decode_wav(name, path),
        SoundSource::Click => Ok(Sample {
            name: name.to_string(),
            frames: generate_click(device_rate),
            source_rate: device_rate,
        }),
        SoundSource::Tone { freq_hz } => Ok(Sample {
            name: name.to_string(),
            frames: generate_tone(*freq_hz, device_rate),
            source_rate: device_rate,
        }),
    }
}

/// Decode a WAV file to mono f32, averaging channels.
fn decode_wav(name: &str, path: &Path) -> Result<Sample, PlaybackError> {
    let missing = |reason: String| PlaybackError::MissingAsset {
        sound: name.to_string(),
        reason,
    };

    let mut reader = hound::WavReader::open(path)
        .map_err(|e| missing(format!("{}: {}", path.display(), e)))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| missing(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| missing(e.to_string()))?
        }
    };

    if interleaved.is_empty() {
        return Err(missing("file contains no samples".to_string()));
    }

    let frames = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(Sample {
        name: name.to_string(),
        frames,
        source_rate: spec.sample_rate,
    })
}

/// Generate a 20ms white-noise click.
///
/// Fixed seed so repeated loads produce identical audio.
pub fn generate_click(sample_rate: u32) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * CLICK_DURATION_MS / 1000.0) as usize;
    let mut rng = StdRng::seed_from_u64(42);

    let mut samples = Vec::with_capacity(num_samples);
    for _ in 0..num_samples {
        samples.push(rng.gen_range(-1.0..1.0));
    }
    samples
}

/// Generate a short sine tone with an exponential decay envelope.
pub fn generate_tone(freq_hz: f32, sample_rate: u32) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * TONE_DURATION_MS / 1000.0) as usize;
    let mut samples = Vec::with_capacity(num_samples);
    for i in 0..num_samples {
        let t = i as f32 / sample_rate as f32;
        let envelope = (-t * 18.0).exp();
        samples.push(0.8 * envelope * (2.0 * std::f32::consts::PI * freq_hz * t).sin());
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_is_deterministic() {
        let a = generate_click(48_000);
        let b = generate_click(48_000);
        assert_eq!(a, b, "seeded click generation must be reproducible");
        assert_eq!(a.len(), (48_000.0_f32 * 0.02) as usize);
    }

    #[test]
    fn test_click_in_range() {
        for (i, &s) in generate_click(44_100).iter().enumerate() {
            assert!((-1.0..=1.0).contains(&s), "sample {} at {} out of range", s, i);
        }
    }

    #[test]
    fn test_tone_decays() {
        let tone = generate_tone(440.0, 48_000);
        assert!(!tone.is_empty());
        let head: f32 = tone[..100].iter().map(|s| s.abs()).fold(0.0, f32::max);
        let tail: f32 = tone[tone.len() - 100..]
            .iter()
            .map(|s| s.abs())
            .fold(0.0, f32::max);
        assert!(head > tail, "envelope should decay: head {} tail {}", head, tail);
    }

    #[test]
    fn test_bank_reports_missing_file() {
        let mut sources = BTreeMap::new();
        sources.insert(
            "ghost".to_string(),
            SoundSource::File {
                path: PathBuf::from("/nonexistent/ghost.wav"),
            },
        );
        sources.insert("click".to_string(), SoundSource::Click);

        let (bank, diagnostics) = SampleBank::load(&sources, 48_000);
        assert!(bank.contains("click"));
        assert!(!bank.contains("ghost"), "failed asset must be absent");
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            diagnostics[0],
            PlaybackError::MissingAsset { ref sound, .. } if sound == "ghost"
        ));
    }

    #[test]
    fn test_rate_scale() {
        let sample = Sample {
            name: "s".to_string(),
            frames: vec![0.0; 10],
            source_rate: 44_100,
        };
        let scale = sample.rate_scale(88_200);
        assert!((scale - 0.5).abs() < 1e-6);
    }
}
