// Stability bias: themes that lean toward (or away from) rest points.
//
// Each degree gets a stability score from its distance above the tonic:
// the tonic is the most stable, then the fifth, then the thirds; leading
// tones (a semitone from the tonic) are the least stable and everything
// else sits in between. A bias turns those scores into weights:
// `Stable` favours high scores, `Unstable` low ones, `Neutral` ignores them.
// `strength` blends between uniform weights (0) and fully biased ones (1).
//
// Both generators are seeded, so a (mode, params) pair always produces the
// same theme.

use crate::diatonic::compress_to_octave_span;
use crate::mode::Mode;
use crate::pitch::clamp_to_playable;
use contrapunct_prng::SeededRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Relative preference for each stepwise move in generated themes: repeat,
/// step, skip (indexed by |step|).
const STEP_WEIGHTS: [f64; 3] = [0.4, 1.0, 0.6];

/// Floor on any candidate weight so a draw never runs out of options.
const MIN_WEIGHT: f64 = 0.01;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityBias {
    Stable,
    Unstable,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityParams {
    #[serde(default)]
    pub bias: StabilityBias,
    /// 0 = no bias, 1 = full bias.
    #[serde(default = "default_strength")]
    pub strength: f64,
    #[serde(default)]
    pub seed: u64,
}

fn default_strength() -> f64 {
    0.7
}

impl Default for StabilityParams {
    fn default() -> Self {
        StabilityParams {
            bias: StabilityBias::default(),
            strength: default_strength(),
            seed: 0,
        }
    }
}

impl StabilityParams {
    fn strength(&self) -> f64 {
        if self.strength.is_finite() {
            self.strength.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Stability of a degree (0-based, wrapping), from 0.1 to 1.0.
pub fn degree_stability(mode: &Mode, degree: usize) -> f64 {
    let offsets = mode.offsets();
    match offsets[degree % offsets.len()] {
        0 => 1.0,
        7 => 0.8,
        3 | 4 => 0.6,
        1 | 11 => 0.1,
        _ => 0.35,
    }
}

/// Stability of the degree nearest to a pitch.
pub fn pitch_stability(mode: &Mode, pitch: u8) -> f64 {
    degree_stability(mode, mode.nearest_degree(pitch as i32).0)
}

fn position_weight(mode: &Mode, position: i32, params: &StabilityParams) -> f64 {
    let n = mode.degree_count() as i32;
    let stability = degree_stability(mode, position.rem_euclid(n) as usize);
    let preference = match params.bias {
        StabilityBias::Stable => stability,
        StabilityBias::Unstable => 1.0 - stability,
        StabilityBias::Neutral => 0.5,
    };
    let strength = params.strength();
    ((1.0 - strength) * 0.5 + strength * preference).max(MIN_WEIGHT)
}

/// A stepwise theme of `length` notes starting on (the nearest in-mode
/// pitch to) `start`, drawn with stability-weighted moves. Under a stable
/// bias the theme ends on the tonic. The walk stays within an octave of the
/// start and the result fits the mode's octave span.
pub fn generate_biased_theme(mode: &Mode, length: usize, start: u8, params: &StabilityParams) -> Vec<u8> {
    if length == 0 {
        return Vec::new();
    }
    let mut rng = SeededRng::new(params.seed);
    let n = mode.degree_count() as i32;
    let origin = mode.position_of(start as i32);
    let mut position = origin;
    let mut positions = vec![position];

    for _ in 1..length {
        let candidates: Vec<i32> = (-2..=2).map(|step| position + step).collect();
        let weights: Vec<f64> = candidates
            .iter()
            .map(|&c| {
                if (c - origin).abs() > n {
                    0.0
                } else {
                    position_weight(mode, c, params) * STEP_WEIGHTS[(c - position).unsigned_abs() as usize]
                }
            })
            .collect();
        if let Some(i) = rng.choose_weighted(&weights) {
            position = candidates[i];
        }
        positions.push(position);
    }

    if params.bias == StabilityBias::Stable && length > 1 {
        if let Some(last) = positions.last_mut() {
            *last = (*last as f64 / n as f64).round() as i32 * n;
        }
    }

    let notes: Vec<u8> = positions
        .iter()
        .map(|&p| clamp_to_playable(mode.pitch_at(p)))
        .collect();
    debug!(length, bias = ?params.bias, "generated biased theme");
    compress_to_octave_span(&notes, mode)
}

/// Nudge each note, with probability `strength`, to a stability-weighted
/// choice among itself and its two neighbouring degrees. Notes outside the
/// mode are snapped first. A neutral bias leaves the theme as it is.
pub fn adjust_theme_stability(theme: &[u8], mode: &Mode, params: &StabilityParams) -> Vec<u8> {
    if params.bias == StabilityBias::Neutral {
        return theme.to_vec();
    }
    let mut rng = SeededRng::new(params.seed);
    let strength = params.strength();
    theme
        .iter()
        .map(|&note| {
            let position = mode.position_of(note as i32);
            if !rng.random_bool(strength) {
                return clamp_to_playable(mode.pitch_at(position));
            }
            let candidates = [position - 1, position, position + 1];
            let weights: Vec<f64> = candidates
                .iter()
                .map(|&c| position_weight(mode, c, params))
                .collect();
            let chosen = rng
                .choose_weighted(&weights)
                .map_or(position, |i| candidates[i]);
            clamp_to_playable(mode.pitch_at(chosen))
        })
        .collect()
}
