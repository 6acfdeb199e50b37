// Modal scales: step patterns anchored on a tonic.
//
// A mode is an ordered list of semitone steps that sums to one octave, a
// tonic pitch class and an octave span (how many octaves an adapted melody
// may cover). The catalog in catalog.rs holds some hundred-odd named step
// patterns from many traditions; this module only knows how to validate one
// and do degree arithmetic with it.
//
// Degree arithmetic uses *modal positions*: position = octave * n + degree,
// with n the number of degrees and position 0 the tonic at the bottom of the
// MIDI range. Moving a melody by k positions is diatonic transposition; it
// never leaves the mode. Chromatic (semitone) arithmetic lives in pitch.rs.
//
// Nearest-degree lookups break ties toward the lower degree index, counting
// the tonic as degree 0 even when the nearer copy is an octave up. The same
// rule drives `nearest_pitch_class_in_set` in diatonic.rs, so snapping by
// set and snapping by position always agree.

use crate::error::{MusicError, Result};
use crate::pitch::{MAX_INTERVAL_OCTAVES, circular_distance, pc_name, pitch_class, signed_pc_delta};
use serde::{Deserialize, Serialize};

/// Octave span used when a catalog entry does not declare one.
pub const DEFAULT_OCTAVE_SPAN: u8 = 2;

/// The serialized shape of a mode. Deserializing a `Mode` goes through this
/// record and re-runs validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSpec {
    pub name: String,
    pub steps: Vec<u8>,
    #[serde(default)]
    pub tonic: u8,
    #[serde(default = "default_octave_span")]
    pub octave_span: u8,
}

fn default_octave_span() -> u8 {
    DEFAULT_OCTAVE_SPAN
}

/// A validated mode on a specific tonic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ModeSpec", into = "ModeSpec")]
pub struct Mode {
    name: String,
    steps: Vec<u8>,
    tonic: u8,
    octave_span: u8,
    /// Cumulative semitone offset of each degree from the tonic.
    offsets: Vec<u8>,
}

impl Mode {
    /// Build a mode, rejecting step patterns that are empty, contain a zero
    /// step, or do not sum to 12.
    pub fn new(name: impl Into<String>, steps: Vec<u8>, tonic: u8, octave_span: u8) -> Result<Self> {
        let name = name.into();
        let sum: u32 = steps.iter().map(|&s| s as u32).sum();
        if steps.is_empty() || sum != 12 || steps.contains(&0) {
            return Err(MusicError::DegenerateMode { name, sum });
        }
        let mut offsets = Vec::with_capacity(steps.len());
        let mut acc = 0u8;
        for &step in &steps {
            offsets.push(acc);
            acc += step;
        }
        Ok(Mode {
            name,
            steps,
            tonic: tonic % 12,
            octave_span: octave_span.max(1),
            offsets,
        })
    }

    /// Major (Ionian) on the given tonic.
    pub fn major(tonic: u8) -> Self {
        Self::builtin("Major", &[2, 2, 1, 2, 2, 2, 1], tonic)
    }

    /// Natural minor (Aeolian) on the given tonic.
    pub fn minor(tonic: u8) -> Self {
        Self::builtin("Minor", &[2, 1, 2, 2, 1, 2, 2], tonic)
    }

    fn builtin(name: &str, steps: &[u8], tonic: u8) -> Self {
        let offsets = steps
            .iter()
            .scan(0u8, |acc, &s| {
                let o = *acc;
                *acc += s;
                Some(o)
            })
            .collect();
        Mode {
            name: name.to_string(),
            steps: steps.to_vec(),
            tonic: tonic % 12,
            octave_span: DEFAULT_OCTAVE_SPAN,
            offsets,
        }
    }

    /// The same step pattern on another tonic.
    pub fn with_tonic(&self, tonic: u8) -> Self {
        Mode {
            tonic: tonic % 12,
            ..self.clone()
        }
    }

    pub fn with_octave_span(&self, octave_span: u8) -> Self {
        Mode {
            octave_span: octave_span.max(1),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name with its tonic, e.g. "D Dorian".
    pub fn display_name(&self) -> String {
        format!("{} {}", pc_name(self.tonic), self.name)
    }

    pub fn steps(&self) -> &[u8] {
        &self.steps
    }

    pub fn tonic(&self) -> u8 {
        self.tonic
    }

    pub fn octave_span(&self) -> u8 {
        self.octave_span
    }

    /// Number of scale degrees (7 for heptatonic modes).
    pub fn degree_count(&self) -> usize {
        self.steps.len()
    }

    /// Semitone offset of each degree above the tonic.
    pub fn offsets(&self) -> &[u8] {
        &self.offsets
    }

    /// Pitch classes of the degrees, in degree order starting at the tonic.
    pub fn pitch_classes(&self) -> Vec<u8> {
        self.offsets.iter().map(|&o| (self.tonic + o) % 12).collect()
    }

    /// Check if a pitch belongs to the mode.
    pub fn contains(&self, pitch: i32) -> bool {
        self.scale_degree(pitch).is_some()
    }

    /// The degree (0-based) of an in-mode pitch, or `None`.
    pub fn scale_degree(&self, pitch: i32) -> Option<usize> {
        let rel = pitch_class(pitch - self.tonic as i32);
        self.offsets.iter().position(|&o| o == rel)
    }

    /// Nearest degree to a pitch and the in-mode pitch it snaps to.
    ///
    /// Distance is measured around the pitch-class circle; ties go to the
    /// lower degree index.
    pub fn nearest_degree(&self, pitch: i32) -> (usize, i32) {
        let rel = pitch_class(pitch - self.tonic as i32);
        let mut best = 0;
        let mut best_dist = u8::MAX;
        for (i, &o) in self.offsets.iter().enumerate() {
            let d = circular_distance(rel, o);
            if d < best_dist {
                best = i;
                best_dist = d;
            }
        }
        (best, pitch + signed_pc_delta(rel, self.offsets[best]))
    }

    /// Absolute modal position of the degree nearest to `pitch`.
    pub fn position_of(&self, pitch: i32) -> i32 {
        let (degree, snapped) = self.nearest_degree(pitch);
        let octave = (snapped - self.tonic as i32).div_euclid(12);
        octave * self.degree_count() as i32 + degree as i32
    }

    /// The pitch at an absolute modal position.
    pub fn pitch_at(&self, position: i32) -> i32 {
        let n = self.degree_count() as i32;
        let octave = position.div_euclid(n);
        let degree = position.rem_euclid(n) as usize;
        self.tonic as i32 + octave * 12 + self.offsets[degree] as i32
    }

    /// Move a pitch by `steps` scale degrees (snapping it first if needed).
    /// Moves wider than the MIDI range are capped, keeping the degree.
    pub fn step_pitch(&self, pitch: i32, steps: i32) -> i32 {
        let n = self.degree_count() as i32;
        let octaves = steps
            .div_euclid(n)
            .clamp(-MAX_INTERVAL_OCTAVES, MAX_INTERVAL_OCTAVES);
        self.pitch_at(self.position_of(pitch) + octaves * n + steps.rem_euclid(n))
    }
}

impl TryFrom<ModeSpec> for Mode {
    type Error = MusicError;

    fn try_from(spec: ModeSpec) -> Result<Self> {
        Mode::new(spec.name, spec.steps, spec.tonic, spec.octave_span)
    }
}

impl From<Mode> for ModeSpec {
    fn from(mode: Mode) -> Self {
        ModeSpec {
            name: mode.name,
            steps: mode.steps,
            tonic: mode.tonic,
            octave_span: mode.octave_span,
        }
    }
}
