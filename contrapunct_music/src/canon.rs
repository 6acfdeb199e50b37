// Canon engine: followers derived from a leader by a named rule.
//
// `CanonParams` is a closed set of canon types, each carrying only the
// fields it uses. `generate_canon` dispatches on it and returns the leader
// (or leaders), every follower, and metadata describing what was built.
// Everything is a pure function of (leader, mode, params). The two
// randomized types, loose and per-mutative, carry their own seed.
//
// Conventions shared by every type:
// - A delay is a run of leading rests (see part.rs). Multi-voice types
//   stagger follower i by `delay * i` unless noted otherwise.
// - Intervals are in semitones. Types described as diatonic convert the
//   interval to a degree count in the mode (+7 in major is four degrees)
//   and step through the scale, so the follower never leaves the mode.
//   Chromatic types add semitones directly.
// - Every follower is octave-folded into the playable range.
// - Out-of-range parameters (a zero ratio, one voice, adherence above 100)
//   are replaced with a usable value and logged, never rejected.
//
// Type summary:
//   strict, chromatic          transposition at an interval
//   inversion, mirror          chromatic mirror on an axis / diatonic mirror
//                              on the leader's first note
//   retrograde, retrograde_inversion, crab, table
//                              time reversal, alone or with inversion
//   mensuration, augmentation, diminution, prolation
//                              proportional durations
//   double                     two leader/follower pairs
//   per_tonos                  each voice in its own key
//   round, stretto, stacked    several followers at growing delays
//   accompanied                strict canon plus a free tonic/dominant bass
//   perpetual                  leader repeated, follower chasing it
//   loose                      strict canon with seeded deviations
//   per_mutative               seeded reorderings of the leader's notes

use crate::diatonic::{diatonic_invert, diatonic_transpose, interval_to_steps};
use crate::imitation::{chromatic_imitation, diatonic_imitation};
use crate::mode::Mode;
use crate::part::Part;
use crate::pitch::clamp_to_playable;
use contrapunct_prng::SeededRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Upper bound on voices for round, stretto and stacked canons.
pub const MAX_CANON_VOICES: u8 = 8;

/// Length in beats of each accompaniment bass note.
const BASS_NOTE_BEATS: f64 = 4.0;

/// Shuffle attempts allowed per requested permutation.
const PERMUTATION_ATTEMPTS: usize = 20;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Interval and delay of one leader/follower pair in a double canon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonLine {
    pub interval: i32,
    pub delay: u32,
}

/// Named modulation targets for per-tonos canons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyTarget {
    Dominant,
    Subdominant,
    Supertonic,
    Mediant,
    Submediant,
    RelativeMajor,
    RelativeMinor,
    Tritone,
}

impl KeyTarget {
    /// Transposition from the home tonic to the target key.
    pub fn semitones(self) -> i32 {
        match self {
            KeyTarget::Dominant => 7,
            KeyTarget::Subdominant => 5,
            KeyTarget::Supertonic => 2,
            KeyTarget::Mediant => 4,
            KeyTarget::Submediant => 9,
            KeyTarget::RelativeMajor => 3,
            KeyTarget::RelativeMinor => -3,
            KeyTarget::Tritone => 6,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            KeyTarget::Dominant => "Dominant",
            KeyTarget::Subdominant => "Subdominant",
            KeyTarget::Supertonic => "Supertonic",
            KeyTarget::Mediant => "Mediant",
            KeyTarget::Submediant => "Submediant",
            KeyTarget::RelativeMajor => "Relative Major",
            KeyTarget::RelativeMinor => "Relative Minor",
            KeyTarget::Tritone => "Tritone",
        }
    }
}

/// One per-tonos voice: a raw interval or a named key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TonalStep {
    Interval(i32),
    Key(KeyTarget),
}

impl TonalStep {
    pub fn semitones(self) -> i32 {
        match self {
            TonalStep::Interval(i) => i,
            TonalStep::Key(k) => k.semitones(),
        }
    }

    fn label(self) -> String {
        match self {
            TonalStep::Interval(i) => format!("{i:+} semitones"),
            TonalStep::Key(k) => k.label().to_string(),
        }
    }
}

/// Canon type and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanonParams {
    Strict {
        interval: i32,
        delay: u32,
    },
    Chromatic {
        interval: i32,
        delay: u32,
    },
    Inversion {
        axis: u8,
        delay: u32,
    },
    Mirror {
        #[serde(default)]
        interval: i32,
        delay: u32,
    },
    Retrograde {
        #[serde(default)]
        interval: i32,
        delay: u32,
    },
    RetrogradeInversion {
        axis: u8,
        delay: u32,
    },
    Crab,
    Table,
    Mensuration {
        ratio: f64,
        delay: u32,
    },
    Augmentation {
        factor: f64,
        #[serde(default)]
        interval: i32,
        delay: u32,
    },
    Diminution {
        divisor: f64,
        #[serde(default)]
        interval: i32,
        delay: u32,
    },
    Prolation {
        ratios: Vec<f64>,
        #[serde(default)]
        delay: u32,
    },
    Double {
        primary: CanonLine,
        secondary: CanonLine,
        /// Second leader; defaults to the first leader's mirror an octave
        /// lower.
        #[serde(default)]
        second_leader: Option<Vec<u8>>,
    },
    PerTonos {
        steps: Vec<TonalStep>,
        delay: u32,
    },
    Round {
        voices: u8,
        delay: u32,
    },
    Stretto {
        voices: u8,
        interval: i32,
        delay: u32,
        /// Beats removed from each successive entry gap.
        #[serde(default = "default_tighten")]
        tighten: u32,
    },
    Stacked {
        voices: u8,
        interval: i32,
        delay: u32,
    },
    Accompanied {
        interval: i32,
        delay: u32,
    },
    Perpetual {
        repetitions: u8,
        interval: i32,
        delay: u32,
    },
    Loose {
        interval: i32,
        delay: u32,
        /// Percentage of notes that follow the strict canon exactly.
        adherence: u8,
        seed: u64,
    },
    PerMutative {
        permutations: u8,
        seed: u64,
    },
}

fn default_tighten() -> u32 {
    1
}

impl CanonParams {
    /// Stable identifier of the canon type (the serde tag).
    pub fn kind(&self) -> &'static str {
        match self {
            CanonParams::Strict { .. } => "strict",
            CanonParams::Chromatic { .. } => "chromatic",
            CanonParams::Inversion { .. } => "inversion",
            CanonParams::Mirror { .. } => "mirror",
            CanonParams::Retrograde { .. } => "retrograde",
            CanonParams::RetrogradeInversion { .. } => "retrograde_inversion",
            CanonParams::Crab => "crab",
            CanonParams::Table => "table",
            CanonParams::Mensuration { .. } => "mensuration",
            CanonParams::Augmentation { .. } => "augmentation",
            CanonParams::Diminution { .. } => "diminution",
            CanonParams::Prolation { .. } => "prolation",
            CanonParams::Double { .. } => "double",
            CanonParams::PerTonos { .. } => "per_tonos",
            CanonParams::Round { .. } => "round",
            CanonParams::Stretto { .. } => "stretto",
            CanonParams::Stacked { .. } => "stacked",
            CanonParams::Accompanied { .. } => "accompanied",
            CanonParams::Perpetual { .. } => "perpetual",
            CanonParams::Loose { .. } => "loose",
            CanonParams::PerMutative { .. } => "per_mutative",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CanonParams::Strict { .. } => "Strict Canon",
            CanonParams::Chromatic { .. } => "Chromatic Canon",
            CanonParams::Inversion { .. } => "Inversion Canon",
            CanonParams::Mirror { .. } => "Mirror Canon",
            CanonParams::Retrograde { .. } => "Retrograde Canon",
            CanonParams::RetrogradeInversion { .. } => "Retrograde-Inversion Canon",
            CanonParams::Crab => "Crab Canon",
            CanonParams::Table => "Table Canon",
            CanonParams::Mensuration { .. } => "Mensuration Canon",
            CanonParams::Augmentation { .. } => "Augmentation Canon",
            CanonParams::Diminution { .. } => "Diminution Canon",
            CanonParams::Prolation { .. } => "Prolation Canon",
            CanonParams::Double { .. } => "Double Canon",
            CanonParams::PerTonos { .. } => "Canon per Tonos",
            CanonParams::Round { .. } => "Round",
            CanonParams::Stretto { .. } => "Stretto Canon",
            CanonParams::Stacked { .. } => "Stacked Canon",
            CanonParams::Accompanied { .. } => "Accompanied Canon",
            CanonParams::Perpetual { .. } => "Perpetual Canon",
            CanonParams::Loose { .. } => "Loose Canon",
            CanonParams::PerMutative { .. } => "Canon per Mutationes",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CanonParams::Strict { .. } => "Follower repeats the leader a fixed number of scale degrees away.",
            CanonParams::Chromatic { .. } => "Follower repeats the leader at an exact semitone interval.",
            CanonParams::Inversion { .. } => "Follower mirrors the leader's intervals around an axis pitch.",
            CanonParams::Mirror { .. } => "Follower mirrors the leader by scale degrees around its first note.",
            CanonParams::Retrograde { .. } => "Follower states the leader backwards.",
            CanonParams::RetrogradeInversion { .. } => "Follower states the leader's inversion backwards.",
            CanonParams::Crab => "Leader and its exact reversal sound together.",
            CanonParams::Table => "Leader against its reversed inversion, as read across a table.",
            CanonParams::Mensuration { .. } => "Follower keeps the pitches but scales every duration.",
            CanonParams::Augmentation { .. } => "Follower in longer note values.",
            CanonParams::Diminution { .. } => "Follower in shorter note values.",
            CanonParams::Prolation { .. } => "Several followers, each in its own proportion.",
            CanonParams::Double { .. } => "Two independent canons sounding at once.",
            CanonParams::PerTonos { .. } => "Each successive voice enters in a new key.",
            CanonParams::Round { .. } => "Voices enter one after another at the unison.",
            CanonParams::Stretto { .. } => "Entries crowd closer together with each voice.",
            CanonParams::Stacked { .. } => "Each voice enters one interval above the last.",
            CanonParams::Accompanied { .. } => "Strict canon over a free tonic and dominant bass.",
            CanonParams::Perpetual { .. } => "Leader loops so the canon can repeat indefinitely.",
            CanonParams::Loose { .. } => "Mostly strict imitation with occasional free notes.",
            CanonParams::PerMutative { .. } => "Reorderings of the leader's notes offered as candidates.",
        }
    }

    /// The seed of a randomized canon type.
    pub fn seed(&self) -> Option<u64> {
        match self {
            CanonParams::Loose { seed, .. } | CanonParams::PerMutative { seed, .. } => Some(*seed),
            _ => None,
        }
    }

    /// Replace the seed of a randomized canon type; other types are
    /// returned unchanged.
    pub fn with_seed(mut self, new_seed: u64) -> Self {
        if let CanonParams::Loose { seed, .. } | CanonParams::PerMutative { seed, .. } = &mut self {
            *seed = new_seed;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonRole {
    Leader,
    Follower,
    Accompaniment,
    /// An alternative follower offered for selection.
    Candidate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonVoice {
    pub role: CanonRole,
    pub label: String,
    pub part: Part,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonMetadata {
    pub kind: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub voice_count: usize,
    /// Leading rests of each voice, in voice order.
    pub delays: Vec<u32>,
    /// Key names of per-tonos voices, in entry order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_targets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonResult {
    pub voices: Vec<CanonVoice>,
    pub metadata: CanonMetadata,
}

impl CanonResult {
    /// Voices with the given role, in order.
    pub fn voices_with_role(&self, role: CanonRole) -> impl Iterator<Item = &CanonVoice> {
        self.voices.iter().filter(move |v| v.role == role)
    }

    pub fn parts(&self) -> Vec<Part> {
        self.voices.iter().map(|v| v.part.clone()).collect()
    }
}

fn voice(role: CanonRole, label: impl Into<String>, part: Part) -> CanonVoice {
    CanonVoice {
        role,
        label: label.into(),
        part,
    }
}

fn leader_voice(leader: &Part) -> CanonVoice {
    voice(CanonRole::Leader, "Leader", leader.clone())
}

fn follower(n: usize, part: Part) -> CanonVoice {
    voice(CanonRole::Follower, format!("Follower {n}"), part)
}

// ---------------------------------------------------------------------------
// Shared transformations
// ---------------------------------------------------------------------------

/// Chromatic mirror around an axis, folded into the playable range.
pub fn invert(notes: &[u8], axis: u8) -> Vec<u8> {
    notes
        .iter()
        .map(|&p| clamp_to_playable(2 * axis as i32 - p as i32))
        .collect()
}

fn clamp_part(part: Part) -> Part {
    let notes = part.notes.iter().map(|&n| clamp_to_playable(n as i32)).collect();
    part.with_notes(notes)
}

fn positive_or(value: f64, fallback: f64, what: &str) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!(value, fallback, "canon {what} must be positive, using fallback");
        fallback
    }
}

fn voice_count(requested: u8) -> usize {
    let clamped = requested.clamp(2, MAX_CANON_VOICES);
    if clamped != requested {
        warn!(requested, used = clamped, "canon voice count out of range");
    }
    clamped as usize
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Build a canon from a leader. An empty leader yields no voices.
pub fn generate_canon(leader: &Part, mode: &Mode, params: &CanonParams) -> CanonResult {
    let mut key_targets = Vec::new();
    let voices = if leader.is_empty() {
        Vec::new()
    } else {
        build_voices(leader, mode, params, &mut key_targets)
    };
    let metadata = CanonMetadata {
        kind: params.kind(),
        name: params.display_name(),
        description: params.description(),
        voice_count: voices.len(),
        delays: voices.iter().map(|v| v.part.leading_rests() as u32).collect(),
        key_targets,
        seed: params.seed(),
    };
    debug!(
        kind = metadata.kind,
        voices = metadata.voice_count,
        mode = %mode.display_name(),
        "generated canon"
    );
    CanonResult { voices, metadata }
}

fn build_voices(
    leader: &Part,
    mode: &Mode,
    params: &CanonParams,
    key_targets: &mut Vec<String>,
) -> Vec<CanonVoice> {
    match params {
        CanonParams::Strict { interval, delay } => vec![
            leader_voice(leader),
            follower(1, diatonic_imitation(leader, mode, *interval, *delay)),
        ],
        CanonParams::Chromatic { interval, delay } => vec![
            leader_voice(leader),
            follower(1, chromatic_imitation(leader, *interval, *delay)),
        ],
        CanonParams::Inversion { axis, delay } => vec![
            leader_voice(leader),
            follower(1, leader.with_notes(invert(&leader.notes, *axis)).delayed(*delay)),
        ],
        CanonParams::Mirror { interval, delay } => {
            let mirrored = diatonic_invert(&leader.notes, leader.notes[0], mode);
            let notes = diatonic_transpose(&mirrored, interval_to_steps(*interval, mode), mode);
            vec![leader_voice(leader), follower(1, leader.with_notes(notes).delayed(*delay))]
        }
        CanonParams::Retrograde { interval, delay } => vec![
            leader_voice(leader),
            follower(1, chromatic_imitation(&leader.retrograde(), *interval, *delay)),
        ],
        CanonParams::RetrogradeInversion { axis, delay } => {
            let inverted = leader.with_notes(invert(&leader.notes, *axis));
            vec![leader_voice(leader), follower(1, inverted.retrograde().delayed(*delay))]
        }
        CanonParams::Crab => {
            let leader = clamp_part(leader.clone());
            vec![leader_voice(&leader), follower(1, leader.retrograde())]
        }
        CanonParams::Table => {
            let low = leader.notes.iter().copied().min().unwrap_or(0) as i32;
            let high = leader.notes.iter().copied().max().unwrap_or(0) as i32;
            let notes = leader
                .notes
                .iter()
                .map(|&p| clamp_to_playable(low + high - p as i32))
                .collect();
            vec![leader_voice(leader), follower(1, leader.with_notes(notes).retrograde())]
        }
        CanonParams::Mensuration { ratio, delay } => {
            let ratio = positive_or(*ratio, 1.0, "ratio");
            vec![
                leader_voice(leader),
                follower(1, clamp_part(leader.scaled(ratio)).delayed(*delay)),
            ]
        }
        CanonParams::Augmentation {
            factor,
            interval,
            delay,
        } => {
            let factor = positive_or(*factor, 2.0, "augmentation factor");
            let part = diatonic_imitation(leader, mode, *interval, 0).scaled(factor);
            vec![leader_voice(leader), follower(1, part.delayed(*delay))]
        }
        CanonParams::Diminution {
            divisor,
            interval,
            delay,
        } => {
            let divisor = positive_or(*divisor, 2.0, "diminution divisor");
            let part = diatonic_imitation(leader, mode, *interval, 0).scaled(1.0 / divisor);
            vec![leader_voice(leader), follower(1, part.delayed(*delay))]
        }
        CanonParams::Prolation { ratios, delay } => prolation(leader, ratios, *delay),
        CanonParams::Double {
            primary,
            secondary,
            second_leader,
        } => double(leader, mode, primary, secondary, second_leader.as_deref()),
        CanonParams::PerTonos { steps, delay } => per_tonos(leader, steps, *delay, key_targets),
        CanonParams::Round { voices, delay } => {
            let mut out = vec![leader_voice(leader)];
            for i in 1..voice_count(*voices) {
                out.push(follower(i, chromatic_imitation(leader, 0, delay * i as u32)));
            }
            out
        }
        CanonParams::Stretto {
            voices,
            interval,
            delay,
            tighten,
        } => stretto(leader, mode, voice_count(*voices), *interval, *delay, *tighten),
        CanonParams::Stacked {
            voices,
            interval,
            delay,
        } => {
            let steps = interval_to_steps(*interval, mode);
            let mut out = vec![leader_voice(leader)];
            for i in 1..voice_count(*voices) {
                let notes = diatonic_transpose(&leader.notes, steps * i as i32, mode);
                out.push(follower(i, leader.with_notes(notes).delayed(delay * i as u32)));
            }
            out
        }
        CanonParams::Accompanied { interval, delay } => {
            let strict = diatonic_imitation(leader, mode, *interval, *delay);
            let beats = leader.length_beats().max(strict.length_beats()).ceil();
            let bass = accompaniment_bass(leader, mode, beats);
            vec![
                leader_voice(leader),
                follower(1, strict),
                voice(CanonRole::Accompaniment, "Bass", bass),
            ]
        }
        CanonParams::Perpetual {
            repetitions,
            interval,
            delay,
        } => {
            let mut looped = leader.clone();
            for _ in 1..(*repetitions).max(1) {
                looped.append(leader);
            }
            let chase = diatonic_imitation(&looped, mode, *interval, *delay);
            vec![voice(CanonRole::Leader, "Leader", looped), follower(1, chase)]
        }
        CanonParams::Loose {
            interval,
            delay,
            adherence,
            seed,
        } => vec![
            leader_voice(leader),
            follower(1, loose(leader, mode, *interval, *delay, *adherence, *seed)),
        ],
        CanonParams::PerMutative { permutations, seed } => {
            per_mutative(leader, *permutations, *seed)
        }
    }
}

fn prolation(leader: &Part, ratios: &[f64], delay: u32) -> Vec<CanonVoice> {
    let mut usable: Vec<f64> = ratios
        .iter()
        .copied()
        .filter(|r| r.is_finite() && *r > 0.0)
        .collect();
    if usable.len() != ratios.len() {
        warn!(dropped = ratios.len() - usable.len(), "ignoring non-positive prolation ratios");
    }
    if usable.is_empty() {
        usable.push(2.0);
    }
    let mut out = vec![leader_voice(leader)];
    for (i, ratio) in usable.into_iter().enumerate() {
        out.push(follower(i + 1, clamp_part(leader.scaled(ratio)).delayed(delay)));
    }
    out
}

fn double(
    leader: &Part,
    mode: &Mode,
    primary: &CanonLine,
    secondary: &CanonLine,
    second_leader: Option<&[u8]>,
) -> Vec<CanonVoice> {
    let second = match second_leader {
        Some(notes) if !notes.is_empty() => {
            Part::from_notes(notes.iter().map(|&n| clamp_to_playable(n as i32)).collect())
        }
        _ => {
            let n = mode.degree_count() as i32;
            let mirrored = diatonic_invert(&leader.notes, leader.notes[0], mode);
            leader.with_notes(diatonic_transpose(&mirrored, -n, mode))
        }
    };
    vec![
        voice(CanonRole::Leader, "Leader 1", leader.clone()),
        voice(
            CanonRole::Follower,
            "Follower 1",
            diatonic_imitation(leader, mode, primary.interval, primary.delay),
        ),
        voice(CanonRole::Leader, "Leader 2", second.clone()),
        voice(
            CanonRole::Follower,
            "Follower 2",
            diatonic_imitation(&second, mode, secondary.interval, secondary.delay),
        ),
    ]
}

fn per_tonos(
    leader: &Part,
    steps: &[TonalStep],
    delay: u32,
    key_targets: &mut Vec<String>,
) -> Vec<CanonVoice> {
    let default_steps = [TonalStep::Key(KeyTarget::Dominant)];
    let steps = if steps.is_empty() {
        warn!("per-tonos canon without steps, modulating to the dominant");
        &default_steps[..]
    } else {
        steps
    };
    let mut out = vec![leader_voice(leader)];
    for (i, step) in steps.iter().enumerate() {
        let n = i + 1;
        key_targets.push(step.label());
        out.push(follower(
            n,
            chromatic_imitation(leader, step.semitones(), delay * n as u32),
        ));
    }
    out
}

/// Entry offsets for a stretto: each gap is `tighten` beats shorter than
/// the previous one, but never below one beat.
pub fn stretto_offsets(voices: usize, delay: u32, tighten: u32) -> Vec<u32> {
    let mut offsets = Vec::with_capacity(voices);
    let mut at = 0u32;
    offsets.push(at);
    for k in 1..voices {
        let gap = delay
            .saturating_sub(tighten.saturating_mul(k as u32 - 1))
            .max(1);
        at += gap;
        offsets.push(at);
    }
    offsets
}

fn stretto(
    leader: &Part,
    mode: &Mode,
    voices: usize,
    interval: i32,
    delay: u32,
    tighten: u32,
) -> Vec<CanonVoice> {
    let offsets = stretto_offsets(voices, delay, tighten);
    let mut out = vec![leader_voice(leader)];
    for (i, &offset) in offsets.iter().enumerate().skip(1) {
        // Odd entries answer at the interval, even ones restate at the unison.
        let at = if i % 2 == 1 { interval } else { 0 };
        out.push(follower(i, diatonic_imitation(leader, mode, at, offset)));
    }
    out
}

/// Alternating tonic and dominant in long notes an octave below the
/// leader, ending on the tonic and lasting exactly `beats`.
fn accompaniment_bass(leader: &Part, mode: &Mode, beats: f64) -> Part {
    let low = leader.notes.iter().copied().min().unwrap_or(60) as i32;
    let tonic_pc = mode.tonic() as i32;
    let tonic = low - (low - tonic_pc).rem_euclid(12) - 12;
    let dominant = if mode.contains(tonic + 7) {
        tonic + 7
    } else {
        tonic
    };

    let count = ((beats / BASS_NOTE_BEATS).ceil() as usize).max(1);
    let mut notes = Vec::with_capacity(count);
    let mut durations = Vec::with_capacity(count);
    for i in 0..count {
        let last = i + 1 == count;
        let pitch = if last || i % 2 == 0 { tonic } else { dominant };
        notes.push(clamp_to_playable(pitch));
        let remaining = beats - BASS_NOTE_BEATS * i as f64;
        durations.push(if last { remaining.max(1.0) } else { BASS_NOTE_BEATS });
    }
    Part::with_durations(notes, durations)
}

fn loose(leader: &Part, mode: &Mode, interval: i32, delay: u32, adherence: u8, seed: u64) -> Part {
    let adherence = if adherence > 100 {
        warn!(adherence, "loose canon adherence above 100%, clamping");
        100
    } else {
        adherence
    };
    let mut rng = SeededRng::new(seed);
    let steps = interval_to_steps(interval, mode);

    // Exactly round(n * adherence%) notes, chosen at random, stay strict.
    let count = leader.notes.len();
    let keep = (count * adherence as usize + 50) / 100;
    let mut order: Vec<usize> = (0..count).collect();
    rng.shuffle(&mut order);
    let mut strict_at = vec![false; count];
    for &i in &order[..keep] {
        strict_at[i] = true;
    }

    let notes = leader
        .notes
        .iter()
        .zip(strict_at)
        .map(|(&n, is_strict)| {
            let strict = mode.position_of(n as i32) + steps;
            let position = if is_strict {
                strict
            } else {
                let sign = if rng.random_bool(0.5) { 1 } else { -1 };
                strict + sign * rng.range_i32_inclusive(1, 2)
            };
            clamp_to_playable(mode.pitch_at(position))
        })
        .collect();
    leader.with_notes(notes).delayed(delay)
}

fn per_mutative(leader: &Part, permutations: u8, seed: u64) -> Vec<CanonVoice> {
    let mut rng = SeededRng::new(seed);
    let wanted = permutations as usize;
    let mut found: Vec<Vec<u8>> = Vec::with_capacity(wanted);
    let mut attempts = 0;
    while found.len() < wanted && attempts < wanted * PERMUTATION_ATTEMPTS {
        attempts += 1;
        let mut notes = leader.notes.clone();
        rng.shuffle(&mut notes);
        if notes != leader.notes && !found.contains(&notes) {
            found.push(notes);
        }
    }
    if found.len() < wanted {
        debug!(wanted, found = found.len(), "leader allows fewer distinct permutations");
    }

    let mut out = vec![leader_voice(leader)];
    for (i, notes) in found.into_iter().enumerate() {
        out.push(voice(
            CanonRole::Candidate,
            format!("Permutation {}", i + 1),
            leader.with_notes(notes),
        ));
    }
    out
}
