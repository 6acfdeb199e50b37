// Thematic transformations applied to fugue voices.
//
// A `Transformation` pairs one of twelve operations with a scope saying
// which voices it touches (every voice, subject statements only, or answer
// statements only). A fugue applies its list in order as a pipeline, each
// step consuming the previous step's output.
//
// Every operation works on a part's body (the events after its leading
// rests) and puts the same number of leading rests back in front, so a
// voice's entry point never moves. Retrograde also leaves trailing rests at
// the end. Pitch results are octave-folded into the
// playable range. Ornamentation is the only operation that draws random
// numbers; it uses the fugue's seeded generator.

use crate::fugue::VoiceRole;
use crate::mode::Mode;
use crate::part::{Event, Part, reverse_sounding};
use crate::pitch::{bounded_interval, clamp_to_playable};
use contrapunct_prng::SeededRng;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which voices a transformation applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformScope {
    /// Every voice in every section.
    #[default]
    Texture,
    Subject,
    Answer,
}

impl TransformScope {
    pub fn applies_to(self, role: VoiceRole) -> bool {
        match self {
            TransformScope::Texture => true,
            TransformScope::Subject => role == VoiceRole::Subject,
            TransformScope::Answer => role == VoiceRole::Answer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformKind {
    /// Diatonic mirror around the first note.
    Inversion,
    Retrograde,
    /// Durations multiplied by `factor`.
    Augmentation { factor: f64 },
    /// Durations divided by `factor`.
    Diminution { factor: f64 },
    /// Keep the leading `keep` fraction of the notes (at least one).
    Truncation { keep: f64 },
    /// Drop the last `notes` notes (at least one note survives).
    Elision { notes: usize },
    /// Repeat the head motif of `size` notes to the original note count.
    Fragmentation { size: usize },
    /// Follow the material with `repetitions` copies, each `step` scale
    /// degrees beyond the previous one.
    Sequence { repetitions: u8, step: i32 },
    /// Split notes into a note and its upper neighbour with probability
    /// `density`.
    Ornamentation { density: f64 },
    Transposition { semitones: i32 },
    /// Move every note to the same degree of another mode.
    ModeShift { target: Mode },
    /// Fill whole-tone steps with a chromatic passing note.
    ChromaticPassing,
}

impl TransformKind {
    pub fn name(&self) -> &'static str {
        match self {
            TransformKind::Inversion => "inversion",
            TransformKind::Retrograde => "retrograde",
            TransformKind::Augmentation { .. } => "augmentation",
            TransformKind::Diminution { .. } => "diminution",
            TransformKind::Truncation { .. } => "truncation",
            TransformKind::Elision { .. } => "elision",
            TransformKind::Fragmentation { .. } => "fragmentation",
            TransformKind::Sequence { .. } => "sequence",
            TransformKind::Ornamentation { .. } => "ornamentation",
            TransformKind::Transposition { .. } => "transposition",
            TransformKind::ModeShift { .. } => "mode_shift",
            TransformKind::ChromaticPassing => "chromatic_passing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    pub kind: TransformKind,
    #[serde(default)]
    pub scope: TransformScope,
}

impl Transformation {
    pub fn new(kind: TransformKind, scope: TransformScope) -> Self {
        Transformation { kind, scope }
    }

    /// Applies to every voice.
    pub fn texture(kind: TransformKind) -> Self {
        Self::new(kind, TransformScope::Texture)
    }
}

/// Run every transformation whose scope matches `role`, in order.
pub fn apply_pipeline(
    part: &Part,
    role: VoiceRole,
    transformations: &[Transformation],
    mode: &Mode,
    rng: &mut SeededRng,
) -> Part {
    transformations
        .iter()
        .filter(|t| t.scope.applies_to(role))
        .fold(part.clone(), |acc, t| apply_transformation(&acc, &t.kind, mode, rng))
}

/// Apply one transformation to a part's body, keeping its entry delay.
pub fn apply_transformation(part: &Part, kind: &TransformKind, mode: &Mode, rng: &mut SeededRng) -> Part {
    let body = part.body_events();
    let notes = note_count(&body);
    if notes == 0 {
        return part.clone();
    }

    let out = match kind {
        TransformKind::Inversion => {
            let first = body.iter().find_map(Event::pitch).unwrap_or(60);
            let axis = mode.position_of(first as i32);
            map_pitches(&body, |p| {
                mode.pitch_at(2 * axis - mode.position_of(p as i32))
            })
        }
        TransformKind::Retrograde => {
            let mut out = body.clone();
            reverse_sounding(&mut out);
            out
        }
        TransformKind::Augmentation { factor } => {
            scale_durations(&body, positive_or(*factor, 2.0, "augmentation factor"))
        }
        TransformKind::Diminution { factor } => {
            scale_durations(&body, 1.0 / positive_or(*factor, 2.0, "diminution factor"))
        }
        TransformKind::Truncation { keep } => {
            let keep = if (*keep).is_finite() { (*keep).clamp(0.0, 1.0) } else { 1.0 };
            let count = ((notes as f64 * keep).ceil() as usize).max(1);
            take_notes(&body, count)
        }
        TransformKind::Elision { notes: dropped } => {
            take_notes(&body, notes.saturating_sub(*dropped).max(1))
        }
        TransformKind::Fragmentation { size } => {
            let head = take_notes(&body, (*size).max(1));
            let mut out = Vec::new();
            while note_count(&out) < notes {
                out.extend_from_slice(&head);
            }
            take_notes(&out, notes)
        }
        TransformKind::Sequence { repetitions, step } => {
            let mut out = body.clone();
            for r in 1..=*repetitions as i32 {
                out.extend(map_pitches(&body, |p| mode.step_pitch(p as i32, step.saturating_mul(r))));
            }
            out
        }
        TransformKind::Ornamentation { density } => {
            let density = if density.is_finite() { (*density).clamp(0.0, 1.0) } else { 0.0 };
            let mut out = Vec::with_capacity(body.len());
            for event in &body {
                match *event {
                    Event::Note { pitch, duration } if rng.random_bool(density) => {
                        let upper = clamp_to_playable(mode.step_pitch(pitch as i32, 1));
                        out.push(Event::note(pitch, duration / 2.0));
                        out.push(Event::note(upper, duration / 2.0));
                    }
                    e => out.push(e),
                }
            }
            out
        }
        TransformKind::Transposition { semitones } => {
            let semitones = bounded_interval(*semitones);
            map_pitches(&body, |p| p as i32 + semitones)
        }
        TransformKind::ModeShift { target } => map_pitches(&body, |p| shift_mode(p, mode, target)),
        TransformKind::ChromaticPassing => chromatic_passing(&body),
    };
    part.with_body(&out)
}

fn note_count(events: &[Event]) -> usize {
    events.iter().filter(|e| e.pitch().is_some()).count()
}

/// Events up to and including the `count`-th note.
fn take_notes(events: &[Event], count: usize) -> Vec<Event> {
    let mut out = Vec::new();
    let mut seen = 0;
    for &event in events {
        if seen == count {
            break;
        }
        if event.pitch().is_some() {
            seen += 1;
        }
        out.push(event);
    }
    out
}

fn map_pitches(events: &[Event], f: impl Fn(u8) -> i32) -> Vec<Event> {
    events
        .iter()
        .map(|e| match *e {
            Event::Note { pitch, duration } => Event::note(clamp_to_playable(f(pitch)), duration),
            Event::Rest => Event::Rest,
        })
        .collect()
}

fn scale_durations(events: &[Event], ratio: f64) -> Vec<Event> {
    events
        .iter()
        .map(|e| match *e {
            Event::Note { pitch, duration } => Event::note(pitch, duration * ratio),
            Event::Rest => Event::Rest,
        })
        .collect()
}

fn positive_or(value: f64, fallback: f64, what: &str) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!(value, fallback, "{what} must be positive, using fallback");
        fallback
    }
}

/// Same octave and proportional degree in the target mode.
fn shift_mode(pitch: u8, from: &Mode, to: &Mode) -> i32 {
    let n_from = from.degree_count() as i32;
    let n_to = to.degree_count() as i32;
    let position = from.position_of(pitch as i32);
    let octave = position.div_euclid(n_from);
    let degree = position.rem_euclid(n_from) * n_to / n_from;
    to.pitch_at(octave * n_to + degree)
}

fn chromatic_passing(events: &[Event]) -> Vec<Event> {
    let mut out = Vec::with_capacity(events.len() * 2);
    for (i, &event) in events.iter().enumerate() {
        let next = events.get(i + 1).and_then(Event::pitch);
        match (event, next) {
            (Event::Note { pitch, duration }, Some(to)) if pitch.abs_diff(to) == 2 => {
                let passing = if to > pitch { pitch + 1 } else { pitch - 1 };
                out.push(Event::note(pitch, duration / 2.0));
                out.push(Event::note(passing, duration / 2.0));
            }
            _ => out.push(event),
        }
    }
    out
}
