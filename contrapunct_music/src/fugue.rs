// Fugue builder: multi-voice sections assembled from one subject.
//
// From the subject the builder derives four kinds of material:
// - subject: the theme itself, made diatonic if needed,
// - answer: the tonal answer at the entry interval (fugue_entry.rs),
// - countersubject: the subject's diatonic mirror, a third lower,
// - free material: the subject backwards, a third higher.
// Voice i sings its material `i / 2` octaves below the top voice, so voices
// pair off into subject/answer registers the way a keyboard fugue does.
//
// An `Architecture` decides how the material is laid out in sections. The
// standard layout is exposition, development (subject against
// countersubject), episode (a sequenced head motif), an optional stretto and
// a tonic-chord coda. The other architectures replace or extend the middle
// of that plan.
//
// Entry timing follows the stretto density d in [0, 1]: entry k overlaps the
// previous one when floor(k * d) > floor((k - 1) * d). Overlapping entries
// come `entry_spacing` beats after the previous entry; the others wait until
// the previous statement has finished.
//
// After layout, the transformation pipeline (transform.rs) runs over every
// section voice whose role is in scope. `flatten_fugue` then joins the
// sections into one part per voice, padding each section to a whole number
// of beats so the voices stay aligned.

use crate::diatonic::{adapt_theme_to_mode, diatonic_invert, diatonic_transpose, fits_octave_span, is_diatonic};
use crate::error::{MusicError, Result};
use crate::fugue_entry::{build_entry_notes, validate_entry_interval};
use crate::mode::Mode;
use crate::part::{Event, Part};
use crate::pitch::clamp_to_playable;
use crate::transform::{TransformKind, TransformScope, Transformation, apply_pipeline};
use contrapunct_prng::SeededRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Length of the final chord in beats.
const CODA_BEATS: f64 = 4.0;

/// Chord member per voice, as heptatonic degree offsets from the tonic:
/// root, fifth, third, octave, root.
const CODA_DEGREES: [i32; 5] = [0, 4, 2, 7, 0];

/// Notes of the head motif used in episodes.
const EPISODE_HEAD: usize = 4;

/// Cap on the merged subject of a recursive fugue level.
const MAX_RECURSIVE_SUBJECT: usize = 32;

const ROTATION: [VoiceRole; 4] = [
    VoiceRole::Subject,
    VoiceRole::Answer,
    VoiceRole::Countersubject,
    VoiceRole::Free,
];

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Number of fugue voices, two to five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VoiceCount {
    Two,
    Three,
    Four,
    Five,
}

impl VoiceCount {
    pub fn get(self) -> usize {
        match self {
            VoiceCount::Two => 2,
            VoiceCount::Three => 3,
            VoiceCount::Four => 4,
            VoiceCount::Five => 5,
        }
    }
}

impl TryFrom<u8> for VoiceCount {
    type Error = MusicError;

    fn try_from(n: u8) -> Result<Self> {
        match n {
            2 => Ok(VoiceCount::Two),
            3 => Ok(VoiceCount::Three),
            4 => Ok(VoiceCount::Four),
            5 => Ok(VoiceCount::Five),
            _ => Err(MusicError::InvalidVoiceCount(n)),
        }
    }
}

impl From<VoiceCount> for u8 {
    fn from(v: VoiceCount) -> u8 {
        v.get() as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Architecture {
    Standard {
        voices: VoiceCount,
    },
    /// One more voice per section; nobody drops out.
    Additive {
        voices: VoiceCount,
    },
    /// Full exposition, then one voice fewer per section.
    Subtractive {
        voices: VoiceCount,
    },
    /// Roles rotate among the voices once per cycle.
    Rotational {
        voices: VoiceCount,
        #[serde(default = "default_cycles")]
        cycles: u8,
    },
    /// Each pair is a subject and its mirror, entering together.
    Mirror {
        pairs: u8,
    },
    /// Subject and answer handed from voice to voice one note at a time.
    Hocketed {
        voices: VoiceCount,
    },
    /// One voice per meter; each states the subject at its own speed.
    Polyrhythmic {
        meters: Vec<u8>,
    },
    /// Each level's exposition, merged in onset order, is the next level's
    /// subject.
    Recursive {
        voices: VoiceCount,
        depth: u8,
    },
    /// Complexity in [0, 1] turns on stretto, countersubject and extra
    /// transformations.
    Adaptive {
        voices: VoiceCount,
        complexity: f64,
    },
}

fn default_cycles() -> u8 {
    1
}

impl Architecture {
    pub fn kind(&self) -> &'static str {
        match self {
            Architecture::Standard { .. } => "standard",
            Architecture::Additive { .. } => "additive",
            Architecture::Subtractive { .. } => "subtractive",
            Architecture::Rotational { .. } => "rotational",
            Architecture::Mirror { .. } => "mirror",
            Architecture::Hocketed { .. } => "hocketed",
            Architecture::Polyrhythmic { .. } => "polyrhythmic",
            Architecture::Recursive { .. } => "recursive",
            Architecture::Adaptive { .. } => "adaptive",
        }
    }

    pub fn voice_count(&self) -> usize {
        match self {
            Architecture::Standard { voices }
            | Architecture::Additive { voices }
            | Architecture::Subtractive { voices }
            | Architecture::Rotational { voices, .. }
            | Architecture::Hocketed { voices }
            | Architecture::Recursive { voices, .. }
            | Architecture::Adaptive { voices, .. } => voices.get(),
            Architecture::Mirror { pairs } => 2 * (*pairs).clamp(1, 2) as usize,
            Architecture::Polyrhythmic { meters } => meters.len().clamp(2, 5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FugueParams {
    pub architecture: Architecture,
    pub subject: Vec<u8>,
    /// Semitone interval of the answer: 0, ±7 or ±12.
    #[serde(default = "default_entry_interval")]
    pub entry_interval: i8,
    /// Beats between overlapping entries.
    #[serde(default = "default_entry_spacing")]
    pub entry_spacing: u32,
    #[serde(default)]
    pub countersubject: bool,
    #[serde(default)]
    pub stretto_density: f64,
    #[serde(default)]
    pub transformations: Vec<Transformation>,
    #[serde(default)]
    pub seed: u64,
}

fn default_entry_interval() -> i8 {
    7
}

fn default_entry_spacing() -> u32 {
    2
}

impl FugueParams {
    pub fn new(architecture: Architecture, subject: Vec<u8>) -> Self {
        FugueParams {
            architecture,
            subject,
            entry_interval: default_entry_interval(),
            entry_spacing: default_entry_spacing(),
            countersubject: false,
            stretto_density: 0.0,
            transformations: Vec::new(),
            seed: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceRole {
    Subject,
    Answer,
    Countersubject,
    Free,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionVoice {
    /// Voice index, 0 = top.
    pub voice: usize,
    pub role: VoiceRole,
    pub part: Part,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FugueSection {
    pub name: String,
    pub voices: Vec<SectionVoice>,
}

impl FugueSection {
    fn new(name: impl Into<String>, voices: Vec<SectionVoice>) -> Self {
        FugueSection {
            name: name.into(),
            voices,
        }
    }

    /// Length of the longest voice in beats.
    pub fn length_beats(&self) -> f64 {
        self.voices
            .iter()
            .map(|v| v.part.length_beats())
            .fold(0.0, f64::max)
    }

    pub fn voice(&self, index: usize) -> Option<&SectionVoice> {
        self.voices.iter().find(|v| v.voice == index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FugueMetadata {
    pub architecture: &'static str,
    pub mode: String,
    pub voice_count: usize,
    pub entry_interval: i8,
    /// Exposition entry points in beats.
    pub entry_offsets: Vec<u32>,
    /// Indices of exposition entries that overlap their predecessor.
    pub stretto_entries: Vec<usize>,
    /// The subject had to be adapted to the mode.
    pub subject_adapted: bool,
    /// Names of the transformations applied, in pipeline order.
    pub transformations: Vec<&'static str>,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FugueResult {
    pub sections: Vec<FugueSection>,
    pub metadata: FugueMetadata,
}

// ---------------------------------------------------------------------------
// Entry timing
// ---------------------------------------------------------------------------

/// Entry offsets and overlapping entry indices for `entries` statements of
/// a subject lasting `subject_beats`.
pub fn stretto_entry_offsets(
    entries: usize,
    subject_beats: u32,
    spacing: u32,
    density: f64,
) -> (Vec<u32>, Vec<usize>) {
    let density = if density.is_finite() {
        density.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut offsets = Vec::with_capacity(entries);
    let mut overlapping = Vec::new();
    let mut at = 0;
    for k in 0..entries {
        if k > 0 {
            let overlaps = (k as f64 * density).floor() > ((k - 1) as f64 * density).floor();
            if overlaps {
                overlapping.push(k);
                at += spacing;
            } else {
                at += subject_beats;
            }
        }
        offsets.push(at);
    }
    (offsets, overlapping)
}

fn entry_role(k: usize) -> VoiceRole {
    if k % 2 == 0 {
        VoiceRole::Subject
    } else {
        VoiceRole::Answer
    }
}

/// Octave-shift a line into voice `voice`'s register.
fn register(notes: &[u8], voice: usize) -> Vec<u8> {
    let shift = -12 * (voice / 2) as i32;
    notes
        .iter()
        .map(|&n| clamp_to_playable(n as i32 + shift))
        .collect()
}

// ---------------------------------------------------------------------------
// Material and layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Materials {
    subject: Vec<u8>,
    answer: Vec<u8>,
    countersubject: Vec<u8>,
    free: Vec<u8>,
}

impl Materials {
    /// `subject` must be non-empty, diatonic and inside the octave span.
    fn new(subject: Vec<u8>, mode: &Mode, interval: i8) -> Self {
        let answer = build_entry_notes(&subject, mode, interval);
        let mirrored = diatonic_invert(&subject, subject[0], mode);
        let countersubject = diatonic_transpose(&mirrored, -2, mode);
        let mut backwards = subject.clone();
        backwards.reverse();
        let free = diatonic_transpose(&backwards, 2, mode);
        Materials {
            subject,
            answer,
            countersubject,
            free,
        }
    }

    fn notes(&self, role: VoiceRole) -> &[u8] {
        match role {
            VoiceRole::Subject => &self.subject,
            VoiceRole::Answer => &self.answer,
            VoiceRole::Countersubject => &self.countersubject,
            VoiceRole::Free => &self.free,
        }
    }

    fn statement(&self, role: VoiceRole, voice: usize) -> Part {
        Part::from_notes(register(self.notes(role), voice))
    }

    fn beats(&self) -> u32 {
        self.subject.len() as u32
    }
}

#[derive(Debug, Clone)]
struct Layout<'a> {
    mode: &'a Mode,
    materials: Materials,
    voices: usize,
    spacing: u32,
    density: f64,
    countersubject: bool,
}

impl Layout<'_> {
    fn partner_role(&self) -> VoiceRole {
        if self.countersubject {
            VoiceRole::Countersubject
        } else {
            VoiceRole::Free
        }
    }

    fn voice(&self, voice: usize, role: VoiceRole, delay: u32) -> SectionVoice {
        SectionVoice {
            voice,
            role,
            part: self.materials.statement(role, voice).delayed(delay),
        }
    }

    fn entry_offsets(&self) -> (Vec<u32>, Vec<usize>) {
        stretto_entry_offsets(self.voices, self.materials.beats(), self.spacing, self.density)
    }

    fn exposition(&self, name: &str) -> FugueSection {
        let (offsets, _) = self.entry_offsets();
        let voices = offsets
            .iter()
            .enumerate()
            .map(|(k, &at)| self.voice(k, entry_role(k), at))
            .collect();
        FugueSection::new(name, voices)
    }

    /// Subject statements paired with countersubject (or free) lines.
    fn development(&self) -> FugueSection {
        let voices = (0..self.voices)
            .map(|i| {
                let role = if i % 2 == 0 {
                    VoiceRole::Subject
                } else {
                    self.partner_role()
                };
                self.voice(i, role, 0)
            })
            .collect();
        FugueSection::new("Development", voices)
    }

    /// The head motif sequenced down by step, answered a third lower.
    fn episode(&self) -> FugueSection {
        let head: Vec<u8> = self.materials.subject.iter().take(EPISODE_HEAD).copied().collect();
        let mut line = head.clone();
        for r in 1..=2 {
            line.extend(diatonic_transpose(&head, -r, self.mode));
        }
        let mut voices = vec![SectionVoice {
            voice: 0,
            role: VoiceRole::Free,
            part: Part::from_notes(register(&line, 0)),
        }];
        if self.voices > 1 {
            let lower = diatonic_transpose(&line, -2, self.mode);
            voices.push(SectionVoice {
                voice: 1,
                role: VoiceRole::Free,
                part: Part::from_notes(register(&lower, 1)).delayed(1),
            });
        }
        FugueSection::new("Episode", voices)
    }

    /// Every voice enters in close succession.
    fn stretto(&self) -> FugueSection {
        let gap = (self.spacing / 2).max(1);
        let voices = (0..self.voices)
            .map(|k| self.voice(k, entry_role(k), gap * k as u32))
            .collect();
        FugueSection::new("Stretto", voices)
    }

    /// A held tonic chord for the listed voices.
    fn coda(&self, voices: impl Iterator<Item = usize>) -> FugueSection {
        let first = self.materials.subject[0] as i32;
        let tonic = first - (first - self.mode.tonic() as i32).rem_euclid(12);
        let base = self.mode.position_of(tonic);
        let n = self.mode.degree_count() as i32;
        let voices = voices
            .map(|i| {
                let degree = CODA_DEGREES[i % CODA_DEGREES.len()] * n / 7;
                let pitch = self.mode.pitch_at(base + degree) - 12 * (i / 2) as i32;
                SectionVoice {
                    voice: i,
                    role: VoiceRole::Free,
                    part: Part::with_durations(vec![clamp_to_playable(pitch)], vec![CODA_BEATS]),
                }
            })
            .collect();
        FugueSection::new("Coda", voices)
    }

    fn standard(&self) -> Vec<FugueSection> {
        let mut sections = vec![self.exposition("Exposition"), self.development(), self.episode()];
        if self.density > 0.0 {
            sections.push(self.stretto());
        }
        sections.push(self.coda(0..self.voices));
        sections
    }

    fn additive(&self) -> Vec<FugueSection> {
        let mut sections: Vec<FugueSection> = (0..self.voices)
            .map(|j| {
                let voices = (0..=j)
                    .map(|i| {
                        let role = if i == j { entry_role(j) } else { self.partner_role() };
                        self.voice(i, role, 0)
                    })
                    .collect();
                FugueSection::new(format!("Entry {}", j + 1), voices)
            })
            .collect();
        sections.push(self.coda(0..self.voices));
        sections
    }

    fn subtractive(&self) -> Vec<FugueSection> {
        let mut sections = vec![self.exposition("Exposition")];
        for remaining in (1..self.voices).rev() {
            let voices = (0..remaining)
                .map(|i| {
                    let role = if i == 0 { VoiceRole::Subject } else { self.partner_role() };
                    self.voice(i, role, 0)
                })
                .collect();
            sections.push(FugueSection::new(
                format!("Reduction {}", self.voices - remaining),
                voices,
            ));
        }
        sections.push(self.coda(0..1));
        sections
    }

    fn rotational(&self, cycles: u8) -> Vec<FugueSection> {
        let mut sections = vec![self.exposition("Exposition")];
        for c in 0..cycles.max(1) as usize {
            let voices = (0..self.voices)
                .map(|i| self.voice(i, ROTATION[(i + c + 1) % ROTATION.len()], 0))
                .collect();
            sections.push(FugueSection::new(format!("Rotation {}", c + 1), voices));
        }
        sections.push(self.coda(0..self.voices));
        sections
    }

    fn mirror(&self) -> Vec<FugueSection> {
        let subject = &self.materials.subject;
        let inverted = diatonic_invert(subject, subject[0], self.mode);
        let mut voices = Vec::with_capacity(self.voices);
        for pair in 0..self.voices / 2 {
            let delay = pair as u32 * self.spacing.max(1);
            let top = 2 * pair;
            voices.push(self.voice(top, VoiceRole::Subject, delay));
            voices.push(SectionVoice {
                voice: top + 1,
                role: VoiceRole::Answer,
                part: Part::from_notes(register(&inverted, top + 1)).delayed(delay),
            });
        }
        vec![
            FugueSection::new("Mirror Exposition", voices),
            self.development(),
            self.coda(0..self.voices),
        ]
    }

    /// Subject then answer, one note per voice in turn.
    fn hocket(&self) -> FugueSection {
        let line: Vec<u8> = self
            .materials
            .subject
            .iter()
            .chain(&self.materials.answer)
            .copied()
            .collect();
        let voices = (0..self.voices)
            .map(|v| {
                let events: Vec<Event> = line
                    .iter()
                    .enumerate()
                    .map(|(j, &note)| {
                        if j % self.voices == v {
                            Event::note(register(&[note], v)[0], 1.0)
                        } else {
                            Event::Rest
                        }
                    })
                    .collect();
                SectionVoice {
                    voice: v,
                    role: entry_role(v),
                    part: Part::from_events(&events),
                }
            })
            .collect();
        FugueSection::new("Hocket", voices)
    }

    fn polyrhythm(&self, meters: &[u8]) -> FugueSection {
        let base = meters[0] as f64;
        let voices = meters
            .iter()
            .enumerate()
            .map(|(i, &meter)| {
                let role = entry_role(i);
                SectionVoice {
                    voice: i,
                    role,
                    part: self.materials.statement(role, i).scaled(base / meter as f64),
                }
            })
            .collect();
        FugueSection::new("Polyrhythm", voices)
    }

    /// One exposition per level, then a coda.
    fn recursive(&self, depth: u8, interval: i8) -> Vec<FugueSection> {
        let mut sections = Vec::new();
        let mut level = self.clone();
        for l in 1..=depth.clamp(1, 3) {
            let exposition = level.exposition(&format!("Level {l}"));
            let merged = merge_onsets(&exposition);
            sections.push(exposition);
            let next = adapt_theme_to_mode(&merged, self.mode);
            level = Layout {
                materials: Materials::new(next, self.mode, interval),
                ..level
            };
        }
        sections.push(self.coda(0..self.voices));
        sections
    }
}

/// Every note of a section in onset order (ties in voice order), capped.
fn merge_onsets(section: &FugueSection) -> Vec<u8> {
    let mut onsets: Vec<(f64, u8)> = section
        .voices
        .iter()
        .flat_map(|v| v.part.onset_times())
        .collect();
    onsets.sort_by(|a, b| a.0.total_cmp(&b.0));
    onsets
        .into_iter()
        .map(|(_, pitch)| pitch)
        .take(MAX_RECURSIVE_SUBJECT)
        .collect()
}

fn polyrhythm_meters(meters: &[u8]) -> Vec<u8> {
    let mut usable: Vec<u8> = meters.iter().map(|&m| m.max(1)).take(5).collect();
    if usable.len() < 2 {
        warn!(given = meters.len(), "polyrhythmic fugue needs two meters, using 3 against 4");
        usable = vec![3, 4];
    }
    usable
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Build a fugue. Fails only when the answer interval is not allowed.
pub fn build_fugue(params: &FugueParams, mode: &Mode) -> Result<FugueResult> {
    let (interval, _) = validate_entry_interval(1, params.entry_interval)?;

    let mut density = params.stretto_density;
    let mut countersubject = params.countersubject;
    let mut transformations = params.transformations.clone();
    if let Architecture::Adaptive { complexity, .. } = &params.architecture {
        let c = *complexity;
        let c = if c.is_finite() {
            c.clamp(0.0, 1.0)
        } else {
            0.0
        };
        density = density.max(c);
        countersubject |= c >= 0.5;
        if c >= 0.25 {
            transformations.push(Transformation::new(
                TransformKind::Ornamentation { density: c / 2.0 },
                TransformScope::Subject,
            ));
        }
        if c >= 0.75 {
            transformations.push(Transformation::new(
                TransformKind::Inversion,
                TransformScope::Answer,
            ));
        }
    }

    let voices = params.architecture.voice_count();
    let subject_adapted =
        !(is_diatonic(&params.subject, mode) && fits_octave_span(&params.subject, mode));
    let mut metadata = FugueMetadata {
        architecture: params.architecture.kind(),
        mode: mode.display_name(),
        voice_count: voices,
        entry_interval: interval,
        entry_offsets: Vec::new(),
        stretto_entries: Vec::new(),
        subject_adapted,
        transformations: transformations.iter().map(|t| t.kind.name()).collect(),
        seed: params.seed,
    };
    if params.subject.is_empty() {
        return Ok(FugueResult {
            sections: Vec::new(),
            metadata,
        });
    }

    let subject = if subject_adapted {
        adapt_theme_to_mode(&params.subject, mode)
    } else {
        params.subject.clone()
    };
    let layout = Layout {
        mode,
        materials: Materials::new(subject, mode, interval),
        voices,
        spacing: params.entry_spacing,
        density,
        countersubject,
    };
    let (offsets, overlapping) = layout.entry_offsets();
    metadata.entry_offsets = offsets;
    metadata.stretto_entries = overlapping;

    let mut sections = match &params.architecture {
        Architecture::Standard { .. } | Architecture::Adaptive { .. } => layout.standard(),
        Architecture::Additive { .. } => layout.additive(),
        Architecture::Subtractive { .. } => layout.subtractive(),
        Architecture::Rotational { cycles, .. } => layout.rotational(*cycles),
        Architecture::Mirror { .. } => layout.mirror(),
        Architecture::Hocketed { .. } => vec![
            layout.exposition("Exposition"),
            layout.hocket(),
            layout.coda(0..voices),
        ],
        Architecture::Polyrhythmic { meters } => vec![
            layout.exposition("Exposition"),
            layout.polyrhythm(&polyrhythm_meters(meters)),
            layout.coda(0..voices),
        ],
        Architecture::Recursive { depth, .. } => layout.recursive(*depth, interval),
    };

    let mut rng = SeededRng::new(params.seed);
    for section in &mut sections {
        for voice in &mut section.voices {
            voice.part = apply_pipeline(&voice.part, voice.role, &transformations, mode, &mut rng);
        }
    }

    debug!(
        architecture = metadata.architecture,
        voices,
        sections = sections.len(),
        mode = %metadata.mode,
        "built fugue"
    );
    Ok(FugueResult { sections, metadata })
}

/// Join the sections into one part per voice. Each section is padded to a
/// whole number of beats; voices silent in a section get rests.
pub fn flatten_fugue(result: &FugueResult) -> Vec<Part> {
    let count = result
        .sections
        .iter()
        .flat_map(|s| s.voices.iter().map(|v| v.voice + 1))
        .max()
        .unwrap_or(0)
        .max(result.metadata.voice_count);
    let mut parts = vec![Part::default(); count];
    for section in &result.sections {
        let beats = section.length_beats().ceil() as u32;
        if beats == 0 {
            continue;
        }
        for (index, part) in parts.iter_mut().enumerate() {
            let piece = match section.voice(index) {
                Some(v) => v.part.padded_to(beats),
                None => Part::rests(beats),
            };
            part.append(&piece);
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c_major() -> Mode {
        Mode::major(0)
    }

    fn subject() -> Vec<u8> {
        vec![60, 62, 64, 65, 67, 65, 64, 62]
    }

    fn params(architecture: Architecture) -> FugueParams {
        FugueParams::new(architecture, subject())
    }

    fn names(result: &FugueResult) -> Vec<&str> {
        result.sections.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_voice_count_bounds() {
        assert!(VoiceCount::try_from(1u8).is_err());
        assert!(VoiceCount::try_from(6u8).is_err());
        assert_eq!(VoiceCount::try_from(4u8).unwrap().get(), 4);
        assert!(serde_json::from_str::<VoiceCount>("6").is_err());
        assert_eq!(serde_json::to_string(&VoiceCount::Three).unwrap(), "3");
    }

    #[test]
    fn test_stretto_rule() {
        let (offsets, overlapping) = stretto_entry_offsets(5, 8, 2, 0.5);
        assert_eq!(offsets, vec![0, 8, 10, 18, 20]);
        assert_eq!(overlapping, vec![2, 4]);
        assert_eq!(stretto_entry_offsets(3, 8, 2, 0.0).0, vec![0, 8, 16]);
        assert_eq!(stretto_entry_offsets(3, 8, 2, 1.0).0, vec![0, 2, 4]);
    }

    #[test]
    fn test_invalid_answer_interval_is_rejected() {
        let mut p = params(Architecture::Standard {
            voices: VoiceCount::Two,
        });
        p.entry_interval = 5;
        assert!(matches!(
            build_fugue(&p, &c_major()),
            Err(MusicError::InvalidEntryInterval { index: 1, interval: 5 })
        ));
    }

    #[test]
    fn test_standard_fugue_layout() {
        let p = params(Architecture::Standard {
            voices: VoiceCount::Three,
        });
        let result = build_fugue(&p, &c_major()).unwrap();
        assert_eq!(names(&result), vec!["Exposition", "Development", "Episode", "Coda"]);
        let expo = &result.sections[0];
        assert_eq!(expo.voices[0].part.notes, subject());
        assert_eq!(expo.voices[1].role, VoiceRole::Answer);
        assert_eq!(expo.voices[1].part.notes[0], 67);
        assert_eq!(expo.voices[1].part.leading_rests(), 8);
        assert_eq!(expo.voices[2].part.notes[0], 48);
        assert_eq!(result.metadata.entry_offsets, vec![0, 8, 16]);
        let coda: Vec<u8> = result.sections[3].voices.iter().map(|v| v.part.notes[0]).collect();
        assert_eq!(coda, vec![60, 67, 52]);
    }

    #[test]
    fn test_stretto_section_and_countersubject() {
        let mut p = params(Architecture::Standard {
            voices: VoiceCount::Four,
        });
        p.stretto_density = 1.0;
        p.countersubject = true;
        let result = build_fugue(&p, &c_major()).unwrap();
        assert!(names(&result).contains(&"Stretto"));
        assert_eq!(result.metadata.stretto_entries, vec![1, 2, 3]);
        let dev = &result.sections[1];
        assert_eq!(dev.voices[1].role, VoiceRole::Countersubject);
        // Mirror of the subject around C, a third lower.
        assert_eq!(&dev.voices[1].part.notes[..3], &[57, 55, 53]);
    }

    #[test]
    fn test_additive_and_subtractive() {
        let result = build_fugue(
            &params(Architecture::Additive {
                voices: VoiceCount::Four,
            }),
            &c_major(),
        )
        .unwrap();
        let counts: Vec<usize> = result.sections.iter().map(|s| s.voices.len()).collect();
        assert_eq!(counts, vec![1, 2, 3, 4, 4]);

        let result = build_fugue(
            &params(Architecture::Subtractive {
                voices: VoiceCount::Four,
            }),
            &c_major(),
        )
        .unwrap();
        let counts: Vec<usize> = result.sections.iter().map(|s| s.voices.len()).collect();
        assert_eq!(counts, vec![4, 3, 2, 1, 1]);
    }

    #[test]
    fn test_rotational_cycles_roles() {
        let result = build_fugue(
            &params(Architecture::Rotational {
                voices: VoiceCount::Four,
                cycles: 2,
            }),
            &c_major(),
        )
        .unwrap();
        assert_eq!(names(&result), vec!["Exposition", "Rotation 1", "Rotation 2", "Coda"]);
        let roles: Vec<VoiceRole> = result.sections[1].voices.iter().map(|v| v.role).collect();
        assert_eq!(
            roles,
            vec![
                VoiceRole::Answer,
                VoiceRole::Countersubject,
                VoiceRole::Free,
                VoiceRole::Subject
            ]
        );
    }

    #[test]
    fn test_mirror_pairs() {
        let result = build_fugue(&params(Architecture::Mirror { pairs: 2 }), &c_major()).unwrap();
        assert_eq!(result.metadata.voice_count, 4);
        let expo = &result.sections[0];
        assert_eq!(expo.voices[1].part.notes, vec![60, 59, 57, 55, 53, 55, 57, 59]);
        assert_eq!(expo.voices[2].part.leading_rests(), 2);
        assert_eq!(expo.voices[3].part.notes[0], 48);
    }

    #[test]
    fn test_hocket_hands_off_every_note() {
        let result = build_fugue(
            &params(Architecture::Hocketed {
                voices: VoiceCount::Three,
            }),
            &c_major(),
        )
        .unwrap();
        let hocket = &result.sections[1];
        let onsets: usize = hocket.voices.iter().map(|v| v.part.onset_count()).sum();
        assert_eq!(onsets, 16);
        for v in &hocket.voices {
            assert_eq!(v.part.rhythm.len(), 16);
        }
    }

    #[test]
    fn test_polyrhythmic_meters() {
        let result = build_fugue(&params(Architecture::Polyrhythmic { meters: vec![3, 4] }), &c_major())
            .unwrap();
        let poly = &result.sections[1];
        assert_eq!(poly.voices[0].part.length_beats(), 8.0);
        assert_eq!(poly.voices[1].part.length_beats(), 6.0);
        assert_eq!(result.metadata.voice_count, 2);
    }

    #[test]
    fn test_recursive_levels_grow() {
        let result = build_fugue(
            &params(Architecture::Recursive {
                voices: VoiceCount::Two,
                depth: 2,
            }),
            &c_major(),
        )
        .unwrap();
        assert_eq!(names(&result), vec!["Level 1", "Level 2", "Coda"]);
        assert_eq!(result.sections[1].voices[0].part.notes.len(), 16);
    }

    #[test]
    fn test_adaptive_complexity() {
        let result = build_fugue(
            &params(Architecture::Adaptive {
                voices: VoiceCount::Three,
                complexity: 1.0,
            }),
            &c_major(),
        )
        .unwrap();
        assert!(names(&result).contains(&"Stretto"));
        assert_eq!(result.sections[1].voices[1].role, VoiceRole::Countersubject);
        assert_eq!(result.metadata.transformations, vec!["ornamentation", "inversion"]);

        let calm = build_fugue(
            &params(Architecture::Adaptive {
                voices: VoiceCount::Three,
                complexity: 0.0,
            }),
            &c_major(),
        )
        .unwrap();
        assert!(!names(&calm).contains(&"Stretto"));
        assert!(calm.metadata.transformations.is_empty());
    }

    #[test]
    fn test_transformations_follow_scope() {
        let mut p = params(Architecture::Standard {
            voices: VoiceCount::Two,
        });
        p.transformations = vec![Transformation::new(
            TransformKind::Retrograde,
            TransformScope::Subject,
        )];
        let result = build_fugue(&p, &c_major()).unwrap();
        let expo = &result.sections[0];
        let mut reversed = subject();
        reversed.reverse();
        assert_eq!(expo.voices[0].part.notes, reversed);
        assert_eq!(expo.voices[1].part.notes[0], 67);
        assert_eq!(expo.voices[1].part.leading_rests(), 8);
    }

    #[test]
    fn test_ornamented_fugue_is_reproducible() {
        let mut p = params(Architecture::Standard {
            voices: VoiceCount::Three,
        });
        p.transformations = vec![Transformation::texture(TransformKind::Ornamentation {
            density: 0.5,
        })];
        p.seed = 77;
        assert_eq!(build_fugue(&p, &c_major()).unwrap(), build_fugue(&p, &c_major()).unwrap());
    }

    #[test]
    fn test_flatten_aligns_voices() {
        let mut p = params(Architecture::Subtractive {
            voices: VoiceCount::Three,
        });
        p.transformations = vec![Transformation::new(
            TransformKind::Diminution { factor: 3.0 },
            TransformScope::Answer,
        )];
        let result = build_fugue(&p, &c_major()).unwrap();
        let parts = flatten_fugue(&result);
        assert_eq!(parts.len(), 3);
        let total: f64 = result.sections.iter().map(|s| s.length_beats().ceil()).sum();
        for part in &parts {
            assert!((part.length_beats() - total).abs() < 1e-9);
        }
    }

    #[test]
    fn test_chromatic_subject_is_adapted() {
        let mut p = params(Architecture::Standard {
            voices: VoiceCount::Two,
        });
        p.subject = vec![60, 61, 63, 66];
        let result = build_fugue(&p, &c_major()).unwrap();
        assert!(result.metadata.subject_adapted);
        assert!(is_diatonic(&result.sections[0].voices[0].part.notes, &c_major()));
    }

    #[test]
    fn test_empty_subject() {
        let mut p = params(Architecture::Standard {
            voices: VoiceCount::Two,
        });
        p.subject.clear();
        let result = build_fugue(&p, &c_major()).unwrap();
        assert!(result.sections.is_empty());
        let parts = flatten_fugue(&result);
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(Part::is_empty));
    }

    #[test]
    fn test_params_from_json() {
        let p: FugueParams = serde_json::from_str(
            r#"{"architecture":{"type":"rotational","voices":3},"subject":[62,65,64]}"#,
        )
        .unwrap();
        assert_eq!(p.entry_interval, 7);
        assert_eq!(
            p.architecture,
            Architecture::Rotational {
                voices: VoiceCount::Three,
                cycles: 1
            }
        );
        let bad = serde_json::from_str::<FugueParams>(
            r#"{"architecture":{"type":"standard","voices":7},"subject":[60]}"#,
        );
        assert!(bad.is_err());
    }
}
