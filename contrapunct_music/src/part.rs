// Parts: a melody plus the rhythm it is sung in.
//
// A part is a note list and a rhythm mark list. Every `Onset` mark consumes
// the next note; every `Rest` mark is one beat of silence. Entry delays are
// nothing more than a run of leading rests, so a follower that enters four
// beats late has four `Rest` marks in front of an otherwise untouched rhythm.
//
// Durations are optional: `None` means every note lasts one beat. Mensural
// transformations (augmentation, diminution, prolation) fill them in with
// precise per-note values.
//
// For material-level transformations a part is also viewable as a list of
// `Event`s, which keeps notes and their durations together and makes
// reversal, slicing and insertion straightforward.

use serde::{Deserialize, Serialize};

/// One rhythm slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RhythmMark {
    /// One beat of silence.
    Rest,
    /// The next note of the melody begins.
    Onset,
}

/// A melody with its rhythm, ready for rendering or playback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub notes: Vec<u8>,
    pub rhythm: Vec<RhythmMark>,
    /// Length of each note in beats. `None` means one beat per note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durations: Option<Vec<f64>>,
}

/// A note-or-rest view of a part, used by material transformations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Note { pitch: u8, duration: f64 },
    Rest,
}

impl Event {
    pub fn note(pitch: u8, duration: f64) -> Self {
        Event::Note { pitch, duration }
    }

    pub fn pitch(&self) -> Option<u8> {
        match self {
            Event::Note { pitch, .. } => Some(*pitch),
            Event::Rest => None,
        }
    }
}

fn is_unit(d: f64) -> bool {
    (d - 1.0).abs() < 1e-9
}

impl Part {
    /// A part with one beat per note and no rests.
    pub fn from_notes(notes: Vec<u8>) -> Self {
        let rhythm = vec![RhythmMark::Onset; notes.len()];
        Part {
            notes,
            rhythm,
            durations: None,
        }
    }

    /// A part with explicit per-note durations. Falls back to `None` when
    /// every duration is exactly one beat.
    pub fn with_durations(notes: Vec<u8>, durations: Vec<f64>) -> Self {
        debug_assert_eq!(notes.len(), durations.len());
        let mut part = Part::from_notes(notes);
        if !durations.iter().all(|&d| is_unit(d)) {
            part.durations = Some(durations);
        }
        part
    }

    /// Pure silence of the given length.
    pub fn rests(beats: u32) -> Self {
        Part {
            notes: Vec::new(),
            rhythm: vec![RhythmMark::Rest; beats as usize],
            durations: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Number of rest marks before the first onset.
    pub fn leading_rests(&self) -> usize {
        self.rhythm
            .iter()
            .take_while(|&&m| m == RhythmMark::Rest)
            .count()
    }

    pub fn onset_count(&self) -> usize {
        self.rhythm
            .iter()
            .filter(|&&m| m == RhythmMark::Onset)
            .count()
    }

    /// Per-note durations, defaulting to one beat.
    pub fn note_durations(&self) -> Vec<f64> {
        match &self.durations {
            Some(d) => d.clone(),
            None => vec![1.0; self.notes.len()],
        }
    }

    /// Total length in beats: rests plus note durations.
    pub fn length_beats(&self) -> f64 {
        let rests = (self.rhythm.len() - self.onset_count()) as f64;
        rests + self.note_durations().iter().sum::<f64>()
    }

    /// The same part entering `beats` later.
    pub fn delayed(mut self, beats: u32) -> Self {
        if beats > 0 {
            let mut rhythm = vec![RhythmMark::Rest; beats as usize];
            rhythm.append(&mut self.rhythm);
            self.rhythm = rhythm;
        }
        self
    }

    /// Keep this part's rhythm and durations, swap in different pitches.
    pub fn with_notes(&self, notes: Vec<u8>) -> Self {
        debug_assert_eq!(notes.len(), self.notes.len());
        Part {
            notes,
            rhythm: self.rhythm.clone(),
            durations: self.durations.clone(),
        }
    }

    /// Every note duration multiplied by `ratio`; rests are untouched.
    pub fn scaled(&self, ratio: f64) -> Self {
        let events: Vec<Event> = self
            .events()
            .into_iter()
            .map(|e| match e {
                Event::Note { pitch, duration } => Event::note(pitch, duration * ratio),
                Event::Rest => Event::Rest,
            })
            .collect();
        Part::from_events(&events)
    }

    /// All rhythm slots as events, leading rests included.
    pub fn events(&self) -> Vec<Event> {
        let durations = self.note_durations();
        let mut next = 0;
        self.rhythm
            .iter()
            .map(|mark| match mark {
                RhythmMark::Rest => Event::Rest,
                RhythmMark::Onset => {
                    let e = Event::note(self.notes[next], durations[next]);
                    next += 1;
                    e
                }
            })
            .collect()
    }

    /// Events after the leading rests: the material itself.
    pub fn body_events(&self) -> Vec<Event> {
        self.events().split_off(self.leading_rests())
    }

    /// Rebuild a part from events.
    pub fn from_events(events: &[Event]) -> Self {
        let mut notes = Vec::new();
        let mut durations = Vec::new();
        let mut rhythm = Vec::with_capacity(events.len());
        for event in events {
            match *event {
                Event::Note { pitch, duration } => {
                    notes.push(pitch);
                    durations.push(duration);
                    rhythm.push(RhythmMark::Onset);
                }
                Event::Rest => rhythm.push(RhythmMark::Rest),
            }
        }
        let durations = if durations.iter().all(|&d| is_unit(d)) {
            None
        } else {
            Some(durations)
        };
        Part {
            notes,
            rhythm,
            durations,
        }
    }

    /// Replace the material after the leading rests, keeping the entry delay.
    pub fn with_body(&self, body: &[Event]) -> Self {
        Part::from_events(body).delayed(self.leading_rests() as u32)
    }

    /// Time-reverse the material (notes, rhythm and durations together).
    /// The entry delay stays in front and trailing rests stay at the end.
    pub fn retrograde(&self) -> Self {
        let mut body = self.body_events();
        reverse_sounding(&mut body);
        self.with_body(&body)
    }

    /// Append another part after this one.
    pub fn append(&mut self, other: &Part) {
        if self.durations.is_some() || other.durations.is_some() {
            let mut d = self.note_durations();
            d.extend(other.note_durations());
            self.durations = Some(d);
        }
        self.notes.extend_from_slice(&other.notes);
        self.rhythm.extend_from_slice(&other.rhythm);
    }

    /// Pad to exactly `beats` beats.
    ///
    /// A fractional tail (from diminished or prolated durations) is absorbed
    /// by lengthening the last note to the next whole beat; the remainder is
    /// filled with rests. Parts already longer than `beats` are returned as
    /// they are.
    pub fn padded_to(&self, beats: u32) -> Self {
        let mut part = self.clone();
        let length = part.length_beats();
        let whole = length.ceil();
        let gap = whole - length;
        if gap > 1e-9 && !part.notes.is_empty() {
            let mut d = part.note_durations();
            if let Some(last) = d.last_mut() {
                *last += gap;
            }
            part.durations = Some(d);
        }
        let whole = whole as u32;
        if whole < beats {
            part.rhythm
                .extend(std::iter::repeat_n(RhythmMark::Rest, (beats - whole) as usize));
        }
        part
    }

    /// Start time (in beats) of every note.
    pub fn onset_times(&self) -> Vec<(f64, u8)> {
        let mut t = 0.0;
        let mut out = Vec::with_capacity(self.notes.len());
        for event in self.events() {
            match event {
                Event::Rest => t += 1.0,
                Event::Note { pitch, duration } => {
                    out.push((t, pitch));
                    t += duration;
                }
            }
        }
        out
    }
}

/// Reverse the events up to the last note, leaving any trailing rests where
/// they are.
pub fn reverse_sounding(events: &mut [Event]) {
    let tail = events.iter().rev().take_while(|e| e.pitch().is_none()).count();
    let sounding = events.len() - tail;
    events[..sounding].reverse();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_is_leading_rests() {
        let part = Part::from_notes(vec![60, 62, 64]).delayed(4);
        assert_eq!(part.leading_rests(), 4);
        assert_eq!(part.onset_count(), 3);
        assert_eq!(part.rhythm.len(), 7);
        assert_eq!(part.length_beats(), 7.0);
        assert_eq!(part.notes, vec![60, 62, 64]);
    }

    #[test]
    fn test_with_durations_normalizes_unit_lengths() {
        assert_eq!(Part::with_durations(vec![60, 62], vec![1.0, 1.0]).durations, None);
        assert_eq!(
            Part::with_durations(vec![60, 62], vec![2.0, 1.0]).durations,
            Some(vec![2.0, 1.0])
        );
    }

    #[test]
    fn test_retrograde_keeps_delay_in_front() {
        let part = Part::with_durations(vec![60, 62, 64], vec![1.0, 2.0, 0.5]).delayed(2);
        let retro = part.retrograde();
        assert_eq!(retro.leading_rests(), 2);
        assert_eq!(retro.notes, vec![64, 62, 60]);
        assert_eq!(retro.durations, Some(vec![0.5, 2.0, 1.0]));
        assert_eq!(retro.retrograde(), part);
    }

    #[test]
    fn test_retrograde_keeps_trailing_rests_at_the_end() {
        let part = Part {
            notes: vec![60, 62],
            rhythm: vec![
                RhythmMark::Rest,
                RhythmMark::Onset,
                RhythmMark::Rest,
                RhythmMark::Onset,
                RhythmMark::Rest,
                RhythmMark::Rest,
            ],
            durations: None,
        };
        let retro = part.retrograde();
        assert_eq!(retro.leading_rests(), 1);
        assert_eq!(retro.notes, vec![62, 60]);
        assert_eq!(
            retro.rhythm,
            vec![
                RhythmMark::Rest,
                RhythmMark::Onset,
                RhythmMark::Rest,
                RhythmMark::Onset,
                RhythmMark::Rest,
                RhythmMark::Rest,
            ]
        );
        assert_eq!(retro.retrograde(), part);
    }

    #[test]
    fn test_events_round_trip_with_internal_rests() {
        let part = Part {
            notes: vec![60, 67],
            rhythm: vec![
                RhythmMark::Rest,
                RhythmMark::Onset,
                RhythmMark::Rest,
                RhythmMark::Onset,
            ],
            durations: None,
        };
        assert_eq!(Part::from_events(&part.events()), part);
        assert_eq!(part.body_events().len(), 3);
        assert_eq!(part.onset_times(), vec![(1.0, 60), (3.0, 67)]);
    }

    #[test]
    fn test_scaled_multiplies_durations() {
        let part = Part::from_notes(vec![60, 62]).delayed(1);
        let slow = part.scaled(2.0);
        assert_eq!(slow.durations, Some(vec![2.0, 2.0]));
        assert_eq!(slow.rhythm, part.rhythm);
    }

    #[test]
    fn test_padded_to_absorbs_fractional_tail() {
        let part = Part::with_durations(vec![60, 62, 64], vec![0.5, 0.5, 0.5]);
        let padded = part.padded_to(4);
        assert_eq!(padded.length_beats(), 4.0);
        assert_eq!(padded.durations, Some(vec![0.5, 0.5, 1.0]));
        assert_eq!(padded.rhythm.len(), 5);
    }

    #[test]
    fn test_append_merges_durations() {
        let mut a = Part::from_notes(vec![60]);
        a.append(&Part::with_durations(vec![62], vec![2.0]));
        assert_eq!(a.notes, vec![60, 62]);
        assert_eq!(a.durations, Some(vec![1.0, 2.0]));
        assert_eq!(a.length_beats(), 3.0);
    }
}
