// Fugue entries: tonal answers built by stepping through scale degrees.
//
// Each entry restates the subject starting on a transposed pitch. The
// subject is first made diatonic (if it is not already diatonic and inside
// the mode's octave span), then reduced to its sequence of degree steps.
// Leaps of a fourth become fifths and leaps of a fifth become fourths (the
// tonal-answer adjustment), and the line is rebuilt from the new start
// pitch one degree step at a time. The adjustment is applied to every entry,
// the opening one included.
//
// Entry intervals are limited to unison, fifth and octave in either
// direction. Any other request for a later entry is an error. The first
// entry is forced to unison instead, and the result says so through
// `FugueEntries::first_entry_corrected`.

use crate::diatonic::{adapt_theme_to_mode, compress_to_octave_span, fits_octave_span, is_diatonic};
use crate::error::{MusicError, Result};
use crate::mode::Mode;
use crate::part::Part;
use crate::pitch::clamp_to_playable;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::{debug, warn};

/// Semitone intervals an entry may be transposed by.
pub const ALLOWED_ENTRY_INTERVALS: [i8; 5] = [0, 7, -7, 12, -12];

/// One manual entry: transposition interval and delay in beats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySpec {
    pub interval: i8,
    #[serde(default)]
    pub delay: u32,
}

/// Every entry as a part, plus whether the first entry's interval had to
/// be corrected.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FugueEntries {
    pub parts: Vec<Part>,
    pub first_entry_corrected: bool,
}

/// Check an entry interval. Returns the interval to use and whether it was
/// corrected (only possible for entry 0).
pub fn validate_entry_interval(index: usize, interval: i8) -> Result<(i8, bool)> {
    if ALLOWED_ENTRY_INTERVALS.contains(&interval) {
        return Ok((interval, false));
    }
    if index == 0 {
        warn!(interval, "first entry interval not allowed, using unison");
        return Ok((0, true));
    }
    Err(MusicError::InvalidEntryInterval { index, interval })
}

/// Degree steps between successive notes.
pub fn diatonic_steps(melody: &[u8], mode: &Mode) -> Vec<i32> {
    melody
        .windows(2)
        .map(|w| mode.position_of(w[1] as i32) - mode.position_of(w[0] as i32))
        .collect()
}

/// Swap fourths (3 degrees) and fifths (4 degrees), keeping direction.
pub fn compensate_fourths_fifths(steps: &[i32]) -> Vec<i32> {
    steps
        .iter()
        .map(|&s| match s.abs() {
            3 => 4 * s.signum(),
            4 => 3 * s.signum(),
            _ => s,
        })
        .collect()
}

/// Build the melody of one entry. The interval is used as given; callers
/// validate it first.
pub fn build_entry_notes(subject: &[u8], mode: &Mode, interval: i8) -> Vec<u8> {
    if subject.is_empty() {
        return Vec::new();
    }
    let subject: Cow<'_, [u8]> = if is_diatonic(subject, mode) && fits_octave_span(subject, mode) {
        Cow::Borrowed(subject)
    } else {
        Cow::Owned(adapt_theme_to_mode(subject, mode))
    };
    let first = subject[0];

    let steps = compensate_fourths_fifths(&diatonic_steps(&subject, mode));
    let (_, start) = mode.nearest_degree(first as i32 + interval as i32);
    let mut position = mode.position_of(clamp_to_playable(start) as i32);

    let mut notes = Vec::with_capacity(subject.len());
    notes.push(clamp_to_playable(mode.pitch_at(position)));
    for step in steps {
        position += step;
        notes.push(clamp_to_playable(mode.pitch_at(position)));
    }

    if fits_octave_span(&notes, mode) {
        notes
    } else {
        compress_to_octave_span(&notes, mode)
    }
}

/// Build one entry as a part delayed by `delay` beats.
pub fn build_entry(subject: &[u8], mode: &Mode, interval: i8, delay: u32) -> Part {
    Part::from_notes(build_entry_notes(subject, mode, interval)).delayed(delay)
}

/// Build every entry in order. Later entries with a disallowed interval
/// fail the whole call.
pub fn build_entries(subject: &[u8], mode: &Mode, entries: &[EntrySpec]) -> Result<FugueEntries> {
    let mut result = FugueEntries::default();
    if subject.is_empty() {
        return Ok(result);
    }
    let mut checked = Vec::with_capacity(entries.len());
    for (index, spec) in entries.iter().enumerate() {
        let (interval, corrected) = validate_entry_interval(index, spec.interval)?;
        result.first_entry_corrected |= corrected;
        checked.push((interval, spec.delay));
    }
    result.parts = checked
        .into_iter()
        .map(|(interval, delay)| build_entry(subject, mode, interval, delay))
        .collect();
    debug!(entries = result.parts.len(), mode = %mode.display_name(), "built fugue entries");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c_major() -> Mode {
        Mode::major(0)
    }

    #[test]
    fn test_compensation_swaps_only_fourths_and_fifths() {
        let steps = vec![0, 1, -1, 2, -2, 3, -3, 4, -4, 5, -5, 7];
        assert_eq!(
            compensate_fourths_fifths(&steps),
            vec![0, 1, -1, 2, -2, 4, -4, 3, -3, 5, -5, 7]
        );
    }

    #[test]
    fn test_entry_validation() {
        assert!(matches!(
            validate_entry_interval(1, 5),
            Err(MusicError::InvalidEntryInterval { index: 1, interval: 5 })
        ));
        assert_eq!(validate_entry_interval(0, 5).unwrap(), (0, true));
        for &i in &ALLOWED_ENTRY_INTERVALS {
            assert_eq!(validate_entry_interval(3, i).unwrap(), (i, false));
        }
    }

    #[test]
    fn test_build_entries_flags_first_correction() {
        let subject = [60, 62, 64, 65, 67];
        let specs = [
            EntrySpec { interval: 5, delay: 0 },
            EntrySpec { interval: 7, delay: 5 },
        ];
        let entries = build_entries(&subject, &c_major(), &specs).unwrap();
        assert!(entries.first_entry_corrected);
        assert_eq!(entries.parts[0].notes, subject.to_vec());
        assert_eq!(entries.parts[1].notes, vec![67, 69, 71, 72, 74]);
        assert_eq!(entries.parts[1].leading_rests(), 5);

        let bad = [EntrySpec { interval: 0, delay: 0 }, EntrySpec { interval: 5, delay: 4 }];
        assert!(build_entries(&subject, &c_major(), &bad).is_err());
    }

    #[test]
    fn test_answer_compensates_leaps() {
        // Up a fourth, then down four degrees (F to B).
        let subject = [60, 65, 59];
        let answer = build_entry_notes(&subject, &c_major(), 7);
        // Steps +3, -4 become +4, -3 from G.
        assert_eq!(answer, vec![67, 74, 69]);
    }

    #[test]
    fn test_chromatic_subject_is_adapted_first() {
        let subject = [60, 61, 63, 66];
        let entry = build_entry_notes(&subject, &c_major(), 0);
        assert!(is_diatonic(&entry, &c_major()));
        assert_eq!(entry.len(), subject.len());
    }

    #[test]
    fn test_entries_stay_in_mode_and_span() {
        let mode = Mode::new("Dorian", vec![2, 1, 2, 2, 2, 1, 2], 2, 2).unwrap();
        let subject = [62, 69, 67, 65, 64, 62, 74, 72];
        for interval in ALLOWED_ENTRY_INTERVALS {
            let entry = build_entry_notes(&subject, &mode, interval);
            assert!(is_diatonic(&entry, &mode));
            assert!(fits_octave_span(&entry, &mode));
        }
    }

    #[test]
    fn test_empty_subject_builds_nothing() {
        let specs = [EntrySpec { interval: 0, delay: 0 }];
        let entries = build_entries(&[], &c_major(), &specs).unwrap();
        assert!(entries.parts.is_empty());
        assert!(!entries.first_entry_corrected);
    }
}
