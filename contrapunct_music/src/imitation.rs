// Imitation: one voice restating another at an interval, after a delay.
//
// Chromatic imitation moves every note by the same number of semitones, so
// the melodic intervals survive exactly. Diatonic imitation moves every note
// by the same number of scale degrees, so the line stays in the mode and
// its intervals adjust (a major third may become a minor one).
//
// In both cases the delay is a run of leading rests in front of the
// original rhythm; the melody's internal timing is never touched. Results
// are octave-folded into the playable range.

use crate::diatonic::{diatonic_transpose, interval_to_steps};
use crate::mode::Mode;
use crate::part::Part;
use crate::pitch::{clamp_to_playable, transpose_raw};

/// Transpose a part by `interval` semitones and delay its entry.
pub fn chromatic_imitation(cantus: &Part, interval: i32, delay: u32) -> Part {
    let notes = transpose_raw(&cantus.notes, interval)
        .into_iter()
        .map(clamp_to_playable)
        .collect();
    cantus.with_notes(notes).delayed(delay)
}

/// Transpose a part by the number of scale degrees that `interval`
/// semitones spans in `mode`, and delay its entry.
pub fn diatonic_imitation(cantus: &Part, mode: &Mode, interval: i32, delay: u32) -> Part {
    let steps = interval_to_steps(interval, mode);
    let notes = diatonic_transpose(&cantus.notes, steps, mode);
    cantus.with_notes(notes).delayed(delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::RhythmMark;
    use crate::pitch::{PLAYABLE_HIGH, PLAYABLE_LOW};

    fn leader() -> Part {
        Part::from_notes(vec![60, 62, 64, 65, 67, 65, 64, 62, 60])
    }

    #[test]
    fn test_chromatic_preserves_intervals() {
        for k in [-12, -7, -1, 0, 3, 7, 12] {
            let follower = chromatic_imitation(&leader(), k, 0);
            for (f, c) in follower.notes.iter().zip(&leader().notes) {
                assert_eq!(*f as i32 - *c as i32, k);
            }
        }
    }

    #[test]
    fn test_chromatic_clamps_by_octaves() {
        let cantus = Part::from_notes(vec![24, 100, 105]);
        let follower = chromatic_imitation(&cantus, 10, 0);
        assert_eq!(follower.notes, vec![34, 98, 103]);
        let follower = chromatic_imitation(&cantus, -10, 0);
        for (f, c) in follower.notes.iter().zip(&cantus.notes) {
            assert!((PLAYABLE_LOW..=PLAYABLE_HIGH).contains(f));
            assert_eq!((*f as i32 - *c as i32 + 10).rem_euclid(12), 0);
        }
    }

    #[test]
    fn test_delay_only_adds_leading_rests() {
        let follower = chromatic_imitation(&leader(), 7, 3);
        assert_eq!(&follower.rhythm[..3], &[RhythmMark::Rest; 3]);
        assert_eq!(follower.rhythm[3..], leader().rhythm[..]);
        assert_eq!(follower.onset_count(), 9);
    }

    #[test]
    fn test_diatonic_imitation_stays_in_mode() {
        let mode = Mode::major(0);
        let follower = diatonic_imitation(&leader(), &mode, 7, 4);
        assert_eq!(follower.notes, vec![67, 69, 71, 72, 74, 72, 71, 69, 67]);
        assert_eq!(follower.leading_rests(), 4);

        // A major third up is two degrees: D moves to F, not F#.
        let third = diatonic_imitation(&Part::from_notes(vec![60, 62, 64]), &mode, 4, 0);
        assert_eq!(third.notes, vec![64, 65, 67]);
    }

    #[test]
    fn test_empty_cantus() {
        let follower = chromatic_imitation(&Part::default(), 7, 2);
        assert!(follower.is_empty());
        assert_eq!(follower.leading_rests(), 2);
    }
}
