// Pitch and interval primitives.
//
// Pitches are MIDI note numbers (0-127); pitch classes are 0-11 with C = 0.
// Intermediate arithmetic runs in `i32` so transpositions and inversions can
// overshoot freely before being folded back into range by octave shifts.
// Nothing in the engine re-pitches a note within its octave to make it fit.
// Range problems are always solved by moving whole octaves.

use tracing::trace;

/// Lowest note of the playable instrument range (A0).
pub const PLAYABLE_LOW: u8 = 21;
/// Highest note of the playable instrument range (C8).
pub const PLAYABLE_HIGH: u8 = 108;

/// Pitch class (0-11) of any integer pitch, including negative ones.
pub fn pitch_class(pitch: i32) -> u8 {
    pitch.rem_euclid(12) as u8
}

/// Shortest distance around the pitch-class circle (0-6).
pub fn circular_distance(a: u8, b: u8) -> u8 {
    let d = (a as i32 - b as i32).rem_euclid(12) as u8;
    d.min(12 - d)
}

/// Signed shortest move from pitch class `from` to pitch class `to`, in
/// -6..=5. A tritone resolves downward.
pub fn signed_pc_delta(from: u8, to: u8) -> i32 {
    (to as i32 - from as i32 + 6).rem_euclid(12) - 6
}

/// Fold a pitch into `[low, high]` by whole octaves.
///
/// The range must span at least an octave for every pitch class to have a
/// home inside it.
pub fn fold_into_range(pitch: i32, low: u8, high: u8) -> u8 {
    debug_assert!(high >= low + 11, "range must span an octave");
    let (low, high) = (low as i32, high as i32);
    let mut p = pitch;
    let pc = p.rem_euclid(12);
    if p < low {
        p = low + (pc - low.rem_euclid(12)).rem_euclid(12);
    }
    if p > high {
        p = high - (high.rem_euclid(12) - pc).rem_euclid(12);
    }
    if p != pitch {
        trace!(from = pitch, to = p, "octave-shifted note into range");
    }
    p as u8
}

/// Fold a pitch into the playable range [21, 108].
pub fn clamp_to_playable(pitch: i32) -> u8 {
    fold_into_range(pitch, PLAYABLE_LOW, PLAYABLE_HIGH)
}

/// Widest interval kept as given, in octaves. Anything wider lands outside
/// the MIDI range either way and folds to the same pitch.
pub const MAX_INTERVAL_OCTAVES: i32 = 11;

/// An interval with the same pitch class, capped at eleven octaves.
pub fn bounded_interval(interval: i32) -> i32 {
    let octaves = interval
        .div_euclid(12)
        .clamp(-MAX_INTERVAL_OCTAVES, MAX_INTERVAL_OCTAVES);
    octaves * 12 + interval.rem_euclid(12)
}

/// Transpose every note by a fixed number of semitones, unclamped. Intervals
/// wider than the MIDI range are capped first.
pub fn transpose_raw(notes: &[u8], interval: i32) -> Vec<i32> {
    let interval = bounded_interval(interval);
    notes.iter().map(|&n| n as i32 + interval).collect()
}

/// Note name for a pitch class, spelled with sharps except for Eb and Bb.
pub fn pc_name(pc: u8) -> &'static str {
    const NAMES: [&str; 12] = [
        "C", "C#", "D", "Eb", "E", "F", "F#", "G", "G#", "A", "Bb", "B",
    ];
    NAMES[(pc % 12) as usize]
}

/// Compact note name with octave, e.g. "C4" for 60 and "F#3" for 54.
pub fn pitch_name(pitch: u8) -> String {
    let octave = pitch as i32 / 12 - 1;
    format!("{}{}", pc_name(pitch % 12), octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_class_handles_negatives() {
        assert_eq!(pitch_class(60), 0);
        assert_eq!(pitch_class(-1), 11);
        assert_eq!(pitch_class(-12), 0);
    }

    #[test]
    fn test_circular_distance() {
        assert_eq!(circular_distance(0, 11), 1);
        assert_eq!(circular_distance(11, 0), 1);
        assert_eq!(circular_distance(0, 6), 6);
        assert_eq!(circular_distance(2, 9), 5);
    }

    #[test]
    fn test_signed_pc_delta() {
        assert_eq!(signed_pc_delta(11, 0), 1);
        assert_eq!(signed_pc_delta(0, 11), -1);
        assert_eq!(signed_pc_delta(0, 6), -6);
        assert_eq!(signed_pc_delta(1, 2), 1);
    }

    #[test]
    fn test_clamp_shifts_by_octaves_only() {
        assert_eq!(clamp_to_playable(60), 60);
        assert_eq!(clamp_to_playable(115), 103);
        assert_eq!(clamp_to_playable(10), 22);
        assert_eq!(clamp_to_playable(-3), 21);
        for p in -40..170 {
            let c = clamp_to_playable(p);
            assert!((PLAYABLE_LOW..=PLAYABLE_HIGH).contains(&c));
            assert_eq!((c as i32 - p).rem_euclid(12), 0);
        }
    }

    #[test]
    fn test_extreme_pitches_fold_in_one_step() {
        assert_eq!(clamp_to_playable(i32::MAX), fold_into_range(i32::MAX % 12 + 96, 21, 108));
        assert_eq!(clamp_to_playable(i32::MIN), 28);
        assert_eq!(fold_into_range(-1, 0, 127), 11);
        assert_eq!(fold_into_range(140, 0, 127), 116);
    }

    #[test]
    fn test_bounded_interval_keeps_pitch_class() {
        assert_eq!(bounded_interval(7), 7);
        assert_eq!(bounded_interval(-5), -5);
        assert_eq!(bounded_interval(-130), -130);
        for interval in [i32::MAX, i32::MIN, 1_000_000_007, -999_999_999] {
            let b = bounded_interval(interval);
            assert_eq!((b - interval).rem_euclid(12), 0);
            assert!(b.abs() < 12 * 12);
        }
        let notes = transpose_raw(&[60, 62], i32::MAX);
        assert_eq!(notes.len(), 2);
        assert_eq!(clamp_to_playable(notes[0]), clamp_to_playable(60 + 12 * 20 + 7));
    }

    #[test]
    fn test_pitch_names() {
        assert_eq!(pitch_name(60), "C4");
        assert_eq!(pitch_name(54), "F#3");
        assert_eq!(pitch_name(21), "A0");
        assert_eq!(pc_name(10), "Bb");
    }
}
