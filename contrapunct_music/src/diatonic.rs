// Diatonic transform utilities: snapping, adaptation and degree arithmetic.
//
// These are the building blocks every generator leans on:
// - `build_scale_degrees` lays out one octave of the mode,
// - `nearest_pitch_class_in_set` / `snap_to_mode` pull stray pitches into
//   the scale,
// - `adapt_theme_to_mode` makes a whole theme diatonic and squeezes it into
//   the mode's octave span,
// - `find_nearest_degree`, `modal_transpose`, `diatonic_transpose` and
//   `diatonic_invert` do arithmetic in scale degrees instead of semitones.
//
// Octave-span window: the anchor is the highest tonic-class pitch at or
// below the melody's lowest note, and the window runs from the anchor up
// `octave_span` octaves. Compression moves any note above the window down
// by whole octaves, which keeps its pitch class (and so its degree) intact
// and never disturbs the lowest note, so adapting twice changes nothing.

use crate::mode::Mode;
use crate::pitch::{bounded_interval, circular_distance, clamp_to_playable, fold_into_range, pitch_class};

/// One octave of the mode as pitches above the tonic's lowest octave:
/// n degrees plus the octave (8 entries for heptatonic modes). The pitch
/// class of a degree is its entry modulo 12.
pub fn build_scale_degrees(mode: &Mode) -> Vec<u8> {
    let tonic = mode.tonic();
    let mut degrees: Vec<u8> = mode.offsets().iter().map(|&o| tonic + o).collect();
    degrees.push(tonic + 12);
    degrees
}

/// The member of `set` closest to `pitch` around the pitch-class circle.
/// Ties go to the earliest candidate in `set`. `None` for an empty set.
pub fn nearest_pitch_class_in_set(pitch: u8, set: &[u8]) -> Option<u8> {
    let pc = pitch % 12;
    let mut best: Option<(u8, u8)> = None;
    for &candidate in set {
        let candidate = candidate % 12;
        let d = circular_distance(pc, candidate);
        if best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((candidate, d));
        }
    }
    best.map(|(c, _)| c)
}

/// Move a pitch the shortest way to the nearest in-mode pitch.
pub fn snap_to_mode(pitch: u8, mode: &Mode) -> u8 {
    let (_, snapped) = mode.nearest_degree(pitch as i32);
    fold_into_range(snapped, 0, 127)
}

/// Every note belongs to the mode.
pub fn is_diatonic(melody: &[u8], mode: &Mode) -> bool {
    melody.iter().all(|&n| mode.contains(n as i32))
}

/// The octave-span window (anchor, top) for a melody, or `None` if empty.
pub fn octave_window(melody: &[u8], mode: &Mode) -> Option<(i32, i32)> {
    let low = *melody.iter().min()? as i32;
    let anchor = low - pitch_class(low - mode.tonic() as i32) as i32;
    Some((anchor, anchor + 12 * mode.octave_span() as i32))
}

/// The melody fits inside its octave-span window.
pub fn fits_octave_span(melody: &[u8], mode: &Mode) -> bool {
    match octave_window(melody, mode) {
        Some((_, top)) => melody.iter().all(|&n| (n as i32) <= top),
        None => true,
    }
}

/// Shift notes above the octave-span window down by octaves until they fit.
///
/// When the window starts below MIDI 0 (themes whose lowest note is under
/// the first tonic) a note can have nowhere to go below the top. The window
/// is then lifted an octave and every note is folded into it from both
/// sides.
pub fn compress_to_octave_span(melody: &[u8], mode: &Mode) -> Vec<u8> {
    let Some((anchor, top)) = octave_window(melody, mode) else {
        return Vec::new();
    };
    let fold_down = |n: u8| {
        let p = n as i32;
        if p > top { p - 12 * ((p - top + 11) / 12) } else { p }
    };
    if melody.iter().all(|&n| fold_down(n) >= 0) {
        return melody.iter().map(|&n| fold_down(n) as u8).collect();
    }
    let low = anchor + 12;
    let high = (top + 12).min(127);
    melody
        .iter()
        .map(|&n| fold_into_range(n as i32, low as u8, high as u8))
        .collect()
}

/// Snap every note into the mode, then compress into the octave span.
pub fn adapt_theme_to_mode(theme: &[u8], mode: &Mode) -> Vec<u8> {
    let snapped: Vec<u8> = theme.iter().map(|&n| snap_to_mode(n, mode)).collect();
    compress_to_octave_span(&snapped, mode)
}

/// Degree index (0-based) nearest to a pitch.
pub fn find_nearest_degree(pitch: u8, mode: &Mode) -> usize {
    mode.nearest_degree(pitch as i32).0
}

/// Absolute modal position of the degree nearest to a pitch.
pub fn modal_position(pitch: u8, mode: &Mode) -> i32 {
    mode.position_of(pitch as i32)
}

/// The pitch at an absolute modal position, folded into MIDI range.
pub fn pitch_at_position(position: i32, mode: &Mode) -> u8 {
    fold_into_range(mode.pitch_at(position), 0, 127)
}

/// Move a pitch by `steps` scale degrees, clamped into the playable range.
pub fn modal_transpose(pitch: u8, steps: i32, mode: &Mode) -> u8 {
    clamp_to_playable(mode.step_pitch(pitch as i32, steps))
}

/// How many scale degrees a semitone interval spans in this mode, measured
/// upward (or downward) from the tonic. +7 in a heptatonic major mode is 4
/// degrees; +12 is always one full octave of degrees.
pub fn interval_to_steps(interval: i32, mode: &Mode) -> i32 {
    let tonic = 60 + mode.tonic() as i32;
    mode.position_of(tonic + bounded_interval(interval)) - mode.position_of(tonic)
}

/// Diatonic transposition of a whole melody by scale degrees.
pub fn diatonic_transpose(notes: &[u8], steps: i32, mode: &Mode) -> Vec<u8> {
    notes.iter().map(|&n| modal_transpose(n, steps, mode)).collect()
}

/// Diatonic mirror around an axis pitch: each note lands as many degrees
/// below the axis as it was above it.
pub fn diatonic_invert(notes: &[u8], axis: u8, mode: &Mode) -> Vec<u8> {
    let axis_pos = mode.position_of(axis as i32);
    notes
        .iter()
        .map(|&n| {
            let pos = mode.position_of(n as i32);
            clamp_to_playable(mode.pitch_at(2 * axis_pos - pos))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use contrapunct_prng::SeededRng;

    fn c_major() -> Mode {
        Mode::major(0)
    }

    #[test]
    fn test_build_scale_degrees() {
        assert_eq!(build_scale_degrees(&c_major()), vec![0, 2, 4, 5, 7, 9, 11, 12]);
        let d_dorian = Mode::new("Dorian", vec![2, 1, 2, 2, 2, 1, 2], 2, 1).unwrap();
        let pcs: Vec<u8> = build_scale_degrees(&d_dorian).iter().map(|d| d % 12).collect();
        assert_eq!(pcs, vec![2, 4, 5, 7, 9, 11, 0, 2]);
    }

    #[test]
    fn test_nearest_pitch_class_ties_go_to_first_candidate() {
        let set = c_major().pitch_classes();
        assert_eq!(nearest_pitch_class_in_set(61, &set), Some(0));
        assert_eq!(nearest_pitch_class_in_set(66, &set), Some(5));
        assert_eq!(nearest_pitch_class_in_set(64, &set), Some(4));
        // Order of the set decides ties, not numeric value.
        assert_eq!(nearest_pitch_class_in_set(1, &[2, 0]), Some(2));
        assert_eq!(nearest_pitch_class_in_set(1, &[]), None);
    }

    #[test]
    fn test_snap_agrees_with_set_lookup() {
        for tonic in 0..12 {
            let mode = Mode::new("Phrygian", vec![1, 2, 2, 2, 1, 2, 2], tonic, 1).unwrap();
            let set = mode.pitch_classes();
            for p in 24..100u8 {
                let snapped = snap_to_mode(p, &mode);
                assert_eq!(Some(snapped % 12), nearest_pitch_class_in_set(p, &set));
                assert!(snapped.abs_diff(p) <= 6);
            }
        }
    }

    #[test]
    fn test_adapted_theme_is_diatonic_and_contained() {
        let mut rng = SeededRng::new(31);
        let modes = [
            c_major().with_octave_span(1),
            Mode::minor(9).with_octave_span(2),
            Mode::new("Hirajoshi", vec![2, 1, 4, 1, 4], 4, 1).unwrap(),
            Mode::new("Whole Tone", vec![2, 2, 2, 2, 2, 2], 1, 1).unwrap(),
        ];
        for _ in 0..200 {
            let len = rng.range_usize(1, 16);
            let theme: Vec<u8> = (0..len).map(|_| rng.range_usize(36, 96) as u8).collect();
            for mode in &modes {
                let adapted = adapt_theme_to_mode(&theme, mode);
                assert_eq!(adapted.len(), theme.len());
                assert!(is_diatonic(&adapted, mode), "{adapted:?} not in {}", mode.display_name());
                assert!(fits_octave_span(&adapted, mode), "{adapted:?} exceeds span");
                assert_eq!(adapt_theme_to_mode(&adapted, mode), adapted);
            }
        }
    }

    #[test]
    fn test_compression_only_moves_octaves() {
        let mode = c_major().with_octave_span(1);
        let theme = [60, 64, 79, 91, 67];
        let compressed = compress_to_octave_span(&theme, &mode);
        assert_eq!(compressed, vec![60, 64, 67, 67, 67]);
        for (a, b) in theme.iter().zip(&compressed) {
            assert_eq!((*a as i32 - *b as i32).rem_euclid(12), 0);
        }
    }

    #[test]
    fn test_compression_near_midi_zero_lifts_the_window() {
        let f_major = Mode::major(5).with_octave_span(1);
        let adapted = adapt_theme_to_mode(&[2, 34], &f_major);
        assert_eq!(adapted, vec![14, 10]);
        assert!(fits_octave_span(&adapted, &f_major));

        let mut rng = SeededRng::new(7);
        for tonic in 0..12 {
            for span in 1..=2 {
                let mode = Mode::major(tonic).with_octave_span(span);
                for _ in 0..20 {
                    let len = rng.range_usize(1, 8);
                    let theme: Vec<u8> = (0..len)
                        .map(|i| {
                            let high = if i == 0 { 21 } else { 60 };
                            rng.range_usize(0, high) as u8
                        })
                        .collect();
                    let adapted = adapt_theme_to_mode(&theme, &mode);
                    assert!(is_diatonic(&adapted, &mode), "{theme:?} -> {adapted:?}");
                    assert!(fits_octave_span(&adapted, &mode), "{theme:?} -> {adapted:?}");
                    assert_eq!(adapt_theme_to_mode(&adapted, &mode), adapted);
                }
            }
        }
    }

    #[test]
    fn test_leader_already_in_mode_is_untouched() {
        let leader = [60, 62, 64, 65, 67, 65, 64, 62, 60];
        assert_eq!(adapt_theme_to_mode(&leader, &c_major()), leader.to_vec());
    }

    #[test]
    fn test_interval_to_steps() {
        let mode = c_major();
        assert_eq!(interval_to_steps(7, &mode), 4);
        assert_eq!(interval_to_steps(-7, &mode), -4);
        assert_eq!(interval_to_steps(12, &mode), 7);
        assert_eq!(interval_to_steps(-12, &mode), -7);
        assert_eq!(interval_to_steps(0, &mode), 0);
        let pent = Mode::new("Major Pentatonic", vec![2, 2, 3, 2, 3], 0, 1).unwrap();
        assert_eq!(interval_to_steps(12, &pent), 5);
    }

    #[test]
    fn test_diatonic_transpose_and_invert() {
        let mode = c_major();
        assert_eq!(diatonic_transpose(&[60, 62, 64], 2, &mode), vec![64, 65, 67]);
        assert_eq!(find_nearest_degree(65, &mode), 3);
        assert_eq!(modal_position(67, &mode), 39);
        assert_eq!(pitch_at_position(modal_position(67, &mode) + 7, &mode), 79);
        let inverted = diatonic_invert(&[60, 62, 64, 65], 60, &mode);
        assert_eq!(inverted, vec![60, 59, 57, 55]);
        assert_eq!(diatonic_invert(&inverted, 60, &mode), vec![60, 62, 64, 65]);
    }
}
