// Contrapunct: symbolic modal counterpoint.
//
// Pitches are MIDI note numbers (0-127, 60 = middle C) and modes are step
// patterns over a tonic pitch class. Given a theme, the engine derives
// imitations, validated fugue entries, canons of twenty-one kinds and whole
// fugues in nine architectures, always keeping voices inside the mode and
// the playable range.
//
// Architecture:
// - pitch.rs: Pitch-class arithmetic, octave folding, note names
// - mode.rs: Validated modes, degree lookup and modal positions
// - catalog.rs: Named modes grouped by tradition, loaded from embedded JSON
// - part.rs: Voices as notes plus a rest/onset rhythm and optional durations
// - diatonic.rs: Snapping, octave-span compression, diatonic transposition
//   and inversion
// - imitation.rs: Chromatic and diatonic imitation of a cantus
// - fugue_entry.rs: Entry-interval validation and answer construction
// - canon.rs: Canon generation for every canon type
// - transform.rs: Subject transformations, run as a scoped pipeline
// - fugue.rs: Fugue builder (architectures, sections, stretto, flattening)
// - stability.rs: Degree stability and stability-biased themes
// - config.rs: Engine and job configuration
// - job.rs: Runs a JSON job end to end
// - error.rs: Crate error type
//
// Randomized features draw from `contrapunct_prng::SeededRng`, so every
// result is reproducible from its seed.

pub mod canon;
pub mod catalog;
pub mod config;
pub mod diatonic;
pub mod error;
pub mod fugue;
pub mod fugue_entry;
pub mod imitation;
pub mod job;
pub mod mode;
pub mod part;
pub mod pitch;
pub mod stability;
pub mod transform;

pub use error::{MusicError, Result};
pub use mode::Mode;
pub use part::Part;
