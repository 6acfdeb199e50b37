// Error type for the contrapunct engine.
//
// Only conditions the caller has to act on are errors. Empty themes produce
// empty results and out-of-range notes are octave-shifted back into the
// playable range, so neither shows up here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MusicError {
    /// A fugue entry after the first asked for an interval other than
    /// unison, fifth or octave.
    #[error("entry {index} requests interval {interval}; allowed intervals are 0, ±7 and ±12")]
    InvalidEntryInterval { index: usize, interval: i8 },
    /// A step pattern that does not describe one octave.
    #[error("mode '{name}' has a degenerate step pattern (sums to {sum}, expected 12 with no zero steps)")]
    DegenerateMode { name: String, sum: u32 },
    #[error("a fugue needs 2 to 5 voices, got {0}")]
    InvalidVoiceCount(u8),
    #[error("unknown mode: {0}")]
    UnknownMode(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MusicError>;
