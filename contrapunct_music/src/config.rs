// Data-driven engine and job configuration.
//
// `EngineConfig` holds the tunables of the engine itself (catalog limits and
// defaults). `JobConfig` describes one generation run: a tonic, a mode name
// looked up in the catalog, a theme, and any combination of requests (manual
// fugue entries, imitation, a canon, a fugue, a stability-biased theme).
// Every field has a serde default so a job file only names what it needs.
//
// See also: `job.rs` which executes a `JobConfig`, `catalog.rs` which reads
// `CatalogConfig`, and `main.rs` which loads jobs from disk.

use crate::canon::CanonParams;
use crate::error::Result;
use crate::fugue::FugueParams;
use crate::fugue_entry::EntrySpec;
use crate::mode::DEFAULT_OCTAVE_SPAN;
use crate::stability::StabilityParams;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Engine configuration
// ---------------------------------------------------------------------------

/// Limits and defaults for building mode catalogs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Modes loaded past this count are dropped.
    #[serde(default = "default_max_modes")]
    pub max_modes: usize,
    /// Octave span for catalog entries that do not declare one.
    #[serde(default = "default_octave_span")]
    pub default_octave_span: u8,
}

fn default_max_modes() -> usize {
    200
}

fn default_octave_span() -> u8 {
    DEFAULT_OCTAVE_SPAN
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_modes: default_max_modes(),
            default_octave_span: default_octave_span(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,
}

// ---------------------------------------------------------------------------
// Job requests
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImitationStyle {
    /// Exact semitone transposition.
    #[default]
    Chromatic,
    /// Transposition by scale degrees, staying in the mode.
    Diatonic,
}

/// A single imitating voice derived from the job's theme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImitationRequest {
    #[serde(default)]
    pub style: ImitationStyle,
    pub interval: i32,
    #[serde(default)]
    pub delay: u32,
}

/// Generate a theme with a stability bias, or (when `length` is absent)
/// re-weight the job's own theme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StabilityRequest {
    #[serde(flatten)]
    pub params: StabilityParams,
    #[serde(default)]
    pub length: Option<usize>,
    /// First note of a generated theme. Defaults to the tonic near middle C.
    #[serde(default)]
    pub start: Option<u8>,
}

// ---------------------------------------------------------------------------
// Job configuration
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Tonic pitch class, 0 (C) to 11 (B).
    #[serde(default)]
    pub tonic: u8,
    /// Catalog mode name, matched case-insensitively.
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub theme: Vec<u8>,
    /// Overrides the seed of every randomized request in the job.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub entries: Vec<EntrySpec>,
    #[serde(default)]
    pub imitation: Option<ImitationRequest>,
    #[serde(default)]
    pub canon: Option<CanonParams>,
    #[serde(default)]
    pub fugue: Option<FugueParams>,
    #[serde(default)]
    pub stability: Option<StabilityRequest>,
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_mode() -> String {
    "Ionian".to_string()
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            tonic: 0,
            mode: default_mode(),
            theme: Vec::new(),
            seed: None,
            entries: Vec::new(),
            imitation: None,
            canon: None,
            fugue: None,
            stability: None,
            engine: EngineConfig::default(),
        }
    }
}

impl JobConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fugue::Architecture;
    use crate::stability::StabilityBias;

    #[test]
    fn test_default_config_serializes() {
        let config = JobConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored = JobConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
        assert_eq!(restored.engine.catalog.max_modes, 200);
        assert_eq!(restored.engine.catalog.default_octave_span, 2);
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = JobConfig::from_json("{}").unwrap();
        assert_eq!(config, JobConfig::default());
        assert_eq!(config.mode, "Ionian");
    }

    #[test]
    fn test_config_loads_from_json_string() {
        let json = r#"{
            "tonic": 2,
            "mode": "Dorian",
            "theme": [62, 64, 65, 67, 69],
            "seed": 9,
            "entries": [{"interval": 0, "delay": 0}, {"interval": 7, "delay": 4}],
            "imitation": {"style": "diatonic", "interval": 3, "delay": 2},
            "canon": {"type": "strict", "interval": 7, "delay": 4},
            "fugue": {
                "architecture": {"type": "standard", "voices": 3},
                "subject": [62, 64, 65, 67],
                "stretto_density": 0.5
            },
            "stability": {"bias": "stable", "strength": 0.9, "length": 8},
            "engine": {"catalog": {"max_modes": 40}}
        }"#;
        let config = JobConfig::from_json(json).unwrap();
        assert_eq!(config.tonic, 2);
        assert_eq!(config.entries.len(), 2);
        assert_eq!(config.entries[1], EntrySpec { interval: 7, delay: 4 });
        let imitation = config.imitation.unwrap();
        assert_eq!(imitation.style, ImitationStyle::Diatonic);
        assert_eq!(imitation.interval, 3);
        assert_eq!(config.canon.unwrap().kind(), "strict");
        let fugue = config.fugue.unwrap();
        assert!(matches!(fugue.architecture, Architecture::Standard { .. }));
        assert_eq!(fugue.entry_interval, 7);
        let stability = config.stability.unwrap();
        assert_eq!(stability.params.bias, StabilityBias::Stable);
        assert_eq!(stability.length, Some(8));
        assert_eq!(config.engine.catalog.max_modes, 40);
        assert_eq!(config.engine.catalog.default_octave_span, 2);
    }

    #[test]
    fn test_malformed_job_is_json_error() {
        let err = JobConfig::from_json("{\"tonic\": \"C\"}").unwrap_err();
        assert!(matches!(err, crate::error::MusicError::Json(_)));
    }
}
