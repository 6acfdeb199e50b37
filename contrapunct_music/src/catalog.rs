// Mode catalog: named modal scales grouped by tradition.
//
// The step patterns live in `data/mode_catalog.json`, embedded at compile
// time. A group either lists its modes explicitly or names a parent step
// pattern whose rotations are the modes (the seven church modes are the
// rotations of the major scale, and so on for melodic minor, harmonic
// minor, harmonic major and double harmonic).
//
// `build_mode_catalog` never fails. If the table cannot be parsed, contains
// a degenerate step pattern, or comes out empty, the caller gets a two-mode
// major/minor catalog and a warning in the log. The total number of modes is
// capped by `CatalogConfig::max_modes`.
//
// Catalogs depend only on the tonic, so `ModeCache` keeps one per tonic for
// callers that regenerate often. The cache is an ordinary value owned by
// whoever needs it; dropping or clearing it is always safe.

use crate::config::CatalogConfig;
use crate::error::Result;
use crate::mode::Mode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

const CATALOG_JSON: &str = include_str!("../data/mode_catalog.json");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    groups: Vec<GroupEntry>,
}

#[derive(Debug, Deserialize)]
struct GroupEntry {
    name: String,
    #[serde(default)]
    modes: Vec<ModeEntry>,
    #[serde(default)]
    rotations: Option<RotationEntry>,
    #[serde(default)]
    octave_span: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct ModeEntry {
    name: String,
    steps: Vec<u8>,
    #[serde(default)]
    octave_span: Option<u8>,
}

/// A parent step pattern and the names of its rotations, in rotation order.
#[derive(Debug, Deserialize)]
struct RotationEntry {
    steps: Vec<u8>,
    names: Vec<String>,
}

/// A named collection of related modes.
#[derive(Debug, Clone, Serialize)]
pub struct ModeGroup {
    pub name: String,
    pub modes: Vec<Mode>,
}

/// Every catalog mode on one tonic, grouped by tradition.
#[derive(Debug, Clone, Serialize)]
pub struct ModeCatalog {
    pub tonic: u8,
    pub groups: Vec<ModeGroup>,
    /// True when the major/minor fallback was returned.
    pub is_fallback: bool,
}

impl ModeCatalog {
    /// The minimal catalog: major and natural minor.
    pub fn fallback(tonic: u8, octave_span: u8) -> Self {
        ModeCatalog {
            tonic: tonic % 12,
            groups: vec![ModeGroup {
                name: "Basic".to_string(),
                modes: vec![
                    Mode::major(tonic).with_octave_span(octave_span),
                    Mode::minor(tonic).with_octave_span(octave_span),
                ],
            }],
            is_fallback: true,
        }
    }

    pub fn modes(&self) -> impl Iterator<Item = &Mode> {
        self.groups.iter().flat_map(|g| g.modes.iter())
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.modes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look a mode up by name ("Dorian") or display name ("D Dorian"),
    /// ignoring case. The first match in catalog order wins.
    pub fn find(&self, name: &str) -> Option<&Mode> {
        let wanted = name.trim();
        self.modes().find(|m| {
            m.name().eq_ignore_ascii_case(wanted) || m.display_name().eq_ignore_ascii_case(wanted)
        })
    }

    pub fn group(&self, name: &str) -> Option<&ModeGroup> {
        self.groups.iter().find(|g| g.name.eq_ignore_ascii_case(name))
    }
}

/// Build the full catalog for a tonic, falling back to major/minor on any
/// problem with the embedded table.
pub fn build_mode_catalog(tonic: u8, config: &CatalogConfig) -> ModeCatalog {
    catalog_or_fallback(CATALOG_JSON, tonic, config)
}

pub(crate) fn catalog_or_fallback(json: &str, tonic: u8, config: &CatalogConfig) -> ModeCatalog {
    match catalog_from_json(json, tonic, config) {
        Ok(catalog) if !catalog.is_empty() => {
            debug!(tonic, modes = catalog.len(), "built mode catalog");
            catalog
        }
        Ok(_) => {
            warn!(tonic, "mode catalog is empty, using major/minor");
            ModeCatalog::fallback(tonic, config.default_octave_span)
        }
        Err(e) => {
            warn!(tonic, error = %e, "mode catalog unavailable, using major/minor");
            ModeCatalog::fallback(tonic, config.default_octave_span)
        }
    }
}

/// Parse a catalog table strictly: any degenerate step pattern is an error.
pub fn catalog_from_json(json: &str, tonic: u8, config: &CatalogConfig) -> Result<ModeCatalog> {
    let file: CatalogFile = serde_json::from_str(json)?;
    let mut remaining = config.max_modes;
    let mut groups = Vec::new();

    for entry in file.groups {
        if remaining == 0 {
            break;
        }
        let group_span = entry.octave_span.unwrap_or(config.default_octave_span);
        let mut modes = Vec::new();

        if let Some(rot) = &entry.rotations {
            for (i, name) in rot.names.iter().enumerate().take(rot.steps.len()) {
                let mut steps = rot.steps.clone();
                steps.rotate_left(i);
                modes.push(Mode::new(name.clone(), steps, tonic, group_span)?);
            }
        }
        for m in entry.modes {
            let span = m.octave_span.unwrap_or(group_span);
            modes.push(Mode::new(m.name, m.steps, tonic, span)?);
        }

        modes.truncate(remaining);
        remaining -= modes.len();
        if !modes.is_empty() {
            groups.push(ModeGroup {
                name: entry.name,
                modes,
            });
        }
    }

    Ok(ModeCatalog {
        tonic: tonic % 12,
        groups,
        is_fallback: false,
    })
}

/// Caller-owned cache of catalogs keyed by tonic pitch class.
#[derive(Debug, Clone, Default)]
pub struct ModeCache {
    config: CatalogConfig,
    catalogs: HashMap<u8, ModeCatalog>,
}

impl ModeCache {
    pub fn new(config: CatalogConfig) -> Self {
        ModeCache {
            config,
            catalogs: HashMap::new(),
        }
    }

    /// The catalog for a tonic, built on first request.
    pub fn get(&mut self, tonic: u8) -> &ModeCatalog {
        let config = &self.config;
        self.catalogs
            .entry(tonic % 12)
            .or_insert_with(|| build_mode_catalog(tonic, config))
    }

    /// Number of tonics currently cached.
    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }

    pub fn clear(&mut self) {
        self.catalogs.clear();
    }
}
