// Job runner: executes a `JobConfig` against the engine.
//
// A job resolves its mode from the catalog built for its tonic, adapts the
// theme to that mode, and then runs each request it carries. Requests are
// independent of one another; the output holds one field per request, left
// empty when the job did not ask for it.
//
// A job-level `seed` overrides the seed of every randomized request, so the
// same job file always produces the same output.

use crate::canon::{CanonResult, generate_canon};
use crate::catalog::{ModeCatalog, build_mode_catalog};
use crate::config::{ImitationStyle, JobConfig};
use crate::diatonic::adapt_theme_to_mode;
use crate::error::{MusicError, Result};
use crate::fugue::{FugueResult, build_fugue, flatten_fugue};
use crate::fugue_entry::{FugueEntries, build_entries};
use crate::imitation::{chromatic_imitation, diatonic_imitation};
use crate::mode::Mode;
use crate::part::Part;
use crate::stability::{adjust_theme_stability, generate_biased_theme};
use serde::Serialize;
use tracing::info;

/// Alternate spellings for the two modes every catalog can answer for,
/// whether it is the full table or the major/minor fallback.
const MODE_ALIASES: [(&str, &str); 4] = [
    ("major", "Ionian"),
    ("minor", "Aeolian"),
    ("ionian", "Major"),
    ("aeolian", "Minor"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOutput {
    pub mode: Mode,
    pub adapted_theme: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<FugueEntries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imitation: Option<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canon: Option<CanonResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fugue: Option<FugueResult>,
    /// The fugue flattened to one continuous part per voice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flattened: Option<Vec<Part>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stability_theme: Option<Vec<u8>>,
}

/// Find a mode by name, trying the major/minor aliases second.
pub fn resolve_mode(catalog: &ModeCatalog, name: &str) -> Result<Mode> {
    catalog
        .find(name)
        .or_else(|| {
            MODE_ALIASES
                .iter()
                .find(|(alias, _)| alias.eq_ignore_ascii_case(name.trim()))
                .and_then(|(_, canonical)| catalog.find(canonical))
        })
        .cloned()
        .ok_or_else(|| MusicError::UnknownMode(name.to_string()))
}

pub fn run_job(job: &JobConfig) -> Result<JobOutput> {
    let catalog = build_mode_catalog(job.tonic % 12, &job.engine.catalog);
    let mode = resolve_mode(&catalog, &job.mode)?;
    info!(mode = %mode.display_name(), theme_len = job.theme.len(), "running job");

    let adapted_theme = adapt_theme_to_mode(&job.theme, &mode);
    let leader = Part::from_notes(job.theme.clone());

    let entries = if job.entries.is_empty() {
        None
    } else {
        Some(build_entries(&job.theme, &mode, &job.entries)?)
    };

    let imitation = job.imitation.map(|request| match request.style {
        ImitationStyle::Chromatic => chromatic_imitation(&leader, request.interval, request.delay),
        ImitationStyle::Diatonic => diatonic_imitation(&leader, &mode, request.interval, request.delay),
    });

    let canon = job.canon.as_ref().map(|params| {
        let params = match job.seed {
            Some(seed) => params.clone().with_seed(seed),
            None => params.clone(),
        };
        generate_canon(&leader, &mode, &params)
    });

    let fugue = match &job.fugue {
        Some(params) => {
            let mut params = params.clone();
            if params.subject.is_empty() {
                params.subject = job.theme.clone();
            }
            if let Some(seed) = job.seed {
                params.seed = seed;
            }
            Some(build_fugue(&params, &mode)?)
        }
        None => None,
    };
    let flattened = fugue.as_ref().map(flatten_fugue);

    let stability_theme = job.stability.map(|request| {
        let mut params = request.params;
        if let Some(seed) = job.seed {
            params.seed = seed;
        }
        match request.length {
            Some(length) => {
                let start = request.start.unwrap_or(60 + mode.tonic());
                generate_biased_theme(&mode, length, start, &params)
            }
            None => adjust_theme_stability(&adapted_theme, &mode, &params),
        }
    });

    Ok(JobOutput {
        mode,
        adapted_theme,
        entries,
        imitation,
        canon,
        fugue,
        flattened,
        stability_theme,
    })
}
