// Contrapunct generator: CLI entry point.
//
// Runs a JSON job (see `config.rs`) and prints the result as pretty JSON.
// Without a job file it runs a demo: a strict canon at the fifth and a
// three-voice standard fugue on a short stepwise theme.
//
// Usage:
//   cargo run -p contrapunct_music --bin generate -- [job.json] [--seed N]
//     [--tonic PC] [--mode NAME] [--output PATH]
//
// Logging goes to stderr and is filtered by RUST_LOG (default "info").

use contrapunct_music::canon::CanonParams;
use contrapunct_music::config::JobConfig;
use contrapunct_music::error::Result;
use contrapunct_music::fugue::{Architecture, FugueParams, VoiceCount};
use contrapunct_music::job::run_job;
use contrapunct_music::pitch::pc_name;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    let job_path = args
        .get(1)
        .filter(|s| !s.starts_with("--"))
        .map(|s| s.as_str());

    let mut job = match job_path {
        Some(path) => {
            info!(path, "loading job");
            JobConfig::from_json(&std::fs::read_to_string(path)?)?
        }
        None => demo_job(),
    };

    if let Some(seed) = parse_flag(args, "--seed") {
        job.seed = Some(seed);
    }
    if let Some(tonic) = parse_flag::<u8>(args, "--tonic") {
        job.tonic = tonic % 12;
    }
    if let Some(mode) = parse_flag(args, "--mode") {
        job.mode = mode;
    }
    let output_path: Option<String> = parse_flag(args, "--output");

    info!(tonic = pc_name(job.tonic), mode = %job.mode, "generating");
    let output = run_job(&job)?;
    let json = serde_json::to_string_pretty(&output)?;

    match output_path {
        Some(path) => {
            std::fs::write(Path::new(&path), json)?;
            info!(path = %path, "wrote output");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn demo_job() -> JobConfig {
    let theme = vec![60, 62, 64, 65, 67, 65, 64, 62, 60];
    let mut fugue = FugueParams::new(
        Architecture::Standard {
            voices: VoiceCount::Three,
        },
        theme.clone(),
    );
    fugue.countersubject = true;
    fugue.stretto_density = 0.5;
    JobConfig {
        theme,
        canon: Some(CanonParams::Strict {
            interval: 7,
            delay: 4,
        }),
        fugue: Some(fugue),
        ..JobConfig::default()
    }
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
