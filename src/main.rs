use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use playlist_match::config::{ConfigFile, MatchConfig};
use playlist_match::models::{CandidateRecord, NotFoundReport, Playlist};
use playlist_match::progress::set_log_only;
use playlist_match::reconcile::{reconcile_playlist, reconcile_pool, RecordedSearch};
use playlist_match::Matcher;

#[derive(Parser)]
#[command(name = "playlist-match")]
#[command(about = "Match a source playlist against another catalog's songs")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Hide progress bars and log periodic progress lines instead
    #[arg(long, global = true)]
    log_only: bool,

    /// Write matched entries here instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Write the not-found report here (default: noresults_<playlist>.json)
    #[arg(long, global = true)]
    not_found: Option<PathBuf>,

    /// Write run statistics as JSON
    #[arg(long, global = true)]
    stats: Option<PathBuf>,

    #[command(flatten)]
    matching: MatchArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve each track with recorded search results (detailed, then simple query)
    Search {
        /// Playlist JSON: {"name": ..., "songs": [...]}
        playlist: PathBuf,
        /// Recorded searches JSON: {"<query>": [candidate records]}
        searches: PathBuf,
    },
    /// Match every track against one shared pool of candidates
    Pool {
        /// Playlist JSON: {"name": ..., "songs": [...]}
        playlist: PathBuf,
        /// Candidate records JSON array
        candidates: PathBuf,
        /// Worker threads (0 = one per core)
        #[arg(long, default_value = "0")]
        workers: usize,
    },
}

#[derive(Args)]
struct MatchArgs {
    /// JSON config file; flags below override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    tolerance: Option<f64>,

    /// Seconds of duration difference tolerated
    #[arg(long, global = true)]
    duration_threshold: Option<u32>,

    #[arg(long, global = true)]
    top_result_boost: Option<f64>,

    /// Special keywords (comma-separated)
    #[arg(long, global = true)]
    keywords: Option<String>,
}

fn build_config(args: &MatchArgs) -> Result<MatchConfig> {
    let mut file = match &args.config {
        Some(path) => ConfigFile::from_json_file(path)?,
        None => ConfigFile::default(),
    };
    if args.tolerance.is_some() {
        file.tolerance = args.tolerance;
    }
    if args.duration_threshold.is_some() {
        file.duration_threshold_secs = args.duration_threshold;
    }
    if args.top_result_boost.is_some() {
        file.top_result_boost = args.top_result_boost;
    }
    if let Some(keywords) = &args.keywords {
        file.special_keywords = Some(
            keywords
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        );
    }
    file.into_config().context("Invalid match configuration")
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} {}", what, path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {} {}", what, path.display()))
}

fn write_output<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Matches written to {:?}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn write_not_found(report: &NotFoundReport, path: Option<&Path>) -> Result<()> {
    let default_path = PathBuf::from(format!("noresults_{}.json", report.name));
    let path = path.unwrap_or(&default_path);

    log::warn!(
        "No results for {} track(s) of '{}':\n{}",
        report.songs.len(),
        report.name,
        report
            .songs
            .iter()
            .map(|s| {
                if s.query.is_empty() {
                    s.record.name.as_str()
                } else {
                    s.query.as_str()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    );

    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Not-found report written to {:?}", path);
    Ok(())
}

fn run_search(
    cli: &Cli,
    matcher: &Matcher,
    playlist_path: &Path,
    searches_path: &Path,
) -> Result<()> {
    let playlist: Playlist = read_json(playlist_path, "playlist")?;
    let search = RecordedSearch::from_json_file(searches_path)?;
    if search.is_empty() {
        log::warn!("No recorded searches in {}", searches_path.display());
    }
    println!(
        "Processing '{}': {} tracks, {} recorded searches",
        playlist.name,
        playlist.songs.len(),
        search.len()
    );

    let outcome = reconcile_playlist(matcher, &search, &playlist)?;
    outcome.stats.log_phase("search");

    write_output(&outcome.matched, cli.output.as_deref())?;
    if let Some(report) = outcome.not_found_report() {
        write_not_found(&report, cli.not_found.as_deref())?;
    }
    if let Some(path) = &cli.stats {
        outcome.stats.write_to_file(path)?;
    }

    println!("\n{:=<60}", "");
    println!("Reconcile complete!");
    println!(
        "  Matched: {}/{} ({:.1}%)",
        outcome.stats.total_matches(),
        outcome.stats.total_tracks,
        outcome.stats.match_rate()
    );
    println!("  Unique ids: {}", outcome.unique_external_ids().len());
    println!("  Not found: {}", outcome.not_found.len());
    println!("  Elapsed: {:.2}s", outcome.stats.elapsed_seconds);
    println!("{:=<60}", "");
    Ok(())
}

fn run_pool(
    cli: &Cli,
    matcher: &Matcher,
    playlist_path: &Path,
    candidates_path: &Path,
    workers: usize,
) -> Result<()> {
    if workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let playlist: Playlist = read_json(playlist_path, "playlist")?;
    let records: Vec<CandidateRecord> = read_json(candidates_path, "candidates")?;
    println!(
        "Matching '{}': {} tracks against {} candidate records",
        playlist.name,
        playlist.songs.len(),
        records.len()
    );

    let outcome = reconcile_pool(matcher, &playlist, &records);
    outcome.stats.log_phase("pool");

    write_output(&outcome.matched, cli.output.as_deref())?;
    if let Some(report) = outcome.not_found_report() {
        write_not_found(&report, cli.not_found.as_deref())?;
    }
    if let Some(path) = &cli.stats {
        outcome.stats.write_to_file(path)?;
    }

    println!("\n{:=<60}", "");
    println!("Pool matching complete!");
    println!(
        "  Matched: {}/{} ({:.1}%)",
        outcome.stats.total_matches(),
        outcome.stats.total_tracks,
        outcome.stats.match_rate()
    );
    println!("  Malformed candidates: {}", outcome.stats.candidates_malformed);
    println!("  Not found: {}", outcome.not_found.len());
    println!("  Elapsed: {:.2}s", outcome.stats.elapsed_seconds);
    println!("{:=<60}", "");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    set_log_only(cli.log_only);

    let config = build_config(&cli.matching)?;
    log::info!(
        "Tolerance {:.2}, duration threshold {}s, top result boost {:.2}, keywords {:?}",
        config.tolerance(),
        config.duration_threshold_secs(),
        config.top_result_boost(),
        config.special_keywords()
    );
    let matcher = Matcher::new(config);

    match &cli.command {
        Command::Search { playlist, searches } => run_search(&cli, &matcher, playlist, searches),
        Command::Pool {
            playlist,
            candidates,
            workers,
        } => run_pool(&cli, &matcher, playlist, candidates, *workers),
    }
}
