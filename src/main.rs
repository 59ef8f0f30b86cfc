//! page-diff: visual page-level diffing for rasterized documents.

#![allow(clippy::too_many_lines)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use page_diff::pipeline::exit_codes;
use page_diff::session::SessionManager;
use page_diff::{
    load_group, ComparePipeline, ConfigPreset, GroupTag, PairingMode, Validatable,
    CONFIG_FILE_NAME,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "page-diff")]
#[command(version)]
#[command(about = "Visual page-level diff for rasterized documents", long_about = None)]
#[command(after_help = "EXIT CODES:
    0  No changes detected
    1  Changes detected
    2  Error occurred

EXAMPLES:
    # Align and diff two page directories
    page-diff compare before/ after/

    # Page order is already known to match
    page-diff compare before/ after/ --mode sequential

    # Pin specific page pairs (A:B indices, zero-based)
    page-diff compare before/ after/ --mode manual --pairs 0:0,2:1

    # Export JSON with embedded images for a UI
    page-diff compare before/ after/ -o json --embed-images > diff.json

    # Write highlight composites next to the report
    page-diff compare before/ after/ --diff-dir out/")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments for the `compare` subcommand
#[derive(Parser)]
struct CompareArgs {
    /// Baseline document: an image file or a directory of page images
    doc_a: PathBuf,

    /// Updated document: an image file or a directory of page images
    doc_b: PathBuf,

    /// Pairing mode (sequential, auto, manual, aligned)
    #[arg(short, long, default_value = "aligned")]
    mode: PairingMode,

    /// Manual page pairs as comma-separated A:B index pairs (zero-based)
    #[arg(long, value_name = "PAIRS")]
    pairs: Option<String>,

    /// Output format (summary, json)
    #[arg(short, long, default_value = "summary")]
    output: OutputFormat,

    /// Output file path (stdout if not specified)
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,

    /// Embed page and highlight images in JSON output as PNG data URIs
    #[arg(long)]
    embed_images: bool,

    /// Directory to write highlight composites into (one PNG per changed entry)
    #[arg(long)]
    diff_dir: Option<PathBuf>,

    /// Tuning preset (balanced, strict, lenient)
    #[arg(long)]
    preset: Option<ConfigPreset>,

    /// Changed/unchanged threshold as a percentage of differing pixels
    #[arg(long)]
    change_threshold: Option<f64>,

    /// Restrict alignment to a diagonal band of this half-width
    #[arg(long)]
    band: Option<usize>,

    /// Abort alignment after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Exit 0 even when changes are detected
    #[arg(long)]
    no_fail_on_change: bool,
}

/// Arguments for the `session` subcommand
#[derive(Parser)]
struct SessionArgs {
    /// Directory holding persisted session records
    #[arg(long, value_name = "DIR")]
    store: PathBuf,

    #[command(subcommand)]
    action: SessionAction,
}

#[derive(Subcommand)]
enum SessionAction {
    /// List persisted sessions that are still within their TTL
    List,
    /// Clear one persisted session
    Clear {
        /// Session id
        id: String,
    },
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two documents page by page
    Compare(CompareArgs),

    /// Inspect or clear persisted sessions
    Session(SessionArgs),

    /// Show, discover, or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Sub-subcommands for the `config` command
#[derive(Subcommand)]
enum ConfigAction {
    /// Print current effective configuration (defaults merged with file)
    Show,
    /// Print the discovered config file path, if any
    Path,
    /// Generate an example .page-diff.yaml in the current directory
    Init,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Summary,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(exit_codes::ERROR);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Compare(args) => {
            let exit_code = run_compare(cli.config.as_deref(), args)?;
            if exit_code != exit_codes::SUCCESS {
                std::process::exit(exit_code);
            }
            Ok(())
        }

        Commands::Session(args) => run_session(cli.config.as_deref(), args),

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let (config, loaded_from) = page_diff::load_or_default(cli.config.as_deref())?;
                if let Some(path) = &loaded_from {
                    eprintln!("# Loaded from: {}", path.display());
                } else {
                    eprintln!("# No config file found; showing defaults");
                }
                let yaml = serde_yaml::to_string(&config).context("failed to serialize config")?;
                print!("{yaml}");
                Ok(())
            }
            ConfigAction::Path => {
                match page_diff::discover_config_file() {
                    Some(path) => println!("{}", path.display()),
                    None => eprintln!("No {CONFIG_FILE_NAME} found."),
                }
                Ok(())
            }
            ConfigAction::Init => {
                let target = std::env::current_dir()
                    .context("cannot determine current directory")?
                    .join(CONFIG_FILE_NAME);
                if target.exists() {
                    anyhow::bail!(
                        "{} already exists. Remove it first to re-initialize.",
                        target.display()
                    );
                }
                std::fs::write(&target, page_diff::generate_example_config())
                    .with_context(|| format!("failed to write {}", target.display()))?;
                eprintln!("Created {}", target.display());
                Ok(())
            }
        },
    }
}

fn run_compare(config_path: Option<&Path>, args: CompareArgs) -> Result<i32> {
    let (mut config, _) = page_diff::load_or_default(config_path)?;
    if let Some(preset) = args.preset {
        config.apply_preset(preset);
    }
    if let Some(pct) = args.change_threshold {
        config.render.change_threshold_pct = pct;
    }
    if let Some(band) = args.band {
        config.alignment.band = Some(band);
    }
    if let Some(secs) = args.timeout_secs {
        config.alignment.timeout = Some(std::time::Duration::from_secs(secs));
    }
    config.validate().context("invalid configuration")?;

    let manual_pairs = match &args.pairs {
        Some(spec) => parse_manual_pairs(spec)?,
        None => Vec::new(),
    };
    if !manual_pairs.is_empty() && args.mode != PairingMode::Manual {
        anyhow::bail!("--pairs requires --mode manual");
    }

    let group_a = load_group(&args.doc_a, GroupTag::A)?;
    let group_b = load_group(&args.doc_b, GroupTag::B)?;

    let pipeline = ComparePipeline::new(&config);
    let report = pipeline.compare(&group_a, &group_b, args.mode, &manual_pairs)?;
    let summary = report.summary();

    if let Some(dir) = &args.diff_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;
        for result in &report.results {
            if let Some(highlight) = &result.highlight {
                let file = dir.join(format!("{}.png", sanitize_filename(&result.label)));
                highlight
                    .save(&file)
                    .with_context(|| format!("cannot write {}", file.display()))?;
            }
        }
    }

    let rendered = match args.output {
        OutputFormat::Summary => {
            let mut out = String::new();
            for result in &report.results {
                out.push_str(&format!(
                    "{:<12} {}  ({:.4}%)\n",
                    result.status.to_string(),
                    result.label,
                    result.difference_pct
                ));
            }
            out.push_str(&format!(
                "\n{} added, {} removed, {} changed, {} unchanged\n",
                summary.added, summary.removed, summary.changed, summary.unchanged
            ));
            out
        }
        OutputFormat::Json => {
            if args.embed_images {
                let payloads = pipeline.payloads(&report, &group_a, &group_b)?;
                serde_json::to_string_pretty(&payloads)?
            } else {
                #[derive(serde::Serialize)]
                struct Entry<'a> {
                    label: &'a str,
                    status: page_diff::DiffStatus,
                    difference_pct: f64,
                    a_index: Option<usize>,
                    b_index: Option<usize>,
                }
                let entries: Vec<Entry<'_>> = report
                    .results
                    .iter()
                    .map(|r| Entry {
                        label: &r.label,
                        status: r.status,
                        difference_pct: r.difference_pct,
                        a_index: r.a_index,
                        b_index: r.b_index,
                    })
                    .collect();
                serde_json::to_string_pretty(&serde_json::json!({
                    "entries": entries,
                    "summary": summary,
                }))?
            }
        }
    };

    match &args.output_file {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => print!("{rendered}"),
    }

    let has_changes = summary.added + summary.removed + summary.changed > 0;
    Ok(if has_changes && !args.no_fail_on_change {
        exit_codes::CHANGES_DETECTED
    } else {
        exit_codes::SUCCESS
    })
}

fn run_session(config_path: Option<&Path>, args: SessionArgs) -> Result<()> {
    let (mut config, _) = page_diff::load_or_default(config_path)?;
    config.session.persist_dir = Some(args.store.clone());

    let manager = SessionManager::new(&config)?;
    manager.recover()?;

    match args.action {
        SessionAction::List => {
            let mut sessions = manager.sessions();
            sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            if sessions.is_empty() {
                eprintln!("No live sessions in {}", args.store.display());
                return Ok(());
            }
            for info in sessions {
                println!(
                    "{}  {}  mode={}  pages={}x{}  cached={}",
                    info.id,
                    info.created_at.format("%Y-%m-%d %H:%M:%S"),
                    info.mode,
                    info.pages_a,
                    info.pages_b,
                    info.cached_results
                );
            }
            Ok(())
        }
        SessionAction::Clear { id } => {
            manager.clear_session(&id)?;
            eprintln!("Cleared session {id}");
            Ok(())
        }
    }
}

/// Parse "0:0,2:1" into index pairs.
fn parse_manual_pairs(spec: &str) -> Result<Vec<(usize, usize)>> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|part| {
            let (a, b) = part
                .split_once(':')
                .with_context(|| format!("bad pair '{part}', expected A:B"))?;
            Ok((
                a.trim().parse().with_context(|| format!("bad A index in '{part}'"))?,
                b.trim().parse().with_context(|| format!("bad B index in '{part}'"))?,
            ))
        })
        .collect()
}

fn sanitize_filename(label: &str) -> String {
    label
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manual_pairs() {
        assert_eq!(
            parse_manual_pairs("0:0, 2:1").unwrap(),
            vec![(0, 0), (2, 1)]
        );
        assert!(parse_manual_pairs("0-0").is_err());
        assert!(parse_manual_pairs("a:0").is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("b.pdf#3"), "b.pdf#3");
        assert_eq!(sanitize_filename("dir/page:1"), "dir_page_1");
    }
}
