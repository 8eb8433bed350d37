//! Compendium Forge command line.
//!
//! Extracts provisional records from a rulebook text dump, stages content
//! files through review tiers and builds validated compendium packs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;

use compendium_forge::config::PipelineConfig;
use compendium_forge::core::logging::{self, print_panel, print_success, print_warning};
use compendium_forge::core::pipeline::{Pipeline, StageOptions};
use compendium_forge::core::stage_store::Tier;
use compendium_forge::ingestion::LineCorpus;

/// Compendium Forge - rulebook content pipeline
#[derive(Parser, Debug)]
#[command(name = "compendium-forge", version)]
#[command(about = "Extract, stage, validate and pack tabletop game content")]
struct Cli {
    /// Increase log detail (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: ./compendium.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract raw content files from a rulebook text dump
    Extract {
        /// Line-oriented text corpus
        #[arg(long)]
        corpus: PathBuf,

        /// Output directory (default: the configured content directory)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Overwrite existing content files
        #[arg(long)]
        force: bool,
    },

    /// Stage content files through the raw, normalized and reviewed tiers
    Stage {
        /// Replace existing reviewed snapshots with the normalized tier
        #[arg(long)]
        promote: bool,

        /// Copy reviewed snapshots back over the canonical content files
        #[arg(long)]
        sync: bool,

        /// Content files to stage (default: all staged files)
        files: Vec<String>,
    },

    /// Validate canonical content and write compendium packs
    Build,

    /// Show which stage tiers exist per content file
    Status,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let config = PipelineConfig::load(cli.config.as_deref())?;
    let _log_guard = logging::init(cli.verbose, config.paths.log_dir.as_deref());
    tracing::debug!("{} v{} starting", compendium_forge::NAME, compendium_forge::VERSION);

    let pipeline = Pipeline::new(config);

    match cli.command {
        Command::Extract { corpus, out, force } => {
            let lines = LineCorpus::load(&corpus)?;
            let out = out.unwrap_or_else(|| pipeline.config().paths.content_dir.clone());
            std::fs::create_dir_all(&out).into_diagnostic()?;

            let report = pipeline.extract_to(&lines, &out, force)?;
            for (file, count) in &report.written {
                print_success(&format!("wrote {file}: {count}"));
            }
            for file in &report.kept {
                print_warning(&format!("kept existing {file} (use --force to overwrite)"));
            }
        }
        Command::Stage { promote, sync, files } => {
            let reports = pipeline.stage(&files, StageOptions { promote, sync })?;
            if reports.is_empty() {
                print_warning("nothing to stage");
            }
            for report in &reports {
                print_success(&report.to_string());
            }
        }
        Command::Build => {
            let report = pipeline.build()?;
            for pack in &report.packs {
                print_success(&format!("wrote {}: {}", pack.pack, pack.records));
            }
            for finding in &report.findings {
                print_warning(&finding.to_string());
            }
            if report.discarded > 0 {
                print_warning(&format!("{} duplicate record(s) discarded", report.discarded));
            }
        }
        Command::Status => {
            let rows: Vec<(String, String)> = pipeline
                .status()
                .into_iter()
                .map(|status| {
                    let tiers = Tier::ALL
                        .iter()
                        .map(|tier| match (status.has(*tier), status.count(*tier)) {
                            (false, _) => format!("{tier}=-"),
                            (true, Some(n)) => format!("{tier}={n}"),
                            (true, None) => format!("{tier}=?"),
                        })
                        .collect::<Vec<_>>()
                        .join(" ");
                    (status.file, tiers)
                })
                .collect();
            print_panel("Stage status", &rows);
        }
    }

    Ok(())
}
