//! `twee` - inspect and check Twee (SugarCube) story files.
//!
//! # Usage
//!
//! ```bash
//! twee partitions story.tw
//! twee outline story.tw
//! twee check story.tw --macros my-macros.json --settings twee-settings.json
//! ```
//!
//! `check` exits with status 1 when a macro problem is found. Log output is controlled with
//! `RUST_LOG` (default `warn`).

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twee_core::TweeDocument;
use twee_macros::CollectingReporter;

#[derive(Parser)]
#[command(name = "twee")]
#[command(about = "Inspect and check Twee story files")]
#[command(version)]
struct Cli {
    /// Print one JSON object per line instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the content-type partitions of a file
    Partitions {
        /// Twee source file
        file: PathBuf,
    },

    /// Print the passages of a file
    Outline {
        /// Twee source file
        file: PathBuf,
    },

    /// Check the macro calls of a file
    Check {
        /// Twee source file
        file: PathBuf,

        /// Extra macro definitions (JSON)
        #[arg(long)]
        macros: Option<PathBuf>,

        /// Settings file (JSON)
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Partitions { file } => {
            let doc = read_document(&file)?;
            print_rows(&twee_cli::partitions(&doc), cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Outline { file } => {
            let doc = read_document(&file)?;
            print_rows(&twee_cli::outline(&doc), cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check {
            file,
            macros,
            settings,
        } => {
            let prefs = twee_cli::load_preferences(settings.as_deref(), macros.as_deref())
                .context("loading settings")?;
            let reporter = Arc::new(CollectingReporter::new());
            let dictionary = twee_cli::load_dictionary(&*prefs, reporter.clone());
            for message in reporter.take() {
                eprintln!("error: {message}");
            }

            let doc = read_document(&file)?;
            let problems = twee_cli::check(&doc, dictionary, prefs);
            print_rows(&problems, cli.json)?;
            tracing::debug!(problems = problems.len(), "check finished");
            if problems.is_empty() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn read_document(path: &Path) -> Result<TweeDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(TweeDocument::new(&text))
}

fn print_rows<T: Display + Serialize>(rows: &[T], json: bool) -> Result<()> {
    for row in rows {
        if json {
            println!("{}", serde_json::to_string(row)?);
        } else {
            println!("{row}");
        }
    }
    Ok(())
}
