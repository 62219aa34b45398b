//! kicad-symsync CLI
//!
//! Usage:
//!   kicad-symsync [OPTIONS] diff --components <FILE>
//!   kicad-symsync [OPTIONS] apply --components <FILE> [--symbol <NAME>]...

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kicad_symsync::{
    ComponentRecord, Error, Settings, SyncReport, Synchronizer, TemplateCatalog,
};

#[derive(Parser)]
#[command(name = "kicad-symsync")]
#[command(about = "Generate KiCad symbols from component records and merge them into libraries")]
struct Cli {
    /// Settings file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template configuration, overrides the settings file
    #[arg(short, long)]
    templates: Option<PathBuf>,

    /// Library directory, overrides the settings file
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show what would change in each library
    Diff {
        /// Component records (JSON array)
        #[arg(long)]
        components: PathBuf,
    },
    /// Write changes to the libraries
    Apply {
        /// Component records (JSON array)
        #[arg(long)]
        components: PathBuf,

        /// Only apply changes to these symbols
        #[arg(long = "symbol")]
        symbols: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when some library could not be processed
fn run(cli: Cli) -> Result<bool, Error> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(templates) = cli.templates {
        settings.templates = templates;
    }
    if let Some(output_dir) = cli.output_dir {
        settings.output_dir = output_dir;
    }

    let catalog = TemplateCatalog::load(&settings.templates)?;
    info!(templates = catalog.len(), path = %settings.templates.display(), "loaded templates");
    let sync = Synchronizer::new(&catalog, &settings.output_dir).with_header(settings.library);

    match cli.command {
        Command::Diff { components } => {
            let report = sync.compare(&load_records(&components)?);
            print_report(&report);
            Ok(report.failed_files.is_empty())
        }
        Command::Apply {
            components,
            symbols,
        } => {
            let report = sync.compare(&load_records(&components)?);
            print_report(&report);
            let changes = if symbols.is_empty() {
                report.changes
            } else {
                report.changes.select(&symbols)
            };
            let applied = sync.apply(changes);
            for (path, count) in &applied.written {
                println!("wrote {} change(s) to {}", count, path.display());
            }
            for err in &applied.failed {
                println!("failed: {}", err);
            }
            Ok(report.failed_files.is_empty() && applied.is_success())
        }
    }
}

fn load_records(path: &Path) -> Result<Vec<ComponentRecord>, Error> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

fn print_report(report: &SyncReport) {
    for (path, changes) in report.changes.files() {
        println!("{}", path.display());
        for change in changes {
            println!("  {:<9} {} ({})", change.classification, change.name, change.category);
        }
    }
    for skipped in &report.skipped {
        println!("skipped {} ({}): {}", skipped.name, skipped.category, skipped.reason);
    }
    for err in &report.failed_files {
        println!("failed: {}", err);
    }
    println!(
        "{} change(s), {} unchanged, {} skipped",
        report.changes.len(),
        report.unchanged,
        report.skipped.len()
    );
}
