//! blockdedupe - sub-file deduplication planner
//!
//! Reads whole-file and per-block checksum listings, builds the bipartite
//! file/checksum graph of shared blocks, and organizes it into a tree of
//! dedupe groups, splitting groups wherever two different blocks claim the
//! same byte range.

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod logging;
pub mod output;
pub mod records;
pub mod registry;
pub mod report;
pub mod vectors;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::analyzer::Analyzer;
use crate::cli::{AnalyzeArgs, Cli, Commands, DuplicatesArgs, ListFormat, ReportFormat};
use crate::config::Config;
use crate::error::ExitCode;
use crate::output::{CsvOutput, JsonOutput};
use crate::records::{DuplicateMap, DuplicateSet};

/// Run the application with parsed CLI arguments.
///
/// # Errors
///
/// Returns any error that aborts the run; the caller maps it to an exit code
/// with [`ExitCode::from_error`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    log::debug!("Effective configuration: {:?}", config);

    match cli.command {
        Commands::Duplicates(args) => handle_duplicates(&args, &config),
        Commands::Analyze(args) => handle_analyze(&args, config),
    }
}

fn handle_duplicates(args: &DuplicatesArgs, config: &Config) -> Result<ExitCode> {
    let sets = load_duplicate_sets(&args.whole_checksums)?;

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    match args.output {
        ListFormat::Text => output::write_duplicate_text(&sets, &mut writer)?,
        ListFormat::Json => {
            output::json::write_duplicate_sets(&sets, &mut writer, args.pretty || config.pretty)?;
        }
    }
    writer.flush()?;

    Ok(if sets.is_empty() {
        ExitCode::NoGroups
    } else {
        ExitCode::Success
    })
}

fn handle_analyze(args: &AnalyzeArgs, mut config: Config) -> Result<ExitCode> {
    if let Some(min_blocks) = args.min_blocks {
        config.min_blocks = usize::try_from(min_blocks).context("--min-blocks out of range")?;
    }
    if let Some(iterations) = args.max_split_iterations {
        config.max_split_iterations =
            usize::try_from(iterations).context("--max-split-iterations out of range")?;
    }
    config.singleton_filter &= !args.no_singleton_filter;
    config.parallel &= !args.sequential;
    config.pretty |= args.pretty;
    config.validate()?;

    let sets = load_duplicate_sets(&args.whole_checksums)?;
    if let Some(path) = &args.save_duplicates {
        let mut writer = create_file(path)?;
        output::json::write_duplicate_sets(&sets, &mut writer, config.pretty)
            .with_context(|| format!("writing duplicate sets to {}", path.display()))?;
        writer.flush()?;
        log::info!("Saved {} duplicate sets to {}", sets.len(), path.display());
    }
    let duplicates = DuplicateMap::from_sets(&sets);

    let blocks = records::load_block_records(&args.block_checksums)
        .with_context(|| format!("reading {}", args.block_checksums.display()))?;

    let analyzer = Analyzer::new(config.analyzer_config());
    let (groups, summary) = match &args.save_vectors {
        Some(path) => {
            let analysis = analyzer
                .analyze_keeping_vectors(&duplicates, blocks)
                .context("partitioning dedupe groups")?;
            let mut writer = create_file(path)?;
            output::json::write_vectors(&analysis.vectors, &mut writer, config.pretty)
                .with_context(|| format!("writing vectors to {}", path.display()))?;
            writer.flush()?;
            log::info!("Saved {} vectors to {}", analysis.vectors.len(), path.display());
            (analysis.groups, analysis.summary)
        }
        None => analyzer
            .analyze(&duplicates, blocks)
            .context("partitioning dedupe groups")?,
    };

    let exit_code = if groups.is_empty() {
        ExitCode::NoGroups
    } else {
        ExitCode::Success
    };

    let mut writer: Box<dyn Write> = match &args.output_file {
        Some(path) => Box::new(create_file(path)?),
        None => Box::new(io::stdout().lock()),
    };
    match args.output {
        ReportFormat::Json => {
            JsonOutput::new(&groups, &summary, exit_code).write_to(&mut writer, config.pretty)?;
        }
        ReportFormat::Csv => CsvOutput::new(&groups).write_to(&mut writer)?,
    }
    writer.flush()?;

    Ok(exit_code)
}

fn load_duplicate_sets(path: &Path) -> Result<Vec<DuplicateSet>> {
    let whole = records::load_whole_file_records(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(records::identify_duplicates(&whole))
}

fn create_file(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}
