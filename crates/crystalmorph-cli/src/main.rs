//! `crystalmorph`: batch morphology analysis from the command line.
//!
//! Every subcommand reads a batch (or one coordinate file), runs one pipeline
//! and writes its tables into the configured output folder under the batch
//! root, printing the paths it wrote.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::Level;

use crystalmorph_core::output::{self, BatchReport, OutputDir};
use crystalmorph_core::{
    aggregate_directory, classify_batch, combine_by_position, describe_movie, extract_metadata, growth_rates,
    join_summary, AggregateTable, AnalysisConfig, BatchMetadata, CdaTable, ConfigurationError, Direction,
    GrowthInput, GrowthRateTable, RunNumber, SummaryTable, Tabular,
};

#[derive(Parser)]
#[command(name = "crystalmorph")]
#[command(about = "Shape descriptors, CDA and growth rates for crystal-growth batches", long_about = None)]
struct Cli {
    /// Analysis config JSON file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Describe every coordinate file under a batch root
    Aggregate {
        /// Batch root
        root: PathBuf,
    },
    /// Describe every frame of a movie file
    Movie {
        /// Coordinate file
        file: PathBuf,
    },
    /// Print the run metadata of a batch as JSON
    Metadata {
        /// Batch root
        root: PathBuf,
    },
    /// Classify the ordering of three directions in every run
    Cda {
        /// Batch root
        root: PathBuf,
        /// Three directions, e.g. "1 0 0" "0 1 0" "0 0 1"
        #[arg(num_args = 3, required = true)]
        directions: Vec<String>,
    },
    /// Fit facet growth rates
    Growth {
        /// Batch root
        root: PathBuf,
        /// Directions to fit (default: every batch direction)
        #[arg(short, long, num_args = 1..)]
        directions: Vec<String>,
        /// Explicit size files, paired with --supersaturation by position
        #[arg(long = "size-file", requires = "supersaturations")]
        size_files: Vec<PathBuf>,
        /// Supersaturation of each explicit size file
        #[arg(long = "supersaturation", allow_negative_numbers = true)]
        supersaturations: Vec<f64>,
    },
    /// Join a run table with the batch summary
    Join {
        /// Batch root
        root: PathBuf,
        /// Table to join
        #[arg(value_enum)]
        table: TableKind,
        /// Summary CSV (default: the batch summary file)
        #[arg(long)]
        summary: Option<PathBuf>,
        /// CDA directions, when joining the CDA table
        #[arg(long, num_args = 3)]
        cda: Vec<String>,
    },
    /// Combine two run tables row by row
    Combine {
        /// Batch root
        root: PathBuf,
        /// Left table
        #[arg(value_enum)]
        left: TableKind,
        /// Right table
        #[arg(value_enum)]
        right: TableKind,
        /// CDA directions, when either table is the CDA table
        #[arg(long, num_args = 3)]
        cda: Vec<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TableKind {
    Aggregate,
    Cda,
    Growth,
}

/// Any run table a pipeline can produce.
enum RunTable {
    Aggregate(AggregateTable),
    Cda(CdaTable),
    Growth(GrowthRateTable),
}

impl Tabular for RunTable {
    fn headers(&self) -> Vec<String> {
        match self {
            RunTable::Aggregate(t) => t.headers(),
            RunTable::Cda(t) => t.headers(),
            RunTable::Growth(t) => t.headers(),
        }
    }

    fn rows(&self) -> Vec<(RunNumber, Vec<String>)> {
        match self {
            RunTable::Aggregate(t) => t.rows(),
            RunTable::Cda(t) => t.rows(),
            RunTable::Growth(t) => t.rows(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };

    match cli.command {
        Command::Aggregate { root } => {
            let table = aggregate_directory(&root, &config, &progress)?;
            let out = OutputDir::create(&root, &config.output_folder)?;
            let summary = table.summary();
            print_written(&out.write_table(&table, output::AGGREGATE_FILE)?);
            print_written(&out.write_statistics(&summary)?);
            let report =
                BatchReport::new("aggregate", table.records().len(), table.skipped()).with_summary(summary);
            print_written(&out.write_report(&report)?);
        }
        Command::Movie { file } => {
            let evolution = describe_movie(&file, &config, &progress)?;
            let root = file.parent().unwrap_or_else(|| Path::new("."));
            let out = OutputDir::create(root, &config.output_folder)?;
            print_written(&out.write_movie(&evolution)?);
            let report = BatchReport::new("movie", evolution.frames().len(), evolution.skipped());
            print_written(&out.write_report(&report)?);
        }
        Command::Metadata { root } => {
            let metadata = extract_metadata(&root, &config.layout)?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Command::Cda { root, directions } => {
            let metadata = extract_metadata(&root, &config.layout)?;
            let table = classify_batch(&metadata, &directions, &config, &progress)?;
            for (id, count) in table.permutation_counts() {
                tracing::info!(permutation = id, runs = count, "CDA permutation count");
            }
            let out = OutputDir::create(&root, &config.output_folder)?;
            let (ratios, legend) = out.write_cda(&table)?;
            print_written(&ratios);
            print_written(&legend);
            let report = BatchReport::new("cda", table.records().len(), table.skipped());
            print_written(&out.write_report(&report)?);
        }
        Command::Growth {
            root,
            directions,
            size_files,
            supersaturations,
        } => {
            let table = if size_files.is_empty() {
                let metadata = extract_metadata(&root, &config.layout)?;
                growth_table(&metadata, &directions, &config)?
            } else {
                if directions.is_empty() {
                    bail!("--directions is required with explicit --size-file lists");
                }
                let inputs = GrowthInput::from_parallel_lists(&size_files, &supersaturations)?;
                let directions: Vec<Direction> = directions.iter().map(|d| Direction::new(d)).collect();
                growth_rates(&inputs, &directions, &config, &progress)?
            };
            let out = OutputDir::create(&root, &config.output_folder)?;
            print_written(&out.write_table(&table, output::GROWTH_FILE)?);
            let report = BatchReport::new("growth", table.records().len(), table.skipped());
            print_written(&out.write_report(&report)?);
        }
        Command::Join {
            root,
            table,
            summary,
            cda,
        } => {
            let metadata = extract_metadata(&root, &config.layout)?;
            let summary_path = summary
                .or_else(|| metadata.summary_file.clone())
                .with_context(|| format!("{}: no summary file found", root.display()))?;
            let summary = SummaryTable::read(&summary_path)?;
            let table = run_table(table, &root, &metadata, &cda, &config)?;
            let joined = join_summary(&table, &summary)?;
            if !joined.dropped().is_empty() {
                tracing::warn!(dropped = joined.dropped().len(), "runs without a summary row were left out");
            }
            let out = OutputDir::create(&root, &config.output_folder)?;
            print_written(&out.write_table(&joined, output::JOINED_FILE)?);
        }
        Command::Combine { root, left, right, cda } => {
            let metadata = extract_metadata(&root, &config.layout)?;
            let left = run_table(left, &root, &metadata, &cda, &config)?;
            let right = run_table(right, &root, &metadata, &cda, &config)?;
            let combined = combine_by_position(&left, &right)?;
            let out = OutputDir::create(&root, &config.output_folder)?;
            print_written(&out.write_table(&combined, output::COMBINED_FILE)?);
        }
    }
    Ok(())
}

fn progress(completed: usize, total: usize) {
    tracing::debug!(completed, total, "progress");
}

fn print_written(path: &Path) {
    println!("{}", path.display());
}

fn growth_table(metadata: &BatchMetadata, requested: &[String], config: &AnalysisConfig) -> Result<GrowthRateTable> {
    let directions = if requested.is_empty() {
        metadata.directions.clone()
    } else {
        requested
            .iter()
            .map(|text| {
                metadata
                    .direction(text)
                    .cloned()
                    .ok_or_else(|| ConfigurationError::UnknownDirection(text.clone()))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?
    };
    Ok(growth_rates(&GrowthInput::from_metadata(metadata), &directions, config, &progress)?)
}

fn run_table(
    kind: TableKind,
    root: &Path,
    metadata: &BatchMetadata,
    cda: &[String],
    config: &AnalysisConfig,
) -> Result<RunTable> {
    Ok(match kind {
        TableKind::Aggregate => RunTable::Aggregate(aggregate_directory(root, config, &progress)?),
        TableKind::Cda => {
            if cda.is_empty() {
                bail!("--cda <A> <B> <C> is required for the CDA table");
            }
            RunTable::Cda(classify_batch(metadata, cda, config, &progress)?)
        }
        TableKind::Growth => RunTable::Growth(growth_table(metadata, &[], config)?),
    })
}
