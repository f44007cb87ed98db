//! # Crystalmorph Core
//!
//! Batch morphology analysis for crystal-growth simulations.
//!
//! A batch is a root folder of run folders. Each run carries a parameter log,
//! a facet-length time series and optionally coordinate files. This crate
//! turns a batch into tables:
//!
//! - **Aggregate**: one shape descriptor per coordinate file
//! - **Movie**: one shape descriptor per frame of a movie file
//! - **Metadata**: supersaturation, size file and directions per run
//! - **CDA**: aspect ratios and ordering of three selected directions
//! - **Growth**: facet growth rates from the size time series
//! - **Join**: any run table joined with the batch summary, or with another
//!   run table by position
//!
//! Per-file work runs on rayon; outputs are sorted by run number afterwards,
//! so they never depend on completion order.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crystalmorph_core::{aggregate_directory, AnalysisConfig, NoProgress, OutputDir};
//!
//! let config = AnalysisConfig::default();
//! let table = aggregate_directory(root, &config, &NoProgress)?;
//! let out = OutputDir::create(root, &config.output_folder)?;
//! out.write_table(&table, crystalmorph_core::output::AGGREGATE_FILE)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export the descriptor engine
pub use morph_geom;

pub mod aggregate;
pub mod cda;
pub mod config;
pub mod direction;
pub mod error;
pub mod facets;
pub mod frame;
pub mod growth;
pub mod join;
pub mod metadata;
pub mod movie;
pub mod output;
pub mod params;
pub mod progress;
pub mod run;
pub mod table;

#[cfg(test)]
mod tests;

pub use aggregate::{aggregate_directory, aggregate_files, AggregateTable, RunRecord, ShapeSummary};
pub use cda::{classify_batch, CdaSelection, CdaTable, Classification};
pub use config::{AnalysisConfig, BatchLayout, ColumnGroups, FailurePolicy, HullPolicy};
pub use direction::Direction;
pub use error::{ConfigurationError, Error, FormatError, JoinError, Result, SkippedRun};
pub use frame::{parse_coordinate_file, CoordinateData, Frame};
pub use growth::{growth_rates, GrowthInput, GrowthRateTable};
pub use join::{combine_by_position, join_summary, SummaryTable};
pub use metadata::{extract_metadata, BatchMetadata, RunMetadata};
pub use movie::{describe_movie, MovieEvolution};
pub use output::{BatchReport, OutputDir};
pub use progress::{NoProgress, ProgressSink};
pub use run::RunNumber;
pub use table::{JoinedTable, Tabular};
