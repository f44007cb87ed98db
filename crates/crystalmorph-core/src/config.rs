//! Analysis configuration.
//!
//! Every field has a default, so an empty JSON object `{}` is a valid config
//! and reproduces the built-in behaviour.

use std::path::Path;

use bitflags::bitflags;
use morph_geom::DescriptorOptions;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Error, Result};

/// File and folder naming conventions of a simulation batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchLayout {
    /// Suffix identifying the facet-length time series in a run folder
    pub size_file_suffix: String,
    /// Suffix identifying the parameter log in a run folder
    pub parameter_file_suffix: String,
    /// Run folders whose names end with one of these are ignored
    pub excluded_folder_suffixes: Vec<String>,
    /// Summary table expected at the batch root
    pub summary_file_name: String,
}

impl Default for BatchLayout {
    fn default() -> Self {
        Self {
            size_file_suffix: "size.csv".to_string(),
            parameter_file_suffix: "simulation_parameters.txt".to_string(),
            excluded_folder_suffixes: ["_outputs", "_XYZ_files", "_CDA", "_growth_rates"]
                .into_iter()
                .map(String::from)
                .collect(),
            summary_file_name: "summary.csv".to_string(),
        }
    }
}

impl BatchLayout {
    /// The folder is an output folder rather than a run folder.
    #[must_use]
    pub fn is_excluded_folder(&self, name: &str) -> bool {
        self.excluded_folder_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
    }
}

/// What to do when a frame's convex hull cannot be built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HullPolicy {
    /// Skip the run
    #[default]
    Strict,
    /// Keep the run with the hull columns left empty
    Tolerant,
}

/// What to do when one run of a batch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and carry on
    #[default]
    Skip,
    /// Stop at the first failure
    Abort,
}

bitflags! {
    /// Column groups written to aggregate and movie tables.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ColumnGroups: u8 {
        /// Axis-aligned extents
        const OBA = 1 << 0;
        /// PCA singular values
        const PCA = 1 << 1;
        /// Extents along the principal axes
        const ALIGNED = 1 << 2;
        /// Convex-hull area and volume
        const HULL = 1 << 3;
    }
}

impl Default for ColumnGroups {
    fn default() -> Self {
        Self::OBA | Self::PCA | Self::HULL
    }
}

/// Everything a pipeline run can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Batch naming conventions
    pub layout: BatchLayout,
    /// Descriptor knobs (PCA normalisation)
    pub descriptor: DescriptorOptions,
    /// Hull failure handling in the aggregator and movie evolution
    pub hull_policy: HullPolicy,
    /// Per-run failure handling in the growth-rate engine
    pub growth_failure: FailurePolicy,
    /// Columns written to aggregate tables
    pub columns: ColumnGroups,
    /// Worker count; `None` uses rayon's global pool
    pub threads: Option<usize>,
    /// Output folder created under the batch root
    pub output_folder: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            layout: BatchLayout::default(),
            descriptor: DescriptorOptions::default(),
            hull_policy: HullPolicy::default(),
            growth_failure: FailurePolicy::default(),
            columns: ColumnGroups::default(),
            threads: None,
            output_folder: "morphology_outputs".to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Load a config from a JSON file.
    ///
    /// # Errors
    ///
    /// I/O failure or invalid JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| {
            ConfigurationError::Parse {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
    }

    /// Run `op` on a pool of `threads` workers, or on the global pool.
    ///
    /// # Errors
    ///
    /// The dedicated pool could not be created.
    pub fn install<R, F>(&self, op: F) -> Result<R>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match self.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| ConfigurationError::ThreadPool(e.to_string()))?;
                Ok(pool.install(op))
            }
            None => Ok(op()),
        }
    }
}
