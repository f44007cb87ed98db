//! Run-metadata extraction.
//!
//! A batch root holds one folder per run:
//!
//! ```text
//! batch/
//!   summary.csv                      optional, see `join`
//!   run_1/
//!     ..._size.csv                   facet lengths vs time
//!     ..._simulation_parameters.txt  parameter log
//!   run_2/ ...
//!   batch_XYZ_files/                 output folders are ignored
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::BatchLayout;
use crate::direction::Direction;
use crate::error::{Error, FormatError, Result, SkippedRun};
use crate::params::read_parameters;
use crate::run::{assign_run_numbers, RunNumber};

/// What one run folder declares.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    /// Simulation number
    pub run: RunNumber,
    /// Run folder
    pub folder: PathBuf,
    /// Starting Δμ in kcal/mol
    pub supersaturation: f64,
    /// Facet-length time series
    pub size_file: PathBuf,
    /// Run used a growth modifier
    pub growth_modifier: bool,
    /// Directions in this run's facet table
    pub directions: Vec<Direction>,
}

/// Metadata of every usable run in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchMetadata {
    /// Batch root
    pub root: PathBuf,
    /// Usable runs, sorted by run number
    pub runs: Vec<RunMetadata>,
    /// Batch directions, first-seen order
    pub directions: Vec<Direction>,
    /// Any run used a growth modifier
    pub growth_modifier: bool,
    /// Summary table at the root, if present
    pub summary_file: Option<PathBuf>,
    /// Folders that could not be used
    pub skipped: Vec<SkippedRun>,
}

impl BatchMetadata {
    /// Supersaturation of each run, in run order.
    #[must_use]
    pub fn supersaturations(&self) -> Vec<f64> {
        self.runs.iter().map(|r| r.supersaturation).collect()
    }

    /// Size file of each run, in run order.
    #[must_use]
    pub fn size_files(&self) -> Vec<&Path> {
        self.runs.iter().map(|r| r.size_file.as_path()).collect()
    }

    /// Folder of each run, in run order.
    #[must_use]
    pub fn subfolders(&self) -> Vec<&Path> {
        self.runs.iter().map(|r| r.folder.as_path()).collect()
    }

    /// Metadata of one run.
    #[must_use]
    pub fn run(&self, run: RunNumber) -> Option<&RunMetadata> {
        self.runs.iter().find(|r| r.run == run)
    }

    /// The batch direction named by `text`, ignoring spacing.
    #[must_use]
    pub fn direction(&self, text: &str) -> Option<&Direction> {
        self.directions.iter().find(|d| d.matches(text))
    }
}

/// Scan a batch root for run folders and read their metadata.
///
/// Folders without a usable size file or parameter log are skipped and
/// recorded; the batch fails only when no folder is usable.
///
/// # Errors
///
/// The root cannot be listed, or no run folder is usable.
pub fn extract_metadata(root: &Path, layout: &BatchLayout) -> Result<BatchMetadata> {
    tracing::info!(root = %root.display(), "extracting run metadata");

    let folders = run_folders(root, layout)?;
    let names: Vec<String> = folders.iter().map(|f| file_name(f)).collect();
    let numbers = assign_run_numbers(&names);

    let mut runs = Vec::new();
    let mut skipped = Vec::new();
    let mut taken = HashSet::new();
    for (folder, run) in folders.into_iter().zip(numbers) {
        let Some(run) = run else {
            tracing::warn!(folder = %folder.display(), "run number 0");
            let zero = Error::from(FormatError::ZeroRunNumber { path: folder.clone() });
            skipped.push(SkippedRun::new(folder, None, &zero));
            continue;
        };
        if !taken.insert(run) {
            tracing::warn!(folder = %folder.display(), %run, "duplicate run number");
            skipped.push(SkippedRun {
                path: folder,
                run: Some(run),
                reason: format!("duplicate run number {run}"),
            });
            continue;
        }
        match read_run(&folder, run, layout) {
            Ok(metadata) => runs.push(metadata),
            Err(e) => {
                tracing::warn!(folder = %folder.display(), %run, error = %e, "skipping run folder");
                skipped.push(SkippedRun::new(folder, Some(run), &e));
            }
        }
    }

    if runs.is_empty() {
        return Err(Error::NothingProcessed { skipped });
    }
    runs.sort_by_key(|r| r.run);

    let directions = merge_directions(&runs);
    let growth_modifier = runs.iter().any(|r| r.growth_modifier);
    let summary_file = Some(root.join(&layout.summary_file_name)).filter(|p| p.is_file());

    tracing::info!(
        runs = runs.len(),
        skipped = skipped.len(),
        directions = directions.len(),
        "run metadata extracted"
    );

    Ok(BatchMetadata {
        root: root.to_path_buf(),
        runs,
        directions,
        growth_modifier,
        summary_file,
        skipped,
    })
}

/// Immediate subfolders of `root` that are not output folders, sorted by name.
///
/// # Errors
///
/// The root cannot be listed.
pub fn run_folders(root: &Path, layout: &BatchLayout) -> Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    for entry in std::fs::read_dir(root).map_err(|e| Error::io(root, e))? {
        let path = entry.map_err(|e| Error::io(root, e))?.path();
        if path.is_dir() && !layout.is_excluded_folder(&file_name(&path)) {
            folders.push(path);
        }
    }
    folders.sort();
    Ok(folders)
}

fn read_run(folder: &Path, run: RunNumber, layout: &BatchLayout) -> Result<RunMetadata> {
    let size_file = find_file(folder, &layout.size_file_suffix)?.ok_or_else(|| {
        FormatError::MissingFile {
            folder: folder.to_path_buf(),
            suffix: layout.size_file_suffix.clone(),
        }
    })?;
    let size_len = std::fs::metadata(&size_file)
        .map_err(|e| Error::io(&size_file, e))?
        .len();
    if size_len == 0 {
        return Err(FormatError::Empty { path: size_file }.into());
    }

    let params_file = find_file(folder, &layout.parameter_file_suffix)?.ok_or_else(|| {
        FormatError::MissingFile {
            folder: folder.to_path_buf(),
            suffix: layout.parameter_file_suffix.clone(),
        }
    })?;
    let params = read_parameters(&params_file)?;

    Ok(RunMetadata {
        run,
        folder: folder.to_path_buf(),
        supersaturation: params.supersaturation,
        size_file,
        growth_modifier: params.growth_modifier,
        directions: params.directions,
    })
}

/// First file in `folder` (by name) whose name ends with `suffix`.
fn find_file(folder: &Path, suffix: &str) -> Result<Option<PathBuf>> {
    let mut matches = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(|e| Error::io(folder, e))? {
        let path = entry.map_err(|e| Error::io(folder, e))?.path();
        if path.is_file() && file_name(&path).ends_with(suffix) {
            matches.push(path);
        }
    }
    matches.sort();
    Ok(matches.into_iter().next())
}

/// Union of run directions in first-seen order; disagreement is only logged.
fn merge_directions(runs: &[RunMetadata]) -> Vec<Direction> {
    let mut directions: Vec<Direction> = Vec::new();
    let Some(first) = runs.first() else {
        return directions;
    };
    for run in runs {
        if run.directions != first.directions {
            tracing::warn!(
                run = %run.run,
                first = %first.run,
                "facet directions differ from the first run; keeping first-seen order"
            );
        }
        for direction in &run.directions {
            if !directions.contains(direction) {
                directions.push(direction.clone());
            }
        }
    }
    directions
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
