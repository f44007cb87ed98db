//! Multi-run aggregation.
//!
//! Each coordinate file of a batch is parsed and described independently on
//! the rayon pool. Per-file outcomes are collected as
//! `Result<RunRecord, SkippedRun>` and reduced once, then sorted by run
//! number, so the table never depends on completion order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::DVec3;
use morph_geom::{
    describe_axes, DescriptorOptions, GeomError, HullMeasure, ScalarStats, ShapeClass, ShapeDescriptor,
};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::{AnalysisConfig, ColumnGroups, HullPolicy};
use crate::error::{Error, FormatError, Result, SkippedRun};
use crate::frame::{is_coordinate_file, parse_coordinate_file};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::run::{assign_run_numbers, RunNumber};
use crate::table::{cell, descriptor_cells, descriptor_headers, Tabular};

/// One successfully described run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    /// Simulation number
    pub run: RunNumber,
    /// Coordinate file
    pub source: PathBuf,
    /// Frame the descriptor was computed from (0 for single-frame files)
    pub frame_index: usize,
    /// Shape of that frame
    pub descriptor: ShapeDescriptor,
}

/// Descriptor table of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    records: Vec<RunRecord>,
    skipped: Vec<SkippedRun>,
    columns: ColumnGroups,
}

impl AggregateTable {
    /// Records sorted by run number.
    #[must_use]
    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    /// Files that were left out, sorted by path.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedRun] {
        &self.skipped
    }

    /// Column groups written by [`Tabular`].
    #[must_use]
    pub fn columns(&self) -> ColumnGroups {
        self.columns
    }

    /// Same rows, different column selection.
    #[must_use]
    pub fn with_columns(mut self, columns: ColumnGroups) -> Self {
        self.columns = columns;
        self
    }

    /// Record of one run.
    #[must_use]
    pub fn record(&self, run: RunNumber) -> Option<&RunRecord> {
        self.records
            .binary_search_by_key(&run, |r| r.run)
            .ok()
            .map(|i| &self.records[i])
    }

    /// Shape-class counts and per-column statistics.
    #[must_use]
    pub fn summary(&self) -> ShapeSummary {
        ShapeSummary::from_descriptors(self.records.iter().map(|r| &r.descriptor))
    }
}

impl Tabular for AggregateTable {
    fn headers(&self) -> Vec<String> {
        descriptor_headers(self.columns)
    }

    fn rows(&self) -> Vec<(RunNumber, Vec<String>)> {
        self.records
            .iter()
            .map(|r| (r.run, descriptor_cells(&r.descriptor, self.columns)))
            .collect()
    }

    fn row_count(&self) -> usize {
        self.records.len()
    }
}

/// Describe one frame, applying the hull policy.
///
/// # Errors
///
/// Any PCA failure, and hull failures under [`HullPolicy::Strict`].
pub fn describe_frame(
    points: &[DVec3],
    options: &DescriptorOptions,
    policy: HullPolicy,
) -> std::result::Result<ShapeDescriptor, GeomError> {
    let axes = describe_axes(points, options)?;
    match (HullMeasure::compute(points), policy) {
        (Ok(hull), _) => Ok(ShapeDescriptor::new(axes, hull)),
        (Err(e), HullPolicy::Tolerant) => {
            tracing::warn!(error = %e, "hull failed; keeping row without hull columns");
            Ok(ShapeDescriptor::without_hull(axes))
        }
        (Err(e), HullPolicy::Strict) => Err(e),
    }
}

/// Coordinate files under `root`, recursively, sorted by path.
///
/// # Errors
///
/// A directory cannot be listed.
pub fn discover_coordinate_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).map_err(|e| Error::io(&dir, e))? {
            let path = entry.map_err(|e| Error::io(&dir, e))?.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_coordinate_file(&path) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Aggregate every coordinate file under `root`.
///
/// # Errors
///
/// See [`aggregate_files`].
pub fn aggregate_directory(
    root: &Path,
    config: &AnalysisConfig,
    progress: &dyn ProgressSink,
) -> Result<AggregateTable> {
    let files = discover_coordinate_files(root)?;
    tracing::info!(root = %root.display(), files = files.len(), "discovered coordinate files");
    aggregate_files(&files, config, progress)
}

/// Aggregate an explicit list of coordinate files.
///
/// Run numbers come from the file stems, in list order. A file whose run
/// number was already taken by an earlier file is skipped, and so is a file
/// numbered 0.
///
/// # Errors
///
/// Worker pool creation failed, or no file could be described.
pub fn aggregate_files(
    files: &[PathBuf],
    config: &AnalysisConfig,
    progress: &dyn ProgressSink,
) -> Result<AggregateTable> {
    let stems: Vec<String> = files.iter().map(|p| stem(p)).collect();
    let numbers = assign_run_numbers(&stems);

    let mut first_owner: HashMap<RunNumber, &Path> = HashMap::new();
    let mut jobs = Vec::new();
    let mut rejected = Vec::new();
    for (path, run) in files.iter().zip(numbers) {
        let Some(run) = run else {
            let zero = Error::from(FormatError::ZeroRunNumber { path: path.clone() });
            rejected.push(SkippedRun::new(path, None, &zero));
            continue;
        };
        if let Some(owner) = first_owner.get(&run) {
            rejected.push(SkippedRun {
                path: path.clone(),
                run: Some(run),
                reason: format!("duplicate run number {run} (already used by {})", owner.display()),
            });
        } else {
            first_owner.insert(run, path);
            jobs.push((path.as_path(), run));
        }
    }

    let tracker = ProgressTracker::new(progress, files.len());
    for _ in &rejected {
        tracker.tick();
    }

    let outcomes: Vec<std::result::Result<RunRecord, SkippedRun>> = config.install(|| {
        jobs.par_iter()
            .map(|&(path, run)| {
                let outcome = describe_file(path, run, config)
                    .map_err(|e| SkippedRun::new(path, Some(run), &e));
                tracker.tick();
                outcome
            })
            .collect()
    })?;

    let (mut records, mut skipped): (Vec<_>, Vec<_>) = (Vec::new(), rejected);
    for outcome in outcomes {
        match outcome {
            Ok(record) => records.push(record),
            Err(skip) => skipped.push(skip),
        }
    }
    records.sort_by_key(|r| r.run);
    skipped.sort_by(|a, b| a.path.cmp(&b.path));

    for skip in &skipped {
        tracing::warn!(path = %skip.path.display(), reason = %skip.reason, "skipped coordinate file");
    }
    tracing::info!(processed = records.len(), skipped = skipped.len(), "aggregation finished");

    if records.is_empty() {
        return Err(Error::NothingProcessed { skipped });
    }
    Ok(AggregateTable {
        records,
        skipped,
        columns: config.columns,
    })
}

fn describe_file(path: &Path, run: RunNumber, config: &AnalysisConfig) -> Result<RunRecord> {
    let data = parse_coordinate_file(path)?;
    let frame_index = data.frame_count().saturating_sub(1);
    let frame = data.final_frame().ok_or_else(|| FormatError::Empty {
        path: path.to_path_buf(),
    })?;
    let descriptor = describe_frame(frame.points(), &config.descriptor, config.hull_policy)
        .map_err(|e| Error::geometry(path, e))?;
    tracing::debug!(path = %path.display(), %run, points = frame.len(), "described");
    Ok(RunRecord {
        run,
        source: path.to_path_buf(),
        frame_index,
        descriptor,
    })
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// =============================================================================
// Batch summary
// =============================================================================

/// Number of runs in each shape class for one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeCounts {
    /// `OBA`, `PCA` or `Aligned`
    pub method: String,
    /// Count per class, in [`ShapeClass::ALL`] order
    pub counts: Vec<(ShapeClass, usize)>,
}

/// Statistics of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    /// Column header
    pub column: String,
    /// Mean, variance and range across runs
    pub stats: ScalarStats,
}

/// Batch-level overview of a descriptor table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeSummary {
    /// Runs summarised
    pub runs: usize,
    /// Shape classes per method
    pub shape_counts: Vec<ShapeCounts>,
    /// Statistics per numeric column; missing hull values are not counted
    pub columns: Vec<ColumnStats>,
}

impl ShapeSummary {
    /// Summarise a set of descriptors.
    pub fn from_descriptors<'a>(descriptors: impl IntoIterator<Item = &'a ShapeDescriptor>) -> Self {
        let descriptors: Vec<&ShapeDescriptor> = descriptors.into_iter().collect();

        let methods: [(&str, fn(&ShapeDescriptor) -> ShapeClass); 3] = [
            ("OBA", |d| d.oba.shape),
            ("PCA", |d| d.pca.shape),
            ("Aligned", |d| d.aligned.shape),
        ];
        let shape_counts = methods
            .iter()
            .map(|(method, class_of)| ShapeCounts {
                method: (*method).to_string(),
                counts: ShapeClass::ALL
                    .iter()
                    .map(|&class| (class, descriptors.iter().filter(|d| class_of(d) == class).count()))
                    .collect(),
            })
            .collect();

        let numeric: [(&str, fn(&ShapeDescriptor) -> f64); 12] = [
            ("OBA Length X", |d| d.oba.lengths[0]),
            ("OBA Length Y", |d| d.oba.lengths[1]),
            ("OBA Length Z", |d| d.oba.lengths[2]),
            ("OBA S:M", |d| d.oba.aspect.small_medium),
            ("OBA M:L", |d| d.oba.aspect.medium_long),
            ("PCA small", |d| d.pca.lengths[0]),
            ("PCA medium", |d| d.pca.lengths[1]),
            ("PCA long", |d| d.pca.lengths[2]),
            ("PCA S:M", |d| d.pca.aspect.small_medium),
            ("PCA M:L", |d| d.pca.aspect.medium_long),
            ("Surface Area", |d| d.hull.map_or(f64::NAN, |h| h.surface_area)),
            ("Volume", |d| d.hull.map_or(f64::NAN, |h| h.volume)),
        ];
        let columns = numeric
            .iter()
            .map(|(column, value_of)| ColumnStats {
                column: (*column).to_string(),
                stats: ScalarStats::from_values(descriptors.iter().map(|d| value_of(d))),
            })
            .collect();

        Self {
            runs: descriptors.len(),
            shape_counts,
            columns,
        }
    }

    /// Count of `class` under `method`.
    #[must_use]
    pub fn count(&self, method: &str, class: ShapeClass) -> usize {
        self.shape_counts
            .iter()
            .find(|c| c.method == method)
            .and_then(|c| c.counts.iter().find(|(k, _)| *k == class))
            .map_or(0, |(_, n)| *n)
    }

    /// Statistics of one column.
    #[must_use]
    pub fn column(&self, header: &str) -> Option<&ScalarStats> {
        self.columns
            .iter()
            .find(|c| c.column == header)
            .map(|c| &c.stats)
    }

    /// Rows of `Column, Mean, Std Dev, Min, Max, Count` for CSV output.
    #[must_use]
    pub fn stats_rows(&self) -> Vec<Vec<String>> {
        self.columns
            .iter()
            .map(|c| {
                vec![
                    c.column.clone(),
                    cell(c.stats.mean),
                    cell(c.stats.std_dev()),
                    cell(c.stats.min),
                    cell(c.stats.max),
                    c.stats.sample_count.to_string(),
                ]
            })
            .collect()
    }
}
