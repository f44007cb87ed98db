//! Facet growth and dissolution rates.
//!
//! For every run and requested direction a least-squares line is fitted to
//! facet length against time. The slope is the rate: positive for growth,
//! negative for dissolution.

use std::path::{Path, PathBuf};

use morph_geom::LinearFit;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::{AnalysisConfig, FailurePolicy};
use crate::direction::Direction;
use crate::error::{ConfigurationError, Error, FormatError, JoinError, Result, SkippedRun};
use crate::facets::FacetSeries;
use crate::metadata::BatchMetadata;
use crate::progress::{ProgressSink, ProgressTracker};
use crate::run::{assign_run_numbers, RunNumber};
use crate::table::{cell, Tabular};

/// Header of the supersaturation column.
pub const SUPERSATURATION_COLUMN: &str = "Supersaturation";

/// One run to fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthInput {
    /// Run number
    pub run: RunNumber,
    /// Facet-length time series
    pub size_file: PathBuf,
    /// Driving force of the run
    pub supersaturation: f64,
}

impl GrowthInput {
    /// Pair size files with supersaturations by position.
    ///
    /// Run numbers come from the name of each size file's folder.
    ///
    /// # Errors
    ///
    /// - [`JoinError::LengthMismatch`] when the lists differ in length
    /// - [`FormatError::ZeroRunNumber`] when a size file is numbered 0
    pub fn from_parallel_lists(size_files: &[PathBuf], supersaturations: &[f64]) -> Result<Vec<Self>> {
        if size_files.len() != supersaturations.len() {
            return Err(JoinError::LengthMismatch {
                what: "size files and supersaturations",
                left: size_files.len(),
                right: supersaturations.len(),
            }
            .into());
        }
        let names: Vec<String> = size_files.iter().map(|p| run_name(p)).collect();
        assign_run_numbers(&names)
            .into_iter()
            .zip(size_files.iter().zip(supersaturations))
            .map(|(run, (size_file, &supersaturation))| -> Result<Self> {
                let run = run.ok_or_else(|| FormatError::ZeroRunNumber {
                    path: size_file.clone(),
                })?;
                Ok(Self {
                    run,
                    size_file: size_file.clone(),
                    supersaturation,
                })
            })
            .collect()
    }

    /// Every run of an extracted batch.
    #[must_use]
    pub fn from_metadata(metadata: &BatchMetadata) -> Vec<Self> {
        metadata
            .runs
            .iter()
            .map(|r| Self {
                run: r.run,
                size_file: r.size_file.clone(),
                supersaturation: r.supersaturation,
            })
            .collect()
    }
}

fn run_name(size_file: &Path) -> String {
    size_file
        .parent()
        .and_then(Path::file_name)
        .or_else(|| size_file.file_stem())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Fitted rates of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthRateRow {
    /// Run number
    pub run: RunNumber,
    /// Driving force of the run
    pub supersaturation: f64,
    /// Rate per requested direction, in request order
    pub rates: Vec<f64>,
}

/// Growth rates of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthRateTable {
    directions: Vec<Direction>,
    rows: Vec<GrowthRateRow>,
    skipped: Vec<SkippedRun>,
}

impl GrowthRateTable {
    /// Requested directions, in column order.
    #[must_use]
    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    /// Fitted runs, sorted by run number.
    #[must_use]
    pub fn records(&self) -> &[GrowthRateRow] {
        &self.rows
    }

    /// Runs left out under [`FailurePolicy::Skip`].
    #[must_use]
    pub fn skipped(&self) -> &[SkippedRun] {
        &self.skipped
    }

    /// Rows ordered by supersaturation, run order kept among equals.
    #[must_use]
    pub fn sorted_by_supersaturation(&self) -> Vec<&GrowthRateRow> {
        let mut rows: Vec<&GrowthRateRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| a.supersaturation.total_cmp(&b.supersaturation));
        rows
    }

    /// Rate of `direction` in `run`.
    #[must_use]
    pub fn rate(&self, run: RunNumber, direction: &Direction) -> Option<f64> {
        let column = self.directions.iter().position(|d| d == direction)?;
        let row = self.rows.binary_search_by_key(&run, |r| r.run).ok()?;
        self.rows[row].rates.get(column).copied()
    }
}

impl Tabular for GrowthRateTable {
    fn headers(&self) -> Vec<String> {
        std::iter::once(SUPERSATURATION_COLUMN.to_string())
            .chain(self.directions.iter().map(|d| d.label().to_string()))
            .collect()
    }

    fn rows(&self) -> Vec<(RunNumber, Vec<String>)> {
        self.rows
            .iter()
            .map(|row| {
                let cells = std::iter::once(cell(row.supersaturation))
                    .chain(row.rates.iter().copied().map(cell))
                    .collect();
                (row.run, cells)
            })
            .collect()
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Fit growth rates for every input.
///
/// Runs are fitted in parallel. Under [`FailurePolicy::Abort`] the first
/// failure in input order is returned; under [`FailurePolicy::Skip`] failed
/// runs are recorded and left out.
///
/// # Errors
///
/// No directions requested, a failure under `Abort`, or no run fitted.
pub fn growth_rates(
    inputs: &[GrowthInput],
    directions: &[Direction],
    config: &AnalysisConfig,
    progress: &dyn ProgressSink,
) -> Result<GrowthRateTable> {
    if directions.is_empty() {
        return Err(ConfigurationError::NoDirections.into());
    }
    let policy = config.growth_failure;
    tracing::info!(runs = inputs.len(), directions = directions.len(), ?policy, "fitting growth rates");

    let tracker = ProgressTracker::new(progress, inputs.len());
    let outcomes: Vec<Result<GrowthRateRow>> = config.install(|| {
        inputs
            .par_iter()
            .map(|input| {
                let outcome = fit_run(input, directions);
                tracker.tick();
                outcome
            })
            .collect()
    })?;

    let mut rows = Vec::new();
    let mut skipped = Vec::new();
    for (input, outcome) in inputs.iter().zip(outcomes) {
        match outcome {
            Ok(row) => rows.push(row),
            Err(e) if policy == FailurePolicy::Abort => return Err(e),
            Err(e) => {
                tracing::warn!(path = %input.size_file.display(), error = %e, "skipped run");
                skipped.push(SkippedRun::new(&input.size_file, Some(input.run), &e));
            }
        }
    }
    rows.sort_by_key(|r| r.run);

    if rows.is_empty() {
        return Err(Error::NothingProcessed { skipped });
    }
    tracing::info!(fitted = rows.len(), skipped = skipped.len(), "growth rates finished");
    Ok(GrowthRateTable {
        directions: directions.to_vec(),
        rows,
        skipped,
    })
}

fn fit_run(input: &GrowthInput, directions: &[Direction]) -> Result<GrowthRateRow> {
    let series = FacetSeries::read(&input.size_file)?;
    let rates = directions
        .iter()
        .map(|direction| {
            let lengths = series.column(direction).ok_or_else(|| FormatError::MissingColumn {
                path: input.size_file.clone(),
                column: direction.label().to_string(),
            })?;
            LinearFit::fit(series.times(), lengths)
                .map(|fit| fit.slope)
                .map_err(|source| Error::Fit {
                    path: input.size_file.clone(),
                    direction: direction.label().to_string(),
                    source,
                })
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok(GrowthRateRow {
        run: input.run,
        supersaturation: input.supersaturation,
        rates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::tests::helpers::write_growth_series;
    use proptest::prelude::*;

    fn dirs(labels: &[&str]) -> Vec<Direction> {
        labels.iter().map(|l| Direction::new(l)).collect()
    }

    #[test]
    fn test_growth_and_dissolution() {
        let dir = tempfile::tempdir().unwrap();
        let size_file = write_growth_series(
            &dir.path().join("run_4"),
            &["1 0 0", "0 0 1"],
            &[2.5, -0.5],
            &[0.0, 1.0, 3.0, 3.5, 10.0],
        );
        let inputs = GrowthInput::from_parallel_lists(&[size_file], &[1.2]).unwrap();
        assert_eq!(inputs[0].run, RunNumber::new(4));

        let table = growth_rates(&inputs, &dirs(&["1 0 0", "0 0 1"]), &AnalysisConfig::default(), &NoProgress).unwrap();
        let rates = &table.records()[0].rates;
        assert!((rates[0] - 2.5).abs() < 1e-9);
        assert!((rates[1] + 0.5).abs() < 1e-9);
        assert_eq!(table.headers(), vec!["Supersaturation", "1 0 0", "0 0 1"]);
        assert_eq!(table.rows()[0].1[0], "1.2");
    }

    #[test]
    fn test_parallel_lists_must_match() {
        let err = GrowthInput::from_parallel_lists(&[PathBuf::from("a/run_1_size.csv")], &[]).unwrap_err();
        assert!(matches!(err, Error::Join(JoinError::LengthMismatch { left: 1, right: 0, .. })));

        let zero = [PathBuf::from("run_0/run_0_size.csv"), PathBuf::from("run_1/run_1_size.csv")];
        let err = GrowthInput::from_parallel_lists(&zero, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::ZeroRunNumber { .. })));
    }

    #[test]
    fn test_no_directions() {
        let err = growth_rates(&[], &[], &AnalysisConfig::default(), &NoProgress).unwrap_err();
        assert!(matches!(err, Error::Configuration(ConfigurationError::NoDirections)));
    }

    #[test]
    fn test_failure_policies() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_growth_series(&dir.path().join("run_1"), &["1 1 1"], &[1.0], &[0.0, 1.0, 2.0]);
        let constant_time = write_growth_series(&dir.path().join("run_2"), &["1 1 1"], &[1.0], &[5.0, 5.0, 5.0]);
        let missing = dir.path().join("run_3").join("run_3_size.csv");
        let inputs =
            GrowthInput::from_parallel_lists(&[good, constant_time.clone(), missing], &[0.1, 0.2, 0.3]).unwrap();
        let directions = dirs(&["1 1 1"]);

        let table = growth_rates(&inputs, &directions, &AnalysisConfig::default(), &NoProgress).unwrap();
        assert_eq!(table.records().len(), 1);
        assert_eq!(table.skipped().len(), 2);
        assert_eq!(table.skipped()[0].path, constant_time);

        let abort = AnalysisConfig {
            growth_failure: FailurePolicy::Abort,
            ..AnalysisConfig::default()
        };
        let err = growth_rates(&inputs, &directions, &abort, &NoProgress).unwrap_err();
        assert!(matches!(err, Error::Fit { ref direction, .. } if direction == "1 1 1"));
    }

    #[test]
    fn test_missing_direction_column() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_growth_series(&dir.path().join("run_1"), &["1 0 0"], &[1.0], &[0.0, 1.0]);
        let inputs = GrowthInput::from_parallel_lists(&[file], &[0.0]).unwrap();
        let err = growth_rates(&inputs, &dirs(&["0 1 0"]), &AnalysisConfig::default(), &NoProgress).unwrap_err();
        let Error::NothingProcessed { skipped } = err else {
            panic!("expected NothingProcessed");
        };
        assert!(skipped[0].reason.contains("0 1 0"));
    }

    #[test]
    fn test_sorted_by_supersaturation_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (1..=4)
            .map(|i| write_growth_series(&dir.path().join(format!("run_{i}")), &["1 0 0"], &[f64::from(i)], &[0.0, 1.0]))
            .collect();
        let inputs = GrowthInput::from_parallel_lists(&files, &[0.3, 0.1, 0.3, 0.2]).unwrap();
        let table = growth_rates(&inputs, &dirs(&["1 0 0"]), &AnalysisConfig::default(), &NoProgress).unwrap();

        let order: Vec<u32> = table.sorted_by_supersaturation().iter().map(|r| r.run.get()).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
        let rate = table.rate(RunNumber::new(3), &Direction::new("1  0 0")).unwrap();
        assert!((rate - 3.0).abs() < 1e-9);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_irregular_sampling_recovers_rate(
            rate in -20.0f64..20.0,
            gaps in proptest::collection::vec(0.05f64..5.0, 2..20),
        ) {
            let times: Vec<f64> = gaps.iter().scan(0.0, |t, g| { *t += g; Some(*t) }).collect();
            let dir = tempfile::tempdir().unwrap();
            let file = write_growth_series(&dir.path().join("run_1"), &["1 0 0"], &[rate], &times);
            let inputs = GrowthInput::from_parallel_lists(&[file], &[1.0]).unwrap();
            let table = growth_rates(&inputs, &dirs(&["1 0 0"]), &AnalysisConfig::default(), &NoProgress).unwrap();
            prop_assert!((table.records()[0].rates[0] - rate).abs() < 1e-6 * rate.abs().max(1.0));
        }
    }
}
