//! Crystallographic direction analysis.
//!
//! Three directions `a, b, c` are selected from the batch. For each run the
//! final facet lengths of those directions are ordered shortest to longest
//! and the ordering is mapped to a fixed permutation id:
//!
//! | id | order |
//! |----|-------|
//! | 1 | a < b < c |
//! | 2 | a < c < b |
//! | 3 | b < a < c |
//! | 4 | b < c < a |
//! | 5 | c < a < b |
//! | 6 | c < b < a |
//!
//! Ties keep selection order, so equal `a` and `b` count as `a < b`.

use std::collections::HashSet;

use rayon::prelude::*;

use crate::config::AnalysisConfig;
use crate::direction::Direction;
use crate::error::{ConfigurationError, Error, FormatError, Result, SkippedRun};
use crate::facets::FacetSeries;
use crate::metadata::{BatchMetadata, RunMetadata};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::run::RunNumber;
use crate::table::{cell, Tabular};

/// Selection-index orderings, indexed by `id - 1`.
pub const PERMUTATION_ORDERS: [[usize; 3]; 6] =
    [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

/// One of the six orderings of the selected directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdaPermutation {
    /// 1-based id
    pub id: u8,
    /// Directions shortest to longest
    pub order: [Direction; 3],
}

impl CdaPermutation {
    /// `"a < b < c"` form of the order.
    #[must_use]
    pub fn describe(&self) -> String {
        let [s, m, l] = &self.order;
        format!("{s} < {m} < {l}")
    }
}

/// Ratios and permutation of one length triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Permutation id, 1 to 6
    pub permutation: u8,
    /// Shortest over middle
    pub small_medium: f64,
    /// Middle over longest
    pub medium_long: f64,
}

/// Three distinct directions chosen for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdaSelection {
    directions: [Direction; 3],
}

impl CdaSelection {
    /// Validate a selection against the batch directions.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::DirectionCount`] unless exactly three are selected
    /// - [`ConfigurationError::DuplicateDirection`] when one is selected twice
    /// - [`ConfigurationError::UnknownDirection`] when one is not in `available`
    pub fn new<S: AsRef<str>>(
        selected: &[S],
        available: &[Direction],
    ) -> std::result::Result<Self, ConfigurationError> {
        if selected.len() != 3 {
            return Err(ConfigurationError::DirectionCount(selected.len()));
        }
        let mut seen = HashSet::new();
        for text in selected {
            let direction = Direction::new(text.as_ref());
            if !seen.insert(direction) {
                return Err(ConfigurationError::DuplicateDirection(text.as_ref().trim().to_string()));
            }
        }

        let resolve = |text: &str| {
            available
                .iter()
                .find(|d| d.matches(text))
                .cloned()
                .ok_or_else(|| ConfigurationError::UnknownDirection(text.trim().to_string()))
        };
        Ok(Self {
            directions: [
                resolve(selected[0].as_ref())?,
                resolve(selected[1].as_ref())?,
                resolve(selected[2].as_ref())?,
            ],
        })
    }

    /// Selected directions, in selection order.
    #[must_use]
    pub fn directions(&self) -> &[Direction; 3] {
        &self.directions
    }

    /// The six permutations in id order.
    #[must_use]
    pub fn permutations(&self) -> Vec<CdaPermutation> {
        (1u8..)
            .zip(PERMUTATION_ORDERS)
            .map(|(id, order)| CdaPermutation {
                id,
                order: order.map(|i| self.directions[i].clone()),
            })
            .collect()
    }

    /// Classify lengths given in selection order.
    #[must_use]
    pub fn classify(&self, lengths: [f64; 3]) -> Classification {
        classify(lengths)
    }
}

/// Order `lengths` (in selection order) and derive ratios and permutation id.
#[must_use]
pub fn classify(lengths: [f64; 3]) -> Classification {
    let mut order = [0, 1, 2];
    // Stable: ties keep selection order
    order.sort_by(|&i, &j| lengths[i].total_cmp(&lengths[j]));

    let permutation = (1u8..)
        .zip(PERMUTATION_ORDERS)
        .find_map(|(id, candidate)| (candidate == order).then_some(id))
        .unwrap_or(1);
    let [s, m, l] = order.map(|i| lengths[i]);

    Classification {
        permutation,
        small_medium: s / m,
        medium_long: m / l,
    }
}

/// CDA result of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct CdaRow {
    /// Simulation number
    pub run: RunNumber,
    /// Final length of every batch direction (NaN when the run lacks it)
    pub lengths: Vec<f64>,
    /// Ratios and permutation of the selected directions
    pub classification: Classification,
}

/// CDA table of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CdaTable {
    directions: Vec<Direction>,
    selection: CdaSelection,
    rows: Vec<CdaRow>,
    skipped: Vec<SkippedRun>,
}

impl CdaTable {
    /// Rows sorted by run number.
    #[must_use]
    pub fn records(&self) -> &[CdaRow] {
        &self.rows
    }

    /// Runs that were left out.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedRun] {
        &self.skipped
    }

    /// The selection this table was classified with.
    #[must_use]
    pub fn selection(&self) -> &CdaSelection {
        &self.selection
    }

    /// Batch directions, in column order.
    #[must_use]
    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    /// The six permutations, for the `CDA_Permutation, Order` side table.
    #[must_use]
    pub fn permutations(&self) -> Vec<CdaPermutation> {
        self.selection.permutations()
    }

    /// Number of runs assigned to each permutation id, in id order.
    #[must_use]
    pub fn permutation_counts(&self) -> [(u8, usize); 6] {
        let mut counts = [(1, 0), (2, 0), (3, 0), (4, 0), (5, 0), (6, 0)];
        for row in &self.rows {
            let id = usize::from(row.classification.permutation);
            if let Some(slot) = counts.get_mut(id.wrapping_sub(1)) {
                slot.1 += 1;
            }
        }
        counts
    }
}

impl Tabular for CdaTable {
    fn headers(&self) -> Vec<String> {
        self.directions
            .iter()
            .map(|d| d.label().to_string())
            .chain(["S/M", "M/L", "CDA_Permutation"].map(String::from))
            .collect()
    }

    fn rows(&self) -> Vec<(RunNumber, Vec<String>)> {
        self.rows
            .iter()
            .map(|row| {
                let cells = row
                    .lengths
                    .iter()
                    .map(|&v| cell(v))
                    .chain([
                        cell(row.classification.small_medium),
                        cell(row.classification.medium_long),
                        row.classification.permutation.to_string(),
                    ])
                    .collect();
                (row.run, cells)
            })
            .collect()
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Classify every run of a batch.
///
/// Each run's size file is re-read and its final row taken. Runs whose
/// selected lengths are missing, non-finite or not positive are skipped.
///
/// # Errors
///
/// Invalid selection, worker pool failure, or no run could be classified.
pub fn classify_batch<S: AsRef<str>>(
    metadata: &BatchMetadata,
    selected: &[S],
    config: &AnalysisConfig,
    progress: &dyn ProgressSink,
) -> Result<CdaTable> {
    let selection = CdaSelection::new(selected, &metadata.directions)?;
    tracing::info!(
        runs = metadata.runs.len(),
        a = %selection.directions[0],
        b = %selection.directions[1],
        c = %selection.directions[2],
        "classifying CDA permutations"
    );

    let tracker = ProgressTracker::new(progress, metadata.runs.len());
    let outcomes: Vec<std::result::Result<CdaRow, SkippedRun>> = config.install(|| {
        metadata
            .runs
            .par_iter()
            .map(|run| {
                let outcome = cda_row(run, &metadata.directions, &selection)
                    .map_err(|e| SkippedRun::new(&run.size_file, Some(run.run), &e));
                tracker.tick();
                outcome
            })
            .collect()
    })?;

    let mut rows = Vec::new();
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(row) => rows.push(row),
            Err(skip) => {
                tracing::warn!(path = %skip.path.display(), reason = %skip.reason, "skipped run");
                skipped.push(skip);
            }
        }
    }
    rows.sort_by_key(|r| r.run);

    if rows.is_empty() {
        return Err(Error::NothingProcessed { skipped });
    }
    tracing::info!(classified = rows.len(), skipped = skipped.len(), "CDA finished");
    Ok(CdaTable {
        directions: metadata.directions.clone(),
        selection,
        rows,
        skipped,
    })
}

fn cda_row(run: &RunMetadata, directions: &[Direction], selection: &CdaSelection) -> Result<CdaRow> {
    let series = FacetSeries::read(&run.size_file)?;
    let lengths: Vec<f64> = directions
        .iter()
        .map(|d| series.final_length(d).unwrap_or(f64::NAN))
        .collect();

    let mut selected = [0.0; 3];
    for (slot, direction) in selected.iter_mut().zip(selection.directions()) {
        let value = series.final_length(direction).ok_or_else(|| FormatError::MissingColumn {
            path: run.size_file.clone(),
            column: direction.label().to_string(),
        })?;
        if !(value.is_finite() && value > 0.0) {
            return Err(FormatError::Malformed {
                path: run.size_file.clone(),
                line: series.len() + 1,
                message: format!("final length of '{direction}' is {value}, expected a positive number"),
            }
            .into());
        }
        *slot = value;
    }

    Ok(CdaRow {
        run: run.run,
        lengths,
        classification: selection.classify(selected),
    })
}
