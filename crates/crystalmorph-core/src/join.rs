//! Joining run tables with each other and with the batch summary.
//!
//! Two strategies, deliberately kept apart:
//!
//! - [`join_summary`] reconstructs each run's summary key
//!   `"{prefix}_{run - 1 + start}"` and inner-joins on it.
//! - [`combine_by_position`] zips two run tables row by row and only checks
//!   that the run numbers agree; it never rebuilds keys.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;

use crate::error::{FormatError, JoinError};
use crate::run::RunNumber;
use crate::table::{JoinedTable, Tabular};

/// `"{prefix}_{index}"` key of the summary table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SummaryKey {
    /// Batch prefix, may itself contain underscores
    pub prefix: String,
    /// Run index within the batch
    pub index: u64,
}

impl SummaryKey {
    /// Split `key` at its last underscore.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        let (prefix, index) = key.trim().rsplit_once('_')?;
        Some(Self {
            prefix: prefix.to_string(),
            index: index.parse().ok()?,
        })
    }
}

impl std::fmt::Display for SummaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.prefix, self.index)
    }
}

/// Externally supplied per-run summary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryTable {
    path: PathBuf,
    headers: Vec<String>,
    first: SummaryKey,
    rows: HashMap<String, Vec<String>>,
}

impl SummaryTable {
    /// Read a summary CSV whose first column holds the run keys.
    ///
    /// # Errors
    ///
    /// Unreadable CSV, no data rows, or a first key that is not
    /// `<prefix>_<index>`.
    pub fn read(path: &Path) -> Result<Self, FormatError> {
        let csv_err = |source: csv::Error| FormatError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(csv_err)?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut first = None;
        let mut rows = HashMap::new();
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            let cells: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();
            let Some(key) = cells.first().cloned() else {
                continue;
            };
            if first.is_none() {
                let line = record.position().map_or(2, csv::Position::line);
                first = Some(SummaryKey::parse(&key).ok_or_else(|| FormatError::Malformed {
                    path: path.to_path_buf(),
                    line: usize::try_from(line).unwrap_or(usize::MAX),
                    message: format!("summary key '{key}' is not of the form <prefix>_<index>"),
                })?);
            }
            rows.entry(key).or_insert(cells);
        }

        let first = first.ok_or_else(|| FormatError::Empty {
            path: path.to_path_buf(),
        })?;
        tracing::debug!(path = %path.display(), rows = rows.len(), first = %first, "summary table read");
        Ok(Self {
            path: path.to_path_buf(),
            headers,
            first,
            rows,
        })
    }

    /// File the table was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Column headers, key column included.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Key of the first data row: batch prefix and starting index.
    #[must_use]
    pub fn first_key(&self) -> &SummaryKey {
        &self.first
    }

    /// Reconstructed key of `run`: run 1 maps to the first data row's key.
    ///
    /// # Errors
    ///
    /// [`JoinError::ZeroRun`] for run 0, which would otherwise share run 1's key.
    pub fn key_for(&self, run: RunNumber) -> Result<String, JoinError> {
        let offset = u64::from(run.get()).checked_sub(1).ok_or(JoinError::ZeroRun)?;
        Ok(format!("{}_{}", self.first.prefix, self.first.index + offset))
    }

    /// Row stored under `key`, key cell included.
    #[must_use]
    pub fn row(&self, key: &str) -> Option<&[String]> {
        self.rows.get(key).map(Vec::as_slice)
    }
}

/// Inner-join a run table with the summary table on reconstructed keys.
///
/// Rows without a summary row are dropped and listed in
/// [`JoinedTable::dropped`].
///
/// # Errors
///
/// - [`JoinError::ZeroRun`] when the table carries run 0
/// - [`JoinError::Empty`] when no row matched
pub fn join_summary(table: &impl Tabular, summary: &SummaryTable) -> Result<JoinedTable, JoinError> {
    let mut rows = Vec::new();
    let mut dropped = Vec::new();
    for (run, mut cells) in table.rows() {
        let key = summary.key_for(run)?;
        match summary.row(&key) {
            Some(extra) => {
                cells.extend_from_slice(extra);
                rows.push((run, cells));
            }
            None => {
                tracing::warn!(%run, key = %key, "no summary row; dropping run");
                dropped.push(key);
            }
        }
    }

    if rows.is_empty() {
        return Err(JoinError::Empty { dropped });
    }
    rows.sort_by_key(|(run, _)| *run);

    let mut headers = table.headers();
    headers.extend_from_slice(summary.headers());
    tracing::info!(joined = rows.len(), dropped = dropped.len(), "summary join finished");
    Ok(JoinedTable {
        headers,
        rows,
        dropped,
    })
}

/// Concatenate two run tables row by row.
///
/// # Errors
///
/// Different row counts, or different runs at the same position.
pub fn combine_by_position(left: &impl Tabular, right: &impl Tabular) -> Result<JoinedTable, JoinError> {
    let mut left_rows = left.rows();
    let mut right_rows = right.rows();
    if left_rows.len() != right_rows.len() {
        return Err(JoinError::LengthMismatch {
            what: "rows",
            left: left_rows.len(),
            right: right_rows.len(),
        });
    }
    left_rows.sort_by_key(|(run, _)| *run);
    right_rows.sort_by_key(|(run, _)| *run);

    let rows = left_rows
        .into_iter()
        .zip(right_rows)
        .enumerate()
        .map(|(position, ((l_run, mut cells), (r_run, extra)))| {
            if l_run != r_run {
                return Err(JoinError::RunMismatch {
                    position,
                    left: l_run,
                    right: r_run,
                });
            }
            cells.extend(extra);
            Ok((l_run, cells))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut headers = left.headers();
    headers.extend(right.headers());
    Ok(JoinedTable {
        headers,
        rows,
        dropped: Vec::new(),
    })
}
