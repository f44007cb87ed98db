//! Facet-length time series (`*size.csv`).
//!
//! One `time` column plus one column per facet direction. Direction headers
//! may carry leading spaces (`" 1 0 0"`); they are matched on their
//! normalised form. Columns that are neither `time` nor a direction are
//! ignored.

use std::path::{Path, PathBuf};

use csv::ReaderBuilder;

use crate::direction::{is_index_triple, Direction};
use crate::error::FormatError;

/// Name of the time column (case-insensitive).
pub const TIME_COLUMN: &str = "time";

/// Parsed facet-length table of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetSeries {
    path: PathBuf,
    times: Vec<f64>,
    columns: Vec<(Direction, Vec<f64>)>,
}

impl FacetSeries {
    /// Read a facet-length CSV.
    ///
    /// Empty cells become NaN and are skipped by downstream fits.
    ///
    /// # Errors
    ///
    /// Unreadable CSV, missing `time` column, non-numeric cell, or no rows.
    pub fn read(path: &Path) -> Result<Self, FormatError> {
        let csv_err = |source: csv::Error| FormatError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(csv_err)?;

        let headers = reader.headers().map_err(csv_err)?.clone();
        let time_index = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(TIME_COLUMN))
            .ok_or_else(|| FormatError::MissingColumn {
                path: path.to_path_buf(),
                column: TIME_COLUMN.to_string(),
            })?;
        let direction_indices: Vec<(usize, Direction)> = headers
            .iter()
            .enumerate()
            .filter(|&(i, h)| i != time_index && is_index_triple(h))
            .map(|(i, h)| (i, Direction::new(h)))
            .collect();

        let mut times = Vec::new();
        let mut columns: Vec<(Direction, Vec<f64>)> = direction_indices
            .iter()
            .map(|(_, d)| (d.clone(), Vec::new()))
            .collect();

        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            let line = record.position().map_or(0, csv::Position::line);
            let cell = |index: usize| -> Result<f64, FormatError> {
                let text = record.get(index).unwrap_or("").trim();
                if text.is_empty() {
                    return Ok(f64::NAN);
                }
                text.parse().map_err(|_| FormatError::Malformed {
                    path: path.to_path_buf(),
                    line: usize::try_from(line).unwrap_or(usize::MAX),
                    message: format!("non-numeric cell '{text}' in column {}", index + 1),
                })
            };

            times.push(cell(time_index)?);
            for ((index, _), (_, values)) in direction_indices.iter().zip(columns.iter_mut()) {
                values.push(cell(*index)?);
            }
        }

        if times.is_empty() {
            return Err(FormatError::Empty {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            times,
            columns,
        })
    }

    /// File this series was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sample times.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Directions present, in column order.
    pub fn directions(&self) -> impl Iterator<Item = &Direction> {
        self.columns.iter().map(|(d, _)| d)
    }

    /// Length series of one direction.
    #[must_use]
    pub fn column(&self, direction: &Direction) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(d, _)| d == direction)
            .map(|(_, values)| values.as_slice())
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// No samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Final-row length of every direction.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(Direction, f64)> {
        self.columns
            .iter()
            .map(|(d, values)| (d.clone(), values.last().copied().unwrap_or(f64::NAN)))
            .collect()
    }

    /// Final-row length of one direction.
    #[must_use]
    pub fn final_length(&self, direction: &Direction) -> Option<f64> {
        self.column(direction).and_then(|values| values.last().copied())
    }
}
