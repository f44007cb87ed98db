//! Tokenizer for the per-run simulation parameter log.
//!
//! The log is free-form text; only three fixed labels are read:
//!
//! | Label | Yields |
//! |-------|--------|
//! | `Starting delta mu value (kcal/mol): <float>` | supersaturation (first occurrence) |
//! | `normal, ordered or growth modifier ...` | growth-modifier flag |
//! | `Size of crystal at frame output ...` | facet table, up to the first blank line |
//!
//! Each facet-table row starts with a direction token (`1 0 0`, `-1 1 0`)
//! separated from the rest of the row by a tab or at least three spaces.

use std::path::Path;

use crate::direction::{is_index_triple, Direction};
use crate::error::{Error, FormatError, Result};

/// Label preceding the supersaturation value.
pub const SUPERSATURATION_LABEL: &str = "Starting delta mu value (kcal/mol):";

/// Label of the run-type line.
pub const GROWTH_MODIFIER_LABEL: &str = "normal, ordered or growth modifier";

/// Header introducing the facet table.
pub const FACET_TABLE_HEADER: &str = "Size of crystal at frame output";

/// Direction tokens must be shorter than this.
pub const MAX_DIRECTION_TOKEN_LEN: usize = 12;

/// Values read from one parameter log.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParameters {
    /// Starting Δμ in kcal/mol
    pub supersaturation: f64,
    /// Run used a growth modifier
    pub growth_modifier: bool,
    /// Facet directions, in table order without duplicates
    pub directions: Vec<Direction>,
}

/// Read and tokenize a parameter log.
///
/// # Errors
///
/// I/O failure, or any error from [`parse_parameters`].
pub fn read_parameters(path: &Path) -> Result<SimulationParameters> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(parse_parameters(path, &text)?)
}

/// Tokenize parameter-log text; `path` only labels errors.
///
/// # Errors
///
/// The supersaturation label is missing or its value is not a number.
pub fn parse_parameters(path: &Path, text: &str) -> std::result::Result<SimulationParameters, FormatError> {
    let lines: Vec<&str> = text.lines().collect();

    let (line_no, value) = lines
        .iter()
        .enumerate()
        .find_map(|(i, line)| labelled_value(line, SUPERSATURATION_LABEL).map(|v| (i, v)))
        .ok_or_else(|| FormatError::MissingLabel {
            path: path.to_path_buf(),
            label: SUPERSATURATION_LABEL,
        })?;
    let supersaturation = value
        .split_whitespace()
        .next()
        .and_then(|token| token.parse::<f64>().ok())
        .ok_or_else(|| FormatError::Malformed {
            path: path.to_path_buf(),
            line: line_no + 1,
            message: format!("expected a number after '{SUPERSATURATION_LABEL}', found '{}'", value.trim()),
        })?;

    let growth_modifier = lines
        .iter()
        .find_map(|line| labelled_value(line, GROWTH_MODIFIER_LABEL))
        .is_some_and(|rest| rest.contains("growth_modifier"));

    Ok(SimulationParameters {
        supersaturation,
        growth_modifier,
        directions: facet_directions(&lines),
    })
}

/// Text after `label` on a line that starts with it.
fn labelled_value<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    line.trim_start().strip_prefix(label)
}

/// Directions listed in the facet table, deduplicated in table order.
#[must_use]
pub fn facet_directions(lines: &[&str]) -> Vec<Direction> {
    let Some(header) = lines.iter().position(|l| l.contains(FACET_TABLE_HEADER)) else {
        return Vec::new();
    };

    let mut directions: Vec<Direction> = Vec::new();
    for line in lines[header + 1..].iter().take_while(|l| !l.trim().is_empty()) {
        if let Some(token) = direction_token(line) {
            let direction = Direction::new(token);
            if !directions.contains(&direction) {
                directions.push(direction);
            }
        }
    }
    directions
}

/// Leading direction field of a facet-table row, if it looks like one.
#[must_use]
pub fn direction_token(line: &str) -> Option<&str> {
    let line = line.trim_start();
    let end = [line.find('\t'), line.find("   ")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    let token = line[..end].trim_end();
    (token.len() < MAX_DIRECTION_TOKEN_LEN && is_index_triple(token)).then_some(token)
}
