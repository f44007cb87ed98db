//! Simulation numbers.
//!
//! Every run in a batch is identified by a 1-based "Simulation Number". The
//! number comes from the last integer token in the file or folder name, so
//! `batch_007/run_12.xyz` is run 12. Names without digits are numbered after
//! the largest parsed number, in the order they were discovered.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 1-based simulation number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunNumber(u32);

impl RunNumber {
    /// Create a run number.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Raw value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RunNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Last maximal run of ASCII digits in `name`, if any and if it fits a `u32`.
#[must_use]
pub fn last_integer_token(name: &str) -> Option<u32> {
    let bytes = name.as_bytes();
    let end = bytes.iter().rposition(u8::is_ascii_digit)? + 1;
    let start = bytes[..end]
        .iter()
        .rposition(|b| !b.is_ascii_digit())
        .map_or(0, |i| i + 1);
    name[start..end].parse().ok()
}

/// Assign a run number to every name, in input order.
///
/// Names carrying an integer token keep it. The rest are numbered
/// consecutively after the largest parsed number, in input order. A name whose
/// token is `0` gets `None`: it has no valid simulation number. Duplicates
/// are returned as-is; callers decide which occurrence wins.
#[must_use]
pub fn assign_run_numbers<S: AsRef<str>>(names: &[S]) -> Vec<Option<RunNumber>> {
    let parsed: Vec<Option<u32>> = names.iter().map(|n| last_integer_token(n.as_ref())).collect();
    let mut next = parsed.iter().flatten().max().copied().unwrap_or(0);

    parsed
        .into_iter()
        .map(|token| match token {
            Some(0) => None,
            Some(n) => Some(RunNumber(n)),
            None => {
                next += 1;
                Some(RunNumber(next))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_integer_token() {
        assert_eq!(last_integer_token("run_12"), Some(12));
        assert_eq!(last_integer_token("batch3_run_007"), Some(7));
        assert_eq!(last_integer_token("42"), Some(42));
        assert_eq!(last_integer_token("x9y"), Some(9));
        assert_eq!(last_integer_token("no_digits"), None);
        assert_eq!(last_integer_token(""), None);
        assert_eq!(last_integer_token("run_99999999999"), None);
    }

    #[test]
    fn test_assign_run_numbers_mixed() {
        let names = ["crystal", "run_3", "run_1", "other"];
        let runs: Vec<u32> = assign_run_numbers(&names).into_iter().flatten().map(RunNumber::get).collect();
        assert_eq!(runs, vec![4, 3, 1, 5]);
    }

    #[test]
    fn test_assign_run_numbers_without_digits_starts_at_one() {
        let runs = assign_run_numbers(&["a", "b"]);
        assert_eq!(runs, vec![Some(RunNumber::new(1)), Some(RunNumber::new(2))]);
    }

    #[test]
    fn test_zero_token_has_no_run_number() {
        let runs = assign_run_numbers(&["sim_0", "sim_1", "sim_00", "extra"]);
        assert_eq!(runs, vec![None, Some(RunNumber::new(1)), None, Some(RunNumber::new(2))]);
    }

    #[test]
    fn test_run_number_order_and_display() {
        assert!(RunNumber::new(2) < RunNumber::new(10));
        assert_eq!(RunNumber::new(17).to_string(), "17");
        assert_eq!(serde_json::to_string(&RunNumber::new(5)).unwrap(), "5");
    }
}
