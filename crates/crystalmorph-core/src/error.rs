//! Error taxonomy for the morphology pipelines.
//!
//! - [`FormatError`]: malformed coordinate, parameter, size or summary file
//! - [`Error::Geometry`]: degenerate point set for hull/PCA
//! - [`JoinError`]: key reconstruction or row alignment failed
//! - [`ConfigurationError`]: unusable direction selection or config file
//!
//! Every variant that concerns a file or key carries it, so a failure can be
//! acted on without re-running the batch.

use std::path::PathBuf;

use morph_geom::{FitError, GeomError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::run::RunNumber;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed input file.
#[derive(Debug, Error)]
pub enum FormatError {
    /// File extension is not a supported coordinate format.
    #[error("{path}: unsupported coordinate format (expected .xyz)")]
    UnsupportedFormat {
        /// Offending file
        path: PathBuf,
    },

    /// A line could not be interpreted.
    #[error("{path}:{line}: {message}")]
    Malformed {
        /// Offending file
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What was wrong with it
        message: String,
    },

    /// A declared count runs past the end of the file.
    #[error("{path}: file ends at line {line} but {expected} was expected")]
    UnexpectedEof {
        /// Offending file
        path: PathBuf,
        /// Number of lines in the file
        line: usize,
        /// What the parser was looking for
        expected: String,
    },

    /// Movie header declares a different number of frames than present.
    #[error("{path}: header declares {declared} frames but {found} were parsed")]
    FrameCount {
        /// Offending file
        path: PathBuf,
        /// Count in the `//<N>` header
        declared: usize,
        /// Frames actually parsed
        found: usize,
    },

    /// A fixed label line is absent.
    #[error("{path}: missing '{label}' line")]
    MissingLabel {
        /// Offending file
        path: PathBuf,
        /// The label that was searched for
        label: &'static str,
    },

    /// A run folder lacks a required file.
    #[error("{folder}: no file ending with '{suffix}'")]
    MissingFile {
        /// Run folder
        folder: PathBuf,
        /// Expected file-name suffix
        suffix: String,
    },

    /// A required CSV column is absent.
    #[error("{path}: missing column '{column}'")]
    MissingColumn {
        /// Offending file
        path: PathBuf,
        /// Column name
        column: String,
    },

    /// The name's integer token is 0; simulation numbers start at 1.
    #[error("{path}: run number 0 is not a valid simulation number (runs start at 1)")]
    ZeroRunNumber {
        /// Offending file or folder
        path: PathBuf,
    },

    /// The file holds no usable data.
    #[error("{path}: file is empty")]
    Empty {
        /// Offending file
        path: PathBuf,
    },

    /// Low-level CSV failure.
    #[error("{path}: {source}")]
    Csv {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        source: csv::Error,
    },
}

/// Rows could not be aligned.
#[derive(Debug, Error)]
pub enum JoinError {
    /// No row survived the join.
    #[error("join matched no rows ({} reconstructed keys had no summary row)", .dropped.len())]
    Empty {
        /// Keys that found no match
        dropped: Vec<String>,
    },

    /// Two inputs that must align one-to-one have different lengths.
    #[error("cannot align {left} {what} with {right}")]
    LengthMismatch {
        /// What is being aligned
        what: &'static str,
        /// Length of the left input
        left: usize,
        /// Length of the right input
        right: usize,
    },

    /// Run 0 has no key in a 1-based summary table.
    #[error("run 0 has no summary key (runs start at 1)")]
    ZeroRun,

    /// Positional combine found different runs at the same position.
    #[error("row {position}: left table has run {left} but right table has run {right}")]
    RunMismatch {
        /// 0-based row position
        position: usize,
        /// Run on the left
        left: RunNumber,
        /// Run on the right
        right: RunNumber,
    },
}

/// Unusable analysis set-up.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// CDA needs exactly three directions.
    #[error("CDA needs exactly 3 directions, got {0}")]
    DirectionCount(usize),

    /// A direction appears twice in a CDA selection.
    #[error("direction '{0}' is selected more than once")]
    DuplicateDirection(String),

    /// A requested direction is not declared by the batch.
    #[error("direction '{0}' is not declared by this batch")]
    UnknownDirection(String),

    /// Growth-rate analysis was asked for no directions.
    #[error("no directions requested")]
    NoDirections,

    /// Config file could not be parsed.
    #[error("config {path}: {source}")]
    Parse {
        /// Config file
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },

    /// Worker pool could not be created.
    #[error("cannot build worker pool: {0}")]
    ThreadPool(String),
}

/// Top-level error for every pipeline in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input file.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Degenerate geometry in one frame.
    #[error("{path}: {source}")]
    Geometry {
        /// Source of the frame
        path: PathBuf,
        /// Underlying error
        source: GeomError,
    },

    /// Growth-rate line fit failed.
    #[error("{path}: cannot fit direction '{direction}': {source}")]
    Fit {
        /// Size file
        path: PathBuf,
        /// Direction column
        direction: String,
        /// Underlying error
        source: FitError,
    },

    /// Rows could not be aligned.
    #[error(transparent)]
    Join(#[from] JoinError),

    /// Unusable analysis set-up.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Every input of a batch failed.
    #[error("no input could be processed ({} skipped)", .skipped.len())]
    NothingProcessed {
        /// Why each input was skipped
        skipped: Vec<SkippedRun>,
    },

    /// I/O failure on a path.
    #[error("{path}: {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// JSON serialisation failure.
    #[error("{path}: {source}")]
    Json {
        /// Path being written
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
}

impl Error {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach a path to a geometry error.
    pub fn geometry(path: impl Into<PathBuf>, source: GeomError) -> Self {
        Error::Geometry {
            path: path.into(),
            source,
        }
    }
}

/// Record of one input that a batch pipeline left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRun {
    /// File or folder that failed
    pub path: PathBuf,
    /// Run number, when it was known
    pub run: Option<RunNumber>,
    /// Human-readable reason
    pub reason: String,
}

impl SkippedRun {
    /// Build a record from an error.
    pub fn new(path: impl Into<PathBuf>, run: Option<RunNumber>, error: &Error) -> Self {
        Self {
            path: path.into(),
            run,
            reason: error.to_string(),
        }
    }
}
