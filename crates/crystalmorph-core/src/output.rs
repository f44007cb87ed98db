//! Writing tables and reports into an output folder.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::aggregate::ShapeSummary;
use crate::cda::CdaTable;
use crate::error::{Error, FormatError, Result, SkippedRun};
use crate::movie::MovieEvolution;
use crate::table::{Tabular, RUN_COLUMN};

/// Aggregate descriptor table.
pub const AGGREGATE_FILE: &str = "aggregate_shape_descriptors.csv";
/// CDA ratio table.
pub const CDA_FILE: &str = "cda_aspect_ratios.csv";
/// CDA permutation legend.
pub const PERMUTATIONS_FILE: &str = "cda_permutations.csv";
/// Growth-rate table.
pub const GROWTH_FILE: &str = "growth_rates.csv";
/// Summary-joined table.
pub const JOINED_FILE: &str = "joined_summary.csv";
/// Positionally combined table.
pub const COMBINED_FILE: &str = "combined.csv";
/// Per-column statistics of the aggregate table.
pub const STATISTICS_FILE: &str = "shape_statistics.csv";
/// Batch report.
pub const REPORT_FILE: &str = "batch_report.json";

/// Headers of [`STATISTICS_FILE`].
pub const STATISTICS_HEADERS: [&str; 6] = ["Column", "Mean", "Std Dev", "Min", "Max", "Count"];

/// Folder the pipelines write into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    /// Create `root/name` if needed.
    ///
    /// # Errors
    ///
    /// The folder cannot be created.
    pub fn create(root: &Path, name: &str) -> Result<Self> {
        let path = root.join(name);
        std::fs::create_dir_all(&path).map_err(|e| Error::io(&path, e))?;
        tracing::debug!(path = %path.display(), "output folder ready");
        Ok(Self { path })
    }

    /// Location of the folder.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of `file` inside the folder.
    #[must_use]
    pub fn file(&self, file: &str) -> PathBuf {
        self.path.join(file)
    }

    /// Write a run table as `file`.
    ///
    /// # Errors
    ///
    /// I/O or CSV failure.
    pub fn write_table(&self, table: &impl Tabular, file: &str) -> Result<PathBuf> {
        let path = self.file(file);
        write_csv(table, &path)?;
        Ok(path)
    }

    /// Write a movie evolution table named after its coordinate file.
    ///
    /// # Errors
    ///
    /// I/O or CSV failure.
    pub fn write_movie(&self, evolution: &MovieEvolution) -> Result<PathBuf> {
        let stem = evolution
            .source()
            .file_stem()
            .map_or_else(|| "movie".into(), |s| s.to_string_lossy());
        let path = self.file(&format!("{stem}_evolution.csv"));
        write_rows(&path, &evolution.headers(), evolution.rows())?;
        Ok(path)
    }

    /// Write the CDA table and its permutation legend.
    ///
    /// # Errors
    ///
    /// I/O or CSV failure.
    pub fn write_cda(&self, table: &CdaTable) -> Result<(PathBuf, PathBuf)> {
        let ratios = self.write_table(table, CDA_FILE)?;
        let legend = self.file(PERMUTATIONS_FILE);
        write_rows(
            &legend,
            &["CDA_Permutation", "Order"],
            table
                .permutations()
                .into_iter()
                .map(|p| vec![p.id.to_string(), p.describe()]),
        )?;
        Ok((ratios, legend))
    }

    /// Write per-column statistics of a descriptor summary.
    ///
    /// # Errors
    ///
    /// I/O or CSV failure.
    pub fn write_statistics(&self, summary: &ShapeSummary) -> Result<PathBuf> {
        let path = self.file(STATISTICS_FILE);
        write_rows(&path, &STATISTICS_HEADERS, summary.stats_rows())?;
        Ok(path)
    }

    /// Write the batch report as pretty JSON.
    ///
    /// # Errors
    ///
    /// I/O or serialisation failure.
    pub fn write_report(&self, report: &BatchReport) -> Result<PathBuf> {
        let path = self.file(REPORT_FILE);
        let file = std::fs::File::create(&path).map_err(|e| Error::io(&path, e))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), report).map_err(|source| Error::Json {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), processed = report.processed, skipped = report.skipped.len(), "report written");
        Ok(path)
    }
}

/// What a pipeline run processed and left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// Pipeline name, e.g. `aggregate`
    pub pipeline: String,
    /// Inputs that produced a row
    pub processed: usize,
    /// Inputs that did not, with reasons
    pub skipped: Vec<SkippedRun>,
    /// Descriptor overview, for descriptor pipelines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ShapeSummary>,
}

impl BatchReport {
    /// Report without a descriptor summary.
    pub fn new(pipeline: impl Into<String>, processed: usize, skipped: &[SkippedRun]) -> Self {
        Self {
            pipeline: pipeline.into(),
            processed,
            skipped: skipped.to_vec(),
            summary: None,
        }
    }

    /// Attach a descriptor summary.
    #[must_use]
    pub fn with_summary(mut self, summary: ShapeSummary) -> Self {
        self.summary = Some(summary);
        self
    }
}

/// Write a run table to `path`, run column first.
///
/// # Errors
///
/// I/O or CSV failure.
pub fn write_csv(table: &impl Tabular, path: &Path) -> Result<()> {
    let headers: Vec<String> = std::iter::once(RUN_COLUMN.to_string())
        .chain(table.headers())
        .collect();
    let rows = table.rows().into_iter().map(|(run, cells)| {
        std::iter::once(run.to_string()).chain(cells).collect::<Vec<_>>()
    });
    write_rows(path, &headers, rows)?;
    tracing::info!(path = %path.display(), rows = table.row_count(), "table written");
    Ok(())
}

/// Write a header row and data rows to `path`.
///
/// # Errors
///
/// I/O or CSV failure.
pub fn write_rows<H, R, C>(path: &Path, headers: &[H], rows: R) -> Result<()>
where
    H: AsRef<str>,
    R: IntoIterator<Item = Vec<C>>,
    C: AsRef<str>,
{
    let csv_err = |source: csv::Error| -> Error {
        FormatError::Csv {
            path: path.to_path_buf(),
            source,
        }
        .into()
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer
        .write_record(headers.iter().map(AsRef::as_ref))
        .map_err(csv_err)?;
    for row in rows {
        writer.write_record(row.iter().map(AsRef::as_ref)).map_err(csv_err)?;
    }
    writer.flush().map_err(|e| Error::io(path, e))
}
