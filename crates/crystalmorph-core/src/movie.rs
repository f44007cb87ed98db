//! Shape evolution across the frames of a movie file.

use std::path::{Path, PathBuf};

use morph_geom::ShapeDescriptor;
use rayon::prelude::*;

use crate::aggregate::describe_frame;
use crate::config::{AnalysisConfig, ColumnGroups};
use crate::error::{Error, Result, SkippedRun};
use crate::frame::parse_coordinate_file;
use crate::progress::{ProgressSink, ProgressTracker};
use crate::table::{descriptor_cells, descriptor_headers};

/// Header of the frame column.
pub const FRAME_COLUMN: &str = "Frame";

/// Descriptor of one movie frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    /// 0-based frame index
    pub frame: usize,
    /// Shape of that frame
    pub descriptor: ShapeDescriptor,
}

/// Per-frame descriptors of one coordinate file.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieEvolution {
    source: PathBuf,
    frames: Vec<FrameRecord>,
    skipped: Vec<SkippedRun>,
    columns: ColumnGroups,
}

impl MovieEvolution {
    /// Coordinate file.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Described frames, in frame order.
    #[must_use]
    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    /// Frames that could not be described.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedRun] {
        &self.skipped
    }

    /// Table headers, starting with [`FRAME_COLUMN`].
    #[must_use]
    pub fn headers(&self) -> Vec<String> {
        std::iter::once(FRAME_COLUMN.to_string())
            .chain(descriptor_headers(self.columns))
            .collect()
    }

    /// Table rows matching [`MovieEvolution::headers`].
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.frames
            .iter()
            .map(|f| {
                std::iter::once(f.frame.to_string())
                    .chain(descriptor_cells(&f.descriptor, self.columns))
                    .collect()
            })
            .collect()
    }
}

/// Describe every frame of a coordinate file.
///
/// A single-frame file yields one row. Frames whose descriptor fails are
/// recorded and left out.
///
/// # Errors
///
/// The file cannot be parsed, or no frame could be described.
pub fn describe_movie(
    path: &Path,
    config: &AnalysisConfig,
    progress: &dyn ProgressSink,
) -> Result<MovieEvolution> {
    let data = parse_coordinate_file(path)?;
    let frames: Vec<_> = data.frames().collect();
    tracing::info!(path = %path.display(), frames = frames.len(), "describing movie frames");

    let tracker = ProgressTracker::new(progress, frames.len());
    let outcomes: Vec<std::result::Result<FrameRecord, SkippedRun>> = config.install(|| {
        frames
            .par_iter()
            .map(|&(index, frame)| {
                let outcome = describe_frame(frame.points(), &config.descriptor, config.hull_policy)
                    .map(|descriptor| FrameRecord {
                        frame: index,
                        descriptor,
                    })
                    .map_err(|e| SkippedRun {
                        path: path.to_path_buf(),
                        run: None,
                        reason: format!("frame {index}: {e}"),
                    });
                tracker.tick();
                outcome
            })
            .collect()
    })?;

    let mut records = Vec::new();
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(record) => records.push(record),
            Err(skip) => {
                tracing::warn!(reason = %skip.reason, "skipped movie frame");
                skipped.push(skip);
            }
        }
    }
    records.sort_by_key(|r| r.frame);

    if records.is_empty() {
        return Err(Error::NothingProcessed { skipped });
    }
    Ok(MovieEvolution {
        source: path.to_path_buf(),
        frames: records,
        skipped,
        columns: config.columns,
    })
}
