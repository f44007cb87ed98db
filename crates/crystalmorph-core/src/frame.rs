//! Coordinate file parser.
//!
//! An `.xyz` file holds either one frame:
//!
//! ```text
//! 3                 <- point count
//! comment
//! 1 1 0  0.0 0.0 0.0   <- 3 metadata fields, then x y z
//! 2 1 0  1.0 0.0 0.0
//! 3 1 0  0.0 1.0 0.0
//! ```
//!
//! or a movie, flagged by `//<N>` on line 2, made of `N` blocks of
//! `count, [comment], records`. A file is first read as a single frame; only
//! if that fails and line 2 carries the marker is it re-read as a movie.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glam::DVec3;

use crate::error::{FormatError, Result};
use crate::progress::{NoProgress, ProgressSink};

/// Extension of coordinate files.
pub const COORDINATE_EXTENSION: &str = "xyz";

/// Minimum fields per record: three metadata fields plus x, y, z.
pub const MIN_RECORD_FIELDS: usize = 6;

/// Points of one frame, with the metadata fields that preceded each.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    metadata: Vec<[f64; 3]>,
    points: Vec<DVec3>,
}

impl Frame {
    /// Frame with zeroed metadata.
    #[must_use]
    pub fn from_points(points: Vec<DVec3>) -> Self {
        Self {
            metadata: vec![[0.0; 3]; points.len()],
            points,
        }
    }

    /// Point positions.
    #[must_use]
    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    /// Leading metadata fields, one triple per point.
    #[must_use]
    pub fn metadata(&self) -> &[[f64; 3]] {
        &self.metadata
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// No points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Contents of a coordinate file.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateData {
    /// A single frame
    Single(Frame),
    /// Frames of a movie, keyed by 0-based frame index
    Movie(BTreeMap<usize, Frame>),
}

impl CoordinateData {
    /// Number of frames.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Movie(frames) => frames.len(),
        }
    }

    /// Whether the file was a movie.
    #[must_use]
    pub fn is_movie(&self) -> bool {
        matches!(self, Self::Movie(_))
    }

    /// The frame that represents the finished crystal: the only frame, or
    /// the last frame of a movie.
    #[must_use]
    pub fn final_frame(&self) -> Option<&Frame> {
        match self {
            Self::Single(frame) => Some(frame),
            Self::Movie(frames) => frames.values().next_back(),
        }
    }

    /// Every frame with its index.
    pub fn frames(&self) -> Box<dyn Iterator<Item = (usize, &Frame)> + '_> {
        match self {
            Self::Single(frame) => Box::new(std::iter::once((0, frame))),
            Self::Movie(frames) => Box::new(frames.iter().map(|(&i, f)| (i, f))),
        }
    }
}

/// The path has the coordinate extension (case-insensitive).
#[must_use]
pub fn is_coordinate_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(COORDINATE_EXTENSION))
}

/// Parse a coordinate file.
///
/// # Errors
///
/// Unsupported extension, unreadable file or malformed content.
pub fn parse_coordinate_file(path: &Path) -> Result<CoordinateData> {
    parse_coordinate_file_with_progress(path, &NoProgress)
}

/// Parse a coordinate file, reporting `(frames parsed, frames declared)` to
/// `progress` for movies.
///
/// # Errors
///
/// See [`parse_coordinate_file`].
pub fn parse_coordinate_file_with_progress(
    path: &Path,
    progress: &dyn ProgressSink,
) -> Result<CoordinateData> {
    if !is_coordinate_file(path) {
        return Err(FormatError::UnsupportedFormat {
            path: path.to_path_buf(),
        }
        .into());
    }
    let text = std::fs::read_to_string(path).map_err(|e| crate::Error::io(path, e))?;
    Ok(parse_coordinates(path, &text, progress)?)
}

/// Parse coordinate text; `path` is only used in error messages.
///
/// # Errors
///
/// Malformed content.
pub fn parse_coordinates(
    path: &Path,
    text: &str,
    progress: &dyn ProgressSink,
) -> std::result::Result<CoordinateData, FormatError> {
    let mut cursor = Cursor::new(path, text);
    match cursor.single() {
        Ok(frame) => Ok(CoordinateData::Single(frame)),
        Err(single_err) => match movie_frame_count(cursor.lines.get(1).copied()) {
            Some(declared) => {
                tracing::debug!(path = %path.display(), declared, "reading as movie");
                cursor.movie(declared, progress).map(CoordinateData::Movie)
            }
            None => Err(single_err),
        },
    }
}

/// `N` from a `//<N>` marker in the comment line.
fn movie_frame_count(comment: Option<&str>) -> Option<usize> {
    let (_, rest) = comment?.split_once("//")?;
    let rest = rest.trim_start();
    let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    rest[..digits].parse().ok()
}

struct Cursor<'a> {
    path: PathBuf,
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(path: &Path, text: &'a str) -> Self {
        Self {
            path: path.to_path_buf(),
            lines: text.lines().collect(),
            pos: 0,
        }
    }

    fn malformed(&self, line: usize, message: impl Into<String>) -> FormatError {
        FormatError::Malformed {
            path: self.path.clone(),
            line: line + 1,
            message: message.into(),
        }
    }

    fn eof(&self, expected: impl Into<String>) -> FormatError {
        FormatError::UnexpectedEof {
            path: self.path.clone(),
            line: self.lines.len(),
            expected: expected.into(),
        }
    }

    fn skip_blank(&mut self) {
        while self.lines.get(self.pos).is_some_and(|l| l.trim().is_empty()) {
            self.pos += 1;
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_blank();
        self.pos >= self.lines.len()
    }

    fn count(&mut self) -> std::result::Result<usize, FormatError> {
        let line = *self.lines.get(self.pos).ok_or_else(|| self.eof("a point count"))?;
        let count = line
            .trim()
            .parse()
            .map_err(|_| self.malformed(self.pos, format!("expected a point count, found '{}'", line.trim())))?;
        self.pos += 1;
        Ok(count)
    }

    fn records(&mut self, count: usize) -> std::result::Result<Frame, FormatError> {
        let mut metadata = Vec::with_capacity(count.min(self.lines.len()));
        let mut points = Vec::with_capacity(count.min(self.lines.len()));
        for i in 0..count {
            let line = *self
                .lines
                .get(self.pos)
                .ok_or_else(|| self.eof(format!("record {} of {count}", i + 1)))?;
            let (meta, point) = parse_record(line).map_err(|msg| self.malformed(self.pos, msg))?;
            metadata.push(meta);
            points.push(point);
            self.pos += 1;
        }
        Ok(Frame { metadata, points })
    }

    fn single(&mut self) -> std::result::Result<Frame, FormatError> {
        self.pos = 0;
        if self.at_end() {
            return Err(FormatError::Empty {
                path: self.path.clone(),
            });
        }
        let count = self.count()?;
        if self.pos >= self.lines.len() {
            return Err(self.eof("a comment line"));
        }
        self.pos += 1;
        let frame = self.records(count)?;
        if !self.at_end() {
            return Err(self.malformed(self.pos, format!("unexpected content after {count} records")));
        }
        Ok(frame)
    }

    fn movie(
        &mut self,
        declared: usize,
        progress: &dyn ProgressSink,
    ) -> std::result::Result<BTreeMap<usize, Frame>, FormatError> {
        self.pos = 0;
        let mut frames = BTreeMap::new();
        for index in 0..declared {
            if self.at_end() {
                return Err(FormatError::FrameCount {
                    path: self.path.clone(),
                    declared,
                    found: index,
                });
            }
            let count = self.count()?;
            if index == 0 {
                // Line 2 holds the movie marker
                self.pos += 1;
            } else if self
                .lines
                .get(self.pos)
                .is_some_and(|l| count > 0 && parse_record(l).is_err())
            {
                self.pos += 1;
            }
            frames.insert(index, self.records(count)?);
            progress.report(index + 1, declared);
        }
        if !self.at_end() {
            return Err(self.malformed(
                self.pos,
                format!("content after the {declared} declared frames"),
            ));
        }
        Ok(frames)
    }
}

fn parse_record(line: &str) -> std::result::Result<([f64; 3], DVec3), String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < MIN_RECORD_FIELDS {
        return Err(format!(
            "expected at least {MIN_RECORD_FIELDS} fields, found {}",
            fields.len()
        ));
    }
    let mut values = [0.0; MIN_RECORD_FIELDS];
    for (value, field) in values.iter_mut().zip(&fields) {
        *value = field
            .parse()
            .map_err(|_| format!("non-numeric field '{field}'"))?;
    }
    Ok((
        [values[0], values[1], values[2]],
        DVec3::new(values[3], values[4], values[5]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn parse(text: &str) -> std::result::Result<CoordinateData, FormatError> {
        parse_coordinates(Path::new("test.xyz"), text, &NoProgress)
    }

    const SINGLE: &str = "4\ncrystal\n\
        1 1 0 0.0 0.0 0.0\n\
        2 1 0 2.0 0.0 0.0\n\
        3 1 0 0.0 2.0 0.0\n\
        4 1 0 0.0 0.0 2.0\n";

    const MOVIE: &str = "2\nframes //3\n\
        1 1 0 0.0 0.0 0.0\n\
        2 1 0 1.0 0.0 0.0\n\
        3\n\
        1 1 0 0.0 0.0 0.0\n\
        2 1 0 1.0 0.0 0.0\n\
        3 1 0 0.0 1.0 0.0\n\
        1\ntime 2.5\n\
        1 1 0 5.0 5.0 5.0\n";

    #[test]
    fn test_single_frame() {
        let data = parse(SINGLE).unwrap();
        assert!(!data.is_movie());
        let frame = data.final_frame().unwrap();
        assert_eq!(frame.len(), 4);
        assert_eq!(frame.points()[1], DVec3::new(2.0, 0.0, 0.0));
        assert_eq!(frame.metadata()[3], [4.0, 1.0, 0.0]);
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let data = parse("1\nc\n1 2 3 4.0 5.0 6.0 7 8\n").unwrap();
        assert_eq!(data.final_frame().unwrap().points()[0], DVec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_movie_frame_count_matches_header() {
        let data = parse(MOVIE).unwrap();
        assert!(data.is_movie());
        assert_eq!(data.frame_count(), 3);
        let CoordinateData::Movie(frames) = &data else {
            panic!("expected movie");
        };
        assert_eq!(frames[&0].len(), 2);
        assert_eq!(frames[&1].len(), 3);
        // Comment line on a later block is skipped
        assert_eq!(data.final_frame().unwrap().points(), &[DVec3::splat(5.0)]);
    }

    #[test]
    fn test_short_movie_is_rejected() {
        let truncated = "1\n//3\n1 1 0 0 0 0\n1\n1 1 0 1 1 1\n";
        assert!(matches!(
            parse(truncated),
            Err(FormatError::FrameCount { declared: 3, found: 2, .. })
        ));
    }

    #[test]
    fn test_movie_block_past_eof() {
        let truncated = "1\n//2\n1 1 0 0 0 0\n3\n1 1 0 1 1 1\n";
        assert!(matches!(parse(truncated), Err(FormatError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_declared_count_past_eof() {
        let err = parse("5\ncomment\n1 1 0 0 0 0\n").unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_rows_beyond_declared_count_are_rejected() {
        let err = parse("2\ncomment\n1 1 0 0 0 0\n2 1 0 1 0 0\n3 1 0 0 1 0\n").unwrap_err();
        let FormatError::Malformed { line, message, .. } = err else {
            panic!("expected malformed record");
        };
        assert_eq!(line, 5);
        assert!(message.contains("after 2 records"));

        // Two blocks without a `//N` marker are not read as a movie
        let unmarked = "1\nc\n1 1 0 0 0 0\n1\nc\n1 1 0 1 1 1\n";
        assert!(matches!(parse(unmarked), Err(FormatError::Malformed { line: 4, .. })));
    }

    #[test]
    fn test_malformed_header() {
        let err = parse("four\ncomment\n").unwrap_err();
        assert!(matches!(err, FormatError::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_wrong_column_count_without_marker() {
        let err = parse("2\ncomment\n1 1 0 0 0 0\n1 1 0 0\n").unwrap_err();
        let FormatError::Malformed { line, message, .. } = err else {
            panic!("expected malformed record");
        };
        assert_eq!(line, 4);
        assert!(message.contains("at least 6 fields"));
    }

    #[test]
    fn test_non_numeric_field() {
        let err = parse("1\ncomment\n1 1 0 0.0 x 0.0\n").unwrap_err();
        assert!(err.to_string().contains("non-numeric field 'x'"));
    }

    #[test]
    fn test_empty_file() {
        assert!(matches!(parse("\n\n"), Err(FormatError::Empty { .. })));
    }

    #[test]
    fn test_progress_reports_each_movie_frame() {
        let seen = Mutex::new(Vec::new());
        let sink = |done: usize, total: usize| seen.lock().unwrap().push((done, total));
        let with = parse_coordinates(Path::new("m.xyz"), MOVIE, &sink).unwrap();
        let without = parse(MOVIE).unwrap();
        assert_eq!(with, without);
        assert_eq!(seen.into_inner().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = parse_coordinate_file(Path::new("crystal.pdb")).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Format(FormatError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_marker_parsing() {
        assert_eq!(movie_frame_count(Some("//12")), Some(12));
        assert_eq!(movie_frame_count(Some("movie // 4 frames")), Some(4));
        assert_eq!(movie_frame_count(Some("plain comment")), None);
        assert_eq!(movie_frame_count(None), None);
    }
}
