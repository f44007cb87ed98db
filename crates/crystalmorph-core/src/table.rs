//! Common table surface.
//!
//! Every run-keyed table (aggregate, CDA, growth rates, joins) exposes its
//! value columns as strings through [`Tabular`], so joins and the CSV writer
//! handle them uniformly. The `Simulation Number` key column is implicit.

use morph_geom::{AxisShape, ShapeDescriptor};

use crate::config::ColumnGroups;
use crate::run::RunNumber;

/// Header of the key column.
pub const RUN_COLUMN: &str = "Simulation Number";

/// A table keyed by simulation number.
pub trait Tabular {
    /// Headers of the value columns, excluding [`RUN_COLUMN`].
    fn headers(&self) -> Vec<String>;

    /// Rows sorted by run number, one cell per value header.
    fn rows(&self) -> Vec<(RunNumber, Vec<String>)>;

    /// Number of rows.
    fn row_count(&self) -> usize {
        self.rows().len()
    }
}

/// Format a number for a CSV cell; non-finite values are written as-is.
#[must_use]
pub fn cell(value: f64) -> String {
    value.to_string()
}

/// Headers of the descriptor columns selected by `groups`.
#[must_use]
pub fn descriptor_headers(groups: ColumnGroups) -> Vec<String> {
    let mut headers: Vec<&str> = Vec::new();
    if groups.contains(ColumnGroups::OBA) {
        headers.extend([
            "OBA Length X",
            "OBA Length Y",
            "OBA Length Z",
            "OBA S:M",
            "OBA M:L",
            "OBA Shape",
        ]);
    }
    if groups.contains(ColumnGroups::PCA) {
        headers.extend([
            "PCA small",
            "PCA medium",
            "PCA long",
            "PCA S:M",
            "PCA M:L",
            "PCA Shape",
        ]);
    }
    if groups.contains(ColumnGroups::HULL) {
        headers.extend(["Surface Area", "Volume", "SA:Vol Ratio"]);
    }
    if groups.contains(ColumnGroups::ALIGNED) {
        headers.extend([
            "Aligned Length 1",
            "Aligned Length 2",
            "Aligned Length 3",
            "Aligned S:M",
            "Aligned M:L",
            "Aligned Shape",
        ]);
    }
    headers.into_iter().map(String::from).collect()
}

/// Cells matching [`descriptor_headers`]; a missing hull leaves its cells empty.
#[must_use]
pub fn descriptor_cells(descriptor: &ShapeDescriptor, groups: ColumnGroups) -> Vec<String> {
    let axis = |shape: &AxisShape| {
        let [a, b, c] = shape.lengths;
        [
            cell(a),
            cell(b),
            cell(c),
            cell(shape.aspect.small_medium),
            cell(shape.aspect.medium_long),
            shape.shape.to_string(),
        ]
    };

    let mut cells = Vec::new();
    if groups.contains(ColumnGroups::OBA) {
        cells.extend(axis(&descriptor.oba));
    }
    if groups.contains(ColumnGroups::PCA) {
        cells.extend(axis(&descriptor.pca));
    }
    if groups.contains(ColumnGroups::HULL) {
        match &descriptor.hull {
            Some(hull) => cells.extend([
                cell(hull.surface_area),
                cell(hull.volume),
                cell(hull.sa_vol_ratio),
            ]),
            None => cells.extend(std::iter::repeat(String::new()).take(3)),
        }
    }
    if groups.contains(ColumnGroups::ALIGNED) {
        cells.extend(axis(&descriptor.aligned));
    }
    cells
}

/// Generic string table produced by joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedTable {
    pub(crate) headers: Vec<String>,
    pub(crate) rows: Vec<(RunNumber, Vec<String>)>,
    pub(crate) dropped: Vec<String>,
}

impl JoinedTable {
    /// Keys or runs that found no partner and were left out.
    #[must_use]
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    /// Row of one run.
    #[must_use]
    pub fn row(&self, run: RunNumber) -> Option<&[String]> {
        self.rows
            .iter()
            .find(|(r, _)| *r == run)
            .map(|(_, cells)| cells.as_slice())
    }
}

impl Tabular for JoinedTable {
    fn headers(&self) -> Vec<String> {
        self.headers.clone()
    }

    fn rows(&self) -> Vec<(RunNumber, Vec<String>)> {
        self.rows.clone()
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use morph_geom::DescriptorOptions;

    fn descriptor() -> ShapeDescriptor {
        let points: Vec<DVec3> = [0.0, 1.0]
            .iter()
            .flat_map(|&x| [0.0, 2.0].map(move |y| (x, y)))
            .flat_map(|(x, y)| [0.0, 4.0].map(move |z| DVec3::new(x, y, z)))
            .collect();
        morph_geom::describe(&points, &DescriptorOptions::default()).unwrap()
    }

    #[test]
    fn test_headers_match_cells_for_every_group_set() {
        let d = descriptor();
        for bits in 0..16u8 {
            let groups = ColumnGroups::from_bits_truncate(bits);
            assert_eq!(
                descriptor_headers(groups).len(),
                descriptor_cells(&d, groups).len(),
                "groups {groups:?}"
            );
        }
    }

    #[test]
    fn test_default_column_order() {
        let headers = descriptor_headers(ColumnGroups::default());
        assert_eq!(headers.len(), 15);
        assert_eq!(headers[0], "OBA Length X");
        assert_eq!(headers[6], "PCA small");
        assert_eq!(headers[14], "SA:Vol Ratio");
    }

    #[test]
    fn test_missing_hull_leaves_cells_empty() {
        let d = descriptor();
        let axes_only = ShapeDescriptor::without_hull(d.axes());
        let cells = descriptor_cells(&axes_only, ColumnGroups::HULL);
        assert_eq!(cells, vec![String::new(); 3]);

        let cells = descriptor_cells(&d, ColumnGroups::OBA);
        assert_eq!(cells[..3], ["1".to_string(), "2".to_string(), "4".to_string()]);
        assert_eq!(cells[5], "Lath");
    }
}
