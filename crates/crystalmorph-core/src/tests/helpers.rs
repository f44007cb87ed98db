//! Fixture writers for on-disk batches.
//!
//! Every writer creates missing parent folders and returns the path it wrote,
//! so a batch can be assembled in a `tempfile::tempdir()` line by line.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::params::{FACET_TABLE_HEADER, GROWTH_MODIFIER_LABEL, SUPERSATURATION_LABEL};

// =============================================================================
// Point clouds
// =============================================================================

/// 3x3x3 lattice spanning `[0, dims]`, so extents equal `dims` exactly.
pub fn box_points(dims: [f64; 3]) -> Vec<DVec3> {
    let mut points = Vec::with_capacity(27);
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                points.push(DVec3::new(
                    dims[0] * f64::from(i) / 2.0,
                    dims[1] * f64::from(j) / 2.0,
                    dims[2] * f64::from(k) / 2.0,
                ));
            }
        }
    }
    points
}

/// Box corners plus `extra` seeded interior points.
pub fn seeded_box(dims: [f64; 3], extra: usize, seed: u64) -> Vec<DVec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut points = box_points(dims);
    points.extend((0..extra).map(|_| {
        DVec3::new(
            rng.gen_range(0.05..0.95) * dims[0],
            rng.gen_range(0.05..0.95) * dims[1],
            rng.gen_range(0.05..0.95) * dims[2],
        )
    }));
    points
}

// =============================================================================
// Coordinate files
// =============================================================================

fn records(out: &mut String, points: &[DVec3]) {
    for (i, p) in points.iter().enumerate() {
        let _ = writeln!(out, "{} 1 0 {} {} {}", i + 1, p.x, p.y, p.z);
    }
}

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// Write a single-frame coordinate file.
pub fn write_xyz(path: &Path, points: &[DVec3]) {
    let mut out = format!("{}\nsingle frame\n", points.len());
    records(&mut out, points);
    write_file(path, &out);
}

/// Write a movie with a `//N` marker; later blocks carry a comment line.
pub fn write_movie(path: &Path, frames: &[Vec<DVec3>]) {
    let mut out = String::new();
    for (i, frame) in frames.iter().enumerate() {
        if i == 0 {
            let _ = write!(out, "{}\nmovie //{}\n", frame.len(), frames.len());
        } else {
            let _ = write!(out, "{}\nframe {i}\n", frame.len());
        }
        records(&mut out, frame);
    }
    write_file(path, &out);
}

// =============================================================================
// Run folders
// =============================================================================

fn folder_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_series(folder: &Path, directions: &[&str], times: &[f64], length: impl Fn(usize, f64) -> f64) -> PathBuf {
    let mut out = String::from("time");
    for d in directions {
        let _ = write!(out, ",{d}");
    }
    out.push('\n');
    for &t in times {
        let _ = write!(out, "{t}");
        for column in 0..directions.len() {
            let _ = write!(out, ",{}", length(column, t));
        }
        out.push('\n');
    }
    let path = folder.join(format!("{}_size.csv", folder_name(folder)));
    write_file(&path, &out);
    path
}

/// Size file sampled at t = 0, 1, 2 whose last row holds `final_lengths`.
pub fn write_size_file(folder: &Path, directions: &[&str], final_lengths: &[f64]) -> PathBuf {
    write_series(folder, directions, &[0.0, 1.0, 2.0], |column, t| {
        if t < 2.0 {
            final_lengths[column] * (t + 1.0) / 3.0
        } else {
            final_lengths[column]
        }
    })
}

/// Size file with lengths `10 + rate * t` at the given times.
pub fn write_growth_series(folder: &Path, directions: &[&str], rates: &[f64], times: &[f64]) -> PathBuf {
    write_series(folder, directions, times, |column, t| 10.0 + rates[column] * t)
}

/// Parameter log with the labels the tokenizer reads and a facet table.
pub fn write_parameter_log(folder: &Path, supersaturation: f64, growth_modifier: bool, directions: &[&str]) -> PathBuf {
    let run_type = if growth_modifier { "growth_modifier" } else { "normal" };
    let mut out = format!(
        "Simulation parameters\n{GROWTH_MODIFIER_LABEL}:   {run_type}\n{SUPERSATURATION_LABEL} {supersaturation}\n\n{FACET_TABLE_HEADER} (nm)\n"
    );
    for d in directions {
        let _ = writeln!(out, "{d}   1.0");
    }
    out.push('\n');
    let path = folder.join(format!("{}_simulation_parameters.txt", folder_name(folder)));
    write_file(&path, &out);
    path
}

/// Run folder with both a parameter log and a size file.
pub fn write_run(root: &Path, name: &str, supersaturation: f64, directions: &[&str], final_lengths: &[f64]) -> PathBuf {
    let folder = root.join(name);
    write_parameter_log(&folder, supersaturation, false, directions);
    write_size_file(&folder, directions, final_lengths);
    folder
}
