// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flattening of capture snapshots for the save format.
//!
//! A [`FlatCache`] holds one flat `f64` buffer per series plus the span
//! table needed to rebuild nesting, which keeps the saved form a plain
//! JSON-friendly structure. [`unflatten`] is the exact inverse of
//! [`flatten`] for every valid snapshot.

use crate::capture::CacheEntry;
use indexmap::IndexMap;
use procflow_graph::series::{BezierSpline, CubicSegment, Mat4, SeriesData, SeriesKind, Vec3};
use serde::{Deserialize, Serialize};

/// Values per span unit for each series kind
fn stride(kind: SeriesKind) -> usize {
    match kind {
        SeriesKind::Scalar => 1,
        // One point
        SeriesKind::Vector => 3,
        // One 4x4 matrix
        SeriesKind::Matrix => 16,
        // One segment: four points
        SeriesKind::Curve => 12,
    }
}

/// One series in flat form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatSeries {
    /// Series kind, decides how `data` is regrouped
    pub kind: SeriesKind,
    /// Span units per object (values, points, matrices, segments)
    pub spans: Vec<usize>,
    /// Flat value buffer
    pub data: Vec<f64>,
}

/// A capture snapshot in flat form
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlatCache {
    /// Flattened series by output socket name
    pub entries: IndexMap<String, FlatSeries>,
}

/// Malformed flat form
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Buffer length disagrees with the span table
    #[error("'{name}': flat buffer holds {found} values, expected {expected}")]
    BufferMismatch {
        /// Series name
        name: String,
        /// Values the span table accounts for
        expected: usize,
        /// Values actually present
        found: usize,
    },
}

/// Flatten a snapshot into its save form
pub fn flatten(entry: &CacheEntry) -> FlatCache {
    let mut entries = IndexMap::new();
    for (name, series) in entry {
        entries.insert(name.clone(), flatten_series(series));
    }
    FlatCache { entries }
}

/// Rebuild a snapshot from its save form
pub fn unflatten(flat: &FlatCache) -> Result<CacheEntry, CodecError> {
    let mut entry = CacheEntry::new();
    for (name, series) in &flat.entries {
        entry.insert(name.clone(), unflatten_series(name, series)?);
    }
    Ok(entry)
}

fn flatten_series(series: &SeriesData) -> FlatSeries {
    let kind = series.kind();
    let mut spans = Vec::new();
    let mut data = Vec::new();

    match series {
        SeriesData::Scalar(objects) => {
            for values in objects {
                spans.push(values.len());
                data.extend_from_slice(values);
            }
        }
        SeriesData::Vector(objects) => {
            for points in objects {
                spans.push(points.len());
                for point in points {
                    data.extend_from_slice(point);
                }
            }
        }
        SeriesData::Matrix(matrices) => {
            for matrix in matrices {
                spans.push(1);
                for row in matrix {
                    data.extend_from_slice(row);
                }
            }
        }
        SeriesData::Curve(splines) => {
            for spline in splines {
                spans.push(spline.segments.len());
                for segment in &spline.segments {
                    for point in &segment.points {
                        data.extend_from_slice(point);
                    }
                }
            }
        }
    }

    FlatSeries { kind, spans, data }
}

fn unflatten_series(name: &str, flat: &FlatSeries) -> Result<SeriesData, CodecError> {
    let expected = flat.spans.iter().sum::<usize>() * stride(flat.kind);
    if flat.data.len() != expected {
        return Err(CodecError::BufferMismatch {
            name: name.to_string(),
            expected,
            found: flat.data.len(),
        });
    }

    let mut cursor = 0usize;
    let mut take = |units: usize, stride: usize| {
        let slice = &flat.data[cursor..cursor + units * stride];
        cursor += units * stride;
        slice
    };

    let series = match flat.kind {
        SeriesKind::Scalar => SeriesData::Scalar(
            flat.spans
                .iter()
                .map(|count| take(*count, 1).to_vec())
                .collect(),
        ),
        SeriesKind::Vector => SeriesData::Vector(
            flat.spans
                .iter()
                .map(|count| take(*count, 3).chunks_exact(3).map(to_point).collect())
                .collect(),
        ),
        SeriesKind::Matrix => SeriesData::Matrix(
            flat.spans
                .iter()
                .map(|count| {
                    // One matrix per object
                    let values = take(*count, 16);
                    to_matrix(values)
                })
                .collect(),
        ),
        SeriesKind::Curve => SeriesData::Curve(
            flat.spans
                .iter()
                .map(|count| {
                    let segments = take(*count, 12)
                        .chunks_exact(12)
                        .map(|values| {
                            CubicSegment::new([
                                to_point(&values[0..3]),
                                to_point(&values[3..6]),
                                to_point(&values[6..9]),
                                to_point(&values[9..12]),
                            ])
                        })
                        .collect();
                    BezierSpline::new(segments)
                })
                .collect(),
        ),
    };
    Ok(series)
}

fn to_point(values: &[f64]) -> Vec3 {
    [values[0], values[1], values[2]]
}

fn to_matrix(values: &[f64]) -> Mat4 {
    let mut matrix = [[0.0; 4]; 4];
    for (row, chunk) in matrix.iter_mut().zip(values.chunks_exact(4)) {
        row.copy_from_slice(chunk);
    }
    matrix
}
