// SPDX-License-Identifier: MIT OR Apache-2.0
//! Series payloads carried between sockets, and the list-broadcast rule.
//!
//! A series is the unit of data that flows along a link: an outer list with
//! one entry per object, where each entry is itself a list of leaf values
//! (scalars, points) or a single structured value (matrix, spline). Sibling
//! series of mismatched length are reconciled with [`full_list`], which
//! repeats the last element rather than truncating.

use serde::{Deserialize, Serialize};

/// 3D point or direction
pub type Vec3 = [f64; 3];

/// Row-major 4x4 transform matrix
pub type Mat4 = [[f64; 4]; 4];

/// The identity transform
pub const MAT4_IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Category of data a socket carries
///
/// Resolved once when a link is created; evaluation never inspects payloads
/// to discover their category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesKind {
    /// Lists of numbers, one list per object
    Scalar,
    /// Lists of 3D points, one list per object
    Vector,
    /// One 4x4 transform per object
    Matrix,
    /// One poly-Bezier spline per object
    Curve,
}

/// A cubic Bezier segment as a 4-point control tuple
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicSegment {
    /// Control points: start, start handle, end handle, end
    pub points: [Vec3; 4],
}

impl CubicSegment {
    /// Create a segment from its four control points
    pub fn new(points: [Vec3; 4]) -> Self {
        Self { points }
    }

    /// Evaluate the segment at parameter `t` in `[0, 1]` (Bernstein form)
    pub fn point_at(&self, t: f64) -> Vec3 {
        let [p0, p1, p2, p3] = self.points;
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let mut point = [0.0; 3];
        for axis in 0..3 {
            point[axis] = mt3 * p0[axis]
                + 3.0 * mt2 * t * p1[axis]
                + 3.0 * mt * t2 * p2[axis]
                + t3 * p3[axis];
        }
        point
    }
}

/// A poly-Bezier spline: an ordered run of cubic segments
///
/// Consecutive segments share endpoints by construction; a closed spline
/// carries an explicit wrap-around segment as its last entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BezierSpline {
    /// Segments in traversal order
    pub segments: Vec<CubicSegment>,
}

impl BezierSpline {
    /// Create a spline from its segments
    pub fn new(segments: Vec<CubicSegment>) -> Self {
        Self { segments }
    }

    /// Number of cubic segments
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Evaluate segment `index` at parameter `t` in `[0, 1]`
    pub fn point_at(&self, index: usize, t: f64) -> Option<Vec3> {
        self.segments.get(index).map(|segment| segment.point_at(t))
    }
}

/// Payload stored on a socket: a typed series with one outer entry per object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SeriesData {
    /// Numbers, nested objects x values
    Scalar(Vec<Vec<f64>>),
    /// 3D points, nested objects x points
    Vector(Vec<Vec<Vec3>>),
    /// One transform per object
    Matrix(Vec<Mat4>),
    /// One spline per object
    Curve(Vec<BezierSpline>),
}

impl SeriesData {
    /// The category this payload belongs to
    pub fn kind(&self) -> SeriesKind {
        match self {
            Self::Scalar(_) => SeriesKind::Scalar,
            Self::Vector(_) => SeriesKind::Vector,
            Self::Matrix(_) => SeriesKind::Matrix,
            Self::Curve(_) => SeriesKind::Curve,
        }
    }

    /// Outer length: the number of objects in the series
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(objects) => objects.len(),
            Self::Vector(objects) => objects.len(),
            Self::Matrix(matrices) => matrices.len(),
            Self::Curve(splines) => splines.len(),
        }
    }

    /// True if the series holds no objects
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Broadcast requested from an empty list: there is no last element to repeat
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot extend an empty list to length {0} (no last element to repeat)")]
pub struct EmptyBroadcastError(pub usize);

/// Pad `items` to `target` length by repeating its last element.
///
/// Applied independently at every nesting level when sibling series of
/// mismatched length are combined. Lists already at or above `target` are
/// left unchanged; broadcast never truncates. Extending an empty list to a
/// positive length fails with [`EmptyBroadcastError`].
pub fn full_list<T: Clone>(items: &mut Vec<T>, target: usize) -> Result<(), EmptyBroadcastError> {
    if target <= items.len() {
        return Ok(());
    }
    let last = items.last().cloned().ok_or(EmptyBroadcastError(target))?;
    items.resize(target, last);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_list_extends_with_last() {
        let mut items = vec![1.0, 2.0];
        full_list(&mut items, 5).unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(&items[..2], &[1.0, 2.0]);
        assert!(items[2..].iter().all(|v| *v == 2.0));
    }

    #[test]
    fn test_full_list_never_truncates() {
        let mut items = vec![1, 2, 3];
        full_list(&mut items, 2).unwrap();
        assert_eq!(items, vec![1, 2, 3]);

        full_list(&mut items, 3).unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn test_full_list_empty_source_fails() {
        let mut items: Vec<f64> = Vec::new();
        assert_eq!(full_list(&mut items, 3), Err(EmptyBroadcastError(3)));

        // Extending an empty list to zero is a no-op, not an error
        full_list(&mut items, 0).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_series_kind_and_len() {
        let scalars = SeriesData::Scalar(vec![vec![1.0], vec![2.0, 3.0]]);
        assert_eq!(scalars.kind(), SeriesKind::Scalar);
        assert_eq!(scalars.len(), 2);

        let matrices = SeriesData::Matrix(vec![MAT4_IDENTITY]);
        assert_eq!(matrices.kind(), SeriesKind::Matrix);
        assert_eq!(matrices.len(), 1);

        assert!(SeriesData::Curve(Vec::new()).is_empty());
    }

    #[test]
    fn test_segment_point_at_endpoints() {
        let segment = CubicSegment::new([
            [0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
        ]);
        assert_eq!(segment.point_at(0.0), [0.0, 0.0, 0.0]);
        assert_eq!(segment.point_at(1.0), [1.0, 0.0, 0.0]);

        // Midpoint of a symmetric segment lies on the axis of symmetry
        let mid = segment.point_at(0.5);
        assert!((mid[0] - 0.5).abs() < 1e-12);
        assert!((mid[1] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_spline_point_at_out_of_range() {
        let spline = BezierSpline::default();
        assert_eq!(spline.point_at(0, 0.5), None);
    }
}
