// SPDX-License-Identifier: MIT OR Apache-2.0
//! Extraction of cubic Bezier segments from scene subpaths.

use crate::provider::Subpath;
use procflow_graph::series::{CubicSegment, Mat4, Vec3};

/// Apply an affine transform to a point (w = 1)
pub fn transform_point(matrix: &Mat4, point: Vec3) -> Vec3 {
    let mut out = [0.0; 3];
    for (row, value) in out.iter_mut().enumerate() {
        *value = matrix[row][0] * point[0]
            + matrix[row][1] * point[1]
            + matrix[row][2] * point[2]
            + matrix[row][3];
    }
    out
}

/// Build the cubic segments of one subpath.
///
/// Each consecutive control-point pair yields one segment
/// `[start, start-handle, end-handle, end]`; a cyclic subpath contributes
/// the closing `(last, first)` segment as its final entry. When `transform`
/// is given, every control point is pre-multiplied by it.
pub fn spline_segments(subpath: &Subpath, transform: Option<&Mat4>) -> Vec<CubicSegment> {
    let points = &subpath.points;
    let mut pairs: Vec<_> = points.iter().zip(points.iter().skip(1)).collect();
    if subpath.cyclic {
        if let (Some(last), Some(first)) = (points.last(), points.first()) {
            pairs.push((last, first));
        }
    }

    pairs
        .into_iter()
        .map(|(a, b)| {
            let mut controls = [a.position, a.handle_right, b.handle_left, b.position];
            if let Some(matrix) = transform {
                for point in &mut controls {
                    *point = transform_point(matrix, *point);
                }
            }
            CubicSegment::new(controls)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ControlPoint, SubpathKind};

    fn anchor(x: f64) -> ControlPoint {
        ControlPoint {
            position: [x, 0.0, 0.0],
            handle_left: [x - 0.5, 1.0, 0.0],
            handle_right: [x + 0.5, 1.0, 0.0],
        }
    }

    fn subpath(count: usize, cyclic: bool) -> Subpath {
        Subpath {
            kind: SubpathKind::Bezier,
            points: (0..count).map(|i| anchor(i as f64)).collect(),
            cyclic,
        }
    }

    #[test]
    fn test_open_subpath_segment_count() {
        assert_eq!(spline_segments(&subpath(3, false), None).len(), 2);
        assert_eq!(spline_segments(&subpath(1, false), None).len(), 0);
        assert_eq!(spline_segments(&subpath(0, false), None).len(), 0);
    }

    #[test]
    fn test_cyclic_subpath_appends_closing_segment() {
        let segments = spline_segments(&subpath(3, true), None);
        assert_eq!(segments.len(), 3);
        let closing = &segments[2];
        assert_eq!(closing.points[0], [2.0, 0.0, 0.0]);
        assert_eq!(closing.points[3], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_segment_control_tuple_order() {
        let segments = spline_segments(&subpath(2, false), None);
        let segment = &segments[0];
        // start, start handle, end handle, end
        assert_eq!(segment.points[0], [0.0, 0.0, 0.0]);
        assert_eq!(segment.points[1], [0.5, 1.0, 0.0]);
        assert_eq!(segment.points[2], [0.5, 1.0, 0.0]);
        assert_eq!(segment.points[3], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_transform_applied_to_every_control_point() {
        let translate: Mat4 = [
            [1.0, 0.0, 0.0, 10.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, -2.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let plain = spline_segments(&subpath(2, false), None);
        let moved = spline_segments(&subpath(2, false), Some(&translate));
        for (a, b) in plain[0].points.iter().zip(moved[0].points.iter()) {
            assert_eq!(b[0], a[0] + 10.0);
            assert_eq!(b[1], a[1]);
            assert_eq!(b[2], a[2] - 2.0);
        }
    }

    #[test]
    fn test_transform_point_identity() {
        use procflow_graph::series::MAT4_IDENTITY;
        assert_eq!(transform_point(&MAT4_IDENTITY, [1.0, 2.0, 3.0]), [1.0, 2.0, 3.0]);
    }
}
