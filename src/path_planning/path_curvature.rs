//! Signed curvature of polylines from consecutive point triples

use std::f64::consts::PI;

use crate::common::Point2D;

/// Interior angles closer than this to a straight angle count as straight
pub const STRAIGHT_ANGLE_TOLERANCE: f64 = 0.01;

/// Signed curvature of the circle through three points.
///
/// Left turns are positive. Near-collinear or repeated points give 0.
pub fn three_point_curvature(p1: &Point2D, p2: &Point2D, p3: &Point2D) -> f64 {
    let v1 = p1.to_vector() - p2.to_vector();
    let v2 = p3.to_vector() - p2.to_vector();
    let chord = p3.to_vector() - p1.to_vector();
    let (n1, n2, n3) = (v1.norm(), v2.norm(), chord.norm());
    if n1 == 0.0 || n2 == 0.0 || n3 == 0.0 {
        return 0.0;
    }

    let angle = (v1.dot(&v2) / (n1 * n2)).clamp(-1.0, 1.0).acos();
    if angle > PI - STRAIGHT_ANGLE_TOLERANCE {
        return 0.0;
    }

    let cross = v1.x * v2.y - v1.y * v2.x;
    // circumradius R = abc / (4 * area), area = |cross| / 2
    let radius = n1 * n2 * n3 / (2.0 * cross.abs());
    if cross > 0.0 {
        -1.0 / radius
    } else {
        1.0 / radius
    }
}

/// Curvature at every point; the endpoints copy their interior neighbours.
pub fn path_curvatures(points: &[Point2D]) -> Vec<f64> {
    let n = points.len();
    let mut curvatures = vec![0.0; n];
    if n < 3 {
        return curvatures;
    }
    for i in 1..n - 1 {
        curvatures[i] = three_point_curvature(&points[i - 1], &points[i], &points[i + 1]);
    }
    curvatures[0] = curvatures[1];
    curvatures[n - 1] = curvatures[n - 2];
    curvatures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_curvature_and_sign() {
        let radius = 5.0;
        let on_circle = |theta: f64| Point2D::new(radius * theta.cos(), radius * theta.sin());
        // counter-clockwise is a left turn
        let k = three_point_curvature(&on_circle(0.0), &on_circle(0.3), &on_circle(0.6));
        assert!((k - 0.2).abs() < 1e-9);
        let k = three_point_curvature(&on_circle(0.6), &on_circle(0.3), &on_circle(0.0));
        assert!((k + 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_straight_and_degenerate() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(1.0, 0.001);
        let c = Point2D::new(2.0, 0.0);
        assert_eq!(three_point_curvature(&a, &b, &c), 0.0);
        assert_eq!(three_point_curvature(&a, &a, &c), 0.0);
    }

    #[test]
    fn test_endpoints_copy_neighbours() {
        let points = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(2.0, 1.0),
            Point2D::new(2.0, 2.0),
        ];
        let k = path_curvatures(&points);
        assert_eq!(k.len(), 4);
        assert!(k[1] > 0.0);
        assert_eq!(k[0], k[1]);
        assert_eq!(k[3], k[2]);
        assert_eq!(path_curvatures(&points[..2]), vec![0.0, 0.0]);
    }
}
