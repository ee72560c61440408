//! Numerical conditioning helpers shared by the linear solvers.

use lanegauge_core::{Mat3, Pt2, Real};
use nalgebra::Matrix2;

/// Hartley normalization for 2D points.
///
/// Centers points at the origin and scales so that the mean distance from
/// the origin is `√2`. Returns the normalized points and `T` such that
/// `p_norm = T * p_homogeneous`, or `None` if the input is empty or all
/// points coincide.
pub fn normalize_points_2d(points: &[Pt2]) -> Option<(Vec<Pt2>, Mat3)> {
    if points.is_empty() {
        return None;
    }

    let n = points.len() as Real;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let cx = sx / n;
    let cy = sy / n;

    let mean_dist = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<Real>()
        / n;

    if mean_dist <= Real::EPSILON {
        return None;
    }

    let scale = (2.0 as Real).sqrt() / mean_dist;
    let t = Mat3::new(
        scale,
        0.0,
        -scale * cx,
        0.0,
        scale,
        -scale * cy,
        0.0,
        0.0,
        1.0,
    );

    let norm = points
        .iter()
        .map(|p| Pt2::new((p.x - cx) * scale, (p.y - cy) * scale))
        .collect();

    Some((norm, t))
}

/// Ratio of the smaller to the larger principal spread of a point set.
///
/// Zero when every point lies on one line.
pub fn spread_ratio(points: &[Pt2]) -> Real {
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len() as Real;
    let cx = points.iter().map(|p| p.x).sum::<Real>() / n;
    let cy = points.iter().map(|p| p.y).sum::<Real>() / n;
    let mut cov = Matrix2::<Real>::zeros();
    for p in points {
        let dx = p.x - cx;
        let dy = p.y - cy;
        cov[(0, 0)] += dx * dx;
        cov[(0, 1)] += dx * dy;
        cov[(1, 1)] += dy * dy;
    }
    cov[(1, 0)] = cov[(0, 1)];
    let eig = cov.symmetric_eigenvalues();
    let (lo, hi) = if eig[0] <= eig[1] {
        (eig[0], eig[1])
    } else {
        (eig[1], eig[0])
    };
    if hi <= 0.0 {
        0.0
    } else {
        (lo / hi).max(0.0)
    }
}

/// Twice the signed area of the triangle `abc`.
pub fn triangle_area2(a: &Pt2, b: &Pt2, c: &Pt2) -> Real {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_2d_centering() {
        let points = vec![
            Pt2::new(100.0, 200.0),
            Pt2::new(200.0, 300.0),
            Pt2::new(150.0, 250.0),
        ];

        let (norm, t) = normalize_points_2d(&points).unwrap();

        let cx: Real = norm.iter().map(|p| p.x).sum::<Real>() / norm.len() as Real;
        let cy: Real = norm.iter().map(|p| p.y).sum::<Real>() / norm.len() as Real;
        assert!(cx.abs() < 1e-10, "centroid x not at origin: {}", cx);
        assert!(cy.abs() < 1e-10, "centroid y not at origin: {}", cy);

        let mean_dist: Real = norm
            .iter()
            .map(|p| (p.x * p.x + p.y * p.y).sqrt())
            .sum::<Real>()
            / norm.len() as Real;
        assert!((mean_dist - (2.0 as Real).sqrt()).abs() < 1e-10);

        let mapped = t * nalgebra::Vector3::new(points[0].x, points[0].y, 1.0);
        assert!((mapped.x - norm[0].x).abs() < 1e-12);
    }

    #[test]
    fn coincident_points_cannot_be_normalized() {
        let pts = vec![Pt2::new(1.0, 1.0); 4];
        assert!(normalize_points_2d(&pts).is_none());
    }

    #[test]
    fn collinear_points_have_zero_spread() {
        let pts: Vec<Pt2> = (0..5).map(|i| Pt2::new(i as Real, 2.0 * i as Real)).collect();
        assert!(spread_ratio(&pts) < 1e-12);
        let square = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(1.0, 0.0),
            Pt2::new(1.0, 1.0),
            Pt2::new(0.0, 1.0),
        ];
        assert!((spread_ratio(&square) - 1.0).abs() < 1e-12);
    }
}
