//! Normalised direct linear transform for homographies.

use crate::types::PointPair;
use nalgebra::{DMatrix, Matrix3, Vector2, Vector3};
use vmatch_core::MIN_CORRESPONDENCES;

/// Cap on SVD sweeps; a sample that has not converged by then is rejected
const SVD_MAX_ITERATIONS: usize = 1000;

/// Hartley normalisation: centroid to origin, mean distance sqrt(2)
fn normalize_points(points: impl Iterator<Item = Vector2<f64>>) -> (Vec<Vector2<f64>>, Matrix3<f64>) {
    let points: Vec<Vector2<f64>> = points.collect();
    let n = points.len() as f64;
    let centroid = points.iter().fold(Vector2::zeros(), |acc, p| acc + p) / n;

    let mean_dist = points.iter().map(|p| (p - centroid).norm()).sum::<f64>() / n;
    let scale = if mean_dist < f64::EPSILON {
        1.0
    } else {
        std::f64::consts::SQRT_2 / mean_dist
    };

    let transform = Matrix3::new(
        scale,
        0.0,
        -scale * centroid.x,
        0.0,
        scale,
        -scale * centroid.y,
        0.0,
        0.0,
        1.0,
    );

    let normalized = points.into_iter().map(|p| (p - centroid) * scale).collect();
    (normalized, transform)
}

/// Least-squares homography through `pairs` (exact for four points).
///
/// Returns `None` for fewer than four pairs or when the solution is not
/// finite.
pub fn fit_homography(pairs: &[PointPair]) -> Option<Matrix3<f64>> {
    if pairs.len() < MIN_CORRESPONDENCES {
        return None;
    }

    if !pairs.iter().all(|p| p.src.iter().chain(p.dst.iter()).all(|v| v.is_finite())) {
        return None;
    }

    let (src, t_src) = normalize_points(pairs.iter().map(|p| p.src));
    let (dst, t_dst) = normalize_points(pairs.iter().map(|p| p.dst));

    // Each correspondence gives two rows of A h = 0:
    //   [-x, -y, -1,  0,  0,  0, x'x, x'y, x']
    //   [ 0,  0,  0, -x, -y, -1, y'x, y'y, y']
    // Padded to at least 9 rows so the SVD yields the full right null space.
    let mut a = DMatrix::<f64>::zeros((2 * pairs.len()).max(9), 9);
    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        let (x, y, xp, yp) = (s.x, s.y, d.x, d.y);
        let r = 2 * i;

        a[(r, 0)] = -x;
        a[(r, 1)] = -y;
        a[(r, 2)] = -1.0;
        a[(r, 6)] = xp * x;
        a[(r, 7)] = xp * y;
        a[(r, 8)] = xp;

        a[(r + 1, 3)] = -x;
        a[(r + 1, 4)] = -y;
        a[(r + 1, 5)] = -1.0;
        a[(r + 1, 6)] = yp * x;
        a[(r + 1, 7)] = yp * y;
        a[(r + 1, 8)] = yp;
    }

    let svd = a.try_svd(false, true, f64::EPSILON, SVD_MAX_ITERATIONS)?;
    let v_t = svd.v_t?;
    let h = v_t.row(svd.singular_values.imin());
    let h_norm = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    // Undo normalisation: H = T_dst^-1 * H_norm * T_src
    let h = t_dst.try_inverse()? * h_norm * t_src;
    if !h.iter().all(|v| v.is_finite()) {
        return None;
    }

    let h22 = h[(2, 2)];
    Some(if h22.abs() > f64::EPSILON { h / h22 } else { h })
}

/// Squared forward transfer error `|dst - H src|^2`; infinite when `src` maps to infinity
#[inline]
pub fn reprojection_error_sq(h: &Matrix3<f64>, pair: &PointPair) -> f64 {
    let p = h * Vector3::new(pair.src.x, pair.src.y, 1.0);
    if p.z.abs() < f64::EPSILON {
        return f64::INFINITY;
    }
    let dx = p.x / p.z - pair.dst.x;
    let dy = p.y / p.z - pair.dst.y;
    dx * dx + dy * dy
}

/// Three points within floating point noise of a common line
fn collinear(a: &Vector2<f64>, b: &Vector2<f64>, c: &Vector2<f64>) -> bool {
    let (d1, d2) = (b - a, c - a);
    let cross = d2.x * d1.y - d2.y * d1.x;
    cross.abs() <= f32::EPSILON as f64 * (d1.x.abs() + d1.y.abs() + d2.x.abs() + d2.y.abs())
}

/// A minimal sample is unusable when any three of its points are collinear in either image
pub fn sample_is_degenerate(sample: &[PointPair; 4]) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES.iter().any(|&(i, j, k)| {
        collinear(&sample[i].src, &sample[j].src, &sample[k].src)
            || collinear(&sample[i].dst, &sample[j].dst, &sample[k].dst)
    })
}
