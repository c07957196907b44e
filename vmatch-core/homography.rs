use nalgebra::{Matrix3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Planar projective transform taking image A pixel coordinates into image B
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "[[f64; 3]; 3]", into = "[[f64; 3]; 3]"))]
pub struct Homography {
    h: Matrix3<f64>,
}

impl Homography {
    /// Wrap `h`, scaling it so that `h[(2, 2)] == 1` whenever that entry is not ~0
    pub fn new(h: Matrix3<f64>) -> Self {
        let h22 = h[(2, 2)];
        let h = if h22.abs() > f64::EPSILON { h / h22 } else { h };
        Self { h }
    }

    pub fn identity() -> Self {
        Self { h: Matrix3::identity() }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.h
    }

    pub fn rows(&self) -> [[f64; 3]; 3] {
        let h = &self.h;
        [
            [h[(0, 0)], h[(0, 1)], h[(0, 2)]],
            [h[(1, 0)], h[(1, 1)], h[(1, 2)]],
            [h[(2, 0)], h[(2, 1)], h[(2, 2)]],
        ]
    }

    /// Map `(x, y)` through the transform; `None` for points sent to infinity
    pub fn project(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let p = self.h * Vector3::new(x, y, 1.0);
        if p.z.abs() < 1e-12 {
            return None;
        }
        Some((p.x / p.z, p.y / p.z))
    }

    pub fn is_finite(&self) -> bool {
        self.h.iter().all(|v| v.is_finite())
    }
}

impl From<[[f64; 3]; 3]> for Homography {
    fn from(r: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::new(
            r[0][0], r[0][1], r[0][2], r[1][0], r[1][1], r[1][2], r[2][0], r[2][1], r[2][2],
        ))
    }
}

impl From<Homography> for [[f64; 3]; 3] {
    fn from(h: Homography) -> Self {
        h.rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalises_scale() {
        let h = Homography::new(Matrix3::new(2.0, 0.0, 4.0, 0.0, 2.0, 6.0, 0.0, 0.0, 2.0));
        assert_eq!(h.rows(), [[1.0, 0.0, 2.0], [0.0, 1.0, 3.0], [0.0, 0.0, 1.0]]);
    }

    #[test]
    fn test_project_translation() {
        let h = Homography::from([[1.0, 0.0, 10.0], [0.0, 1.0, -5.0], [0.0, 0.0, 1.0]]);
        let (x, y) = h.project(3.0, 4.0).unwrap();
        assert!((x - 13.0).abs() < 1e-12);
        assert!((y + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_project_at_infinity() {
        let h = Homography::from([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]);
        assert!(h.project(0.0, 5.0).is_none());
    }

    #[test]
    fn test_identity() {
        let h = Homography::identity();
        assert!(h.is_finite());
        assert_eq!(h.project(7.5, -2.0), Some((7.5, -2.0)));
    }
}
