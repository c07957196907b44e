use vmatch_core::MetricFamily;

/// Distance between two descriptors of the same width
pub trait DistanceMetric: Send + Sync {
    type Element: Copy + Send + Sync;

    /// Family the metric serves; floating metrics always use the ratio test
    const FAMILY: MetricFamily;

    fn distance(&self, a: &[Self::Element], b: &[Self::Element]) -> f32;
}

/// Number of differing bits between packed descriptors
#[derive(Debug, Clone, Copy, Default)]
pub struct HammingMetric;

impl DistanceMetric for HammingMetric {
    type Element = u8;
    const FAMILY: MetricFamily = MetricFamily::Binary;

    #[inline]
    fn distance(&self, a: &[u8], b: &[u8]) -> f32 {
        a.iter()
            .zip(b.iter())
            .map(|(&x, &y)| (x ^ y).count_ones())
            .sum::<u32>() as f32
    }
}

/// L2 norm of the difference vector
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanMetric;

impl DistanceMetric for EuclideanMetric {
    type Element = f32;
    const FAMILY: MetricFamily = MetricFamily::Floating;

    #[inline]
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        a.iter()
            .zip(b.iter())
            .map(|(&x, &y)| {
                let d = x - y;
                d * d
            })
            .sum::<f32>()
            .sqrt()
    }
}
