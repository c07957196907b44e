use rayon::prelude::*;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;
use vmatch_core::{DescriptorMatrix, Match, MatchSet, MatcherConfig, MetricFamily, MIN_CORRESPONDENCES};

mod metric;

pub use metric::{DistanceMetric, EuclideanMetric, HammingMetric};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("Descriptor widths differ: query {query}, train {train}")]
    WidthMismatch { query: usize, train: usize },

    #[error("Invalid ratio threshold: {0} (must be in (0, 1])")]
    InvalidRatio(f32),

    #[error("Invalid distance threshold: {0} (must be finite and > 0)")]
    InvalidDistanceThreshold(f32),
}

pub type MatchResult<T> = Result<T, MatchError>;

/// How the matching phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "status", rename_all = "snake_case"))]
pub enum MatchOutcome {
    Matched,
    /// A side had no descriptors or fewer than four; nothing was compared
    InsufficientDescriptors { query: usize, train: usize },
}

#[derive(Debug, Clone)]
pub struct MatchReport {
    pub matches: MatchSet,
    pub outcome: MatchOutcome,
    pub elapsed: Duration,
}

impl MatchReport {
    fn insufficient(query: usize, train: usize, elapsed: Duration) -> Self {
        Self {
            matches: MatchSet::new(),
            outcome: MatchOutcome::InsufficientDescriptors { query, train },
            elapsed,
        }
    }
}

/// Best and runner-up neighbour of one query descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbours {
    pub best_idx: usize,
    pub best: f32,
    /// `f32::INFINITY` when the train set has a single row
    pub second: f32,
}

/// Exhaustive nearest-neighbour matcher over one distance metric
#[derive(Debug, Clone)]
pub struct BruteForceMatcher<M> {
    metric: M,
    cfg: MatcherConfig,
}

impl<M: DistanceMetric> BruteForceMatcher<M> {
    pub fn new(metric: M, cfg: MatcherConfig) -> MatchResult<Self> {
        if !(cfg.ratio_threshold > 0.0 && cfg.ratio_threshold <= 1.0) {
            return Err(MatchError::InvalidRatio(cfg.ratio_threshold));
        }
        if let Some(t) = cfg.fixed_distance_threshold {
            if !(t.is_finite() && t > 0.0) {
                return Err(MatchError::InvalidDistanceThreshold(t));
            }
        }
        Ok(Self { metric, cfg })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.cfg
    }

    /// Whether 1-NN candidates are filtered by the ratio test rather than
    /// by the fixed distance threshold
    pub fn uses_ratio_test(&self) -> bool {
        self.cfg.ratio_test || M::FAMILY == MetricFamily::Floating
    }

    /// Match every query row against all train rows.
    ///
    /// Missing sets or sets below four rows yield an empty report rather
    /// than an error.
    pub fn match_descriptors(
        &self,
        query: Option<&DescriptorMatrix<M::Element>>,
        train: Option<&DescriptorMatrix<M::Element>>,
    ) -> MatchResult<MatchReport> {
        let t0 = Instant::now();

        let (n_query, n_train) = (query.map_or(0, |q| q.len()), train.map_or(0, |t| t.len()));
        let (Some(query), Some(train)) = (query, train) else {
            debug!(n_query, n_train, "descriptors missing, skipping matching");
            return Ok(MatchReport::insufficient(n_query, n_train, t0.elapsed()));
        };
        if n_query < MIN_CORRESPONDENCES || n_train < MIN_CORRESPONDENCES {
            debug!(n_query, n_train, "too few descriptors, skipping matching");
            return Ok(MatchReport::insufficient(n_query, n_train, t0.elapsed()));
        }
        if query.width() != train.width() {
            return Err(MatchError::WidthMismatch {
                query: query.width(),
                train: train.width(),
            });
        }

        let ratio = self.uses_ratio_test();
        let accepted: Vec<Match> = query
            .as_flat()
            .par_chunks_exact(query.width())
            .enumerate()
            .filter_map(|(qi, q)| {
                let nn = self.nearest_two(q, train)?;
                self.accept(&nn, ratio)
                    .then(|| Match::new(qi, nn.best_idx, nn.best))
            })
            .collect();

        let matches = MatchSet::from_unsorted(accepted);
        let elapsed = t0.elapsed();
        debug!(
            n_query,
            n_train,
            kept = matches.len(),
            ratio_test = ratio,
            ?elapsed,
            "descriptor matching done"
        );

        Ok(MatchReport {
            matches,
            outcome: MatchOutcome::Matched,
            elapsed,
        })
    }

    /// Best and second-best train rows for `q`; lower index wins ties
    pub fn nearest_two(&self, q: &[M::Element], train: &DescriptorMatrix<M::Element>) -> Option<Neighbours> {
        let mut best = f32::INFINITY;
        let mut second = f32::INFINITY;
        let mut best_idx = None;

        for (ti, t) in train.rows().enumerate() {
            let d = self.metric.distance(q, t);
            if d < best {
                second = best;
                best = d;
                best_idx = Some(ti);
            } else if d < second {
                second = d;
            }
        }

        best_idx.map(|best_idx| Neighbours { best_idx, best, second })
    }

    fn accept(&self, nn: &Neighbours, ratio: bool) -> bool {
        if ratio {
            nn.best < self.cfg.ratio_threshold * nn.second
        } else {
            self.cfg
                .fixed_distance_threshold
                .map_or(true, |t| nn.best < t)
        }
    }
}
