#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Correspondence between descriptor `query_idx` of image A and `train_idx` of image B
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Match {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
}

impl Match {
    pub fn new(query_idx: usize, train_idx: usize, distance: f32) -> Self {
        Self { query_idx, train_idx, distance }
    }
}

/// Matches ordered by ascending distance, ties by ascending query index.
///
/// The ordering is established on construction and every derived set
/// (`top_k`, `select`) keeps it.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "Vec<Match>", into = "Vec<Match>"))]
pub struct MatchSet {
    matches: Vec<Match>,
}

impl MatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort `matches` into canonical order
    pub fn from_unsorted(mut matches: Vec<Match>) -> Self {
        matches.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.query_idx.cmp(&b.query_idx))
                .then(a.train_idx.cmp(&b.train_idx))
        });
        Self { matches }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn as_slice(&self) -> &[Match] {
        &self.matches
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }

    pub fn distances(&self) -> impl Iterator<Item = f32> + '_ {
        self.matches.iter().map(|m| m.distance)
    }

    /// The `k` closest matches
    pub fn top_k(&self, k: usize) -> &[Match] {
        &self.matches[..k.min(self.matches.len())]
    }

    /// Order-preserving subsequence of the entries whose flag is set.
    ///
    /// Flags past the end of `mask` count as unset.
    pub fn select(&self, mask: &[bool]) -> MatchSet {
        let matches = self
            .matches
            .iter()
            .zip(mask.iter())
            .filter_map(|(m, &keep)| keep.then_some(*m))
            .collect();
        Self { matches }
    }

    pub fn into_vec(self) -> Vec<Match> {
        self.matches
    }
}

impl From<Vec<Match>> for MatchSet {
    fn from(matches: Vec<Match>) -> Self {
        Self::from_unsorted(matches)
    }
}

impl From<MatchSet> for Vec<Match> {
    fn from(set: MatchSet) -> Self {
        set.matches
    }
}

impl<'a> IntoIterator for &'a MatchSet {
    type Item = &'a Match;
    type IntoIter = std::slice::Iter<'a, Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sort_breaks_ties_by_query() {
        let set = MatchSet::from_unsorted(vec![
            Match::new(5, 0, 10.0),
            Match::new(2, 1, 3.0),
            Match::new(1, 2, 10.0),
            Match::new(0, 3, 3.0),
        ]);
        let order: Vec<usize> = set.iter().map(|m| m.query_idx).collect();
        assert_eq!(order, vec![0, 2, 1, 5]);
    }

    #[test]
    fn test_top_k_truncation() {
        let set = MatchSet::from_unsorted((0..5).map(|i| Match::new(i, i, i as f32)).collect());
        assert_eq!(set.top_k(2).len(), 2);
        assert_eq!(set.top_k(2)[1].query_idx, 1);
        assert_eq!(set.top_k(50).len(), 5);
        assert!(MatchSet::new().top_k(3).is_empty());
    }

    #[test]
    fn test_select_preserves_order() {
        let set = MatchSet::from_unsorted((0..4).map(|i| Match::new(i, i, i as f32)).collect());
        let picked = set.select(&[true, false, true, true]);
        let ids: Vec<usize> = picked.iter().map(|m| m.query_idx).collect();
        assert_eq!(ids, vec![0, 2, 3]);

        // Short mask leaves the tail out
        assert_eq!(set.select(&[true]).len(), 1);
    }

    proptest! {
        #[test]
        fn prop_sorted_by_distance_then_query(
            raw in proptest::collection::vec((0usize..64, 0usize..64, 0u8..8), 0..40)
        ) {
            let matches = raw
                .into_iter()
                .map(|(q, t, d)| Match::new(q, t, d as f32))
                .collect();
            let set = MatchSet::from_unsorted(matches);
            for w in set.as_slice().windows(2) {
                prop_assert!(w[0].distance <= w[1].distance);
                if w[0].distance == w[1].distance {
                    prop_assert!(w[0].query_idx <= w[1].query_idx);
                }
            }
        }

        #[test]
        fn prop_select_is_subsequence(
            n in 0usize..30,
            mask in proptest::collection::vec(any::<bool>(), 0..30)
        ) {
            let set = MatchSet::from_unsorted((0..n).map(|i| Match::new(i, i, (i % 7) as f32)).collect());
            let picked = set.select(&mask);
            prop_assert!(picked.len() <= set.len());

            let mut cursor = set.iter();
            for m in picked.iter() {
                prop_assert!(cursor.any(|x| x == m));
            }
        }
    }
}
