//! Alignment paths: the correspondence between two page sequences.

use crate::error::{AlignErrorKind, PageDiffError, Result};
use serde::{Deserialize, Serialize};

/// One correspondence entry between the two groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AlignmentEntry {
    /// Page `a` of group A corresponds to page `b` of group B
    Matched { a: usize, b: usize },
    /// Page `b` exists only in group B
    Inserted { b: usize },
    /// Page `a` exists only in group A
    Deleted { a: usize },
}

/// Ordered cover of both page sequences by matched/inserted/deleted entries.
///
/// Invariant: every index of A and of B appears in exactly one entry, and
/// the sequence is monotonically non-decreasing in both indices.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlignmentPath {
    entries: Vec<AlignmentEntry>,
}

impl AlignmentPath {
    /// Wrap a pre-built entry sequence. Callers are responsible for the
    /// coverage invariant; constructors in this module uphold it.
    pub(crate) fn from_entries(entries: Vec<AlignmentEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[AlignmentEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of matched pairs in the path.
    pub fn matched_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, AlignmentEntry::Matched { .. }))
            .count()
    }

    /// Verify the coverage invariant against the group sizes: each index
    /// of A and B appears exactly once and both index streams are
    /// monotonically non-decreasing.
    pub fn check_coverage(&self, n: usize, m: usize) -> bool {
        let mut next_a = 0usize;
        let mut next_b = 0usize;
        for entry in &self.entries {
            match *entry {
                AlignmentEntry::Matched { a, b } => {
                    if a != next_a || b != next_b {
                        return false;
                    }
                    next_a += 1;
                    next_b += 1;
                }
                AlignmentEntry::Deleted { a } => {
                    if a != next_a {
                        return false;
                    }
                    next_a += 1;
                }
                AlignmentEntry::Inserted { b } => {
                    if b != next_b {
                        return false;
                    }
                    next_b += 1;
                }
            }
        }
        next_a == n && next_b == m
    }

    /// Position-based pairing: page i of A with page i of B, the overhang
    /// reported as deleted or inserted.
    pub fn sequential(n: usize, m: usize) -> Self {
        let mut entries = Vec::with_capacity(n.max(m));
        for i in 0..n.min(m) {
            entries.push(AlignmentEntry::Matched { a: i, b: i });
        }
        for a in m..n {
            entries.push(AlignmentEntry::Deleted { a });
        }
        for b in n..m {
            entries.push(AlignmentEntry::Inserted { b });
        }
        Self { entries }
    }

    /// Caller-specified pairing. Pairs may arrive in any order but must
    /// be in range, free of duplicates, and non-crossing.
    pub fn manual(n: usize, m: usize, pairs: &[(usize, usize)]) -> Result<Self> {
        let mut sorted: Vec<(usize, usize)> = pairs.to_vec();
        sorted.sort_unstable();

        for (&(a0, b0), &(a1, b1)) in sorted.iter().zip(sorted.iter().skip(1)) {
            if a0 == a1 || b0 == b1 {
                return Err(PageDiffError::validation(format!(
                    "duplicate page in manual pairs: ({a0},{b0}) and ({a1},{b1})"
                )));
            }
            if b1 < b0 {
                return Err(PageDiffError::Align {
                    source: AlignErrorKind::CrossingPairs { a0, b0, a1, b1 },
                });
            }
        }
        if let Some(&(a, b)) = sorted.iter().find(|&&(a, b)| a >= n || b >= m) {
            return Err(PageDiffError::validation(format!(
                "manual pair ({a},{b}) out of range for groups of {n} and {m} pages"
            )));
        }

        Ok(Self::weave(n, m, &sorted))
    }

    /// Greedy automatic pairing over a pairwise cost table.
    ///
    /// Candidates are taken cheapest-first (ties broken by (i, j)),
    /// accepting a pair only if both pages are free, its cost is at or
    /// under `accept_cost`, and it does not cross an accepted pair. The
    /// result keeps the path monotonicity invariant that an unconstrained
    /// assignment would violate.
    pub fn auto(costs: &super::CostMatrix, accept_cost: f64) -> Self {
        let (n, m) = (costs.rows(), costs.cols());
        let mut candidates: Vec<(f64, usize, usize)> = Vec::with_capacity(n * m);
        for i in 0..n {
            for j in 0..m {
                let c = costs.get(i, j);
                if c <= accept_cost {
                    candidates.push((c, i, j));
                }
            }
        }
        candidates.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));

        let mut used_a = vec![false; n];
        let mut used_b = vec![false; m];
        let mut accepted: Vec<(usize, usize)> = Vec::new();

        'outer: for &(_, i, j) in &candidates {
            if used_a[i] || used_b[j] {
                continue;
            }
            for &(ai, bj) in &accepted {
                let crosses = (ai < i) != (bj < j);
                if crosses {
                    continue 'outer;
                }
            }
            used_a[i] = true;
            used_b[j] = true;
            accepted.push((i, j));
        }

        accepted.sort_unstable();
        Self::weave(n, m, &accepted)
    }

    /// Expand a sorted, non-crossing pair list into a full cover,
    /// emitting deletions before insertions between matches.
    fn weave(n: usize, m: usize, sorted_pairs: &[(usize, usize)]) -> Self {
        let mut entries = Vec::with_capacity(n + m);
        let mut next_a = 0usize;
        let mut next_b = 0usize;
        for &(a, b) in sorted_pairs {
            for da in next_a..a {
                entries.push(AlignmentEntry::Deleted { a: da });
            }
            for ib in next_b..b {
                entries.push(AlignmentEntry::Inserted { b: ib });
            }
            entries.push(AlignmentEntry::Matched { a, b });
            next_a = a + 1;
            next_b = b + 1;
        }
        for da in next_a..n {
            entries.push(AlignmentEntry::Deleted { a: da });
        }
        for ib in next_b..m {
            entries.push(AlignmentEntry::Inserted { b: ib });
        }
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_equal_lengths() {
        let path = AlignmentPath::sequential(3, 3);
        assert_eq!(
            path.entries(),
            &[
                AlignmentEntry::Matched { a: 0, b: 0 },
                AlignmentEntry::Matched { a: 1, b: 1 },
                AlignmentEntry::Matched { a: 2, b: 2 },
            ]
        );
        assert!(path.check_coverage(3, 3));
    }

    #[test]
    fn test_sequential_overhang() {
        let path = AlignmentPath::sequential(2, 4);
        assert!(path.check_coverage(2, 4));
        assert_eq!(
            &path.entries()[2..],
            &[
                AlignmentEntry::Inserted { b: 2 },
                AlignmentEntry::Inserted { b: 3 },
            ]
        );
    }

    #[test]
    fn test_empty_groups() {
        assert!(AlignmentPath::sequential(0, 0).is_empty());

        let only_b = AlignmentPath::sequential(0, 3);
        assert_eq!(
            only_b.entries(),
            &[
                AlignmentEntry::Inserted { b: 0 },
                AlignmentEntry::Inserted { b: 1 },
                AlignmentEntry::Inserted { b: 2 },
            ]
        );
    }

    #[test]
    fn test_manual_weaves_gaps() {
        let path = AlignmentPath::manual(3, 3, &[(1, 0), (2, 2)]).unwrap();
        assert_eq!(
            path.entries(),
            &[
                AlignmentEntry::Deleted { a: 0 },
                AlignmentEntry::Matched { a: 1, b: 0 },
                AlignmentEntry::Inserted { b: 1 },
                AlignmentEntry::Matched { a: 2, b: 2 },
            ]
        );
        assert!(path.check_coverage(3, 3));
    }

    #[test]
    fn test_manual_rejects_crossing() {
        let err = AlignmentPath::manual(2, 2, &[(0, 1), (1, 0)]).unwrap_err();
        assert!(err.to_string().contains("cross"));
    }

    #[test]
    fn test_manual_rejects_duplicates_and_range() {
        assert!(AlignmentPath::manual(3, 3, &[(0, 0), (0, 1)]).is_err());
        assert!(AlignmentPath::manual(2, 2, &[(2, 0)]).is_err());
    }

    #[test]
    fn test_coverage_detects_omission() {
        let path = AlignmentPath::from_entries(vec![AlignmentEntry::Matched { a: 0, b: 0 }]);
        assert!(!path.check_coverage(2, 1));
    }
}
