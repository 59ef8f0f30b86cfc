//! Global affine-gap alignment over the cost matrix.
//!
//! Three-state Needleman-Wunsch: `M` ends in a match at (i,j), `X` ends in
//! a gap in B (A page deleted), `Y` ends in a gap in A (B page inserted).
//! Opening a gap costs `gap_open`, extending one `gap_extend`, so the
//! optimum favors few long runs of insertions/deletions over many short
//! ones. Tie-breaking is a fixed evaluation order — M, then X, then Y,
//! first minimum kept — at every cell and at termination, which makes the
//! traceback fully deterministic.

use super::{AlignmentEntry, AlignmentPath, CostMatrix};
use crate::error::{PageDiffError, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

const INF: f64 = f64::INFINITY;

// Predecessor-state tags for the traceback.
const FROM_M: u8 = 0;
const FROM_X: u8 = 1;
const FROM_Y: u8 = 2;

/// Alignment parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentParams {
    /// Cost of opening a gap (must be >= `gap_extend`)
    pub gap_open: f64,
    /// Cost of extending an already-open gap
    pub gap_extend: f64,
    /// Optional band half-width: cells with |i-j| > band are unreachable.
    /// Bounds work to O((n+m)·band) but can miss the true optimum when the
    /// correct alignment drifts further off the diagonal than the band.
    pub band: Option<usize>,
    /// Optional wall-clock budget for the DP
    pub timeout: Option<Duration>,
    /// Acceptance ceiling for greedy auto pairing
    pub auto_accept_cost: f64,
}

impl Default for AlignmentParams {
    fn default() -> Self {
        Self {
            gap_open: 0.5,
            gap_extend: 0.25,
            band: None,
            timeout: None,
            auto_accept_cost: 0.4,
        }
    }
}

/// The alignment engine: a stateless function over a cost matrix,
/// configured once with its gap model.
#[derive(Debug, Clone, Default)]
pub struct AlignmentEngine {
    params: AlignmentParams,
}

impl AlignmentEngine {
    pub fn new(params: AlignmentParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &AlignmentParams {
        &self.params
    }

    /// Compute the globally optimal correspondence between the two page
    /// sequences described by `costs`.
    pub fn align(&self, costs: &CostMatrix) -> Result<AlignmentPath> {
        let n = costs.rows();
        let m = costs.cols();

        // Degenerate sequences need no DP.
        if n == 0 || m == 0 {
            return Ok(AlignmentPath::sequential(n, m));
        }

        let started = Instant::now();
        let deadline = self.params.timeout.map(|t| started + t);
        let band = self.params.band;
        let in_band = |i: usize, j: usize| band.map_or(true, |b| i.abs_diff(j) <= b);

        let w = m + 1;
        let cells = (n + 1) * w;
        let mut mm = vec![INF; cells];
        let mut xx = vec![INF; cells];
        let mut yy = vec![INF; cells];
        let mut bm = vec![FROM_M; cells];
        let mut bx = vec![FROM_M; cells];
        let mut by = vec![FROM_M; cells];

        // Boundary: leading gaps are one opened gap plus extensions.
        mm[0] = 0.0;
        for i in 1..=n {
            if !in_band(i, 0) {
                break;
            }
            xx[i * w] = self.params.gap_open + (i - 1) as f64 * self.params.gap_extend;
            bx[i * w] = if i == 1 { FROM_M } else { FROM_X };
        }
        for j in 1..=m {
            if !in_band(0, j) {
                break;
            }
            yy[j] = self.params.gap_open + (j - 1) as f64 * self.params.gap_extend;
            by[j] = if j == 1 { FROM_M } else { FROM_Y };
        }

        for i in 1..=n {
            if let Some(d) = deadline {
                if Instant::now() > d {
                    let budget = self.params.timeout.unwrap_or_default();
                    return Err(PageDiffError::align_timeout(started.elapsed(), budget));
                }
            }
            for j in 1..=m {
                if !in_band(i, j) {
                    continue;
                }
                let cur = i * w + j;
                let diag = (i - 1) * w + (j - 1);
                let up = (i - 1) * w + j;
                let left = i * w + (j - 1);

                // M: close a match at (i,j); predecessors tried M, X, Y.
                let mut best = mm[diag];
                let mut ptr = FROM_M;
                if xx[diag] < best {
                    best = xx[diag];
                    ptr = FROM_X;
                }
                if yy[diag] < best {
                    best = yy[diag];
                    ptr = FROM_Y;
                }
                if best < INF {
                    mm[cur] = costs.get(i - 1, j - 1) + best;
                    bm[cur] = ptr;
                }

                // X: gap in B (delete A[i-1]); open from M beats extend on ties.
                let open = mm[up] + self.params.gap_open;
                let extend = xx[up] + self.params.gap_extend;
                if open <= extend {
                    if open < INF {
                        xx[cur] = open;
                        bx[cur] = FROM_M;
                    }
                } else {
                    xx[cur] = extend;
                    bx[cur] = FROM_X;
                }

                // Y: gap in A (insert B[j-1]).
                let open = mm[left] + self.params.gap_open;
                let extend = yy[left] + self.params.gap_extend;
                if open <= extend {
                    if open < INF {
                        yy[cur] = open;
                        by[cur] = FROM_M;
                    }
                } else {
                    yy[cur] = extend;
                    by[cur] = FROM_Y;
                }
            }
        }

        // Terminal state, ties broken M, X, Y.
        let last = n * w + m;
        let mut state = FROM_M;
        let mut total = mm[last];
        if xx[last] < total {
            total = xx[last];
            state = FROM_X;
        }
        if yy[last] < total {
            total = yy[last];
            state = FROM_Y;
        }
        if total == INF {
            return Err(PageDiffError::validation(format!(
                "no alignment within band {band:?} for {n}x{m} pages; widen the band"
            )));
        }

        debug!(
            n,
            m,
            total_cost = total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "alignment complete"
        );

        // Traceback from (n, m) to (0, 0), then reverse.
        let mut entries = Vec::with_capacity(n + m);
        let mut i = n;
        let mut j = m;
        while i > 0 || j > 0 {
            let cur = i * w + j;
            match state {
                FROM_M => {
                    entries.push(AlignmentEntry::Matched { a: i - 1, b: j - 1 });
                    state = bm[cur];
                    i -= 1;
                    j -= 1;
                }
                FROM_X => {
                    entries.push(AlignmentEntry::Deleted { a: i - 1 });
                    state = bx[cur];
                    i -= 1;
                }
                _ => {
                    entries.push(AlignmentEntry::Inserted { b: j - 1 });
                    state = by[cur];
                    j -= 1;
                }
            }
        }
        entries.reverse();
        trace!(entries = entries.len(), "traceback done");

        Ok(AlignmentPath::from_entries(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn align(rows: Vec<Vec<f64>>, params: AlignmentParams) -> AlignmentPath {
        AlignmentEngine::new(params)
            .align(&CostMatrix::from_rows(rows))
            .expect("alignment should succeed")
    }

    #[test]
    fn test_identity_diagonal_at_zero_cost() {
        let path = align(
            vec![
                vec![0.0, 0.9, 0.9],
                vec![0.9, 0.0, 0.9],
                vec![0.9, 0.9, 0.0],
            ],
            AlignmentParams::default(),
        );
        assert_eq!(
            path.entries(),
            &[
                AlignmentEntry::Matched { a: 0, b: 0 },
                AlignmentEntry::Matched { a: 1, b: 1 },
                AlignmentEntry::Matched { a: 2, b: 2 },
            ]
        );
    }

    #[test]
    fn test_tie_break_prefers_matches() {
        // All-zero costs and zero gap penalties make every path optimal;
        // the M-first evaluation order must still yield the pure diagonal.
        let params = AlignmentParams {
            gap_open: 0.0,
            gap_extend: 0.0,
            ..AlignmentParams::default()
        };
        let path = align(vec![vec![0.0; 3]; 3], params);
        assert_eq!(path.matched_count(), 3);
        assert!(path.check_coverage(3, 3));
    }

    #[test]
    fn test_deletion_and_insertion_around_shared_page() {
        // A = [p1, p2], B = [p2, p3]; p2 pairs at cost 0.
        let path = align(
            vec![vec![0.8, 0.7], vec![0.0, 0.9]],
            AlignmentParams::default(),
        );
        assert_eq!(
            path.entries(),
            &[
                AlignmentEntry::Deleted { a: 0 },
                AlignmentEntry::Matched { a: 1, b: 0 },
                AlignmentEntry::Inserted { b: 1 },
            ]
        );
    }

    #[test]
    fn test_affine_gaps_prefer_one_long_run() {
        // Matching any off-diagonal pair is expensive; the cheap layout is
        // one run of deletions, not deletions scattered between matches.
        let rows = vec![
            vec![0.05, 1.0],
            vec![1.0, 1.0],
            vec![1.0, 1.0],
            vec![1.0, 0.05],
        ];
        let path = align(rows, AlignmentParams::default());
        assert_eq!(
            path.entries(),
            &[
                AlignmentEntry::Matched { a: 0, b: 0 },
                AlignmentEntry::Deleted { a: 1 },
                AlignmentEntry::Deleted { a: 2 },
                AlignmentEntry::Matched { a: 3, b: 1 },
            ]
        );
    }

    #[test]
    fn test_empty_sides() {
        let engine = AlignmentEngine::default();
        let path = engine
            .align(&CostMatrix::from_rows(Vec::new()))
            .expect("empty matrix");
        assert!(path.is_empty());

        // 2x0: everything deleted
        let path = engine
            .align(&CostMatrix::from_rows(vec![vec![], vec![]]))
            .expect("no B pages");
        assert_eq!(
            path.entries(),
            &[
                AlignmentEntry::Deleted { a: 0 },
                AlignmentEntry::Deleted { a: 1 },
            ]
        );
    }

    #[test]
    fn test_band_limits_reachability() {
        // The optimum pairs A0 with B3 (cost 2.0 total, gaps around one free
        // match); a band of 1 cannot reach that cell and settles for a
        // within-band cover instead.
        let mut rows = vec![vec![1.0; 4]; 4];
        rows[0][3] = 0.0;

        let unbanded = align(rows.clone(), AlignmentParams::default());
        assert!(unbanded
            .entries()
            .contains(&AlignmentEntry::Matched { a: 0, b: 3 }));

        let banded = align(
            rows,
            AlignmentParams {
                band: Some(1),
                ..AlignmentParams::default()
            },
        );
        assert!(banded.check_coverage(4, 4));
        assert!(!banded
            .entries()
            .contains(&AlignmentEntry::Matched { a: 0, b: 3 }));
    }

    #[test]
    fn test_band_too_narrow_is_an_error() {
        // Terminal cell (1,4) lies outside band 1 entirely.
        let engine = AlignmentEngine::new(AlignmentParams {
            band: Some(1),
            ..AlignmentParams::default()
        });
        let err = engine
            .align(&CostMatrix::from_rows(vec![vec![0.0; 4]]))
            .expect_err("terminal outside the band");
        assert!(err.to_string().contains("band"));
    }

    #[test]
    fn test_timeout_surfaces() {
        let rows = vec![vec![0.5; 220]; 220];
        let engine = AlignmentEngine::new(AlignmentParams {
            timeout: Some(Duration::ZERO),
            ..AlignmentParams::default()
        });
        let err = engine
            .align(&CostMatrix::from_rows(rows))
            .expect_err("zero budget must time out");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_coverage_on_skewed_sizes() {
        let path = align(vec![vec![0.3; 7]; 2], AlignmentParams::default());
        assert!(path.check_coverage(2, 7));
    }
}
