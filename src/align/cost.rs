//! Pairwise cost matrix between two page groups.

use crate::model::PageGroup;
use crate::similarity::{PageFeatures, SimilarityModel};
use rayon::prelude::*;
use tracing::debug;

/// An n×m grid of non-negative pairwise costs, immutable after build.
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl CostMatrix {
    /// Apply the similarity model across every (A-page, B-page) pair.
    ///
    /// Feature extraction and the n·m cells are both independent, so both
    /// phases run on the rayon pool. The whole matrix is materialized
    /// before alignment begins; the DP needs full matrix access.
    pub fn build(model: &SimilarityModel, group_a: &PageGroup, group_b: &PageGroup) -> Self {
        let n = group_a.len();
        let m = group_b.len();

        let feats_a: Vec<PageFeatures> = group_a
            .pages()
            .par_iter()
            .map(|p| model.features(p))
            .collect();
        let feats_b: Vec<PageFeatures> = group_b
            .pages()
            .par_iter()
            .map(|p| model.features(p))
            .collect();

        let data: Vec<f64> = (0..n * m)
            .into_par_iter()
            .map(|idx| {
                let (i, j) = (idx / m.max(1), idx % m.max(1));
                model.cost(&feats_a[i], &feats_b[j], i, j, n, m)
            })
            .collect();

        debug!(rows = n, cols = m, "cost matrix built");
        Self {
            rows: n,
            cols: m,
            data,
        }
    }

    /// Build a matrix from explicit row data. Rows must all have `cols`
    /// entries; used by tests and by callers with precomputed costs.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let n = rows.len();
        let m = rows.first().map_or(0, Vec::len);
        debug_assert!(rows.iter().all(|r| r.len() == m));
        Self {
            rows: n,
            cols: m,
            data: rows.into_iter().flatten().collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cost of pairing A page `i` with B page `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GroupTag;
    use crate::similarity::SimilarityConfig;
    use image::{Rgb, RgbImage};

    fn group(tag: GroupTag, fills: &[[u8; 3]]) -> PageGroup {
        let rasters = fills
            .iter()
            .map(|&rgb| RgbImage::from_pixel(40, 40, Rgb(rgb)))
            .collect();
        PageGroup::from_rasters(format!("{tag}.pdf"), tag, rasters)
    }

    #[test]
    fn test_build_shape_and_diagonal() {
        let model = SimilarityModel::new(SimilarityConfig {
            work_size: 64,
            ..SimilarityConfig::default()
        });
        let a = group(GroupTag::A, &[[0, 0, 0], [255, 255, 255]]);
        let b = group(GroupTag::B, &[[0, 0, 0], [255, 255, 255]]);
        let matrix = CostMatrix::build(&model, &a, &b);

        assert_eq!((matrix.rows(), matrix.cols()), (2, 2));
        assert_eq!(matrix.get(0, 0), 0.0);
        assert_eq!(matrix.get(1, 1), 0.0);
        assert!(matrix.get(0, 1) > matrix.get(0, 0));
    }

    #[test]
    fn test_empty_group_yields_empty_matrix() {
        let model = SimilarityModel::default();
        let a = group(GroupTag::A, &[]);
        let b = group(GroupTag::B, &[[9, 9, 9]]);
        let matrix = CostMatrix::build(&model, &a, &b);
        assert_eq!((matrix.rows(), matrix.cols()), (0, 1));
    }

    #[test]
    fn test_from_rows_indexing() {
        let matrix = CostMatrix::from_rows(vec![vec![0.0, 1.0, 2.0], vec![3.0, 4.0, 5.0]]);
        assert_eq!(matrix.get(1, 2), 5.0);
        assert_eq!(matrix.get(0, 1), 1.0);
    }
}
