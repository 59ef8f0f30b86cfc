//! Similarity model between two rasterized pages.
//!
//! Produces a single scalar cost (lower = more similar) combining a coarse
//! average-hash distance with a structural-similarity estimate, plus a
//! small positional bias that breaks ties between otherwise equally good
//! candidates without dominating genuine similarity.

mod hash;
mod ssim;

pub use hash::Fingerprint;
pub use ssim::ssim_distance;

use crate::model::Page;
use image::imageops::{self, FilterType};
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Gaussian scales used for the structural-similarity estimate.
const SSIM_SIGMAS: [f32; 2] = [1.5, 4.0];

/// Configuration for the page similarity model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Weight of the average-hash distance term
    pub w_hash: f64,
    /// Weight of the structural-similarity distance term
    pub w_ssim: f64,
    /// Weight of the positional bias term (tie-break prior only)
    pub diag_bias: f64,
    /// Square side both rasters are downsampled to before comparison;
    /// bounds computation cost independent of source resolution
    pub work_size: u32,
    /// Square side of the average-hash fingerprint
    pub hash_size: u32,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            w_hash: 0.5,
            w_ssim: 0.5,
            diag_bias: 0.01,
            work_size: 256,
            hash_size: 32,
        }
    }
}

/// Precomputed per-page features.
///
/// Extracting these once per page keeps the pairwise cost loop from
/// re-running the resize and hash for every cell of the cost matrix.
#[derive(Debug, Clone)]
pub struct PageFeatures {
    gray: GrayImage,
    fingerprint: Fingerprint,
    content_hash: u64,
}

/// The similarity model: stateless over sessions, configured once.
#[derive(Debug, Clone, Default)]
pub struct SimilarityModel {
    config: SimilarityConfig,
}

impl SimilarityModel {
    pub fn new(config: SimilarityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// Extract the comparison features of one page.
    pub fn features(&self, page: &Page) -> PageFeatures {
        let gray = imageops::grayscale(page.raster());
        let gray = imageops::resize(
            &gray,
            self.config.work_size,
            self.config.work_size,
            FilterType::Triangle,
        );
        let fingerprint = Fingerprint::average_hash(&gray, self.config.hash_size);
        PageFeatures {
            gray,
            fingerprint,
            content_hash: page.content_hash(),
        }
    }

    /// Pairwise cost between two feature sets.
    ///
    /// `(i, j)` are the page indices within their groups and `(n, m)` the
    /// group sizes; they only feed the positional bias term.
    pub fn cost(
        &self,
        a: &PageFeatures,
        b: &PageFeatures,
        i: usize,
        j: usize,
        n: usize,
        m: usize,
    ) -> f64 {
        let bias = self.positional_bias(i, j, n, m);

        // Byte-identical rasters: both distance terms are exactly zero.
        if a.content_hash == b.content_hash && a.gray.as_raw() == b.gray.as_raw() {
            return bias;
        }

        let hash_dist = a.fingerprint.distance(&b.fingerprint);
        let ssim_dist = ssim_distance(&a.gray, &b.gray, SSIM_SIGMAS);

        self.config.w_hash * hash_dist + self.config.w_ssim * ssim_dist + bias
    }

    fn positional_bias(&self, i: usize, j: usize, n: usize, m: usize) -> f64 {
        let span = n.max(m);
        if span == 0 {
            return 0.0;
        }
        self.config.diag_bias * (i.abs_diff(j) as f64) / span as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GroupTag;
    use image::{Rgb, RgbImage};

    fn page(raster: RgbImage, group: GroupTag, index: usize) -> Page {
        Page::new(raster, group, index, format!("{group}#{}", index + 1))
    }

    fn checkered(w: u32, h: u32, cell: u32) -> RgbImage {
        let mut img = RgbImage::from_pixel(w, h, Rgb([240, 240, 240]));
        for y in 0..h {
            for x in 0..w {
                if (x / cell + y / cell) % 2 == 0 {
                    img.put_pixel(x, y, Rgb([30, 30, 30]));
                }
            }
        }
        img
    }

    #[test]
    fn test_identical_pages_cost_zero_on_diagonal() {
        let model = SimilarityModel::default();
        let a = page(checkered(120, 160, 16), GroupTag::A, 2);
        let b = page(checkered(120, 160, 16), GroupTag::B, 2);
        let (fa, fb) = (model.features(&a), model.features(&b));
        assert_eq!(model.cost(&fa, &fb, 2, 2, 5, 5), 0.0);
    }

    #[test]
    fn test_positional_bias_is_small_off_diagonal() {
        let model = SimilarityModel::default();
        let a = page(checkered(120, 160, 16), GroupTag::A, 0);
        let b = page(checkered(120, 160, 16), GroupTag::B, 4);
        let (fa, fb) = (model.features(&a), model.features(&b));
        let cost = model.cost(&fa, &fb, 0, 4, 5, 5);
        assert!(cost > 0.0 && cost <= model.config().diag_bias);
    }

    #[test]
    fn test_different_pages_cost_more_than_edited_page() {
        let model = SimilarityModel::default();
        let original = checkered(120, 160, 16);
        let mut edited = original.clone();
        for y in 40..60 {
            for x in 40..60 {
                edited.put_pixel(x, y, Rgb([255, 0, 0]));
            }
        }
        // A structurally different page
        let other = checkered(120, 160, 40);

        let fa = model.features(&page(original, GroupTag::A, 0));
        let fe = model.features(&page(edited, GroupTag::B, 0));
        let fo = model.features(&page(other, GroupTag::B, 0));

        let edit_cost = model.cost(&fa, &fe, 0, 0, 1, 1);
        let other_cost = model.cost(&fa, &fo, 0, 0, 1, 1);
        assert!(
            edit_cost < other_cost,
            "edit {edit_cost} should undercut different page {other_cost}"
        );
    }

    #[test]
    fn test_cost_independent_of_source_resolution() {
        // Same content at two resolutions lands in the same work size.
        let model = SimilarityModel::default();
        let fa = model.features(&page(checkered(100, 100, 20), GroupTag::A, 0));
        let fb = model.features(&page(checkered(400, 400, 80), GroupTag::B, 0));
        let cost = model.cost(&fa, &fb, 0, 0, 1, 1);
        assert!(cost < 0.15, "cost was {cost}");
    }
}
