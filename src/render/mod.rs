//! Pixel diff rendering for matched page pairs.
//!
//! Rasters are cropped to the minimum shared width and height before
//! comparison: padding to the maximum would introduce artificial
//! background and inflate the difference percentage, while the overlap
//! region measures only genuinely comparable content.

mod result;

pub use result::{png_data_uri, DiffEntryPayload, DiffStatus, PageDiffResult};

use crate::model::Page;
use image::imageops;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Configuration for the diff renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// A pair is `Changed` when its difference percentage is at or above
    /// this value (inclusive)
    pub change_threshold_pct: f64,
    /// Per-pixel intensity threshold on the grayscale difference, 0-255
    pub pixel_threshold: u8,
    /// Color painted over changed pixels in the highlight composite
    pub highlight_color: [u8; 3],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            change_threshold_pct: 0.001,
            pixel_threshold: 30,
            highlight_color: [255, 0, 0],
        }
    }
}

/// Stateless renderer over session data.
#[derive(Debug, Clone, Default)]
pub struct DiffRenderer {
    config: RenderConfig,
}

impl DiffRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Diff one correspondence entry. At least one side must be present;
    /// a missing side classifies as `Added` (B only) or `Removed` (A only).
    pub fn render(&self, page_a: Option<&Page>, page_b: Option<&Page>) -> PageDiffResult {
        match (page_a, page_b) {
            (None, Some(b)) => PageDiffResult {
                label: b.label().to_string(),
                status: DiffStatus::Added,
                difference_pct: 0.0,
                a_index: None,
                b_index: Some(b.index()),
                highlight: None,
            },
            (Some(a), None) => PageDiffResult {
                label: a.label().to_string(),
                status: DiffStatus::Removed,
                difference_pct: 0.0,
                a_index: Some(a.index()),
                b_index: None,
                highlight: None,
            },
            (Some(a), Some(b)) => self.render_pair(a, b),
            (None, None) => PageDiffResult {
                label: String::new(),
                status: DiffStatus::Unchanged,
                difference_pct: 0.0,
                a_index: None,
                b_index: None,
                highlight: None,
            },
        }
    }

    fn render_pair(&self, a: &Page, b: &Page) -> PageDiffResult {
        let label = b.label().to_string();
        let (a_index, b_index) = (Some(a.index()), Some(b.index()));

        // Byte-identical rasters need no mask pass.
        if a.same_content(b) {
            return PageDiffResult {
                label,
                status: DiffStatus::Unchanged,
                difference_pct: 0.0,
                a_index,
                b_index,
                highlight: None,
            };
        }

        let width = a.width().min(b.width());
        let height = a.height().min(b.height());
        let total = u64::from(width) * u64::from(height);

        // Zero-area overlap: nothing comparable, by convention unchanged.
        if total == 0 {
            return PageDiffResult {
                label,
                status: DiffStatus::Unchanged,
                difference_pct: 0.0,
                a_index,
                b_index,
                highlight: None,
            };
        }

        let crop_a = imageops::crop_imm(a.raster(), 0, 0, width, height).to_image();
        let crop_b = imageops::crop_imm(b.raster(), 0, 0, width, height).to_image();

        let mask = change_mask(&crop_a, &crop_b, self.config.pixel_threshold);
        let set = mask.iter().filter(|&&changed| changed).count() as u64;
        let difference_pct = set as f64 * 100.0 / total as f64;

        // Threshold is inclusive.
        let status = if difference_pct >= self.config.change_threshold_pct {
            DiffStatus::Changed
        } else {
            DiffStatus::Unchanged
        };

        let highlight = (status == DiffStatus::Changed)
            .then(|| highlight_composite(b.raster(), &mask, width, self.config.highlight_color));

        trace!(
            label = %label,
            pct = difference_pct,
            status = %status,
            "pair rendered"
        );

        PageDiffResult {
            label,
            status,
            difference_pct,
            a_index,
            b_index,
            highlight,
        }
    }
}

/// Binary change mask over the overlap region, row-major.
///
/// The absolute per-channel difference is reduced to grayscale with the
/// usual luma weights and binarized: strictly above the intensity
/// threshold counts as changed.
fn change_mask(a: &RgbImage, b: &RgbImage, threshold: u8) -> Vec<bool> {
    a.pixels()
        .zip(b.pixels())
        .map(|(pa, pb)| {
            let dr = pa[0].abs_diff(pb[0]);
            let dg = pa[1].abs_diff(pb[1]);
            let db = pa[2].abs_diff(pb[2]);
            let gray =
                0.299 * f32::from(dr) + 0.587 * f32::from(dg) + 0.114 * f32::from(db);
            gray > f32::from(threshold)
        })
        .collect()
}

/// Copy of the B raster with masked pixels painted the highlight color.
/// The mask covers the top-left overlap region of the full raster.
fn highlight_composite(
    b_raster: &RgbImage,
    mask: &[bool],
    mask_width: u32,
    color: [u8; 3],
) -> RgbImage {
    let mut out = b_raster.clone();
    for (i, &changed) in mask.iter().enumerate() {
        if changed {
            let x = (i as u32) % mask_width;
            let y = (i as u32) / mask_width;
            out.put_pixel(x, y, image::Rgb(color));
        }
    }
    out
}
