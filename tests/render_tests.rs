//! Pixel diff rendering and wire payload tests.

use image::{Rgb, RgbImage};
use page_diff::{
    AppConfig, DiffRenderer, DiffStatus, GroupTag, Page, PageGroup, RenderConfig,
};

fn page(tag: GroupTag, index: usize, raster: RgbImage) -> Page {
    Page::new(raster, tag, index, format!("{tag}.pdf#{}", index + 1))
}

fn renderer() -> DiffRenderer {
    DiffRenderer::new(RenderConfig::default())
}

// ============================================================================
// Highlight composition
// ============================================================================

mod highlight {
    use super::*;

    #[test]
    fn changed_region_is_painted_on_the_new_page() {
        let base = RgbImage::from_pixel(50, 50, Rgb([240, 240, 240]));
        let mut edited = base.clone();
        for y in 10..20 {
            for x in 10..20 {
                edited.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }

        let a = page(GroupTag::A, 0, base);
        let b = page(GroupTag::B, 0, edited);
        let result = renderer().render(Some(&a), Some(&b));

        assert_eq!(result.status, DiffStatus::Changed);
        let expected_pct = 100.0 * 100.0 / (50.0 * 50.0);
        assert!((result.difference_pct - expected_pct).abs() < 1e-9);

        let highlight = result.highlight.as_ref().expect("changed entries carry a highlight");
        assert_eq!(highlight.get_pixel(15, 15).0, [255, 0, 0]);
        // Pixels outside the edit are taken from the new page untouched.
        assert_eq!(highlight.get_pixel(40, 40).0, [240, 240, 240]);
    }

    #[test]
    fn identical_pages_are_unchanged_without_highlight() {
        let raster = RgbImage::from_pixel(30, 30, Rgb([100, 150, 200]));
        let a = page(GroupTag::A, 0, raster.clone());
        let b = page(GroupTag::B, 0, raster);

        let result = renderer().render(Some(&a), Some(&b));
        assert_eq!(result.status, DiffStatus::Unchanged);
        assert_eq!(result.difference_pct, 0.0);
        assert!(result.highlight.is_none());
    }

    #[test]
    fn size_mismatch_is_compared_on_the_common_area() {
        // Identical in the overlapping 40x40 region; B has extra margin.
        let a_img = RgbImage::from_pixel(40, 40, Rgb([10, 10, 10]));
        let b_img = RgbImage::from_pixel(60, 50, Rgb([10, 10, 10]));

        let a = page(GroupTag::A, 0, a_img);
        let b = page(GroupTag::B, 0, b_img);
        let result = renderer().render(Some(&a), Some(&b));
        assert_eq!(result.status, DiffStatus::Unchanged);
    }

    #[test]
    fn sub_threshold_intensity_noise_is_ignored() {
        let base = RgbImage::from_pixel(20, 20, Rgb([100, 100, 100]));
        // +20 on every channel stays under the per-pixel threshold of 30.
        let noisy = RgbImage::from_pixel(20, 20, Rgb([120, 120, 120]));

        let a = page(GroupTag::A, 0, base);
        let b = page(GroupTag::B, 0, noisy);
        let result = renderer().render(Some(&a), Some(&b));
        assert_eq!(result.status, DiffStatus::Unchanged);
        assert_eq!(result.difference_pct, 0.0);
    }
}

// ============================================================================
// One-sided entries
// ============================================================================

mod one_sided {
    use super::*;

    #[test]
    fn only_b_present_is_added() {
        let b = page(GroupTag::B, 2, RgbImage::from_pixel(10, 10, Rgb([1, 2, 3])));
        let result = renderer().render(None, Some(&b));
        assert_eq!(result.status, DiffStatus::Added);
        assert_eq!(result.label, "B.pdf#3");
        assert_eq!(result.difference_pct, 0.0);
        assert_eq!(result.a_index, None);
        assert_eq!(result.b_index, Some(2));
    }

    #[test]
    fn only_a_present_is_removed() {
        let a = page(GroupTag::A, 0, RgbImage::from_pixel(10, 10, Rgb([1, 2, 3])));
        let result = renderer().render(Some(&a), None);
        assert_eq!(result.status, DiffStatus::Removed);
        assert_eq!(result.difference_pct, 0.0);
        assert_eq!(result.b_index, None);
    }
}

// ============================================================================
// Wire payloads
// ============================================================================

mod payload {
    use super::*;

    #[test]
    fn payload_embeds_data_uris_with_camel_case_fields() {
        let base = RgbImage::from_pixel(16, 16, Rgb([255, 255, 255]));
        let mut edited = base.clone();
        for y in 0..16 {
            edited.put_pixel(0, y, Rgb([0, 0, 0]));
        }

        let group_a = PageGroup::from_rasters("A.pdf", GroupTag::A, vec![base]);
        let group_b = PageGroup::from_rasters("B.pdf", GroupTag::B, vec![edited]);

        let pipeline = page_diff::ComparePipeline::new(&AppConfig::default());
        let report = pipeline
            .compare(&group_a, &group_b, page_diff::PairingMode::Sequential, &[])
            .expect("compare");
        let payloads = pipeline
            .payloads(&report, &group_a, &group_b)
            .expect("payloads");

        assert_eq!(payloads.len(), 1);
        let entry = &payloads[0];
        assert_eq!(entry.status, DiffStatus::Changed);
        for uri in [&entry.original_a, &entry.original_b, &entry.diff_image] {
            assert!(uri
                .as_deref()
                .expect("all three images present for a changed entry")
                .starts_with("data:image/png;base64,"));
        }

        let json = serde_json::to_value(entry).expect("serialize");
        assert!(json.get("originalA").is_some());
        assert!(json.get("diffImage").is_some());
        assert!(json.get("differencePercentage").is_some());
    }

    #[test]
    fn payload_for_added_entry_has_no_a_side_image() {
        let group_a = PageGroup::empty("A.pdf");
        let group_b = PageGroup::from_rasters(
            "B.pdf",
            GroupTag::B,
            vec![RgbImage::from_pixel(8, 8, Rgb([5, 5, 5]))],
        );

        let pipeline = page_diff::ComparePipeline::new(&AppConfig::default());
        let report = pipeline
            .compare(&group_a, &group_b, page_diff::PairingMode::Sequential, &[])
            .expect("compare");
        let payloads = pipeline
            .payloads(&report, &group_a, &group_b)
            .expect("payloads");

        let entry = &payloads[0];
        assert_eq!(entry.status, DiffStatus::Added);
        assert!(entry.original_a.is_none());
        assert!(entry.original_b.is_some());
        assert!(entry.diff_image.is_none());

        // Absent images are omitted from the serialized form entirely.
        let json = serde_json::to_value(entry).expect("serialize");
        assert!(json.get("originalA").is_none());
    }

    #[test]
    fn data_uri_round_trips_through_the_decoder() {
        let raster = RgbImage::from_pixel(12, 9, Rgb([7, 77, 177]));
        let uri = page_diff::png_data_uri(&raster).expect("encode");
        let back = page_diff::session::decode_data_uri(&uri).expect("decode");
        assert_eq!(back, raster);
    }
}
