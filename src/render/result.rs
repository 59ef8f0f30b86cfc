//! Diff result and payload types.

use crate::error::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Classification of one correspondence entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    /// Page exists only in group B
    Added,
    /// Page exists only in group A
    Removed,
    /// Both present, difference percentage at or above the threshold
    Changed,
    /// Both present, below the threshold
    Unchanged,
}

impl std::fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        };
        write!(f, "{s}")
    }
}

/// Result of diffing one correspondence entry. Immutable once produced;
/// the session cache hands out clones of the stored value.
///
/// Original rasters are referenced by index into the owning session's
/// page groups rather than duplicated here.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDiffResult {
    /// Display label (the present side's page label; B wins when both exist)
    pub label: String,
    pub status: DiffStatus,
    /// Difference percentage in [0, 100]
    pub difference_pct: f64,
    /// Index of the A page, absent for `Added`
    pub a_index: Option<usize>,
    /// Index of the B page, absent for `Removed`
    pub b_index: Option<usize>,
    /// Highlighted composite, present only when `Changed`
    pub highlight: Option<RgbImage>,
}

/// Wire payload for one correspondence entry, field names matching the
/// consuming UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntryPayload {
    pub label: String,
    pub status: DiffStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_a: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_b: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_image: Option<String>,
    pub difference_percentage: f64,
}

impl DiffEntryPayload {
    /// Package one diff result for the wire, encoding the referenced
    /// originals and the highlight composite as PNG data URIs.
    pub fn from_result(
        result: &PageDiffResult,
        group_a: &crate::model::PageGroup,
        group_b: &crate::model::PageGroup,
    ) -> Result<Self> {
        let encode = |group: &crate::model::PageGroup, idx: Option<usize>| {
            idx.and_then(|i| group.get(i))
                .map(|p| png_data_uri(p.raster()))
                .transpose()
        };
        Ok(Self {
            label: result.label.clone(),
            status: result.status,
            original_a: encode(group_a, result.a_index)?,
            original_b: encode(group_b, result.b_index)?,
            diff_image: result.highlight.as_ref().map(png_data_uri).transpose()?,
            difference_percentage: result.difference_pct,
        })
    }
}

/// Encode a raster as a `data:image/png;base64,...` URI.
pub fn png_data_uri(img: &RgbImage) -> Result<String> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        BASE64.encode(buf.into_inner())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&DiffStatus::Unchanged).unwrap(),
            "\"unchanged\""
        );
    }

    #[test]
    fn test_payload_field_names() {
        let payload = DiffEntryPayload {
            label: "b.pdf#1".into(),
            status: DiffStatus::Added,
            original_a: None,
            original_b: Some("data:image/png;base64,AAAA".into()),
            diff_image: None,
            difference_percentage: 0.0,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("originalB").is_some());
        assert!(json.get("originalA").is_none());
        assert!(json.get("differencePercentage").is_some());
    }

    #[test]
    fn test_png_data_uri_prefix() {
        let img = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        let uri = png_data_uri(&img).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }
}
