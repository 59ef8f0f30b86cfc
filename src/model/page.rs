//! Page and page group types.

use super::GroupTag;
use image::RgbImage;
use xxhash_rust::xxh3::xxh3_64;

/// One rasterized page: an immutable RGB buffer plus its identity
/// within the comparison.
///
/// The label is derived from the source filename, not the page index,
/// so it stays stable when pages are inserted or removed.
#[derive(Debug, Clone)]
pub struct Page {
    raster: RgbImage,
    group: GroupTag,
    index: usize,
    label: String,
    content_hash: u64,
}

impl Page {
    /// Create a page from a decoded raster.
    pub fn new(raster: RgbImage, group: GroupTag, index: usize, label: impl Into<String>) -> Self {
        let content_hash = xxh3_64(raster.as_raw());
        Self {
            raster,
            group,
            index,
            label: label.into(),
            content_hash,
        }
    }

    /// The RGB pixel buffer.
    pub fn raster(&self) -> &RgbImage {
        &self.raster
    }

    /// Raster width in pixels.
    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    /// Raster height in pixels.
    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    /// Which group this page belongs to.
    pub fn group(&self) -> GroupTag {
        self.group
    }

    /// Zero-based index within the owning group.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Display label (source filename plus page number).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// xxh3 hash of the raw pixel buffer. Equal hashes plus equal
    /// dimensions are treated as byte-identical content.
    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }

    /// Whether two pages have byte-identical raster content.
    pub fn same_content(&self, other: &Self) -> bool {
        self.content_hash == other.content_hash
            && self.raster.dimensions() == other.raster.dimensions()
    }
}

/// An ordered sequence of pages for one side of the comparison.
#[derive(Debug, Clone, Default)]
pub struct PageGroup {
    pages: Vec<Page>,
    source_label: String,
}

impl PageGroup {
    /// Create an empty group (the degraded state for an unreadable document).
    pub fn empty(source_label: impl Into<String>) -> Self {
        Self {
            pages: Vec::new(),
            source_label: source_label.into(),
        }
    }

    /// Create a group from already-constructed pages.
    ///
    /// Page labels must be unique within the group: diff-cache keys are
    /// built from them, so duplicate labels would alias cache entries.
    /// [`from_rasters`](Self::from_rasters) guarantees this; callers
    /// constructing their own pages are responsible for it.
    pub fn new(source_label: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            pages,
            source_label: source_label.into(),
        }
    }

    /// Build a group from raw rasters, assigning indices and labels.
    pub fn from_rasters(
        source_label: impl Into<String>,
        group: GroupTag,
        rasters: Vec<RgbImage>,
    ) -> Self {
        let source_label = source_label.into();
        let pages = rasters
            .into_iter()
            .enumerate()
            .map(|(i, raster)| {
                let label = format!("{source_label}#{}", i + 1);
                Page::new(raster, group, i, label)
            })
            .collect();
        Self {
            pages,
            source_label,
        }
    }

    /// The document label this group was ingested from.
    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }
}
