//! End-to-end compare pipeline: ingest two documents, plan the page
//! correspondence, and render a diff per entry.
//!
//! This is the one-shot path used by the CLI. Long-lived callers that
//! want caching and TTL expiry go through
//! [`SessionManager`](crate::session::SessionManager) instead; both share
//! the same planning and rendering stages.

use crate::align::{plan_pairs, AlignmentEngine, AlignmentEntry, AlignmentPath};
use crate::config::AppConfig;
use crate::error::{IngestErrorKind, PageDiffError, Result};
use crate::model::{GroupTag, PageGroup, PairingMode};
use crate::render::{DiffEntryPayload, DiffRenderer, DiffStatus, PageDiffResult};
use crate::similarity::SimilarityModel;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Exit codes for CI/CD integration
pub mod exit_codes {
    /// Success - no changes detected (or --no-fail-on-change)
    pub const SUCCESS: i32 = 0;
    /// Changes were detected
    pub const CHANGES_DETECTED: i32 = 1;
    /// An error occurred
    pub const ERROR: i32 = 2;
}

/// Raster formats accepted as document pages.
const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "webp"];

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn display_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load one document as a page group.
///
/// A document is either a single image file (one page) or a directory of
/// image files, taken as pages in filename order. A missing, unsupported,
/// or undecodable document degrades to an empty group so the other side
/// can still be reported as all-added or all-removed; only a corrupt page
/// inside an otherwise readable directory is a hard error.
pub fn load_group(path: &Path, tag: GroupTag) -> Result<PageGroup> {
    let label = display_label(path);

    if !path.exists() {
        return Ok(degrade(
            tag,
            label.clone(),
            &PageDiffError::unreadable(label, "no such file or directory"),
        ));
    }

    if path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)
            .map_err(|e| PageDiffError::io(path, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_supported(p))
            .collect();
        files.sort();
        if files.is_empty() {
            warn!(group = %tag, path = %path.display(), "no page images found");
            return Ok(PageGroup::empty(label));
        }
        let rasters = files
            .iter()
            .map(|file| {
                image::open(file)
                    .map(|img| img.to_rgb8())
                    .map_err(|e| {
                        PageDiffError::ingest(
                            display_label(file),
                            IngestErrorKind::Decode(e.to_string()),
                        )
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(group = %tag, pages = rasters.len(), "document ingested");
        return Ok(PageGroup::from_rasters(label, tag, rasters));
    }

    if !is_supported(path) {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("<none>")
            .to_string();
        let err = PageDiffError::ingest(label.clone(), IngestErrorKind::UnsupportedExtension(ext));
        return Ok(degrade(tag, label, &err));
    }

    match image::open(path) {
        Ok(img) => Ok(PageGroup::from_rasters(label, tag, vec![img.to_rgb8()])),
        Err(e) => {
            let err = PageDiffError::ingest(label.clone(), IngestErrorKind::Decode(e.to_string()));
            Ok(degrade(tag, label, &err))
        }
    }
}

/// Whole-document ingestion failure: log the cause and return an empty
/// group so the other side still reports as all-added or all-removed.
fn degrade(tag: GroupTag, label: String, err: &PageDiffError) -> PageGroup {
    warn!(group = %tag, error = %err, "treating document as empty");
    PageGroup::empty(label)
}

/// Per-status counts over one compare run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CompareSummary {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub unchanged: usize,
}

/// Output of one compare run: the planned correspondence and the diff
/// result for each entry, in path order.
#[derive(Debug, Clone)]
pub struct CompareReport {
    pub path: AlignmentPath,
    pub results: Vec<PageDiffResult>,
}

impl CompareReport {
    pub fn summary(&self) -> CompareSummary {
        let mut summary = CompareSummary::default();
        for result in &self.results {
            match result.status {
                DiffStatus::Added => summary.added += 1,
                DiffStatus::Removed => summary.removed += 1,
                DiffStatus::Changed => summary.changed += 1,
                DiffStatus::Unchanged => summary.unchanged += 1,
            }
        }
        summary
    }
}

/// Stateless compare pipeline assembled from one [`AppConfig`].
pub struct ComparePipeline {
    model: SimilarityModel,
    engine: AlignmentEngine,
    renderer: DiffRenderer,
}

impl ComparePipeline {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            model: SimilarityModel::new(config.similarity.clone()),
            engine: AlignmentEngine::new(config.alignment.clone()),
            renderer: DiffRenderer::new(config.render.clone()),
        }
    }

    /// Plan the correspondence and render every entry.
    pub fn compare(
        &self,
        group_a: &PageGroup,
        group_b: &PageGroup,
        mode: PairingMode,
        manual_pairs: &[(usize, usize)],
    ) -> Result<CompareReport> {
        if group_a.is_empty() && group_b.is_empty() {
            return Err(PageDiffError::NoContent);
        }
        let path = plan_pairs(&self.model, &self.engine, group_a, group_b, mode, manual_pairs)?;

        let results: Vec<PageDiffResult> = path
            .entries()
            .par_iter()
            .map(|entry| {
                let (a, b) = match *entry {
                    AlignmentEntry::Matched { a, b } => (group_a.get(a), group_b.get(b)),
                    AlignmentEntry::Deleted { a } => (group_a.get(a), None),
                    AlignmentEntry::Inserted { b } => (None, group_b.get(b)),
                };
                self.renderer.render(a, b)
            })
            .collect();

        info!(
            mode = %mode,
            entries = results.len(),
            matched = path.matched_count(),
            "compare complete"
        );
        Ok(CompareReport { path, results })
    }

    /// Package a report as wire payloads with PNG data URIs.
    pub fn payloads(
        &self,
        report: &CompareReport,
        group_a: &PageGroup,
        group_b: &PageGroup,
    ) -> Result<Vec<DiffEntryPayload>> {
        report
            .results
            .iter()
            .map(|r| DiffEntryPayload::from_result(r, group_a, group_b))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn group(tag: GroupTag, fills: &[[u8; 3]]) -> PageGroup {
        let rasters = fills
            .iter()
            .map(|&rgb| RgbImage::from_pixel(20, 20, Rgb(rgb)))
            .collect();
        PageGroup::from_rasters(format!("{tag}.pdf"), tag, rasters)
    }

    fn pipeline() -> ComparePipeline {
        let mut config = AppConfig::default();
        config.similarity.work_size = 64;
        ComparePipeline::new(&config)
    }

    #[test]
    fn test_compare_rejects_two_empty_groups() {
        let err = pipeline()
            .compare(
                &PageGroup::empty("a.pdf"),
                &PageGroup::empty("b.pdf"),
                PairingMode::Sequential,
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, PageDiffError::NoContent));
    }

    #[test]
    fn test_sequential_compare_reports_tail_as_added() {
        let report = pipeline()
            .compare(
                &group(GroupTag::A, &[[0, 0, 0]]),
                &group(GroupTag::B, &[[0, 0, 0], [255, 255, 255]]),
                PairingMode::Sequential,
                &[],
            )
            .unwrap();
        let summary = report.summary();
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.added, 1);
        assert_eq!(summary.removed, 0);
    }

    #[test]
    fn test_results_follow_path_order() {
        let report = pipeline()
            .compare(
                &group(GroupTag::A, &[[10, 10, 10], [20, 20, 20]]),
                &group(GroupTag::B, &[[10, 10, 10], [20, 20, 20]]),
                PairingMode::Sequential,
                &[],
            )
            .unwrap();
        assert_eq!(report.results.len(), report.path.entries().len());
        assert_eq!(report.results[0].label, "B.pdf#1");
        assert_eq!(report.results[1].label, "B.pdf#2");
    }

    #[test]
    fn test_load_group_missing_path_degrades_to_empty() {
        let loaded = load_group(Path::new("/definitely/not/here.png"), GroupTag::A).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_group_unknown_extension_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.docx");
        std::fs::write(&file, b"not an image").unwrap();
        let loaded = load_group(&file, GroupTag::A).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.source_label(), "report.docx");
    }

    #[test]
    fn test_load_group_directory_in_filename_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, shade) in [("02.png", 128u8), ("01.png", 0), ("10.png", 255)] {
            RgbImage::from_pixel(8, 8, Rgb([shade, shade, shade]))
                .save(dir.path().join(name))
                .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), b"skip me").unwrap();

        let loaded = load_group(dir.path(), GroupTag::B).unwrap();
        assert_eq!(loaded.len(), 3);
        // Filename order, with the non-image file ignored.
        assert_eq!(loaded.get(0).unwrap().raster().get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(
            loaded.get(2).unwrap().raster().get_pixel(0, 0).0,
            [255, 255, 255]
        );
    }

    #[test]
    fn test_load_group_corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.png");
        std::fs::write(&file, b"definitely not a png").unwrap();
        let loaded = load_group(&file, GroupTag::A).unwrap();
        assert!(loaded.is_empty());
    }
}
