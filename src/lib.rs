//! **Visual page-level diffing for rasterized documents.**
//!
//! `page-diff` compares two rasterized documents (sequences of page
//! images), decides which pages correspond, and renders a highlighted
//! visual diff for each corresponding pair. It powers both a
//! command-line tool for one-shot comparisons and a library API with a
//! session layer for interactive, long-lived callers.
//!
//! ## Key Features
//!
//! - **Perceptual similarity**: every page pair is scored with a blend
//!   of a perceptual average-hash distance and a multi-scale SSIM
//!   distance, so scan noise and compression artifacts do not register
//!   as changes.
//! - **Sequence alignment**: an affine-gap dynamic program (in the
//!   Needleman-Wunsch family) finds the globally optimal page
//!   correspondence, tolerating inserted, deleted, and reordered-length
//!   documents. Simpler pairing modes (sequential, greedy auto, manual)
//!   are available when the page order is already known.
//! - **Pixel diff rendering**: corresponding pages are cropped to their
//!   common area, thresholded per pixel, and composited into a
//!   highlight image with changed regions painted over the newer page.
//! - **Sessions with TTL**: the [`session::SessionManager`] caches diff
//!   results per correspondence entry, persists sessions through an
//!   injectable store, and reclaims storage when a time-to-live lapses.
//!
//! ## Core Modules
//!
//! - **[`model`]**: the page data model, [`Page`] and [`PageGroup`],
//!   plus the [`PairingMode`] selector.
//! - **[`similarity`]**: the [`SimilarityModel`] producing pairwise
//!   costs in `[0, 1]` (lower is more similar).
//! - **[`align`]**: the [`CostMatrix`], the [`AlignmentEngine`] dynamic
//!   program, and the [`AlignmentPath`] correspondence it yields.
//! - **[`render`]**: the [`DiffRenderer`] turning a correspondence
//!   entry into a [`PageDiffResult`].
//! - **[`pipeline`]**: one-shot ingestion and compare, used by the CLI.
//! - **[`session`]**: the caching, persisting, expiring session layer.
//!
//! ## Getting Started
//!
//! ```no_run
//! use page_diff::{load_group, AppConfig, ComparePipeline, GroupTag, PairingMode};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::default();
//!     let a = load_group(Path::new("before/"), GroupTag::A)?;
//!     let b = load_group(Path::new("after/"), GroupTag::B)?;
//!
//!     let pipeline = ComparePipeline::new(&config);
//!     let report = pipeline.compare(&a, &b, PairingMode::Aligned, &[])?;
//!
//!     for result in &report.results {
//!         println!("{}: {} ({:.3}%)", result.label, result.status, result.difference_pct);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Sessions
//!
//! ```no_run
//! use page_diff::session::SessionManager;
//! use page_diff::{load_group, AppConfig, GroupTag, PairingMode};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = SessionManager::new(&AppConfig::default())?;
//!     let a = load_group(Path::new("before/"), GroupTag::A)?;
//!     let b = load_group(Path::new("after/"), GroupTag::B)?;
//!
//!     let id = manager.create_session(a, b, PairingMode::Aligned, Vec::new())?;
//!     let first = manager.diff_all(&id)?;   // computed
//!     let second = manager.diff_all(&id)?;  // served from cache
//!     assert_eq!(first, second);
//!     Ok(())
//! }
//! ```

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    // usize↔f64/f32/u32 casts are pervasive in pixel accounting and DP
    // indexing — all values are bounded in practice
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    // The DP recurrence reads better as one long function
    clippy::too_many_lines,
    clippy::similar_names
)]

pub mod align;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod similarity;

// Re-export main types for convenience
pub use align::{pair_pages, plan_pairs, AlignmentEngine, AlignmentEntry, AlignmentParams, AlignmentPath, CostMatrix};
pub use config::{
    discover_config_file, generate_example_config, load_config_file, load_or_default, AppConfig,
    AppConfigBuilder, ConfigError, ConfigPreset, Validatable, CONFIG_FILE_NAME,
};
pub use error::{PageDiffError, Result};
pub use model::{GroupTag, Page, PageGroup, PairingMode};
pub use pipeline::{load_group, ComparePipeline, CompareReport, CompareSummary};
pub use render::{png_data_uri, DiffEntryPayload, DiffRenderer, DiffStatus, PageDiffResult, RenderConfig};
pub use session::{SessionConfig, SessionInfo, SessionManager, SessionStore};
pub use similarity::{SimilarityConfig, SimilarityModel};
