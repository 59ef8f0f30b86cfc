//! Configuration types for page-diff operations.

use crate::align::AlignmentParams;
use crate::render::RenderConfig;
use crate::session::SessionConfig;
use crate::similarity::SimilarityConfig;
use serde::{Deserialize, Serialize};

/// Unified application configuration.
///
/// Aggregates the per-component configs; loadable from a YAML file, a
/// builder, or CLI arguments (CLI overrides file settings).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Similarity model weights and sizes
    pub similarity: SimilarityConfig,
    /// Gap penalties, band, timeout
    pub alignment: AlignmentParams,
    /// Pixel thresholds and highlight color
    pub render: RenderConfig,
    /// Session TTL and persistence
    pub session: SessionConfig,
}

impl AppConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Create a config from a named preset.
    #[must_use]
    pub fn from_preset(preset: ConfigPreset) -> Self {
        let mut config = Self::default();
        config.apply_preset(preset);
        config
    }

    /// Overlay a preset's tuned fields onto this config, leaving every
    /// other field as loaded.
    pub fn apply_preset(&mut self, preset: ConfigPreset) {
        match preset {
            ConfigPreset::Balanced => {}
            ConfigPreset::Strict => {
                // Flag smaller edits, accept fewer auto pairs.
                self.render.change_threshold_pct = 0.0001;
                self.alignment.auto_accept_cost = 0.25;
            }
            ConfigPreset::Lenient => {
                self.render.change_threshold_pct = 0.05;
                self.alignment.auto_accept_cost = 0.55;
            }
        }
    }
}

/// Named configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigPreset {
    #[default]
    Balanced,
    Strict,
    Lenient,
}

impl std::str::FromStr for ConfigPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "balanced" => Ok(Self::Balanced),
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("unknown preset '{other}'")),
        }
    }
}

/// Builder for constructing `AppConfig` with a fluent API.
#[derive(Debug, Default)]
#[must_use]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the similarity weights.
    pub const fn weights(mut self, w_hash: f64, w_ssim: f64, diag_bias: f64) -> Self {
        self.config.similarity.w_hash = w_hash;
        self.config.similarity.w_ssim = w_ssim;
        self.config.similarity.diag_bias = diag_bias;
        self
    }

    /// Set the gap penalties.
    pub const fn gap_penalties(mut self, gap_open: f64, gap_extend: f64) -> Self {
        self.config.alignment.gap_open = gap_open;
        self.config.alignment.gap_extend = gap_extend;
        self
    }

    /// Restrict the DP to a diagonal band.
    pub const fn band(mut self, band: Option<usize>) -> Self {
        self.config.alignment.band = band;
        self
    }

    /// Set the alignment wall-clock budget.
    pub const fn alignment_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.alignment.timeout = Some(timeout);
        self
    }

    /// Set the changed/unchanged threshold percentage (inclusive).
    pub const fn change_threshold_pct(mut self, pct: f64) -> Self {
        self.config.render.change_threshold_pct = pct;
        self
    }

    /// Set the session time-to-live in seconds.
    pub const fn session_ttl_secs(mut self, secs: u64) -> Self {
        self.config.session.ttl_secs = secs;
        self
    }

    /// Set the durable store directory.
    pub fn persist_dir(mut self, dir: Option<std::path::PathBuf>) -> Self {
        self.config.session.persist_dir = dir;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
