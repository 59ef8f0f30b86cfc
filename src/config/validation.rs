//! Validation for configuration values.

use super::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("similarity weight '{name}' must be non-negative, got {value}")]
    NegativeWeight { name: &'static str, value: f64 },

    #[error("at least one of w_hash and w_ssim must be positive")]
    NoSimilaritySignal,

    #[error("hash_size ({hash_size}) must be positive and not exceed work_size ({work_size})")]
    BadHashSize { hash_size: u32, work_size: u32 },

    #[error("gap penalties must satisfy gap_open >= gap_extend >= 0 (got open={open}, extend={extend})")]
    BadGapPenalties { open: f64, extend: f64 },

    #[error("change threshold must be within [0, 100], got {0}")]
    BadChangeThreshold(f64),

    #[error("session TTL must be positive")]
    ZeroTtl,
}

/// Trait for validating configuration structures.
pub trait Validatable {
    /// Check all values, returning the first problem found.
    fn validate(&self) -> Result<(), ConfigError>;
}

impl Validatable for AppConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.similarity;
        for (name, value) in [
            ("w_hash", sim.w_hash),
            ("w_ssim", sim.w_ssim),
            ("diag_bias", sim.diag_bias),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(ConfigError::NegativeWeight { name, value });
            }
        }
        if sim.w_hash == 0.0 && sim.w_ssim == 0.0 {
            return Err(ConfigError::NoSimilaritySignal);
        }
        if sim.hash_size == 0 || sim.hash_size > sim.work_size {
            return Err(ConfigError::BadHashSize {
                hash_size: sim.hash_size,
                work_size: sim.work_size,
            });
        }

        let align = &self.alignment;
        if !(align.gap_extend >= 0.0 && align.gap_open >= align.gap_extend) {
            return Err(ConfigError::BadGapPenalties {
                open: align.gap_open,
                extend: align.gap_extend,
            });
        }

        let pct = self.render.change_threshold_pct;
        if !(0.0..=100.0).contains(&pct) {
            return Err(ConfigError::BadChangeThreshold(pct));
        }

        if self.session.ttl_secs == 0 {
            return Err(ConfigError::ZeroTtl);
        }

        Ok(())
    }
}
