//! Core domain model: rasterized pages and page groups.
//!
//! Pages are created once during ingestion and read-only afterwards.
//! A [`Page`] owns its raster; nothing in the crate shares pixel buffers
//! across sessions.

mod page;

pub use page::{Page, PageGroup};

use serde::{Deserialize, Serialize};

/// Which side of the comparison a page belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupTag {
    /// The "old" / left-hand document
    A,
    /// The "new" / right-hand document
    B,
}

impl std::fmt::Display for GroupTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Strategy used to establish page correspondence between the two groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairingMode {
    /// Position-based: page i of A is paired with page i of B
    Sequential,
    /// Greedy non-crossing best-match pairing on the cost matrix
    Auto,
    /// Caller-specified pair list
    Manual,
    /// Full affine-gap global alignment
    #[default]
    Aligned,
}

impl std::fmt::Display for PairingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Sequential => "sequential",
            Self::Auto => "auto",
            Self::Manual => "manual",
            Self::Aligned => "aligned",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PairingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "auto" | "auto-paired" => Ok(Self::Auto),
            "manual" | "manual-paired" => Ok(Self::Manual),
            "aligned" | "alignment" => Ok(Self::Aligned),
            other => Err(format!(
                "unknown pairing mode '{other}' (expected sequential, auto, manual, aligned)"
            )),
        }
    }
}
