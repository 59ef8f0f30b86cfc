//! Durable session storage behind a narrow key-value interface.
//!
//! A restart within the TTL window recovers already-computed diff results
//! instead of redoing the work. Rasters are stored as PNG data URIs, the
//! same encoding the result payload uses.

use crate::error::{PageDiffError, Result};
use crate::model::{GroupTag, Page, PageGroup, PairingMode};
use crate::render::{png_data_uri, DiffStatus, PageDiffResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Durable record of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub ttl_secs: u64,
    pub mode: PairingMode,
    pub manual_pairs: Vec<(usize, usize)>,
    pub group_a: StoredGroup,
    pub group_b: StoredGroup,
    /// Cached diff results, keyed by the stable pair key
    pub cache: Vec<CacheRecord>,
}

/// One cached diff result and the key it was computed under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub key: super::PairKey,
    pub diff: StoredDiff,
}

/// One persisted page group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredGroup {
    pub source_label: String,
    pub pages: Vec<StoredPage>,
}

/// One persisted page: label plus PNG-encoded raster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPage {
    pub label: String,
    pub png: String,
}

/// One persisted diff result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDiff {
    pub label: String,
    pub status: DiffStatus,
    pub difference_pct: f64,
    pub a_index: Option<usize>,
    pub b_index: Option<usize>,
    pub highlight_png: Option<String>,
}

/// Narrow persistence seam. In-memory, embedded file, or an external
/// store are all valid implementations.
pub trait SessionStore: Send + Sync {
    fn save(&self, record: &SessionRecord) -> Result<()>;
    fn load(&self, id: &str) -> Result<Option<SessionRecord>>;
    fn delete(&self, id: &str) -> Result<()>;
    fn list_ids(&self) -> Result<Vec<String>>;
}

/// Volatile store; loses everything on restart. The default when no
/// persist directory is configured.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemoryStore {
    fn save(&self, record: &SessionRecord) -> Result<()> {
        self.records
            .lock()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<SessionRecord>> {
        Ok(self.records.lock().get(id).cloned())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.records.lock().remove(id);
        Ok(())
    }

    fn list_ids(&self) -> Result<Vec<String>> {
        Ok(self.records.lock().keys().cloned().collect())
    }
}

/// One JSON file per session under a store directory.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (creating the directory if needed).
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| PageDiffError::io(&dir, e))?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl SessionStore for JsonFileStore {
    fn save(&self, record: &SessionRecord) -> Result<()> {
        let path = self.path_for(&record.id);
        let json = serde_json::to_vec(record)?;
        // Write to a sibling temp file first so a crash mid-write never
        // leaves a truncated record behind.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| PageDiffError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| PageDiffError::io(&path, e))?;
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<SessionRecord>> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read(&path).map_err(|e| PageDiffError::io(&path, e))?;
        Ok(Some(serde_json::from_slice(&content)?))
    }

    fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PageDiffError::io(&path, e)),
        }
    }

    fn list_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let entries = std::fs::read_dir(&self.dir).map_err(|e| PageDiffError::io(&self.dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| PageDiffError::io(&self.dir, e))?.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Encoding between live and stored forms
// ---------------------------------------------------------------------------

/// Decode a `data:image/png;base64,...` URI back to an RGB raster.
pub fn decode_data_uri(uri: &str) -> Result<image::RgbImage> {
    let b64 = uri
        .strip_prefix("data:image/png;base64,")
        .ok_or_else(|| PageDiffError::Store("not a PNG data URI".into()))?;
    let bytes = BASE64
        .decode(b64)
        .map_err(|e| PageDiffError::Store(format!("base64 decode: {e}")))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| PageDiffError::Store(format!("PNG decode: {e}")))?;
    Ok(img.to_rgb8())
}

pub(crate) fn store_group(group: &PageGroup) -> Result<StoredGroup> {
    let pages = group
        .pages()
        .iter()
        .map(|p| {
            Ok(StoredPage {
                label: p.label().to_string(),
                png: png_data_uri(p.raster())?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(StoredGroup {
        source_label: group.source_label().to_string(),
        pages,
    })
}

pub(crate) fn restore_group(stored: &StoredGroup, tag: GroupTag) -> Result<PageGroup> {
    let pages = stored
        .pages
        .iter()
        .enumerate()
        .map(|(i, sp)| {
            let raster = decode_data_uri(&sp.png)?;
            Ok(Page::new(raster, tag, i, sp.label.clone()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(PageGroup::new(stored.source_label.clone(), pages))
}

pub(crate) fn store_diff(result: &PageDiffResult) -> Result<StoredDiff> {
    Ok(StoredDiff {
        label: result.label.clone(),
        status: result.status,
        difference_pct: result.difference_pct,
        a_index: result.a_index,
        b_index: result.b_index,
        highlight_png: result
            .highlight
            .as_ref()
            .map(png_data_uri)
            .transpose()?,
    })
}

pub(crate) fn restore_diff(stored: &StoredDiff) -> Result<PageDiffResult> {
    Ok(PageDiffResult {
        label: stored.label.clone(),
        status: stored.status,
        difference_pct: stored.difference_pct,
        a_index: stored.a_index,
        b_index: stored.b_index,
        highlight: stored
            .highlight_png
            .as_deref()
            .map(decode_data_uri)
            .transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sample_record(id: &str) -> SessionRecord {
        let raster = RgbImage::from_pixel(6, 6, Rgb([120, 10, 200]));
        let page = Page::new(raster, GroupTag::A, 0, "a.pdf#1");
        let group = PageGroup::new("a.pdf", vec![page]);
        SessionRecord {
            id: id.to_string(),
            created_at: Utc::now(),
            ttl_secs: 600,
            mode: PairingMode::Aligned,
            manual_pairs: Vec::new(),
            group_a: store_group(&group).unwrap(),
            group_b: StoredGroup {
                source_label: "b.pdf".into(),
                pages: Vec::new(),
            },
            cache: Vec::new(),
        }
    }

    #[test]
    fn test_data_uri_round_trip() {
        let raster = RgbImage::from_pixel(5, 3, Rgb([7, 80, 255]));
        let uri = png_data_uri(&raster).unwrap();
        let back = decode_data_uri(&uri).unwrap();
        assert_eq!(back, raster);
    }

    #[test]
    fn test_group_round_trip_preserves_content() {
        let raster = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        let group = PageGroup::from_rasters("doc.pdf", GroupTag::B, vec![raster]);
        let stored = store_group(&group).unwrap();
        let restored = restore_group(&stored, GroupTag::B).unwrap();
        assert_eq!(restored.len(), 1);
        assert!(restored.get(0).unwrap().same_content(group.get(0).unwrap()));
        assert_eq!(restored.get(0).unwrap().label(), "doc.pdf#1");
    }

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryStore::new();
        let record = sample_record("s1");
        store.save(&record).unwrap();
        assert!(store.load("s1").unwrap().is_some());
        assert_eq!(store.list_ids().unwrap(), vec!["s1".to_string()]);
        store.delete("s1").unwrap();
        assert!(store.load("s1").unwrap().is_none());
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        let record = sample_record("abc");
        store.save(&record).unwrap();

        let loaded = store.load("abc").unwrap().expect("record exists");
        assert_eq!(loaded.id, "abc");
        assert_eq!(loaded.group_a.pages.len(), 1);

        assert_eq!(store.list_ids().unwrap(), vec!["abc".to_string()]);
        store.delete("abc").unwrap();
        assert!(store.load("abc").unwrap().is_none());
        // Idempotent delete
        store.delete("abc").unwrap();
    }
}
