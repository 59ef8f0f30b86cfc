//! Session lifecycle and diff-result caching.
//!
//! A session owns the two page groups, the chosen pairing mode, and a
//! cache of per-pair diff results. The [`SessionManager`] holds an
//! explicit, lifetime-scoped registry — callers inject it where needed
//! instead of reaching for ambient global state — plus the expiry
//! scheduler that reclaims storage when a TTL elapses.

mod expiry;
mod persist;

pub use persist::{
    decode_data_uri, CacheRecord, InMemoryStore, JsonFileStore, SessionRecord, SessionStore,
    StoredDiff, StoredGroup, StoredPage,
};

use crate::align::{AlignmentEngine, AlignmentEntry, AlignmentPath};
use crate::config::AppConfig;
use crate::error::{PageDiffError, Result};
use crate::model::{GroupTag, PageGroup, PairingMode};
use crate::render::{DiffEntryPayload, DiffRenderer, PageDiffResult};
use crate::similarity::SimilarityModel;
use chrono::{DateTime, Utc};
use expiry::ExpiryScheduler;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

/// Session-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Time-to-live in seconds; expired sessions release all storage
    pub ttl_secs: u64,
    /// Directory for the durable store; in-memory only when unset
    pub persist_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            persist_dir: None,
        }
    }
}

/// Stable identity of one correspondence entry within a session.
///
/// Built from the pairing mode and the display labels (not indices), so
/// re-querying the same session yields cache hits even across a restart.
/// Relies on labels being unique within each group, which
/// [`PageGroup::from_rasters`] guarantees and [`PageGroup::new`] documents
/// as a caller obligation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub mode: PairingMode,
    pub a: Option<String>,
    pub b: Option<String>,
}

impl PairKey {
    fn for_entry(
        mode: PairingMode,
        entry: &AlignmentEntry,
        group_a: &PageGroup,
        group_b: &PageGroup,
    ) -> Self {
        let label = |group: &PageGroup, idx: usize| {
            group.get(idx).map(|p| p.label().to_string())
        };
        match *entry {
            AlignmentEntry::Matched { a, b } => Self {
                mode,
                a: label(group_a, a),
                b: label(group_b, b),
            },
            AlignmentEntry::Deleted { a } => Self {
                mode,
                a: label(group_a, a),
                b: None,
            },
            AlignmentEntry::Inserted { b } => Self {
                mode,
                a: None,
                b: label(group_b, b),
            },
        }
    }
}

struct SessionInner {
    id: String,
    created_at: DateTime<Utc>,
    ttl: Duration,
    mode: PairingMode,
    manual_pairs: Vec<(usize, usize)>,
    group_a: PageGroup,
    group_b: PageGroup,
    /// Computed once per session; guarded separately from the cache so a
    /// failed (timed-out) alignment never poisons cached results.
    path: Mutex<Option<AlignmentPath>>,
    cache: Mutex<HashMap<PairKey, PageDiffResult>>,
}

/// Summary of one live session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub mode: PairingMode,
    pub pages_a: usize,
    pub pages_b: usize,
    pub cached_results: usize,
}

/// How many expired/cleared session ids are remembered for error
/// reporting before the oldest are forgotten.
const EXPIRED_IDS_CAP: usize = 1024;

/// Bounded FIFO set of tombstoned session ids.
///
/// Tombstones only improve error messages (`Expired` instead of
/// `NotFound`); once an id is evicted, a later query for it downgrades
/// to `NotFound`. The bound keeps a long-lived manager from accumulating
/// one string per session ever created.
struct ExpiredIds {
    cap: usize,
    order: VecDeque<String>,
    set: HashSet<String>,
}

impl ExpiredIds {
    fn with_capacity(cap: usize) -> Self {
        Self {
            cap,
            order: VecDeque::new(),
            set: HashSet::new(),
        }
    }

    fn insert(&mut self, id: &str) {
        if self.set.insert(id.to_string()) {
            self.order.push_back(id.to_string());
            while self.order.len() > self.cap {
                if let Some(oldest) = self.order.pop_front() {
                    self.set.remove(&oldest);
                }
            }
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.set.contains(id)
    }
}

struct ManagerInner {
    model: SimilarityModel,
    engine: AlignmentEngine,
    renderer: DiffRenderer,
    ttl: Duration,
    store: Box<dyn SessionStore>,
    sessions: RwLock<HashMap<String, Arc<SessionInner>>>,
    /// Ids of sessions that reached `Expired`; distinguishes
    /// `SessionExpired` from `SessionNotFound` on later queries.
    expired: Mutex<ExpiredIds>,
}

/// Owns every live session, the diff-result caches, and the expiry loop.
pub struct SessionManager {
    inner: Arc<ManagerInner>,
    scheduler: ExpiryScheduler,
}

impl SessionManager {
    /// Build a manager from the application config. Uses a JSON file
    /// store when a persist directory is configured, a volatile
    /// in-memory store otherwise.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let store: Box<dyn SessionStore> = match &config.session.persist_dir {
            Some(dir) => Box::new(JsonFileStore::open(dir)?),
            None => Box::new(InMemoryStore::new()),
        };
        Self::with_store(config, store)
    }

    /// Build a manager over an injected store implementation.
    pub fn with_store(config: &AppConfig, store: Box<dyn SessionStore>) -> Result<Self> {
        let inner = Arc::new(ManagerInner {
            model: SimilarityModel::new(config.similarity.clone()),
            engine: AlignmentEngine::new(config.alignment.clone()),
            renderer: DiffRenderer::new(config.render.clone()),
            ttl: Duration::from_secs(config.session.ttl_secs),
            store,
            sessions: RwLock::new(HashMap::new()),
            expired: Mutex::new(ExpiredIds::with_capacity(EXPIRED_IDS_CAP)),
        });

        let weak: Weak<ManagerInner> = Arc::downgrade(&inner);
        let scheduler = ExpiryScheduler::start(Box::new(move |id| {
            if let Some(inner) = weak.upgrade() {
                inner.expire(id);
            }
        }));

        Ok(Self { inner, scheduler })
    }

    /// Create a session over two ingested page groups.
    ///
    /// Fails with `NoContent` when both groups are empty; a single empty
    /// group is the degraded-but-valid state after an unreadable document.
    pub fn create_session(
        &self,
        group_a: PageGroup,
        group_b: PageGroup,
        mode: PairingMode,
        manual_pairs: Vec<(usize, usize)>,
    ) -> Result<String> {
        if group_a.is_empty() && group_b.is_empty() {
            return Err(PageDiffError::NoContent);
        }

        // Manual pair lists are validated up front so a bad list fails at
        // creation, not on the first diff query.
        let prebuilt_path = if mode == PairingMode::Manual {
            Some(AlignmentPath::manual(
                group_a.len(),
                group_b.len(),
                &manual_pairs,
            )?)
        } else {
            None
        };

        let id = Uuid::new_v4().to_string();
        let session = Arc::new(SessionInner {
            id: id.clone(),
            created_at: Utc::now(),
            ttl: self.inner.ttl,
            mode,
            manual_pairs,
            group_a,
            group_b,
            path: Mutex::new(prebuilt_path),
            cache: Mutex::new(HashMap::new()),
        });

        if let Err(e) = self.inner.persist(&session) {
            warn!(session = %id, error = %e, "initial persist failed");
        }
        self.inner
            .sessions
            .write()
            .insert(id.clone(), Arc::clone(&session));
        self.scheduler.schedule(&id, Instant::now() + self.inner.ttl);

        info!(
            session = %id,
            mode = %mode,
            pages_a = session.group_a.len(),
            pages_b = session.group_b.len(),
            "session created"
        );
        Ok(id)
    }

    /// Compute (or fetch from cache) the diff results for every
    /// correspondence entry, in the alignment path's forward order.
    pub fn diff_all(&self, id: &str) -> Result<Vec<PageDiffResult>> {
        let session = self.lookup(id)?;
        let path = self.ensure_path(&session)?;

        let keyed: Vec<(PairKey, AlignmentEntry)> = path
            .entries()
            .iter()
            .map(|e| {
                (
                    PairKey::for_entry(session.mode, e, &session.group_a, &session.group_b),
                    *e,
                )
            })
            .collect();

        // Snapshot which keys still need computing.
        let misses: Vec<(PairKey, AlignmentEntry)> = {
            let cache = session.cache.lock();
            keyed
                .iter()
                .filter(|(k, _)| !cache.contains_key(k))
                .cloned()
                .collect()
        };

        if !misses.is_empty() {
            // Render outside the lock: the groups are immutable and each
            // entry's diff is independent given the path.
            let computed: Vec<(PairKey, PageDiffResult)> = misses
                .par_iter()
                .map(|(key, entry)| {
                    let (a, b) = match *entry {
                        AlignmentEntry::Matched { a, b } => {
                            (session.group_a.get(a), session.group_b.get(b))
                        }
                        AlignmentEntry::Deleted { a } => (session.group_a.get(a), None),
                        AlignmentEntry::Inserted { b } => (None, session.group_b.get(b)),
                    };
                    (key.clone(), self.inner.renderer.render(a, b))
                })
                .collect();

            // A concurrent request may have raced us here; the first
            // writer wins and the loser's result is discarded.
            let mut cache = session.cache.lock();
            for (key, result) in computed {
                cache.entry(key).or_insert(result);
            }
        }

        let results: Vec<PageDiffResult> = {
            let cache = session.cache.lock();
            keyed
                .iter()
                .map(|(k, _)| cache.get(k).cloned().expect("entry rendered above"))
                .collect()
        };

        if let Err(e) = self.inner.persist(&session) {
            warn!(session = %id, error = %e, "persist after diff failed");
        }
        Ok(results)
    }

    /// Like [`diff_all`](Self::diff_all), but packaged as the wire
    /// payload with PNG data URIs for the rasters.
    pub fn diff_payload(&self, id: &str) -> Result<Vec<DiffEntryPayload>> {
        let session = self.lookup(id)?;
        let results = self.diff_all(id)?;
        results
            .iter()
            .map(|r| DiffEntryPayload::from_result(r, &session.group_a, &session.group_b))
            .collect()
    }

    /// Explicitly clear a session, cancelling its expiry timer and
    /// releasing all backing storage.
    pub fn clear_session(&self, id: &str) -> Result<()> {
        let removed = self.inner.sessions.write().remove(id);
        match removed {
            Some(_) => {
                self.scheduler.cancel(id);
                self.inner.expired.lock().insert(id);
                if let Err(e) = self.inner.store.delete(id) {
                    warn!(session = %id, error = %e, "store delete failed");
                }
                info!(session = %id, "session cleared");
                Ok(())
            }
            None => Err(self.inner.missing_error(id)),
        }
    }

    /// Summaries of all live sessions.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.inner
            .sessions
            .read()
            .values()
            .map(|s| SessionInfo {
                id: s.id.clone(),
                created_at: s.created_at,
                mode: s.mode,
                pages_a: s.group_a.len(),
                pages_b: s.group_b.len(),
                cached_results: s.cache.lock().len(),
            })
            .collect()
    }

    /// Restore persisted sessions that are still within their TTL;
    /// records past their TTL are deleted. Returns the number recovered.
    pub fn recover(&self) -> Result<usize> {
        let mut recovered = 0;
        for id in self.inner.store.list_ids()? {
            let Some(record) = self.inner.store.load(&id)? else {
                continue;
            };
            let age = Utc::now().signed_duration_since(record.created_at);
            let ttl = Duration::from_secs(record.ttl_secs);
            let Ok(age) = age.to_std() else {
                // Clock skew put creation in the future; treat as fresh.
                self.restore_record(record, ttl)?;
                recovered += 1;
                continue;
            };
            if age >= ttl {
                self.inner.store.delete(&id)?;
                self.inner.expired.lock().insert(&id);
                continue;
            }
            self.restore_record(record, ttl - age)?;
            recovered += 1;
        }
        info!(recovered, "session recovery complete");
        Ok(recovered)
    }

    fn restore_record(&self, record: SessionRecord, remaining: Duration) -> Result<()> {
        let group_a = persist::restore_group(&record.group_a, GroupTag::A)?;
        let group_b = persist::restore_group(&record.group_b, GroupTag::B)?;
        let cache = record
            .cache
            .iter()
            .map(|entry| Ok((entry.key.clone(), persist::restore_diff(&entry.diff)?)))
            .collect::<Result<HashMap<_, _>>>()?;

        let session = Arc::new(SessionInner {
            id: record.id.clone(),
            created_at: record.created_at,
            ttl: Duration::from_secs(record.ttl_secs),
            mode: record.mode,
            manual_pairs: record.manual_pairs,
            group_a,
            group_b,
            path: Mutex::new(None),
            cache: Mutex::new(cache),
        });
        self.inner
            .sessions
            .write()
            .insert(record.id.clone(), session);
        self.scheduler
            .schedule(&record.id, Instant::now() + remaining);
        Ok(())
    }

    fn lookup(&self, id: &str) -> Result<Arc<SessionInner>> {
        match self.inner.sessions.read().get(id) {
            Some(session) => Ok(Arc::clone(session)),
            None => Err(self.inner.missing_error(id)),
        }
    }

    /// Compute the alignment path once per session.
    fn ensure_path(&self, session: &SessionInner) -> Result<AlignmentPath> {
        let mut guard = session.path.lock();
        if let Some(path) = guard.as_ref() {
            return Ok(path.clone());
        }
        let path = crate::align::plan_pairs(
            &self.inner.model,
            &self.inner.engine,
            &session.group_a,
            &session.group_b,
            session.mode,
            &session.manual_pairs,
        )?;
        *guard = Some(path.clone());
        Ok(path)
    }
}

impl ManagerInner {
    fn missing_error(&self, id: &str) -> PageDiffError {
        if self.expired.lock().contains(id) {
            PageDiffError::session_expired(id)
        } else {
            PageDiffError::session_not_found(id)
        }
    }

    /// TTL expiry: release the session and its durable record.
    fn expire(&self, id: &str) {
        let removed = self.sessions.write().remove(id);
        if removed.is_some() {
            self.expired.lock().insert(id);
            if let Err(e) = self.store.delete(id) {
                warn!(session = %id, error = %e, "store delete on expiry failed");
            }
            info!(session = %id, "session expired");
        }
    }

    fn persist(&self, session: &SessionInner) -> Result<()> {
        let cache = {
            let cache = session.cache.lock();
            cache
                .iter()
                .map(|(key, result)| {
                    Ok(persist::CacheRecord {
                        key: key.clone(),
                        diff: persist::store_diff(result)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?
        };
        let record = SessionRecord {
            id: session.id.clone(),
            created_at: session.created_at,
            ttl_secs: session.ttl.as_secs(),
            mode: session.mode,
            manual_pairs: session.manual_pairs.clone(),
            group_a: persist::store_group(&session.group_a)?,
            group_b: persist::store_group(&session.group_b)?,
            cache,
        };
        self.store.save(&record)
    }
}
