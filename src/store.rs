// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Content-addressed persistence.
//!
//! Records are keyed by their own identity, so saving is idempotent and
//! the store never has to decide between two versions of the same key.
//! Operations are also indexed by the container they target, which is
//! what a sync digest is built from.

use std::collections::BTreeSet;
use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;
use tracing::warn;

use crate::crdt::op::Operation;
use crate::error::StoreError;
use crate::key::Hash;
use crate::object::Object;
use crate::wordcode::Suffix;

/// Anything a store holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    Object(Object),
    Operation(Operation),
}

impl Record {
    pub fn id(&self) -> Hash {
        return match self {
            Record::Object(object) => object.id(),
            Record::Operation(op) => op.id(),
        };
    }
}

/// Durable storage for objects and operations.
pub trait Store: Send + Sync + 'static {
    /// Persist a record, returning its identity. Saving a record twice is
    /// a no-op.
    fn save(&self, record: &Record) -> Result<Hash, StoreError>;

    /// Load a record by identity.
    fn load(&self, id: &Hash) -> Result<Option<Record>, StoreError>;

    /// Identities of every stored operation targeting a container.
    fn operations(&self, target: &Hash) -> Result<BTreeSet<Hash>, StoreError>;

    /// Every stored object whose identity ends in `suffix`.
    fn find_suffix(&self, suffix: &Suffix) -> Result<Vec<Object>, StoreError>;
}

/// How a record sits in memory: encoded, as it would on disk.
#[derive(Clone, Debug)]
enum Entry {
    Object(Vec<u8>),
    Operation(Vec<u8>),
}

#[derive(Default)]
struct Inner {
    entries: FxHashMap<Hash, Entry>,
    by_target: FxHashMap<Hash, BTreeSet<Hash>>,
    by_suffix: FxHashMap<Suffix, SmallVec<[Hash; 1]>>,
}

/// An in-process store. Writes can be made to fail on demand, which is
/// how flush retries are exercised.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        return MemoryStore::default();
    }

    /// While set, every save fails with `StoreError::Unavailable`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        return self.inner.read().map(|inner| inner.entries.len()).unwrap_or(0);
    }

    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    #[cfg(test)]
    fn overwrite(&self, id: Hash, bytes: Vec<u8>) {
        let mut inner = self.inner.write().unwrap();
        inner.entries.insert(id, Entry::Operation(bytes));
    }
}

impl Store for MemoryStore {
    fn save(&self, record: &Record) -> Result<Hash, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        let id = record.id();
        let mut inner = self.inner.write().map_err(|_| StoreError::Unavailable)?;
        if inner.entries.contains_key(&id) {
            return Ok(id);
        }

        match record {
            Record::Object(object) => {
                let bytes = object.to_bytes()?;
                inner.entries.insert(id, Entry::Object(bytes));
                inner.by_suffix.entry(Suffix::of(&id)).or_default().push(id);
            }
            Record::Operation(op) => {
                let bytes = postcard::to_stdvec(op).map_err(|e| StoreError::Encode(e.to_string()))?;
                inner.entries.insert(id, Entry::Operation(bytes));
                inner.by_target.entry(op.target).or_default().insert(id);
            }
        }
        trace!(id = %id.short(), "saved record");
        return Ok(id);
    }

    fn load(&self, id: &Hash) -> Result<Option<Record>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Unavailable)?;
        let Some(entry) = inner.entries.get(id) else {
            return Ok(None);
        };
        let record = match entry {
            Entry::Object(bytes) => Object::from_bytes(bytes).map(Record::Object).ok(),
            Entry::Operation(bytes) => postcard::from_bytes(bytes).map(Record::Operation).ok(),
        };
        return match record {
            Some(record) if record.id() == *id => Ok(Some(record)),
            _ => {
                warn!(id = %id.short(), "stored record does not match its identity");
                Err(StoreError::Corrupt(*id))
            }
        };
    }

    fn operations(&self, target: &Hash) -> Result<BTreeSet<Hash>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Unavailable)?;
        return Ok(inner.by_target.get(target).cloned().unwrap_or_default());
    }

    fn find_suffix(&self, suffix: &Suffix) -> Result<Vec<Object>, StoreError> {
        let ids: Vec<Hash> = {
            let inner = self.inner.read().map_err(|_| StoreError::Unavailable)?;
            inner.by_suffix.get(suffix).map(|ids| ids.to_vec()).unwrap_or_default()
        };
        let mut objects = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(Record::Object(object)) = self.load(&id)? {
                objects.push(object);
            }
        }
        return Ok(objects);
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "MemoryStore {{ records: {} }}", self.len());
    }
}
