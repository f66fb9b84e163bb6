//! Keyed storage for registries, independent of any geometry
//!
//! A [`Repository`] maps string ids to shared, immutable records. Readers take a
//! [`Snapshot`] once per query; writers publish a whole new snapshot. The in-memory
//! [`MemoryRepository`] implements this with copy-on-write: writers are serialized on
//! a mutex, build the next map outside the read lock, and hold the write lock only for
//! the pointer swap.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Immutable view of a repository, ordered by id
pub type Snapshot<T> = Arc<BTreeMap<String, Arc<T>>>;

/// Records that carry their own unique id
pub trait Identified {
    fn id(&self) -> &str;
}

/// How [`Repository::put`] treats an existing record with the same id
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail if the id already exists
    Insert,
    /// Fail if the id does not exist
    Replace,
    /// Insert or replace
    Upsert,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Storage interface for registries keyed by string id
pub trait Repository<T: Identified>: Send + Sync {
    /// Current immutable snapshot of all records
    fn snapshot(&self) -> Snapshot<T>;

    /// Store a record, returning the one it replaced (if any)
    fn put(&self, item: T, mode: WriteMode) -> Result<Option<Arc<T>>, RepositoryError>;

    /// Atomically replace a record with `apply(current)`
    ///
    /// Returns the new record, or `None` if the id does not exist.
    fn modify(&self, id: &str, apply: &mut dyn FnMut(&T) -> T) -> Option<Arc<T>>;

    /// Remove a record, returning it if it existed
    fn delete(&self, id: &str) -> Option<Arc<T>>;

    fn get(&self, id: &str) -> Option<Arc<T>> {
        self.snapshot().get(id).cloned()
    }

    /// All records in id order
    fn list(&self) -> Vec<Arc<T>> {
        self.snapshot().values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.snapshot().len()
    }

    fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

/// Copy-on-write in-memory repository
pub struct MemoryRepository<T> {
    current: RwLock<Snapshot<T>>,
    writer: Mutex<()>,
}

impl<T> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self {
            current: RwLock::new(Arc::new(BTreeMap::new())),
            writer: Mutex::new(()),
        }
    }
}

impl<T> std::fmt::Debug for MemoryRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRepository")
            .field("len", &self.load().len())
            .finish()
    }
}

impl<T> MemoryRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn load(&self) -> Snapshot<T> {
        // A poisoned lock still holds a complete snapshot: the swap is a single assignment
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run `mutate` on a private copy of the current map and publish it if it succeeds
    fn write<R>(
        &self,
        mutate: impl FnOnce(&mut BTreeMap<String, Arc<T>>) -> Option<R>,
    ) -> Option<R> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = (*self.load()).clone();
        let result = mutate(&mut next)?;

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        Some(result)
    }
}

impl<T: Identified + Send + Sync> Repository<T> for MemoryRepository<T> {
    fn snapshot(&self) -> Snapshot<T> {
        self.load()
    }

    fn put(&self, item: T, mode: WriteMode) -> Result<Option<Arc<T>>, RepositoryError> {
        let id = item.id().to_string();
        let mut conflict = None;

        let outcome = self.write(|map| {
            let exists = map.contains_key(&id);
            match mode {
                WriteMode::Insert if exists => {
                    conflict = Some(RepositoryError::AlreadyExists(id.clone()));
                    None
                }
                WriteMode::Replace if !exists => {
                    conflict = Some(RepositoryError::NotFound(id.clone()));
                    None
                }
                _ => Some(map.insert(id.clone(), Arc::new(item))),
            }
        });

        match (outcome, conflict) {
            (Some(previous), _) => Ok(previous),
            (None, Some(err)) => Err(err),
            (None, None) => Err(RepositoryError::NotFound(id)),
        }
    }

    fn modify(&self, id: &str, apply: &mut dyn FnMut(&T) -> T) -> Option<Arc<T>> {
        self.write(|map| {
            let current = map.get(id)?;
            let next = Arc::new(apply(current));
            map.insert(id.to_string(), next.clone());
            Some(next)
        })
    }

    fn delete(&self, id: &str) -> Option<Arc<T>> {
        self.write(|map| map.remove(id))
    }
}
