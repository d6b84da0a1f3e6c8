use super::options::{CappedOptions, CollectionOptions};
use super::{CappedStore, ReadHandle, RecordSink};
use crate::errors::DbError;
use crate::query::{CursorOptions, Filter, QueryDescriptor, eval_filter};
use crate::types::{CollectionName, ID_FIELD, IdGenerator};
use bson::{Bson, Document as BsonDocument};
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

struct Stored {
    seq: u64,
    size: usize,
    record: BsonDocument,
}

#[derive(Default)]
struct SlotState {
    records: VecDeque<Stored>,
    bytes: usize,
    next_seq: u64,
    trimmed: u64,
    // bumped to invalidate every handle opened before
    epoch: u64,
    dropped: bool,
}

struct CollectionSlot {
    name: CollectionName,
    options: CollectionOptions,
    state: Mutex<SlotState>,
    arrived: Condvar,
}

impl CollectionSlot {
    fn first_seq(state: &SlotState) -> u64 {
        state.records.front().map_or(state.next_seq, |r| r.seq)
    }
}

#[derive(Default)]
struct Inner {
    collections: RwLock<HashMap<CollectionName, Arc<CollectionSlot>>>,
    ids: Mutex<IdGenerator>,
    open_handles: Arc<AtomicUsize>,
}

/// In-process document store with capped collections and await-data handles.
///
/// Cloning is cheap; clones share the same collections.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").field("collections", &self.collection_names()).finish()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// `CollectionAlreadyExists` if the name is taken; `InvalidConfig` for zero capped limits.
    pub fn create_collection(&self, name: &str, options: CollectionOptions) -> Result<(), DbError> {
        if let Some(c) = options.capped
            && (c.max_size == 0 || c.max_documents == Some(0))
        {
            return Err(DbError::InvalidConfig(format!("capped limits of {name} must be positive")));
        }
        let mut cols = self.inner.collections.write();
        if cols.contains_key(name) {
            return Err(DbError::CollectionAlreadyExists(name.to_string()));
        }
        cols.insert(
            name.to_string(),
            Arc::new(CollectionSlot {
                name: name.to_string(),
                options,
                state: Mutex::new(SlotState::default()),
                arrived: Condvar::new(),
            }),
        );
        log::info!("created collection {name} ({options:?})");
        Ok(())
    }

    /// # Errors
    /// See [`MemoryStore::create_collection`].
    pub fn create_capped(&self, name: &str, capped: CappedOptions) -> Result<(), DbError> {
        self.create_collection(name, CollectionOptions::capped(capped))
    }

    /// Remove a collection; every handle open on it dies.
    pub fn drop_collection(&self, name: &str) -> bool {
        let Some(slot) = self.inner.collections.write().remove(name) else {
            return false;
        };
        slot.state.lock().dropped = true;
        slot.arrived.notify_all();
        log::info!("dropped collection {name}");
        true
    }

    /// Kill all handles currently open on `name`, as a store does when it reaps cursors.
    ///
    /// # Errors
    /// `NoSuchCollection` if the collection does not exist.
    pub fn kill_handles(&self, name: &str) -> Result<(), DbError> {
        let slot = self.slot(name)?;
        slot.state.lock().epoch += 1;
        slot.arrived.notify_all();
        log::debug!("killed handles on {name}");
        Ok(())
    }

    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// # Errors
    /// `NoSuchCollection` if the collection does not exist.
    pub fn options(&self, name: &str) -> Result<CollectionOptions, DbError> {
        Ok(self.slot(name)?.options)
    }

    /// # Errors
    /// `NoSuchCollection` if the collection does not exist.
    pub fn len(&self, name: &str) -> Result<usize, DbError> {
        Ok(self.slot(name)?.state.lock().records.len())
    }

    /// Total BSON bytes currently held by `name`.
    ///
    /// # Errors
    /// `NoSuchCollection` if the collection does not exist.
    pub fn size_bytes(&self, name: &str) -> Result<usize, DbError> {
        Ok(self.slot(name)?.state.lock().bytes)
    }

    /// Number of records evicted by capped trimming so far.
    ///
    /// # Errors
    /// `NoSuchCollection` if the collection does not exist.
    pub fn trimmed(&self, name: &str) -> Result<u64, DbError> {
        Ok(self.slot(name)?.state.lock().trimmed)
    }

    /// Snapshot of all records matching `filter`, in insertion order.
    ///
    /// # Errors
    /// `NoSuchCollection` if the collection does not exist.
    pub fn find(&self, name: &str, filter: &Filter) -> Result<Vec<BsonDocument>, DbError> {
        let slot = self.slot(name)?;
        let state = slot.state.lock();
        Ok(state
            .records
            .iter()
            .filter(|s| eval_filter(&s.record, filter))
            .map(|s| s.record.clone())
            .collect())
    }

    /// Handles opened and not yet closed, across all collections.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.inner.open_handles.load(Ordering::SeqCst)
    }

    fn slot(&self, name: &str) -> Result<Arc<CollectionSlot>, DbError> {
        self.inner
            .collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::NoSuchCollection(name.to_string()))
    }

    fn with_id(&self, record: BsonDocument) -> (Bson, BsonDocument) {
        if let Some(id) = record.get(ID_FIELD) {
            return (id.clone(), record);
        }
        let id = Bson::from(self.inner.ids.lock().next_id());
        let mut out = BsonDocument::new();
        out.insert(ID_FIELD, id.clone());
        for (k, v) in record {
            out.insert(k, v);
        }
        (id, out)
    }
}

impl RecordSink for MemoryStore {
    fn insert(&self, collection: &str, record: BsonDocument) -> Result<Bson, DbError> {
        let slot = self.slot(collection)?;
        let (id, record) = self.with_id(record);
        let mut buf = Vec::new();
        record.to_writer(&mut buf)?;
        let size = buf.len();

        let mut state = slot.state.lock();
        if state.dropped {
            return Err(DbError::NoSuchCollection(collection.to_string()));
        }
        if let Some(capped) = slot.options.capped
            && size > capped.max_size
        {
            return Err(DbError::DocumentTooLarge {
                collection: collection.to_string(),
                size,
                max_size: capped.max_size,
            });
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.bytes += size;
        state.records.push_back(Stored { seq, size, record });
        if let Some(capped) = slot.options.capped {
            while capped.over_limit(state.records.len(), state.bytes) {
                let Some(old) = state.records.pop_front() else { break };
                state.bytes -= old.size;
                state.trimmed += 1;
            }
        }
        drop(state);
        slot.arrived.notify_all();
        log::trace!("insert {collection} seq={seq} bytes={size}");
        Ok(id)
    }
}

impl CappedStore for MemoryStore {
    type Handle = MemoryHandle;

    fn is_capped(&self, collection: &str) -> Result<bool, DbError> {
        Ok(self.slot(collection)?.options.is_capped())
    }

    fn open_tailable(
        &self,
        collection: &str,
        query: &QueryDescriptor,
    ) -> Result<MemoryHandle, DbError> {
        let slot = self.slot(collection)?;
        let (alive, next_seq, epoch) = {
            let state = slot.state.lock();
            // a handle opened on an empty collection has nothing to stand on and dies at once
            (!state.records.is_empty(), CollectionSlot::first_seq(&state), state.epoch)
        };
        self.inner.open_handles.fetch_add(1, Ordering::SeqCst);
        log::debug!("open handle on {} at seq {next_seq} (alive={alive})", slot.name);
        Ok(MemoryHandle {
            slot: Some(slot),
            filter: query.effective_filter(),
            options: query.options().clone(),
            next_seq,
            epoch,
            alive,
            open_handles: Arc::clone(&self.inner.open_handles),
        })
    }
}

/// Read handle over one `MemoryStore` collection.
pub struct MemoryHandle {
    slot: Option<Arc<CollectionSlot>>,
    filter: Filter,
    options: CursorOptions,
    // sequence number of the next record to examine
    next_seq: u64,
    epoch: u64,
    alive: bool,
    open_handles: Arc<AtomicUsize>,
}

impl MemoryHandle {
    #[must_use]
    pub const fn filter(&self) -> &Filter {
        &self.filter
    }

    fn die(&mut self, why: &str) {
        if self.alive {
            log::debug!("handle died: {why}");
        }
        self.alive = false;
    }
}

impl ReadHandle for MemoryHandle {
    fn try_next(&mut self) -> Result<Option<BsonDocument>, DbError> {
        if !self.alive {
            return Ok(None);
        }
        let Some(slot) = self.slot.clone() else {
            return Ok(None);
        };
        let deadline = Instant::now() + self.options.wait_window();
        let mut state = slot.state.lock();
        loop {
            if state.dropped {
                self.die("collection dropped");
                return Ok(None);
            }
            if state.epoch != self.epoch {
                self.die("killed by store");
                return Ok(None);
            }
            let first = CollectionSlot::first_seq(&state);
            if first > self.next_seq {
                self.die("position lost to capped trimming");
                return Ok(None);
            }
            let skip = usize::try_from(self.next_seq - first).unwrap_or(usize::MAX);
            for stored in state.records.iter().skip(skip) {
                self.next_seq = stored.seq + 1;
                if eval_filter(&stored.record, &self.filter) {
                    return Ok(Some(stored.record.clone()));
                }
            }
            if !self.options.tailable {
                self.die("end of data");
                return Ok(None);
            }
            let now = Instant::now();
            if !self.options.await_data || now >= deadline {
                return Ok(None);
            }
            slot.arrived.wait_for(&mut state, deadline - now);
        }
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn close(&mut self) {
        self.alive = false;
        if self.slot.take().is_some() {
            self.open_handles.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        self.close();
    }
}
