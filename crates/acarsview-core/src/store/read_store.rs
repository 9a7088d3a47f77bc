use super::persistence::PersistencePort;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Sub-store for read state: the set of message UIDs the operator has seen.
///
/// Lives independently of the group store. UIDs of evicted messages stay in the
/// set and are simply never looked up again.
///
/// Every change produces a [`PendingWrite`]. The plain mutators flush it right
/// away; the `_deferred` variants hand it back so a caller holding a lock can
/// release it before touching storage.
pub struct ReadStore {
    read_ids: HashSet<String>,
    writer: Arc<SnapshotWriter>,
    generation: u64,
}

struct SnapshotWriter {
    port: Box<dyn PersistencePort>,
    /// Generation of the newest snapshot written so far
    written: Mutex<u64>,
}

/// Serialized read state waiting to be saved.
#[must_use = "read state is only saved when the pending write is flushed"]
pub struct PendingWrite {
    bytes: Vec<u8>,
    generation: u64,
    writer: Arc<SnapshotWriter>,
}

impl PendingWrite {
    /// Save the snapshot unless a newer one already reached storage. Failures
    /// are logged; the in-memory set stays authoritative for the session.
    pub fn flush(self) {
        let mut written = self.writer.written.lock();
        if *written >= self.generation {
            return;
        }
        match self.writer.port.save(&self.bytes) {
            Ok(()) => *written = self.generation,
            Err(e) => tracing::warn!(error = %e, "failed to persist read state"),
        }
    }
}

impl ReadStore {
    /// Load the persisted set. An absent or unreadable value starts empty.
    pub fn new(persistence: Box<dyn PersistencePort>) -> Self {
        let read_ids = match persistence.load() {
            None => HashSet::new(),
            Some(bytes) => match serde_json::from_slice::<Vec<String>>(&bytes) {
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    tracing::warn!(error = %e, "read state unreadable, starting empty");
                    HashSet::new()
                }
            },
        };

        Self {
            read_ids,
            writer: Arc::new(SnapshotWriter {
                port: persistence,
                written: Mutex::new(0),
            }),
            generation: 0,
        }
    }

    // ===== Getters =====

    pub fn is_read(&self, uid: &str) -> bool {
        self.read_ids.contains(uid)
    }

    // ===== Mutations =====

    pub fn mark_read(&mut self, uid: &str) {
        if let Some(write) = self.mark_read_deferred(uid) {
            write.flush();
        }
    }

    pub fn mark_read_deferred(&mut self, uid: &str) -> Option<PendingWrite> {
        if self.read_ids.insert(uid.to_string()) {
            self.snapshot()
        } else {
            None
        }
    }

    /// Mark several UIDs in one write. Returns how many were newly marked.
    pub fn mark_many_read<I, S>(&mut self, uids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (added, write) = self.mark_many_read_deferred(uids);
        if let Some(write) = write {
            write.flush();
        }
        added
    }

    pub fn mark_many_read_deferred<I, S>(&mut self, uids: I) -> (usize, Option<PendingWrite>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for uid in uids {
            if self.read_ids.insert(uid.into()) {
                added += 1;
            }
        }
        let write = if added > 0 { self.snapshot() } else { None };
        (added, write)
    }

    /// Forget everything, including UIDs of messages no longer held.
    pub fn reset(&mut self) {
        if let Some(write) = self.reset_deferred() {
            write.flush();
        }
    }

    pub fn reset_deferred(&mut self) -> Option<PendingWrite> {
        if self.read_ids.is_empty() {
            return None;
        }
        self.read_ids.clear();
        self.snapshot()
    }

    /// Serialize the whole set as a sorted flat array.
    fn snapshot(&mut self) -> Option<PendingWrite> {
        let mut ids: Vec<&String> = self.read_ids.iter().collect();
        ids.sort();
        match serde_json::to_vec(&ids) {
            Ok(bytes) => {
                self.generation += 1;
                Some(PendingWrite {
                    bytes,
                    generation: self.generation,
                    writer: Arc::clone(&self.writer),
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize read state");
                None
            }
        }
    }
}
