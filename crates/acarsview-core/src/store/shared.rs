use super::message_store::MessageStore;
use super::read_store::PendingWrite;
use crate::events::IngestOutcome;
use crate::models::{MessageGroup, RawMessage};
use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable handle for hosts that ingest on one thread and render on others.
///
/// The whole ingest sequence (dedupe, re-key, insert, both caps) runs under a
/// single write guard, so readers only ever observe the state before or after
/// a message.
#[derive(Clone)]
pub struct SharedMessageStore {
    inner: Arc<RwLock<MessageStore>>,
}

impl SharedMessageStore {
    pub fn new(store: MessageStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub fn add_message(&self, raw: RawMessage) -> IngestOutcome {
        self.inner.write().add_message(raw)
    }

    /// Run `f` under the read guard.
    pub fn read<R>(&self, f: impl FnOnce(&MessageStore) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` under the write guard. Read-state changes made here are saved
    /// before the guard drops; prefer the `mark_*` methods below.
    pub fn write<R>(&self, f: impl FnOnce(&mut MessageStore) -> R) -> R {
        f(&mut self.inner.write())
    }

    // ===== Read state =====
    //
    // The set is updated and serialized under the write guard; the save runs
    // after the guard is released.

    pub fn mark_read(&self, uid: &str) {
        let write = self.inner.write().mark_read_deferred(uid);
        if let Some(write) = write {
            write.flush();
        }
    }

    pub fn mark_many_read<I, S>(&self, uids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pending = self.inner.write().mark_many_read_deferred(uids);
        flush_counted(pending)
    }

    pub fn mark_all_read(&self) -> usize {
        let pending = self.inner.write().mark_all_read_deferred();
        flush_counted(pending)
    }

    pub fn mark_all_alerts_read(&self) -> usize {
        let pending = self.inner.write().mark_all_alerts_read_deferred();
        flush_counted(pending)
    }

    pub fn reset_read_state(&self) {
        let write = self.inner.write().reset_read_state_deferred();
        if let Some(write) = write {
            write.flush();
        }
    }

    /// Owned copy of the groups, newest first.
    pub fn snapshot(&self) -> Vec<MessageGroup> {
        self.inner.read().groups().into_iter().cloned().collect()
    }
}

fn flush_counted((count, write): (usize, Option<PendingWrite>)) -> usize {
    if let Some(write) = write {
        write.flush();
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::NoAlerts;
    use crate::settings::StaticSettings;
    use crate::store::persistence::{MemoryPersistence, PersistenceError, PersistencePort};
    use crate::test_support::raw_flight;
    use parking_lot::Mutex;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_concurrent_ingest_and_reads() {
        let store = SharedMessageStore::new(MessageStore::new(
            Arc::new(StaticSettings::new(5, 3)),
            Arc::new(NoAlerts),
            Box::new(MemoryPersistence::new()),
        ));

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        let uid = format!("w{w}-{i}");
                        let flight = format!("FL{}", i % 6);
                        store.add_message(raw_flight(&uid, 1000.0 + i as f64, &flight));
                    }
                })
            })
            .collect();

        let reader = {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    for group in store.snapshot() {
                        assert!(group.messages.len() <= 5);
                    }
                    assert!(store.read(|s| s.group_count()) <= 3);
                }
            })
        };

        for handle in writers {
            handle.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(store.read(|s| s.stats().received), 200);
        assert_eq!(store.read(|s| s.group_count()), 3);
        let held = store.read(|s| s.message_count());
        assert!(held > 0 && held <= 15);
        assert_eq!(store.mark_all_read(), held);
        assert_eq!(store.read(|s| s.unread_count()), 0);
    }

    /// Port whose `save` reports entry, then blocks until released.
    struct GatedPersistence {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
        saved: MemoryPersistence,
    }

    impl PersistencePort for GatedPersistence {
        fn load(&self) -> Option<Vec<u8>> {
            None
        }

        fn save(&self, bytes: &[u8]) -> Result<(), PersistenceError> {
            let _ = self.entered.lock().send(());
            let _ = self.release.lock().recv();
            self.saved.save(bytes)
        }
    }

    #[test]
    fn test_read_state_saved_outside_the_lock() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let saved = MemoryPersistence::new();
        let store = SharedMessageStore::new(MessageStore::new(
            Arc::new(StaticSettings::new(5, 3)),
            Arc::new(NoAlerts),
            Box::new(GatedPersistence {
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
                saved: saved.clone(),
            }),
        ));
        store.add_message(raw_flight("u1", 100.0, "UAL123"));

        let marker = {
            let store = store.clone();
            thread::spawn(move || store.mark_read("u1"))
        };

        // The save is in progress; the store must stay writable meanwhile
        entered_rx.recv().unwrap();
        assert!(store.inner.try_write().is_some());
        store.add_message(raw_flight("u2", 110.0, "UAL123"));
        assert!(store.read(|s| s.is_read("u1")));
        assert!(saved.contents().is_none());

        release_tx.send(()).unwrap();
        marker.join().unwrap();
        assert_eq!(saved.contents().unwrap(), br#"["u1"]"#.to_vec());
        assert_eq!(store.read(|s| s.unread_count()), 1);
    }
}
