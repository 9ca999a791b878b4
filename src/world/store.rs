//! Snapshot Store
//!
//! Publishes whole `WorldSnapshot`s with a single pointer swap. Readers take
//! one `Arc` per tick and never observe a half-updated frame.

use std::sync::Arc;
use tokio::sync::watch;

use super::field::FieldSide;
use super::model::WorldSnapshot;
use super::objects::TeamColor;

/// Single-writer, many-reader snapshot slot.
pub struct WorldStore {
    tx: watch::Sender<Arc<WorldSnapshot>>,
}

impl WorldStore {
    /// Store seeded with an initial snapshot.
    pub fn new(initial: WorldSnapshot) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    /// Swap in a new snapshot and wake every reader.
    pub fn publish(&self, snapshot: WorldSnapshot) {
        self.tx.send_replace(Arc::new(snapshot));
    }

    /// Latest snapshot.
    pub fn current(&self) -> Arc<WorldSnapshot> {
        self.tx.borrow().clone()
    }

    /// New reader positioned at the latest snapshot.
    pub fn subscribe(&self) -> WorldReader {
        WorldReader { rx: self.tx.subscribe() }
    }
}

impl Default for WorldStore {
    fn default() -> Self {
        Self::new(WorldSnapshot::new(TeamColor::Blue, FieldSide::West))
    }
}

/// Read handle onto a [`WorldStore`].
#[derive(Clone)]
pub struct WorldReader {
    rx: watch::Receiver<Arc<WorldSnapshot>>,
}

impl WorldReader {
    /// Take the latest snapshot and mark it seen.
    pub fn snapshot(&mut self) -> Arc<WorldSnapshot> {
        self.rx.borrow_and_update().clone()
    }

    /// Wait until a snapshot newer than the last one taken is published.
    ///
    /// Returns false once the store is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_publish_wakes_reader() {
        let store = Arc::new(WorldStore::default());
        let mut reader = store.subscribe();
        assert_eq!(reader.snapshot().version, 0);

        let writer = store.clone();
        tokio::spawn(async move {
            let mut next = WorldSnapshot::new(TeamColor::Blue, FieldSide::West);
            next.version = 7;
            writer.publish(next);
        });

        let woke = tokio::time::timeout(Duration::from_secs(1), reader.changed()).await;
        assert_eq!(woke.ok(), Some(true));
        assert_eq!(reader.snapshot().version, 7);
    }

    #[tokio::test]
    async fn test_snapshot_is_stable_across_publishes() {
        let store = WorldStore::default();
        let mut reader = store.subscribe();
        let held = reader.snapshot();

        let mut next = WorldSnapshot::new(TeamColor::Blue, FieldSide::West);
        next.version = 1;
        next.tick = 99;
        store.publish(next);

        // The held Arc still points at the old frame
        assert_eq!(held.version, 0);
        assert_eq!(held.tick, 0);
        assert_eq!(store.current().tick, 99);
    }

    #[tokio::test]
    async fn test_changed_false_after_store_dropped() {
        let store = WorldStore::default();
        let mut reader = store.subscribe();
        drop(store);
        assert!(!reader.changed().await);
    }
}
