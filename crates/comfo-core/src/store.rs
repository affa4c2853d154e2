// ── Snapshot cache ──
//
// Lock-free cell holding the latest complete snapshot. Readers are
// wait-free; the writer performs a single atomic pointer swap at the
// instant a refresh commits. No lock is ever held across the network
// calls that produce the data.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::snapshot::Snapshot;

/// Atomic cell for the most recent [`Snapshot`].
///
/// `None` until the first successful refresh; after that, `load` always
/// yields a complete snapshot (refresh is all-or-nothing). A failed
/// refresh never touches the cell.
pub(crate) struct SnapshotCache {
    current: ArcSwapOption<Snapshot>,
}

impl SnapshotCache {
    pub(crate) fn new() -> Self {
        Self {
            current: ArcSwapOption::const_empty(),
        }
    }

    /// Non-blocking read of the latest snapshot.
    pub(crate) fn load(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    /// Atomically publish a new snapshot. Readers observe either the
    /// previous snapshot or the new one, never anything in between.
    pub(crate) fn replace(&self, snapshot: Arc<Snapshot>) {
        self.current.store(Some(snapshot));
    }
}
