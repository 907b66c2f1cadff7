//! Snapshot store implementation

use std::sync::Arc;

use parking_lot::RwLock;

use super::object::TrackedObject;

/// One complete, immutable set of tracked objects
#[derive(Debug)]
pub struct Snapshot {
    /// Monotonic installation counter, starting at 1
    pub generation: u64,
    /// Objects in feed order
    pub objects: Vec<TrackedObject>,
}

/// A count taken against a specific snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// Generation of the snapshot the count was taken from
    pub generation: u64,
    /// Number of matching objects
    pub count: usize,
}

/// Holds the current snapshot
///
/// Thread-safe via `RwLock`. Counts run under the read lock, so any number of them
/// proceed in parallel; `replace` only holds the write lock for a pointer swap.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new snapshot, replacing the previous one
    ///
    /// The objects are copied, so the caller may reuse its buffer. Returns the
    /// generation assigned to the new snapshot.
    pub fn replace(&self, objects: &[TrackedObject]) -> u64 {
        // Build outside the lock; only the swap is exclusive
        let objects = objects.to_vec();

        let mut current = self.current.write();
        let generation = current.as_ref().map_or(1, |s| s.generation + 1);
        *current = Some(Arc::new(Snapshot {
            generation,
            objects,
        }));

        tracing::debug!(
            generation = generation,
            objects = current.as_ref().map_or(0, |s| s.objects.len()),
            "Snapshot installed"
        );

        generation
    }

    /// True until the first `replace`
    ///
    /// An installed snapshot with zero objects is not empty in this sense.
    pub fn is_empty(&self) -> bool {
        self.current.read().is_none()
    }

    /// Count objects in the current snapshot that satisfy `predicate`
    ///
    /// Returns 0 when no snapshot is installed.
    pub fn count_matching<P>(&self, predicate: P) -> usize
    where
        P: FnMut(&TrackedObject) -> bool,
    {
        self.measure(predicate).map_or(0, |m| m.count)
    }

    /// Count matching objects and report which snapshot the count came from
    ///
    /// Returns `None` when no snapshot is installed.
    pub fn measure<P>(&self, mut predicate: P) -> Option<Measurement>
    where
        P: FnMut(&TrackedObject) -> bool,
    {
        let current = self.current.read();
        let snapshot = current.as_ref()?;

        let count = snapshot.objects.iter().filter(|o| predicate(o)).count();

        Some(Measurement {
            generation: snapshot.generation,
            count,
        })
    }

    /// Get the current snapshot, if any
    ///
    /// The returned `Arc` stays valid after later replacements.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.read().clone()
    }

    /// Generation of the current snapshot (0 if none)
    pub fn generation(&self) -> u64 {
        self.current.read().as_ref().map_or(0, |s| s.generation)
    }

    /// Number of objects in the current snapshot
    pub fn len(&self) -> usize {
        self.current.read().as_ref().map_or(0, |s| s.objects.len())
    }
}
