//! Tracked objects and the snapshot store
//!
//! A snapshot is the complete set of objects reported by one successful feed fetch.
//! The store holds at most one snapshot and swaps it wholesale, so readers see either
//! the previous set or the new one, never a mix.
//!
//! ```text
//!   feed ──► Vec<TrackedObject> ──replace()──► SnapshotStore
//!                                                 │ RwLock<Option<Arc<Snapshot>>>
//!                                 measure(pred) ◄─┘
//! ```

pub mod object;
pub mod store;

pub use object::TrackedObject;
pub use store::{Measurement, Snapshot, SnapshotStore};
