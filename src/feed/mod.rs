//! Snapshot feeds
//!
//! A feed produces the complete current set of tracked objects on demand. The
//! broadcast engine calls [`Feed::fetch_all`] once per refresh cycle.

pub mod opensky;

use std::future::Future;

use crate::error::FeedError;
use crate::snapshot::TrackedObject;

pub use opensky::{OpenSkyConfig, OpenSkyFeed};

/// Source of tracked-object snapshots
///
/// Implementations may fail transiently; the engine retries on its next tick.
///
/// # Example
/// ```no_run
/// use locator_rs::error::FeedError;
/// use locator_rs::feed::Feed;
/// use locator_rs::snapshot::TrackedObject;
///
/// struct Fixed(Vec<TrackedObject>);
///
/// impl Feed for Fixed {
///     async fn fetch_all(&self) -> Result<Vec<TrackedObject>, FeedError> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
pub trait Feed: Send + Sync + 'static {
    /// Fetch every object the source currently knows about
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<TrackedObject>, FeedError>> + Send;
}
