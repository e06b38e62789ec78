//! Remote board identity lookup.
//!
//! The resolver only falls back to a remote lookup when the local signature
//! database does not recognize a port. [`RemoteLookup`] is the seam; the
//! production implementation is [`VidPidClient`], which queries an HTTP
//! service keyed by USB vendor and product ID.

mod vid_pid;

use crate::{board::BoardCandidate, error::Result};
use async_trait::async_trait;

pub use vid_pid::{VidPidClient, DEFAULT_LOOKUP_URL};

/// Identify a board from its USB vendor and product ID.
#[async_trait]
pub trait RemoteLookup: Send + Sync {
    /// Look up a board by VID/PID.
    ///
    /// Returns at most one candidate, or [`Error::NotFound`] when the service
    /// does not know the device.
    ///
    /// [`Error::NotFound`]: crate::error::Error::NotFound
    async fn by_vid_pid(&self, vid: &str, pid: &str) -> Result<Vec<BoardCandidate>>;
}
