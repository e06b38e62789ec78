//! Identify boards attached to communication ports and stream hotplug
//! events for them.
//!
//! Identification reconciles two sources: installed board signatures
//! ([`signatures`]) and a remote VID/PID service ([`lookup`]). The
//! [`identify`] module merges and ranks them for one port; [`service`]
//! applies that to a discovery snapshot or a live discovery feed.

pub mod board;
pub mod config;
pub mod discovery;
pub mod error;
pub mod identify;
pub mod lookup;
pub mod port;
pub mod service;
pub mod session;
pub mod signatures;
pub mod tracing;

pub use board::{BoardListItem, DetectedPort};
pub use error::{Error, Result};
pub use port::{Port, Properties};
pub use service::{
    BoardList, BoardListRequest, BoardListWatchRequest, BoardService, ListError, WatchEvent,
    WatchHandle,
};
