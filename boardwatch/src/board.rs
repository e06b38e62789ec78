//! Board identities and the ports they were detected on.
//!
//! Identification works on [`BoardCandidate`], which carries the owning
//! platform's maintainer for ranking. Callers only ever see
//! [`BoardListItem`], the public projection without platform metadata.

use crate::port::Port;
use serde::Serialize;

/// Maintainer whose boards are listed ahead of third-party boards.
pub const FIRST_PARTY_MAINTAINER: &str = "Arduino";

/// A proposed board match for a port, as used during ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardCandidate {
    /// Display name (e.g., "Arduino Uno")
    pub name: String,
    /// Fully-qualified board name (e.g., "arduino:avr:uno")
    pub fqbn: String,
    /// Maintainer of the platform that provides the board, if known
    pub maintainer: Option<String>,
}

impl BoardCandidate {
    pub fn new(name: impl Into<String>, fqbn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fqbn: fqbn.into(),
            maintainer: None,
        }
    }

    pub fn with_maintainer(mut self, maintainer: impl Into<String>) -> Self {
        self.maintainer = Some(maintainer.into());
        self
    }

    pub fn is_first_party(&self) -> bool {
        self.maintainer.as_deref() == Some(FIRST_PARTY_MAINTAINER)
    }
}

/// A board match as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardListItem {
    pub name: String,
    pub fqbn: String,
}

impl From<BoardCandidate> for BoardListItem {
    fn from(candidate: BoardCandidate) -> Self {
        Self {
            name: candidate.name,
            fqbn: candidate.fqbn,
        }
    }
}

/// A port together with the boards that may be attached to it.
///
/// An empty `matching_boards` means nothing recognized the board, which is
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedPort {
    pub port: Port,
    pub matching_boards: Vec<BoardListItem>,
}

impl DetectedPort {
    pub fn unidentified(port: Port) -> Self {
        Self {
            port,
            matching_boards: Vec::new(),
        }
    }
}
