//! Installed board signatures.
//!
//! A signature database answers "which installed boards could be attached to
//! a port with these properties". The identification core only depends on
//! the [`SignatureDatabase`] trait; [`SignatureFile`] is a JSON-backed
//! implementation used by the binary.
//!
//! ## File format
//!
//! ```json
//! {
//!   "platforms": [
//!     {
//!       "packager": "arduino",
//!       "architecture": "avr",
//!       "maintainer": "Arduino",
//!       "boards": [
//!         {
//!           "id": "uno",
//!           "name": "Arduino Uno",
//!           "identification": [ { "vid": "0x2341", "pid": "0x0043" } ]
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```

use crate::{
    error::{Error, Result},
    port::Properties,
    tracing::prelude::*,
};
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};

/// Platform that owns a matched board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
    pub maintainer: String,
}

/// A board the signature database matched against a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardMatch {
    pub name: String,
    pub fqbn: String,
    pub platform: PlatformInfo,
}

/// Source of locally installed board signatures.
pub trait SignatureDatabase: Send + Sync {
    /// Return every installed board whose signature matches `properties`.
    fn identify_board(&self, properties: &Properties) -> Result<Vec<BoardMatch>>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignatureFile {
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Platform {
    pub packager: String,
    pub architecture: String,
    pub maintainer: String,
    #[serde(default)]
    pub boards: Vec<BoardSignature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardSignature {
    pub id: String,
    pub name: String,
    /// Alternative property sets; any one of them identifies the board.
    #[serde(default)]
    pub identification: Vec<BTreeMap<String, String>>,
}

impl SignatureFile {
    /// An empty database that never matches.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load signatures from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let db = Self::from_json(&contents)
            .map_err(|e| Error::Signatures(format!("{}: {e}", path.display())))?;
        debug!(
            path = %path.display(),
            platforms = db.platforms.len(),
            "Loaded board signatures"
        );
        Ok(db)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).map_err(|e| Error::Signatures(e.to_string()))
    }
}

impl BoardSignature {
    fn matches(&self, properties: &Properties) -> bool {
        self.identification.iter().any(|set| {
            !set.is_empty()
                && set.iter().all(|(key, expected)| {
                    properties
                        .get(key)
                        .is_some_and(|actual| actual.eq_ignore_ascii_case(expected))
                })
        })
    }
}

impl SignatureDatabase for SignatureFile {
    fn identify_board(&self, properties: &Properties) -> Result<Vec<BoardMatch>> {
        let mut found = Vec::new();
        for platform in &self.platforms {
            for board in platform.boards.iter().filter(|b| b.matches(properties)) {
                found.push(BoardMatch {
                    name: board.name.clone(),
                    fqbn: format!("{}:{}:{}", platform.packager, platform.architecture, board.id),
                    platform: PlatformInfo {
                        maintainer: platform.maintainer.clone(),
                    },
                });
            }
        }
        Ok(found)
    }
}
