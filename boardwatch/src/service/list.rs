//! One-shot board listing.

use super::BoardService;
use crate::{
    board::DetectedPort,
    error::Error,
    identify::identify,
    session::Instance,
    tracing::prelude::*,
};
use std::time::Duration;
use tokio::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardListRequest {
    pub instance: Instance,
    /// Time to let discovery settle before taking the snapshot
    pub timeout_ms: u64,
}

/// Result of a successful listing.
#[derive(Debug)]
pub struct BoardList {
    /// Detected ports in discovery order
    pub ports: Vec<DetectedPort>,
    /// Backends that failed to start; the listing covers the others
    pub discovery_start_errors: Vec<Error>,
}

/// A listing that failed as a whole.
#[derive(thiserror::Error, Debug)]
#[error("{error}")]
pub struct ListError {
    #[source]
    pub error: Error,
    pub discovery_start_errors: Vec<Error>,
}

impl From<Error> for ListError {
    fn from(error: Error) -> Self {
        Self {
            error,
            discovery_start_errors: Vec::new(),
        }
    }
}

impl BoardService {
    /// List the boards currently attached.
    ///
    /// Backends that fail to start are reported alongside the result. A
    /// port whose identification fails aborts the whole listing: a broken
    /// identification service should not look like a port full of unknown
    /// boards.
    pub async fn list(&self, req: BoardListRequest) -> Result<BoardList, ListError> {
        let explorer = self
            .registry
            .acquire(req.instance)
            .ok_or(Error::InvalidInstance)?;
        let discovery = explorer.discovery();

        let discovery_start_errors = discovery.start().await;
        time::sleep(Duration::from_millis(req.timeout_ms)).await;

        let snapshot = discovery.list();
        debug!(ports = snapshot.len(), "Identifying boards on discovered ports");

        let mut ports = Vec::with_capacity(snapshot.len());
        for port in snapshot {
            match identify(explorer.signatures(), self.remote.as_ref(), &port).await {
                Ok(matching_boards) => ports.push(DetectedPort {
                    port,
                    matching_boards,
                }),
                Err(error) => {
                    error!(port = %port.address, error = %error, "Board listing aborted");
                    return Err(ListError {
                        error,
                        discovery_start_errors,
                    });
                }
            }
        }

        Ok(BoardList {
            ports,
            discovery_start_errors,
        })
    }
}
