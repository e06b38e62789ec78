//! Board identification for a single port.
//!
//! Installed signatures are consulted first. Only when none match, and only
//! for USB ports, is the remote VID/PID service asked. Candidates are then
//! ranked: alphabetically by FQBN (case-insensitive), with first-party
//! boards moved ahead of the rest so an official board leads when a
//! third-party board shares its VID:PID.

use crate::{
    board::{BoardCandidate, BoardListItem},
    error::{Error, Result},
    lookup::RemoteLookup,
    port::{Port, Properties},
    signatures::SignatureDatabase,
    tracing::prelude::*,
};

/// Identify the boards that may be attached to `port`.
///
/// An empty list means the board is unknown. Errors from the signature
/// database are returned as-is; any remote failure other than "not found"
/// becomes [`Error::Unavailable`].
pub async fn identify(
    signatures: &dyn SignatureDatabase,
    remote: &dyn RemoteLookup,
    port: &Port,
) -> Result<Vec<BoardListItem>> {
    debug!(port = %port.address, "Querying installed signatures for board identification");
    let mut boards = identify_locally(signatures, &port.properties)?;

    if boards.is_empty() {
        boards = match identify_remotely(remote, &port.properties).await {
            Ok(found) => found,
            Err(Error::NotFound) => {
                debug!(port = %port.address, "Board not recognized");
                Vec::new()
            }
            Err(e) => {
                warn!(port = %port.address, error = %e, "Remote board identification failed");
                return Err(Error::Unavailable {
                    message: "error getting board info from the identification service"
                        .to_string(),
                    source: Box::new(e),
                });
            }
        };
    }

    rank(&mut boards);

    Ok(boards.into_iter().map(BoardListItem::from).collect())
}

fn identify_locally(
    signatures: &dyn SignatureDatabase,
    properties: &Properties,
) -> Result<Vec<BoardCandidate>> {
    let matches = signatures.identify_board(properties)?;
    Ok(matches
        .into_iter()
        .map(|m| BoardCandidate::new(m.name, m.fqbn).with_maintainer(m.platform.maintainer))
        .collect())
}

async fn identify_remotely(
    remote: &dyn RemoteLookup,
    properties: &Properties,
) -> Result<Vec<BoardCandidate>> {
    // Not a USB device; don't bother the service.
    let Some((vid, pid)) = properties.usb_id() else {
        return Err(Error::NotFound);
    };

    debug!(vid = %vid, pid = %pid, "Querying identification service");
    remote.by_vid_pid(vid, pid).await
}

/// Order candidates for display.
fn rank(boards: &mut [BoardCandidate]) {
    boards.sort_unstable_by_key(|b| b.fqbn.to_lowercase());
    // Stable: each group keeps its alphabetical order.
    boards.sort_by_key(|b| !b.is_first_party());
}
