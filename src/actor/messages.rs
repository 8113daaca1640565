//! Actor Message Definitions
//!
//! ```text
//! FsActor --Change--> RoleActor --Event/Error--> WsActor
//! ```

use std::net::TcpStream;

use crate::actor::role::Work;
use crate::core::Role;
use crate::reload::ReloadEvent;

// =============================================================================
// RoleActor Messages
// =============================================================================

/// Messages to a Role Actor
#[derive(Debug)]
pub enum RoleMsg {
    /// Sources to prune and/or re-run
    Change(Work),
    /// Shutdown
    Shutdown,
}

// =============================================================================
// WsActor Messages
// =============================================================================

/// Messages to WebSocket Actor
#[derive(Debug)]
pub enum WsMsg {
    /// Full reload or style injection after a successful run
    Event(ReloadEvent),
    /// Step failure (display overlay, no reload)
    Error {
        role: Role,
        path: String,
        error: String,
    },
    /// The role succeeded after an error; the overlay goes once no role fails
    ClearError { role: Role },
    /// Add client
    AddClient(TcpStream),
    /// Shutdown
    Shutdown,
}
