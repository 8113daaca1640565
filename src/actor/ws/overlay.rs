//! Error overlay state, one entry per failing role.

use std::collections::BTreeMap;

use crate::core::Role;
use crate::reload::HotReloadMessage;

#[derive(Debug, Clone)]
struct PendingError {
    path: String,
    error: String,
}

impl PendingError {
    fn message(&self) -> HotReloadMessage {
        HotReloadMessage::error(&self.path, &self.error)
    }
}

/// Failing roles and their latest error.
///
/// The browser shows one error at a time: the most recent one, or after a
/// role recovers, the first role (in build order) that still fails.
#[derive(Debug, Default)]
pub(super) struct Overlay {
    errors: BTreeMap<Role, PendingError>,
}

impl Overlay {
    /// Record a failure. Returns the message to broadcast.
    pub fn fail(&mut self, role: Role, path: String, error: String) -> HotReloadMessage {
        let pending = PendingError { path, error };
        let msg = pending.message();
        self.errors.insert(role, pending);
        msg
    }

    /// A role recovered. Returns `clear_error` once nothing fails, the
    /// remaining error to show otherwise, and `None` if `role` was not failing.
    pub fn clear(&mut self, role: Role) -> Option<HotReloadMessage> {
        self.errors.remove(&role)?;
        Some(self.current().unwrap_or_else(HotReloadMessage::clear_error))
    }

    /// Error to replay to a newly connected client.
    pub fn current(&self) -> Option<HotReloadMessage> {
        self.errors.values().next().map(PendingError::message)
    }
}
