//! Hot Reload Message Protocol
//!
//! JSON messages sent over the WebSocket to browser clients.
//!
//! # Message Types
//!
//! - `reload`: Trigger full page reload
//! - `css`: Replace one stylesheet in place
//! - `error` / `clear_error`: Show or hide the failed-step overlay
//! - `connected`: Greeting on connect

use serde::{Deserialize, Serialize};

use super::ReloadEvent;

/// Hot reload message sent over WebSocket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HotReloadMessage {
    /// Full page reload
    Reload {
        /// Optional reason for reload
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// CSS-only update
    Css {
        /// Stylesheet URL path (matched against `<link href>`)
        target: String,
        /// New CSS content
        content: String,
    },

    /// Connection established
    Connected {
        /// Server version for compatibility check
        version: String,
    },

    /// Step failure (display overlay, no reload)
    Error {
        /// Offending source file
        path: String,
        /// Error message
        error: String,
    },

    /// Clear error overlay (step succeeded after error)
    #[serde(rename = "clear_error")]
    ClearError,
}

impl HotReloadMessage {
    /// Create a reload message with reason
    pub fn reload_with_reason(reason: impl Into<String>) -> Self {
        Self::Reload {
            reason: Some(reason.into()),
        }
    }

    pub fn css(target: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Css {
            target: target.into(),
            content: content.into(),
        }
    }

    /// Create a connected message
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Create an error message
    pub fn error(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Error {
            path: path.into(),
            error: error.into(),
        }
    }

    /// Create a clear error message
    pub fn clear_error() -> Self {
        Self::ClearError
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }

    #[cfg(test)]
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }
}

impl From<ReloadEvent> for HotReloadMessage {
    fn from(event: ReloadEvent) -> Self {
        match event {
            ReloadEvent::FullReload { path } => Self::reload_with_reason(path),
            ReloadEvent::StyleInject { url, content } => Self::css(url, content),
        }
    }
}
