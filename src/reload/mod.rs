//! Reload Module
//!
//! WebSocket-based live reload for watch mode.
//!
//! ```text
//! RoleActor --RoleRun--> ReloadEvent --HotReloadMessage--> WsActor -> Browser
//! ```
//!
//! # Modules
//!
//! - `event` - What changed after a successful step run
//! - `message` - JSON wire messages (reload, css, error, clear_error, connected)
//! - `rebase` - Relative `url()` rewriting for injected stylesheets
//! - `server` - WebSocket listener handing clients to the WsActor

pub mod event;
pub mod message;
mod rebase;
pub mod server;

pub use event::ReloadEvent;
pub use message::HotReloadMessage;
