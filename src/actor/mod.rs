//! Actor System for Watch Mode
//!
//! Message-passing concurrency for incremental rebuilds:
//!
//! ```text
//!                  ┌──> RoleActor(html) ───┐
//! FsActor ─────────┼──> RoleActor(css) ────┼──> WsActor ──> Browsers
//! (notify+debounce)├──> RoleActor(images) ─┤   (broadcast)
//!                  └──> RoleActor(fonts) ──┘
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `fs` - File system watcher with debouncing and routing
//! - `role` - One actor per role, serializing its step runs
//! - `ws` - WebSocket broadcast
//! - `coordinator` - Wires up and runs actors

pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod role;
pub mod ws;

pub use coordinator::Coordinator;
