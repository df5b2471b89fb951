//! Warden supervises a dynamic set of child processes on behalf of an
//! operator: starting them, stopping them, restarting them, and keeping a
//! bounded in-memory history of their output queryable at any time. The
//! registry is a purely in-process API; a transport layer maps it onto
//! request/response endpoints, and the bundled tail client consumes the
//! ordered log query contract those endpoints expose.

/// CLI interface.
pub mod cli;

/// Registry and process tunables.
pub mod config;

/// Error handling.
pub mod error;

/// Bounded log capture.
pub mod logs;

/// Per-process lifecycle management.
pub mod process;

/// The process registry.
pub mod registry;

/// Polling log tail client.
pub mod tail;
