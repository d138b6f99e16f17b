//! # Runtime
//!
//! Process bootstrap and the main watch loop.

pub mod initialization;
pub mod watch_loop;

pub use initialization::{initialize, ConnectError, InitializationResult};
pub use watch_loop::{run_watch_loop, WatchSummary};
