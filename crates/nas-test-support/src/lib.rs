//! Test infrastructure for the NAS Linux IP tooling
//!
//! Provides:
//! - Scripted command runners that record every argument vector
//! - A stateful `brctl` emulator
//! - Canned `ip`, `ip netns` and `brctl` output
//! - Observed-state event builders
//! - In-memory capture of tracing output

pub mod events;
pub mod fixtures;
mod logs;
mod runner;

pub use events::*;
pub use logs::CapturedLogs;
pub use runner::{FakeBridgeRunner, ScriptedRunner};
