//! Common infrastructure for the NAS Linux IP tooling.
//!
//! - [`shell`]: literal argument-vector command execution with output cleanup
//! - [`error`]: error types shared by every crate in the workspace
//! - [`event`]: observed-state events and the [`EventSource`] subscription seam
//!
//! # Architecture
//!
//! The tooling drives the kernel exclusively through the `ip`, `brctl`,
//! `bridge` and `sysctl` CLIs:
//!
//! 1. Build an argument vector (optionally wrapped in `ip netns exec <vrf>`)
//! 2. Spawn it through a [`CommandRunner`]
//! 3. Parse the line-oriented output
//! 4. Report success as a boolean

pub mod error;
pub mod event;
pub mod shell;

// Re-export commonly used items at crate root
pub use error::{NasError, NasResult};
pub use event::{ChannelEventSource, EventSource, ObservedEvent, Operation};
pub use shell::{CommandOutput, CommandRunner, RawOutput, SystemRunner};
