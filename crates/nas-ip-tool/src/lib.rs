//! Interface, address, bridge and sysctl management over the Linux
//! networking CLIs.
//!
//! [`IpTool`] wraps a [`CommandRunner`](nas_os_common::CommandRunner) and
//! exposes:
//!
//! - interface listing across network namespaces ([`InterfaceRecord`])
//! - address, link and neighbor operations (`ip`)
//! - bridge and VXLAN FDB operations (`brctl`, `bridge`)
//! - per-interface kernel knobs (`sysctl`)
//!
//! VRFs map one-to-one onto network namespaces. Anything outside the
//! `default` VRF is run through `ip netns exec <vrf>`.

pub mod bridge;
pub mod commands;
pub mod config;
pub mod interface;
pub mod neigh;
pub mod netns;
pub mod ops;
pub mod parse;
pub mod sysctl;
pub mod tool;

pub use commands::{CommandBuilder, FdbEntry, VXLAN_PORT};
pub use config::ToolConfig;
pub use interface::{
    AddressFamily, AdminState, InterfaceRecord, IpAddressEntry, LinkClassifier, LinkType, OperState,
    SysfsClassifier,
};
pub use netns::{ExcludeNamespaces, NamespaceFilter, DEFAULT_VRF};
pub use ops::AddrAddOutcome;
pub use tool::IpTool;
