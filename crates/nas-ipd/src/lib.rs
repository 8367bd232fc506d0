//! NAS IP daemon library.
//!
//! Two reactors driven by observed-state events:
//!
//! - [`lla::LlaReactor`] gives every enabled interface its EUI-64
//!   link-local address.
//! - [`dad::DadReactor`] collects DAD-failed IPv6 addresses and retries
//!   them by deleting and re-adding each one after a delay.
//!
//! Events arrive through [`bus::RedisEventSource`]; both reactors accept any
//! [`EventSource`](nas_os_common::EventSource).

pub mod bus;
pub mod config;
pub mod dad;
pub mod lla;
pub mod logging;

pub use bus::RedisEventSource;
pub use config::{NasIpdConfig, DEFAULT_CONFIG_PATH};
pub use dad::{DadEvent, DadFailureTable, DadKey, DadReactor};
pub use lla::{
    configure_link_local, link_local_from_mac, LinkLocalRequest, LlaReactor, LINK_LOCAL_PREFIX_LEN,
};
pub use logging::init_logging;
