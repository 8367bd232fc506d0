//! Tool paths and platform knobs for [`IpTool`](crate::IpTool).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use nas_os_common::shell::{BRCTL_CMD, BRIDGE_CMD, IP_CMD, SYSCTL_CMD};
use nas_os_common::{NasError, NasResult};

/// Namespace whose `autoconf` toggle also drives `accept_ra`.
pub const DEFAULT_MANAGEMENT_VRF: &str = "management";

/// Default sysfs directory for network interfaces.
pub const DEFAULT_SYSFS_NET_ROOT: &str = "/sys/class/net";

/// `[tools]` section of the daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default = "default_ip_cmd")]
    pub ip_cmd: String,

    #[serde(default = "default_brctl_cmd")]
    pub brctl_cmd: String,

    #[serde(default = "default_bridge_cmd")]
    pub bridge_cmd: String,

    #[serde(default = "default_sysctl_cmd")]
    pub sysctl_cmd: String,

    /// Where `<ifname>/uevent` files are read from.
    #[serde(default = "default_sysfs_net_root")]
    pub sysfs_net_root: PathBuf,

    #[serde(default = "default_management_vrf")]
    pub management_vrf: String,

    /// Namespaces owned by the virtualization platform; never queried.
    #[serde(default)]
    pub excluded_namespaces: Vec<String>,
}

fn default_ip_cmd() -> String {
    IP_CMD.to_string()
}

fn default_brctl_cmd() -> String {
    BRCTL_CMD.to_string()
}

fn default_bridge_cmd() -> String {
    BRIDGE_CMD.to_string()
}

fn default_sysctl_cmd() -> String {
    SYSCTL_CMD.to_string()
}

fn default_sysfs_net_root() -> PathBuf {
    PathBuf::from(DEFAULT_SYSFS_NET_ROOT)
}

fn default_management_vrf() -> String {
    DEFAULT_MANAGEMENT_VRF.to_string()
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ip_cmd: default_ip_cmd(),
            brctl_cmd: default_brctl_cmd(),
            bridge_cmd: default_bridge_cmd(),
            sysctl_cmd: default_sysctl_cmd(),
            sysfs_net_root: default_sysfs_net_root(),
            management_vrf: default_management_vrf(),
            excluded_namespaces: Vec::new(),
        }
    }
}

impl ToolConfig {
    /// Validate configuration
    pub fn validate(&self) -> NasResult<()> {
        for (name, value) in [
            ("ip_cmd", &self.ip_cmd),
            ("brctl_cmd", &self.brctl_cmd),
            ("bridge_cmd", &self.bridge_cmd),
            ("sysctl_cmd", &self.sysctl_cmd),
            ("management_vrf", &self.management_vrf),
        ] {
            if value.trim().is_empty() {
                let msg = format!("tools.{} must not be empty", name);
                return Err(NasError::config(msg));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ToolConfig::default();
        assert_eq!(config.ip_cmd, "/sbin/ip");
        assert_eq!(config.brctl_cmd, "/sbin/brctl");
        assert_eq!(config.management_vrf, "management");
        assert_eq!(config.sysfs_net_root, PathBuf::from("/sys/class/net"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_path() {
        let config = ToolConfig {
            ip_cmd: " ".to_string(),
            ..ToolConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
