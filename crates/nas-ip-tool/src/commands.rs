//! Argument-vector builders for ip, brctl, bridge and sysctl.
//!
//! Every builder is pure: it only assembles the vector. A VRF other than
//! `default` wraps `ip` commands as `ip netns exec <vrf> ip ...` and sysctl
//! writes as `ip netns exec <vrf> sysctl -w ...`.

use crate::config::ToolConfig;
use crate::interface::AddressFamily;
use crate::netns::is_default_vrf;

/// Destination UDP port of every VXLAN interface.
pub const VXLAN_PORT: u16 = 4789;

/// A VXLAN forwarding entry learnt for a remote VTEP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdbEntry {
    /// VXLAN interface owning the entry.
    pub dev: String,
    /// Remote VTEP address.
    pub dst_ip: String,
    /// Learnt MAC address.
    pub mac: String,
    pub vni: Option<u32>,
    /// Destination UDP port of the remote VTEP.
    pub port: Option<u16>,
    /// Interface used to reach the remote VTEP.
    pub via: Option<String>,
}

impl FdbEntry {
    pub fn new(dev: impl Into<String>, dst_ip: impl Into<String>, mac: impl Into<String>) -> Self {
        Self {
            dev: dev.into(),
            dst_ip: dst_ip.into(),
            mac: mac.into(),
            vni: None,
            port: None,
            via: None,
        }
    }

    pub fn with_vni(mut self, vni: u32) -> Self {
        self.vni = Some(vni);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_via(mut self, via: impl Into<String>) -> Self {
        self.via = Some(via.into());
        self
    }
}

/// Assembles command vectors with the configured tool paths.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    ip: String,
    brctl: String,
    bridge: String,
    sysctl: String,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::from_config(&ToolConfig::default())
    }
}

impl CommandBuilder {
    pub fn from_config(config: &ToolConfig) -> Self {
        Self {
            ip: config.ip_cmd.clone(),
            brctl: config.brctl_cmd.clone(),
            bridge: config.bridge_cmd.clone(),
            sysctl: config.sysctl_cmd.clone(),
        }
    }

    /// `ip <tail>` in `vrf`.
    fn ip_in(&self, vrf: &str, tail: &[&str]) -> Vec<String> {
        let mut argv = vec![self.ip.clone()];
        if !is_default_vrf(vrf) {
            argv.extend(["netns", "exec", vrf].map(String::from));
            argv.push(self.ip.clone());
        }
        argv.extend(tail.iter().map(|s| s.to_string()));
        argv
    }

    fn brctl(&self, tail: &[&str]) -> Vec<String> {
        let mut argv = vec![self.brctl.clone()];
        argv.extend(tail.iter().map(|s| s.to_string()));
        argv
    }

    /// `sysctl -w <key>=<value>` in `vrf`.
    pub fn sysctl_write(&self, vrf: &str, key: &str, value: &str) -> Vec<String> {
        let assignment = format!("{}={}", key, value);
        let mut argv = Vec::new();
        if !is_default_vrf(vrf) {
            argv.extend([self.ip.as_str(), "netns", "exec", vrf].map(String::from));
        }
        argv.extend([self.sysctl.clone(), "-w".to_string(), assignment]);
        argv
    }

    /// Per-interface sysctl: `net.<ipv4|ipv6>.conf.<ifname>.<knob>=<value>`.
    pub fn conf_sysctl(
        &self,
        vrf: &str,
        family: AddressFamily,
        ifname: &str,
        knob: &str,
        value: &str,
    ) -> Vec<String> {
        let key = format!("net.{}.conf.{}.{}", family.sysctl_tree(), ifname, knob);
        self.sysctl_write(vrf, &key, value)
    }

    // ---- namespaces and listing ----

    /// Build namespace list command
    pub fn netns_list(&self) -> Vec<String> {
        self.ip_in("default", &["netns", "list"])
    }

    /// Build address dump command, `-d` adds link details (macvlan mode etc.)
    pub fn addr_show(&self, vrf: &str, dev: Option<&str>, details: bool) -> Vec<String> {
        let mut tail = Vec::new();
        if details {
            tail.push("-d");
        }
        tail.extend(["addr", "show"]);
        if let Some(dev) = dev {
            tail.extend(["dev", dev]);
        }
        self.ip_in(vrf, &tail)
    }

    /// Build silent existence check command
    pub fn link_show(&self, vrf: &str, ifname: &str) -> Vec<String> {
        self.ip_in(vrf, &["link", "show", "dev", ifname])
    }

    // ---- addresses ----

    /// Build address add command, with an explicit broadcast for IPv4
    pub fn addr_add(
        &self,
        vrf: &str,
        prefix: &str,
        broadcast: Option<&str>,
        dev: &str,
    ) -> Vec<String> {
        let mut tail = vec!["addr", "add", prefix];
        if let Some(bcast) = broadcast {
            tail.extend(["broadcast", bcast]);
        }
        tail.extend(["dev", dev]);
        self.ip_in(vrf, &tail)
    }

    /// Build address delete command
    pub fn addr_del(&self, vrf: &str, prefix: &str, dev: &str) -> Vec<String> {
        self.ip_in(vrf, &["addr", "del", prefix, "dev", dev])
    }

    // ---- links ----

    /// Build VXLAN interface creation command
    pub fn vxlan_add(&self, name: &str, vni: u32, local_ip: &str) -> Vec<String> {
        let vni = vni.to_string();
        let port = VXLAN_PORT.to_string();
        self.ip_in(
            "default",
            &[
                "link", "add", "name", name, "type", "vxlan", "id", &vni, "local", local_ip,
                "dstport", &port,
            ],
        )
    }

    /// Build dummy (loopback-type) interface creation command
    pub fn dummy_add(&self, name: &str, mtu: Option<u32>, mac: Option<&str>) -> Vec<String> {
        let mtu = mtu.map(|m| m.to_string());
        let mut tail = vec!["link", "add", "name", name];
        if let Some(mtu) = mtu.as_deref() {
            tail.extend(["mtu", mtu]);
        }
        if let Some(mac) = mac {
            tail.extend(["address", mac]);
        }
        tail.extend(["type", "dummy"]);
        self.ip_in("default", &tail)
    }

    /// Build macvlan creation command
    pub fn macvlan_add(&self, vrf: &str, name: &str, parent: &str, mac: &str) -> Vec<String> {
        self.ip_in(
            vrf,
            &[
                "link", "add", "link", parent, name, "address", mac, "type", "macvlan",
            ],
        )
    }

    /// Build interface delete command
    pub fn link_delete(&self, vrf: &str, name: &str) -> Vec<String> {
        self.ip_in(vrf, &["link", "delete", "dev", name])
    }

    /// Build 802.1Q sub-interface command; the new link is `<parent>.<vlan_id>`
    pub fn vlan_add(&self, parent: &str, vlan_id: u16) -> Vec<String> {
        let name = vlan_subinterface_name(parent, vlan_id);
        let id = vlan_id.to_string();
        self.ip_in(
            "default",
            &[
                "link", "add", "link", parent, "name", &name, "type", "vlan", "id", &id,
            ],
        )
    }

    /// Build set MTU command
    pub fn link_set_mtu(&self, name: &str, mtu: u32) -> Vec<String> {
        let mtu = mtu.to_string();
        self.ip_in("default", &["link", "set", name, "mtu", &mtu])
    }

    /// Build set MAC address command
    pub fn link_set_mac(&self, vrf: &str, name: &str, mac: &str) -> Vec<String> {
        self.ip_in(vrf, &["link", "set", "dev", name, "address", mac])
    }

    /// Build admin state command
    pub fn link_set_state(&self, vrf: &str, name: &str, up: bool) -> Vec<String> {
        let state = if up { "up" } else { "down" };
        self.ip_in(vrf, &["link", "set", "dev", name, state])
    }

    // ---- neighbors ----

    /// Build neighbor flush command.
    ///
    /// Selector forms: address and device, device only, address only, all.
    pub fn neigh_flush(
        &self,
        vrf: &str,
        family: AddressFamily,
        dev: Option<&str>,
        addr: Option<&str>,
    ) -> Vec<String> {
        let mut tail = vec![family.ip_flag(), "neigh", "flush"];
        match (addr, dev) {
            (Some(addr), Some(dev)) => tail.extend(["to", addr, "dev", dev]),
            (None, Some(dev)) => tail.extend(["dev", dev]),
            (Some(addr), None) => tail.extend(["to", addr]),
            (None, None) => tail.push("all"),
        }
        self.ip_in(vrf, &tail)
    }

    // ---- bridges ----

    /// Build bridge creation command
    pub fn bridge_add(&self, bridge: &str) -> Vec<String> {
        self.brctl(&["addbr", bridge])
    }

    /// Build bridge deletion command
    pub fn bridge_del(&self, bridge: &str) -> Vec<String> {
        self.brctl(&["delbr", bridge])
    }

    /// Build bridge member add command
    pub fn bridge_add_if(&self, bridge: &str, ifname: &str) -> Vec<String> {
        self.brctl(&["addif", bridge, ifname])
    }

    /// Build bridge member remove command
    pub fn bridge_del_if(&self, bridge: &str, ifname: &str) -> Vec<String> {
        self.brctl(&["delif", bridge, ifname])
    }

    /// Build bridge listing command, optionally for one bridge
    pub fn bridge_show(&self, bridge: Option<&str>) -> Vec<String> {
        match bridge {
            Some(bridge) => self.brctl(&["show", bridge]),
            None => self.brctl(&["show"]),
        }
    }

    /// Build VXLAN FDB command. `action` is `append` or `del`; optional
    /// qualifiers follow in the order vni, port, via.
    pub fn fdb(&self, action: &str, entry: &FdbEntry) -> Vec<String> {
        let mut argv: Vec<String> = [
            self.bridge.as_str(),
            "fdb",
            action,
            &entry.mac,
            "dev",
            &entry.dev,
            "dst",
            &entry.dst_ip,
        ]
        .map(String::from)
        .to_vec();

        if let Some(vni) = entry.vni {
            argv.extend(["vni".to_string(), vni.to_string()]);
        }
        if let Some(port) = entry.port {
            argv.extend(["port".to_string(), port.to_string()]);
        }
        if let Some(via) = &entry.via {
            argv.extend(["via".to_string(), via.clone()]);
        }
        argv
    }
}

/// Name of the 802.1Q sub-interface of `parent` for `vlan_id`.
pub fn vlan_subinterface_name(parent: &str, vlan_id: u16) -> String {
    format!("{}.{}", parent, vlan_id)
}
