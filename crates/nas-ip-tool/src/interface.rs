//! Interface records built from `ip addr show` output.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::parse::{
    extract, group_lines_by_indent, leading_ws, ADDR_RE, ETHER_RE, IF_HEADER_RE, MTU_RE, STATE_RE,
};

/// Administrative state, derived from the `UP` interface flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminState {
    Up,
    Down,
}

/// Operational state, derived from the `state` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperState {
    Up,
    Down,
}

/// Link-layer type of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Ethernet,
    Loopback,
    Vlan,
    Bond,
}

/// IP address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AddressFamily {
    #[serde(rename = "inet")]
    Ipv4,
    #[serde(rename = "inet6")]
    Ipv6,
}

impl AddressFamily {
    /// Maps the iproute2 keyword (`inet`, `inet6`).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "inet" => Some(AddressFamily::Ipv4),
            "inet6" => Some(AddressFamily::Ipv6),
            _ => None,
        }
    }

    /// iproute2 keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "inet",
            AddressFamily::Ipv6 => "inet6",
        }
    }

    /// sysctl tree name (`ipv4`, `ipv6`).
    pub fn sysctl_tree(&self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "ipv4",
            AddressFamily::Ipv6 => "ipv6",
        }
    }

    /// `ip` family switch (`-4`, `-6`).
    pub fn ip_flag(&self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "-4",
            AddressFamily::Ipv6 => "-6",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl std::str::FromStr for AddressFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ipv4" | "inet" | "4" => Ok(AddressFamily::Ipv4),
            "ipv6" | "inet6" | "6" => Ok(AddressFamily::Ipv6),
            other => Err(format!("unknown address family '{}'", other)),
        }
    }
}

/// One address configured on an interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpAddressEntry {
    pub family: AddressFamily,
    pub address: String,
    pub prefix_len: u8,
}

impl IpAddressEntry {
    /// Parses an `<af> <addr>/<prefix>` line. Families other than `inet`
    /// and `inet6` yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = ADDR_RE.captures(line)?;
        let family = AddressFamily::from_keyword(caps.name("af_type")?.as_str())?;
        let prefix_len = caps.name("prefix")?.as_str().parse().ok()?;
        Some(Self {
            family,
            address: caps.name("addr")?.as_str().to_string(),
            prefix_len,
        })
    }
}

impl fmt::Display for IpAddressEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.family, self.address, self.prefix_len)
    }
}

/// Decides the link type of an interface by name.
pub trait LinkClassifier: Send + Sync {
    fn classify(&self, ifname: &str) -> LinkType;
}

/// Classifies through `<root>/<ifname>/uevent` (`DEVTYPE=vlan|bond`).
#[derive(Debug, Clone)]
pub struct SysfsClassifier {
    root: PathBuf,
}

impl SysfsClassifier {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl LinkClassifier for SysfsClassifier {
    fn classify(&self, ifname: &str) -> LinkType {
        if ifname == "lo" || ifname.starts_with("lo:") {
            return LinkType::Loopback;
        }

        let uevent = self.root.join(ifname).join("uevent");
        let Ok(content) = fs::read_to_string(&uevent) else {
            return LinkType::Ethernet;
        };

        let mut link_type = LinkType::Ethernet;
        for line in content.lines() {
            match line.trim().split_once('=') {
                Some(("DEVTYPE", "vlan")) => link_type = LinkType::Vlan,
                Some(("DEVTYPE", "bond")) => link_type = LinkType::Bond,
                _ => {}
            }
        }
        link_type
    }
}

/// A kernel interface as reported by `ip addr show` in one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceRecord {
    /// Namespace (VRF) the interface was listed in.
    pub vrf_name: String,
    pub ifindex: u32,
    /// Name with any `@peer` suffix removed.
    pub name: String,
    pub flags: Vec<String>,
    pub admin_state: AdminState,
    pub oper_state: OperState,
    pub mtu: Option<u32>,
    pub link_type: LinkType,
    /// Set when a `macvlan` detail line was seen; such interfaces need an
    /// ip table rule installed by the caller.
    pub is_macvlan: bool,
    /// MAC address with colons removed.
    pub mac: Option<String>,
    pub addresses: Vec<IpAddressEntry>,
}

impl InterfaceRecord {
    /// Parses one interface block (header line plus indented detail lines).
    ///
    /// Returns `None` when the header is not recognisable.
    pub fn parse<S: AsRef<str>>(
        block: &[S],
        vrf_name: &str,
        classifier: &dyn LinkClassifier,
    ) -> Option<Self> {
        let header = block.first()?.as_ref();
        let Some(caps) = IF_HEADER_RE.captures(header) else {
            debug!(line = %header, "Skipping unrecognised interface header");
            return None;
        };

        let ifindex = caps.name("ifindex")?.as_str().parse().ok()?;
        let raw_name = caps.name("ifname")?.as_str();
        let name = raw_name
            .split_once('@')
            .map_or(raw_name, |(name, _peer)| name)
            .to_string();
        let flags: Vec<String> = caps
            .name("flags")?
            .as_str()
            .split(',')
            .filter(|f| !f.is_empty())
            .map(String::from)
            .collect();

        let admin_state = if flags.iter().any(|f| f.eq_ignore_ascii_case("up")) {
            AdminState::Up
        } else {
            AdminState::Down
        };
        let oper_state = match extract(&STATE_RE, "oper", header) {
            Some(state) if state.eq_ignore_ascii_case("up") => OperState::Up,
            _ => OperState::Down,
        };
        let mtu = extract(&MTU_RE, "mtu", header).and_then(|m| m.parse().ok());
        let link_type = classifier.classify(&name);

        let mut record = Self {
            vrf_name: vrf_name.to_string(),
            ifindex,
            name,
            flags,
            admin_state,
            oper_state,
            mtu,
            link_type,
            is_macvlan: false,
            mac: None,
            addresses: Vec::new(),
        };

        let details = &block[1..];
        let Some(first) = details.first() else {
            return Some(record);
        };

        for sub_block in group_lines_by_indent(leading_ws(first.as_ref()), details) {
            let head = &sub_block[0];
            if head.contains("link/ether") {
                record.mac = extract(&ETHER_RE, "addr", head).map(|mac| mac.replace(':', ""));
                continue;
            }
            if head.contains("macvlan") {
                record.is_macvlan = true;
                continue;
            }
            if let Some(entry) = IpAddressEntry::parse(head) {
                record.addresses.push(entry);
            }
        }

        Some(record)
    }

    pub fn is_admin_up(&self) -> bool {
        self.admin_state == AdminState::Up
    }

    pub fn is_oper_up(&self) -> bool {
        self.oper_state == OperState::Up
    }

    /// Addresses of one family.
    pub fn addresses_of(&self, family: AddressFamily) -> impl Iterator<Item = &IpAddressEntry> {
        self.addresses.iter().filter(move |a| a.family == family)
    }
}

/// Splits full `ip addr show` output into interface records.
pub fn parse_interfaces<S: AsRef<str>>(
    lines: &[S],
    vrf_name: &str,
    classifier: &dyn LinkClassifier,
) -> Vec<InterfaceRecord> {
    group_lines_by_indent(0, lines)
        .iter()
        .filter_map(|block| InterfaceRecord::parse(block.as_slice(), vrf_name, classifier))
        .collect()
}
