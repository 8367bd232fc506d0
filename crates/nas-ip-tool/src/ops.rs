//! Address and link operations.
//!
//! Every operation returns `Ok(true)` when the command exited 0, `Ok(false)`
//! on a non-zero exit and `Err` only when the command could not be spawned.

use ipnet::Ipv4Net;
use std::net::Ipv4Addr;
use tracing::{debug, info, instrument};

use nas_os_common::shell::CommandRunner;
use nas_os_common::{NasError, NasResult};

use crate::interface::AddressFamily;
use crate::tool::IpTool;

/// iproute2 reports this when the address is already configured.
const ADDRESS_EXISTS_MARKER: &str = "File exists";

/// Classified result of adding an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddrAddOutcome {
    Added,
    /// The kernel already had the address.
    AlreadyPresent,
    /// The command ran and failed for any other reason (device missing,
    /// IPv6 disabled on an L2 port, ...).
    Rejected { exit_code: i32, reason: String },
}

impl AddrAddOutcome {
    /// True when the address is configured after the call.
    pub fn is_configured(&self) -> bool {
        matches!(self, AddrAddOutcome::Added | AddrAddOutcome::AlreadyPresent)
    }
}

/// Broadcast address for an IPv4 `addr[/len]`; a bare address counts as /32.
///
/// /31 and /32 networks have no broadcast address.
pub fn ipv4_broadcast(prefix: &str) -> NasResult<Option<Ipv4Addr>> {
    let net = match prefix.split_once('/') {
        Some(_) => prefix
            .parse::<Ipv4Net>()
            .map_err(|e| NasError::invalid_argument("prefix", format!("{}: {}", prefix, e)))?,
        None => {
            let addr: Ipv4Addr = prefix
                .parse()
                .map_err(|e| NasError::invalid_argument("prefix", format!("{}: {}", prefix, e)))?;
            Ipv4Net::new(addr, 32)
                .map_err(|e| NasError::invalid_argument("prefix", e.to_string()))?
        }
    };

    if net.prefix_len() >= 31 {
        Ok(None)
    } else {
        Ok(Some(net.broadcast()))
    }
}

impl<R: CommandRunner> IpTool<R> {
    /// Adds `prefix` to `dev`. IPv4 addresses get an explicit broadcast.
    ///
    /// An unparsable IPv4 prefix returns `Ok(false)` without running
    /// anything.
    pub async fn add_ip_address(
        &self,
        prefix: &str,
        dev: &str,
        family: AddressFamily,
        vrf: &str,
        log_fail: bool,
    ) -> NasResult<bool> {
        match self
            .add_ip_address_classified(prefix, dev, family, vrf, log_fail)
            .await
        {
            Ok(outcome) => Ok(outcome == AddrAddOutcome::Added),
            Err(NasError::InvalidArgument { message, .. }) => {
                debug!(prefix = %prefix, "Rejecting address: {}", message);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Adds `prefix` to `dev` and classifies the result.
    #[instrument(skip(self))]
    pub async fn add_ip_address_classified(
        &self,
        prefix: &str,
        dev: &str,
        family: AddressFamily,
        vrf: &str,
        log_fail: bool,
    ) -> NasResult<AddrAddOutcome> {
        let broadcast = match family {
            AddressFamily::Ipv4 => ipv4_broadcast(prefix)?.map(|b| b.to_string()),
            AddressFamily::Ipv6 => None,
        };

        let argv = self
            .commands()
            .addr_add(vrf, prefix, broadcast.as_deref(), dev);
        let output = self.exec(&argv, log_fail).await?;

        if output.success() {
            info!("Added address {} to {} in {}", prefix, dev, vrf);
            return Ok(AddrAddOutcome::Added);
        }
        if output.lines.iter().any(|l| l.contains(ADDRESS_EXISTS_MARKER)) {
            return Ok(AddrAddOutcome::AlreadyPresent);
        }
        Ok(AddrAddOutcome::Rejected {
            exit_code: output.exit_code,
            reason: output.text(),
        })
    }

    /// Removes `prefix` from `dev`.
    #[instrument(skip(self))]
    pub async fn delete_ip_address(&self, prefix: &str, dev: &str, vrf: &str) -> NasResult<bool> {
        let argv = self.commands().addr_del(vrf, prefix, dev);
        self.exec_ok(&argv, true).await
    }

    /// Creates a VXLAN interface on UDP port 4789.
    #[instrument(skip(self))]
    pub async fn create_vxlan_interface(
        &self,
        name: &str,
        vni: u32,
        local_ip: &str,
    ) -> NasResult<bool> {
        let argv = self.commands().vxlan_add(name, vni, local_ip);
        self.exec_ok(&argv, true).await
    }

    /// Creates a dummy interface used as a routed loopback.
    #[instrument(skip(self))]
    pub async fn create_loopback_interface(
        &self,
        name: &str,
        mtu: Option<u32>,
        mac: Option<&str>,
    ) -> NasResult<bool> {
        let argv = self.commands().dummy_add(name, mtu, mac);
        self.exec_ok(&argv, true).await
    }

    #[instrument(skip(self))]
    pub async fn create_macvlan_interface(
        &self,
        name: &str,
        parent: &str,
        mac: &str,
        vrf: &str,
    ) -> NasResult<bool> {
        let argv = self.commands().macvlan_add(vrf, name, parent, mac);
        self.exec_ok(&argv, true).await
    }

    #[instrument(skip(self))]
    pub async fn delete_interface(&self, name: &str, vrf: &str) -> NasResult<bool> {
        let argv = self.commands().link_delete(vrf, name);
        self.exec_ok(&argv, true).await
    }

    /// Creates `<parent>.<vlan_id>` tagged with `vlan_id`.
    #[instrument(skip(self))]
    pub async fn add_vlan_subinterface(&self, parent: &str, vlan_id: u16) -> NasResult<bool> {
        let argv = self.commands().vlan_add(parent, vlan_id);
        self.exec_ok(&argv, true).await
    }

    pub async fn set_mtu(&self, name: &str, mtu: u32) -> NasResult<bool> {
        let argv = self.commands().link_set_mtu(name, mtu);
        self.exec_ok(&argv, true).await
    }

    pub async fn set_mac(&self, name: &str, mac: &str, vrf: &str) -> NasResult<bool> {
        let argv = self.commands().link_set_mac(vrf, name, mac);
        self.exec_ok(&argv, true).await
    }

    pub async fn set_admin_state(&self, name: &str, up: bool, vrf: &str) -> NasResult<bool> {
        let argv = self.commands().link_set_state(vrf, name, up);
        self.exec_ok(&argv, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;
    use nas_os_common::RawOutput;
    use nas_test_support::ScriptedRunner;
    use pretty_assertions::assert_eq;

    const DEV: &str = "e101-001-0";

    fn tool(runner: ScriptedRunner) -> IpTool<ScriptedRunner> {
        IpTool::new(runner, &ToolConfig::default())
    }

    fn v(cmd: &str) -> Vec<String> {
        cmd.split(' ').map(String::from).collect()
    }

    #[test]
    fn test_ipv4_broadcast() {
        let broadcast = |prefix: &str| ipv4_broadcast(prefix).unwrap();
        assert_eq!(broadcast("10.1.1.1/24"), "10.1.1.255".parse().ok());
        assert_eq!(broadcast("172.16.0.9/12"), "172.31.255.255".parse().ok());
        assert_eq!(broadcast("10.1.1.1"), None);
        assert_eq!(broadcast("10.1.1.0/31"), None);
        assert!(ipv4_broadcast("10.1.1.1/33").is_err());
        assert!(ipv4_broadcast("not-an-address").is_err());
    }

    #[tokio::test]
    async fn test_add_ipv4_address_adds_broadcast() {
        let tool = tool(ScriptedRunner::succeeding());
        assert!(tool
            .add_ip_address("10.1.1.1/24", DEV, AddressFamily::Ipv4, "default", true)
            .await
            .unwrap());
        assert_eq!(
            tool.runner().last_call().unwrap(),
            v("/sbin/ip addr add 10.1.1.1/24 broadcast 10.1.1.255 dev e101-001-0")
        );
    }

    #[tokio::test]
    async fn test_add_invalid_ipv4_runs_nothing() {
        let tool = tool(ScriptedRunner::succeeding());
        let added = tool
            .add_ip_address("10.1.1.300/24", DEV, AddressFamily::Ipv4, "default", true)
            .await
            .unwrap();
        assert!(!added);
        assert_eq!(tool.runner().call_count(), 0);
    }

    #[tokio::test]
    async fn test_add_ipv6_address_in_vrf() {
        let tool = tool(ScriptedRunner::succeeding());
        assert!(tool
            .add_ip_address("2001:db8::1/64", DEV, AddressFamily::Ipv6, "blue", false)
            .await
            .unwrap());
        assert_eq!(
            tool.runner().last_call().unwrap(),
            v("/sbin/ip netns exec blue /sbin/ip addr add 2001:db8::1/64 dev e101-001-0")
        );
    }

    #[tokio::test]
    async fn test_classified_outcomes() {
        let exists = tool(ScriptedRunner::new(|_| {
            RawOutput::failed(2, "RTNETLINK answers: File exists\n")
        }));
        let outcome = exists
            .add_ip_address_classified("fe80::1/64", DEV, AddressFamily::Ipv6, "default", false)
            .await
            .unwrap();
        assert_eq!(outcome, AddrAddOutcome::AlreadyPresent);
        assert!(outcome.is_configured());

        let missing = tool(ScriptedRunner::new(|_| {
            RawOutput::failed(1, "Cannot find device \"e101-009-0\"\n")
        }));
        let outcome = missing
            .add_ip_address_classified(
                "fe80::1/64",
                "e101-009-0",
                AddressFamily::Ipv6,
                "default",
                false,
            )
            .await
            .unwrap();
        assert_eq!(
            outcome,
            AddrAddOutcome::Rejected {
                exit_code: 1,
                reason: "Cannot find device \"e101-009-0\"".to_string()
            }
        );
        assert!(!outcome.is_configured());

        let bad = tool(ScriptedRunner::succeeding())
            .add_ip_address_classified("10.0.0.1/40", DEV, AddressFamily::Ipv4, "default", true)
            .await;
        assert!(matches!(bad, Err(NasError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_false_not_error() {
        let tool = tool(ScriptedRunner::failing(2));
        assert!(!tool.delete_interface("vtep100", "default").await.unwrap());
        assert!(!tool.set_mtu(DEV, 9100).await.unwrap());
        assert!(!tool.add_vlan_subinterface(DEV, 100).await.unwrap());
    }

    #[tokio::test]
    async fn test_spawn_error_propagates() {
        let tool = tool(ScriptedRunner::unspawnable());
        assert!(matches!(
            tool.set_admin_state(DEV, true, "default").await,
            Err(NasError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn test_link_operations_issue_expected_commands() {
        let tool = tool(ScriptedRunner::succeeding());
        let vxlan = tool.create_vxlan_interface("vtep100", 100, "10.0.0.1");
        assert!(vxlan.await.unwrap());
        let loopback = tool.create_loopback_interface("lo1", Some(9100), None);
        assert!(loopback.await.unwrap());
        let mac = "00:11:22:33:44:55";
        let macvlan = tool.create_macvlan_interface("mv1", DEV, mac, "blue");
        assert!(macvlan.await.unwrap());
        let new_mac = "00:11:22:33:44:66";
        assert!(tool.set_mac(DEV, new_mac, "default").await.unwrap());

        let calls = tool.runner().calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0].last().map(String::as_str), Some("4789"));
        assert_eq!(calls[1].last().map(String::as_str), Some("dummy"));
        assert_eq!(&calls[2][..4], &["/sbin/ip", "netns", "exec", "blue"]);
        assert_eq!(calls[3].last().map(String::as_str), Some(new_mac));
    }
}
