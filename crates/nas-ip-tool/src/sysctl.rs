//! Per-interface kernel knobs under `net.ipv4.conf.<if>` and
//! `net.ipv6.conf.<if>`.

use tracing::{debug, instrument};

use nas_os_common::shell::CommandRunner;
use nas_os_common::NasResult;

use crate::interface::AddressFamily;
use crate::tool::IpTool;

fn flag(enabled: bool) -> &'static str {
    if enabled {
        "1"
    } else {
        "0"
    }
}

impl<R: CommandRunner> IpTool<R> {
    async fn write_conf(
        &self,
        vrf: &str,
        family: AddressFamily,
        ifname: &str,
        knob: &str,
        value: &str,
    ) -> NasResult<bool> {
        let commands = self.commands();
        let argv = commands.conf_sysctl(vrf, family, ifname, knob, value);
        self.exec_ok(&argv, true).await
    }

    async fn write_ipv4(
        &self,
        vrf: &str,
        ifname: &str,
        knob: &str,
        value: &str,
    ) -> NasResult<bool> {
        self.write_conf(vrf, AddressFamily::Ipv4, ifname, knob, value)
            .await
    }

    async fn write_ipv6(
        &self,
        vrf: &str,
        ifname: &str,
        knob: &str,
        value: &str,
    ) -> NasResult<bool> {
        self.write_conf(vrf, AddressFamily::Ipv6, ifname, knob, value)
            .await
    }

    #[instrument(skip(self))]
    pub async fn set_forwarding(
        &self,
        family: AddressFamily,
        ifname: &str,
        enabled: bool,
        vrf: &str,
    ) -> NasResult<bool> {
        let value = flag(enabled);
        self.write_conf(vrf, family, ifname, "forwarding", value)
            .await
    }

    #[instrument(skip(self))]
    pub async fn set_ipv6_disabled(
        &self,
        ifname: &str,
        disabled: bool,
        vrf: &str,
    ) -> NasResult<bool> {
        let value = flag(disabled);
        self.write_ipv6(vrf, ifname, "disable_ipv6", value).await
    }

    /// Toggles SLAAC on `ifname`.
    ///
    /// In the management VRF forwarding stays on for iptables, so
    /// `accept_ra` is first set to 2 (accept RAs despite forwarding) when
    /// enabling and back to 1 when disabling.
    #[instrument(skip(self))]
    pub async fn set_ipv6_autoconf(
        &self,
        ifname: &str,
        enabled: bool,
        vrf: &str,
    ) -> NasResult<bool> {
        if vrf == self.management_vrf() {
            let accept_ra = if enabled { "2" } else { "1" };
            if !self.write_ipv6(vrf, ifname, "accept_ra", accept_ra).await? {
                debug!("accept_ra update failed, leaving autoconf untouched");
                return Ok(false);
            }
        }
        let value = flag(enabled);
        self.write_ipv6(vrf, ifname, "autoconf", value).await
    }

    /// Sets `accept_dad` (0 off, 1 on, 2 also disable IPv6 on failure).
    #[instrument(skip(self))]
    pub async fn set_ipv6_accept_dad(
        &self,
        ifname: &str,
        accept_dad: u8,
        vrf: &str,
    ) -> NasResult<bool> {
        let value = accept_dad.to_string();
        self.write_ipv6(vrf, ifname, "accept_dad", &value).await
    }

    #[instrument(skip(self))]
    pub async fn set_ipv4_arp_accept(
        &self,
        ifname: &str,
        enabled: bool,
        vrf: &str,
    ) -> NasResult<bool> {
        let value = flag(enabled);
        self.write_ipv4(vrf, ifname, "arp_accept", value).await
    }

    /// Toggles proxy ARP; `arp_ignore` is set to the opposite value.
    #[instrument(skip(self))]
    pub async fn set_proxy_arp(&self, ifname: &str, enabled: bool, vrf: &str) -> NasResult<bool> {
        let (on, off) = (flag(enabled), flag(!enabled));
        if !self.write_ipv4(vrf, ifname, "proxy_arp", on).await? {
            return Ok(false);
        }
        self.write_ipv4(vrf, ifname, "arp_ignore", off).await
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
    const MGMT: &str = "management";

    fn tool(runner: ScriptedRunner) -> IpTool<ScriptedRunner> {
        IpTool::new(runner, &ToolConfig::default())
    }

    fn assignments(tool: &IpTool<ScriptedRunner>) -> Vec<String> {
        tool.runner()
            .calls()
            .into_iter()
            .filter_map(|argv| argv.last().cloned())
            .collect()
    }

    #[tokio::test]
    async fn test_forwarding_default_vrf_runs_sysctl_directly() {
        let tool = tool(ScriptedRunner::succeeding());
        assert!(tool
            .set_forwarding(AddressFamily::Ipv6, DEV, true, "default")
            .await
            .unwrap());
        assert_eq!(
            tool.runner().last_call().unwrap(),
            vec!["sysctl", "-w", "net.ipv6.conf.e101-001-0.forwarding=1"]
        );
    }

    #[tokio::test]
    async fn test_autoconf_management_vrf_writes_accept_ra_first() {
        let tool = tool(ScriptedRunner::succeeding());
        assert!(tool.set_ipv6_autoconf("eth0", true, MGMT).await.unwrap());
        assert!(tool.set_ipv6_autoconf("eth0", false, MGMT).await.unwrap());
        assert_eq!(
            assignments(&tool),
            vec![
                "net.ipv6.conf.eth0.accept_ra=2",
                "net.ipv6.conf.eth0.autoconf=1",
                "net.ipv6.conf.eth0.accept_ra=1",
                "net.ipv6.conf.eth0.autoconf=0",
            ]
        );
    }

    #[tokio::test]
    async fn test_autoconf_other_vrf_skips_accept_ra() {
        let tool = tool(ScriptedRunner::succeeding());
        assert!(tool.set_ipv6_autoconf(DEV, true, "blue").await.unwrap());
        assert_eq!(
            assignments(&tool),
            vec!["net.ipv6.conf.e101-001-0.autoconf=1"]
        );
    }

    #[tokio::test]
    async fn test_autoconf_stops_when_accept_ra_fails() {
        let tool = tool(ScriptedRunner::new(|argv| {
            if argv.iter().any(|a| a.contains("accept_ra")) {
                RawOutput::failed(255, "sysctl: permission denied")
            } else {
                RawOutput::ok("")
            }
        }));
        assert!(!tool.set_ipv6_autoconf("eth0", true, MGMT).await.unwrap());
        assert_eq!(tool.runner().call_count(), 1);
    }

    #[tokio::test]
    async fn test_proxy_arp_toggles_arp_ignore() {
        let tool = tool(ScriptedRunner::succeeding());
        assert!(tool.set_proxy_arp(DEV, true, "default").await.unwrap());
        assert!(tool.set_proxy_arp(DEV, false, "default").await.unwrap());
        assert_eq!(
            assignments(&tool),
            vec![
                "net.ipv4.conf.e101-001-0.proxy_arp=1",
                "net.ipv4.conf.e101-001-0.arp_ignore=0",
                "net.ipv4.conf.e101-001-0.proxy_arp=0",
                "net.ipv4.conf.e101-001-0.arp_ignore=1",
            ]
        );
    }

    #[tokio::test]
    async fn test_remaining_knobs() {
        let tool = tool(ScriptedRunner::succeeding());
        tool.set_ipv6_disabled(DEV, true, "blue").await.unwrap();
        tool.set_ipv6_accept_dad(DEV, 2, "default").await.unwrap();
        tool.set_ipv4_arp_accept(DEV, false, "default")
            .await
            .unwrap();
        assert_eq!(
            assignments(&tool),
            vec![
                "net.ipv6.conf.e101-001-0.disable_ipv6=1",
                "net.ipv6.conf.e101-001-0.accept_dad=2",
                "net.ipv4.conf.e101-001-0.arp_accept=0",
            ]
        );
        let netns = ["/sbin/ip", "netns", "exec", "blue"];
        assert_eq!(&tool.runner().calls()[0][..4], &netns);
    }
}
