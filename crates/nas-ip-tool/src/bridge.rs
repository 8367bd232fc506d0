//! Linux bridge management through `brctl`, and VXLAN FDB entries through
//! `bridge fdb`.
//!
//! Queries return `Ok(None)` when the command exits non-zero, so callers can
//! tell "no bridges" from "could not ask".

use tracing::{info, instrument};

use nas_os_common::shell::CommandRunner;
use nas_os_common::NasResult;

use crate::commands::FdbEntry;
use crate::parse::{extract, BR_FIRST_MEMBER_RE, BR_ID_RE, BR_MEMBER_RE, BR_NAME_RE};
use crate::tool::IpTool;

/// Bridge names from `brctl show` output.
///
/// The header is skipped. Continuation rows carry a single member name with
/// nothing after it and do not match.
pub fn parse_bridge_list<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .skip(1)
        .filter_map(|line| extract(&BR_NAME_RE, "bname", line.as_ref()))
        .collect()
}

/// Member interfaces from `brctl show <bridge>` output.
pub fn parse_bridge_members<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .skip(1)
        .enumerate()
        .filter_map(|(idx, line)| {
            let pattern = if idx == 0 { &BR_FIRST_MEMBER_RE } else { &BR_MEMBER_RE };
            extract(pattern, "iname", line.as_ref())
        })
        .collect()
}

/// Bridge id (`8000.<mac>`) from `brctl show <bridge>` output.
pub fn parse_bridge_id<S: AsRef<str>>(lines: &[S]) -> Option<String> {
    extract(&BR_ID_RE, "br_id", lines.get(1)?.as_ref())
}

impl<R: CommandRunner> IpTool<R> {
    #[instrument(skip(self))]
    pub async fn create_bridge(&self, bridge: &str) -> NasResult<bool> {
        let argv = self.commands().bridge_add(bridge);
        let created = self.exec_ok(&argv, true).await?;
        if created {
            info!("Created bridge {}", bridge);
        }
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn delete_bridge(&self, bridge: &str) -> NasResult<bool> {
        let argv = self.commands().bridge_del(bridge);
        let deleted = self.exec_ok(&argv, true).await?;
        if deleted {
            info!("Deleted bridge {}", bridge);
        }
        Ok(deleted)
    }

    #[instrument(skip(self))]
    pub async fn add_bridge_member(&self, bridge: &str, ifname: &str) -> NasResult<bool> {
        let argv = self.commands().bridge_add_if(bridge, ifname);
        self.exec_ok(&argv, true).await
    }

    #[instrument(skip(self))]
    pub async fn remove_bridge_member(&self, bridge: &str, ifname: &str) -> NasResult<bool> {
        let argv = self.commands().bridge_del_if(bridge, ifname);
        self.exec_ok(&argv, true).await
    }

    /// Names of every bridge on the system.
    pub async fn list_bridges(&self) -> NasResult<Option<Vec<String>>> {
        let output = self.exec(&self.commands().bridge_show(None), true).await?;
        Ok(output.success().then(|| parse_bridge_list(&output.lines)))
    }

    /// Member interfaces of `bridge`.
    pub async fn bridge_members(&self, bridge: &str) -> NasResult<Option<Vec<String>>> {
        let argv = self.commands().bridge_show(Some(bridge));
        let output = self.exec(&argv, true).await?;
        if !output.success() {
            return Ok(None);
        }
        Ok(Some(parse_bridge_members(&output.lines)))
    }

    /// Bridge id of `bridge`; `None` also when the output has no bridge row.
    pub async fn bridge_id(&self, bridge: &str) -> NasResult<Option<String>> {
        let argv = self.commands().bridge_show(Some(bridge));
        let output = self.exec(&argv, true).await?;
        if !output.success() {
            return Ok(None);
        }
        Ok(parse_bridge_id(&output.lines))
    }

    /// Appends a remote-VTEP forwarding entry.
    #[instrument(skip(self), fields(dev = %entry.dev, mac = %entry.mac))]
    pub async fn add_vtep_fdb_entry(&self, entry: &FdbEntry) -> NasResult<bool> {
        let argv = self.commands().fdb("append", entry);
        self.exec_ok(&argv, true).await
    }

    /// Removes a learnt remote-VTEP forwarding entry.
    #[instrument(skip(self), fields(dev = %entry.dev, mac = %entry.mac))]
    pub async fn remove_vtep_fdb_entry(&self, entry: &FdbEntry) -> NasResult<bool> {
        self.exec_ok(&self.commands().fdb("del", entry), true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;
    use nas_os_common::RawOutput;
    use nas_test_support::{fixtures, ScriptedRunner};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_bridge_list() {
        let lines: Vec<&str> = fixtures::BRCTL_SHOW.lines().collect();
        assert_eq!(parse_bridge_list(&lines), vec!["br100", "br200"]);
    }

    #[test]
    fn test_parse_bridge_list_header_only() {
        let lines = ["bridge name\tbridge id\t\tSTP enabled\tinterfaces"];
        assert!(parse_bridge_list(&lines).is_empty());
    }

    #[test]
    fn test_parse_bridge_members_and_id() {
        let lines: Vec<&str> = fixtures::BRCTL_SHOW_BR100.lines().collect();
        let members = parse_bridge_members(&lines);
        assert_eq!(members, vec!["e101-001-0", "e101-002-0", "vtep100"]);
        let id = parse_bridge_id(&lines);
        assert_eq!(id.as_deref(), Some("8000.90b11cf4a801"));
    }

    #[test]
    fn test_parse_bridge_without_members() {
        let lines = [
            "bridge name\tbridge id\t\tSTP enabled\tinterfaces",
            "br200\t\t8000.000000000000\tno",
        ];
        assert!(parse_bridge_members(&lines).is_empty());
        let id = parse_bridge_id(&lines);
        assert_eq!(id.as_deref(), Some("8000.000000000000"));
        assert_eq!(parse_bridge_id(&lines[..1]), None);
    }

    #[tokio::test]
    async fn test_bridge_queries_fail_as_none() {
        let tool = IpTool::new(ScriptedRunner::failing(1), &ToolConfig::default());
        assert_eq!(tool.list_bridges().await.unwrap(), None);
        assert_eq!(tool.bridge_members("br100").await.unwrap(), None);
        assert_eq!(tool.bridge_id("br100").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bridge_members_from_runner() {
        let runner = ScriptedRunner::new(|argv| {
            if argv.last().map(String::as_str) == Some("br100") {
                RawOutput::ok(fixtures::BRCTL_SHOW_BR100)
            } else {
                RawOutput::failed(1, "unexpected")
            }
        });
        let tool = IpTool::new(runner, &ToolConfig::default());
        let members = tool.bridge_members("br100").await.unwrap().unwrap();
        assert_eq!(members, vec!["e101-001-0", "e101-002-0", "vtep100"]);
    }

    #[tokio::test]
    async fn test_fdb_entries() {
        let tool = IpTool::new(ScriptedRunner::succeeding(), &ToolConfig::default());
        let entry = FdbEntry::new("vtep100", "10.0.0.2", "00:11:22:33:44:55").with_vni(100);
        assert!(tool.add_vtep_fdb_entry(&entry).await.unwrap());
        assert!(tool.remove_vtep_fdb_entry(&entry).await.unwrap());

        let calls = tool.runner().calls();
        assert_eq!(calls[0][2], "append");
        assert_eq!(calls[1][2], "del");
        assert_eq!(calls[1].last().map(String::as_str), Some("100"));
    }
}
