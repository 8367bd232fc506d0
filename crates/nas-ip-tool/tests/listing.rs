//! Interface listing across namespaces, driven by canned `ip` output.

use nas_ip_tool::{
    AddressFamily, AdminState, ExcludeNamespaces, IpTool, LinkType, OperState, ToolConfig,
};
use nas_os_common::shell::INTERRUPTED_DUMP_MARKER;
use nas_os_common::{NasError, RawOutput};
use nas_test_support::{fixtures, ScriptedRunner};
use pretty_assertions::assert_eq;

fn config(sysfs: &tempfile::TempDir) -> ToolConfig {
    ToolConfig {
        sysfs_net_root: sysfs.path().to_path_buf(),
        ..ToolConfig::default()
    }
}

fn sysfs_with_vlan() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let ifdir = dir.path().join("e101-002-0.100");
    std::fs::create_dir_all(&ifdir).unwrap();
    let uevent = "DEVTYPE=vlan\nINTERFACE=e101-002-0.100\n";
    std::fs::write(ifdir.join("uevent"), uevent).unwrap();
    dir
}

/// Answers `ip netns list` with `netns` and `addr show` per namespace.
fn namespace_runner(netns: RawOutput) -> ScriptedRunner {
    ScriptedRunner::new(move |argv| {
        let args: Vec<&str> = argv.iter().map(String::as_str).collect();
        match args.as_slice() {
            [_, "netns", "list"] => netns.clone(),
            [_, "addr", "show", ..] => RawOutput::ok(fixtures::IP_ADDR_SHOW),
            [_, "netns", "exec", "management", _, "addr", "show", ..] => {
                RawOutput::ok(fixtures::IP_ADDR_SHOW_MANAGEMENT)
            }
            [_, "netns", "exec", "blue", ..] => {
                RawOutput::failed(1, "Cannot open network namespace \"blue\"")
            }
            _ => RawOutput::failed(1, "unexpected command"),
        }
    })
}

#[tokio::test]
async fn test_default_vrf_when_no_namespaces() {
    let sysfs = sysfs_with_vlan();
    let tool = IpTool::new(namespace_runner(RawOutput::ok("")), &config(&sysfs));

    let records = tool.list_interfaces(None, None).await;
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["lo", "e101-001-0", "e101-002-0", "e101-002-0.100"]
    );
    assert!(records.iter().all(|r| r.vrf_name == "default"));

    let port = &records[1];
    assert_eq!(port.ifindex, 2);
    assert_eq!(port.mtu, Some(9100));
    assert_eq!(port.mac.as_deref(), Some("90b11cf4a801"));
    assert_eq!(port.addresses_of(AddressFamily::Ipv6).count(), 2);
    assert_eq!(port.link_type, LinkType::Ethernet);

    let down = &records[2];
    assert_eq!(down.admin_state, AdminState::Down);
    assert_eq!(down.oper_state, OperState::Down);

    let vlan = &records[3];
    assert_eq!(vlan.link_type, LinkType::Vlan);
    assert_eq!(vlan.admin_state, AdminState::Up);
    assert_eq!(vlan.oper_state, OperState::Down);
}

#[tokio::test]
async fn test_namespaces_are_queried_in_order() {
    let sysfs = tempfile::tempdir().unwrap();
    let runner = namespace_runner(RawOutput::ok(fixtures::NETNS_LIST));
    let tool = IpTool::new(runner, &config(&sysfs));

    let records = tool.list_interfaces(None, None).await;

    // blue fails and contributes nothing; default is not queried.
    let names: Vec<(&str, &str)> = records
        .iter()
        .map(|r| (r.vrf_name.as_str(), r.name.as_str()))
        .collect();
    assert_eq!(names, vec![("management", "lo"), ("management", "eth0")]);

    let calls = tool.runner().calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1][3], "management");
    assert_eq!(calls[2][3], "blue");
}

#[tokio::test]
async fn test_excluded_namespaces_fall_back_to_default() {
    let sysfs = tempfile::tempdir().unwrap();
    let runner = namespace_runner(RawOutput::ok(fixtures::NETNS_LIST));
    let tool = IpTool::new(runner, &config(&sysfs))
        .with_namespace_filter(ExcludeNamespaces::new(["management", "blue"]));

    let records = tool.list_interfaces(None, None).await;
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.vrf_name == "default"));
}

#[tokio::test]
async fn test_netns_failure_yields_empty() {
    let sysfs = tempfile::tempdir().unwrap();
    let runner = namespace_runner(RawOutput::failed(1, "permission denied"));
    let tool = IpTool::new(runner, &config(&sysfs));

    assert!(tool.list_interfaces(None, None).await.is_empty());
    assert!(matches!(
        tool.list_namespaces().await,
        Err(NasError::CommandFailed { .. })
    ));
}

#[tokio::test]
async fn test_try_list_distinguishes_failure_from_absence() {
    let sysfs = tempfile::tempdir().unwrap();
    let tool = IpTool::new(namespace_runner(RawOutput::ok("")), &config(&sysfs));

    assert!(tool.list_interfaces(Some("blue"), None).await.is_empty());
    assert!(matches!(
        tool.try_list_interfaces_in("blue", None).await,
        Err(NasError::CommandFailed { exit_code: 1, .. })
    ));
}

#[tokio::test]
async fn test_interrupted_dump_lines_never_reach_parser() {
    let sysfs = tempfile::tempdir().unwrap();
    let stdout = format!(
        "{}\n{}\n",
        INTERRUPTED_DUMP_MARKER,
        fixtures::IP_ADDR_SHOW_MANAGEMENT
    );
    let runner = ScriptedRunner::new(move |_| RawOutput::ok(stdout.clone()));
    let tool = IpTool::new(runner, &config(&sysfs));

    let records = tool
        .try_list_interfaces_in("management", None)
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "lo");
}

#[tokio::test]
async fn test_details_report_macvlan() {
    let sysfs = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new(|_| RawOutput::ok(fixtures::IP_DETAIL_MACVLAN));
    let tool = IpTool::new(runner, &config(&sysfs));

    let records = tool
        .list_interface_details("blue", Some("mv1"))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_macvlan);
    assert_eq!(records[0].name, "mv1");
    assert_eq!(records[0].addresses.len(), 1);
    let last = tool.runner().last_call().unwrap();
    let expected = "/sbin/ip netns exec blue /sbin/ip -d addr show dev mv1";
    assert_eq!(last.join(" "), expected);
}

#[tokio::test]
async fn test_interface_exists_is_silent() {
    let runner = ScriptedRunner::new(|argv| {
        if argv.iter().any(|a| a == "e101-001-0") {
            RawOutput::ok("2: e101-001-0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 9100")
        } else {
            RawOutput::failed(1, "Device \"e101-099-0\" does not exist.")
        }
    });
    let tool = IpTool::new(runner, &ToolConfig::default());
    let present = tool.interface_exists("default", "e101-001-0").await;
    assert!(present.unwrap());
    let missing = tool.interface_exists("default", "e101-099-0").await;
    assert!(!missing.unwrap());
}
