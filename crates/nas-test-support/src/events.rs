//! Observed-state event builders.

use std::net::Ipv6Addr;

use nas_os_common::event::attr;
use nas_os_common::{ObservedEvent, Operation};

/// Interface event as published on the interface topic.
pub fn interface_event(
    op: Operation,
    vrf: &str,
    ifname: &str,
    mac: &str,
    enabled: bool,
) -> ObservedEvent {
    ObservedEvent::new(op)
        .with_attr(attr::IF_VRF_NAME, vrf)
        .with_attr(attr::IF_NAME, ifname)
        .with_attr(attr::IF_PHYS_ADDRESS, mac)
        .with_attr(attr::IF_ENABLED, u64::from(enabled))
}

/// IPv6 address event as published on the IPv6 topic.
pub fn ipv6_address_event(
    op: Operation,
    vrf: &str,
    ifname: &str,
    address: Ipv6Addr,
    prefix_len: u8,
    dad_failed: bool,
) -> ObservedEvent {
    ObservedEvent::new(op)
        .with_attr(attr::IPV6_VRF_NAME, vrf)
        .with_attr(attr::IPV6_IFNAME, ifname)
        .with_attr(attr::IPV6_ADDRESS, hex::encode(address.octets()))
        .with_attr(attr::IPV6_PREFIX_LEN, u64::from(prefix_len))
        .with_attr(attr::IPV6_DAD_FAILED, u64::from(dad_failed))
}

/// A DAD failure notification for `address`.
pub fn dad_failure(
    op: Operation,
    vrf: &str,
    ifname: &str,
    address: Ipv6Addr,
    prefix_len: u8,
) -> ObservedEvent {
    ipv6_address_event(op, vrf, ifname, address, prefix_len, true)
}
