//! Link-local address auto-configuration.
//!
//! Every interface that comes up administratively gets an `fe80::/64`
//! address derived from its MAC (modified EUI-64). L2 ports reject the add;
//! that is expected and only logged at debug level.

use std::net::Ipv6Addr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use nas_ip_tool::{AddrAddOutcome, AddressFamily, IpTool};
use nas_os_common::event::attr;
use nas_os_common::shell::CommandRunner;
use nas_os_common::{EventSource, NasError, NasResult, ObservedEvent};

/// Prefix length of every derived link-local address.
pub const LINK_LOCAL_PREFIX_LEN: u8 = 64;

/// Derives the modified EUI-64 link-local address of `mac`
/// (`aa:bb:cc:dd:ee:ff` with `:` or `-` separators).
pub fn link_local_from_mac(mac: &str) -> NasResult<Ipv6Addr> {
    let digits: String = mac.chars().filter(|c| *c != ':' && *c != '-').collect();
    let bytes = hex::decode(&digits)
        .map_err(|e| NasError::invalid_argument("mac", format!("{}: {}", mac, e)))?;
    let octets: [u8; 6] = bytes
        .try_into()
        .map_err(|_| NasError::invalid_argument("mac", format!("{}: expected 6 octets", mac)))?;

    let eui = [
        octets[0] ^ 0x02,
        octets[1],
        octets[2],
        0xff,
        0xfe,
        octets[3],
        octets[4],
        octets[5],
    ];
    Ok(Ipv6Addr::new(
        0xfe80,
        0,
        0,
        0,
        u16::from_be_bytes([eui[0], eui[1]]),
        u16::from_be_bytes([eui[2], eui[3]]),
        u16::from_be_bytes([eui[4], eui[5]]),
        u16::from_be_bytes([eui[6], eui[7]]),
    ))
}

/// What one interface event asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkLocalRequest {
    pub vrf: String,
    pub ifname: String,
    pub address: Ipv6Addr,
}

impl LinkLocalRequest {
    /// `<address>/64`
    pub fn prefix(&self) -> String {
        format!("{}/{}", self.address, LINK_LOCAL_PREFIX_LEN)
    }

    /// Extracts a request from a create/set event of an enabled interface.
    /// Every other event yields `None`.
    pub fn from_event(event: &ObservedEvent) -> Option<Self> {
        let op = event.operation()?;
        if !op.is_upsert() {
            return None;
        }

        let fields = (|| -> NasResult<_> {
            Ok((
                event.attr_str(attr::IF_VRF_NAME)?,
                event.attr_str(attr::IF_NAME)?,
                event.attr_str(attr::IF_PHYS_ADDRESS)?,
                event.attr_flag(attr::IF_ENABLED)?,
            ))
        })();
        let (vrf, ifname, mac, enabled) = match fields {
            Ok(fields) => fields,
            Err(e) => {
                debug!(error = %e, "Skipping interface event");
                return None;
            }
        };
        if !enabled {
            return None;
        }

        match link_local_from_mac(mac) {
            Ok(address) => Some(Self {
                vrf: vrf.to_string(),
                ifname: ifname.to_string(),
                address,
            }),
            Err(e) => {
                debug!(ifname = %ifname, error = %e, "Skipping interface with unusable MAC");
                None
            }
        }
    }
}

/// Adds the link-local address an event asks for. Returns the add outcome
/// when an address was attempted.
pub async fn configure_link_local<R: CommandRunner>(
    tool: &IpTool<R>,
    event: &ObservedEvent,
) -> Option<AddrAddOutcome> {
    let request = LinkLocalRequest::from_event(event)?;
    let prefix = request.prefix();

    let outcome = tool
        .add_ip_address_classified(
            &prefix,
            &request.ifname,
            AddressFamily::Ipv6,
            &request.vrf,
            false,
        )
        .await;

    match outcome {
        Ok(AddrAddOutcome::Added) => {
            info!(vrf = %request.vrf, ifname = %request.ifname, "Configured link-local {}", prefix);
            Some(AddrAddOutcome::Added)
        }
        Ok(other) => {
            debug!(
                vrf = %request.vrf,
                ifname = %request.ifname,
                outcome = ?other,
                "Link-local {} not added",
                prefix
            );
            Some(other)
        }
        Err(e) => {
            warn!(
                vrf = %request.vrf,
                ifname = %request.ifname,
                error = %e,
                "Link-local {} failed",
                prefix
            );
            None
        }
    }
}

/// Configures link-local addresses from interface events.
pub struct LlaReactor<R: CommandRunner, S: EventSource> {
    tool: Arc<IpTool<R>>,
    source: S,
}

impl<R: CommandRunner, S: EventSource> LlaReactor<R, S> {
    pub fn new(tool: Arc<IpTool<R>>, source: S) -> Self {
        Self { tool, source }
    }

    pub async fn handle_event(&self, event: &ObservedEvent) -> Option<AddrAddOutcome> {
        configure_link_local(&*self.tool, event).await
    }

    /// Processes events until the subscription closes.
    pub async fn run(mut self) {
        info!("LLA reactor started");
        while let Some(event) = self.source.next_event().await {
            configure_link_local(&*self.tool, &event).await;
        }
        info!("LLA reactor stopped: interface subscription closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nas_os_common::Operation;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_link_local_from_mac() {
        assert_eq!(
            link_local_from_mac("02:42:ac:11:00:02").unwrap(),
            "fe80::42:acff:fe11:2".parse::<Ipv6Addr>().unwrap()
        );
        assert_eq!(
            link_local_from_mac("90:b1:1c:f4:a8:01").unwrap(),
            "fe80::92b1:1cff:fef4:a801".parse::<Ipv6Addr>().unwrap()
        );
        assert_eq!(
            link_local_from_mac("00-00-00-00-00-00").unwrap(),
            "fe80::200:ff:fe00:0".parse::<Ipv6Addr>().unwrap()
        );
    }

    #[test]
    fn test_link_local_is_deterministic() {
        let a = link_local_from_mac("3c:2c:30:aa:bb:cc").unwrap();
        let b = link_local_from_mac("3C:2C:30:AA:BB:CC").unwrap();
        assert_eq!(a, b);
        assert!(a.segments()[0] == 0xfe80);
    }

    #[test]
    fn test_request_requires_enabled_flag() {
        let event = |enabled: u64| {
            ObservedEvent::new(Operation::Set)
                .with_attr(attr::IF_VRF_NAME, "default")
                .with_attr(attr::IF_NAME, "e101-001-0")
                .with_attr(attr::IF_PHYS_ADDRESS, "02:42:ac:11:00:02")
                .with_attr(attr::IF_ENABLED, enabled)
        };

        let request = LinkLocalRequest::from_event(&event(1)).unwrap();
        assert_eq!(request.prefix(), "fe80::42:acff:fe11:2/64");
        assert_eq!(LinkLocalRequest::from_event(&event(0)), None);
        // Not a flag value.
        assert_eq!(LinkLocalRequest::from_event(&event(2)), None);
        assert_eq!(
            LinkLocalRequest::from_event(&event(1).with_attr(attr::IF_ENABLED, true)),
            Some(request)
        );
    }

    #[test]
    fn test_link_local_bad_mac() {
        assert!(link_local_from_mac("02:42:ac:11:00").is_err());
        assert!(link_local_from_mac("zz:42:ac:11:00:02").is_err());
        assert!(link_local_from_mac("").is_err());
    }
}
