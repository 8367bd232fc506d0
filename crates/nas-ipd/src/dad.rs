//! Duplicate address detection (DAD) failure recovery.
//!
//! Addresses reported as DAD-failed are collected in a table. The first
//! entry arms a one-shot retry timer; when it fires every tracked address is
//! deleted and, if the delete succeeded, added back so the kernel runs DAD
//! again. The table is empty afterwards.
//!
//! One task owns the table, the timer and the event source, so event
//! handling and the retry pass never interleave. Events arriving during a
//! pass wait in the subscription and, once the table is empty again, arm a
//! fresh timer.

use std::collections::BTreeSet;
use std::fmt;
use std::future;
use std::net::Ipv6Addr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Sleep;
use tracing::{debug, info, warn};

use nas_ip_tool::{AddressFamily, IpTool};
use nas_os_common::event::attr;
use nas_os_common::shell::CommandRunner;
use nas_os_common::{EventSource, NasError, NasResult, ObservedEvent, Operation};

/// Identity of one DAD-failed address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DadKey {
    pub vrf: String,
    pub ifname: String,
    pub address: Ipv6Addr,
    pub prefix_len: u8,
}

impl DadKey {
    pub fn new(
        vrf: impl Into<String>,
        ifname: impl Into<String>,
        address: Ipv6Addr,
        prefix_len: u8,
    ) -> Self {
        Self {
            vrf: vrf.into(),
            ifname: ifname.into(),
            address,
            prefix_len,
        }
    }

    /// `<address>/<prefix_len>`
    pub fn prefix(&self) -> String {
        format!("{}/{}", self.address, self.prefix_len)
    }
}

/// Rendered as `*vrf*ifname*address/len*`.
impl fmt::Display for DadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*{}*{}*{}*", self.vrf, self.ifname, self.prefix())
    }
}

/// Set of addresses awaiting a retry.
#[derive(Debug, Default)]
pub struct DadFailureTable {
    entries: BTreeSet<DadKey>,
}

impl DadFailureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key`. Returns true when this insert made the table
    /// non-empty, i.e. the retry timer has to be armed.
    pub fn insert(&mut self, key: DadKey) -> bool {
        let was_empty = self.entries.is_empty();
        self.entries.insert(key) && was_empty
    }

    /// Forgets `key`; unknown keys are ignored.
    pub fn remove(&mut self, key: &DadKey) -> bool {
        self.entries.remove(key)
    }

    /// Empties the table, returning its entries in order.
    pub fn take_all(&mut self) -> Vec<DadKey> {
        std::mem::take(&mut self.entries).into_iter().collect()
    }

    pub fn contains(&self, key: &DadKey) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A relevant IPv6 address event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DadEvent {
    /// DAD failed (create or set).
    Failed(DadKey),
    /// The failed address went away (delete).
    Cleared(DadKey),
}

fn decode_address(event: &ObservedEvent) -> NasResult<Ipv6Addr> {
    let encoded = event.attr_str(attr::IPV6_ADDRESS)?;
    let bytes = hex::decode(encoded)
        .map_err(|e| NasError::bad_attribute(attr::IPV6_ADDRESS, e.to_string()))?;
    let octets: [u8; 16] = bytes
        .try_into()
        .map_err(|_| NasError::bad_attribute(attr::IPV6_ADDRESS, "expected 16 bytes"))?;
    Ok(Ipv6Addr::from(octets))
}

fn decode_key(event: &ObservedEvent) -> NasResult<DadKey> {
    let prefix_len = event.attr_u64(attr::IPV6_PREFIX_LEN)?;
    let prefix_len = u8::try_from(prefix_len)
        .ok()
        .filter(|len| *len <= 128)
        .ok_or_else(|| {
            let reason = format!("{} out of range", prefix_len);
            NasError::bad_attribute(attr::IPV6_PREFIX_LEN, reason)
        })?;

    Ok(DadKey::new(
        event.attr_str(attr::IPV6_VRF_NAME)?,
        event.attr_str(attr::IPV6_IFNAME)?,
        decode_address(event)?,
        prefix_len,
    ))
}

impl DadEvent {
    /// Classifies an IPv6 address event. Events without an operation,
    /// without a DAD failure or with malformed attributes yield `None`.
    pub fn from_event(event: &ObservedEvent) -> Option<Self> {
        if !event.has_operation() {
            return None;
        }

        match event.attr_u64(attr::IPV6_DAD_FAILED) {
            Ok(0) => return None,
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "Skipping address event");
                return None;
            }
        }

        let key = match decode_key(event) {
            Ok(key) => key,
            Err(e) => {
                debug!(error = %e, "Skipping address event");
                return None;
            }
        };

        match event.operation()? {
            Operation::Create | Operation::Set => Some(DadEvent::Failed(key)),
            Operation::Delete => Some(DadEvent::Cleared(key)),
        }
    }
}

/// Tracks DAD-failed addresses and periodically retries them.
pub struct DadReactor<R: CommandRunner, S: EventSource> {
    tool: Arc<IpTool<R>>,
    source: S,
    retry_interval: Duration,
    table: DadFailureTable,
}

impl<R: CommandRunner, S: EventSource> DadReactor<R, S> {
    pub fn new(tool: Arc<IpTool<R>>, source: S, retry_interval: Duration) -> Self {
        Self {
            tool,
            source,
            retry_interval,
            table: DadFailureTable::new(),
        }
    }

    pub fn table(&self) -> &DadFailureTable {
        &self.table
    }

    /// Applies one event to the table. Returns true when the retry timer
    /// has to be armed.
    pub fn handle_event(&mut self, event: &ObservedEvent) -> bool {
        match DadEvent::from_event(event) {
            Some(DadEvent::Failed(key)) => {
                info!("DAD failed for {}", key);
                self.table.insert(key)
            }
            Some(DadEvent::Cleared(key)) => {
                if self.table.remove(&key) {
                    debug!("DAD failure {} cleared", key);
                }
                false
            }
            None => false,
        }
    }

    /// Deletes and re-adds every tracked address, then leaves the table
    /// empty.
    pub async fn retry_pass(&mut self) {
        let keys = self.table.take_all();
        info!(count = keys.len(), "Retrying DAD-failed addresses");

        let family = AddressFamily::Ipv6;
        for key in keys {
            let prefix = key.prefix();
            match self
                .tool
                .delete_ip_address(&prefix, &key.ifname, &key.vrf)
                .await
            {
                Ok(true) => {
                    match self
                        .tool
                        .add_ip_address(&prefix, &key.ifname, family, &key.vrf, true)
                        .await
                    {
                        Ok(true) => info!("Re-added {} for DAD", key),
                        Ok(false) => warn!("Failed to re-add {}", key),
                        Err(e) => warn!(error = %e, "Failed to re-add {}", key),
                    }
                }
                // The address is already gone, e.g. removed by the operator.
                Ok(false) => debug!("Delete of {} failed, not re-adding", key),
                Err(e) => warn!(error = %e, "Failed to delete {}", key),
            }
        }
    }

    /// Processes events and timer expiries until the subscription closes.
    pub async fn run(mut self) {
        info!(interval = ?self.retry_interval, "DAD reactor started");
        let mut retry_timer: Option<Pin<Box<Sleep>>> = None;

        loop {
            tokio::select! {
                event = self.source.next_event() => {
                    let Some(event) = event else {
                        break;
                    };
                    if self.handle_event(&event) && retry_timer.is_none() {
                        retry_timer = Some(Box::pin(tokio::time::sleep(self.retry_interval)));
                    }
                }
                () = async {
                    match retry_timer.as_mut() {
                        Some(timer) => timer.await,
                        None => future::pending().await,
                    }
                } => {
                    retry_timer = None;
                    self.retry_pass().await;
                }
            }
        }

        info!(
            pending = self.table.len(),
            "DAD reactor stopped: address subscription closed"
        );
    }
}
