//! Observed-state events.
//!
//! The control plane publishes one event per kernel change (interface
//! created, IPv6 address flagged as duplicate, ...). An event carries an
//! operation and a flat map of attributes keyed by well-known attribute
//! paths. The wire form is JSON:
//!
//! ```json
//! {"operation": "set", "attributes": {"if/interfaces/interface/name": "e101-001-0"}}
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tokio::sync::mpsc;

use crate::error::{NasError, NasResult};

/// Attribute paths published on the observed-state topics.
pub mod attr {
    /// VRF an interface is bound to.
    pub const IF_VRF_NAME: &str = "ni/if/interfaces/interface/bind-ni-name";
    pub const IF_NAME: &str = "if/interfaces/interface/name";
    /// MAC address, colon separated.
    pub const IF_PHYS_ADDRESS: &str = "dell-if/if/interfaces/interface/phys-address";
    /// Admin state, 0 or 1.
    pub const IF_ENABLED: &str = "if/interfaces/interface/enabled";

    /// Non-zero when duplicate address detection failed.
    pub const IPV6_DAD_FAILED: &str = "base-ip/ipv6/dad-failed";
    pub const IPV6_VRF_NAME: &str = "base-ip/ipv6/vrf-name";
    pub const IPV6_IFNAME: &str = "base-ip/ipv6/name";
    /// The 16 address bytes, hex encoded.
    pub const IPV6_ADDRESS: &str = "base-ip/ipv6/address/ip";
    pub const IPV6_PREFIX_LEN: &str = "base-ip/ipv6/address/prefix-length";
}

/// Operation carried by an observed-state event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Object created.
    Create,
    /// Object modified.
    Set,
    /// Object removed.
    Delete,
}

impl Operation {
    /// Parses the wire name. Unknown operations yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Operation::Create),
            "set" => Some(Operation::Set),
            "delete" => Some(Operation::Delete),
            _ => None,
        }
    }

    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Set => "set",
            Operation::Delete => "delete",
        }
    }

    /// Returns true for create and set.
    pub fn is_upsert(&self) -> bool {
        matches!(self, Operation::Create | Operation::Set)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single observed-state change notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservedEvent {
    /// Raw operation field; absent on some notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Attribute path -> value.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl ObservedEvent {
    /// Creates an event with the given operation and no attributes.
    pub fn new(operation: Operation) -> Self {
        Self {
            operation: Some(operation.as_str().to_string()),
            attributes: Map::new(),
        }
    }

    /// Adds an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Decodes the JSON wire form.
    pub fn from_json(payload: &str) -> NasResult<Self> {
        serde_json::from_str(payload)
            .map_err(|e| NasError::bad_attribute("payload", e.to_string()))
    }

    /// Returns true when the event carries an operation field at all.
    pub fn has_operation(&self) -> bool {
        self.operation.is_some()
    }

    /// Returns the parsed operation, `None` when absent or unknown.
    pub fn operation(&self) -> Option<Operation> {
        self.operation.as_deref().and_then(Operation::parse)
    }

    /// Returns a string attribute.
    pub fn attr_str(&self, name: &str) -> NasResult<&str> {
        match self.attributes.get(name) {
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(NasError::bad_attribute(
                name,
                format!("expected string, got {}", other),
            )),
            None => Err(NasError::missing_attribute(name)),
        }
    }

    /// Returns an unsigned attribute. Numeric strings and booleans are
    /// accepted since publishers are not consistent about the encoding.
    pub fn attr_u64(&self, name: &str) -> NasResult<u64> {
        match self.attributes.get(name) {
            Some(Value::Number(n)) => n.as_u64().ok_or_else(|| {
                NasError::bad_attribute(name, format!("not an unsigned integer: {}", n))
            }),
            Some(Value::Bool(b)) => Ok(u64::from(*b)),
            Some(Value::String(s)) => s.trim().parse().map_err(|_| {
                NasError::bad_attribute(name, format!("not an unsigned integer: {}", s))
            }),
            Some(other) => Err(NasError::bad_attribute(
                name,
                format!("expected integer, got {}", other),
            )),
            None => Err(NasError::missing_attribute(name)),
        }
    }

    /// Returns a boolean attribute encoded as 0/1 (or a JSON bool).
    pub fn attr_flag(&self, name: &str) -> NasResult<bool> {
        match self.attr_u64(name)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(NasError::bad_attribute(
                name,
                format!("expected 0 or 1, got {}", other),
            )),
        }
    }
}

/// A subscription to one observed-state topic.
///
/// `next_event` must be cancel safe: reactors poll it inside
/// `tokio::select!` next to their timers.
#[async_trait]
pub trait EventSource: Send {
    /// Waits for the next event. `None` means the subscription is closed.
    async fn next_event(&mut self) -> Option<ObservedEvent>;
}

/// Event source fed from an in-process channel.
#[derive(Debug)]
pub struct ChannelEventSource {
    rx: mpsc::Receiver<ObservedEvent>,
}

impl ChannelEventSource {
    /// Creates a source and the sender that feeds it.
    pub fn new(capacity: usize) -> (mpsc::Sender<ObservedEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn next_event(&mut self) -> Option<ObservedEvent> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_operation_parse() {
        assert_eq!(Operation::parse("create"), Some(Operation::Create));
        assert_eq!(Operation::parse("set"), Some(Operation::Set));
        assert_eq!(Operation::parse("delete"), Some(Operation::Delete));
        assert_eq!(Operation::parse("action"), None);
        assert!(Operation::Set.is_upsert());
        assert!(!Operation::Delete.is_upsert());
    }

    #[test]
    fn test_event_from_json() {
        let payload = r#"{"operation":"set","attributes":{
            "base-ip/ipv6/name":"e101-001-0",
            "base-ip/ipv6/dad-failed":1
        }}"#;
        let event = ObservedEvent::from_json(payload).unwrap();
        assert_eq!(event.operation(), Some(Operation::Set));
        assert_eq!(event.attr_str("base-ip/ipv6/name").unwrap(), "e101-001-0");
        assert_eq!(event.attr_u64("base-ip/ipv6/dad-failed").unwrap(), 1);
    }

    #[test]
    fn test_event_without_operation() {
        let event = ObservedEvent::from_json(r#"{"attributes":{}}"#).unwrap();
        assert!(!event.has_operation());
        assert_eq!(event.operation(), None);
    }

    #[test]
    fn test_unknown_operation_is_present_but_unparsed() {
        let event = ObservedEvent::from_json(r#"{"operation":"action"}"#).unwrap();
        assert!(event.has_operation());
        assert_eq!(event.operation(), None);
    }

    #[test]
    fn test_malformed_payload() {
        let err = ObservedEvent::from_json("not json").unwrap_err();
        assert!(matches!(err, NasError::BadAttribute { .. }));
    }

    #[test]
    fn test_attr_u64_encodings() {
        let event = ObservedEvent::new(Operation::Create)
            .with_attr("a", 1)
            .with_attr("b", true)
            .with_attr("c", "64")
            .with_attr("d", "sixty-four");
        assert_eq!(event.attr_u64("a").unwrap(), 1);
        assert_eq!(event.attr_u64("b").unwrap(), 1);
        assert_eq!(event.attr_u64("c").unwrap(), 64);
        assert!(matches!(
            event.attr_u64("d"),
            Err(NasError::BadAttribute { .. })
        ));
        assert!(matches!(
            event.attr_u64("e"),
            Err(NasError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_attr_flag() {
        let event = ObservedEvent::new(Operation::Set)
            .with_attr("on", 1)
            .with_attr("off", false)
            .with_attr("odd", 2);
        assert!(event.attr_flag("on").unwrap());
        assert!(!event.attr_flag("off").unwrap());
        assert!(event.attr_flag("odd").is_err());
    }

    #[test]
    fn test_attr_str_wrong_type() {
        let event = ObservedEvent::new(Operation::Set).with_attr("name", 5);
        assert!(matches!(
            event.attr_str("name"),
            Err(NasError::BadAttribute { .. })
        ));
    }

    #[test]
    fn test_json_wire_form() {
        let event = ObservedEvent::new(Operation::Delete).with_attr("x", "y");
        let json = serde_json::to_string(&event).unwrap();
        let back = ObservedEvent::from_json(&json).unwrap();
        assert_eq!(back, event);
    }

    #[tokio::test]
    async fn test_channel_event_source() {
        let (tx, mut source) = ChannelEventSource::new(4);
        let event = ObservedEvent::new(Operation::Create);
        tx.send(event).await.unwrap();
        drop(tx);
        assert_eq!(
            source.next_event().await.and_then(|e| e.operation()),
            Some(Operation::Create)
        );
        assert!(source.next_event().await.is_none());
    }
}
