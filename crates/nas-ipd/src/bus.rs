//! Observed-state subscriptions over Redis pub/sub.
//!
//! Each topic is a Redis channel carrying one JSON-encoded
//! [`ObservedEvent`] per message.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{debug, info};

use nas_os_common::{EventSource, NasError, NasResult, ObservedEvent};

/// Decodes one pub/sub payload; undecodable payloads yield `None`.
pub fn decode_payload(topic: &str, payload: &str) -> Option<ObservedEvent> {
    match ObservedEvent::from_json(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!(topic = %topic, error = %e, "Dropping undecodable event");
            None
        }
    }
}

/// A subscription to one Redis channel.
pub struct RedisEventSource {
    topic: String,
    messages: BoxStream<'static, redis::Msg>,
}

impl RedisEventSource {
    /// Connects to `url` and subscribes to `topic`.
    pub async fn subscribe(url: &str, topic: &str) -> NasResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| NasError::event_bus(format!("Invalid Redis URL {}: {}", url, e)))?;
        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| NasError::event_bus(format!("Failed to connect to {}: {}", url, e)))?;
        pubsub
            .subscribe(topic)
            .await
            .map_err(|e| NasError::event_bus(format!("Failed to subscribe to {}: {}", topic, e)))?;

        info!(topic = %topic, "Subscribed to observed-state channel");
        Ok(Self {
            topic: topic.to_string(),
            messages: pubsub.into_on_message().boxed(),
        })
    }
}

#[async_trait]
impl EventSource for RedisEventSource {
    async fn next_event(&mut self) -> Option<ObservedEvent> {
        loop {
            let msg = self.messages.next().await?;
            let payload: String = match msg.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    debug!(topic = %self.topic, error = %e, "Dropping non-string payload");
                    continue;
                }
            };
            if let Some(event) = decode_payload(&self.topic, &payload) {
                return Some(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nas_os_common::Operation;

    #[test]
    fn test_decode_payload() {
        let payload = r#"{"operation":"create","attributes":{"name":"e101-001-0"}}"#;
        let event = decode_payload("t", payload).unwrap();
        assert_eq!(event.operation(), Some(Operation::Create));
        assert!(decode_payload("t", "{truncated").is_none());
        assert!(decode_payload("t", "42").is_none());
    }

    #[tokio::test]
    async fn test_subscribe_invalid_url() {
        let result = RedisEventSource::subscribe("not a url", "t").await;
        assert!(matches!(result, Err(NasError::EventBus { .. })));
    }
}
