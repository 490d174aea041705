//! Routing and verification events.
//!
//! Events are published on a `tokio::sync::broadcast` channel. Publishing never blocks
//! and never fails the request path: with no subscribers an event is simply dropped,
//! and a subscriber that falls behind sees `RecvError::Lagged`.

use serde::Serialize;
use tokio::sync::broadcast;
use url::Url;
use uuid::Uuid;

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Identity of one intercepted request, shared by all events it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    pub request_id: Uuid,
    /// Target as given by the caller (`ar://...` or a plain URL).
    pub original_url: String,
    /// Concrete URL the request was sent to, once resolved.
    pub redirect_url: Option<Url>,
}

impl RequestContext {
    #[must_use]
    pub fn new(original_url: impl Into<String>) -> Self {
        Self { request_id: Uuid::new_v4(), original_url: original_url.into(), redirect_url: None }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WayfinderEvent {
    RoutingSucceeded {
        #[serde(flatten)]
        context: RequestContext,
        strategy: &'static str,
    },
    RoutingFailed {
        #[serde(flatten)]
        context: RequestContext,
        error: String,
    },
    /// The trusted and computed values are equal; both are kept for symmetry with
    /// failure events.
    VerificationPassed {
        #[serde(flatten)]
        context: RequestContext,
        tx_id: String,
        strategy: String,
        trusted_hash: String,
        computed_hash: String,
    },
    VerificationFailed {
        #[serde(flatten)]
        context: RequestContext,
        tx_id: String,
        trusted_hash: Option<String>,
        computed_hash: Option<String>,
        error: String,
    },
    /// Verification was configured but no transaction id could be identified.
    VerificationSkipped {
        #[serde(flatten)]
        context: RequestContext,
        reason: String,
    },
}

impl WayfinderEvent {
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        match self {
            Self::RoutingSucceeded { context, .. } |
            Self::RoutingFailed { context, .. } |
            Self::VerificationPassed { context, .. } |
            Self::VerificationFailed { context, .. } |
            Self::VerificationSkipped { context, .. } => context,
        }
    }

    /// Kebab-case event name, as used in the serialized `type` tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoutingSucceeded { .. } => "routing-succeeded",
            Self::RoutingFailed { .. } => "routing-failed",
            Self::VerificationPassed { .. } => "verification-passed",
            Self::VerificationFailed { .. } => "verification-failed",
            Self::VerificationSkipped { .. } => "verification-skipped",
        }
    }
}

/// Cloneable publisher half of the event channel.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<WayfinderEvent>,
}

impl EventEmitter {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn emit(&self, event: WayfinderEvent) {
        tracing::trace!(event = event.name(), request_id = %event.context().request_id, "event");
        // No receivers is not an error.
        let _ = self.sender.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WayfinderEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_without_subscribers_is_silent() {
        let emitter = EventEmitter::default();
        emitter.emit(WayfinderEvent::RoutingFailed {
            context: RequestContext::new("ar://ardrive"),
            error: "no gateways".to_string(),
        });
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let emitter = EventEmitter::new(4);
        let mut rx = emitter.subscribe();
        let context = RequestContext::new("ar://ardrive");
        let request_id = context.request_id;

        emitter.emit(WayfinderEvent::VerificationSkipped { context, reason: "no id".into() });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "verification-skipped");
        assert_eq!(event.context().request_id, request_id);
    }

    #[test]
    fn test_serialized_shape() {
        let event = WayfinderEvent::VerificationFailed {
            context: RequestContext::new("ar://x"),
            tx_id: "tx".into(),
            trusted_hash: Some("a".into()),
            computed_hash: Some("b".into()),
            error: "mismatch".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "verification-failed");
        assert_eq!(json["original_url"], "ar://x");
        assert_eq!(json["trusted_hash"], "a");
    }

    #[test]
    fn test_passed_event_carries_agreed_hash() {
        let event = WayfinderEvent::VerificationPassed {
            context: RequestContext::new("ar://x"),
            tx_id: "tx".into(),
            strategy: "hash".into(),
            trusted_hash: "abc".into(),
            computed_hash: "abc".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "verification-passed");
        assert_eq!(json["trusted_hash"], "abc");
        assert_eq!(json["computed_hash"], "abc");
    }
}
