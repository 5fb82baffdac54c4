//! Event contract and publish identifiers.

use std::any::type_name;

use async_trait::async_trait;
use uuid::Uuid;

/// An immutable occurrence published once and fanned out to handlers and sagas.
///
/// Events are routed by their concrete type. An event that owns a scoped
/// resource (a decoded frame buffer, a file handle) overrides [`Event::release`];
/// the bus calls it exactly once after every stage of the publish has settled,
/// whether or not handlers and sagas succeeded.
#[async_trait]
pub trait Event: Send + Sync + 'static {
    /// Releases any resource owned by the event.
    async fn release(&mut self) {}
}

/// Returns the routing name used for an event type in logs and errors.
pub fn event_name<E: Event>() -> &'static str {
    type_name::<E>()
}

/// Correlates every log line emitted while dispatching one publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublishId(Uuid);

impl PublishId {
    /// Creates a new random publish ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PublishId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PublishId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;

    impl Event for Ping {}

    #[test]
    fn publish_id_new_creates_unique_ids() {
        assert_ne!(PublishId::new(), PublishId::new());
    }

    #[test]
    fn publish_id_display_matches_uuid() {
        let id = PublishId::new();
        assert_eq!(id.to_string(), id.as_uuid().to_string());
    }

    #[test]
    fn event_name_is_the_type_path() {
        assert!(event_name::<Ping>().ends_with("Ping"));
    }

    #[tokio::test]
    async fn default_release_is_a_no_op() {
        let mut ping = Ping;
        ping.release().await;
        ping.release().await;
    }
}
