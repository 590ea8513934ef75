//! Fan-out of mutation events to open connections.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::events::{topic, Event, EventKind};
use super::registry::{ConnectionRegistry, DeliveryReport};
use super::router::{Audience, ChannelRouter};

/// Handle route handlers use to push events after a committed mutation.
///
/// Cheap to clone; store in `AppState`. A publisher without a registry (no
/// server running) accepts every call and delivers nothing.
#[derive(Clone, Default)]
pub struct EventPublisher {
    registry: Option<Arc<ConnectionRegistry>>,
}

impl EventPublisher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    /// Publisher over the process-wide registry, if one has been initialized.
    pub fn global() -> Self {
        Self {
            registry: ConnectionRegistry::global(),
        }
    }

    pub fn registry(&self) -> Option<&Arc<ConnectionRegistry>> {
        self.registry.as_ref()
    }

    /// Broadcast an event to every open connection.
    ///
    /// Fire-and-forget: frames are queued without waiting on any socket, and
    /// per-connection failures never surface here.
    pub fn publish(&self, topic: &str, kind: &str, payload: Value) -> DeliveryReport {
        let event = Event::new(topic, kind, payload);
        let audience = ChannelRouter::audience(&event);
        self.deliver(&event, &audience)
    }

    /// Deliver an event only to the connections bound to `user_id`.
    pub fn publish_to_user(
        &self,
        user_id: &str,
        topic: &str,
        kind: &str,
        payload: Value,
    ) -> DeliveryReport {
        let event = Event::new(topic, kind, payload);
        self.deliver(&event, &ChannelRouter::audience_for_user(user_id))
    }

    /// `<sheetId>.fieldCreated` with `{field, sheetId}`.
    pub fn field_created<F: Serialize>(&self, sheet_id: &str, field: &F) -> DeliveryReport {
        let field = match serde_json::to_value(field) {
            Ok(v) => v,
            Err(err) => {
                tracing::error!(%err, sheet_id, "failed to serialize created field");
                return DeliveryReport::default();
            }
        };
        self.publish(
            &topic(sheet_id, EventKind::FIELD_CREATED),
            EventKind::FIELD_CREATED,
            serde_json::json!({ "field": field, "sheetId": sheet_id }),
        )
    }

    /// `<sheetId>.fieldDeleted` with `{fieldId, sheetId}`.
    pub fn field_deleted(&self, sheet_id: &str, field_id: &str) -> DeliveryReport {
        self.publish(
            &topic(sheet_id, EventKind::FIELD_DELETED),
            EventKind::FIELD_DELETED,
            serde_json::json!({ "fieldId": field_id, "sheetId": sheet_id }),
        )
    }

    fn deliver(&self, event: &Event, audience: &Audience) -> DeliveryReport {
        let Some(registry) = self.registry.as_ref() else {
            tracing::debug!(topic = %event.topic, "no connection registry; event dropped");
            return DeliveryReport::default();
        };

        if registry.is_empty() {
            return DeliveryReport::default();
        }

        let frame = match event.encode() {
            Ok(frame) => frame,
            Err(err) => {
                tracing::error!(topic = %event.topic, %err, "failed to encode event");
                return DeliveryReport::default();
            }
        };

        let report = registry.for_each(|c| audience.includes(c), |c| c.send(frame.clone()));

        tracing::debug!(
            topic = %event.topic,
            kind = %event.kind,
            resource_id = event.resource_id().unwrap_or("-"),
            attempted = report.attempted,
            failed = report.failed,
            "event published"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::connection::{Connection, ConnectionStatus};

    fn publisher() -> (EventPublisher, Arc<ConnectionRegistry>) {
        let registry = Arc::new(ConnectionRegistry::new());
        (EventPublisher::new(registry.clone()), registry)
    }

    #[test]
    fn every_open_connection_gets_identical_bytes() {
        let (publisher, registry) = publisher();
        let mut receivers = Vec::new();
        for _ in 0..5 {
            let (conn, rx) = Connection::new(4);
            registry.attach(conn);
            receivers.push(rx);
        }

        let report = publisher.publish(
            "s1.fieldCreated",
            EventKind::FIELD_CREATED,
            serde_json::json!({ "field": { "id": "f1" }, "sheetId": "s1" }),
        );
        assert_eq!(report.attempted, 5);
        assert_eq!(report.delivered, 5);

        let frames: Vec<String> = receivers
            .iter_mut()
            .map(|rx| rx.try_recv().unwrap().as_str().to_string())
            .collect();
        assert!(frames.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(
            frames[0],
            r#"{"messageType":"s1.fieldCreated","data":{"field":{"id":"f1"},"sheetId":"s1"}}"#
        );
    }

    #[test]
    fn one_failed_write_does_not_stop_the_rest() {
        let (publisher, registry) = publisher();
        let (ok_a, mut rx_a) = Connection::new(4);
        let (broken, rx_broken) = Connection::new(4);
        let (ok_b, mut rx_b) = Connection::new(4);
        drop(rx_broken);
        registry.attach(ok_a);
        registry.attach(broken.clone());
        registry.attach(ok_b);

        let report = publisher.field_deleted("s1", "f1");
        assert_eq!(report.attempted, 3);
        assert_eq!(report.failed, 1);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
        assert_eq!(broken.status(), ConnectionStatus::Closing);

        // The broken connection is skipped from now on.
        let report = publisher.field_deleted("s1", "f2");
        assert_eq!(report.attempted, 2);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn full_buffer_closes_only_the_slow_connection() {
        let (publisher, registry) = publisher();
        let (slow, _slow_rx) = Connection::new(1);
        let (fast, mut fast_rx) = Connection::new(8);
        registry.attach(slow.clone());
        registry.attach(fast);

        publisher.field_deleted("s1", "f1");
        let report = publisher.field_deleted("s1", "f2");
        assert_eq!(report.failed, 1);
        assert!(!slow.is_open());
        assert!(fast_rx.try_recv().unwrap().as_str().contains("f1"));
        assert!(fast_rx.try_recv().unwrap().as_str().contains("f2"));
    }

    #[test]
    fn publish_without_connections_is_a_no_op() {
        let (publisher, _registry) = publisher();
        let report = publisher.field_deleted("s1", "f1");
        assert_eq!(report, DeliveryReport::default());
    }

    #[test]
    fn publish_without_registry_is_silent() {
        let publisher = EventPublisher::default();
        let report = publisher.publish("s1.fieldCreated", EventKind::FIELD_CREATED, Value::Null);
        assert_eq!(report, DeliveryReport::default());
    }

    #[test]
    fn targeted_publish_reaches_only_that_users_connections() {
        let (publisher, registry) = publisher();
        let (mine_a, mut rx_a) = Connection::new(4);
        mine_a.bind_user("usr_1").unwrap();
        let (mine_b, mut rx_b) = Connection::new(4);
        mine_b.bind_user("usr_1").unwrap();
        let (anonymous, mut rx_anon) = Connection::new(4);
        registry.attach(mine_a);
        registry.attach(mine_b);
        registry.attach(anonymous);

        let report = publisher.publish_to_user("usr_1", "s1.notice", "notice", Value::Null);
        assert_eq!(report.attempted, 2);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_anon.try_recv().is_err());
    }

    #[test]
    fn events_keep_publish_order_per_connection() {
        let (publisher, registry) = publisher();
        let (conn, mut rx) = Connection::new(16);
        registry.attach(conn);

        for i in 0..10 {
            publisher.field_deleted("s1", &format!("f{i}"));
        }
        for i in 0..10 {
            let frame = rx.try_recv().unwrap();
            let msg: Value = serde_json::from_str(frame.as_str()).unwrap();
            assert_eq!(msg["data"]["fieldId"], format!("f{i}"));
        }
    }

    #[test]
    fn global_publisher_shares_the_process_registry() {
        let registry = ConnectionRegistry::initialize();
        let publisher = EventPublisher::global();
        assert!(Arc::ptr_eq(publisher.registry().unwrap(), &registry));
    }
}
