//! Process-wide registry of open realtime connections.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use super::connection::{Connection, DeliveryError};

/// Well-known slot holding the process's registry once initialized.
static GLOBAL: Mutex<Option<Arc<ConnectionRegistry>>> = parking_lot::const_mutex(None);

/// Outcome of one pass over the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Open connections the action ran against.
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// All currently open connections, keyed by connection id.
///
/// `DashMap` gives shard-level locking, so upgrades attaching, tasks
/// detaching and publishers iterating can interleave freely.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, Arc<Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the process-wide registry, creating it on the first call.
    ///
    /// Later calls hand back the same instance untouched, so connections
    /// attached before a repeated initialization stay reachable.
    pub fn initialize() -> Arc<Self> {
        let mut slot = GLOBAL.lock();
        if let Some(existing) = slot.as_ref() {
            tracing::debug!(connections = existing.len(), "reusing connection registry");
            return existing.clone();
        }
        let registry = Arc::new(Self::new());
        *slot = Some(registry.clone());
        tracing::info!("connection registry initialized");
        registry
    }

    /// The process-wide registry, or `None` when nothing is serving
    /// (tooling, one-off binaries).
    pub fn global() -> Option<Arc<Self>> {
        GLOBAL.lock().clone()
    }

    pub fn attach(&self, connection: Arc<Connection>) {
        tracing::debug!(
            connection_id = %connection.id(),
            user_id = connection.user_id().unwrap_or("-"),
            "connection attached"
        );
        self.connections.insert(connection.id().to_string(), connection);
    }

    /// Remove a connection. Returns false if it was already gone.
    pub fn detach(&self, connection_id: &str) -> bool {
        let removed = self.connections.remove(connection_id).is_some();
        if removed {
            tracing::debug!(connection_id = %connection_id, "connection detached");
        }
        removed
    }

    pub fn get(&self, connection_id: &str) -> Option<Arc<Connection>> {
        self.connections
            .get(connection_id)
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Run `action` on every open connection accepted by `predicate`.
    ///
    /// Works on a snapshot so no shard lock is held while actions run. A failed
    /// action schedules that connection for close and the pass continues.
    pub fn for_each<P, A>(&self, predicate: P, mut action: A) -> DeliveryReport
    where
        P: Fn(&Connection) -> bool,
        A: FnMut(&Connection) -> Result<(), DeliveryError>,
    {
        let snapshot: Vec<Arc<Connection>> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut report = DeliveryReport::default();
        for connection in snapshot {
            // May have started closing since the snapshot was taken.
            if !connection.is_open() || !predicate(&connection) {
                continue;
            }
            report.attempted += 1;
            match action(&connection) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        connection_id = %connection.id(),
                        user_id = connection.user_id().unwrap_or("-"),
                        %err,
                        "delivery failed, closing connection"
                    );
                    connection.schedule_close();
                }
            }
        }
        report
    }

    /// Ask every connection to close. Each connection task detaches itself
    /// as it exits. Returns how many closes were scheduled.
    pub fn shutdown(&self) -> usize {
        let scheduled = self
            .connections
            .iter()
            .filter(|entry| entry.value().schedule_close())
            .count();
        tracing::info!(scheduled, "connection registry shutting down");
        scheduled
    }
}
