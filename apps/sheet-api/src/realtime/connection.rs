//! A live duplex connection as the registry sees it.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use axum::extract::ws::Utf8Bytes;
use sheet_common::id::prefix;
use sheet_common::PrefixedId;
use tokio::sync::{mpsc, Notify};

/// An encoded wire message. Cloning shares the underlying buffer.
pub type Frame = Utf8Bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Open,
    /// Close requested; the connection task has not exited yet.
    Closing,
    Closed,
}

impl ConnectionStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ConnectionStatus::Open,
            1 => ConnectionStatus::Closing,
            _ => ConnectionStatus::Closed,
        }
    }
}

/// Why a frame could not be handed to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("outbound buffer is full")]
    QueueFull,
    #[error("connection is closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("connection already bound to user {0}")]
pub struct AlreadyBound(pub String);

/// Registry-side handle for one socket.
///
/// The socket itself stays with the connection task; everyone else talks to it
/// through the bounded outbound queue, which the task drains in order.
pub struct Connection {
    id: String,
    user_id: OnceLock<String>,
    status: AtomicU8,
    outbound: mpsc::Sender<Frame>,
    close: Notify,
}

impl PrefixedId for Connection {
    const PREFIX: &'static str = prefix::CONNECTION;
}

impl Connection {
    /// Create an open, unbound connection with room for `buffer` queued frames.
    ///
    /// The receiver belongs to the task that owns the socket.
    pub fn new(buffer: usize) -> (Arc<Self>, mpsc::Receiver<Frame>) {
        let (outbound, rx) = mpsc::channel(buffer.max(1));
        let connection = Self {
            id: Self::generate(),
            user_id: OnceLock::new(),
            status: AtomicU8::new(0),
            outbound,
            close: Notify::new(),
        };
        (Arc::new(connection), rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The durable user this connection was bound to, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.get().map(String::as_str)
    }

    /// Tag the connection with a user. Only the first call takes effect.
    pub fn bind_user(&self, user_id: &str) -> Result<(), AlreadyBound> {
        self.user_id
            .set(user_id.to_string())
            .map_err(|_| AlreadyBound(self.user_id().unwrap_or_default().to_string()))
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.status() == ConnectionStatus::Open
    }

    /// Queue a frame without waiting. A full queue or a gone task is an error.
    pub fn send(&self, frame: Frame) -> Result<(), DeliveryError> {
        if !self.is_open() {
            return Err(DeliveryError::Closed);
        }
        self.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Ask the connection task to close the socket. Returns false if a close
    /// was already under way.
    pub fn schedule_close(&self) -> bool {
        let scheduled = self
            .status
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if scheduled {
            self.close.notify_one();
        }
        scheduled
    }

    /// Resolves once a close has been scheduled.
    pub async fn closing(&self) {
        if self.is_open() {
            self.close.notified().await;
        }
    }

    pub fn mark_closed(&self) {
        self.status.store(2, Ordering::Release);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user_id())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_connection_is_open_and_unbound() {
        let (conn, _rx) = Connection::new(4);
        assert!(conn.id().starts_with("conn_"));
        assert!(conn.is_open());
        assert!(conn.user_id().is_none());
    }

    #[test]
    fn binding_is_one_shot() {
        let (conn, _rx) = Connection::new(4);
        conn.bind_user("usr_a").unwrap();
        let err = conn.bind_user("usr_b").unwrap_err();
        assert_eq!(err, AlreadyBound("usr_a".to_string()));
        assert_eq!(conn.user_id(), Some("usr_a"));
    }

    #[tokio::test]
    async fn frames_arrive_in_send_order() {
        let (conn, mut rx) = Connection::new(8);
        for i in 0..3 {
            conn.send(Frame::from(format!("m{i}"))).unwrap();
        }
        for i in 0..3 {
            assert_eq!(rx.recv().await.unwrap().as_str(), format!("m{i}"));
        }
    }

    #[test]
    fn full_queue_reports_queue_full() {
        let (conn, _rx) = Connection::new(1);
        conn.send(Frame::from_static("a")).unwrap();
        assert_eq!(conn.send(Frame::from_static("b")), Err(DeliveryError::QueueFull));
    }

    #[test]
    fn dropped_receiver_reports_closed() {
        let (conn, rx) = Connection::new(1);
        drop(rx);
        assert_eq!(conn.send(Frame::from_static("a")), Err(DeliveryError::Closed));
    }

    #[tokio::test]
    async fn schedule_close_wakes_closing_once() {
        let (conn, _rx) = Connection::new(1);
        assert!(conn.schedule_close());
        assert!(!conn.schedule_close());
        assert_eq!(conn.status(), ConnectionStatus::Closing);
        // Returns immediately: the connection is no longer open.
        conn.closing().await;
        assert_eq!(conn.send(Frame::from_static("late")), Err(DeliveryError::Closed));
        conn.mark_closed();
        assert_eq!(conn.status(), ConnectionStatus::Closed);
    }
}
