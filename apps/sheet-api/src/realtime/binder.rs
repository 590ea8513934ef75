//! Associates new connections with the user resolved for their upgrade request.

use std::sync::Arc;

use crate::models::user::UserRecord;

use super::connection::Connection;
use super::registry::ConnectionRegistry;

/// Tag `connection` with `user` (when there is one) and attach it.
///
/// The tag is set before the connection becomes visible in the registry, so
/// no delivery pass can observe it half-bound.
pub fn bind(registry: &ConnectionRegistry, connection: &Arc<Connection>, user: Option<&UserRecord>) {
    match user {
        Some(user) => {
            if let Err(err) = connection.bind_user(&user.id) {
                tracing::warn!(
                    connection_id = %connection.id(),
                    requested_user = %user.id,
                    %err,
                    "rebinding is not supported; keeping original identity"
                );
            }
        }
        None => {
            tracing::debug!(connection_id = %connection.id(), "connection left unbound");
        }
    }

    registry.attach(connection.clone());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            name: None,
            email: Some(format!("{id}@example.com")),
            email_verified: None,
            image: None,
        }
    }

    #[test]
    fn bound_connection_carries_user_id() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = Connection::new(1);
        bind(&registry, &conn, Some(&user("usr_1")));

        let attached = registry.get(conn.id()).unwrap();
        assert_eq!(attached.user_id(), Some("usr_1"));
    }

    #[test]
    fn anonymous_connection_is_attached_unbound() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = Connection::new(1);
        bind(&registry, &conn, None);

        let attached = registry.get(conn.id()).unwrap();
        assert!(attached.user_id().is_none());
    }

    #[test]
    fn second_bind_keeps_first_identity() {
        let registry = ConnectionRegistry::new();
        let (conn, _rx) = Connection::new(1);
        bind(&registry, &conn, Some(&user("usr_1")));
        bind(&registry, &conn, Some(&user("usr_2")));

        assert_eq!(conn.user_id(), Some("usr_1"));
        assert_eq!(registry.len(), 1);
    }
}
