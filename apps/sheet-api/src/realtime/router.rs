//! Audience selection for published events.

use super::connection::Connection;
use super::events::Event;

/// Who an event is delivered to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Every open connection, bound or not. Clients drop topics they do not
    /// care about.
    Everyone,
    /// Only connections bound to this user.
    User(String),
}

impl Audience {
    pub fn includes(&self, connection: &Connection) -> bool {
        match self {
            Audience::Everyone => true,
            Audience::User(user_id) => connection.user_id() == Some(user_id.as_str()),
        }
    }
}

/// Maps events to audiences.
///
/// Topic events are broadcast: the topic travels in the message body and
/// filtering happens on the client, so no subscription state is kept here.
pub struct ChannelRouter;

impl ChannelRouter {
    pub fn audience(_event: &Event) -> Audience {
        Audience::Everyone
    }

    pub fn audience_for_user(user_id: &str) -> Audience {
        Audience::User(user_id.to_string())
    }
}
