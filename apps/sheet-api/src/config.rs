use std::time::Duration;

use crate::auth::gate::GatePolicy;

/// Cookie names Auth.js uses for its database session token.
pub const DEFAULT_SESSION_COOKIES: [&str; 2] =
    ["authjs.session-token", "__Secure-authjs.session-token"];

/// Sheet API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Which paths require a signed-in user, and where to send everyone else.
    pub gate: GatePolicy,
    /// Cookie names checked (in order) for the session token.
    pub session_cookies: Vec<String>,
    /// Frames a realtime connection may have queued before it is dropped.
    pub ws_outbound_buffer: usize,
    /// Keepalive ping period for realtime connections.
    pub ws_ping_interval: Duration,
}

impl Config {
    /// Configuration with defaults for everything except the database.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            port: 4010,
            gate: GatePolicy::default(),
            session_cookies: DEFAULT_SESSION_COOKIES.iter().map(|s| s.to_string()).collect(),
            ws_outbound_buffer: 256,
            ws_ping_interval: Duration::from_secs(30),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        let mut config = Self::new(required_var("DATABASE_URL"));

        if let Some(port) = parsed_var("PORT") {
            config.port = port;
        }
        if let Some(path) = optional_var("SIGNIN_PATH") {
            config.gate.signin_path = path;
        }
        if let Some(prefixes) = optional_var("PROTECTED_PREFIXES") {
            config.gate.protected_prefixes = split_list(&prefixes);
        }
        if let Some(cookies) = optional_var("SESSION_COOKIE") {
            config.session_cookies = split_list(&cookies);
        }
        if let Some(buffer) = parsed_var::<usize>("WS_OUTBOUND_BUFFER").filter(|n| *n > 0) {
            config.ws_outbound_buffer = buffer;
        }
        if let Some(secs) = parsed_var::<u64>("WS_PING_INTERVAL_SECS").filter(|n| *n > 0) {
            config.ws_ping_interval = Duration::from_secs(secs);
        }

        config
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    optional_var(name).and_then(|v| v.trim().parse().ok())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
