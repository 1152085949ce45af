// Session identifier and the cookie that mirrors it.
//
// The server hands out an opaque session id over the WebSocket channel as a
// `session_id:<value>` text frame. The client stores it as a cookie and
// attaches it to every credentialed HTTP request.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::SessionConfig;

/// Prefix of the only server frame the session channel understands.
pub const SESSION_MESSAGE_KEY: &str = "session_id";

/// Opaque, server-owned session token. Never validated or interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        SessionId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the session id from a `session_id:<value>` frame.
///
/// Everything after the first colon is the value, so values may themselves
/// contain colons. Frames with another key, without a colon, or with an empty
/// value yield `None`.
pub fn parse_session_message(text: &str) -> Option<SessionId> {
    let (key, value) = text.split_once(':')?;
    if key != SESSION_MESSAGE_KEY || value.is_empty() {
        return None;
    }
    Some(SessionId::new(value))
}

// ---------------------------------------------------------------------------
// Cookie
// ---------------------------------------------------------------------------

/// A client-side cookie with `max-age` expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age_secs: i64,
    pub created_at: DateTime<Utc>,
}

impl Cookie {
    /// Build the session cookie for `id` as configured in `[session]`.
    pub fn session(id: &SessionId, config: &SessionConfig, now: DateTime<Utc>) -> Self {
        Cookie {
            name: config.cookie_name.clone(),
            value: id.as_str().to_string(),
            path: config.cookie_path.clone(),
            max_age_secs: config.max_age_secs,
            created_at: now,
        }
    }

    /// `created_at + max_age`. An age that cannot be represented counts as
    /// already expired.
    pub fn expires_at(&self) -> DateTime<Utc> {
        TimeDelta::try_seconds(self.max_age_secs)
            .and_then(|age| self.created_at.checked_add_signed(age))
            .unwrap_or(self.created_at)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Whether this cookie is sent with a request for `request_path`.
    pub fn matches_path(&self, request_path: &str) -> bool {
        if self.path == "/" || request_path == self.path {
            return true;
        }
        request_path.starts_with(&self.path)
            && (self.path.ends_with('/')
                || request_path[self.path.len()..].starts_with('/'))
    }

    /// `name=value`, the form attached in a `Cookie` request header.
    pub fn header_pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}
