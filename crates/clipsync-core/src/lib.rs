// Library root: configuration, wire types, the session/cookie model, the
// SQLite cookie jar and the WebSocket session channel.

pub mod config;
pub mod db;
pub mod protocol;
pub mod session;
pub mod ws_client;
