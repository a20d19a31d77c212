//! Connection/session state (spec §4.4).

pub mod manager;

pub use manager::{Session, SessionManager, OUTBOUND_QUEUE_CAPACITY};

/// Session id used for REST requests with no `X-Session-ID` header (spec §6.1).
pub const DEFAULT_REST_SESSION: &str = "rest-session";
