//! Business-logic handlers behind the router and the REST routes (spec §4.5).
//! Each module owns one family of `type` values from the wire protocol.

pub mod context;
pub mod heartbeat;
pub mod order;
pub mod subscription;

pub use context::HandlerContext;
