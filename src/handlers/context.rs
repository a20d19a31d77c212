//! Shared state every handler needs to reach the engine, the session table,
//! and the failure pipeline.

use std::sync::Arc;

use crate::engine::actor::EngineHandle;
use crate::failure::FailureChains;
use crate::session::SessionManager;

/// Cloneable bundle of the engine handle, session table, and failure
/// chains, threaded through both the WS router and the REST handlers so
/// both transports share exactly one code path per operation.
#[derive(Clone)]
pub struct HandlerContext {
    pub engine: EngineHandle,
    pub sessions: SessionManager,
    pub failures: Arc<FailureChains>,
}
