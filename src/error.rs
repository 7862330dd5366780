//! Domain error taxonomy (spec.md §7). Each boundary gets its own enum so
//! callers can match on `Kind`-shaped variants instead of string-sniffing;
//! `From` impls wire them together at each crossing.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate: {0}")]
    Duplicate(String),
    #[error("invalid ship state: {0}")]
    InvalidState(String),
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("transient upstream error ({status}): {message}")]
    Transient { status: u16, message: String },
    #[error("upstream error ({code}): {message}")]
    Api { code: i64, message: String },
    #[error("transport error: {0}")]
    Transport(String),
}

impl GameApiError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GameApiError::RateLimited { .. } | GameApiError::Transient { .. })
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unique constraint violated: {0}")]
    Duplicate(String),
    #[error("database connection is closed")]
    Closed,
    #[error("query failed: {0}")]
    Query(String),
}

impl PersistenceError {
    pub fn is_closed(&self) -> bool {
        matches!(self, PersistenceError::Closed)
    }
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => PersistenceError::NotFound("row not found".to_string()),
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => PersistenceError::Closed,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                PersistenceError::Duplicate(db_err.message().to_string())
            }
            other => PersistenceError::Query(other.to_string()),
        }
    }
}

/// Errors from planning or executing a route. Distinct from
/// `models::route::RouteError`, which only covers the Route aggregate's own
/// state-transition invariants.
#[derive(Debug, Error)]
pub enum RoutePlanError {
    #[error("no feasible route from {from} to {to}")]
    NoPath { from: String, to: String },
    #[error("insufficient fuel for segment: need {required}, have {available}")]
    InsufficientFuel { required: i64, available: i64 },
    #[error("waypoint not found in graph: {0}")]
    UnknownWaypoint(String),
    #[error(transparent)]
    Api(#[from] GameApiError),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error(transparent)]
    Route(#[from] crate::models::route::RouteError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Error)]
#[error("cancelled")]
pub struct Cancelled;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),
    #[error("container already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid container state for this operation: {0}")]
    InvalidState(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Route(#[from] RoutePlanError),
    #[error(transparent)]
    Api(#[from] GameApiError),
    #[error("cancelled")]
    Cancelled,
}

impl From<Cancelled> for ContainerError {
    fn from(_: Cancelled) -> Self {
        ContainerError::Cancelled
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("method not found: {0}")]
    MethodNotFound(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Container(#[from] ContainerError),
}

impl ProtocolError {
    /// JSON-RPC error code, spec.md §6.
    pub fn code(&self) -> i64 {
        match self {
            ProtocolError::Parse(_) => -32700,
            ProtocolError::InvalidRequest(_) => -32600,
            ProtocolError::MethodNotFound(_) => -32601,
            ProtocolError::InvalidParams(_) => -32602,
            ProtocolError::Container(ContainerError::NotFound(_)) => -31000,
            ProtocolError::Container(ContainerError::AlreadyExists(_)) => -31001,
            ProtocolError::Container(ContainerError::InvalidState(_)) => -31002,
            ProtocolError::Container(_) => -32603,
        }
    }

    /// Human-readable message. Never includes connection strings or tokens —
    /// the only fields allowed through are the enum's own display text.
    pub fn message(&self) -> String {
        self.to_string()
    }
}
