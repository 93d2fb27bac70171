//! # Interest Error Types
//!
//! Everything that can go wrong inside one viewer's interest manager. None
//! of these ever escape a public [`SceneViewer`](crate::SceneViewer)
//! operation: they are logged, counted and retried on the next tick.

use thiserror::Error;
use vista_core::EntityId;

/// Failure reported by the world collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// The scene could not be enumerated right now.
    #[error("world unavailable: {0}")]
    Unavailable(String),

    /// The region is not (or no longer) loaded.
    #[error("region not loaded")]
    RegionNotLoaded,
}

/// Failure reported by the transport collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The viewer's connection is gone.
    #[error("viewer disconnected")]
    Disconnected,

    /// The transport refused the batch.
    #[error("batch rejected: {0}")]
    Rejected(String),
}

/// Failure while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised inside the interest manager.
#[derive(Error, Debug)]
pub enum InterestError {
    /// World query failed.
    #[error(transparent)]
    World(#[from] WorldError),

    /// Transport delivery failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration problem.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The background pool queue is full.
    #[error("background pool saturated")]
    PoolSaturated,

    /// The background pool has been shut down.
    #[error("background pool shut down")]
    PoolShutdown,

    /// A background thread could not be started.
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The viewer has been closed.
    #[error("viewer closed")]
    ViewerClosed,

    /// The viewer's own presence is not in the scene.
    #[error("viewer presence {0} not found")]
    ViewerMissing(EntityId),

    /// A background scan panicked.
    #[error("scan panicked")]
    ScanPanicked,
}

/// Result alias for world queries.
pub type WorldResult<T> = Result<T, WorldError>;

/// Result alias for transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result alias for interest-manager internals.
pub type InterestResult<T> = Result<T, InterestError>;
