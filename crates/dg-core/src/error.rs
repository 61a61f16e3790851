//! Error taxonomy
//!
//! Configuration errors are fatal before generation starts. Violations are
//! per-attempt and recovered by retrying. Retry exhaustion and cancellation
//! are the terminal outcomes of a synthesis call.

use thiserror::Error;

use crate::graph::{ConnectorId, RoomId};

/// Graph insertion and lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate room id {0}")]
    DuplicateRoom(RoomId),

    #[error("duplicate connector id {0}")]
    DuplicateConnector(ConnectorId),

    #[error("connector {connector} references unknown room {room}")]
    DanglingEndpoint { connector: ConnectorId, room: RoomId },

    #[error("unknown room {0}")]
    UnknownRoom(RoomId),

    #[error("no {0} ids left to allocate")]
    IdSpaceExhausted(&'static str),
}

/// Out-of-range or malformed configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("room bounds {min}..={max} must lie within {lo}..={hi} with min <= max")]
    RoomBounds { min: u32, max: u32, lo: u32, hi: u32 },

    #[error("branching max {0} must be within 2..=5")]
    BranchingMax(u8),

    #[error("branching average {0} must be a positive finite number")]
    BranchingAverage(f64),

    #[error("secret density {0} must be within [0, 0.3]")]
    SecretDensity(f64),

    #[error("optional ratio {0} must be within [0.1, 0.4]")]
    OptionalRatio(f64),

    #[error("key name must not be empty")]
    EmptyKeyName,

    #[error("{keys} key loops need {needed} rooms but the maximum is {max}")]
    TooManyKeys { keys: usize, needed: u32, max: u32 },

    #[error("theme list must not be empty")]
    NoThemes,

    #[error("invalid theme name {0:?}")]
    InvalidTheme(String),

    #[error("S-curve steepness {0} must be positive")]
    Steepness(f64),

    #[error("exponent {0} must be positive")]
    Exponent(f64),

    #[error("custom curve needs at least 2 control points, got {0}")]
    TooFewControlPoints(usize),

    #[error("control point ({progress}, {value}) must lie within [0, 1] x [0, 1]")]
    ControlPoint { progress: f64, value: f64 },

    #[error("{0} must be at least 1")]
    ZeroLimit(&'static str),
}

/// An invariant broken by a single generation attempt
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("expected exactly one Start room, found {0}")]
    StartCount(usize),

    #[error("expected exactly one Boss room, found {0}")]
    BossCount(usize),

    #[error("room count {count} outside {min}..={max}")]
    RoomCount { count: usize, min: u32, max: u32 },

    #[error("room {0} is not reachable from Start")]
    Unreachable(RoomId),

    #[error("room {room} has {degree} connectors, above the maximum of {max}")]
    BranchingExceeded { room: RoomId, degree: usize, max: u8 },

    #[error("no room grants the capability for gate on {connector} ({value})")]
    KeyMissing { connector: ConnectorId, value: String },

    #[error("the key for gate on {connector} ({value}) cannot be reached before the lock")]
    KeyUnreachable { connector: ConnectorId, value: String },

    #[error("room {0} cannot be reached when gates require their keys first")]
    LockedOut(RoomId),

    #[error("key {0:?} was configured but has no key loop")]
    MissingKeyLoop(String),

    #[error("growth stalled after {0} consecutive rule failures")]
    GrowthStalled(u32),

    #[error("graph construction failed: {0}")]
    Graph(#[from] GraphError),
}

/// Pipeline phase, reported on cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Phase {
    #[strum(serialize = "core trio creation")]
    Trio,
    #[strum(serialize = "growth")]
    Growth,
    #[strum(serialize = "validation")]
    Validation,
}

/// Terminal outcome of a synthesis call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("all {attempts} attempts failed; last violation: {last}")]
    RetriesExhausted { attempts: u32, last: Violation },

    #[error("generation cancelled during {phase}")]
    Cancelled { phase: Phase },

    #[error("unknown strategy {0:?}")]
    UnknownStrategy(String),
}
