//! dg-core: Topological dungeon graph synthesis
//!
//! Builds an abstract graph of rooms and connectors: no geometry, only
//! topology plus per-room metadata (difficulty, reward, biome tag, key
//! requirements and grants). Every returned graph satisfies the playability
//! invariants in [`validate`]; attempts that don't are retried on the same
//! seeded RNG stream, so a seed always reproduces the same graph.

pub mod biome;
pub mod cancel;
pub mod config;
pub mod error;
pub mod graph;
pub mod pacing;
pub mod registry;
pub mod strategy;
pub mod validate;

pub use cancel::{CancelSignal, CancelTrigger};
pub use config::GeneratorConfig;
pub use error::{ConfigError, GenerationError, GraphError, Phase, Violation};
pub use graph::{DungeonGraph, RoomId};
pub use registry::{StrategyKind, StrategyRegistry, generate};
pub use strategy::Synthesizer;
