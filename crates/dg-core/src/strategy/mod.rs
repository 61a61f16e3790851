//! Synthesis strategies and the shared attempt loop
//!
//! A strategy only knows how to grow one candidate graph. Everything after
//! growth (pacing, biome tagging, validation) and the bounded retry around
//! it are shared, so every strategy gives the same guarantees.

mod grammar;
mod template;

use dg_rng::DungeonRng;
use tracing::{debug, info, warn};

use crate::biome::assign_biomes;
use crate::cancel::CancelSignal;
use crate::config::GeneratorConfig;
use crate::error::{GenerationError, GraphError, Phase, Violation};
use crate::graph::{
    Archetype, Capability, Connector, ConnectorType, DungeonGraph, Gate, Requirement, RoomId,
    SizeClass,
};
use crate::pacing::{PacingCurve, assign_difficulty};
use crate::registry::StrategyKind;
use crate::validate::validate;

pub use grammar::GrammarEngine;
pub use template::TemplateEngine;

/// Tag recording which key loop a room belongs to
pub const KEY_LOOP_TAG: &str = "key_loop";

/// Why a single attempt stopped
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptFailure {
    Violation(Violation),
    Cancelled(Phase),
}

impl From<Violation> for AttemptFailure {
    fn from(v: Violation) -> Self {
        AttemptFailure::Violation(v)
    }
}

impl From<GraphError> for AttemptFailure {
    fn from(e: GraphError) -> Self {
        AttemptFailure::Violation(e.into())
    }
}

/// Retry loop states
#[derive(Debug)]
enum AttemptState {
    Attempting { attempt: u32 },
    Validating { attempt: u32, graph: DungeonGraph },
    Succeeded(DungeonGraph),
    RetriesExhausted { attempts: u32, last: Violation },
}

/// A graph-growth strategy
pub trait Synthesizer {
    fn kind(&self) -> StrategyKind;

    /// Grow one candidate graph. Pacing, biomes and validation happen afterwards.
    fn grow(
        &self,
        config: &GeneratorConfig,
        rng: &mut DungeonRng,
        cancel: &CancelSignal,
    ) -> Result<DungeonGraph, AttemptFailure>;

    /// Produce a validated graph or an error; never a partial graph.
    ///
    /// Attempts run sequentially on the same RNG stream, so the draws consumed
    /// by failed attempts are part of the result's determinism.
    fn synthesize(
        &self,
        config: &GeneratorConfig,
        rng: &mut DungeonRng,
        cancel: &CancelSignal,
    ) -> Result<DungeonGraph, GenerationError> {
        config.validate()?;
        let curve = config.pacing.curve()?;
        info!(
            strategy = %self.kind(),
            seed = rng.seed(),
            min = config.rooms.min,
            max = config.rooms.max,
            "starting synthesis"
        );

        let mut state = AttemptState::Attempting { attempt: 1 };
        loop {
            state = match state {
                AttemptState::Attempting { attempt } => {
                    debug!(attempt, "growing candidate graph");
                    match self.grow(config, rng, cancel) {
                        Ok(graph) => AttemptState::Validating { attempt, graph },
                        Err(AttemptFailure::Cancelled(phase)) => {
                            info!(%phase, attempt, "synthesis cancelled");
                            return Err(GenerationError::Cancelled { phase });
                        }
                        Err(AttemptFailure::Violation(v)) => after_failure(config, attempt, v),
                    }
                }
                AttemptState::Validating { attempt, mut graph } => {
                    if cancel.is_cancelled() {
                        info!(attempt, "synthesis cancelled before validation");
                        return Err(GenerationError::Cancelled {
                            phase: Phase::Validation,
                        });
                    }
                    match finish(&mut graph, config, &curve, rng) {
                        Ok(()) => AttemptState::Succeeded(graph),
                        Err(v) => after_failure(config, attempt, v),
                    }
                }
                AttemptState::Succeeded(mut graph) => {
                    graph.set_strategy(self.kind());
                    info!(
                        rooms = graph.room_count(),
                        connectors = graph.connector_count(),
                        "synthesis succeeded"
                    );
                    return Ok(graph);
                }
                AttemptState::RetriesExhausted { attempts, last } => {
                    return Err(GenerationError::RetriesExhausted { attempts, last });
                }
            };
        }
    }
}

fn after_failure(config: &GeneratorConfig, attempt: u32, violation: Violation) -> AttemptState {
    warn!(attempt, %violation, "attempt rejected");
    if attempt >= config.max_attempts {
        AttemptState::RetriesExhausted {
            attempts: attempt,
            last: violation,
        }
    } else {
        AttemptState::Attempting {
            attempt: attempt + 1,
        }
    }
}

/// Pacing, biome tags, then the invariant check
fn finish(
    graph: &mut DungeonGraph,
    config: &GeneratorConfig,
    curve: &PacingCurve,
    rng: &mut DungeonRng,
) -> Result<(), Violation> {
    assign_difficulty(graph, curve, config.pacing.effective_variance(), rng)?;
    assign_biomes(graph, &config.themes, rng)?;
    validate(graph, config)
}

// Weighted tables shared by the strategies

const ARCHETYPE_WEIGHTS: &[(Archetype, u32)] = &[
    (Archetype::Hub, 15),
    (Archetype::Treasure, 12),
    (Archetype::Puzzle, 12),
    (Archetype::Corridor, 20),
    (Archetype::Optional, 8),
    (Archetype::Vendor, 6),
    (Archetype::Shrine, 6),
    (Archetype::Checkpoint, 6),
];

const SIZE_WEIGHTS: &[(SizeClass, u32)] = &[
    (SizeClass::ExtraSmall, 10),
    (SizeClass::Small, 25),
    (SizeClass::Medium, 35),
    (SizeClass::Large, 20),
    (SizeClass::ExtraLarge, 10),
];

const CONNECTOR_WEIGHTS: &[(ConnectorType, u32)] = &[
    (ConnectorType::Door, 45),
    (ConnectorType::Corridor, 35),
    (ConnectorType::Ladder, 10),
    (ConnectorType::Teleporter, 10),
];

const LOCKED_ROOM_WEIGHTS: &[(Archetype, u32)] = &[
    (Archetype::Treasure, 50),
    (Archetype::Shrine, 30),
    (Archetype::Vendor, 20),
];

fn pick_weighted<T: Copy>(rng: &mut DungeonRng, table: &[(T, u32)], fallback: T) -> T {
    let weights: Vec<u32> = table.iter().map(|(_, w)| *w).collect();
    rng.weighted_index(&weights)
        .map(|i| table[i].0)
        .unwrap_or(fallback)
}

pub(crate) fn random_archetype(rng: &mut DungeonRng) -> Archetype {
    pick_weighted(rng, ARCHETYPE_WEIGHTS, Archetype::Corridor)
}

pub(crate) fn random_size(rng: &mut DungeonRng) -> SizeClass {
    pick_weighted(rng, SIZE_WEIGHTS, SizeClass::Medium)
}

pub(crate) fn random_connector(rng: &mut DungeonRng) -> ConnectorType {
    pick_weighted(rng, CONNECTOR_WEIGHTS, ConnectorType::Door)
}

/// Rooms that may take one more connector, ascending by id
pub(crate) fn attach_candidates(graph: &DungeonGraph, max_branching: u8) -> Vec<RoomId> {
    graph
        .rooms()
        .filter(|r| r.archetype.accepts_attachments())
        .filter(|r| graph.degree(r.id) < max_branching as usize)
        .map(|r| r.id)
        .collect()
}

/// Connectors `room` can still take
pub(crate) fn spare_capacity(graph: &DungeonGraph, room: RoomId, max_branching: u8) -> usize {
    (max_branching as usize).saturating_sub(graph.degree(room))
}

/// Start (0.0) - Hub (0.5) - Boss (1.0)
pub(crate) fn seed_trio(graph: &mut DungeonGraph) -> Result<(RoomId, RoomId, RoomId), GraphError> {
    let start = graph.create_room(Archetype::Start, SizeClass::Small)?;
    let hub = graph.create_room(Archetype::Hub, SizeClass::Large)?;
    let boss = graph.create_room(Archetype::Boss, SizeClass::ExtraLarge)?;
    graph.room_mut(start)?.difficulty = 0.0;
    graph.room_mut(hub)?.difficulty = 0.5;
    graph.room_mut(boss)?.difficulty = 1.0;
    graph.connect(start, hub, ConnectorType::Corridor)?;
    graph.connect(hub, boss, ConnectorType::Door)?;
    Ok((start, hub, boss))
}

/// Attach a key room to `attach` and a locked room behind a one-way gate.
///
/// Returns the (key room, locked room) pair.
pub(crate) fn insert_key_loop(
    graph: &mut DungeonGraph,
    rng: &mut DungeonRng,
    attach: RoomId,
    name: &str,
) -> Result<(RoomId, RoomId), GraphError> {
    let key_room = graph.create_room(Archetype::Treasure, random_size(rng))?;
    {
        let room = graph.room_mut(key_room)?;
        room.capabilities.push(Capability::key(name));
        room.tags.insert(KEY_LOOP_TAG.to_string(), name.to_string());
    }
    let kind = random_connector(rng);
    graph.connect(attach, key_room, kind)?;

    let locked_arch = pick_weighted(rng, LOCKED_ROOM_WEIGHTS, Archetype::Treasure);
    let locked = graph.create_room(locked_arch, random_size(rng))?;
    {
        let room = graph.room_mut(locked)?;
        room.requirements.push(Requirement::key(name));
        room.tags.insert(KEY_LOOP_TAG.to_string(), name.to_string());
    }
    graph.connect_with(|id| Connector::locked(id, key_room, locked, Gate::key(name)))?;
    Ok((key_room, locked))
}

/// Attach a secret room behind `parent` through a hidden connector
pub(crate) fn attach_secret(
    graph: &mut DungeonGraph,
    rng: &mut DungeonRng,
    parent: RoomId,
) -> Result<RoomId, GraphError> {
    let secret = graph.create_room(Archetype::Secret, random_size(rng))?;
    graph.connect_with(|id| Connector::hidden(id, parent, secret))?;
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Visibility;

    #[test]
    fn test_seed_trio_shape() {
        let mut g = DungeonGraph::new(0);
        let (start, hub, boss) = seed_trio(&mut g).unwrap();
        assert_eq!(g.room_count(), 3);
        assert_eq!(g.connector_count(), 2);
        assert_eq!(g.critical_path(), Some(vec![start, hub, boss]));
        assert_eq!(g.room(boss).unwrap().difficulty, 1.0);
        assert_eq!(g.room(hub).unwrap().difficulty, 0.5);
    }

    #[test]
    fn test_attach_candidates_skip_boss_and_full_rooms() {
        let mut g = DungeonGraph::new(0);
        let (start, hub, boss) = seed_trio(&mut g).unwrap();
        assert_eq!(attach_candidates(&g, 2), vec![start]);
        assert_eq!(attach_candidates(&g, 3), vec![start, hub]);
        assert!(!attach_candidates(&g, 5).contains(&boss));
        assert_eq!(spare_capacity(&g, hub, 2), 0);
    }

    #[test]
    fn test_key_loop_shape() {
        let mut g = DungeonGraph::new(0);
        let (_, hub, _) = seed_trio(&mut g).unwrap();
        let mut rng = DungeonRng::new(4);
        let (key, locked) = insert_key_loop(&mut g, &mut rng, hub, "silver").unwrap();

        assert!(g.room(key).unwrap().grants(&Capability::key("silver")));
        assert_eq!(
            g.room(locked).unwrap().requirements,
            vec![Requirement::key("silver")]
        );
        let gated: Vec<&Connector> = g.connectors().filter(|c| c.gate.is_some()).collect();
        assert_eq!(gated.len(), 1);
        assert!(!gated[0].bidirectional);
        assert_eq!((gated[0].from, gated[0].to), (key, locked));
    }

    #[test]
    fn test_secret_room_is_hidden() {
        let mut g = DungeonGraph::new(0);
        let (start, _, _) = seed_trio(&mut g).unwrap();
        let mut rng = DungeonRng::new(4);
        let secret = attach_secret(&mut g, &mut rng, start).unwrap();
        let conn = g.connector(g.connectors_of(secret)[0]).unwrap();
        assert_eq!(conn.kind, ConnectorType::Hidden);
        assert_eq!(conn.visibility, Visibility::Secret);
        assert_eq!(g.room(secret).unwrap().archetype, Archetype::Secret);
    }

    #[test]
    fn test_random_tables_never_yield_reserved_archetypes() {
        let mut rng = DungeonRng::new(8);
        for _ in 0..500 {
            let a = random_archetype(&mut rng);
            assert!(!matches!(a, Archetype::Start | Archetype::Boss | Archetype::Secret));
            let c = random_connector(&mut rng);
            assert!(!matches!(c, ConnectorType::Hidden | ConnectorType::OneWay));
        }
    }
}
