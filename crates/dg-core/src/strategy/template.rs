//! Spine-first growth
//!
//! Lays a linear spine from Start to Boss, hangs side rooms off it, then adds
//! one key loop per configured key. Produces longer critical paths than the
//! grammar engine for the same room budget.

use dg_rng::DungeonRng;
use tracing::{debug, trace};

use super::{
    AttemptFailure, Synthesizer, attach_candidates, attach_secret, insert_key_loop,
    pick_weighted, random_archetype, random_connector, random_size,
};
use crate::cancel::CancelSignal;
use crate::config::GeneratorConfig;
use crate::error::{GraphError, Phase, Violation};
use crate::graph::{Archetype, DungeonGraph, RoomId, SizeClass};
use crate::registry::StrategyKind;

/// Share of the target placed on the spine, Start and Boss included
const SPINE_SHARE: f64 = 0.4;
const MIN_SPINE: usize = 3;

const SPINE_WEIGHTS: &[(Archetype, u32)] = &[
    (Archetype::Corridor, 40),
    (Archetype::Hub, 35),
    (Archetype::Checkpoint, 25),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateEngine;

impl TemplateEngine {
    pub fn new() -> Self {
        Self
    }

    fn spine_length(target: usize, keys: usize) -> usize {
        let wanted = (target as f64 * SPINE_SHARE).round() as usize;
        let ceiling = target.saturating_sub(2 * keys).max(MIN_SPINE);
        wanted.clamp(MIN_SPINE, ceiling)
    }

    fn lay_spine(
        graph: &mut DungeonGraph,
        rng: &mut DungeonRng,
        length: usize,
    ) -> Result<Vec<RoomId>, GraphError> {
        let mut spine = Vec::with_capacity(length);
        spine.push(graph.create_room(Archetype::Start, SizeClass::Small)?);
        for _ in 0..length.saturating_sub(2) {
            let arch = pick_weighted(rng, SPINE_WEIGHTS, Archetype::Corridor);
            spine.push(graph.create_room(arch, random_size(rng))?);
        }
        spine.push(graph.create_room(Archetype::Boss, SizeClass::ExtraLarge)?);
        for pair in spine.windows(2) {
            let kind = random_connector(rng);
            graph.connect(pair[0], pair[1], kind)?;
        }
        Ok(spine)
    }
}

impl Synthesizer for TemplateEngine {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Template
    }

    fn grow(
        &self,
        config: &GeneratorConfig,
        rng: &mut DungeonRng,
        cancel: &CancelSignal,
    ) -> Result<DungeonGraph, AttemptFailure> {
        if cancel.is_cancelled() {
            return Err(AttemptFailure::Cancelled(Phase::Trio));
        }
        let max = config.branching.max;
        let keys = config.key_names();
        let target = rng.range_inclusive(config.rooms.min, config.rooms.max) as usize;
        let side_target = target.saturating_sub(2 * keys.len());

        let mut graph = DungeonGraph::new(rng.seed());
        let spine = Self::lay_spine(&mut graph, rng, Self::spine_length(target, keys.len()))?;
        debug!(target, spine = spine.len(), keys = keys.len(), "template growth started");

        let mut failures = 0u32;
        while graph.room_count() < side_target {
            if cancel.is_cancelled() {
                return Err(AttemptFailure::Cancelled(Phase::Growth));
            }
            let candidates = attach_candidates(&graph, max);
            let Some(&attach) = rng.choose(&candidates) else {
                failures += 1;
                trace!(failures, "no room left to attach side rooms to");
                if failures >= config.max_consecutive_rule_failures {
                    return Err(Violation::GrowthStalled(failures).into());
                }
                continue;
            };
            failures = 0;

            let room = graph.create_room(random_archetype(rng), random_size(rng))?;
            let kind = random_connector(rng);
            graph.connect(attach, room, kind)?;

            let budget = side_target - graph.room_count().min(side_target);
            if budget >= 1 && rng.chance(config.secret_density) {
                attach_secret(&mut graph, rng, room)?;
            }
        }

        for name in &keys {
            if cancel.is_cancelled() {
                return Err(AttemptFailure::Cancelled(Phase::Growth));
            }
            // Prefer spine rooms so the loop sits on the way to the boss
            let on_spine: Vec<RoomId> = attach_candidates(&graph, max)
                .into_iter()
                .filter(|id| spine.contains(id))
                .collect();
            let pool = if on_spine.is_empty() {
                attach_candidates(&graph, max)
            } else {
                on_spine
            };
            let Some(&attach) = rng.choose(&pool) else {
                return Err(Violation::MissingKeyLoop(name.clone()).into());
            };
            insert_key_loop(&mut graph, rng, attach, name)?;
        }

        debug!(
            rooms = graph.room_count(),
            connectors = graph.connector_count(),
            "template growth finished"
        );
        Ok(graph)
    }
}
