//! Production-rule growth
//!
//! Starts from the Start - Hub - Boss trio and applies one of three rules per
//! step until the room target is met and every configured key has its loop:
//!
//! - `ExpandHub` hangs 1..=3 new rooms off an under-capacity hub
//! - `InsertKeyLoop` adds a key room and a locked room behind a one-way gate
//! - `BranchOptional` adds an optional room, sometimes with a secret behind it
//!
//! Room slots for pending key loops are reserved up front. Once the rooms left
//! to place no longer exceed the reserve, key loops are forced.

use dg_rng::DungeonRng;
use tracing::{debug, trace};

use super::{
    AttemptFailure, Synthesizer, attach_candidates, attach_secret, insert_key_loop,
    random_archetype, random_connector, random_size, seed_trio, spare_capacity,
};
use crate::cancel::CancelSignal;
use crate::config::GeneratorConfig;
use crate::error::{GraphError, Phase, Violation};
use crate::graph::{Archetype, DungeonGraph, RoomId};
use crate::registry::StrategyKind;

const EXPAND_HUB_CHANCE: f64 = 0.5;
const KEY_LOOP_CHANCE: f64 = 0.3;
const MAX_HUB_EXPANSION: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    ExpandHub,
    InsertKeyLoop(String),
    BranchOptional,
}

/// Grammar-driven synthesizer
#[derive(Debug, Default, Clone, Copy)]
pub struct GrammarEngine;

impl GrammarEngine {
    pub fn new() -> Self {
        Self
    }

    fn sample_rule(rng: &mut DungeonRng, pending: &[String], remaining: usize) -> Rule {
        if let Some(key) = pending.first()
            && remaining <= 2 * pending.len()
        {
            return Rule::InsertKeyLoop(key.clone());
        }
        let r = rng.next_f64();
        if r < EXPAND_HUB_CHANCE {
            Rule::ExpandHub
        } else if r < EXPAND_HUB_CHANCE + KEY_LOOP_CHANCE
            && let Some(key) = pending.first()
        {
            Rule::InsertKeyLoop(key.clone())
        } else {
            Rule::BranchOptional
        }
    }

    /// Returns the number of rooms added; zero means no attach point was found.
    fn apply(
        rule: &Rule,
        graph: &mut DungeonGraph,
        rng: &mut DungeonRng,
        config: &GeneratorConfig,
        budget: usize,
    ) -> Result<usize, GraphError> {
        let max = config.branching.max;
        let candidates = attach_candidates(graph, max);
        match rule {
            Rule::ExpandHub => {
                let hubs: Vec<RoomId> = candidates
                    .iter()
                    .copied()
                    .filter(|id| {
                        graph
                            .room(*id)
                            .is_some_and(|r| r.archetype == Archetype::Hub)
                    })
                    .collect();
                // Random among open hubs, else the lowest-id open room
                let picked = if hubs.is_empty() {
                    candidates.first()
                } else {
                    rng.choose(&hubs)
                };
                let Some(&hub) = picked else {
                    return Ok(0);
                };
                let wanted = rng.range_inclusive(1, MAX_HUB_EXPANSION) as usize;
                let count = wanted
                    .min(spare_capacity(graph, hub, max))
                    .min(budget.max(1));
                for _ in 0..count {
                    let room = graph.create_room(random_archetype(rng), random_size(rng))?;
                    let kind = random_connector(rng);
                    graph.connect(hub, room, kind)?;
                }
                Ok(count)
            }
            Rule::InsertKeyLoop(name) => {
                let Some(&attach) = rng.choose(&candidates) else {
                    return Ok(0);
                };
                insert_key_loop(graph, rng, attach, name)?;
                Ok(2)
            }
            Rule::BranchOptional => {
                let Some(&attach) = rng.choose(&candidates) else {
                    return Ok(0);
                };
                let optional = graph.create_room(Archetype::Optional, random_size(rng))?;
                let kind = random_connector(rng);
                graph.connect(attach, optional, kind)?;
                if budget >= 2 && rng.chance(config.secret_density) {
                    attach_secret(graph, rng, optional)?;
                    return Ok(2);
                }
                Ok(1)
            }
        }
    }
}

impl Synthesizer for GrammarEngine {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Grammar
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
        let mut graph = DungeonGraph::new(rng.seed());
        seed_trio(&mut graph)?;

        let target = rng.range_inclusive(config.rooms.min, config.rooms.max) as usize;
        let max_rooms = config.rooms.max as usize;
        let mut pending = config.key_names();
        let mut failures = 0u32;
        debug!(target, keys = pending.len(), "grammar growth started");

        while graph.room_count() < target || !pending.is_empty() {
            if cancel.is_cancelled() {
                return Err(AttemptFailure::Cancelled(Phase::Growth));
            }
            let count = graph.room_count();
            if count > max_rooms {
                return Err(Violation::RoomCount {
                    count,
                    min: config.rooms.min,
                    max: config.rooms.max,
                }
                .into());
            }

            let remaining = target.saturating_sub(count);
            let budget = remaining.saturating_sub(2 * pending.len());
            let rule = Self::sample_rule(rng, &pending, remaining);
            let added = Self::apply(&rule, &mut graph, rng, config, budget)?;

            if added == 0 {
                failures += 1;
                trace!(?rule, failures, "rule found no attach point");
                if failures >= config.max_consecutive_rule_failures {
                    return Err(Violation::GrowthStalled(failures).into());
                }
                continue;
            }
            failures = 0;
            if let Rule::InsertKeyLoop(name) = &rule {
                pending.retain(|k| k != name);
            }
        }

        debug!(
            rooms = graph.room_count(),
            connectors = graph.connector_count(),
            "grammar growth finished"
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KeySpec, RoomBounds};
    use crate::graph::{Capability, ConnectorType, SizeClass};

    fn config(min: u32, max: u32) -> GeneratorConfig {
        GeneratorConfig {
            rooms: RoomBounds { min, max },
            ..Default::default()
        }
    }

    #[test]
    fn test_forced_key_loop_when_slots_run_out() {
        let mut rng = DungeonRng::new(1);
        let pending = vec!["gold".to_string()];
        for _ in 0..50 {
            assert_eq!(
                GrammarEngine::sample_rule(&mut rng, &pending, 2),
                Rule::InsertKeyLoop("gold".into())
            );
        }
    }

    #[test]
    fn test_no_key_rule_without_keys() {
        let mut rng = DungeonRng::new(1);
        for _ in 0..200 {
            let rule = GrammarEngine::sample_rule(&mut rng, &[], 20);
            assert!(!matches!(rule, Rule::InsertKeyLoop(_)));
        }
    }

    #[test]
    fn test_rule_mix_roughly_matches_weights() {
        let mut rng = DungeonRng::new(5);
        let pending = vec!["gold".to_string()];
        let mut hub = 0;
        let mut key = 0;
        for _ in 0..2000 {
            match GrammarEngine::sample_rule(&mut rng, &pending, 100) {
                Rule::ExpandHub => hub += 1,
                Rule::InsertKeyLoop(_) => key += 1,
                Rule::BranchOptional => {}
            }
        }
        assert!((850..1150).contains(&hub), "hub {hub}");
        assert!((450..750).contains(&key), "key {key}");
    }

    #[test]
    fn test_expand_without_open_hub_takes_lowest_id() {
        let cfg = GeneratorConfig {
            branching: crate::config::Branching {
                max: 3,
                ..Default::default()
            },
            ..config(10, 20)
        };
        for seed in 1..20 {
            let mut g = DungeonGraph::new(0);
            let start = g.create_room(Archetype::Start, SizeClass::Small).unwrap();
            let boss = g.create_room(Archetype::Boss, SizeClass::Large).unwrap();
            let a = g.create_room(Archetype::Treasure, SizeClass::Small).unwrap();
            let b = g.create_room(Archetype::Treasure, SizeClass::Small).unwrap();
            g.connect(start, a, ConnectorType::Door).unwrap();
            g.connect(a, boss, ConnectorType::Door).unwrap();
            g.connect(start, b, ConnectorType::Door).unwrap();

            let mut rng = DungeonRng::new(seed);
            let added =
                GrammarEngine::apply(&Rule::ExpandHub, &mut g, &mut rng, &cfg, 1).unwrap();
            assert_eq!(added, 1);
            let fresh = RoomId(4);
            assert_eq!(g.neighbors(fresh), vec![start], "seed {seed}");
            assert_eq!(g.degree(start), 3);
        }
    }

    #[test]
    fn test_grow_reaches_target_range() {
        let cfg = config(15, 25);
        for seed in 1..20 {
            let mut rng = DungeonRng::new(seed);
            let g = GrammarEngine
                .grow(&cfg, &mut rng, &CancelSignal::never())
                .unwrap();
            assert!((15..=25).contains(&g.room_count()), "seed {seed}");
            assert_eq!(g.count_archetype(Archetype::Start), 1);
            assert_eq!(g.count_archetype(Archetype::Boss), 1);
            assert!(g.is_connected());
        }
    }

    #[test]
    fn test_grow_inserts_every_key() {
        let mut cfg = config(12, 20);
        cfg.keys = vec![KeySpec::new("red"), KeySpec::new("blue")];
        for seed in 1..20 {
            let mut rng = DungeonRng::new(seed);
            let g = GrammarEngine
                .grow(&cfg, &mut rng, &CancelSignal::never())
                .unwrap();
            for name in ["red", "blue"] {
                let key = Capability::key(name);
                assert_eq!(g.rooms().filter(|r| r.grants(&key)).count(), 1);
            }
            assert_eq!(g.connectors().filter(|c| c.gate.is_some()).count(), 2);
        }
    }

    #[test]
    fn test_grow_respects_branching_max() {
        let mut cfg = config(30, 40);
        cfg.branching.max = 3;
        for seed in 1..20 {
            let mut rng = DungeonRng::new(seed);
            let Ok(g) = GrammarEngine.grow(&cfg, &mut rng, &CancelSignal::never()) else {
                continue;
            };
            for room in g.rooms() {
                assert!(g.degree(room.id) <= 3);
            }
        }
    }

    #[test]
    fn test_cancelled_before_trio() {
        let (signal, trigger) = CancelSignal::new();
        trigger.cancel();
        let mut rng = DungeonRng::new(1);
        assert_eq!(
            GrammarEngine.grow(&config(10, 20), &mut rng, &signal).unwrap_err(),
            AttemptFailure::Cancelled(Phase::Trio)
        );
        assert_eq!(rng.draw_count(), 0);
    }

    #[test]
    fn test_stall_with_no_attach_points() {
        // Start is the only attach point at max 2; an optional branch with a
        // secret behind it seals the graph.
        let mut cfg = config(10, 12);
        cfg.branching.max = 2;
        cfg.secret_density = 0.3;
        cfg.max_consecutive_rule_failures = 4;
        let mut stalled = false;
        for seed in 1..200 {
            let mut rng = DungeonRng::new(seed);
            if let Err(AttemptFailure::Violation(Violation::GrowthStalled(n))) =
                GrammarEngine.grow(&cfg, &mut rng, &CancelSignal::never())
            {
                assert_eq!(n, 4);
                stalled = true;
                break;
            }
        }
        assert!(stalled);
    }
}
