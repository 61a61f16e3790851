//! Playability invariants
//!
//! Checked once per attempt after pacing and biome tagging. The first broken
//! invariant is reported; the engine discards the attempt and retries.

use crate::config::GeneratorConfig;
use crate::error::Violation;
use crate::graph::{Archetype, Capability, DungeonGraph};

/// Check every invariant a returned graph must satisfy.
pub fn validate(graph: &DungeonGraph, config: &GeneratorConfig) -> Result<(), Violation> {
    let starts = graph.rooms_of(Archetype::Start);
    if starts.len() != 1 {
        return Err(Violation::StartCount(starts.len()));
    }
    let bosses = graph.count_archetype(Archetype::Boss);
    if bosses != 1 {
        return Err(Violation::BossCount(bosses));
    }
    let start = starts[0];

    let count = graph.room_count();
    if !config.rooms.contains(count) {
        return Err(Violation::RoomCount {
            count,
            min: config.rooms.min,
            max: config.rooms.max,
        });
    }

    let max = config.branching.max;
    for room in graph.rooms() {
        let degree = graph.degree(room.id);
        if degree > max as usize {
            return Err(Violation::BranchingExceeded {
                room: room.id,
                degree,
                max,
            });
        }
    }

    let reachable = graph.reachable_from(start);
    if let Some(room) = graph.rooms().find(|r| !reachable.contains(&r.id)) {
        return Err(Violation::Unreachable(room.id));
    }

    for conn in graph.connectors() {
        let Some(gate) = &conn.gate else {
            continue;
        };
        let needed = gate.required_capability();
        let holders: Vec<_> = graph.rooms().filter(|r| r.grants(&needed)).collect();
        if holders.is_empty() {
            return Err(Violation::KeyMissing {
                connector: conn.id,
                value: gate.value.clone(),
            });
        }
        let before_lock = graph.reachable_avoiding(start, conn.id);
        if !holders.iter().any(|r| before_lock.contains(&r.id)) {
            return Err(Violation::KeyUnreachable {
                connector: conn.id,
                value: gate.value.clone(),
            });
        }
    }

    let progressive = graph.progressive_reachable(start);
    if let Some(room) = graph.rooms().find(|r| !progressive.contains(&r.id)) {
        return Err(Violation::LockedOut(room.id));
    }

    for name in config.key_names() {
        let key = Capability::key(&name);
        if !graph.rooms().any(|r| r.grants(&key)) {
            return Err(Violation::MissingKeyLoop(name));
        }
    }

    Ok(())
}
