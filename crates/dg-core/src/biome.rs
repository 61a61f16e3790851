//! Biome clustering
//!
//! Partitions rooms among theme names by region growing: one seed room per
//! theme, then each round every theme (in a freshly shuffled order) claims
//! one random room from its frontier. Same-themed rooms therefore form
//! connected clusters, and every theme is used when there are at least as
//! many rooms as themes.
//!
//! Frontiers and leftovers are walked in id order, so a given RNG state
//! always produces the same partition.

use std::collections::{BTreeMap, BTreeSet};

use dg_rng::DungeonRng;
use tracing::debug;

use crate::error::GraphError;
use crate::graph::{BIOME_TAG, DungeonGraph, RoomId};

/// Theme assignment for every room
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BiomeMap {
    assignments: BTreeMap<RoomId, String>,
}

impl BiomeMap {
    pub fn theme_of(&self, room: RoomId) -> Option<&str> {
        self.assignments.get(&room).map(String::as_str)
    }

    /// Rooms carrying `theme`, ascending
    pub fn rooms_in(&self, theme: &str) -> Vec<RoomId> {
        self.assignments
            .iter()
            .filter(|(_, t)| t.as_str() == theme)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn themes_used(&self) -> BTreeSet<&str> {
        self.assignments.values().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Whether the rooms of `theme` form one connected cluster (ignoring direction)
    pub fn is_contiguous(&self, graph: &DungeonGraph, theme: &str) -> bool {
        let members: BTreeSet<RoomId> = self.rooms_in(theme).into_iter().collect();
        let Some(&first) = members.iter().next() else {
            return true;
        };
        let mut seen = BTreeSet::from([first]);
        let mut stack = vec![first];
        while let Some(cur) = stack.pop() {
            for n in graph.neighbors(cur) {
                if members.contains(&n) && seen.insert(n) {
                    stack.push(n);
                }
            }
        }
        seen.len() == members.len()
    }
}

/// Compute a theme for every room. Does not modify the graph.
pub fn cluster_biomes(graph: &DungeonGraph, themes: &[String], rng: &mut DungeonRng) -> BiomeMap {
    let ids = graph.room_ids();
    if ids.is_empty() || themes.is_empty() {
        return BiomeMap::default();
    }
    if let [only] = themes {
        return BiomeMap {
            assignments: ids.into_iter().map(|id| (id, only.clone())).collect(),
        };
    }

    let mut assigned: BTreeMap<RoomId, usize> = BTreeMap::new();

    let mut seeds = ids.clone();
    rng.shuffle(&mut seeds);
    for (theme, room) in seeds.iter().take(themes.len()).enumerate() {
        assigned.insert(*room, theme);
    }

    let round_cap = 2 * ids.len();
    let mut rounds = 0;
    while assigned.len() < ids.len() && rounds < round_cap {
        rounds += 1;
        let mut order: Vec<usize> = (0..themes.len()).collect();
        rng.shuffle(&mut order);
        for theme in order {
            let frontier = frontier(graph, &assigned, theme);
            if let Some(&room) = rng.choose(&frontier) {
                assigned.insert(room, theme);
            }
        }
    }

    let mut leftovers = 0;
    for id in &ids {
        if assigned.contains_key(id) {
            continue;
        }
        leftovers += 1;
        let inherited = graph
            .neighbors(*id)
            .iter()
            .find_map(|n| assigned.get(n).copied());
        let theme = match inherited {
            Some(theme) => theme,
            None => rng.rn2(themes.len() as u32) as usize,
        };
        assigned.insert(*id, theme);
    }
    debug!(rounds, leftovers, themes = themes.len(), "biome clustering finished");

    BiomeMap {
        assignments: assigned
            .into_iter()
            .map(|(id, t)| (id, themes[t].clone()))
            .collect(),
    }
}

/// Write each room's theme into its `biome` tag
pub fn apply_biomes(graph: &mut DungeonGraph, biomes: &BiomeMap) -> Result<(), GraphError> {
    for (id, theme) in &biomes.assignments {
        graph
            .room_mut(*id)?
            .tags
            .insert(BIOME_TAG.to_string(), theme.clone());
    }
    Ok(())
}

/// Cluster and tag in one step
pub fn assign_biomes(
    graph: &mut DungeonGraph,
    themes: &[String],
    rng: &mut DungeonRng,
) -> Result<BiomeMap, GraphError> {
    let biomes = cluster_biomes(graph, themes, rng);
    apply_biomes(graph, &biomes)?;
    Ok(biomes)
}

/// Unassigned neighbours of the rooms already carrying `theme`, ascending
fn frontier(graph: &DungeonGraph, assigned: &BTreeMap<RoomId, usize>, theme: usize) -> Vec<RoomId> {
    let mut out = BTreeSet::new();
    for (&room, _) in assigned.iter().filter(|(_, t)| **t == theme) {
        for n in graph.neighbors(room) {
            if !assigned.contains_key(&n) {
                out.insert(n);
            }
        }
    }
    out.into_iter().collect()
}
