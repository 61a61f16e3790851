//! Reachability and path queries
//!
//! Directed queries (`path`, `reachable_from`, ...) follow connectors the way
//! a player could walk them: one-way connectors only from `from` to `to`.
//! `is_connected` ignores direction.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::{Archetype, Capability, ConnectorId, DungeonGraph, RoomId};

/// Equivalence classes of rooms joined by connectors
struct Components {
    smeq: Vec<usize>,
}

impl Components {
    fn new(n: usize) -> Self {
        Self {
            smeq: (0..n).collect(),
        }
    }

    fn merge(&mut self, a: usize, b: usize) {
        let old_class = self.smeq[b];
        let new_class = self.smeq[a];
        if old_class == new_class {
            return;
        }
        for eq in &mut self.smeq {
            if *eq == old_class {
                *eq = new_class;
            }
        }
    }

    fn all_connected(&self) -> bool {
        self.smeq.windows(2).all(|w| w[0] == w[1])
    }
}

impl DungeonGraph {
    /// Any walkable path from `a` to `b` (BFS, so fewest connectors)
    pub fn path(&self, a: RoomId, b: RoomId) -> Option<Vec<RoomId>> {
        self.room(a)?;
        self.room(b)?;
        if a == b {
            return Some(vec![a]);
        }

        let mut parent: BTreeMap<RoomId, RoomId> = BTreeMap::new();
        let mut queue = VecDeque::from([a]);
        let mut seen = BTreeSet::from([a]);

        while let Some(cur) = queue.pop_front() {
            for (next, _) in self.successors(cur) {
                if !seen.insert(next) {
                    continue;
                }
                parent.insert(next, cur);
                if next == b {
                    let mut path = vec![b];
                    let mut at = b;
                    while let Some(&p) = parent.get(&at) {
                        path.push(p);
                        at = p;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// Every room walkable from `start`, including `start`
    pub fn reachable_from(&self, start: RoomId) -> BTreeSet<RoomId> {
        self.walk(start, |_| true)
    }

    /// Rooms walkable from `start` without ever using `blocked`
    pub fn reachable_avoiding(&self, start: RoomId, blocked: ConnectorId) -> BTreeSet<RoomId> {
        self.walk(start, |c| c != blocked)
    }

    /// Rooms walkable from `start` when a gate may only be crossed after a
    /// room granting its capability has been visited.
    pub fn progressive_reachable(&self, start: RoomId) -> BTreeSet<RoomId> {
        let mut held: BTreeSet<Capability> = BTreeSet::new();
        loop {
            let visited = self.walk(start, |c| {
                self.connector(c)
                    .and_then(|conn| conn.gate.as_ref())
                    .is_none_or(|gate| held.contains(&gate.required_capability()))
            });
            let before = held.len();
            for id in &visited {
                if let Some(room) = self.room(*id) {
                    held.extend(room.capabilities.iter().cloned());
                }
            }
            if held.len() == before {
                return visited;
            }
        }
    }

    /// True when every room is joined to every other, ignoring direction
    pub fn is_connected(&self) -> bool {
        let index: BTreeMap<RoomId, usize> = self
            .room_ids()
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();
        let mut components = Components::new(index.len());
        for c in self.connectors() {
            if let (Some(&a), Some(&b)) = (index.get(&c.from), index.get(&c.to)) {
                components.merge(a, b);
            }
        }
        components.all_connected()
    }

    /// The single Start room, if there is exactly one
    pub fn start(&self) -> Option<RoomId> {
        self.unique(Archetype::Start)
    }

    /// The single Boss room, if there is exactly one
    pub fn boss(&self) -> Option<RoomId> {
        self.unique(Archetype::Boss)
    }

    /// Shortest walkable Start→Boss path
    pub fn critical_path(&self) -> Option<Vec<RoomId>> {
        self.path(self.start()?, self.boss()?)
    }

    /// Nearest room (by connector hops, ignoring direction) satisfying `pred`,
    /// excluding `from` itself. Ties resolve to the lowest id.
    pub fn nearest<P>(&self, from: RoomId, pred: P) -> Option<RoomId>
    where
        P: Fn(RoomId) -> bool,
    {
        let mut queue = VecDeque::from([from]);
        let mut seen = BTreeSet::from([from]);
        while let Some(cur) = queue.pop_front() {
            for next in self.neighbors(cur) {
                if !seen.insert(next) {
                    continue;
                }
                if pred(next) {
                    return Some(next);
                }
                queue.push_back(next);
            }
        }
        None
    }

    fn unique(&self, archetype: Archetype) -> Option<RoomId> {
        match self.rooms_of(archetype).as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    fn walk<F>(&self, start: RoomId, allow: F) -> BTreeSet<RoomId>
    where
        F: Fn(ConnectorId) -> bool,
    {
        let mut seen = BTreeSet::new();
        if self.room(start).is_none() {
            return seen;
        }
        seen.insert(start);
        let mut queue = VecDeque::from([start]);
        while let Some(cur) = queue.pop_front() {
            for (next, conn) in self.successors(cur) {
                if allow(conn.id) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{Connector, ConnectorType, Gate, SizeClass};

    use super::*;

    /// Start - Hub - Boss, Hub - Key ->(locked) Vault
    fn keyed() -> (DungeonGraph, [RoomId; 5], ConnectorId) {
        let mut g = DungeonGraph::new(0);
        let start = g.create_room(Archetype::Start, SizeClass::Small).unwrap();
        let hub = g.create_room(Archetype::Hub, SizeClass::Medium).unwrap();
        let boss = g.create_room(Archetype::Boss, SizeClass::Large).unwrap();
        let key = g.create_room(Archetype::Treasure, SizeClass::Small).unwrap();
        let vault = g.create_room(Archetype::Puzzle, SizeClass::Small).unwrap();
        g.connect(start, hub, ConnectorType::Corridor).unwrap();
        g.connect(hub, boss, ConnectorType::Door).unwrap();
        g.connect(hub, key, ConnectorType::Door).unwrap();
        let gate = g
            .connect_with(|id| Connector::locked(id, key, vault, Gate::key("silver")))
            .unwrap();
        (g, [start, hub, boss, key, vault], gate)
    }

    #[test]
    fn test_critical_path() {
        let (g, [start, hub, boss, ..], _) = keyed();
        assert_eq!(g.critical_path(), Some(vec![start, hub, boss]));
    }

    #[test]
    fn test_path_respects_one_way() {
        let (g, [start, _, _, key, vault], _) = keyed();
        assert!(g.path(start, vault).is_some());
        assert!(g.path(vault, key).is_none());
        assert_eq!(g.path(key, key), Some(vec![key]));
        assert_eq!(g.path(start, RoomId(42)), None);
    }

    #[test]
    fn test_reachable_avoiding_gate() {
        let (g, [start, _, _, key, vault], gate) = keyed();
        let open = g.reachable_avoiding(start, gate);
        assert!(open.contains(&key));
        assert!(!open.contains(&vault));
        assert_eq!(g.reachable_from(start).len(), 5);
    }

    #[test]
    fn test_progressive_reachability_without_key() {
        let (g, [start, .., vault], _) = keyed();
        // No room grants silver yet: the vault stays locked
        assert!(!g.progressive_reachable(start).contains(&vault));
    }

    #[test]
    fn test_progressive_reachability_with_key() {
        let (mut g, [start, _, _, key, vault], _) = keyed();
        g.room_mut(key)
            .unwrap()
            .capabilities
            .push(Capability::key("silver"));
        let reached = g.progressive_reachable(start);
        assert!(reached.contains(&vault));
        assert_eq!(reached.len(), 5);
    }

    #[test]
    fn test_is_connected_ignores_direction() {
        let (mut g, ..) = keyed();
        assert!(g.is_connected());
        g.create_room(Archetype::Optional, SizeClass::Small).unwrap();
        assert!(!g.is_connected());
    }

    #[test]
    fn test_nearest_prefers_fewest_hops() {
        let (g, [start, hub, boss, _, vault], _) = keyed();
        assert_eq!(g.nearest(vault, |r| r == hub || r == start), Some(hub));
        assert_eq!(g.nearest(start, |r| r == boss), Some(boss));
        assert_eq!(g.nearest(start, |_| false), None);
    }

    #[test]
    fn test_empty_graph_queries() {
        let g = DungeonGraph::new(0);
        assert!(g.is_connected());
        assert_eq!(g.critical_path(), None);
        assert!(g.reachable_from(RoomId(0)).is_empty());
    }
}
