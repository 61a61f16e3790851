//! Abstract dungeon graph
//!
//! Rooms and connectors keyed by id in ordered maps, plus a derived
//! adjacency index. Mutation is insert-only: synthesis never removes rooms or
//! connectors, it only writes pacing values and tags onto existing rooms.
//!
//! All iteration is in id order so that anything feeding the RNG sees the
//! same sequence on every run.

mod connector;
mod query;
mod room;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::error::GraphError;
use crate::registry::StrategyKind;

pub use connector::{Connector, ConnectorId, ConnectorType, Gate, Visibility};
pub use room::{
    Archetype, BIOME_TAG, Capability, KEY_KIND, Requirement, Room, RoomId, SizeClass,
};

/// Counts used to compare graphs structurally
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub rooms: usize,
    pub connectors: usize,
    pub archetypes: BTreeMap<Archetype, usize>,
}

/// The topological dungeon graph
///
/// Deserializing rebuilds the adjacency index and moves the id allocators
/// past every stored id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawGraph")]
pub struct DungeonGraph {
    seed: u64,
    strategy: Option<StrategyKind>,
    rooms: BTreeMap<RoomId, Room>,
    connectors: BTreeMap<ConnectorId, Connector>,
    #[serde(skip)]
    adjacency: BTreeMap<RoomId, Vec<ConnectorId>>,
    /// `None` once every id has been handed out
    #[serde(skip)]
    next_room: Option<u32>,
    #[serde(skip)]
    next_connector: Option<u32>,
}

impl Default for DungeonGraph {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Serialized form of a graph, without the derived index
#[derive(Deserialize)]
struct RawGraph {
    seed: u64,
    #[serde(default)]
    strategy: Option<StrategyKind>,
    rooms: BTreeMap<RoomId, Room>,
    connectors: BTreeMap<ConnectorId, Connector>,
}

impl From<RawGraph> for DungeonGraph {
    fn from(raw: RawGraph) -> Self {
        let next_room = match raw.rooms.keys().next_back() {
            Some(last) => last.0.checked_add(1),
            None => Some(0),
        };
        let next_connector = match raw.connectors.keys().next_back() {
            Some(last) => last.0.checked_add(1),
            None => Some(0),
        };
        let mut graph = Self {
            seed: raw.seed,
            strategy: raw.strategy,
            rooms: raw.rooms,
            connectors: raw.connectors,
            adjacency: BTreeMap::new(),
            next_room,
            next_connector,
        };
        graph.reindex();
        graph
    }
}

impl DungeonGraph {
    /// Create an empty graph bound to a seed
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            strategy: None,
            rooms: BTreeMap::new(),
            connectors: BTreeMap::new(),
            adjacency: BTreeMap::new(),
            next_room: Some(0),
            next_connector: Some(0),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The strategy that produced this graph, once synthesis has succeeded
    pub fn strategy(&self) -> Option<StrategyKind> {
        self.strategy
    }

    pub(crate) fn set_strategy(&mut self, kind: StrategyKind) {
        self.strategy = Some(kind);
    }

    /// Insert a room. Rejects duplicate ids.
    ///
    /// Inserting `u32::MAX` is allowed but exhausts the allocator, so later
    /// `create_room` calls fail instead of reusing an id.
    pub fn add_room(&mut self, room: Room) -> Result<RoomId, GraphError> {
        let id = room.id;
        if self.rooms.contains_key(&id) {
            return Err(GraphError::DuplicateRoom(id));
        }
        self.next_room = advance(self.next_room, id.0);
        self.adjacency.entry(id).or_default();
        self.rooms.insert(id, room);
        Ok(id)
    }

    /// Allocate a fresh id and insert a new room with it
    pub fn create_room(
        &mut self,
        archetype: Archetype,
        size: SizeClass,
    ) -> Result<RoomId, GraphError> {
        let id = RoomId(self.next_room.ok_or(GraphError::IdSpaceExhausted("room"))?);
        self.add_room(Room::new(id, archetype, size))
    }

    /// Insert a connector. Rejects duplicate ids and unknown endpoints.
    pub fn add_connector(&mut self, connector: Connector) -> Result<ConnectorId, GraphError> {
        let id = connector.id;
        if self.connectors.contains_key(&id) {
            return Err(GraphError::DuplicateConnector(id));
        }
        for room in [connector.from, connector.to] {
            if !self.rooms.contains_key(&room) {
                return Err(GraphError::DanglingEndpoint {
                    connector: id,
                    room,
                });
            }
        }
        self.next_connector = advance(self.next_connector, id.0);
        self.adjacency.entry(connector.from).or_default().push(id);
        if connector.to != connector.from {
            self.adjacency.entry(connector.to).or_default().push(id);
        }
        self.connectors.insert(id, connector);
        Ok(id)
    }

    /// Allocate a fresh connector id and insert the connector built from it
    pub fn connect_with<F>(&mut self, build: F) -> Result<ConnectorId, GraphError>
    where
        F: FnOnce(ConnectorId) -> Connector,
    {
        let id = self
            .next_connector
            .ok_or(GraphError::IdSpaceExhausted("connector"))?;
        self.add_connector(build(ConnectorId(id)))
    }

    /// Insert a plain two-way connector between two existing rooms
    pub fn connect(
        &mut self,
        from: RoomId,
        to: RoomId,
        kind: ConnectorType,
    ) -> Result<ConnectorId, GraphError> {
        self.connect_with(|id| Connector::new(id, from, to, kind))
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub(crate) fn room_mut(&mut self, id: RoomId) -> Result<&mut Room, GraphError> {
        self.rooms.get_mut(&id).ok_or(GraphError::UnknownRoom(id))
    }

    pub fn connector(&self, id: ConnectorId) -> Option<&Connector> {
        self.connectors.get(&id)
    }

    /// Rooms in id order
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Room ids in ascending order
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().copied().collect()
    }

    /// Connectors in id order
    pub fn connectors(&self) -> impl Iterator<Item = &Connector> {
        self.connectors.values()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    /// Connector ids incident to a room, in insertion order
    pub fn connectors_of(&self, id: RoomId) -> &[ConnectorId] {
        self.adjacency.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of connectors touching a room
    pub fn degree(&self, id: RoomId) -> usize {
        self.connectors_of(id).len()
    }

    /// Rooms joined to `id` by any connector, ignoring direction (sorted, deduplicated)
    pub fn neighbors(&self, id: RoomId) -> Vec<RoomId> {
        let mut out: Vec<RoomId> = self
            .connectors_of(id)
            .iter()
            .filter_map(|c| self.connectors.get(c))
            .filter_map(|c| c.other(id))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Rooms enterable from `id` with the connector used, honouring direction
    pub fn successors(&self, id: RoomId) -> Vec<(RoomId, &Connector)> {
        let mut out: Vec<(RoomId, &Connector)> = self
            .connectors_of(id)
            .iter()
            .filter_map(|c| self.connectors.get(c))
            .filter_map(|c| c.traverse_from(id).map(|to| (to, c)))
            .collect();
        out.sort_by_key(|(to, c)| (*to, c.id));
        out
    }

    /// Ids of rooms with the given archetype, ascending
    pub fn rooms_of(&self, archetype: Archetype) -> Vec<RoomId> {
        self.rooms
            .values()
            .filter(|r| r.archetype == archetype)
            .map(|r| r.id)
            .collect()
    }

    pub fn count_archetype(&self, archetype: Archetype) -> usize {
        self.rooms.values().filter(|r| r.archetype == archetype).count()
    }

    /// Rebuild the adjacency index from the stored connectors
    pub fn reindex(&mut self) {
        self.adjacency = self.rooms.keys().map(|&id| (id, Vec::new())).collect();
        for c in self.connectors.values() {
            self.adjacency.entry(c.from).or_default().push(c.id);
            if c.to != c.from {
                self.adjacency.entry(c.to).or_default().push(c.id);
            }
        }
    }

    /// Room/connector counts and the archetype histogram
    pub fn summary(&self) -> GraphSummary {
        let archetypes = Archetype::iter()
            .map(|a| (a, self.count_archetype(a)))
            .filter(|(_, n)| *n > 0)
            .collect();
        GraphSummary {
            rooms: self.room_count(),
            connectors: self.connector_count(),
            archetypes,
        }
    }
}

/// Allocator position after `used` has been taken; `None` once `u32::MAX` is used
fn advance(next: Option<u32>, used: u32) -> Option<u32> {
    let after = used.checked_add(1);
    match (next, after) {
        (Some(next), Some(after)) => Some(next.max(after)),
        _ => None,
    }
}
