//! Connectors: the edges between rooms

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::room::{Capability, KEY_KIND, RoomId};

/// Unique connector identifier within one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorId(pub u32);

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

/// How a connector is traversed
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
pub enum ConnectorType {
    Door,
    Corridor,
    Ladder,
    Teleporter,
    /// Concealed passage; paired with `Visibility::Secret`
    Hidden,
    OneWay,
}

impl ConnectorType {
    /// Base traversal cost
    pub const fn base_cost(self) -> f64 {
        match self {
            ConnectorType::Door => 1.0,
            ConnectorType::Corridor => 2.0,
            ConnectorType::Ladder => 2.5,
            ConnectorType::Teleporter => 0.5,
            ConnectorType::Hidden => 3.0,
            ConnectorType::OneWay => 1.0,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
pub enum Visibility {
    #[default]
    Normal,
    Secret,
}

/// A lock on a connector; passing requires a matching capability
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gate {
    pub kind: String,
    pub value: String,
}

impl Gate {
    pub fn key(name: &str) -> Self {
        Self {
            kind: KEY_KIND.to_string(),
            value: name.to_string(),
        }
    }

    /// The capability that opens this gate
    pub fn required_capability(&self) -> Capability {
        Capability {
            kind: self.kind.clone(),
            value: self.value.clone(),
        }
    }

    pub fn is_opened_by(&self, capability: &Capability) -> bool {
        capability.kind == self.kind && capability.value == self.value
    }
}

/// An edge of the dungeon graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub id: ConnectorId,
    pub from: RoomId,
    pub to: RoomId,
    pub kind: ConnectorType,
    pub cost: f64,
    pub bidirectional: bool,
    pub visibility: Visibility,
    pub gate: Option<Gate>,
}

impl Connector {
    /// A plain two-way connector with the type's base cost
    pub fn new(id: ConnectorId, from: RoomId, to: RoomId, kind: ConnectorType) -> Self {
        Self {
            id,
            from,
            to,
            kind,
            cost: kind.base_cost(),
            bidirectional: true,
            visibility: Visibility::Normal,
            gate: None,
        }
    }

    /// A hidden two-way passage to a secret room
    pub fn hidden(id: ConnectorId, from: RoomId, to: RoomId) -> Self {
        Self {
            visibility: Visibility::Secret,
            ..Self::new(id, from, to, ConnectorType::Hidden)
        }
    }

    /// A one-way locked door from `from` to `to`
    pub fn locked(id: ConnectorId, from: RoomId, to: RoomId, gate: Gate) -> Self {
        Self {
            bidirectional: false,
            gate: Some(gate),
            ..Self::new(id, from, to, ConnectorType::Door)
        }
    }

    pub fn touches(&self, room: RoomId) -> bool {
        self.from == room || self.to == room
    }

    /// The endpoint opposite `room`, if `room` is an endpoint
    pub fn other(&self, room: RoomId) -> Option<RoomId> {
        if self.from == room {
            Some(self.to)
        } else if self.to == room {
            Some(self.from)
        } else {
            None
        }
    }

    /// The room reached by traversing from `room`, honouring direction
    pub fn traverse_from(&self, room: RoomId) -> Option<RoomId> {
        if self.from == room {
            Some(self.to)
        } else if self.to == room && self.bidirectional {
            Some(self.from)
        } else {
            None
        }
    }
}
