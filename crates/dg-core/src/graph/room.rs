//! Rooms: the vertices of the dungeon graph
//!
//! A room carries its gameplay role (archetype), a coarse size class for the
//! embedding stage, pacing values written after growth, free-form tags and
//! the requirement/capability records used for key and lock ordering.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Tag key under which the biome pass stores a room's theme
pub const BIOME_TAG: &str = "biome";

/// Requirement/capability type used by key loops
pub const KEY_KIND: &str = "key";

/// Unique room identifier within one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room_{}", self.0)
    }
}

/// Gameplay role of a room
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
pub enum Archetype {
    /// Dungeon entrance; exactly one per graph
    Start,
    /// Final encounter; exactly one per graph
    Boss,
    Hub,
    Treasure,
    Puzzle,
    Corridor,
    Optional,
    /// Hidden room behind a Hidden connector
    Secret,
    Vendor,
    Shrine,
    Checkpoint,
}

impl Archetype {
    /// Whether growth rules may attach new rooms to this archetype.
    ///
    /// Boss rooms are terminal and secret rooms stay dead ends.
    pub fn accepts_attachments(self) -> bool {
        !matches!(self, Archetype::Boss | Archetype::Secret)
    }
}

/// Coarse room footprint, read by the embedding stage
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
pub enum SizeClass {
    #[strum(serialize = "XS")]
    ExtraSmall,
    #[strum(serialize = "S")]
    Small,
    #[default]
    #[strum(serialize = "M")]
    Medium,
    #[strum(serialize = "L")]
    Large,
    #[strum(serialize = "XL")]
    ExtraLarge,
}

/// Something a room demands before it can be entered or solved
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requirement {
    pub kind: String,
    pub value: String,
}

impl Requirement {
    pub fn key(name: &str) -> Self {
        Self {
            kind: KEY_KIND.to_string(),
            value: name.to_string(),
        }
    }
}

/// Something a room grants (e.g. a key)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Capability {
    pub kind: String,
    pub value: String,
}

impl Capability {
    pub fn key(name: &str) -> Self {
        Self {
            kind: KEY_KIND.to_string(),
            value: name.to_string(),
        }
    }
}

/// A room in the abstract dungeon graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub archetype: Archetype,
    pub size: SizeClass,
    /// Target difficulty in [0, 1]
    pub difficulty: f64,
    /// Reward weight in [0, 1]
    pub reward: f64,
    pub tags: BTreeMap<String, String>,
    pub requirements: Vec<Requirement>,
    pub capabilities: Vec<Capability>,
}

impl Room {
    /// Create a room with neutral pacing values and no tags
    pub fn new(id: RoomId, archetype: Archetype, size: SizeClass) -> Self {
        Self {
            id,
            archetype,
            size,
            difficulty: 0.0,
            reward: 0.0,
            tags: BTreeMap::new(),
            requirements: Vec::new(),
            capabilities: Vec::new(),
        }
    }

    pub fn with_difficulty(mut self, difficulty: f64) -> Self {
        self.difficulty = difficulty.clamp(0.0, 1.0);
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// The biome tag, once the clustering pass has run
    pub fn biome(&self) -> Option<&str> {
        self.tags.get(BIOME_TAG).map(String::as_str)
    }

    pub fn grants(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }
}
