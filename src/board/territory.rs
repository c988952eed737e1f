//! Territories and players.
//!
//! A territory is either a land region or a sea zone. Territories and players
//! are addressed by small index newtypes so planning code can hold handles
//! instead of references into the host's board.

use serde::{Deserialize, Serialize};

/// Index of a territory in the board's territory table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerritoryId(pub u16);

impl TerritoryId {
    /// Returns the id as a table index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a player in the board's player table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Returns the id as a table index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A region of the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Territory {
    pub id: TerritoryId,
    pub name: String,
    pub is_water: bool,
    /// Current owner; `None` for neutral land and for sea zones.
    pub owner: Option<PlayerId>,
    pub production: u32,
    pub impassable: bool,
    pub has_factory: bool,
    pub victory_city: bool,
}

impl Territory {
    /// Creates an unowned land territory with no production.
    pub fn land(id: TerritoryId, name: impl Into<String>) -> Self {
        Territory {
            id,
            name: name.into(),
            is_water: false,
            owner: None,
            production: 0,
            impassable: false,
            has_factory: false,
            victory_city: false,
        }
    }

    /// Creates a sea zone.
    pub fn sea(id: TerritoryId, name: impl Into<String>) -> Self {
        Territory {
            is_water: true,
            ..Territory::land(id, name)
        }
    }

    /// Returns true for land that units may enter.
    pub fn is_passable_land(&self) -> bool {
        !self.is_water && !self.impassable
    }
}

/// A participant in the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Players sharing a team are allied.
    pub team: u8,
    pub capital: Option<TerritoryId>,
}
