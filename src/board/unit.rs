//! Unit types and unit instances.
//!
//! `UnitType` carries the combat statistics the host exposes per type;
//! `Unit` is a single piece on the board. Planning code refers to units by
//! `UnitId` and pairs them with their type through `UnitView`.

use serde::{Deserialize, Serialize};

use super::territory::{PlayerId, TerritoryId};

/// Index of a unit in the board's unit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// Index of a unit type in the board's unit-type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitTypeId(pub u16);

/// Movement domain of a unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Land,
    Sea,
    Air,
}

/// Combat statistics and capabilities of a unit type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitType {
    pub id: UnitTypeId,
    pub name: String,
    pub domain: Domain,
    pub attack: u32,
    pub attack_rolls: u32,
    pub defense: u32,
    pub movement: u32,
    pub cost: u32,
    pub hit_points: u32,
    /// Cargo space offered when this is a transport.
    pub transport_capacity: u32,
    /// Cargo space used when carried by a transport.
    pub transport_cost: u32,
    pub carrier_capacity: u32,
    pub carrier_cost: u32,
    pub can_blitz: bool,
    pub is_submarine: bool,
    pub is_destroyer: bool,
    pub is_strategic_bomber: bool,
    pub is_artillery: bool,
    pub artillery_supportable: bool,
    pub is_infantry: bool,
    /// Factories, anti-aircraft guns and similar non-combatants.
    pub is_infrastructure: bool,
    pub can_bombard: bool,
}

impl Default for UnitType {
    fn default() -> Self {
        UnitType {
            id: UnitTypeId(0),
            name: String::new(),
            domain: Domain::Land,
            attack: 0,
            attack_rolls: 1,
            defense: 0,
            movement: 1,
            cost: 0,
            hit_points: 1,
            transport_capacity: 0,
            transport_cost: 0,
            carrier_capacity: 0,
            carrier_cost: 0,
            can_blitz: false,
            is_submarine: false,
            is_destroyer: false,
            is_strategic_bomber: false,
            is_artillery: false,
            artillery_supportable: false,
            is_infantry: false,
            is_infrastructure: false,
            can_bombard: false,
        }
    }
}

impl UnitType {
    pub fn is_land(&self) -> bool {
        self.domain == Domain::Land
    }

    pub fn is_sea(&self) -> bool {
        self.domain == Domain::Sea
    }

    pub fn is_air(&self) -> bool {
        self.domain == Domain::Air
    }

    /// A sea unit that carries land units and has no attack of its own.
    pub fn is_transport(&self) -> bool {
        self.is_sea() && self.transport_capacity > 0 && self.attack == 0
    }

    pub fn is_carrier(&self) -> bool {
        self.is_sea() && self.carrier_capacity > 0
    }

    /// Air units that can land on a carrier.
    pub fn is_carrier_borne(&self) -> bool {
        self.is_air() && self.carrier_cost > 0
    }

    pub fn can_be_transported(&self) -> bool {
        self.is_land() && self.transport_cost > 0 && !self.is_infrastructure
    }

    pub fn is_multi_hit(&self) -> bool {
        self.hit_points > 1
    }
}

/// A single unit on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub id: UnitId,
    pub unit_type: UnitTypeId,
    pub owner: PlayerId,
    pub territory: TerritoryId,
    pub movement_left: u32,
    pub hits: u32,
    /// The transport carrying this unit, if any.
    pub transported_by: Option<UnitId>,
    pub moved_this_turn: bool,
}

/// A unit paired with its type, borrowed from the board.
#[derive(Debug, Clone, Copy)]
pub struct UnitView<'a> {
    pub unit: &'a Unit,
    pub kind: &'a UnitType,
}

impl<'a> UnitView<'a> {
    pub fn id(&self) -> UnitId {
        self.unit.id
    }

    /// Returns true when the unit still has a free hit to absorb.
    pub fn has_spare_hit(&self) -> bool {
        self.kind.hit_points > self.unit.hits + 1
    }
}
