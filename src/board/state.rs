//! Board snapshot.
//!
//! `BoardState` is the arena that owns every territory, unit type, unit and
//! player. Everything else refers into it by index. Units are never removed
//! from the table, so a `UnitId` stays valid for the whole game.

use super::map::GameMap;
use super::order::Route;
use super::rules::RuleSet;
use super::territory::{Player, PlayerId, TerritoryId};
use super::unit::{Unit, UnitId, UnitType, UnitTypeId, UnitView};

/// Complete board state at a point in time.
#[derive(Debug, Clone)]
pub struct BoardState {
    pub round: u32,
    pub map: GameMap,
    pub players: Vec<Player>,
    pub unit_types: Vec<UnitType>,
    pub rules: RuleSet,
    units: Vec<Unit>,
    /// Units present in each territory, indexed by territory id.
    garrison: Vec<Vec<UnitId>>,
    /// Territories captured during the current turn.
    pub conquered: Vec<bool>,
    /// Territories with a battle pending or fought this turn.
    pub battles: Vec<bool>,
    /// Unspent production points per player.
    pub budgets: Vec<u32>,
}

impl BoardState {
    /// Creates a board with no units.
    pub fn new(map: GameMap, players: Vec<Player>, unit_types: Vec<UnitType>, rules: RuleSet) -> Self {
        let n = map.len();
        let budgets = vec![0; players.len()];
        BoardState {
            round: 1,
            map,
            players,
            unit_types,
            rules,
            units: Vec::new(),
            garrison: vec![Vec::new(); n],
            conquered: vec![false; n],
            battles: vec![false; n],
            budgets,
        }
    }

    /// Adds a fresh unit with full movement. Returns its id.
    pub fn add_unit(&mut self, unit_type: UnitTypeId, owner: PlayerId, territory: TerritoryId) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        let movement = self.unit_types[unit_type.0 as usize].movement;
        self.units.push(Unit {
            id,
            unit_type,
            owner,
            territory,
            movement_left: movement,
            hits: 0,
            transported_by: None,
            moved_this_turn: false,
        });
        self.garrison[territory.index()].push(id);
        id
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.0 as usize)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id.0 as usize)
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit_type(&self, id: UnitTypeId) -> &UnitType {
        &self.unit_types[id.0 as usize]
    }

    pub fn view(&self, id: UnitId) -> Option<UnitView<'_>> {
        let unit = self.unit(id)?;
        Some(UnitView {
            unit,
            kind: self.unit_type(unit.unit_type),
        })
    }

    /// Ids of the units in a territory, in arrival order.
    pub fn units_in(&self, t: TerritoryId) -> &[UnitId] {
        &self.garrison[t.index()]
    }

    pub fn player(&self, id: PlayerId) -> &Player {
        &self.players[id.index()]
    }

    pub fn find_player(&self, name: &str) -> Option<PlayerId> {
        self.players.iter().find(|p| p.name == name).map(|p| p.id)
    }

    /// Moves a unit to the end of `route`, spending one movement point per
    /// step. Cargo aboard the unit travels with it.
    pub fn relocate(&mut self, id: UnitId, route: &Route) {
        let Some(unit) = self.units.get(id.0 as usize) else {
            return;
        };
        let from = unit.territory;
        let to = route.end();
        if from != to {
            self.garrison[from.index()].retain(|&u| u != id);
            self.garrison[to.index()].push(id);
        }
        let unit = &mut self.units[id.0 as usize];
        unit.territory = to;
        unit.movement_left = unit.movement_left.saturating_sub(route.len());
        unit.moved_this_turn = true;

        let cargo: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.transported_by == Some(id))
            .map(|u| u.id)
            .collect();
        for c in cargo {
            if from != to {
                self.garrison[from.index()].retain(|&u| u != c);
                self.garrison[to.index()].push(c);
            }
            self.units[c.0 as usize].territory = to;
        }
    }

    /// Restores movement and clears per-turn flags for one player.
    pub fn refresh_player(&mut self, player: PlayerId) {
        for unit in self.units.iter_mut().filter(|u| u.owner == player) {
            unit.movement_left = self.unit_types[unit.unit_type.0 as usize].movement;
            unit.moved_this_turn = false;
        }
        self.conquered.iter_mut().for_each(|c| *c = false);
        self.battles.iter_mut().for_each(|b| *b = false);
    }

    /// Total production of the territories a player owns.
    pub fn income(&self, player: PlayerId) -> u32 {
        self.map
            .territories()
            .iter()
            .filter(|t| t.owner == Some(player))
            .map(|t| t.production)
            .sum()
    }
}
