//! Scenario files.
//!
//! A scenario is a JSON description of a game position: players, the map,
//! unit types, units, budgets and rule switches. Everything refers to
//! territories, players and unit types by name; loading resolves the names
//! into index handles and builds a `MemoryBoard`.
//!
//! Land units listed in a sea zone are put aboard a transport of the same
//! owner in that zone.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::board::{
    BoardState, GameMap, Player, PlayerId, RuleSet, Territory, TerritoryId, UnitType, UnitTypeId,
};
use crate::host::{BoardQuery, MemoryBoard};

/// Errors that can occur while loading a scenario.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("cannot read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown territory: {0}")]
    UnknownTerritory(String),

    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    #[error("unknown unit type: {0}")]
    UnknownUnitType(String),

    #[error("duplicate name: {0}")]
    DuplicateName(String),

    #[error("too many {0}")]
    TooMany(&'static str),

    #[error("no transport room for {unit} in {territory}")]
    Stranded { unit: String, territory: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerSpec {
    pub name: String,
    #[serde(default)]
    pub team: u8,
    #[serde(default)]
    pub capital: Option<String>,
    #[serde(default)]
    pub budget: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerritorySpec {
    pub name: String,
    #[serde(default)]
    pub water: bool,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub production: u32,
    #[serde(default)]
    pub factory: bool,
    #[serde(default)]
    pub impassable: bool,
    #[serde(default)]
    pub victory_city: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitSpec {
    #[serde(rename = "type")]
    pub unit_type: String,
    pub owner: String,
    pub at: String,
    #[serde(default = "one")]
    pub count: u32,
}

fn one() -> u32 {
    1
}

/// A parsed, not yet resolved scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub rules: RuleSet,
    pub players: Vec<PlayerSpec>,
    pub territories: Vec<TerritorySpec>,
    /// Adjacent territory pairs, by name.
    pub connections: Vec<(String, String)>,
    pub unit_types: Vec<UnitType>,
    #[serde(default)]
    pub units: Vec<UnitSpec>,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Resolves names and builds the host board.
    pub fn build(&self) -> Result<MemoryBoard, ScenarioError> {
        let players_by_name = index_names(self.players.iter().map(|p| p.name.as_str()), u8::MAX as usize, "players")?;
        let terr_by_name = index_names(self.territories.iter().map(|t| t.name.as_str()), u16::MAX as usize, "territories")?;
        let types_by_name = index_names(self.unit_types.iter().map(|k| k.name.as_str()), u16::MAX as usize, "unit types")?;

        let player_id = |name: &str| {
            players_by_name
                .get(name)
                .map(|&i| PlayerId(i as u8))
                .ok_or_else(|| ScenarioError::UnknownPlayer(name.to_string()))
        };
        let territory_id = |name: &str| {
            terr_by_name
                .get(name)
                .map(|&i| TerritoryId(i as u16))
                .ok_or_else(|| ScenarioError::UnknownTerritory(name.to_string()))
        };
        let type_id = |name: &str| {
            types_by_name
                .get(name)
                .map(|&i| UnitTypeId(i as u16))
                .ok_or_else(|| ScenarioError::UnknownUnitType(name.to_string()))
        };

        let mut territories = Vec::with_capacity(self.territories.len());
        for (i, spec) in self.territories.iter().enumerate() {
            let id = TerritoryId(i as u16);
            let mut t = if spec.water {
                Territory::sea(id, spec.name.clone())
            } else {
                Territory::land(id, spec.name.clone())
            };
            t.owner = spec.owner.as_deref().map(player_id).transpose()?;
            t.production = spec.production;
            t.has_factory = spec.factory;
            t.impassable = spec.impassable;
            t.victory_city = spec.victory_city;
            territories.push(t);
        }
        let mut map = GameMap::new(territories);
        for (a, b) in &self.connections {
            map.connect(territory_id(a)?, territory_id(b)?);
        }

        let mut players = Vec::with_capacity(self.players.len());
        for (i, spec) in self.players.iter().enumerate() {
            players.push(Player {
                id: PlayerId(i as u8),
                name: spec.name.clone(),
                team: spec.team,
                capital: spec.capital.as_deref().map(territory_id).transpose()?,
            });
        }

        let unit_types: Vec<UnitType> = self
            .unit_types
            .iter()
            .enumerate()
            .map(|(i, k)| UnitType {
                id: UnitTypeId(i as u16),
                ..k.clone()
            })
            .collect();

        let mut state = BoardState::new(map, players, unit_types, self.rules);
        for (i, spec) in self.players.iter().enumerate() {
            state.budgets[i] = spec.budget;
        }

        // Ships first so cargo listed in a sea zone finds its transport.
        let (at_sea, rest): (Vec<&UnitSpec>, Vec<&UnitSpec>) = self.units.iter().partition(|u| {
            type_id(&u.unit_type).is_ok_and(|k| state.unit_type(k).is_land())
                && territory_id(&u.at).is_ok_and(|t| state.map.territory(t).is_water)
        });
        for spec in rest {
            let (kind, owner, at) = (type_id(&spec.unit_type)?, player_id(&spec.owner)?, territory_id(&spec.at)?);
            for _ in 0..spec.count {
                state.add_unit(kind, owner, at);
            }
        }
        for spec in at_sea {
            let (kind, owner, at) = (type_id(&spec.unit_type)?, player_id(&spec.owner)?, territory_id(&spec.at)?);
            let need = state.unit_type(kind).transport_cost;
            for _ in 0..spec.count {
                let transport = state
                    .units_in(at)
                    .iter()
                    .copied()
                    .find(|&u| {
                        state
                            .view(u)
                            .is_some_and(|v| v.unit.owner == owner && v.kind.is_transport())
                            && state.free_capacity(u) >= need
                    })
                    .ok_or_else(|| ScenarioError::Stranded {
                        unit: spec.unit_type.clone(),
                        territory: spec.at.clone(),
                    })?;
                let id = state.add_unit(kind, owner, at);
                if let Some(u) = state.unit_mut(id) {
                    u.transported_by = Some(transport);
                }
            }
        }

        debug!(
            territories = state.map.len(),
            players = state.players.len(),
            units = state.units().len(),
            "scenario loaded"
        );
        Ok(MemoryBoard::new(state))
    }
}

/// Maps each name to its position, rejecting duplicates and tables larger
/// than the handle type can address.
fn index_names<'a>(
    names: impl Iterator<Item = &'a str>,
    limit: usize,
    what: &'static str,
) -> Result<HashMap<&'a str, usize>, ScenarioError> {
    let mut out = HashMap::new();
    for (i, name) in names.enumerate() {
        if i >= limit {
            return Err(ScenarioError::TooMany(what));
        }
        if out.insert(name, i).is_some() {
            return Err(ScenarioError::DuplicateName(name.to_string()));
        }
    }
    Ok(out)
}
