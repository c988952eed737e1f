//! Board representation and game-state types.
//!
//! Contains the data structures for territories, units, players, map
//! topology, orders and the overall board snapshot.

pub mod map;
pub mod order;
pub mod rules;
pub mod state;
pub mod territory;
pub mod unit;

pub use map::{GameMap, Passage, UNREACHABLE};
pub use order::{MoveKind, MoveOrder, Placement, Purchase, Route};
pub use rules::RuleSet;
pub use state::BoardState;
pub use territory::{Player, PlayerId, Territory, TerritoryId};
pub use unit::{Domain, Unit, UnitId, UnitType, UnitTypeId, UnitView};
