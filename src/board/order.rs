//! Routes, move orders, purchases and placements.
//!
//! These are the artifacts the planner hands to the host. A `MoveOrder`
//! pairs a set of unit handles with the route they travel.

use std::collections::BTreeMap;

use serde::Serialize;

use super::territory::TerritoryId;
use super::unit::{UnitId, UnitTypeId};

/// An ordered walk over adjacent territories.
///
/// Always contains at least the start territory; `len` is the number of
/// movement steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Route {
    territories: Vec<TerritoryId>,
}

impl Route {
    /// Creates a route from a territory sequence. Returns `None` when empty.
    pub fn new(territories: Vec<TerritoryId>) -> Option<Self> {
        if territories.is_empty() {
            None
        } else {
            Some(Route { territories })
        }
    }

    /// A route of a single step.
    pub fn step(from: TerritoryId, to: TerritoryId) -> Self {
        Route {
            territories: vec![from, to],
        }
    }

    pub fn start(&self) -> TerritoryId {
        self.territories[0]
    }

    pub fn end(&self) -> TerritoryId {
        self.territories[self.territories.len() - 1]
    }

    /// Number of movement steps.
    pub fn len(&self) -> u32 {
        (self.territories.len() - 1) as u32
    }

    /// True when the route does not leave its start.
    pub fn is_empty(&self) -> bool {
        self.territories.len() == 1
    }

    pub fn territories(&self) -> &[TerritoryId] {
        &self.territories
    }

    /// Territories entered along the way, excluding the start.
    pub fn steps(&self) -> &[TerritoryId] {
        &self.territories[1..]
    }

    /// Territories strictly between start and end.
    pub fn intermediate(&self) -> &[TerritoryId] {
        let n = self.territories.len();
        if n <= 2 {
            &[]
        } else {
            &self.territories[1..n - 1]
        }
    }

    pub fn contains(&self, t: TerritoryId) -> bool {
        self.territories.contains(&t)
    }

    /// This route with one more step onto `t`.
    pub fn extended(&self, t: TerritoryId) -> Route {
        let mut territories = self.territories.clone();
        territories.push(t);
        Route { territories }
    }

    /// Returns the prefix of this route with at most `max_steps` steps.
    pub fn truncated(&self, max_steps: u32) -> Route {
        let keep = (max_steps as usize + 1).min(self.territories.len());
        Route {
            territories: self.territories[..keep].to_vec(),
        }
    }
}

/// How the units of an order travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MoveKind {
    /// Ordinary movement along the route.
    Move,
    /// Land units step from the coast into a sea zone aboard `transport`.
    Load { transport: UnitId },
    /// The listed transports sail every step but the last, then all of
    /// their cargo steps off into the final, land, territory.
    Unload,
}

/// A set of units and the route they take. The sole artifact submitted
/// per phase. Cargo that lands is moved by its transport's `Unload` order
/// rather than named in one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MoveOrder {
    pub units: Vec<UnitId>,
    pub route: Route,
    pub kind: MoveKind,
}

impl MoveOrder {
    pub fn new(units: Vec<UnitId>, route: Route) -> Self {
        MoveOrder {
            units,
            route,
            kind: MoveKind::Move,
        }
    }

    pub fn load(units: Vec<UnitId>, route: Route, transport: UnitId) -> Self {
        MoveOrder {
            units,
            route,
            kind: MoveKind::Load { transport },
        }
    }

    pub fn unload(transports: Vec<UnitId>, route: Route) -> Self {
        MoveOrder {
            units: transports,
            route,
            kind: MoveKind::Unload,
        }
    }
}

/// Quantities of unit types to buy.
pub type Purchase = BTreeMap<UnitTypeId, u32>;

/// Newly bought units to put on the board in one territory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub territory: TerritoryId,
    pub units: Vec<UnitTypeId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(i: u16) -> TerritoryId {
        TerritoryId(i)
    }

    #[test]
    fn empty_route_is_rejected() {
        assert!(Route::new(vec![]).is_none());
    }

    #[test]
    fn route_length_counts_steps() {
        let r = Route::new(vec![t(0), t(1), t(2)]).unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(r.start(), t(0));
        assert_eq!(r.end(), t(2));
        assert_eq!(r.steps(), &[t(1), t(2)]);
        assert_eq!(r.intermediate(), &[t(1)]);
    }

    #[test]
    fn single_territory_route_is_empty() {
        let r = Route::new(vec![t(4)]).unwrap();
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
        assert!(r.intermediate().is_empty());
    }

    #[test]
    fn extension_adds_a_step() {
        let r = Route::step(t(0), t(1)).extended(t(2));
        assert_eq!(r.territories(), &[t(0), t(1), t(2)]);
        assert_eq!(Route::new(vec![t(5)]).unwrap().extended(t(6)).len(), 1);
    }

    #[test]
    fn truncation_keeps_prefix() {
        let r = Route::new(vec![t(0), t(1), t(2), t(3)]).unwrap();
        let short = r.truncated(1);
        assert_eq!(short.territories(), &[t(0), t(1)]);
        assert_eq!(r.truncated(10), r);
    }
}
