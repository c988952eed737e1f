//! The collaborator boundary between the planner and the game host.
//!
//! `BoardQuery` is the read-only view the planner consults; `Host` adds the
//! command-submission side. The host owns the board and applies accepted
//! commands before the planner's next query, so each phase sees the effects
//! of the previous one.

pub mod memory;

use crate::board::{
    BoardState, GameMap, MoveOrder, Placement, Player, PlayerId, Purchase, RuleSet, Territory,
    TerritoryId, UnitId, UnitType, UnitTypeId, UnitView,
};
use crate::plan::Epoch;

pub use memory::MemoryBoard;

/// Reasons a host refuses a submitted command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostRejection {
    #[error("order contains no units")]
    EmptyOrder,

    #[error("unknown unit {0:?}")]
    UnknownUnit(UnitId),

    #[error("unit {0:?} is not owned by the moving player")]
    NotOwned(UnitId),

    #[error("unit {unit:?} is not at the start of the route")]
    WrongStart { unit: UnitId },

    #[error("route steps {0:?} -> {1:?} are not adjacent")]
    NotAdjacent(TerritoryId, TerritoryId),

    #[error("unit {unit:?} needs {needed} movement but has {left}")]
    InsufficientMovement { unit: UnitId, needed: u32, left: u32 },

    #[error("unit {unit:?} cannot enter {territory:?}")]
    Impassable { unit: UnitId, territory: TerritoryId },

    #[error("route passes through contested territory {0:?}")]
    Blocked(TerritoryId),

    #[error("transport {0:?} lacks room for the cargo")]
    TransportFull(UnitId),

    #[error("unit {0:?} carries no cargo to unload")]
    NoCargo(UnitId),

    #[error("cannot attack {0:?} outside the combat move")]
    NotCombatPhase(TerritoryId),

    #[error("purchase costs {cost} but only {budget} is available")]
    OverBudget { cost: u32, budget: u32 },

    #[error("unknown unit type {0:?}")]
    UnknownUnitType(UnitTypeId),

    #[error("{0:?} cannot receive new units")]
    NoFactory(TerritoryId),

    #[error("{territory:?} can take {capacity} more units")]
    CapacityExceeded { territory: TerritoryId, capacity: u32 },

    #[error("unit type {0:?} was not purchased")]
    NotPurchased(UnitTypeId),
}

/// Read-only board queries.
///
/// Required methods expose the raw tables; provided methods build the
/// filtered enumerations and relations the planner uses. Implementations
/// must be shareable across threads so ranking can run in parallel.
pub trait BoardQuery: Sync {
    fn map(&self) -> &GameMap;
    fn players(&self) -> &[Player];
    fn unit_types(&self) -> &[UnitType];
    fn rules(&self) -> &RuleSet;
    fn view(&self, unit: UnitId) -> Option<UnitView<'_>>;
    /// Ids of the units in a territory.
    fn units_in(&self, t: TerritoryId) -> &[UnitId];
    fn conquered_this_turn(&self, t: TerritoryId) -> bool;
    fn battle_pending(&self, t: TerritoryId) -> bool;
    /// Unspent production points.
    fn budget(&self, player: PlayerId) -> u32;
    /// New units a territory may still receive this turn.
    fn placement_capacity(&self, t: TerritoryId) -> u32;

    /// Game round, for reporting. Hosts that do not count rounds return 0.
    fn round(&self) -> u32 {
        0
    }

    fn territory(&self, t: TerritoryId) -> &Territory {
        self.map().territory(t)
    }

    fn player(&self, id: PlayerId) -> &Player {
        &self.players()[id.index()]
    }

    fn unit_type(&self, id: UnitTypeId) -> &UnitType {
        &self.unit_types()[id.0 as usize]
    }

    fn is_allied(&self, a: PlayerId, b: PlayerId) -> bool {
        a == b || self.player(a).team == self.player(b).team
    }

    fn is_enemy(&self, a: PlayerId, b: PlayerId) -> bool {
        !self.is_allied(a, b)
    }

    /// Players hostile to `player`.
    fn enemies_of(&self, player: PlayerId) -> Vec<PlayerId> {
        self.players()
            .iter()
            .map(|p| p.id)
            .filter(|&p| self.is_enemy(player, p))
            .collect()
    }

    /// Capitals held by players hostile to `player`.
    fn enemy_capitals(&self, player: PlayerId) -> Vec<TerritoryId> {
        self.enemies_of(player)
            .into_iter()
            .filter_map(|p| self.player(p).capital)
            .filter(|&c| self.territory(c).owner.is_some_and(|o| self.is_enemy(player, o)))
            .collect()
    }

    /// Units in `t` matching a predicate.
    fn units_matching<F>(&self, t: TerritoryId, pred: F) -> Vec<UnitView<'_>>
    where
        F: Fn(&UnitView<'_>) -> bool,
        Self: Sized,
    {
        self.units_in(t)
            .iter()
            .filter_map(|&id| self.view(id))
            .filter(|v| pred(v))
            .collect()
    }

    /// Units in `t` owned by `player`.
    fn owned_units(&self, t: TerritoryId, player: PlayerId) -> Vec<UnitView<'_>>
    where
        Self: Sized,
    {
        self.units_matching(t, |v| v.unit.owner == player)
    }

    /// Units in `t` owned by `player` or an ally.
    fn allied_units(&self, t: TerritoryId, player: PlayerId) -> Vec<UnitView<'_>>
    where
        Self: Sized,
    {
        self.units_matching(t, |v| self.is_allied(player, v.unit.owner))
    }

    /// Units in `t` hostile to `player`.
    fn enemy_units(&self, t: TerritoryId, player: PlayerId) -> Vec<UnitView<'_>>
    where
        Self: Sized,
    {
        self.units_matching(t, |v| self.is_enemy(player, v.unit.owner))
    }

    fn has_enemy_units(&self, t: TerritoryId, player: PlayerId) -> bool {
        self.units_in(t)
            .iter()
            .filter_map(|&id| self.view(id))
            .any(|v| self.is_enemy(player, v.unit.owner) && !v.kind.is_infrastructure)
    }

    /// Land owned by `player` or an ally.
    fn is_friendly_land(&self, t: TerritoryId, player: PlayerId) -> bool {
        let terr = self.territory(t);
        terr.is_passable_land() && terr.owner.is_some_and(|o| self.is_allied(player, o))
    }

    /// Land owned by a player hostile to `player`. Neutral land is not enemy.
    fn is_enemy_land(&self, t: TerritoryId, player: PlayerId) -> bool {
        let terr = self.territory(t);
        terr.is_passable_land() && terr.owner.is_some_and(|o| self.is_enemy(player, o))
    }

    /// Territories owned by `player`.
    fn territories_of(&self, player: PlayerId) -> Vec<TerritoryId> {
        self.map()
            .territories()
            .iter()
            .filter(|t| t.owner == Some(player))
            .map(|t| t.id)
            .collect()
    }

    /// Land territories owned by players hostile to `player`.
    fn enemy_territories(&self, player: PlayerId) -> Vec<TerritoryId> {
        self.map()
            .territories()
            .iter()
            .filter(|t| self.is_enemy_land(t.id, player))
            .map(|t| t.id)
            .collect()
    }

    /// Territories where `player` holds a factory.
    fn factories_of(&self, player: PlayerId) -> Vec<TerritoryId> {
        self.map()
            .territories()
            .iter()
            .filter(|t| t.owner == Some(player) && t.has_factory)
            .map(|t| t.id)
            .collect()
    }

    /// Units carried by a transport.
    fn cargo_of(&self, transport: UnitId) -> Vec<UnitId> {
        let Some(v) = self.view(transport) else {
            return Vec::new();
        };
        self.units_in(v.unit.territory)
            .iter()
            .filter_map(|&id| self.view(id))
            .filter(|c| c.unit.transported_by == Some(transport))
            .map(|c| c.id())
            .collect()
    }

    /// Free cargo space on a transport.
    fn free_capacity(&self, transport: UnitId) -> u32 {
        let Some(v) = self.view(transport) else {
            return 0;
        };
        let used: u32 = self
            .cargo_of(transport)
            .into_iter()
            .filter_map(|c| self.view(c))
            .map(|c| c.kind.transport_cost)
            .sum();
        v.kind.transport_capacity.saturating_sub(used)
    }
}

/// Command submission on top of the board queries.
pub trait Host: BoardQuery {
    /// Informs the host which move segment is starting.
    fn begin_epoch(&mut self, _player: PlayerId, _epoch: Epoch) {}

    fn submit_move(&mut self, player: PlayerId, order: &MoveOrder) -> Result<(), HostRejection>;

    fn submit_purchase(&mut self, player: PlayerId, purchase: &Purchase) -> Result<(), HostRejection>;

    fn submit_placement(&mut self, player: PlayerId, placement: &Placement) -> Result<(), HostRejection>;
}

impl BoardQuery for BoardState {
    fn map(&self) -> &GameMap {
        &self.map
    }

    fn players(&self) -> &[Player] {
        &self.players
    }

    fn unit_types(&self) -> &[UnitType] {
        &self.unit_types
    }

    fn rules(&self) -> &RuleSet {
        &self.rules
    }

    fn view(&self, unit: UnitId) -> Option<UnitView<'_>> {
        BoardState::view(self, unit)
    }

    fn units_in(&self, t: TerritoryId) -> &[UnitId] {
        BoardState::units_in(self, t)
    }

    fn conquered_this_turn(&self, t: TerritoryId) -> bool {
        self.conquered[t.index()]
    }

    fn battle_pending(&self, t: TerritoryId) -> bool {
        self.battles[t.index()]
    }

    fn budget(&self, player: PlayerId) -> u32 {
        self.budgets.get(player.index()).copied().unwrap_or(0)
    }

    fn placement_capacity(&self, t: TerritoryId) -> u32 {
        let terr = self.map.territory(t);
        if terr.has_factory {
            terr.production
        } else {
            0
        }
    }

    fn round(&self) -> u32 {
        self.round
    }
}
