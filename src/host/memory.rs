//! Reference in-memory host.
//!
//! `MemoryBoard` owns a `BoardState` and applies the planner's commands to
//! it after validating them against the movement rules: ownership,
//! adjacency, remaining movement, domain passability, blitzing, transport
//! capacity, budgets and factory capacity. Battles are not fought; entering
//! a defended territory only marks a battle as pending. Empty enemy land
//! entered by land units is captured at once.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::{BoardQuery, Host, HostRejection};
use crate::board::{
    BoardState, GameMap, MoveKind, MoveOrder, Placement, Player, PlayerId, Purchase, Route,
    RuleSet, TerritoryId, UnitId, UnitType, UnitTypeId, UnitView,
};
use crate::plan::Epoch;

/// An in-memory host that validates and applies commands.
#[derive(Debug, Clone)]
pub struct MemoryBoard {
    state: BoardState,
    epoch: Epoch,
    /// Bought but not yet placed units, per player.
    pending: Vec<Purchase>,
    /// Units placed this turn, per territory.
    placed: Vec<u32>,
}

impl MemoryBoard {
    pub fn new(state: BoardState) -> Self {
        let players = state.players.len();
        let territories = state.map.len();
        MemoryBoard {
            state,
            epoch: Epoch::Combat,
            pending: vec![Purchase::new(); players],
            placed: vec![0; territories],
        }
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut BoardState {
        &mut self.state
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn set_budget(&mut self, player: PlayerId, amount: u32) {
        self.state.budgets[player.index()] = amount;
    }

    /// Units bought this turn and not yet placed.
    pub fn pending_purchase(&self, player: PlayerId) -> &Purchase {
        &self.pending[player.index()]
    }

    /// Ends `player`'s turn: restores movement, clears per-turn flags and
    /// collects income.
    pub fn end_turn(&mut self, player: PlayerId) {
        self.state.refresh_player(player);
        let income = self.state.income(player);
        self.state.budgets[player.index()] += income;
        self.placed.iter_mut().for_each(|p| *p = 0);
        self.epoch = Epoch::Combat;
        self.state.round += 1;
        debug!(player = player.0, income, round = self.state.round, "turn ended");
    }

    fn moving_view(&self, player: PlayerId, id: UnitId) -> Result<UnitView<'_>, HostRejection> {
        let v = self.state.view(id).ok_or(HostRejection::UnknownUnit(id))?;
        if v.unit.owner != player {
            return Err(HostRejection::NotOwned(id));
        }
        Ok(v)
    }

    fn check_route_shape(&self, order: &MoveOrder) -> Result<(), HostRejection> {
        let steps = order.route.territories();
        for pair in steps.windows(2) {
            if !self.state.map.is_adjacent(pair[0], pair[1]) {
                return Err(HostRejection::NotAdjacent(pair[0], pair[1]));
            }
        }
        Ok(())
    }

    /// Whether ending in `t` starts a fight, which is only legal in combat.
    fn is_attack(&self, player: PlayerId, t: TerritoryId) -> bool {
        self.state.is_enemy_land(t, player) || self.state.has_enemy_units(t, player)
    }

    fn check_land_step(
        &self,
        player: PlayerId,
        v: &UnitView<'_>,
        t: TerritoryId,
        last: bool,
    ) -> Result<(), HostRejection> {
        let terr = self.state.map.territory(t);
        if !terr.is_passable_land() || terr.owner.is_none() {
            return Err(HostRejection::Impassable { unit: v.id(), territory: t });
        }
        if last || (self.state.is_friendly_land(t, player) && !self.state.has_enemy_units(t, player)) {
            return Ok(());
        }
        let blitzable = v.kind.can_blitz
            && self.state.rules.blitz_through_empty_enemy
            && self.epoch == Epoch::Combat
            && !self.state.has_enemy_units(t, player);
        if blitzable {
            Ok(())
        } else {
            Err(HostRejection::Blocked(t))
        }
    }

    fn check_move(&self, player: PlayerId, order: &MoveOrder) -> Result<(), HostRejection> {
        let route = &order.route;
        let end = route.end();
        for &id in &order.units {
            let v = self.moving_view(player, id)?;
            if v.unit.territory != route.start() {
                return Err(HostRejection::WrongStart { unit: id });
            }
            if v.unit.movement_left < route.len() {
                return Err(HostRejection::InsufficientMovement {
                    unit: id,
                    needed: route.len(),
                    left: v.unit.movement_left,
                });
            }
            if v.unit.transported_by.is_some() {
                return Err(HostRejection::Impassable { unit: id, territory: end });
            }
            let steps = route.steps();
            for (i, &t) in steps.iter().enumerate() {
                let last = i + 1 == steps.len();
                if v.kind.is_land() {
                    self.check_land_step(player, &v, t, last)?;
                } else if v.kind.is_sea() {
                    if !self.state.map.territory(t).is_water {
                        return Err(HostRejection::Impassable { unit: id, territory: t });
                    }
                    if !last && self.state.has_enemy_units(t, player) {
                        return Err(HostRejection::Blocked(t));
                    }
                } else {
                    let terr = self.state.map.territory(t);
                    if terr.impassable || (last && !terr.is_water && terr.owner.is_none()) {
                        return Err(HostRejection::Impassable { unit: id, territory: t });
                    }
                }
            }
        }
        if !route.is_empty() && self.epoch == Epoch::NonCombat && self.is_attack(player, end) {
            return Err(HostRejection::NotCombatPhase(end));
        }
        Ok(())
    }

    fn check_load(&self, player: PlayerId, order: &MoveOrder, transport: UnitId) -> Result<(), HostRejection> {
        let route = &order.route;
        let t = self.moving_view(player, transport)?;
        if !t.kind.is_transport() && t.kind.transport_capacity == 0 {
            return Err(HostRejection::TransportFull(transport));
        }
        if route.len() != 1 || t.unit.territory != route.end() {
            return Err(HostRejection::WrongStart { unit: transport });
        }
        let mut needed = 0;
        for &id in &order.units {
            let v = self.moving_view(player, id)?;
            if v.unit.territory != route.start() || v.unit.transported_by.is_some() {
                return Err(HostRejection::WrongStart { unit: id });
            }
            if !v.kind.can_be_transported() {
                return Err(HostRejection::Impassable { unit: id, territory: route.end() });
            }
            if v.unit.movement_left == 0 {
                return Err(HostRejection::InsufficientMovement { unit: id, needed: 1, left: 0 });
            }
            needed += v.kind.transport_cost;
        }
        if needed > self.state.free_capacity(transport) {
            return Err(HostRejection::TransportFull(transport));
        }
        Ok(())
    }

    /// Transports sail `route` up to its last step, then their cargo steps
    /// onto the final territory.
    fn check_unload(&self, player: PlayerId, order: &MoveOrder) -> Result<(), HostRejection> {
        let route = &order.route;
        let end = route.end();
        if route.is_empty() {
            return Err(HostRejection::NotAdjacent(route.start(), end));
        }
        let sea = route.truncated(route.len() - 1);
        let terr = self.state.map.territory(end);
        for &id in &order.units {
            let v = self.moving_view(player, id)?;
            if !v.kind.is_sea() || v.kind.transport_capacity == 0 || self.cargo_of(id).is_empty() {
                return Err(HostRejection::NoCargo(id));
            }
            if v.unit.territory != route.start() {
                return Err(HostRejection::WrongStart { unit: id });
            }
            if v.unit.movement_left < sea.len() {
                return Err(HostRejection::InsufficientMovement {
                    unit: id,
                    needed: sea.len(),
                    left: v.unit.movement_left,
                });
            }
            for &t in sea.steps() {
                if !self.state.map.territory(t).is_water {
                    return Err(HostRejection::Impassable { unit: id, territory: t });
                }
                if self.state.has_enemy_units(t, player) {
                    return Err(HostRejection::Blocked(t));
                }
            }
            if !terr.is_passable_land() || terr.owner.is_none() {
                return Err(HostRejection::Impassable { unit: id, territory: end });
            }
        }
        if self.epoch == Epoch::NonCombat && self.is_attack(player, end) {
            return Err(HostRejection::NotCombatPhase(end));
        }
        Ok(())
    }

    /// Marks battles and captures for land arriving in `t`.
    fn arrive(&mut self, player: PlayerId, t: TerritoryId, land_arrived: bool) {
        if self.state.has_enemy_units(t, player) {
            self.state.battles[t.index()] = true;
            return;
        }
        if land_arrived && self.state.is_enemy_land(t, player) {
            self.state.map.territory_mut(t).owner = Some(player);
            self.state.conquered[t.index()] = true;
            debug!(territory = %self.state.map.territory(t).name, player = player.0, "captured");
        }
    }

    /// Capacity left at a land factory.
    fn factory_room(&self, t: TerritoryId) -> u32 {
        BoardState::placement_capacity(&self.state, t).saturating_sub(self.placed[t.index()])
    }

    /// The owned factory adjacent to a sea zone with the most room left.
    fn sea_factory(&self, player: PlayerId, sea: TerritoryId) -> Option<TerritoryId> {
        self.state
            .map
            .neighbors(sea)
            .iter()
            .copied()
            .filter(|&f| {
                let terr = self.state.map.territory(f);
                terr.owner == Some(player) && terr.has_factory && !self.state.conquered[f.index()]
            })
            .max_by_key(|&f| (self.factory_room(f), std::cmp::Reverse(f)))
    }
}

impl BoardQuery for MemoryBoard {
    fn map(&self) -> &GameMap {
        &self.state.map
    }

    fn players(&self) -> &[Player] {
        &self.state.players
    }

    fn unit_types(&self) -> &[UnitType] {
        &self.state.unit_types
    }

    fn rules(&self) -> &RuleSet {
        &self.state.rules
    }

    fn view(&self, unit: UnitId) -> Option<UnitView<'_>> {
        self.state.view(unit)
    }

    fn units_in(&self, t: TerritoryId) -> &[UnitId] {
        self.state.units_in(t)
    }

    fn conquered_this_turn(&self, t: TerritoryId) -> bool {
        self.state.conquered[t.index()]
    }

    fn battle_pending(&self, t: TerritoryId) -> bool {
        self.state.battles[t.index()]
    }

    fn budget(&self, player: PlayerId) -> u32 {
        self.state.budgets.get(player.index()).copied().unwrap_or(0)
    }

    fn placement_capacity(&self, t: TerritoryId) -> u32 {
        let terr = self.state.map.territory(t);
        if terr.is_water {
            return self
                .state
                .map
                .neighbors(t)
                .iter()
                .filter(|&&f| {
                    let land = self.state.map.territory(f);
                    land.has_factory && !self.state.conquered[f.index()]
                })
                .map(|&f| self.factory_room(f))
                .max()
                .unwrap_or(0);
        }
        if self.state.conquered[t.index()] {
            return 0;
        }
        self.factory_room(t)
    }

    fn round(&self) -> u32 {
        self.state.round
    }
}

impl Host for MemoryBoard {
    fn begin_epoch(&mut self, player: PlayerId, epoch: Epoch) {
        trace!(player = player.0, ?epoch, "epoch started");
        self.epoch = epoch;
    }

    fn submit_move(&mut self, player: PlayerId, order: &MoveOrder) -> Result<(), HostRejection> {
        if order.units.is_empty() {
            return Err(HostRejection::EmptyOrder);
        }
        self.check_route_shape(order)?;
        let route = &order.route;
        match order.kind {
            MoveKind::Move => {
                self.check_move(player, order)?;
                let mut land_arrived = false;
                for &id in &order.units {
                    land_arrived |= self.state.view(id).is_some_and(|v| v.kind.is_land());
                    self.state.relocate(id, route);
                }
                if land_arrived {
                    for &t in route.intermediate() {
                        if self.state.is_enemy_land(t, player) {
                            self.arrive(player, t, true);
                        }
                    }
                }
                if !route.is_empty() {
                    self.arrive(player, route.end(), land_arrived);
                }
            }
            MoveKind::Load { transport } => {
                self.check_load(player, order, transport)?;
                for &id in &order.units {
                    self.state.relocate(id, route);
                    if let Some(u) = self.state.unit_mut(id) {
                        u.transported_by = Some(transport);
                    }
                }
            }
            MoveKind::Unload => {
                self.check_unload(player, order)?;
                let sea = route.truncated(route.len() - 1);
                let ashore = Route::step(sea.end(), route.end());
                for &tr in &order.units {
                    self.state.relocate(tr, &sea);
                    for id in self.cargo_of(tr) {
                        if let Some(u) = self.state.unit_mut(id) {
                            u.transported_by = None;
                        }
                        self.state.relocate(id, &ashore);
                        if let Some(u) = self.state.unit_mut(id) {
                            u.movement_left = 0;
                        }
                    }
                }
                self.arrive(player, route.end(), true);
            }
        }
        Ok(())
    }

    fn submit_purchase(&mut self, player: PlayerId, purchase: &Purchase) -> Result<(), HostRejection> {
        let mut cost = 0;
        for (&ty, &qty) in purchase {
            let kind = self
                .state
                .unit_types
                .get(ty.0 as usize)
                .ok_or(HostRejection::UnknownUnitType(ty))?;
            cost += kind.cost * qty;
        }
        let budget = self.budget(player);
        if cost > budget {
            return Err(HostRejection::OverBudget { cost, budget });
        }
        self.state.budgets[player.index()] = budget - cost;
        let pending = &mut self.pending[player.index()];
        for (&ty, &qty) in purchase {
            if qty > 0 {
                *pending.entry(ty).or_insert(0) += qty;
            }
        }
        Ok(())
    }

    fn submit_placement(&mut self, player: PlayerId, placement: &Placement) -> Result<(), HostRejection> {
        let t = placement.territory;
        let mut wanted: BTreeMap<UnitTypeId, u32> = BTreeMap::new();
        for &ty in &placement.units {
            *wanted.entry(ty).or_insert(0) += 1;
        }
        for (&ty, &qty) in &wanted {
            let have = self.pending[player.index()].get(&ty).copied().unwrap_or(0);
            if have < qty {
                return Err(HostRejection::NotPurchased(ty));
            }
            let kind = self
                .state
                .unit_types
                .get(ty.0 as usize)
                .ok_or(HostRejection::UnknownUnitType(ty))?;
            if kind.is_sea() != self.state.map.territory(t).is_water {
                return Err(HostRejection::NoFactory(t));
            }
        }

        let factory = if self.state.map.territory(t).is_water {
            self.sea_factory(player, t).ok_or(HostRejection::NoFactory(t))?
        } else {
            let terr = self.state.map.territory(t);
            if terr.owner != Some(player) || !terr.has_factory || self.state.conquered[t.index()] {
                return Err(HostRejection::NoFactory(t));
            }
            t
        };
        let capacity = self.factory_room(factory);
        let count = placement.units.len() as u32;
        if count > capacity {
            return Err(HostRejection::CapacityExceeded { territory: t, capacity });
        }

        for &ty in &placement.units {
            self.state.add_unit(ty, player, t);
        }
        let pending = &mut self.pending[player.index()];
        for (ty, qty) in wanted {
            if let Some(have) = pending.get_mut(&ty) {
                *have -= qty;
                if *have == 0 {
                    pending.remove(&ty);
                }
            }
        }
        self.placed[factory.index()] += count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Domain, Territory};

    const RED: PlayerId = PlayerId(0);
    const BLUE: PlayerId = PlayerId(1);
    const INF: UnitTypeId = UnitTypeId(0);
    const TANK: UnitTypeId = UnitTypeId(1);
    const TRANSPORT: UnitTypeId = UnitTypeId(2);
    const FIGHTER: UnitTypeId = UnitTypeId(3);

    fn t(i: u16) -> TerritoryId {
        TerritoryId(i)
    }

    /// `R0 - R1 - B2 - B3` on land with sea zone `S4` touching R0 and B3.
    /// R0 is Red's capital and factory, B3 is Blue's.
    fn board() -> MemoryBoard {
        let mut terrs = Vec::new();
        for (i, owner) in [(0, RED), (1, RED), (2, BLUE), (3, BLUE)] {
            let mut terr = Territory::land(t(i), format!("T{i}"));
            terr.owner = Some(owner);
            terr.production = 2;
            terrs.push(terr);
        }
        terrs[0].has_factory = true;
        terrs[3].has_factory = true;
        terrs.push(Territory::sea(t(4), "S4"));
        let mut map = GameMap::new(terrs);
        map.connect(t(0), t(1));
        map.connect(t(1), t(2));
        map.connect(t(2), t(3));
        map.connect(t(0), t(4));
        map.connect(t(3), t(4));
        let players = vec![
            Player { id: RED, name: "Red".into(), team: 0, capital: Some(t(0)) },
            Player { id: BLUE, name: "Blue".into(), team: 1, capital: Some(t(3)) },
        ];
        let types = vec![
            UnitType { id: INF, name: "infantry".into(), attack: 1, defense: 2, cost: 3, transport_cost: 2, is_infantry: true, ..UnitType::default() },
            UnitType { id: TANK, name: "tank".into(), attack: 3, defense: 3, movement: 2, cost: 5, transport_cost: 3, can_blitz: true, ..UnitType::default() },
            UnitType { id: TRANSPORT, name: "transport".into(), domain: Domain::Sea, defense: 1, movement: 2, cost: 7, transport_capacity: 5, ..UnitType::default() },
            UnitType { id: FIGHTER, name: "fighter".into(), domain: Domain::Air, attack: 3, defense: 4, movement: 4, cost: 10, carrier_cost: 1, ..UnitType::default() },
        ];
        MemoryBoard::new(BoardState::new(map, players, types, RuleSet::default()))
    }

    #[test]
    fn move_into_friendly_land() {
        let mut b = board();
        let inf = b.state_mut().add_unit(INF, RED, t(0));
        b.submit_move(RED, &MoveOrder::new(vec![inf], Route::step(t(0), t(1)))).unwrap();
        assert_eq!(b.view(inf).unwrap().unit.territory, t(1));
    }

    #[test]
    fn rejects_foreign_unit() {
        let mut b = board();
        let inf = b.state_mut().add_unit(INF, BLUE, t(2));
        let err = b.submit_move(RED, &MoveOrder::new(vec![inf], Route::step(t(2), t(1))));
        assert_eq!(err, Err(HostRejection::NotOwned(inf)));
    }

    #[test]
    fn rejects_insufficient_movement() {
        let mut b = board();
        let inf = b.state_mut().add_unit(INF, RED, t(0));
        let route = Route::new(vec![t(0), t(1), t(2)]).unwrap();
        let err = b.submit_move(RED, &MoveOrder::new(vec![inf], route));
        assert!(matches!(err, Err(HostRejection::InsufficientMovement { needed: 2, left: 1, .. })));
    }

    #[test]
    fn captures_empty_enemy_land() {
        let mut b = board();
        let inf = b.state_mut().add_unit(INF, RED, t(1));
        b.submit_move(RED, &MoveOrder::new(vec![inf], Route::step(t(1), t(2)))).unwrap();
        assert_eq!(b.territory(t(2)).owner, Some(RED));
        assert!(b.conquered_this_turn(t(2)));
    }

    #[test]
    fn defended_enemy_land_marks_battle() {
        let mut b = board();
        b.state_mut().add_unit(INF, BLUE, t(2));
        let inf = b.state_mut().add_unit(INF, RED, t(1));
        b.submit_move(RED, &MoveOrder::new(vec![inf], Route::step(t(1), t(2)))).unwrap();
        assert_eq!(b.territory(t(2)).owner, Some(BLUE));
        assert!(b.battle_pending(t(2)));
    }

    #[test]
    fn blitz_through_empty_enemy_captures_both() {
        let mut b = board();
        let tank = b.state_mut().add_unit(TANK, RED, t(1));
        let route = Route::new(vec![t(1), t(2), t(3)]).unwrap();
        b.submit_move(RED, &MoveOrder::new(vec![tank], route)).unwrap();
        assert_eq!(b.territory(t(2)).owner, Some(RED));
        assert_eq!(b.territory(t(3)).owner, Some(RED));
    }

    #[test]
    fn infantry_cannot_pass_enemy_land() {
        let mut b = board();
        let mut kind = b.unit_type(INF).clone();
        kind.movement = 2;
        b.state_mut().unit_types[INF.0 as usize] = kind;
        let inf = b.state_mut().add_unit(INF, RED, t(1));
        let route = Route::new(vec![t(1), t(2), t(3)]).unwrap();
        let err = b.submit_move(RED, &MoveOrder::new(vec![inf], route));
        assert_eq!(err, Err(HostRejection::Blocked(t(2))));
    }

    #[test]
    fn noncombat_cannot_attack() {
        let mut b = board();
        b.begin_epoch(RED, Epoch::NonCombat);
        let inf = b.state_mut().add_unit(INF, RED, t(1));
        let err = b.submit_move(RED, &MoveOrder::new(vec![inf], Route::step(t(1), t(2))));
        assert_eq!(err, Err(HostRejection::NotCombatPhase(t(2))));
    }

    #[test]
    fn load_sail_unload() {
        let mut b = board();
        let tr = b.state_mut().add_unit(TRANSPORT, RED, t(4));
        let inf = b.state_mut().add_unit(INF, RED, t(0));
        let tank = b.state_mut().add_unit(TANK, RED, t(0));
        b.submit_move(RED, &MoveOrder::load(vec![inf, tank], Route::step(t(0), t(4)), tr))
            .unwrap();
        assert_eq!(b.cargo_of(tr), vec![inf, tank]);
        assert_eq!(b.free_capacity(tr), 0);
        b.submit_move(RED, &MoveOrder::unload(vec![tr], Route::step(t(4), t(3))))
            .unwrap();
        assert_eq!(b.territory(t(3)).owner, Some(RED));
        assert!(b.cargo_of(tr).is_empty());
        assert_eq!(b.view(inf).unwrap().unit.territory, t(3));
        assert_eq!(b.view(tr).unwrap().unit.territory, t(4));
    }

    #[test]
    fn unload_names_the_transport_not_its_cargo() {
        let mut b = board();
        let tr = b.state_mut().add_unit(TRANSPORT, RED, t(4));
        let inf = b.state_mut().add_unit(INF, RED, t(0));
        let err = b.submit_move(RED, &MoveOrder::unload(vec![tr], Route::step(t(4), t(3))));
        assert_eq!(err, Err(HostRejection::NoCargo(tr)));
        b.submit_move(RED, &MoveOrder::load(vec![inf], Route::step(t(0), t(4)), tr))
            .unwrap();
        let err = b.submit_move(RED, &MoveOrder::unload(vec![inf], Route::step(t(4), t(3))));
        assert_eq!(err, Err(HostRejection::NoCargo(inf)));
    }

    #[test]
    fn load_rejects_overfull_transport() {
        let mut b = board();
        let tr = b.state_mut().add_unit(TRANSPORT, RED, t(4));
        let a = b.state_mut().add_unit(TANK, RED, t(0));
        let c = b.state_mut().add_unit(TANK, RED, t(0));
        let err = b.submit_move(RED, &MoveOrder::load(vec![a, c], Route::step(t(0), t(4)), tr));
        assert_eq!(err, Err(HostRejection::TransportFull(tr)));
    }

    #[test]
    fn fighter_flies_over_anything() {
        let mut b = board();
        let f = b.state_mut().add_unit(FIGHTER, RED, t(0));
        let route = Route::new(vec![t(0), t(4), t(3)]).unwrap();
        b.submit_move(RED, &MoveOrder::new(vec![f], route)).unwrap();
        // Air alone never captures.
        assert_eq!(b.territory(t(3)).owner, Some(BLUE));
    }

    #[test]
    fn purchase_respects_budget() {
        let mut b = board();
        b.set_budget(RED, 10);
        let mut buy = Purchase::new();
        buy.insert(TANK, 3);
        assert_eq!(
            b.submit_purchase(RED, &buy),
            Err(HostRejection::OverBudget { cost: 15, budget: 10 })
        );
        buy.insert(TANK, 2);
        b.submit_purchase(RED, &buy).unwrap();
        assert_eq!(b.budget(RED), 0);
        assert_eq!(b.pending_purchase(RED).get(&TANK), Some(&2));
    }

    #[test]
    fn placement_needs_purchase_and_capacity() {
        let mut b = board();
        b.set_budget(RED, 30);
        let mut buy = Purchase::new();
        buy.insert(INF, 3);
        b.submit_purchase(RED, &buy).unwrap();
        let too_many = Placement { territory: t(0), units: vec![INF, INF, INF] };
        assert!(matches!(
            b.submit_placement(RED, &too_many),
            Err(HostRejection::CapacityExceeded { capacity: 2, .. })
        ));
        let ok = Placement { territory: t(0), units: vec![INF, INF] };
        b.submit_placement(RED, &ok).unwrap();
        assert_eq!(b.placement_capacity(t(0)), 0);
        let wrong = Placement { territory: t(1), units: vec![INF] };
        assert_eq!(b.submit_placement(RED, &wrong), Err(HostRejection::NoFactory(t(1))));
    }

    #[test]
    fn sea_placement_uses_adjacent_factory() {
        let mut b = board();
        b.set_budget(RED, 7);
        let mut buy = Purchase::new();
        buy.insert(TRANSPORT, 1);
        b.submit_purchase(RED, &buy).unwrap();
        b.submit_placement(RED, &Placement { territory: t(4), units: vec![TRANSPORT] })
            .unwrap();
        assert_eq!(b.units_in(t(4)).len(), 1);
        assert_eq!(b.placement_capacity(t(0)), 1);
    }

    #[test]
    fn end_turn_collects_income() {
        let mut b = board();
        let inf = b.state_mut().add_unit(INF, RED, t(0));
        b.submit_move(RED, &MoveOrder::new(vec![inf], Route::step(t(0), t(1)))).unwrap();
        b.end_turn(RED);
        assert_eq!(b.budget(RED), 4);
        assert_eq!(b.view(inf).unwrap().unit.movement_left, 1);
    }
}
