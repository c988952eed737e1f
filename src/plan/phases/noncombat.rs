//! Non-combat-move phases.
//!
//! Nothing moved here may end in hostile territory. These phases reinforce
//! what is threatened, stage the next invasion, push idle troops toward
//! the front and bring aircraft home.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::{landing_for, load_transports, ranked, safe_prefix};
use crate::board::{MoveOrder, Route, TerritoryId, UnitId, UnitView, UNREACHABLE};
use crate::host::BoardQuery;
use crate::plan::context::PlanningContext;
use crate::plan::ledger::CommitmentLedger;
use crate::plan::ranker::RankMode;
use crate::plan::recruit::{land_steps, ForceRecruiter, RecruitKind, StrengthTarget};
use crate::plan::PlanError;

/// Our units that may still make a non-combat move.
fn idle<'b, B: BoardQuery>(
    board: &'b B,
    ctx: &PlanningContext,
    ledger: &CommitmentLedger,
    t: TerritoryId,
) -> Vec<UnitView<'b>> {
    board
        .owned_units(t, ctx.player)
        .into_iter()
        .filter(|v| {
            !v.kind.is_infrastructure
                && !v.unit.moved_this_turn
                && v.unit.movement_left > 0
                && v.unit.transported_by.is_none()
                && !ledger.is_committed(v.id())
        })
        .collect()
}

/// Groups units by remaining movement so each group can share a route.
fn by_movement<'b>(units: Vec<UnitView<'b>>) -> BTreeMap<u32, Vec<UnitView<'b>>> {
    let mut groups: BTreeMap<u32, Vec<UnitView<'b>>> = BTreeMap::new();
    for v in units {
        groups.entry(v.unit.movement_left).or_default().push(v);
    }
    groups
}

fn ids(units: &[UnitView<'_>]) -> Vec<UnitId> {
    units.iter().map(|v| v.id()).collect()
}

fn water_zones<B: BoardQuery>(board: &B) -> Vec<TerritoryId> {
    board.map().territories().iter().filter(|t| t.is_water).map(|t| t.id).collect()
}

/// Loads troops for next turn's invasion.
pub(super) fn transport_load<B: BoardQuery>(
    board: &B,
    ctx: &mut PlanningContext,
    ledger: &mut CommitmentLedger,
) -> Result<Vec<MoveOrder>, PlanError> {
    if ctx.amphibious_target.is_none() {
        return Ok(Vec::new());
    }
    load_transports(board, ctx, ledger, |tr| !tr.unit.moved_this_turn)
}

/// Reinforces a threatened capital and keeps its garrison in place.
pub(super) fn defend_capital<B: BoardQuery>(
    board: &B,
    ctx: &mut PlanningContext,
    ledger: &mut CommitmentLedger,
) -> Result<Vec<MoveOrder>, PlanError> {
    let Some(capital) = ctx.capital.filter(|_| ctx.capital_danger && !ctx.capital_lost) else {
        return Ok(Vec::new());
    };
    let need = ctx.threat(board, capital) - ctx.garrison(board, capital);
    let target = StrengthTarget::new(capital, need);
    let got = ForceRecruiter::new(board, ctx).recruit_chain(
        &target,
        &[RecruitKind::Land, RecruitKind::Transports, RecruitKind::Air],
        ledger,
    )?;
    let mut held = 0;
    for v in board.owned_units(capital, ctx.player) {
        if !v.kind.is_infrastructure && ledger.hold(v.id()) {
            held += 1;
        }
    }
    debug!(need, achieved = got.achieved, held, "capital reinforced");
    Ok(got.orders)
}

/// The sea zone the fleet should gather in: next to the invasion target if
/// there is one, otherwise the most threatened zone off our capital.
fn fleet_station<B: BoardQuery>(board: &B, ctx: &PlanningContext) -> Option<TerritoryId> {
    if let Some(route) = &ctx.amphibious_route {
        return Some(route.end());
    }
    let home = ctx.capital.filter(|_| !ctx.capital_lost).or_else(|| ctx.factories.first().copied())?;
    board
        .map()
        .neighbors(home)
        .iter()
        .copied()
        .filter(|&z| board.territory(z).is_water && !board.has_enemy_units(z, ctx.player))
        .map(|z| (ctx.threat(board, z), z))
        .max_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.1.cmp(&a.1))
        })
        .map(|(_, z)| z)
}

/// Moves idle warships toward the fleet station, stopping short of zones
/// they could not hold.
pub(super) fn naval_reposition<B: BoardQuery>(
    board: &B,
    ctx: &mut PlanningContext,
    ledger: &mut CommitmentLedger,
) -> Result<Vec<MoveOrder>, PlanError> {
    let Some(station) = fleet_station(board, ctx) else {
        return Ok(Vec::new());
    };
    let player = ctx.player;
    let map = board.map();
    let mut orders = Vec::new();
    for zone in water_zones(board) {
        if zone == station || board.battle_pending(zone) {
            continue;
        }
        let ships: Vec<UnitView<'_>> = idle(board, ctx, ledger, zone)
            .into_iter()
            .filter(|v| v.kind.is_sea() && !v.kind.is_transport())
            .collect();
        if ships.is_empty() {
            continue;
        }
        let Some(full) = map.route(zone, station, |t| board.territory(t).is_water && !board.has_enemy_units(t, player))
        else {
            continue;
        };
        for (movement, group) in by_movement(ships) {
            let Some(route) = safe_prefix(board, ctx, &full.truncated(movement), &group) else {
                continue;
            };
            let units = ids(&group);
            ledger.commit_all(&units)?;
            debug!(from = zone.0, to = route.end().0, ships = units.len(), "fleet repositioned");
            orders.push(MoveOrder::new(units, route));
        }
    }
    Ok(orders)
}

/// Sails loaded transports toward the zone next to the invasion target.
pub(super) fn amphibious_reinforce<B: BoardQuery>(
    board: &B,
    ctx: &mut PlanningContext,
    ledger: &mut CommitmentLedger,
) -> Result<Vec<MoveOrder>, PlanError> {
    let Some(landing) = ctx.amphibious_route.as_ref().map(Route::end) else {
        return Ok(Vec::new());
    };
    let player = ctx.player;
    let map = board.map();
    let mut orders = Vec::new();
    for zone in water_zones(board) {
        if zone == landing || board.battle_pending(zone) {
            continue;
        }
        for tr in idle(board, ctx, ledger, zone) {
            if !tr.kind.is_transport() || board.cargo_of(tr.id()).is_empty() {
                continue;
            }
            let Some(full) = map.route(zone, landing, |t| board.territory(t).is_water && !board.has_enemy_units(t, player))
            else {
                continue;
            };
            let Some(route) = safe_prefix(board, ctx, &full.truncated(tr.unit.movement_left), &[tr]) else {
                continue;
            };
            let mut group = vec![tr.id()];
            group.extend(
                board
                    .cargo_of(tr.id())
                    .into_iter()
                    .filter(|&c| !ledger.is_committed(c)),
            );
            ledger.commit_all(&group)?;
            orders.push(MoveOrder::new(vec![tr.id()], route));
        }
    }
    Ok(orders)
}

/// Our land that aircraft may end the turn in, ranked for defense.
fn air_bases<B: BoardQuery>(board: &B, ctx: &PlanningContext) -> Vec<TerritoryId> {
    let own: Vec<TerritoryId> = board
        .territories_of(ctx.player)
        .into_iter()
        .filter(|&t| board.is_friendly_land(t, ctx.player) && !board.conquered_this_turn(t))
        .collect();
    ranked(board, ctx, &own, RankMode::Defend)
}

/// Moves idle aircraft to the best-ranked base they can reach.
pub(super) fn air_reposition<B: BoardQuery>(
    board: &B,
    ctx: &mut PlanningContext,
    ledger: &mut CommitmentLedger,
) -> Result<Vec<MoveOrder>, PlanError> {
    let bases = air_bases(board, ctx);
    if bases.is_empty() {
        return Ok(Vec::new());
    }
    let map = board.map();
    let mut orders = Vec::new();
    for &from in &bases {
        let planes: Vec<UnitView<'_>> = idle(board, ctx, ledger, from)
            .into_iter()
            .filter(|v| v.kind.is_air())
            .collect();
        for (movement, group) in by_movement(planes) {
            let best = bases.iter().find_map(|&b| {
                if b == from {
                    return Some(None);
                }
                let route = map.route(from, b, |x| !board.territory(x).impassable)?;
                (route.len() <= movement).then_some(Some(route))
            });
            let units = ids(&group);
            match best.flatten() {
                Some(route) => {
                    ledger.commit_all(&units)?;
                    orders.push(MoveOrder::new(units, route));
                }
                None => {
                    for u in units {
                        ledger.hold(u);
                    }
                }
            }
        }
    }
    Ok(orders)
}

/// Reinforces threatened territory, ours or an ally's, then walks idle
/// rear troops toward the nearest enemy.
pub(super) fn consolidation<B: BoardQuery>(
    board: &B,
    ctx: &mut PlanningContext,
    ledger: &mut CommitmentLedger,
) -> Result<Vec<MoveOrder>, PlanError> {
    let player = ctx.player;
    let map = board.map();
    let own: Vec<TerritoryId> = board
        .territories_of(player)
        .into_iter()
        .filter(|&t| board.is_friendly_land(t, player))
        .collect();
    let friendly: Vec<TerritoryId> = map
        .territories()
        .iter()
        .filter(|t| board.is_friendly_land(t.id, player))
        .map(|t| t.id)
        .collect();
    let gaps: BTreeMap<TerritoryId, f32> = friendly
        .iter()
        .map(|&t| (t, ctx.threat(board, t) - ctx.garrison(board, t)))
        .filter(|&(_, gap)| gap > 0.0)
        .collect();
    let threatened: BTreeSet<TerritoryId> = gaps.keys().copied().collect();

    let mut orders = Vec::new();
    let candidates: Vec<TerritoryId> = threatened.iter().copied().collect();
    for t in ranked(board, ctx, &candidates, RankMode::Defend)
        .into_iter()
        .take(ctx.config.max_attack_targets)
    {
        let need = gaps.get(&t).copied().unwrap_or(0.0);
        let target = StrengthTarget::new(t, need).excluding(&threatened);
        let got = ForceRecruiter::new(board, ctx).recruit_chain(
            &target,
            &[RecruitKind::Land, RecruitKind::Transports],
            ledger,
        )?;
        orders.extend(got.orders);
    }

    let enemy_land = board.enemy_territories(player);
    for &from in &own {
        if threatened.contains(&from) || ctx.threat(board, from) > 0.0 {
            continue;
        }
        let troops: Vec<UnitView<'_>> = idle(board, ctx, ledger, from)
            .into_iter()
            .filter(|v| v.kind.is_land())
            .collect();
        if troops.is_empty() {
            continue;
        }
        let Some(front) = enemy_land
            .iter()
            .copied()
            .filter_map(|e| land_steps(board, from, e).map(|d| (d, e)))
            .min()
            .map(|(_, e)| e)
        else {
            continue;
        };
        let Some(full) = map.route(from, front, |t| {
            t == front || (board.is_friendly_land(t, player) && !board.has_enemy_units(t, player))
        }) else {
            continue;
        };
        for (movement, group) in by_movement(troops) {
            let steps = movement.min(full.len().saturating_sub(1));
            if steps == 0 {
                continue;
            }
            let units = ids(&group);
            ledger.commit_all(&units)?;
            orders.push(MoveOrder::new(units, full.truncated(steps)));
        }
    }
    Ok(orders)
}

/// Fills empty friendly territory that enemy blitzers could drive through
/// with a single cheap unit.
pub(super) fn blitz_block<B: BoardQuery>(
    board: &B,
    ctx: &mut PlanningContext,
    ledger: &mut CommitmentLedger,
) -> Result<Vec<MoveOrder>, PlanError> {
    let player = ctx.player;
    let map = board.map();
    let mut orders = Vec::new();
    for gap in board.territories_of(player) {
        if !board.is_friendly_land(gap, player) || !board.allied_units(gap, player).is_empty() {
            continue;
        }
        let exposed = map.neighbors(gap).iter().any(|&n| {
            board
                .enemy_units(n, player)
                .iter()
                .any(|v| v.kind.can_blitz && v.kind.is_land())
        });
        let shields = map
            .neighbors(gap)
            .iter()
            .any(|&n| board.is_friendly_land(n, player));
        if !exposed || !shields {
            continue;
        }
        let blocker = map
            .neighbors(gap)
            .iter()
            .copied()
            .filter(|&n| board.is_friendly_land(n, player))
            .flat_map(|n| {
                let pool = idle(board, ctx, ledger, n);
                let spare = pool.len() > 1 || board.owned_units(n, player).len() > pool.len();
                pool.into_iter()
                    .filter(move |v| spare && v.kind.is_land())
                    .map(move |v| (v.kind.cost, v.id(), n))
            })
            .min();
        if let Some((_, unit, from)) = blocker {
            ledger.commit(unit)?;
            debug!(territory = %board.territory(gap).name, unit = unit.0, "blitz block");
            orders.push(MoveOrder::new(vec![unit], Route::step(from, gap)));
        }
    }
    Ok(orders)
}

/// True when an aircraft may end the turn where it is.
fn may_stay<B: BoardQuery>(board: &B, ctx: &PlanningContext, unit: &UnitView<'_>) -> bool {
    let t = unit.unit.territory;
    if board.territory(t).is_water {
        return unit.kind.is_carrier_borne()
            && board
                .allied_units(t, ctx.player)
                .iter()
                .any(|v| v.kind.is_carrier());
    }
    board.is_friendly_land(t, ctx.player) && !board.conquered_this_turn(t)
}

/// Brings aircraft that fought this turn back to somewhere they can land.
pub(super) fn air_landing<B: BoardQuery>(
    board: &B,
    ctx: &mut PlanningContext,
    ledger: &mut CommitmentLedger,
) -> Result<Vec<MoveOrder>, PlanError> {
    let map = board.map();
    let mut orders = Vec::new();
    for terr in map.territories() {
        for plane in board.owned_units(terr.id, ctx.player) {
            if !plane.kind.is_air() || ledger.is_committed(plane.id()) || may_stay(board, ctx, &plane) {
                continue;
            }
            match landing_for(board, ctx, &plane) {
                Some(route) if !route.is_empty() => {
                    ledger.commit(plane.id())?;
                    orders.push(MoveOrder::new(vec![plane.id()], route));
                }
                _ => debug!(unit = plane.id().0, "aircraft cannot land"),
            }
        }
    }
    Ok(orders)
}

/// Puts cargo ashore. While an invasion is being staged, transports only
/// unload onto a beachhead next to the target. Transports that already
/// sailed or took on cargo this epoch keep it aboard.
pub(super) fn transport_unload<B: BoardQuery>(
    board: &B,
    ctx: &mut PlanningContext,
    ledger: &mut CommitmentLedger,
) -> Result<Vec<MoveOrder>, PlanError> {
    let player = ctx.player;
    let map = board.map();
    let shores: Vec<TerritoryId> = board
        .territories_of(player)
        .into_iter()
        .filter(|&t| board.is_friendly_land(t, player) && map.is_coastal(t))
        .collect();
    let ranking = ranked(board, ctx, &shores, RankMode::Defend);

    let mut orders = Vec::new();
    for zone in water_zones(board) {
        for tr in board.owned_units(zone, player) {
            if !tr.kind.is_transport()
                || ledger.is_committed(tr.id())
                || !ledger.embarked(tr.id()).is_empty()
            {
                continue;
            }
            let cargo: Vec<UnitId> = board
                .cargo_of(tr.id())
                .into_iter()
                .filter(|&c| !ledger.is_committed(c))
                .collect();
            if cargo.is_empty() {
                continue;
            }
            let beachhead = |t: TerritoryId| {
                ctx.amphibious_target.map_or(true, |target| {
                    map.is_adjacent(t, target) || map.land_distance(t, target) != UNREACHABLE
                })
            };
            let dest = ranking
                .iter()
                .copied()
                .find(|&t| map.is_adjacent(zone, t) && beachhead(t));
            if let Some(dest) = dest {
                let mut group = vec![tr.id()];
                group.extend(cargo);
                ledger.commit_all(&group)?;
                orders.push(MoveOrder::unload(vec![tr.id()], Route::step(zone, dest)));
            }
        }
    }
    Ok(orders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardState, Domain, GameMap, MoveKind, Player, PlayerId, RuleSet, Territory, UnitType, UnitTypeId};
    use crate::config::PlannerConfig;
    use crate::plan::ledger::Epoch;

    const RED: PlayerId = PlayerId(0);
    const BLUE: PlayerId = PlayerId(1);
    const GREEN: PlayerId = PlayerId(2);
    const INF: UnitTypeId = UnitTypeId(0);
    const TANK: UnitTypeId = UnitTypeId(1);
    const FIGHTER: UnitTypeId = UnitTypeId(2);
    const TRANSPORT: UnitTypeId = UnitTypeId(3);

    fn t(i: u16) -> TerritoryId {
        TerritoryId(i)
    }

    fn types() -> Vec<UnitType> {
        vec![
            UnitType { id: INF, name: "infantry".into(), attack: 1, defense: 2, cost: 3, transport_cost: 2, ..UnitType::default() },
            UnitType { id: TANK, name: "tank".into(), attack: 3, defense: 3, movement: 2, cost: 5, transport_cost: 3, can_blitz: true, ..UnitType::default() },
            UnitType { id: FIGHTER, name: "fighter".into(), domain: Domain::Air, attack: 3, defense: 4, movement: 4, cost: 10, ..UnitType::default() },
            UnitType { id: TRANSPORT, name: "transport".into(), domain: Domain::Sea, defense: 1, movement: 2, cost: 7, transport_capacity: 5, ..UnitType::default() },
        ]
    }

    /// Red land `0`..`3` in a line, capital `0`; Blue holds `4` at the end.
    /// Sea `5` touches `0` and `1`.
    fn board() -> BoardState {
        let mut terrs = Vec::new();
        for i in 0..5u16 {
            let mut terr = Territory::land(t(i), format!("L{i}"));
            terr.owner = Some(if i < 4 { RED } else { BLUE });
            terr.production = 1;
            terrs.push(terr);
        }
        terrs[0].has_factory = true;
        terrs.push(Territory::sea(t(5), "S5"));
        let mut map = GameMap::new(terrs);
        for i in 0..4u16 {
            map.connect(t(i), t(i + 1));
        }
        map.connect(t(0), t(5));
        map.connect(t(1), t(5));
        let players = vec![
            Player { id: RED, name: "Red".into(), team: 0, capital: Some(t(0)) },
            Player { id: BLUE, name: "Blue".into(), team: 1, capital: Some(t(4)) },
        ];
        BoardState::new(map, players, types(), RuleSet::default())
    }

    /// The same line with `3` held by Green, Red's ally.
    fn allied_board() -> BoardState {
        let mut b = board();
        b.map.territory_mut(t(3)).owner = Some(GREEN);
        b.players.push(Player { id: GREEN, name: "Green".into(), team: 0, capital: None });
        b.budgets.push(0);
        b
    }

    fn ctx(b: &BoardState) -> PlanningContext {
        PlanningContext::build(b, RED, &PlannerConfig::default())
    }

    #[test]
    fn rear_troops_march_to_front() {
        let mut b = board();
        let inf = b.add_unit(INF, RED, t(0));
        let mut ctx = ctx(&b);
        let mut ledger = CommitmentLedger::new(Epoch::NonCombat);
        let orders = consolidation(&b, &mut ctx, &mut ledger).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].units, vec![inf]);
        assert_eq!(orders[0].route.territories(), &[t(0), t(1)]);
    }

    #[test]
    fn troops_next_to_enemy_stay() {
        let mut b = board();
        b.add_unit(INF, RED, t(3));
        let mut ctx = ctx(&b);
        let mut ledger = CommitmentLedger::new(Epoch::NonCombat);
        assert!(consolidation(&b, &mut ctx, &mut ledger).unwrap().is_empty());
    }

    #[test]
    fn threatened_territory_gets_reinforced() {
        let mut b = board();
        b.add_unit(TANK, BLUE, t(4));
        b.add_unit(INF, RED, t(3));
        let helper = b.add_unit(INF, RED, t(2));
        let mut ctx = ctx(&b);
        let mut ledger = CommitmentLedger::new(Epoch::NonCombat);
        let orders = consolidation(&b, &mut ctx, &mut ledger).unwrap();
        assert!(orders.iter().any(|o| o.units.contains(&helper) && o.route.end() == t(3)));
    }

    #[test]
    fn threatened_ally_gets_reinforced() {
        let mut b = allied_board();
        b.add_unit(TANK, BLUE, t(4));
        b.add_unit(INF, GREEN, t(3));
        let helper = b.add_unit(INF, RED, t(2));
        let mut ctx = ctx(&b);
        let mut ledger = CommitmentLedger::new(Epoch::NonCombat);
        let orders = consolidation(&b, &mut ctx, &mut ledger).unwrap();
        assert!(orders.iter().any(|o| o.units.contains(&helper) && o.route.end() == t(3)));
    }

    #[test]
    fn fighter_over_enemy_returns_home() {
        let mut b = board();
        let fighter = b.add_unit(FIGHTER, RED, t(4));
        {
            let u = b.unit_mut(fighter).unwrap();
            u.movement_left = 2;
            u.moved_this_turn = true;
        }
        let mut ctx = ctx(&b);
        let mut ledger = CommitmentLedger::new(Epoch::NonCombat);
        let orders = air_landing(&b, &mut ctx, &mut ledger).unwrap();
        assert_eq!(orders.len(), 1);
        let end = orders[0].route.end();
        assert!(end == t(3) || end == t(2));
        assert!(orders[0].route.len() <= 2);
    }

    #[test]
    fn cargo_goes_ashore_without_invasion() {
        let mut b = board();
        let tr = b.add_unit(TRANSPORT, RED, t(5));
        let inf = b.add_unit(INF, RED, t(5));
        b.unit_mut(inf).unwrap().transported_by = Some(tr);
        let mut ctx = ctx(&b);
        assert_eq!(ctx.amphibious_target, None);
        let mut ledger = CommitmentLedger::new(Epoch::NonCombat);
        let orders = transport_unload(&b, &mut ctx, &mut ledger).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].kind, MoveKind::Unload);
        assert_eq!(orders[0].units, vec![tr]);
        assert_eq!(orders[0].route.start(), t(5));
        assert!(ledger.is_committed(tr) && ledger.is_committed(inf));
    }

    #[test]
    fn freshly_loaded_transport_keeps_its_cargo() {
        let mut b = board();
        let tr = b.add_unit(TRANSPORT, RED, t(5));
        let inf = b.add_unit(INF, RED, t(5));
        b.unit_mut(inf).unwrap().transported_by = Some(tr);
        let mut ctx = ctx(&b);
        let mut ledger = CommitmentLedger::new(Epoch::NonCombat);
        ledger.embark(tr, &[inf]).unwrap();
        assert!(transport_unload(&b, &mut ctx, &mut ledger).unwrap().is_empty());
        assert!(!ledger.is_committed(tr));
    }

    #[test]
    fn empty_gap_blocked_against_blitz() {
        let mut b = board();
        b.add_unit(TANK, BLUE, t(4));
        let a = b.add_unit(INF, RED, t(2));
        b.add_unit(INF, RED, t(2));
        let mut ctx = ctx(&b);
        let mut ledger = CommitmentLedger::new(Epoch::NonCombat);
        let orders = blitz_block(&b, &mut ctx, &mut ledger).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].units, vec![a]);
        assert_eq!(orders[0].route.territories(), &[t(2), t(3)]);
    }
}
