//! Combat-move phases.

use tracing::{debug, info};

use super::{attempt, load_transports, ranked};
use crate::board::{MoveKind, MoveOrder, TerritoryId, UnitView};
use crate::host::BoardQuery;
use crate::plan::context::PlanningContext;
use crate::plan::ledger::CommitmentLedger;
use crate::plan::ranker::RankMode;
use crate::plan::recruit::{can_land_near, RecruitKind, Recruitment};
use crate::plan::PlanError;

/// Largest movement of any unit type.
fn max_reach<B: BoardQuery>(board: &B) -> u32 {
    board.unit_types().iter().map(|k| k.movement).max().unwrap_or(0)
}

/// True when at least one of our units sits within `reach` of `t`.
fn within_our_reach<B: BoardQuery>(board: &B, ctx: &PlanningContext, t: TerritoryId, reach: u32) -> bool {
    board
        .map()
        .neighbors_within(t, reach, |x| !board.territory(x).impassable)
        .into_iter()
        .any(|n| {
            board
                .owned_units(n, ctx.player)
                .iter()
                .any(|v| !v.kind.is_infrastructure && v.unit.movement_left > 0)
        })
}

/// True when a recruitment moves at least one land unit, directly or by
/// unloading a transport.
fn lands_troops<B: BoardQuery>(board: &B, got: &Recruitment) -> bool {
    got.orders.iter().any(|o| {
        o.kind == MoveKind::Unload
            || o.units
                .iter()
                .filter_map(|&u| board.view(u))
                .any(|v| v.kind.is_land())
    })
}

/// Attacks enemy fleets with warships and aircraft.
pub(super) fn sea_combat<B: BoardQuery>(
    board: &B,
    ctx: &mut PlanningContext,
    ledger: &mut CommitmentLedger,
) -> Result<Vec<MoveOrder>, PlanError> {
    let player = ctx.player;
    let reach = max_reach(board);
    let candidates: Vec<TerritoryId> = board
        .map()
        .territories()
        .iter()
        .filter(|t| t.is_water && board.has_enemy_units(t.id, player) && !board.battle_pending(t.id))
        .map(|t| t.id)
        .filter(|&t| within_our_reach(board, ctx, t, reach))
        .collect();
    let mut orders = Vec::new();
    for target in ranked(board, ctx, &candidates, RankMode::Attack)
        .into_iter()
        .take(ctx.config.max_attack_targets)
    {
        let need = ctx.required_strength(board, target);
        let kinds = [RecruitKind::Ships, RecruitKind::Air];
        if let Some(got) = attempt(board, ctx, ledger, target, need, &kinds, |_| true)? {
            info!(target = %board.territory(target).name, need, achieved = got.achieved, "sea attack");
            ctx.mark_attacked(target);
            orders.extend(got.orders);
        }
    }
    Ok(orders)
}

/// Loads troops onto transports that can reach the invasion target this
/// turn.
pub(super) fn transport_load<B: BoardQuery>(
    board: &B,
    ctx: &mut PlanningContext,
    ledger: &mut CommitmentLedger,
) -> Result<Vec<MoveOrder>, PlanError> {
    let Some(target) = ctx.amphibious_target else {
        return Ok(Vec::new());
    };
    let map = board.map();
    let landings: Vec<TerritoryId> = map
        .neighbors(target)
        .iter()
        .copied()
        .filter(|&z| board.territory(z).is_water)
        .collect();
    load_transports(board, ctx, ledger, |tr| {
        landings
            .iter()
            .any(|&z| map.sea_distance(tr.unit.territory, z) <= tr.unit.movement_left)
    })
}

/// Holds enough of the capital garrison in place to face the threat when
/// the capital is in danger.
pub(super) fn defend_capital<B: BoardQuery>(
    board: &B,
    ctx: &mut PlanningContext,
    ledger: &mut CommitmentLedger,
) -> Vec<MoveOrder> {
    let Some(capital) = ctx.capital.filter(|_| ctx.capital_danger && !ctx.capital_lost) else {
        return Vec::new();
    };
    let threat = ctx.threat(board, capital);
    let mut garrison: Vec<UnitView<'_>> = board
        .owned_units(capital, ctx.player)
        .into_iter()
        .filter(|v| !v.kind.is_infrastructure && !ledger.is_committed(v.id()))
        .collect();
    garrison.sort_by(|a, b| b.kind.defense.cmp(&a.kind.defense).then(a.id().cmp(&b.id())));

    let mut held: Vec<UnitView<'_>> = Vec::new();
    for v in garrison {
        if ctx.evaluator.evaluate(&held, false, false, ctx.rules.transports_can_die) >= threat {
            break;
        }
        if ledger.hold(v.id()) {
            held.push(v);
        }
    }
    debug!(held = held.len(), threat, "capital garrison held");
    Vec::new()
}

/// Lands troops on coastal enemy territory, supported by bombardment and
/// aircraft. The invasion target is tried first.
pub(super) fn amphibious_assault<B: BoardQuery>(
    board: &B,
    ctx: &mut PlanningContext,
    ledger: &mut CommitmentLedger,
) -> Result<Vec<MoveOrder>, PlanError> {
    let player = ctx.player;
    let map = board.map();
    let coastal: Vec<TerritoryId> = board
        .enemy_territories(player)
        .into_iter()
        .filter(|&e| map.is_coastal(e) && !ctx.attacked.contains(&e))
        .collect();
    let mut targets = ranked(board, ctx, &coastal, RankMode::Attack);
    if let Some(first) = ctx.amphibious_target {
        targets.retain(|&t| t != first);
        if coastal.contains(&first) {
            targets.insert(0, first);
        }
    }

    let mut orders = Vec::new();
    for target in targets.into_iter().take(ctx.config.max_attack_targets) {
        let need = ctx.required_strength(board, target);
        let kinds = [RecruitKind::Transports, RecruitKind::Bombard, RecruitKind::Air];
        let landed = |got: &Recruitment| got.orders.iter().any(|o| o.kind == MoveKind::Unload);
        if let Some(got) = attempt(board, ctx, ledger, target, need, &kinds, landed)? {
            info!(target = %board.territory(target).name, need, achieved = got.achieved, "amphibious assault");
            ctx.mark_attacked(target);
            orders.extend(got.orders);
        }
    }
    Ok(orders)
}

/// Attacks enemy land overland. Empty territory is taken by blitzers or
/// single land units; defended territory draws on everything in reach.
pub(super) fn land_combat<B: BoardQuery>(
    board: &B,
    ctx: &mut PlanningContext,
    ledger: &mut CommitmentLedger,
) -> Result<Vec<MoveOrder>, PlanError> {
    let player = ctx.player;
    let reach = max_reach(board);
    let candidates: Vec<TerritoryId> = board
        .enemy_territories(player)
        .into_iter()
        .filter(|&e| !ctx.attacked.contains(&e) && within_our_reach(board, ctx, e, reach))
        .collect();

    let mut orders = Vec::new();
    for target in ranked(board, ctx, &candidates, RankMode::Attack)
        .into_iter()
        .take(ctx.config.max_attack_targets)
    {
        let need = ctx.required_strength(board, target);
        let empty = ctx.defense(board, target) <= 0.0;
        let kinds: &[RecruitKind] = if empty {
            &[RecruitKind::Blitz, RecruitKind::Land]
        } else {
            &[RecruitKind::Blitz, RecruitKind::Transports, RecruitKind::Air, RecruitKind::Land]
        };
        if let Some(got) = attempt(board, ctx, ledger, target, need, kinds, |g| lands_troops(board, g))? {
            info!(target = %board.territory(target).name, need, achieved = got.achieved, "land attack");
            ctx.mark_attacked(target);
            orders.extend(got.orders);
        }
    }
    Ok(orders)
}

/// Sends idle strategic bombers against the most productive enemy factory
/// they can raid and still land afterwards.
pub(super) fn strategic_bombing<B: BoardQuery>(
    board: &B,
    ctx: &mut PlanningContext,
    ledger: &mut CommitmentLedger,
) -> Result<Vec<MoveOrder>, PlanError> {
    let player = ctx.player;
    let map = board.map();
    let factories: Vec<TerritoryId> = board
        .enemy_territories(player)
        .into_iter()
        .filter(|&t| board.territory(t).has_factory)
        .collect();
    if factories.is_empty() {
        return Ok(Vec::new());
    }

    let bombers: Vec<UnitView<'_>> = map
        .territories()
        .iter()
        .flat_map(|t| board.owned_units(t.id, player))
        .filter(|v| {
            v.kind.is_strategic_bomber
                && v.unit.movement_left > 0
                && !ledger.is_committed(v.id())
                && !board.battle_pending(v.unit.territory)
        })
        .collect();

    let mut orders = Vec::new();
    for bomber in bombers {
        let from = bomber.unit.territory;
        let left = bomber.unit.movement_left;
        let best = factories
            .iter()
            .filter_map(|&f| {
                let route = map.route(from, f, |x| !board.territory(x).impassable)?;
                let spare = left.checked_sub(route.len())?;
                can_land_near(board, player, f, spare).then_some(route)
            })
            .max_by(|a, b| {
                let pa = board.territory(a.end()).production;
                let pb = board.territory(b.end()).production;
                pa.cmp(&pb)
                    .then(b.len().cmp(&a.len()))
                    .then(b.end().cmp(&a.end()))
            });
        if let Some(route) = best {
            ledger.commit(bomber.id())?;
            debug!(bomber = bomber.id().0, target = %board.territory(route.end()).name, "bombing raid");
            orders.push(MoveOrder::new(vec![bomber.id()], route));
        }
    }
    Ok(orders)
}
