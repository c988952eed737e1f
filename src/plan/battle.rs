//! Answers to the host's battle questions: which units to lose and whether
//! to retreat.

use std::cmp::Ordering;

use super::context::PlanningContext;
use crate::board::{TerritoryId, UnitId, UnitView};
use crate::host::BoardQuery;

/// Picks `count` casualties from `candidates`.
///
/// Units with a free hit absorb hits first, then transports when the rules
/// let them be chosen, then the units that contribute least to defense,
/// cheaper ones first on a tie. Hits left over after that kill the units
/// that absorbed one, so such a unit can appear twice: damaged, then lost.
/// Transports are never chosen when they cannot be casualties, so the
/// result is shorter than `count` only when nothing else can take a hit.
pub fn select_casualties<B: BoardQuery>(
    board: &B,
    ctx: &PlanningContext,
    candidates: &[UnitId],
    count: usize,
) -> Vec<UnitId> {
    let views: Vec<UnitView<'_>> = candidates.iter().filter_map(|&u| board.view(u)).collect();
    let sea = views
        .first()
        .is_some_and(|v| board.territory(v.unit.territory).is_water);
    let can_die = ctx.rules.transports_can_die;
    let value = |v: &UnitView<'_>| ctx.evaluator.evaluate(std::slice::from_ref(v), false, sea, can_die);

    let mut sturdy: Vec<&UnitView<'_>> = views.iter().filter(|v| v.has_spare_hit()).collect();
    sturdy.sort_by(|a, b| {
        value(a)
            .partial_cmp(&value(b))
            .unwrap_or(Ordering::Equal)
            .then(a.kind.cost.cmp(&b.kind.cost))
            .then(a.id().cmp(&b.id()))
    });
    let mut chosen: Vec<UnitId> = sturdy.iter().map(|v| v.id()).take(count).collect();
    let damaged = chosen.clone();

    if can_die {
        let room = count - chosen.len();
        let transports: Vec<UnitId> = views
            .iter()
            .filter(|v| v.kind.is_transport() && !v.has_spare_hit())
            .map(|v| v.id())
            .take(room)
            .collect();
        chosen.extend(transports);
    }

    let mut rest: Vec<&UnitView<'_>> = views
        .iter()
        .filter(|v| !v.kind.is_transport() && !v.has_spare_hit())
        .collect();
    rest.sort_by(|a, b| {
        value(a)
            .partial_cmp(&value(b))
            .unwrap_or(Ordering::Equal)
            .then(a.kind.cost.cmp(&b.kind.cost))
            .then(a.id().cmp(&b.id()))
    });
    let room = count - chosen.len();
    chosen.extend(rest.into_iter().take(room).map(|v| v.id()));

    let room = count - chosen.len();
    chosen.extend(damaged.into_iter().take(room));
    chosen
}

/// Decides whether the attack on `battle` should retreat, and where to.
///
/// Retreats when our remaining attack falls below the defense times the
/// retreat ratio, to the option the enemy threatens least. Returns `None`
/// to press on or when there is nowhere to go.
pub fn retreat_decision<B: BoardQuery>(
    board: &B,
    ctx: &PlanningContext,
    battle: TerritoryId,
    options: &[TerritoryId],
) -> Option<TerritoryId> {
    if options.is_empty() {
        return None;
    }
    let sea = board.territory(battle).is_water;
    let ours = board.owned_units(battle, ctx.player);
    let attack = ctx
        .evaluator
        .evaluate(&ours, true, sea, ctx.rules.transports_can_die);
    let defense = ctx.defense(board, battle);
    if attack >= defense * ctx.config.retreat_ratio {
        return None;
    }
    options
        .iter()
        .map(|&t| (ctx.threat(board, t), t))
        .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1)))
        .map(|(_, t)| t)
}
