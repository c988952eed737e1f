//! Placement of purchased units.

use std::collections::BTreeMap;

use tracing::debug;

use super::context::PlanningContext;
use super::ranker::{RankMode, TerritoryRanker};
use crate::board::{Placement, Purchase, TerritoryId, UnitTypeId};
use crate::host::BoardQuery;

/// Decides where the bought units go.
///
/// Land and air units go to the capital while it is in danger, otherwise
/// to the factory that ranks highest for defense, spilling over to the
/// next factory when one is full. Ships go to the least threatened sea
/// zone next to a coastal factory. Units that fit nowhere are left out.
pub fn plan_placements<B: BoardQuery>(board: &B, ctx: &PlanningContext, bought: &Purchase) -> Vec<Placement> {
    let player = ctx.player;
    let map = board.map();
    let factories: Vec<TerritoryId> = ctx
        .factories
        .iter()
        .copied()
        .filter(|&f| board.is_friendly_land(f, player) && !board.conquered_this_turn(f))
        .collect();
    let mut order: Vec<TerritoryId> = TerritoryRanker::new(board, ctx)
        .rank(&factories, RankMode::Defend)
        .into_iter()
        .map(|r| r.territory)
        .collect();
    if let Some(capital) = ctx.capital.filter(|c| ctx.capital_danger && order.contains(c)) {
        order.retain(|&f| f != capital);
        order.insert(0, capital);
    }

    let mut room: BTreeMap<TerritoryId, u32> = order
        .iter()
        .map(|&f| (f, board.placement_capacity(f)))
        .collect();
    let mut plan: BTreeMap<TerritoryId, Vec<UnitTypeId>> = BTreeMap::new();

    let units: Vec<UnitTypeId> = bought
        .iter()
        .flat_map(|(&ty, &qty)| std::iter::repeat(ty).take(qty as usize))
        .collect();
    let (ships, others): (Vec<UnitTypeId>, Vec<UnitTypeId>) =
        units.into_iter().partition(|&ty| board.unit_type(ty).is_sea());

    for ty in others {
        let Some(&f) = order.iter().find(|f| room.get(f).copied().unwrap_or(0) > 0) else {
            debug!(unit = ty.0, "no factory room");
            break;
        };
        if let Some(r) = room.get_mut(&f) {
            *r -= 1;
        }
        plan.entry(f).or_default().push(ty);
    }

    for ty in ships {
        let spot = order
            .iter()
            .copied()
            .filter(|f| room.get(f).copied().unwrap_or(0) > 0)
            .find_map(|f| {
                map.neighbors(f)
                    .iter()
                    .copied()
                    .filter(|&z| board.territory(z).is_water && !board.has_enemy_units(z, player))
                    .map(|z| (ctx.threat(board, z), z))
                    .min_by(|a, b| {
                        a.0.partial_cmp(&b.0)
                            .unwrap_or(std::cmp::Ordering::Equal)
                            .then(a.1.cmp(&b.1))
                    })
                    .map(|(_, z)| (f, z))
            });
        let Some((f, zone)) = spot else {
            debug!(unit = ty.0, "no sea zone for ship");
            break;
        };
        if let Some(r) = room.get_mut(&f) {
            *r -= 1;
        }
        plan.entry(zone).or_default().push(ty);
    }

    plan.into_iter()
        .map(|(territory, units)| Placement { territory, units })
        .collect()
}
