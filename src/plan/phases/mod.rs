//! The named planning phases of a turn.
//!
//! Each phase reads the board, ranks objectives, recruits against them and
//! returns the move orders it wants submitted. The sequencer submits a
//! phase's orders before running the next phase, so every phase plans
//! against the board as the previous ones left it.

mod combat;
mod noncombat;

use std::fmt;

use tracing::debug;

use super::context::PlanningContext;
use super::ledger::{CommitmentLedger, Epoch};
use super::ranker::{RankMode, TerritoryRanker};
use super::recruit::{can_land_near, ForceRecruiter, RecruitKind, Recruitment, StrengthTarget};
use super::PlanError;
use crate::board::{MoveOrder, Route, TerritoryId, UnitView};
use crate::host::BoardQuery;

/// A named step of the move plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    SeaCombat,
    TransportLoad,
    DefendCapital,
    AmphibiousAssault,
    LandCombat,
    StrategicBombing,
    NavalReposition,
    AmphibiousReinforce,
    AirReposition,
    Consolidation,
    BlitzBlock,
    AirLanding,
    TransportUnload,
}

/// Combat-move phases, in execution order.
pub const COMBAT_PHASES: [Phase; 6] = [
    Phase::SeaCombat,
    Phase::TransportLoad,
    Phase::DefendCapital,
    Phase::AmphibiousAssault,
    Phase::LandCombat,
    Phase::StrategicBombing,
];

/// Non-combat-move phases, in execution order.
pub const NONCOMBAT_PHASES: [Phase; 9] = [
    Phase::TransportLoad,
    Phase::DefendCapital,
    Phase::NavalReposition,
    Phase::AmphibiousReinforce,
    Phase::AirReposition,
    Phase::Consolidation,
    Phase::BlitzBlock,
    Phase::AirLanding,
    Phase::TransportUnload,
];

impl Phase {
    /// The phases of an epoch, in order.
    pub fn sequence(epoch: Epoch) -> &'static [Phase] {
        match epoch {
            Epoch::Combat => &COMBAT_PHASES,
            Epoch::NonCombat => &NONCOMBAT_PHASES,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::SeaCombat => "sea-combat",
            Phase::TransportLoad => "transport-load",
            Phase::DefendCapital => "defend-capital",
            Phase::AmphibiousAssault => "amphibious-assault",
            Phase::LandCombat => "land-combat",
            Phase::StrategicBombing => "strategic-bombing",
            Phase::NavalReposition => "naval-reposition",
            Phase::AmphibiousReinforce => "amphibious-reinforce",
            Phase::AirReposition => "air-reposition",
            Phase::Consolidation => "consolidation",
            Phase::BlitzBlock => "blitz-block",
            Phase::AirLanding => "air-landing",
            Phase::TransportUnload => "transport-unload",
        }
    }

    /// Plans this phase for the epoch the ledger is in.
    ///
    /// Returns the orders to submit, in submission order. A phase with
    /// nothing to do returns an empty list.
    pub fn plan<B: BoardQuery>(
        self,
        board: &B,
        ctx: &mut PlanningContext,
        ledger: &mut CommitmentLedger,
    ) -> Result<Vec<MoveOrder>, PlanError> {
        let orders = match (ledger.epoch(), self) {
            (Epoch::Combat, Phase::SeaCombat) => combat::sea_combat(board, ctx, ledger)?,
            (Epoch::Combat, Phase::TransportLoad) => combat::transport_load(board, ctx, ledger)?,
            (Epoch::Combat, Phase::DefendCapital) => combat::defend_capital(board, ctx, ledger),
            (Epoch::Combat, Phase::AmphibiousAssault) => combat::amphibious_assault(board, ctx, ledger)?,
            (Epoch::Combat, Phase::LandCombat) => combat::land_combat(board, ctx, ledger)?,
            (Epoch::Combat, Phase::StrategicBombing) => combat::strategic_bombing(board, ctx, ledger)?,
            (Epoch::NonCombat, Phase::TransportLoad) => noncombat::transport_load(board, ctx, ledger)?,
            (Epoch::NonCombat, Phase::DefendCapital) => noncombat::defend_capital(board, ctx, ledger)?,
            (Epoch::NonCombat, Phase::NavalReposition) => noncombat::naval_reposition(board, ctx, ledger)?,
            (Epoch::NonCombat, Phase::AmphibiousReinforce) => {
                noncombat::amphibious_reinforce(board, ctx, ledger)?
            }
            (Epoch::NonCombat, Phase::AirReposition) => noncombat::air_reposition(board, ctx, ledger)?,
            (Epoch::NonCombat, Phase::Consolidation) => noncombat::consolidation(board, ctx, ledger)?,
            (Epoch::NonCombat, Phase::BlitzBlock) => noncombat::blitz_block(board, ctx, ledger)?,
            (Epoch::NonCombat, Phase::AirLanding) => noncombat::air_landing(board, ctx, ledger)?,
            (Epoch::NonCombat, Phase::TransportUnload) => noncombat::transport_unload(board, ctx, ledger)?,
            _ => Vec::new(),
        };
        debug!(phase = self.name(), orders = orders.len(), "phase planned");
        Ok(orders)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ranks `candidates` and returns the territories best first.
fn ranked<B: BoardQuery>(
    board: &B,
    ctx: &PlanningContext,
    candidates: &[TerritoryId],
    mode: RankMode,
) -> Vec<TerritoryId> {
    TerritoryRanker::new(board, ctx)
        .rank(candidates, mode)
        .into_iter()
        .map(|r| r.territory)
        .collect()
}

/// Tries to assemble `need` against `objective` on a forked ledger.
///
/// The fork is absorbed only when the full requirement is met and `accept`
/// approves the force; otherwise it is dropped and every unit it took
/// stays available.
fn attempt<B, F>(
    board: &B,
    ctx: &PlanningContext,
    ledger: &mut CommitmentLedger,
    objective: TerritoryId,
    need: f32,
    kinds: &[RecruitKind],
    accept: F,
) -> Result<Option<Recruitment>, PlanError>
where
    B: BoardQuery,
    F: Fn(&Recruitment) -> bool,
{
    let target = StrengthTarget::new(objective, need).excluding(&ctx.attacked);
    let mut fork = ledger.fork();
    let got = ForceRecruiter::new(board, ctx).recruit_chain(&target, kinds, &mut fork)?;
    if got.is_empty() || got.achieved < need || !accept(&got) {
        debug!(
            objective = %board.territory(objective).name,
            need,
            achieved = got.achieved,
            "objective abandoned"
        );
        return Ok(None);
    }
    ledger.absorb(fork)?;
    Ok(Some(got))
}

/// Nearest territory `unit` can land in with its remaining movement,
/// preferring the least threatened. The route avoids impassable terrain.
fn landing_for<B: BoardQuery>(
    board: &B,
    ctx: &PlanningContext,
    unit: &UnitView<'_>,
) -> Option<Route> {
    let map = board.map();
    let from = unit.unit.territory;
    let left = unit.unit.movement_left;
    if !can_land_near(board, ctx.player, from, left) {
        return None;
    }
    let landable = |l: TerritoryId| board.is_friendly_land(l, ctx.player) && !board.conquered_this_turn(l);
    let mut spots: Vec<TerritoryId> = vec![from];
    spots.extend(map.neighbors_within(from, left, |x| !board.territory(x).impassable));
    spots
        .into_iter()
        .filter(|&l| landable(l))
        .filter_map(|l| {
            let route = map.route(from, l, |x| !board.territory(x).impassable)?;
            (route.len() <= left).then(|| (ctx.threat(board, l), route))
        })
        .min_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.len().cmp(&b.1.len()))
                .then(a.1.end().cmp(&b.1.end()))
        })
        .map(|(_, route)| route)
}

/// Loads land units from friendly shores onto transports with room left.
///
/// Only transports for which `worth_loading` holds take cargo. Threatened
/// shores keep one unit behind, and the capital is not emptied while it
/// is in danger. The cargo embarks in the ledger; the transport stays free
/// for the phase that sails it, whose order lands the cargo too.
fn load_transports<B, F>(
    board: &B,
    ctx: &PlanningContext,
    ledger: &mut CommitmentLedger,
    worth_loading: F,
) -> Result<Vec<MoveOrder>, PlanError>
where
    B: BoardQuery,
    F: Fn(&UnitView<'_>) -> bool,
{
    let player = ctx.player;
    let map = board.map();
    let noncombat = ledger.epoch() == Epoch::NonCombat;
    let mut orders = Vec::new();

    let zones: Vec<TerritoryId> = map.territories().iter().filter(|t| t.is_water).map(|t| t.id).collect();
    for zone in zones {
        if board.battle_pending(zone) || board.has_enemy_units(zone, player) {
            continue;
        }
        for tr in board.owned_units(zone, player) {
            if !tr.kind.is_transport() || ledger.is_committed(tr.id()) || !worth_loading(&tr) {
                continue;
            }
            let mut room = board.free_capacity(tr.id());
            for &shore in map.neighbors(zone) {
                if room == 0 {
                    break;
                }
                if !board.is_friendly_land(shore, player)
                    || ctx.attacked.contains(&shore)
                    || board.battle_pending(shore)
                    || (ctx.capital_danger && ctx.capital == Some(shore))
                {
                    continue;
                }
                let mut cargo: Vec<UnitView<'_>> = board
                    .owned_units(shore, player)
                    .into_iter()
                    .filter(|v| {
                        v.kind.can_be_transported()
                            && v.unit.transported_by.is_none()
                            && v.unit.movement_left > 0
                            && !(noncombat && v.unit.moved_this_turn)
                            && !ledger.is_committed(v.id())
                    })
                    .collect();
                cargo.sort_by(|a, b| {
                    b.kind
                        .attack
                        .cmp(&a.kind.attack)
                        .then(a.kind.transport_cost.cmp(&b.kind.transport_cost))
                        .then(a.id().cmp(&b.id()))
                });
                let keep = usize::from(ctx.threat(board, shore) > 0.0);
                let movable = cargo.len().saturating_sub(keep);
                let mut taken = Vec::new();
                for v in cargo.into_iter().take(movable) {
                    if v.kind.transport_cost <= room {
                        room -= v.kind.transport_cost;
                        taken.push(v.id());
                    }
                }
                if !taken.is_empty() {
                    ledger.embark(tr.id(), &taken)?;
                    debug!(transport = tr.id().0, units = taken.len(), "loading");
                    orders.push(MoveOrder::load(taken, Route::step(shore, zone), tr.id()));
                }
            }
        }
    }
    Ok(orders)
}

/// Longest prefix of `route` whose end the travelling group could hold
/// against the threat there, if any step is safe at all.
fn safe_prefix<B: BoardQuery>(
    board: &B,
    ctx: &PlanningContext,
    route: &Route,
    group: &[UnitView<'_>],
) -> Option<Route> {
    (1..=route.len()).rev().map(|k| route.truncated(k)).find(|r| {
        let end = r.end();
        let mut stack: Vec<UnitView<'_>> = board.allied_units(end, ctx.player);
        stack.extend_from_slice(group);
        let sea = board.territory(end).is_water;
        let defense = ctx.evaluator.evaluate(&stack, false, sea, ctx.rules.transports_can_die);
        ctx.threat(board, end) <= defense
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_are_fixed() {
        assert_eq!(Phase::sequence(Epoch::Combat).len(), 6);
        assert_eq!(Phase::sequence(Epoch::Combat)[0], Phase::SeaCombat);
        assert_eq!(Phase::sequence(Epoch::NonCombat).len(), 9);
        assert_eq!(
            Phase::sequence(Epoch::NonCombat).last(),
            Some(&Phase::TransportUnload)
        );
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = COMBAT_PHASES
            .iter()
            .chain(NONCOMBAT_PHASES.iter())
            .map(|p| p.name())
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 13);
        assert_eq!(Phase::BlitzBlock.to_string(), "blitz-block");
    }
}
