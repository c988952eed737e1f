//! Force recruitment.
//!
//! Given an objective and the strength it calls for, the recruiter pulls
//! uncommitted units toward it from nearby territories, one source at a
//! time in a kind-specific order, until the requirement is met or the
//! sources run out. Every recruited unit is committed to the ledger as it
//! is taken, and one move order is emitted per source and route actually
//! used.
//!
//! Recruiting kinds can be chained (blitz, transports, air, land, ...),
//! each call reducing the remaining requirement by what it achieved. The
//! last unit taken from a source is chosen best-fit, so a call overshoots
//! the target by as little as the pool allows.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::debug;

use super::context::PlanningContext;
use super::ledger::{CommitmentLedger, Epoch};
use super::PlanError;
use crate::board::{MoveOrder, PlayerId, Route, TerritoryId, UnitId, UnitView, UNREACHABLE};
use crate::host::BoardQuery;

/// Which pool of units a recruitment call draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecruitKind {
    /// Blitzing land units two steps away over clear ground.
    Blitz,
    /// Land units moving overland.
    Land,
    /// Air units that can still land afterwards.
    Air,
    /// Loaded transports that can reach a sea zone next to the objective.
    Transports,
    /// Warships (and the aircraft aboard carriers) for sea objectives.
    Ships,
    /// Bombarding ships supporting a landing.
    Bombard,
}

/// An objective and the strength still missing there.
#[derive(Debug, Clone, PartialEq)]
pub struct StrengthTarget {
    pub objective: TerritoryId,
    pub needed: f32,
    /// Territories whose units must stay put, such as those already
    /// attacked this epoch.
    pub exclude: BTreeSet<TerritoryId>,
}

impl StrengthTarget {
    pub fn new(objective: TerritoryId, needed: f32) -> Self {
        StrengthTarget {
            objective,
            needed,
            exclude: BTreeSet::new(),
        }
    }

    pub fn excluding(mut self, exclude: &BTreeSet<TerritoryId>) -> Self {
        self.exclude.extend(exclude.iter().copied());
        self
    }

    /// Reduces the requirement by strength already secured.
    pub fn satisfy(&mut self, achieved: f32) {
        self.needed -= achieved;
    }

    pub fn is_met(&self) -> bool {
        self.needed <= 0.0
    }
}

/// Outcome of a recruitment call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recruitment {
    pub achieved: f32,
    pub orders: Vec<MoveOrder>,
}

impl Recruitment {
    /// Every unit handle moved by the emitted orders.
    pub fn units(&self) -> Vec<UnitId> {
        self.orders.iter().flat_map(|o| o.units.iter().copied()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    fn merge(&mut self, other: Recruitment) {
        self.achieved += other.achieved;
        self.orders.extend(other.orders);
    }
}

/// A source territory, the route its units take and the units that may
/// use it, in preference order.
struct Candidate<'b> {
    source: TerritoryId,
    route: Route,
    units: Vec<UnitView<'b>>,
}

/// Pulls units toward objectives for one player.
pub struct ForceRecruiter<'a, B: BoardQuery> {
    board: &'a B,
    ctx: &'a PlanningContext,
}

impl<'a, B: BoardQuery> ForceRecruiter<'a, B> {
    pub fn new(board: &'a B, ctx: &'a PlanningContext) -> Self {
        ForceRecruiter { board, ctx }
    }

    /// Recruits units of one kind toward `target.objective` until
    /// `target.needed` is reached. A requirement at or below zero returns
    /// an empty recruitment and leaves the ledger alone.
    pub fn recruit(
        &self,
        target: &StrengthTarget,
        kind: RecruitKind,
        ledger: &mut CommitmentLedger,
    ) -> Result<Recruitment, PlanError> {
        if target.is_met() {
            return Ok(Recruitment::default());
        }
        let result = match kind {
            RecruitKind::Transports => self.transports(target, ledger)?,
            RecruitKind::Ships => {
                let sources = self.ship_candidates(target, ledger);
                self.fill(target, sources, true, ledger)?
            }
            RecruitKind::Bombard => {
                let sources = self.bombard_candidates(target, ledger);
                self.fill(target, sources, true, ledger)?
            }
            RecruitKind::Land | RecruitKind::Blitz | RecruitKind::Air => {
                let sources = match kind {
                    RecruitKind::Land => self.land_candidates(target, ledger, false),
                    RecruitKind::Blitz => self.land_candidates(target, ledger, true),
                    _ => self.air_candidates(target, ledger),
                };
                let sea = self.board.territory(target.objective).is_water;
                self.fill(target, sources, sea, ledger)?
            }
        };
        debug!(
            objective = %self.board.territory(target.objective).name,
            ?kind,
            needed = target.needed,
            achieved = result.achieved,
            orders = result.orders.len(),
            "recruited"
        );
        Ok(result)
    }

    /// Runs several kinds in order, each covering what the previous ones
    /// left open.
    pub fn recruit_chain(
        &self,
        target: &StrengthTarget,
        kinds: &[RecruitKind],
        ledger: &mut CommitmentLedger,
    ) -> Result<Recruitment, PlanError> {
        let mut remaining = target.clone();
        let mut total = Recruitment::default();
        for &kind in kinds {
            if remaining.is_met() {
                break;
            }
            let got = self.recruit(&remaining, kind, ledger)?;
            remaining.satisfy(got.achieved);
            total.merge(got);
        }
        Ok(total)
    }

    /// Whether a unit may be recruited this epoch.
    fn usable(&self, v: &UnitView<'_>, ledger: &CommitmentLedger) -> bool {
        v.unit.owner == self.ctx.player
            && !ledger.is_committed(v.id())
            && v.unit.movement_left > 0
            && !v.kind.is_infrastructure
            && !self.board.battle_pending(v.unit.territory)
            && (ledger.epoch() == Epoch::Combat || !v.unit.moved_this_turn)
    }

    fn attacking(ledger: &CommitmentLedger) -> bool {
        ledger.epoch() == Epoch::Combat
    }

    fn evaluate(&self, units: &[UnitView<'_>], attacking: bool, sea: bool) -> f32 {
        self.ctx
            .evaluator
            .evaluate(units, attacking, sea, self.ctx.rules.transports_can_die)
    }

    /// Greedily takes units from `sources` in order until the requirement
    /// is met. Within a source, a unit that completes the requirement with
    /// overshoot inside the slack ratio is preferred; failing that, the
    /// completing unit with the least overshoot.
    fn fill(
        &self,
        target: &StrengthTarget,
        sources: Vec<Candidate<'a>>,
        sea: bool,
        ledger: &mut CommitmentLedger,
    ) -> Result<Recruitment, PlanError> {
        let attacking = Self::attacking(ledger);
        let needed = target.needed;
        let limit = needed * self.ctx.config.recruit_slack;
        let mut batch: Vec<UnitView<'a>> = Vec::new();
        let mut result = Recruitment::default();

        for cand in sources {
            if result.achieved >= needed {
                break;
            }
            let mut pool: Vec<UnitView<'a>> = cand
                .units
                .into_iter()
                .filter(|v| !ledger.is_committed(v.id()))
                .collect();
            let mut taken: Vec<UnitId> = Vec::new();

            while !pool.is_empty() && result.achieved < needed {
                let totals: Vec<f32> = pool
                    .iter()
                    .map(|v| {
                        batch.push(*v);
                        let s = self.evaluate(&batch, attacking, sea);
                        batch.pop();
                        s
                    })
                    .collect();
                let within = (0..pool.len()).find(|&i| totals[i] >= needed && totals[i] <= limit);
                let closest = (0..pool.len())
                    .filter(|&i| totals[i] >= needed)
                    .min_by(|&a, &b| totals[a].partial_cmp(&totals[b]).unwrap_or(Ordering::Equal));
                let pick = within.or(closest).unwrap_or(0);

                let v = pool.remove(pick);
                ledger.commit(v.id())?;
                batch.push(v);
                taken.push(v.id());
                result.achieved = self.evaluate(&batch, attacking, sea);
            }

            // Units already in place count without an order.
            if !taken.is_empty() && !cand.route.is_empty() {
                debug!(source = cand.source.0, units = taken.len(), "source used");
                result.orders.push(MoveOrder::new(taken, cand.route));
            }
        }
        Ok(result)
    }

    /// Orders a pool so artillery and the units it supports alternate,
    /// followed by everything else strongest first.
    fn preference_order(&self, mut units: Vec<UnitView<'a>>, attacking: bool) -> Vec<UnitView<'a>> {
        let single = |v: &UnitView<'_>| self.evaluate(std::slice::from_ref(v), attacking, v.kind.is_sea());
        units.sort_by(|a, b| {
            single(b)
                .partial_cmp(&single(a))
                .unwrap_or(Ordering::Equal)
                .then(a.id().cmp(&b.id()))
        });
        if !attacking {
            return units;
        }
        let (artillery, rest): (Vec<_>, Vec<_>) = units.into_iter().partition(|v| v.kind.is_artillery);
        let (supported, others): (Vec<_>, Vec<_>) = rest.into_iter().partition(|v| v.kind.artillery_supportable);
        let mut ordered = Vec::new();
        let mut art = artillery.into_iter();
        let mut sup = supported.into_iter();
        loop {
            match (art.next(), sup.next()) {
                (None, None) => break,
                (a, s) => {
                    ordered.extend(a);
                    ordered.extend(s);
                }
            }
        }
        ordered.extend(others);
        ordered
    }

    fn max_movement(&self, pred: impl Fn(&crate::board::UnitType) -> bool) -> u32 {
        self.board
            .unit_types()
            .iter()
            .filter(|k| pred(k))
            .map(|k| k.movement)
            .max()
            .unwrap_or(0)
    }

    /// Can a land unit pass through `t` on the way to the objective?
    fn land_passable(&self, t: TerritoryId, blitz: bool, combat: bool) -> bool {
        let player = self.ctx.player;
        let board = self.board;
        if board.has_enemy_units(t, player) || board.battle_pending(t) {
            return false;
        }
        if board.is_friendly_land(t, player) {
            return true;
        }
        blitz && combat && self.ctx.rules.blitz_through_empty_enemy && board.is_enemy_land(t, player)
    }

    fn source_allowed(&self, s: TerritoryId, target: &StrengthTarget) -> bool {
        s != target.objective && !target.exclude.contains(&s)
    }

    /// Land sources ordered safest first: fewest enemy land units next to
    /// them, then nearest, then lowest id.
    fn land_candidates(&self, target: &StrengthTarget, ledger: &CommitmentLedger, blitz: bool) -> Vec<Candidate<'a>> {
        let board = self.board;
        let map = board.map();
        let o = target.objective;
        let combat = Self::attacking(ledger);
        let player = self.ctx.player;
        if !board.territory(o).is_passable_land() || (!combat && !board.is_friendly_land(o, player)) {
            return Vec::new();
        }
        let reach = self.max_movement(|k| k.is_land());
        let mut found: Vec<(usize, u32, Candidate<'a>)> = Vec::new();

        for s in map.neighbors_within(o, reach, |t| board.territory(t).is_passable_land()) {
            if !self.source_allowed(s, target) || !board.is_friendly_land(s, player) {
                continue;
            }
            let land_dist = map.land_distance(s, o);
            if blitz && land_dist != 2 {
                continue;
            }
            let route = map.route_into(s, o, |t| self.land_passable(t, blitz, combat));
            let Some(route) = route else {
                continue;
            };
            let units: Vec<UnitView<'a>> = board
                .owned_units(s, player)
                .into_iter()
                .filter(|v| {
                    v.kind.is_land()
                        && v.unit.transported_by.is_none()
                        && (!blitz || v.kind.can_blitz)
                        && v.unit.movement_left >= route.len()
                        && self.usable(v, ledger)
                })
                .collect();
            if units.is_empty() {
                continue;
            }
            let exposure: usize = map
                .neighbors(s)
                .iter()
                .filter(|&&n| !board.territory(n).is_water)
                .map(|&n| {
                    board
                        .enemy_units(n, player)
                        .iter()
                        .filter(|v| v.kind.is_land())
                        .count()
                })
                .sum();
            let units = self.preference_order(units, combat);
            found.push((exposure, route.len(), Candidate { source: s, route, units }));
        }

        found.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.source.cmp(&b.2.source)));
        found.into_iter().map(|(_, _, c)| c).collect()
    }

    /// True when an air unit reaching `o` with `left` movement can land.
    fn can_land_after(&self, o: TerritoryId, left: u32, combat: bool) -> bool {
        let board = self.board;
        let player = self.ctx.player;
        if !combat {
            return board.is_friendly_land(o, player) && !board.conquered_this_turn(o);
        }
        can_land_near(board, player, o, left)
    }

    /// Air sources ordered nearest first.
    fn air_candidates(&self, target: &StrengthTarget, ledger: &CommitmentLedger) -> Vec<Candidate<'a>> {
        let board = self.board;
        let map = board.map();
        let o = target.objective;
        let combat = Self::attacking(ledger);
        let player = self.ctx.player;
        let reach = self.max_movement(|k| k.is_air());
        let mut found: Vec<(u32, Candidate<'a>)> = Vec::new();

        for s in map.neighbors_within(o, reach, |t| !board.territory(t).impassable) {
            if !self.source_allowed(s, target) {
                continue;
            }
            let Some(route) = map.route(s, o, |t| !board.territory(t).impassable) else {
                continue;
            };
            let units: Vec<UnitView<'a>> = board
                .owned_units(s, player)
                .into_iter()
                .filter(|v| {
                    v.kind.is_air()
                        && v.unit.movement_left >= route.len()
                        && self.can_land_after(o, v.unit.movement_left - route.len(), combat)
                        && self.usable(v, ledger)
                })
                .collect();
            if units.is_empty() {
                continue;
            }
            let units = self.preference_order(units, combat);
            found.push((route.len(), Candidate { source: s, route, units }));
        }

        found.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.source.cmp(&b.1.source)));
        found.into_iter().map(|(_, c)| c).collect()
    }

    /// Warship sources ordered strongest pool first. Aircraft sitting in a
    /// sea zone travel with the carrier group there.
    fn ship_candidates(&self, target: &StrengthTarget, ledger: &CommitmentLedger) -> Vec<Candidate<'a>> {
        let board = self.board;
        let map = board.map();
        let o = target.objective;
        let combat = Self::attacking(ledger);
        let player = self.ctx.player;
        if !board.territory(o).is_water {
            return Vec::new();
        }
        let reach = self.max_movement(|k| k.is_sea());
        let mut found: Vec<(f32, u32, Candidate<'a>)> = Vec::new();

        for s in map.neighbors_within(o, reach, |t| board.territory(t).is_water) {
            if !self.source_allowed(s, target) {
                continue;
            }
            let route = map.route_into(s, o, |t| board.territory(t).is_water && !board.has_enemy_units(t, player));
            let Some(route) = route else {
                continue;
            };
            let units: Vec<UnitView<'a>> = board
                .owned_units(s, player)
                .into_iter()
                .filter(|v| {
                    ((v.kind.is_sea() && !v.kind.is_transport()) || v.kind.is_carrier_borne())
                        && v.unit.movement_left >= route.len()
                        && self.usable(v, ledger)
                })
                .collect();
            if units.is_empty() {
                continue;
            }
            let strength = self.evaluate(&units, combat, true);
            let units = self.preference_order(units, combat);
            found.push((strength, route.len(), Candidate { source: s, route, units }));
        }

        found.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
                .then(a.2.source.cmp(&b.2.source))
        });
        found.into_iter().map(|(_, _, c)| c).collect()
    }

    /// Bombarding ships that can reach a sea zone next to the objective.
    fn bombard_candidates(&self, target: &StrengthTarget, ledger: &CommitmentLedger) -> Vec<Candidate<'a>> {
        let board = self.board;
        let map = board.map();
        let o = target.objective;
        let player = self.ctx.player;
        if board.territory(o).is_water || !Self::attacking(ledger) {
            return Vec::new();
        }
        let reach = self.max_movement(|k| k.is_sea());
        let mut found: Vec<(u32, Candidate<'a>)> = Vec::new();
        for &z in map.neighbors(o) {
            if !board.territory(z).is_water || board.has_enemy_units(z, player) {
                continue;
            }
            let mut sources = vec![z];
            sources.extend(map.neighbors_within(z, reach, |t| board.territory(t).is_water));
            for s in sources {
                if target.exclude.contains(&s) {
                    continue;
                }
                let Some(route) = map.route(s, z, |t| board.territory(t).is_water && !board.has_enemy_units(t, player)) else {
                    continue;
                };
                let units: Vec<UnitView<'a>> = board
                    .owned_units(s, player)
                    .into_iter()
                    .filter(|v| {
                        v.kind.can_bombard
                            && v.kind.is_sea()
                            && v.unit.movement_left >= route.len().max(1)
                            && self.usable(v, ledger)
                    })
                    .collect();
                if !units.is_empty() {
                    let units = self.preference_order(units, true);
                    found.push((route.len(), Candidate { source: s, route, units }));
                }
            }
        }
        found.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.source.cmp(&b.1.source)));
        found.into_iter().map(|(_, c)| c).collect()
    }

    /// Loaded transports that can reach a sea zone next to the objective,
    /// nearest first. Each emits one unload order that sails the transport
    /// to the landing zone and puts its cargo ashore, preceded by a move of
    /// its escorts when the landing zone is threatened. Cargo embarked
    /// earlier in the epoch is already committed and lands with it.
    fn transports(&self, target: &StrengthTarget, ledger: &mut CommitmentLedger) -> Result<Recruitment, PlanError> {
        let board = self.board;
        let map = board.map();
        let o = target.objective;
        let player = self.ctx.player;
        let combat = Self::attacking(ledger);
        let mut result = Recruitment::default();
        if !board.territory(o).is_passable_land() {
            return Ok(result);
        }
        if !combat && !board.is_friendly_land(o, player) {
            return Ok(result);
        }
        let landings: Vec<TerritoryId> = map
            .neighbors(o)
            .iter()
            .copied()
            .filter(|&z| board.territory(z).is_water)
            .collect();
        if landings.is_empty() {
            return Ok(result);
        }
        let reach = self.max_movement(|k| k.is_sea() && k.transport_capacity > 0);

        let mut zones: Vec<TerritoryId> = landings.clone();
        for &z in &landings {
            for w in map.neighbors_within(z, reach, |t| board.territory(t).is_water) {
                if !zones.contains(&w) {
                    zones.push(w);
                }
            }
        }

        // (steps, transport, route to landing zone, cargo)
        let mut options: Vec<(u32, UnitView<'a>, Route, Vec<UnitView<'a>>)> = Vec::new();
        for w in zones {
            if target.exclude.contains(&w) {
                continue;
            }
            for tr in board.owned_units(w, player) {
                if tr.kind.transport_capacity == 0 || !tr.kind.is_sea() {
                    continue;
                }
                if ledger.is_committed(tr.id()) || board.battle_pending(w) {
                    continue;
                }
                if !combat && tr.unit.moved_this_turn && tr.unit.movement_left == 0 {
                    continue;
                }
                let cargo: Vec<UnitView<'a>> = landable_cargo(board, ledger, tr.id())
                    .into_iter()
                    .filter_map(|c| board.view(c))
                    .collect();
                if cargo.is_empty() {
                    continue;
                }
                let best = landings
                    .iter()
                    .filter_map(|&z| {
                        let route = map.route(w, z, |t| {
                            board.territory(t).is_water && (t == z || !board.has_enemy_units(t, player))
                        })?;
                        (route.len() <= tr.unit.movement_left && !board.has_enemy_units(z, player))
                            .then_some(route)
                    })
                    .min_by(|a, b| a.len().cmp(&b.len()).then(a.end().cmp(&b.end())));
                if let Some(route) = best {
                    options.push((route.len(), tr, route, cargo));
                }
            }
        }
        options.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.id().cmp(&b.1.id())));

        let mut landed: Vec<UnitView<'a>> = Vec::new();
        for (_, tr, route, cargo) in options {
            if result.achieved >= target.needed {
                break;
            }
            let mut group = vec![tr.id()];
            group.extend(cargo.iter().map(|c| c.id()).filter(|&c| !ledger.is_committed(c)));
            ledger.commit_all(&group)?;

            let landing = route.end();
            if !route.is_empty() {
                let escorts = self.escorts(tr.unit.territory, landing, &route, ledger)?;
                if !escorts.is_empty() {
                    result.orders.push(MoveOrder::new(escorts, route.clone()));
                }
            }
            result.orders.push(MoveOrder::unload(vec![tr.id()], route.extended(o)));
            landed.extend(cargo);
            result.achieved = self.evaluate(&landed, combat, false);
        }
        Ok(result)
    }

    /// Warships from `source` that sail with a transport until their
    /// defense covers the threat at the landing zone.
    fn escorts(
        &self,
        source: TerritoryId,
        landing: TerritoryId,
        route: &Route,
        ledger: &mut CommitmentLedger,
    ) -> Result<Vec<UnitId>, PlanError> {
        let threat = self.ctx.threat(self.board, landing);
        if threat <= 0.0 {
            return Ok(Vec::new());
        }
        let ships: Vec<UnitView<'a>> = self
            .board
            .owned_units(source, self.ctx.player)
            .into_iter()
            .filter(|v| {
                v.kind.is_sea()
                    && !v.kind.is_transport()
                    && v.unit.movement_left >= route.len()
                    && self.usable(v, ledger)
            })
            .collect();
        let ships = self.preference_order(ships, false);
        let mut fleet: Vec<UnitView<'a>> = self.board.allied_units(landing, self.ctx.player);
        let mut taken = Vec::new();
        for ship in ships {
            if self.evaluate(&fleet, false, true) >= threat {
                break;
            }
            ledger.commit(ship.id())?;
            taken.push(ship.id());
            fleet.push(ship);
        }
        Ok(taken)
    }
}

/// True when an air unit at `t` with `left` movement can reach friendly
/// land that was not captured this turn, `t` included.
pub fn can_land_near<B: BoardQuery>(board: &B, player: PlayerId, t: TerritoryId, left: u32) -> bool {
    let landable = |l: TerritoryId| board.is_friendly_land(l, player) && !board.conquered_this_turn(l);
    landable(t)
        || board
            .map()
            .neighbors_within(t, left, |x| !board.territory(x).impassable)
            .into_iter()
            .any(landable)
}

/// Cargo aboard `transport` that its next order would land: whatever
/// embarked this epoch plus anything aboard that is not yet committed.
pub fn landable_cargo<B: BoardQuery>(board: &B, ledger: &CommitmentLedger, transport: UnitId) -> Vec<UnitId> {
    let embarked = ledger.embarked(transport);
    board
        .cargo_of(transport)
        .into_iter()
        .filter(|c| embarked.contains(c) || !ledger.is_committed(*c))
        .collect()
}

/// Steps a unit at `from` needs to reach `to` overland, if it can.
pub fn land_steps<B: BoardQuery>(board: &B, from: TerritoryId, to: TerritoryId) -> Option<u32> {
    let d = board.map().land_distance(from, to);
    (d != UNREACHABLE).then_some(d)
}
