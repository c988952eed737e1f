//! Territory ranking.
//!
//! Scores candidate territories by strategic value from the planning
//! player's point of view. Attack mode values enemy land by production,
//! proximity to enemy capitals, factories, exposed air units and the
//! balance between the force we can bring and the force defending it.
//! Defend mode values friendly land by exposure to the enemy and the gap
//! between the threat and the current garrison.
//!
//! Scores are independent of each other and are computed in parallel; the
//! final ordering is a serial stable sort so identical boards always rank
//! identically.

use std::cmp::Ordering;
use std::collections::HashSet;

use rayon::prelude::*;

use super::context::PlanningContext;
use crate::board::{TerritoryId, UNREACHABLE};
use crate::eval::potential_attack_strength;
use crate::host::BoardQuery;

/// What the ranking is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankMode {
    /// Targets to take from the enemy.
    Attack,
    /// Friendly territories to reinforce.
    Defend,
}

/// A scored territory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedTerritory {
    pub territory: TerritoryId,
    pub score: f32,
    /// Steps from our capital, used to break score ties.
    pub capital_distance: u32,
}

/// Best score first, then nearer to our capital, then lower id.
fn rank_order(a: &RankedTerritory, b: &RankedTerritory) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then(a.capital_distance.cmp(&b.capital_distance))
        .then(a.territory.cmp(&b.territory))
}

/// Ranks territories for one player.
pub struct TerritoryRanker<'a, B: BoardQuery> {
    board: &'a B,
    ctx: &'a PlanningContext,
}

impl<'a, B: BoardQuery> TerritoryRanker<'a, B> {
    pub fn new(board: &'a B, ctx: &'a PlanningContext) -> Self {
        TerritoryRanker { board, ctx }
    }

    /// Scores `candidates` and returns them best first.
    ///
    /// Ties go to the territory closer to our capital, then to the lower
    /// id.
    pub fn rank(&self, candidates: &[TerritoryId], mode: RankMode) -> Vec<RankedTerritory> {
        let mut ranked: Vec<RankedTerritory> = candidates
            .par_iter()
            .map(|&t| RankedTerritory {
                territory: t,
                score: self.score(t, mode),
                capital_distance: self.capital_distance(t),
            })
            .collect();
        ranked.sort_by(rank_order);
        ranked
    }

    fn capital_distance(&self, t: TerritoryId) -> u32 {
        self.ctx
            .capital
            .map_or(UNREACHABLE, |c| self.board.map().distance(c, t))
    }

    /// Score of one territory.
    pub fn score(&self, t: TerritoryId, mode: RankMode) -> f32 {
        let mut score = match mode {
            RankMode::Attack if self.board.territory(t).is_water => self.sea_attack_score(t),
            RankMode::Attack => self.attack_score(t),
            RankMode::Defend => self.defend_score(t),
        };
        if self.ctx.attacked.contains(&t) {
            score -= self.ctx.config.attacked_penalty;
        }
        score
    }

    /// Land distance to the nearest enemy capital, if any is reachable.
    fn nearest_enemy_capital(&self, t: TerritoryId) -> Option<u32> {
        let map = self.board.map();
        self.ctx
            .enemy_capitals
            .iter()
            .map(|&c| map.land_distance(t, c))
            .filter(|&d| d != UNREACHABLE)
            .min()
    }

    /// True when `t` lies on a shortest land path between our capital and
    /// an enemy capital.
    fn on_capital_path(&self, t: TerritoryId) -> bool {
        let Some(home) = self.ctx.capital else {
            return false;
        };
        let map = self.board.map();
        self.ctx.enemy_capitals.iter().any(|&ec| {
            let whole = map.land_distance(home, ec);
            let a = map.land_distance(home, t);
            let b = map.land_distance(t, ec);
            whole != UNREACHABLE && a != UNREACHABLE && b != UNREACHABLE && a + b == whole
        })
    }

    /// Force we and our allies could bring against `t`.
    fn our_potential(&self, t: TerritoryId) -> f32 {
        let Some(owner) = self.board.territory(t).owner else {
            return 0.0;
        };
        potential_attack_strength(
            self.board,
            &self.ctx.evaluator,
            &self.ctx.config,
            t,
            owner,
            &HashSet::new(),
        )
    }

    fn attack_score(&self, t: TerritoryId) -> f32 {
        let board = self.board;
        let config = &self.ctx.config;
        let terr = board.territory(t);
        let production = terr.production as f32;
        if terr.owner.is_none() {
            return production - config.neutral_penalty;
        }

        let mut value = 0.0;
        if terr.victory_city {
            value += 2.0;
        }
        if let Some(d) = self.nearest_enemy_capital(t) {
            let decay = (d.saturating_sub(1) as f32).min(config.capital_route_decay_cap);
            value += config.capital_route_bonus - decay;
        }
        if self.on_capital_path(t) {
            value += config.capital_path_bonus;
        }
        let map = board.map();
        if let Some(d) = self
            .ctx
            .enemy_capitals
            .iter()
            .map(|&c| map.distance(t, c))
            .filter(|&d| d != UNREACHABLE)
            .min()
        {
            value -= d.saturating_sub(1) as f32;
        }
        value += production * config.production_weight;
        if terr.has_factory {
            value += config.factory_bonus;
        }
        let air = board
            .enemy_units(t, self.ctx.player)
            .iter()
            .filter(|v| v.kind.is_air())
            .count();
        value += air as f32 * config.air_target_bonus;
        if map.is_island(t) {
            value += config.island_bonus;
        }

        let defense = self.ctx.defense(board, t);
        let counter = self.ctx.threat(board, t);
        let net = self.our_potential(t) - defense - 0.5 * counter;
        value + net * config.attack_net_weight
    }

    fn sea_attack_score(&self, t: TerritoryId) -> f32 {
        let board = self.board;
        let config = &self.ctx.config;
        let enemies = board.enemy_units(t, self.ctx.player);
        let transports = enemies.iter().filter(|v| v.kind.is_transport()).count();
        let mut value = transports as f32 * 2.0;
        let near_factory = board
            .map()
            .neighbors(t)
            .iter()
            .any(|n| self.ctx.factories.contains(n));
        if near_factory {
            value += config.factory_bonus;
        }
        let net = self.our_potential_at_sea(t) - self.ctx.defense(board, t);
        value + net * config.attack_net_weight
    }

    /// Sea zones have no owner; measure our reach from the fleet owners'
    /// side instead.
    fn our_potential_at_sea(&self, t: TerritoryId) -> f32 {
        let owner = self
            .board
            .enemy_units(t, self.ctx.player)
            .first()
            .map(|v| v.unit.owner);
        match owner {
            Some(o) => potential_attack_strength(
                self.board,
                &self.ctx.evaluator,
                &self.ctx.config,
                t,
                o,
                &HashSet::new(),
            ),
            None => 0.0,
        }
    }

    fn defend_score(&self, t: TerritoryId) -> f32 {
        let board = self.board;
        let config = &self.ctx.config;
        let player = self.ctx.player;
        let map = board.map();
        let terr = board.territory(t);

        let mut value = 0.0;
        if map.is_island(t) {
            value -= config.island_bonus;
        }
        let enemy_neighbor = map
            .neighbors(t)
            .iter()
            .any(|&n| board.is_enemy_land(n, player) || (!board.territory(n).is_water && board.has_enemy_units(n, player)));
        value += if enemy_neighbor {
            config.enemy_neighbor_bonus
        } else {
            -config.enemy_neighbor_bonus
        };
        let factory_neighbor = map.neighbors(t).iter().any(|&n| {
            let nt = board.territory(n);
            nt.has_factory && board.is_friendly_land(n, player) && nt.owner != Some(player)
        });
        if factory_neighbor {
            value += config.allied_factory_neighbor_bonus;
        }

        let nearest_enemy = board
            .enemy_territories(player)
            .into_iter()
            .map(|e| map.land_distance(t, e))
            .filter(|&d| d != UNREACHABLE)
            .min();
        match nearest_enemy {
            None => value -= config.no_enemy_route_penalty,
            Some(d) => {
                let penalty = (d as f32 - 2.0).max(0.0).min(config.enemy_route_penalty_cap);
                value += terr.production as f32 - penalty;
            }
        }

        let threat = self.ctx.threat(board, t);
        if terr.has_factory {
            value += config.factory_bonus;
            if enemy_neighbor && threat > 5.0 {
                value += 3.0;
            }
        }
        if self.ctx.capital == Some(t) {
            value += config.factory_bonus;
        }
        let net = threat - self.ctx.garrison(board, t);
        value + net * config.defend_net_weight
    }
}
