//! Per-turn planning context.
//!
//! Everything a phase needs to know about the turn that is not on the
//! board itself: whose turn it is, where the capital stands, whether it is
//! in danger, which amphibious target (if any) the turn works toward, and
//! which territories have already been attacked this epoch. Built at turn
//! start and refreshed between epochs; nothing persists across turns.

use std::collections::{BTreeSet, HashSet};

use crate::board::{PlayerId, Route, RuleSet, TerritoryId, UNREACHABLE};
use crate::config::PlannerConfig;
use crate::eval::{capital_danger, potential_attack_strength, territory_strength, StrengthEvaluator};
use crate::host::BoardQuery;

/// Turn-scoped planning state threaded through every phase.
#[derive(Debug, Clone)]
pub struct PlanningContext {
    pub player: PlayerId,
    pub capital: Option<TerritoryId>,
    /// The capital exists but is held by an enemy.
    pub capital_lost: bool,
    pub capital_danger: bool,
    pub factories: Vec<TerritoryId>,
    pub enemy_capitals: Vec<TerritoryId>,
    /// Coastal enemy land to invade when no land route reaches the enemy.
    pub amphibious_target: Option<TerritoryId>,
    /// Sea route from our launch zone to the zone next to the target.
    pub amphibious_route: Option<Route>,
    /// Territories attacked during the current epoch.
    pub attacked: BTreeSet<TerritoryId>,
    pub rules: RuleSet,
    pub evaluator: StrengthEvaluator,
    pub config: PlannerConfig,
}

impl PlanningContext {
    /// Builds the context for `player` from the current board.
    pub fn build<B: BoardQuery>(board: &B, player: PlayerId, config: &PlannerConfig) -> Self {
        let rules = *board.rules();
        let mut ctx = PlanningContext {
            player,
            capital: board.player(player).capital,
            capital_lost: false,
            capital_danger: false,
            factories: Vec::new(),
            enemy_capitals: Vec::new(),
            amphibious_target: None,
            amphibious_route: None,
            attacked: BTreeSet::new(),
            rules,
            evaluator: StrengthEvaluator::new(config, &rules),
            config: config.clone(),
        };
        ctx.refresh(board);
        ctx
    }

    /// Re-derives the board-dependent fields and clears the attack marks.
    pub fn refresh<B: BoardQuery>(&mut self, board: &B) {
        let player = self.player;
        self.capital_lost = self
            .capital
            .is_some_and(|c| !board.is_friendly_land(c, player));
        self.capital_danger = capital_danger(board, &self.evaluator, &self.config, player);
        self.factories = board.factories_of(player);
        self.enemy_capitals = board.enemy_capitals(player);
        self.attacked.clear();
        let (target, route) = self.find_amphibious_target(board);
        self.amphibious_target = target;
        self.amphibious_route = route;
    }

    /// Picks the nearest coastal enemy land by sea when no enemy land can
    /// be reached overland from the capital.
    fn find_amphibious_target<B: BoardQuery>(&self, board: &B) -> (Option<TerritoryId>, Option<Route>) {
        let map = board.map();
        let Some(home) = self.capital.filter(|_| !self.capital_lost).or_else(|| self.factories.first().copied()) else {
            return (None, None);
        };
        let enemy_land = board.enemy_territories(self.player);
        if enemy_land.iter().any(|&e| map.land_distance(home, e) != UNREACHABLE) {
            return (None, None);
        }

        let mut launch: Vec<TerritoryId> = Vec::new();
        for &f in std::iter::once(&home).chain(self.factories.iter()) {
            for &z in map.neighbors(f) {
                if board.territory(z).is_water && !launch.contains(&z) {
                    launch.push(z);
                }
            }
        }

        let mut best: Option<(u32, u32, TerritoryId, TerritoryId, TerritoryId)> = None;
        for e in enemy_land {
            if !map.is_coastal(e) {
                continue;
            }
            for &landing in map.neighbors(e) {
                if !board.territory(landing).is_water {
                    continue;
                }
                for &from in &launch {
                    let d = map.sea_distance(from, landing);
                    if d == UNREACHABLE {
                        continue;
                    }
                    let production = board.territory(e).production;
                    let key = (d, u32::MAX - production, e, from, landing);
                    if best.map_or(true, |b| key < b) {
                        best = Some(key);
                    }
                }
            }
        }

        match best {
            Some((_, _, target, from, landing)) => {
                let route = map.route(from, landing, |t| board.territory(t).is_water);
                (Some(target), route)
            }
            None => (None, None),
        }
    }

    /// Hostile force that could reach `t` next turn.
    pub fn threat<B: BoardQuery>(&self, board: &B, t: TerritoryId) -> f32 {
        potential_attack_strength(board, &self.evaluator, &self.config, t, self.player, &HashSet::new())
    }

    /// Hostile defense of a target territory.
    pub fn defense<B: BoardQuery>(&self, board: &B, t: TerritoryId) -> f32 {
        territory_strength(board, &self.evaluator, t, self.player, false, false)
    }

    /// Our own and allied defense of a territory.
    pub fn garrison<B: BoardQuery>(&self, board: &B, t: TerritoryId) -> f32 {
        territory_strength(board, &self.evaluator, t, self.player, false, true)
    }

    /// Multiplier applied to a target's defense to size an attack on it.
    pub fn attack_factor<B: BoardQuery>(&self, board: &B, target: TerritoryId) -> f32 {
        if self.capital_lost {
            return self.config.capital_lost_attack_factor;
        }
        let near_capital = self
            .capital
            .is_some_and(|c| board.map().is_adjacent(c, target));
        if near_capital {
            self.config.emergency_attack_factor
        } else {
            self.config.attack_factor
        }
    }

    /// Strength an attack on `target` must reach. Empty enemy land needs
    /// just one armed unit.
    pub fn required_strength<B: BoardQuery>(&self, board: &B, target: TerritoryId) -> f32 {
        let defense = self.defense(board, target);
        if defense <= 0.0 {
            return 1.0;
        }
        defense * self.attack_factor(board, target) + self.config.safety_margin
    }

    pub fn mark_attacked(&mut self, t: TerritoryId) {
        self.attacked.insert(t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardState, GameMap, Player, Territory, UnitType, UnitTypeId};

    const RED: PlayerId = PlayerId(0);
    const BLUE: PlayerId = PlayerId(1);

    fn t(i: u16) -> TerritoryId {
        TerritoryId(i)
    }

    fn inf() -> UnitType {
        UnitType { id: UnitTypeId(0), name: "infantry".into(), attack: 1, defense: 2, transport_cost: 2, ..UnitType::default() }
    }

    /// Two islands: Red's `0` and Blue's `3`, joined by sea `1 - 2`, plus
    /// Blue's inland `4` behind `3`.
    fn islands() -> BoardState {
        let mut red = Territory::land(t(0), "Home");
        red.owner = Some(RED);
        red.has_factory = true;
        red.production = 5;
        let mut blue = Territory::land(t(3), "Shore");
        blue.owner = Some(BLUE);
        blue.production = 2;
        let mut inland = Territory::land(t(4), "Inland");
        inland.owner = Some(BLUE);
        inland.production = 6;
        let mut map = GameMap::new(vec![
            red,
            Territory::sea(t(1), "Near"),
            Territory::sea(t(2), "Far"),
            blue,
            inland,
        ]);
        map.connect(t(0), t(1));
        map.connect(t(1), t(2));
        map.connect(t(2), t(3));
        map.connect(t(3), t(4));
        let players = vec![
            Player { id: RED, name: "Red".into(), team: 0, capital: Some(t(0)) },
            Player { id: BLUE, name: "Blue".into(), team: 1, capital: Some(t(4)) },
        ];
        BoardState::new(map, players, vec![inf()], RuleSet::default())
    }

    #[test]
    fn island_start_picks_amphibious_target() {
        let board = islands();
        let ctx = PlanningContext::build(&board, RED, &PlannerConfig::default());
        assert_eq!(ctx.amphibious_target, Some(t(3)));
        let route = ctx.amphibious_route.unwrap();
        assert_eq!(route.territories(), &[t(1), t(2)]);
        assert_eq!(ctx.factories, vec![t(0)]);
        assert_eq!(ctx.enemy_capitals, vec![t(4)]);
        assert!(!ctx.capital_lost);
    }

    #[test]
    fn land_route_means_no_amphibious_target() {
        let mut board = islands();
        board.map.connect(t(0), t(3));
        let ctx = PlanningContext::build(&board, RED, &PlannerConfig::default());
        assert_eq!(ctx.amphibious_target, None);
    }

    #[test]
    fn empty_target_needs_one_unit() {
        let board = islands();
        let ctx = PlanningContext::build(&board, RED, &PlannerConfig::default());
        assert_eq!(ctx.required_strength(&board, t(3)), 1.0);
    }

    #[test]
    fn defended_target_scales_with_factor_and_margin() {
        let mut board = islands();
        board.add_unit(UnitTypeId(0), BLUE, t(3));
        board.add_unit(UnitTypeId(0), BLUE, t(3));
        let ctx = PlanningContext::build(&board, RED, &PlannerConfig::default());
        // Defense 6.0 * 1.36 + 3.0.
        let need = ctx.required_strength(&board, t(3));
        assert!((need - 11.16).abs() < 1e-4, "got {need}");
    }

    #[test]
    fn lost_capital_lowers_factor() {
        let mut board = islands();
        board.map.territory_mut(t(0)).owner = Some(BLUE);
        let ctx = PlanningContext::build(&board, RED, &PlannerConfig::default());
        assert!(ctx.capital_lost);
        assert_eq!(ctx.attack_factor(&board, t(3)), 0.72);
    }
}
