//! Threat estimation.
//!
//! Estimates how much force each hostile player could bring against a
//! territory on its next turn, from units already in position: adjacent
//! units, blitzers with a clear two-step path, nearby ships, aircraft in
//! range and transports that could land cargo. The strongest hostile
//! player counts fully and the others partially.

use std::collections::HashSet;

use super::strength::StrengthEvaluator;
use crate::board::{PlayerId, TerritoryId, UnitId, UnitView, UNREACHABLE};
use crate::config::PlannerConfig;
use crate::host::BoardQuery;

/// Garrison strength of `t` as seen from `perspective`.
///
/// With `allied` the units of `perspective` and its allies are counted,
/// otherwise the units hostile to it.
pub fn territory_strength<B: BoardQuery>(
    board: &B,
    eval: &StrengthEvaluator,
    t: TerritoryId,
    perspective: PlayerId,
    attacking: bool,
    allied: bool,
) -> f32 {
    let units = if allied {
        board.allied_units(t, perspective)
    } else {
        board.enemy_units(t, perspective)
    };
    eval.evaluate(
        &units,
        attacking,
        board.territory(t).is_water,
        board.rules().transports_can_die,
    )
}

/// Largest movement of any air unit type, used to bound air searches.
fn max_air_range<B: BoardQuery>(board: &B) -> u32 {
    board
        .unit_types()
        .iter()
        .filter(|k| k.is_air())
        .map(|k| k.movement)
        .max()
        .unwrap_or(0)
}

fn max_transport_range<B: BoardQuery>(board: &B) -> u32 {
    board
        .unit_types()
        .iter()
        .filter(|k| k.transport_capacity > 0 && k.is_sea())
        .map(|k| k.movement)
        .max()
        .unwrap_or(0)
}

/// Collects the units `attacker` could commit against `location`.
fn potential_attackers<'b, B: BoardQuery>(
    board: &'b B,
    config: &PlannerConfig,
    location: TerritoryId,
    attacker: PlayerId,
    ignore: &HashSet<UnitId>,
) -> Vec<UnitView<'b>> {
    let map = board.map();
    let water = board.territory(location).is_water;
    let mut seen: HashSet<UnitId> = HashSet::new();
    let mut out: Vec<UnitView<'b>> = Vec::new();
    let mut add = |v: UnitView<'b>, out: &mut Vec<UnitView<'b>>| {
        if !ignore.contains(&v.id()) && seen.insert(v.id()) {
            out.push(v);
        }
    };

    for &n in map.neighbors(location) {
        for v in board.owned_units(n, attacker) {
            let fits = if water {
                v.kind.is_sea()
            } else {
                v.kind.is_land() && v.unit.transported_by.is_none() && !v.kind.is_infrastructure
            };
            if fits {
                add(v, &mut out);
            }
        }
    }

    if water {
        let near = map.neighbors_within(location, config.ship_threat_radius, |t| {
            board.territory(t).is_water
        });
        for t in near {
            for v in board.owned_units(t, attacker) {
                if v.kind.is_sea() && map.sea_distance(t, location) <= v.kind.movement + 1 {
                    add(v, &mut out);
                }
            }
        }
    } else {
        let near = map.neighbors_within(location, config.blitz_threat_radius, |t| {
            board.territory(t).is_passable_land()
        });
        for s in near {
            for v in board.owned_units(s, attacker) {
                if !v.kind.is_land() || !v.kind.can_blitz || v.unit.transported_by.is_some() {
                    continue;
                }
                let clear = map.route_into(s, location, |t| {
                    board.territory(t).is_passable_land() && !board.has_enemy_units(t, attacker)
                });
                if clear.is_some_and(|r| r.len() <= v.kind.movement) {
                    add(v, &mut out);
                }
            }
        }

        let landing: Vec<TerritoryId> = map
            .neighbors(location)
            .iter()
            .copied()
            .filter(|&z| board.territory(z).is_water)
            .collect();
        if !landing.is_empty() {
            let reach = max_transport_range(board);
            let mut zones: Vec<TerritoryId> = landing.clone();
            for &z in &landing {
                for w in map.neighbors_within(z, reach, |t| board.territory(t).is_water) {
                    if !zones.contains(&w) {
                        zones.push(w);
                    }
                }
            }
            for w in zones {
                for tr in board.owned_units(w, attacker) {
                    if tr.kind.transport_capacity == 0 || !tr.kind.is_sea() {
                        continue;
                    }
                    let in_range = landing
                        .iter()
                        .any(|&z| map.sea_distance(w, z) <= tr.kind.movement);
                    if !in_range {
                        continue;
                    }
                    let cargo = board.cargo_of(tr.id());
                    if !cargo.is_empty() {
                        for c in cargo.into_iter().filter_map(|c| board.view(c)) {
                            add(c, &mut out);
                        }
                        continue;
                    }
                    let mut room = tr.kind.transport_capacity;
                    for &coast in map.neighbors(w) {
                        if board.territory(coast).is_water {
                            continue;
                        }
                        let mut loadable: Vec<UnitView<'b>> = board
                            .owned_units(coast, attacker)
                            .into_iter()
                            .filter(|v| v.kind.can_be_transported() && v.unit.transported_by.is_none())
                            .collect();
                        loadable.sort_by(|a, b| b.kind.attack.cmp(&a.kind.attack).then(a.id().cmp(&b.id())));
                        for v in loadable {
                            if v.kind.transport_cost <= room {
                                room -= v.kind.transport_cost;
                                add(v, &mut out);
                            }
                        }
                    }
                }
            }
        }
    }

    let air_reach = max_air_range(board);
    if air_reach > 1 {
        let near = map.neighbors_within(location, air_reach - 1, |t| !board.territory(t).impassable);
        for t in near {
            let d = map.distance(t, location);
            for v in board.owned_units(t, attacker) {
                if v.kind.is_air() && d != UNREACHABLE && d < v.kind.movement {
                    add(v, &mut out);
                }
            }
        }
    }

    out
}

/// Combined strength hostile players could bring against `location`.
///
/// Units in `ignore` are left out, which lets a caller discount enemies it
/// is about to destroy. A sea zone threatened only by transports scores
/// zero.
pub fn potential_attack_strength<B: BoardQuery>(
    board: &B,
    eval: &StrengthEvaluator,
    config: &PlannerConfig,
    location: TerritoryId,
    perspective: PlayerId,
    ignore: &HashSet<UnitId>,
) -> f32 {
    let water = board.territory(location).is_water;
    let transports_can_die = board.rules().transports_can_die;
    let strengths: Vec<f32> = board
        .enemies_of(perspective)
        .into_iter()
        .map(|e| {
            let units = potential_attackers(board, config, location, e, ignore);
            eval.evaluate(&units, true, water, transports_can_die)
        })
        .collect();

    let strongest = strengths.iter().copied().fold(0.0f32, f32::max);
    let total: f32 = strengths.iter().sum();
    strongest + config.other_enemies_factor * (total - strongest)
}

/// True when the enemy could overwhelm `player`'s capital next turn even
/// after the expected reinforcement arrives.
pub fn capital_danger<B: BoardQuery>(
    board: &B,
    eval: &StrengthEvaluator,
    config: &PlannerConfig,
    player: PlayerId,
) -> bool {
    let Some(capital) = board.player(player).capital else {
        return false;
    };
    if !board.is_friendly_land(capital, player) {
        return false;
    }
    let threat = potential_attack_strength(board, eval, config, capital, player, &HashSet::new());
    let garrison = territory_strength(board, eval, capital, player, false, true);
    threat > (garrison + config.expected_reinforcement) * config.capital_threat_factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{
        BoardState, Domain, GameMap, Player, RuleSet, Territory, UnitType, UnitTypeId,
    };

    const RED: PlayerId = PlayerId(0);
    const BLUE: PlayerId = PlayerId(1);
    const GREEN: PlayerId = PlayerId(2);
    const INF: UnitTypeId = UnitTypeId(0);
    const TANK: UnitTypeId = UnitTypeId(1);
    const TRANSPORT: UnitTypeId = UnitTypeId(2);
    const FIGHTER: UnitTypeId = UnitTypeId(3);
    const DESTROYER: UnitTypeId = UnitTypeId(4);

    fn t(i: u16) -> TerritoryId {
        TerritoryId(i)
    }

    /// Land chain `0 - 1 - 2 - 3 - 4`, sea chain `5 - 6 - 7` with 5
    /// touching land 0 and 7 touching land 4. Red owns 0 and 1, Blue owns
    /// 2 to 4.
    fn board() -> BoardState {
        let mut terrs = Vec::new();
        for i in 0..5u16 {
            let mut terr = Territory::land(t(i), format!("L{i}"));
            terr.owner = Some(if i < 2 { RED } else { BLUE });
            terr.production = 1;
            terrs.push(terr);
        }
        for i in 5..8u16 {
            terrs.push(Territory::sea(t(i), format!("S{i}")));
        }
        let mut map = GameMap::new(terrs);
        for i in 0..4u16 {
            map.connect(t(i), t(i + 1));
        }
        map.connect(t(5), t(6));
        map.connect(t(6), t(7));
        map.connect(t(0), t(5));
        map.connect(t(4), t(7));
        let players = vec![
            Player { id: RED, name: "Red".into(), team: 0, capital: Some(t(0)) },
            Player { id: BLUE, name: "Blue".into(), team: 1, capital: Some(t(4)) },
            Player { id: GREEN, name: "Green".into(), team: 2, capital: None },
        ];
        let types = vec![
            UnitType { id: INF, name: "infantry".into(), attack: 1, defense: 2, transport_cost: 2, ..UnitType::default() },
            UnitType { id: TANK, name: "tank".into(), attack: 3, defense: 3, movement: 2, transport_cost: 3, can_blitz: true, ..UnitType::default() },
            UnitType { id: TRANSPORT, name: "transport".into(), domain: Domain::Sea, defense: 1, movement: 2, transport_capacity: 5, ..UnitType::default() },
            UnitType { id: FIGHTER, name: "fighter".into(), domain: Domain::Air, attack: 3, defense: 4, movement: 4, carrier_cost: 1, ..UnitType::default() },
            UnitType { id: DESTROYER, name: "destroyer".into(), domain: Domain::Sea, attack: 2, defense: 2, movement: 2, is_destroyer: true, ..UnitType::default() },
        ];
        BoardState::new(map, players, types, RuleSet::default())
    }

    fn threat(b: &BoardState, location: TerritoryId, perspective: PlayerId) -> f32 {
        potential_attack_strength(
            b,
            &StrengthEvaluator::default(),
            &PlannerConfig::default(),
            location,
            perspective,
            &HashSet::new(),
        )
    }

    #[test]
    fn no_enemies_no_threat() {
        assert_eq!(threat(&board(), t(1), RED), 0.0);
    }

    #[test]
    fn adjacent_land_units_threaten() {
        let mut b = board();
        b.add_unit(INF, BLUE, t(2));
        assert_eq!(threat(&b, t(1), RED), 2.0);
    }

    #[test]
    fn blitzer_needs_clear_path() {
        let mut b = board();
        b.add_unit(TANK, BLUE, t(3));
        // Path 3 -> 2 -> 1 is clear.
        assert_eq!(threat(&b, t(1), RED), 4.0);
        // A Red unit in 2 blocks the blitz.
        b.add_unit(INF, RED, t(2));
        assert_eq!(threat(&b, t(1), RED), 0.0);
    }

    #[test]
    fn infantry_two_steps_away_is_no_threat() {
        let mut b = board();
        b.add_unit(INF, BLUE, t(3));
        assert_eq!(threat(&b, t(1), RED), 0.0);
    }

    #[test]
    fn fighters_in_range_threaten() {
        let mut b = board();
        b.add_unit(FIGHTER, BLUE, t(4));
        // Distance 4 -> 1 is 3, which is below movement 4.
        assert_eq!(threat(&b, t(1), RED), 4.0);
        // Distance 4 -> 0 is 4, leaving no movement to land.
        assert_eq!(threat(&b, t(0), RED), 0.0);
    }

    #[test]
    fn loaded_transport_lands_cargo() {
        let mut b = board();
        let tr = b.add_unit(TRANSPORT, BLUE, t(7));
        let tank = b.add_unit(TANK, BLUE, t(7));
        b.unit_mut(tank).unwrap().transported_by = Some(tr);
        // Sea 7 reaches sea 5 (adjacent to land 0) in two steps.
        assert_eq!(threat(&b, t(0), RED), 4.0);
    }

    #[test]
    fn empty_transport_counts_loadable_units() {
        let mut b = board();
        b.add_unit(TRANSPORT, BLUE, t(7));
        b.add_unit(INF, BLUE, t(4));
        assert_eq!(threat(&b, t(0), RED), 2.0);
    }

    #[test]
    fn transports_alone_do_not_threaten_sea() {
        let mut b = board();
        b.add_unit(TRANSPORT, BLUE, t(6));
        assert_eq!(threat(&b, t(5), RED), 0.0);
        b.add_unit(DESTROYER, BLUE, t(6));
        assert_eq!(threat(&b, t(5), RED), 3.5);
    }

    #[test]
    fn weaker_enemies_are_discounted() {
        let mut b = board();
        b.add_unit(TANK, BLUE, t(2));
        b.add_unit(INF, GREEN, t(0));
        // Blue tank: 4.0; Green infantry next to 1 in 0: 2.0 at 40%.
        let value = threat(&b, t(1), RED);
        assert!((value - 4.8).abs() < 1e-5, "got {value}");
    }

    #[test]
    fn ignored_units_are_skipped() {
        let mut b = board();
        let inf = b.add_unit(INF, BLUE, t(2));
        let ignore: HashSet<UnitId> = [inf].into_iter().collect();
        let value = potential_attack_strength(
            &b,
            &StrengthEvaluator::default(),
            &PlannerConfig::default(),
            t(1),
            RED,
            &ignore,
        );
        assert_eq!(value, 0.0);
    }

    #[test]
    fn garrison_strength_by_side() {
        let mut b = board();
        b.add_unit(INF, RED, t(1));
        b.add_unit(TANK, BLUE, t(1));
        let eval = StrengthEvaluator::default();
        assert_eq!(territory_strength(&b, &eval, t(1), RED, false, true), 3.0);
        assert_eq!(territory_strength(&b, &eval, t(1), RED, false, false), 4.0);
    }

    #[test]
    fn capital_danger_compares_with_reinforcement() {
        let mut b = board();
        let eval = StrengthEvaluator::default();
        let config = PlannerConfig::default();
        b.add_unit(INF, RED, t(0));
        assert!(!capital_danger(&b, &eval, &config, RED));
        for _ in 0..3 {
            b.add_unit(TANK, BLUE, t(1));
        }
        // 12.0 threat against (3.0 + 5.0) defense.
        b.map.territory_mut(t(1)).owner = Some(BLUE);
        assert!(capital_danger(&b, &eval, &config, RED));
    }
}
