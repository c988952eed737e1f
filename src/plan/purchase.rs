//! Purchase allocation.
//!
//! Each buyable unit type becomes a `PurchaseOption` with one score per
//! strategy vector. For a vector, the allocator sorts options by score per
//! cost and fills the budget greedily, backtracking one unit at a time
//! whenever the last addition overshoots. The turn-level policy picks the
//! vector: defense when the capital is in danger, otherwise a weighted
//! random choice.

use std::cmp::Ordering;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::debug;

use super::context::PlanningContext;
use super::PlanError;
use crate::board::{Purchase, UnitType, UnitTypeId};
use crate::host::BoardQuery;

/// What a purchase mix optimizes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StrategyVector {
    Attack,
    Defense,
    MaxUnits,
    Mobility,
}

impl StrategyVector {
    pub const ALL: [StrategyVector; 4] = [
        StrategyVector::Attack,
        StrategyVector::Defense,
        StrategyVector::MaxUnits,
        StrategyVector::Mobility,
    ];
}

/// A buyable unit type with its per-vector value.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseOption {
    pub unit_type: UnitTypeId,
    pub cost: u32,
    pub attack: f32,
    pub defense: f32,
    pub movement: u32,
    pub is_sea: bool,
}

impl PurchaseOption {
    /// Derives scores from a unit type.
    ///
    /// Submarines lose a point, units that cannot move have no attack
    /// value, lopsided specialists lose value on their weak side, two-hit
    /// units count twice and carriers earn the value of the fighters that
    /// could fly onto them.
    pub fn from_type(kind: &UnitType, idle_fighters: u32) -> Self {
        let raw_attack = kind.attack as i64;
        let raw_defense = kind.defense as i64;
        let mut attack = raw_attack;
        let mut defense = raw_defense;

        if kind.is_submarine {
            if attack >= 1 {
                attack -= 1;
            } else if defense >= 1 {
                defense -= 1;
            }
        }
        if kind.movement == 0 {
            attack = 0;
        }
        if (raw_attack == 0 || raw_defense - raw_attack >= 4) && raw_defense >= 1 {
            defense -= 1;
            if raw_defense - raw_attack >= 4 {
                defense -= 1;
            }
        }
        if (raw_defense == 0 || raw_attack - raw_defense >= 4) && raw_attack >= 1 {
            attack -= 1;
            if raw_attack - raw_defense >= 4 {
                attack -= 1;
            }
        }

        let rolls = kind.attack_rolls.max(1) as f32;
        let attack = attack.max(0) as f32;
        let defense = defense.max(0) as f32;
        let hit_factor = if kind.is_multi_hit() { 2.0 } else { 1.0 };
        let carried = kind.carrier_capacity.min(idle_fighters) as f32;

        PurchaseOption {
            unit_type: kind.id,
            cost: kind.cost,
            attack: attack * rolls * hit_factor + carried * 3.0,
            defense: defense * rolls * hit_factor + carried * 4.0,
            movement: kind.movement,
            is_sea: kind.is_sea(),
        }
    }

    pub fn score(&self, vector: StrategyVector) -> f32 {
        match vector {
            StrategyVector::Attack => self.attack,
            StrategyVector::Defense => self.defense,
            StrategyVector::MaxUnits => 1.0 + (self.attack + self.defense) / 100.0,
            StrategyVector::Mobility => self.attack * self.movement as f32,
        }
    }
}

/// One mix per strategy vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseMixes {
    pub attack: Purchase,
    pub defense: Purchase,
    pub max_units: Purchase,
    pub mobility: Purchase,
}

impl PurchaseMixes {
    pub fn get(&self, vector: StrategyVector) -> &Purchase {
        match vector {
            StrategyVector::Attack => &self.attack,
            StrategyVector::Defense => &self.defense,
            StrategyVector::MaxUnits => &self.max_units,
            StrategyVector::Mobility => &self.mobility,
        }
    }
}

/// Bounded greedy knapsack over purchase options.
pub struct PurchaseAllocator;

impl PurchaseAllocator {
    /// Computes the candidate mix of every strategy vector. The turn's
    /// purchase takes the one its strategy vector picks.
    pub fn allocate(budget: i64, options: &[PurchaseOption], slots: u32) -> Result<PurchaseMixes, PlanError> {
        Ok(PurchaseMixes {
            attack: Self::allocate_for(StrategyVector::Attack, budget, options, slots)?,
            defense: Self::allocate_for(StrategyVector::Defense, budget, options, slots)?,
            max_units: Self::allocate_for(StrategyVector::MaxUnits, budget, options, slots)?,
            mobility: Self::allocate_for(StrategyVector::Mobility, budget, options, slots)?,
        })
    }

    /// Fills `budget` for one vector. The result never costs more than
    /// `budget` nor holds more than `slots` units.
    pub fn allocate_for(
        vector: StrategyVector,
        budget: i64,
        options: &[PurchaseOption],
        slots: u32,
    ) -> Result<Purchase, PlanError> {
        if budget < 0 {
            return Err(PlanError::NegativeBudget(budget));
        }
        let budget = budget as u64;
        let mut ordered: Vec<&PurchaseOption> = options
            .iter()
            .filter(|o| o.cost > 0 && o.score(vector) > 0.0)
            .collect();
        ordered.sort_by(|a, b| {
            let ra = a.score(vector) / a.cost as f32;
            let rb = b.score(vector) / b.cost as f32;
            rb.partial_cmp(&ra)
                .unwrap_or(Ordering::Equal)
                .then(a.cost.cmp(&b.cost))
                .then(a.unit_type.cmp(&b.unit_type))
        });

        // Filling one at a time and backtracking the overshoot keeps exactly
        // the units that fit.
        let mut purchase = Purchase::new();
        let mut spent: u64 = 0;
        let mut count: u32 = 0;
        for option in ordered {
            if count >= slots || spent >= budget {
                break;
            }
            let cost = u64::from(option.cost);
            let fits = (budget - spent) / cost;
            let qty = u32::try_from(fits).unwrap_or(u32::MAX).min(slots - count);
            if qty == 0 {
                continue;
            }
            spent += cost * u64::from(qty);
            count += qty;
            *purchase.entry(option.unit_type).or_insert(0) += qty;
        }
        Ok(purchase)
    }
}

/// Picks the strategy vector for a turn's purchase.
#[derive(Debug, Clone)]
pub struct StrategyPolicy {
    rng: SmallRng,
    weights: [f32; 4],
}

impl StrategyPolicy {
    /// A policy with a fixed seed, or one drawn from entropy.
    pub fn new(seed: Option<u64>, weights: [f32; 4]) -> Self {
        let rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_entropy(),
        };
        StrategyPolicy { rng, weights }
    }

    pub fn choose(&mut self, capital_danger: bool) -> StrategyVector {
        if capital_danger {
            return StrategyVector::Defense;
        }
        match WeightedIndex::new(self.weights.iter().map(|w| w.max(0.0))) {
            Ok(dist) => StrategyVector::ALL[dist.sample(&mut self.rng)],
            Err(_) => StrategyVector::Attack,
        }
    }
}

/// Decides the turn's purchase for the planning player.
///
/// One transport is reserved first when an invasion target exists and no
/// transport is available. The rest of the budget goes to the mix of the
/// vector the policy picks, over the unit types our factories can place.
pub fn plan_purchase<B: BoardQuery>(
    board: &B,
    ctx: &PlanningContext,
    policy: &mut StrategyPolicy,
) -> Result<(StrategyVector, Purchase), PlanError> {
    let player = ctx.player;
    let map = board.map();
    let mut budget = i64::from(board.budget(player));
    let land_slots: u32 = ctx
        .factories
        .iter()
        .filter(|&&f| !board.conquered_this_turn(f))
        .map(|&f| board.placement_capacity(f))
        .sum();
    let coastal = ctx.factories.iter().any(|&f| map.is_coastal(f));
    let mut slots = land_slots;

    let idle_fighters = ctx
        .capital
        .map(|c| {
            board
                .owned_units(c, player)
                .iter()
                .filter(|v| v.kind.is_carrier_borne())
                .count() as u32
        })
        .unwrap_or(0);
    let options: Vec<PurchaseOption> = board
        .unit_types()
        .iter()
        .filter(|k| !k.is_infrastructure && (coastal || !k.is_sea()))
        .map(|k| PurchaseOption::from_type(k, idle_fighters))
        .collect();

    let mut purchase = Purchase::new();
    let have_transport = board
        .territories_of(player)
        .into_iter()
        .chain(map.territories().iter().filter(|t| t.is_water).map(|t| t.id))
        .any(|t| board.owned_units(t, player).iter().any(|v| v.kind.is_transport()));
    if ctx.config.reserve_transport && ctx.amphibious_target.is_some() && coastal && !have_transport && slots > 0 {
        let cheapest = board
            .unit_types()
            .iter()
            .filter(|k| k.is_transport() && i64::from(k.cost) <= budget)
            .min_by_key(|k| (k.cost, k.id));
        if let Some(kind) = cheapest {
            purchase.insert(kind.id, 1);
            budget -= i64::from(kind.cost);
            slots -= 1;
            debug!(unit = %kind.name, "transport reserved");
        }
    }

    let mixes = PurchaseAllocator::allocate(budget, &options, slots)?;
    let vector = policy.choose(ctx.capital_danger);
    for (&ty, &qty) in mixes.get(vector) {
        *purchase.entry(ty).or_insert(0) += qty;
    }
    debug!(?vector, budget, slots, units = purchase.values().sum::<u32>(), "purchase planned");
    Ok((vector, purchase))
}
