//! Combat strength of a unit multiset.
//!
//! Strength is a scalar proxy for how much a stack of units can achieve in
//! one battle. Each participating unit contributes a base value plus its
//! attack (times rolls) or defense, doubled for multi-hit units. The
//! evaluator is a plain value type with no interior state, so it can be
//! shared freely across threads.

use std::collections::HashSet;

use crate::board::{RuleSet, UnitId, UnitView};
use crate::config::PlannerConfig;

/// Weights and rule switches for strength evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrengthEvaluator {
    pub base_value: f32,
    pub zero_attack_penalty: f32,
    pub transport_escort_value: f32,
    /// Multiplier for submarines the enemy cannot target, clamped to 1.0.
    pub submarine_factor: f32,
    pub artillery_bonus: f32,
    pub submarines_need_destroyer: bool,
    pub air_attacks_at_sea: bool,
}

impl Default for StrengthEvaluator {
    fn default() -> Self {
        StrengthEvaluator::new(&PlannerConfig::default(), &RuleSet::default())
    }
}

impl StrengthEvaluator {
    pub fn new(config: &PlannerConfig, rules: &RuleSet) -> Self {
        StrengthEvaluator {
            base_value: config.base_unit_value.max(0.0),
            zero_attack_penalty: config.zero_attack_penalty,
            transport_escort_value: config.transport_escort_value.max(0.0),
            submarine_factor: config.unescorted_submarine_factor.clamp(0.0, 1.0),
            artillery_bonus: config.artillery_bonus.max(0.0),
            submarines_need_destroyer: rules.submarines_need_destroyer,
            air_attacks_at_sea: rules.air_attacks_at_sea,
        }
    }

    /// Returns true when a unit takes part in the given kind of battle.
    fn participates(&self, v: &UnitView<'_>, attacking: bool, sea_battle: bool) -> bool {
        if v.kind.is_infrastructure {
            return false;
        }
        if sea_battle {
            v.kind.is_sea() || (v.kind.is_air() && (!attacking || self.air_attacks_at_sea))
        } else {
            !v.kind.is_sea()
        }
    }

    /// Value of one participating unit, never negative.
    fn unit_value(&self, v: &UnitView<'_>, attacking: bool, transports_can_die: bool, subs_targetable: bool) -> f32 {
        let kind = v.kind;
        if kind.is_transport() {
            return if transports_can_die {
                self.transport_escort_value
            } else {
                0.0
            };
        }
        let hit_factor = if kind.is_multi_hit() { 2.0 } else { 1.0 };
        let combat = if attacking {
            (kind.attack * kind.attack_rolls.max(1)) as f32
        } else {
            kind.defense as f32
        };
        let mut value = self.base_value + combat * hit_factor;
        if attacking && kind.attack == 0 {
            value -= self.zero_attack_penalty;
        }
        if kind.is_submarine && !subs_targetable {
            value *= self.submarine_factor;
        }
        value.max(0.0)
    }

    /// Combat strength of `units` in a battle of the given kind.
    ///
    /// Duplicate unit handles are counted once, so carrier-borne air listed
    /// with its carrier's stack does not inflate the total. An attacking
    /// stack in which no participant has attack of at least one is worth
    /// nothing.
    pub fn evaluate(
        &self,
        units: &[UnitView<'_>],
        attacking: bool,
        sea_battle: bool,
        transports_can_die: bool,
    ) -> f32 {
        let mut seen: HashSet<UnitId> = HashSet::with_capacity(units.len());
        let mut members = Vec::with_capacity(units.len());
        for v in units {
            if seen.insert(v.id()) && self.participates(v, attacking, sea_battle) {
                members.push(*v);
            }
        }
        if members.is_empty() {
            return 0.0;
        }
        if attacking && !members.iter().any(|v| v.kind.attack >= 1) {
            return 0.0;
        }

        let subs_targetable =
            !self.submarines_need_destroyer || members.iter().any(|v| v.kind.is_destroyer);
        let mut total: f32 = members
            .iter()
            .map(|v| self.unit_value(v, attacking, transports_can_die, subs_targetable))
            .sum();

        if attacking && !sea_battle {
            let artillery = members.iter().filter(|v| v.kind.is_artillery).count();
            let supportable = members.iter().filter(|v| v.kind.artillery_supportable).count();
            total += self.artillery_bonus * artillery.min(supportable) as f32;
        }
        total
    }
}
