//! Planner configuration.
//!
//! Every scoring coefficient the planner uses is a named field here. The
//! defaults are the empirically tuned values the heuristics were built
//! around; none of them is a contract, and any may be overridden from a
//! JSON file whose missing keys fall back to the defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors that can occur while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tuning constants for evaluation, ranking, recruitment and purchasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Random seed for the strategy policy (`None` = entropy).
    pub seed: Option<u64>,

    // Strength evaluation.
    /// Value every combat unit carries before its combat statistic.
    pub base_unit_value: f32,
    /// Deducted from attacking units with zero attack.
    pub zero_attack_penalty: f32,
    /// Value of a transport when transports may be taken as casualties.
    pub transport_escort_value: f32,
    /// Multiplier for submarines that cannot be targeted (no destroyer).
    pub unescorted_submarine_factor: f32,
    /// Added per artillery/infantry pair in a land attack.
    pub artillery_bonus: f32,

    // Threat estimation.
    /// Share of the non-strongest enemies added to the strongest one.
    pub other_enemies_factor: f32,
    /// Land steps a blitzing unit may cover to threaten a territory.
    pub blitz_threat_radius: u32,
    /// Sea steps a ship may cover to threaten a sea zone.
    pub ship_threat_radius: u32,
    /// Reinforcements assumed to reach the capital before an attack lands.
    pub expected_reinforcement: f32,
    /// Multiplier applied to the capital garrison when judging danger.
    pub capital_threat_factor: f32,

    // Attack thresholds.
    /// Defender strength multiplier for ordinary attacks.
    pub attack_factor: f32,
    /// Multiplier for targets adjacent to our capital.
    pub emergency_attack_factor: f32,
    /// Multiplier used once our capital has fallen.
    pub capital_lost_attack_factor: f32,
    /// Strength added on top of every scaled requirement.
    pub safety_margin: f32,
    /// Maximum overshoot ratio tolerated when choosing the last recruit.
    pub recruit_slack: f32,
    /// Maximum attack objectives examined per phase.
    pub max_attack_targets: usize,

    // Territory ranking.
    pub production_weight: f32,
    /// Bonus for land with a land route to an enemy capital.
    pub capital_route_bonus: f32,
    /// Cap on the distance decay applied to the capital route bonus.
    pub capital_route_decay_cap: f32,
    /// Bonus for territories on a shortest path between capitals.
    pub capital_path_bonus: f32,
    pub factory_bonus: f32,
    /// Bonus per enemy air unit in a target territory.
    pub air_target_bonus: f32,
    pub island_bonus: f32,
    /// Penalty for territories already attacked this epoch.
    pub attacked_penalty: f32,
    pub neutral_penalty: f32,
    /// Weight of the net strength balance in attack ranking.
    pub attack_net_weight: f32,
    /// Weight of the net strength balance in defense ranking.
    pub defend_net_weight: f32,
    pub enemy_neighbor_bonus: f32,
    pub allied_factory_neighbor_bonus: f32,
    /// Penalty for friendly land with no route to any enemy.
    pub no_enemy_route_penalty: f32,
    /// Cap on the distance penalty for friendly land far from enemies.
    pub enemy_route_penalty_cap: f32,

    // Battles.
    /// Retreat once our attack falls below this share of the defense.
    pub retreat_ratio: f32,

    // Purchasing.
    /// Relative odds of each strategy vector when the capital is safe,
    /// in the order attack, defense, max-units, mobility.
    pub strategy_weights: [f32; 4],
    /// Buy a transport first when an amphibious target has none.
    pub reserve_transport: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            seed: None,
            base_unit_value: 1.0,
            zero_attack_penalty: 0.5,
            transport_escort_value: 0.5,
            unescorted_submarine_factor: 0.0,
            artillery_bonus: 1.0,
            other_enemies_factor: 0.40,
            blitz_threat_radius: 2,
            ship_threat_radius: 3,
            expected_reinforcement: 5.0,
            capital_threat_factor: 1.0,
            attack_factor: 1.36,
            emergency_attack_factor: 1.22,
            capital_lost_attack_factor: 0.72,
            safety_margin: 3.0,
            recruit_slack: 1.25,
            max_attack_targets: 8,
            production_weight: 2.0,
            capital_route_bonus: 16.0,
            capital_route_decay_cap: 8.0,
            capital_path_bonus: 4.0,
            factory_bonus: 4.0,
            air_target_bonus: 2.0,
            island_bonus: 5.0,
            attacked_penalty: 20.0,
            neutral_penalty: 100.0,
            attack_net_weight: 0.25,
            defend_net_weight: 0.5,
            enemy_neighbor_bonus: 2.0,
            allied_factory_neighbor_bonus: 8.0,
            no_enemy_route_penalty: 20.0,
            enemy_route_penalty_cap: 10.0,
            retreat_ratio: 0.8,
            strategy_weights: [0.35, 0.2, 0.25, 0.2],
            reserve_transport: true,
        }
    }
}

impl PlannerConfig {
    /// Parses a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Rejects values the planner cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recruit_slack < 1.0 {
            return Err(ConfigError::Invalid {
                field: "recruit_slack",
                reason: format!("{} is below 1.0", self.recruit_slack),
            });
        }
        if self.strategy_weights.iter().any(|&w| w < 0.0)
            || self.strategy_weights.iter().sum::<f32>() <= 0.0
        {
            return Err(ConfigError::Invalid {
                field: "strategy_weights",
                reason: "weights must be non-negative with a positive sum".into(),
            });
        }
        let factors = [
            ("attack_factor", self.attack_factor),
            ("emergency_attack_factor", self.emergency_attack_factor),
            ("capital_lost_attack_factor", self.capital_lost_attack_factor),
            ("base_unit_value", self.base_unit_value),
        ];
        for (field, value) in factors {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} is negative"),
                });
            }
        }
        Ok(())
    }
}
