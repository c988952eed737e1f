//! Rule switches that change how strength and movement are judged.

use serde::{Deserialize, Serialize};

/// Game-variant rule flags read by the evaluator and the reference host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Transports may be chosen as casualties and so soak hits.
    pub transports_can_die: bool,
    /// Submarines can only be hit while the enemy has a destroyer present.
    pub submarines_need_destroyer: bool,
    /// Air units may join attacks on sea zones.
    pub air_attacks_at_sea: bool,
    /// Blitzing units may pass through empty enemy territory, capturing it.
    pub blitz_through_empty_enemy: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        RuleSet {
            transports_can_die: true,
            submarines_need_destroyer: false,
            air_attacks_at_sea: true,
            blitz_through_empty_enemy: true,
        }
    }
}
