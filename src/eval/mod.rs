//! Strength and threat evaluation.
//!
//! `strength` turns a unit stack into a scalar combat value; `threat`
//! builds on it to estimate garrisons, the force hostile players could
//! bring against a territory, and whether our capital is in danger.

pub mod strength;
pub mod threat;

pub use strength::StrengthEvaluator;
pub use threat::{capital_danger, potential_attack_strength, territory_strength};
