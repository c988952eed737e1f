//! Turn planning.
//!
//! The planner works through a fixed sequence of phases per epoch. Each
//! phase ranks territories, asks the recruiter to assemble forces against
//! the best objectives, and hands the resulting move orders to the host.
//! The commitment ledger keeps any unit from being used twice in an epoch.
//! Purchasing, placement and battle decisions live alongside.

pub mod battle;
pub mod context;
pub mod ledger;
pub mod phases;
pub mod place;
pub mod purchase;
pub mod ranker;
pub mod recruit;
pub mod sequencer;

use crate::board::UnitId;

pub use battle::{retreat_decision, select_casualties};
pub use context::PlanningContext;
pub use ledger::{Commitment, CommitmentLedger, Epoch};
pub use phases::Phase;
pub use place::plan_placements;
pub use purchase::{plan_purchase, PurchaseAllocator, PurchaseMixes, PurchaseOption, StrategyPolicy, StrategyVector};
pub use ranker::{RankMode, RankedTerritory, TerritoryRanker};
pub use recruit::{ForceRecruiter, RecruitKind, Recruitment, StrengthTarget};
pub use sequencer::{EpochReport, PhaseReport, PhaseSequencer};

/// Planner invariant violations. Any of these means the planner itself is
/// wrong, so the turn is aborted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("unit {unit:?} committed twice in the {epoch:?} epoch")]
    DoubleCommit { unit: UnitId, epoch: Epoch },

    #[error("cannot merge a {found:?} ledger into the {expected:?} epoch")]
    EpochMismatch { expected: Epoch, found: Epoch },

    #[error("negative purchase budget {0}")]
    NegativeBudget(i64),
}
