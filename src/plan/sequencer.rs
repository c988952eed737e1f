//! Phase sequencing.
//!
//! `PhaseSequencer` owns the commitment ledger for a turn and runs each
//! epoch's phases in their fixed order. Orders a phase produces are
//! submitted before the next phase plans, so later phases see the board
//! as the host left it. A rejected order is logged and skipped; only a
//! planner invariant violation ends the epoch early.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::context::PlanningContext;
use super::ledger::{CommitmentLedger, Epoch};
use super::phases::Phase;
use super::PlanError;
use crate::host::Host;

/// Submission counts for one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub phase: &'static str,
    pub submitted: usize,
    pub rejected: usize,
}

/// Submission counts for one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpochReport {
    pub epoch: Epoch,
    pub submitted: usize,
    pub rejected: usize,
    pub phases: Vec<PhaseReport>,
}

/// Runs the move phases of a turn against a host.
#[derive(Debug, Clone)]
pub struct PhaseSequencer {
    ledger: CommitmentLedger,
}

impl Default for PhaseSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseSequencer {
    pub fn new() -> Self {
        PhaseSequencer {
            ledger: CommitmentLedger::new(Epoch::Combat),
        }
    }

    /// Commitments made so far in the current epoch.
    pub fn ledger(&self) -> &CommitmentLedger {
        &self.ledger
    }

    /// Plans and submits every phase of `epoch`.
    pub fn run_epoch<H: Host>(
        &mut self,
        host: &mut H,
        ctx: &mut PlanningContext,
        epoch: Epoch,
    ) -> Result<EpochReport, PlanError> {
        self.ledger.advance(epoch);
        ctx.refresh(&*host);
        host.begin_epoch(ctx.player, epoch);

        let mut report = EpochReport {
            epoch,
            submitted: 0,
            rejected: 0,
            phases: Vec::new(),
        };
        for &phase in Phase::sequence(epoch) {
            let orders = phase.plan(&*host, ctx, &mut self.ledger)?;
            let mut summary = PhaseReport {
                phase: phase.name(),
                submitted: 0,
                rejected: 0,
            };
            for order in &orders {
                match host.submit_move(ctx.player, order) {
                    Ok(()) => summary.submitted += 1,
                    Err(e) => {
                        warn!(%phase, units = order.units.len(), error = %e, "order rejected");
                        summary.rejected += 1;
                    }
                }
            }
            debug!(%phase, submitted = summary.submitted, rejected = summary.rejected, "phase done");
            report.submitted += summary.submitted;
            report.rejected += summary.rejected;
            report.phases.push(summary);
        }

        info!(
            player = ctx.player.0,
            ?epoch,
            submitted = report.submitted,
            rejected = report.rejected,
            committed = self.ledger.len(),
            "epoch planned"
        );
        Ok(report)
    }

    /// Runs the combat epoch and then the non-combat epoch.
    pub fn run_turn<H: Host>(
        &mut self,
        host: &mut H,
        ctx: &mut PlanningContext,
    ) -> Result<[EpochReport; 2], PlanError> {
        let combat = self.run_epoch(host, ctx, Epoch::Combat)?;
        let noncombat = self.run_epoch(host, ctx, Epoch::NonCombat)?;
        self.ledger.advance(Epoch::Combat);
        Ok([combat, noncombat])
    }
}
