//! Commitment ledger.
//!
//! Records which units have been allocated to a move (or deliberately held
//! in place) during the current epoch. Entries are append-only within an
//! epoch; `advance` starts a new one. A unit may appear at most once per
//! epoch, and an attempt to commit it again is a planner defect reported
//! as `PlanError::DoubleCommit`.
//!
//! Cargo put aboard a transport is committed as it embarks. The ledger
//! remembers which transport carries it, so the phase that later sails
//! that transport lands the cargo without naming it again.
//!
//! Tentative planning works on a `fork`: a copy that remembers where it
//! branched. If the plan is kept, `absorb` appends only the entries made on
//! the fork; if it is abandoned, the fork is simply dropped.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::PlanError;
use crate::board::UnitId;

/// A move segment of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Epoch {
    Combat,
    NonCombat,
}

/// Why a unit is in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Commitment {
    /// Assigned to a move order.
    Moved,
    /// Kept in place on purpose, e.g. as a garrison.
    Held,
}

/// Per-epoch set of committed unit handles.
#[derive(Debug, Clone)]
pub struct CommitmentLedger {
    epoch: Epoch,
    entries: Vec<(UnitId, Commitment)>,
    index: HashSet<UnitId>,
    /// Cargo embarked this epoch, by transport.
    aboard: HashMap<UnitId, Vec<UnitId>>,
    /// Number of entries inherited from the parent when forked.
    base_len: usize,
}

impl CommitmentLedger {
    pub fn new(epoch: Epoch) -> Self {
        CommitmentLedger {
            epoch,
            entries: Vec::new(),
            index: HashSet::new(),
            aboard: HashMap::new(),
            base_len: 0,
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_committed(&self, unit: UnitId) -> bool {
        self.index.contains(&unit)
    }

    fn record(&mut self, unit: UnitId, how: Commitment) -> Result<(), PlanError> {
        if !self.index.insert(unit) {
            return Err(PlanError::DoubleCommit {
                unit,
                epoch: self.epoch,
            });
        }
        self.entries.push((unit, how));
        Ok(())
    }

    /// Assigns a unit to a move.
    pub fn commit(&mut self, unit: UnitId) -> Result<(), PlanError> {
        self.record(unit, Commitment::Moved)
    }

    /// Assigns every unit or none of them.
    pub fn commit_all(&mut self, units: &[UnitId]) -> Result<(), PlanError> {
        let mut batch = HashSet::with_capacity(units.len());
        for &u in units {
            if self.index.contains(&u) || !batch.insert(u) {
                return Err(PlanError::DoubleCommit {
                    unit: u,
                    epoch: self.epoch,
                });
            }
        }
        for &u in units {
            self.record(u, Commitment::Moved)?;
        }
        Ok(())
    }

    /// Commits `cargo` as loaded onto `transport`. The transport itself
    /// stays free for whichever phase sails it.
    pub fn embark(&mut self, transport: UnitId, cargo: &[UnitId]) -> Result<(), PlanError> {
        self.commit_all(cargo)?;
        self.aboard.entry(transport).or_default().extend_from_slice(cargo);
        Ok(())
    }

    /// Cargo embarked onto `transport` this epoch.
    pub fn embarked(&self, transport: UnitId) -> &[UnitId] {
        self.aboard.get(&transport).map_or(&[], Vec::as_slice)
    }

    /// Reserves a unit without moving it. Returns false when the unit was
    /// already taken, which is not an error for a hold.
    pub fn hold(&mut self, unit: UnitId) -> bool {
        self.record(unit, Commitment::Held).is_ok()
    }

    /// Committed units with the reason they were taken, in commit order.
    pub fn entries(&self) -> &[(UnitId, Commitment)] {
        &self.entries
    }

    /// Units assigned to moves, in commit order.
    pub fn moved(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.entries
            .iter()
            .filter(|(_, c)| *c == Commitment::Moved)
            .map(|&(u, _)| u)
    }

    /// Branches off a tentative copy.
    pub fn fork(&self) -> CommitmentLedger {
        CommitmentLedger {
            epoch: self.epoch,
            entries: self.entries.clone(),
            index: self.index.clone(),
            aboard: self.aboard.clone(),
            base_len: self.entries.len(),
        }
    }

    /// Merges the entries a fork made since it branched.
    pub fn absorb(&mut self, fork: CommitmentLedger) -> Result<(), PlanError> {
        if fork.epoch != self.epoch {
            return Err(PlanError::EpochMismatch {
                expected: self.epoch,
                found: fork.epoch,
            });
        }
        let added = &fork.entries[fork.base_len..];
        let units: Vec<UnitId> = added.iter().map(|&(u, _)| u).collect();
        let mut batch = HashSet::with_capacity(units.len());
        for &u in &units {
            if self.index.contains(&u) || !batch.insert(u) {
                return Err(PlanError::DoubleCommit {
                    unit: u,
                    epoch: self.epoch,
                });
            }
        }
        for &(u, how) in added {
            self.record(u, how)?;
        }
        for (transport, cargo) in fork.aboard {
            let ours = self.aboard.entry(transport).or_default();
            for c in cargo {
                if !ours.contains(&c) {
                    ours.push(c);
                }
            }
        }
        Ok(())
    }

    /// Clears the ledger and starts `epoch`.
    pub fn advance(&mut self, epoch: Epoch) {
        self.epoch = epoch;
        self.entries.clear();
        self.index.clear();
        self.aboard.clear();
        self.base_len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_once() {
        let mut ledger = CommitmentLedger::new(Epoch::Combat);
        ledger.commit(UnitId(1)).unwrap();
        assert!(ledger.is_committed(UnitId(1)));
        assert!(!ledger.is_committed(UnitId(2)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn double_commit_is_an_error() {
        let mut ledger = CommitmentLedger::new(Epoch::Combat);
        ledger.commit(UnitId(1)).unwrap();
        assert_eq!(
            ledger.commit(UnitId(1)),
            Err(PlanError::DoubleCommit { unit: UnitId(1), epoch: Epoch::Combat })
        );
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn commit_all_is_atomic() {
        let mut ledger = CommitmentLedger::new(Epoch::Combat);
        ledger.commit(UnitId(3)).unwrap();
        assert!(ledger.commit_all(&[UnitId(1), UnitId(2), UnitId(3)]).is_err());
        assert!(!ledger.is_committed(UnitId(1)));
        assert!(ledger.commit_all(&[UnitId(4), UnitId(4)]).is_err());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn hold_reserves_without_moving() {
        let mut ledger = CommitmentLedger::new(Epoch::NonCombat);
        assert!(ledger.hold(UnitId(5)));
        assert!(!ledger.hold(UnitId(5)));
        assert!(ledger.commit(UnitId(5)).is_err());
        assert_eq!(ledger.moved().count(), 0);
    }

    #[test]
    fn dropped_fork_leaves_parent_untouched() {
        let mut ledger = CommitmentLedger::new(Epoch::Combat);
        ledger.commit(UnitId(1)).unwrap();
        let mut fork = ledger.fork();
        fork.commit(UnitId(2)).unwrap();
        assert!(fork.is_committed(UnitId(1)));
        assert!(fork.commit(UnitId(1)).is_err());
        drop(fork);
        assert!(!ledger.is_committed(UnitId(2)));
    }

    #[test]
    fn absorb_appends_new_entries() {
        let mut ledger = CommitmentLedger::new(Epoch::Combat);
        ledger.commit(UnitId(1)).unwrap();
        let mut fork = ledger.fork();
        fork.commit(UnitId(2)).unwrap();
        fork.hold(UnitId(3));
        ledger.absorb(fork).unwrap();
        assert_eq!(
            ledger.entries(),
            &[
                (UnitId(1), Commitment::Moved),
                (UnitId(2), Commitment::Moved),
                (UnitId(3), Commitment::Held)
            ]
        );
    }

    #[test]
    fn absorb_detects_conflicts() {
        let mut ledger = CommitmentLedger::new(Epoch::Combat);
        let mut fork = ledger.fork();
        fork.commit(UnitId(2)).unwrap();
        ledger.commit(UnitId(2)).unwrap();
        assert!(ledger.absorb(fork).is_err());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn absorb_rejects_other_epoch() {
        let mut ledger = CommitmentLedger::new(Epoch::NonCombat);
        let fork = CommitmentLedger::new(Epoch::Combat).fork();
        assert_eq!(
            ledger.absorb(fork),
            Err(PlanError::EpochMismatch { expected: Epoch::NonCombat, found: Epoch::Combat })
        );
    }

    #[test]
    fn embarked_cargo_is_committed_but_transport_is_not() {
        let mut ledger = CommitmentLedger::new(Epoch::Combat);
        ledger.embark(UnitId(9), &[UnitId(1), UnitId(2)]).unwrap();
        assert!(ledger.is_committed(UnitId(1)) && ledger.is_committed(UnitId(2)));
        assert!(!ledger.is_committed(UnitId(9)));
        assert_eq!(ledger.embarked(UnitId(9)), &[UnitId(1), UnitId(2)]);
        assert!(ledger.embarked(UnitId(8)).is_empty());
        assert!(ledger.embark(UnitId(8), &[UnitId(2)]).is_err());

        let mut fork = ledger.fork();
        fork.embark(UnitId(9), &[UnitId(3)]).unwrap();
        ledger.absorb(fork).unwrap();
        assert_eq!(ledger.embarked(UnitId(9)).len(), 3);
        ledger.advance(Epoch::NonCombat);
        assert!(ledger.embarked(UnitId(9)).is_empty());
    }

    #[test]
    fn advance_clears() {
        let mut ledger = CommitmentLedger::new(Epoch::Combat);
        ledger.commit(UnitId(1)).unwrap();
        ledger.advance(Epoch::NonCombat);
        assert!(ledger.is_empty());
        assert_eq!(ledger.epoch(), Epoch::NonCombat);
        ledger.commit(UnitId(1)).unwrap();
    }
}
