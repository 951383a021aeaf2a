//! Assignment search: turns an ordered exam sequence into per-exam outcomes.

use crate::constraint::Constraint;
use crate::data::Exam;
use crate::error::ScheduleError;
use crate::index::{CandidateIndex, SlotKey};
use crate::report::{Failure, FailureReason, Outcome};
use crate::tracker::ConflictTracker;
use log::trace;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// A placement strategy. Implementations must process exams in the given order,
/// return exactly one outcome per exam, and record every placement in the
/// context's tracker.
pub trait Search: Send + Sync {
    fn name(&self) -> &'static str;

    fn assign(
        &self,
        exams: &[&Exam],
        ctx: &mut SearchContext<'_, '_>,
    ) -> Result<Vec<Outcome>, ScheduleError>;
}

/// Cooperative cancellation, checked between exams.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunGuard<'c> {
    deadline: Option<Instant>,
    cancel: Option<&'c AtomicBool>,
}

impl<'c> RunGuard<'c> {
    pub fn new(deadline: Option<Instant>, cancel: Option<&'c AtomicBool>) -> Self {
        Self { deadline, cancel }
    }

    pub fn check(&self, processed: usize) -> Result<(), ScheduleError> {
        if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(ScheduleError::Cancelled { processed });
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(ScheduleError::DeadlineExceeded { processed });
        }
        Ok(())
    }
}

/// Per-run state shared by all searches.
pub struct SearchContext<'r, 'a> {
    pub index: &'r CandidateIndex<'a>,
    pub tracker: ConflictTracker,
    pub constraints: &'r [Box<dyn Constraint>],
    pub guard: RunGuard<'r>,
}

impl<'r, 'a> SearchContext<'r, 'a> {
    pub fn new(
        index: &'r CandidateIndex<'a>,
        tracker: ConflictTracker,
        constraints: &'r [Box<dyn Constraint>],
        guard: RunGuard<'r>,
    ) -> Self {
        Self {
            index,
            tracker,
            constraints,
            guard,
        }
    }

    /// Slot is bookable for this exam right now. Capacity and eligibility are
    /// the caller's responsibility.
    pub fn admits(&self, exam: &Exam, key: SlotKey) -> bool {
        self.index.room_available(key.room, key.timeslot)
            && !self.tracker.is_consumed(key)
            && self
                .constraints
                .iter()
                .all(|c| c.permits(exam, key, self.index, &self.tracker))
    }

    pub fn place(&mut self, exam: &Exam, key: SlotKey) -> Result<(), ScheduleError> {
        self.tracker.consume(key)?;
        if let Some(instructor) = &exam.instructor {
            self.tracker.book_instructor(instructor, key.timeslot);
        }
        Ok(())
    }

    /// Fails for searches that evaluate constraints up front and so cannot
    /// honour constraints depending on earlier placements.
    pub fn require_static(&self, search: &'static str) -> Result<(), ScheduleError> {
        match self.constraints.iter().find(|c| c.stateful()) {
            Some(constraint) => Err(ScheduleError::UnsupportedConstraint {
                search,
                constraint: constraint.name(),
            }),
            None => Ok(()),
        }
    }

    /// Currently admissible slots for the exam, in first-fit scan order.
    pub fn candidates(&self, exam: &Exam) -> Vec<SlotKey> {
        let fitting = self.index.fitting_rooms(exam.students_count);
        self.index
            .eligible_timeslots(exam)
            .flat_map(|t| fitting.clone().map(move |r| SlotKey::new(r, t)))
            .filter(|&key| self.admits(exam, key))
            .collect()
    }

    /// Explains why no slot is left for the exam.
    pub fn diagnose(&self, exam: &Exam) -> Failure {
        let seats = exam.students_count;
        match self.index.max_capacity() {
            None => {
                return Failure::new(FailureReason::NoRoomLargeEnough, "no rooms are defined");
            }
            Some(largest) if largest < seats => {
                return Failure::new(
                    FailureReason::NoRoomLargeEnough,
                    format!("needs {seats} seats, largest room holds {largest}"),
                );
            }
            Some(_) => {}
        }

        let eligible: Vec<usize> = self.index.eligible_timeslots(exam).collect();
        if eligible.is_empty() {
            let detail = if self.index.timeslots().is_empty() {
                "no timeslots are defined"
            } else {
                "none of its eligible timeslots exist"
            };
            return Failure::new(FailureReason::NoEligibleTimeslot, detail);
        }

        let fitting = self.index.fitting_rooms(seats);
        let mut suitable = 0usize;
        let mut blocked_by = None;
        for &t in &eligible {
            for r in fitting.clone() {
                if !self.index.room_available(r, t) {
                    continue;
                }
                suitable += 1;
                let key = SlotKey::new(r, t);
                if self.tracker.is_consumed(key) {
                    continue;
                }
                if let Some(constraint) = self
                    .constraints
                    .iter()
                    .find(|c| !c.permits(exam, key, self.index, &self.tracker))
                {
                    blocked_by.get_or_insert(constraint.name());
                }
            }
        }

        match blocked_by {
            Some(name) => Failure::new(
                FailureReason::BlockedByConstraint,
                format!("every free suitable slot is rejected by '{name}'"),
            ),
            None if suitable == 0 => Failure::new(
                FailureReason::AllSuitableSlotsTaken,
                "no large enough room is available in its eligible timeslots",
            ),
            None => Failure::new(
                FailureReason::AllSuitableSlotsTaken,
                format!("all {suitable} suitable slots are taken"),
            ),
        }
    }
}

/// Scan order of the first-fit search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionRule {
    /// Earliest timeslot first, smallest sufficient room within it.
    #[default]
    TimeslotMajor,
    /// Smallest sufficient room first, earliest timeslot within it.
    RoomMajor,
}

/// Greedy sequential placement: each exam takes the first admissible slot in
/// scan order. Deterministic, not guaranteed maximal.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFit {
    rule: SelectionRule,
}

impl FirstFit {
    pub fn new(rule: SelectionRule) -> Self {
        Self { rule }
    }

    fn find(&self, exam: &Exam, ctx: &SearchContext<'_, '_>) -> Option<SlotKey> {
        let fitting = ctx.index.fitting_rooms(exam.students_count);
        let timeslots: Vec<usize> = ctx.index.eligible_timeslots(exam).collect();
        match self.rule {
            SelectionRule::TimeslotMajor => timeslots
                .iter()
                .flat_map(|&t| fitting.clone().map(move |r| SlotKey::new(r, t)))
                .find(|&key| ctx.admits(exam, key)),
            SelectionRule::RoomMajor => fitting
                .flat_map(|r| timeslots.iter().map(move |&t| SlotKey::new(r, t)))
                .find(|&key| ctx.admits(exam, key)),
        }
    }
}

impl Search for FirstFit {
    fn name(&self) -> &'static str {
        match self.rule {
            SelectionRule::TimeslotMajor => "first-fit",
            SelectionRule::RoomMajor => "room-major",
        }
    }

    fn assign(
        &self,
        exams: &[&Exam],
        ctx: &mut SearchContext<'_, '_>,
    ) -> Result<Vec<Outcome>, ScheduleError> {
        let mut outcomes = Vec::with_capacity(exams.len());
        for (processed, exam) in exams.iter().enumerate() {
            ctx.guard.check(processed)?;
            let outcome = match self.find(exam, ctx) {
                Some(key) => {
                    ctx.place(exam, key)?;
                    trace!("Exam {} placed at {}", exam.id, ctx.index.slot(key));
                    Outcome::Scheduled(key)
                }
                None => {
                    let failure = ctx.diagnose(exam);
                    trace!("Exam {} unplaced: {}", exam.id, failure.reason);
                    Outcome::Unscheduled(failure)
                }
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}
