use crate::data::{Assignment, ExamId, Status};
use crate::error::ScheduleError;
use crate::index::{CandidateIndex, SlotKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Why an exam could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum FailureReason {
    /// Every room is smaller than the exam.
    NoRoomLargeEnough,
    /// The exam's eligible timeslots name no known timeslot.
    NoEligibleTimeslot,
    /// Large enough rooms exist but every such slot is already taken.
    AllSuitableSlotsTaken,
    /// Free suitable slots existed but a pluggable constraint rejected them all.
    BlockedByConstraint,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoRoomLargeEnough => "NoRoomLargeEnough",
            Self::NoEligibleTimeslot => "NoEligibleTimeslot",
            Self::AllSuitableSlotsTaken => "AllSuitableSlotsTaken",
            Self::BlockedByConstraint => "BlockedByConstraint",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub reason: FailureReason,
    pub detail: String,
}

impl Failure {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

/// Result of processing one exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Scheduled(SlotKey),
    Unscheduled(Failure),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Unscheduled {
    pub exam_id: ExamId,
    pub reason: FailureReason,
    pub detail: String,
}

/// Final output of a run: placements in processing order, then the exams
/// that could not be placed, also in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingReport {
    pub assignments: Vec<Assignment>,
    pub unscheduled: Vec<Unscheduled>,
}

impl SchedulingReport {
    pub fn scheduled_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn total(&self) -> usize {
        self.assignments.len() + self.unscheduled.len()
    }

    pub fn assignment_for(&self, exam_id: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.exam_id == exam_id)
    }

    pub fn failure_for(&self, exam_id: &str) -> Option<&Unscheduled> {
        self.unscheduled.iter().find(|u| u.exam_id == exam_id)
    }
}

/// Aggregates per-exam outcomes and enforces that every expected exam is
/// accounted for exactly once.
#[derive(Debug)]
pub struct ReportBuilder {
    pending: HashMap<ExamId, bool>,
    report: SchedulingReport,
}

impl ReportBuilder {
    pub fn new<'e, I>(expected: I) -> Self
    where
        I: IntoIterator<Item = &'e str>,
    {
        Self {
            pending: expected.into_iter().map(|id| (id.to_string(), false)).collect(),
            report: SchedulingReport::default(),
        }
    }

    fn mark(&mut self, exam_id: &str) -> Result<(), ScheduleError> {
        match self.pending.get_mut(exam_id) {
            Some(seen) if !*seen => {
                *seen = true;
                Ok(())
            }
            _ => Err(ScheduleError::OutcomeRepeated(exam_id.to_string())),
        }
    }

    pub fn record(
        &mut self,
        exam_id: &str,
        outcome: Outcome,
        index: &CandidateIndex<'_>,
    ) -> Result<(), ScheduleError> {
        match outcome {
            Outcome::Scheduled(key) => {
                let slot = index.slot(key);
                self.scheduled(Assignment {
                    exam_id: exam_id.to_string(),
                    room_id: slot.room_id,
                    timeslot_id: slot.timeslot_id,
                    status: Status::Scheduled,
                })
            }
            Outcome::Unscheduled(failure) => self.unscheduled(exam_id, failure),
        }
    }

    pub fn scheduled(&mut self, assignment: Assignment) -> Result<(), ScheduleError> {
        self.mark(&assignment.exam_id)?;
        self.report.assignments.push(assignment);
        Ok(())
    }

    pub fn unscheduled(&mut self, exam_id: &str, failure: Failure) -> Result<(), ScheduleError> {
        self.mark(exam_id)?;
        self.report.unscheduled.push(Unscheduled {
            exam_id: exam_id.to_string(),
            reason: failure.reason,
            detail: failure.detail,
        });
        Ok(())
    }

    pub fn finish(self) -> Result<SchedulingReport, ScheduleError> {
        let mut missing: Vec<&ExamId> = self
            .pending
            .iter()
            .filter(|(_, seen)| !**seen)
            .map(|(id, _)| id)
            .collect();
        missing.sort();
        if let Some(id) = missing.first() {
            return Err(ScheduleError::OutcomeMissing((*id).clone()));
        }
        Ok(self.report)
    }
}
