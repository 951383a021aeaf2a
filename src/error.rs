use crate::data::{ExamId, RoomId, TimeslotId};
use thiserror::Error;

/// Fatal errors of a scheduling run. Per-exam placement failures are not errors;
/// they are reported in [`crate::report::SchedulingReport::unscheduled`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid {entity} '{id}': {reason}")]
    InvalidInput {
        entity: &'static str,
        id: String,
        reason: String,
    },

    #[error("duplicate {kind} identifier '{id}'")]
    DuplicateIdentifier { kind: &'static str, id: String },

    /// Internal invariant violation: a slot was handed out twice.
    #[error("slot {room}@{timeslot} consumed twice")]
    AlreadyConsumed { room: RoomId, timeslot: TimeslotId },

    #[error("exam '{0}' has no outcome in the report")]
    OutcomeMissing(ExamId),

    #[error("exam '{0}' has more than one outcome in the report")]
    OutcomeRepeated(ExamId),

    #[error("search '{search}' does not support constraint '{constraint}'")]
    UnsupportedConstraint {
        search: &'static str,
        constraint: &'static str,
    },

    #[error("scheduling run cancelled after {processed} exams")]
    Cancelled { processed: usize },

    #[error("scheduling run exceeded its time budget after {processed} exams")]
    DeadlineExceeded { processed: usize },

    #[error("solver failure: {0}")]
    Solver(String),
}

impl ScheduleError {
    pub(crate) fn invalid(entity: &'static str, id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            entity,
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Errors that indicate a defect in the core rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::AlreadyConsumed { .. }
                | Self::OutcomeMissing(_)
                | Self::OutcomeRepeated(_)
                | Self::Solver(_)
        )
    }
}
