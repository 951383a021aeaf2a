//! Feasibility predicates that can be plugged into any search on top of the
//! built-in capacity, eligibility and exclusivity checks.

use crate::data::Exam;
use crate::index::{CandidateIndex, SlotKey};
use crate::tracker::ConflictTracker;

pub trait Constraint: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether `exam` may occupy `slot` given the placements recorded so far.
    fn permits(
        &self,
        exam: &Exam,
        slot: SlotKey,
        index: &CandidateIndex<'_>,
        tracker: &ConflictTracker,
    ) -> bool;

    /// True when the verdict depends on earlier placements in the same run.
    fn stateful(&self) -> bool {
        false
    }
}

/// The exam must fit into the timeslot. Unknown durations or unparsable
/// timeslot markers are accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationFits;

impl Constraint for DurationFits {
    fn name(&self) -> &'static str {
        "duration-fits"
    }

    fn permits(
        &self,
        exam: &Exam,
        slot: SlotKey,
        index: &CandidateIndex<'_>,
        _tracker: &ConflictTracker,
    ) -> bool {
        match (exam.duration_minutes, index.timeslot(slot.timeslot).length_minutes()) {
            (Some(duration), Some(length)) => duration <= length,
            _ => true,
        }
    }
}

/// An instructor cannot supervise two exams in the same timeslot.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstructorExclusive;

impl Constraint for InstructorExclusive {
    fn name(&self) -> &'static str {
        "instructor-exclusive"
    }

    fn permits(
        &self,
        exam: &Exam,
        slot: SlotKey,
        _index: &CandidateIndex<'_>,
        tracker: &ConflictTracker,
    ) -> bool {
        exam.instructor
            .as_deref()
            .is_none_or(|instructor| !tracker.instructor_busy(instructor, slot.timeslot))
    }

    fn stateful(&self) -> bool {
        true
    }
}
