//! Ordering policies: the sequence in which exams are offered to the search.
//!
//! Every policy is completed by an ascending exam identifier tie-break, so the
//! resulting order is total and reproducible for identical inputs.

use crate::data::Exam;
use crate::index::CandidateIndex;
use std::cmp::{Ordering, Reverse};

pub trait OrderingPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Policy-specific comparison; `Equal` falls through to the identifier tie-break.
    fn compare(&self, a: &Exam, b: &Exam, index: &CandidateIndex<'_>) -> Ordering;

    fn order<'e>(&self, exams: &'e [Exam], index: &CandidateIndex<'_>) -> Vec<&'e Exam> {
        let mut ordered: Vec<&Exam> = exams.iter().collect();
        ordered.sort_by(|a, b| self.compare(a, b, index).then_with(|| a.id.cmp(&b.id)));
        ordered
    }
}

/// Largest exams first (best-fit-descending). The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestFirst;

impl OrderingPolicy for LargestFirst {
    fn name(&self) -> &'static str {
        "largest-first"
    }

    fn compare(&self, a: &Exam, b: &Exam, _index: &CandidateIndex<'_>) -> Ordering {
        b.students_count.cmp(&a.students_count)
    }
}

/// Higher priority first; exams without a priority go last. Seats break ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighestPriority;

impl OrderingPolicy for HighestPriority {
    fn name(&self) -> &'static str {
        "highest-priority"
    }

    fn compare(&self, a: &Exam, b: &Exam, index: &CandidateIndex<'_>) -> Ordering {
        b.priority
            .cmp(&a.priority)
            .then_with(|| LargestFirst.compare(a, b, index))
    }
}

/// Exams whose last eligible timeslot comes earliest go first; unrestricted
/// exams go last.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarliestDeadline;

impl EarliestDeadline {
    fn deadline(exam: &Exam, index: &CandidateIndex<'_>) -> usize {
        match exam.eligible_timeslots {
            Some(_) => index.eligible_timeslots(exam).last().unwrap_or(0),
            None => usize::MAX,
        }
    }
}

impl OrderingPolicy for EarliestDeadline {
    fn name(&self) -> &'static str {
        "earliest-deadline"
    }

    fn compare(&self, a: &Exam, b: &Exam, index: &CandidateIndex<'_>) -> Ordering {
        Self::deadline(a, index)
            .cmp(&Self::deadline(b, index))
            .then_with(|| LargestFirst.compare(a, b, index))
    }
}

/// Fewest candidate slots first, then largest.
#[derive(Debug, Clone, Copy, Default)]
pub struct MostConstrained;

impl OrderingPolicy for MostConstrained {
    fn name(&self) -> &'static str {
        "most-constrained"
    }

    fn compare(&self, a: &Exam, b: &Exam, index: &CandidateIndex<'_>) -> Ordering {
        index
            .candidate_count(a)
            .cmp(&index.candidate_count(b))
            .then_with(|| LargestFirst.compare(a, b, index))
    }

    fn order<'e>(&self, exams: &'e [Exam], index: &CandidateIndex<'_>) -> Vec<&'e Exam> {
        // candidate_count is not cheap; compute once per exam
        let mut ordered: Vec<(usize, &Exam)> = exams
            .iter()
            .map(|exam| (index.candidate_count(exam), exam))
            .collect();
        ordered.sort_by(|(count_a, a), (count_b, b)| {
            (count_a, Reverse(a.students_count), &a.id)
                .cmp(&(count_b, Reverse(b.students_count), &b.id))
        });
        ordered.into_iter().map(|(_, exam)| exam).collect()
    }
}

/// Caller order, as the input lists it.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputOrder;

impl OrderingPolicy for InputOrder {
    fn name(&self) -> &'static str {
        "input-order"
    }

    fn compare(&self, _a: &Exam, _b: &Exam, _index: &CandidateIndex<'_>) -> Ordering {
        Ordering::Equal
    }

    fn order<'e>(&self, exams: &'e [Exam], _index: &CandidateIndex<'_>) -> Vec<&'e Exam> {
        exams.iter().collect()
    }
}
