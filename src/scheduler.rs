use crate::constraint::Constraint;
use crate::data::{ensure_unique, Exam, Room, ScheduleInput, Slot, Timeslot};
use crate::error::ScheduleError;
use crate::index::CandidateIndex;
use crate::ordering::{LargestFirst, OrderingPolicy};
use crate::report::{ReportBuilder, SchedulingReport};
use crate::search::{FirstFit, RunGuard, Search, SearchContext};
use crate::tracker::ConflictTracker;
use log::{debug, info};
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

/// Stages of one run. Every run walks through all of them in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Initialized,
    Indexing,
    Ordering,
    Assigning,
    Finalized,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct RunState {
    phase: Phase,
}

impl RunState {
    fn new() -> Self {
        Self {
            phase: Phase::Initialized,
        }
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(next > self.phase, "phase {next} after {}", self.phase);
        debug!("Scheduling run: {} -> {}", self.phase, next);
        self.phase = next;
    }
}

/// A configured scheduling core. Holds no per-run state, so one instance can
/// serve any number of concurrent runs.
pub struct Scheduler {
    ordering: Box<dyn OrderingPolicy>,
    search: Box<dyn Search>,
    constraints: Vec<Box<dyn Constraint>>,
    time_budget: Option<Duration>,
}

impl Default for Scheduler {
    /// Largest-first ordering, timeslot-major first-fit, no extra constraints.
    fn default() -> Self {
        Self {
            ordering: Box::new(LargestFirst),
            search: Box::new(FirstFit::default()),
            constraints: Vec::new(),
            time_budget: None,
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("ordering", &self.ordering.name())
            .field("search", &self.search.name())
            .field(
                "constraints",
                &self.constraints.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("time_budget", &self.time_budget)
            .finish()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ordering(mut self, ordering: impl OrderingPolicy + 'static) -> Self {
        self.ordering = Box::new(ordering);
        self
    }

    pub fn with_search(mut self, search: impl Search + 'static) -> Self {
        self.search = Box::new(search);
        self
    }

    pub fn with_boxed_search(mut self, search: Box<dyn Search>) -> Self {
        self.search = search;
        self
    }

    pub fn with_constraint(mut self, constraint: impl Constraint + 'static) -> Self {
        self.constraints.push(Box::new(constraint));
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn run(&self, input: &ScheduleInput) -> Result<SchedulingReport, ScheduleError> {
        self.execute(input, None)
    }

    /// Like [`Scheduler::run`], aborting with `Cancelled` once `cancel` is set.
    pub fn run_cancellable(
        &self,
        input: &ScheduleInput,
        cancel: &AtomicBool,
    ) -> Result<SchedulingReport, ScheduleError> {
        self.execute(input, Some(cancel))
    }

    fn execute(
        &self,
        input: &ScheduleInput,
        cancel: Option<&AtomicBool>,
    ) -> Result<SchedulingReport, ScheduleError> {
        let start_time = Instant::now();
        let deadline = self.time_budget.map(|budget| start_time + budget);
        let mut state = RunState::new();

        state.advance(Phase::Indexing);
        for exam in &input.exams {
            exam.validate()?;
        }
        ensure_unique("exam", input.exams.iter().map(|e| e.id.as_str()))?;
        let index = CandidateIndex::build(&input.rooms, &input.timeslots)?;
        let mut tracker = ConflictTracker::new(&index);
        tracker.preconsume(&index, &input.already_consumed)?;

        state.advance(Phase::Ordering);
        let ordered = self.ordering.order(&input.exams, &index);
        debug!("Ordered {} exams by {}", ordered.len(), self.ordering.name());

        state.advance(Phase::Assigning);
        let mut ctx = SearchContext::new(
            &index,
            tracker,
            &self.constraints,
            RunGuard::new(deadline, cancel),
        );
        let outcomes = self.search.assign(&ordered, &mut ctx)?;
        if outcomes.len() != ordered.len() {
            return Err(ScheduleError::Solver(format!(
                "search '{}' returned {} outcomes for {} exams",
                self.search.name(),
                outcomes.len(),
                ordered.len()
            )));
        }

        let mut builder = ReportBuilder::new(input.exams.iter().map(|e| e.id.as_str()));
        for (exam, outcome) in ordered.iter().zip(outcomes) {
            builder.record(&exam.id, outcome, &index)?;
        }
        let report = builder.finish()?;

        state.advance(Phase::Finalized);
        info!(
            "Scheduled {} of {} exams with {} in {:.2?}",
            report.scheduled_count(),
            report.total(),
            self.search.name(),
            start_time.elapsed()
        );
        Ok(report)
    }
}

/// Runs the default scheduler: largest-first ordering, timeslot-major
/// first-fit, full recompute unless `already_consumed` is non-empty.
pub fn schedule(
    exams: &[Exam],
    rooms: &[Room],
    timeslots: &[Timeslot],
    already_consumed: &[Slot],
) -> Result<SchedulingReport, ScheduleError> {
    let input = ScheduleInput {
        exams: exams.to_vec(),
        rooms: rooms.to_vec(),
        timeslots: timeslots.to_vec(),
        already_consumed: already_consumed.to_vec(),
    };
    Scheduler::default().run(&input)
}
