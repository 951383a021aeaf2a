use crate::constraint::{DurationFits, InstructorExclusive};
use crate::matching::MaximumMatching;
use crate::ordering::{
    EarliestDeadline, HighestPriority, InputOrder, LargestFirst, MostConstrained,
};
use crate::scheduler::Scheduler;
use crate::search::{FirstFit, Search, SelectionRule};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::warn;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Exam scheduling service.
#[derive(Debug, Parser)]
#[command(name = "exam_scheduler", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve the HTTP API (default).
    Serve,
    /// Schedule a single JSON input and print the report.
    Solve {
        /// Input file; stdin when omitted.
        input: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Address the HTTP API listens on.
    #[arg(long, env = "EXAM_SCHEDULER_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Placement strategy.
    #[arg(
        long,
        env = "EXAM_SCHEDULER_STRATEGY",
        value_enum,
        default_value_t = StrategyKind::FirstFit
    )]
    pub strategy: StrategyKind,

    /// Order in which exams are offered to the strategy.
    #[arg(
        long,
        env = "EXAM_SCHEDULER_ORDERING",
        value_enum,
        default_value_t = OrderingKind::LargestFirst
    )]
    pub ordering: OrderingKind,

    /// Reject timeslots shorter than the exam duration.
    #[arg(long)]
    pub enforce_duration: bool,

    /// Never give an instructor two exams in one timeslot.
    #[arg(long)]
    pub exclusive_instructors: bool,

    /// Abort runs that take longer than this many milliseconds.
    #[arg(long, env = "EXAM_SCHEDULER_TIME_BUDGET_MS")]
    pub time_budget_ms: Option<u64>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    pub log_filter: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    FirstFit,
    RoomMajor,
    Matching,
    /// Requires the `ilp` cargo feature; falls back to `matching` without it.
    Ilp,
}

impl StrategyKind {
    pub fn search(self) -> Box<dyn Search> {
        match self {
            Self::FirstFit => Box::new(FirstFit::new(SelectionRule::TimeslotMajor)),
            Self::RoomMajor => Box::new(FirstFit::new(SelectionRule::RoomMajor)),
            Self::Matching => Box::new(MaximumMatching),
            #[cfg(feature = "ilp")]
            Self::Ilp => Box::new(crate::solver::IntegerProgram),
            #[cfg(not(feature = "ilp"))]
            Self::Ilp => {
                warn!("Built without the `ilp` feature, using matching instead");
                Box::new(MaximumMatching)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrderingKind {
    LargestFirst,
    HighestPriority,
    EarliestDeadline,
    MostConstrained,
    InputOrder,
}

impl Settings {
    pub fn scheduler(&self) -> Scheduler {
        let mut scheduler = Scheduler::new().with_boxed_search(self.strategy.search());
        scheduler = match self.ordering {
            OrderingKind::LargestFirst => scheduler.with_ordering(LargestFirst),
            OrderingKind::HighestPriority => scheduler.with_ordering(HighestPriority),
            OrderingKind::EarliestDeadline => scheduler.with_ordering(EarliestDeadline),
            OrderingKind::MostConstrained => scheduler.with_ordering(MostConstrained),
            OrderingKind::InputOrder => scheduler.with_ordering(InputOrder),
        };
        if self.enforce_duration {
            scheduler = scheduler.with_constraint(DurationFits);
        }
        if self.exclusive_instructors {
            scheduler = scheduler.with_constraint(InstructorExclusive);
        }
        if let Some(ms) = self.time_budget_ms {
            scheduler = scheduler.with_time_budget(Duration::from_millis(ms));
        }
        scheduler
    }
}
