//! Exam timetabling core: assigns every exam to one (room, timeslot) slot with
//! enough seats, never double-books a slot, and explains every exam it cannot
//! place. The data-access collaborator and HTTP trigger around it live in
//! [`store`] and [`server`].

pub mod config;
pub mod constraint;
pub mod data;
pub mod error;
pub mod index;
pub mod matching;
pub mod ordering;
pub mod report;
pub mod scheduler;
pub mod search;
#[cfg(feature = "ilp")]
pub mod solver;
pub mod server;
pub mod store;
pub mod tracker;

pub use data::{Assignment, Exam, Room, ScheduleInput, Slot, Status, Timeslot};
pub use error::ScheduleError;
pub use report::{FailureReason, SchedulingReport, Unscheduled};
pub use scheduler::{schedule, Scheduler};
