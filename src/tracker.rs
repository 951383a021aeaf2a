use crate::data::{InstructorId, RoomId, Slot, TimeslotId};
use crate::error::ScheduleError;
use crate::index::{CandidateIndex, SlotKey};
use log::trace;
use std::collections::{HashMap, HashSet};

/// Consumed slots and instructor bookings of a single run.
///
/// Built fresh for every run and never shared between runs.
#[derive(Debug, Clone)]
pub struct ConflictTracker {
    room_ids: Vec<RoomId>,
    timeslot_ids: Vec<TimeslotId>,
    consumed: Vec<bool>,
    consumed_count: usize,
    instructors: HashMap<usize, HashSet<InstructorId>>,
}

impl ConflictTracker {
    pub fn new(index: &CandidateIndex<'_>) -> Self {
        let rooms = index.rooms().len();
        let timeslots = index.timeslots().len();
        Self {
            room_ids: index.rooms().iter().map(|r| r.id.clone()).collect(),
            timeslot_ids: index.timeslots().iter().map(|t| t.id.clone()).collect(),
            consumed: vec![false; rooms * timeslots],
            consumed_count: 0,
            instructors: HashMap::new(),
        }
    }

    fn offset(&self, key: SlotKey) -> usize {
        key.timeslot * self.room_ids.len() + key.room
    }

    pub fn is_consumed(&self, key: SlotKey) -> bool {
        self.consumed[self.offset(key)]
    }

    /// Marks the slot as taken. Taking a slot twice is a defect in the caller.
    pub fn consume(&mut self, key: SlotKey) -> Result<(), ScheduleError> {
        let offset = self.offset(key);
        if self.consumed[offset] {
            return Err(ScheduleError::AlreadyConsumed {
                room: self.room_ids[key.room].clone(),
                timeslot: self.timeslot_ids[key.timeslot].clone(),
            });
        }
        self.consumed[offset] = true;
        self.consumed_count += 1;
        trace!(
            "Consumed slot {}@{}",
            self.room_ids[key.room], self.timeslot_ids[key.timeslot]
        );
        Ok(())
    }

    /// Seeds the tracker with slots committed by earlier runs.
    pub fn preconsume(
        &mut self,
        index: &CandidateIndex<'_>,
        slots: &[Slot],
    ) -> Result<(), ScheduleError> {
        for slot in slots {
            let key = index.key(slot).ok_or_else(|| {
                ScheduleError::invalid(
                    "slot",
                    &slot.to_string(),
                    "references an unknown room or timeslot",
                )
            })?;
            if self.is_consumed(key) {
                return Err(ScheduleError::DuplicateIdentifier {
                    kind: "slot",
                    id: slot.to_string(),
                });
            }
            self.consume(key)?;
        }
        Ok(())
    }

    pub fn book_instructor(&mut self, instructor: &str, timeslot: usize) {
        self.instructors
            .entry(timeslot)
            .or_default()
            .insert(instructor.to_string());
    }

    pub fn instructor_busy(&self, instructor: &str, timeslot: usize) -> bool {
        self.instructors
            .get(&timeslot)
            .is_some_and(|booked| booked.contains(instructor))
    }

    pub fn consumed_count(&self) -> usize {
        self.consumed_count
    }
}
