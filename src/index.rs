//! Candidate index: the bookable (room, timeslot) universe of one run.

use crate::data::{ensure_unique, Exam, Room, Slot, Timeslot};
use crate::error::ScheduleError;
use log::debug;
use std::collections::HashMap;
use std::ops::Range;

/// Position-based handle to a slot of the index.
///
/// Derived ordering is timeslot-major, then ascending room capacity, which is the
/// first-fit scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub timeslot: usize,
    pub room: usize,
}

impl SlotKey {
    pub fn new(room: usize, timeslot: usize) -> Self {
        Self { timeslot, room }
    }
}

/// Rooms sorted by ascending (capacity, id) and timeslots in chronological order,
/// with O(1) lookups from identifier to position.
#[derive(Debug, Clone)]
pub struct CandidateIndex<'a> {
    rooms: Vec<&'a Room>,
    timeslots: Vec<&'a Timeslot>,
    room_positions: HashMap<&'a str, usize>,
    timeslot_positions: HashMap<&'a str, usize>,
}

impl<'a> CandidateIndex<'a> {
    /// Validates and indexes the room and timeslot sets.
    pub fn build(rooms: &'a [Room], timeslots: &'a [Timeslot]) -> Result<Self, ScheduleError> {
        for room in rooms {
            room.validate()?;
        }
        for timeslot in timeslots {
            timeslot.validate()?;
        }
        ensure_unique("room", rooms.iter().map(|r| r.id.as_str()))?;
        ensure_unique("timeslot", timeslots.iter().map(|t| t.id.as_str()))?;

        let mut rooms: Vec<&Room> = rooms.iter().collect();
        rooms.sort_by(|a, b| a.capacity.cmp(&b.capacity).then_with(|| a.id.cmp(&b.id)));

        let mut timeslots: Vec<&Timeslot> = timeslots.iter().collect();
        timeslots.sort_by(|a, b| a.chronological_key().cmp(&b.chronological_key()));

        let room_positions = rooms
            .iter()
            .enumerate()
            .map(|(pos, room)| (room.id.as_str(), pos))
            .collect();
        let timeslot_positions = timeslots
            .iter()
            .enumerate()
            .map(|(pos, timeslot)| (timeslot.id.as_str(), pos))
            .collect();

        debug!(
            "Indexed {} rooms x {} timeslots = {} slots",
            rooms.len(),
            timeslots.len(),
            rooms.len() * timeslots.len()
        );

        Ok(Self {
            rooms,
            timeslots,
            room_positions,
            timeslot_positions,
        })
    }

    pub fn rooms(&self) -> &[&'a Room] {
        &self.rooms
    }

    pub fn timeslots(&self) -> &[&'a Timeslot] {
        &self.timeslots
    }

    pub fn room(&self, pos: usize) -> &'a Room {
        self.rooms[pos]
    }

    pub fn timeslot(&self, pos: usize) -> &'a Timeslot {
        self.timeslots[pos]
    }

    pub fn room_position(&self, id: &str) -> Option<usize> {
        self.room_positions.get(id).copied()
    }

    pub fn timeslot_position(&self, id: &str) -> Option<usize> {
        self.timeslot_positions.get(id).copied()
    }

    pub fn capacity(&self, room_id: &str) -> Option<u32> {
        self.room_position(room_id).map(|pos| self.rooms[pos].capacity)
    }

    pub fn max_capacity(&self) -> Option<u32> {
        self.rooms.last().map(|room| room.capacity)
    }

    /// Positions of rooms holding at least `seats`, smallest first.
    pub fn fitting_rooms(&self, seats: u32) -> Range<usize> {
        let start = self.rooms.partition_point(|room| room.capacity < seats);
        start..self.rooms.len()
    }

    pub fn is_eligible(&self, exam: &Exam, timeslot: usize) -> bool {
        match &exam.eligible_timeslots {
            Some(allowed) => allowed.contains(&self.timeslots[timeslot].id),
            None => true,
        }
    }

    /// Timeslot positions the exam may use, in chronological order.
    pub fn eligible_timeslots(&self, exam: &Exam) -> impl Iterator<Item = usize> {
        (0..self.timeslots.len()).filter(move |&t| self.is_eligible(exam, t))
    }

    pub fn room_available(&self, room: usize, timeslot: usize) -> bool {
        !self.rooms[room]
            .unavailable_timeslots
            .contains(&self.timeslots[timeslot].id)
    }

    /// Number of slots satisfying capacity, eligibility and room availability.
    pub fn candidate_count(&self, exam: &Exam) -> usize {
        let fitting = self.fitting_rooms(exam.students_count);
        self.eligible_timeslots(exam)
            .map(|t| {
                fitting
                    .clone()
                    .filter(|&r| self.room_available(r, t))
                    .count()
            })
            .sum()
    }

    pub fn key(&self, slot: &Slot) -> Option<SlotKey> {
        let room = self.room_position(&slot.room_id)?;
        let timeslot = self.timeslot_position(&slot.timeslot_id)?;
        Some(SlotKey::new(room, timeslot))
    }

    pub fn slot(&self, key: SlotKey) -> Slot {
        Slot::new(
            self.rooms[key.room].id.clone(),
            self.timeslots[key.timeslot].id.clone(),
        )
    }
}
