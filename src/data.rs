use crate::error::ScheduleError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// Type aliases for clarity
pub type ExamId = String;
pub type RoomId = String;
pub type TimeslotId = String;
pub type InstructorId = String;
pub type OwnerId = String;

/// An exam to be placed into exactly one (room, timeslot) slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: ExamId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
    pub students_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    /// Absent means every timeslot is eligible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eligible_timeslots: Option<BTreeSet<TimeslotId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<InstructorId>,
}

impl Exam {
    pub fn new(id: impl Into<ExamId>, students_count: u32) -> Self {
        Self {
            id: id.into(),
            students_count,
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    pub fn with_instructor(mut self, instructor: impl Into<InstructorId>) -> Self {
        self.instructor = Some(instructor.into());
        self
    }

    pub fn restricted_to<I, S>(mut self, timeslots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TimeslotId>,
    {
        self.eligible_timeslots = Some(timeslots.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.id.trim().is_empty() {
            return Err(ScheduleError::invalid("exam", &self.id, "identifier is empty"));
        }
        if self.students_count == 0 {
            return Err(ScheduleError::invalid(
                "exam",
                &self.id,
                "students count must be positive",
            ));
        }
        Ok(())
    }
}

/// A physical room with a given capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub capacity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub unavailable_timeslots: BTreeSet<TimeslotId>,
}

impl Room {
    pub fn new(id: impl Into<RoomId>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            capacity,
            ..Self::default()
        }
    }

    pub fn unavailable_at<I, S>(mut self, timeslots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TimeslotId>,
    {
        self.unavailable_timeslots = timeslots.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.id.trim().is_empty() {
            return Err(ScheduleError::invalid("room", &self.id, "identifier is empty"));
        }
        if self.capacity == 0 {
            return Err(ScheduleError::invalid("room", &self.id, "capacity must be positive"));
        }
        Ok(())
    }
}

/// A discrete exam period. Two timeslot records are never treated as overlapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeslot {
    pub id: TimeslotId,
    /// ISO date, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: String,
    /// `HH:MM` or `HH:MM:SS`.
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
}

impl Timeslot {
    pub fn new(
        id: impl Into<TimeslotId>,
        date: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            date: date.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }

    /// Timeslot without date markers; ordered by identifier only.
    pub fn bare(id: impl Into<TimeslotId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Length in minutes, if both markers parse and the end is after the start.
    pub fn length_minutes(&self) -> Option<u32> {
        let start = parse_clock(&self.start_time)?;
        let end = parse_clock(&self.end_time)?;
        end.checked_sub(start).filter(|len| *len > 0)
    }

    pub fn chronological_key(&self) -> (&str, &str, &str, &str) {
        (&self.date, &self.start_time, &self.end_time, &self.id)
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.id.trim().is_empty() {
            return Err(ScheduleError::invalid(
                "timeslot",
                &self.id,
                "identifier is empty",
            ));
        }
        Ok(())
    }
}

fn parse_clock(value: &str) -> Option<u32> {
    let mut parts = value.trim().split(':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    if hours > 24 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// A (room, timeslot) pair; the unit of exclusivity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub room_id: RoomId,
    pub timeslot_id: TimeslotId,
}

impl Slot {
    pub fn new(room_id: impl Into<RoomId>, timeslot_id: impl Into<TimeslotId>) -> Self {
        Self {
            room_id: room_id.into(),
            timeslot_id: timeslot_id.into(),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.room_id, self.timeslot_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Scheduled,
}

/// A single exam placement produced by a scheduling run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub exam_id: ExamId,
    pub room_id: RoomId,
    pub timeslot_id: TimeslotId,
    pub status: Status,
}

impl Assignment {
    pub fn slot(&self) -> Slot {
        Slot::new(self.room_id.clone(), self.timeslot_id.clone())
    }
}

/// The complete input for one scheduling run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInput {
    pub exams: Vec<Exam>,
    pub rooms: Vec<Room>,
    pub timeslots: Vec<Timeslot>,
    /// Slots committed by earlier runs (incremental mode).
    #[serde(default)]
    pub already_consumed: Vec<Slot>,
}

/// Fails with `DuplicateIdentifier` on the first identifier seen twice.
pub(crate) fn ensure_unique<'a, I>(kind: &'static str, ids: I) -> Result<(), ScheduleError>
where
    I: IntoIterator<Item = &'a str>,
{
    match ids.into_iter().duplicates().next() {
        Some(id) => Err(ScheduleError::DuplicateIdentifier {
            kind,
            id: id.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeslot_length_parses_both_clock_formats() {
        let slot = Timeslot::new("t1", "2025-01-10", "09:00", "11:30:00");
        assert_eq!(slot.length_minutes(), Some(150));

        let inverted = Timeslot::new("t2", "2025-01-10", "11:00", "09:00");
        assert_eq!(inverted.length_minutes(), None);

        assert_eq!(Timeslot::bare("t3").length_minutes(), None);
    }

    #[test]
    fn exam_rejects_empty_id_and_zero_seats() {
        assert!(Exam::new("", 10).validate().is_err());
        assert!(Exam::new("math", 0).validate().is_err());
        assert!(Exam::new("math", 1).validate().is_ok());
    }

    #[test]
    fn wire_format_uses_camel_case() {
        let json = r#"{"id":"e1","studentsCount":30,"eligibleTimeslots":["t1"]}"#;
        let exam: Exam = serde_json::from_str(json).unwrap();
        assert_eq!(exam.students_count, 30);
        assert!(exam.eligible_timeslots.unwrap().contains("t1"));

        let assignment = Assignment {
            exam_id: "e1".into(),
            room_id: "r1".into(),
            timeslot_id: "t1".into(),
            status: Status::Scheduled,
        };
        let value = serde_json::to_value(&assignment).unwrap();
        assert_eq!(value["examId"], "e1");
        assert_eq!(value["status"], "scheduled");
    }

    #[test]
    fn first_repeated_identifier_is_reported() {
        let err = ensure_unique("room", ["a", "b", "a", "b"]).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::DuplicateIdentifier { kind: "room", ref id } if id == "a"
        ));
        assert!(ensure_unique("room", ["a", "b"]).is_ok());
    }
}
