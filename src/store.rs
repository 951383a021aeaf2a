//! Owner-scoped data access: the entity sets a run reads and the assignment
//! records it writes back.

use crate::data::{
    Assignment, Exam, ExamId, OwnerId, Room, RoomId, Slot, Status, Timeslot, TimeslotId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,
}

/// The entity sets one owner schedules over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub exams: Vec<Exam>,
    pub rooms: Vec<Room>,
    pub timeslots: Vec<Timeslot>,
}

/// A persisted assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    pub owner_id: OwnerId,
    pub exam_id: ExamId,
    pub room_id: RoomId,
    pub timeslot_id: TimeslotId,
    pub status: Status,
}

impl ScheduleRecord {
    pub fn from_assignment(owner: &str, assignment: Assignment) -> Self {
        Self {
            owner_id: owner.to_string(),
            exam_id: assignment.exam_id,
            room_id: assignment.room_id,
            timeslot_id: assignment.timeslot_id,
            status: assignment.status,
        }
    }

    pub fn slot(&self) -> Slot {
        Slot::new(self.room_id.clone(), self.timeslot_id.clone())
    }
}

pub trait ScheduleStore: Send + Sync {
    fn dataset(&self, owner: &str) -> Result<Option<Dataset>, StoreError>;

    fn put_dataset(&self, owner: &str, dataset: Dataset) -> Result<(), StoreError>;

    fn assignments(&self, owner: &str) -> Result<Vec<ScheduleRecord>, StoreError>;

    /// Replaces every record of the owner in one step.
    fn replace_assignments(
        &self,
        owner: &str,
        records: Vec<ScheduleRecord>,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct Tables {
    datasets: HashMap<OwnerId, Dataset>,
    schedules: HashMap<OwnerId, Vec<ScheduleRecord>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ScheduleStore for MemoryStore {
    fn dataset(&self, owner: &str) -> Result<Option<Dataset>, StoreError> {
        Ok(self.tables()?.datasets.get(owner).cloned())
    }

    fn put_dataset(&self, owner: &str, dataset: Dataset) -> Result<(), StoreError> {
        self.tables()?.datasets.insert(owner.to_string(), dataset);
        Ok(())
    }

    fn assignments(&self, owner: &str) -> Result<Vec<ScheduleRecord>, StoreError> {
        Ok(self
            .tables()?
            .schedules
            .get(owner)
            .cloned()
            .unwrap_or_default())
    }

    fn replace_assignments(
        &self,
        owner: &str,
        records: Vec<ScheduleRecord>,
    ) -> Result<(), StoreError> {
        self.tables()?.schedules.insert(owner.to_string(), records);
        Ok(())
    }
}
