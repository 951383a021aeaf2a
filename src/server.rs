use crate::data::{ensure_unique, ScheduleInput, Slot};
use crate::error::ScheduleError;
use crate::report::{SchedulingReport, Unscheduled};
use crate::scheduler::Scheduler;
use crate::store::{Dataset, ScheduleRecord, ScheduleStore, StoreError};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::{self, JoinError};

/// Header carrying the identity of the caller whose data is scheduled.
pub const OWNER_HEADER: &str = "x-owner-id";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ScheduleStore>,
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(store: Arc<dyn ScheduleStore>, scheduler: Scheduler) -> Self {
        Self {
            store,
            scheduler: Arc::new(scheduler),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("missing required data")]
    MissingData,

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("scheduling task failed: {0}")]
    Task(#[from] JoinError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::MissingData => StatusCode::NOT_FOUND,
            Self::Schedule(e) if e.is_internal() => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Schedule(
                ScheduleError::Cancelled { .. } | ScheduleError::DeadlineExceeded { .. },
            ) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Schedule(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Discard prior assignments and schedule every exam.
    #[default]
    Full,
    /// Keep prior assignments that are still valid and schedule the rest.
    Incremental,
}

#[derive(Debug, Default, Deserialize)]
pub struct OptimizeParams {
    #[serde(default)]
    pub mode: Mode,
}

/// Response of an owner-scoped scheduling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSummary {
    pub success: bool,
    pub scheduled: usize,
    pub total: usize,
    pub failures: Vec<Unscheduled>,
}

fn owner_from(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(OWNER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|owner| !owner.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::Unauthenticated)
}

/// Prior records that still reference existing entities and still satisfy
/// capacity, eligibility and availability. Later duplicates are dropped.
fn retained_records(dataset: &Dataset, records: Vec<ScheduleRecord>) -> Vec<ScheduleRecord> {
    let exams: HashMap<&str, _> = dataset.exams.iter().map(|e| (e.id.as_str(), e)).collect();
    let rooms: HashMap<&str, _> = dataset.rooms.iter().map(|r| (r.id.as_str(), r)).collect();
    let timeslots: HashSet<&str> = dataset.timeslots.iter().map(|t| t.id.as_str()).collect();

    let mut seen_exams = HashSet::new();
    let mut seen_slots: HashSet<Slot> = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let valid = match (
                exams.get(record.exam_id.as_str()),
                rooms.get(record.room_id.as_str()),
            ) {
                (Some(exam), Some(room)) => {
                    timeslots.contains(record.timeslot_id.as_str())
                        && room.capacity >= exam.students_count
                        && !room.unavailable_timeslots.contains(&record.timeslot_id)
                        && exam
                            .eligible_timeslots
                            .as_ref()
                            .is_none_or(|allowed| allowed.contains(&record.timeslot_id))
                }
                _ => false,
            };
            let keep = valid
                && seen_exams.insert(record.exam_id.clone())
                && seen_slots.insert(record.slot());
            if !keep {
                warn!(
                    "Dropping stale assignment of exam {} at {}",
                    record.exam_id,
                    record.slot()
                );
            }
            keep
        })
        .collect()
}

/// Loads the owner's dataset, schedules it and persists the result. Nothing is
/// written unless the run finishes.
pub fn optimize(
    store: &dyn ScheduleStore,
    scheduler: &Scheduler,
    owner: &str,
    mode: Mode,
) -> Result<ScheduleSummary, ApiError> {
    let dataset = store.dataset(owner)?.ok_or(ApiError::MissingData)?;
    // kept exams bypass the scheduler, which validates only what it is given
    for exam in &dataset.exams {
        exam.validate()?;
    }
    ensure_unique("exam", dataset.exams.iter().map(|e| e.id.as_str()))?;

    let kept = match mode {
        Mode::Full => Vec::new(),
        Mode::Incremental => retained_records(&dataset, store.assignments(owner)?),
    };

    let kept_exams: HashSet<&str> = kept.iter().map(|r| r.exam_id.as_str()).collect();
    let input = ScheduleInput {
        exams: dataset
            .exams
            .iter()
            .filter(|exam| !kept_exams.contains(exam.id.as_str()))
            .cloned()
            .collect(),
        rooms: dataset.rooms.clone(),
        timeslots: dataset.timeslots.clone(),
        already_consumed: kept.iter().map(ScheduleRecord::slot).collect(),
    };
    let report = scheduler.run(&input)?;

    let scheduled = kept.len() + report.scheduled_count();
    let mut records = kept;
    records.extend(
        report
            .assignments
            .into_iter()
            .map(|assignment| ScheduleRecord::from_assignment(owner, assignment)),
    );
    store.replace_assignments(owner, records)?;

    info!(
        "Generated {} schedules for owner {} ({:?} mode)",
        scheduled, owner, mode
    );
    Ok(ScheduleSummary {
        success: true,
        scheduled,
        total: dataset.exams.len(),
        failures: report.unscheduled,
    })
}

async fn solve_handler(
    State(state): State<AppState>,
    Json(input): Json<ScheduleInput>,
) -> Result<Json<SchedulingReport>, ApiError> {
    let report = task::spawn_blocking(move || state.scheduler.run(&input)).await??;
    Ok(Json(report))
}

async fn optimize_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<OptimizeParams>,
) -> Result<Json<ScheduleSummary>, ApiError> {
    let owner = owner_from(&headers)?;
    let summary = task::spawn_blocking(move || {
        optimize(state.store.as_ref(), &state.scheduler, &owner, params.mode)
    })
    .await??;
    Ok(Json(summary))
}

async fn put_dataset_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(dataset): Json<Dataset>,
) -> Result<StatusCode, ApiError> {
    let owner = owner_from(&headers)?;
    info!(
        "Storing {} exams, {} rooms, {} timeslots for owner {}",
        dataset.exams.len(),
        dataset.rooms.len(),
        dataset.timeslots.len(),
        owner
    );
    state.store.put_dataset(&owner, dataset)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_schedules_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ScheduleRecord>>, ApiError> {
    let owner = owner_from(&headers)?;
    Ok(Json(state.store.assignments(&owner)?))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/v1/schedule/solve", post(solve_handler))
        .route("/v1/schedule/optimize", post(optimize_handler))
        .route("/v1/dataset", put(put_dataset_handler))
        .route("/v1/schedules", get(list_schedules_handler))
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}
