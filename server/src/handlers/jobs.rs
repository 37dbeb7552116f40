use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::access::CurrentUser;
use crate::jobs::{JobError, JobRecord, LabReportPayload, GENERATE_REPORT};
use crate::routes::AppState;

use super::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueuedJob {
    pub job_id: Uuid,
}

/// POST /reports/labs/:id/generate
/// Queue report generation for a lab result.
pub async fn generate_lab_report(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(lab_result_id): Path<Uuid>,
) -> Result<(StatusCode, Json<EnqueuedJob>), ApiError> {
    let record = state
        .reports
        .lab_result(lab_result_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Lab result {} not found", lab_result_id)))?;

    let payload = LabReportPayload {
        lab_result_id,
        patient_id: record.lab_result.patient_id,
        test_name: record.lab_result.test_name,
    };
    let data = serde_json::to_value(&payload).map_err(JobError::from)?;
    let job_id = state.queue.add(GENERATE_REPORT, data)?;

    tracing::info!(%job_id, %lab_result_id, role = %user.role, "Lab report queued");
    Ok((StatusCode::ACCEPTED, Json(EnqueuedJob { job_id })))
}

/// GET /jobs/lab-reports/:id
pub async fn lab_report_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobRecord>, ApiError> {
    state
        .queue
        .job(job_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", job_id)))
}
