use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::access::CurrentUser;
use crate::db::DateRange;
use crate::models::{
    DashboardStats, EncounterReport, EncounterType, LabReport, LabStatus, PatientReport,
    PrescriptionReport, PrescriptionStatus, RevenueReport,
};
use crate::routes::AppState;

use super::{empty_as_none, ApiError};

/// `startDate` / `endDate` bounds shared by every report query.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    /// Inclusive lower bound (ISO-8601 date or timestamp)
    pub start_date: Option<String>,
    /// Inclusive upper bound
    pub end_date: Option<String>,
}

impl DateRangeQuery {
    pub fn range(self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LabReportQuery {
    #[serde(flatten)]
    pub dates: DateRangeQuery,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<LabStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EncounterReportQuery {
    #[serde(flatten)]
    pub dates: DateRangeQuery,
    #[serde(default, rename = "type", deserialize_with = "empty_as_none")]
    pub encounter_type: Option<EncounterType>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PrescriptionReportQuery {
    #[serde(flatten)]
    pub dates: DateRangeQuery,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<PrescriptionStatus>,
}

/// GET /reports/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<DashboardStats>, ApiError> {
    tracing::debug!(role = %user.role, "Dashboard requested");
    let stats = state.reports.dashboard_stats().await?;
    Ok(Json(stats))
}

/// GET /reports/patients
pub async fn patients(
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<PatientReport>, ApiError> {
    let report = state.reports.patient_report(&query.range()).await?;
    Ok(Json(report))
}

/// GET /reports/revenue
pub async fn revenue(
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<RevenueReport>, ApiError> {
    let report = state.reports.revenue_report(&query.range()).await?;
    Ok(Json(report))
}

/// GET /reports/labs
pub async fn labs(
    State(state): State<AppState>,
    Query(query): Query<LabReportQuery>,
) -> Result<Json<LabReport>, ApiError> {
    let report = state
        .reports
        .lab_report(&query.dates.range(), query.status)
        .await?;
    Ok(Json(report))
}

/// GET /reports/encounters
pub async fn encounters(
    State(state): State<AppState>,
    Query(query): Query<EncounterReportQuery>,
) -> Result<Json<EncounterReport>, ApiError> {
    let report = state
        .reports
        .encounter_report(&query.dates.range(), query.encounter_type)
        .await?;
    Ok(Json(report))
}

/// GET /reports/prescriptions
pub async fn prescriptions(
    State(state): State<AppState>,
    Query(query): Query<PrescriptionReportQuery>,
) -> Result<Json<PrescriptionReport>, ApiError> {
    let report = state
        .reports
        .prescription_report(&query.dates.range(), query.status)
        .await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;

    fn parse<T: serde::de::DeserializeOwned>(uri: &str) -> T {
        let uri: Uri = uri.parse().unwrap();
        Query::<T>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_filtered_queries_share_date_bounds() {
        let labs: LabReportQuery =
            parse("/reports/labs?startDate=&endDate=2024-01-31&status=PENDING");
        assert_eq!(labs.status, Some(LabStatus::Pending));
        assert_eq!(
            labs.dates.range(),
            DateRange::new(None, Some("2024-01-31".to_string()))
        );

        let encounters: EncounterReportQuery =
            parse("/reports/encounters?type=EMERGENCY&startDate=2024-01-01");
        assert_eq!(encounters.encounter_type, Some(EncounterType::Emergency));
        assert_eq!(encounters.dates.start_date.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn test_missing_parameters_are_absent() {
        let prescriptions: PrescriptionReportQuery = parse("/reports/prescriptions");
        assert!(prescriptions.status.is_none());
        assert_eq!(prescriptions.dates.range(), DateRange::default());
    }
}
