use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    BillRecord, EncounterRecord, EncounterType, LabResultRecord, LabStatus,
    PatientRecord, PrescriptionRecord, PrescriptionStatus, StatusCount, TypeStatusCount,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid date value: {0}")]
    InvalidDate(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Optional inclusive bounds on a report's date column.
///
/// The bounds are kept as the caller sent them. Parsing happens in the store,
/// so a malformed value fails the query instead of being rejected up front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRange {
    /// Empty strings count as absent bounds.
    pub fn new(start: Option<String>, end: Option<String>) -> Self {
        Self {
            start: start.filter(|s| !s.trim().is_empty()),
            end: end.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn between(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::new(Some(start.into()), Some(end.into()))
    }
}

/// Half-open `[start, end)` window covering one server-local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// The local midnight-to-midnight window containing `now`.
    pub fn containing<Tz: TimeZone>(now: DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let start = local_midnight(&tz, today.and_time(NaiveTime::default()));
        let end = local_midnight(&tz, (today + Duration::days(1)).and_time(NaiveTime::default()));
        Self { start, end }
    }

    pub fn today() -> Self {
        Self::containing(Local::now())
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

// A DST transition can skip local midnight; the first instant after the gap
// starts the day in that case.
fn local_midnight<Tz: TimeZone>(tz: &Tz, midnight: NaiveDateTime) -> DateTime<Utc> {
    let mut candidate = midnight;
    for _ in 0..4 {
        if let Some(instant) = tz.from_local_datetime(&candidate).earliest() {
            return instant.with_timezone(&Utc);
        }
        candidate += Duration::minutes(30);
    }
    Utc.from_utc_datetime(&midnight)
}

/// Read-only access to the relational data behind the reports.
///
/// Row-returning methods yield rows newest first; breakdown methods yield
/// one row per group present in the filtered set.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn count_patients(&self) -> StoreResult<i64>;

    async fn count_encounters(&self) -> StoreResult<i64>;

    async fn count_encounters_within(&self, window: DayWindow) -> StoreResult<i64>;

    async fn count_lab_results_with_status(&self, status: LabStatus) -> StoreResult<i64>;

    /// Sum of `total` over paid bills, zero when there are none.
    async fn sum_paid_bill_totals(&self) -> StoreResult<Decimal>;

    async fn patients(&self, range: &DateRange) -> StoreResult<Vec<PatientRecord>>;

    async fn paid_bills(&self, range: &DateRange) -> StoreResult<Vec<BillRecord>>;

    async fn lab_results(
        &self,
        range: &DateRange,
        status: Option<LabStatus>,
    ) -> StoreResult<Vec<LabResultRecord>>;

    async fn lab_status_counts(
        &self,
        range: &DateRange,
        status: Option<LabStatus>,
    ) -> StoreResult<Vec<StatusCount<LabStatus>>>;

    async fn encounters(
        &self,
        range: &DateRange,
        encounter_type: Option<EncounterType>,
    ) -> StoreResult<Vec<EncounterRecord>>;

    async fn encounter_type_status_counts(
        &self,
        range: &DateRange,
        encounter_type: Option<EncounterType>,
    ) -> StoreResult<Vec<TypeStatusCount>>;

    async fn prescriptions(
        &self,
        range: &DateRange,
        status: Option<PrescriptionStatus>,
    ) -> StoreResult<Vec<PrescriptionRecord>>;

    async fn prescription_status_counts(
        &self,
        range: &DateRange,
        status: Option<PrescriptionStatus>,
    ) -> StoreResult<Vec<StatusCount<PrescriptionStatus>>>;

    async fn lab_result(&self, id: Uuid) -> StoreResult<Option<LabResultRecord>>;
}
