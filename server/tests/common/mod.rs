#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use ehr_server::access::Role;
use ehr_server::auth::TokenRegistry;
use ehr_server::config::ApiToken;
use ehr_server::db::{DateRange, DayWindow, ReportStore, StoreError, StoreResult};
use ehr_server::jobs::{DelayRange, JobQueue, LabReportProcessor, LAB_REPORTS_QUEUE};
use ehr_server::models::*;
use ehr_server::reports::ReportService;
use ehr_server::AppState;

pub const ADMIN_TOKEN: &str = "admin-token";
pub const BILLING_TOKEN: &str = "billing-token";

pub fn at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

pub fn money(raw: &str) -> Decimal {
    raw.parse().unwrap()
}

/// Bounds are RFC 3339 timestamps or plain dates (UTC midnight).
fn parse_bound(raw: &str) -> StoreResult<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::default())))
        .map_err(|_| StoreError::InvalidDate(raw.to_string()))
}

fn in_range(range: &DateRange, instant: DateTime<Utc>) -> StoreResult<bool> {
    if let Some(start) = &range.start {
        if instant < parse_bound(start)? {
            return Ok(false);
        }
    }
    if let Some(end) = &range.end {
        if instant > parse_bound(end)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn filter_rows<T: Clone>(
    rows: &[T],
    range: &DateRange,
    date: impl Fn(&T) -> DateTime<Utc>,
    keep: impl Fn(&T) -> bool,
) -> StoreResult<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        if keep(row) && in_range(range, date(row))? {
            out.push(row.clone());
        }
    }
    out.sort_by(|a, b| date(b).cmp(&date(a)));
    Ok(out)
}

/// In-memory [`ReportStore`] mirroring the Postgres repository's filtering.
/// Breakdown rows come back in reverse enum order so callers must sort.
#[derive(Default)]
pub struct MemoryStore {
    pub patients: Vec<PatientRecord>,
    pub encounters: Vec<EncounterRecord>,
    pub lab_results: Vec<LabResultRecord>,
    pub prescriptions: Vec<PrescriptionRecord>,
    pub bills: Vec<BillRecord>,
    pub failing: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }

    pub fn add_patient(&mut self, mrn: &str, created_at: DateTime<Utc>) -> PatientRef {
        let patient = Patient {
            id: Uuid::new_v4(),
            mrn: mrn.to_string(),
            first_name: "Test".to_string(),
            last_name: mrn.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
            gender: Gender::Female,
            email: None,
            phone: None,
            created_at,
        };
        let reference = patient.to_ref();
        self.patients.push(PatientRecord {
            patient,
            counts: PatientCounts::default(),
        });
        reference
    }

    pub fn add_bill(
        &mut self,
        patient: &PatientRef,
        total: &str,
        tax: &str,
        discount: &str,
        payment_status: PaymentStatus,
        created_at: DateTime<Utc>,
    ) {
        self.bills.push(BillRecord {
            bill: Bill {
                id: Uuid::new_v4(),
                patient_id: patient.id,
                encounter_id: None,
                bill_number: format!("INV-{}", self.bills.len() + 1),
                subtotal: money(total) - money(tax) + money(discount),
                tax: money(tax),
                discount: money(discount),
                total: money(total),
                payment_status,
                due_date: None,
                paid_at: None,
                created_at,
            },
            patient: patient.clone(),
        });
    }

    pub fn add_lab(
        &mut self,
        patient: &PatientRef,
        test_name: &str,
        status: LabStatus,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.lab_results.push(LabResultRecord {
            lab_result: LabResult {
                id,
                patient_id: patient.id,
                encounter_id: None,
                ordered_by: None,
                test_name: test_name.to_string(),
                test_code: None,
                status,
                result_value: None,
                unit: None,
                reference_range: None,
                is_abnormal: false,
                ordered_at: created_at,
                completed_at: None,
                created_at,
            },
            patient: patient.clone(),
        });
        id
    }

    pub fn add_encounter(
        &mut self,
        patient: &PatientRef,
        encounter_type: EncounterType,
        status: EncounterStatus,
        encounter_date: DateTime<Utc>,
    ) {
        let provider = ProviderRef {
            id: Uuid::new_v4(),
            first_name: "Gregory".to_string(),
            last_name: "House".to_string(),
        };
        self.encounters.push(EncounterRecord {
            encounter: Encounter {
                id: Uuid::new_v4(),
                patient_id: patient.id,
                provider_id: provider.id,
                encounter_type,
                status,
                encounter_date,
                chief_complaint: None,
                created_at: encounter_date,
            },
            patient: patient.clone(),
            provider,
        });
    }

    pub fn add_prescription(
        &mut self,
        patient: &PatientRef,
        medication_name: &str,
        status: PrescriptionStatus,
        created_at: DateTime<Utc>,
    ) {
        let prescriber = ProviderRef {
            id: Uuid::new_v4(),
            first_name: "Lisa".to_string(),
            last_name: "Cuddy".to_string(),
        };
        self.prescriptions.push(PrescriptionRecord {
            prescription: Prescription {
                id: Uuid::new_v4(),
                patient_id: patient.id,
                prescribed_by: prescriber.id,
                medication_name: medication_name.to_string(),
                dosage: "500mg".to_string(),
                frequency: "twice daily".to_string(),
                status,
                start_date: created_at.date_naive(),
                end_date: None,
                created_at,
            },
            patient: patient.clone(),
            prescriber,
        });
    }
}

fn status_counts<S: Ord + Copy>(statuses: impl Iterator<Item = S>) -> Vec<StatusCount<S>> {
    let mut counts = BTreeMap::new();
    for status in statuses {
        *counts.entry(status).or_insert(0i64) += 1;
    }
    counts
        .into_iter()
        .rev()
        .map(|(status, count)| StatusCount { status, count })
        .collect()
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn count_patients(&self) -> StoreResult<i64> {
        self.check()?;
        Ok(self.patients.len() as i64)
    }

    async fn count_encounters(&self) -> StoreResult<i64> {
        self.check()?;
        Ok(self.encounters.len() as i64)
    }

    async fn count_encounters_within(&self, window: DayWindow) -> StoreResult<i64> {
        self.check()?;
        Ok(self
            .encounters
            .iter()
            .filter(|e| window.contains(e.encounter.encounter_date))
            .count() as i64)
    }

    async fn count_lab_results_with_status(&self, status: LabStatus) -> StoreResult<i64> {
        self.check()?;
        Ok(self
            .lab_results
            .iter()
            .filter(|l| l.lab_result.status == status)
            .count() as i64)
    }

    async fn sum_paid_bill_totals(&self) -> StoreResult<Decimal> {
        self.check()?;
        Ok(self
            .bills
            .iter()
            .filter(|b| b.bill.payment_status == PaymentStatus::Paid)
            .map(|b| b.bill.total)
            .sum())
    }

    async fn patients(&self, range: &DateRange) -> StoreResult<Vec<PatientRecord>> {
        self.check()?;
        let mut rows = filter_rows(&self.patients, range, |p| p.patient.created_at, |_| true)?;
        for row in &mut rows {
            let id = row.patient.id;
            row.counts = PatientCounts {
                encounters: self.encounters.iter().filter(|e| e.encounter.patient_id == id).count() as i64,
                lab_results: self.lab_results.iter().filter(|l| l.lab_result.patient_id == id).count() as i64,
                bills: self.bills.iter().filter(|b| b.bill.patient_id == id).count() as i64,
            };
        }
        Ok(rows)
    }

    async fn paid_bills(&self, range: &DateRange) -> StoreResult<Vec<BillRecord>> {
        self.check()?;
        filter_rows(
            &self.bills,
            range,
            |b| b.bill.created_at,
            |b| b.bill.payment_status == PaymentStatus::Paid,
        )
    }

    async fn lab_results(
        &self,
        range: &DateRange,
        status: Option<LabStatus>,
    ) -> StoreResult<Vec<LabResultRecord>> {
        self.check()?;
        filter_rows(
            &self.lab_results,
            range,
            |l| l.lab_result.created_at,
            |l| status.map_or(true, |s| l.lab_result.status == s),
        )
    }

    async fn lab_status_counts(
        &self,
        range: &DateRange,
        status: Option<LabStatus>,
    ) -> StoreResult<Vec<StatusCount<LabStatus>>> {
        let rows = self.lab_results(range, status).await?;
        Ok(status_counts(rows.iter().map(|l| l.lab_result.status)))
    }

    async fn encounters(
        &self,
        range: &DateRange,
        encounter_type: Option<EncounterType>,
    ) -> StoreResult<Vec<EncounterRecord>> {
        self.check()?;
        filter_rows(
            &self.encounters,
            range,
            |e| e.encounter.encounter_date,
            |e| encounter_type.map_or(true, |t| e.encounter.encounter_type == t),
        )
    }

    async fn encounter_type_status_counts(
        &self,
        range: &DateRange,
        encounter_type: Option<EncounterType>,
    ) -> StoreResult<Vec<TypeStatusCount>> {
        let rows = self.encounters(range, encounter_type).await?;
        let mut counts = BTreeMap::new();
        for row in &rows {
            *counts
                .entry((row.encounter.encounter_type, row.encounter.status))
                .or_insert(0i64) += 1;
        }
        Ok(counts
            .into_iter()
            .rev()
            .map(|((encounter_type, status), count)| TypeStatusCount {
                encounter_type,
                status,
                count,
            })
            .collect())
    }

    async fn prescriptions(
        &self,
        range: &DateRange,
        status: Option<PrescriptionStatus>,
    ) -> StoreResult<Vec<PrescriptionRecord>> {
        self.check()?;
        filter_rows(
            &self.prescriptions,
            range,
            |r| r.prescription.created_at,
            |r| status.map_or(true, |s| r.prescription.status == s),
        )
    }

    async fn prescription_status_counts(
        &self,
        range: &DateRange,
        status: Option<PrescriptionStatus>,
    ) -> StoreResult<Vec<StatusCount<PrescriptionStatus>>> {
        let rows = self.prescriptions(range, status).await?;
        Ok(status_counts(rows.iter().map(|r| r.prescription.status)))
    }

    async fn lab_result(&self, id: Uuid) -> StoreResult<Option<LabResultRecord>> {
        self.check()?;
        Ok(self
            .lab_results
            .iter()
            .find(|l| l.lab_result.id == id)
            .cloned())
    }
}

/// A small clinic: three patients, mixed bills, labs, encounters and scripts
/// spread over January and February 2024.
pub fn seeded_store() -> MemoryStore {
    let mut store = MemoryStore::default();

    let alice = store.add_patient("MRN-001", at("2024-01-05T09:00:00Z"));
    let bob = store.add_patient("MRN-002", at("2024-01-20T14:30:00Z"));
    let carol = store.add_patient("MRN-003", at("2024-02-10T11:15:00Z"));

    store.add_bill(&alice, "150.00", "12.00", "0.00", PaymentStatus::Paid, at("2024-01-10T10:00:00Z"));
    store.add_bill(&bob, "80.50", "6.44", "5.00", PaymentStatus::Paid, at("2024-01-25T16:00:00Z"));
    store.add_bill(&bob, "300.00", "24.00", "0.00", PaymentStatus::Pending, at("2024-01-26T09:00:00Z"));
    store.add_bill(&carol, "45.25", "3.62", "0.00", PaymentStatus::Paid, at("2024-02-12T13:00:00Z"));

    store.add_lab(&alice, "Complete Blood Count", LabStatus::Completed, at("2024-01-06T08:00:00Z"));
    store.add_lab(&bob, "Lipid Panel", LabStatus::Pending, at("2024-01-21T08:00:00Z"));
    store.add_lab(&carol, "HbA1c", LabStatus::Pending, at("2024-02-11T08:00:00Z"));

    store.add_encounter(&alice, EncounterType::Consultation, EncounterStatus::Completed, at("2024-01-05T09:30:00Z"));
    store.add_encounter(&bob, EncounterType::Emergency, EncounterStatus::Completed, at("2024-01-20T15:00:00Z"));
    store.add_encounter(&carol, EncounterType::Consultation, EncounterStatus::Scheduled, at("2024-02-10T11:30:00Z"));

    store.add_prescription(&alice, "Amoxicillin", PrescriptionStatus::Active, at("2024-01-05T10:00:00Z"));
    store.add_prescription(&bob, "Ibuprofen", PrescriptionStatus::Completed, at("2024-01-20T16:00:00Z"));

    store
}

pub fn test_state(store: MemoryStore) -> (AppState, ehr_server::jobs::Worker) {
    let processor = Arc::new(LabReportProcessor::new(DelayRange::fixed(Duration::ZERO)));
    let (queue, worker) = JobQueue::new(LAB_REPORTS_QUEUE, 3, processor);
    let tokens = TokenRegistry::new(&[
        ApiToken {
            token: ADMIN_TOKEN.to_string(),
            role: Role::Admin,
        },
        ApiToken {
            token: BILLING_TOKEN.to_string(),
            role: Role::Billing,
        },
    ]);
    let reports = ReportService::new(Arc::new(store));
    (AppState::new(reports, queue, tokens), worker)
}
