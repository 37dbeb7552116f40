use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use std::str::FromStr;
use uuid::Uuid;

use super::store::{DateRange, DayWindow, ReportStore, StoreResult};
use crate::models::{
    Bill, BillRecord, Encounter, EncounterRecord, EncounterType, LabResult, LabResultRecord,
    LabStatus, Patient, PatientCounts, PatientRecord, PatientRef, PaymentStatus, Prescription,
    PrescriptionRecord, PrescriptionStatus, ProviderRef, StatusCount, TypeStatusCount,
    UnknownVariant,
};

const PATIENT_SELECT: &str = "SELECT p.id, p.mrn, p.first_name, p.last_name, p.date_of_birth, \
     p.gender, p.email, p.phone, p.created_at, \
     (SELECT COUNT(*) FROM encounters e WHERE e.patient_id = p.id) AS encounter_count, \
     (SELECT COUNT(*) FROM lab_results l WHERE l.patient_id = p.id) AS lab_result_count, \
     (SELECT COUNT(*) FROM bills b WHERE b.patient_id = p.id) AS bill_count \
     FROM patients p";

const BILL_SELECT: &str = "SELECT b.id, b.patient_id, b.encounter_id, b.bill_number, b.subtotal, \
     b.tax, b.discount, b.total, b.payment_status, b.due_date, b.paid_at, b.created_at, \
     p.mrn AS patient_mrn, p.first_name AS patient_first_name, p.last_name AS patient_last_name \
     FROM bills b JOIN patients p ON p.id = b.patient_id";

const LAB_RESULT_SELECT: &str = "SELECT l.id, l.patient_id, l.encounter_id, l.ordered_by, \
     l.test_name, l.test_code, l.status, l.result_value, l.unit, l.reference_range, \
     l.is_abnormal, l.ordered_at, l.completed_at, l.created_at, \
     p.mrn AS patient_mrn, p.first_name AS patient_first_name, p.last_name AS patient_last_name \
     FROM lab_results l JOIN patients p ON p.id = l.patient_id";

const ENCOUNTER_SELECT: &str = "SELECT e.id, e.patient_id, e.provider_id, e.encounter_type, \
     e.status, e.encounter_date, e.chief_complaint, e.created_at, \
     p.mrn AS patient_mrn, p.first_name AS patient_first_name, p.last_name AS patient_last_name, \
     u.first_name AS provider_first_name, u.last_name AS provider_last_name \
     FROM encounters e \
     JOIN patients p ON p.id = e.patient_id \
     JOIN users u ON u.id = e.provider_id";

const PRESCRIPTION_SELECT: &str = "SELECT r.id, r.patient_id, r.prescribed_by, \
     r.medication_name, r.dosage, r.frequency, r.status, r.start_date, r.end_date, r.created_at, \
     p.mrn AS patient_mrn, p.first_name AS patient_first_name, p.last_name AS patient_last_name, \
     u.first_name AS provider_first_name, u.last_name AS provider_last_name \
     FROM prescriptions r \
     JOIN patients p ON p.id = r.patient_id \
     JOIN users u ON u.id = r.prescribed_by";

/// PostgreSQL-backed report store
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append inclusive bounds on `column`. The bound text is cast by Postgres, so
/// an unparseable date fails the whole query.
fn push_date_range(builder: &mut QueryBuilder<'_, Postgres>, column: &str, range: &DateRange) {
    if let Some(start) = &range.start {
        builder
            .push(" AND ")
            .push(column)
            .push(" >= ")
            .push_bind(start.clone())
            .push("::timestamptz");
    }
    if let Some(end) = &range.end {
        builder
            .push(" AND ")
            .push(column)
            .push(" <= ")
            .push_bind(end.clone())
            .push("::timestamptz");
    }
}

fn push_text_filter(
    builder: &mut QueryBuilder<'_, Postgres>,
    column: &str,
    value: Option<&'static str>,
) {
    if let Some(value) = value {
        builder.push(" AND ").push(column).push(" = ").push_bind(value);
    }
}

fn decode_text<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e: UnknownVariant| sqlx::Error::Decode(Box::new(e)))
}

fn patient_ref(row: &PgRow) -> Result<PatientRef, sqlx::Error> {
    Ok(PatientRef {
        id: row.try_get("patient_id")?,
        mrn: row.try_get("patient_mrn")?,
        first_name: row.try_get("patient_first_name")?,
        last_name: row.try_get("patient_last_name")?,
    })
}

fn provider_ref(row: &PgRow, id_column: &str) -> Result<ProviderRef, sqlx::Error> {
    Ok(ProviderRef {
        id: row.try_get(id_column)?,
        first_name: row.try_get("provider_first_name")?,
        last_name: row.try_get("provider_last_name")?,
    })
}

fn patient_record(row: &PgRow) -> Result<PatientRecord, sqlx::Error> {
    Ok(PatientRecord {
        patient: Patient {
            id: row.try_get("id")?,
            mrn: row.try_get("mrn")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            date_of_birth: row.try_get("date_of_birth")?,
            gender: decode_text(row, "gender")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            created_at: row.try_get("created_at")?,
        },
        counts: PatientCounts {
            encounters: row.try_get("encounter_count")?,
            lab_results: row.try_get("lab_result_count")?,
            bills: row.try_get("bill_count")?,
        },
    })
}

fn bill_record(row: &PgRow) -> Result<BillRecord, sqlx::Error> {
    Ok(BillRecord {
        bill: Bill {
            id: row.try_get("id")?,
            patient_id: row.try_get("patient_id")?,
            encounter_id: row.try_get("encounter_id")?,
            bill_number: row.try_get("bill_number")?,
            subtotal: row.try_get("subtotal")?,
            tax: row.try_get("tax")?,
            discount: row.try_get("discount")?,
            total: row.try_get("total")?,
            payment_status: decode_text(row, "payment_status")?,
            due_date: row.try_get("due_date")?,
            paid_at: row.try_get("paid_at")?,
            created_at: row.try_get("created_at")?,
        },
        patient: patient_ref(row)?,
    })
}

fn lab_result_record(row: &PgRow) -> Result<LabResultRecord, sqlx::Error> {
    Ok(LabResultRecord {
        lab_result: LabResult {
            id: row.try_get("id")?,
            patient_id: row.try_get("patient_id")?,
            encounter_id: row.try_get("encounter_id")?,
            ordered_by: row.try_get("ordered_by")?,
            test_name: row.try_get("test_name")?,
            test_code: row.try_get("test_code")?,
            status: decode_text(row, "status")?,
            result_value: row.try_get("result_value")?,
            unit: row.try_get("unit")?,
            reference_range: row.try_get("reference_range")?,
            is_abnormal: row.try_get("is_abnormal")?,
            ordered_at: row.try_get("ordered_at")?,
            completed_at: row.try_get("completed_at")?,
            created_at: row.try_get("created_at")?,
        },
        patient: patient_ref(row)?,
    })
}

fn encounter_record(row: &PgRow) -> Result<EncounterRecord, sqlx::Error> {
    Ok(EncounterRecord {
        encounter: Encounter {
            id: row.try_get("id")?,
            patient_id: row.try_get("patient_id")?,
            provider_id: row.try_get("provider_id")?,
            encounter_type: decode_text(row, "encounter_type")?,
            status: decode_text(row, "status")?,
            encounter_date: row.try_get("encounter_date")?,
            chief_complaint: row.try_get("chief_complaint")?,
            created_at: row.try_get("created_at")?,
        },
        patient: patient_ref(row)?,
        provider: provider_ref(row, "provider_id")?,
    })
}

fn prescription_record(row: &PgRow) -> Result<PrescriptionRecord, sqlx::Error> {
    Ok(PrescriptionRecord {
        prescription: Prescription {
            id: row.try_get("id")?,
            patient_id: row.try_get("patient_id")?,
            prescribed_by: row.try_get("prescribed_by")?,
            medication_name: row.try_get("medication_name")?,
            dosage: row.try_get("dosage")?,
            frequency: row.try_get("frequency")?,
            status: decode_text(row, "status")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            created_at: row.try_get("created_at")?,
        },
        patient: patient_ref(row)?,
        prescriber: provider_ref(row, "prescribed_by")?,
    })
}

fn status_count<S>(row: &PgRow) -> Result<StatusCount<S>, sqlx::Error>
where
    S: FromStr<Err = UnknownVariant>,
{
    Ok(StatusCount {
        status: decode_text(row, "status")?,
        count: row.try_get("count")?,
    })
}

#[async_trait]
impl ReportStore for ReportRepository {
    async fn count_patients(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM patients")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_encounters(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM encounters")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_encounters_within(&self, window: DayWindow) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM encounters WHERE encounter_date >= $1 AND encounter_date < $2",
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_lab_results_with_status(&self, status: LabStatus) -> StoreResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lab_results WHERE status = $1")
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn sum_paid_bill_totals(&self) -> StoreResult<Decimal> {
        let sum = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(total), 0) FROM bills WHERE payment_status = $1",
        )
        .bind(PaymentStatus::Paid.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(sum)
    }

    async fn patients(&self, range: &DateRange) -> StoreResult<Vec<PatientRecord>> {
        let mut builder = QueryBuilder::new(PATIENT_SELECT);
        builder.push(" WHERE TRUE");
        push_date_range(&mut builder, "p.created_at", range);
        builder.push(" ORDER BY p.created_at DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let patients = rows
            .iter()
            .map(patient_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(patients)
    }

    async fn paid_bills(&self, range: &DateRange) -> StoreResult<Vec<BillRecord>> {
        let mut builder = QueryBuilder::new(BILL_SELECT);
        builder.push(" WHERE TRUE");
        push_text_filter(&mut builder, "b.payment_status", Some(PaymentStatus::Paid.as_str()));
        push_date_range(&mut builder, "b.created_at", range);
        builder.push(" ORDER BY b.created_at DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let bills = rows
            .iter()
            .map(bill_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bills)
    }

    async fn lab_results(
        &self,
        range: &DateRange,
        status: Option<LabStatus>,
    ) -> StoreResult<Vec<LabResultRecord>> {
        let mut builder = QueryBuilder::new(LAB_RESULT_SELECT);
        builder.push(" WHERE TRUE");
        push_date_range(&mut builder, "l.created_at", range);
        push_text_filter(&mut builder, "l.status", status.map(|s| s.as_str()));
        builder.push(" ORDER BY l.created_at DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let results = rows
            .iter()
            .map(lab_result_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(results)
    }

    async fn lab_status_counts(
        &self,
        range: &DateRange,
        status: Option<LabStatus>,
    ) -> StoreResult<Vec<StatusCount<LabStatus>>> {
        let mut builder = QueryBuilder::new("SELECT l.status, COUNT(*) AS count FROM lab_results l");
        builder.push(" WHERE TRUE");
        push_date_range(&mut builder, "l.created_at", range);
        push_text_filter(&mut builder, "l.status", status.map(|s| s.as_str()));
        builder.push(" GROUP BY l.status");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let counts = rows
            .iter()
            .map(status_count)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    async fn encounters(
        &self,
        range: &DateRange,
        encounter_type: Option<EncounterType>,
    ) -> StoreResult<Vec<EncounterRecord>> {
        let mut builder = QueryBuilder::new(ENCOUNTER_SELECT);
        builder.push(" WHERE TRUE");
        push_date_range(&mut builder, "e.encounter_date", range);
        push_text_filter(&mut builder, "e.encounter_type", encounter_type.map(|t| t.as_str()));
        builder.push(" ORDER BY e.encounter_date DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let encounters = rows
            .iter()
            .map(encounter_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(encounters)
    }

    async fn encounter_type_status_counts(
        &self,
        range: &DateRange,
        encounter_type: Option<EncounterType>,
    ) -> StoreResult<Vec<TypeStatusCount>> {
        let mut builder = QueryBuilder::new(
            "SELECT e.encounter_type, e.status, COUNT(*) AS count FROM encounters e",
        );
        builder.push(" WHERE TRUE");
        push_date_range(&mut builder, "e.encounter_date", range);
        push_text_filter(&mut builder, "e.encounter_type", encounter_type.map(|t| t.as_str()));
        builder.push(" GROUP BY e.encounter_type, e.status");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let counts = rows
            .iter()
            .map(|row| {
                Ok(TypeStatusCount {
                    encounter_type: decode_text(row, "encounter_type")?,
                    status: decode_text(row, "status")?,
                    count: row.try_get("count")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(counts)
    }

    async fn prescriptions(
        &self,
        range: &DateRange,
        status: Option<PrescriptionStatus>,
    ) -> StoreResult<Vec<PrescriptionRecord>> {
        let mut builder = QueryBuilder::new(PRESCRIPTION_SELECT);
        builder.push(" WHERE TRUE");
        push_date_range(&mut builder, "r.created_at", range);
        push_text_filter(&mut builder, "r.status", status.map(|s| s.as_str()));
        builder.push(" ORDER BY r.created_at DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let prescriptions = rows
            .iter()
            .map(prescription_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prescriptions)
    }

    async fn prescription_status_counts(
        &self,
        range: &DateRange,
        status: Option<PrescriptionStatus>,
    ) -> StoreResult<Vec<StatusCount<PrescriptionStatus>>> {
        let mut builder =
            QueryBuilder::new("SELECT r.status, COUNT(*) AS count FROM prescriptions r");
        builder.push(" WHERE TRUE");
        push_date_range(&mut builder, "r.created_at", range);
        push_text_filter(&mut builder, "r.status", status.map(|s| s.as_str()));
        builder.push(" GROUP BY r.status");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let counts = rows
            .iter()
            .map(status_count)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    async fn lab_result(&self, id: Uuid) -> StoreResult<Option<LabResultRecord>> {
        let mut builder = QueryBuilder::new(LAB_RESULT_SELECT);
        builder.push(" WHERE l.id = ").push_bind(id);

        let row = builder.build().fetch_optional(&self.pool).await?;
        let record = row.as_ref().map(lab_result_record).transpose()?;
        Ok(record)
    }
}
