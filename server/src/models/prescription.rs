use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PatientRef, ProviderRef};

super::text_enum! {
    pub enum PrescriptionStatus {
        Active => "ACTIVE",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
        Expired => "EXPIRED",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub prescribed_by: Uuid,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub status: PrescriptionStatus,
    pub start_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionRecord {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub patient: PatientRef,
    pub prescriber: ProviderRef,
}
