use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PatientRef, ProviderRef};

super::text_enum! {
    pub enum EncounterType {
        Consultation => "CONSULTATION",
        FollowUp => "FOLLOW_UP",
        Emergency => "EMERGENCY",
        RoutineCheckup => "ROUTINE_CHECKUP",
        Procedure => "PROCEDURE",
        Telemedicine => "TELEMEDICINE",
    }
}

super::text_enum! {
    pub enum EncounterStatus {
        Scheduled => "SCHEDULED",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    #[serde(rename = "type")]
    pub encounter_type: EncounterType,
    pub status: EncounterStatus,
    pub encounter_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chief_complaint: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Encounter joined with its patient and the attending provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncounterRecord {
    #[serde(flatten)]
    pub encounter: Encounter,
    pub patient: PatientRef,
    pub provider: ProviderRef,
}
