use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    BillRecord, EncounterRecord, EncounterStatus, EncounterType, LabResultRecord, LabStatus,
    PatientRecord, PrescriptionRecord, PrescriptionStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_patients: i64,
    pub total_encounters: i64,
    pub pending_labs: i64,
    pub total_revenue: Decimal,
    pub today_encounters: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientReport {
    pub total: usize,
    pub patients: Vec<PatientRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub total: usize,
    pub total_revenue: Decimal,
    pub total_tax: Decimal,
    pub total_discount: Decimal,
    pub bills: Vec<BillRecord>,
}

/// One row of a single-field breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCount<S> {
    pub status: S,
    pub count: i64,
}

/// One row of the encounter breakdown, grouped by type and status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeStatusCount {
    #[serde(rename = "type")]
    pub encounter_type: EncounterType,
    pub status: EncounterStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabReport {
    pub total: usize,
    pub by_status: Vec<StatusCount<LabStatus>>,
    pub lab_results: Vec<LabResultRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EncounterReport {
    pub total: usize,
    pub by_type_and_status: Vec<TypeStatusCount>,
    pub encounters: Vec<EncounterRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionReport {
    pub total: usize,
    pub by_status: Vec<StatusCount<PrescriptionStatus>>,
    pub prescriptions: Vec<PrescriptionRecord>,
}
