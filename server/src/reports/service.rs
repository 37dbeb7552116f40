use std::sync::Arc;

use uuid::Uuid;

use crate::db::{DateRange, DayWindow, ReportStore, StoreResult};
use crate::models::{
    DashboardStats, EncounterReport, EncounterType, LabReport, LabResultRecord, LabStatus,
    PatientReport, PrescriptionReport, PrescriptionStatus, RevenueReport,
};

use super::aggregate::{sort_status_counts, sort_type_status_counts, RevenueTotals};

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ReportStore>,
}

impl ReportService {
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }

    /// Headline counts for the portal landing page.
    ///
    /// The five reads run concurrently; if any fails the whole call fails.
    pub async fn dashboard_stats(&self) -> StoreResult<DashboardStats> {
        self.dashboard_stats_for(DayWindow::today()).await
    }

    pub async fn dashboard_stats_for(&self, today: DayWindow) -> StoreResult<DashboardStats> {
        let store = self.store.as_ref();
        let (total_patients, total_encounters, pending_labs, total_revenue, today_encounters) = tokio::try_join!(
            store.count_patients(),
            store.count_encounters(),
            store.count_lab_results_with_status(LabStatus::Pending),
            store.sum_paid_bill_totals(),
            store.count_encounters_within(today),
        )?;

        Ok(DashboardStats {
            total_patients,
            total_encounters,
            pending_labs,
            total_revenue,
            today_encounters,
        })
    }

    pub async fn patient_report(&self, range: &DateRange) -> StoreResult<PatientReport> {
        let patients = self.store.patients(range).await?;
        tracing::debug!(rows = patients.len(), "Built patient report");

        Ok(PatientReport {
            total: patients.len(),
            patients,
        })
    }

    /// Paid bills in range with exact totals.
    pub async fn revenue_report(&self, range: &DateRange) -> StoreResult<RevenueReport> {
        let bills = self.store.paid_bills(range).await?;
        let totals = RevenueTotals::from_bills(&bills);

        Ok(RevenueReport {
            total: bills.len(),
            total_revenue: totals.revenue,
            total_tax: totals.tax,
            total_discount: totals.discount,
            bills,
        })
    }

    pub async fn lab_report(
        &self,
        range: &DateRange,
        status: Option<LabStatus>,
    ) -> StoreResult<LabReport> {
        let (lab_results, mut by_status) = tokio::try_join!(
            self.store.lab_results(range, status),
            self.store.lab_status_counts(range, status),
        )?;
        sort_status_counts(&mut by_status);

        Ok(LabReport {
            total: lab_results.len(),
            by_status,
            lab_results,
        })
    }

    pub async fn encounter_report(
        &self,
        range: &DateRange,
        encounter_type: Option<EncounterType>,
    ) -> StoreResult<EncounterReport> {
        let (encounters, mut by_type_and_status) = tokio::try_join!(
            self.store.encounters(range, encounter_type),
            self.store.encounter_type_status_counts(range, encounter_type),
        )?;
        sort_type_status_counts(&mut by_type_and_status);

        Ok(EncounterReport {
            total: encounters.len(),
            by_type_and_status,
            encounters,
        })
    }

    pub async fn prescription_report(
        &self,
        range: &DateRange,
        status: Option<PrescriptionStatus>,
    ) -> StoreResult<PrescriptionReport> {
        let (prescriptions, mut by_status) = tokio::try_join!(
            self.store.prescriptions(range, status),
            self.store.prescription_status_counts(range, status),
        )?;
        sort_status_counts(&mut by_status);

        Ok(PrescriptionReport {
            total: prescriptions.len(),
            by_status,
            prescriptions,
        })
    }

    pub async fn lab_result(&self, id: Uuid) -> StoreResult<Option<LabResultRecord>> {
        self.store.lab_result(id).await
    }
}
