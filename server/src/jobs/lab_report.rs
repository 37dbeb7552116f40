use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::queue::{Job, JobError, JobProcessor};

pub const LAB_REPORTS_QUEUE: &str = "lab-reports";
pub const GENERATE_REPORT: &str = "generate-report";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabReportPayload {
    pub lab_result_id: Uuid,
    pub patient_id: Uuid,
    pub test_name: String,
}

/// Inclusive bounds for the simulated processing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    /// Bounds given in the wrong order are swapped.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay)
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let millis = rand::thread_rng().gen_range(self.min.as_millis()..=self.max.as_millis());
        Duration::from_millis(millis as u64)
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(5))
    }
}

/// Handles `generate-report` jobs on the `lab-reports` queue.
///
/// Report rendering and upload are simulated by a delay; the acknowledgment
/// is the only output and is kept on the job record.
pub struct LabReportProcessor {
    delay: DelayRange,
}

impl LabReportProcessor {
    pub fn new(delay: DelayRange) -> Self {
        Self { delay }
    }

    async fn generate(&self, payload: &LabReportPayload) -> Result<Value, JobError> {
        let delay = self.delay.sample();
        tracing::debug!(
            lab_result_id = %payload.lab_result_id,
            delay_ms = delay.as_millis() as u64,
            "Rendering lab report"
        );
        tokio::time::sleep(delay).await;

        Ok(json!({
            "success": true,
            "labResultId": payload.lab_result_id,
        }))
    }
}

impl Default for LabReportProcessor {
    fn default() -> Self {
        Self::new(DelayRange::default())
    }
}

#[async_trait]
impl JobProcessor for LabReportProcessor {
    async fn process(&self, job: &Job) -> Result<Value, JobError> {
        if job.name != GENERATE_REPORT {
            tracing::error!(job_id = %job.id, job = %job.name, "Unknown lab report job");
            return Err(JobError::UnknownJob(job.name.clone()));
        }

        let payload: LabReportPayload = serde_json::from_value(job.data.clone()).map_err(|e| {
            tracing::error!(job_id = %job.id, error = %e, "Invalid lab report payload");
            JobError::from(e)
        })?;

        tracing::info!(
            job_id = %job.id,
            lab_result_id = %payload.lab_result_id,
            patient_id = %payload.patient_id,
            test_name = %payload.test_name,
            "Generating lab report"
        );

        match self.generate(&payload).await {
            Ok(ack) => {
                tracing::info!(lab_result_id = %payload.lab_result_id, "Lab report generated");
                Ok(ack)
            }
            Err(e) => {
                tracing::error!(lab_result_id = %payload.lab_result_id, error = %e, "Lab report generation failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobQueue, JobState};
    use std::sync::Arc;
    use tokio_test::assert_ok;

    fn payload() -> LabReportPayload {
        LabReportPayload {
            lab_result_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            test_name: "Complete Blood Count".to_string(),
        }
    }

    fn job(name: &str, data: Value) -> Job {
        Job {
            id: Uuid::new_v4(),
            name: name.to_string(),
            data,
            attempts_made: 0,
        }
    }

    #[test]
    fn test_payload_wire_format() {
        let json = serde_json::to_value(payload()).unwrap();
        assert!(json["labResultId"].is_string());
        assert!(json["patientId"].is_string());
        assert_eq!(json["testName"], "Complete Blood Count");
    }

    #[test]
    fn test_delay_sample_stays_in_range() {
        let range = DelayRange::new(Duration::from_millis(5), Duration::from_millis(10));
        for _ in 0..100 {
            let d = range.sample();
            assert!(d >= range.min() && d <= range.max());
        }
    }

    #[test]
    fn test_delay_bounds_are_ordered() {
        let range = DelayRange::new(Duration::from_secs(5), Duration::from_secs(2));
        assert_eq!(range.min(), Duration::from_secs(2));
        assert_eq!(range.max(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_generate_report_acknowledges() {
        let processor = LabReportProcessor::new(DelayRange::fixed(Duration::ZERO));
        let payload = payload();

        let ack = processor
            .process(&job(GENERATE_REPORT, serde_json::to_value(&payload).unwrap()))
            .await;

        let ack = assert_ok!(ack);
        assert_eq!(ack["success"], true);
        assert_eq!(ack["labResultId"], payload.lab_result_id.to_string());
    }

    #[tokio::test]
    async fn test_unknown_job_name_is_rejected() {
        let processor = LabReportProcessor::new(DelayRange::fixed(Duration::ZERO));

        let err = processor
            .process(&job("send-email", serde_json::to_value(payload()).unwrap()))
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::UnknownJob(name) if name == "send-email"));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_rejected() {
        let processor = LabReportProcessor::new(DelayRange::fixed(Duration::ZERO));

        let err = processor
            .process(&job(GENERATE_REPORT, json!({ "labResultId": "not-a-uuid" })))
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Payload(_)));
    }

    #[tokio::test]
    async fn test_bad_payload_exhausts_queue_attempts() {
        let processor = Arc::new(LabReportProcessor::new(DelayRange::fixed(Duration::ZERO)));
        let (queue, mut worker) = JobQueue::new(LAB_REPORTS_QUEUE, 2, processor);

        queue.add(GENERATE_REPORT, json!({})).unwrap();
        let record = worker.process_next().await.unwrap();

        assert_eq!(record.state, JobState::Failed);
        assert_eq!(record.attempts_made, 2);
    }
}
