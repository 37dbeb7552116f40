//! Background job processing.
//!
//! A [`JobQueue`] hands job ids to a single [`Worker`], which runs them one at
//! a time through a [`JobProcessor`] and retries failures until the queue's
//! attempt limit is reached. Job records live in memory only.

pub mod lab_report;
pub mod queue;

pub use lab_report::{
    DelayRange, LabReportPayload, LabReportProcessor, GENERATE_REPORT, LAB_REPORTS_QUEUE,
};
pub use queue::{
    Job, JobError, JobProcessor, JobQueue, JobRecord, JobState, Worker, DEFAULT_RETAINED_JOBS,
};
