//! Report assembly on top of a [`ReportStore`](crate::db::ReportStore).

pub mod aggregate;
pub mod service;

pub use aggregate::RevenueTotals;
pub use service::ReportService;
