pub mod config;
pub mod migrations;
pub mod repository;
pub mod store;

pub use config::DbConfig;
pub use repository::ReportRepository;
pub use store::{DateRange, DayWindow, ReportStore, StoreError, StoreResult};
