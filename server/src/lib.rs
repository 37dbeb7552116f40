pub mod access;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod reports;
pub mod routes;

pub use routes::{app, AppState};
