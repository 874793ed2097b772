// Common library shared by the scheduler and API binaries

pub mod auth;
pub mod bootstrap;
pub mod clients;
pub mod clock;
pub mod config;
pub mod db;
pub mod errors;
pub mod executor;
pub mod lock;
pub mod models;
pub mod schedule;
pub mod scheduler;
pub mod telemetry;
