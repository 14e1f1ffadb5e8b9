pub mod client;
pub mod config;
pub mod errors;
pub mod service;
pub mod telemetry;
pub mod ui;
