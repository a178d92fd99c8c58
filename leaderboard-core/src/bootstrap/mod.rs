//! Startup wiring: configuration, database pool, and core services

pub mod config;
pub mod database;
pub mod services;

pub use config::load_config;
pub use database::init_database;
pub use services::{init_services, Services};
