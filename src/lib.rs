//! Payroll ETL: load master and payroll extracts, aggregate yearly agency
//! totals, write them to two destinations.

pub mod api;
pub mod config;
pub mod db;
pub mod docs;
pub mod model;
pub mod pipeline;
pub mod routes;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod utils;
