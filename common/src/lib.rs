// Common library for the pipeline trigger service

pub mod config;
pub mod cron;
pub mod db;
pub mod errors;
pub mod message;
pub mod models;
pub mod queue;
pub mod starter;
pub mod telemetry;
