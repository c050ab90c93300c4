pub mod calendar;
pub mod config;
pub mod db;
pub mod geography;
pub mod jobs;
pub mod metric;
pub mod publish;
pub mod report;
pub mod sources;
pub mod utils;
