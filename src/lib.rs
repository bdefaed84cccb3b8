pub mod aggregate;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod summary;
pub mod trace;
