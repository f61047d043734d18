pub mod clients;
pub mod common;
pub mod data;
pub mod import;
pub mod perf;
pub mod status;
