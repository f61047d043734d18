pub mod analysis;
pub mod commands;
pub mod config;
pub mod connection;
pub mod connector;
pub mod contracts;
pub mod error;
pub mod import;
pub mod migrations;
pub mod model;
pub mod repository;
pub mod setup;
pub mod state;
pub mod store;

pub use contracts::envelope::{ErrorEnvelope, SuccessEnvelope, error_envelope};
pub use error::{ClientError, ClientResult};

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");
