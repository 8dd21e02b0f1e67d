pub mod auth;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod filter;
pub mod org;
pub mod permission;
pub mod statistics;
pub mod telemetry;

pub use context::RequestContext;
pub use error::{ErrorKind, StatsError};

#[cfg(test)]
pub mod testing;
