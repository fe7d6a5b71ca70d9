pub mod challenge;
pub mod config;
pub mod constants;
pub mod db;
pub mod detector;
pub mod engine;
pub mod error;
pub mod host;
pub mod ledger;
pub mod models;
pub mod platform;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod tracker;
pub mod validation;

#[cfg(test)]
mod test_utils;

pub use engine::{Engine, Signal};
pub use error::{QuotaError, Result};
