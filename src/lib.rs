//! insightdash: JSON ingestion into SQLite and a filterable REST API over
//! the resulting insights.

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
