#![forbid(unsafe_code)]

//! Civil-records service: a person registry with typed contact handles,
//! scanned document pages, and name search, backed by `PostgreSQL`.

pub mod api;
pub mod config;
pub mod errors;
pub mod models;
pub mod persistence;
pub mod upload;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
