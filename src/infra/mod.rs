//! Infrastructure adapters and runtime bootstrap.

pub mod cache_file;
pub mod error;
pub mod http;
pub mod metadata;
pub mod reseller;
pub mod telemetry;
