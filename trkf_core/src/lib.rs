// trkf_core/src/lib.rs

pub mod config;
pub mod error;
pub mod estimation;
pub mod linalg;
pub mod messages;
pub mod models;
pub mod prelude;
pub mod services;
pub mod surfaces;
pub mod types;
