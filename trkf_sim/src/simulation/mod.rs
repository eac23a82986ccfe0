// trkf_sim/src/simulation/mod.rs

//! Everything needed to run a scenario end to end: configuration, the
//! detector built from it, event generation and fitting.

pub mod config;
pub mod detector;
pub mod error;
pub mod fitter;
pub mod generator;
pub mod runner;
