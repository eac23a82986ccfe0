// trkf_core/src/models/mod.rs

pub mod interaction;
pub mod measurement;
pub mod propagation;
