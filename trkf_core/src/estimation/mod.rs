// trkf_core/src/estimation/mod.rs

//! Track states, fitted-track containers and the filter that fills them.

pub mod filter;
pub mod gtrack;
pub mod hit_container;
pub mod hit_group;
pub mod hit_track;
pub mod track;

pub use filter::KalmanFilter;
pub use gtrack::KGTrack;
pub use hit_container::KHitContainer;
pub use hit_group::KHitGroup;
pub use hit_track::KHitTrack;
pub use track::{KETrack, KTrack};
