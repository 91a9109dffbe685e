//! Client side stop detection: classifies sensor readings into moving and
//! stopped and opens or closes stop events accordingly.

pub mod backend;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod motion;
pub mod replay;
pub mod sample;
pub mod smoothing;
