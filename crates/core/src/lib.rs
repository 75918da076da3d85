#![deny(warnings)]

//! Multi-modal emotion synchronization: voice, words and face predictions
//! fused onto one speech timeline, rendered as reports and coaching feedback.

pub mod adapter;
pub mod config;
pub mod emotion;
pub mod feedback;
pub mod hume;
pub mod pipeline;
pub mod report;
pub mod segment;
pub mod sync;
pub mod util;
