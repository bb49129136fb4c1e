//! Lather
//!
//! Lather finds the hand-soap method sequence (buy a disposable bottle, refill
//! it, or switch to a reusable bar) that minimises total emissions across a
//! population of consumers, subject to what each consumer can afford.

pub mod config;
pub mod logging;
pub mod model;
pub mod outcome;
pub mod params;
pub mod prelude;
pub mod report;
pub mod sampler;
pub mod solvers;
pub mod summary;

pub use model::optimize;
