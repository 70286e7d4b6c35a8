//! Fair shift rostering: turns declared availability into a
//! fairness-weighted mixed-integer model, solves it with HiGHS and reports
//! how evenly the hours landed.

pub mod audit;
pub mod availability;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod formulation;
pub mod metrics;
pub mod model;
pub mod server;
pub mod solver;

pub use config::RosterConfig;
pub use data::{RosterInput, RosterOutput};
pub use engine::{HighsEngine, SolveStatus, SolvingEngine};
pub use error::RosterError;
