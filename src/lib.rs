//! Battery SoC guard for VNish miners
//!
//! Stops and resumes a fleet of VNish mining rigs based on the battery
//! state of charge reported by a Home Assistant sensor.

pub mod config;
pub mod control;
pub mod display;
pub mod errors;
pub mod fleet;
pub mod ha;
pub mod miner;

pub use config::Config;
pub use fleet::Fleet;
pub use ha::HaClient;
pub use miner::MinerSession;
