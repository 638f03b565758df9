//! VNish miner access: transport, session lifecycle, activity detection.

pub mod activity;
pub mod api;
pub mod session;

pub use activity::Activity;
pub use api::{HttpApi, MinerApi};
pub use session::MinerSession;
