//! Portfolio generation and a demo decryption oracle for exercising the
//! engine end to end without external infrastructure.

pub mod oracle_sim;
pub mod scenario;

pub use oracle_sim::SimulatedOracle;
pub use scenario::{run_scenario, PortfolioConfig, ScenarioReport};
