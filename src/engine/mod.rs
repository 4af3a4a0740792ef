//! The lifecycle engine: position store and facade, encrypted health
//! evaluation, rebalancing and liquidation.

pub mod health;
pub mod liquidation;
pub mod rebalance;
pub mod store;

pub use health::{evaluate_health, HealthComputation};
pub use store::{CreditEngine, ManagerSummary, PoolSummary, PositionStore, PositionSummary, ReviewSummary};
