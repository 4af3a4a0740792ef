//! Per-manager profiles and pool-wide encrypted aggregates.

pub mod aggregate;
pub mod manager;
