//! # credit-engine
//!
//! Encrypted credit position lifecycle and liquidation engine.
//!
//! Enterprise borrowers hold positions whose collateral, debt and risk
//! indicators exist only as ciphertexts. The engine drives each position
//! through a multi-stage health/liquidation lifecycle using comparisons
//! and arithmetic on the still-encrypted values; the only plaintext
//! disclosure is a bounded set of derived risk metrics returned by an
//! asynchronous decryption oracle.
//!
//! ## Architecture
//!
//! - **core** — Foundational types: ciphertext algebra, actors, policies,
//!   positions and their lifecycle, errors, events
//! - **engine** — The stateful credit engine: store, health evaluation,
//!   rebalancing, liquidation
//! - **oracle** — Pending decryption requests and callback application
//! - **ledger** — Per-manager profiles and pool-wide encrypted aggregates
//! - **simulation** — Random portfolio generation and a demo oracle

pub mod core;
pub mod engine;
pub mod ledger;
pub mod oracle;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::actor::{ActorId, Role};
    pub use crate::core::cipher::{CipherValue, InputProof};
    pub use crate::core::error::EngineError;
    pub use crate::core::policy::{PolicyRegistry, PoolPolicy, SegmentKey, SegmentPolicy};
    pub use crate::core::position::{Position, PositionId, PositionStatus};
    pub use crate::engine::store::CreditEngine;
}
