//! Foundational types: ciphertext algebra, actors, policies, positions
//! and their lifecycle, errors, events.

pub mod actor;
pub mod cipher;
pub mod error;
pub mod events;
pub mod policy;
pub mod position;
