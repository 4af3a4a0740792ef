//! The decryption oracle boundary: pending-request correlation and
//! callback validation. The oracle round trip is the only plaintext
//! disclosure in the system.

pub mod client;
