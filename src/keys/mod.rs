//! Key Pool Module
//!
//! Credential rotation and rate-limit cooldown tracking.

pub mod pool;

pub use pool::{KeyPool, KeyStatus, RATE_LIMIT_COOLDOWN};
