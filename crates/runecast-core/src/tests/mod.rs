//! Crate-level tests for the activation pipeline.
//!
//! - `helpers.rs`: the shared [`helpers::TestHost`] double and definition
//!   factories
//! - `integration.rs`: end-to-end activation scenarios through the driver
//! - `properties.rs`: proptest invariants for cooldown, ammo, and timers

pub mod helpers;
mod properties;

pub use helpers::*;
