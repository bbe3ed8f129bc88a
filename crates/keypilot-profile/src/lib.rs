//! Profile types and serialization
//!
//! This crate provides the profile definitions shared by the repository, the
//! device sync port and the switching engine: a [`Profile`] names a
//! [`KeyMapping`] for the three-button, one-knob macro pad and lists the
//! applications it applies to.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod seed;
pub mod types;
pub mod validation;

pub use seed::seed_profiles;
pub use types::*;
pub use validation::*;
