//! # devicesync Testkit
//!
//! Shared test support for the devicesync crates.
//!
//! This crate provides:
//! - `EdgePlatformSim`: an in-process legacy REST edge platform
//! - `ConflictingStore`: a store wrapper that injects version conflicts
//! - Fixtures for records and wire objects
//! - Proptest strategies for names and values

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod conflict;
pub mod fixtures;
mod sim;
pub mod strategies;

pub use conflict::ConflictingStore;
pub use sim::EdgePlatformSim;
