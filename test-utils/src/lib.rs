//! Shared test utilities for the Pact verifier.
//!
//! This crate provides:
//! - Proptest generators for contract bodies and interactions
//! - In-memory provider and contract source doubles
//! - Sample contracts

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
