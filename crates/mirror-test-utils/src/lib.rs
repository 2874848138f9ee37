//! Shared test utilities for the folder-mirror workspace.
//!
//! This crate provides standardised directory fixtures so the engine and
//! binary test suites describe trees the same way. It is a dev-dependency
//! only and never published.
//!
//! # Modules
//!
//! - [`tree`]: [`TestTree`] builder for source and replica directories

pub mod tree;

pub use tree::TestTree;
