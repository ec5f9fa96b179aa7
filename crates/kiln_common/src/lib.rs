//! Shared foundational types used across the kiln build pipeline.
//!
//! This crate provides the content hash type used for change detection and
//! cache identity throughout the toolchain.

#![warn(missing_docs)]

pub mod hash;

pub use hash::{ContentHash, ParseHashError};
