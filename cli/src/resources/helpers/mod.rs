//! Shared helpers for resource implementations.
pub mod fs;
pub mod metadata;
