//! # rosterd Shared Library
//!
//! This crate contains shared types, utilities, and business logic used by
//! the rosterd API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Password hashing and JWT utilities
//! - `db`: Connection pooling and migrations
//! - `media`: Avatar file storage and image normalization

pub mod auth;
pub mod db;
pub mod media;
pub mod models;

/// Current version of the rosterd shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
