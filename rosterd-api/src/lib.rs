//! # rosterd API Server Library
//!
//! This library provides the core functionality for the rosterd API server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `policy`: Per-action authorization decisions
//! - `schemas`: Request/response representations
//! - `validation`: Pre-persistence validation pipeline
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod policy;
pub mod routes;
pub mod schemas;
pub mod validation;
