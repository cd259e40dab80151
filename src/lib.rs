//! baseline-gate - web feature readiness gate
//!
//! Detects modern web platform features in CSS, JavaScript and
//! TypeScript sources, resolves the minimum browser versions each one
//! needs (compatibility dataset first, curated fallback second), and
//! scores how much of a site's real traffic can use it.

pub mod cli;
pub mod compat;
pub mod config;
pub mod detectors;
pub mod models;
pub mod pipeline;
pub mod readiness;
pub mod registry;
pub mod reporters;
pub mod traffic;
