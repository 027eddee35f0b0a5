//! examscore-core: answer-sheet loading, scoring, and statistics.
//!
//! This crate defines the data model, the tabular loader, the per-question
//! scoring engine, and the session and report types that the export layer
//! and CLI build on.

pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod model;
pub mod report;
pub mod session;
pub mod statistics;
