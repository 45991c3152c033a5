//! Prompt-to-animation pipeline service
//!
//! This library provides the core functionality for animagen: a natural-
//! language prompt is accepted over HTTP, and a four-stage background
//! pipeline (plan → generate code → validate → render) produces a playable
//! video reference while callers poll the job record for progress.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
