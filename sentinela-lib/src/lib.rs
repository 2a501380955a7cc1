#![forbid(unsafe_code)]

//! sentinela-lib: core detection and alerting pipeline for Sentinela.
//!
//! This library provides the pieces shared by all Sentinela components:
//! - Core data models for alerts and process snapshots
//! - The heuristic process classifier and its run-scoped dedup cache
//! - The process monitor polling loop
//! - The rule engine contract and the bundled signature engine
//! - The static file scanner
//! - Alert storage backed by redb
//! - Configuration management with environment overrides

pub mod classifier;
pub mod collection;
pub mod config;
pub mod dedup;
pub mod models;
pub mod monitor;
pub mod rules;
pub mod scanner;
pub mod storage;
