//! # Foreman Recurrence
//!
//! A recurring work-generation engine for maintenance management: converts
//! declarative scheduling rules into concrete, dated work instances
//! (inspections, preventive work orders) without ever duplicating or losing
//! an occurrence.
//!
//! ## Core Problem Solved
//!
//! Maintenance schedules mix timing semantics that do not compose naturally:
//!
//! - **Fixed calendar**: every 2nd week on Monday and Thursday, the 31st of
//!   every month (clamped for short months)
//! - **Rolling after completion**: 90 days after the last time the work was
//!   actually finished
//! - **Usage thresholds**: every 250 engine hours, driven by meter readings
//! - **Event triggers**: a breakdown report or sensor alarm demands an
//!   inspection now
//!
//! One engine reconciles all four, stays idempotent under repeated or
//! concurrent invocation, and respects per-target open-work limits.
//!
//! ## Key Features
//!
//! - **Single recurrence calculator**: pure date arithmetic dispatched over a
//!   tagged `FrequencyMode` union, so edge-case policy lives in one place
//! - **Recurrence keys**: deterministic occurrence identity; repeats resolve
//!   to duplicates at the data layer instead of relying on locks
//! - **Duplicate guard**: exact-key, capacity, and creation-window checks in
//!   a fixed, contractual order
//! - **Partial-failure isolation**: one bad target never aborts the rest of
//!   a rule's targets
//! - **Injected backends**: every store and directory is a trait; in-memory
//!   backends for development, schema-only Postgres adapters for deployment
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use foreman_recurrence::builders::build_engine;
//! use foreman_recurrence::config::EngineConfig;
//!
//! let engine = build_engine(
//!     &EngineConfig::default(),
//!     rules,        // Arc<dyn RuleStore>
//!     templates,    // Arc<dyn TemplateStore>
//!     targets,      // Arc<dyn TargetDirectory>
//!     assignments,  // Arc<dyn AssignmentDirectory>
//! )?;
//!
//! let report = engine.run_tick(None).await;
//! println!("generated {} instances", report.generated);
//! ```
//!
//! For complete examples, see:
//! - `tests/generation_loop_test.rs` - Full integration tests
//! - `README.md` - Comprehensive documentation

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core domain model and generation algorithms.
pub mod core;
/// Configuration models for the engine and its backends.
pub mod config;
/// Builders to construct the engine from configuration.
pub mod builders;
/// Infrastructure adapters for stores and directories.
pub mod infra;
/// Runtime adapters for driving periodic generation.
pub mod runtime;
/// Shared utilities.
pub mod util;
