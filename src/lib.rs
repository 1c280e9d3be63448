//! # quizlearn-algo - Adaptive quiz learning core algorithms
//!
//! This crate provides the pure-Rust engine behind an adaptive quiz
//! application:
//!
//! - **Knowledge Tracer** - Bayesian knowledge tracing over right/wrong
//!   observations, with exposure damping and streak-aware slip adjustment
//! - **Individualized Tracer** - per-learner re-estimation of the tracer
//!   parameters from a bounded rolling performance history
//! - **Question Scheduler** - next-question selection blending knowledge
//!   gaps, spaced repetition, and error remediation
//!
//! ## Design
//!
//! - **Pure** - no I/O, no clocks, no hidden state; every function computes
//!   a transition over caller-owned state records
//! - **Deterministic** - the random source for selection is injected, so
//!   schedules replay exactly under a seeded generator
//! - **Persistence-agnostic** - state records derive `Serialize`/
//!   `Deserialize`; the enclosing application owns storage and transactions
//! - **Bounded cost** - history scans are capped, appends are O(1)
//!
//! ## Module structure
//!
//! - [`tracer`] - base Bayesian knowledge tracer
//! - [`tracer::individualized`] - self-calibrating layer over the base tracer
//! - [`scheduler`] - question scheduling and weighted selection
//! - [`sanitize`] - numerical stability and state hygiene
//! - [`config`] - parameter records, defaults, validation
//! - [`types`] - shared state records and constants
//!
//! ## Usage example
//!
//! ```rust
//! use quizlearn_algo::{tracer, scheduler, KnowledgeState, SchedulerState};
//! use quizlearn_algo::{SchedulerConfig, TracerParams};
//!
//! // One knowledge state per (learner, skill); one scheduler per learner.
//! let mut knowledge = KnowledgeState::new(TracerParams::default());
//! let mut schedule = SchedulerState::new();
//! let config = SchedulerConfig::default();
//!
//! // The learner answers question "q1" correctly.
//! let mastery = tracer::individualized::update(&mut knowledge, true);
//! let adjusted = scheduler::register_attempt(&mut schedule, &config, "q1", true, mastery);
//! knowledge.mastery = adjusted;
//!
//! // Pick what to ask next.
//! let pool = vec!["q1".to_string(), "q2".to_string(), "q3".to_string()];
//! let mut rng = scheduler::seeded_rng(42);
//! let next = scheduler::select_next(&schedule, &config, &pool, &mut rng);
//! assert!(next.is_some());
//! ```

// ============================================================================
// Module declarations
// ============================================================================

pub mod config;
pub mod sanitize;
pub mod scheduler;
pub mod tracer;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

/// Re-export all shared state records and constants
pub use types::*;

/// Re-export the configuration records
pub use config::{AdaptivityConfig, ConfigError, SchedulerConfig, TracerParams};
