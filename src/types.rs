//! Common Types and Constants
//!
//! Shared state records used across the tracer and scheduler modules.
//! Every record here is owned by the calling persistence layer: the engine
//! reconstructs nothing on its own and only computes transitions over the
//! fields below.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::config::{AdaptivityConfig, TracerParams};

// ==================== Constants ====================

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-10;

/// Maximum retained performance-history entries per (learner, skill)
pub const MAX_PERFORMANCE_HISTORY: usize = 100;

/// Default mastery threshold
pub const MASTERY_THRESHOLD: f64 = 0.985;

// ==================== Knowledge-tracing state ====================

/// Rolling behavioral metrics derived from the performance history.
///
/// Each value keeps its previous estimate until enough history has
/// accumulated to recompute it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerMetrics {
    /// Fraction of adjacent equal outcomes in the recent history [0, 1]
    pub consistency_score: f64,
    /// Mean of the newest answers minus mean of the ones before [-1, 1]
    pub improvement_rate: f64,
    /// Fraction of answers immediately after an error that were correct [0, 1]
    pub error_recovery: f64,
}

/// Raw per-learner parameter deltas produced by adaptation.
///
/// Stored unclamped; bounds are applied when the effective parameters are
/// derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamAdjustments {
    pub transit: f64,
    pub slip: f64,
    pub guess: f64,
}

/// Knowledge-tracing state for one (learner, skill) pair.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KnowledgeState {
    /// Current mastery estimate, clamped to [0, 1] after every operation
    pub mastery: f64,
    /// Consecutive correct answers; resets to 0 on any incorrect answer
    pub consecutive_correct: u32,
    /// Fixed base parameters, set at creation
    pub params: TracerParams,
    /// Bounded FIFO of recent outcomes (oldest dropped past the cap)
    pub performance_history: VecDeque<bool>,
    /// Attempts since inception (keeps counting after the history overflows)
    pub total_attempts: u32,
    /// Correct attempts since inception
    pub correct_attempts: u32,
    /// Derived behavioral metrics
    pub metrics: LearnerMetrics,
    /// Current raw parameter adjustments
    pub adjustments: ParamAdjustments,
    /// Adaptation settings persisted alongside the state
    pub adaptivity: AdaptivityConfig,
}

impl KnowledgeState {
    /// Create a fresh state for a first learner-skill interaction.
    pub fn new(params: TracerParams) -> Self {
        Self {
            mastery: params.p_init,
            consecutive_correct: 0,
            params,
            performance_history: VecDeque::new(),
            total_attempts: 0,
            correct_attempts: 0,
            metrics: LearnerMetrics::default(),
            adjustments: ParamAdjustments::default(),
            adaptivity: AdaptivityConfig::default(),
        }
    }

    /// Create a fresh state with explicit adaptation settings.
    pub fn with_adaptivity(params: TracerParams, adaptivity: AdaptivityConfig) -> Self {
        Self {
            adaptivity,
            ..Self::new(params)
        }
    }

    /// Overall correctness rate since inception.
    pub fn correctness_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        self.correct_attempts as f64 / self.total_attempts as f64
    }
}

impl Default for KnowledgeState {
    fn default() -> Self {
        Self::new(TracerParams::default())
    }
}

// ==================== Scheduling state ====================

/// One registered attempt against a question.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Value of the learner-global attempt counter when registered
    pub sequence: u64,
    /// Whether the answer was correct
    pub correct: bool,
    /// Mastery recorded at the time (after any regression penalty)
    pub knowledge: f64,
}

/// Scheduling state for one (learner, question) pair.
///
/// `history` is append-only: its length equals the number of attempts ever
/// registered for the question.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QuestionState {
    pub history: Vec<AttemptRecord>,
    /// Consecutive correct answers on this question; resets on incorrect
    pub correct_streak: u32,
    /// Attempt-counter value at the last presentation
    pub last_seen: u64,
}

impl QuestionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent attempt, if any.
    pub fn last_attempt(&self) -> Option<&AttemptRecord> {
        self.history.last()
    }
}

/// Per-learner scheduling state: the global attempt counter plus the
/// per-question records it orders.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SchedulerState {
    /// Increases by 1 on every registered attempt across all questions
    pub attempt_counter: u64,
    /// Question state keyed by question id
    pub questions: HashMap<String, QuestionState>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Aggregate statistics for one question, zero-valued when unseen.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionStats {
    pub attempts: u32,
    pub correct: u32,
    pub correct_rate: f64,
    pub last_knowledge: f64,
    pub streak: u32,
    pub last_seen: u64,
}

// ==================== Batch results ====================

/// Result row of a batch mastery evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MasteryEvaluation {
    /// Exposure-only mastery prediction
    pub predicted_mastery: f64,
    /// Whether the current estimate clears the mastery threshold
    pub is_mastered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_starts_at_p_init() {
        let state = KnowledgeState::default();
        assert!((state.mastery - state.params.p_init).abs() < EPSILON);
        assert_eq!(state.consecutive_correct, 0);
        assert_eq!(state.total_attempts, 0);
        assert!(state.performance_history.is_empty());
    }

    #[test]
    fn test_correctness_rate_guards_zero_attempts() {
        let state = KnowledgeState::default();
        assert_eq!(state.correctness_rate(), 0.0);
    }

    #[test]
    fn test_with_adaptivity_overrides_settings() {
        let adaptivity = AdaptivityConfig {
            adaptivity_threshold: 20,
            ..Default::default()
        };
        let state = KnowledgeState::with_adaptivity(TracerParams::default(), adaptivity);
        assert_eq!(state.adaptivity.adaptivity_threshold, 20);
        assert!((state.mastery - state.params.p_init).abs() < EPSILON);
    }

    #[test]
    fn test_question_state_defaults() {
        let q = QuestionState::new();
        assert!(q.last_attempt().is_none());
        assert_eq!(q.correct_streak, 0);
        assert_eq!(q.last_seen, 0);
    }

    #[test]
    fn test_unseen_stats_are_zero_valued() {
        let stats = QuestionStats::default();
        assert_eq!(stats.attempts, 0);
        assert_eq!(stats.correct_rate, 0.0);
        assert_eq!(stats.last_seen, 0);
    }
}
