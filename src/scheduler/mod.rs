//! Question Scheduler
//!
//! Selects the next question for a learner from an available pool using a
//! priority score that blends:
//!
//! - Knowledge gap: items the learner knows least are worth more
//! - Spacing: items resurface after an ideal gap that grows geometrically
//!   with the correct streak (expanding retrieval practice)
//! - Error remediation: recently-missed items ramp back quickly
//!
//! Core principles:
//! - Unseen items always carry the maximal raw weight
//! - Priorities are normalized into a distribution over the candidate pool
//!   and one item is drawn by weighted random sampling
//! - The random source is injected by the caller, so selection is fully
//!   deterministic under a seeded generator
//!
//! References:
//! - Landauer, T. K., & Bjork, R. A. (1978). Optimum rehearsal patterns and
//!   name learning.

use std::collections::HashMap;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::SchedulerConfig;
use crate::sanitize::{clamp_unit, safe_ratio};
use crate::types::{AttemptRecord, QuestionStats, SchedulerState};

// ==================== Constants ====================

/// Raw weight of a never-presented question
const UNSEEN_WEIGHT: f64 = 1.0;

/// Floor under every seen question's raw priority
const MIN_PRIORITY: f64 = 0.05;

/// Blend weights of the knowledge-gap and spacing terms
const KNOWLEDGE_GAP_WEIGHT: f64 = 0.3;
const TIME_WEIGHT: f64 = 0.7;

/// Steepness and midpoint of the logistic spacing ramp
const SPACING_SIGMOID_GAIN: f64 = 5.0;
const SPACING_SIGMOID_MIDPOINT: f64 = 0.8;

/// Streak length at which the ideal spacing stops growing
const MAX_SPACING_STREAK: u32 = 5;

/// Mastery never regresses below this floor
const REGRESSION_FLOOR: f64 = 0.1;

/// Deterministic generator for selection, mirroring the seedable samplers
/// used elsewhere in the stack. Callers that want reproducible schedules
/// construct one per learner session.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

// ==================== Attempt registration ====================

/// Register one answered attempt against a question.
///
/// Increments the learner-global attempt counter, creates the question
/// state on first sight, updates the per-question streak, and appends the
/// attempt record. When a previously-correct question is missed, the
/// returned mastery is regressed by `knowledge_penalty` against the
/// knowledge recorded at the previous attempt; the caller persists the
/// returned value.
pub fn register_attempt(
    state: &mut SchedulerState,
    config: &SchedulerConfig,
    question_id: &str,
    is_correct: bool,
    mastery: f64,
) -> f64 {
    state.attempt_counter += 1;
    let sequence = state.attempt_counter;

    let question = state.questions.entry(question_id.to_string()).or_default();
    let previous = question.history.last().copied();

    if is_correct {
        question.correct_streak += 1;
    } else {
        question.correct_streak = 0;
    }

    let mut adjusted = clamp_unit(mastery);
    if let Some(prev) = previous {
        if prev.correct && !is_correct {
            adjusted = (adjusted - config.knowledge_penalty * prev.knowledge).max(REGRESSION_FLOOR);
            tracing::debug!(
                question_id,
                previous_knowledge = prev.knowledge,
                adjusted,
                "missed a previously-correct question, regressing mastery"
            );
        }
    }

    question.history.push(AttemptRecord {
        sequence,
        correct: is_correct,
        knowledge: adjusted,
    });
    question.last_seen = sequence;

    adjusted
}

// ==================== Priority scoring ====================

/// Raw (un-normalized) priority per candidate, in candidate order.
fn raw_priorities(
    state: &SchedulerState,
    config: &SchedulerConfig,
    candidates: &[String],
) -> Vec<f64> {
    candidates
        .iter()
        .map(|id| {
            let question = match state.questions.get(id) {
                Some(q) => q,
                None => return UNSEEN_WEIGHT,
            };
            let last = match question.history.last() {
                Some(record) => record,
                None => return UNSEEN_WEIGHT,
            };

            let knowledge_gap = 1.0 - last.knowledge;
            let elapsed = state.attempt_counter.saturating_sub(question.last_seen) as f64;

            let time_priority = if question.correct_streak > 0 {
                let capped = question.correct_streak.min(MAX_SPACING_STREAK);
                let ideal_spacing = config.spacing_factor.powi(capped as i32);
                let time_factor = elapsed / ideal_spacing;
                sigmoid(SPACING_SIGMOID_GAIN * (time_factor - SPACING_SIGMOID_MIDPOINT))
            } else {
                let ideal_spacing = (5.0 - question.correct_streak as f64).max(2.0);
                (elapsed / ideal_spacing * config.error_priority).min(1.0)
            };

            let mut priority =
                KNOWLEDGE_GAP_WEIGHT * knowledge_gap + TIME_WEIGHT * time_priority;
            if !last.correct {
                priority *= config.error_priority;
            }
            priority.max(MIN_PRIORITY)
        })
        .collect()
}

/// Selection probabilities over a candidate pool, normalized to sum to 1.
///
/// Unseen questions carry the maximal raw weight; seen questions blend the
/// knowledge gap with the spacing ramp and the error-remediation factor.
pub fn selection_probabilities(
    state: &SchedulerState,
    config: &SchedulerConfig,
    candidates: &[String],
) -> HashMap<String, f64> {
    let raw = raw_priorities(state, config, candidates);
    let total: f64 = raw.iter().sum();
    candidates
        .iter()
        .zip(raw)
        .map(|(id, weight)| (id.clone(), weight / total))
        .collect()
}

// ==================== Selection ====================

/// Draw the next question from the candidate pool.
///
/// Returns `None` on an empty pool and the sole id directly when only one
/// candidate is available; otherwise performs one weighted draw over the
/// normalized priorities, in candidate order.
pub fn select_next<R: Rng + ?Sized>(
    state: &SchedulerState,
    config: &SchedulerConfig,
    candidates: &[String],
    rng: &mut R,
) -> Option<String> {
    if candidates.is_empty() {
        tracing::trace!("selection requested over an empty candidate pool");
        return None;
    }
    if candidates.len() == 1 {
        return Some(candidates[0].clone());
    }

    let raw = raw_priorities(state, config, candidates);
    let total: f64 = raw.iter().sum();
    let draw = rng.gen::<f64>() * total;

    let mut cumulative = 0.0;
    for (id, weight) in candidates.iter().zip(&raw) {
        cumulative += weight;
        if draw < cumulative {
            return Some(id.clone());
        }
    }
    candidates.last().cloned()
}

// ==================== Queries ====================

/// Aggregate statistics for one question; zero-valued when unseen.
pub fn stats(state: &SchedulerState, question_id: &str) -> QuestionStats {
    let question = match state.questions.get(question_id) {
        Some(q) => q,
        None => return QuestionStats::default(),
    };

    let attempts = question.history.len() as u32;
    let correct = question.history.iter().filter(|r| r.correct).count() as u32;

    QuestionStats {
        attempts,
        correct,
        correct_rate: safe_ratio(correct as f64, attempts as f64, 0.0),
        last_knowledge: question
            .last_attempt()
            .map(|record| record.knowledge)
            .unwrap_or(0.0),
        streak: question.correct_streak,
        last_seen: question.last_seen,
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

// ==================== Unit Tests ====================
