//! Data Sanitization
//!
//! Numerical stability utilities.
//!
//! Functions:
//! - Unit-interval clamping used on every mastery output path
//! - Guarded division for rate computations
//! - Repair of state records reconstructed from storage

use crate::types::{KnowledgeState, SchedulerState, MAX_PERFORMANCE_HISTORY};

/// Check whether a slice contains invalid values (NaN or Inf).
pub fn has_invalid_values(arr: &[f64]) -> bool {
    arr.iter().any(|&x| x.is_nan() || x.is_infinite())
}

/// Clamp a value to the unit interval, mapping NaN to 0.0.
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(0.0, 1.0)
}

/// Divide with a fallback for zero or non-finite denominators.
pub fn safe_ratio(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return fallback;
    }
    numerator / denominator
}

/// Repair a knowledge state reconstructed from storage.
///
/// Clamps probabilities into their legal bands, drops history overflow past
/// the retention cap, and restores counter consistency. Call before handing
/// a loaded record to the tracer.
pub fn sanitize_knowledge_state(state: &mut KnowledgeState) {
    state.mastery = clamp_unit(state.mastery);

    state.params.p_init = clamp_unit(state.params.p_init);
    state.params.p_transit = clamp_unit(state.params.p_transit);
    state.params.p_slip = clamp_unit(state.params.p_slip);
    state.params.p_guess = clamp_unit(state.params.p_guess);
    state.params.p_lapse = clamp_unit(state.params.p_lapse);

    while state.performance_history.len() > MAX_PERFORMANCE_HISTORY {
        state.performance_history.pop_front();
    }

    // Counters keep counting after the history overflows, so the history can
    // be shorter but never longer than the totals.
    if (state.total_attempts as usize) < state.performance_history.len() {
        state.total_attempts = state.performance_history.len() as u32;
    }
    if state.correct_attempts > state.total_attempts {
        state.correct_attempts = state.total_attempts;
    }

    for value in [
        &mut state.metrics.consistency_score,
        &mut state.metrics.error_recovery,
    ] {
        *value = clamp_unit(*value);
    }
    if !state.metrics.improvement_rate.is_finite() {
        state.metrics.improvement_rate = 0.0;
    }
    for value in [
        &mut state.adjustments.transit,
        &mut state.adjustments.slip,
        &mut state.adjustments.guess,
    ] {
        if !value.is_finite() {
            *value = 0.0;
        }
    }
}

/// Repair a scheduler state reconstructed from storage.
///
/// Restores ordering consistency between the global counter and per-question
/// records, and clamps recorded knowledge values.
pub fn sanitize_scheduler_state(state: &mut SchedulerState) {
    let mut max_sequence = state.attempt_counter;

    for question in state.questions.values_mut() {
        for record in question.history.iter_mut() {
            record.knowledge = clamp_unit(record.knowledge);
            max_sequence = max_sequence.max(record.sequence);
        }
        if let Some(last) = question.history.last() {
            question.last_seen = last.sequence;
            if !last.correct {
                question.correct_streak = 0;
            }
        } else {
            question.last_seen = 0;
            question.correct_streak = 0;
        }
        max_sequence = max_sequence.max(question.last_seen);
    }

    // The counter orders all attempts, so it can never trail a recorded
    // sequence number.
    state.attempt_counter = max_sequence;
}
