//! Individualized Knowledge Tracing
//!
//! Self-calibration layer over the base tracer. Instead of fitting one
//! parameter set per skill for the whole population, each learner's rolling
//! performance history re-estimates the effective transit, slip, and guess
//! probabilities:
//!
//! - Consistency: streaky learners get credit for stable behavior
//! - Improvement: rising accuracy across the recent window raises transit
//! - Error recovery: bouncing back right after a miss lowers the weight
//!   given to lucky guesses
//!
//! Adjustments are small bounded deltas on top of the fixed base parameters.
//! Nothing here mutates the base parameters themselves; the effective set is
//! derived on demand.

use crate::config::TracerParams;
use crate::sanitize::{clamp_unit, safe_ratio};
use crate::tracer;
use crate::types::{KnowledgeState, MAX_PERFORMANCE_HISTORY};

// ==================== Constants ====================

/// Bounds on the raw parameter deltas
const MAX_TRANSIT_ADJUSTMENT: f64 = 0.05;
const MAX_SLIP_ADJUSTMENT: f64 = 0.05;
const MAX_GUESS_ADJUSTMENT: f64 = 0.03;

/// Legal bands for the effective parameters
const TRANSIT_RANGE: (f64, f64) = (0.05, 0.3);
const SLIP_RANGE: (f64, f64) = (0.10, 0.3);
const GUESS_RANGE: (f64, f64) = (0.03, 0.15);

/// Minimum history per metric
const CONSISTENCY_WINDOW: usize = 8;
const IMPROVEMENT_WINDOW: usize = 12;
const RECOVERY_MIN_HISTORY: usize = 6;

/// Streak length at which sustained correctness starts shaping results
const SHAPING_STREAK: u32 = 5;

// ==================== Observation recording ====================

/// Append one outcome to the bounded performance history and advance the
/// inception counters.
pub fn record_observation(state: &mut KnowledgeState, is_correct: bool) {
    state.performance_history.push_back(is_correct);
    while state.performance_history.len() > MAX_PERFORMANCE_HISTORY {
        state.performance_history.pop_front();
    }
    state.total_attempts += 1;
    if is_correct {
        state.correct_attempts += 1;
    }
}

// ==================== Behavioral metrics ====================

/// Recompute the derived metrics once enough history has accumulated.
/// Below the adaptivity threshold (and below each metric's own window) the
/// previous values are retained.
pub fn recompute_metrics(state: &mut KnowledgeState) {
    let history = &state.performance_history;
    if history.len() < state.adaptivity.adaptivity_threshold as usize {
        return;
    }

    if history.len() >= CONSISTENCY_WINDOW {
        let recent: Vec<bool> = history
            .iter()
            .skip(history.len() - CONSISTENCY_WINDOW)
            .copied()
            .collect();
        let equal_pairs = recent
            .windows(2)
            .filter(|pair| pair[0] == pair[1])
            .count();
        state.metrics.consistency_score = equal_pairs as f64 / (recent.len() - 1) as f64;
    }

    if history.len() >= IMPROVEMENT_WINDOW {
        let newest = outcome_mean(history.iter().skip(history.len() - 6));
        let older = outcome_mean(
            history
                .iter()
                .skip(history.len() - IMPROVEMENT_WINDOW)
                .take(6),
        );
        state.metrics.improvement_rate = newest - older;
    }

    if history.len() >= RECOVERY_MIN_HISTORY {
        let mut post_error = 0u32;
        let mut recovered = 0u32;
        let mut previous: Option<bool> = None;
        for &outcome in history.iter() {
            if previous == Some(false) {
                post_error += 1;
                if outcome {
                    recovered += 1;
                }
            }
            previous = Some(outcome);
        }
        state.metrics.error_recovery = if post_error == 0 {
            0.5
        } else {
            recovered as f64 / post_error as f64
        };
    }
}

fn outcome_mean<'a>(iter: impl Iterator<Item = &'a bool>) -> f64 {
    let mut count = 0u32;
    let mut sum = 0u32;
    for &outcome in iter {
        count += 1;
        if outcome {
            sum += 1;
        }
    }
    safe_ratio(sum as f64, count as f64, 0.0)
}

// ==================== Parameter adaptation ====================

/// Recompute the raw parameter adjustments from the current metrics.
/// No-op until the learner has accumulated enough total attempts.
pub fn adapt_parameters(state: &mut KnowledgeState) {
    if state.total_attempts < state.adaptivity.adaptivity_threshold {
        return;
    }

    recompute_metrics(state);

    let correctness_rate = state.correctness_rate();
    let rate = state.adaptivity.adaptation_rate;
    let metrics = state.metrics;

    state.adjustments.transit =
        rate * ((metrics.improvement_rate * 1.5 + metrics.consistency_score) / 3.0) * 0.8;
    state.adjustments.slip =
        -rate * (1.0 - (metrics.consistency_score * 0.7 + correctness_rate * 0.3)) * 0.7;
    state.adjustments.guess = rate * (metrics.error_recovery - 0.5);

    tracing::trace!(
        transit = state.adjustments.transit,
        slip = state.adjustments.slip,
        guess = state.adjustments.guess,
        total_attempts = state.total_attempts,
        "re-adapted tracer parameters"
    );
}

/// Derive the effective parameter set: clamp the raw deltas, apply them to
/// the base parameters, and clamp the results into their legal bands.
pub fn individualized_params(state: &KnowledgeState) -> TracerParams {
    let transit_adj = state
        .adjustments
        .transit
        .clamp(-MAX_TRANSIT_ADJUSTMENT, MAX_TRANSIT_ADJUSTMENT);
    let slip_adj = state
        .adjustments
        .slip
        .clamp(-MAX_SLIP_ADJUSTMENT, MAX_SLIP_ADJUSTMENT);
    let guess_adj = state
        .adjustments
        .guess
        .clamp(-MAX_GUESS_ADJUSTMENT, MAX_GUESS_ADJUSTMENT);

    TracerParams {
        p_transit: (state.params.p_transit + transit_adj).clamp(TRANSIT_RANGE.0, TRANSIT_RANGE.1),
        p_slip: (state.params.p_slip + slip_adj).clamp(SLIP_RANGE.0, SLIP_RANGE.1),
        p_guess: (state.params.p_guess + guess_adj).clamp(GUESS_RANGE.0, GUESS_RANGE.1),
        ..state.params
    }
}

// ==================== Prediction and update ====================

/// Exposure prediction under the individualized transit rate, with a small
/// bonus for sustained streaks. Pure; no parameters are persistently
/// substituted.
pub fn predict(state: &KnowledgeState) -> f64 {
    let effective = individualized_params(state);
    let params = TracerParams {
        p_transit: effective.p_transit,
        ..state.params
    };

    let mut predicted =
        tracer::predict_with_params(state.mastery, state.consecutive_correct, &params);

    if state.consecutive_correct >= SHAPING_STREAK {
        let bonus = (0.01 * (state.consecutive_correct - SHAPING_STREAK) as f64).min(0.05);
        predicted = (predicted + bonus).min(1.0);
    }

    predicted
}

/// Update the mastery estimate from one observed answer, re-calibrating the
/// learner's parameters first.
///
/// Records the observation, re-adapts, advances the streak, applies the base
/// posterior under the individualized parameters, then shapes the resulting
/// delta: early gains are damped, sustained-streak gains amplified, and
/// penalties weighted up. The base parameters in the state are untouched.
pub fn update(state: &mut KnowledgeState, is_correct: bool) -> f64 {
    record_observation(state, is_correct);
    adapt_parameters(state);
    tracer::advance_streak(state, is_correct);

    let effective = individualized_params(state);
    let streak = state.consecutive_correct;
    let raw = tracer::posterior_update(state.mastery, is_correct, streak, &effective);
    let delta = raw - state.mastery;

    let shaped = if is_correct {
        if streak >= SHAPING_STREAK {
            delta * (1.0 + ((streak - SHAPING_STREAK) as f64 * 0.03).min(0.15))
        } else {
            delta * 0.7
        }
    } else {
        delta * 1.3
    };

    let mastery = clamp_unit(state.mastery + shaped);
    state.mastery = mastery;
    mastery
}

// ==================== Unit Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamAdjustments;

    fn state_with_history(outcomes: &[bool]) -> KnowledgeState {
        let mut state = KnowledgeState::default();
        for &outcome in outcomes {
            record_observation(&mut state, outcome);
        }
        state
    }

    #[test]
    fn test_history_is_bounded_counters_are_not() {
        let mut state = KnowledgeState::default();
        for i in 0..150 {
            record_observation(&mut state, i % 2 == 0);
        }
        assert_eq!(state.performance_history.len(), MAX_PERFORMANCE_HISTORY);
        assert_eq!(state.total_attempts, 150);
        assert_eq!(state.correct_attempts, 75);
    }

    #[test]
    fn test_no_adaptation_below_threshold() {
        let mut state = KnowledgeState::default();
        for _ in 0..5 {
            update(&mut state, true);
        }
        assert_eq!(state.adjustments, ParamAdjustments::default());
        assert_eq!(state.metrics.consistency_score, 0.0);
    }

    #[test]
    fn test_adaptation_kicks_in_at_threshold() {
        let mut state = KnowledgeState::default();
        let outcomes = [true, false, true, true, false, true];
        for &outcome in outcomes.iter().cycle().take(12) {
            update(&mut state, outcome);
        }
        assert_eq!(state.total_attempts, 12);
        assert_ne!(state.adjustments, ParamAdjustments::default());
    }

    #[test]
    fn test_consistency_of_uniform_history() {
        let mut state = state_with_history(&[true; 12]);
        recompute_metrics(&mut state);
        assert_eq!(state.metrics.consistency_score, 1.0);
        // No post-error positions: recovery falls back to the neutral 0.5.
        assert_eq!(state.metrics.error_recovery, 0.5);
        assert_eq!(state.metrics.improvement_rate, 0.0);
    }

    #[test]
    fn test_consistency_of_alternating_history() {
        let outcomes: Vec<bool> = (0..12).map(|i| i % 2 == 0).collect();
        let mut state = state_with_history(&outcomes);
        recompute_metrics(&mut state);
        assert_eq!(state.metrics.consistency_score, 0.0);
        // Every answer after a miss is correct.
        assert_eq!(state.metrics.error_recovery, 1.0);
    }

    #[test]
    fn test_improvement_rate_of_turnaround_history() {
        let outcomes = [
            false, false, false, false, false, false, true, true, true, true, true, true,
        ];
        let mut state = state_with_history(&outcomes);
        recompute_metrics(&mut state);
        assert!((state.metrics.improvement_rate - 1.0).abs() < 1e-12);
        // Last 8 entries are FFTTTTTT: six of seven adjacent pairs agree.
        assert!((state.metrics.consistency_score - 6.0 / 7.0).abs() < 1e-12);
        // Of the six answers following a miss, only the first correct one.
        assert!((state.metrics.error_recovery - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_metrics_retained_below_threshold() {
        let mut state = state_with_history(&[true, false, true]);
        state.metrics.consistency_score = 0.77;
        recompute_metrics(&mut state);
        assert_eq!(state.metrics.consistency_score, 0.77);
    }

    #[test]
    fn test_individualized_params_stay_in_bands() {
        let mut state = KnowledgeState::default();
        state.adjustments = ParamAdjustments {
            transit: 9.0,
            slip: -9.0,
            guess: 9.0,
        };
        let params = individualized_params(&state);
        assert!(params.p_transit >= 0.05 && params.p_transit <= 0.3);
        assert!(params.p_slip >= 0.10 && params.p_slip <= 0.3);
        assert!(params.p_guess >= 0.03 && params.p_guess <= 0.15);
        // Deltas are clamped before application.
        assert!((params.p_transit - (0.12 + 0.05)).abs() < 1e-12);
        assert!((params.p_guess - (0.08 + 0.03)).abs() < 1e-12);
    }

    #[test]
    fn test_zero_adjustments_reproduce_base_params() {
        let state = KnowledgeState::default();
        let params = individualized_params(&state);
        assert_eq!(params, state.params);
    }

    #[test]
    fn test_early_gains_are_damped_against_base_update() {
        let mut base_state = KnowledgeState::default();
        let mut indiv_state = KnowledgeState::default();

        let base_result = tracer::update(&mut base_state, true);
        let indiv_result = update(&mut indiv_state, true);

        let start = TracerParams::default().p_init;
        assert!(indiv_result > start, "a correct answer still gains");
        assert!(
            indiv_result < base_result,
            "early gain {indiv_result} should trail base gain {base_result}"
        );
    }

    #[test]
    fn test_penalties_are_amplified_against_base_update() {
        let mut base_state = KnowledgeState::default();
        base_state.mastery = 0.6;
        let mut indiv_state = base_state.clone();

        let base_result = tracer::update(&mut base_state, false);
        let indiv_result = update(&mut indiv_state, false);

        assert!(indiv_result < base_result, "penalty should be amplified");
    }

    #[test]
    fn test_sustained_streak_amplifies_gains() {
        let mut state = KnowledgeState::default();
        for _ in 0..6 {
            update(&mut state, true);
        }
        let before = state.mastery;
        let delta_streak = update(&mut state, true) - before;

        let mut fresh = KnowledgeState::default();
        fresh.mastery = before;
        let delta_fresh = update(&mut fresh, true) - before;

        assert!(
            delta_streak > delta_fresh,
            "streak delta {delta_streak} should beat fresh delta {delta_fresh}"
        );
    }

    #[test]
    fn test_predict_streak_bonus() {
        let mut state = KnowledgeState::default();
        state.mastery = 0.4;
        let base_prediction = predict(&state);

        state.consecutive_correct = 9;
        let boosted = predict(&state);
        assert!(boosted > base_prediction);
        assert!(boosted <= 1.0);
    }

    #[test]
    fn test_update_stays_in_unit_interval() {
        let mut state = KnowledgeState::default();
        let outcomes = [true, false, false, true, true, true, false, true];
        for (i, &outcome) in outcomes.iter().cycle().take(300).enumerate() {
            let result = update(&mut state, outcome);
            assert!(
                (0.0..=1.0).contains(&result),
                "step {i}: mastery {result} out of range"
            );
        }
    }

    #[test]
    fn test_base_params_never_mutated() {
        let mut state = KnowledgeState::default();
        let original = state.params;
        for i in 0..40 {
            update(&mut state, i % 3 != 0);
        }
        assert_eq!(state.params, original);
    }
}
