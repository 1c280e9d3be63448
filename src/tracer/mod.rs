//! Bayesian Knowledge Tracer
//!
//! Core theory:
//! - Based on Bayesian Knowledge Tracing (BKT): a two-state hidden Markov
//!   model where a learner either knows or does not know a skill
//! - Each observed answer updates the mastery probability by Bayes' rule
//!   over the slip/guess observation model
//! - Exposure alone (seeing a question) contributes a small transit gain,
//!   damped so that no single opportunity dominates
//!
//! Mathematical formulas:
//! - Correct:   P' = P(1-s) / (P(1-s) + (1-P)g)
//! - Incorrect: P' = Ps / (Ps + (1-P)(1-g)w), w > 1 weighting misses
//! - Damping:   P_next = P + (P' - P) * 0.6
//!   - s: slip probability (raised by a streak-dependent adjustment)
//!   - g: guess probability
//!
//! References:
//! - Corbett, A. T., & Anderson, J. R. (1995). Knowledge tracing: Modeling
//!   the acquisition of procedural knowledge.
//! - Yudelson, M. V., Koedinger, K. R., & Gordon, G. J. (2013).
//!   Individualized Bayesian knowledge tracing models.

pub mod individualized;

use rayon::prelude::*;

use crate::config::TracerParams;
use crate::sanitize::clamp_unit;
use crate::types::{KnowledgeState, MasteryEvaluation, MASTERY_THRESHOLD};

// ==================== Constants ====================

/// Global damping applied to the exposure-only learning rate
const EXPOSURE_DAMPING: f64 = 0.05;

/// Damping applied to the posterior swing of every single observation
const POSTERIOR_DAMPING: f64 = 0.6;

/// Evidence weighting of an incorrect answer in the posterior denominator
const MISS_EVIDENCE_WEIGHT: f64 = 1.6;

/// Mastery band edges for the piecewise exposure rate
const LOW_MASTERY_BAND: f64 = 0.3;
const MID_MASTERY_BAND: f64 = 0.6;

/// Streak length beyond which sustained correctness earns a rate bonus
const STREAK_BONUS_START: u32 = 3;

// ==================== Exposure prediction ====================

/// Estimate the mastery gained from one more exposure, before any outcome
/// is observed. Pure function of the state; nothing is mutated.
pub fn predict(state: &KnowledgeState) -> f64 {
    predict_with_params(state.mastery, state.consecutive_correct, &state.params)
}

/// Exposure prediction with explicit parameters.
///
/// The base rate follows a three-band piecewise curve over mastery: early
/// learners absorb close to the full transit rate, mid-range learners a
/// reduced one, and near-mastery the rate decays to a small floor so the
/// estimate approaches 1.0 asymptotically.
pub fn predict_with_params(mastery: f64, streak: u32, params: &TracerParams) -> f64 {
    let base_rate = if mastery < LOW_MASTERY_BAND {
        params.p_transit * 0.9
    } else if mastery < MID_MASTERY_BAND {
        params.p_transit * 0.6
    } else {
        let knowledge_factor = 1.0 - mastery;
        let log_factor = -0.15 * (knowledge_factor + 0.1).log10().max(0.1);
        // Floored so the rate never collapses entirely at high mastery
        (params.p_transit * log_factor).max(params.p_transit * 0.03)
    };

    let mut adjusted_rate = base_rate * EXPOSURE_DAMPING;
    if streak > STREAK_BONUS_START {
        let bonus = ((streak - STREAK_BONUS_START) as f64 * 0.04).min(0.2);
        adjusted_rate *= 1.0 + bonus;
    }

    clamp_unit(mastery + (1.0 - mastery) * adjusted_rate)
}

// ==================== Observation update ====================

/// Update the mastery estimate from one observed answer.
///
/// Advances the consecutive-correct streak first, then applies the damped
/// Bayesian posterior. Returns the new mastery, which is also stored back
/// into the state.
pub fn update(state: &mut KnowledgeState, is_correct: bool) -> f64 {
    advance_streak(state, is_correct);
    let mastery = posterior_update(
        state.mastery,
        is_correct,
        state.consecutive_correct,
        &state.params,
    );
    state.mastery = mastery;
    mastery
}

/// Advance the streak counter: increment on correct, reset on incorrect.
pub(crate) fn advance_streak(state: &mut KnowledgeState, is_correct: bool) {
    if is_correct {
        state.consecutive_correct += 1;
    } else {
        state.consecutive_correct = 0;
    }
}

/// Damped Bayesian posterior over one observation. `streak` is the already
/// advanced consecutive-correct count.
pub(crate) fn posterior_update(
    mastery: f64,
    is_correct: bool,
    streak: u32,
    params: &TracerParams,
) -> f64 {
    // Exposure-only estimate; the posterior below starts from the observed
    // pre-exposure mastery.
    let _exposure = predict_with_params(mastery, streak, params);

    let (numerator, denominator) = if is_correct {
        let effective_slip = params.p_slip + slip_adjustment(mastery, streak);
        let numerator = mastery * (1.0 - effective_slip);
        (
            numerator,
            numerator + (1.0 - mastery) * params.p_guess,
        )
    } else {
        let numerator = mastery * params.p_slip;
        (
            numerator,
            numerator + (1.0 - mastery) * (1.0 - params.p_guess) * MISS_EVIDENCE_WEIGHT,
        )
    };

    let posterior = if denominator == 0.0 {
        mastery
    } else {
        numerator / denominator
    };

    clamp_unit(mastery + (posterior - mastery) * POSTERIOR_DAMPING)
}

/// Streak-dependent slip raise applied to correct answers.
///
/// Short streaks at low mastery are treated as potentially lucky, so the
/// slip probability is raised and the posterior gain tempered; long streaks
/// earn their way back down.
fn slip_adjustment(mastery: f64, streak: u32) -> f64 {
    if mastery < 0.5 {
        if streak > 3 {
            (0.02 * (streak - 3) as f64).min(0.18)
        } else {
            0.20
        }
    } else if streak > 5 {
        (0.02 * (streak - 5) as f64).min(0.25)
    } else {
        0.25
    }
}

// ==================== Queries ====================

/// Whether the mastery estimate clears the default threshold.
pub fn is_mastered(mastery: f64) -> bool {
    is_mastered_with_threshold(mastery, MASTERY_THRESHOLD)
}

/// Whether the mastery estimate clears an explicit threshold.
pub fn is_mastered_with_threshold(mastery: f64, threshold: f64) -> bool {
    mastery >= threshold
}

/// Reset the consecutive-correct streak.
pub fn reset_streak(state: &mut KnowledgeState) {
    state.consecutive_correct = 0;
}

// ==================== Batch evaluation ====================

/// Evaluate many independent knowledge states in parallel.
///
/// Intended for bulk queries over a learner's skills (or many learners);
/// each state is read-only and evaluated independently.
pub fn batch_evaluate(states: &[KnowledgeState]) -> Vec<MasteryEvaluation> {
    states
        .par_iter()
        .map(|state| MasteryEvaluation {
            predicted_mastery: predict(state),
            is_mastered: is_mastered(state.mastery),
        })
        .collect()
}

// ==================== Unit Tests ====================
