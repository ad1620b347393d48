//! Scoring algebra: running baseline, task scores, credit assignment, and
//! weight updates.
//!
//! Everything here is a pure function over plain values; the store persists
//! the results. The [`Baseline`] is an immutable value object — `observe`
//! returns a new baseline rather than mutating in place — serialized to JSON
//! under the `baseline` key of the `meta` table.

use serde::{Deserialize, Serialize};

/// Weight floor and ceiling enforced at every write.
pub const WEIGHT_MIN: f64 = 0.1;
pub const WEIGHT_MAX: f64 = 5.0;

/// Observations needed before task scores switch from the cold-start
/// heuristic to z-scores.
pub const COLD_START_COUNT: u64 = 10;

/// Average tokens per task assumed when no task has finished yet.
pub const DEFAULT_AVG_TOKENS: f64 = 10_000.0;

/// Running mean/variance of task outcome variates, via Welford's online
/// algorithm. One instance covers tokens, errors, and user corrections
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Baseline {
    pub count: u64,
    pub mean_tokens: f64,
    pub mean_errors: f64,
    pub mean_user_corrections: f64,
    pub m2_tokens: f64,
    pub m2_errors: f64,
    pub m2_user_corrections: f64,
}

impl Baseline {
    /// Fold one finished task into the baseline, returning the new value.
    pub fn observe(&self, tokens: f64, errors: f64, user_corrections: f64) -> Baseline {
        let count = self.count + 1;
        let n = count as f64;

        let (mean_tokens, m2_tokens) = welford_step(self.mean_tokens, self.m2_tokens, tokens, n);
        let (mean_errors, m2_errors) = welford_step(self.mean_errors, self.m2_errors, errors, n);
        let (mean_user_corrections, m2_user_corrections) = welford_step(
            self.mean_user_corrections,
            self.m2_user_corrections,
            user_corrections,
            n,
        );

        Baseline {
            count,
            mean_tokens,
            mean_errors,
            mean_user_corrections,
            m2_tokens,
            m2_errors,
            m2_user_corrections,
        }
    }

    pub fn stddev_tokens(&self) -> f64 {
        sample_stddev(self.m2_tokens, self.count)
    }

    pub fn stddev_errors(&self) -> f64 {
        sample_stddev(self.m2_errors, self.count)
    }

    pub fn stddev_user_corrections(&self) -> f64 {
        sample_stddev(self.m2_user_corrections, self.count)
    }
}

fn welford_step(mean: f64, m2: f64, x: f64, n: f64) -> (f64, f64) {
    let delta = x - mean;
    let mean_next = mean + delta / n;
    let m2_next = m2 + delta * (x - mean_next);
    (mean_next, m2_next)
}

/// Sample standard deviation from an M2 accumulator.
///
/// Defined as 1 when fewer than two observations exist (or the variance is
/// exactly zero), so the z-score collapses to the raw delta instead of
/// dividing by zero.
fn sample_stddev(m2: f64, count: u64) -> f64 {
    if count < 2 {
        return 1.0;
    }
    let sd = (m2 / (count - 1) as f64).sqrt();
    if sd > 0.0 {
        sd
    } else {
        1.0
    }
}

/// Outcome counters reported at end-of-task.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskOutcome {
    pub tokens_used: i64,
    pub tool_calls: i64,
    pub errors: i64,
    pub user_corrections: i64,
    pub completed: bool,
}

/// Score a finished task against the baseline. Higher is better.
///
/// Below [`COLD_START_COUNT`] observations the score is a simple normalized
/// delta per variate (both ratio terms zero on an empty baseline); from then
/// on it is a negated z-score sum. Either way completion contributes ±1.
pub fn task_score(baseline: &Baseline, outcome: &TaskOutcome) -> f64 {
    let tokens = outcome.tokens_used as f64;
    let errors = outcome.errors as f64;
    let corrections = outcome.user_corrections as f64;
    let completed_signal = if outcome.completed { 1.0 } else { -1.0 };

    if baseline.count < COLD_START_COUNT {
        let (token_term, error_term) = if baseline.count == 0 {
            (0.0, 0.0)
        } else {
            (
                (baseline.mean_tokens - tokens) / baseline.mean_tokens.max(1.0),
                (baseline.mean_errors - errors) / baseline.mean_errors.max(1.0),
            )
        };
        token_term + error_term - 0.5 * corrections + completed_signal
    } else {
        let z_tokens = (tokens - baseline.mean_tokens) / baseline.stddev_tokens();
        let z_errors = (errors - baseline.mean_errors) / baseline.stddev_errors();
        let z_corrections =
            (corrections - baseline.mean_user_corrections) / baseline.stddev_user_corrections();
        -z_tokens - z_errors - z_corrections + completed_signal
    }
}

/// Credit for one retrieved memory rated `rating` (0-3). `rated` is how many
/// memories received a positive rating in the task; the task score is split
/// between them.
pub fn credit(task_score: f64, rating: u8, rated: usize) -> f64 {
    task_score * (rating as f64 / 3.0) * (1.0 / rated.max(1) as f64)
}

/// EMA weight update, clamped to `[WEIGHT_MIN, WEIGHT_MAX]`.
pub fn ema_weight(current: f64, credit: f64, learning_rate: f64) -> f64 {
    clamp_weight((1.0 - learning_rate) * current + learning_rate * credit)
}

pub fn clamp_weight(weight: f64) -> f64 {
    weight.clamp(WEIGHT_MIN, WEIGHT_MAX)
}

/// Initial weight for a correction, scaled by how much it cost to learn.
///
/// `avg_tokens_per_task` is the mean `tokens_used` over finished tasks;
/// callers pass [`DEFAULT_AVG_TOKENS`] when none have finished.
pub fn correction_weight(tokens_wasted: i64, avg_tokens_per_task: f64) -> f64 {
    clamp_weight(1.0 + tokens_wasted as f64 / avg_tokens_per_task.max(1.0))
}

/// Where a user-category memory came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInputSource {
    UserDenial,
    UserCorrection,
    UserInput,
    Other,
}

impl UserInputSource {
    /// Parse a source label. Unknown labels map to `Other` rather than
    /// erroring; every source still yields a valid weight.
    pub fn parse(s: &str) -> Self {
        match s {
            "user_denial" => Self::UserDenial,
            "user_correction" => Self::UserCorrection,
            "user_input" => Self::UserInput,
            _ => Self::Other,
        }
    }
}

/// Initial weight for a user-category memory by source.
pub fn user_weight(source: UserInputSource) -> f64 {
    match source {
        UserInputSource::UserDenial => 2.0,
        UserInputSource::UserCorrection => 2.5,
        UserInputSource::UserInput => 2.0,
        UserInputSource::Other => 2.0,
    }
}

/// Ranking-time recency multiplier. Not persisted.
pub fn decay_factor(decay_rate: f64, now: i64, last_retrieved: Option<i64>, created_at: i64) -> f64 {
    let anchor = last_retrieved.unwrap_or(created_at);
    let days = (now - anchor) as f64 / 86_400.0;
    decay_rate.powf(days)
}
