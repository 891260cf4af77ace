//! Memory-decay scheduler.
//!
//! Each card carries a stability (days until recall probability falls to
//! the target retention), a difficulty in `[1, 10]` and a learning stage:
//!
//! ```text
//! New -> Learning -> Review <-> Relearning
//! ```
//!
//! Stability and difficulty follow the FSRS family of update rules: a power
//! forgetting curve, stability growth that is monotonic in the grade and
//! sub-linear in the current stability, and difficulty that drifts toward a
//! grade-dependent target. Same-day (re)learning answers use a short-term
//! multiplicative update instead, since the forgetting curve has not moved.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::EngineError;

const DECAY: f64 = -0.5;
const FACTOR: f64 = 19.0 / 81.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

pub const MIN_STABILITY: f64 = 0.1;
pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 10.0;

/// A (re)learning card graduates once its interval exceeds this many days.
pub const GRADUATION_DAYS: f64 = 1.0;

/// Upper bound for any configured maximum interval (about a century).
pub const MAX_INTERVAL_CEILING_DAYS: f64 = 36_500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

    pub fn value(self) -> i32 {
        self as i32
    }

    pub fn is_pass(self) -> bool {
        matches!(self, Grade::Good | Grade::Easy)
    }
}

impl TryFrom<i32> for Grade {
    type Error = EngineError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Grade::Again),
            2 => Ok(Grade::Hard),
            3 => Ok(Grade::Good),
            4 => Ok(Grade::Easy),
            other => Err(EngineError::InvalidGrade(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    New,
    Learning,
    Review,
    Relearning,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::New => "new",
            Stage::Learning => "learning",
            Stage::Review => "review",
            Stage::Relearning => "relearning",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(Stage::New),
            "learning" => Some(Stage::Learning),
            "review" => Some(Stage::Review),
            "relearning" => Some(Stage::Relearning),
            _ => None,
        }
    }
}

/// Scheduling state owned by exactly one card.
///
/// Every field that influences the next transition is stored here, so a
/// state reloaded from storage schedules exactly like the in-memory one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerState {
    pub stage: Stage,
    /// Days; zero until the first review.
    pub stability: f64,
    /// `[1, 10]`; zero until the first review.
    pub difficulty: f64,
    /// `None` while the card is new.
    pub due: Option<DateTime<Utc>>,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub reps: i32,
    pub lapses: i32,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerState {
    pub fn new() -> Self {
        Self {
            stage: Stage::New,
            stability: 0.0,
            difficulty: 0.0,
            due: None,
            last_reviewed: None,
            reps: 0,
            lapses: 0,
        }
    }

    pub fn elapsed_days(&self, now: DateTime<Utc>) -> f64 {
        match self.last_reviewed {
            Some(last) => ((now - last).num_seconds() as f64 / SECONDS_PER_DAY).max(0.0),
            None => 0.0,
        }
    }

    /// Probability of recall at `now`.
    pub fn retrievability(&self, now: DateTime<Utc>) -> f64 {
        match self.stage {
            Stage::New => 0.0,
            _ => retrievability(self.stability, self.elapsed_days(now)),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.stage != Stage::New && self.due.is_some_and(|due| due <= now)
    }
}

/// Tuning constants. Any values keep the ordering guarantees as long as the
/// weights stay positive and `weights[15] < 1 < weights[16]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerParams {
    pub weights: [f64; 17],
    /// Short-term stability exponent and grade offset for same-day answers.
    pub short_term: [f64; 2],
    pub desired_retention: f64,
    pub maximum_interval_days: f64,
    pub again_step_minutes: i64,
    pub relearning_step_minutes: i64,
    pub hard_step_minutes: i64,
    pub good_step_minutes: i64,
    pub easy_step_minutes: i64,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            weights: [
                0.4, 0.6, 2.4, 5.8, // initial stability per grade
                4.93, 0.94, 0.86, 0.01, // difficulty
                1.49, 0.14, 0.94, // recall stability
                2.18, 0.05, 0.34, 1.26, // forget stability
                0.29, 2.61, // hard penalty, easy bonus
            ],
            short_term: [0.5, 0.6],
            desired_retention: 0.9,
            maximum_interval_days: 730.0,
            again_step_minutes: 1,
            relearning_step_minutes: 10,
            hard_step_minutes: 6 * 60,
            good_step_minutes: 12 * 60,
            easy_step_minutes: 24 * 60,
        }
    }
}

impl SchedulerParams {
    pub fn with_retention(&self, retention: f64) -> Self {
        let mut params = self.clone();
        params.desired_retention = retention;
        params
    }

    pub fn with_maximum_interval(mut self, days: f64) -> Self {
        self.maximum_interval_days = if days.is_finite() {
            days.clamp(1.0, MAX_INTERVAL_CEILING_DAYS)
        } else {
            MAX_INTERVAL_CEILING_DAYS
        };
        self
    }

    /// Interval in days for `stability`, clamped to `[1, maximum_interval_days]`.
    pub fn interval_days(&self, stability: f64) -> f64 {
        let ceiling = self.maximum_interval_days.max(1.0).min(MAX_INTERVAL_CEILING_DAYS);
        raw_interval(stability, self.desired_retention).clamp(1.0, ceiling)
    }

    fn step(&self, stage: Stage, grade: Grade) -> Duration {
        let minutes = match (stage, grade) {
            (Stage::Relearning, Grade::Again) => self.relearning_step_minutes,
            (_, Grade::Again) => self.again_step_minutes,
            (_, Grade::Hard) => self.hard_step_minutes,
            (_, Grade::Good) => self.good_step_minutes,
            (_, Grade::Easy) => self.easy_step_minutes,
        };
        Duration::minutes(minutes)
    }
}

/// Applies one graded answer to `state` at `now`.
pub fn schedule(
    state: &SchedulerState,
    grade: Grade,
    now: DateTime<Utc>,
    params: &SchedulerParams,
) -> SchedulerState {
    let w = &params.weights;
    let elapsed = state.elapsed_days(now);
    let mut next = state.clone();
    next.reps = state.reps + 1;
    next.last_reviewed = Some(now);

    match state.stage {
        Stage::New => {
            next.stability = initial_stability(w, grade);
            next.difficulty = initial_difficulty(w, grade);
            next.stage = Stage::Learning;
            next.due = Some(now + params.step(Stage::Learning, grade));
        }
        Stage::Learning | Stage::Relearning => {
            let r = retrievability(state.stability, elapsed);
            next.difficulty = next_difficulty(w, state.difficulty, grade);
            next.stability = if elapsed < 1.0 {
                short_term_stability(params, state.stability, grade)
            } else if grade == Grade::Again {
                forget_stability(w, state.difficulty, state.stability, r)
            } else {
                recall_stability(w, state.difficulty, state.stability, r, grade)
            };

            let interval = raw_interval(next.stability, params.desired_retention);
            if grade.is_pass() && interval > GRADUATION_DAYS {
                next.stage = Stage::Review;
                next.due = Some(now + days(params.interval_days(next.stability)));
            } else {
                next.due = Some(now + params.step(state.stage, grade));
            }
        }
        Stage::Review => {
            let r = retrievability(state.stability, elapsed);
            next.difficulty = next_difficulty(w, state.difficulty, grade);
            if grade == Grade::Again {
                next.lapses = state.lapses + 1;
                next.stability = forget_stability(w, state.difficulty, state.stability, r);
                next.stage = Stage::Relearning;
                next.due = Some(now + params.step(Stage::Relearning, Grade::Again));
            } else {
                next.stability = recall_stability(w, state.difficulty, state.stability, r, grade);
                next.due = Some(now + days(params.interval_days(next.stability)));
            }
        }
    }

    next
}

/// The state each grade would produce, in `Grade::ALL` order.
pub fn preview(
    state: &SchedulerState,
    now: DateTime<Utc>,
    params: &SchedulerParams,
) -> [SchedulerState; 4] {
    Grade::ALL.map(|grade| schedule(state, grade, now, params))
}

pub fn retrievability(stability: f64, elapsed_days: f64) -> f64 {
    if stability <= 0.0 {
        return 0.0;
    }
    (1.0 + FACTOR * elapsed_days.max(0.0) / stability).powf(DECAY)
}

fn raw_interval(stability: f64, desired_retention: f64) -> f64 {
    let retention = desired_retention.clamp(0.01, 0.99);
    stability / FACTOR * (retention.powf(1.0 / DECAY) - 1.0)
}

fn days(interval: f64) -> Duration {
    Duration::seconds((interval * SECONDS_PER_DAY).round() as i64)
}

fn initial_stability(w: &[f64; 17], grade: Grade) -> f64 {
    w[(grade.value() - 1) as usize].max(MIN_STABILITY)
}

fn initial_difficulty(w: &[f64; 17], grade: Grade) -> f64 {
    (w[4] - (grade.value() - 3) as f64 * w[5]).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

fn next_difficulty(w: &[f64; 17], d: f64, grade: Grade) -> f64 {
    let shifted = d - w[6] * (grade.value() - 3) as f64;
    let reverted = w[7] * w[4] + (1.0 - w[7]) * shifted;
    reverted.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

fn recall_stability(w: &[f64; 17], d: f64, s: f64, r: f64, grade: Grade) -> f64 {
    let hard_penalty = if grade == Grade::Hard { w[15] } else { 1.0 };
    let easy_bonus = if grade == Grade::Easy { w[16] } else { 1.0 };

    let growth = w[8].exp()
        * (11.0 - d)
        * s.powf(-w[9])
        * ((1.0 - r) * w[10]).exp_m1()
        * hard_penalty
        * easy_bonus;
    (s * (1.0 + growth)).max(s)
}

fn forget_stability(w: &[f64; 17], d: f64, s: f64, r: f64) -> f64 {
    let lapsed = w[11] * d.powf(-w[12]) * ((s + 1.0).powf(w[13]) - 1.0) * ((1.0 - r) * w[14]).exp();
    at_most(lapsed, s)
}

fn short_term_stability(params: &SchedulerParams, s: f64, grade: Grade) -> f64 {
    let [exponent, offset] = params.short_term;
    let scaled = s * (exponent * (grade.value() as f64 - 3.0 + offset)).exp();
    if grade == Grade::Again {
        at_most(scaled, s)
    } else {
        scaled.max(MIN_STABILITY)
    }
}

/// Never above `previous`, never below the floor unless `previous` already is.
fn at_most(candidate: f64, previous: f64) -> f64 {
    candidate.min(previous).max(MIN_STABILITY.min(previous))
}
