//! Assignment intervals and the overlap guard.
//!
//! # Responsibility
//! - Model `[start, end)` occupancy periods where `end = None` is unbounded.
//! - Decide whether a candidate interval conflicts with existing ones.
//!
//! # Invariants
//! - `end`, when present, is never earlier than `start`.
//! - Boundary handling is explicit through [`BoundaryPolicy`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// How intervals that share an endpoint are classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// `A.end == B.start` counts as an overlap.
    #[default]
    Inclusive,
    /// Touching intervals are disjoint.
    HalfOpen,
}

impl FromStr for BoundaryPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inclusive" => Ok(Self::Inclusive),
            "half_open" | "half-open" | "halfopen" => Ok(Self::HalfOpen),
            other => Err(format!(
                "unsupported overlap policy `{other}`; expected inclusive|half_open"
            )),
        }
    }
}

/// Interval construction error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalError {
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl Display for IntervalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndBeforeStart { start, end } => write!(
                f,
                "interval end {} is earlier than start {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            ),
        }
    }
}

impl Error for IntervalError {}

/// Occupancy period. `end = None` means still active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
}

impl Interval {
    /// Creates an interval, rejecting `end < start`.
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<Self, IntervalError> {
        if let Some(end) = end {
            if end < start {
                return Err(IntervalError::EndBeforeStart { start, end });
            }
        }
        Ok(Self { start, end })
    }

    /// Creates an open-ended interval starting at `start`.
    pub fn open(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Returns whether the interval has not ended at `at`.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.end.map_or(true, |end| end > at)
    }

    /// Intersection test treating a missing end as +infinity.
    pub fn overlaps(&self, other: &Self, policy: BoundaryPolicy) -> bool {
        starts_before_end(self.start, other.end, policy)
            && starts_before_end(other.start, self.end, policy)
    }
}

fn starts_before_end(
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    policy: BoundaryPolicy,
) -> bool {
    match (end, policy) {
        (None, _) => true,
        (Some(end), BoundaryPolicy::Inclusive) => start <= end,
        (Some(end), BoundaryPolicy::HalfOpen) => start < end,
    }
}

/// Returns whether `candidate` overlaps any interval in `existing`.
///
/// Callers scope `existing` to one `(subject, role)` pair.
pub fn has_overlap<'a>(
    existing: impl IntoIterator<Item = &'a Interval>,
    candidate: &Interval,
    policy: BoundaryPolicy,
) -> bool {
    existing
        .into_iter()
        .any(|interval| interval.overlaps(candidate, policy))
}
