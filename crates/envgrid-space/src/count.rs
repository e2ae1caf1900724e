//! Numeric dimensions: exact counts and inclusive ranges.
//!
//! A [`CountValue`] describes node_count, core_count, memory_mb, disk_count,
//! nic_count and gpu_count on both sides of a match. Requirements are
//! usually ranges (`core_count >= 2`), capabilities are usually exact.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SpaceError, SpaceResult};
use crate::reason::ResultReason;

/// An exact value, or an inclusive range with an optional upper bound.
///
/// Serialized as a bare integer (`4`) or a table (`{ min = 2, max = 8 }`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountValue {
    Exact(u64),
    Range {
        #[serde(default)]
        min: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<u64>,
    },
}

impl CountValue {
    /// Unbounded range starting at `min`.
    pub const fn at_least(min: u64) -> Self {
        CountValue::Range { min, max: None }
    }

    /// Bounded inclusive range. Rejects `min > max`.
    pub fn between(min: u64, max: u64) -> SpaceResult<Self> {
        if min > max {
            return Err(SpaceError::InvalidRange { min, max });
        }
        Ok(CountValue::Range {
            min,
            max: Some(max),
        })
    }

    /// Re-validate a value that came in through deserialization.
    pub fn validate(&self) -> SpaceResult<()> {
        match *self {
            CountValue::Range { min, max: Some(max) } if min > max => {
                Err(SpaceError::InvalidRange { min, max })
            }
            _ => Ok(()),
        }
    }

    /// Smallest value this count admits.
    pub fn min_value(&self) -> u64 {
        match *self {
            CountValue::Exact(n) => n,
            CountValue::Range { min, .. } => min,
        }
    }

    /// True when the value can only ever be zero.
    pub fn is_zero(&self) -> bool {
        matches!(
            *self,
            CountValue::Exact(0) | CountValue::Range { max: Some(0), .. }
        )
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, CountValue::Exact(_))
    }

    fn contains(&self, value: u64) -> bool {
        match *self {
            CountValue::Exact(n) => n == value,
            CountValue::Range { min, max } => value >= min && max.is_none_or(|max| value <= max),
        }
    }
}

impl Default for CountValue {
    fn default() -> Self {
        CountValue::at_least(0)
    }
}

impl From<u64> for CountValue {
    fn from(value: u64) -> Self {
        CountValue::Exact(value)
    }
}

impl fmt::Display for CountValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            CountValue::Exact(n) => write!(f, "{n}"),
            CountValue::Range { min, max: Some(max) } => write!(f, "[{min},{max}]"),
            CountValue::Range { min, max: None } => write!(f, "[{min},]"),
        }
    }
}

/// Compare a required count against an offered one.
pub fn check_count(requirement: &CountValue, capability: &CountValue) -> ResultReason {
    let mut result = ResultReason::new();

    match (*requirement, *capability) {
        (CountValue::Exact(req), CountValue::Exact(cap)) => {
            if req > cap {
                result.add_reason(
                    format!("capability({cap}) is smaller than requirement({req})"),
                    "",
                );
            }
        }
        (CountValue::Range { min, max }, CountValue::Exact(cap)) => {
            if cap < min {
                result.add_reason(
                    format!("capability({cap}) is smaller than requirement min({min})"),
                    "",
                );
            } else if let Some(max) = max.filter(|max| cap > *max) {
                result.add_reason(
                    format!("capability({cap}) is bigger than requirement max({max})"),
                    "",
                );
            }
        }
        (CountValue::Exact(req), CountValue::Range { .. }) => {
            if !capability.contains(req) {
                result.add_reason(
                    format!("requirement({req}) is out of capability range {capability}"),
                    "",
                );
            }
        }
        (
            CountValue::Range {
                min: req_min,
                max: req_max,
            },
            CountValue::Range {
                min: cap_min,
                max: cap_max,
            },
        ) => {
            if let Some(cap_max) = cap_max.filter(|cap_max| *cap_max < req_min) {
                result.add_reason(
                    format!("capability max({cap_max}) is smaller than requirement min({req_min})"),
                    "",
                );
            } else if let Some(req_max) = req_max.filter(|req_max| cap_min > *req_max) {
                result.add_reason(
                    format!("capability min({cap_min}) is bigger than requirement max({req_max})"),
                    "",
                );
            }
        }
    }

    result
}

/// Bind a requirement to one concrete value the capability can honor.
///
/// An exact requirement keeps its own value. A ranged requirement takes an
/// exact capability as-is, or the larger of both lower bounds when the
/// capability is a range too.
pub fn realize_range(requirement: &CountValue, capability: &CountValue) -> SpaceResult<u64> {
    let check = check_count(requirement, capability);
    if !check.success {
        return Err(SpaceError::NotMeetRequirement(check));
    }

    Ok(match (*requirement, *capability) {
        (CountValue::Exact(n), _) => n,
        (CountValue::Range { .. }, CountValue::Exact(cap)) => cap,
        (CountValue::Range { min: req_min, .. }, CountValue::Range { min: cap_min, .. }) => {
            req_min.max(cap_min)
        }
    })
}

/// Realize node_count for a unit requirement.
///
/// After expansion every requirement asks for one node, and an exact
/// capability count says how many interchangeable units a single offering
/// stands for, so the capability's count is kept. Everything else follows
/// [`realize_range`].
pub fn realize_unit_count(requirement: &CountValue, capability: &CountValue) -> SpaceResult<u64> {
    match (*requirement, *capability) {
        (CountValue::Exact(req), CountValue::Exact(cap)) => {
            if req > cap {
                let check = check_count(requirement, capability);
                return Err(SpaceError::NotMeetRequirement(check));
            }
            Ok(cap)
        }
        _ => realize_range(requirement, capability),
    }
}
