//! Percentage-of-total policy.

use crate::normalize::clamp_percent;
use crate::quality::{WarningCollector, WarningKind};

/// What is known about a percentage's denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denominator {
    /// No denominator row was reported at all.
    Absent,
    /// The denominator row exists but its count is suppressed.
    Suppressed,
    /// The reported denominator, possibly zero.
    Reported(u64),
}

impl From<Option<Option<u64>>> for Denominator {
    fn from(value: Option<Option<u64>>) -> Self {
        match value {
            None => Self::Absent,
            Some(None) => Self::Suppressed,
            Some(Some(n)) => Self::Reported(n),
        }
    }
}

/// Share of `denominator` that `count` represents, in [0, 100].
///
/// A missing count gives a missing share. A zero denominator gives zero.
/// An absent or suppressed denominator gives a missing share and records a
/// warning. Values above 100 are clamped with a warning.
pub(crate) fn share(
    count: Option<u64>,
    denominator: Denominator,
    warnings: &mut WarningCollector,
    detail: impl Fn() -> String,
) -> Option<f64> {
    let count = count?;
    match denominator {
        Denominator::Absent => {
            warnings.record(WarningKind::MissingDenominator, &detail);
            None
        }
        Denominator::Suppressed => {
            warnings.record(WarningKind::SuppressedDenominator, &detail);
            None
        }
        Denominator::Reported(0) => Some(0.0),
        Denominator::Reported(total) => {
            #[allow(clippy::cast_precision_loss)]
            let pct = count as f64 / total as f64 * 100.0;
            Some(clamp_percent(pct, warnings, detail))
        }
    }
}
