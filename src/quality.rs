//! Non-fatal data-quality conditions attached to returned tables.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default share of suppressed count cells above which a warning is raised.
pub const DEFAULT_SUPPRESSION_THRESHOLD: f64 = 0.25;

/// What kind of condition was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Share of suppressed count cells exceeds the configured threshold.
    HighSuppression,
    /// A percentage has no denominator row at all.
    MissingDenominator,
    /// A percentage's denominator is itself suppressed.
    SuppressedDenominator,
    /// A source or computed percentage fell outside [0, 100] and was clamped.
    PercentOutOfRange,
    /// A derived aggregate includes suppressed contributors and is missing.
    IncompleteRollup,
}

impl WarningKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighSuppression => "high_suppression",
            Self::MissingDenominator => "missing_denominator",
            Self::SuppressedDenominator => "suppressed_denominator",
            Self::PercentOutOfRange => "percent_out_of_range",
            Self::IncompleteRollup => "incomplete_rollup",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One data-quality condition for one year, with how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityWarning {
    pub end_year: u16,
    pub kind: WarningKind,
    pub occurrences: usize,
    pub detail: String,
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (x{}): {}",
            self.end_year, self.kind, self.occurrences, self.detail
        )
    }
}

/// Collects occurrences per kind and emits one warning per kind.
#[derive(Debug, Default)]
pub struct WarningCollector {
    end_year: u16,
    counts: BTreeMap<WarningKind, (usize, String)>,
}

impl WarningCollector {
    #[must_use]
    pub fn new(end_year: u16) -> Self {
        Self {
            end_year,
            counts: BTreeMap::new(),
        }
    }

    /// Records one occurrence. The first detail per kind is kept as the example.
    pub fn record(&mut self, kind: WarningKind, detail: impl FnOnce() -> String) {
        self.counts
            .entry(kind)
            .and_modify(|(count, _)| *count += 1)
            .or_insert_with(|| (1, detail()));
    }

    /// Finishes collection, logging each warning.
    #[must_use]
    pub fn finish(self) -> Vec<DataQualityWarning> {
        let end_year = self.end_year;
        self.counts
            .into_iter()
            .map(|(kind, (occurrences, example))| {
                let warning = DataQualityWarning {
                    end_year,
                    kind,
                    occurrences,
                    detail: format!("e.g. {example}"),
                };
                warn!(end_year, %kind, occurrences, "data quality: {}", warning.detail);
                warning
            })
            .collect()
    }
}

/// Running tally of suppressed versus total count cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuppressionTally {
    pub suppressed: usize,
    pub cells: usize,
}

impl SuppressionTally {
    pub fn record(&mut self, suppressed: bool) {
        self.cells += 1;
        if suppressed {
            self.suppressed += 1;
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> f64 {
        if self.cells == 0 {
            0.0
        } else {
            self.suppressed as f64 / self.cells as f64
        }
    }

    /// Returns a warning when the suppressed share exceeds `threshold`.
    #[must_use]
    pub fn check(&self, end_year: u16, threshold: f64) -> Option<DataQualityWarning> {
        let ratio = self.ratio();
        (ratio > threshold).then(|| {
            let warning = DataQualityWarning {
                end_year,
                kind: WarningKind::HighSuppression,
                occurrences: self.suppressed,
                detail: format!(
                    "{} of {} count cells suppressed ({:.1}%, threshold {:.1}%)",
                    self.suppressed,
                    self.cells,
                    ratio * 100.0,
                    threshold * 100.0
                ),
            };
            warn!(end_year, ratio, "data quality: {}", warning.detail);
            warning
        })
    }
}
