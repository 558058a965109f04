//! Schema normalizer: one raw table of one era becomes the canonical wide
//! shape.
//!
//! Each [`Layout`] has its own mapping. Mappings claim every source column
//! they understand; an unclaimed column or an unknown code is a
//! [`NormalizeError`] rather than a silent drop, because a dropped column is
//! indistinguishable from real zeros downstream.

mod assessment;
mod cells;
mod enrollment;
mod error;
mod graduation;
mod identity;
mod rollup;

pub use error::NormalizeError;

pub(crate) use cells::clamp_percent;

use tracing::{debug, instrument};

use crate::parse::RawTable;
use crate::quality::{DEFAULT_SUPPRESSION_THRESHOLD, SuppressionTally, WarningCollector};
use crate::source::Layout;
use crate::table::{Rows, Table};

/// Tunables for normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeOptions {
    /// Share of suppressed count cells above which a
    /// [`WarningKind::HighSuppression`](crate::quality::WarningKind) warning
    /// is attached.
    pub suppression_threshold: f64,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            suppression_threshold: DEFAULT_SUPPRESSION_THRESHOLD,
        }
    }
}

/// State shared by one normalization run.
pub(super) struct Context {
    layout: Layout,
    end_year: u16,
    tally: SuppressionTally,
    warnings: WarningCollector,
}

impl Context {
    fn new(layout: Layout, end_year: u16) -> Self {
        Self {
            layout,
            end_year,
            tally: SuppressionTally::default(),
            warnings: WarningCollector::new(end_year),
        }
    }
}

/// Maps `raw`, read from a file of `layout` for `end_year`, onto the
/// canonical wide shape.
///
/// # Errors
///
/// Returns [`NormalizeError`] for unrecognized columns or codes, missing
/// required columns, and malformed cells.
#[instrument(skip(raw, options), fields(rows = raw.len()))]
pub fn normalize(
    raw: &RawTable,
    layout: Layout,
    end_year: u16,
    options: &NormalizeOptions,
) -> Result<Table, NormalizeError> {
    let mut ctx = Context::new(layout, end_year);
    let rows = match layout {
        Layout::EnrollmentLegacy
        | Layout::EnrollmentHistorical
        | Layout::EnrollmentHistoricalRevised => {
            Rows::Enrollment(enrollment::normalize_school_file(raw, &mut ctx)?)
        }
        Layout::EnrollmentCensus => Rows::Enrollment(enrollment::normalize_census(raw, &mut ctx)?),
        Layout::GraduationAcgr => Rows::Graduation(graduation::normalize(raw, &mut ctx)?),
        Layout::AssessmentSbacOriginal | Layout::AssessmentSbacRevised => {
            Rows::Assessment(assessment::normalize(raw, &mut ctx)?)
        }
    };

    let mut warnings = ctx.warnings.finish();
    warnings.extend(ctx.tally.check(end_year, options.suppression_threshold));
    debug!(
        records = rows.len(),
        suppressed = ctx.tally.suppressed,
        cells = ctx.tally.cells,
        warnings = warnings.len(),
        "normalized"
    );
    Ok(Table::new(rows, warnings))
}
