//! Derived aggregates for school-only enrollment eras.
//!
//! Source rows are school × ethnicity × gender. Every row contributes to its
//! school's total, ethnicity and gender subgroups, and to the same subgroups
//! of its district, county and the state. A sum with a suppressed
//! contributor is missing, never a partial number.

use std::collections::BTreeMap;

use crate::codes::{GradeLevel, Subgroup};
use crate::identifier::{AggregationLevel, CdsCode};
use crate::quality::{WarningCollector, WarningKind};
use crate::table::{EnrollmentRecord, Entity};

/// Counts per measured grade plus the reported total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct GradeCounts {
    pub(super) grades: BTreeMap<GradeLevel, Option<u64>>,
    pub(super) total: Option<u64>,
}

impl GradeCounts {
    /// Zero counts over the same grades as `template`.
    fn zero_like(template: &Self) -> Self {
        Self {
            grades: template.grades.keys().map(|grade| (*grade, Some(0))).collect(),
            total: Some(0),
        }
    }

    /// Adds `other` into `self`. Returns true when a missing contributor made
    /// any sum missing.
    fn absorb(&mut self, other: &Self) -> bool {
        let mut incomplete = false;
        for (grade, value) in &other.grades {
            let slot = self.grades.entry(*grade).or_insert(Some(0));
            incomplete |= add(slot, *value);
        }
        incomplete |= add(&mut self.total, other.total);
        incomplete
    }
}

fn add(slot: &mut Option<u64>, value: Option<u64>) -> bool {
    let had_value = slot.is_some();
    *slot = match (*slot, value) {
        (Some(sum), Some(value)) => Some(sum.saturating_add(value)),
        _ => None,
    };
    had_value && slot.is_none()
}

#[derive(Debug, Default)]
struct Names {
    county: Option<String>,
    district: Option<String>,
    school: Option<String>,
}

#[derive(Debug)]
struct Aggregate {
    counts: GradeCounts,
    incomplete: bool,
}

/// Accumulates school-file rows into every level.
#[derive(Debug, Default)]
pub(super) struct Rollup {
    aggregates: BTreeMap<(AggregationLevel, CdsCode, Subgroup), Aggregate>,
    names: BTreeMap<CdsCode, Names>,
}

impl Rollup {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Remembers entity names for `cds` and its enclosing district and county.
    pub(super) fn record_names(
        &mut self,
        cds: &CdsCode,
        county: Option<&str>,
        district: Option<&str>,
        school: Option<&str>,
    ) {
        let fill = |slot: &mut Option<String>, value: Option<&str>| {
            if slot.is_none() {
                *slot = value.map(str::to_string);
            }
        };
        let entry = self.names.entry(cds.clone()).or_default();
        fill(&mut entry.county, county);
        fill(&mut entry.district, district);
        fill(&mut entry.school, school);
        let entry = self.names.entry(cds.district_code()).or_default();
        fill(&mut entry.county, county);
        fill(&mut entry.district, district);
        let entry = self.names.entry(cds.county_code()).or_default();
        fill(&mut entry.county, county);
    }

    /// Adds one source row's counts to `subgroups` at every level containing
    /// `cds`. Rows whose school segment is a placeholder only feed the
    /// enclosing district, county and state.
    pub(super) fn add(&mut self, cds: &CdsCode, subgroups: &[Subgroup], counts: &GradeCounts) {
        let level = cds.level();
        let mut targets = vec![(AggregationLevel::State, CdsCode::state())];
        if level >= AggregationLevel::County {
            targets.push((AggregationLevel::County, cds.county_code()));
        }
        if level >= AggregationLevel::District {
            targets.push((AggregationLevel::District, cds.district_code()));
        }
        if level == AggregationLevel::School {
            targets.push((AggregationLevel::School, cds.clone()));
        }

        for (target_level, code) in targets {
            for subgroup in subgroups {
                let aggregate = self
                    .aggregates
                    .entry((target_level, code.clone(), *subgroup))
                    .or_insert_with(|| Aggregate {
                        counts: GradeCounts::zero_like(counts),
                        incomplete: false,
                    });
                aggregate.incomplete |= aggregate.counts.absorb(counts);
            }
        }
    }

    /// Emits records ordered state, county, district, school, then by code
    /// and subgroup.
    pub(super) fn finish(
        self,
        end_year: u16,
        warnings: &mut WarningCollector,
    ) -> Vec<EnrollmentRecord> {
        let names = self.names;
        self.aggregates
            .into_iter()
            .map(|((level, cds, subgroup), aggregate)| {
                if aggregate.incomplete {
                    warnings.record(WarningKind::IncompleteRollup, || {
                        format!("{level} {cds} {subgroup}: suppressed contributor")
                    });
                }
                let entity_names = names.get(&cds);
                let entity = Entity::new(end_year, cds.clone(), level, None).with_names(
                    entity_names.and_then(|n| n.county.as_deref()),
                    entity_names.and_then(|n| n.district.as_deref()),
                    entity_names.and_then(|n| n.school.as_deref()),
                );
                EnrollmentRecord {
                    entity,
                    subgroup,
                    grades: aggregate.counts.grades,
                    total: aggregate.counts.total,
                }
            })
            .collect()
    }
}
