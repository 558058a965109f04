//! Enrollment demographic codes for every era.
//!
//! | Era | Race/ethnicity codes | Gender codes |
//! |-----|----------------------|--------------|
//! | 1982–1992 fixed-width | letters `A`–`H` | `M`, `F` |
//! | 1993–2008 tab-delimited | digits `0`–`8` | `M`, `F` |
//! | 2009–2023 tab-delimited | digits `0`–`7`, `9` | `M`, `F` |
//! | 2024+ census day | reporting categories (`RB`, `GF`, `SE`, ...) ||

use super::Subgroup;

/// Letter ethnic codes used by the fixed-width files.
#[must_use]
pub fn legacy_ethnic(code: &str) -> Option<Subgroup> {
    match code.trim().to_ascii_uppercase().as_str() {
        "A" => Some(Subgroup::NativeAmerican),
        "B" => Some(Subgroup::Asian),
        "C" => Some(Subgroup::PacificIslander),
        "D" => Some(Subgroup::Filipino),
        "E" => Some(Subgroup::Hispanic),
        "F" => Some(Subgroup::Black),
        "G" => Some(Subgroup::White),
        "H" => Some(Subgroup::RaceNotReported),
        _ => None,
    }
}

/// Numeric ethnic codes used from 1993 through 2008.
///
/// Code `8` ("multiple or no response") maps to [`Subgroup::Multiracial`];
/// non-response on its own is code `0`.
#[must_use]
pub fn historical_ethnic(code: &str) -> Option<Subgroup> {
    match code.trim() {
        "0" => Some(Subgroup::RaceNotReported),
        "1" => Some(Subgroup::NativeAmerican),
        "2" => Some(Subgroup::Asian),
        "3" => Some(Subgroup::PacificIslander),
        "4" => Some(Subgroup::Filipino),
        "5" => Some(Subgroup::Hispanic),
        "6" => Some(Subgroup::Black),
        "7" => Some(Subgroup::White),
        "8" => Some(Subgroup::Multiracial),
        _ => None,
    }
}

/// Numeric ethnic codes used from 2009 through 2023, after the federal
/// race/ethnicity categories were revised.
#[must_use]
pub fn revised_ethnic(code: &str) -> Option<Subgroup> {
    match code.trim() {
        "0" => Some(Subgroup::RaceNotReported),
        "1" => Some(Subgroup::NativeAmerican),
        "2" => Some(Subgroup::Asian),
        "3" => Some(Subgroup::PacificIslander),
        "4" => Some(Subgroup::Filipino),
        "5" => Some(Subgroup::Hispanic),
        "6" => Some(Subgroup::Black),
        "7" => Some(Subgroup::White),
        "9" => Some(Subgroup::Multiracial),
        _ => None,
    }
}

/// Gender codes shared by the fixed-width and tab-delimited school files.
#[must_use]
pub fn school_file_gender(code: &str) -> Option<Subgroup> {
    match code.trim().to_ascii_uppercase().as_str() {
        "F" => Some(Subgroup::Female),
        "M" => Some(Subgroup::Male),
        "X" => Some(Subgroup::NonBinary),
        _ => None,
    }
}

/// Reporting categories used by census day enrollment and ACGR files.
#[must_use]
pub fn reporting_category(code: &str) -> Option<Subgroup> {
    match code.trim().to_ascii_uppercase().as_str() {
        "TA" => Some(Subgroup::Total),
        "RB" => Some(Subgroup::Black),
        "RI" => Some(Subgroup::NativeAmerican),
        "RA" => Some(Subgroup::Asian),
        "RF" => Some(Subgroup::Filipino),
        "RH" => Some(Subgroup::Hispanic),
        "RD" => Some(Subgroup::RaceNotReported),
        "RP" => Some(Subgroup::PacificIslander),
        "RT" => Some(Subgroup::Multiracial),
        "RW" => Some(Subgroup::White),
        "GF" => Some(Subgroup::Female),
        "GM" => Some(Subgroup::Male),
        "GX" => Some(Subgroup::NonBinary),
        "GZ" => Some(Subgroup::GenderMissing),
        "SD" => Some(Subgroup::StudentsWithDisabilities),
        "SE" => Some(Subgroup::EnglishLearner),
        "SF" => Some(Subgroup::Foster),
        "SH" => Some(Subgroup::Homeless),
        "SM" => Some(Subgroup::Migrant),
        "SS" => Some(Subgroup::SocioeconomicallyDisadvantaged),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_letters_cover_all_race_categories() {
        let mapped: Vec<_> = ["A", "B", "C", "D", "E", "F", "G", "H"]
            .iter()
            .filter_map(|c| legacy_ethnic(c))
            .collect();
        assert_eq!(mapped.len(), 8);
        assert!(legacy_ethnic("I").is_none());
    }

    #[test]
    fn test_historical_code_8_is_valid_only_before_revision() {
        assert_eq!(historical_ethnic("8"), Some(Subgroup::Multiracial));
        assert_eq!(revised_ethnic("8"), None);
        assert_eq!(revised_ethnic("9"), Some(Subgroup::Multiracial));
        assert_eq!(historical_ethnic("9"), None);
    }

    #[test]
    fn test_codes_translate_to_same_current_label() {
        // The same population keeps the same label across all eras.
        assert_eq!(legacy_ethnic("E"), historical_ethnic("5"));
        assert_eq!(historical_ethnic("5"), revised_ethnic("5"));
        assert_eq!(revised_ethnic("5"), reporting_category("RH"));
        assert_eq!(legacy_ethnic("F"), reporting_category("RB"));
    }

    #[test]
    fn test_reporting_categories_are_total_over_published_codes() {
        for code in [
            "TA", "RB", "RI", "RA", "RF", "RH", "RD", "RP", "RT", "RW", "GF", "GM", "GX", "GZ",
            "SD", "SE", "SF", "SH", "SM", "SS",
        ] {
            assert!(reporting_category(code).is_some(), "unmapped code {code}");
        }
        assert!(reporting_category("ZZ").is_none());
    }

    #[test]
    fn test_gender_codes_case_insensitive() {
        assert_eq!(school_file_gender("m"), Some(Subgroup::Male));
        assert_eq!(school_file_gender(" F "), Some(Subgroup::Female));
        assert_eq!(school_file_gender("U"), None);
    }
}
