//! Source-file fixtures and mock-server helpers shared by integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::time::Duration;

use caschool_core::{CacheManager, ClientSettings, RetryPolicy, SchoolDataClient, UrlBuilder};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

pub const CENSUS_2024_PATH: &str = "/demo-downloads/census/cdenroll2324-v2.txt";
pub const CENSUS_2025_PATH: &str = "/demo-downloads/census/cdenroll2425.txt";
pub const DATAQUEST_PATH: &str = "/dataquest/dlfile/dlfile.aspx";

pub fn acgr_path(year: u16) -> String {
    match year {
        2019 => "/demo-downloads/acgr/acgr19-v2.txt".to_string(),
        2024 => "/demo-downloads/acgr/acgr24-v2.txt".to_string(),
        other => format!("/demo-downloads/acgr/acgr{:02}.txt", other % 100),
    }
}

pub const SBAC_2023_PATH: &str = "/caaspp/researchfiles/sb_ca2023_all_ascii_v1.zip";

fn tab_file(headers: &[&str], rows: &[&[&str]]) -> String {
    let mut out = headers.join("\t");
    out.push('\n');
    for row in rows {
        out.push_str(&row.join("\t"));
        out.push('\n');
    }
    out
}

/// Census day file: state, county, district and one school with a total,
/// a suppressed Hispanic cell and a zero White cell in grade 1. The district
/// has grade 9 suppressed.
#[rustfmt::skip]
pub fn census_file(academic_year: &str) -> String {
    const DISTRICT: &str = "Alameda Unified";
    const SCHOOL: &str = "Lincoln Elementary";
    let ay = academic_year;
    tab_file(
        &[
            "AcademicYear", "AggregateLevel", "CountyCode", "DistrictCode", "SchoolCode",
            "CountyName", "DistrictName", "SchoolName", "Charter", "ReportingCategory",
            "ENR_TOTAL", "GR_TK", "GR_KN", "GR_01", "GR_09", "GR_10", "GR_11", "GR_12",
        ],
        &[
            &[ay, "T", "00", "", "", "State", "", "", "All", "TA",
              "1000", "50", "100", "110", "120", "130", "140", "150"],
            &[ay, "C", "01", "NA", "NA", "Alameda", "", "", "All", "TA",
              "600", "30", "60", "66", "70", "80", "90", "100"],
            &[ay, "D", "01", "61119", "", "Alameda", DISTRICT, "", "All", "TA",
              "400", "20", "40", "45", "*", "60", "70", "80"],
            &[ay, "S", "01", "61119", "0130229", "Alameda", DISTRICT, SCHOOL, "N", "TA",
              "12", "2", "5", "5", "0", "0", "0", "0"],
            &[ay, "S", "01", "61119", "0130229", "Alameda", DISTRICT, SCHOOL, "N", "RH",
              "*", "*", "*", "*", "0", "0", "0", "0"],
            &[ay, "S", "01", "61119", "0130229", "Alameda", DISTRICT, SCHOOL, "N", "RW",
              "3", "0", "3", "0", "0", "0", "0", "0"],
        ],
    )
}

/// Revised-era school file (2009-2023): two schools in one district.
pub fn historical_file() -> String {
    let headers = [
        "CDS_CODE", "COUNTY", "DISTRICT", "SCHOOL", "ETHNIC", "GENDER", "KDGN", "GR_1", "GR_2",
        "GR_3", "GR_4", "GR_5", "GR_6", "GR_7", "GR_8", "UNGR_ELM", "GR_9", "GR_10", "GR_11",
        "GR_12", "UNGR_SEC", "ENR_TOTAL", "ADULT",
    ];
    let counts = ["2"; 15];
    let mut rows: Vec<Vec<&str>> = Vec::new();
    for (cds, school, ethnic, gender) in [
        ("01611190130229", "Lincoln", "5", "F"),
        ("01611190130229", "Lincoln", "9", "M"),
        ("01611190130237", "Washington", "7", "F"),
    ] {
        let mut row = vec![cds, "Alameda", "Alameda Unified", school, ethnic, gender];
        row.extend(counts);
        row.push("30");
        row.push("0");
        rows.push(row);
    }
    let rows: Vec<&[&str]> = rows.iter().map(Vec::as_slice).collect();
    tab_file(&headers, &rows)
}

/// One fixed-width record of the 1982-1992 layout.
pub fn legacy_line(cds: &str, ethnic: char, gender: char, per_grade: u32) -> String {
    let mut line = format!("{cds}{ethnic}{gender}");
    // KDGN, GR_1..GR_12, UNGR_ELM, UNGR_SEC
    for _ in 0..15 {
        line.push_str(&format!("{per_grade:>5}"));
    }
    line.push_str(&format!("{:>6}", per_grade * 15));
    line.push_str(&format!("{:>5}", 0));
    line
}

pub const ACGR_HEADERS: &[&str] = &[
    "AcademicYear", "AggregateLevel", "CountyCode", "DistrictCode", "SchoolCode", "CountyName",
    "DistrictName", "SchoolName", "CharterSchool", "DASS", "ReportingCategory", "CohortStudents",
    "Regular HS Diploma Graduates (Count)", "Regular HS Diploma Graduates (Rate)",
    "Dropout (Count)", "Dropout (Rate)",
];

#[rustfmt::skip]
pub fn acgr_file(academic_year: &str) -> String {
    let ay = academic_year;
    tab_file(
        ACGR_HEADERS,
        &[
            &[ay, "T", "00", "", "", "State", "", "", "All", "All", "TA",
              "500000", "430000", "86.0", "40000", "8.0"],
            &[ay, "S", "01", "61119", "0130229", "Alameda", "Alameda Unified", "Alameda High",
              "No", "No", "TA", "400", "380", "95.0", "*", "*"],
        ],
    )
}

pub const SBAC_HEADERS: &[&str] = &[
    "County Code", "District Code", "School Code", "Filler", "Test Year", "Student Group ID",
    "Test Type", "Total Tested at Reporting Level", "Total Tested with Scores at Reporting Level",
    "Grade", "Test ID", "Students Enrolled", "Students Tested", "Mean Scale Score",
    "Percentage Standard Exceeded", "Percentage Standard Met", "Percentage Standard Met and Above",
    "Percentage Standard Nearly Met", "Percentage Standard Not Met", "Students with Scores",
    "Type ID",
];

#[rustfmt::skip]
const SBAC_ROWS: [[&str; 21]; 3] = [
    ["00", "00000", "0000000", "", "2023", "1", "B", "400000", "398000", "13", "1",
     "410000", "400000", "2500.0", "20.0", "25.0", "45.0", "25.0", "30.0", "398000", "4"],
    ["01", "61119", "0130229", "", "2023", "1", "B", "40", "40", "3", "2",
     "41", "40", "2410.2", "25.0", "25.0", "50.0", "25.0", "25.0", "40", "7"],
    ["01", "61119", "0130229", "", "2023", "204", "B", "12", "12", "3", "2",
     "12", "12", "2400.0", "*", "*", "*", "*", "*", "12", "7"],
];

/// Caret-delimited research file zipped with a layout note.
pub fn sbac_zip() -> Vec<u8> {
    let mut text = SBAC_HEADERS.join("^");
    text.push('\n');
    for row in SBAC_ROWS {
        text.push_str(&row.join("^"));
        text.push('\n');
    }

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("layout_notes.txt", SimpleFileOptions::default())
        .expect("start notes member");
    writer.write_all(b"see layout").expect("write notes");
    writer
        .start_file("sb_ca2023_all_ascii_v1.txt", SimpleFileOptions::default())
        .expect("start data member");
    writer.write_all(text.as_bytes()).expect("write data");
    writer.finish().expect("finish zip").into_inner()
}

pub async fn mount_body(server: &MockServer, at: &str, body: impl Into<Vec<u8>>) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.into()))
        .mount(server)
        .await;
}

pub async fn mount_dataquest(server: &MockServer, school_year: &str, body: impl Into<Vec<u8>>) {
    Mock::given(method("GET"))
        .and(path(DATAQUEST_PATH))
        .and(query_param("cYear", school_year))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.into()))
        .mount(server)
        .await;
}

/// Fast-failing HTTP settings for tests.
pub fn test_settings() -> ClientSettings {
    ClientSettings {
        connect_timeout: Duration::from_secs(2),
        read_timeout: Duration::from_secs(2),
        retry: RetryPolicy::no_retry(),
        ..ClientSettings::default()
    }
}

pub fn client_with_cache(base: &str, cache: CacheManager) -> SchoolDataClient {
    SchoolDataClient::builder()
        .url_builder(UrlBuilder::with_single_base(base).expect("valid base URL"))
        .client_settings(test_settings())
        .cache(cache)
        .build()
        .expect("client builds")
}

pub fn client_without_cache(base: &str) -> SchoolDataClient {
    SchoolDataClient::builder()
        .url_builder(UrlBuilder::with_single_base(base).expect("valid base URL"))
        .client_settings(test_settings())
        .without_cache()
        .build()
        .expect("client builds")
}
