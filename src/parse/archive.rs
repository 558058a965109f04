//! Zip archives holding one delimited data file.

use std::io::{Cursor, Read};

use tracing::debug;
use zip::ZipArchive;

use super::ParseError;

const DATA_EXTENSIONS: &[&str] = &[".txt", ".csv", ".dat"];

/// Returns the bytes of the largest data member (`.txt`, `.csv`, `.dat`).
/// Research archives also ship small layout notes, which are skipped.
pub(super) fn extract_data_member(bytes: &[u8]) -> Result<Vec<u8>, ParseError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|source| ParseError::Archive { source })?;

    let mut best: Option<(usize, u64, String)> = None;
    for index in 0..archive.len() {
        let member = archive
            .by_index(index)
            .map_err(|source| ParseError::Archive { source })?;
        if member.is_dir() {
            continue;
        }
        let name = member.name().to_string();
        let lower = name.to_ascii_lowercase();
        if !DATA_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            continue;
        }
        if best.as_ref().is_none_or(|(_, size, _)| member.size() > *size) {
            best = Some((index, member.size(), name));
        }
    }

    let (index, size, name) = best.ok_or(ParseError::NoDataMember)?;
    debug!(member = %name, size, "extracting archive member");

    let mut member = archive
        .by_index(index)
        .map_err(|source| ParseError::Archive { source })?;
    let mut contents = Vec::new();
    member
        .read_to_end(&mut contents)
        .map_err(|source| ParseError::ArchiveMember {
            member: name,
            source,
        })?;
    Ok(contents)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    fn build_zip(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in members {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extracts_largest_data_member() {
        let bytes = build_zip(&[
            ("readme.txt", b"notes"),
            ("sb_ca2024_all.txt", b"Test ID^Students Enrolled\n1^20\n"),
            ("layout.pdf", b"%PDF"),
        ]);
        let member = extract_data_member(&bytes).unwrap();
        assert!(member.starts_with(b"Test ID"));
    }

    #[test]
    fn test_no_data_member() {
        let bytes = build_zip(&[("layout.pdf", b"%PDF")]);
        assert!(matches!(extract_data_member(&bytes), Err(ParseError::NoDataMember)));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(extract_data_member(b"plain text"), Err(ParseError::Archive { .. })));
    }
}
