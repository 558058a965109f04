//! Error types for the format parser.

use thiserror::Error;

/// Structural failures reading a validated source file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The bytes could not be decoded as text.
    #[error("unreadable encoding: {detail}")]
    Encoding { detail: String },

    /// A data row has a different number of fields than the header.
    #[error("row {row}: expected {expected} columns, found {found}")]
    ColumnCount {
        /// 1-based line number, header included.
        row: u64,
        expected: usize,
        found: usize,
    },

    /// The delimited reader failed.
    #[error("delimited text error at byte {byte_offset:?}: {source}")]
    Csv {
        byte_offset: Option<u64>,
        #[source]
        source: csv::Error,
    },

    /// A fixed-width line ends before a mandatory column starts.
    #[error("line {line}: {length} bytes, need at least {required} for fixed-width layout")]
    LineTooShort {
        line: u64,
        length: usize,
        required: usize,
    },

    /// The workbook could not be read.
    #[error("spreadsheet error: {source}")]
    Spreadsheet {
        #[source]
        source: calamine::Error,
    },

    /// The workbook has no worksheet.
    #[error("spreadsheet has no worksheets")]
    NoWorksheet,

    /// The archive could not be read.
    #[error("zip archive error: {source}")]
    Archive {
        #[source]
        source: zip::result::ZipError,
    },

    /// Reading an archive member failed.
    #[error("failed to read archive member {member}: {source}")]
    ArchiveMember {
        member: String,
        #[source]
        source: std::io::Error,
    },

    /// The archive holds no data file.
    #[error("zip archive contains no data file")]
    NoDataMember,

    /// No header row was found.
    #[error("file contains no header row")]
    Empty,

    /// A cell cannot be read as the value its column holds.
    #[error("data row {row}, column {column}: malformed value '{value}' ({reason})")]
    MalformedValue {
        /// 1-based data row, header excluded.
        row: u64,
        column: String,
        value: String,
        reason: String,
    },

    /// A row's CDS code segments are invalid.
    #[error("data row {row}: {source}")]
    Identifier {
        row: u64,
        #[source]
        source: crate::identifier::IdentifierError,
    },
}

impl ParseError {
    pub(crate) fn csv(source: csv::Error) -> Self {
        let byte_offset = source.position().map(csv::Position::byte);
        Self::Csv {
            byte_offset,
            source,
        }
    }

    /// Row number involved, when known.
    #[must_use]
    pub fn row(&self) -> Option<u64> {
        match self {
            Self::ColumnCount { row, .. } => Some(*row),
            Self::LineTooShort { line, .. } => Some(*line),
            Self::MalformedValue { row, .. } | Self::Identifier { row, .. } => Some(*row),
            Self::Csv { source, .. } => source.position().map(csv::Position::line),
            _ => None,
        }
    }
}
