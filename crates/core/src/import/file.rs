//! Uploaded files and their conversion into header-keyed rows.
//!
//! CSV files are read with the `csv` crate; spreadsheet formats (xlsx, xls,
//! xlsb, ods) are read with `calamine` from the first worksheet. Both paths
//! produce the same [`ParsedSheet`] so row rules never see the source format.

use std::io::Cursor;

use calamine::Reader;
use indexmap::IndexMap;

use super::error::FileFormatError;

/// Default upload cap (10 MiB). The parser enforces its limit itself so it
/// never depends on the HTTP layer having applied a body limit.
pub const MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// A header-keyed row. Keys are normalized header names, in file order.
pub type Row = IndexMap<String, String>;

/// Extensions handled by the CSV reader.
pub const CSV_EXTENSIONS: &[&str] = &["csv", "txt"];

/// Extensions handled by the spreadsheet reader.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

const CSV_MEDIA_TYPES: &[&str] = &["text/csv", "application/csv", "text/plain"];

const SPREADSHEET_MEDIA_TYPES: &[&str] = &[
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "application/vnd.ms-excel.sheet.macroenabled.12",
    "application/vnd.oasis.opendocument.spreadsheet",
];

/// ZIP local file header; xlsx and ods containers start with it.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// OLE2 compound document header used by legacy xls.
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

/// The raw file an operator supplies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    /// Declared media type, if the client sent one.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes: bytes.into(),
        }
    }

    /// Convenience constructor for CSV text.
    pub fn csv(file_name: impl Into<String>, text: &str) -> Self {
        Self::new(file_name, Some("text/csv".to_string()), text.as_bytes())
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Lowercase extension of the file name, without the dot.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Source format detected for an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

/// Detect the file format from extension, then declared media type, then
/// content sniffing.
pub fn detect_format(file: &UploadedFile) -> Result<FileFormat, FileFormatError> {
    if let Some(ext) = file.extension() {
        if CSV_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(FileFormat::Csv);
        }
        if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(FileFormat::Spreadsheet);
        }
    }

    if let Some(media) = file.content_type.as_deref() {
        let essence = media
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if CSV_MEDIA_TYPES.contains(&essence.as_str()) {
            return Ok(FileFormat::Csv);
        }
        if SPREADSHEET_MEDIA_TYPES.contains(&essence.as_str()) {
            return Ok(FileFormat::Spreadsheet);
        }
    }

    if file.bytes.starts_with(ZIP_MAGIC) || file.bytes.starts_with(OLE_MAGIC) {
        return Ok(FileFormat::Spreadsheet);
    }

    let declared = file
        .extension()
        .map(|ext| format!(".{ext}"))
        .or_else(|| file.content_type.clone())
        .unwrap_or_else(|| file.file_name.clone());
    Err(FileFormatError::Unsupported(declared))
}

/// A file parsed into normalized headers and ordered rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSheet {
    /// Normalized header names, in file order (duplicates preserved).
    pub headers: Vec<String>,
    /// Data rows in source order. Completely blank rows are dropped.
    pub rows: Vec<Row>,
    /// Indexes into `rows` of rows with non-empty cells past the last header.
    pub overflowing_rows: Vec<usize>,
}

impl ParsedSheet {
    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// Header names that occur more than once, in first-seen order.
    pub fn duplicate_headers(&self) -> Vec<String> {
        let mut seen = IndexMap::<&str, usize>::new();
        for header in &self.headers {
            *seen.entry(header.as_str()).or_default() += 1;
        }
        seen.into_iter()
            .filter(|(header, count)| *count > 1 && !header.is_empty())
            .map(|(header, _)| header.to_string())
            .collect()
    }
}

/// Spreadsheet row number for a zero-based data row index (header is row 1).
pub fn line_number(index: usize) -> usize {
    index + 2
}

/// Normalize a header cell: trimmed, lowercase, inner whitespace as `_`.
pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Parse an uploaded file into a [`ParsedSheet`] under the default size cap.
pub fn parse(file: &UploadedFile) -> Result<ParsedSheet, FileFormatError> {
    parse_with_limit(file, MAX_FILE_SIZE_BYTES)
}

/// Parse an uploaded file, rejecting files larger than `max_bytes`.
pub fn parse_with_limit(
    file: &UploadedFile,
    max_bytes: usize,
) -> Result<ParsedSheet, FileFormatError> {
    if file.bytes.is_empty() {
        return Err(FileFormatError::Empty);
    }
    if file.size() > max_bytes {
        return Err(FileFormatError::TooLarge {
            size: file.size(),
            limit: max_bytes,
        });
    }

    let table = match detect_format(file)? {
        FileFormat::Csv => read_csv_table(&file.bytes)?,
        FileFormat::Spreadsheet => read_spreadsheet_table(&file.bytes)?,
    };
    build_sheet(table)
}

fn read_csv_table(bytes: &[u8]) -> Result<Vec<Vec<String>>, FileFormatError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut table = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| FileFormatError::Csv(e.to_string()))?;
        table.push(record.iter().map(str::to_string).collect());
    }
    Ok(table)
}

fn read_spreadsheet_table(bytes: &[u8]) -> Result<Vec<Vec<String>>, FileFormatError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| FileFormatError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FileFormatError::Spreadsheet("workbook has no worksheets".to_string()))?
        .map_err(|e| FileFormatError::Spreadsheet(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
        .collect())
}

fn build_sheet(table: Vec<Vec<String>>) -> Result<ParsedSheet, FileFormatError> {
    let mut lines = table
        .into_iter()
        .filter(|cells| cells.iter().any(|c| !c.trim().is_empty()));

    let headers: Vec<String> = lines
        .next()
        .ok_or(FileFormatError::MissingHeader)?
        .iter()
        .map(|h| normalize_header(h))
        .collect();

    let mut rows = Vec::new();
    let mut overflowing_rows = Vec::new();
    for cells in lines {
        if cells
            .iter()
            .skip(headers.len())
            .any(|c| !c.trim().is_empty())
        {
            overflowing_rows.push(rows.len());
        }

        let mut row = Row::with_capacity(headers.len());
        for (index, header) in headers.iter().enumerate() {
            if header.is_empty() || row.contains_key(header) {
                continue;
            }
            let value = cells.get(index).map(|c| c.trim()).unwrap_or_default();
            row.insert(header.clone(), value.to_string());
        }
        rows.push(row);
    }

    Ok(ParsedSheet {
        headers,
        rows,
        overflowing_rows,
    })
}
