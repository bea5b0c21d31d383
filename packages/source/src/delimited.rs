//! Delimited text parsing with delimiter sniffing.
//!
//! Official school lists arrive as comma, semicolon, or tab separated
//! exports depending on which spreadsheet tool produced them. The
//! delimiter is guessed from the first few lines, then the text is parsed
//! with the `csv` crate so quoted fields (embedded delimiters, doubled
//! quotes) are handled correctly.

use crate::SourceError;

/// Candidate delimiters, in tie-break order.
pub const CANDIDATE_DELIMITERS: &[u8] = b",;\t";

/// Number of leading lines inspected when guessing the delimiter.
const SNIFF_LINES: usize = 5;

/// A parsed delimited document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    /// Trimmed header names, in column order.
    pub headers: Vec<String>,
    /// Trimmed field values; rows may be shorter than the header.
    pub rows: Vec<Vec<String>>,
    /// Delimiter the document was parsed with.
    pub delimiter: u8,
}

impl CsvTable {
    /// Returns the value of column `index` in `row`, if present and
    /// non-empty.
    #[must_use]
    pub fn cell(row: &[String], index: usize) -> Option<&str> {
        row.get(index).map(String::as_str).filter(|s| !s.is_empty())
    }
}

/// Guesses the delimiter by counting candidates in the first lines.
///
/// The candidate with the strictly highest count wins; a tie for the
/// highest count, or no candidate at all, falls back to a comma.
#[must_use]
pub fn detect_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text.lines().take(SNIFF_LINES).collect();
    let counts: Vec<(u8, usize)> = CANDIDATE_DELIMITERS
        .iter()
        .map(|&d| {
            let count = sample
                .iter()
                .map(|line| line.bytes().filter(|&b| b == d).count())
                .sum();
            (d, count)
        })
        .collect();

    let best = counts.iter().map(|(_, c)| *c).max().unwrap_or(0);
    if best == 0 {
        return b',';
    }
    let mut winners = counts.iter().filter(|(_, c)| *c == best);
    match (winners.next(), winners.next()) {
        (Some((d, _)), None) => *d,
        _ => b',',
    }
}

/// Parses delimited text, sniffing the delimiter first.
///
/// # Errors
///
/// Returns [`SourceError::Csv`] on malformed input, or
/// [`SourceError::Normalization`] if there is no header row.
pub fn parse_csv(text: &str) -> Result<CsvTable, SourceError> {
    let text = text.trim_start_matches('\u{feff}');
    let delimiter = detect_delimiter(text);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(SourceError::Normalization {
            message: "CSV document contains no header row".to_owned(),
        });
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(|field| field.trim().to_owned()).collect());
    }

    log::debug!(
        "Parsed {} CSV rows with delimiter {:?}",
        rows.len(),
        char::from(delimiter)
    );

    Ok(CsvTable {
        headers,
        rows,
        delimiter,
    })
}
