//! Byte-level decoders for uploaded CSV and workbook files.
//!
//! Decoders produce [`SpecRawTable`]s; header normalization happens later.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, warn};

use crate::conf::{
    C_DELIMITER_FALLBACK, N_LEN_ENCODING_SNIFF_BYTES, N_LINES_DELIMITER_SNIFF,
    TUP_DELIMITER_CANDIDATES,
};
use crate::spec::{
    CourseKitError, EnumHeaderRow, Result, SpecRawTable, SpecSheet, SpecSniff, SpecWorkbook,
};
use crate::util::{format_number_text, normalize_cell_text};

/// Minimum share of sniffed lines that must agree on a delimiter count.
const N_RATIO_DELIMITER_CONSISTENCY_MIN: f64 = 0.8;

////////////////////////////////////////////////////////////////////////////////
// #region Sniffing

/// Infer text encoding and field delimiter from the leading bytes.
pub fn sniff(v_bytes: &[u8]) -> SpecSniff {
    let encoding = sniff_encoding(v_bytes);
    let n_len_sample = usize::min(v_bytes.len(), N_LEN_ENCODING_SNIFF_BYTES);
    let (c_sample, _) = encoding.decode_with_bom_removal(&v_bytes[..n_len_sample]);
    let delimiter = sniff_delimiter(&c_sample);

    debug!(
        encoding = encoding.name(),
        delimiter = ?delimiter.map(char::from),
        "Sniffed delimited text"
    );
    SpecSniff { encoding, delimiter }
}

/// Guess the text encoding.
///
/// A byte-order mark wins. Otherwise a statistical guess is used, except that
/// an unconfident guess over valid UTF-8 bytes resolves to UTF-8.
pub fn sniff_encoding(v_bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(v_bytes) {
        return encoding;
    }

    let n_len_sample = usize::min(v_bytes.len(), N_LEN_ENCODING_SNIFF_BYTES);
    let v_sample = &v_bytes[..n_len_sample];
    let mut detector = EncodingDetector::new();
    detector.feed(v_sample, n_len_sample == v_bytes.len());
    let (encoding, if_confident) = detector.guess_assess(None, true);
    resolve_encoding_guess(encoding, if_confident, v_sample)
}

/// Keep a confident guess; an unconfident one yields to UTF-8 only when the
/// sample decodes as UTF-8.
fn resolve_encoding_guess(
    guess: &'static Encoding,
    if_confident: bool,
    v_sample: &[u8],
) -> &'static Encoding {
    if if_confident || !is_utf8_prefix(v_sample) {
        guess
    } else {
        UTF_8
    }
}

/// Test whether bytes are valid UTF-8, tolerating a sequence cut at the end.
fn is_utf8_prefix(v_bytes: &[u8]) -> bool {
    match std::str::from_utf8(v_bytes) {
        Ok(_) => true,
        Err(err) => err.error_len().is_none(),
    }
}

/// Pick the candidate delimiter with the most consistent per-line count.
///
/// Quoted sections are skipped while counting. Returns `None` when no
/// candidate appears consistently.
pub fn sniff_delimiter(text: &str) -> Option<u8> {
    let l_lines = text
        .lines()
        .filter(|c_line| !c_line.trim().is_empty())
        .take(N_LINES_DELIMITER_SNIFF)
        .collect::<Vec<_>>();
    if l_lines.is_empty() {
        return None;
    }

    let mut best: Option<(u8, f64, usize)> = None;
    for n_delim in TUP_DELIMITER_CANDIDATES {
        let l_counts = l_lines
            .iter()
            .map(|c_line| count_unquoted(c_line, n_delim))
            .collect::<Vec<_>>();
        let Some((n_count_mode, n_lines_mode)) = derive_count_mode(&l_counts) else {
            continue;
        };

        let n_ratio = n_lines_mode as f64 / l_lines.len() as f64;
        if n_ratio < N_RATIO_DELIMITER_CONSISTENCY_MIN {
            continue;
        }

        let if_better = match best {
            None => true,
            Some((_, n_ratio_best, n_count_best)) => {
                n_ratio > n_ratio_best || (n_ratio == n_ratio_best && n_count_mode > n_count_best)
            }
        };
        if if_better {
            best = Some((n_delim, n_ratio, n_count_mode));
        }
    }

    best.map(|(n_delim, _, _)| n_delim)
}

fn count_unquoted(line: &str, n_delim: u8) -> usize {
    let mut if_in_quotes = false;
    let mut n_count = 0;
    for n_byte in line.bytes() {
        if n_byte == b'"' {
            if_in_quotes = !if_in_quotes;
        } else if n_byte == n_delim && !if_in_quotes {
            n_count += 1;
        }
    }
    n_count
}

/// Most frequent non-zero count and how many lines carry it.
fn derive_count_mode(l_counts: &[usize]) -> Option<(usize, usize)> {
    let mut l_freq: Vec<(usize, usize)> = Vec::new();
    for &n_count in l_counts.iter().filter(|n| **n > 0) {
        match l_freq.iter_mut().find(|(n_value, _)| *n_value == n_count) {
            Some((_, n_freq)) => *n_freq += 1,
            None => l_freq.push((n_count, 1)),
        }
    }
    l_freq
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CsvDecoding

/// Decode an uploaded CSV buffer into a raw table.
///
/// Short rows are padded with missing cells; surplus cells are dropped.
pub fn decode_csv(v_bytes: &[u8]) -> Result<SpecRawTable> {
    if v_bytes.is_empty() {
        return Err(CourseKitError::ParseError("Empty file".to_string()));
    }

    let cfg_sniff = sniff(v_bytes);
    let (c_text, encoding_used, if_had_errors) = cfg_sniff.encoding.decode(v_bytes);
    if if_had_errors {
        warn!(
            encoding = encoding_used.name(),
            "Malformed byte sequences replaced while decoding"
        );
    }

    let n_delim = cfg_sniff.delimiter.unwrap_or(C_DELIMITER_FALLBACK);
    match parse_delimited(&c_text, n_delim) {
        Ok(table) => Ok(table),
        Err(err) if n_delim != C_DELIMITER_FALLBACK => {
            warn!(
                delimiter = %char::from(n_delim),
                error = %err,
                "Retrying with fallback delimiter"
            );
            parse_delimited(&c_text, C_DELIMITER_FALLBACK)
        }
        Err(err) => Err(err),
    }
}

fn parse_delimited(text: &str, n_delim: u8) -> Result<SpecRawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(n_delim)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut l_records: Vec<Vec<Option<String>>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CourseKitError::ParseError(format!("Invalid CSV: {e}")))?;
        l_records.push(record.iter().map(normalize_cell_text).collect());
    }

    let mut it_records = l_records.into_iter();
    let headers = it_records.next().unwrap_or_default();
    if headers.iter().all(Option::is_none) {
        return Err(CourseKitError::ParseError(
            "No header row found".to_string(),
        ));
    }

    Ok(create_raw_table(headers, it_records.collect()))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorkbookDecoding

/// Decode an uploaded workbook into raw tables, one per readable sheet.
///
/// `header_row` is counted from the first worksheet row. Sheets too short to
/// hold the header row are skipped.
pub fn decode_spreadsheet(v_bytes: &[u8], header_row: EnumHeaderRow) -> Result<SpecWorkbook> {
    if v_bytes.is_empty() {
        return Err(CourseKitError::ParseError("Empty file".to_string()));
    }

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(v_bytes.to_vec()))
        .map_err(|e| CourseKitError::ParseError(format!("Unreadable workbook: {e}")))?;
    let l_sheet_names = workbook.sheet_names();
    if l_sheet_names.is_empty() {
        return Err(CourseKitError::ParseError(
            "Workbook contains no sheets".to_string(),
        ));
    }

    let mut l_sheets = Vec::with_capacity(l_sheet_names.len());
    for c_sheet_name in &l_sheet_names {
        let range = match workbook.worksheet_range(c_sheet_name) {
            Ok(range) => range,
            Err(err) => {
                warn!(sheet = %c_sheet_name, error = %err, "Skipping unreadable sheet");
                continue;
            }
        };

        let n_row_origin = range.start().map_or(0, |(n_row, _)| n_row as usize);
        let l_rows = range
            .rows()
            .map(|row| row.iter().map(derive_cell_text).collect::<Vec<_>>())
            .collect::<Vec<_>>();

        match split_header_row(l_rows, header_row.index().saturating_sub(n_row_origin)) {
            Some(table) => l_sheets.push(SpecSheet {
                name: c_sheet_name.clone(),
                table,
            }),
            None => debug!(sheet = %c_sheet_name, "Skipping sheet without header row"),
        }
    }

    Ok(SpecWorkbook {
        sheet_names: l_sheet_names,
        sheets: l_sheets,
    })
}

/// Render one workbook cell as text.
///
/// Integral floats lose their fraction; error and empty cells are missing.
pub fn derive_cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(val) => normalize_cell_text(val),
        Data::Int(val) => Some(val.to_string()),
        Data::Float(val) => Some(format_number_text(*val)),
        Data::Bool(val) => Some(if *val { "True" } else { "False" }.to_string()),
        other => normalize_cell_text(&other.to_string()),
    }
}

fn split_header_row(
    l_rows: Vec<Vec<Option<String>>>,
    n_idx_header: usize,
) -> Option<SpecRawTable> {
    let mut it_rows = l_rows.into_iter().skip(n_idx_header);
    let headers = it_rows.next()?;
    Some(create_raw_table(headers, it_rows.collect()))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Shared

/// Align rows to the header width and drop rows without any value.
fn create_raw_table(
    headers: Vec<Option<String>>,
    l_rows: Vec<Vec<Option<String>>>,
) -> SpecRawTable {
    let n_width = headers.len();
    let mut n_rows_truncated = 0_usize;

    let rows = l_rows
        .into_iter()
        .filter(|row| row.iter().any(Option::is_some))
        .map(|mut row| {
            if row.len() > n_width {
                if row[n_width..].iter().any(Option::is_some) {
                    n_rows_truncated += 1;
                }
                row.truncate(n_width);
            }
            row.resize(n_width, None);
            row
        })
        .collect::<Vec<_>>();

    if n_rows_truncated > 0 {
        warn!(
            n_rows = n_rows_truncated,
            n_width, "Dropped cells beyond the header width"
        );
    }

    SpecRawTable { headers, rows }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use encoding_rs::WINDOWS_1252;

    use super::*;
    use crate::testing::create_workbook_bytes;

    fn derive_some(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| normalize_cell_text(v)).collect()
    }

    #[test]
    fn test_sniff_delimiter_prefers_consistent_candidate() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n4;5;6\n"), Some(b';'));
        assert_eq!(sniff_delimiter("a,b\n\"x,y\",2\n3,4\n"), Some(b','));
        assert_eq!(sniff_delimiter("a\tb\n1\t2\n"), Some(b'\t'));
        assert_eq!(sniff_delimiter("single\ncolumn\n"), None);
    }

    #[test]
    fn test_sniff_encoding_defaults_to_utf8_for_ascii() {
        assert_eq!(sniff_encoding(b"Name,Division\nAlice,RMS TP\n"), UTF_8);
        assert_eq!(sniff_encoding("Name\nJosé\n".as_bytes()), UTF_8);
    }

    #[test]
    fn test_unconfident_guess_yields_to_utf8_only_for_utf8_bytes() {
        assert_eq!(
            resolve_encoding_guess(WINDOWS_1252, false, "José".as_bytes()),
            UTF_8
        );
        assert_eq!(
            resolve_encoding_guess(WINDOWS_1252, false, b"Jos\xe9 R\xe9my"),
            WINDOWS_1252
        );
        assert_eq!(
            resolve_encoding_guess(WINDOWS_1252, true, b"plain ascii"),
            WINDOWS_1252
        );
    }

    #[test]
    fn test_decode_csv_semicolon_and_padding() {
        let table = decode_csv(
            b"Name;Division;A;B\nAlice;RMS TP;1;0\nCara;RMS TP;1;1\nDev;RMS HQ;0;0\nBob;RMS TP;0\n",
        )
        .unwrap();

        assert_eq!(table.headers, derive_some(&["Name", "Division", "A", "B"]));
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.rows[3], derive_some(&["Bob", "RMS TP", "0", ""]));
    }

    #[test]
    fn test_decode_csv_truncates_surplus_cells() {
        let table = decode_csv(b"Name,A\nAlice,1,extra\n").unwrap();
        assert_eq!(table.rows[0], derive_some(&["Alice", "1"]));
    }

    #[test]
    fn test_decode_csv_strips_utf8_bom() {
        let table = decode_csv(b"\xEF\xBB\xBFName,A\nAlice,1\n").unwrap();
        assert_eq!(table.headers[0].as_deref(), Some("Name"));
    }

    #[test]
    fn test_decode_csv_legacy_single_byte_encoding() {
        let v_bytes = b"Name,Division\nFr\xe9d\xe9ric H\xe9l\xe8ne,G\xe9n\xe9ral Unit\xe9\nAndr\xe9 R\xe9my,Soci\xe9t\xe9 G\xe9n\xe9rale\n";
        let table = decode_csv(v_bytes).unwrap();
        assert_eq!(table.rows[0][0].as_deref(), Some("Frédéric Hélène"));
    }

    #[test]
    fn test_decode_csv_empty_buffer_is_parse_error() {
        assert!(matches!(decode_csv(b""), Err(CourseKitError::ParseError(_))));
        assert!(matches!(decode_csv(b"  \n\n"), Err(CourseKitError::ParseError(_))));
    }

    #[test]
    fn test_decode_spreadsheet_offset_header_and_number_text() {
        let v_bytes = create_workbook_bytes(&[(
            "Safety",
            vec![
                vec!["Safety Training 2024"],
                vec!["Name of the Official", "Unit", "Score"],
                vec!["Alice", "RMS TP", "1"],
            ],
        )]);

        let workbook = decode_spreadsheet(&v_bytes, EnumHeaderRow::default()).unwrap();

        assert_eq!(workbook.sheet_names, vec!["Safety".to_string()]);
        let table = &workbook.sheets[0].table;
        assert_eq!(table.headers, derive_some(&["Name of the Official", "Unit", "Score"]));
        assert_eq!(table.rows, vec![derive_some(&["Alice", "RMS TP", "1"])]);
    }

    #[test]
    fn test_decode_spreadsheet_skips_sheet_without_header_row() {
        let v_bytes = create_workbook_bytes(&[
            ("Title Only", vec![vec!["Just a title"]]),
            ("First", vec![vec!["Name", "Division"], vec!["Bob", "RMS TP"]]),
        ]);

        let workbook = decode_spreadsheet(&v_bytes, EnumHeaderRow::First).unwrap();

        assert_eq!(workbook.sheet_names.len(), 2);
        assert_eq!(workbook.sheets.len(), 2);
        assert_eq!(workbook.sheets[1].table.rows.len(), 1);

        let workbook = decode_spreadsheet(&v_bytes, EnumHeaderRow::Offset(1)).unwrap();
        assert_eq!(workbook.sheets.len(), 1);
        assert_eq!(workbook.sheets[0].name, "First");
    }

    #[test]
    fn test_decode_spreadsheet_rejects_garbage() {
        assert!(matches!(
            decode_spreadsheet(b"not a workbook", EnumHeaderRow::First),
            Err(CourseKitError::ParseError(_))
        ));
    }

    #[test]
    fn test_derive_cell_text_variants() {
        assert_eq!(derive_cell_text(&Data::Float(3.0)).as_deref(), Some("3"));
        assert_eq!(derive_cell_text(&Data::Float(2.5)).as_deref(), Some("2.5"));
        assert_eq!(derive_cell_text(&Data::Int(7)).as_deref(), Some("7"));
        assert_eq!(derive_cell_text(&Data::Empty), None);
        assert_eq!(derive_cell_text(&Data::String("  ".to_string())), None);
    }
}
