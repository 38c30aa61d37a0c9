//! Pipeline specification models, options and top-level error types.

use std::path::Path;

use encoding_rs::Encoding;
use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};

use crate::conf::{
    C_DIVISION_TARGET_DEFAULT, derive_default_role_rules, derive_multi_sheet_role_rules,
};

////////////////////////////////////////////////////////////////////////////////
// #region InputSpecification

/// Declared kind of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumFileKind {
    /// Single-sheet delimited text.
    Csv,
    /// Multi-sheet workbook (xlsx/xlsm/xls/ods).
    Spreadsheet,
}

impl EnumFileKind {
    /// Select the flow from the original file name extension.
    ///
    /// The name is never parsed for data.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let c_ext = Path::new(file_name)
            .extension()?
            .to_string_lossy()
            .to_ascii_lowercase();
        match c_ext.as_str() {
            "csv" | "tsv" | "txt" => Some(Self::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }
}

/// Position of the header row inside each worksheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumHeaderRow {
    /// Header is the first worksheet row.
    First,
    /// Header is the row at this zero-based offset; rows above are discarded.
    ///
    /// `Offset(1)` handles a merged title row above the real header.
    Offset(usize),
}

impl Default for EnumHeaderRow {
    fn default() -> Self {
        Self::Offset(1)
    }
}

impl EnumHeaderRow {
    /// Zero-based index of the header row.
    pub fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Offset(n) => n,
        }
    }
}

/// Result of the encoding/delimiter sniff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecSniff {
    /// Text encoding used for decoding.
    pub encoding: &'static Encoding,
    /// Inferred field delimiter; `None` when inference failed.
    pub delimiter: Option<u8>,
}

/// Tabular decoder output before header normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecRawTable {
    /// Raw header cells (missing = `None`).
    pub headers: Vec<Option<String>>,
    /// Data rows, each padded/truncated to `headers.len()`.
    pub rows: Vec<Vec<Option<String>>>,
}

/// One decoded worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheet {
    /// Worksheet name as stored in the workbook.
    pub name: String,
    /// Decoded worksheet content.
    pub table: SpecRawTable,
}

/// Decoded workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecWorkbook {
    /// All worksheet names in file order.
    pub sheet_names: Vec<String>,
    /// Worksheets with a readable header row, in file order.
    pub sheets: Vec<SpecSheet>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RoleSpecification

/// Header predicate of a role rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumHeaderMatcher {
    /// Case-sensitive equality with any listed label.
    Exact(Vec<String>),
    /// Lowercased header contains any listed token.
    ContainsLowercase(Vec<String>),
}

impl EnumHeaderMatcher {
    /// Test one normalized header.
    pub fn is_match(&self, header: &str) -> bool {
        match self {
            Self::Exact(l_labels) => l_labels.iter().any(|c_label| c_label == header),
            Self::ContainsLowercase(l_tokens) => {
                let c_lower = header.to_lowercase();
                l_tokens
                    .iter()
                    .any(|c_token| c_lower.contains(&c_token.to_lowercase()))
            }
        }
    }
}

/// Role a rule assigns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumRoleKind {
    /// Employee name (at most one column).
    Name,
    /// Division/unit (at most one column).
    Division,
    /// Identifier column kept out of the course set.
    Excluded,
}

/// One `(predicate, role)` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRoleRule {
    /// Header predicate.
    pub matcher: EnumHeaderMatcher,
    /// Role assigned on match.
    pub role: EnumRoleKind,
}

/// Ordered role rule set.
///
/// Rules run in list order. `Name`/`Division` rules claim the first unclaimed
/// matching column in header order and are skipped once their role is taken;
/// `Excluded` rules claim every unclaimed matching column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRoleRules {
    /// Rules in evaluation order.
    pub rules: Vec<SpecRoleRule>,
    /// Use the first column as name column when no name rule matches.
    pub if_name_fallback_first_column: bool,
}

impl Default for SpecRoleRules {
    fn default() -> Self {
        derive_default_role_rules()
    }
}

/// Role assigned to one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EnumColumnRole {
    /// Employee-name column.
    Name,
    /// Division/unit column.
    Division,
    /// Course column with its header.
    Course(String),
    /// Identifier or otherwise excluded column.
    Ignored,
}

/// How the name column was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnumNameMatch {
    /// A name rule matched.
    Rule,
    /// No rule matched; first column used.
    FirstColumn,
}

/// Role assignment of one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecColumnRoles {
    /// `(header, role)` in header order.
    pub roles: Vec<(String, EnumColumnRole)>,
    /// Detected name column.
    pub name_column: Option<String>,
    /// Provenance of `name_column`.
    pub name_match: Option<EnumNameMatch>,
    /// Detected division column.
    pub division_column: Option<String>,
    /// Course columns in header order.
    pub course_columns: Vec<String>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DerivedModels

/// Row-major `rows x courses` pending flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecPendingMatrix {
    pub(crate) course_columns: Vec<String>,
    pub(crate) n_rows: usize,
    pub(crate) l_cells: Vec<bool>,
}

impl SpecPendingMatrix {
    /// Course columns, in matrix column order.
    pub fn course_columns(&self) -> &[String] {
        &self.course_columns
    }

    /// Number of dataset rows.
    pub fn height(&self) -> usize {
        self.n_rows
    }

    /// Number of course columns.
    pub fn width(&self) -> usize {
        self.course_columns.len()
    }

    /// Pending flags of one row; `None` past the last row.
    pub fn row(&self, n_idx_row: usize) -> Option<&[bool]> {
        if n_idx_row >= self.n_rows {
            return None;
        }
        let n_width = self.width();
        self.l_cells.get(n_idx_row * n_width..(n_idx_row + 1) * n_width)
    }

    /// Pending flag of one cell; `None` outside the matrix.
    pub fn is_pending(&self, n_idx_row: usize, n_idx_course: usize) -> Option<bool> {
        self.row(n_idx_row)?.get(n_idx_course).copied()
    }
}

/// Completion statistic of one subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecCompletionStat {
    /// Employee name or division label.
    pub subject: String,
    /// Course slots considered (rows x courses for multi-row subjects).
    pub total_courses: usize,
    /// Slots marked pending.
    pub pending_count: usize,
    /// Completed share in percent, rounded to 2 decimals.
    pub completion_percent: f64,
}

impl SpecCompletionStat {
    /// Slots not pending.
    pub fn completed_count(&self) -> usize {
        self.total_courses - self.pending_count
    }
}

/// Pending courses of one employee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecEmployeePending {
    /// Employee name as matched.
    pub employee_name: String,
    /// Number of dataset rows carrying that name.
    pub n_rows_matched: usize,
    /// Courses pending on at least one matched row, in course order.
    pub pending_courses: Vec<String>,
    /// Per-employee statistic over the course count.
    pub stat: SpecCompletionStat,
}

/// Axis ordering of the pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumAxisOrder {
    /// Lexicographic order.
    #[default]
    Sorted,
    /// Order of first appearance.
    FirstSeen,
}

/// Pivot cell value source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumPivotValueRule {
    /// Number of rows per `(key, course)`.
    #[default]
    RowCount,
    /// Number of distinct non-empty values of the named column.
    DistinctCount(String),
}

/// Pivot construction options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecPivotOptions {
    /// Add the office column to the row key when present.
    pub if_group_by_office: bool,
    /// Cell value source.
    pub rule_value: EnumPivotValueRule,
    /// Ordering of row keys and course columns.
    pub rule_order: EnumAxisOrder,
    /// Append a trailing total row.
    pub if_total_row: bool,
}

impl Default for SpecPivotOptions {
    fn default() -> Self {
        Self {
            if_group_by_office: false,
            rule_value: EnumPivotValueRule::RowCount,
            rule_order: EnumAxisOrder::Sorted,
            if_total_row: false,
        }
    }
}

/// One pivot row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecPivotRow {
    /// Key values aligned with `SpecPivotTable::key_columns`.
    pub keys: Vec<String>,
    /// Counts aligned with `SpecPivotTable::course_columns`.
    pub counts: Vec<i64>,
    /// Sum of `counts`.
    pub total: i64,
}

/// Employee x course matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecPivotTable {
    /// Row key headers.
    pub key_columns: Vec<String>,
    /// Course headers.
    pub course_columns: Vec<String>,
    /// Body rows.
    pub rows: Vec<SpecPivotRow>,
    /// Optional trailing total row.
    pub total_row: Option<SpecPivotRow>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Sheet consolidation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecConsolidateOptions {
    /// Scan every cell for the target when a sheet has no division column.
    pub if_scan_cells_without_division: bool,
    /// Zero-based column used as office when no header matches.
    ///
    /// Positional detection is fragile; off by default.
    pub office_column_position_fallback: Option<usize>,
    /// Per-sheet role rules.
    pub role_rules: SpecRoleRules,
}

impl Default for SpecConsolidateOptions {
    fn default() -> Self {
        Self {
            if_scan_cells_without_division: false,
            office_column_position_fallback: None,
            role_rules: derive_multi_sheet_role_rules(),
        }
    }
}

/// Options of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecPipelineOptions {
    /// Division label matched by substring (case-insensitive).
    pub division_target: String,
    /// Worksheet header row position.
    pub header_row: EnumHeaderRow,
    /// Role rules for CSV pivots.
    pub role_rules: SpecRoleRules,
    /// Consolidation options.
    pub consolidate: SpecConsolidateOptions,
    /// Pivot options.
    pub pivot: SpecPivotOptions,
}

impl Default for SpecPipelineOptions {
    fn default() -> Self {
        Self {
            division_target: C_DIVISION_TARGET_DEFAULT.to_string(),
            header_row: EnumHeaderRow::default(),
            role_rules: derive_default_role_rules(),
            consolidate: SpecConsolidateOptions::default(),
            pivot: SpecPivotOptions::default(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Terminal failures of one pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum CourseKitError {
    /// File structurally unreadable.
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Role detection left no course columns.
    #[error("No course columns detected (headers: {headers:?})")]
    NoCourseColumns {
        /// Normalized headers that were inspected.
        headers: Vec<String>,
    },
    /// Consolidation kept zero rows across all sheets.
    #[error("No {target} data found in any of {n_sheets} sheet(s)")]
    NoMatchingData {
        /// Division label searched for.
        target: String,
        /// Number of sheets scanned.
        n_sheets: usize,
    },
    /// A canonical column needed downstream is absent.
    #[error("Missing required column: {0}")]
    MissingRequiredColumn(String),
    /// Employee lookup matched no row.
    #[error("Employee not found: {0}")]
    EmployeeNotFound(String),
    /// Dataset construction failed.
    #[error("Dataset error: {0}")]
    Dataset(#[from] PolarsError),
    /// Workbook serialization failed.
    #[error("Export error: {0}")]
    Export(String),
}

/// Result alias of the core crate.
pub type Result<T> = std::result::Result<T, CourseKitError>;

// #endregion
////////////////////////////////////////////////////////////////////////////////
