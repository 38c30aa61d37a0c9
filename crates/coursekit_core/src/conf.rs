//! Domain constants and default preset factories.

use crate::spec::{
    EnumHeaderMatcher, EnumRoleKind, SpecPipelineOptions, SpecRoleRule, SpecRoleRules,
};

/// Leading bytes inspected by the encoding sniffer.
pub const N_LEN_ENCODING_SNIFF_BYTES: usize = 20_000;
/// Leading lines inspected by the delimiter sniffer.
pub const N_LINES_DELIMITER_SNIFF: usize = 10;
/// Delimiter candidates in preference order.
pub const TUP_DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];
/// Delimiter used when inference fails.
pub const C_DELIMITER_FALLBACK: u8 = b',';

/// Placeholder for missing/blank headers.
pub const C_HEADER_PLACEHOLDER: &str = "Unnamed";

/// Marker of a pending (not completed) course.
pub const C_PENDING_MARKER: &str = "1";
/// Division label searched for (case-insensitive substring).
pub const C_DIVISION_TARGET_DEFAULT: &str = "RMS TP";

/// Case-sensitive allowlist of employee-name headers; the earliest present header wins.
pub const TUP_NAME_COLUMN_ALLOWLIST: [&str; 4] =
    ["Employee Name", "Name of the Official", "Name", "Employee"];
/// Lowercase tokens marking a division/unit column.
pub const TUP_DIVISION_TOKENS: [&str; 3] = ["division", "unit", "region"];
/// Lowercase tokens marking identifier columns excluded from courses.
pub const TUP_EXCLUDED_TOKENS: [&str; 3] = ["s.no", "sr.no", "emp"];
/// Lowercase tokens marking a name column in multi-sheet workbooks.
pub const TUP_NAME_TOKENS_MULTI_SHEET: [&str; 1] = ["name"];
/// Lowercase tokens marking an employee-number column.
pub const TUP_EMPLOYEE_NO_TOKENS: [&str; 6] = [
    "emp no",
    "emp. no",
    "employee no",
    "employee number",
    "emp id",
    "employee id",
];
/// Lowercase tokens marking an office-of-working column.
pub const TUP_OFFICE_TOKENS: [&str; 1] = ["office"];

/// Canonical employee-name label after consolidation.
pub const C_COL_EMPLOYEE_NAME: &str = "Employee Name";
/// Canonical employee-number label after consolidation.
pub const C_COL_EMPLOYEE_NO: &str = "Employee No.";
/// Canonical office label after consolidation.
pub const C_COL_OFFICE: &str = "Office of Working";
/// Sheet-name tag column added by consolidation.
pub const C_COL_COURSE_NAME: &str = "Course Name";
/// Trailing pivot total column.
pub const C_COL_TOTAL_COURSES: &str = "Total Courses";
/// Pending export column holding the course name.
pub const C_COL_PENDING_COURSE: &str = "Pending Course";
/// Key label of the optional pivot total row.
pub const C_ROW_LABEL_TOTAL: &str = "Total";

/// Sheet name of the pending-courses export.
pub const C_SHEET_PENDING: &str = "Pending";
/// Sheet name of the pivot export.
pub const C_SHEET_PIVOT: &str = "Pivot";
/// File name suggested for the pivot export.
pub const C_FILE_PIVOT: &str = "pivot_summary.xlsx";

/// Minimum query length before search narrows the name list.
pub const N_LEN_SEARCH_QUERY_MIN: usize = 4;

/// Subject label used when no division column is present.
pub const C_SUBJECT_OVERALL: &str = "Overall";

fn derive_owned(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(ToString::to_string).collect()
}

/// Build the role rules used for single-sheet CSV pivots.
///
/// Rules are evaluated top-to-bottom per column; the first match wins.
pub fn derive_default_role_rules() -> SpecRoleRules {
    SpecRoleRules {
        rules: vec![
            SpecRoleRule {
                matcher: EnumHeaderMatcher::Exact(derive_owned(&TUP_NAME_COLUMN_ALLOWLIST)),
                role: EnumRoleKind::Name,
            },
            SpecRoleRule {
                matcher: EnumHeaderMatcher::ContainsLowercase(derive_owned(&TUP_DIVISION_TOKENS)),
                role: EnumRoleKind::Division,
            },
            SpecRoleRule {
                matcher: EnumHeaderMatcher::ContainsLowercase(derive_owned(&TUP_EXCLUDED_TOKENS)),
                role: EnumRoleKind::Excluded,
            },
        ],
        if_name_fallback_first_column: true,
    }
}

/// Build the role rules used per sheet during consolidation.
///
/// Adds the lowercase `name` token rule and disables the first-column fallback,
/// so identifier columns are never renamed to the canonical name label.
pub fn derive_multi_sheet_role_rules() -> SpecRoleRules {
    let mut rules = derive_default_role_rules();
    rules.rules.insert(
        1,
        SpecRoleRule {
            matcher: EnumHeaderMatcher::ContainsLowercase(derive_owned(
                &TUP_NAME_TOKENS_MULTI_SHEET,
            )),
            role: EnumRoleKind::Name,
        },
    );
    rules.if_name_fallback_first_column = false;
    rules
}

/// Build default pipeline options.
pub fn derive_default_pipeline_options() -> SpecPipelineOptions {
    SpecPipelineOptions::default()
}

/// Matcher for employee-number headers.
pub fn derive_employee_no_matcher() -> EnumHeaderMatcher {
    EnumHeaderMatcher::ContainsLowercase(derive_owned(&TUP_EMPLOYEE_NO_TOKENS))
}

/// Matcher for office-of-working headers.
pub fn derive_office_matcher() -> EnumHeaderMatcher {
    EnumHeaderMatcher::ContainsLowercase(derive_owned(&TUP_OFFICE_TOKENS))
}
