//! Multi-sheet consolidation into one tagged dataset.
//!
//! Consolidation is a fold: every sheet goes through [`filter_sheet`] on its
//! own, and surviving rows are appended with a column union in first-seen
//! order.

use polars::prelude::DataFrame;
use tracing::{debug, info, warn};

use crate::conf::{
    C_COL_COURSE_NAME, C_COL_EMPLOYEE_NAME, C_COL_EMPLOYEE_NO, C_COL_OFFICE,
    derive_employee_no_matcher, derive_office_matcher,
};
use crate::normalize::build_dataset;
use crate::report::{ReportConsolidate, ReportConsolidateBuilder};
use crate::roles::assign_roles;
use crate::spec::{
    CourseKitError, EnumNameMatch, Result, SpecColumnRoles, SpecConsolidateOptions, SpecSheet,
};
use crate::util::{
    contains_case_insensitive, create_text_dataset, derive_column_texts, derive_headers,
    derive_texts_from_column,
};

/// Consolidated dataset plus run diagnostics.
#[derive(Debug, Clone)]
pub struct SpecConsolidation {
    /// Rows of every sheet that matched the target, tagged with `Course Name`.
    pub dataset: DataFrame,
    /// Per-run counters and skipped sheets.
    pub report: ReportConsolidate,
}

////////////////////////////////////////////////////////////////////////////////
// #region SheetStep

/// Filter one sheet to the rows of the target division.
///
/// Returns `None` when no row survives; the reason is recorded in `report`.
/// Kept rows are tagged with the sheet name and detected identity columns
/// are renamed to their canonical labels.
pub fn filter_sheet(
    sheet: &SpecSheet,
    target: &str,
    options: &SpecConsolidateOptions,
    report: &mut ReportConsolidateBuilder,
) -> Result<Option<DataFrame>> {
    let df = build_dataset(&sheet.table)?;
    let l_headers = derive_headers(&df);
    let roles = assign_roles(&l_headers, &options.role_rules);

    let l_mask = match roles.division_column.as_deref() {
        Some(c_division) => derive_column_texts(&df, c_division)?
            .iter()
            .map(|cell| {
                cell.as_deref()
                    .is_some_and(|c_value| contains_case_insensitive(c_value, target))
            })
            .collect::<Vec<_>>(),
        None if options.if_scan_cells_without_division => derive_scan_mask(&df, target)?,
        None => {
            report.add_skipped(&sheet.name, "no division column");
            return Ok(None);
        }
    };

    let n_rows_kept = l_mask.iter().filter(|b| **b).count();
    if n_rows_kept == 0 {
        report.add_skipped(&sheet.name, format!("no rows matching {target:?}"));
        return Ok(None);
    }

    let mut l_columns = Vec::with_capacity(l_headers.len() + 1);
    for c_header in &l_headers {
        let l_cells = derive_column_texts(&df, c_header)?
            .into_iter()
            .zip(&l_mask)
            .filter_map(|(cell, if_keep)| if_keep.then_some(cell))
            .collect::<Vec<_>>();
        l_columns.push((c_header.clone(), l_cells));
    }

    let l_renames = derive_canonical_renames(&l_headers, &roles, options, report, &sheet.name);
    for (n_idx_col, c_canonical) in l_renames {
        let c_source = l_columns[n_idx_col].0.clone();
        if c_source == c_canonical {
            continue;
        }
        if l_columns.iter().any(|(c_name, _)| *c_name == c_canonical) {
            report.add_warning(format!(
                "Sheet {:?}: not renaming {c_source:?}, {c_canonical:?} already exists",
                sheet.name
            ));
            continue;
        }
        l_columns[n_idx_col].0 = c_canonical;
    }

    let l_tags = vec![Some(sheet.name.clone()); n_rows_kept];
    match l_columns
        .iter_mut()
        .find(|(c_name, _)| c_name == C_COL_COURSE_NAME)
    {
        Some((_, l_cells)) => *l_cells = l_tags,
        None => l_columns.push((C_COL_COURSE_NAME.to_string(), l_tags)),
    }

    debug!(sheet = %sheet.name, n_rows = n_rows_kept, "Kept sheet rows");
    report.add_kept(n_rows_kept);
    create_text_dataset(l_columns).map(Some)
}

/// Rows where any cell contains the target.
fn derive_scan_mask(df: &DataFrame, target: &str) -> Result<Vec<bool>> {
    let mut l_mask = vec![false; df.height()];
    for col in df.get_columns() {
        for (n_idx_row, cell) in derive_texts_from_column(col)?.iter().enumerate() {
            if cell
                .as_deref()
                .is_some_and(|c_value| contains_case_insensitive(c_value, target))
            {
                l_mask[n_idx_row] = true;
            }
        }
    }
    Ok(l_mask)
}

/// Column positions to rename and their canonical labels.
///
/// The name column is renamed only when a name rule matched it. Employee
/// number and office columns are found by header tokens; the office falls
/// back to a fixed position only when configured.
fn derive_canonical_renames(
    l_headers: &[String],
    roles: &SpecColumnRoles,
    options: &SpecConsolidateOptions,
    report: &mut ReportConsolidateBuilder,
    sheet_name: &str,
) -> Vec<(usize, String)> {
    let mut l_renames: Vec<(usize, String)> = Vec::new();
    let position_of = |c_target: &str| l_headers.iter().position(|c| c == c_target);

    if roles.name_match == Some(EnumNameMatch::Rule)
        && let Some(n_idx) = roles.name_column.as_deref().and_then(position_of)
    {
        l_renames.push((n_idx, C_COL_EMPLOYEE_NAME.to_string()));
    }

    let is_taken = |l_renames: &[(usize, String)], n_idx: usize| {
        l_renames.iter().any(|(n_idx_taken, _)| *n_idx_taken == n_idx)
            || roles.division_column.as_deref() == Some(l_headers[n_idx].as_str())
    };

    let matcher_employee_no = derive_employee_no_matcher();
    if let Some(n_idx) = (0..l_headers.len()).find(|n_idx| {
        !is_taken(&l_renames, *n_idx) && matcher_employee_no.is_match(&l_headers[*n_idx])
    }) {
        l_renames.push((n_idx, C_COL_EMPLOYEE_NO.to_string()));
    }

    let matcher_office = derive_office_matcher();
    let n_idx_office = (0..l_headers.len()).find(|n_idx| {
        !is_taken(&l_renames, *n_idx) && matcher_office.is_match(&l_headers[*n_idx])
    });
    match (n_idx_office, options.office_column_position_fallback) {
        (Some(n_idx), _) => l_renames.push((n_idx, C_COL_OFFICE.to_string())),
        (None, Some(n_idx)) if n_idx < l_headers.len() && !is_taken(&l_renames, n_idx) => {
            warn!(
                sheet = sheet_name,
                column = %l_headers[n_idx],
                "Office column taken by position"
            );
            report.add_warning(format!(
                "Sheet {sheet_name:?}: office column taken by position {n_idx} ({:?})",
                l_headers[n_idx]
            ));
            l_renames.push((n_idx, C_COL_OFFICE.to_string()));
        }
        _ => {}
    }

    l_renames
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Fold

/// Column-union accumulator of the consolidation fold.
#[derive(Debug, Default)]
struct SpecTableAccumulator {
    l_columns: Vec<(String, Vec<Option<String>>)>,
    n_rows: usize,
}

impl SpecTableAccumulator {
    fn append(mut self, df: &DataFrame) -> Result<Self> {
        for col in df.get_columns() {
            let c_name = col.name().to_string();
            let l_texts = derive_texts_from_column(col)?;
            match self.l_columns.iter_mut().find(|(c, _)| *c == c_name) {
                Some((_, l_cells)) => l_cells.extend(l_texts),
                None => {
                    let mut l_cells = vec![None; self.n_rows];
                    l_cells.extend(l_texts);
                    self.l_columns.push((c_name, l_cells));
                }
            }
        }

        self.n_rows += df.height();
        for (_, l_cells) in &mut self.l_columns {
            l_cells.resize(self.n_rows, None);
        }
        Ok(self)
    }
}

/// Consolidate every sheet's target-division rows into one dataset.
///
/// Sheets without matching rows are skipped and reported. Fails with
/// `NoMatchingData` when no sheet contributes a row.
pub fn consolidate(
    sheets: &[SpecSheet],
    target: &str,
    options: &SpecConsolidateOptions,
) -> Result<SpecConsolidation> {
    let mut report = ReportConsolidateBuilder::default();
    let acc = sheets
        .iter()
        .try_fold(SpecTableAccumulator::default(), |acc, sheet| {
            report.add_scanned();
            match filter_sheet(sheet, target, options, &mut report)? {
                Some(df) => acc.append(&df),
                None => Ok(acc),
            }
        })?;

    let report = report.build();
    if acc.n_rows == 0 {
        return Err(CourseKitError::NoMatchingData {
            target: target.to_string(),
            n_sheets: sheets.len(),
        });
    }

    info!("{report}");
    for skip in &report.skipped {
        debug!(sheet = %skip.sheet_name, reason = %skip.reason, "Skipped sheet");
    }

    Ok(SpecConsolidation {
        dataset: create_text_dataset(acc.l_columns)?,
        report,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_spreadsheet;
    use crate::spec::{EnumHeaderRow, SpecWorkbook};
    use crate::testing::create_workbook_bytes;

    fn decode_fixture(sheets: &[(&str, Vec<Vec<&str>>)]) -> SpecWorkbook {
        decode_spreadsheet(&create_workbook_bytes(sheets), EnumHeaderRow::First).unwrap()
    }

    fn derive_texts(df: &DataFrame, c_name: &str) -> Vec<Option<String>> {
        derive_column_texts(df, c_name).unwrap()
    }

    #[test]
    fn test_consolidate_keeps_target_rows_per_sheet() {
        let workbook = decode_fixture(&[
            (
                "Safety",
                vec![
                    vec!["S.No", "Name of the Official", "Unit", "Emp No", "Office"],
                    vec!["1", "Alice", "RMS TP East", "101", "Pune"],
                    vec!["2", "Bob", "RMS HQ", "102", "Delhi"],
                    vec!["3", "Cara", "rms tp east", "103", "Pune"],
                    vec!["4", "Dev", "RMS HQ", "104", "Delhi"],
                    vec!["5", "Eve", "RMS North", "105", "Agra"],
                ],
            ),
            (
                "Fire",
                vec![
                    vec!["Name", "Division"],
                    vec!["Faye", "RMS HQ"],
                ],
            ),
        ]);

        let result = consolidate(&workbook.sheets, "RMS TP", &SpecConsolidateOptions::default())
            .unwrap();
        let df = &result.dataset;

        assert_eq!(df.height(), 2);
        assert_eq!(
            derive_texts(df, C_COL_COURSE_NAME),
            vec![Some("Safety".to_string()); 2]
        );
        assert_eq!(
            derive_texts(df, C_COL_EMPLOYEE_NAME),
            vec![Some("Alice".to_string()), Some("Cara".to_string())]
        );
        assert_eq!(
            derive_texts(df, C_COL_EMPLOYEE_NO),
            vec![Some("101".to_string()), Some("103".to_string())]
        );
        assert!(df.column(C_COL_OFFICE).is_ok());

        assert_eq!(result.report.cnt_scanned, 2);
        assert_eq!(result.report.cnt_kept, 1);
        assert_eq!(result.report.skipped[0].sheet_name, "Fire");
    }

    #[test]
    fn test_consolidate_without_match_fails() {
        let workbook = decode_fixture(&[
            ("A", vec![vec!["Name", "Division"], vec!["Faye", "RMS HQ"]]),
            ("B", vec![vec!["Name", "Unit"], vec!["Gus", "North"]]),
        ]);

        let err = consolidate(&workbook.sheets, "RMS TP", &SpecConsolidateOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            CourseKitError::NoMatchingData { n_sheets: 2, .. }
        ));
    }

    #[test]
    fn test_consolidate_unions_columns_in_first_seen_order() {
        let workbook = decode_fixture(&[
            (
                "One",
                vec![vec!["Name", "Division", "Score"], vec!["Alice", "RMS TP", "9"]],
            ),
            (
                "Two",
                vec![vec!["Name", "Division", "Grade"], vec!["Bob", "RMS TP", "A"]],
            ),
        ]);

        let result = consolidate(&workbook.sheets, "RMS TP", &SpecConsolidateOptions::default())
            .unwrap();
        let df = &result.dataset;

        assert_eq!(
            derive_headers(df),
            vec!["Employee Name", "Division", "Score", "Course Name", "Grade"]
        );
        assert_eq!(derive_texts(df, "Score"), vec![Some("9".to_string()), None]);
        assert_eq!(derive_texts(df, "Grade"), vec![None, Some("A".to_string())]);
        assert_eq!(
            derive_texts(df, C_COL_COURSE_NAME),
            vec![Some("One".to_string()), Some("Two".to_string())]
        );
    }

    #[test]
    fn test_filter_sheet_scan_and_course_name_overwrite() {
        let workbook = decode_fixture(&[(
            "Drill",
            vec![
                vec!["Name", "Posting", "Course Name"],
                vec!["Alice", "RMS TP West", "old"],
                vec!["Bob", "RMS HQ", "old"],
            ],
        )]);
        let sheet = &workbook.sheets[0];

        let mut report = ReportConsolidateBuilder::default();
        let kept = filter_sheet(sheet, "RMS TP", &SpecConsolidateOptions::default(), &mut report)
            .unwrap();
        assert!(kept.is_none());

        let options = SpecConsolidateOptions {
            if_scan_cells_without_division: true,
            ..SpecConsolidateOptions::default()
        };
        let df = filter_sheet(sheet, "RMS TP", &options, &mut report)
            .unwrap()
            .unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(derive_headers(&df), vec!["Employee Name", "Posting", "Course Name"]);
        assert_eq!(derive_texts(&df, C_COL_COURSE_NAME), vec![Some("Drill".to_string())]);

        let report = report.build();
        assert_eq!(report.skipped[0].reason, "no division column");
    }

    #[test]
    fn test_filter_sheet_skips_colliding_rename() {
        let workbook = decode_fixture(&[(
            "Safety",
            vec![
                vec!["Name", "Emp No", "Employee No.", "Unit"],
                vec!["Alice", "101", "E-101", "RMS TP"],
            ],
        )]);

        let mut report = ReportConsolidateBuilder::default();
        let df = filter_sheet(
            &workbook.sheets[0],
            "RMS TP",
            &SpecConsolidateOptions::default(),
            &mut report,
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            derive_headers(&df),
            vec!["Employee Name", "Emp No", "Employee No.", "Unit", "Course Name"]
        );
        assert_eq!(report.build().warning_count(), 1);
    }

    #[test]
    fn test_filter_sheet_office_position_fallback() {
        let workbook = decode_fixture(&[(
            "Safety",
            vec![
                vec!["Name", "Unit", "Posted At"],
                vec!["Alice", "RMS TP", "Pune"],
            ],
        )]);
        let options = SpecConsolidateOptions {
            office_column_position_fallback: Some(2),
            ..SpecConsolidateOptions::default()
        };

        let mut report = ReportConsolidateBuilder::default();
        let df = filter_sheet(&workbook.sheets[0], "RMS TP", &options, &mut report)
            .unwrap()
            .unwrap();

        assert_eq!(derive_texts(&df, C_COL_OFFICE), vec![Some("Pune".to_string())]);
        assert_eq!(report.build().warning_count(), 1);
    }
}
