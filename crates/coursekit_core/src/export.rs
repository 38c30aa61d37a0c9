//! Workbook exports of pipeline tables.

use coursekit_io_xlsx::write_dataframe_to_xlsx_bytes;
use polars::prelude::DataFrame;

use crate::aggregate::build_pending_table;
use crate::conf::{C_SHEET_PENDING, C_SHEET_PIVOT};
use crate::spec::{CourseKitError, Result, SpecEmployeePending, SpecPivotTable};

/// Serialize a dataset to a single-sheet workbook.
pub fn export_table(df: &DataFrame, sheet_name: &str) -> Result<Vec<u8>> {
    write_dataframe_to_xlsx_bytes(df, sheet_name).map_err(CourseKitError::Export)
}

/// Serialize one employee's pending courses to the `Pending` sheet.
pub fn export_pending(pending: &SpecEmployeePending) -> Result<Vec<u8>> {
    export_table(&build_pending_table(pending)?, C_SHEET_PENDING)
}

/// Serialize a pivot to the `Pivot` sheet.
pub fn export_pivot(pivot: &SpecPivotTable) -> Result<Vec<u8>> {
    export_table(&pivot.to_dataframe()?, C_SHEET_PIVOT)
}

/// Suggested file name of a pending-courses export.
///
/// Characters other than letters, digits, `.` and `-` become `_`.
pub fn derive_pending_file_name(employee_name: &str) -> String {
    let c_stem = employee_name
        .trim()
        .chars()
        .map(|chr| {
            if chr.is_alphanumeric() || chr == '-' || chr == '.' {
                chr
            } else {
                '_'
            }
        })
        .collect::<String>();
    format!("{c_stem}_pending_courses.xlsx")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_spreadsheet;
    use crate::spec::{EnumHeaderRow, SpecCompletionStat, SpecPivotRow};

    #[test]
    fn test_export_pending_decodes_back() {
        let pending = SpecEmployeePending {
            employee_name: "Alice".to_string(),
            n_rows_matched: 1,
            pending_courses: vec!["CourseX".to_string(), "CourseZ".to_string()],
            stat: SpecCompletionStat {
                subject: "Alice".to_string(),
                total_courses: 3,
                pending_count: 2,
                completion_percent: 33.33,
            },
        };

        let v_bytes = export_pending(&pending).unwrap();
        let workbook = decode_spreadsheet(&v_bytes, EnumHeaderRow::First).unwrap();

        assert_eq!(workbook.sheet_names, vec!["Pending".to_string()]);
        let table = &workbook.sheets[0].table;
        assert_eq!(
            table.headers,
            vec![
                Some("Employee Name".to_string()),
                Some("Pending Course".to_string())
            ]
        );
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][1].as_deref(), Some("CourseZ"));
    }

    #[test]
    fn test_export_pivot_writes_counts_as_numbers() {
        let pivot = SpecPivotTable {
            key_columns: vec!["Employee Name".to_string()],
            course_columns: vec!["Fire".to_string(), "Safety".to_string()],
            rows: vec![SpecPivotRow {
                keys: vec!["Alice".to_string()],
                counts: vec![1, 2],
                total: 3,
            }],
            total_row: None,
        };

        let v_bytes = export_pivot(&pivot).unwrap();
        let workbook = decode_spreadsheet(&v_bytes, EnumHeaderRow::First).unwrap();

        let table = &workbook.sheets[0].table;
        assert_eq!(workbook.sheets[0].name, "Pivot");
        assert_eq!(table.headers.len(), 4);
        assert_eq!(table.rows[0][3].as_deref(), Some("3"));
    }

    #[test]
    fn test_derive_pending_file_name() {
        assert_eq!(
            derive_pending_file_name("Suresh Kumar"),
            "Suresh_Kumar_pending_courses.xlsx"
        );
        assert_eq!(derive_pending_file_name("A/B"), "A_B_pending_courses.xlsx");
    }
}
