//! Completion statistics over row subsets, employee lookup and search.

use std::collections::BTreeSet;

use polars::prelude::DataFrame;
use tracing::debug;

use crate::conf::{
    C_COL_EMPLOYEE_NAME, C_COL_PENDING_COURSE, C_SUBJECT_OVERALL, N_LEN_SEARCH_QUERY_MIN,
};
use crate::spec::{
    CourseKitError, Result, SpecColumnRoles, SpecCompletionStat, SpecEmployeePending,
    SpecPendingMatrix,
};
use crate::util::{contains_case_insensitive, create_text_dataset, derive_column_texts, round_2};

////////////////////////////////////////////////////////////////////////////////
// #region Completion

/// Completed share in percent, rounded to 2 decimals; `0` for an empty total.
pub fn derive_completion_percent(n_total: usize, n_pending: usize) -> f64 {
    if n_total == 0 {
        return 0.0;
    }
    round_2(100.0 * (n_total - n_pending) as f64 / n_total as f64)
}

/// Completion percent over `rows x courses` slots.
pub fn completion(l_rows: &[usize], matrix: &SpecPendingMatrix) -> f64 {
    completion_stat("", l_rows, matrix).completion_percent
}

/// Completion statistic over `rows x courses` slots.
///
/// Row indices past the matrix height are ignored.
pub fn completion_stat(
    subject: &str,
    l_rows: &[usize],
    matrix: &SpecPendingMatrix,
) -> SpecCompletionStat {
    let l_flags = l_rows
        .iter()
        .filter_map(|n_idx_row| matrix.row(*n_idx_row))
        .collect::<Vec<_>>();
    let n_total = l_flags.len() * matrix.width();
    let n_pending = l_flags
        .iter()
        .map(|l_row| l_row.iter().filter(|b| **b).count())
        .sum();

    SpecCompletionStat {
        subject: subject.to_string(),
        total_courses: n_total,
        pending_count: n_pending,
        completion_percent: derive_completion_percent(n_total, n_pending),
    }
}

/// Completion over every row.
pub fn overall_completion(matrix: &SpecPendingMatrix) -> SpecCompletionStat {
    let l_rows = (0..matrix.height()).collect::<Vec<_>>();
    completion_stat(C_SUBJECT_OVERALL, &l_rows, matrix)
}

/// Rows whose division value contains `target` (case-insensitive).
///
/// `None` when the dataset has no division column.
pub fn select_division_rows(
    df: &DataFrame,
    roles: &SpecColumnRoles,
    target: &str,
) -> Result<Option<Vec<usize>>> {
    let Some(c_division) = roles.division_column.as_deref() else {
        return Ok(None);
    };
    let l_rows = derive_column_texts(df, c_division)?
        .iter()
        .enumerate()
        .filter(|(_, cell)| {
            cell.as_deref()
                .is_some_and(|c_value| contains_case_insensitive(c_value, target))
        })
        .map(|(n_idx_row, _)| n_idx_row)
        .collect();
    Ok(Some(l_rows))
}

/// Completion of the rows belonging to the target division.
pub fn division_completion(
    df: &DataFrame,
    roles: &SpecColumnRoles,
    matrix: &SpecPendingMatrix,
    target: &str,
) -> Result<Option<SpecCompletionStat>> {
    let stat = select_division_rows(df, roles, target)?
        .map(|l_rows| completion_stat(target, &l_rows, matrix));
    Ok(stat)
}

/// Division completion when a division column exists, overall otherwise.
pub fn headline_completion(
    df: &DataFrame,
    roles: &SpecColumnRoles,
    matrix: &SpecPendingMatrix,
    target: &str,
) -> Result<SpecCompletionStat> {
    Ok(division_completion(df, roles, matrix, target)?
        .unwrap_or_else(|| overall_completion(matrix)))
}

/// Completion per distinct division value, sorted by label.
///
/// Rows without a division value are left out.
pub fn division_breakdown(
    df: &DataFrame,
    roles: &SpecColumnRoles,
    matrix: &SpecPendingMatrix,
) -> Result<Vec<SpecCompletionStat>> {
    let Some(c_division) = roles.division_column.as_deref() else {
        return Ok(Vec::new());
    };
    let l_values = derive_column_texts(df, c_division)?
        .into_iter()
        .map(|cell| cell.map(|c_value| c_value.trim().to_string()))
        .collect::<Vec<_>>();

    let set_labels: BTreeSet<&str> = l_values.iter().flatten().map(String::as_str).collect();
    let l_stats = set_labels
        .into_iter()
        .map(|c_label| {
            let l_rows = l_values
                .iter()
                .enumerate()
                .filter(|(_, cell)| cell.as_deref() == Some(c_label))
                .map(|(n_idx_row, _)| n_idx_row)
                .collect::<Vec<_>>();
            completion_stat(c_label, &l_rows, matrix)
        })
        .collect();
    Ok(l_stats)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Employees

fn derive_name_texts(df: &DataFrame, roles: &SpecColumnRoles) -> Result<Vec<Option<String>>> {
    let c_name = roles
        .name_column
        .as_deref()
        .ok_or_else(|| CourseKitError::MissingRequiredColumn(C_COL_EMPLOYEE_NAME.to_string()))?;
    derive_column_texts(df, c_name)
}

/// Sorted distinct trimmed employee names.
pub fn list_employee_names(df: &DataFrame, roles: &SpecColumnRoles) -> Result<Vec<String>> {
    let set_names: BTreeSet<String> = derive_name_texts(df, roles)?
        .into_iter()
        .flatten()
        .map(|c_name| c_name.trim().to_string())
        .filter(|c_name| !c_name.is_empty())
        .collect();
    Ok(set_names.into_iter().collect())
}

/// Narrow a name list by case-insensitive substring.
///
/// Queries shorter than the minimum length return the full list.
pub fn search_employees(names: &[String], query: &str) -> Vec<String> {
    let c_query = query.trim();
    if c_query.chars().count() < N_LEN_SEARCH_QUERY_MIN {
        return names.to_vec();
    }
    names
        .iter()
        .filter(|c_name| contains_case_insensitive(c_name, c_query))
        .cloned()
        .collect()
}

/// Pending courses of one employee across every row carrying the name.
///
/// A course is pending if it is pending on any matched row.
pub fn employee_pending(
    df: &DataFrame,
    roles: &SpecColumnRoles,
    matrix: &SpecPendingMatrix,
    name: &str,
) -> Result<SpecEmployeePending> {
    let c_target = name.trim();
    let l_rows = derive_name_texts(df, roles)?
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.as_deref().map(str::trim) == Some(c_target))
        .map(|(n_idx_row, _)| n_idx_row)
        .collect::<Vec<_>>();
    if l_rows.is_empty() {
        return Err(CourseKitError::EmployeeNotFound(c_target.to_string()));
    }

    let pending_courses = matrix
        .course_columns()
        .iter()
        .enumerate()
        .filter(|(n_idx_course, _)| {
            l_rows
                .iter()
                .any(|n_idx_row| matrix.is_pending(*n_idx_row, *n_idx_course) == Some(true))
        })
        .map(|(_, c_course)| c_course.clone())
        .collect::<Vec<_>>();

    let n_total = matrix.width();
    let n_pending = pending_courses.len();
    debug!(
        employee = c_target,
        n_rows = l_rows.len(),
        n_pending,
        "Resolved employee pending courses"
    );

    Ok(SpecEmployeePending {
        employee_name: c_target.to_string(),
        n_rows_matched: l_rows.len(),
        pending_courses,
        stat: SpecCompletionStat {
            subject: c_target.to_string(),
            total_courses: n_total,
            pending_count: n_pending,
            completion_percent: derive_completion_percent(n_total, n_pending),
        },
    })
}

/// Two-column `(Employee Name, Pending Course)` table of one employee.
pub fn build_pending_table(pending: &SpecEmployeePending) -> Result<DataFrame> {
    let n_rows = pending.pending_courses.len();
    create_text_dataset(vec![
        (
            C_COL_EMPLOYEE_NAME.to_string(),
            vec![Some(pending.employee_name.clone()); n_rows],
        ),
        (
            C_COL_PENDING_COURSE.to_string(),
            pending.pending_courses.iter().cloned().map(Some).collect(),
        ),
    ])
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::build_pending_matrix;
    use crate::conf::derive_default_role_rules;
    use crate::roles::detect_roles;
    use crate::util::derive_headers;

    fn create_dataset(headers: &[&str], rows: &[&[&str]]) -> DataFrame {
        let l_columns: Vec<(String, Vec<Option<String>>)> = headers
            .iter()
            .enumerate()
            .map(|(n_idx_col, c_header)| {
                let l_cells: Vec<Option<String>> = rows
                    .iter()
                    .map(|row| Some(row[n_idx_col].to_string()).filter(|c| !c.is_empty()))
                    .collect();
                (c_header.to_string(), l_cells)
            })
            .collect();
        create_text_dataset(l_columns).unwrap()
    }

    fn derive_matrix(df: &DataFrame) -> (SpecColumnRoles, SpecPendingMatrix) {
        let roles = detect_roles(&derive_headers(df), &derive_default_role_rules()).unwrap();
        let matrix = build_pending_matrix(df, &roles).unwrap();
        (roles, matrix)
    }

    #[test]
    fn test_single_employee_completion() {
        let df = create_dataset(
            &["Name", "S.No", "Division", "CourseX", "CourseY"],
            &[&["Alice", "1", "RMS TP Zone", "1", "0"]],
        );
        let (roles, matrix) = derive_matrix(&df);
        assert_eq!(matrix.course_columns(), &["CourseX", "CourseY"]);

        let pending = employee_pending(&df, &roles, &matrix, "Alice").unwrap();
        assert_eq!(pending.pending_courses, vec!["CourseX"]);
        assert_eq!(pending.stat.completion_percent, 50.0);

        let headline = headline_completion(&df, &roles, &matrix, "rms tp").unwrap();
        assert_eq!(headline.subject, "rms tp");
        assert_eq!(headline.completion_percent, 50.0);
    }

    #[test]
    fn test_completion_bounds_and_counts() {
        let df = create_dataset(
            &["Name", "A", "B", "C"],
            &[&["Alice", "1", "1", "0"], &["Bob", "", "0", "1"]],
        );
        let (_, matrix) = derive_matrix(&df);

        let stat = overall_completion(&matrix);
        assert_eq!(stat.subject, "Overall");
        assert_eq!(stat.total_courses, 6);
        assert_eq!(stat.pending_count, 3);
        assert_eq!(stat.completed_count() + stat.pending_count, stat.total_courses);
        assert_eq!(stat.completion_percent, 50.0);

        assert_eq!(completion(&[], &matrix), 0.0);
        assert_eq!(completion(&[1], &matrix), 66.67);
    }

    #[test]
    fn test_completion_ignores_rows_past_height() {
        let df = create_dataset(&["Name", "A", "B"], &[&["Alice", "1", "0"]]);
        let (_, matrix) = derive_matrix(&df);

        let stat = completion_stat("Alice", &[0, 5], &matrix);
        assert_eq!(stat.total_courses, 2);
        assert_eq!(stat.pending_count, 1);
        assert_eq!(stat.completion_percent, 50.0);
        assert_eq!(completion(&[7], &matrix), 0.0);
    }

    #[test]
    fn test_headline_falls_back_to_overall_without_division() {
        let df = create_dataset(&["Name", "A"], &[&["Alice", "0"]]);
        let (roles, matrix) = derive_matrix(&df);

        let stat = headline_completion(&df, &roles, &matrix, "RMS TP").unwrap();
        assert_eq!(stat.subject, "Overall");
        assert_eq!(stat.completion_percent, 100.0);
    }

    #[test]
    fn test_division_target_without_rows_is_zero() {
        let df = create_dataset(&["Name", "Division", "A"], &[&["Alice", "RMS HQ", "0"]]);
        let (roles, matrix) = derive_matrix(&df);

        let stat = division_completion(&df, &roles, &matrix, "RMS TP")
            .unwrap()
            .unwrap();
        assert_eq!(stat.total_courses, 0);
        assert_eq!(stat.completion_percent, 0.0);
    }

    #[test]
    fn test_division_breakdown_groups_by_label() {
        let df = create_dataset(
            &["Name", "Division", "A"],
            &[
                &["Alice", "RMS TP", "1"],
                &["Bob", "RMS HQ", "0"],
                &["Cara", "RMS TP", "0"],
                &["Dev", "", "1"],
            ],
        );
        let (roles, matrix) = derive_matrix(&df);

        let l_stats = division_breakdown(&df, &roles, &matrix).unwrap();
        let l_subjects = l_stats.iter().map(|s| s.subject.as_str()).collect::<Vec<_>>();
        assert_eq!(l_subjects, vec!["RMS HQ", "RMS TP"]);
        assert_eq!(l_stats[1].completion_percent, 50.0);
    }

    #[test]
    fn test_employee_pending_merges_duplicate_rows() {
        let df = create_dataset(
            &["Name", "A", "B", "C"],
            &[&["Alice", "1", "0", "0"], &[" Alice ", "0", "0", "1"]],
        );
        let (roles, matrix) = derive_matrix(&df);

        let pending = employee_pending(&df, &roles, &matrix, "Alice").unwrap();
        assert_eq!(pending.n_rows_matched, 2);
        assert_eq!(pending.pending_courses, vec!["A", "C"]);
        assert_eq!(pending.stat.total_courses, 3);
        assert_eq!(pending.stat.completion_percent, 33.33);

        let table = build_pending_table(&pending).unwrap();
        assert_eq!(table.height(), 2);
        assert_eq!(derive_headers(&table), vec!["Employee Name", "Pending Course"]);
    }

    #[test]
    fn test_employee_pending_unknown_name() {
        let df = create_dataset(&["Name", "A"], &[&["Alice", "1"]]);
        let (roles, matrix) = derive_matrix(&df);

        assert!(matches!(
            employee_pending(&df, &roles, &matrix, "Zed"),
            Err(CourseKitError::EmployeeNotFound(_))
        ));
    }

    #[test]
    fn test_search_employees_min_query_length() {
        let df = create_dataset(
            &["Name", "A"],
            &[&["Suresh Kumar", "1"], &["Anita Rao", "0"], &["Suresh Kumar", "0"]],
        );
        let (roles, _) = derive_matrix(&df);
        let l_names = list_employee_names(&df, &roles).unwrap();
        assert_eq!(l_names, vec!["Anita Rao", "Suresh Kumar"]);

        assert_eq!(search_employees(&l_names, "kum"), l_names);
        assert_eq!(search_employees(&l_names, "KUMAR"), vec!["Suresh Kumar"]);
        assert!(search_employees(&l_names, "nobody").is_empty());
    }
}
