//! Pending/complete classification of course cells.

use polars::prelude::DataFrame;

use crate::conf::C_PENDING_MARKER;
use crate::spec::{Result, SpecColumnRoles, SpecPendingMatrix};
use crate::util::derive_column_texts;

/// A cell is pending iff its trimmed text equals the pending marker.
///
/// Missing cells are never pending; no other truthy value counts.
pub fn is_pending(cell: Option<&str>) -> bool {
    cell.is_some_and(|c_cell| c_cell.trim() == C_PENDING_MARKER)
}

/// Evaluate every `(row, course)` cell of a dataset.
pub fn build_pending_matrix(df: &DataFrame, roles: &SpecColumnRoles) -> Result<SpecPendingMatrix> {
    let n_rows = df.height();
    let n_width = roles.course_columns.len();

    let mut l_cells = vec![false; n_rows * n_width];
    for (n_idx_course, c_course) in roles.course_columns.iter().enumerate() {
        let l_texts = derive_column_texts(df, c_course)?;
        for (n_idx_row, cell) in l_texts.iter().enumerate() {
            l_cells[n_idx_row * n_width + n_idx_course] = is_pending(cell.as_deref());
        }
    }

    Ok(SpecPendingMatrix {
        course_columns: roles.course_columns.clone(),
        n_rows,
        l_cells,
    })
}
