//! Stateless helpers over string-typed datasets.

use polars::prelude::{AnyValue, Column, DataFrame};

use crate::spec::{CourseKitError, Result};

////////////////////////////////////////////////////////////////////////////////
// #region CellText

/// Normalize one raw cell: blank or whitespace-only text becomes `None`.
pub fn normalize_cell_text(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Render a float the way a spreadsheet shows it (`1.0` -> `"1"`).
pub fn format_number_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Case-insensitive substring test.
pub fn contains_case_insensitive(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Round to two decimals.
pub fn round_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn derive_text_from_any_value(value: AnyValue<'_>) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(val) => Some(val.to_string()),
        AnyValue::StringOwned(val) => Some(val.to_string()),
        AnyValue::Float32(val) => Some(format_number_text(val as f64)),
        AnyValue::Float64(val) => Some(format_number_text(val)),
        _ => Some(value.to_string()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DatasetAccess

/// Column names of a dataset, in order.
pub fn derive_headers(df: &DataFrame) -> Vec<String> {
    df.get_column_names_str()
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

/// Materialize one column as optional text cells.
pub fn derive_column_texts(df: &DataFrame, col_name: &str) -> Result<Vec<Option<String>>> {
    let col = df
        .column(col_name)
        .map_err(|_| CourseKitError::MissingRequiredColumn(col_name.to_string()))?;
    derive_texts_from_column(col)
}

/// Materialize a column as optional text cells.
pub fn derive_texts_from_column(col: &Column) -> Result<Vec<Option<String>>> {
    let mut l_texts = Vec::with_capacity(col.len());
    for n_idx_row in 0..col.len() {
        l_texts.push(derive_text_from_any_value(col.get(n_idx_row)?));
    }
    Ok(l_texts)
}

/// Build a string-typed dataset from `(name, cells)` pairs.
pub fn create_text_dataset(columns: Vec<(String, Vec<Option<String>>)>) -> Result<DataFrame> {
    let l_cols = columns
        .into_iter()
        .map(|(c_name, l_cells)| Column::new(c_name.into(), l_cells))
        .collect::<Vec<_>>();
    Ok(DataFrame::new(l_cols)?)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
