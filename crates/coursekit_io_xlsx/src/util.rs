//! Stateless helpers of the XLSX kernel.

use std::collections::BTreeMap;

use polars::prelude::DataType;

use crate::conf::{
    C_SHEET_NAME_FALLBACK, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumCellValue, EnumColumnKind};

////////////////////////////////////////////////////////////////////////////////
// #region Cells

/// Column write kind from its dtype.
pub fn derive_column_kind(dtype: &DataType) -> EnumColumnKind {
    if !dtype.is_numeric() {
        EnumColumnKind::Text
    } else if dtype.is_integer() {
        EnumColumnKind::Integer
    } else {
        EnumColumnKind::Decimal
    }
}

/// Final cell value; non-finite numbers become blank.
pub fn convert_cell_value(value: EnumCellValue) -> EnumCellValue {
    match value {
        EnumCellValue::Number(n) if !n.is_finite() => EnumCellValue::None,
        other => other,
    }
}

/// Approximate display width of one cell.
///
/// Non-ASCII characters count as 1.6 units.
pub fn estimate_width_len(value: &EnumCellValue, kind: EnumColumnKind) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::Text(c_text) => {
            let n_chars = c_text.chars().count();
            let n_non_ascii = c_text.chars().filter(|chr| !chr.is_ascii()).count();
            n_chars - n_non_ascii + (n_non_ascii as f64 * 1.6).round() as usize
        }
        EnumCellValue::Number(n) => match kind {
            EnumColumnKind::Integer => format!("{n:.0}").len(),
            _ => format!("{n:.2}").len(),
        },
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Tables

/// Reject duplicate column names, listing every position of each duplicate.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), String> {
    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let l_dups = dict_pos
        .iter()
        .filter(|(_, l_pos)| l_pos.len() > 1)
        .map(|(c_name, l_pos)| format!("{c_name:?} at {l_pos:?}"))
        .collect::<Vec<_>>();
    if l_dups.is_empty() {
        Ok(())
    } else {
        Err(format!("Duplicate column names: {}", l_dups.join("; ")))
    }
}

/// Reject tables that do not fit one worksheet.
pub fn validate_table_shape(n_height: usize, n_width: usize) -> Result<(), String> {
    if n_height + 1 > N_NROWS_EXCEL_MAX {
        return Err(format!(
            "Table has {n_height} rows; a worksheet holds {} below the header.",
            N_NROWS_EXCEL_MAX - 1
        ));
    }
    if n_width > N_NCOLS_EXCEL_MAX {
        return Err(format!(
            "Table has {n_width} columns; a worksheet holds {N_NCOLS_EXCEL_MAX}."
        ));
    }
    Ok(())
}

/// Replace illegal characters, strip quotes and cut to the Excel length cap.
pub fn sanitize_sheet_name(name: &str) -> String {
    let c_name = name
        .chars()
        .map(|chr| if TUP_EXCEL_ILLEGAL.contains(&chr) { '_' } else { chr })
        .collect::<String>();
    let c_name = c_name.trim().trim_matches('\'');
    if c_name.is_empty() {
        return C_SHEET_NAME_FALLBACK.to_string();
    }
    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("Safety/Fire [2024]"), "Safety_Fire _2024_");
        assert_eq!(sanitize_sheet_name(" '' "), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).len(), N_LEN_EXCEL_SHEET_NAME_MAX);
    }

    #[test]
    fn test_validate_unique_columns_lists_positions() {
        assert!(validate_unique_columns(&["a".to_string(), "b".to_string()]).is_ok());
        let err = validate_unique_columns(&["a".to_string(), "b".to_string(), "a".to_string()])
            .unwrap_err();
        assert!(err.contains("\"a\" at [0, 2]"));
    }

    #[test]
    fn test_validate_table_shape() {
        assert!(validate_table_shape(10, 3).is_ok());
        assert!(validate_table_shape(N_NROWS_EXCEL_MAX, 1).is_err());
        assert!(validate_table_shape(1, N_NCOLS_EXCEL_MAX + 1).is_err());
    }

    #[test]
    fn test_convert_cell_value_blanks_non_finite() {
        assert_eq!(convert_cell_value(EnumCellValue::Number(f64::NAN)), EnumCellValue::None);
        assert_eq!(convert_cell_value(EnumCellValue::Number(2.0)), EnumCellValue::Number(2.0));
    }

    #[test]
    fn test_derive_column_kind() {
        assert_eq!(derive_column_kind(&DataType::Int64), EnumColumnKind::Integer);
        assert_eq!(derive_column_kind(&DataType::Float64), EnumColumnKind::Decimal);
        assert_eq!(derive_column_kind(&DataType::String), EnumColumnKind::Text);
    }

    #[test]
    fn test_estimate_width_len() {
        assert_eq!(estimate_width_len(&EnumCellValue::Text("abc".to_string()), EnumColumnKind::Text), 3);
        assert_eq!(estimate_width_len(&EnumCellValue::Number(12.0), EnumColumnKind::Integer), 2);
        assert_eq!(estimate_width_len(&EnumCellValue::Number(1.5), EnumColumnKind::Decimal), 4);
    }
}
