//! Workbook fixtures shared by unit tests.

use rust_xlsxwriter::Workbook;

/// Build an in-memory workbook from `(sheet name, rows)` pairs.
///
/// Numeric-looking cells are written as numbers; empty cells are left blank.
pub(crate) fn create_workbook_bytes(sheets: &[(&str, Vec<Vec<&str>>)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    for (c_sheet_name, l_rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*c_sheet_name).unwrap();
        for (n_idx_row, l_cells) in l_rows.iter().enumerate() {
            for (n_idx_col, c_cell) in l_cells.iter().enumerate() {
                if c_cell.is_empty() {
                    continue;
                }
                let n_row = n_idx_row as u32;
                let n_col = n_idx_col as u16;
                match c_cell.parse::<f64>() {
                    Ok(n_value) => worksheet.write_number(n_row, n_col, n_value).unwrap(),
                    Err(_) => worksheet.write_string(n_row, n_col, *c_cell).unwrap(),
                };
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}
