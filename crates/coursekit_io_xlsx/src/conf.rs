//! Excel limits and report-table layout constants.

/// Excel worksheet maximum row count, header included.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [char; 7] = ['*', ':', '?', '/', '\\', '[', ']'];
/// Sheet name used when sanitizing leaves nothing.
pub const C_SHEET_NAME_FALLBACK: &str = "Sheet";

pub const C_FONT_NAME: &str = "Calibri";
pub const N_FONT_SIZE: u16 = 11;
/// Header fill of report tables.
pub const N_RGB_HEADER_FILL: u32 = 0xDDEBF7;
pub const C_NUM_FORMAT_INTEGER: &str = "0";
pub const C_NUM_FORMAT_DECIMAL: &str = "0.00";

/// Body rows inspected per column when fitting widths.
pub const N_ROWS_WIDTH_INSPECTED_MAX: usize = 2_000;
pub const N_WIDTH_CELL_MIN: usize = 8;
pub const N_WIDTH_CELL_MAX: usize = 50;
/// Added to the widest inspected cell.
pub const N_WIDTH_CELL_PADDING: usize = 2;
