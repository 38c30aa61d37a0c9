//! DataFrame to in-memory single-sheet workbook bytes.

use polars::prelude::{AnyValue, Column, DataFrame};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use tracing::debug;

use crate::conf::{
    C_FONT_NAME, C_NUM_FORMAT_DECIMAL, C_NUM_FORMAT_INTEGER, N_FONT_SIZE,
    N_RGB_HEADER_FILL, N_ROWS_WIDTH_INSPECTED_MAX, N_WIDTH_CELL_MAX, N_WIDTH_CELL_MIN,
    N_WIDTH_CELL_PADDING,
};
use crate::spec::{EnumCellValue, EnumColumnKind};
use crate::util::{
    convert_cell_value, derive_column_kind, estimate_width_len, sanitize_sheet_name,
    validate_table_shape, validate_unique_columns,
};

/// Serialize one DataFrame as a single-sheet workbook.
///
/// The header row is bold, filled and frozen with an autofilter; numeric
/// columns are written as numbers. `df` is only read and every call owns a
/// fresh workbook.
pub fn write_dataframe_to_xlsx_bytes(df: &DataFrame, sheet_name: &str) -> Result<Vec<u8>, String> {
    let l_columns = df.get_columns();
    let l_colnames = l_columns
        .iter()
        .map(|col| col.name().to_string())
        .collect::<Vec<_>>();
    validate_unique_columns(&l_colnames)?;
    validate_table_shape(df.height(), l_columns.len())?;

    let c_sheet_name = sanitize_sheet_name(sheet_name);
    let fmt_header = derive_header_format();

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(&c_sheet_name)
        .map_err(derive_xlsx_error_text)?;

    for (n_idx_col, (col, c_name)) in l_columns.iter().zip(&l_colnames).enumerate() {
        let kind = derive_column_kind(col.dtype());
        worksheet
            .write_string_with_format(0, cast_col_num(n_idx_col)?, c_name, &fmt_header)
            .map_err(derive_xlsx_error_text)?;
        let n_width_body =
            write_column_body(worksheet, col, n_idx_col, kind, &derive_body_format(kind))?;

        let n_width_header =
            estimate_width_len(&EnumCellValue::Text(c_name.clone()), EnumColumnKind::Text);
        let n_width_final = (usize::max(n_width_body, n_width_header) + N_WIDTH_CELL_PADDING)
            .clamp(N_WIDTH_CELL_MIN, N_WIDTH_CELL_MAX);
        worksheet
            .set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)
            .map_err(derive_xlsx_error_text)?;
    }

    worksheet
        .set_freeze_panes(1, 0)
        .map_err(derive_xlsx_error_text)?;
    if !l_columns.is_empty() {
        worksheet
            .autofilter(
                0,
                0,
                cast_row_num(df.height())?,
                cast_col_num(l_columns.len() - 1)?,
            )
            .map_err(derive_xlsx_error_text)?;
    }

    debug!(
        sheet = %c_sheet_name,
        rows = df.height(),
        cols = l_columns.len(),
        "xlsx sheet written"
    );
    workbook.save_to_buffer().map_err(derive_xlsx_error_text)
}

/// Write body cells of one column; returns the widest inspected cell.
fn write_column_body(
    worksheet: &mut Worksheet,
    col: &Column,
    n_idx_col: usize,
    kind: EnumColumnKind,
    format: &Format,
) -> Result<usize, String> {
    let mut n_width_max = 0usize;
    for n_idx_row in 0..col.len() {
        let value = convert_cell_value(derive_cell_value_from_any_value(
            col.get(n_idx_row)
                .map_err(|err| format!("Failed to access cell value: {err}"))?,
        ));
        if n_idx_row < N_ROWS_WIDTH_INSPECTED_MAX {
            n_width_max = usize::max(n_width_max, estimate_width_len(&value, kind));
        }

        let n_row = cast_row_num(n_idx_row + 1)?;
        let n_col = cast_col_num(n_idx_col)?;
        match &value {
            EnumCellValue::None => worksheet.write_blank(n_row, n_col, format),
            EnumCellValue::Text(c_text) => {
                worksheet.write_string_with_format(n_row, n_col, c_text, format)
            }
            EnumCellValue::Number(n) => worksheet.write_number_with_format(n_row, n_col, *n, format),
        }
        .map_err(derive_xlsx_error_text)?;
    }
    Ok(n_width_max)
}

fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::Text(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::Text(val.to_string()),
        AnyValue::Boolean(val) => EnumCellValue::Text(if val { "TRUE" } else { "FALSE" }.to_string()),
        AnyValue::UInt8(val) => EnumCellValue::Number(val.into()),
        AnyValue::UInt16(val) => EnumCellValue::Number(val.into()),
        AnyValue::UInt32(val) => EnumCellValue::Number(val.into()),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Number(val.into()),
        AnyValue::Int16(val) => EnumCellValue::Number(val.into()),
        AnyValue::Int32(val) => EnumCellValue::Number(val.into()),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => EnumCellValue::Number(val.into()),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        other => EnumCellValue::Text(other.to_string()),
    }
}

fn derive_base_format() -> Format {
    Format::new()
        .set_font_name(C_FONT_NAME)
        .set_font_size(N_FONT_SIZE)
}

fn derive_header_format() -> Format {
    derive_base_format()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin)
        .set_background_color(Color::RGB(N_RGB_HEADER_FILL))
}

fn derive_body_format(kind: EnumColumnKind) -> Format {
    match kind {
        EnumColumnKind::Text => derive_base_format().set_align(FormatAlign::Left),
        EnumColumnKind::Integer => derive_base_format()
            .set_align(FormatAlign::Right)
            .set_num_format(C_NUM_FORMAT_INTEGER),
        EnumColumnKind::Decimal => derive_base_format()
            .set_align(FormatAlign::Right)
            .set_num_format(C_NUM_FORMAT_DECIMAL),
    }
}

fn cast_row_num(value: usize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

fn cast_col_num(value: usize) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

fn derive_xlsx_error_text(err: XlsxError) -> String {
    format!("xlsx write error: {err}")
}
