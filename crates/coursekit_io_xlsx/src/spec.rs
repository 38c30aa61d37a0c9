//! Cell models of the XLSX kernel.

/// Cell value after conversion from a dataset cell.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Blank cell.
    None,
    /// Text cell.
    Text(String),
    /// Numeric cell.
    Number(f64),
}

/// How a whole column is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumColumnKind {
    /// Cells written as strings.
    Text,
    /// Numbers with the integer format.
    Integer,
    /// Numbers with the decimal format.
    Decimal,
}
