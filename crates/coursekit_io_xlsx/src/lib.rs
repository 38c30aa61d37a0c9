//! `coursekit_io_xlsx`:
//! in-memory XLSX writer for report tables.
//!
//! Modules:
//! - `conf`   : Excel limits and layout constants
//! - `spec`   : cell models
//! - `util`   : pure helper functions
//! - `writer` : DataFrame -> single-sheet workbook bytes
pub mod conf;
pub mod spec;
pub mod util;
pub mod writer;

pub use spec::{EnumCellValue, EnumColumnKind};
pub use util::sanitize_sheet_name;
pub use writer::write_dataframe_to_xlsx_bytes;
