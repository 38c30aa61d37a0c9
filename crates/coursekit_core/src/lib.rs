//! `coursekit_core`:
//! course-completion pipeline over uploaded CSV and workbook files.
//!
//! Modules:
//! - `conf`        : constants and default rule presets
//! - `spec`        : models/options/errors
//! - `util`        : pure helpers over string-typed datasets
//! - `decode`      : encoding/delimiter sniffing, CSV and workbook decoding
//! - `normalize`   : header de-duplication, dataset construction
//! - `roles`       : name/division/course column detection
//! - `classify`    : pending predicate and pending matrix
//! - `aggregate`   : completion statistics, employee lookup and search
//! - `consolidate` : per-sheet filtering folded into one dataset
//! - `report`      : consolidation report
//! - `pivot`       : employee x course pivot
//! - `export`      : workbook bytes of result tables
//! - `pipeline`    : end-to-end runs per file kind
pub mod aggregate;
pub mod classify;
pub mod conf;
pub mod consolidate;
pub mod decode;
pub mod export;
pub mod normalize;
pub mod pipeline;
pub mod pivot;
pub mod report;
pub mod roles;
pub mod spec;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::{
    build_pending_table, completion, completion_stat, division_breakdown, division_completion,
    employee_pending, headline_completion, list_employee_names, overall_completion,
    search_employees,
};
pub use classify::{build_pending_matrix, is_pending};
pub use conf::{
    C_DIVISION_TARGET_DEFAULT, C_FILE_PIVOT, C_PENDING_MARKER, derive_default_pipeline_options,
    derive_default_role_rules, derive_multi_sheet_role_rules,
};
pub use consolidate::{SpecConsolidation, consolidate, filter_sheet};
pub use decode::{decode_csv, decode_spreadsheet, sniff};
pub use export::{derive_pending_file_name, export_pending, export_pivot, export_table};
pub use normalize::{build_dataset, normalize_headers};
pub use pipeline::{
    EnumAnalysis, SpecCsvAnalysis, SpecWorkbookAnalysis, analyze, analyze_csv,
    analyze_spreadsheet,
};
pub use pivot::build_pivot;
pub use report::{ReportConsolidate, ReportConsolidateBuilder, SpecSheetSkip};
pub use roles::{assign_roles, detect_roles};
pub use spec::{
    CourseKitError, EnumAxisOrder, EnumColumnRole, EnumFileKind, EnumHeaderMatcher,
    EnumHeaderRow, EnumNameMatch, EnumPivotValueRule, EnumRoleKind, Result, SpecColumnRoles,
    SpecCompletionStat, SpecConsolidateOptions, SpecEmployeePending, SpecPendingMatrix,
    SpecPipelineOptions, SpecPivotOptions, SpecPivotRow, SpecPivotTable, SpecRawTable,
    SpecRoleRule, SpecRoleRules, SpecSheet, SpecSniff, SpecWorkbook,
};
