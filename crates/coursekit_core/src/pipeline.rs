//! End-to-end runs over one uploaded file.

use polars::prelude::DataFrame;
use tracing::{debug, info};

use crate::aggregate::{
    division_breakdown, employee_pending, headline_completion, list_employee_names,
    search_employees,
};
use crate::classify::build_pending_matrix;
use crate::consolidate::{SpecConsolidation, consolidate};
use crate::decode::{decode_csv, decode_spreadsheet};
use crate::normalize::build_dataset;
use crate::pivot::build_pivot;
use crate::roles::detect_roles;
use crate::spec::{
    EnumFileKind, Result, SpecColumnRoles, SpecCompletionStat, SpecEmployeePending,
    SpecPendingMatrix, SpecPipelineOptions, SpecPivotTable,
};
use crate::util::derive_headers;

////////////////////////////////////////////////////////////////////////////////
// #region CsvFlow

/// Loaded single-sheet dataset with its roles and pending flags.
#[derive(Debug, Clone)]
pub struct SpecCsvAnalysis {
    /// Normalized string-typed dataset.
    pub dataset: DataFrame,
    /// Column roles detected once at load.
    pub roles: SpecColumnRoles,
    /// Pending flags over the course columns.
    pub matrix: SpecPendingMatrix,
    /// Division completion, or overall completion without a division column.
    pub headline: SpecCompletionStat,
}

impl SpecCsvAnalysis {
    /// Sorted distinct employee names.
    pub fn employee_names(&self) -> Result<Vec<String>> {
        list_employee_names(&self.dataset, &self.roles)
    }

    /// Employee names narrowed by a search query.
    pub fn search(&self, query: &str) -> Result<Vec<String>> {
        Ok(search_employees(&self.employee_names()?, query))
    }

    /// Pending courses of one employee.
    pub fn employee_pending(&self, name: &str) -> Result<SpecEmployeePending> {
        employee_pending(&self.dataset, &self.roles, &self.matrix, name)
    }

    /// Completion per division value.
    pub fn division_breakdown(&self) -> Result<Vec<SpecCompletionStat>> {
        division_breakdown(&self.dataset, &self.roles, &self.matrix)
    }
}

/// Decode, normalize and classify a CSV upload.
pub fn analyze_csv(v_bytes: &[u8], options: &SpecPipelineOptions) -> Result<SpecCsvAnalysis> {
    let table = decode_csv(v_bytes)?;
    let dataset = build_dataset(&table)?;
    let roles = detect_roles(&derive_headers(&dataset), &options.role_rules)?;
    debug!(
        name = ?roles.name_column,
        division = ?roles.division_column,
        n_courses = roles.course_columns.len(),
        "Detected column roles"
    );

    let matrix = build_pending_matrix(&dataset, &roles)?;
    let headline = headline_completion(&dataset, &roles, &matrix, &options.division_target)?;
    info!(
        n_rows = dataset.height(),
        subject = %headline.subject,
        completion_percent = headline.completion_percent,
        "CSV analyzed"
    );

    Ok(SpecCsvAnalysis {
        dataset,
        roles,
        matrix,
        headline,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SpreadsheetFlow

/// Consolidated workbook with its pivot.
#[derive(Debug, Clone)]
pub struct SpecWorkbookAnalysis {
    /// All worksheet names in file order.
    pub sheet_names: Vec<String>,
    /// Consolidated target-division rows and report.
    pub consolidation: SpecConsolidation,
    /// Employee x course pivot of the consolidated rows.
    pub pivot: SpecPivotTable,
}

/// Decode, consolidate and pivot a workbook upload.
pub fn analyze_spreadsheet(
    v_bytes: &[u8],
    options: &SpecPipelineOptions,
) -> Result<SpecWorkbookAnalysis> {
    let workbook = decode_spreadsheet(v_bytes, options.header_row)?;
    debug!(n_sheets = workbook.sheet_names.len(), "Decoded workbook");

    let consolidation = consolidate(
        &workbook.sheets,
        &options.division_target,
        &options.consolidate,
    )?;
    let pivot = build_pivot(&consolidation.dataset, &options.pivot)?;
    info!(
        n_rows = consolidation.dataset.height(),
        n_employees = pivot.rows.len(),
        n_courses = pivot.course_columns.len(),
        "Workbook analyzed"
    );

    Ok(SpecWorkbookAnalysis {
        sheet_names: workbook.sheet_names,
        consolidation,
        pivot,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Dispatch

/// Result of a run, by flow.
#[derive(Debug, Clone)]
pub enum EnumAnalysis {
    /// Single-sheet flow.
    Csv(SpecCsvAnalysis),
    /// Multi-sheet flow.
    Spreadsheet(SpecWorkbookAnalysis),
}

/// Run the flow selected by the declared file kind.
pub fn analyze(
    v_bytes: &[u8],
    kind: EnumFileKind,
    options: &SpecPipelineOptions,
) -> Result<EnumAnalysis> {
    match kind {
        EnumFileKind::Csv => analyze_csv(v_bytes, options).map(EnumAnalysis::Csv),
        EnumFileKind::Spreadsheet => {
            analyze_spreadsheet(v_bytes, options).map(EnumAnalysis::Spreadsheet)
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
