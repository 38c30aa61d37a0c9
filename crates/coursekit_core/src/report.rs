//! Consolidation report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// One sheet left out of the consolidated dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecSheetSkip {
    /// Worksheet name.
    pub sheet_name: String,
    /// Why no row survived.
    pub reason: String,
}

/// Aggregate counters and diagnostics for one consolidation run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReportConsolidate {
    /// Worksheets inspected.
    pub cnt_scanned: u64,
    /// Worksheets contributing at least one row.
    pub cnt_kept: u64,
    /// Rows in the consolidated dataset.
    pub cnt_rows: u64,
    /// Non-fatal warnings (rename collisions, fallback detection).
    pub warnings: Vec<String>,
    /// Skipped worksheets, in file order.
    pub skipped: Vec<SpecSheetSkip>,
}

impl ReportConsolidate {
    /// Number of skipped sheets.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_kept".to_string(), self.cnt_kept);
        dict_counts.insert("cnt_skipped".to_string(), self.skipped_count() as u64);
        dict_counts.insert("cnt_rows".to_string(), self.cnt_rows);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} scanned={} kept={} skipped={} rows={} warnings={}",
            dict_counts["cnt_scanned"],
            dict_counts["cnt_kept"],
            dict_counts["cnt_skipped"],
            dict_counts["cnt_rows"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportConsolidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[CONSOLIDATE]"))
    }
}

/// Mutable accumulator for consolidation statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportConsolidateBuilder {
    cnt_scanned: u64,
    cnt_kept: u64,
    cnt_rows: u64,
    warnings: Vec<String>,
    skipped: Vec<SpecSheetSkip>,
}

impl ReportConsolidateBuilder {
    /// Record one inspected sheet.
    pub fn add_scanned(&mut self) {
        self.cnt_scanned += 1;
    }

    /// Record one contributing sheet and its row count.
    pub fn add_kept(&mut self, n_rows: usize) {
        self.cnt_kept += 1;
        self.cnt_rows += n_rows as u64;
    }

    /// Record one skipped sheet.
    pub fn add_skipped(&mut self, sheet_name: &str, reason: impl Into<String>) {
        self.skipped.push(SpecSheetSkip {
            sheet_name: sheet_name.to_string(),
            reason: reason.into(),
        });
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportConsolidate {
        ReportConsolidate {
            cnt_scanned: self.cnt_scanned,
            cnt_kept: self.cnt_kept,
            cnt_rows: self.cnt_rows,
            warnings: self.warnings,
            skipped: self.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_to_dict_and_format() {
        let mut builder = ReportConsolidateBuilder::default();
        builder.add_scanned();
        builder.add_scanned();
        builder.add_kept(2);
        builder.add_skipped("Fire", "no rows matching target");
        builder.add_warning("w".to_string());
        let report = builder.build();

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_scanned"], 2);
        assert_eq!(dict_counts["cnt_kept"], 1);
        assert_eq!(dict_counts["cnt_skipped"], 1);
        assert_eq!(dict_counts["cnt_rows"], 2);

        let txt = report.format("[CONSOLIDATE]");
        assert_eq!(
            txt,
            "[CONSOLIDATE] scanned=2 kept=1 skipped=1 rows=2 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
        assert_eq!(report.skipped[0].sheet_name, "Fire");
    }
}
