//! Subcommand execution.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use coursekit_core::{
    C_FILE_PIVOT, EnumAnalysis, EnumFileKind, SpecCsvAnalysis, SpecPipelineOptions, SpecPivotTable,
    analyze, analyze_csv, analyze_spreadsheet, derive_default_pipeline_options,
    derive_pending_file_name, export_pending, export_pivot,
};
use serde_json::json;
use tracing::info;

use crate::args::{Cli, Commands};

/// Pipeline options from `--config`, with CLI overrides applied.
pub fn load_options(cli: &Cli) -> Result<SpecPipelineOptions> {
    let mut options = match &cli.config {
        Some(path) => {
            let c_text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            toml::from_str(&c_text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => derive_default_pipeline_options(),
    };
    if let Some(target) = &cli.target {
        options.division_target = target.clone();
    }
    Ok(options)
}

fn read_input(path: &Path) -> Result<(Vec<u8>, EnumFileKind)> {
    let c_file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = EnumFileKind::from_file_name(&c_file_name)
        .with_context(|| format!("Unsupported file type: {}", path.display()))?;
    let v_bytes =
        fs::read(path).with_context(|| format!("Failed to read input {}", path.display()))?;
    Ok((v_bytes, kind))
}

fn load_csv(path: &Path, options: &SpecPipelineOptions) -> Result<SpecCsvAnalysis> {
    let (v_bytes, kind) = read_input(path)?;
    if kind != EnumFileKind::Csv {
        bail!("{} is not a CSV file", path.display());
    }
    Ok(analyze_csv(&v_bytes, options)?)
}

fn write_output_file(out_dir: &Path, file_name: &str, v_bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let path = out_dir.join(file_name);
    fs::write(&path, v_bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Export written");
    Ok(path)
}

fn format_pivot(pivot: &SpecPivotTable) -> String {
    let mut l_lines = vec![pivot.headers().join("\t")];
    for row in pivot.all_rows() {
        let l_cells = row
            .keys
            .iter()
            .cloned()
            .chain(row.counts.iter().map(ToString::to_string))
            .chain(std::iter::once(row.total.to_string()))
            .collect::<Vec<_>>();
        l_lines.push(l_cells.join("\t"));
    }
    l_lines.join("\n")
}

/// Execute one parsed command line, printing to `out`.
pub fn run_with_writer(
    cli: &Cli,
    options: &SpecPipelineOptions,
    out: &mut impl Write,
) -> Result<()> {
    match &cli.command {
        Commands::Summary { input } => {
            let (v_bytes, kind) = read_input(input)?;
            match analyze(&v_bytes, kind, options)? {
                EnumAnalysis::Csv(analysis) => {
                    let l_divisions = analysis.division_breakdown()?;
                    let n_employees = analysis.employee_names()?.len();
                    if cli.json {
                        let value = json!({
                            "headline": analysis.headline,
                            "divisions": l_divisions,
                            "n_employees": n_employees,
                        });
                        writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
                    } else {
                        let stat = &analysis.headline;
                        writeln!(
                            out,
                            "{}: {:.2}% complete ({} of {} pending)",
                            stat.subject,
                            stat.completion_percent,
                            stat.pending_count,
                            stat.total_courses
                        )?;
                        writeln!(out, "Employees: {n_employees}")?;
                        for stat in &l_divisions {
                            writeln!(out, "  {}: {:.2}%", stat.subject, stat.completion_percent)?;
                        }
                    }
                }
                EnumAnalysis::Spreadsheet(analysis) => {
                    if cli.json {
                        let value = json!({
                            "sheets": analysis.sheet_names,
                            "report": analysis.consolidation.report,
                            "n_employees": analysis.pivot.rows.len(),
                            "courses": analysis.pivot.course_columns,
                        });
                        writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
                    } else {
                        writeln!(out, "{}", analysis.consolidation.report)?;
                        for skip in &analysis.consolidation.report.skipped {
                            writeln!(out, "  skipped {:?}: {}", skip.sheet_name, skip.reason)?;
                        }
                        writeln!(
                            out,
                            "Employees: {} Courses: {}",
                            analysis.pivot.rows.len(),
                            analysis.pivot.course_columns.len()
                        )?;
                    }
                }
            }
        }

        Commands::Search { input, query } => {
            let l_names = load_csv(input, options)?.search(query)?;
            if cli.json {
                writeln!(out, "{}", serde_json::to_string_pretty(&l_names)?)?;
            } else {
                for c_name in &l_names {
                    writeln!(out, "{c_name}")?;
                }
            }
        }

        Commands::Pending {
            input,
            name,
            out_dir,
        } => {
            let pending = load_csv(input, options)?.employee_pending(name)?;
            let path_export = match out_dir {
                Some(out_dir) => Some(write_output_file(
                    out_dir,
                    &derive_pending_file_name(&pending.employee_name),
                    &export_pending(&pending)?,
                )?),
                None => None,
            };

            if cli.json {
                let value = json!({
                    "pending": pending,
                    "file": path_export.as_ref().map(|p| p.display().to_string()),
                });
                writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
            } else {
                let stat = &pending.stat;
                writeln!(
                    out,
                    "{}: {:.2}% complete, {} of {} courses pending",
                    pending.employee_name,
                    stat.completion_percent,
                    stat.pending_count,
                    stat.total_courses
                )?;
                for c_course in &pending.pending_courses {
                    writeln!(out, "  - {c_course}")?;
                }
                if let Some(path) = &path_export {
                    writeln!(out, "Exported {}", path.display())?;
                }
            }
        }

        Commands::Pivot {
            input,
            out_dir,
            by_office,
            total_row,
        } => {
            let (v_bytes, kind) = read_input(input)?;
            if kind != EnumFileKind::Spreadsheet {
                bail!("{} is not a workbook file", input.display());
            }
            let mut options = options.clone();
            options.pivot.if_group_by_office |= *by_office;
            options.pivot.if_total_row |= *total_row;

            let analysis = analyze_spreadsheet(&v_bytes, &options)?;
            let path_export = match out_dir {
                Some(out_dir) => Some(write_output_file(
                    out_dir,
                    C_FILE_PIVOT,
                    &export_pivot(&analysis.pivot)?,
                )?),
                None => None,
            };

            if cli.json {
                let value = json!({
                    "pivot": analysis.pivot,
                    "report": analysis.consolidation.report,
                    "file": path_export.as_ref().map(|p| p.display().to_string()),
                });
                writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
            } else {
                writeln!(out, "{}", format_pivot(&analysis.pivot))?;
                if let Some(path) = &path_export {
                    writeln!(out, "Exported {}", path.display())?;
                }
            }
        }
    }
    Ok(())
}

/// Execute one parsed command line against stdout.
pub fn run(cli: &Cli) -> Result<()> {
    let options = load_options(cli)?;
    let mut stdout = std::io::stdout().lock();
    run_with_writer(cli, &options, &mut stdout)
}
