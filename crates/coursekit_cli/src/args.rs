//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "coursekit")]
#[command(about = "Course-completion reports from CSV and workbook uploads")]
#[command(version)]
pub struct Cli {
    /// TOML file with pipeline options
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Division label to match (overrides the config file)
    #[arg(long, global = true)]
    pub target: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Headline completion of a CSV, or the consolidation summary of a workbook
    Summary {
        /// Input file (.csv, .xlsx, .xls, .ods)
        input: PathBuf,
    },

    /// Search employee names in a CSV
    Search {
        /// Input CSV file
        input: PathBuf,
        /// Case-insensitive name fragment; short queries list everyone
        #[arg(default_value = "")]
        query: String,
    },

    /// Pending courses of one employee in a CSV
    Pending {
        /// Input CSV file
        input: PathBuf,
        /// Exact employee name
        name: String,
        /// Directory receiving `<name>_pending_courses.xlsx`
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Consolidate a workbook and build the employee x course pivot
    Pivot {
        /// Input workbook file
        input: PathBuf,
        /// Directory receiving `pivot_summary.xlsx`
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Add the office column to the row key
        #[arg(long)]
        by_office: bool,
        /// Append a trailing total row
        #[arg(long)]
        total_row: bool,
    },
}
