mod cli;
mod csv;
mod json;

pub use cli::{print_findings_table, print_summary};
pub use csv::{generate_csv_string, REPORT_HEADER};
pub use json::generate_json_string;

use crate::model::Report;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// File format for the audit report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// `Package,Version,Filename,Status,Repo,Path` rows
    Csv,
    /// The full report, including run metadata
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'csv' or 'json'", s)),
        }
    }
}

/// Format report to string for file output
pub fn format_report_to_string(report: &Report, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Csv => Ok(generate_csv_string(report)),
        ReportFormat::Json => generate_json_string(report),
    }
}

/// Writes the report and returns the path actually written.
///
/// Partial reports go next to the requested path with `.partial` before the
/// extension, so an interrupted run never masquerades as a complete one.
pub fn write_report(report: &Report, format: ReportFormat, path: &Path) -> Result<PathBuf> {
    let target = if report.is_partial() {
        partial_path(path)
    } else {
        path.to_path_buf()
    };

    let content = format_report_to_string(report, format)?;
    std::fs::write(&target, content)
        .with_context(|| format!("Failed to write report to {}", target.display()))?;
    Ok(target)
}

/// Checks that the report and its `.partial` sibling can be created at
/// `path`, so an unwritable target fails before any query is made.
///
/// Files that did not exist beforehand are removed again.
pub fn ensure_writable(path: &Path) -> Result<()> {
    for target in [path.to_path_buf(), partial_path(path)] {
        let existed = target.exists();
        std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&target)
            .with_context(|| format!("Cannot write report to {}", target.display()))?;
        if !existed {
            let _ = std::fs::remove_file(&target);
        }
    }
    Ok(())
}

/// `report.csv` -> `report.partial.csv`; `report` -> `report.partial`.
pub fn partial_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}.partial.{}", stem, ext.to_string_lossy()),
        None => format!("{}.partial", stem),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Interruption, ReportRow, RowStatus};
    use std::str::FromStr;

    fn report() -> Report {
        Report::new(
            vec![ReportRow {
                package: "@foo/bar".into(),
                version: "1.0.0".into(),
                filename: "bar-1.0.0.tgz".into(),
                status: RowStatus::NotFound,
                repo: String::new(),
                path: String::new(),
            }],
            1,
            1,
        )
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(ReportFormat::from_str("CSV"), Ok(ReportFormat::Csv));
        assert_eq!(ReportFormat::from_str("json"), Ok(ReportFormat::Json));
        assert!(ReportFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("out/report.csv")),
            PathBuf::from("out/report.partial.csv")
        );
        assert_eq!(partial_path(Path::new("report")), PathBuf::from("report.partial"));
    }

    #[test]
    fn test_write_complete_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        let written = write_report(&report(), ReportFormat::Csv, &path).unwrap();
        assert_eq!(written, path);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Package,Version,Filename,Status,Repo,Path\n@foo/bar,1.0.0,bar-1.0.0.tgz,NOT_FOUND,,\n"
        );
    }

    #[test]
    fn test_write_partial_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let partial = report().with_interruption(Some(Interruption::Cancelled));

        let written = write_report(&partial, ReportFormat::Csv, &path).unwrap();
        assert_eq!(written, dir.path().join("report.partial.csv"));
        assert!(written.exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_ensure_writable_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.csv");

        let err = ensure_writable(&path).unwrap_err();
        assert!(err.to_string().contains("Cannot write report"));
    }

    #[test]
    fn test_ensure_writable_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        ensure_writable(&path).unwrap();
        assert!(!path.exists());
        assert!(!dir.path().join("report.partial.csv").exists());
    }

    #[test]
    fn test_ensure_writable_keeps_existing_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        std::fs::write(&path, "previous run\n").unwrap();

        ensure_writable(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous run\n");
    }
}
