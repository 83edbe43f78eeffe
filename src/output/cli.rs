use crate::model::Report;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Repo")]
    repo: String,
    #[tabled(rename = "Path")]
    path: String,
}

/// Prints a table of located artifacts, if any.
pub fn print_findings_table(report: &Report) {
    let rows: Vec<FindingRow> = report
        .found_rows()
        .map(|r| FindingRow {
            package: truncate(&r.package, 40),
            version: r.version.clone(),
            repo: truncate(&r.repo, 30),
            path: truncate(&r.path, 60),
        })
        .collect();

    if rows.is_empty() {
        return;
    }

    println!();
    println!("\x1b[31mCompromised artifacts present in repository:\x1b[0m");
    println!();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_summary(report: &Report, written_to: Option<&Path>) {
    let summary = report.summary();

    println!();
    println!(
        "Audit completed at: {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  Candidates checked: {}/{}",
        summary.checked_candidates, summary.total_candidates
    );

    if summary.found_candidates > 0 {
        println!(
            "  \x1b[31mFOUND: {} candidates ({} artifacts)\x1b[0m",
            summary.found_candidates, summary.found_artifacts
        );
    } else {
        println!("  \x1b[32mFOUND: 0 candidates\x1b[0m");
    }
    println!("  NOT_FOUND: {}", summary.not_found);
    if summary.errors > 0 {
        println!("  \x1b[33mERROR: {}\x1b[0m", summary.errors);
    } else {
        println!("  ERROR: 0");
    }

    if let Some(reason) = &report.interrupted {
        println!();
        println!("\x1b[33mPARTIAL REPORT: audit {}\x1b[0m", reason);
    }

    if let Some(path) = written_to {
        println!();
        println!("Report written to: {}", path.display());
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-package-name", 10), "a-very-...");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }
}
