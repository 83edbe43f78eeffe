use crate::feed::csv::format_record;
use crate::model::Report;

pub const REPORT_HEADER: &str = "Package,Version,Filename,Status,Repo,Path";

pub fn generate_csv_string(report: &Report) -> String {
    let mut out = String::with_capacity(64 * (report.rows.len() + 1));
    out.push_str(REPORT_HEADER);
    out.push('\n');

    for row in &report.rows {
        out.push_str(&format_record([
            row.package.as_str(),
            row.version.as_str(),
            row.filename.as_str(),
            row.status.as_str(),
            row.repo.as_str(),
            row.path.as_str(),
        ]));
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReportRow, RowStatus};

    fn row(status: RowStatus, repo: &str, path: &str) -> ReportRow {
        ReportRow {
            package: "@foo/bar".into(),
            version: "2.0.0".into(),
            filename: "bar-2.0.0.tgz".into(),
            status,
            repo: repo.into(),
            path: path.into(),
        }
    }

    #[test]
    fn test_found_rows() {
        let report = Report::new(
            vec![
                row(RowStatus::Found, "repo1", "a/bar-2.0.0.tgz"),
                row(RowStatus::Found, "repo2", "b/bar-2.0.0.tgz"),
            ],
            1,
            1,
        );

        let csv = generate_csv_string(&report);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(
            lines,
            [
                REPORT_HEADER,
                "@foo/bar,2.0.0,bar-2.0.0.tgz,FOUND,repo1,a/bar-2.0.0.tgz",
                "@foo/bar,2.0.0,bar-2.0.0.tgz,FOUND,repo2,b/bar-2.0.0.tgz",
            ]
        );
    }

    #[test]
    fn test_error_reason_is_quoted_when_needed() {
        let report = Report::new(
            vec![row(RowStatus::Error, "transport error: reset, retrying", "")],
            1,
            1,
        );

        let csv = generate_csv_string(&report);
        assert!(csv.ends_with(
            "@foo/bar,2.0.0,bar-2.0.0.tgz,ERROR,\"transport error: reset, retrying\",\n"
        ));
    }

    #[test]
    fn test_empty_report_has_header() {
        let csv = generate_csv_string(&Report::new(Vec::new(), 0, 0));
        assert_eq!(csv, format!("{}\n", REPORT_HEADER));
    }
}
