use serde::Serialize;

use crate::library::{Library, OpenLoan};

/// Column titles matching the row layout below
const HEADER: &str =
    "LOAN   USER                     TITLE                            DUE\n";

/// Snapshot of the open loans for JSON output
#[derive(Debug, Serialize)]
struct OpenLoanReport {
    /// Number of rows in `loans`
    count: usize,
    /// Open loans in issue order
    loans: Vec<OpenLoan>,
}

/// Rendering of the open-loan listing
#[derive(Debug)]
pub struct LoanReport;

impl LoanReport {
    /// Fixed-width text table, one row per open loan
    #[must_use]
    pub fn render_text(library: &Library) -> String {
        let mut out = String::new();
        out.push_str(HEADER);

        let mut rows = 0usize;
        for row in library.list_open_loans() {
            rows = rows.saturating_add(1);
            out.push_str(&format!(
                "{:<6} {:<24} {:<32} {}\n",
                row.loan_id.to_string(),
                row.user_name,
                row.book_title,
                row.due_at.format("%Y-%m-%d %H:%M")
            ));
        }

        if rows == 0 {
            out.push_str("(no open loans)\n");
        }
        out
    }

    /// Pretty-printed JSON document of the open loans
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the report cannot be encoded.
    pub fn render_json(library: &Library) -> serde_json::Result<String> {
        let loans: Vec<OpenLoan> = library.list_open_loans().collect();
        let report = OpenLoanReport { count: loans.len(), loans };
        serde_json::to_string_pretty(&report)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{clock::FixedClock, user::Category};

    #[allow(clippy::expect_used)]
    fn library_with_one_loan() -> Library {
        let now = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).single().expect("valid timestamp");
        let mut library = Library::with_clock(FixedClock(now));
        library.register_book("9788535902772", "Clean Code", "Robert Martin").expect("book");
        library.register_user("est001", "Joao Santos", Category::Student).expect("user");
        library.open_loan("est001", "9788535902772").expect("loan");
        library
    }

    #[test]
    fn test_text_report_lists_rows() {
        let text = LoanReport::render_text(&library_with_one_loan());
        assert!(text.starts_with("LOAN"));
        assert!(text.contains("Joao Santos"));
        assert!(text.contains("Clean Code"));
        assert!(text.contains("2025-03-10 09:00"));
    }

    #[test]
    fn test_text_report_one_line_per_row() {
        let text = LoanReport::render_text(&library_with_one_loan());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|line| !line.is_empty()));
        assert!(text.ends_with("2025-03-10 09:00\n"));
    }

    #[test]
    fn test_text_report_empty() {
        let text = LoanReport::render_text(&Library::new());
        assert!(text.ends_with("(no open loans)\n"));
    }

    #[test]
    #[allow(clippy::expect_used, clippy::indexing_slicing)]
    fn test_json_report() {
        let json = LoanReport::render_json(&library_with_one_loan()).expect("encodes");
        let value: serde_json::Value = serde_json::from_str(&json).expect("decodes");

        assert_eq!(value["count"], 1);
        assert_eq!(value["loans"][0]["user_name"], "Joao Santos");
        assert_eq!(value["loans"][0]["book_title"], "Clean Code");
        assert_eq!(value["loans"][0]["loan_id"], 0);
    }
}
