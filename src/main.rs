use std::{process::ExitCode, rc::Rc};

use chrono::{DateTime, Duration, Utc};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use library_loans::{
    Category, DelinquencyAlert, Library, LibraryError, LibraryResult, LoanReport, TracingObserver,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Which narrated walkthrough to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Verification and validation of the loan rules
    Corrected,
    /// Replays the past production incidents against the current rules
    Incidents,
    /// Both walkthroughs
    All,
}

/// Command-line arguments for the library loan demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Walkthrough to run
    #[arg(long, value_enum, default_value_t = Scenario::All)]
    scenario: Scenario,

    /// Print the open-loan report as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Log every state transition (overridden by `RUST_LOG`)
    #[arg(short, long)]
    verbose: bool,
}

/// Catalog numbers used by the walkthroughs
const CLEAN_CODE: &str = "9788535902772";
/// Second title for the student loan
const PYTHON_FLUENTE: &str = "9788575222683";
/// Written with separators on purpose
const METODOLOGIA: &str = "978-85-224-5758-7";

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_filter(args.verbose).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let result = match args.scenario {
        Scenario::Corrected => corrected_walkthrough(args.json),
        Scenario::Incidents => incident_replay(),
        Scenario::All => corrected_walkthrough(args.json).and_then(|()| incident_replay()),
    };

    match result {
        Ok(()) => {
            println!("\n{}", "Demonstration complete!".green().bold());
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{} {e}", "Unexpected error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Log filter used when `RUST_LOG` is unset
const fn default_log_filter(verbose: bool) -> &'static str {
    if verbose { "library_loans=debug" } else { "library_loans=info" }
}

/// `at` moved forward by whole days
fn days_after(at: DateTime<Utc>, days: i64) -> LibraryResult<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|delta| at.checked_add_signed(delta))
        .ok_or(LibraryError::ClockOverflow)
}

/// Library with the standard observers attached
fn new_library() -> (Library, Rc<DelinquencyAlert>) {
    let alert = Rc::new(DelinquencyAlert::new());
    let mut library = Library::new();
    library.register_observer(Box::new(TracingObserver));
    library.register_observer(Box::new(Rc::clone(&alert)));
    (library, alert)
}

/// Print whether an expected refusal happened
fn expect_refusal<T>(what: &str, result: LibraryResult<T>) {
    match result {
        Err(e) => println!("{} {what}: {e}", "ok".green()),
        Ok(_) => println!("{} {what} was accepted", "FAILURE".red().bold()),
    }
}

/// Walk through registration, loans and fees with the corrected rules
fn corrected_walkthrough(json: bool) -> LibraryResult<()> {
    println!("{}", "Corrected system: verification and validation".green().bold());
    println!("==============================================\n");

    let (mut library, _) = new_library();

    println!("{}", "Verification: input checks".yellow().bold());
    expect_refusal(
        "short catalog number rejected",
        library.register_book("123", "Livro Teste", "Autor Teste"),
    );
    let book = library.register_book(CLEAN_CODE, "Clean Code", "Robert Martin")?;
    println!("{} registered '{}' as {}", "ok".green(), book.title(), book.catalog_number());
    library.register_book(PYTHON_FLUENTE, "Python Fluente", "Luciano Ramalho")?;

    println!("\n{}", "Validation: loan periods".yellow().bold());
    library.register_user("prof001", "Dr. Silva", Category::Faculty)?;
    library.register_user("est001", "Joao Santos", Category::Student)?;

    let prof_loan = library.open_loan("prof001", CLEAN_CODE)?;
    println!("faculty loan period: {} days (required: 30)", prof_loan.grace_days());
    let (prof_loan, prof_due) = (prof_loan.id(), prof_loan.due_at());

    let student_loan = library.open_loan("est001", PYTHON_FLUENTE)?;
    println!("student loan period: {} days (required: 7)", student_loan.grace_days());
    let (student_loan, student_due) = (student_loan.id(), student_loan.due_at());

    println!("\n{}", "Open loans".yellow().bold());
    if json {
        match LoanReport::render_json(&library) {
            Ok(report) => println!("{report}"),
            Err(e) => println!("{} {e}", "could not encode report:".red()),
        }
    } else {
        print!("{}", LoanReport::render_text(&library));
    }

    println!("\n{}", "Late fees".yellow().bold());
    let fee = library.return_loan(prof_loan, Some(days_after(prof_due, 5)?))?;
    println!("faculty, 5 days late: {fee:.2} (5 x 0.50)");
    let fee = library.return_loan(student_loan, Some(days_after(student_due, 3)?))?;
    println!("student, 3 days late: {fee:.2} (3 x 1.00)");
    let again = library.return_loan(student_loan, None)?;
    println!("student returns the same loan again: {again:.2}");

    println!("\n{}", "Verification: missing records".yellow().bold());
    expect_refusal("unknown user handled", library.open_loan("user999", CLEAN_CODE));
    expect_refusal("unknown book handled", library.open_loan("prof001", "isbn999"));

    println!("\n{library}");
    Ok(())
}

/// Replay the incidents caused by earlier defects and show each one is now prevented
fn incident_replay() -> LibraryResult<()> {
    println!("\n{}", "Incident replay: mistake, defect, failure, incident".green().bold());
    println!("===================================================\n");

    let (mut library, alert) = new_library();
    library.register_book(CLEAN_CODE, "Clean Code", "Robert Martin")?;
    library.register_book(METODOLOGIA, "Metodologia Cientifica", "Autor Y")?;
    library.register_user("prof001", "Dr. Silva", Category::Faculty)?;
    library.register_user("est001", "Joao Santos", Category::Student)?;

    println!("{}", "Incident 1: blocked users kept borrowing".yellow().bold());
    let loan = library.open_loan("est001", CLEAN_CODE)?;
    let (loan, due) = (loan.id(), loan.due_at());
    let fee = library.return_loan(loan, Some(days_after(due, 51)?))?;
    println!("student charged {fee:.2}, blocked alerts raised: {}", alert.alerts());
    expect_refusal("blocked student refused", library.open_loan("est001", CLEAN_CODE));

    println!("\n{}", "Incident 2: faculty loan period too short".yellow().bold());
    let loan = library.open_loan("prof001", METODOLOGIA)?;
    println!("faculty loan period: {} days", loan.grace_days());
    let (loan, due) = (loan.id(), loan.due_at());

    println!("\n{}", "Incident 3: abusive faculty fee".yellow().bold());
    let fee = library.return_loan(loan, Some(days_after(due, 5)?))?;
    println!("faculty, 5 days late: {fee:.2} (was 25.00 before the fix)");

    println!("\n{}", "Incident 4: crash on unknown user".yellow().bold());
    match library.open_loan("user999", CLEAN_CODE) {
        Err(e @ LibraryError::UserNotFound(_)) => println!("{} handled: {e}", "ok".green()),
        other => println!("{} unexpected outcome: {other:?}", "FAILURE".red().bold()),
    }

    println!("\n{}", "Incident 5: duplicate registration overwrote a book".yellow().bold());
    expect_refusal(
        "duplicate catalog number rejected",
        library.register_book("9788535902772", "Overwritten", "Nobody"),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    #[allow(clippy::expect_used)]
    fn test_days_after_moves_forward() {
        let at = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).single().expect("valid timestamp");
        let later = days_after(at, 5).expect("in range");

        assert_eq!(later, Utc.with_ymd_and_hms(2025, 3, 8, 9, 0, 0).single().expect("valid"));
    }

    #[test]
    fn test_days_after_reports_overflow() {
        assert_eq!(days_after(DateTime::<Utc>::MAX_UTC, 1), Err(LibraryError::ClockOverflow));
        assert_eq!(days_after(Utc::now(), i64::MAX), Err(LibraryError::ClockOverflow));
    }

    #[test]
    fn test_default_log_filter_shows_transitions() {
        assert_eq!(default_log_filter(false), "library_loans=info");
        assert_eq!(default_log_filter(true), "library_loans=debug");
    }
}
