//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::restore::{RestoreReport, RestoreStatus};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Short label and destination column for a restore status.
fn status_cells(status: &RestoreStatus) -> (String, String) {
    match status {
        RestoreStatus::Written(path) => ("written".into(), path.display().to_string()),
        RestoreStatus::KeptExisting(path) => ("kept existing".into(), path.display().to_string()),
        RestoreStatus::Unrecognized => ("unrecognized".into(), "-".into()),
        RestoreStatus::WriteFailed { path, reason } => {
            (format!("failed: {reason}"), path.display().to_string())
        }
    }
}

/// Print a table of restore outcomes (Entry, Status, Destination).
pub fn print_restore_table(report: &RestoreReport) {
    if report.outcomes.is_empty() {
        info("The archive contained no entries.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Entry", "Status", "Destination"]);

    for outcome in &report.outcomes {
        let (status, dest) = status_cells(&outcome.status);
        table.add_row(vec![outcome.name.clone(), status, dest]);
    }

    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn status_cells_describe_each_outcome() {
        let (label, dest) = status_cells(&RestoreStatus::Written(PathBuf::from("/k/id_rsa")));
        assert_eq!(label, "written");
        assert_eq!(dest, "/k/id_rsa");

        let (label, dest) = status_cells(&RestoreStatus::Unrecognized);
        assert_eq!(label, "unrecognized");
        assert_eq!(dest, "-");

        let (label, _) = status_cells(&RestoreStatus::WriteFailed {
            path: PathBuf::from("/ro/id_rsa"),
            reason: "permission denied".into(),
        });
        assert_eq!(label, "failed: permission denied");
    }
}
