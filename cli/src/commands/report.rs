//! Plain text rendering of operation results
use std::collections::BTreeMap;

use worklog::types::{RunSummary, SynchronizationRun, WorklogRecord};
use worklog::OperationResult;

pub fn print(result: &OperationResult) {
    match result {
        OperationResult::Synchronised {
            summary,
            unfinished,
        } => {
            for run in unfinished {
                eprintln!(
                    "Warning: synchronisation {} from {} is still unfinished, export or cancel it",
                    run.id,
                    run.date_started_from.format("%Y-%m-%d %H:%M")
                );
            }
            print_summary(summary, &BTreeMap::new());
            println!(
                "Review with 'worklog-sync show -r {id}', send with 'worklog-sync export -r {id}'",
                id = summary.run.id
            );
        }
        OperationResult::Validated(outcome, summary) => {
            println!(
                "{} issue(s) confirmed, {} rejected",
                outcome.confirmed, outcome.rejected
            );
            print_summary(summary, &BTreeMap::new());
        }
        OperationResult::Summary(summary, members) => print_summary(summary, members),
        OperationResult::Exported(report) => {
            println!(
                "Exported {} worklog(s), {} rejected by the target",
                report.exported, report.rejected
            );
        }
        OperationResult::Cancelled(id) => println!("Synchronisation {id} cancelled"),
        OperationResult::Edited(worklog) => {
            println!("Worklog updated:");
            print_header();
            print_worklog(worklog, "");
        }
        OperationResult::Deleted(id) => println!("Worklog {id} deleted"),
        OperationResult::IssueSuggestions(suggestions) => {
            if suggestions.is_empty() {
                println!("No issues found");
            }
            for suggestion in suggestions {
                println!("{:<16} {}", suggestion.id, suggestion.label);
            }
        }
        OperationResult::Runs {
            runs,
            days_since_last_sync,
        } => print_runs(runs, *days_since_last_sync),
        OperationResult::Providers { kinds, connections } => {
            println!("{:<10} {:<7} {:<7} Fields", "Provider", "Import", "Export");
            for kind in kinds {
                println!(
                    "{:<10} {:<7} {:<7} {}",
                    kind.name(),
                    yes_no(kind.can_import()),
                    yes_no(kind.can_export()),
                    kind.form_fields().join(", ")
                );
            }
            println!();
            if connections.is_empty() {
                println!("No connections configured");
            }
            for connection in connections {
                println!(
                    "{:>4} {:<20} {:<10} {}",
                    connection.id, connection.name, connection.provider, connection.server
                );
            }
        }
    }
}

fn print_summary(summary: &RunSummary, members: &BTreeMap<i64, Vec<WorklogRecord>>) {
    println!(
        "Synchronisation {} ({}), entries from {}",
        summary.run.id,
        summary.run.state(),
        summary.run.date_started_from.format("%Y-%m-%d %H:%M")
    );
    print_header();
    for worklog in &summary.worklogs {
        print_worklog(worklog, "");
        if let Some(children) = members.get(&worklog.id) {
            for child in children {
                print_worklog(child, "  ");
            }
        }
    }
    println!(
        "To synchronise: {}  Skipped: {}",
        hh_mm(summary.total_synchronized),
        hh_mm(summary.total_skipped)
    );
}

fn print_header() {
    println!(
        "{:>6} {:<16} {:>6} {:<12} {:<10} Comment",
        "Id", "Started", "Time", "Issue", "Status"
    );
}

fn print_worklog(worklog: &WorklogRecord, indent: &str) {
    println!(
        "{indent}{:>6} {:<16} {:>6} {:<12} {:<10} {}",
        worklog.id,
        worklog.date_started.format("%Y-%m-%d %H:%M"),
        hh_mm(worklog.duration),
        worklog.issue_id.as_deref().unwrap_or("-"),
        status(worklog),
        worklog.comment
    );
}

fn print_runs(runs: &[SynchronizationRun], days_since_last_sync: Option<i64>) {
    match days_since_last_sync {
        Some(days) => println!("{days} day(s) since your last export"),
        None => println!("Nothing has been exported yet"),
    }
    println!(
        "{:>6} {:<10} {:>6} {:>6} {:<16} Created",
        "Id", "State", "Source", "Target", "From"
    );
    for run in runs {
        println!(
            "{:>6} {:<10} {:>6} {:>6} {:<16} {}",
            run.id,
            run.state(),
            run.source_id,
            run.target_id,
            run.date_started_from.format("%Y-%m-%d %H:%M"),
            run.date_created.format("%Y-%m-%d %H:%M")
        );
    }
}

fn status(worklog: &WorklogRecord) -> &'static str {
    match (worklog.is_valid, worklog.is_issue_confirmed) {
        (false, _) => "invalid",
        (true, Some(true)) => "confirmed",
        (true, Some(false)) => "unknown",
        (true, None) => "unchecked",
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn hh_mm(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let seconds = seconds.abs();
    format!("{sign}{}:{:02}", seconds / 3600, (seconds % 3600) / 60)
}
