use colored::Colorize;

use crate::sync::{
    BatchResult, EntityKind, EntityStatus, ErrorRow, PullStats, PushAction, PushOutcome, PushResult,
    SkipReason,
};

/// Format per-entity sync status as a table
pub fn format_status_pretty(rows: &[(EntityKind, EntityStatus)]) -> String {
    let mut output = format!(
        "{:<16}{:>8}{:>10}{:>10}{:>13}\n",
        "Entity".bold(),
        "Total".bold(),
        "Pending".bold(),
        "Failing".bold(),
        "Unconfirmed".bold()
    );
    output.push_str(&"─".repeat(57));
    output.push('\n');

    for (kind, status) in rows {
        let pending = if status.pending > 0 {
            status.pending.to_string().yellow()
        } else {
            status.pending.to_string().green()
        };
        let failing = if status.failing > 0 {
            status.failing.to_string().red()
        } else {
            status.failing.to_string().normal()
        };
        let unconfirmed = if status.unconfirmed > 0 {
            status.unconfirmed.to_string().red().bold()
        } else {
            status.unconfirmed.to_string().normal()
        };

        output.push_str(&format!(
            "{:<16}{:>8}{:>10}{:>10}{:>13}\n",
            kind.to_string(),
            status.total,
            pending,
            failing,
            unconfirmed
        ));
    }

    output
}

/// Format batch results, one summary block per entity
pub fn format_batches_pretty(batches: &[BatchResult]) -> String {
    let mut output = String::new();

    for batch in batches {
        if batch.total == 0 {
            output.push_str(&format!("{} {}\n", batch.entity.to_string().bold(), "nothing to push".dimmed()));
            continue;
        }

        let mode = if batch.dry_run { " (dry run)" } else { "" };
        output.push_str(&format!(
            "{}{}: {} ok, {} errors ({} skipped) of {}\n",
            batch.entity.to_string().bold(),
            mode.dimmed(),
            batch.success_count.to_string().green(),
            if batch.error_count > 0 {
                batch.error_count.to_string().red()
            } else {
                batch.error_count.to_string().normal()
            },
            batch.skipped_count,
            batch.total
        ));

        for result in &batch.results {
            output.push_str("  ");
            output.push_str(&outcome_line(result));
            output.push('\n');
        }
        // Errors without a push result: the record could not be read.
        for error in &batch.errors {
            if !batch.results.iter().any(|r| r.local_id == error.local_id) {
                output.push_str(&format!("  {} #{}  {}\n", "[!]".red(), error.local_id, error.message));
            }
        }
    }

    output
}

/// Format a single push result
pub fn format_push_result_pretty(result: &PushResult) -> String {
    outcome_line(result)
}

fn outcome_line(result: &PushResult) -> String {
    let label = format!("{} #{}", result.entity.singular(), result.local_id);
    let mut line = match &result.outcome {
        PushOutcome::Created { remote_id, clean } => format!(
            "{} {}  created {}{}",
            "[+]".green(),
            label,
            remote_id.to_string().cyan(),
            stale_note(*clean)
        ),
        PushOutcome::Updated { remote_id, clean } => format!(
            "{} {}  updated {}{}",
            "[~]".green(),
            label,
            remote_id.to_string().cyan(),
            stale_note(*clean)
        ),
        PushOutcome::Planned { action, remote_id } => {
            let target = remote_id
                .as_ref()
                .map(|id| format!(" {}", id.to_string().cyan()))
                .unwrap_or_default();
            let verb = match action {
                PushAction::Create => "would create",
                PushAction::Update => "would update",
            };
            format!("{} {}  {}{}", "[?]".dimmed(), label, verb, target)
        },
        PushOutcome::Skipped { reason, message } => format!(
            "{} {}  skipped ({}): {}",
            "[-]".yellow(),
            label,
            skip_label(*reason),
            message
        ),
        PushOutcome::Failed {
            error,
            message,
            retryable,
            retry_after_ms,
        } => {
            let mut line = format!("{} {}  {} error: {}", "[x]".red(), label, error, message);
            if *retryable {
                line.push_str(&format!("  {}", "retryable".dimmed()));
            }
            if let Some(ms) = retry_after_ms {
                line.push_str(&format!(" {}", format!("(retry after {ms}ms)").dimmed()));
            }
            line
        },
    };

    if let Some(secondary) = &result.secondary_error {
        line.push_str(&format!("\n    {} {}", "follow-up failed:".yellow(), secondary));
    }
    line
}

const fn skip_label(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::InvalidIdentity => "reserved id",
        SkipReason::MissingParent => "missing parent",
        SkipReason::Claimed => "claimed",
        SkipReason::UnconfirmedCreate => "unconfirmed create",
    }
}

fn stale_note(clean: bool) -> String {
    if clean {
        String::new()
    } else {
        format!("  {}", "edited during push, still pending".yellow())
    }
}

/// Format pull statistics, one line per entity
pub fn format_pull_stats_pretty(stats: &[PullStats]) -> String {
    let mut output = String::new();

    for s in stats {
        let icon = if s.is_clean() { "[ok]".green() } else { "[!!]".red() };
        output.push_str(&format!(
            "{} {}: {} fetched, {} created, {} updated, {} kept local, {} errors ({} pages)\n",
            icon,
            s.entity.to_string().bold(),
            s.fetched,
            s.created,
            s.updated,
            s.skipped,
            s.errors,
            s.pages
        ));
        if let Some(failure) = &s.failure {
            output.push_str(&format!("  {} {}\n", "stopped:".red(), failure));
        }
        for detail in &s.error_details {
            output.push_str(&format!("  {}\n", detail.dimmed()));
        }
    }

    output
}

/// Format failing records as a list
pub fn format_errors_pretty(kind: EntityKind, rows: &[ErrorRow]) -> String {
    if rows.is_empty() {
        return format!("{kind} (0 errors)\n  No errors");
    }

    let mut output = format!("{kind} ({} errors)\n", rows.len());
    output.push_str(&"─".repeat(60));
    output.push('\n');

    for row in rows {
        let remote = row.remote_id.as_deref().unwrap_or("-");
        let state = if row.dirty { "pending".yellow() } else { "clean".green() };
        output.push_str(&format!(
            "#{:<6} {}  {}  {}\n",
            row.local_id,
            remote.dimmed(),
            state,
            row.last_error
        ));
    }

    output
}
