//! Formatted terminal output.
//!
//! Formatting lives here so the pipeline only decides *what* to print:
//! - per-Target result tables (parameters, statistics, flux)
//! - the end-of-batch summary

use crate::domain::{OutcomeStatus, TargetOutcome};
use crate::report::tables::ResultTables;

/// Format the three result tables of one Target.
pub fn format_tables(tables: &ResultTables) -> String {
    let mut out = String::new();

    out.push_str("Parameters:\n");
    push_row(&mut out, format!("{:<10} {:<10} {:>14} {:>14}", "model", "parameter", "value", "error"));
    push_row(&mut out, format!("{:-<10} {:-<10} {:-<14} {:-<14}", "", "", "", ""));
    for row in &tables.parameters {
        let error = row.error.map(fmt_num).unwrap_or_else(|| "frozen".to_string());
        push_row(
            &mut out,
            format!(
                "{:<10} {:<10} {:>14} {:>14}",
                row.model.name(),
                truncate(&row.parameter, 10),
                fmt_num(row.value),
                error
            ),
        );
    }

    out.push_str("\nFit statistics:\n");
    push_row(&mut out, format!("{:<10} {:>12} {:>8} {:>10}", "model", "chi2", "dof", "red_chi2"));
    push_row(&mut out, format!("{:-<10} {:-<12} {:-<8} {:-<10}", "", "", "", ""));
    for row in &tables.statistics {
        push_row(
            &mut out,
            format!(
                "{:<10} {:>12.4} {:>8} {:>10.4}",
                row.model.name(),
                row.chi_squared,
                row.dof,
                row.reduced_chi_squared
            ),
        );
    }

    if !tables.fluxes.is_empty() {
        out.push_str("\nFlux (erg/cm^2/s):\n");
        push_row(&mut out, format!("{:<10} {:>14} {:>14} {:>14}", "model", "flux", "low", "high"));
        push_row(&mut out, format!("{:-<10} {:-<14} {:-<14} {:-<14}", "", "", "", ""));
        for row in &tables.fluxes {
            push_row(
                &mut out,
                format!(
                    "{:<10} {:>14} {:>14} {:>14}",
                    row.model.name(),
                    fmt_num(row.flux),
                    fmt_num(row.error_low),
                    fmt_num(row.error_high)
                ),
            );
        }
    }

    out
}

/// Format the end-of-batch summary.
pub fn format_batch_summary(outcomes: &[TargetOutcome]) -> String {
    let mut out = String::new();

    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    let incomplete = outcomes
        .iter()
        .filter(|o| matches!(o.status, OutcomeStatus::Incomplete { .. }))
        .count();

    out.push_str("=== xsb - batch summary ===\n");
    out.push_str(&format!(
        "Targets: {} | ok={} | incomplete={} | failed={}\n",
        outcomes.len(),
        outcomes.len() - failed - incomplete,
        incomplete,
        failed
    ));

    for outcome in outcomes.iter().filter(|o| !matches!(o.status, OutcomeStatus::Ok)) {
        push_row(
            &mut out,
            format!(
                "  {:<11} {} {}",
                outcome.status.label(),
                outcome.path.display(),
                outcome.status.detail()
            ),
        );
    }

    out
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

fn fmt_num(v: f64) -> String {
    let magnitude = v.abs();
    if magnitude != 0.0 && !(1e-3..1e5).contains(&magnitude) {
        format!("{v:.4e}")
    } else {
        format!("{v:.4}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
