//! Text report builder for headless output.
//!
//! Formats the final run report as plain aligned lines for `--text` mode.

use crate::model::{MatchStatus, RunReport, Severity};

pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn build_text_summary(report: &RunReport) -> TextSummary {
    let mut lines = Vec::new();

    let status = &report.status;
    lines.push(format!(
        "Run: {} ({}%) - {}",
        status.phase, status.progress_percent, status.message
    ));
    if let Some(started) = status.started_at_rfc3339() {
        lines.push(format!("Started: {started}"));
    }

    lines.push(String::new());
    lines.push(format!("Competitors ({}):", report.competitors.len()));
    for c in &report.competitors {
        lines.push(format!(
            "  {} ({})  ${}k-${}k  score {}  alerts {}",
            c.name,
            c.builder,
            c.price_min / 1000,
            c.price_max / 1000,
            c.alignment_score,
            c.alerts
        ));
    }

    lines.push(String::new());
    lines.push(format!("Alerts ({}):", report.alerts.len()));
    for a in &report.alerts {
        let sev = match a.severity {
            Severity::High => "HIGH",
            Severity::Medium => "MED",
            Severity::Low => "LOW",
        };
        lines.push(format!(
            "  [{sev}] {}: {} ({})",
            a.competitor_name, a.message, a.date
        ));
    }

    let pending = report
        .assignments
        .iter()
        .filter(|m| m.status == MatchStatus::Pending)
        .count();
    lines.push(String::new());
    lines.push(format!(
        "Scout queue: {} matches, {} awaiting review",
        report.assignments.len(),
        pending
    ));

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RunPhase, RunSnapshot};

    #[test]
    fn summary_leads_with_the_run_outcome() {
        let report = RunReport {
            status: RunSnapshot {
                phase: RunPhase::Completed,
                progress_percent: 100,
                message: "CMA run complete".into(),
                started_at: Some(1_700_000_000_000),
                items_processed: 0,
                items_total: 0,
            },
            competitors: Vec::new(),
            alerts: Vec::new(),
            assignments: Vec::new(),
        };
        let summary = build_text_summary(&report);
        assert_eq!(summary.lines[0], "Run: Done (100%) - CMA run complete");
        assert!(summary.lines.iter().any(|l| l.starts_with("Started: 2023")));
        assert!(summary
            .lines
            .iter()
            .any(|l| l == "Scout queue: 0 matches, 0 awaiting review"));
    }
}
