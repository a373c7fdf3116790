//! Generate formatters: live status lines and the end-of-run summary.

use super::shared::status_label;
use crate::generation::{PlanSource, SessionReport};
use crate::session::ArtifactStatus;
use crate::types::ArtifactId;

/// One progress line for an artifact whose style or status changed.
pub fn format_status_transition(
    artifact: &ArtifactId,
    style: &str,
    status: ArtifactStatus,
    bytes: usize,
) -> String {
    format!("[{}] {:<24} {} ({} B)", artifact, style, status_label(status), bytes)
}

/// Totals and per-job failure reasons for a finished run.
pub fn format_report_summary(report: &SessionReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Session {}: {} complete, {} failed\n",
        report.session_id,
        report.completed(),
        report.failed()
    ));
    if report.plan_source == PlanSource::Fallback {
        out.push_str("Style planning failed; built-in styles were used.\n");
    }
    for job in &report.jobs {
        if let Err(reason) = &job.result {
            out.push_str(&format!("  {} ({}): {}\n", job.artifact, job.style, reason));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{JobOutcome, StreamSummary};
    use crate::types::SessionId;

    #[test]
    fn test_report_lists_failures_only() {
        let report = SessionReport {
            session_id: SessionId::from("s1"),
            plan_source: PlanSource::Fallback,
            jobs: vec![
                JobOutcome {
                    artifact: ArtifactId::from("s1_0"),
                    style: "Minimal".to_string(),
                    result: Ok(StreamSummary::default()),
                },
                JobOutcome {
                    artifact: ArtifactId::from("s1_1"),
                    style: "Bold".to_string(),
                    result: Err("quota exceeded".to_string()),
                },
            ],
        };
        let output = format_report_summary(&report);
        assert!(output.contains("1 complete, 1 failed"));
        assert!(output.contains("built-in styles"));
        assert!(output.contains("s1_1 (Bold): quota exceeded"));
        assert!(!output.contains("s1_0 (Minimal)"));
    }

    #[test]
    fn test_status_transition_line() {
        let line = format_status_transition(
            &ArtifactId::from("s1_0"),
            "Glass",
            ArtifactStatus::Complete,
            42,
        );
        assert!(line.starts_with("[s1_0] Glass"));
        assert!(line.contains("complete"));
        assert!(line.ends_with("(42 B)"));
    }
}
