//! Call metrics and report files
//!
//! Per-call metrics computed from the finished summary, written as a small
//! markdown report for the operations folder.

use std::path::{Path, PathBuf};

use serde::Serialize;

use callbridge_relay::CallSummary;

/// Computed metrics for one call.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CallMetrics {
    /// Transcript events per second of call time.
    pub tps: f64,
    pub duration_secs: f64,
    pub guardrail_rejects: u32,
    pub policy_rejects: u32,
    pub state_violations: u32,
    pub calendar_errors: u32,
}

/// Compute metrics from a finished call's summary.
pub fn compute_call_metrics(summary: &CallSummary) -> CallMetrics {
    let duration_secs = summary.duration_secs();
    let tps = if duration_secs > 0.0 {
        summary.transcripts.len() as f64 / duration_secs
    } else {
        0.0
    };
    CallMetrics {
        tps,
        duration_secs,
        guardrail_rejects: summary.guardrail_rejects,
        policy_rejects: summary.policy_rejects,
        state_violations: summary.state_violations,
        calendar_errors: summary.calendar_errors,
    }
}

/// Write the metrics to a markdown report and return its path.
pub fn write_report(
    reports_dir: &str,
    call_id: &str,
    metrics: &CallMetrics,
) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(reports_dir)?;
    let path = Path::new(reports_dir).join(format!("{call_id}_report.md"));

    let mut contents = format!("# Call Report {call_id}\n\n");
    contents.push_str(&format!("TPS: {:.2}\n", metrics.tps));
    contents.push_str(&format!("Duration: {:.2} seconds\n", metrics.duration_secs));
    contents.push_str(&format!("Guardrail Rejects: {}\n", metrics.guardrail_rejects));
    contents.push_str(&format!("Policy Rejects: {}\n", metrics.policy_rejects));
    contents.push_str(&format!("State Violations: {}\n", metrics.state_violations));
    contents.push_str(&format!("Calendar Errors: {}\n", metrics.calendar_errors));

    std::fs::write(&path, contents)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use callbridge_core::{ConversationState, TranscriptEvent, Verdict};
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn summary(transcripts: usize, duration_secs: i64) -> CallSummary {
        let started_at = Utc::now();
        CallSummary {
            call_id: "CA1".to_string(),
            stream_sid: "MZ1".to_string(),
            started_at,
            ended_at: started_at + Duration::seconds(duration_secs),
            final_state: ConversationState::Complete,
            transcripts: (0..transcripts)
                .map(|_| TranscriptEvent::new(json!({}), None, Verdict::Accepted))
                .collect(),
            guardrail_rejects: 1,
            policy_rejects: 0,
            state_violations: 2,
            calendar_errors: 0,
        }
    }

    #[test]
    fn test_tps_over_duration() {
        let metrics = compute_call_metrics(&summary(10, 20));
        assert!((metrics.tps - 0.5).abs() < 1e-9);
        assert_eq!(metrics.guardrail_rejects, 1);
        assert_eq!(metrics.state_violations, 2);
    }

    #[test]
    fn test_zero_duration_has_zero_tps() {
        let metrics = compute_call_metrics(&summary(5, 0));
        assert_eq!(metrics.tps, 0.0);
    }

    #[test]
    fn test_report_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let metrics = compute_call_metrics(&summary(4, 8));

        let path = write_report(dir.path().to_str().unwrap(), "CA1", &metrics).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("# Call Report CA1"));
        assert!(contents.contains("TPS: 0.50"));
        assert!(contents.contains("Guardrail Rejects: 1"));
        assert!(path.file_name().unwrap().to_str().unwrap().ends_with("_report.md"));
    }
}
