//! Plain-text run summary.

use std::fmt::Write;

use stationqc::core::PipelineReport;

/// Renders the per-stage counts and the failed stations, sorted by id.
pub fn render(report: &PipelineReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Pipeline '{}' over {} stations ({:.1} s)",
        report.pipeline,
        report.universe,
        report.duration_ms / 1000.0
    );

    for stage in &report.stages {
        let _ = writeln!(
            out,
            "\n[{}] Success: {}, Failed: {}{}",
            stage.stage,
            stage.succeeded,
            stage.failed,
            if stage.cancelled { " (cancelled)" } else { "" }
        );
        if stage.has_failures() {
            let _ = writeln!(out, "  Failed stations:");
            for failure in stage.sorted_failures() {
                let _ = writeln!(out, "    {}", failure.message);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use stationqc::core::{CheckOutcome, StageReport};

    #[test]
    fn test_render_lists_failures_sorted() {
        let mut report = PipelineReport::new("qc", 3);
        report.stages.push(StageReport::from_outcomes(
            "integrity",
            &[
                CheckOutcome::failed("C3".into(), "bad"),
                CheckOutcome::success("A1".into()),
                CheckOutcome::failed("B2".into(), "missing"),
            ],
        ));
        report.stages.push(StageReport::from_outcomes("outlier", &[CheckOutcome::success("A1".into())]));

        let text = render(&report);

        assert!(text.contains("[integrity] Success: 1, Failed: 2"));
        assert!(text.contains("[outlier] Success: 1, Failed: 0"));
        let b2 = text.find("B2: missing").unwrap();
        let c3 = text.find("C3: bad").unwrap();
        assert!(b2 < c3);
        assert_eq!(text.matches("Failed stations:").count(), 1);
    }
}
