use std::fmt::Write;

use crate::models::{GradeRecord, PerformanceSummary};
use crate::performance::{self, ApprovalPolicy};

pub fn build_report(
    summary: &PerformanceSummary,
    records: &[GradeRecord],
    policy: ApprovalPolicy,
) -> String {
    let mut output = String::new();
    let learner_label = records
        .first()
        .map(|r| r.learner_name.as_str())
        .unwrap_or("unknown learner");

    let _ = writeln!(output, "# Performance Report");
    let _ = writeln!(
        output,
        "Learner {} in program {}",
        learner_label, summary.program
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(
        output,
        "- Overall weighted average: {:.2}",
        summary.overall_average
    );
    let _ = writeln!(
        output,
        "- Competencies approved: {} of {}",
        summary.approved_competencies, summary.total_competencies
    );
    let _ = writeln!(
        output,
        "- Completion: {:.1}%",
        summary.completion_percentage
    );
    let _ = writeln!(output, "- Trend: {}", summary.trend.label());
    let _ = writeln!(
        output,
        "- Certificate eligible: {}",
        if performance::certificate_eligible(summary, policy) {
            "yes"
        } else {
            "no"
        }
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Competency Breakdown");

    if summary.competencies.is_empty() {
        let _ = writeln!(output, "No grade records for this program.");
    } else {
        for breakdown in summary.competencies.iter() {
            let _ = writeln!(
                output,
                "- {}: avg {:.2} over {} activities ({})",
                breakdown.competency,
                breakdown.average,
                breakdown.record_count,
                breakdown.status.label()
            );
        }
    }

    let mut recent = records.to_vec();
    recent.sort_by(|a, b| b.evaluated_at.cmp(&a.evaluated_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Activity");

    if recent.is_empty() {
        let _ = writeln!(output, "No grade records for this program.");
    } else {
        for record in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} ({}) on {}: {:.1}/{:.0}{}",
                record.activity,
                record.competency,
                record.evaluated_at,
                record.score,
                record.max_score,
                if record.observation.is_empty() {
                    String::new()
                } else {
                    format!(" - {}", record.observation)
                }
            );
        }
    }

    output
}
