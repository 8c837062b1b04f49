use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{
    CompetencyBreakdown, CompetencyStatus, GradeRecord, PerformanceSummary, Trend,
};

/// Status thresholds, on the same scale as raw scores. Passed explicitly so
/// the aggregator stays pure; callers that want institution defaults use
/// `ApprovalPolicy::default()`.
#[derive(Debug, Clone, Copy)]
pub struct ApprovalPolicy {
    pub approved_min: f64,
    pub in_progress_min: f64,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        ApprovalPolicy {
            approved_min: 70.0,
            in_progress_min: 50.0,
        }
    }
}

/// Trend compares the mean of the most recent records against everything
/// before them. Fewer than MIN_TREND_RECORDS yields Stable.
const TREND_RECENT_WINDOW: usize = 3;
const MIN_TREND_RECORDS: usize = 4;
const TREND_DELTA: f64 = 5.0;

struct CompetencyAcc {
    competency: String,
    total_score: f64,
    record_count: usize,
}

/// Aggregate a learner's grade records for one program into a summary.
///
/// Records are expected to already belong to the given learner and program;
/// filtering is the caller's job. Groups appear in first-occurrence order of
/// their competency, the per-competency average is an unweighted mean of raw
/// scores, and the overall average weights every record by its `weight`
/// field. Empty input is a defined summary (all zeros, stable trend), never
/// an error.
pub fn summarize(
    learner_id: Uuid,
    program: &str,
    records: &[GradeRecord],
    policy: ApprovalPolicy,
) -> PerformanceSummary {
    let mut groups: Vec<CompetencyAcc> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    let mut weighted_total = 0.0;
    let mut weight_total = 0.0;

    for record in records {
        let slot = *index.entry(record.competency.as_str()).or_insert_with(|| {
            groups.push(CompetencyAcc {
                competency: record.competency.clone(),
                total_score: 0.0,
                record_count: 0,
            });
            groups.len() - 1
        });

        groups[slot].total_score += record.score;
        groups[slot].record_count += 1;

        weighted_total += record.score * record.weight;
        weight_total += record.weight;
    }

    let competencies: Vec<CompetencyBreakdown> = groups
        .into_iter()
        .map(|acc| {
            let average = acc.total_score / acc.record_count as f64;
            CompetencyBreakdown {
                competency: acc.competency,
                record_count: acc.record_count,
                average,
                status: status_for(average, policy),
            }
        })
        .collect();

    let overall_average = if weight_total > 0.0 {
        weighted_total / weight_total
    } else {
        0.0
    };

    let approved_competencies = competencies
        .iter()
        .filter(|c| c.status == CompetencyStatus::Approved)
        .count();
    let total_competencies = competencies.len();

    let completion_percentage = if total_competencies == 0 {
        0.0
    } else {
        approved_competencies as f64 / total_competencies as f64 * 100.0
    };

    PerformanceSummary {
        learner_id,
        program: program.to_string(),
        overall_average,
        approved_competencies,
        total_competencies,
        completion_percentage,
        competencies,
        trend: compute_trend(records),
    }
}

pub fn status_for(average: f64, policy: ApprovalPolicy) -> CompetencyStatus {
    if average >= policy.approved_min {
        CompetencyStatus::Approved
    } else if average >= policy.in_progress_min {
        CompetencyStatus::InProgress
    } else {
        CompetencyStatus::Failed
    }
}

/// Sorts by evaluation date (stable, so same-day records keep input order),
/// then compares the mean of the last three records against the mean of all
/// earlier ones. A shift of at least five points either way moves the label
/// off Stable.
pub fn compute_trend(records: &[GradeRecord]) -> Trend {
    if records.len() < MIN_TREND_RECORDS {
        return Trend::Stable;
    }

    let mut ordered: Vec<&GradeRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.evaluated_at);

    let split = ordered.len() - TREND_RECENT_WINDOW;
    let baseline_mean = mean(&ordered[..split]);
    let recent_mean = mean(&ordered[split..]);

    let delta = recent_mean - baseline_mean;
    if delta >= TREND_DELTA {
        Trend::Improving
    } else if delta <= -TREND_DELTA {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

fn mean(records: &[&GradeRecord]) -> f64 {
    records.iter().map(|r| r.score).sum::<f64>() / records.len() as f64
}

/// Certificate issuance gate: every competency approved and the overall
/// weighted average at or above the approval threshold. Belongs to the
/// calling workflow, not to `summarize` itself.
pub fn certificate_eligible(summary: &PerformanceSummary, policy: ApprovalPolicy) -> bool {
    summary.total_competencies > 0
        && summary.approved_competencies == summary.total_competencies
        && summary.overall_average >= policy.approved_min
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(competency: &str, score: f64, weight: f64, day: u32) -> GradeRecord {
        GradeRecord {
            learner_id: Uuid::nil(),
            learner_name: "Avery Lee".to_string(),
            learner_email: "avery@example.com".to_string(),
            program: "Data Analysis".to_string(),
            competency: competency.to_string(),
            activity: format!("activity-{day}"),
            score,
            max_score: 100.0,
            weight,
            observation: String::new(),
            evaluated_at: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
        }
    }

    fn summarize_default(records: &[GradeRecord]) -> PerformanceSummary {
        summarize(Uuid::nil(), "Data Analysis", records, ApprovalPolicy::default())
    }

    #[test]
    fn overall_average_is_weighted_mean() {
        let records = vec![
            record("C1", 90.0, 1.0, 1),
            record("C1", 60.0, 3.0, 2),
            record("C2", 80.0, 2.0, 3),
        ];
        let summary = summarize_default(&records);
        let expected = (90.0 * 1.0 + 60.0 * 3.0 + 80.0 * 2.0) / 6.0;
        assert!((summary.overall_average - expected).abs() < 1e-9);
    }

    #[test]
    fn competency_average_ignores_weights() {
        let records = vec![record("C1", 90.0, 1.0, 1), record("C1", 70.0, 9.0, 2)];
        let summary = summarize_default(&records);
        assert_eq!(summary.competencies.len(), 1);
        assert!((summary.competencies[0].average - 80.0).abs() < 1e-9);
        assert_eq!(summary.competencies[0].status, CompetencyStatus::Approved);
    }

    #[test]
    fn status_boundaries_are_inclusive_at_lower_edge() {
        let policy = ApprovalPolicy::default();
        assert_eq!(status_for(70.0, policy), CompetencyStatus::Approved);
        assert_eq!(status_for(69.99, policy), CompetencyStatus::InProgress);
        assert_eq!(status_for(50.0, policy), CompetencyStatus::InProgress);
        assert_eq!(status_for(49.99, policy), CompetencyStatus::Failed);
    }

    #[test]
    fn single_mid_score_record() {
        let records = vec![record("C1", 55.0, 2.0, 1)];
        let summary = summarize_default(&records);
        assert!((summary.overall_average - 55.0).abs() < 1e-9);
        assert_eq!(summary.competencies[0].status, CompetencyStatus::InProgress);
        assert_eq!(summary.total_competencies, 1);
        assert_eq!(summary.approved_competencies, 0);
        assert!((summary.completion_percentage - 0.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_yields_zeroed_summary() {
        let summary = summarize_default(&[]);
        assert_eq!(summary.overall_average, 0.0);
        assert_eq!(summary.total_competencies, 0);
        assert_eq!(summary.approved_competencies, 0);
        assert_eq!(summary.completion_percentage, 0.0);
        assert!(summary.competencies.is_empty());
        assert_eq!(summary.trend, Trend::Stable);
    }

    #[test]
    fn competencies_keep_first_occurrence_order() {
        let records = vec![
            record("SQL", 80.0, 1.0, 1),
            record("Viz", 75.0, 1.0, 2),
            record("SQL", 85.0, 1.0, 3),
            record("Stats", 60.0, 1.0, 4),
        ];
        let summary = summarize_default(&records);
        let order: Vec<&str> = summary
            .competencies
            .iter()
            .map(|c| c.competency.as_str())
            .collect();
        assert_eq!(order, vec!["SQL", "Viz", "Stats"]);
    }

    #[test]
    fn completion_percentage_counts_approved_share() {
        let records = vec![
            record("C1", 90.0, 1.0, 1),
            record("C2", 40.0, 1.0, 2),
            record("C3", 75.0, 1.0, 3),
            record("C4", 60.0, 1.0, 4),
        ];
        let summary = summarize_default(&records);
        assert_eq!(summary.approved_competencies, 2);
        assert_eq!(summary.total_competencies, 4);
        assert!((summary.completion_percentage - 50.0).abs() < 1e-9);
        assert!(summary.completion_percentage >= 0.0);
        assert!(summary.completion_percentage <= 100.0);
    }

    #[test]
    fn summarize_is_idempotent() {
        let records = vec![
            record("C1", 90.0, 1.0, 1),
            record("C2", 55.0, 2.0, 2),
            record("C1", 70.0, 1.5, 3),
            record("C3", 88.0, 1.0, 4),
        ];
        let first = summarize_default(&records);
        let second = summarize_default(&records);
        assert_eq!(first.overall_average, second.overall_average);
        assert_eq!(first.completion_percentage, second.completion_percentage);
        assert_eq!(first.trend, second.trend);
        assert_eq!(first.competencies.len(), second.competencies.len());
        for (a, b) in first.competencies.iter().zip(second.competencies.iter()) {
            assert_eq!(a.competency, b.competency);
            assert_eq!(a.average, b.average);
            assert_eq!(a.status, b.status);
        }
    }

    #[test]
    fn trend_needs_enough_history() {
        let records = vec![
            record("C1", 40.0, 1.0, 1),
            record("C1", 90.0, 1.0, 2),
            record("C1", 95.0, 1.0, 3),
        ];
        assert_eq!(compute_trend(&records), Trend::Stable);
    }

    #[test]
    fn trend_detects_improvement() {
        let records = vec![
            record("C1", 50.0, 1.0, 1),
            record("C1", 55.0, 1.0, 2),
            record("C2", 80.0, 1.0, 3),
            record("C2", 85.0, 1.0, 4),
            record("C3", 90.0, 1.0, 5),
        ];
        assert_eq!(compute_trend(&records), Trend::Improving);
    }

    #[test]
    fn trend_detects_decline() {
        let records = vec![
            record("C1", 90.0, 1.0, 1),
            record("C1", 85.0, 1.0, 2),
            record("C2", 60.0, 1.0, 3),
            record("C2", 55.0, 1.0, 4),
            record("C3", 50.0, 1.0, 5),
        ];
        assert_eq!(compute_trend(&records), Trend::Declining);
    }

    #[test]
    fn trend_ignores_input_order() {
        let mut records = vec![
            record("C1", 50.0, 1.0, 1),
            record("C1", 55.0, 1.0, 2),
            record("C2", 80.0, 1.0, 3),
            record("C2", 85.0, 1.0, 4),
            record("C3", 90.0, 1.0, 5),
        ];
        records.reverse();
        assert_eq!(compute_trend(&records), Trend::Improving);
    }

    #[test]
    fn trend_small_shift_is_stable() {
        let records = vec![
            record("C1", 70.0, 1.0, 1),
            record("C1", 72.0, 1.0, 2),
            record("C2", 71.0, 1.0, 3),
            record("C2", 73.0, 1.0, 4),
        ];
        assert_eq!(compute_trend(&records), Trend::Stable);
    }

    #[test]
    fn certificate_requires_full_completion_and_passing_average() {
        let policy = ApprovalPolicy::default();

        let complete = summarize_default(&[
            record("C1", 90.0, 1.0, 1),
            record("C2", 85.0, 1.0, 2),
        ]);
        assert!(certificate_eligible(&complete, policy));

        let partial = summarize_default(&[
            record("C1", 90.0, 1.0, 1),
            record("C2", 40.0, 1.0, 2),
        ]);
        assert!(!certificate_eligible(&partial, policy));

        let empty = summarize_default(&[]);
        assert!(!certificate_eligible(&empty, policy));
    }
}
