use anyhow::bail;
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// One graded activity for a learner within a program. Immutable after
/// ingestion except for score/observation corrections applied upstream.
#[derive(Debug, Clone)]
pub struct GradeRecord {
    pub learner_id: Uuid,
    pub learner_name: String,
    pub learner_email: String,
    pub program: String,
    pub competency: String,
    pub activity: String,
    pub score: f64,
    pub max_score: f64,
    pub weight: f64,
    pub observation: String,
    pub evaluated_at: NaiveDate,
}

impl GradeRecord {
    /// Ingestion-time validation. The aggregator assumes records passed
    /// this check and does not re-validate.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_score <= 0.0 {
            bail!(
                "activity {:?}: max_score must be positive, got {}",
                self.activity,
                self.max_score
            );
        }
        if self.score < 0.0 || self.score > self.max_score {
            bail!(
                "activity {:?}: score {} outside [0, {}]",
                self.activity,
                self.score,
                self.max_score
            );
        }
        if self.weight <= 0.0 {
            bail!(
                "activity {:?}: weight must be positive, got {}",
                self.activity,
                self.weight
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompetencyStatus {
    Approved,
    InProgress,
    Failed,
}

impl CompetencyStatus {
    pub fn label(self) -> &'static str {
        match self {
            CompetencyStatus::Approved => "APPROVED",
            CompetencyStatus::InProgress => "IN_PROGRESS",
            CompetencyStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

impl Trend {
    pub fn label(self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
        }
    }
}

/// Per-competency slice of a summary. Only materialized for competencies
/// with at least one record.
#[derive(Debug, Clone, Serialize)]
pub struct CompetencyBreakdown {
    pub competency: String,
    pub record_count: usize,
    pub average: f64,
    pub status: CompetencyStatus,
}

/// Derived, read-only aggregate for one (learner, program) pair.
/// Recomputed from current grade records on every request.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSummary {
    pub learner_id: Uuid,
    pub program: String,
    pub overall_average: f64,
    pub approved_competencies: usize,
    pub total_competencies: usize,
    pub completion_percentage: f64,
    pub competencies: Vec<CompetencyBreakdown>,
    pub trend: Trend,
}
