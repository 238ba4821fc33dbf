//! Evaluation report - the results of one assertion chain, ready to hand off.

use serde::{Deserialize, Serialize};

use crate::id::EvaluationId;
use crate::result::{ConstraintResult, ResultType};
use crate::Time;

/// Counts of results per classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    /// All results
    pub total: usize,
    /// Passed results
    pub passed: usize,
    /// Not applicable results
    pub not_applicable: usize,
    /// Action level 1 results
    pub action_level_1: usize,
    /// Action level 2 results
    pub action_level_2: usize,
    /// Action level 3 results
    pub action_level_3: usize,

    /// Classification of the cumulative result, `Passed` for an empty chain
    pub overall: ResultType,
}

impl ResultSummary {
    /// Tally a result list.
    pub fn from_results(results: &[ConstraintResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            passed: 0,
            not_applicable: 0,
            action_level_1: 0,
            action_level_2: 0,
            action_level_3: 0,
            overall: cumulative(results)
                .map(ConstraintResult::result_type)
                .unwrap_or(ResultType::Passed),
        };

        for result in results {
            match result.result_type() {
                ResultType::Passed => summary.passed += 1,
                ResultType::NotApplicable => summary.not_applicable += 1,
                ResultType::ActionLevel1 => summary.action_level_1 += 1,
                ResultType::ActionLevel2 => summary.action_level_2 += 1,
                ResultType::ActionLevel3 => summary.action_level_3 += 1,
            }
        }
        summary
    }

    /// Number of results that did not pass.
    pub fn failed(&self) -> usize {
        self.total - self.passed
    }
}

/// First non-passing result, else the first result, else `None`.
pub fn cumulative(results: &[ConstraintResult]) -> Option<&ConstraintResult> {
    results
        .iter()
        .find(|r| !r.is_success())
        .or_else(|| results.first())
}

/// Outcome of evaluating one planning item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Unique identifier
    pub id: EvaluationId,

    /// Evaluated plan
    pub plan_id: String,

    /// When the evaluation finished
    pub evaluated_at: Time,

    /// Results in the order they were produced
    pub results: Vec<ConstraintResult>,

    /// Cumulative verdict
    pub cumulative: Option<ConstraintResult>,

    /// Per-classification counts
    pub summary: ResultSummary,
}

impl EvaluationReport {
    /// Build a report from a finished result list.
    pub fn new(plan_id: impl Into<String>, results: Vec<ConstraintResult>) -> Self {
        let cumulative = cumulative(&results).cloned();
        let summary = ResultSummary::from_results(&results);
        Self {
            id: EvaluationId::new(),
            plan_id: plan_id.into(),
            evaluated_at: chrono::Utc::now(),
            results,
            cumulative,
            summary,
        }
    }

    /// Whether the cumulative verdict is a pass (an empty report passes).
    pub fn passed(&self) -> bool {
        self.summary.overall.is_success()
    }
}
