//! Plan quality assertion chain.
//!
//! [`PqAsserter`] collects one [`ConstraintResult`] per call. Calls chain, and
//! the first non-passing result becomes the cumulative verdict:
//!
//! ```
//! use planqa_core::{PlanSetup, Structure};
//! use planqa_quality::PqAsserter;
//!
//! let plan = PlanSetup::new("Plan1")
//!     .with_structures(vec![Structure::new("PTV", "PTV")])
//!     .with_fractions(25);
//!
//! let mut asserter = PqAsserter::new();
//! asserter
//!     .has_structure_set(&plan)
//!     .contains_non_empty_structures_by_id(&plan, &["PTV"])
//!     .assert_mid_priority(&plan, |p| p.number_of_fractions == Some(25), "Expected 25 fractions");
//!
//! assert!(asserter.cumulative_result().unwrap().is_success());
//! ```

use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

use planqa_core::{
    ConstraintResult, EvaluationReport, MlcPlanType, Modality, PlanKind, PlanningItem,
    ResultSummary, ResultType,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Outcome of a user predicate: `bool`, or a fallible `Result<bool, E>`.
pub trait IntoVerdict {
    /// `Ok(passed)`, or `Err(description)` when the predicate faulted.
    fn into_verdict(self) -> Result<bool, String>;
}

impl IntoVerdict for bool {
    fn into_verdict(self) -> Result<bool, String> {
        Ok(self)
    }
}

impl<E: Display> IntoVerdict for Result<bool, E> {
    fn into_verdict(self) -> Result<bool, String> {
        self.map_err(|e| e.to_string())
    }
}

/// How a failed predicate is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Failure is not applicable
    #[default]
    Generic,
    /// Failure is action level 1
    Low,
    /// Failure is action level 2
    Mid,
    /// Failure is action level 3
    Critical,
}

impl Priority {
    /// Result type recorded when a predicate of this priority fails.
    pub fn failure_type(self) -> ResultType {
        match self {
            Priority::Generic => ResultType::NotApplicable,
            Priority::Low => ResultType::ActionLevel1,
            Priority::Mid => ResultType::ActionLevel2,
            Priority::Critical => ResultType::ActionLevel3,
        }
    }
}

/// Accumulates check results for one planning item.
#[derive(Debug, Clone, Default)]
pub struct PqAsserter {
    results: Vec<ConstraintResult>,
}

impl PqAsserter {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Results in insertion order.
    pub fn results(&self) -> &[ConstraintResult] {
        &self.results
    }

    /// Consume the chain, returning its results.
    pub fn into_results(self) -> Vec<ConstraintResult> {
        self.results
    }

    /// The first failing result, or the first (passing) result.
    ///
    /// `None` when nothing has been asserted yet.
    pub fn cumulative_result(&self) -> Option<&ConstraintResult> {
        planqa_core::cumulative(&self.results)
    }

    /// Counts per classification.
    pub fn summary(&self) -> ResultSummary {
        ResultSummary::from_results(&self.results)
    }

    /// Finish the chain into a report for the given plan.
    pub fn report(self, plan_id: impl Into<String>) -> EvaluationReport {
        EvaluationReport::new(plan_id, self.results)
    }

    // === Predicate assertions ===

    /// Assert a predicate. Failure is recorded as not applicable.
    pub fn assert<P, F, R>(&mut self, pi: &P, assertion: F, failed_message: &str) -> &mut Self
    where
        P: ?Sized,
        F: FnOnce(&P) -> R,
        R: IntoVerdict,
    {
        self.assert_with_priority(pi, Priority::Generic, assertion, failed_message)
    }

    /// Assert a predicate. Failure is recorded as action level 3.
    pub fn assert_critical_priority<P, F, R>(
        &mut self,
        pi: &P,
        assertion: F,
        failed_message: &str,
    ) -> &mut Self
    where
        P: ?Sized,
        F: FnOnce(&P) -> R,
        R: IntoVerdict,
    {
        self.assert_with_priority(pi, Priority::Critical, assertion, failed_message)
    }

    /// Assert a predicate. Failure is recorded as action level 2.
    pub fn assert_mid_priority<P, F, R>(
        &mut self,
        pi: &P,
        assertion: F,
        failed_message: &str,
    ) -> &mut Self
    where
        P: ?Sized,
        F: FnOnce(&P) -> R,
        R: IntoVerdict,
    {
        self.assert_with_priority(pi, Priority::Mid, assertion, failed_message)
    }

    /// Assert a predicate. Failure is recorded as action level 1.
    pub fn assert_low_priority<P, F, R>(
        &mut self,
        pi: &P,
        assertion: F,
        failed_message: &str,
    ) -> &mut Self
    where
        P: ?Sized,
        F: FnOnce(&P) -> R,
        R: IntoVerdict,
    {
        self.assert_with_priority(pi, Priority::Low, assertion, failed_message)
    }

    /// Assert a predicate, classifying failure by `priority`.
    ///
    /// A predicate that returns an error or panics counts as failed; the
    /// fault description is appended to the message and the chain goes on.
    /// A caught panic still passes through the process panic hook, so the
    /// default hook prints its banner to stderr; hosts that want silence
    /// install their own hook.
    pub fn assert_with_priority<P, F, R>(
        &mut self,
        pi: &P,
        priority: Priority,
        assertion: F,
        failed_message: &str,
    ) -> &mut Self
    where
        P: ?Sized,
        F: FnOnce(&P) -> R,
        R: IntoVerdict,
    {
        let mut message = failed_message.to_string();
        let passed = match evaluate(pi, assertion) {
            Ok(passed) => passed,
            Err(fault) => {
                tracing::warn!("Assertion faulted: {}", fault);
                message.push_str(&format!(" => Exception thrown : {fault}"));
                false
            }
        };

        let result_type = if passed {
            ResultType::Passed
        } else {
            priority.failure_type()
        };
        self.push(ConstraintResult::new(None, result_type, message))
    }

    // === Built-in checks ===

    /// Passes when the fraction count is defined.
    pub fn contains_valid_fraction_num<P: PlanningItem + ?Sized>(&mut self, pi: &P) -> &mut Self {
        match pi.fraction_count() {
            Some(_) => self.pass(),
            None => self.not_applicable("Not valid fraction number"),
        }
    }

    /// Passes when an image is attached.
    pub fn has_image<P: PlanningItem + ?Sized>(&mut self, pi: &P) -> &mut Self {
        match pi.image() {
            Some(_) => self.pass(),
            None => self.not_applicable("No image"),
        }
    }

    /// Passes when a structure set is attached.
    pub fn has_structure_set<P: PlanningItem + ?Sized>(&mut self, pi: &P) -> &mut Self {
        match pi.structures() {
            Some(_) => self.pass(),
            None => self.not_applicable("No structure set."),
        }
    }

    /// Passes when the item is a single plan rather than a plan sum.
    pub fn is_plan_setup<P: PlanningItem + ?Sized>(&mut self, pi: &P) -> &mut Self {
        let result = plan_setup_result(pi);
        self.push(result)
    }

    /// Passes for a single plan with at least one electron beam.
    pub fn contains_one_or_more_electron_beams<P: PlanningItem + ?Sized>(&mut self, pi: &P) -> &mut Self {
        self.contains_modality(pi, Modality::Electron, "Doesn't contain electron fields")
    }

    /// Passes for a single plan with at least one photon beam.
    pub fn contains_one_or_more_photon_beams<P: PlanningItem + ?Sized>(&mut self, pi: &P) -> &mut Self {
        self.contains_modality(pi, Modality::Photon, "Doesn't contain photon fields")
    }

    /// Passes for a single plan with at least one proton beam.
    pub fn contains_one_or_more_proton_beams<P: PlanningItem + ?Sized>(&mut self, pi: &P) -> &mut Self {
        self.contains_modality(pi, Modality::Proton, "Doesn't contain proton fields")
    }

    /// Passes when every id names a non-empty structure.
    pub fn contains_non_empty_structures_by_id<P, S>(&mut self, pi: &P, structure_ids: &[S]) -> &mut Self
    where
        P: PlanningItem + ?Sized,
        S: AsRef<str>,
    {
        if pi.structures().is_none() {
            return self.not_applicable("No structure set");
        }
        for id in structure_ids.iter().map(|id| id.as_ref()) {
            if !pi.contains_structure(id) {
                return self.not_applicable(format!("Missing {id}, or {id} is empty"));
            }
        }
        self.pass()
    }

    /// Passes when at least one id names a non-empty structure.
    pub fn contains_one_or_more_non_empty_structure_by_id<P, S>(
        &mut self,
        pi: &P,
        structure_ids: &[S],
    ) -> &mut Self
    where
        P: PlanningItem + ?Sized,
        S: AsRef<str>,
    {
        if pi.structures().is_none() {
            return self.not_applicable("No structure set");
        }
        if structure_ids.iter().any(|id| pi.contains_structure(id.as_ref())) {
            return self.pass();
        }
        self.not_applicable(format!(
            "Does not contain one: {}, or all are empty",
            join(structure_ids)
        ))
    }

    /// Passes when every DICOM type has a non-empty structure.
    pub fn contains_non_empty_structures_by_dicom_type<P, S>(
        &mut self,
        pi: &P,
        dicom_types: &[S],
    ) -> &mut Self
    where
        P: PlanningItem + ?Sized,
        S: AsRef<str>,
    {
        let Some(structures) = pi.structures() else {
            return self.not_applicable("No structure set");
        };
        for dicom_type in dicom_types.iter().map(|t| t.as_ref()) {
            if !structures.iter().any(|s| s.dicom_type == dicom_type && !s.is_empty) {
                return self.not_applicable(format!(
                    "Missing type {dicom_type}, or {dicom_type} structure is empty"
                ));
            }
        }
        self.pass()
    }

    /// Passes when at least one DICOM type has a non-empty structure.
    pub fn contains_one_or_more_non_empty_structures_by_dicom_type<P, S>(
        &mut self,
        pi: &P,
        dicom_types: &[S],
    ) -> &mut Self
    where
        P: PlanningItem + ?Sized,
        S: AsRef<str>,
    {
        let Some(structures) = pi.structures() else {
            return self.not_applicable("No structure set");
        };
        let found = dicom_types.iter().any(|dicom_type| {
            structures
                .iter()
                .any(|s| s.dicom_type == dicom_type.as_ref() && !s.is_empty)
        });
        if found {
            return self.pass();
        }
        self.not_applicable(format!(
            "Does not contain one: {}, or all are empty",
            join(dicom_types)
        ))
    }

    /// Passes when a non-empty structure id matches the pattern.
    pub fn contains_non_empty_structure_matching<P: PlanningItem + ?Sized>(
        &mut self,
        pi: &P,
        pattern: &Regex,
    ) -> &mut Self {
        if pi.structures().is_none() {
            return self.not_applicable("No structure set");
        }
        if pi.find_structures_matching(pattern).iter().any(|s| !s.is_empty) {
            return self.pass();
        }
        self.not_applicable(format!("No non-empty structure matches {pattern}"))
    }

    /// Passes when every beam has the given delivery technique.
    pub fn contains_treatment_beams_by_mlc_plan_type<P: PlanningItem + ?Sized>(
        &mut self,
        pi: &P,
        mlc_plan_type: MlcPlanType,
    ) -> &mut Self {
        let beams = match pi.beams() {
            Some(beams) if !beams.is_empty() => beams,
            _ => return self.not_applicable("Does not contain any beams"),
        };
        if let Some(beam) = beams.iter().find(|b| b.mlc_plan_type != mlc_plan_type) {
            return self.not_applicable(format!("Beam {} is not of type {mlc_plan_type}", beam.id));
        }
        self.pass()
    }

    /// Passes when at least one beam has the given delivery technique.
    pub fn contains_one_or_more_treatment_beams_by_mlc_plan_type<P: PlanningItem + ?Sized>(
        &mut self,
        pi: &P,
        mlc_plan_type: MlcPlanType,
    ) -> &mut Self {
        let beams = match pi.beams() {
            Some(beams) if !beams.is_empty() => beams,
            _ => return self.not_applicable("Does not contain any beams"),
        };
        if beams.iter().any(|b| b.mlc_plan_type == mlc_plan_type) {
            return self.pass();
        }
        self.not_applicable(format!("No beam is of type {mlc_plan_type}"))
    }

    fn contains_modality<P: PlanningItem + ?Sized>(
        &mut self,
        pi: &P,
        modality: Modality,
        failed_message: &str,
    ) -> &mut Self {
        let is_plan_setup = plan_setup_result(pi);
        if !is_plan_setup.is_success() {
            return self.push(is_plan_setup);
        }

        let found = pi
            .beams()
            .is_some_and(|beams| beams.iter().any(|b| b.modality() == modality));
        if found {
            self.pass()
        } else {
            self.not_applicable(failed_message)
        }
    }

    fn pass(&mut self) -> &mut Self {
        self.push(ConstraintResult::new(None, ResultType::Passed, ""))
    }

    fn not_applicable(&mut self, message: impl Into<String>) -> &mut Self {
        self.push(ConstraintResult::new(None, ResultType::NotApplicable, message))
    }

    fn push(&mut self, result: ConstraintResult) -> &mut Self {
        tracing::debug!("Recorded {} result: {}", result.result_type(), result.message());
        self.results.push(result);
        self
    }
}

fn plan_setup_result<P: PlanningItem + ?Sized>(pi: &P) -> ConstraintResult {
    match pi.kind() {
        PlanKind::Setup => ConstraintResult::new(None, ResultType::Passed, ""),
        PlanKind::Sum => ConstraintResult::new(None, ResultType::NotApplicable, "Must be plan setup only"),
    }
}

/// Run a predicate, turning errors and panics into a fault description.
fn evaluate<P, F, R>(pi: &P, assertion: F) -> Result<bool, String>
where
    P: ?Sized,
    F: FnOnce(&P) -> R,
    R: IntoVerdict,
{
    match panic::catch_unwind(AssertUnwindSafe(|| assertion(pi).into_verdict())) {
        Ok(verdict) => verdict,
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "predicate panicked".to_string()
    }
}

fn join<S: AsRef<str>>(items: &[S]) -> String {
    items.iter().map(|s| s.as_ref()).collect::<Vec<&str>>().join(",")
}
