//! Declarative built-in checks.
//!
//! Each [`BuiltinCheck`] maps onto one [`PqAsserter`] call, so a list of them
//! can be stored in a profile and replayed against any planning item.

use planqa_core::{MlcPlanType, PlanningItem};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::asserter::{PqAsserter, Priority};

/// A built-in plan quality check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check")]
pub enum BuiltinCheck {
    /// Fraction count is defined
    ValidFractionNum,
    /// An image is attached
    HasImage,
    /// A structure set is attached
    HasStructureSet,
    /// Single plan, not a plan sum
    IsPlanSetup,
    /// Single plan with an electron beam
    OneOrMoreElectronBeams,
    /// Single plan with a photon beam
    OneOrMorePhotonBeams,
    /// Single plan with a proton beam
    OneOrMoreProtonBeams,
    /// Every id names a non-empty structure
    NonEmptyStructuresById {
        /// Required structure ids
        ids: Vec<String>,
    },
    /// At least one id names a non-empty structure
    OneOrMoreNonEmptyStructureById {
        /// Candidate structure ids
        ids: Vec<String>,
    },
    /// Every DICOM type has a non-empty structure
    NonEmptyStructuresByDicomType {
        /// Required DICOM types
        types: Vec<String>,
    },
    /// At least one DICOM type has a non-empty structure
    OneOrMoreNonEmptyStructuresByDicomType {
        /// Candidate DICOM types
        types: Vec<String>,
    },
    /// A non-empty structure id matches the pattern
    NonEmptyStructureMatching {
        /// Regular expression over structure ids
        pattern: String,
    },
    /// Every beam uses the delivery technique
    TreatmentBeamsByMlcPlanType {
        /// Required technique
        mlc_plan_type: MlcPlanType,
    },
    /// At least one beam uses the delivery technique
    OneOrMoreTreatmentBeamsByMlcPlanType {
        /// Wanted technique
        mlc_plan_type: MlcPlanType,
    },
    /// Fraction count within inclusive bounds; failure classified by `priority`
    FractionRange {
        /// Lower bound
        #[serde(default)]
        min: Option<u32>,
        /// Upper bound
        #[serde(default)]
        max: Option<u32>,
        /// Failure classification
        #[serde(default)]
        priority: Priority,
    },
}

impl BuiltinCheck {
    /// Names of every check, as written in profiles.
    pub const NAMES: &'static [&'static str] = &[
        "ValidFractionNum",
        "HasImage",
        "HasStructureSet",
        "IsPlanSetup",
        "OneOrMoreElectronBeams",
        "OneOrMorePhotonBeams",
        "OneOrMoreProtonBeams",
        "NonEmptyStructuresById",
        "OneOrMoreNonEmptyStructureById",
        "NonEmptyStructuresByDicomType",
        "OneOrMoreNonEmptyStructuresByDicomType",
        "NonEmptyStructureMatching",
        "TreatmentBeamsByMlcPlanType",
        "OneOrMoreTreatmentBeamsByMlcPlanType",
        "FractionRange",
    ];

    /// Profile name of this check.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinCheck::ValidFractionNum => "ValidFractionNum",
            BuiltinCheck::HasImage => "HasImage",
            BuiltinCheck::HasStructureSet => "HasStructureSet",
            BuiltinCheck::IsPlanSetup => "IsPlanSetup",
            BuiltinCheck::OneOrMoreElectronBeams => "OneOrMoreElectronBeams",
            BuiltinCheck::OneOrMorePhotonBeams => "OneOrMorePhotonBeams",
            BuiltinCheck::OneOrMoreProtonBeams => "OneOrMoreProtonBeams",
            BuiltinCheck::NonEmptyStructuresById { .. } => "NonEmptyStructuresById",
            BuiltinCheck::OneOrMoreNonEmptyStructureById { .. } => "OneOrMoreNonEmptyStructureById",
            BuiltinCheck::NonEmptyStructuresByDicomType { .. } => "NonEmptyStructuresByDicomType",
            BuiltinCheck::OneOrMoreNonEmptyStructuresByDicomType { .. } => {
                "OneOrMoreNonEmptyStructuresByDicomType"
            }
            BuiltinCheck::NonEmptyStructureMatching { .. } => "NonEmptyStructureMatching",
            BuiltinCheck::TreatmentBeamsByMlcPlanType { .. } => "TreatmentBeamsByMlcPlanType",
            BuiltinCheck::OneOrMoreTreatmentBeamsByMlcPlanType { .. } => {
                "OneOrMoreTreatmentBeamsByMlcPlanType"
            }
            BuiltinCheck::FractionRange { .. } => "FractionRange",
        }
    }

    /// Append this check's result to the chain.
    pub fn apply<'a, P: PlanningItem + ?Sized>(
        &self,
        asserter: &'a mut PqAsserter,
        pi: &P,
    ) -> &'a mut PqAsserter {
        tracing::debug!("Running built-in check: {}", self.name());

        match self {
            BuiltinCheck::ValidFractionNum => asserter.contains_valid_fraction_num(pi),
            BuiltinCheck::HasImage => asserter.has_image(pi),
            BuiltinCheck::HasStructureSet => asserter.has_structure_set(pi),
            BuiltinCheck::IsPlanSetup => asserter.is_plan_setup(pi),
            BuiltinCheck::OneOrMoreElectronBeams => asserter.contains_one_or_more_electron_beams(pi),
            BuiltinCheck::OneOrMorePhotonBeams => asserter.contains_one_or_more_photon_beams(pi),
            BuiltinCheck::OneOrMoreProtonBeams => asserter.contains_one_or_more_proton_beams(pi),
            BuiltinCheck::NonEmptyStructuresById { ids } => {
                asserter.contains_non_empty_structures_by_id(pi, ids)
            }
            BuiltinCheck::OneOrMoreNonEmptyStructureById { ids } => {
                asserter.contains_one_or_more_non_empty_structure_by_id(pi, ids)
            }
            BuiltinCheck::NonEmptyStructuresByDicomType { types } => {
                asserter.contains_non_empty_structures_by_dicom_type(pi, types)
            }
            BuiltinCheck::OneOrMoreNonEmptyStructuresByDicomType { types } => {
                asserter.contains_one_or_more_non_empty_structures_by_dicom_type(pi, types)
            }
            BuiltinCheck::NonEmptyStructureMatching { pattern } => match Regex::new(pattern) {
                Ok(re) => asserter.contains_non_empty_structure_matching(pi, &re),
                Err(e) => asserter.assert(
                    pi,
                    |_| -> Result<bool, regex::Error> { Err(e) },
                    &format!("Invalid structure pattern {pattern}"),
                ),
            },
            BuiltinCheck::TreatmentBeamsByMlcPlanType { mlc_plan_type } => {
                asserter.contains_treatment_beams_by_mlc_plan_type(pi, *mlc_plan_type)
            }
            BuiltinCheck::OneOrMoreTreatmentBeamsByMlcPlanType { mlc_plan_type } => {
                asserter.contains_one_or_more_treatment_beams_by_mlc_plan_type(pi, *mlc_plan_type)
            }
            BuiltinCheck::FractionRange { min, max, priority } => {
                let (min, max) = (*min, *max);
                asserter.assert_with_priority(
                    pi,
                    *priority,
                    |p| {
                        p.fraction_count().is_some_and(|n| {
                            min.map_or(true, |lo| n >= lo) && max.map_or(true, |hi| n <= hi)
                        })
                    },
                    &fraction_range_message(min, max),
                )
            }
        }
    }
}

fn fraction_range_message(min: Option<u32>, max: Option<u32>) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) => format!("Number of fractions must be between {lo} and {hi}"),
        (Some(lo), None) => format!("Number of fractions must be at least {lo}"),
        (None, Some(hi)) => format!("Number of fractions must be at most {hi}"),
        (None, None) => "Number of fractions must be defined".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planqa_core::{Beam, PlanSetup, ResultType, Structure};

    fn plan() -> PlanSetup {
        PlanSetup::new("Plan1")
            .with_structures(vec![Structure::new("PTV", "PTV")])
            .with_beams(vec![Beam::new("F1", MlcPlanType::Static, "12E")])
            .with_fractions(5)
    }

    #[test]
    fn test_check_deserializes_from_tagged_json() {
        let json = serde_json::json!([
            { "check": "HasImage" },
            { "check": "NonEmptyStructuresById", "ids": ["PTV", "Body"] },
            { "check": "TreatmentBeamsByMlcPlanType", "mlc_plan_type": "VMAT" },
            { "check": "FractionRange", "max": 30, "priority": "critical" }
        ]);
        let checks: Vec<BuiltinCheck> = serde_json::from_value(json).unwrap();

        assert_eq!(checks[0], BuiltinCheck::HasImage);
        assert_eq!(
            checks[1],
            BuiltinCheck::NonEmptyStructuresById {
                ids: vec!["PTV".to_string(), "Body".to_string()]
            }
        );
        assert_eq!(
            checks[2],
            BuiltinCheck::TreatmentBeamsByMlcPlanType {
                mlc_plan_type: MlcPlanType::Vmat
            }
        );
        assert_eq!(
            checks[3],
            BuiltinCheck::FractionRange {
                min: None,
                max: Some(30),
                priority: Priority::Critical
            }
        );
    }

    #[test]
    fn test_names_match_serde_tags() {
        let check = BuiltinCheck::OneOrMoreProtonBeams;
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["check"], check.name());
        assert!(BuiltinCheck::NAMES.contains(&check.name()));
    }

    #[test]
    fn test_apply_appends_one_result_per_check() {
        let plan = plan();
        let checks = vec![
            BuiltinCheck::HasImage,
            BuiltinCheck::OneOrMoreElectronBeams,
            BuiltinCheck::NonEmptyStructuresById { ids: vec!["PTV".to_string()] },
            BuiltinCheck::TreatmentBeamsByMlcPlanType { mlc_plan_type: MlcPlanType::Static },
        ];
        let mut asserter = PqAsserter::new();
        for check in &checks {
            check.apply(&mut asserter, &plan);
        }

        let results = asserter.results();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].message(), "No image");
        assert!(results[1..].iter().all(|r| r.is_success()));
    }

    #[test]
    fn test_fraction_range() {
        let plan = plan();
        let mut asserter = PqAsserter::new();
        BuiltinCheck::FractionRange { min: Some(1), max: Some(10), priority: Priority::Mid }
            .apply(&mut asserter, &plan);
        BuiltinCheck::FractionRange { min: Some(10), max: None, priority: Priority::Mid }
            .apply(&mut asserter, &plan);
        BuiltinCheck::FractionRange { min: None, max: None, priority: Priority::Low }
            .apply(&mut asserter, &PlanSetup::new("NoFx"));

        let results = asserter.results();
        assert!(results[0].is_success());
        assert_eq!(results[1].result_type(), ResultType::ActionLevel2);
        assert_eq!(results[1].message(), "Number of fractions must be at least 10");
        assert_eq!(results[2].result_type(), ResultType::ActionLevel1);
    }

    #[test]
    fn test_invalid_pattern_records_fault() {
        let mut asserter = PqAsserter::new();
        BuiltinCheck::NonEmptyStructureMatching { pattern: "(".to_string() }
            .apply(&mut asserter, &plan());

        let result = &asserter.results()[0];
        assert_eq!(result.result_type(), ResultType::NotApplicable);
        assert!(result.message().starts_with("Invalid structure pattern ( => Exception thrown :"));
    }
}
