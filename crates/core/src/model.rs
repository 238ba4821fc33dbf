//! In-memory plan model.
//!
//! A plain-data stand-in for the external planning system, loadable from JSON
//! fixtures. Hosts with a live planning system implement [`PlanningItem`] on
//! their own types instead.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::planning::{Beam, Image, PlanKind, PlanningItem, Structure};

/// Errors that can occur while loading a plan fixture.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single treatment plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSetup {
    /// Plan identifier
    pub id: String,

    /// Planning image
    #[serde(default)]
    pub image: Option<Image>,

    /// Structure set, `None` when the plan has none
    #[serde(default)]
    pub structures: Option<Vec<Structure>>,

    /// Treatment beams
    #[serde(default)]
    pub beams: Option<Vec<Beam>>,

    /// Prescribed number of fractions
    #[serde(default)]
    pub number_of_fractions: Option<u32>,
}

impl PlanSetup {
    /// Create an empty plan.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Attach an image.
    pub fn with_image(mut self, id: impl Into<String>) -> Self {
        self.image = Some(Image { id: id.into() });
        self
    }

    /// Attach a structure set.
    pub fn with_structures(mut self, structures: Vec<Structure>) -> Self {
        self.structures = Some(structures);
        self
    }

    /// Attach beams.
    pub fn with_beams(mut self, beams: Vec<Beam>) -> Self {
        self.beams = Some(beams);
        self
    }

    /// Set the number of fractions.
    pub fn with_fractions(mut self, fractions: u32) -> Self {
        self.number_of_fractions = Some(fractions);
        self
    }
}

impl PlanningItem for PlanSetup {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> PlanKind {
        PlanKind::Setup
    }

    fn image(&self) -> Option<&Image> {
        self.image.as_ref()
    }

    fn structures(&self) -> Option<&[Structure]> {
        self.structures.as_deref()
    }

    fn beams(&self) -> Option<Vec<&Beam>> {
        self.beams.as_ref().map(|beams| beams.iter().collect())
    }

    fn fraction_count(&self) -> Option<u32> {
        self.number_of_fractions
    }
}

/// A sum of plans sharing a patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSum {
    /// Sum identifier
    pub id: String,

    /// Constituent plans
    #[serde(default)]
    pub plan_setups: Vec<PlanSetup>,
}

impl PlanSum {
    /// Create a sum of the given plans.
    pub fn new(id: impl Into<String>, plan_setups: Vec<PlanSetup>) -> Self {
        Self {
            id: id.into(),
            plan_setups,
        }
    }
}

impl PlanningItem for PlanSum {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> PlanKind {
        PlanKind::Sum
    }

    // Constituent plans share the patient's image and structure set.
    fn image(&self) -> Option<&Image> {
        self.plan_setups.first()?.image.as_ref()
    }

    fn structures(&self) -> Option<&[Structure]> {
        self.plan_setups.first()?.structures.as_deref()
    }

    fn beams(&self) -> Option<Vec<&Beam>> {
        let lists: Vec<&Vec<Beam>> = self
            .plan_setups
            .iter()
            .filter_map(|p| p.beams.as_ref())
            .collect();
        if lists.is_empty() {
            return None;
        }
        Some(lists.into_iter().flatten().collect())
    }

    /// Sum of the known constituent fraction counts, `None` on overflow.
    fn fraction_count(&self) -> Option<u32> {
        self.plan_setups
            .iter()
            .filter_map(|p| p.number_of_fractions)
            .try_fold(0u32, u32::checked_add)
    }
}

/// Either planning item variant, as stored in fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Plan {
    /// A single plan
    Setup(PlanSetup),
    /// A plan sum
    Sum(PlanSum),
}

impl Plan {
    /// Parse a plan from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a plan from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    fn inner(&self) -> &dyn PlanningItem {
        match self {
            Plan::Setup(p) => p,
            Plan::Sum(s) => s,
        }
    }
}

impl PlanningItem for Plan {
    fn id(&self) -> &str {
        self.inner().id()
    }

    fn kind(&self) -> PlanKind {
        self.inner().kind()
    }

    fn image(&self) -> Option<&Image> {
        self.inner().image()
    }

    fn structures(&self) -> Option<&[Structure]> {
        self.inner().structures()
    }

    fn beams(&self) -> Option<Vec<&Beam>> {
        self.inner().beams()
    }

    fn fraction_count(&self) -> Option<u32> {
        self.inner().fraction_count()
    }
}

impl From<PlanSetup> for Plan {
    fn from(plan: PlanSetup) -> Self {
        Plan::Setup(plan)
    }
}

impl From<PlanSum> for Plan {
    fn from(sum: PlanSum) -> Self {
        Plan::Sum(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::MlcPlanType;

    fn prostate() -> PlanSetup {
        PlanSetup::new("Prostate")
            .with_image("CT_1")
            .with_structures(vec![
                Structure::new("PTV", "PTV"),
                Structure::new("Rectum", "ORGAN"),
                Structure::new("Bladder", "ORGAN").empty(),
            ])
            .with_beams(vec![Beam::new("Arc1", MlcPlanType::Vmat, "6X")])
            .with_fractions(28)
    }

    #[test]
    fn test_plan_setup_accessors() {
        let plan = prostate();
        assert_eq!(plan.kind(), PlanKind::Setup);
        assert_eq!(plan.image().map(|i| i.id.as_str()), Some("CT_1"));
        assert_eq!(plan.beams().unwrap().len(), 1);
        assert_eq!(plan.fraction_count(), Some(28));
    }

    #[test]
    fn test_contains_structure_ignores_case_and_empty() {
        let plan = prostate();
        assert!(plan.contains_structure("rectum"));
        assert!(!plan.contains_structure("Bladder"));
        assert!(!plan.contains_structure("Femur_L"));
        assert!(!PlanSetup::new("bare").contains_structure("PTV"));
    }

    #[test]
    fn test_find_structures_matching() {
        let plan = prostate();
        let pattern = regex::Regex::new("^(Rectum|Bladder)$").unwrap();
        assert_eq!(plan.find_structures_matching(&pattern).len(), 2);
    }

    #[test]
    fn test_plan_sum_aggregates_constituents() {
        let boost = PlanSetup::new("Boost")
            .with_beams(vec![Beam::new("Boost1", MlcPlanType::Static, "18X")])
            .with_fractions(5);
        let sum = PlanSum::new("Sum", vec![prostate(), boost]);

        assert_eq!(sum.kind(), PlanKind::Sum);
        assert_eq!(sum.fraction_count(), Some(33));
        assert_eq!(sum.beams().unwrap().len(), 2);
        assert!(sum.contains_structure("PTV"));
    }

    #[test]
    fn test_plan_sum_without_beam_lists() {
        let sum = PlanSum::new("Sum", vec![PlanSetup::new("A")]);
        assert!(sum.beams().is_none());
        assert_eq!(sum.fraction_count(), Some(0));
        assert!(sum.structures().is_none());
    }

    #[test]
    fn test_plan_sum_fraction_overflow_is_undefined() {
        let json = serde_json::json!({
            "kind": "Sum",
            "id": "Sum",
            "plan_setups": [
                { "id": "A", "number_of_fractions": u32::MAX },
                { "id": "B", "number_of_fractions": 1 }
            ]
        });
        let plan = Plan::from_json_str(&json.to_string()).unwrap();
        assert_eq!(plan.fraction_count(), None);
    }

    #[test]
    fn test_contains_structure_skips_empty_case_variant() {
        let plan = PlanSetup::new("P").with_structures(vec![
            Structure::new("ptv", "PTV").empty(),
            Structure::new("PTV", "PTV"),
        ]);
        assert!(plan.contains_structure("PTV"));
        assert!(plan.find_structure("PTV").unwrap().is_empty);
    }

    #[test]
    fn test_plan_from_json() {
        let json = serde_json::json!({
            "kind": "Setup",
            "id": "Breast",
            "structures": [{ "id": "PTV", "dicom_type": "PTV" }],
            "beams": [{ "id": "E1", "mlc_plan_type": "Static", "energy_mode": "9E" }],
            "number_of_fractions": 16
        });
        let plan = Plan::from_json_str(&json.to_string()).unwrap();
        assert_eq!(plan.id(), "Breast");
        assert_eq!(plan.kind(), PlanKind::Setup);
        assert!(plan.contains_structure("PTV"));
        assert!(plan.image().is_none());
    }

    #[test]
    fn test_plan_from_invalid_json() {
        let err = Plan::from_json_str("{\"kind\": \"Nope\"}").unwrap_err();
        assert!(matches!(err, ModelError::Json(_)));
    }
}
