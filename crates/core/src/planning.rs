//! Planning capability - the narrow view of the external planning system.
//!
//! The treatment-planning system owns the real object graph. Checks only see
//! it through [`PlanningItem`], so hosts adapt their vendor objects to this
//! trait and tests use the in-memory model.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Whether a planning item is a single plan or an aggregate of plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanKind {
    /// A single treatment plan
    Setup,
    /// A sum of plans
    Sum,
}

/// Read-only accessors a check may use on a planning item.
pub trait PlanningItem {
    /// Plan identifier.
    fn id(&self) -> &str;

    /// Single plan or plan sum.
    fn kind(&self) -> PlanKind;

    /// Planning image, if one is attached.
    fn image(&self) -> Option<&Image>;

    /// Structures of the structure set, `None` when there is no structure set.
    fn structures(&self) -> Option<&[Structure]>;

    /// Treatment beams, `None` when the item exposes no beam list.
    fn beams(&self) -> Option<Vec<&Beam>>;

    /// Number of fractions, `None` when not defined.
    fn fraction_count(&self) -> Option<u32>;

    /// Whether a non-empty structure with this id exists (case-insensitive).
    fn contains_structure(&self, id: &str) -> bool {
        self.structures().is_some_and(|all| {
            all.iter()
                .any(|s| s.id.eq_ignore_ascii_case(id) && !s.is_empty)
        })
    }

    /// Look up a structure by id (case-insensitive).
    fn find_structure(&self, id: &str) -> Option<&Structure> {
        self.structures()?
            .iter()
            .find(|s| s.id.eq_ignore_ascii_case(id))
    }

    /// All structures whose id matches the pattern.
    fn find_structures_matching(&self, pattern: &Regex) -> Vec<&Structure> {
        self.structures()
            .map(|all| all.iter().filter(|s| pattern.is_match(&s.id)).collect())
            .unwrap_or_default()
    }
}

/// Planning image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image identifier
    pub id: String,
}

/// A region of interest in the structure set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    /// Structure identifier
    pub id: String,

    /// DICOM type tag, e.g. `PTV`, `ORGAN`, `EXTERNAL`
    pub dicom_type: String,

    /// No contoured volume
    #[serde(default)]
    pub is_empty: bool,
}

impl Structure {
    /// Create a non-empty structure.
    pub fn new(id: impl Into<String>, dicom_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dicom_type: dicom_type.into(),
            is_empty: false,
        }
    }

    /// Mark the structure as empty.
    pub fn empty(mut self) -> Self {
        self.is_empty = true;
        self
    }
}

/// Collimator delivery technique of a beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MlcPlanType {
    /// Static MLC fields
    Static,
    /// Sliding-window IMRT
    DoseDynamic,
    /// Conformal arc
    ArcDynamic,
    /// Volumetric modulated arc therapy
    #[serde(rename = "VMAT")]
    Vmat,
    /// Proton layer stacking
    ProtonLayerStacking,
    /// Technique not defined
    NotDefined,
}

impl std::fmt::Display for MlcPlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MlcPlanType::Static => "Static",
            MlcPlanType::DoseDynamic => "DoseDynamic",
            MlcPlanType::ArcDynamic => "ArcDynamic",
            MlcPlanType::Vmat => "VMAT",
            MlcPlanType::ProtonLayerStacking => "ProtonLayerStacking",
            MlcPlanType::NotDefined => "NotDefined",
        };
        f.write_str(name)
    }
}

/// Particle class of a beam, derived from its energy-mode label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modality {
    /// Label ends in `X`
    Photon,
    /// Label ends in `E`
    Electron,
    /// Label ends in `P`
    Proton,
    /// Any other label
    Unknown,
}

impl Modality {
    /// Classify an energy-mode label such as `6X`, `12E` or `250P`.
    pub fn from_energy_mode(label: &str) -> Self {
        match label.chars().last() {
            Some('X') => Modality::Photon,
            Some('E') => Modality::Electron,
            Some('P') => Modality::Proton,
            _ => Modality::Unknown,
        }
    }
}

/// A treatment field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beam {
    /// Beam identifier
    pub id: String,

    /// Delivery technique
    pub mlc_plan_type: MlcPlanType,

    /// Energy-mode display label, e.g. `6X`
    pub energy_mode: String,
}

impl Beam {
    /// Create a beam.
    pub fn new(id: impl Into<String>, mlc_plan_type: MlcPlanType, energy_mode: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mlc_plan_type,
            energy_mode: energy_mode.into(),
        }
    }

    /// Particle class of this beam.
    pub fn modality(&self) -> Modality {
        Modality::from_energy_mode(&self.energy_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modality_from_energy_mode_suffix() {
        assert_eq!(Modality::from_energy_mode("6X"), Modality::Photon);
        assert_eq!(Modality::from_energy_mode("15X-FFF"), Modality::Unknown);
        assert_eq!(Modality::from_energy_mode("12E"), Modality::Electron);
        assert_eq!(Modality::from_energy_mode("250P"), Modality::Proton);
        assert_eq!(Modality::from_energy_mode(""), Modality::Unknown);
        assert_eq!(Modality::from_energy_mode("6X "), Modality::Unknown);
    }

    #[test]
    fn test_mlc_plan_type_names() {
        assert_eq!(MlcPlanType::Vmat.to_string(), "VMAT");
        let parsed: MlcPlanType = serde_json::from_str("\"VMAT\"").unwrap();
        assert_eq!(parsed, MlcPlanType::Vmat);
        assert_eq!(MlcPlanType::DoseDynamic.to_string(), "DoseDynamic");
    }

    #[test]
    fn test_structure_builder() {
        let s = Structure::new("PTV", "PTV").empty();
        assert!(s.is_empty);
        assert_eq!(s.dicom_type, "PTV");
    }
}
