//! Quality profiles - named lists of built-in checks.

use std::path::Path;

use planqa_core::{EvaluationReport, PlanningItem};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::asserter::PqAsserter;
use crate::checks::BuiltinCheck;

/// Errors that can occur while loading a profile.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Profile has no name
    #[error("Profile name cannot be empty")]
    EmptyName,

    /// Profile has no checks
    #[error("Profile {0} has no checks")]
    NoChecks(String),

    /// A check was given an empty id or type list
    #[error("Check #{index} ({check}) needs at least one entry")]
    EmptyList {
        /// Position in the profile
        index: usize,
        /// Check name
        check: &'static str,
    },

    /// A structure pattern does not compile
    #[error("Check #{index} has an invalid pattern: {source}")]
    InvalidPattern {
        /// Position in the profile
        index: usize,
        /// Compile error
        source: regex::Error,
    },

    /// A fraction range with min above max
    #[error("Check #{index} has min {min} above max {max}")]
    InvalidRange {
        /// Position in the profile
        index: usize,
        /// Lower bound
        min: u32,
        /// Upper bound
        max: u32,
    },
}

/// A named set of checks run together against one planning item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityProfile {
    /// Profile name
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Checks, run in order
    pub checks: Vec<BuiltinCheck>,
}

impl QualityProfile {
    /// Create an empty profile.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            checks: Vec::new(),
        }
    }

    /// Set description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Add a check.
    pub fn add_check(mut self, check: BuiltinCheck) -> Self {
        self.checks.push(check);
        self
    }

    /// Parse and validate a profile from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ProfileError> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load and validate a profile from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Reject profiles that could never produce meaningful results.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::EmptyName);
        }
        if self.checks.is_empty() {
            return Err(ProfileError::NoChecks(self.name.clone()));
        }

        for (index, check) in self.checks.iter().enumerate() {
            match check {
                BuiltinCheck::NonEmptyStructuresById { ids: list }
                | BuiltinCheck::OneOrMoreNonEmptyStructureById { ids: list }
                | BuiltinCheck::NonEmptyStructuresByDicomType { types: list }
                | BuiltinCheck::OneOrMoreNonEmptyStructuresByDicomType { types: list } => {
                    if list.is_empty() {
                        return Err(ProfileError::EmptyList {
                            index,
                            check: check.name(),
                        });
                    }
                }
                BuiltinCheck::NonEmptyStructureMatching { pattern } => {
                    Regex::new(pattern)
                        .map_err(|source| ProfileError::InvalidPattern { index, source })?;
                }
                BuiltinCheck::FractionRange {
                    min: Some(min),
                    max: Some(max),
                    ..
                } if min > max => {
                    return Err(ProfileError::InvalidRange {
                        index,
                        min: *min,
                        max: *max,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Run every check against the planning item.
    pub fn evaluate<P: PlanningItem + ?Sized>(&self, pi: &P) -> EvaluationReport {
        tracing::info!("Evaluating plan {} with profile {}", pi.id(), self.name);

        let mut asserter = PqAsserter::new();
        for check in &self.checks {
            check.apply(&mut asserter, pi);
        }
        asserter.report(pi.id())
    }
}
