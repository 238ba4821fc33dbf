//! Constraint results - the record appended by every check.

use serde::{Deserialize, Serialize};

/// Classification of a single check outcome.
///
/// Action levels rank failed checks for review, 1 lowest and 3 highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultType {
    /// The check passed
    Passed,
    /// A precondition of the check is not met
    NotApplicable,
    /// Low priority failure
    #[serde(rename = "ACTION_LEVEL_1")]
    ActionLevel1,
    /// Mid priority failure
    #[serde(rename = "ACTION_LEVEL_2")]
    ActionLevel2,
    /// Critical priority failure
    #[serde(rename = "ACTION_LEVEL_3")]
    ActionLevel3,
}

impl ResultType {
    /// True only for [`ResultType::Passed`].
    pub fn is_success(self) -> bool {
        self == ResultType::Passed
    }

    /// The action level (1-3) of a failure, if this is one.
    pub fn action_level(self) -> Option<u8> {
        match self {
            ResultType::ActionLevel1 => Some(1),
            ResultType::ActionLevel2 => Some(2),
            ResultType::ActionLevel3 => Some(3),
            ResultType::Passed | ResultType::NotApplicable => None,
        }
    }
}

impl std::fmt::Display for ResultType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ResultType::Passed => "PASSED",
            ResultType::NotApplicable => "NOT_APPLICABLE",
            ResultType::ActionLevel1 => "ACTION_LEVEL_1",
            ResultType::ActionLevel2 => "ACTION_LEVEL_2",
            ResultType::ActionLevel3 => "ACTION_LEVEL_3",
        };
        f.write_str(label)
    }
}

/// Outcome of one check. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintResult {
    constraint_name: Option<String>,
    result_type: ResultType,
    message: String,
    #[serde(default)]
    value: String,
}

impl ConstraintResult {
    /// Create a result with an empty detail value.
    pub fn new(
        constraint_name: Option<String>,
        result_type: ResultType,
        message: impl Into<String>,
    ) -> Self {
        Self::with_value(constraint_name, result_type, message, String::new())
    }

    /// Create a result carrying a detail value.
    pub fn with_value(
        constraint_name: Option<String>,
        result_type: ResultType,
        message: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            constraint_name,
            result_type,
            message: message.into(),
            value: value.into(),
        }
    }

    /// Identifier of the rule that produced this result, if any.
    pub fn constraint_name(&self) -> Option<&str> {
        self.constraint_name.as_deref()
    }

    /// Result classification.
    pub fn result_type(&self) -> ResultType {
        self.result_type
    }

    /// Human readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Detail value, empty when unused.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the check passed.
    pub fn is_success(&self) -> bool {
        self.result_type.is_success()
    }
}

impl std::fmt::Display for ConstraintResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.result_type)?;
        if let Some(name) = &self.constraint_name {
            write!(f, " {name}:")?;
        }
        if !self.message.is_empty() {
            write!(f, " {}", self.message)?;
        }
        if !self.value.is_empty() {
            write!(f, " ({})", self.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_passed_is_success() {
        assert!(ResultType::Passed.is_success());
        assert!(!ResultType::NotApplicable.is_success());
        assert!(!ResultType::ActionLevel1.is_success());
        assert!(!ResultType::ActionLevel3.is_success());
    }

    #[test]
    fn test_action_levels() {
        assert_eq!(ResultType::ActionLevel1.action_level(), Some(1));
        assert_eq!(ResultType::ActionLevel2.action_level(), Some(2));
        assert_eq!(ResultType::ActionLevel3.action_level(), Some(3));
        assert_eq!(ResultType::NotApplicable.action_level(), None);
    }

    #[test]
    fn test_result_type_serde_labels() {
        let json = serde_json::to_string(&ResultType::ActionLevel2).unwrap();
        assert_eq!(json, "\"ACTION_LEVEL_2\"");
        let parsed: ResultType = serde_json::from_str("\"NOT_APPLICABLE\"").unwrap();
        assert_eq!(parsed, ResultType::NotApplicable);
        assert_eq!(ResultType::NotApplicable.to_string(), "NOT_APPLICABLE");
    }

    #[test]
    fn test_constraint_result_display() {
        let result = ConstraintResult::with_value(
            Some("fractions".to_string()),
            ResultType::ActionLevel1,
            "Too many fractions",
            "35",
        );
        assert_eq!(result.to_string(), "[ACTION_LEVEL_1] fractions: Too many fractions (35)");

        let bare = ConstraintResult::new(None, ResultType::Passed, "");
        assert_eq!(bare.to_string(), "[PASSED]");
        assert!(bare.is_success());
        assert_eq!(bare.value(), "");
    }
}
