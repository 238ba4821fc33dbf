//! Evaluation run identifiers.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::Time;

/// Identifies one evaluation run. Sorts by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationId(Ulid);

impl EvaluationId {
    /// Allocate an id stamped with the current time.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// When the run was started, recovered from the id's timestamp bits.
    pub fn started_at(&self) -> Time {
        Time::from(self.0.datetime())
    }
}

impl Default for EvaluationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EvaluationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "eval-{}", self.0)
    }
}

impl std::str::FromStr for EvaluationId {
    type Err = ulid::DecodeError;

    /// Accepts both `eval-<ulid>` and a bare ULID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("eval-").unwrap_or(s);
        Ok(Self(raw.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_id_display_and_parse() {
        let id = EvaluationId::new();
        let shown = id.to_string();
        assert!(shown.starts_with("eval-"));
        assert_eq!(shown.parse::<EvaluationId>().unwrap(), id);
        assert_eq!(shown["eval-".len()..].parse::<EvaluationId>().unwrap(), id);
    }

    #[test]
    fn test_started_at_is_recent() {
        let before = chrono::Utc::now() - chrono::Duration::seconds(1);
        let id = EvaluationId::new();
        assert!(id.started_at() >= before);
        assert!(id.started_at() <= chrono::Utc::now());
    }

    #[test]
    fn test_serializes_as_bare_ulid() {
        let id = EvaluationId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json.as_str().unwrap().len(), 26);
    }
}
