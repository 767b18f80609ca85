//! Workflow definition types.
//!
//! A workflow is a named, owner-scoped automation that consists of:
//! - Metadata (name, owner, timestamps)
//! - A graph of nodes and connections, stored alongside it

use crate::error::InvalidWorkflowName;
use crate::graph::WorkflowGraph;
use automa_core::{UserId, WorkflowId};
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated workflow name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct WorkflowName(String);

impl WorkflowName {
    /// Shortest accepted name, in characters.
    pub const MIN_LEN: usize = 3;
    /// Longest accepted name, in characters.
    pub const MAX_LEN: usize = 100;

    /// Validates a name. Surrounding whitespace is trimmed first.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed name is shorter than [`Self::MIN_LEN`]
    /// or longer than [`Self::MAX_LEN`] characters.
    pub fn new(name: impl AsRef<str>) -> Result<Self, InvalidWorkflowName> {
        let name = name.as_ref().trim();
        let len = name.chars().count();
        if (Self::MIN_LEN..=Self::MAX_LEN).contains(&len) {
            Ok(Self(name.to_string()))
        } else {
            Err(InvalidWorkflowName { len })
        }
    }

    /// Generates a three-word slug such as `brave-amber-river`.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let adjective = pick(ADJECTIVES, rng);
        let color = pick(COLORS, rng);
        let noun = pick(NOUNS, rng);
        Self(format!("{adjective}-{color}-{noun}"))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkflowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WorkflowName {
    type Err = InvalidWorkflowName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for WorkflowName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

fn pick<R: Rng + ?Sized>(words: &[&'static str], rng: &mut R) -> &'static str {
    words.choose(rng).copied().unwrap_or("untitled")
}

const ADJECTIVES: &[&str] = &[
    "brave", "calm", "clever", "eager", "gentle", "happy", "lively", "quiet", "swift", "witty",
    "bold", "bright", "crisp", "fancy", "jolly", "merry", "proud", "silly", "tidy", "zesty",
];

const COLORS: &[&str] = &[
    "amber", "azure", "coral", "crimson", "emerald", "golden", "indigo", "ivory", "jade", "lilac",
    "olive", "plum", "ruby", "sage", "scarlet", "silver", "teal", "violet",
];

const NOUNS: &[&str] = &[
    "river", "forest", "meadow", "canyon", "harbor", "island", "lantern", "comet", "falcon",
    "garden", "glacier", "mountain", "ocean", "orchard", "planet", "raven", "summit",
    "thunder", "valley",
];

/// Metadata of a stored workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Unique identifier for this workflow.
    pub id: WorkflowId,
    /// Human-readable name.
    pub name: WorkflowName,
    /// The user who owns this workflow.
    pub owner_id: UserId,
    /// When this workflow was created.
    pub created_at: DateTime<Utc>,
    /// When this workflow or its graph was last changed.
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Creates workflow metadata stamped with the current time.
    #[must_use]
    pub fn new(name: WorkflowName, owner_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: WorkflowId::new(),
            name,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns whether `user` owns this workflow.
    #[must_use]
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner_id == user
    }
}

/// A workflow together with its graph, as loaded for the editor.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowWithGraph {
    pub workflow: Workflow,
    pub graph: WorkflowGraph,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn name_length_bounds() {
        assert!(WorkflowName::new("ab").is_err());
        assert!(WorkflowName::new("abc").is_ok());
        assert!(WorkflowName::new("x".repeat(100)).is_ok());
        assert_eq!(
            WorkflowName::new("x".repeat(101)),
            Err(InvalidWorkflowName { len: 101 })
        );
    }

    #[test]
    fn name_is_trimmed_and_counted_in_chars() {
        let name = WorkflowName::new("  héé  ").expect("three chars");
        assert_eq!(name.as_str(), "héé");
        assert!(WorkflowName::new("   a   ").is_err());
    }

    #[test]
    fn generated_names_are_three_word_slugs() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let name = WorkflowName::generate(&mut rng);
            let words: Vec<_> = name.as_str().split('-').collect();
            assert_eq!(words.len(), 3, "{name}");
            assert!(WorkflowName::new(name.as_str()).is_ok());
        }
    }

    #[test]
    fn name_deserialization_validates() {
        let ok: WorkflowName = serde_json::from_str("\"Daily report\"").expect("valid");
        assert_eq!(ok.as_str(), "Daily report");
        assert!(serde_json::from_str::<WorkflowName>("\"no\"").is_err());
    }

    #[test]
    fn ownership_check() {
        let owner: UserId = "user_1".parse().expect("id");
        let stranger: UserId = "user_2".parse().expect("id");
        let workflow = Workflow::new(WorkflowName::new("Flow").expect("name"), owner.clone());

        assert!(workflow.is_owned_by(&owner));
        assert!(!workflow.is_owned_by(&stranger));
        assert_eq!(workflow.created_at, workflow.updated_at);
    }
}
