use serde::{Deserialize, Serialize};

/// How the insertion combines with the anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsertPolicy {
    /// `before + insertion + anchor + after`
    #[default]
    #[serde(alias = "insert_before", alias = "before")]
    InsertBefore,
    /// `before + anchor + insertion + after`
    #[serde(alias = "insert_after", alias = "after")]
    InsertAfter,
    /// `before + insertion + after`
    #[serde(alias = "replace-with")]
    Replace,
}

impl InsertPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            InsertPolicy::InsertBefore => "insert-before",
            InsertPolicy::InsertAfter => "insert-after",
            InsertPolicy::Replace => "replace",
        }
    }

    /// True when the anchor text survives the edit.
    pub fn keeps_anchor(self) -> bool {
        !matches!(self, InsertPolicy::Replace)
    }
}

/// Which anchor occurrence a rule may patch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorMatch {
    /// Leftmost occurrence; later ones are left alone.
    #[default]
    First,
    /// Exactly one occurrence; otherwise the rule is skipped.
    Unique,
}

/// A single declarative edit against one record's body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Identifier of the record to patch.
    #[serde(alias = "targetIdentifier", alias = "target_identifier")]
    pub target: String,

    /// Literal text searched for in the body.
    pub anchor: String,

    pub insertion: String,

    #[serde(default)]
    pub policy: InsertPolicy,

    #[serde(default)]
    pub anchor_match: AnchorMatch,
}

impl PatchRule {
    pub fn new(
        target: impl Into<String>,
        anchor: impl Into<String>,
        insertion: impl Into<String>,
        policy: InsertPolicy,
    ) -> Self {
        Self {
            name: None,
            target: target.into(),
            anchor: anchor.into(),
            insertion: insertion.into(),
            policy,
            anchor_match: AnchorMatch::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_anchor_match(mut self, anchor_match: AnchorMatch) -> Self {
        self.anchor_match = anchor_match;
        self
    }

    /// Label used in reports: the rule name, or `#<n> <target>` (1-based).
    pub fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{} {}", index + 1, self.target),
        }
    }
}
