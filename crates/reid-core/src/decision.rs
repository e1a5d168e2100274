//! Review decisions, confidence ordinals, and reviewer identities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The authoritative decision recorded for an entity pair.
///
/// Wire spellings accept both the snake_case names and the legacy
/// aliases used by existing review clients (`match`, `nomatch`,
/// `notcomp`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The two entities are the same individual.
    #[serde(alias = "match")]
    Positive,
    /// The two entities are different individuals.
    #[serde(alias = "nomatch")]
    Negative,
    /// The pair cannot be compared (occlusion, viewpoint, quality).
    #[serde(alias = "notcomp")]
    Incomparable,
    /// No decision has been made yet.
    #[default]
    Unreviewed,
    /// A decision was requested but the reviewer could not commit.
    Unknown,
}

impl Decision {
    /// True for decisions that carry evidence (anything but
    /// unreviewed/unknown).
    pub fn is_reviewed(&self) -> bool {
        matches!(
            self,
            Decision::Positive | Decision::Negative | Decision::Incomparable
        )
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::Positive => "positive",
            Decision::Negative => "negative",
            Decision::Incomparable => "incomparable",
            Decision::Unreviewed => "unreviewed",
            Decision::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Ordinal reviewer confidence attached to a decision.
///
/// Ordering is meaningful: `Guessing < NotSure < PrettySure <
/// AbsolutelySure`. `Unspecified` sorts lowest and is the default for
/// automated decisions that do not report confidence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    #[default]
    Unspecified,
    #[serde(alias = "low")]
    Guessing,
    #[serde(alias = "medium")]
    NotSure,
    #[serde(alias = "high")]
    PrettySure,
    AbsolutelySure,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::Unspecified => "unspecified",
            Confidence::Guessing => "guessing",
            Confidence::NotSure => "not_sure",
            Confidence::PrettySure => "pretty_sure",
            Confidence::AbsolutelySure => "absolutely_sure",
        };
        write!(f, "{s}")
    }
}

/// Identifier of who or what produced a decision.
///
/// Convention: `user:<name>` for human reviewers, `auto:<classifier>` for
/// automated decisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Human reviewer identity.
    pub fn user(name: impl Into<String>) -> Self {
        UserId(format!("user:{}", name.into()))
    }

    /// Automated classifier identity.
    pub fn auto(name: impl Into<String>) -> Self {
        UserId(format!("auto:{}", name.into()))
    }

    /// True if this decision came from an automated source.
    pub fn is_auto(&self) -> bool {
        self.0.starts_with("auto:")
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}
