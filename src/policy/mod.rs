//! Policy rule data structures and representations.
//!
//! This module defines the rule record model shared by every store operation:
//! sections, stored records, in-memory rule sets and policy documents.

mod document;
mod model;
mod record;

pub use document::PolicyDocument;
pub use model::{PolicyModel, PolicySink};
pub use record::{PolicyRecord, FIELD_COLUMNS, MAX_FIELDS, POLICY_TYPE_COLUMN};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The family a rule belongs to.
///
/// Both families share one table; the section is derived from the first
/// character of the policy type and never affects storage layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Permission statements (`p`, `p2`, ...)
    Policy,
    /// Role-inheritance statements (`g`, `g2`, ...)
    Grouping,
}

impl Section {
    /// Derive the section from a policy type tag.
    pub fn from_policy_type(policy_type: &str) -> crate::Result<Self> {
        match policy_type.chars().next() {
            Some('p') => Ok(Section::Policy),
            Some('g') => Ok(Section::Grouping),
            _ => Err(crate::Error::unknown_section(policy_type)),
        }
    }

    /// The single-letter key for this section.
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Policy => "p",
            Section::Grouping => "g",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
