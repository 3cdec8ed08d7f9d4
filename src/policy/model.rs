//! In-memory rule sets and the consumer interface used by `load`.

use super::{PolicyRecord, Section};
use crate::core::FieldFilter;
use crate::Result;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A consumer of loaded rules, typically the policy-evaluation engine.
pub trait PolicySink: Send {
    /// Check whether an equivalent rule is already held.
    fn has_policy(&self, section: Section, policy_type: &str, rule: &[String]) -> bool;

    /// Add a rule.
    fn add_policy(&mut self, section: Section, policy_type: &str, rule: Vec<String>);
}

/// Rules grouped by section and policy type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyModel {
    sections: BTreeMap<Section, BTreeMap<String, Vec<Vec<String>>>>,
}

impl PolicyModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. Returns `false` if the rule was already present.
    pub fn add_policy(
        &mut self,
        section: Section,
        policy_type: impl Into<String>,
        rule: Vec<String>,
    ) -> bool {
        let rules = self
            .sections
            .entry(section)
            .or_default()
            .entry(policy_type.into())
            .or_default();
        if rules.contains(&rule) {
            return false;
        }
        rules.push(rule);
        true
    }

    /// Remove a rule. Returns `false` if the rule was not present.
    pub fn remove_policy(&mut self, section: Section, policy_type: &str, rule: &[String]) -> bool {
        let Some(rules) = self
            .sections
            .get_mut(&section)
            .and_then(|types| types.get_mut(policy_type))
        else {
            return false;
        };
        let before = rules.len();
        rules.retain(|r| r.as_slice() != rule);
        rules.len() != before
    }

    /// Check whether a rule is present.
    pub fn has_policy(&self, section: Section, policy_type: &str, rule: &[String]) -> bool {
        self.policy(section, policy_type)
            .iter()
            .any(|r| r.as_slice() == rule)
    }

    /// All rules of a policy type.
    pub fn policy(&self, section: Section, policy_type: &str) -> &[Vec<String>] {
        self.sections
            .get(&section)
            .and_then(|types| types.get(policy_type))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Rules of a policy type matching a field filter, with the same
    /// wildcard and offset semantics the store applies.
    pub fn filtered_policy<S: AsRef<str>>(
        &self,
        section: Section,
        policy_type: &str,
        field_offset: i32,
        field_values: &[S],
    ) -> Vec<Vec<String>> {
        let filter = FieldFilter::new(policy_type, field_offset, field_values);
        self.policy(section, policy_type)
            .iter()
            .filter(|rule| {
                PolicyRecord::from_rule(policy_type, rule)
                    .map(|record| filter.matches(&record))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Iterate over every rule as `(section, policy_type, rule)`.
    pub fn rules(&self) -> impl Iterator<Item = (Section, &str, &Vec<String>)> + '_ {
        self.sections.iter().flat_map(|(section, types)| {
            types.iter().flat_map(move |(policy_type, rules)| {
                rules.iter().map(move |rule| (*section, policy_type.as_str(), rule))
            })
        })
    }

    /// Convert every rule into a stored record.
    pub fn records(&self) -> Result<Vec<PolicyRecord>> {
        self.rules()
            .map(|(_, policy_type, rule)| PolicyRecord::from_rule(policy_type, rule))
            .collect()
    }

    /// Total number of rules.
    pub fn len(&self) -> usize {
        self.sections
            .values()
            .flat_map(|types| types.values())
            .map(Vec::len)
            .sum()
    }

    /// Check if the model holds no rules.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PolicySink for PolicyModel {
    fn has_policy(&self, section: Section, policy_type: &str, rule: &[String]) -> bool {
        PolicyModel::has_policy(self, section, policy_type, rule)
    }

    fn add_policy(&mut self, section: Section, policy_type: &str, rule: Vec<String>) {
        PolicyModel::add_policy(self, section, policy_type, rule);
    }
}
