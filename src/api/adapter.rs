//! Adapter traits.

use crate::policy::{PolicyModel, PolicySink, Section};
use crate::Result;

use async_trait::async_trait;

/// Load/save and single-rule auto-save operations.
///
/// `section` is accepted on every mutating call but never affects storage:
/// all rule families share one table, keyed by policy type.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Load every stored rule into `sink`, skipping rules it already holds.
    async fn load_policy(&self, sink: &mut dyn PolicySink) -> Result<()>;

    /// Replace every stored rule with the rules in `model`.
    async fn save_policy(&self, model: &PolicyModel) -> Result<()>;

    /// Store one rule.
    async fn add_policy(&self, section: Section, policy_type: &str, rule: &[String]) -> Result<()>;

    /// Delete the records matching a rule.
    async fn remove_policy(
        &self,
        section: Section,
        policy_type: &str,
        rule: &[String],
    ) -> Result<()>;

    /// Delete every record matching a field filter.
    ///
    /// `field_values[j]` constrains field `field_offset + j`; an empty value
    /// matches anything.
    async fn remove_filtered_policy(
        &self,
        section: Section,
        policy_type: &str,
        field_offset: i32,
        field_values: &[String],
    ) -> Result<()>;
}

/// Multi-rule operations, each all-or-nothing.
#[async_trait]
pub trait BatchAdapter: Adapter {
    /// Store several rules.
    async fn add_policies(
        &self,
        section: Section,
        policy_type: &str,
        rules: &[Vec<String>],
    ) -> Result<()>;

    /// Delete the records matching each rule.
    async fn remove_policies(
        &self,
        section: Section,
        policy_type: &str,
        rules: &[Vec<String>],
    ) -> Result<()>;
}

/// In-place update operations.
#[async_trait]
pub trait UpdatableAdapter: Adapter {
    /// Overwrite the records matching `old_rule` with `new_rule`.
    async fn update_policy(
        &self,
        section: Section,
        policy_type: &str,
        old_rule: &[String],
        new_rule: &[String],
    ) -> Result<()>;

    /// Update rules pairwise by position, all-or-nothing.
    async fn update_policies(
        &self,
        section: Section,
        policy_type: &str,
        old_rules: &[Vec<String>],
        new_rules: &[Vec<String>],
    ) -> Result<()>;

    /// Replace every record matching a field filter with `new_rules`.
    ///
    /// Returns the rules that matched the filter before the call.
    async fn update_filtered_policies(
        &self,
        section: Section,
        policy_type: &str,
        new_rules: &[Vec<String>],
        field_offset: i32,
        field_values: &[String],
    ) -> Result<Vec<Vec<String>>>;
}
