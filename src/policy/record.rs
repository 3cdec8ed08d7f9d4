//! Mapping between rule tuples and fixed-width stored records.

use super::Section;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::Row;
use std::collections::BTreeMap;

/// Number of rule fields a record can hold.
pub const MAX_FIELDS: usize = 6;

/// Column holding the policy type tag.
pub const POLICY_TYPE_COLUMN: &str = "policy_type";

/// Columns holding the rule fields, in order.
pub const FIELD_COLUMNS: [&str; MAX_FIELDS] = [
    "field_0", "field_1", "field_2", "field_3", "field_4", "field_5",
];

/// The persisted shape of a rule tuple.
///
/// `fields[i]` holds `rule[i]` for every element of the rule and the empty
/// string past its end. Rule elements are never empty, so the arity of the
/// rule it came from is the index of the last non-empty field plus one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// Policy type tag (`p`, `g`, `g2`, ...)
    pub policy_type: String,
    /// Rule fields, padded with empty strings
    pub fields: [String; MAX_FIELDS],
}

impl PolicyRecord {
    /// Build a record from a policy type and a rule tuple.
    ///
    /// # Errors
    /// * `InvalidArity` - the rule has more than [`MAX_FIELDS`] elements
    /// * `InvalidRule` - an element of the rule is the empty string
    pub fn from_rule<S: AsRef<str>>(policy_type: impl Into<String>, rule: &[S]) -> Result<Self> {
        if rule.len() > MAX_FIELDS {
            return Err(Error::invalid_arity(rule.len(), MAX_FIELDS));
        }

        let mut fields: [String; MAX_FIELDS] = Default::default();
        for (i, value) in rule.iter().enumerate() {
            let value = value.as_ref();
            if value.is_empty() {
                return Err(Error::invalid_rule(format!(
                    "element {} is empty; empty values cannot be told apart from unset fields",
                    i
                )));
            }
            fields[i] = value.to_string();
        }

        Ok(Self {
            policy_type: policy_type.into(),
            fields,
        })
    }

    /// Reconstruct the minimal rule tuple, dropping unset trailing fields.
    pub fn to_rule(&self) -> Vec<String> {
        let arity = self
            .fields
            .iter()
            .rposition(|f| !f.is_empty())
            .map_or(0, |i| i + 1);
        self.fields[..arity].to_vec()
    }

    /// Equality predicates locating this exact record: every non-empty field.
    pub fn filter_columns(&self) -> BTreeMap<&'static str, &str> {
        FIELD_COLUMNS
            .iter()
            .zip(self.fields.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(column, value)| (*column, value.as_str()))
            .collect()
    }

    /// The section this record belongs to, derived from its policy type.
    pub fn section(&self) -> Result<Section> {
        Section::from_policy_type(&self.policy_type)
    }

    /// Decode a record from a database row.
    ///
    /// `NULL` columns decode as empty strings.
    pub fn from_row(row: &AnyRow) -> Result<Self> {
        let policy_type: Option<String> = row.try_get(POLICY_TYPE_COLUMN)?;
        let mut fields: [String; MAX_FIELDS] = Default::default();
        for (field, column) in fields.iter_mut().zip(FIELD_COLUMNS) {
            let value: Option<String> = row.try_get(column)?;
            *field = value.unwrap_or_default();
        }

        Ok(Self {
            policy_type: policy_type.unwrap_or_default(),
            fields,
        })
    }
}
