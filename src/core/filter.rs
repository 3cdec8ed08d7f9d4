//! Column predicates for partial-match rule filters.

use crate::policy::{PolicyRecord, MAX_FIELDS};

/// Constraint placed on a single field column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPredicate {
    /// The filter value was empty: any value matches
    Any,
    /// The column must equal this value
    Equals(String),
}

impl ColumnPredicate {
    /// Check a field value against this predicate.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            ColumnPredicate::Any => true,
            ColumnPredicate::Equals(expected) => expected == value,
        }
    }
}

/// A filter over stored records: a mandatory policy type plus per-column
/// predicates, ordered by column index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    policy_type: String,
    columns: Vec<(usize, ColumnPredicate)>,
}

impl FieldFilter {
    /// Build a filter from a field offset and a list of filter values.
    ///
    /// Value `j` constrains field `field_offset + j`. Only positions that land
    /// on a stored field produce a predicate, so with a negative offset the
    /// leading values are discarded. An empty value is a wildcard for its
    /// column. With no values at all, every record of the policy type matches.
    pub fn new<S: AsRef<str>>(
        policy_type: impl Into<String>,
        field_offset: i32,
        field_values: &[S],
    ) -> Self {
        let offset = i64::from(field_offset);
        let count = field_values.len() as i64;

        let columns = (0..MAX_FIELDS)
            .filter_map(|column| {
                let c = column as i64;
                if offset <= c && c < offset + count {
                    let value = field_values[(c - offset) as usize].as_ref();
                    let predicate = if value.is_empty() {
                        ColumnPredicate::Any
                    } else {
                        ColumnPredicate::Equals(value.to_string())
                    };
                    Some((column, predicate))
                } else {
                    None
                }
            })
            .collect();

        Self {
            policy_type: policy_type.into(),
            columns,
        }
    }

    /// Exact-match filter for a record: its policy type and every non-empty field.
    pub fn for_record(record: &PolicyRecord) -> Self {
        let columns = record
            .fields
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_empty())
            .map(|(column, value)| (column, ColumnPredicate::Equals(value.clone())))
            .collect();

        Self {
            policy_type: record.policy_type.clone(),
            columns,
        }
    }

    /// The mandatory policy type predicate.
    pub fn policy_type(&self) -> &str {
        &self.policy_type
    }

    /// Per-column predicates as `(field index, predicate)`.
    pub fn predicates(&self) -> &[(usize, ColumnPredicate)] {
        &self.columns
    }

    /// Equality constraints only, skipping wildcards.
    pub fn equalities(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.columns.iter().filter_map(|(column, predicate)| match predicate {
            ColumnPredicate::Equals(value) => Some((*column, value.as_str())),
            ColumnPredicate::Any => None,
        })
    }

    /// Evaluate the filter against a record in memory.
    pub fn matches(&self, record: &PolicyRecord) -> bool {
        record.policy_type == self.policy_type
            && self
                .columns
                .iter()
                .all(|(column, predicate)| predicate.matches(&record.fields[*column]))
    }
}
