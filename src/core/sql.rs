//! SQL rendering for rule table statements.
//!
//! PostgreSQL and SQLite statements use `$n` placeholders; MySQL uses `?`.
//! Wildcard predicates render to no condition at all since every field
//! column is `NOT NULL`.

use super::FieldFilter;
use crate::policy::{PolicyRecord, FIELD_COLUMNS, POLICY_TYPE_COLUMN};
use crate::store::Backend;

use std::fmt::Write;

/// Maximum number of rows written by a single `INSERT` statement.
pub const INSERT_BATCH_ROWS: usize = 100;

/// A rendered SQL statement and its positional bind values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// SQL text
    pub sql: String,
    /// Bind values, in placeholder order
    pub binds: Vec<String>,
    backend: Backend,
}

impl Statement {
    fn new(backend: Backend, sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: Vec::new(),
            backend,
        }
    }

    /// Append a bind value and return its placeholder.
    fn bind(&mut self, value: impl Into<String>) -> String {
        self.binds.push(value.into());
        match self.backend {
            Backend::MySql => "?".to_string(),
            Backend::Postgres | Backend::Sqlite => format!("${}", self.binds.len()),
        }
    }

    fn push_where(&mut self, filter: &FieldFilter) {
        let placeholder = self.bind(filter.policy_type());
        let _ = write!(self.sql, " WHERE {} = {}", POLICY_TYPE_COLUMN, placeholder);
        for (column, value) in filter.equalities() {
            let placeholder = self.bind(value);
            let _ = write!(self.sql, " AND {} = {}", FIELD_COLUMNS[column], placeholder);
        }
    }

    fn push_values(&mut self, record: &PolicyRecord) {
        let mut placeholders = Vec::with_capacity(FIELD_COLUMNS.len() + 1);
        placeholders.push(self.bind(record.policy_type.as_str()));
        for value in &record.fields {
            placeholders.push(self.bind(value.as_str()));
        }
        let _ = write!(self.sql, "({})", placeholders.join(", "));
    }
}

/// Renders statements against one rule table.
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    table: String,
    backend: Backend,
}

impl StatementBuilder {
    /// Create a builder for the given table. The name must already be a
    /// validated SQL identifier.
    pub fn new(table: impl Into<String>, backend: Backend) -> Self {
        Self {
            table: table.into(),
            backend,
        }
    }

    /// The back-end whose dialect statements are rendered in.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// The table statements are rendered against.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn column_list() -> String {
        std::iter::once(POLICY_TYPE_COLUMN)
            .chain(FIELD_COLUMNS)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// DDL creating the rule table when missing, optionally with a unique
    /// index over all seven columns.
    ///
    /// MySQL has no `CREATE INDEX IF NOT EXISTS` and cannot index or default
    /// `TEXT` columns, so there the columns are `VARCHAR(100)` and the unique
    /// key is declared inside `CREATE TABLE`.
    pub fn schema(&self, unique_rules: bool) -> Vec<String> {
        let column_type = match self.backend {
            Backend::MySql => "VARCHAR(100)",
            Backend::Postgres | Backend::Sqlite => "TEXT",
        };
        let mut definitions: Vec<String> = std::iter::once(POLICY_TYPE_COLUMN)
            .chain(FIELD_COLUMNS)
            .map(|column| format!("{} {} NOT NULL DEFAULT ''", column, column_type))
            .collect();

        if unique_rules && self.backend == Backend::MySql {
            definitions.push(format!(
                "UNIQUE KEY {}_unique_rule ({})",
                self.table,
                Self::column_list()
            ));
        }

        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table,
            definitions.join(", ")
        )];
        if unique_rules && self.backend != Backend::MySql {
            statements.push(format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {table}_unique_rule ON {table} ({columns})",
                table = self.table,
                columns = Self::column_list(),
            ));
        }
        statements
    }

    /// Select every record.
    pub fn select_all(&self) -> Statement {
        Statement::new(
            self.backend,
            format!("SELECT {} FROM {}", Self::column_list(), self.table),
        )
    }

    /// Select records matching a filter.
    pub fn select(&self, filter: &FieldFilter) -> Statement {
        let mut statement = self.select_all();
        statement.push_where(filter);
        statement
    }

    /// Delete every record.
    pub fn delete_all(&self) -> Statement {
        Statement::new(self.backend, format!("DELETE FROM {}", self.table))
    }

    /// Delete records matching a filter.
    pub fn delete(&self, filter: &FieldFilter) -> Statement {
        let mut statement = self.delete_all();
        statement.push_where(filter);
        statement
    }

    /// Overwrite every column of the records matching a filter.
    pub fn update(&self, filter: &FieldFilter, record: &PolicyRecord) -> Statement {
        let mut statement = Statement::new(self.backend, format!("UPDATE {} SET ", self.table));
        let mut assignments = Vec::with_capacity(FIELD_COLUMNS.len() + 1);
        let placeholder = statement.bind(record.policy_type.as_str());
        assignments.push(format!("{} = {}", POLICY_TYPE_COLUMN, placeholder));
        for (column, value) in FIELD_COLUMNS.iter().zip(&record.fields) {
            let placeholder = statement.bind(value.as_str());
            assignments.push(format!("{} = {}", column, placeholder));
        }
        statement.sql.push_str(&assignments.join(", "));
        statement.push_where(filter);
        statement
    }

    /// Multi-row insert. Returns `None` for an empty slice.
    pub fn insert(&self, records: &[PolicyRecord]) -> Option<Statement> {
        if records.is_empty() {
            return None;
        }

        let mut statement = Statement::new(
            self.backend,
            format!("INSERT INTO {} ({}) VALUES ", self.table, Self::column_list()),
        );
        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                statement.sql.push_str(", ");
            }
            statement.push_values(record);
        }
        Some(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> StatementBuilder {
        StatementBuilder::new("policy_rules", Backend::Sqlite)
    }

    fn mysql_builder() -> StatementBuilder {
        StatementBuilder::new("policy_rules", Backend::MySql)
    }

    #[test]
    fn test_schema() {
        let ddl = builder().schema(false);
        assert_eq!(ddl.len(), 1);
        assert!(ddl[0].starts_with("CREATE TABLE IF NOT EXISTS policy_rules ("));
        assert!(ddl[0].contains("policy_type TEXT NOT NULL DEFAULT ''"));
        assert!(ddl[0].contains("field_5 TEXT NOT NULL DEFAULT ''"));

        let ddl = builder().schema(true);
        assert_eq!(ddl.len(), 2);
        assert!(ddl[1].starts_with("CREATE UNIQUE INDEX IF NOT EXISTS policy_rules_unique_rule ON policy_rules"));
    }

    #[test]
    fn test_mysql_schema() {
        let ddl = mysql_builder().schema(true);
        assert_eq!(ddl.len(), 1);
        assert!(ddl[0].contains("field_0 VARCHAR(100) NOT NULL DEFAULT ''"));
        assert!(ddl[0].ends_with(
            "UNIQUE KEY policy_rules_unique_rule (policy_type, field_0, field_1, field_2, field_3, field_4, field_5))"
        ));
        assert!(!mysql_builder().schema(false)[0].contains("UNIQUE"));
    }

    #[test]
    fn test_mysql_placeholders() {
        let filter = FieldFilter::new("p", 1, &["data1", "read"]);
        let statement = mysql_builder().delete(&filter);
        assert_eq!(
            statement.sql,
            "DELETE FROM policy_rules WHERE policy_type = ? AND field_1 = ? AND field_2 = ?"
        );
        assert_eq!(statement.binds, vec!["p", "data1", "read"]);

        let records = vec![PolicyRecord::from_rule("g", &["alice", "admin"]).unwrap()];
        let statement = mysql_builder().insert(&records).unwrap();
        assert!(statement.sql.ends_with("VALUES (?, ?, ?, ?, ?, ?, ?)"));
        assert!(!statement.sql.contains('$'));

        let old = PolicyRecord::from_rule("p", &["alice"]).unwrap();
        let statement = mysql_builder().update(&FieldFilter::for_record(&old), &old);
        assert!(statement.sql.starts_with("UPDATE policy_rules SET policy_type = ?, field_0 = ?"));
        assert!(statement.sql.ends_with("WHERE policy_type = ? AND field_0 = ?"));
        assert_eq!(statement.binds.len(), 9);
    }

    #[test]
    fn test_select_with_filter() {
        let filter = FieldFilter::new("p", 0, &["alice", "", "read"]);
        let statement = builder().select(&filter);
        assert_eq!(
            statement.sql,
            "SELECT policy_type, field_0, field_1, field_2, field_3, field_4, field_5 \
             FROM policy_rules WHERE policy_type = $1 AND field_0 = $2 AND field_2 = $3"
        );
        assert_eq!(statement.binds, vec!["p", "alice", "read"]);
    }

    #[test]
    fn test_delete_wildcard_only() {
        let filter = FieldFilter::new("g", 0, &[""]);
        let statement = builder().delete(&filter);
        assert_eq!(statement.sql, "DELETE FROM policy_rules WHERE policy_type = $1");
        assert_eq!(statement.binds, vec!["g"]);
    }

    #[test]
    fn test_update() {
        let old = PolicyRecord::from_rule("p", &["alice", "data1", "read"]).unwrap();
        let new = PolicyRecord::from_rule("p", &["alice", "data1", "write"]).unwrap();
        let statement = builder().update(&FieldFilter::for_record(&old), &new);
        assert!(statement.sql.starts_with("UPDATE policy_rules SET policy_type = $1, field_0 = $2"));
        assert!(statement.sql.ends_with(
            "WHERE policy_type = $8 AND field_0 = $9 AND field_1 = $10 AND field_2 = $11"
        ));
        assert_eq!(statement.binds.len(), 11);
        assert_eq!(statement.binds[3], "write");
        assert_eq!(statement.binds[10], "read");
    }

    #[test]
    fn test_insert() {
        assert!(builder().insert(&[]).is_none());

        let records = vec![
            PolicyRecord::from_rule("p", &["alice", "data1", "read"]).unwrap(),
            PolicyRecord::from_rule("g", &["alice", "admin"]).unwrap(),
        ];
        let statement = builder().insert(&records).unwrap();
        assert!(statement.sql.contains("VALUES ($1, $2, $3, $4, $5, $6, $7), ($8, "));
        assert!(statement.sql.ends_with("$14)"));
        assert_eq!(statement.binds.len(), 14);
        assert_eq!(statement.binds[7], "g");
        assert_eq!(statement.binds[13], "");
    }
}
