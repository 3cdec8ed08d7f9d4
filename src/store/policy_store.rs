//! Policy store implementation.

use super::StoreHandle;
use crate::api::{Adapter, BatchAdapter, UpdatableAdapter};
use crate::config::{validate_table_name, Config, StoreConfig, TelemetryConfig};
use crate::core::{FieldFilter, Statement, StatementBuilder, INSERT_BATCH_ROWS};
use crate::policy::{PolicyModel, PolicyRecord, PolicySink, Section};
use crate::telemetry::{self, Operation, RowCounts, Span, Telemetry, TelemetryMetrics};
use crate::{Error, Result};

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::any::AnyArguments;
use sqlx::query::Query;
use sqlx::{Any, Transaction};
use std::sync::Arc;
use tracing::{debug, warn};

type Tx = Transaction<'static, Any>;

/// Persists policy rules in a relational table.
///
/// The store keeps no rule state in memory: every call is one complete unit
/// of work against the database, and multi-statement calls run inside a
/// single transaction that is rolled back on the first failure.
#[derive(Debug)]
pub struct PolicyStore {
    /// Connection pool
    handle: StoreHandle,
    /// Statement renderer for the rule table
    statements: StatementBuilder,
    /// Whether `ensure_table` also creates the unique rule index
    unique_rules: bool,
    /// Operation metrics
    telemetry: Arc<Telemetry>,
}

impl PolicyStore {
    /// Create a policy store builder.
    pub fn builder() -> PolicyStoreBuilder {
        PolicyStoreBuilder::new()
    }

    /// Open the configured back-end and build a store on it.
    pub async fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let handle =
            StoreHandle::connect(config.store.backend, &config.store.url, &config.store).await?;

        Self::builder()
            .with_handle(handle)
            .with_config(config.clone())
            .build()
            .await
    }

    /// Create the rule table (and the unique index, if enabled) when missing.
    pub async fn ensure_table(&self) -> Result<()> {
        for ddl in self.statements.schema(self.unique_rules) {
            sqlx::query(&ddl).execute(self.handle.pool()).await?;
        }
        debug!(table = self.statements.table(), unique = self.unique_rules, "rule table ready");
        Ok(())
    }

    /// The connection handle.
    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    /// The rule table name.
    pub fn table(&self) -> &str {
        self.statements.table()
    }

    /// Get operation metrics.
    pub fn metrics(&self) -> TelemetryMetrics {
        self.telemetry.metrics()
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.handle.close().await;
    }

    /// Load every stored rule into `sink`.
    ///
    /// Rules the sink already holds are skipped, so repeated loads never
    /// duplicate a rule. Returns the number of rules added to the sink.
    pub async fn load_policy(&self, sink: &mut dyn PolicySink) -> Result<usize> {
        let span = telemetry::span(Operation::Load);
        let result = self.load_into(sink).await;
        self.observe(span, result)
    }

    async fn load_into(&self, sink: &mut dyn PolicySink) -> Result<(usize, RowCounts)> {
        let statement = self.statements.select_all();
        let mut rows = Self::query(&statement).fetch(self.handle.pool());

        let mut read = 0u64;
        let mut added = 0usize;
        while let Some(row) = rows.try_next().await? {
            read += 1;
            let record = PolicyRecord::from_row(&row)?;
            let section = record.section()?;
            let rule = record.to_rule();
            if !sink.has_policy(section, &record.policy_type, &rule) {
                sink.add_policy(section, &record.policy_type, rule);
                added += 1;
            }
        }

        Ok((added, RowCounts::read(read)))
    }

    /// Replace every stored rule with the rules in `model`.
    ///
    /// The delete and the bulk insert share one transaction, so a failure
    /// leaves the previous rules in place.
    pub async fn save_policy(&self, model: &PolicyModel) -> Result<()> {
        let span = telemetry::span(Operation::Save);
        let result = self.save_records(model).await;
        self.observe(span, result)
    }

    async fn save_records(&self, model: &PolicyModel) -> Result<((), RowCounts)> {
        let records = model.records()?;

        let mut tx = self.begin().await?;
        let result = self.replace_all_in(&mut tx, &records).await;
        self.complete(tx, Operation::Save, result).await
    }

    async fn replace_all_in(&self, tx: &mut Tx, records: &[PolicyRecord]) -> Result<((), RowCounts)> {
        let deleted = Self::query(&self.statements.delete_all())
            .execute(&mut **tx)
            .await?
            .rows_affected();
        let written = self.insert_in(tx, records).await?;

        Ok((
            (),
            RowCounts {
                read: 0,
                written,
                deleted,
            },
        ))
    }

    /// Store one rule.
    ///
    /// No duplicate check is made; with a unique index a duplicate fails
    /// with [`Error::ConstraintViolation`].
    pub async fn add_policy(&self, section: Section, policy_type: &str, rule: &[String]) -> Result<()> {
        let span = telemetry::span(Operation::Add);
        debug!(%section, policy_type, ?rule, "adding policy");
        let result = self.insert_one(policy_type, rule).await;
        self.observe(span, result)
    }

    async fn insert_one(&self, policy_type: &str, rule: &[String]) -> Result<((), RowCounts)> {
        let record = PolicyRecord::from_rule(policy_type, rule)?;
        let written = match self.statements.insert(std::slice::from_ref(&record)) {
            Some(statement) => Self::query(&statement)
                .execute(self.handle.pool())
                .await?
                .rows_affected(),
            None => 0,
        };
        Ok(((), RowCounts::written(written)))
    }

    /// Store several rules in one transaction.
    pub async fn add_policies(
        &self,
        section: Section,
        policy_type: &str,
        rules: &[Vec<String>],
    ) -> Result<()> {
        let span = telemetry::span(Operation::Add);
        debug!(%section, policy_type, count = rules.len(), "adding policies");
        let result = self.insert_many(policy_type, rules).await;
        self.observe(span, result)
    }

    async fn insert_many(&self, policy_type: &str, rules: &[Vec<String>]) -> Result<((), RowCounts)> {
        let records = Self::to_records(policy_type, rules)?;
        if records.is_empty() {
            return Ok(((), RowCounts::default()));
        }

        let mut tx = self.begin().await?;
        let result = self.insert_in(&mut tx, &records).await;
        let written = self.complete(tx, Operation::Add, result).await?;
        Ok(((), RowCounts::written(written)))
    }

    /// Delete the records matching a rule's policy type and non-empty fields.
    pub async fn remove_policy(
        &self,
        section: Section,
        policy_type: &str,
        rule: &[String],
    ) -> Result<()> {
        let span = telemetry::span(Operation::Remove);
        debug!(%section, policy_type, ?rule, "removing policy");
        let result = self.delete_one(policy_type, rule).await;
        self.observe(span, result)
    }

    async fn delete_one(&self, policy_type: &str, rule: &[String]) -> Result<((), RowCounts)> {
        let record = PolicyRecord::from_rule(policy_type, rule)?;
        let statement = self.statements.delete(&FieldFilter::for_record(&record));
        let deleted = Self::query(&statement)
            .execute(self.handle.pool())
            .await?
            .rows_affected();
        Ok(((), RowCounts::deleted(deleted)))
    }

    /// Delete the records matching each rule, all-or-nothing.
    pub async fn remove_policies(
        &self,
        section: Section,
        policy_type: &str,
        rules: &[Vec<String>],
    ) -> Result<()> {
        let span = telemetry::span(Operation::Remove);
        debug!(%section, policy_type, count = rules.len(), "removing policies");
        let result = self.delete_many(policy_type, rules).await;
        self.observe(span, result)
    }

    async fn delete_many(&self, policy_type: &str, rules: &[Vec<String>]) -> Result<((), RowCounts)> {
        let records = Self::to_records(policy_type, rules)?;

        let mut tx = self.begin().await?;
        let result = self.delete_records_in(&mut tx, &records).await;
        let deleted = self.complete(tx, Operation::Remove, result).await?;
        Ok(((), RowCounts::deleted(deleted)))
    }

    async fn delete_records_in(&self, tx: &mut Tx, records: &[PolicyRecord]) -> Result<u64> {
        let mut deleted = 0;
        for record in records {
            let statement = self.statements.delete(&FieldFilter::for_record(record));
            deleted += Self::query(&statement)
                .execute(&mut **tx)
                .await?
                .rows_affected();
        }
        Ok(deleted)
    }

    /// Delete every record matching a field filter in a single statement.
    pub async fn remove_filtered_policy(
        &self,
        section: Section,
        policy_type: &str,
        field_offset: i32,
        field_values: &[String],
    ) -> Result<()> {
        let span = telemetry::span(Operation::RemoveFiltered);
        debug!(%section, policy_type, field_offset, ?field_values, "removing filtered policies");
        let result = self.delete_filtered(policy_type, field_offset, field_values).await;
        self.observe(span, result)
    }

    async fn delete_filtered(
        &self,
        policy_type: &str,
        field_offset: i32,
        field_values: &[String],
    ) -> Result<((), RowCounts)> {
        let filter = FieldFilter::new(policy_type, field_offset, field_values);
        let statement = self.statements.delete(&filter);
        let deleted = Self::query(&statement)
            .execute(self.handle.pool())
            .await?
            .rows_affected();
        Ok(((), RowCounts::deleted(deleted)))
    }

    /// Overwrite the records matching `old_rule` with `new_rule`.
    pub async fn update_policy(
        &self,
        section: Section,
        policy_type: &str,
        old_rule: &[String],
        new_rule: &[String],
    ) -> Result<()> {
        let span = telemetry::span(Operation::Update);
        debug!(%section, policy_type, ?old_rule, ?new_rule, "updating policy");
        let result = self.update_one(policy_type, old_rule, new_rule).await;
        self.observe(span, result)
    }

    async fn update_one(
        &self,
        policy_type: &str,
        old_rule: &[String],
        new_rule: &[String],
    ) -> Result<((), RowCounts)> {
        let old = PolicyRecord::from_rule(policy_type, old_rule)?;
        let new = PolicyRecord::from_rule(policy_type, new_rule)?;
        let statement = self.statements.update(&FieldFilter::for_record(&old), &new);
        let written = Self::query(&statement)
            .execute(self.handle.pool())
            .await?
            .rows_affected();
        Ok(((), RowCounts::written(written)))
    }

    /// Update rules pairwise by position inside one transaction.
    ///
    /// # Errors
    /// * `MismatchedBatch` - the two lists differ in length; nothing is touched
    pub async fn update_policies(
        &self,
        section: Section,
        policy_type: &str,
        old_rules: &[Vec<String>],
        new_rules: &[Vec<String>],
    ) -> Result<()> {
        let span = telemetry::span(Operation::Update);
        debug!(%section, policy_type, count = old_rules.len(), "updating policies");
        let result = self.update_many(policy_type, old_rules, new_rules).await;
        self.observe(span, result)
    }

    async fn update_many(
        &self,
        policy_type: &str,
        old_rules: &[Vec<String>],
        new_rules: &[Vec<String>],
    ) -> Result<((), RowCounts)> {
        if old_rules.len() != new_rules.len() {
            return Err(Error::MismatchedBatch {
                old: old_rules.len(),
                new: new_rules.len(),
            });
        }
        let olds = Self::to_records(policy_type, old_rules)?;
        let news = Self::to_records(policy_type, new_rules)?;

        let mut tx = self.begin().await?;
        let result = self.update_pairs_in(&mut tx, &olds, &news).await;
        let written = self.complete(tx, Operation::Update, result).await?;
        Ok(((), RowCounts::written(written)))
    }

    async fn update_pairs_in(
        &self,
        tx: &mut Tx,
        olds: &[PolicyRecord],
        news: &[PolicyRecord],
    ) -> Result<u64> {
        let mut written = 0;
        for (old, new) in olds.iter().zip(news) {
            let statement = self.statements.update(&FieldFilter::for_record(old), new);
            written += Self::query(&statement)
                .execute(&mut **tx)
                .await?
                .rows_affected();
        }
        Ok(written)
    }

    /// Replace every record matching a field filter with `new_rules`.
    ///
    /// Selecting the matches, deleting them and inserting the new rules share
    /// one transaction. Returns the rules that matched before the call.
    pub async fn update_filtered_policies(
        &self,
        section: Section,
        policy_type: &str,
        new_rules: &[Vec<String>],
        field_offset: i32,
        field_values: &[String],
    ) -> Result<Vec<Vec<String>>> {
        let span = telemetry::span(Operation::UpdateFiltered);
        debug!(
            %section,
            policy_type,
            field_offset,
            ?field_values,
            count = new_rules.len(),
            "updating filtered policies"
        );
        let result = self
            .replace_filtered(policy_type, new_rules, field_offset, field_values)
            .await;
        self.observe(span, result)
    }

    async fn replace_filtered(
        &self,
        policy_type: &str,
        new_rules: &[Vec<String>],
        field_offset: i32,
        field_values: &[String],
    ) -> Result<(Vec<Vec<String>>, RowCounts)> {
        let records = Self::to_records(policy_type, new_rules)?;
        let filter = FieldFilter::new(policy_type, field_offset, field_values);

        let mut tx = self.begin().await?;
        let result = self.replace_filtered_in(&mut tx, &filter, &records).await;
        self.complete(tx, Operation::UpdateFiltered, result).await
    }

    async fn replace_filtered_in(
        &self,
        tx: &mut Tx,
        filter: &FieldFilter,
        records: &[PolicyRecord],
    ) -> Result<(Vec<Vec<String>>, RowCounts)> {
        let rows = Self::query(&self.statements.select(filter))
            .fetch_all(&mut **tx)
            .await?;
        let previous = rows
            .iter()
            .map(|row| PolicyRecord::from_row(row).map(|record| record.to_rule()))
            .collect::<Result<Vec<_>>>()?;

        let deleted = Self::query(&self.statements.delete(filter))
            .execute(&mut **tx)
            .await?
            .rows_affected();
        let written = self.insert_in(tx, records).await?;

        let rows = RowCounts {
            read: previous.len() as u64,
            written,
            deleted,
        };
        Ok((previous, rows))
    }

    fn to_records(policy_type: &str, rules: &[Vec<String>]) -> Result<Vec<PolicyRecord>> {
        rules
            .iter()
            .map(|rule| PolicyRecord::from_rule(policy_type, rule))
            .collect()
    }

    async fn insert_in(&self, tx: &mut Tx, records: &[PolicyRecord]) -> Result<u64> {
        let mut written = 0;
        for chunk in records.chunks(INSERT_BATCH_ROWS) {
            if let Some(statement) = self.statements.insert(chunk) {
                written += Self::query(&statement)
                    .execute(&mut **tx)
                    .await?
                    .rows_affected();
            }
        }
        Ok(written)
    }

    fn query(statement: &Statement) -> Query<'_, Any, AnyArguments<'_>> {
        statement
            .binds
            .iter()
            .fold(sqlx::query(&statement.sql), |query, value| {
                query.bind(value.as_str())
            })
    }

    async fn begin(&self) -> Result<Tx> {
        Ok(self.handle.pool().begin().await?)
    }

    /// Commit on success, roll back on failure. The operation error is
    /// returned even if the rollback itself fails.
    async fn complete<T>(&self, tx: Tx, operation: Operation, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| Error::transaction_aborted_by(operation.as_str(), e))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(%operation, error = %rollback_err, "transaction rollback failed");
                }
                self.telemetry.record_rollback();
                debug!(%operation, error = %err, "transaction rolled back");

                Err(match err {
                    Error::TransactionAborted {
                        message, source, ..
                    } => Error::TransactionAborted {
                        operation: operation.as_str().to_string(),
                        message,
                        source,
                    },
                    other => other,
                })
            }
        }
    }

    fn observe<T>(&self, span: Span, result: Result<(T, RowCounts)>) -> Result<T> {
        let operation = span.operation();
        match result {
            Ok((value, rows)) => {
                let elapsed_ms = span.end();
                self.telemetry.record_operation(operation, rows, elapsed_ms);
                debug!(
                    %operation,
                    read = rows.read,
                    written = rows.written,
                    deleted = rows.deleted,
                    elapsed_ms,
                    "policy store operation completed"
                );
                Ok(value)
            }
            Err(err) => {
                self.telemetry.record_error(&err);
                debug!(%operation, error = %err, category = err.category(), "policy store operation failed");
                Err(err)
            }
        }
    }
}

#[async_trait]
impl Adapter for PolicyStore {
    async fn load_policy(&self, sink: &mut dyn PolicySink) -> Result<()> {
        PolicyStore::load_policy(self, sink).await.map(|_| ())
    }

    async fn save_policy(&self, model: &PolicyModel) -> Result<()> {
        PolicyStore::save_policy(self, model).await
    }

    async fn add_policy(&self, section: Section, policy_type: &str, rule: &[String]) -> Result<()> {
        PolicyStore::add_policy(self, section, policy_type, rule).await
    }

    async fn remove_policy(
        &self,
        section: Section,
        policy_type: &str,
        rule: &[String],
    ) -> Result<()> {
        PolicyStore::remove_policy(self, section, policy_type, rule).await
    }

    async fn remove_filtered_policy(
        &self,
        section: Section,
        policy_type: &str,
        field_offset: i32,
        field_values: &[String],
    ) -> Result<()> {
        PolicyStore::remove_filtered_policy(self, section, policy_type, field_offset, field_values)
            .await
    }
}

#[async_trait]
impl BatchAdapter for PolicyStore {
    async fn add_policies(
        &self,
        section: Section,
        policy_type: &str,
        rules: &[Vec<String>],
    ) -> Result<()> {
        PolicyStore::add_policies(self, section, policy_type, rules).await
    }

    async fn remove_policies(
        &self,
        section: Section,
        policy_type: &str,
        rules: &[Vec<String>],
    ) -> Result<()> {
        PolicyStore::remove_policies(self, section, policy_type, rules).await
    }
}

#[async_trait]
impl UpdatableAdapter for PolicyStore {
    async fn update_policy(
        &self,
        section: Section,
        policy_type: &str,
        old_rule: &[String],
        new_rule: &[String],
    ) -> Result<()> {
        PolicyStore::update_policy(self, section, policy_type, old_rule, new_rule).await
    }

    async fn update_policies(
        &self,
        section: Section,
        policy_type: &str,
        old_rules: &[Vec<String>],
        new_rules: &[Vec<String>],
    ) -> Result<()> {
        PolicyStore::update_policies(self, section, policy_type, old_rules, new_rules).await
    }

    async fn update_filtered_policies(
        &self,
        section: Section,
        policy_type: &str,
        new_rules: &[Vec<String>],
        field_offset: i32,
        field_values: &[String],
    ) -> Result<Vec<Vec<String>>> {
        PolicyStore::update_filtered_policies(
            self,
            section,
            policy_type,
            new_rules,
            field_offset,
            field_values,
        )
        .await
    }
}

/// Builder for creating a PolicyStore.
#[derive(Debug, Default)]
pub struct PolicyStoreBuilder {
    handle: Option<StoreHandle>,
    store: Option<StoreConfig>,
    telemetry: Option<TelemetryConfig>,
    table_name: Option<String>,
    create_table: Option<bool>,
    unique_rules: Option<bool>,
}

impl PolicyStoreBuilder {
    /// Create a new policy store builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection handle.
    pub fn with_handle(mut self, handle: StoreHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.store = Some(config.store);
        self.telemetry = Some(config.telemetry);
        self
    }

    /// Set the rule table name.
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Create the rule table on build if it does not exist.
    pub fn with_create_table(mut self, create_table: bool) -> Self {
        self.create_table = Some(create_table);
        self
    }

    /// Enforce uniqueness of whole rules with an index.
    pub fn with_unique_rules(mut self, unique_rules: bool) -> Self {
        self.unique_rules = Some(unique_rules);
        self
    }

    /// Build the policy store.
    pub async fn build(self) -> Result<PolicyStore> {
        let handle = self
            .handle
            .ok_or_else(|| Error::config("a store handle is required to build a policy store"))?;
        let mut store_config = self.store.unwrap_or_default();

        // Apply builder overrides
        if let Some(table_name) = self.table_name {
            store_config.table_name = table_name;
        }
        if let Some(create_table) = self.create_table {
            store_config.create_table = create_table;
        }
        if let Some(unique_rules) = self.unique_rules {
            store_config.unique_rules = unique_rules;
        }
        validate_table_name(&store_config.table_name)?;

        let telemetry = Telemetry::new(&self.telemetry.unwrap_or_default());
        let statements = StatementBuilder::new(store_config.table_name, handle.backend());
        let store = PolicyStore {
            handle,
            statements,
            unique_rules: store_config.unique_rules,
            telemetry: Arc::new(telemetry),
        };

        if store_config.create_table {
            store.ensure_table().await?;
        }

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Backend;

    fn rule(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    async fn memory_store() -> PolicyStore {
        let handle = StoreHandle::sqlite("sqlite::memory:", &StoreConfig::default())
            .await
            .unwrap();
        PolicyStore::builder()
            .with_handle(handle)
            .with_unique_rules(true)
            .build()
            .await
            .unwrap()
    }

    async fn stored(store: &PolicyStore) -> PolicyModel {
        let mut model = PolicyModel::new();
        store.load_policy(&mut model).await.unwrap();
        model
    }

    #[tokio::test]
    async fn test_builder_requires_handle() {
        let err = PolicyStore::builder().build().await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_builder_rejects_bad_table_name() {
        let handle = StoreHandle::sqlite("sqlite::memory:", &StoreConfig::default())
            .await
            .unwrap();
        let err = PolicyStore::builder()
            .with_handle(handle)
            .with_table_name("rules; --")
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_store_creation() {
        let store = memory_store().await;
        assert_eq!(store.table(), "policy_rules");
        assert_eq!(store.handle().backend(), Backend::Sqlite);
        assert!(stored(&store).await.is_empty());

        // Creating the table again is a no-op
        store.ensure_table().await.unwrap();
    }

    #[tokio::test]
    async fn test_add_and_remove_policy() {
        let store = memory_store().await;
        let alice = rule(&["alice", "data1", "read"]);

        store.add_policy(Section::Policy, "p", &alice).await.unwrap();
        assert!(stored(&store).await.has_policy(Section::Policy, "p", &alice));

        store.remove_policy(Section::Policy, "p", &alice).await.unwrap();
        assert!(stored(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_rule_touches_nothing() {
        let store = memory_store().await;
        let long = rule(&["a", "b", "c", "d", "e", "f", "g"]);

        let err = store.add_policy(Section::Policy, "p", &long).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArity { .. }));

        let err = store
            .add_policies(Section::Policy, "p", &[rule(&["ok"]), long])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArity { .. }));
        assert!(stored(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_metrics_recorded() {
        let store = memory_store().await;
        store
            .add_policies(
                Section::Policy,
                "p",
                &[rule(&["alice", "data1", "read"]), rule(&["bob", "data2", "write"])],
            )
            .await
            .unwrap();
        let _ = stored(&store).await;
        let _ = store
            .add_policy(Section::Policy, "p", &rule(&["alice", "data1", "read"]))
            .await;

        let metrics = store.metrics();
        assert_eq!(metrics.calls["add"], 1);
        assert_eq!(metrics.calls["load"], 1);
        assert_eq!(metrics.rows_written, 2);
        assert_eq!(metrics.rows_read, 2);
        assert_eq!(metrics.errors["constraint_violation"], 1);
    }

    #[tokio::test]
    async fn test_close() {
        let store = memory_store().await;
        store.close().await;
        assert!(store.handle().is_closed());

        let err = store
            .add_policy(Section::Policy, "p", &rule(&["alice"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable { .. }));
    }
}
