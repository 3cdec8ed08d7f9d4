//! # Policy Rule Store
//!
//! Relational persistence for access-control policy rules. Rules are ordered
//! tuples of up to six strings tagged with a policy type (`p`, `g`, `g2`, ...);
//! each is stored as one fixed-width row, and the store keeps the table in
//! sync as an evaluation engine adds, removes and updates rules at runtime.
//!
//! ## Features
//!
//! - **Rule mapping**: variable-arity rules to fixed-width records and back
//! - **Filtered operations**: partial-match filters anchored at a field offset,
//!   with empty values acting as wildcards
//! - **Atomic batches**: multi-rule removes and updates run in one transaction
//! - **Back-ends**: PostgreSQL, MySQL and SQLite through `sqlx`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use policy_rule_store::{PolicyModel, PolicyStore, Section, StoreConfig, StoreHandle};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handle = StoreHandle::sqlite("sqlite://policy.db?mode=rwc", &StoreConfig::default()).await?;
//!     let store = PolicyStore::builder().with_handle(handle).build().await?;
//!
//!     let rule = vec!["alice".to_string(), "data1".to_string(), "read".to_string()];
//!     store.add_policy(Section::Policy, "p", &rule).await?;
//!
//!     let mut model = PolicyModel::new();
//!     store.load_policy(&mut model).await?;
//!     assert!(model.has_policy(Section::Policy, "p", &rule));
//!
//!     store.close().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod policy;
pub mod store;
pub mod telemetry;

// Re-export main types for convenience
pub use api::{Adapter, BatchAdapter, UpdatableAdapter};
pub use config::{Config, StoreConfig, TelemetryConfig};
pub use crate::core::{ColumnPredicate, FieldFilter};
pub use error::{Error, Result};
pub use policy::{PolicyDocument, PolicyModel, PolicyRecord, PolicySink, Section, MAX_FIELDS};
pub use store::{Backend, PolicyStore, PolicyStoreBuilder, StoreHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
