//! Relational persistence for policy rules.
//!
//! [`StoreHandle`] owns the connection pool for one of the supported
//! [`Backend`]s; [`PolicyStore`] runs every rule operation against it.

mod handle;
mod policy_store;

pub use handle::{Backend, StoreHandle};
pub use policy_store::{PolicyStore, PolicyStoreBuilder};
