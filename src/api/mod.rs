//! Public adapter API consumed by a policy-evaluation engine.
//!
//! The surface is split the way engines usually probe for capabilities: every
//! store supports [`Adapter`]; [`BatchAdapter`] and [`UpdatableAdapter`] add
//! the multi-rule and in-place update operations.

mod adapter;

pub use adapter::{Adapter, BatchAdapter, UpdatableAdapter};
