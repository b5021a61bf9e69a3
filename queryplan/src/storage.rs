//! The storage side of table references in the query tree.
//!
//! The planner only needs to know two things about a storage: its identity, and whether it is
//! backed by an already-built [`PreparedSet`]. The latter is exposed as a capability query
//! ([`Storage::as_set_storage`]) rather than by downcasting.

use std::fmt;
use std::sync::Arc;

use crate::set::PreparedSet;

/// A table, as far as the planner is concerned.
pub trait Storage: fmt::Debug + Send + Sync {
    /// Fully-qualified name of the storage. Two table references with the same name refer to the
    /// same storage.
    fn name(&self) -> &str;

    /// If this storage holds its data as a prepared set, return the set-storage view of it.
    fn as_set_storage(&self) -> Option<&dyn SetStorage> {
        None
    }
}

/// A storage whose contents are a [`PreparedSet`], built as data was inserted into it.
pub trait SetStorage {
    /// A shared handle to the storage's set. The set is never copied.
    fn get_set(&self) -> Arc<PreparedSet>;
}

/// A storage holding a prepared set, usable directly as the right-hand side of `IN`.
#[derive(Debug)]
pub struct StorageSet {
    name: String,
    set: Arc<PreparedSet>,
}

impl StorageSet {
    pub fn new<N: Into<String>>(name: N, set: Arc<PreparedSet>) -> Self {
        Self {
            name: name.into(),
            set,
        }
    }
}

impl Storage for StorageSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_set_storage(&self) -> Option<&dyn SetStorage> {
        Some(self)
    }
}

impl SetStorage for StorageSet {
    fn get_set(&self) -> Arc<PreparedSet> {
        Arc::clone(&self.set)
    }
}

/// An ordinary table. Analysis replaces ordinary tables on the right-hand side of `IN` with
/// subqueries, so one reaching the planner there is an error.
#[derive(Debug)]
pub struct StorageMemory {
    name: String,
}

impl StorageMemory {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self { name: name.into() }
    }
}

impl Storage for StorageMemory {
    fn name(&self) -> &str {
        &self.name
    }
}
