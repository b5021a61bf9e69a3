//! Planner contexts, and the registry of prepared sets they carry.
//!
//! A [`GlobalPlannerContext`] is shared by every planner working on the same query plan (one per
//! subquery scope, possibly on different threads), and is passed around as an
//! `Arc<GlobalPlannerContext>`. Its registry maps a [`SetKey`] to the set built for it, so that
//! structurally identical right-hand sides of `IN` share one set.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use derive_more::Display;
use queryplan_errors::{PlanError, PlanResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::set::PreparedSet;
use crate::settings::PlannerSettings;
use crate::tree::{QueryTreeNode, QueryTreeNodeRef, TreeHash};

/// Identifies a set in the registry, derived from the structure of the expression defining it.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
pub struct SetKey(String);

impl SetKey {
    pub fn from_tree_hash(hash: TreeHash) -> Self {
        Self(format!("__set_{}_{}", hash.first, hash.second))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Where a registered set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum SetSource {
    /// Owned by a set-backed storage
    #[display("storage")]
    Storage,
    /// Built from a constant
    #[display("constant")]
    Constant,
    /// To be filled from a subquery, during execution
    #[display("subquery")]
    Subquery,
}

/// An entry in the set registry.
#[derive(Debug, Clone)]
pub struct PlannerSet {
    set: Arc<PreparedSet>,
    source: SetSource,
    subquery: Option<QueryTreeNodeRef>,
}

impl PlannerSet {
    /// A set that is already filled, either from a constant or by its storage.
    pub fn ready(set: Arc<PreparedSet>, source: SetSource) -> Self {
        Self {
            set,
            source,
            subquery: None,
        }
    }

    /// A pending set, along with the subquery that will fill it.
    pub fn pending(set: Arc<PreparedSet>, subquery: QueryTreeNodeRef) -> Self {
        Self {
            set,
            source: SetSource::Subquery,
            subquery: Some(subquery),
        }
    }

    pub fn set(&self) -> &Arc<PreparedSet> {
        &self.set
    }

    pub fn source(&self) -> SetSource {
        self.source
    }

    pub fn subquery(&self) -> Option<&QueryTreeNodeRef> {
        self.subquery.as_ref()
    }
}

/// A pending set and the subquery node whose result it must be filled with.
#[derive(Debug, Clone)]
pub struct SubqueryNodeForSet {
    pub key: SetKey,
    pub subquery_node: QueryTreeNodeRef,
    pub set: Arc<PreparedSet>,
}

/// State shared by every planner building one query plan.
#[derive(Debug, Default)]
pub struct GlobalPlannerContext {
    sets: DashMap<SetKey, PlannerSet, ahash::RandomState>,
    num_sets_built: AtomicUsize,
}

impl GlobalPlannerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the registry key for the set defined by `node`.
    ///
    /// Structurally identical nodes always get the same key.
    pub fn set_key(node: &QueryTreeNode) -> SetKey {
        SetKey::from_tree_hash(node.tree_hash())
    }

    pub fn get_set_or_none(&self, key: &SetKey) -> Option<PlannerSet> {
        self.sets.get(key).map(|entry| entry.value().clone())
    }

    /// Register a ready set under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DuplicateSetKey`] if `key` is already registered.
    pub fn register_set(&self, key: SetKey, set: PlannerSet) -> PlanResult<()> {
        match self.sets.entry(key) {
            Entry::Occupied(entry) => Err(PlanError::DuplicateSetKey(entry.key().to_string())),
            Entry::Vacant(entry) => {
                debug!(key = %entry.key(), source = %set.source, "Registered set");
                entry.insert(set);
                Ok(())
            }
        }
    }

    /// Register `set` under `key` as pending, to be filled from `subquery_node`.
    ///
    /// If `key` is already registered with this very set and no subquery yet, the subquery is
    /// attached to the existing entry.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DuplicateSetKey`] if `key` is already registered with a different
    /// set, or already has a subquery attached.
    pub fn register_subquery_node_for_set(
        &self,
        key: SetKey,
        subquery_node: QueryTreeNodeRef,
        set: Arc<PreparedSet>,
    ) -> PlanResult<()> {
        match self.sets.entry(key) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if existing.subquery.is_some() || !Arc::ptr_eq(&existing.set, &set) {
                    return Err(PlanError::DuplicateSetKey(entry.key().to_string()));
                }
                existing.subquery = Some(subquery_node);
                existing.source = SetSource::Subquery;
                debug!(key = %entry.key(), "Attached subquery to set");
                Ok(())
            }
            Entry::Vacant(entry) => {
                debug!(key = %entry.key(), "Registered pending set");
                entry.insert(PlannerSet::pending(set, subquery_node));
                Ok(())
            }
        }
    }

    /// Return the set registered under `key`, or build one with `build` and register it.
    ///
    /// The check and the insert happen atomically: concurrent callers with the same key run
    /// `build` at most once between them, and all get the same set back. If `build` fails,
    /// nothing is registered.
    ///
    /// `build` runs while part of the registry is locked, so it must not call back into this
    /// context.
    pub fn get_or_try_register_set_with<F>(&self, key: SetKey, build: F) -> PlanResult<PlannerSet>
    where
        F: FnOnce() -> PlanResult<PlannerSet>,
    {
        match self.sets.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                self.num_sets_built.fetch_add(1, Ordering::Relaxed);
                let set = build()?;
                debug!(key = %entry.key(), source = %set.source, "Registered set");
                Ok(entry.insert(set).value().clone())
            }
        }
    }

    /// All pending sets with the subqueries that fill them, ordered by key.
    pub fn subquery_nodes_for_sets(&self) -> Vec<SubqueryNodeForSet> {
        let mut res: Vec<_> = self
            .sets
            .iter()
            .filter_map(|entry| {
                entry.subquery.as_ref().map(|subquery| SubqueryNodeForSet {
                    key: entry.key().clone(),
                    subquery_node: Arc::clone(subquery),
                    set: Arc::clone(&entry.set),
                })
            })
            .collect();
        res.sort_by(|a, b| a.key.cmp(&b.key));
        res
    }

    /// The number of registered sets
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// The number of times [`Self::get_or_try_register_set_with`] ran its builder.
    pub fn num_sets_built(&self) -> usize {
        self.num_sets_built.load(Ordering::Relaxed)
    }
}

/// What a planner needs to plan one query scope.
#[derive(Debug, Clone)]
pub struct PlannerContext {
    global_planner_context: Arc<GlobalPlannerContext>,
    settings: Arc<PlannerSettings>,
}

impl PlannerContext {
    pub fn new(
        global_planner_context: Arc<GlobalPlannerContext>,
        settings: Arc<PlannerSettings>,
    ) -> Self {
        Self {
            global_planner_context,
            settings,
        }
    }

    pub fn global_planner_context(&self) -> &Arc<GlobalPlannerContext> {
        &self.global_planner_context
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }
}
