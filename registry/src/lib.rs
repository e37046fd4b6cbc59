// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The association between plan nodes and value stores.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use fnv::FnvHashMap;

use graph::{CallSite, NodeId};
use plan::{builtins, Plan};
use store::ValueStore;

/// A node's registration: its store, whether it is a source, and the site
/// that registered it.
#[derive(Clone)]
pub struct RegistryEntry {
    pub store: Arc<dyn ValueStore>,
    pub is_source: bool,
    pub site: CallSite,
}

/// The node already has a value store.
#[derive(Debug)]
pub struct DuplicateEntry(pub NodeId);

impl fmt::Display for DuplicateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The node {:?} already has a value store.", self.0)
    }
}

impl Error for DuplicateEntry {}

///
/// A mapping from plan node to value store. At most one entry per node.
///
#[derive(Clone, Default)]
pub struct Registry {
    mapping: FnvHashMap<NodeId, RegistryEntry>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    ///
    /// Assigns a value store to an existing node. The node's value will be
    /// written to the store when computed and read back instead of
    /// recomputed while the store stays fresh.
    ///
    #[track_caller]
    pub fn add(
        &mut self,
        node: NodeId,
        store: Arc<dyn ValueStore>,
    ) -> Result<(), DuplicateEntry> {
        let site = CallSite::capture("add");
        if self.mapping.contains_key(&node) {
            return Err(DuplicateEntry(node));
        }
        self.mapping.insert(
            node,
            RegistryEntry {
                store,
                is_source: false,
                site,
            },
        );
        Ok(())
    }

    ///
    /// Creates a node in the plan that reads from the given value store.
    ///
    /// The new node refers to a placeholder callable that fails if this
    /// registry is not supplied to `run`; the transformation replaces its
    /// outputs with an actual read call.
    ///
    #[track_caller]
    pub fn source(&mut self, plan: &mut Plan, store: Arc<dyn ValueStore>) -> NodeId {
        let site = CallSite::capture("source");
        let node = plan
            .call_with_site(site.clone(), &builtins::source(), Vec::new(), Vec::new())
            .expect("the source placeholder takes no arguments");
        self.mapping.insert(
            node,
            RegistryEntry {
                store,
                is_source: true,
                site,
            },
        );
        node
    }

    ///
    /// Directly inserts an entry for a node, replacing any existing entry.
    /// Tools that rebuild a plan node by node use this to carry
    /// registrations across to the rebuilt node ids.
    ///
    pub fn insert(&mut self, node: NodeId, entry: RegistryEntry) {
        self.mapping.insert(node, entry);
    }

    pub fn get(&self, node: NodeId) -> Option<&Arc<dyn ValueStore>> {
        self.mapping.get(&node).map(|entry| &entry.store)
    }

    pub fn entry(&self, node: NodeId) -> Option<&RegistryEntry> {
        self.mapping.get(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.mapping.contains_key(&node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.mapping.keys().copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (NodeId, &RegistryEntry)> + '_ {
        self.mapping.iter().map(|(node, entry)| (*node, entry))
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Registry(len={})", self.mapping.len())
    }
}
