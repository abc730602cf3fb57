//! Two-level route index.
//!
//! # Responsibilities
//! - Index descriptors by HTTP method, then by path-term count
//! - Register (rejecting ambiguous duplicates), unregister, look up
//! - Stay readable without locks while serving
//!
//! # Design Decisions
//! - Each (method, count) cell is a concurrent map keyed by `RouteKey`,
//!   whose coarse hash makes the cell a linear probe by wildcard-aware
//!   equality. Cells are created lazily on first registration.
//! - Mutation is serialized by a single mutex so two racing registrations
//!   cannot both initialize the same cell or both pass the duplicate check.
//!   Lookups never take that lock: they may observe the table before or
//!   after a concurrent registration, never a corrupted state.
//! - Lookup is total. Out-of-range term counts and the unknown-method
//!   sentinel resolve to "not found", they never panic.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::RegistrationError;
use crate::routing::handler::HandlerDescriptor;
use crate::routing::key::{HttpMethod, RouteKey};

/// Highest supported path-term count is `MAX_TERMS - 1`.
pub const MAX_TERMS: usize = 512;

type Cell = DashMap<RouteKey, Arc<HandlerDescriptor>>;

/// Route index shared read-mostly across all I/O and worker threads.
pub struct RouteTable {
    cells: DashMap<(usize, usize), Cell>,
    mutation: Mutex<()>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
            mutation: Mutex::new(()),
        }
    }

    /// Register a descriptor under `key`.
    ///
    /// Fails on an equal (wildcard-aware) key already present: two routes
    /// that would both match the same request are ambiguous, and rejecting
    /// them loudly beats silently overwriting either one.
    pub fn register(
        &self,
        key: RouteKey,
        descriptor: Arc<HandlerDescriptor>,
    ) -> Result<(), RegistrationError> {
        if key.method() == HttpMethod::Unknown {
            return Err(RegistrationError::UnsupportedMethod);
        }
        if key.terms().len() >= MAX_TERMS {
            return Err(RegistrationError::TooManySegments(key.to_string(), MAX_TERMS));
        }

        let _guard = self.mutation.lock();
        let cell = self
            .cells
            .entry((key.method().index(), key.terms().len()))
            .or_default();
        if cell.contains_key(&key) {
            return Err(RegistrationError::DuplicateRoute(key.to_string()));
        }
        cell.insert(key, descriptor);
        Ok(())
    }

    /// Remove the route matching `key`. Idempotent: unregistering a missing
    /// route is a no-op.
    pub fn unregister(&self, key: &RouteKey) {
        let _guard = self.mutation.lock();
        if let Some(cell) = self.cells.get(&(key.method().index(), key.terms().len())) {
            cell.remove(key);
        }
    }

    /// Find the descriptor matching `key`. Total over every method and term
    /// count, including the unknown sentinel and out-of-range counts.
    pub fn lookup(&self, key: &RouteKey) -> Option<Arc<HandlerDescriptor>> {
        if key.method() == HttpMethod::Unknown || key.terms().len() >= MAX_TERMS {
            return None;
        }
        self.cells
            .get(&(key.method().index(), key.terms().len()))
            .and_then(|cell| cell.get(key).map(|entry| Arc::clone(entry.value())))
    }

    /// Per-route hit counts for introspection, internal routes excluded.
    pub fn hit_counts(&self) -> Vec<(String, u64)> {
        let mut counts = Vec::new();
        for cell in self.cells.iter() {
            for entry in cell.value().iter() {
                let descriptor = entry.value();
                if !descriptor.is_internal() {
                    counts.push((descriptor.route().to_string(), descriptor.hit_count()));
                }
            }
        }
        counts
    }

    /// Number of registered routes (internal ones included).
    pub fn len(&self) -> usize {
        self.cells.iter().map(|cell| cell.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}
