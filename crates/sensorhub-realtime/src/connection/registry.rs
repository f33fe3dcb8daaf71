//! Connection registry: the set of connections eligible for broadcasts.
//!
//! Owned exclusively by the coordinator task, so it needs no locking.

use std::collections::HashMap;
use std::sync::Arc;

use super::handle::{ConnectionHandle, ConnectionId};

/// All currently registered connections, keyed by id.
#[derive(Debug, Default)]
pub struct Registry {
    connections: HashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a connection. Returns `false` if the id was already present,
    /// in which case the existing entry is kept.
    pub fn insert(&mut self, conn: Arc<ConnectionHandle>) -> bool {
        if self.connections.contains_key(&conn.id) {
            return false;
        }
        self.connections.insert(conn.id, conn);
        true
    }

    /// Removes a connection, returning it if it was present.
    pub fn remove(&mut self, id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.connections.remove(id)
    }

    /// Current members, in no particular order.
    pub fn snapshot(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections.values().cloned().collect()
    }

    /// Removes and returns every member.
    pub fn drain(&mut self) -> Vec<Arc<ConnectionHandle>> {
        self.connections.drain().map(|(_, conn)| conn).collect()
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::transport::memory::MemoryTransport;

    fn conn() -> Arc<ConnectionHandle> {
        Arc::new(ConnectionHandle::new(
            None,
            Box::new(MemoryTransport::new()),
        ))
    }

    #[test]
    fn test_size_after_registers_and_unregisters() {
        for (n, m) in [(0usize, 0usize), (1, 0), (1, 1), (5, 2), (16, 16), (40, 13)] {
            let mut registry = Registry::new();
            let conns: Vec<_> = (0..n).map(|_| conn()).collect();
            for c in &conns {
                assert!(registry.insert(Arc::clone(c)));
            }
            for c in conns.iter().take(m) {
                assert!(registry.remove(&c.id).is_some());
            }
            assert_eq!(registry.len(), n - m, "n={n} m={m}");
        }
    }

    #[test]
    fn test_duplicate_insert_is_idempotent() {
        let mut registry = Registry::new();
        let c = conn();
        assert!(registry.insert(Arc::clone(&c)));
        assert!(!registry.insert(Arc::clone(&c)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot().len(), 1);
    }

    #[test]
    fn test_remove_absent_is_none() {
        let mut registry = Registry::new();
        let c = conn();
        assert!(registry.remove(&c.id).is_none());
        registry.insert(Arc::clone(&c));
        assert!(registry.remove(&c.id).is_some());
        assert!(registry.remove(&c.id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_drain_empties_registry() {
        let mut registry = Registry::new();
        registry.insert(conn());
        registry.insert(conn());
        assert_eq!(registry.drain().len(), 2);
        assert!(registry.is_empty());
    }
}
