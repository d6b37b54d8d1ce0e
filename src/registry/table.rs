//! Connection registry
//!
//! Tracks live connections, their addresses, and their display names.
//! The registry is the single source of truth for who is online.

use bytes::Bytes;
use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::error::RegistryError;
use crate::protocol::frame::MAX_NAME_LEN;
use crate::protocol::{Address, TableEntry};
use crate::registry::{ConnectionId, Entry};

/// Registry of live connections, ordered by connection id.
#[derive(Debug, Default)]
pub struct Registry {
    entries: BTreeMap<ConnectionId, Entry>,
    next_id: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a fresh connection id.
    pub fn allocate_id(&mut self) -> ConnectionId {
        self.next_id += 1;
        ConnectionId::new(self.next_id)
    }

    /// Inserts a connection with no name.
    pub fn register(&mut self, id: ConnectionId, entry: Entry) -> Result<(), RegistryError> {
        match self.entries.entry(id) {
            btree_map::Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered(id)),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    /// Stores a display name, rejecting names longer than `MAX_NAME_LEN` bytes.
    ///
    /// A rejected name leaves the connection exactly as it was.
    pub fn set_name(&mut self, id: ConnectionId, name: Bytes) -> Result<(), RegistryError> {
        if name.len() > MAX_NAME_LEN {
            return Err(RegistryError::NameTooLong {
                len: name.len(),
                max: MAX_NAME_LEN,
            });
        }
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(RegistryError::NotRegistered(id))?;
        entry.set_name(name);
        Ok(())
    }

    /// Removes a connection, returning its entry if it was present.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Entry> {
        self.entries.remove(&id)
    }

    /// Returns the earliest-registered connection with the given address.
    pub fn find_by_address(&self, address: Address) -> Option<ConnectionId> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.address() == address)
            .map(|(id, _)| *id)
    }

    /// Lists every named connection as an online table row.
    pub fn snapshot(&self) -> Vec<TableEntry> {
        self.named()
            .filter_map(|(_, entry)| {
                entry.name().map(|name| TableEntry {
                    address: entry.address(),
                    name: name.clone(),
                })
            })
            .collect()
    }

    /// Iterates over broadcast-eligible connections.
    pub fn named(&self) -> impl Iterator<Item = (ConnectionId, &Entry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_named())
            .map(|(id, entry)| (*id, entry))
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
