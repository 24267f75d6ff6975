//! The set of user ids known to the remote store.
//!
//! Fetched once from the `UserList` node and passed explicitly to whatever
//! needs to validate an id. Call [`UserDirectory::refresh`] to re-read it.

use crate::error::RemoteError;
use crate::remote::RemoteStore;
use std::collections::BTreeSet;

/// Remote node listing every user id as a key.
pub const USER_LIST_PATH: &str = "UserList";

/// Known user ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDirectory {
    ids: BTreeSet<String>,
}

impl UserDirectory {
    /// Read the user list from the remote store.
    pub fn fetch<S: RemoteStore + ?Sized>(store: &S) -> Result<Self, RemoteError> {
        let listing = store.read(USER_LIST_PATH, false)?;
        let ids: BTreeSet<String> = listing.into_iter().map(|(id, _)| id).collect();
        tracing::debug!(count = ids.len(), "fetched user directory");
        Ok(Self { ids })
    }

    /// Build a directory from known ids without contacting the store.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Replace the known ids with a fresh read.
    pub fn refresh<S: RemoteStore + ?Sized>(&mut self, store: &S) -> Result<(), RemoteError> {
        *self = Self::fetch(store)?;
        Ok(())
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.ids.contains(user_id)
    }

    /// Ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
