// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User directory backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: email → serialized [`StoredUser`] (JSON bytes)
//!
//! Emails are stored and matched exactly as given; no case folding.
//! Every call opens its own read or write transaction and drops it before
//! returning, so nothing is held across requests.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};

use super::{StorageError, StorageResult};

/// Primary table: email → serialized StoredUser.
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// User record as persisted.
///
/// `password_hash` and `salt` stay inside the server; API responses use
/// [`crate::models::UserProfile`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    pub email: String,
    pub name: String,
    pub lastname: String,
    pub password_hash: String,
    pub salt: String,
    pub created_at: DateTime<Utc>,
}

pub struct UserDirectory {
    db: Database,
}

impl UserDirectory {
    /// Open (or create) the directory at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Create the table up front so read transactions never miss it
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Insert a new user. Fails with `AlreadyExists` if the email is taken.
    ///
    /// The existence check and the insert share one write transaction, so
    /// two concurrent signups for the same email cannot both succeed.
    pub fn insert(&self, user: &StoredUser) -> StorageResult<()> {
        let json = serde_json::to_vec(user)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USERS)?;
            let taken = table.get(user.email.as_str())?.is_some();
            if taken {
                return Err(StorageError::AlreadyExists(format!(
                    "User {}",
                    user.email
                )));
            }
            table.insert(user.email.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a user by exact email.
    pub fn get_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        let user = match table.get(email)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(user)
    }

    /// Whether a user with this email exists.
    pub fn exists(&self, email: &str) -> StorageResult<bool> {
        Ok(self.get_by_email(email)?.is_some())
    }

    /// Number of registered users.
    pub fn count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        Ok(table.len()?)
    }

    /// Confirm the database can serve a read transaction.
    pub fn health_check(&self) -> StorageResult<()> {
        self.count().map(|_| ())
    }
}
