// This file is part of midnight-rhs.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A [`NodeStorage`] backed by an SQLite database.
//!
//! The schema is a single table `mt_node`, hash as primary key, children as
//! one blob holding the concatenated 32-byte child hashes in submission
//! order. The unique index on `hash` is what serializes concurrent inserts
//! of the same key; `INSERT ... ON CONFLICT DO NOTHING` makes re-submission
//! a no-op.
//!
//! SQLite write transactions are expensive, so a batch is written through a
//! prepared statement inside one transaction per chunk of at most
//! [`INSERT_CHUNK_SIZE`] nodes. Chunks that committed before a backend
//! failure stay committed; validation runs before the first chunk, so a
//! rejected batch never touches the database.

use super::{NodeStorage, StorageError};
use crate::hash::{HASH_BYTES, Hash};
use crate::node::Node;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{
    Connection, OptionalExtension, ToSql, Transaction,
    TransactionBehavior::{self, Deferred, Immediate},
    params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use std::path::Path;
use std::time::Duration;

/// Upper bound on the number of nodes written in one transaction.
pub const INSERT_CHUNK_SIZE: usize = 1000;

/// A [`NodeStorage`] backed by an SQLite database behind a connection pool.
#[derive(Clone, Debug)]
pub struct SqlStorage {
    pool: Pool<SqliteConnectionManager>,
}

impl SqlStorage {
    /// Opens an in-memory database.
    ///
    /// The pool is capped at a single connection: every `:memory:` connection
    /// is its own database, so sharing one is the only way the pool members
    /// see the same data.
    pub fn memory() -> Result<Self, StorageError> {
        Self::new(SqliteConnectionManager::memory(), 1)
    }

    /// Opens a file-backed database, creating it if it doesn't already exist.
    ///
    /// The parent directory must already exist.
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::new(SqliteConnectionManager::file(path), 10)
    }

    fn new(manager: SqliteConnectionManager, max_size: u32) -> Result<Self, StorageError> {
        let init = |conn: &mut Connection| {
            // WAL keeps readers unblocked while a batch commits.
            conn.pragma_update(None, "journal_mode", "WAL")?;
            // Writers queue on the unique index instead of failing fast.
            conn.busy_timeout(Duration::from_millis(10_000))
        };
        let pool = Pool::builder()
            .max_size(max_size)
            .build(manager.with_init(init))?;
        let storage = SqlStorage { pool };
        storage.create_tables()?;
        Ok(storage)
    }

    fn create_tables(&self) -> Result<(), StorageError> {
        self.with_tx(Immediate, |tx| {
            tx.execute(
                "CREATE TABLE IF NOT EXISTS mt_node (
                   hash BLOB NOT NULL PRIMARY KEY,
                   children BLOB NOT NULL
                 )",
                (),
            )
            .map(|_| ())
        })
    }

    /// Wraps a closure in a transaction on a pooled connection.
    ///
    /// Mutating closures must pass `Immediate` so SQLite takes the write lock
    /// up front and queues on the busy timeout instead of failing with
    /// `SQLITE_BUSY` when a deferred read transaction tries to upgrade.
    fn with_tx<F, R>(&self, behavior: TransactionBehavior, closure: F) -> Result<R, StorageError>
    where
        F: FnOnce(&Transaction) -> Result<R, rusqlite::Error>,
    {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(behavior)?;
        let result = closure(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

impl NodeStorage for SqlStorage {
    fn save_nodes(&self, nodes: &[Node]) -> Result<(), StorageError> {
        for node in nodes {
            node.validate()?;
        }
        for chunk in nodes.chunks(INSERT_CHUNK_SIZE) {
            self.with_tx(Immediate, |tx| {
                let mut stmt = tx.prepare(
                    "INSERT INTO mt_node (hash, children) VALUES (?1, ?2) \
                     ON CONFLICT (hash) DO NOTHING",
                )?;
                for node in chunk {
                    stmt.execute(params![node.hash, Children(&node.children)])?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    fn by_hash(&self, hash: &Hash) -> Result<Node, StorageError> {
        let children = self.with_tx(Deferred, |tx| {
            tx.prepare("SELECT children FROM mt_node WHERE hash = ?1")?
                .query_row(params![hash], |row| {
                    let children: StoredChildren = row.get(0)?;
                    Ok(children.0)
                })
                .optional()
        })?;
        match children {
            Some(children) => Ok(Node {
                hash: *hash,
                children,
            }),
            None => Err(StorageError::NotFound),
        }
    }
}

impl ToSql for Hash {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.0.as_slice().into())
    }
}

impl FromSql for Hash {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let bytes = value.as_bytes()?;
        let bytes: [u8; HASH_BYTES] = bytes
            .try_into()
            .map_err(|_| FromSqlError::InvalidBlobSize {
                expected_size: HASH_BYTES,
                blob_size: bytes.len(),
            })?;
        Ok(Hash(bytes))
    }
}

// Borrowing wrapper for writing a children column.
struct Children<'a>(&'a [Hash]);

impl ToSql for Children<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let mut blob = Vec::with_capacity(self.0.len() * HASH_BYTES);
        for child in self.0 {
            blob.extend_from_slice(&child.0);
        }
        Ok(blob.into())
    }
}

// Owning wrapper for reading a children column back.
struct StoredChildren(Vec<Hash>);

impl FromSql for StoredChildren {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let blob = value.as_bytes()?;
        if blob.len() % HASH_BYTES != 0 {
            return Err(FromSqlError::Other(
                format!("children blob of {} bytes is not a multiple of 32", blob.len()).into(),
            ));
        }
        Ok(StoredChildren(
            blob.chunks_exact(HASH_BYTES)
                .map(|chunk| {
                    let mut bytes = [0u8; HASH_BYTES];
                    bytes.copy_from_slice(chunk);
                    Hash(bytes)
                })
                .collect(),
        ))
    }
}
