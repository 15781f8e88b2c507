// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Lifecycle of the store transaction and of the per-batch savepoints.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::db::{DatabaseError, SinkDatabase};

/// Opens, commits and rolls back the single store transaction of a stream, and
/// allocates the savepoints nested in it.
pub struct TransactionManager {
    /// Random per process, so that names never repeat across restarts of a pooled
    /// connection.
    prefix: String,
    next_savepoint: AtomicU64,
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            prefix: format!("sp_{:016x}", rand::random::<u64>()),
            next_savepoint: AtomicU64::new(0),
        }
    }

    fn next_name(&self) -> String {
        let index = self.next_savepoint.fetch_add(1, Ordering::Relaxed);
        format!("{}_{index}", self.prefix)
    }

    /// Opens the store transaction, rolling back a transaction left open.
    pub async fn begin<D>(&self, database: &D) -> Result<(), DatabaseError>
    where
        D: SinkDatabase + ?Sized,
    {
        if database.in_transaction().await {
            warn!("a store transaction is already open, rolling it back");
            database.rollback().await?;
        }
        database.begin().await
    }

    pub async fn commit<D>(&self, database: &D) -> Result<(), DatabaseError>
    where
        D: SinkDatabase + ?Sized,
    {
        database.commit().await
    }

    pub async fn rollback<D>(&self, database: &D) -> Result<(), DatabaseError>
    where
        D: SinkDatabase + ?Sized,
    {
        database.rollback().await
    }

    /// Opens a savepoint and returns its name, or `None` in autocommit mode.
    pub async fn savepoint<D>(&self, database: &D) -> Result<Option<String>, DatabaseError>
    where
        D: SinkDatabase + ?Sized,
    {
        if !database.in_transaction().await {
            return Ok(None);
        }
        let name = self.next_name();
        database.savepoint(&name).await?;
        debug!(savepoint = %name, "opened savepoint");
        Ok(Some(name))
    }

    pub async fn release<D>(&self, database: &D, name: &str) -> Result<(), DatabaseError>
    where
        D: SinkDatabase + ?Sized,
    {
        database.release_savepoint(name).await
    }

    pub async fn rollback_to<D>(&self, database: &D, name: &str) -> Result<(), DatabaseError>
    where
        D: SinkDatabase + ?Sized,
    {
        database.rollback_to_savepoint(name).await
    }

    /// Opens the scope of a batch: a savepoint in the open store transaction, or a
    /// transaction of its own in autocommit mode.
    pub async fn open_scope<D>(&self, database: &D) -> Result<BatchScope, DatabaseError>
    where
        D: SinkDatabase + ?Sized,
    {
        match self.savepoint(database).await? {
            Some(name) => Ok(BatchScope::Savepoint(name)),
            None => {
                database.begin().await?;
                Ok(BatchScope::Transaction)
            }
        }
    }

    /// Keeps the writes of the batch if `success`, discards them otherwise.
    pub async fn close_scope<D>(
        &self,
        database: &D,
        scope: &BatchScope,
        success: bool,
    ) -> Result<(), DatabaseError>
    where
        D: SinkDatabase + ?Sized,
    {
        match (scope, success) {
            (BatchScope::Savepoint(name), true) => self.release(database, name).await,
            (BatchScope::Savepoint(name), false) => {
                self.rollback_to(database, name).await?;
                self.release(database, name).await
            }
            (BatchScope::Transaction, true) => database.commit().await,
            (BatchScope::Transaction, false) => database.rollback().await,
        }
    }
}

/// Where the writes of a single batch go until the batch is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchScope {
    Savepoint(String),
    /// Autocommit mode: the batch commits on its own.
    Transaction,
}

impl BatchScope {
    pub fn is_nested(&self) -> bool {
        matches!(self, BatchScope::Savepoint(_))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::db::memory::MemoryDatabase;

    #[tokio::test]
    async fn test_savepoints_need_a_transaction() {
        let database = MemoryDatabase::new();
        let manager = TransactionManager::new();
        assert_eq!(manager.savepoint(&database).await.unwrap(), None);

        manager.begin(&database).await.unwrap();
        let first = manager.savepoint(&database).await.unwrap().unwrap();
        let second = manager.savepoint(&database).await.unwrap().unwrap();
        assert_ne!(first, second);
        assert_eq!(database.savepoint_depth(), 2);

        manager.release(&database, &second).await.unwrap();
        manager.rollback_to(&database, &first).await.unwrap();
        assert_eq!(database.savepoint_depth(), 1);
        manager.commit(&database).await.unwrap();
        assert_eq!(database.commit_hook_calls(), 1);
    }

    #[tokio::test]
    async fn test_batches_outside_a_transaction_commit_on_their_own() {
        let database = MemoryDatabase::new();
        let manager = TransactionManager::new();
        let scope = manager.open_scope(&database).await.unwrap();
        assert_eq!(scope, BatchScope::Transaction);
        assert!(database.in_transaction().await);
        manager.close_scope(&database, &scope, true).await.unwrap();
        assert!(!database.in_transaction().await);
        assert_eq!(database.commit_hook_calls(), 1);

        let scope = manager.open_scope(&database).await.unwrap();
        manager.close_scope(&database, &scope, false).await.unwrap();
        assert!(!database.in_transaction().await);
        assert_eq!(database.commit_hook_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_batches_leave_no_savepoint_behind() {
        let database = MemoryDatabase::new();
        let manager = TransactionManager::new();
        manager.begin(&database).await.unwrap();
        let scope = manager.open_scope(&database).await.unwrap();
        assert!(scope.is_nested());
        manager.close_scope(&database, &scope, false).await.unwrap();
        assert_eq!(database.savepoint_depth(), 0);
        assert!(database.in_transaction().await);
    }

    #[tokio::test]
    async fn test_begin_rolls_back_an_open_transaction() {
        let database = MemoryDatabase::new();
        let manager = TransactionManager::new();
        manager.begin(&database).await.unwrap();
        manager.savepoint(&database).await.unwrap();
        manager.begin(&database).await.unwrap();
        assert!(database.in_transaction().await);
        assert_eq!(database.savepoint_depth(), 0);
    }

    #[tokio::test]
    async fn test_release_after_rollback_fails() {
        let database = MemoryDatabase::new();
        let manager = TransactionManager::new();
        manager.begin(&database).await.unwrap();
        let name = manager.savepoint(&database).await.unwrap().unwrap();
        manager.rollback(&database).await.unwrap();
        assert_matches!(
            manager.release(&database, &name).await,
            Err(DatabaseError::NoOpenTransaction)
        );
    }

    #[test]
    fn test_names_are_unique_across_managers() {
        let first = TransactionManager::new();
        let second = TransactionManager::new();
        assert_ne!(first.next_name(), second.next_name());
        assert!(first.next_name().ends_with("_1"));
    }
}
