// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Replication of every write to a secondary store.

use async_trait::async_trait;
use futures::try_join;

use super::{DatabaseError, Filter, InsertMode, Query, SinkDatabase, Update};
use crate::schema::{
    migrations::{Migration, MigrationStore},
    Row, Table,
};

/// Applies writes, transactions and migrations to both stores and reads from the
/// primary one.
pub struct MirroredDatabase<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> MirroredDatabase<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn secondary(&self) -> &S {
        &self.secondary
    }
}

#[async_trait]
impl<P, S> SinkDatabase for MirroredDatabase<P, S>
where
    P: SinkDatabase,
    S: SinkDatabase,
{
    async fn begin(&self) -> Result<(), DatabaseError> {
        try_join!(self.primary.begin(), self.secondary.begin())?;
        Ok(())
    }

    async fn commit(&self) -> Result<(), DatabaseError> {
        try_join!(self.primary.commit(), self.secondary.commit())?;
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DatabaseError> {
        let (primary, secondary) =
            futures::join!(self.primary.rollback(), self.secondary.rollback());
        primary.and(secondary)
    }

    async fn in_transaction(&self) -> bool {
        self.primary.in_transaction().await
    }

    async fn savepoint(&self, name: &str) -> Result<(), DatabaseError> {
        try_join!(self.primary.savepoint(name), self.secondary.savepoint(name))?;
        Ok(())
    }

    async fn release_savepoint(&self, name: &str) -> Result<(), DatabaseError> {
        try_join!(
            self.primary.release_savepoint(name),
            self.secondary.release_savepoint(name)
        )?;
        Ok(())
    }

    async fn rollback_to_savepoint(&self, name: &str) -> Result<(), DatabaseError> {
        try_join!(
            self.primary.rollback_to_savepoint(name),
            self.secondary.rollback_to_savepoint(name)
        )?;
        Ok(())
    }

    async fn insert_rows(
        &self,
        table: &'static Table,
        rows: Vec<Row>,
        mode: InsertMode,
    ) -> Result<u64, DatabaseError> {
        let (written, _) = try_join!(
            self.primary.insert_rows(table, rows.clone(), mode),
            self.secondary.insert_rows(table, rows, mode)
        )?;
        Ok(written)
    }

    async fn delete_rows(
        &self,
        table: &'static Table,
        filters: Vec<Filter>,
    ) -> Result<u64, DatabaseError> {
        let (deleted, _) = try_join!(
            self.primary.delete_rows(table, filters.clone()),
            self.secondary.delete_rows(table, filters)
        )?;
        Ok(deleted)
    }

    async fn select_rows(
        &self,
        table: &'static Table,
        query: Query,
    ) -> Result<Vec<Row>, DatabaseError> {
        self.primary.select_rows(table, query).await
    }

    async fn update_rows(
        &self,
        table: &'static Table,
        update: Update,
    ) -> Result<u64, DatabaseError> {
        let (updated, _) = try_join!(
            self.primary.update_rows(table, update.clone()),
            self.secondary.update_rows(table, update)
        )?;
        Ok(updated)
    }

    async fn execute_script(&self, sql: &str) -> Result<(), DatabaseError> {
        try_join!(
            self.primary.execute_script(sql),
            self.secondary.execute_script(sql)
        )?;
        Ok(())
    }

    async fn execute_detached(&self, sql: &str) -> Result<(), DatabaseError> {
        try_join!(
            self.primary.execute_detached(sql),
            self.secondary.execute_detached(sql)
        )?;
        Ok(())
    }

    async fn reduce_idle_connections(&self, idle: u32) -> Result<(), DatabaseError> {
        try_join!(
            self.primary.reduce_idle_connections(idle),
            self.secondary.reduce_idle_connections(idle)
        )?;
        Ok(())
    }

    async fn migration_store(&self) -> Result<Box<dyn MigrationStore>, DatabaseError> {
        let (primary, secondary) = try_join!(
            self.primary.migration_store(),
            self.secondary.migration_store()
        )?;
        Ok(Box::new(MirroredMigrationStore { primary, secondary }))
    }
}

/// Runs each migration step on the primary store first, then on the secondary one.
struct MirroredMigrationStore {
    primary: Box<dyn MigrationStore>,
    secondary: Box<dyn MigrationStore>,
}

#[async_trait]
impl MigrationStore for MirroredMigrationStore {
    async fn lock(&mut self) -> Result<(), DatabaseError> {
        self.primary.lock().await?;
        self.secondary.lock().await
    }

    async fn unlock(&mut self) -> Result<(), DatabaseError> {
        let primary = self.primary.unlock().await;
        let secondary = self.secondary.unlock().await;
        primary.and(secondary)
    }

    /// The primary ledger is authoritative.
    async fn applied(&mut self) -> Result<Vec<String>, DatabaseError> {
        self.secondary.applied().await?;
        self.primary.applied().await
    }

    async fn apply(&mut self, migration: &Migration) -> Result<(), DatabaseError> {
        self.primary.apply(migration).await?;
        if self
            .secondary
            .applied()
            .await?
            .iter()
            .any(|name| name == migration.name)
        {
            return Ok(());
        }
        self.secondary.apply(migration).await
    }

    async fn revert(&mut self, migration: &Migration) -> Result<(), DatabaseError> {
        self.primary.revert(migration).await?;
        if !self
            .secondary
            .applied()
            .await?
            .iter()
            .any(|name| name == migration.name)
        {
            return Ok(());
        }
        self.secondary.revert(migration).await
    }
}
