// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The sink store.
//!
//! A [`SinkDatabase`] executes table-level statements derived from the schema
//! descriptions, either inside the single open store transaction or, when none is
//! open, in autocommit mode.

#[cfg(any(test, feature = "test"))]
pub mod memory;
pub mod mirror;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::schema::{migrations::MigrationStore, Row, SqlValue, Table};

/// Upper bound on bind parameters per statement, imposed by the wire protocol.
pub const MAX_BIND_PARAMETERS: usize = 65_535;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("no store transaction is open")]
    NoOpenTransaction,
    #[error("unknown savepoint {0}")]
    UnknownSavepoint(String),
    #[error("unknown column {column} of table {table}")]
    UnknownColumn {
        table: &'static str,
        column: String,
    },
    #[error("row for table {table} has {actual} values, expected {expected}")]
    RowShape {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("constraint violation on {table}: {message}")]
    ConstraintViolation {
        table: &'static str,
        message: String,
    },
    #[error("injected failure: {0}")]
    Injected(&'static str),
}

/// How conflicting rows are treated by an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Rows whose primary key already exists are skipped.
    Insert,
    /// Rows whose primary key already exists are overwritten.
    Upsert,
}

/// A predicate on one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(&'static str, SqlValue),
    In(&'static str, Vec<SqlValue>),
    NotIn(&'static str, Vec<SqlValue>),
    Le(&'static str, SqlValue),
    IsNull(&'static str),
}

impl Filter {
    pub fn column(&self) -> &'static str {
        match self {
            Filter::Eq(column, _)
            | Filter::In(column, _)
            | Filter::NotIn(column, _)
            | Filter::Le(column, _)
            | Filter::IsNull(column) => column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// A selection of columns from one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub columns: Vec<&'static str>,
    /// Conjunction of predicates.
    pub filters: Vec<Filter>,
    pub order_by: Vec<(&'static str, Order)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn select(columns: &[&'static str]) -> Self {
        Self {
            columns: columns.to_vec(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: &'static str, order: Order) -> Self {
        self.order_by.push((column, order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Sets `columns` on the rows matching `key_columns`.
///
/// Each row holds the key values followed by the new values.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub key_columns: Vec<&'static str>,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<SqlValue>>,
}

/// Store operations needed by the engine.
#[async_trait]
pub trait SinkDatabase: Send + Sync {
    /// Opens the store transaction.
    async fn begin(&self) -> Result<(), DatabaseError>;

    /// Commits the store transaction, then calls the `on_commit` hook.
    async fn commit(&self) -> Result<(), DatabaseError>;

    async fn rollback(&self) -> Result<(), DatabaseError>;

    async fn in_transaction(&self) -> bool;

    async fn savepoint(&self, name: &str) -> Result<(), DatabaseError>;

    async fn release_savepoint(&self, name: &str) -> Result<(), DatabaseError>;

    async fn rollback_to_savepoint(&self, name: &str) -> Result<(), DatabaseError>;

    /// Inserts rows, which must match the insertable columns of `table`.
    /// Returns the number of rows written.
    async fn insert_rows(
        &self,
        table: &'static Table,
        rows: Vec<Row>,
        mode: InsertMode,
    ) -> Result<u64, DatabaseError>;

    /// Deletes the rows matching every filter. Returns the number of rows deleted.
    async fn delete_rows(
        &self,
        table: &'static Table,
        filters: Vec<Filter>,
    ) -> Result<u64, DatabaseError>;

    /// Rows hold the query columns, in order.
    async fn select_rows(
        &self,
        table: &'static Table,
        query: Query,
    ) -> Result<Vec<Row>, DatabaseError>;

    async fn update_rows(
        &self,
        table: &'static Table,
        update: Update,
    ) -> Result<u64, DatabaseError>;

    /// Runs a multi-statement script in the current context.
    async fn execute_script(&self, sql: &str) -> Result<(), DatabaseError>;

    /// Runs a script on its own connection, outside of the store transaction.
    async fn execute_detached(&self, sql: &str) -> Result<(), DatabaseError>;

    /// Lowers the number of connections the store keeps open while idle.
    async fn reduce_idle_connections(&self, idle: u32) -> Result<(), DatabaseError>;

    /// A dedicated connection for running migrations.
    async fn migration_store(&self) -> Result<Box<dyn MigrationStore>, DatabaseError>;
}

/// Checks the shape of `rows` and keeps the last row per primary key, so that a single
/// statement never touches a row twice.
pub fn prepare_rows(table: &'static Table, rows: Vec<Row>) -> Result<Vec<Row>, DatabaseError> {
    let expected = table.insert_arity();
    if let Some(row) = rows.iter().find(|row| row.len() != expected) {
        return Err(DatabaseError::RowShape {
            table: table.name,
            expected,
            actual: row.len(),
        });
    }
    let mut positions = HashMap::with_capacity(rows.len());
    let mut prepared: Vec<Row> = Vec::with_capacity(rows.len());
    for row in rows {
        let key = table.row_key(&row);
        match positions.get(&key) {
            Some(&position) => prepared[position] = row,
            None => {
                positions.insert(key, prepared.len());
                prepared.push(row);
            }
        }
    }
    Ok(prepared)
}

/// Checks that every column is insertable into `table`.
pub fn check_columns(table: &'static Table, columns: &[&str]) -> Result<(), DatabaseError> {
    for column in columns {
        if table.column(column).is_none() {
            return Err(DatabaseError::UnknownColumn {
                table: table.name,
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// The number of items per statement that keeps it within [`MAX_BIND_PARAMETERS`].
pub fn chunk_size(parameters_per_item: usize) -> usize {
    (MAX_BIND_PARAMETERS / parameters_per_item.max(1)).max(1)
}
