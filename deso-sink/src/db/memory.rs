// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! An in-memory store for tests.
//!
//! [`MemoryDatabase`] keeps every table as a map from primary key to row and emulates
//! the parts of PostgreSQL the engine relies on: primary and unique keys, upserts with
//! coalescing columns, column types, savepoints, generated columns, the public-key
//! registry triggers and the migration ledger. Failures can be injected at chosen
//! points.

use std::{
    cmp::Ordering as CmpOrdering,
    collections::{BTreeMap, HashMap, HashSet},
    str::FromStr as _,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use async_trait::async_trait;
use deso_base::{data_types::Uint256, transaction::TxnType};

use super::{
    check_columns, prepare_rows, DatabaseError, Filter, InsertMode, Order, Query, SinkDatabase,
    Update,
};
use crate::schema::{
    migrations::{
        Migration, MigrationStore, CREATE_TABLES_MIGRATION, PUBLIC_KEY_REGISTRY_MIGRATION,
        TRANSACTION_TYPES_MIGRATION,
    },
    tables::{self, PKID, PUBLIC_KEY, TRANSACTION_TYPE, WALLET},
    ColumnSource, ColumnType, Row, SqlValue, Table,
};

type TableRows = BTreeMap<String, Row>;

#[derive(Debug, Clone, Default)]
struct Tables(HashMap<&'static str, TableRows>);

impl Tables {
    fn rows(&self, table: &Table) -> Option<&TableRows> {
        self.0.get(table.name)
    }

    fn rows_mut(&mut self, table: &'static Table) -> &mut TableRows {
        self.0.entry(table.name).or_default()
    }
}

#[derive(Debug, Default)]
struct State {
    committed: Tables,
    /// The working copy of the open transaction.
    working: Option<Tables>,
    savepoints: Vec<(String, Tables)>,
    ledger: Vec<String>,
    migration_locked: bool,
    registry: bool,
    scripts: Vec<String>,
    detached_scripts: Vec<String>,
    commit_hook_calls: usize,
    idle_connections: Option<u32>,
    failing_tables: HashSet<&'static str>,
}

impl State {
    fn visible(&self) -> &Tables {
        self.working.as_ref().unwrap_or(&self.committed)
    }

    fn visible_mut(&mut self) -> &mut Tables {
        self.working.as_mut().unwrap_or(&mut self.committed)
    }
}

#[derive(Debug, Default)]
struct Failures {
    begin: AtomicBool,
    commit: AtomicBool,
    savepoint: AtomicBool,
    /// Number of upcoming migration applications that fail.
    migrations: AtomicU32,
}

/// A [`SinkDatabase`] held in memory. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<State>>,
    failures: Arc<Failures>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    pub fn fail_begin(&self) {
        self.failures.begin.store(true, Ordering::SeqCst);
    }

    pub fn fail_commit(&self) {
        self.failures.commit.store(true, Ordering::SeqCst);
    }

    pub fn fail_savepoints(&self) {
        self.failures.savepoint.store(true, Ordering::SeqCst);
    }

    /// Makes every insert into `table` fail.
    pub fn fail_inserts_into(&self, table: &'static Table) {
        self.state().failing_tables.insert(table.name);
    }

    /// Makes the next `count` migration applications fail.
    pub fn fail_next_migrations(&self, count: u32) {
        self.failures.migrations.store(count, Ordering::SeqCst);
    }

    pub fn clear_failures(&self) {
        self.failures.begin.store(false, Ordering::SeqCst);
        self.failures.commit.store(false, Ordering::SeqCst);
        self.failures.savepoint.store(false, Ordering::SeqCst);
        self.failures.migrations.store(0, Ordering::SeqCst);
        self.state().failing_tables.clear();
    }

    /// The rows of `table` as seen by the current transaction, in key order.
    pub fn rows(&self, table: &'static Table) -> Vec<Row> {
        self.state()
            .visible()
            .rows(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &'static Table) -> usize {
        self.state().visible().rows(table).map_or(0, BTreeMap::len)
    }

    /// The committed rows of `table`, ignoring the open transaction.
    pub fn committed_rows(&self, table: &'static Table) -> Vec<Row> {
        self.state()
            .committed
            .rows(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// The value of `column` in every visible row of `table`, generated columns included.
    pub fn column(&self, table: &'static Table, column: &str) -> Vec<SqlValue> {
        self.rows(table)
            .iter()
            .map(|row| project(table, row, column))
            .collect()
    }

    /// The visible rows of `table` whose `column` equals `value`.
    pub fn find(&self, table: &'static Table, column: &str, value: impl Into<SqlValue>) -> Vec<Row> {
        let value = value.into();
        self.rows(table)
            .into_iter()
            .filter(|row| project(table, row, column) == value)
            .collect()
    }

    pub fn applied_migrations(&self) -> Vec<String> {
        self.state().ledger.clone()
    }

    pub fn is_migration_locked(&self) -> bool {
        self.state().migration_locked
    }

    pub fn is_registry_enabled(&self) -> bool {
        self.state().registry
    }

    pub fn scripts(&self) -> Vec<String> {
        self.state().scripts.clone()
    }

    pub fn detached_scripts(&self) -> Vec<String> {
        self.state().detached_scripts.clone()
    }

    pub fn commit_hook_calls(&self) -> usize {
        self.state().commit_hook_calls
    }

    pub fn idle_connections(&self) -> Option<u32> {
        self.state().idle_connections
    }

    pub fn savepoint_depth(&self) -> usize {
        self.state().savepoints.len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl SinkDatabase for MemoryDatabase {
    async fn begin(&self) -> Result<(), DatabaseError> {
        if self.failures.begin.load(Ordering::SeqCst) {
            return Err(DatabaseError::Injected("begin"));
        }
        let mut state = self.state();
        state.savepoints.clear();
        state.working = Some(state.committed.clone());
        Ok(())
    }

    async fn commit(&self) -> Result<(), DatabaseError> {
        let mut state = self.state();
        let working = state.working.take().ok_or(DatabaseError::NoOpenTransaction)?;
        state.savepoints.clear();
        if self.failures.commit.load(Ordering::SeqCst) {
            return Err(DatabaseError::Injected("commit"));
        }
        state.committed = working;
        state.commit_hook_calls += 1;
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DatabaseError> {
        let mut state = self.state();
        state.working = None;
        state.savepoints.clear();
        Ok(())
    }

    async fn in_transaction(&self) -> bool {
        self.state().working.is_some()
    }

    async fn savepoint(&self, name: &str) -> Result<(), DatabaseError> {
        if self.failures.savepoint.load(Ordering::SeqCst) {
            return Err(DatabaseError::Injected("savepoint"));
        }
        let mut state = self.state();
        let snapshot = state
            .working
            .clone()
            .ok_or(DatabaseError::NoOpenTransaction)?;
        state.savepoints.push((name.to_string(), snapshot));
        Ok(())
    }

    async fn release_savepoint(&self, name: &str) -> Result<(), DatabaseError> {
        let mut state = self.state();
        if state.working.is_none() {
            return Err(DatabaseError::NoOpenTransaction);
        }
        let position = savepoint_position(&state, name)?;
        state.savepoints.truncate(position);
        Ok(())
    }

    async fn rollback_to_savepoint(&self, name: &str) -> Result<(), DatabaseError> {
        let mut state = self.state();
        if state.working.is_none() {
            return Err(DatabaseError::NoOpenTransaction);
        }
        let position = savepoint_position(&state, name)?;
        // The savepoint survives a rollback to it.
        state.savepoints.truncate(position + 1);
        let snapshot = state.savepoints[position].1.clone();
        state.working = Some(snapshot);
        Ok(())
    }

    async fn insert_rows(
        &self,
        table: &'static Table,
        rows: Vec<Row>,
        mode: InsertMode,
    ) -> Result<u64, DatabaseError> {
        let rows = prepare_rows(table, rows)?;
        let mut state = self.state();
        if state.failing_tables.contains(table.name) {
            return Err(DatabaseError::Injected("insert"));
        }
        let registry = state.registry;
        let tables = state.visible_mut();
        let mut updated = tables.rows_mut(table).clone();
        let mut written = Vec::new();
        for row in rows {
            let row = coerce_row(table, row)?;
            let key = table.row_key(&row);
            let merged = match (updated.get(&key), mode) {
                (None, _) => row,
                (Some(_), InsertMode::Insert) => continue,
                (Some(existing), InsertMode::Upsert) => match merge(table, existing, row) {
                    Some(merged) => merged,
                    None => continue,
                },
            };
            check_unique(table, &updated, &key, &merged)?;
            updated.insert(key, merged.clone());
            written.push(merged);
        }
        *tables.rows_mut(table) = updated;
        if registry {
            for row in &written {
                register(tables, table, row);
            }
        }
        Ok(written.len() as u64)
    }

    async fn delete_rows(
        &self,
        table: &'static Table,
        filters: Vec<Filter>,
    ) -> Result<u64, DatabaseError> {
        let filters = coerce_filters(table, filters)?;
        let mut state = self.state();
        let rows = state.visible_mut().rows_mut(table);
        let before = rows.len();
        rows.retain(|_, row| !matches_all(table, row, &filters));
        Ok((before - rows.len()) as u64)
    }

    async fn select_rows(
        &self,
        table: &'static Table,
        query: Query,
    ) -> Result<Vec<Row>, DatabaseError> {
        check_columns(table, &query.columns)?;
        let filters = coerce_filters(table, query.filters)?;
        let state = self.state();
        let mut rows = state
            .visible()
            .rows(table)
            .map(|rows| {
                rows.values()
                    .filter(|row| matches_all(table, row, &filters))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        rows.sort_by(|left, right| {
            for (column, order) in &query.order_by {
                let ordering = compare_nulls_last(
                    &project(table, left, column),
                    &project(table, right, column),
                );
                let ordering = match order {
                    Order::Ascending => ordering,
                    Order::Descending => ordering.reverse(),
                };
                if ordering != CmpOrdering::Equal {
                    return ordering;
                }
            }
            CmpOrdering::Equal
        });
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows
            .iter()
            .map(|row| {
                Row(query
                    .columns
                    .iter()
                    .map(|column| project(table, row, column))
                    .collect())
            })
            .collect())
    }

    async fn update_rows(
        &self,
        table: &'static Table,
        update: Update,
    ) -> Result<u64, DatabaseError> {
        let names = update
            .key_columns
            .iter()
            .chain(&update.columns)
            .copied()
            .collect::<Vec<_>>();
        check_columns(table, &names)?;
        let mut indices = Vec::with_capacity(names.len());
        for name in &names {
            indices.push(table.row_index(name).ok_or_else(|| {
                DatabaseError::UnknownColumn {
                    table: table.name,
                    column: name.to_string(),
                }
            })?);
        }
        let mut state = self.state();
        let registry = state.registry;
        let tables = state.visible_mut();
        let mut updated = tables.rows_mut(table).clone();
        let mut written = Vec::new();
        for values in update.rows {
            if values.len() != names.len() {
                return Err(DatabaseError::RowShape {
                    table: table.name,
                    expected: names.len(),
                    actual: values.len(),
                });
            }
            let mut coerced = Vec::with_capacity(values.len());
            for (name, value) in names.iter().zip(values) {
                coerced.push(coerce(table, name, value)?);
            }
            let (keys, assignments) = coerced.split_at(update.key_columns.len());
            for row in updated.values_mut() {
                let matches = indices
                    .iter()
                    .zip(keys)
                    .all(|(index, key)| !key.is_null() && row.0[*index] == *key);
                if !matches {
                    continue;
                }
                for (index, value) in indices[keys.len()..].iter().zip(assignments) {
                    row.0[*index] = value.clone();
                }
                written.push(row.clone());
            }
        }
        *tables.rows_mut(table) = updated;
        if registry {
            for row in &written {
                register(tables, table, row);
            }
        }
        Ok(written.len() as u64)
    }

    async fn execute_script(&self, sql: &str) -> Result<(), DatabaseError> {
        self.state().scripts.push(sql.to_string());
        Ok(())
    }

    async fn execute_detached(&self, sql: &str) -> Result<(), DatabaseError> {
        self.state().detached_scripts.push(sql.to_string());
        Ok(())
    }

    async fn reduce_idle_connections(&self, idle: u32) -> Result<(), DatabaseError> {
        self.state().idle_connections = Some(idle);
        Ok(())
    }

    async fn migration_store(&self) -> Result<Box<dyn MigrationStore>, DatabaseError> {
        Ok(Box::new(MemoryMigrationStore {
            state: self.state.clone(),
            failures: self.failures.clone(),
        }))
    }
}

fn savepoint_position(state: &State, name: &str) -> Result<usize, DatabaseError> {
    state
        .savepoints
        .iter()
        .rposition(|(savepoint, _)| savepoint == name)
        .ok_or_else(|| DatabaseError::UnknownSavepoint(name.to_string()))
}

fn violation(table: &'static Table, message: String) -> DatabaseError {
    DatabaseError::ConstraintViolation {
        table: table.name,
        message,
    }
}

/// Converts `value` to the representation of the column type, as the store would.
fn coerce(table: &'static Table, name: &str, value: SqlValue) -> Result<SqlValue, DatabaseError> {
    let column = table.column(name).ok_or_else(|| DatabaseError::UnknownColumn {
        table: table.name,
        column: name.to_string(),
    })?;
    if value.is_null() {
        return Ok(value);
    }
    let mismatch = |value: &SqlValue| {
        violation(
            table,
            format!("{name}: cannot store {value:?} as {}", column.ty.sql_type()),
        )
    };
    let coerced = match column.ty {
        ColumnType::SmallInt => {
            let number = value.as_i64().ok_or_else(|| mismatch(&value))?;
            SqlValue::SmallInt(i16::try_from(number).map_err(|_| mismatch(&value))?)
        }
        ColumnType::Int => {
            let number = value.as_i64().ok_or_else(|| mismatch(&value))?;
            SqlValue::Int(i32::try_from(number).map_err(|_| mismatch(&value))?)
        }
        ColumnType::BigInt => SqlValue::BigInt(value.as_i64().ok_or_else(|| mismatch(&value))?),
        ColumnType::Numeric => match value {
            SqlValue::Numeric(_) => value,
            SqlValue::SmallInt(_) | SqlValue::Int(_) | SqlValue::BigInt(_) => {
                SqlValue::Numeric(value.as_i64().unwrap_or_default().to_string())
            }
            _ => return Err(mismatch(&value)),
        },
        ColumnType::Bool => match value {
            SqlValue::Bool(_) => value,
            _ => return Err(mismatch(&value)),
        },
        ColumnType::Text | ColumnType::PublicKey => match value {
            SqlValue::Text(_) => value,
            _ => return Err(mismatch(&value)),
        },
        ColumnType::TextArray => match value {
            SqlValue::TextArray(_) => value,
            _ => return Err(mismatch(&value)),
        },
        ColumnType::Bytes => match value {
            SqlValue::Bytes(_) => value,
            _ => return Err(mismatch(&value)),
        },
        ColumnType::Json => match value {
            SqlValue::Json(_) => value,
            _ => return Err(mismatch(&value)),
        },
        ColumnType::Timestamp => match value {
            SqlValue::Timestamp(_) => value,
            _ => return Err(mismatch(&value)),
        },
    };
    Ok(coerced)
}

fn coerce_row(table: &'static Table, row: Row) -> Result<Row, DatabaseError> {
    let columns = table.insert_columns().collect::<Vec<_>>();
    let mut values = Vec::with_capacity(columns.len());
    for (column, value) in columns.into_iter().zip(row.into_values()) {
        if value.is_null() && !column.nullable {
            return Err(violation(
                table,
                format!("null value in column {}", column.name),
            ));
        }
        values.push(coerce(table, column.name, value)?);
    }
    Ok(Row(values))
}

fn coerce_filters(table: &'static Table, filters: Vec<Filter>) -> Result<Vec<Filter>, DatabaseError> {
    filters
        .into_iter()
        .map(|filter| {
            Ok(match filter {
                Filter::Eq(column, value) => Filter::Eq(column, coerce(table, column, value)?),
                Filter::Le(column, value) => Filter::Le(column, coerce(table, column, value)?),
                Filter::In(column, values) => Filter::In(
                    column,
                    values
                        .into_iter()
                        .map(|value| coerce(table, column, value))
                        .collect::<Result<_, _>>()?,
                ),
                Filter::NotIn(column, values) => Filter::NotIn(
                    column,
                    values
                        .into_iter()
                        .map(|value| coerce(table, column, value))
                        .collect::<Result<_, _>>()?,
                ),
                Filter::IsNull(column) => Filter::IsNull(column),
            })
        })
        .collect()
}

/// The upsert of `incoming` over `existing`, or `None` if nothing may be updated.
fn merge(table: &Table, existing: &Row, incoming: Row) -> Option<Row> {
    if table.update_columns().next().is_none() {
        return None;
    }
    let values = table
        .insert_columns()
        .zip(existing.values().iter().zip(incoming.into_values()))
        .map(|(column, (old, new))| {
            if new.is_null() && table.coalesce_on_conflict.contains(&column.name) {
                old.clone()
            } else {
                new
            }
        })
        .collect();
    Some(Row(values))
}

fn check_unique(
    table: &'static Table,
    rows: &TableRows,
    key: &str,
    row: &Row,
) -> Result<(), DatabaseError> {
    for column in table.unique {
        let Some(index) = table.row_index(column) else {
            continue;
        };
        let value = &row.0[index];
        if value.is_null() {
            continue;
        }
        let duplicate = rows
            .iter()
            .any(|(other_key, other)| other_key != key && other.0[index] == *value);
        if duplicate {
            return Err(violation(
                table,
                format!("duplicate value {value:?} for unique column {column}"),
            ));
        }
    }
    Ok(())
}

/// The value of `column` in `row`, evaluating generated and default columns.
fn project(table: &Table, row: &Row, column: &str) -> SqlValue {
    if let Some(index) = table.row_index(column) {
        return row.0[index].clone();
    }
    match table.column(column).map(|column| column.source) {
        Some(ColumnSource::Generated(expression)) => evaluate(table, row, expression),
        Some(ColumnSource::Default("true")) => SqlValue::Bool(true),
        Some(ColumnSource::Default("false")) => SqlValue::Bool(false),
        _ => SqlValue::Null,
    }
}

/// Evaluates the `hex_to_numeric(<column>)` expressions of generated columns.
fn evaluate(table: &Table, row: &Row, expression: &str) -> SqlValue {
    let Some(argument) = expression
        .strip_prefix("hex_to_numeric(")
        .and_then(|rest| rest.strip_suffix(')'))
    else {
        return SqlValue::Null;
    };
    let Some(text) = table
        .row_index(argument)
        .and_then(|index| row.0[index].as_text().map(str::to_string))
    else {
        return SqlValue::Null;
    };
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(&text);
    if digits.is_empty() {
        return SqlValue::Numeric("0".to_string());
    }
    Uint256::from_str(&format!("0x{}", digits.to_ascii_lowercase()))
        .map_or(SqlValue::Null, |value| SqlValue::from(&value))
}

fn matches_all(table: &Table, row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| {
        let value = project(table, row, filter.column());
        match filter {
            Filter::Eq(_, expected) => !value.is_null() && value == *expected,
            Filter::Le(_, bound) => {
                compare(&value, bound).is_some_and(|ordering| ordering != CmpOrdering::Greater)
            }
            Filter::In(_, values) => !value.is_null() && values.contains(&value),
            Filter::NotIn(_, values) => {
                !value.is_null() && !values.iter().any(|other| *other == value)
            }
            Filter::IsNull(_) => value.is_null(),
        }
    })
}

fn compare(left: &SqlValue, right: &SqlValue) -> Option<CmpOrdering> {
    match (left, right) {
        (SqlValue::Numeric(left), SqlValue::Numeric(right)) => {
            match (left.parse::<i128>(), right.parse::<i128>()) {
                (Ok(left), Ok(right)) => Some(left.cmp(&right)),
                _ => Some(left.len().cmp(&right.len()).then_with(|| left.cmp(right))),
            }
        }
        (SqlValue::Text(left), SqlValue::Text(right)) => Some(left.cmp(right)),
        (SqlValue::Timestamp(left), SqlValue::Timestamp(right)) => Some(left.cmp(right)),
        (SqlValue::Bool(left), SqlValue::Bool(right)) => Some(left.cmp(right)),
        (SqlValue::Bytes(left), SqlValue::Bytes(right)) => Some(left.cmp(right)),
        _ => Some(left.as_i64()?.cmp(&right.as_i64()?)),
    }
}

/// Orders NULL after every value, as PostgreSQL does for ascending orders.
fn compare_nulls_last(left: &SqlValue, right: &SqlValue) -> CmpOrdering {
    match (left.is_null(), right.is_null()) {
        (true, true) => CmpOrdering::Equal,
        (true, false) => CmpOrdering::Greater,
        (false, true) => CmpOrdering::Less,
        (false, false) => compare(left, right).unwrap_or(CmpOrdering::Equal),
    }
}

/// Emulates the registry triggers for one written row of `table`.
fn register(tables: &mut Tables, table: &'static Table, row: &Row) {
    let mut keys = Vec::new();
    for column in table.public_key_columns() {
        if let Some(key) = table
            .row_index(column.name)
            .and_then(|index| row.0[index].as_text())
            .filter(|key| !key.is_empty())
        {
            keys.push(key.to_string());
        }
    }
    for key in keys {
        register_public_key(tables, &key);
    }
    if table == &PKID {
        let value = |column| {
            PKID.row_index(column)
                .and_then(|index| row.0[index].as_text().map(str::to_string))
        };
        if let (Some(public_key), Some(pkid)) = (value("public_key"), value("pkid")) {
            let wallet = Row(vec![SqlValue::Text(public_key), SqlValue::Text(pkid)]);
            tables.rows_mut(&WALLET).insert(WALLET.row_key(&wallet), wallet);
        }
    }
}

fn register_public_key(tables: &mut Tables, key: &str) {
    let public_key = Row(vec![SqlValue::from(key)]);
    tables
        .rows_mut(&PUBLIC_KEY)
        .entry(PUBLIC_KEY.row_key(&public_key))
        .or_insert(public_key);
    let wallet = Row(vec![SqlValue::from(key), SqlValue::from(key)]);
    tables
        .rows_mut(&WALLET)
        .entry(WALLET.row_key(&wallet))
        .or_insert(wallet);
}

/// Rows written before the registry existed are registered when it is created.
fn backfill_registry(tables: &mut Tables) {
    for table in tables::ALL {
        if table.public_key_columns().next().is_none() && *table != &PKID {
            continue;
        }
        let rows = tables
            .rows(table)
            .map(|rows| rows.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        for row in rows {
            register(tables, table, &row);
        }
    }
}

fn seed_transaction_types(tables: &mut Tables) {
    let rows = tables.rows_mut(&TRANSACTION_TYPE);
    for txn_type in TxnType::ALL {
        let row = Row(vec![
            SqlValue::from(txn_type.as_u8()),
            SqlValue::from(txn_type.name()),
        ]);
        rows.entry(TRANSACTION_TYPE.row_key(&row)).or_insert(row);
    }
}

/// Applies the effect of a migration on the emulated schema.
fn migrate(state: &mut State, name: &str, up: bool) {
    let mut targets = vec![&mut state.committed];
    if let Some(working) = state.working.as_mut() {
        targets.push(working);
    }
    for tables in targets {
        match (name, up) {
            (CREATE_TABLES_MIGRATION, false) => tables.0.clear(),
            (TRANSACTION_TYPES_MIGRATION, true) => seed_transaction_types(tables),
            (TRANSACTION_TYPES_MIGRATION, false) => {
                tables.rows_mut(&TRANSACTION_TYPE).clear();
            }
            (PUBLIC_KEY_REGISTRY_MIGRATION, true) => backfill_registry(tables),
            _ => (),
        }
    }
    if name == PUBLIC_KEY_REGISTRY_MIGRATION {
        state.registry = up;
    }
}

struct MemoryMigrationStore {
    state: Arc<Mutex<State>>,
    failures: Arc<Failures>,
}

#[async_trait]
impl MigrationStore for MemoryMigrationStore {
    async fn lock(&mut self) -> Result<(), DatabaseError> {
        lock(&self.state).migration_locked = true;
        Ok(())
    }

    async fn unlock(&mut self) -> Result<(), DatabaseError> {
        lock(&self.state).migration_locked = false;
        Ok(())
    }

    async fn applied(&mut self) -> Result<Vec<String>, DatabaseError> {
        Ok(lock(&self.state).ledger.clone())
    }

    async fn apply(&mut self, migration: &Migration) -> Result<(), DatabaseError> {
        let failing = self
            .failures
            .migrations
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                count.checked_sub(1)
            })
            .is_ok();
        if failing {
            return Err(DatabaseError::Injected("migration"));
        }
        let mut state = lock(&self.state);
        migrate(&mut state, migration.name, true);
        state.ledger.push(migration.name.to_string());
        Ok(())
    }

    async fn revert(&mut self, migration: &Migration) -> Result<(), DatabaseError> {
        let mut state = lock(&self.state);
        migrate(&mut state, migration.name, false);
        state.ledger.retain(|name| name != migration.name);
        Ok(())
    }
}
