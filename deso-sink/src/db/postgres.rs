// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The PostgreSQL store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{
    pool::PoolConnection,
    postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow},
    Executor, Postgres, QueryBuilder, Row as _, Transaction,
};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::{
    check_columns, chunk_size, prepare_rows, DatabaseError, Filter, InsertMode, Order, Query,
    SinkDatabase, Update, MAX_BIND_PARAMETERS,
};
use crate::schema::{
    ident_list,
    migrations::{Migration, MigrationStore, ADVISORY_LOCK_KEY, LEDGER_TABLE},
    quote_ident, ColumnType, Row, SqlValue, Table,
};

/// Calls the `on_commit` procedure if a deployment defined one.
const ON_COMMIT_SQL: &str = "DO $$ BEGIN \
     IF EXISTS (SELECT 1 FROM pg_proc WHERE proname = 'on_commit') THEN CALL on_commit(); END IF; \
     END $$;";

/// How long surplus connections stay open after the idle limit was lowered.
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// A [`SinkDatabase`] backed by a PostgreSQL connection pool.
pub struct PostgresDatabase {
    options: PgConnectOptions,
    max_connections: u32,
    pool: RwLock<PgPool>,
    transaction: Mutex<Option<Transaction<'static, Postgres>>>,
}

impl PostgresDatabase {
    /// Connects a pool of at most `max_connections` connections.
    pub async fn connect(
        options: PgConnectOptions,
        max_connections: u32,
    ) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options.clone())
            .await?;
        Ok(Self {
            options,
            max_connections,
            pool: RwLock::new(pool),
            transaction: Mutex::new(None),
        })
    }

    async fn pool(&self) -> PgPool {
        self.pool.read().await.clone()
    }

    /// Runs a built statement in the open transaction, or on the pool.
    async fn execute(&self, mut builder: QueryBuilder<'_, Postgres>) -> Result<u64, DatabaseError> {
        let query = builder.build();
        let mut transaction = self.transaction.lock().await;
        let result = match transaction.as_mut() {
            Some(transaction) => query.execute(&mut **transaction).await?,
            None => query.execute(&self.pool().await).await?,
        };
        Ok(result.rows_affected())
    }

    async fn fetch_all(
        &self,
        mut builder: QueryBuilder<'_, Postgres>,
    ) -> Result<Vec<PgRow>, DatabaseError> {
        let query = builder.build();
        let mut transaction = self.transaction.lock().await;
        let rows = match transaction.as_mut() {
            Some(transaction) => query.fetch_all(&mut **transaction).await?,
            None => query.fetch_all(&self.pool().await).await?,
        };
        Ok(rows)
    }

    async fn execute_in_transaction(&self, sql: &str) -> Result<(), DatabaseError> {
        let mut transaction = self.transaction.lock().await;
        let transaction = transaction
            .as_mut()
            .ok_or(DatabaseError::NoOpenTransaction)?;
        Executor::execute(&mut **transaction, sql).await?;
        Ok(())
    }
}

#[async_trait]
impl SinkDatabase for PostgresDatabase {
    async fn begin(&self) -> Result<(), DatabaseError> {
        let mut transaction = self.transaction.lock().await;
        if let Some(open) = transaction.take() {
            open.rollback().await?;
        }
        *transaction = Some(self.pool().await.begin().await?);
        Ok(())
    }

    async fn commit(&self) -> Result<(), DatabaseError> {
        let open = self
            .transaction
            .lock()
            .await
            .take()
            .ok_or(DatabaseError::NoOpenTransaction)?;
        open.commit().await?;
        let pool = self.pool().await;
        Executor::execute(&pool, ON_COMMIT_SQL).await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DatabaseError> {
        if let Some(open) = self.transaction.lock().await.take() {
            open.rollback().await?;
        }
        Ok(())
    }

    async fn in_transaction(&self) -> bool {
        self.transaction.lock().await.is_some()
    }

    async fn savepoint(&self, name: &str) -> Result<(), DatabaseError> {
        self.execute_in_transaction(&format!("SAVEPOINT {}", quote_ident(name)))
            .await
    }

    async fn release_savepoint(&self, name: &str) -> Result<(), DatabaseError> {
        self.execute_in_transaction(&format!("RELEASE SAVEPOINT {}", quote_ident(name)))
            .await
    }

    async fn rollback_to_savepoint(&self, name: &str) -> Result<(), DatabaseError> {
        self.execute_in_transaction(&format!("ROLLBACK TO SAVEPOINT {}", quote_ident(name)))
            .await
    }

    async fn insert_rows(
        &self,
        table: &'static Table,
        rows: Vec<Row>,
        mode: InsertMode,
    ) -> Result<u64, DatabaseError> {
        let rows = prepare_rows(table, rows)?;
        if rows.is_empty() {
            return Ok(0);
        }
        let types = table
            .insert_columns()
            .map(|column| column.ty)
            .collect::<Vec<_>>();
        let conflict = conflict_clause(table, mode);
        let mut written = 0;
        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            let chunk = rows
                .by_ref()
                .take(chunk_size(types.len()))
                .collect::<Vec<_>>();
            let mut builder = QueryBuilder::new(format!(
                "INSERT INTO {} ({}) VALUES ",
                quote_ident(table.name),
                ident_list(&insert_column_names(table)),
            ));
            for (index, row) in chunk.into_iter().enumerate() {
                if index > 0 {
                    builder.push(", ");
                }
                push_tuple(&mut builder, row.into_values(), &types);
            }
            builder.push(&conflict);
            written += self.execute(builder).await?;
        }
        debug!(table = table.name, rows = written, "inserted rows");
        Ok(written)
    }

    async fn delete_rows(
        &self,
        table: &'static Table,
        filters: Vec<Filter>,
    ) -> Result<u64, DatabaseError> {
        let mut deleted = 0;
        for filters in split_filters(filters) {
            let mut builder =
                QueryBuilder::new(format!("DELETE FROM {}", quote_ident(table.name)));
            push_where(&mut builder, table, filters)?;
            deleted += self.execute(builder).await?;
        }
        Ok(deleted)
    }

    async fn select_rows(
        &self,
        table: &'static Table,
        query: Query,
    ) -> Result<Vec<Row>, DatabaseError> {
        check_columns(table, &query.columns)?;
        let types = query
            .columns
            .iter()
            .map(|name| column_type(table, name))
            .collect::<Result<Vec<_>, _>>()?;
        let selection = query
            .columns
            .iter()
            .zip(&types)
            .map(|(name, ty)| match ty {
                ColumnType::Numeric => format!("{}::text", quote_ident(name)),
                _ => quote_ident(name),
            })
            .collect::<Vec<_>>()
            .join(", ");
        let batches = if query.order_by.is_empty() && query.limit.is_none() {
            split_filters(query.filters)
        } else {
            vec![query.filters]
        };
        let mut rows = Vec::new();
        for filters in batches {
            let mut builder = QueryBuilder::new(format!(
                "SELECT {selection} FROM {}",
                quote_ident(table.name)
            ));
            push_where(&mut builder, table, filters)?;
            for (index, (column, order)) in query.order_by.iter().enumerate() {
                builder.push(if index == 0 { " ORDER BY " } else { ", " });
                builder.push(quote_ident(column));
                builder.push(match order {
                    Order::Ascending => " ASC",
                    Order::Descending => " DESC",
                });
            }
            if let Some(limit) = query.limit {
                builder.push(format!(" LIMIT {limit}"));
            }
            for row in self.fetch_all(builder).await? {
                rows.push(decode_row(&row, &types)?);
            }
        }
        Ok(rows)
    }

    async fn update_rows(
        &self,
        table: &'static Table,
        update: Update,
    ) -> Result<u64, DatabaseError> {
        if update.rows.is_empty() {
            return Ok(0);
        }
        let names = update
            .key_columns
            .iter()
            .chain(&update.columns)
            .copied()
            .collect::<Vec<_>>();
        check_columns(table, &names)?;
        let types = names
            .iter()
            .map(|name| column_type(table, name))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(row) = update.rows.iter().find(|row| row.len() != names.len()) {
            return Err(DatabaseError::RowShape {
                table: table.name,
                expected: names.len(),
                actual: row.len(),
            });
        }
        let assignments = update
            .columns
            .iter()
            .map(|name| format!("{0} = source.{0}", quote_ident(name)))
            .collect::<Vec<_>>()
            .join(", ");
        let join = update
            .key_columns
            .iter()
            .map(|name| format!("target.{0} = source.{0}", quote_ident(name)))
            .collect::<Vec<_>>()
            .join(" AND ");
        let mut updated = 0;
        let mut rows = update.rows.into_iter().peekable();
        while rows.peek().is_some() {
            let chunk = rows
                .by_ref()
                .take(chunk_size(names.len()))
                .collect::<Vec<_>>();
            let mut builder = QueryBuilder::new(format!(
                "UPDATE {} AS target SET {assignments} FROM (VALUES ",
                quote_ident(table.name)
            ));
            for (index, row) in chunk.into_iter().enumerate() {
                if index > 0 {
                    builder.push(", ");
                }
                push_tuple(&mut builder, row, &types);
            }
            builder.push(format!(
                ") AS source ({}) WHERE {join}",
                ident_list(&names)
            ));
            updated += self.execute(builder).await?;
        }
        Ok(updated)
    }

    async fn execute_script(&self, sql: &str) -> Result<(), DatabaseError> {
        let mut transaction = self.transaction.lock().await;
        match transaction.as_mut() {
            Some(transaction) => Executor::execute(&mut **transaction, sql).await?,
            None => {
                let pool = self.pool().await;
                Executor::execute(&pool, sql).await?
            }
        };
        Ok(())
    }

    async fn execute_detached(&self, sql: &str) -> Result<(), DatabaseError> {
        let pool = self.pool().await;
        Executor::execute(&pool, sql).await?;
        Ok(())
    }

    async fn reduce_idle_connections(&self, idle: u32) -> Result<(), DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(idle.min(self.max_connections))
            .idle_timeout(IDLE_TIMEOUT)
            .connect_lazy_with(self.options.clone());
        // Connections of the previous pool, including the one of an open transaction,
        // are closed as they are released.
        *self.pool.write().await = pool;
        debug!(idle, "lowered the idle connection limit");
        Ok(())
    }

    async fn migration_store(&self) -> Result<Box<dyn MigrationStore>, DatabaseError> {
        let connection = self.pool().await.acquire().await?;
        Ok(Box::new(PgMigrationStore { connection }))
    }
}

fn insert_column_names(table: &Table) -> Vec<&'static str> {
    table.insert_columns().map(|column| column.name).collect()
}

fn column_type(table: &'static Table, name: &str) -> Result<ColumnType, DatabaseError> {
    table
        .column(name)
        .map(|column| column.ty)
        .ok_or_else(|| DatabaseError::UnknownColumn {
            table: table.name,
            column: name.to_string(),
        })
}

fn conflict_clause(table: &Table, mode: InsertMode) -> String {
    let target = ident_list(table.primary_key);
    let updates = table
        .update_columns()
        .map(|column| {
            let name = quote_ident(column.name);
            if table.coalesce_on_conflict.contains(&column.name) {
                format!(
                    "{name} = COALESCE(EXCLUDED.{name}, {}.{name})",
                    quote_ident(table.name)
                )
            } else {
                format!("{name} = EXCLUDED.{name}")
            }
        })
        .collect::<Vec<_>>();
    match mode {
        InsertMode::Upsert if !updates.is_empty() => format!(
            " ON CONFLICT ({target}) DO UPDATE SET {}",
            updates.join(", ")
        ),
        _ => format!(" ON CONFLICT ({target}) DO NOTHING"),
    }
}

/// Pushes `(v1, v2, ...)`, casting every parameter to its column type.
fn push_tuple(builder: &mut QueryBuilder<'_, Postgres>, values: Vec<SqlValue>, types: &[ColumnType]) {
    builder.push("(");
    for (index, (value, ty)) in values.into_iter().zip(types).enumerate() {
        if index > 0 {
            builder.push(", ");
        }
        push_value(builder, value, *ty);
    }
    builder.push(")");
}

fn push_value(builder: &mut QueryBuilder<'_, Postgres>, value: SqlValue, ty: ColumnType) {
    match value {
        SqlValue::Null => push_null(builder, ty),
        SqlValue::Bool(value) => {
            builder.push_bind(value);
        }
        SqlValue::SmallInt(value) => {
            builder.push_bind(value);
        }
        SqlValue::Int(value) => {
            builder.push_bind(value);
        }
        SqlValue::BigInt(value) => {
            builder.push_bind(value);
        }
        SqlValue::Numeric(value) | SqlValue::Text(value) => {
            builder.push_bind(value);
        }
        SqlValue::TextArray(value) => {
            builder.push_bind(value);
        }
        SqlValue::Bytes(value) => {
            builder.push_bind(value);
        }
        SqlValue::Json(value) => {
            builder.push_bind(value);
        }
        SqlValue::Timestamp(value) => {
            builder.push_bind(value);
        }
    }
    builder.push("::");
    builder.push(ty.cast_name());
}

fn push_null(builder: &mut QueryBuilder<'_, Postgres>, ty: ColumnType) {
    match ty {
        ColumnType::Bool => builder.push_bind(None::<bool>),
        ColumnType::SmallInt => builder.push_bind(None::<i16>),
        ColumnType::Int => builder.push_bind(None::<i32>),
        ColumnType::BigInt => builder.push_bind(None::<i64>),
        ColumnType::Numeric | ColumnType::Text | ColumnType::PublicKey => {
            builder.push_bind(None::<String>)
        }
        ColumnType::TextArray => builder.push_bind(None::<Vec<String>>),
        ColumnType::Bytes => builder.push_bind(None::<Vec<u8>>),
        ColumnType::Json => builder.push_bind(None::<serde_json::Value>),
        ColumnType::Timestamp => builder.push_bind(None::<NaiveDateTime>),
    };
}

fn push_where(
    builder: &mut QueryBuilder<'_, Postgres>,
    table: &'static Table,
    filters: Vec<Filter>,
) -> Result<(), DatabaseError> {
    for (index, filter) in filters.into_iter().enumerate() {
        builder.push(if index == 0 { " WHERE " } else { " AND " });
        let ty = column_type(table, filter.column())?;
        let column = quote_ident(filter.column());
        match filter {
            Filter::Eq(_, value) => {
                builder.push(format!("{column} = "));
                push_value(builder, value, ty);
            }
            Filter::Le(_, value) => {
                builder.push(format!("{column} <= "));
                push_value(builder, value, ty);
            }
            Filter::In(_, values) => push_list(builder, &column, "IN", values, ty),
            Filter::NotIn(_, values) => push_list(builder, &column, "NOT IN", values, ty),
            Filter::IsNull(_) => {
                builder.push(format!("{column} IS NULL"));
            }
        }
    }
    Ok(())
}

fn push_list(
    builder: &mut QueryBuilder<'_, Postgres>,
    column: &str,
    operator: &str,
    values: Vec<SqlValue>,
    ty: ColumnType,
) {
    if values.is_empty() {
        builder.push(if operator == "IN" { "FALSE" } else { "TRUE" });
        return;
    }
    builder.push(format!("{column} {operator} ("));
    for (index, value) in values.into_iter().enumerate() {
        if index > 0 {
            builder.push(", ");
        }
        push_value(builder, value, ty);
    }
    builder.push(")");
}

/// Splits the first oversized `IN` list so that every statement stays within the
/// parameter limit. Other filters are repeated in each statement.
fn split_filters(filters: Vec<Filter>) -> Vec<Vec<Filter>> {
    let budget = MAX_BIND_PARAMETERS - filters.len();
    let position = filters
        .iter()
        .position(|filter| matches!(filter, Filter::In(_, values) if values.len() > budget));
    let Some(position) = position else {
        return vec![filters];
    };
    let mut rest = filters;
    let Filter::In(column, values) = rest.remove(position) else {
        return vec![rest];
    };
    values
        .chunks(budget)
        .map(|chunk| {
            let mut filters = rest.clone();
            filters.insert(position, Filter::In(column, chunk.to_vec()));
            filters
        })
        .collect()
}

fn decode_row(row: &PgRow, types: &[ColumnType]) -> Result<Row, DatabaseError> {
    let mut values = Vec::with_capacity(types.len());
    for (index, ty) in types.iter().enumerate() {
        let value = match ty {
            ColumnType::Bool => SqlValue::optional(row.try_get::<Option<bool>, _>(index)?),
            ColumnType::SmallInt => row
                .try_get::<Option<i16>, _>(index)?
                .map_or(SqlValue::Null, SqlValue::SmallInt),
            ColumnType::Int => row
                .try_get::<Option<i32>, _>(index)?
                .map_or(SqlValue::Null, SqlValue::Int),
            ColumnType::BigInt => SqlValue::optional(row.try_get::<Option<i64>, _>(index)?),
            ColumnType::Numeric => row
                .try_get::<Option<String>, _>(index)?
                .map_or(SqlValue::Null, SqlValue::Numeric),
            ColumnType::Text | ColumnType::PublicKey => {
                SqlValue::optional(row.try_get::<Option<String>, _>(index)?)
            }
            ColumnType::TextArray => {
                SqlValue::optional(row.try_get::<Option<Vec<String>>, _>(index)?)
            }
            ColumnType::Bytes => SqlValue::optional(row.try_get::<Option<Vec<u8>>, _>(index)?),
            ColumnType::Json => {
                SqlValue::optional(row.try_get::<Option<serde_json::Value>, _>(index)?)
            }
            ColumnType::Timestamp => row
                .try_get::<Option<NaiveDateTime>, _>(index)?
                .map_or(SqlValue::Null, SqlValue::Timestamp),
        };
        values.push(value);
    }
    Ok(Row(values))
}

/// Runs migrations on a dedicated connection, which holds the advisory lock.
struct PgMigrationStore {
    connection: PoolConnection<Postgres>,
}

#[async_trait]
impl MigrationStore for PgMigrationStore {
    async fn lock(&mut self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(ADVISORY_LOCK_KEY)
            .execute(&mut *self.connection)
            .await?;
        Ok(())
    }

    async fn unlock(&mut self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(ADVISORY_LOCK_KEY)
            .execute(&mut *self.connection)
            .await?;
        Ok(())
    }

    async fn applied(&mut self) -> Result<Vec<String>, DatabaseError> {
        let ledger = quote_ident(LEDGER_TABLE);
        let create = format!(
            "CREATE TABLE IF NOT EXISTS {ledger} (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT now()
            );"
        );
        Executor::execute(&mut *self.connection, create.as_str()).await?;
        let select = format!("SELECT name FROM {ledger} ORDER BY id");
        let rows = sqlx::query(&select)
            .fetch_all(&mut *self.connection)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(DatabaseError::from))
            .collect()
    }

    async fn apply(&mut self, migration: &Migration) -> Result<(), DatabaseError> {
        let mut transaction = sqlx::Connection::begin(&mut *self.connection).await?;
        Executor::execute(&mut *transaction, migration.up.as_str()).await?;
        let record = format!(
            "INSERT INTO {} (name) VALUES ($1)",
            quote_ident(LEDGER_TABLE)
        );
        sqlx::query(&record)
            .bind(migration.name)
            .execute(&mut *transaction)
            .await?;
        transaction.commit().await?;
        Ok(())
    }

    async fn revert(&mut self, migration: &Migration) -> Result<(), DatabaseError> {
        let mut transaction = sqlx::Connection::begin(&mut *self.connection).await?;
        Executor::execute(&mut *transaction, migration.down.as_str()).await?;
        let forget = format!("DELETE FROM {} WHERE name = $1", quote_ident(LEDGER_TABLE));
        sqlx::query(&forget)
            .bind(migration.name)
            .execute(&mut *transaction)
            .await?;
        transaction.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables::{BLOCK, FOLLOW, TRANSACTION};

    #[test]
    fn test_conflict_clauses() {
        assert_eq!(
            conflict_clause(&FOLLOW, InsertMode::Insert),
            " ON CONFLICT (\"natural_key\") DO NOTHING"
        );
        let upsert = conflict_clause(&BLOCK, InsertMode::Upsert);
        assert!(upsert.starts_with(" ON CONFLICT (\"block_hash\") DO UPDATE SET "));
        assert!(upsert.contains("\"height\" = EXCLUDED.\"height\""));
        assert!(!upsert.contains("\"block_hash\" = EXCLUDED"));
        let upsert = conflict_clause(&TRANSACTION, InsertMode::Upsert);
        assert!(upsert.contains(
            "\"tx_index_metadata\" = COALESCE(EXCLUDED.\"tx_index_metadata\", \
             \"transaction_partitioned\".\"tx_index_metadata\")"
        ));
    }

    #[test]
    fn test_split_filters_chunks_large_lists() {
        let keys = (0..100_000i64).map(SqlValue::BigInt).collect::<Vec<_>>();
        let batches = split_filters(vec![
            Filter::Eq("block_hash", SqlValue::from("b")),
            Filter::In("height", keys),
        ]);
        assert_eq!(batches.len(), 2);
        for filters in &batches {
            assert_eq!(filters.len(), 2);
            assert_eq!(filters[0], Filter::Eq("block_hash", SqlValue::from("b")));
        }
        let total = batches
            .iter()
            .map(|filters| match &filters[1] {
                Filter::In(_, values) => values.len(),
                _ => 0,
            })
            .sum::<usize>();
        assert_eq!(total, 100_000);
    }

    #[test]
    fn test_statements_cast_every_parameter() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        push_tuple(
            &mut builder,
            vec![SqlValue::Null, SqlValue::Numeric("7".to_string())],
            &[ColumnType::Json, ColumnType::Numeric],
        );
        assert_eq!(builder.sql(), "SELECT ($1::jsonb, $2::numeric)");
    }
}
