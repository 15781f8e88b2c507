// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The materialized relational schema.
//!
//! Every destination table is described once, as a static [`Table`]. Adapters emit
//! positional [`Row`]s against the insertable columns of a table, and the store
//! backends derive their statements (and the DDL) from the same description.

pub mod migrations;
pub mod tables;

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDateTime, Utc};
use deso_base::data_types::Uint256;

/// The SQL type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Bool,
    SmallInt,
    Int,
    BigInt,
    /// Arbitrary precision, wide enough for 256-bit integers.
    Numeric,
    Text,
    /// A base58-check public key. Tables with such columns feed the public-key registry.
    PublicKey,
    TextArray,
    Bytes,
    Json,
    Timestamp,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Bool => "BOOLEAN",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Int => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Numeric => "NUMERIC(78, 0)",
            ColumnType::Text => "TEXT",
            ColumnType::PublicKey => "VARCHAR",
            ColumnType::TextArray => "TEXT[]",
            ColumnType::Bytes => "BYTEA",
            ColumnType::Json => "JSONB",
            ColumnType::Timestamp => "TIMESTAMP",
        }
    }

    /// The type name used to cast bound parameters.
    pub fn cast_name(&self) -> &'static str {
        match self {
            ColumnType::Bool => "boolean",
            ColumnType::SmallInt => "smallint",
            ColumnType::Int => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::Numeric => "numeric",
            ColumnType::Text | ColumnType::PublicKey => "varchar",
            ColumnType::TextArray => "text[]",
            ColumnType::Bytes => "bytea",
            ColumnType::Json => "jsonb",
            ColumnType::Timestamp => "timestamp",
        }
    }
}

/// Where the value of a column comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    /// Supplied by the adapters.
    Row,
    /// `GENERATED ALWAYS AS (<expression>) STORED`.
    Generated(&'static str),
    /// Never supplied; filled by `DEFAULT <expression>`.
    Default(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    pub source: ColumnSource,
}

impl Column {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            source: ColumnSource::Row,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn generated(mut self, expression: &'static str) -> Self {
        self.source = ColumnSource::Generated(expression);
        self.nullable = true;
        self
    }

    pub const fn default_value(mut self, expression: &'static str) -> Self {
        self.source = ColumnSource::Default(expression);
        self
    }

    pub fn is_insertable(&self) -> bool {
        self.source == ColumnSource::Row
    }
}

/// List partitioning of a table, one partition per listed value plus a default one.
#[derive(Debug, Clone, Copy)]
pub struct Partitioning {
    pub column: &'static str,
    pub values: fn() -> Vec<(String, i64)>,
}

/// The description of a destination table.
#[derive(Debug)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub primary_key: &'static [&'static str],
    pub unique: &'static [&'static str],
    /// Columns that keep their stored value when an upsert supplies NULL.
    pub coalesce_on_conflict: &'static [&'static str],
    pub indexes: &'static [&'static [&'static str]],
    pub partitioning: Option<Partitioning>,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Table {}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// The columns a [`Row`] provides, in order.
    pub fn insert_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns.iter().filter(|column| column.is_insertable())
    }

    pub fn insert_arity(&self) -> usize {
        self.insert_columns().count()
    }

    /// Position of `name` within a row of this table.
    pub fn row_index(&self, name: &str) -> Option<usize> {
        self.insert_columns().position(|column| column.name == name)
    }

    pub fn has_natural_key(&self) -> bool {
        self.column(NATURAL_KEY).is_some()
    }

    pub fn public_key_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns
            .iter()
            .filter(|column| column.ty == ColumnType::PublicKey && column.is_insertable())
    }

    /// Insertable columns outside the primary key, updated by upserts.
    pub fn update_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.insert_columns()
            .filter(|column| !self.primary_key.contains(&column.name))
    }

    /// The key of a row under the primary key, as a comparable string.
    pub fn row_key(&self, row: &Row) -> String {
        let mut key = String::new();
        for name in self.primary_key {
            if let Some(value) = self.row_index(name).and_then(|index| row.get(index)) {
                // Debug output is unambiguous for the scalar types keys are made of.
                let _ = write!(key, "{value:?}|");
            }
        }
        key
    }

    /// `CREATE TABLE` and index statements for this table.
    pub fn create_sql(&self) -> String {
        let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (\n", quote_ident(self.name));
        for column in self.columns {
            let _ = write!(
                sql,
                "    {} {}",
                quote_ident(column.name),
                column.ty.sql_type()
            );
            match column.source {
                ColumnSource::Generated(expression) => {
                    let _ = write!(sql, " GENERATED ALWAYS AS ({expression}) STORED");
                }
                ColumnSource::Default(expression) => {
                    let _ = write!(sql, " DEFAULT {expression}");
                }
                ColumnSource::Row => (),
            }
            if !column.nullable {
                sql.push_str(" NOT NULL");
            }
            sql.push_str(",\n");
        }
        let _ = write!(sql, "    PRIMARY KEY ({})", ident_list(self.primary_key));
        sql.push_str("\n)");
        if let Some(partitioning) = &self.partitioning {
            let _ = write!(
                sql,
                " PARTITION BY LIST ({})",
                quote_ident(partitioning.column)
            );
        }
        sql.push_str(";\n");
        if let Some(partitioning) = &self.partitioning {
            for (suffix, value) in (partitioning.values)() {
                let _ = writeln!(
                    sql,
                    "CREATE TABLE IF NOT EXISTS {} PARTITION OF {} FOR VALUES IN ({value});",
                    quote_ident(&format!("{}_{suffix}", self.name)),
                    quote_ident(self.name),
                );
            }
            let _ = writeln!(
                sql,
                "CREATE TABLE IF NOT EXISTS {} PARTITION OF {} DEFAULT;",
                quote_ident(&format!("{}_default", self.name)),
                quote_ident(self.name),
            );
        }
        for column in self.unique {
            let _ = writeln!(
                sql,
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({});",
                quote_ident(&format!("{}_{column}_unique_idx", self.name)),
                quote_ident(self.name),
                quote_ident(column),
            );
        }
        for columns in self.indexes {
            let _ = writeln!(
                sql,
                "CREATE INDEX IF NOT EXISTS {} ON {} ({});",
                quote_ident(&format!("{}_{}_idx", self.name, columns.join("_"))),
                quote_ident(self.name),
                ident_list(columns),
            );
        }
        sql
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE;\n", quote_ident(self.name))
    }
}

/// The column holding the upstream key bytes.
pub const NATURAL_KEY: &str = "natural_key";

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes a string literal for statements that cannot take bound parameters.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn ident_list(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A value bound to a column.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    /// A decimal string.
    Numeric(String),
    Text(String),
    TextArray(Vec<String>),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(text) | SqlValue::Numeric(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            SqlValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::SmallInt(value) => Some(i64::from(*value)),
            SqlValue::Int(value) => Some(i64::from(*value)),
            SqlValue::BigInt(value) => Some(*value),
            SqlValue::Numeric(value) => value.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            SqlValue::Json(value) => Some(value),
            _ => None,
        }
    }

    /// A timestamp from nanoseconds since the Unix epoch.
    pub fn timestamp_nanos(nanos: u64) -> Self {
        let nanos = i64::try_from(nanos).unwrap_or(i64::MAX);
        SqlValue::Timestamp(DateTime::<Utc>::from_timestamp_nanos(nanos).naive_utc())
    }

    pub fn optional<T: Into<SqlValue>>(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<u8> for SqlValue {
    fn from(value: u8) -> Self {
        SqlValue::SmallInt(i16::from(value))
    }
}

impl From<u16> for SqlValue {
    fn from(value: u16) -> Self {
        SqlValue::Int(i32::from(value))
    }
}

impl From<u32> for SqlValue {
    fn from(value: u32) -> Self {
        SqlValue::BigInt(i64::from(value))
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::BigInt(value)
    }
}

/// Values beyond the signed range are carried as numerics; the store rejects them
/// for `BIGINT` columns instead of wrapping.
impl From<u64> for SqlValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or_else(|_| SqlValue::Numeric(value.to_string()), SqlValue::BigInt)
    }
}

impl From<&Uint256> for SqlValue {
    fn from(value: &Uint256) -> Self {
        SqlValue::Numeric(value.to_decimal_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Bytes(value)
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(value: Vec<String>) -> Self {
        SqlValue::TextArray(value)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(value: serde_json::Value) -> Self {
        SqlValue::Json(value)
    }
}

/// Values for the insertable columns of a table, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(pub Vec<SqlValue>);

impl Row {
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, value: impl Into<SqlValue>) {
        self.0.push(value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.0.get(index)
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.0
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.0
    }
}

/// Builds a [`Row`] from heterogeneous values.
#[macro_export]
macro_rules! row {
    ($($value:expr),* $(,)?) => {{
        let mut row = $crate::schema::Row::default();
        $(row.push($value);)*
        row
    }};
}

#[cfg(test)]
mod tests {
    use super::{tables, *};

    #[test]
    fn test_create_sql_marks_generated_and_default_columns() {
        let sql = tables::DAO_COIN_LIMIT_ORDER.create_sql();
        assert!(sql.contains(
            "\"scaled_exchange_rate_numeric\" NUMERIC(78, 0) GENERATED ALWAYS AS \
             (hex_to_numeric(scaled_exchange_rate_hex)) STORED,"
        ));
        assert!(sql.contains("\"is_dao_coin_const\" BOOLEAN DEFAULT true NOT NULL"));
        assert!(sql.contains("PRIMARY KEY (\"natural_key\")"));
    }

    #[test]
    fn test_partitioned_table_lists_every_transaction_type() {
        let sql = tables::TRANSACTION.create_sql();
        assert!(sql.contains("PARTITION BY LIST (\"kind_tag\")"));
        assert!(sql.contains(
            "\"transaction_partitioned_atomic_txns_wrapper\" PARTITION OF \
             \"transaction_partitioned\" FOR VALUES IN (44);"
        ));
        assert!(sql.contains("\"transaction_partitioned_default\" PARTITION OF"));
    }

    #[test]
    fn test_block_height_is_unique() {
        let sql = tables::BLOCK.create_sql();
        assert!(sql.contains("CREATE UNIQUE INDEX IF NOT EXISTS \"block_height_unique_idx\""));
    }

    #[test]
    fn test_large_unsigned_values_become_numerics() {
        assert_eq!(SqlValue::from(7u64), SqlValue::BigInt(7));
        assert_eq!(
            SqlValue::from(u64::MAX),
            SqlValue::Numeric("18446744073709551615".to_string())
        );
    }

    #[test]
    fn test_timestamp_from_nanos() {
        let SqlValue::Timestamp(timestamp) = SqlValue::timestamp_nanos(1_500_000_000_000_000_123)
        else {
            panic!("expected a timestamp");
        };
        assert_eq!(timestamp.and_utc().timestamp(), 1_500_000_000);
        assert_eq!(timestamp.and_utc().timestamp_subsec_nanos(), 123);
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }
}
