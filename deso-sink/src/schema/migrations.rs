// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Versioned schema migrations.
//!
//! Migrations are ordered `(up, down)` scripts recorded in a ledger table. Every run
//! holds a store-wide advisory lock, so two sinks never migrate concurrently.

use std::{fmt::Write as _, time::Duration};

use async_trait::async_trait;
use deso_base::transaction::TxnType;
use thiserror::Error;
use tracing::{info, warn};

use super::{
    quote_ident, quote_literal,
    tables::{self, TRANSACTION, TRANSACTION_VIEW},
};
use crate::db::DatabaseError;

/// The ledger of applied migrations.
pub const LEDGER_TABLE: &str = "sink_migrations";
/// Key of the advisory lock serializing migration runs.
pub const ADVISORY_LOCK_KEY: i64 = 0x6465_736f_5f73_696e;

pub const FUNCTIONS_MIGRATION: &str = "0001_functions";
pub const CREATE_TABLES_MIGRATION: &str = "0002_tables";
pub const TRANSACTION_TYPES_MIGRATION: &str = "0003_transaction_types";
pub const PUBLIC_KEY_REGISTRY_MIGRATION: &str = "0101_public_key_registry";
pub const METADATA_INDEXES_MIGRATION: &str = "0102_metadata_indexes";
pub const STATISTICS_MIGRATION: &str = "0103_statistics_views";

/// Statement timeout of post-bulk scripts, which touch every row of large tables.
const POST_BULK_STATEMENT_TIMEOUT: &str = "SET LOCAL statement_timeout = '10min';\n";

/// Materialized views refreshed by the statistics task.
pub const STATISTICS_VIEWS: &[&str] = &[
    "statistic_txn_count_all",
    "statistic_wallet_count_all",
    "statistic_active_wallets_30d",
    "statistic_new_wallets_30d",
    "statistic_profile_count",
    "statistic_post_count",
    "statistic_nft_count",
    "statistic_block_height_current",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationSet {
    /// Base tables and functions, applied on `start`.
    Initial,
    /// Derived indices, registry triggers and views, applied after bulk sync.
    PostBulk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub name: &'static str,
    pub up: String,
    pub down: String,
    /// Whether failures of `up` are retried.
    pub retry: bool,
}

impl MigrationSet {
    pub fn migrations(&self) -> Vec<Migration> {
        match self {
            MigrationSet::Initial => initial_migrations(),
            MigrationSet::PostBulk => post_bulk_migrations(),
        }
    }
}

/// Every known migration, in application order.
pub fn all_migrations() -> Vec<Migration> {
    let mut migrations = initial_migrations();
    migrations.extend(post_bulk_migrations());
    migrations
}

fn initial_migrations() -> Vec<Migration> {
    vec![
        Migration {
            name: FUNCTIONS_MIGRATION,
            up: FUNCTIONS_UP.to_string(),
            down: "DROP FUNCTION IF EXISTS hex_to_numeric(TEXT) CASCADE;\n\
                   DROP PROCEDURE IF EXISTS on_commit();\n"
                .to_string(),
            retry: false,
        },
        Migration {
            name: CREATE_TABLES_MIGRATION,
            up: create_tables_sql(),
            down: drop_tables_sql(),
            retry: false,
        },
        Migration {
            name: TRANSACTION_TYPES_MIGRATION,
            up: transaction_types_sql(),
            down: format!(
                "DELETE FROM {};\n",
                quote_ident(tables::TRANSACTION_TYPE.name)
            ),
            retry: false,
        },
    ]
}

fn post_bulk_migrations() -> Vec<Migration> {
    vec![
        Migration {
            name: PUBLIC_KEY_REGISTRY_MIGRATION,
            up: format!("{POST_BULK_STATEMENT_TIMEOUT}{}", public_key_registry_sql()),
            down: drop_public_key_registry_sql(),
            retry: true,
        },
        Migration {
            name: METADATA_INDEXES_MIGRATION,
            up: format!("{POST_BULK_STATEMENT_TIMEOUT}{METADATA_INDEXES_UP}"),
            down: METADATA_INDEXES_DOWN.to_string(),
            retry: true,
        },
        Migration {
            name: STATISTICS_MIGRATION,
            up: format!("{POST_BULK_STATEMENT_TIMEOUT}{}", statistics_sql()),
            down: STATISTICS_VIEWS
                .iter()
                .map(|view| format!("DROP MATERIALIZED VIEW IF EXISTS {view};\n"))
                .collect(),
            retry: true,
        },
    ]
}

const FUNCTIONS_UP: &str = r#"
CREATE OR REPLACE FUNCTION hex_to_numeric(hex_value TEXT) RETURNS NUMERIC
LANGUAGE plpgsql IMMUTABLE STRICT PARALLEL SAFE AS $$
DECLARE
    digits TEXT := lower(regexp_replace(hex_value, '^0[xX]', ''));
    result NUMERIC := 0;
    i INTEGER;
BEGIN
    IF digits !~ '^[0-9a-f]*$' THEN
        RETURN NULL;
    END IF;
    FOR i IN 1 .. length(digits) LOOP
        result := result * 16 + (strpos('0123456789abcdef', substr(digits, i, 1)) - 1);
    END LOOP;
    RETURN result;
END;
$$;

DO $$
BEGIN
    IF NOT EXISTS (SELECT 1 FROM pg_proc WHERE proname = 'on_commit') THEN
        CREATE PROCEDURE on_commit() LANGUAGE plpgsql AS $body$ BEGIN END; $body$;
    END IF;
END
$$;
"#;

pub fn create_tables_sql() -> String {
    let mut sql = String::new();
    for table in tables::ALL {
        sql.push_str(&table.create_sql());
    }
    let _ = writeln!(
        sql,
        "CREATE OR REPLACE VIEW {} AS SELECT * FROM {};",
        quote_ident(TRANSACTION_VIEW),
        quote_ident(TRANSACTION.name),
    );
    sql
}

fn drop_tables_sql() -> String {
    let mut sql = format!("DROP VIEW IF EXISTS {};\n", quote_ident(TRANSACTION_VIEW));
    for table in tables::ALL.iter().rev() {
        sql.push_str(&table.drop_sql());
    }
    sql
}

fn transaction_types_sql() -> String {
    let values = TxnType::ALL
        .iter()
        .map(|txn_type| format!("({}, {})", txn_type.as_u8(), quote_literal(txn_type.name())))
        .collect::<Vec<_>>()
        .join(",\n    ");
    format!(
        "INSERT INTO {} (\"type\", \"name\") VALUES\n    {values}\nON CONFLICT (\"type\") DO NOTHING;\n",
        quote_ident(tables::TRANSACTION_TYPE.name)
    )
}

const REGISTRY_FUNCTIONS: &str = r#"
CREATE OR REPLACE FUNCTION register_public_key() RETURNS trigger
LANGUAGE plpgsql AS $$
DECLARE
    key_column TEXT;
    key_value TEXT;
BEGIN
    FOREACH key_column IN ARRAY TG_ARGV LOOP
        EXECUTE format('SELECT ($1).%I::text', key_column) USING NEW INTO key_value;
        IF key_value IS NOT NULL AND key_value <> '' THEN
            INSERT INTO public_key (public_key) VALUES (key_value) ON CONFLICT DO NOTHING;
            INSERT INTO wallet (public_key, pkid) VALUES (key_value, key_value)
                ON CONFLICT DO NOTHING;
        END IF;
    END LOOP;
    RETURN NULL;
END;
$$;

CREATE OR REPLACE FUNCTION register_wallet() RETURNS trigger
LANGUAGE plpgsql AS $$
BEGIN
    INSERT INTO wallet (public_key, pkid) VALUES (NEW.public_key, NEW.pkid)
        ON CONFLICT (public_key) DO UPDATE SET pkid = EXCLUDED.pkid;
    RETURN NULL;
END;
$$;
"#;

/// Triggers feeding the `public_key` and `wallet` registries, plus a backfill of the
/// rows written before they existed.
fn public_key_registry_sql() -> String {
    let mut sql = REGISTRY_FUNCTIONS.to_string();
    for table in tables::ALL {
        let columns = table
            .public_key_columns()
            .map(|column| column.name)
            .collect::<Vec<_>>();
        if columns.is_empty() {
            continue;
        }
        let name = quote_ident(table.name);
        let arguments = columns
            .iter()
            .map(|column| quote_literal(column))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            sql,
            "DROP TRIGGER IF EXISTS register_public_keys ON {name};\n\
             CREATE TRIGGER register_public_keys AFTER INSERT OR UPDATE ON {name}\n    \
             FOR EACH ROW EXECUTE FUNCTION register_public_key({arguments});"
        );
        for column in columns {
            let column = quote_ident(column);
            let _ = writeln!(
                sql,
                "INSERT INTO public_key (public_key) SELECT DISTINCT {column} FROM {name} \
                 WHERE {column} IS NOT NULL AND {column} <> '' ON CONFLICT DO NOTHING;\n\
                 INSERT INTO wallet (public_key, pkid) SELECT DISTINCT {column}, {column} \
                 FROM {name} WHERE {column} IS NOT NULL AND {column} <> '' \
                 ON CONFLICT DO NOTHING;"
            );
        }
    }
    let pkid = quote_ident(tables::PKID.name);
    let _ = writeln!(
        sql,
        "DROP TRIGGER IF EXISTS register_wallet ON {pkid};\n\
         CREATE TRIGGER register_wallet AFTER INSERT OR UPDATE ON {pkid}\n    \
         FOR EACH ROW EXECUTE FUNCTION register_wallet();\n\
         INSERT INTO wallet (public_key, pkid) SELECT public_key, pkid FROM {pkid}\n    \
         ON CONFLICT (public_key) DO UPDATE SET pkid = EXCLUDED.pkid;"
    );
    sql
}

fn drop_public_key_registry_sql() -> String {
    let mut sql = String::new();
    for table in tables::ALL {
        if table.public_key_columns().next().is_some() {
            let _ = writeln!(
                sql,
                "DROP TRIGGER IF EXISTS register_public_keys ON {};",
                quote_ident(table.name)
            );
        }
    }
    let _ = writeln!(
        sql,
        "DROP TRIGGER IF EXISTS register_wallet ON {};\n\
         DROP FUNCTION IF EXISTS register_public_key();\n\
         DROP FUNCTION IF EXISTS register_wallet();",
        quote_ident(tables::PKID.name)
    );
    sql
}

const METADATA_INDEXES_UP: &str = r#"
CREATE INDEX IF NOT EXISTS transaction_tx_index_metadata_gin_idx
    ON transaction_partitioned USING GIN (tx_index_metadata jsonb_path_ops);
CREATE INDEX IF NOT EXISTS transaction_post_hash_idx
    ON transaction_partitioned ((tx_index_metadata ->> 'PostHashHex'));
CREATE INDEX IF NOT EXISTS transaction_association_type_idx
    ON transaction_partitioned ((tx_index_metadata ->> 'AssociationType'));
CREATE INDEX IF NOT EXISTS transaction_creator_public_key_idx
    ON transaction_partitioned ((tx_index_metadata ->> 'CreatorPublicKeyBase58Check'));
CREATE INDEX IF NOT EXISTS post_entry_extra_data_gin_idx
    ON post_entry USING GIN (extra_data jsonb_path_ops);
CREATE INDEX IF NOT EXISTS profile_entry_username_lower_idx
    ON profile_entry (lower(username));
"#;

const METADATA_INDEXES_DOWN: &str = r#"
DROP INDEX IF EXISTS transaction_tx_index_metadata_gin_idx;
DROP INDEX IF EXISTS transaction_post_hash_idx;
DROP INDEX IF EXISTS transaction_association_type_idx;
DROP INDEX IF EXISTS transaction_creator_public_key_idx;
DROP INDEX IF EXISTS post_entry_extra_data_gin_idx;
DROP INDEX IF EXISTS profile_entry_username_lower_idx;
"#;

fn statistics_sql() -> String {
    let definitions = [
        (
            "statistic_txn_count_all",
            "SELECT 1 AS id, count(*) AS count FROM \"transaction\"",
        ),
        (
            "statistic_wallet_count_all",
            "SELECT 1 AS id, count(*) AS count FROM wallet",
        ),
        (
            "statistic_active_wallets_30d",
            "SELECT 1 AS id, count(DISTINCT public_key) AS count FROM \"transaction\" \
             WHERE \"timestamp\" > now() - interval '30 days'",
        ),
        (
            "statistic_new_wallets_30d",
            "SELECT 1 AS id, count(*) AS count FROM (SELECT public_key \
             FROM \"transaction\" WHERE public_key IS NOT NULL GROUP BY public_key \
             HAVING min(\"timestamp\") > now() - interval '30 days') AS new_wallets",
        ),
        (
            "statistic_profile_count",
            "SELECT 1 AS id, count(*) AS count FROM profile_entry",
        ),
        (
            "statistic_post_count",
            "SELECT 1 AS id, count(*) AS count FROM post_entry",
        ),
        (
            "statistic_nft_count",
            "SELECT 1 AS id, count(*) AS count FROM nft_entry",
        ),
        (
            "statistic_block_height_current",
            "SELECT 1 AS id, coalesce(max(height), 0) AS height FROM block",
        ),
    ];
    let mut sql = String::new();
    for (view, query) in definitions {
        let _ = writeln!(
            sql,
            "CREATE MATERIALIZED VIEW IF NOT EXISTS {view} AS {query};\n\
             CREATE UNIQUE INDEX IF NOT EXISTS {view}_id_idx ON {view} (id);"
        );
    }
    sql
}

/// The script provisioning the read-only query role.
pub fn readonly_role_sql(password: &str) -> String {
    let password = quote_literal(password);
    format!(
        r#"DO $role$
BEGIN
    IF NOT EXISTS (SELECT 1 FROM pg_roles WHERE rolname = 'readonly') THEN
        CREATE ROLE readonly LOGIN PASSWORD {password};
    ELSE
        ALTER ROLE readonly WITH LOGIN PASSWORD {password};
    END IF;
END
$role$;
GRANT USAGE ON SCHEMA public TO readonly;
GRANT SELECT ON ALL TABLES IN SCHEMA public TO readonly;
ALTER DEFAULT PRIVILEGES IN SCHEMA public GRANT SELECT ON TABLES TO readonly;
"#
    )
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("migration {name} failed after {attempts} attempts: {source}")]
    Exhausted {
        name: &'static str,
        attempts: u32,
        #[source]
        source: DatabaseError,
    },
    #[error("applied migration {0} is unknown to this build")]
    UnknownMigration(String),
}

/// Connection-scoped access to the ledger. The advisory lock is tied to the
/// connection, so a dropped store releases it.
#[async_trait]
pub trait MigrationStore: Send {
    async fn lock(&mut self) -> Result<(), DatabaseError>;

    async fn unlock(&mut self) -> Result<(), DatabaseError>;

    /// Names of the applied migrations, oldest first. Creates the ledger if needed.
    async fn applied(&mut self) -> Result<Vec<String>, DatabaseError>;

    /// Runs `up` and records the migration, atomically.
    async fn apply(&mut self, migration: &Migration) -> Result<(), DatabaseError>;

    /// Runs `down` and removes the migration from the ledger, atomically.
    async fn revert(&mut self, migration: &Migration) -> Result<(), DatabaseError>;
}

/// Capped exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// The delay after the failed attempt number `attempt` (starting at 1).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Applies and reverts migrations under the advisory lock.
#[derive(Debug, Clone, Default)]
pub struct Migrator {
    retry_policy: RetryPolicy,
}

impl Migrator {
    pub fn new(retry_policy: RetryPolicy) -> Self {
        Self { retry_policy }
    }

    /// Optionally reverts everything, then applies the missing migrations of `sets`.
    /// Returns the number of migrations applied.
    pub async fn run(
        &self,
        store: &mut dyn MigrationStore,
        reset: bool,
        sets: &[MigrationSet],
    ) -> Result<usize, MigrationError> {
        store.lock().await?;
        let result = self.run_locked(store, reset, sets).await;
        let unlocked = store.unlock().await;
        let applied = result?;
        unlocked?;
        Ok(applied)
    }

    async fn run_locked(
        &self,
        store: &mut dyn MigrationStore,
        reset: bool,
        sets: &[MigrationSet],
    ) -> Result<usize, MigrationError> {
        if reset {
            self.reset_locked(store).await?;
        }
        let applied = store.applied().await?;
        let mut count = 0;
        for set in sets {
            for migration in set.migrations() {
                if applied.iter().any(|name| name == migration.name) {
                    continue;
                }
                self.apply_with_retries(store, &migration).await?;
                info!(migration = migration.name, "applied migration");
                count += 1;
            }
        }
        Ok(count)
    }

    async fn reset_locked(&self, store: &mut dyn MigrationStore) -> Result<(), MigrationError> {
        let known = all_migrations();
        for name in store.applied().await?.into_iter().rev() {
            let migration = known
                .iter()
                .find(|migration| migration.name == name)
                .ok_or(MigrationError::UnknownMigration(name))?;
            store.revert(migration).await?;
            info!(migration = migration.name, "reverted migration");
        }
        Ok(())
    }

    async fn apply_with_retries(
        &self,
        store: &mut dyn MigrationStore,
        migration: &Migration,
    ) -> Result<(), MigrationError> {
        let max_attempts = if migration.retry {
            self.retry_policy.max_attempts.max(1)
        } else {
            1
        };
        let mut attempt = 1;
        loop {
            match store.apply(migration).await {
                Ok(()) => return Ok(()),
                Err(error) if attempt >= max_attempts => {
                    if !migration.retry {
                        return Err(error.into());
                    }
                    return Err(MigrationError::Exhausted {
                        name: migration.name,
                        attempts: attempt,
                        source: error,
                    });
                }
                Err(error) => {
                    let delay = self.retry_policy.delay(attempt);
                    warn!(
                        migration = migration.name,
                        attempt,
                        ?delay,
                        %error,
                        "migration failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../unit_tests/migrations_tests.rs"]
mod unit_tests;
