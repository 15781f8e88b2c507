// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use assert_matches::assert_matches;

use super::*;
use crate::{
    db::{memory::MemoryDatabase, InsertMode, SinkDatabase as _},
    row,
    schema::tables::{FOLLOW, TRANSACTION_TYPE},
};

async fn run(
    db: &MemoryDatabase,
    migrator: &Migrator,
    reset: bool,
    sets: &[MigrationSet],
) -> Result<usize, MigrationError> {
    let mut store = db.migration_store().await?;
    migrator.run(store.as_mut(), reset, sets).await
}

#[tokio::test]
async fn test_initial_migrations_are_applied_once() {
    let db = MemoryDatabase::new();
    let migrator = Migrator::default();
    let applied = run(&db, &migrator, false, &[MigrationSet::Initial])
        .await
        .unwrap();
    assert_eq!(applied, 3);
    assert_eq!(
        db.applied_migrations(),
        vec![
            FUNCTIONS_MIGRATION,
            CREATE_TABLES_MIGRATION,
            TRANSACTION_TYPES_MIGRATION
        ]
    );
    assert_eq!(db.row_count(&TRANSACTION_TYPE), TxnType::ALL.len());
    let applied = run(&db, &migrator, false, &[MigrationSet::Initial])
        .await
        .unwrap();
    assert_eq!(applied, 0);
    assert!(!db.is_migration_locked());
}

#[tokio::test]
async fn test_reset_reverts_and_reapplies() {
    let db = MemoryDatabase::new();
    let migrator = Migrator::default();
    run(&db, &migrator, false, &[MigrationSet::Initial])
        .await
        .unwrap();
    db.insert_rows(&FOLLOW, vec![row!["a", "b", vec![1u8]]], InsertMode::Insert)
        .await
        .unwrap();
    let applied = run(&db, &migrator, true, &[MigrationSet::Initial])
        .await
        .unwrap();
    assert_eq!(applied, 3);
    assert_eq!(db.row_count(&FOLLOW), 0);
    assert_eq!(db.applied_migrations().len(), 3);
}

#[tokio::test]
async fn test_post_bulk_migrations_are_retried() {
    let db = MemoryDatabase::new();
    let migrator = Migrator::new(RetryPolicy::immediate(5));
    run(&db, &migrator, false, &[MigrationSet::Initial])
        .await
        .unwrap();
    db.fail_next_migrations(2);
    let applied = run(&db, &migrator, false, &[MigrationSet::PostBulk])
        .await
        .unwrap();
    assert_eq!(applied, 3);
    assert!(db.is_registry_enabled());
    assert!(db
        .applied_migrations()
        .contains(&STATISTICS_MIGRATION.to_string()));
}

#[tokio::test]
async fn test_exhausted_retries_release_the_lock() {
    let db = MemoryDatabase::new();
    let migrator = Migrator::new(RetryPolicy::immediate(3));
    run(&db, &migrator, false, &[MigrationSet::Initial])
        .await
        .unwrap();
    db.fail_next_migrations(10);
    let result = run(&db, &migrator, false, &[MigrationSet::PostBulk]).await;
    assert_matches!(
        result,
        Err(MigrationError::Exhausted {
            name: PUBLIC_KEY_REGISTRY_MIGRATION,
            attempts: 3,
            ..
        })
    );
    assert!(!db.is_migration_locked());
    assert!(!db.is_registry_enabled());
}

#[tokio::test]
async fn test_initial_migrations_are_not_retried() {
    let db = MemoryDatabase::new();
    db.fail_next_migrations(1);
    let result = run(
        &db,
        &Migrator::new(RetryPolicy::immediate(5)),
        false,
        &[MigrationSet::Initial],
    )
    .await;
    assert_matches!(result, Err(MigrationError::Database(_)));
    assert!(db.applied_migrations().is_empty());
}

#[test]
fn test_retry_delays_are_capped() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay(1), Duration::from_millis(500));
    assert_eq!(policy.delay(2), Duration::from_secs(1));
    assert_eq!(policy.delay(4), Duration::from_secs(4));
    assert_eq!(policy.delay(40), Duration::from_secs(30));
}

#[test]
fn test_every_migration_has_a_unique_name() {
    let mut names = all_migrations()
        .into_iter()
        .map(|migration| migration.name)
        .collect::<Vec<_>>();
    let count = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), count);
}

#[test]
fn test_readonly_role_quotes_the_password() {
    let sql = readonly_role_sql("it's");
    assert!(sql.contains("'it''s'"));
}
