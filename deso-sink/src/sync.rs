// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Actions taken on the sync phases of the stream.

use std::{fmt::Write as _, sync::Arc, time::Duration};

use deso_base::state_change::SyncEvent;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    db::SinkDatabase,
    schema::migrations::{
        readonly_role_sql, MigrationError, MigrationSet, Migrator, RetryPolicy, STATISTICS_VIEWS,
    },
};

/// What the hook does beyond migrating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Provisions the `readonly` role after bulk sync when set.
    pub readonly_user_password: Option<String>,
    pub idle_connections_after_sync: u32,
    /// Refresh interval of the statistics views, or `None` to leave them alone.
    pub statistics_refresh_interval: Option<Duration>,
    pub retry_policy: RetryPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            readonly_user_password: None,
            idle_connections_after_sync: 2,
            statistics_refresh_interval: None,
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// The script refreshing every statistics view without blocking readers.
pub fn refresh_statistics_sql() -> String {
    let mut sql = String::new();
    for view in STATISTICS_VIEWS {
        let _ = writeln!(sql, "REFRESH MATERIALIZED VIEW CONCURRENTLY {view};");
    }
    sql
}

/// A background task refreshing the statistics views, outside of the ingest
/// transaction.
pub struct StatisticsRefresher {
    cancellation_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl StatisticsRefresher {
    pub fn spawn<D>(database: Arc<D>, interval: Duration) -> Self
    where
        D: SinkDatabase + ?Sized + 'static,
    {
        let cancellation_token = CancellationToken::new();
        let token = cancellation_token.clone();
        let handle = tokio::spawn(async move {
            let sql = refresh_statistics_sql();
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match database.execute_detached(&sql).await {
                            Ok(()) => debug!("refreshed statistics views"),
                            Err(error) => warn!(%error, "failed to refresh statistics views"),
                        }
                    }
                }
            }
        });
        Self {
            cancellation_token,
            handle,
        }
    }

    /// Stops the task and waits for a refresh in progress to finish.
    pub async fn stop(self) {
        self.cancellation_token.cancel();
        if let Err(error) = self.handle.await {
            warn!(%error, "statistics refresher panicked");
        }
    }
}

/// Runs migrations and housekeeping when the stream changes phase.
pub struct SyncHook {
    options: SyncOptions,
    migrator: Migrator,
    refresher: Option<StatisticsRefresher>,
}

impl SyncHook {
    pub fn new(options: SyncOptions) -> Self {
        Self {
            migrator: Migrator::new(options.retry_policy),
            options,
            refresher: None,
        }
    }

    pub fn is_refreshing_statistics(&self) -> bool {
        self.refresher.is_some()
    }

    pub async fn handle<D>(
        &mut self,
        database: &Arc<D>,
        event: SyncEvent,
    ) -> Result<(), MigrationError>
    where
        D: SinkDatabase + ?Sized + 'static,
    {
        info!(?event, "sync phase");
        match event {
            SyncEvent::Start => {
                let mut store = database.migration_store().await?;
                let applied = self
                    .migrator
                    .run(store.as_mut(), true, &[MigrationSet::Initial])
                    .await?;
                info!(applied, "initial migrations done");
            }
            SyncEvent::BulkSyncEnd => {
                let mut store = database.migration_store().await?;
                let applied = self
                    .migrator
                    .run(store.as_mut(), false, &[MigrationSet::PostBulk])
                    .await?;
                info!(applied, "post-bulk migrations done");
                if let Some(password) = &self.options.readonly_user_password {
                    database
                        .execute_detached(&readonly_role_sql(password))
                        .await?;
                    info!("provisioned the readonly role");
                }
                database
                    .reduce_idle_connections(self.options.idle_connections_after_sync)
                    .await?;
                if let Some(interval) = self.options.statistics_refresh_interval {
                    if self.refresher.is_none() {
                        self.refresher =
                            Some(StatisticsRefresher::spawn(database.clone(), interval));
                        info!(?interval, "refreshing statistics views in the background");
                    }
                }
            }
            SyncEvent::BulkSyncBegin | SyncEvent::TailFollowBegin => (),
        }
        Ok(())
    }

    pub async fn shutdown(&mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{
        db::{memory::MemoryDatabase, DatabaseError},
        schema::migrations::{CREATE_TABLES_MIGRATION, STATISTICS_MIGRATION},
    };

    fn options() -> SyncOptions {
        SyncOptions {
            retry_policy: RetryPolicy::immediate(2),
            ..SyncOptions::default()
        }
    }

    #[tokio::test]
    async fn test_start_applies_the_initial_migrations() {
        let database = Arc::new(MemoryDatabase::new());
        let mut hook = SyncHook::new(options());
        hook.handle(&database, SyncEvent::Start).await.unwrap();
        let applied = database.applied_migrations();
        assert!(applied.iter().any(|name| name == CREATE_TABLES_MIGRATION));
        assert!(!applied.iter().any(|name| name == STATISTICS_MIGRATION));
        assert!(!database.is_registry_enabled());
    }

    #[tokio::test]
    async fn test_bulk_sync_end_finishes_the_schema() {
        let database = Arc::new(MemoryDatabase::new());
        let mut hook = SyncHook::new(SyncOptions {
            readonly_user_password: Some("secret".to_string()),
            ..options()
        });
        hook.handle(&database, SyncEvent::Start).await.unwrap();
        hook.handle(&database, SyncEvent::BulkSyncBegin).await.unwrap();
        hook.handle(&database, SyncEvent::BulkSyncEnd).await.unwrap();

        assert!(database
            .applied_migrations()
            .iter()
            .any(|name| name == STATISTICS_MIGRATION));
        assert!(database.is_registry_enabled());
        assert_eq!(database.idle_connections(), Some(2));
        assert!(database
            .detached_scripts()
            .iter()
            .any(|script| script.contains("CREATE ROLE readonly")));
        assert!(!hook.is_refreshing_statistics());
    }

    #[tokio::test]
    async fn test_failed_migrations_are_fatal() {
        let database = Arc::new(MemoryDatabase::new());
        database.fail_next_migrations(1);
        let mut hook = SyncHook::new(options());
        assert_matches!(
            hook.handle(&database, SyncEvent::Start).await,
            Err(MigrationError::Database(DatabaseError::Injected(_)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_statistics_are_refreshed_until_shutdown() {
        let database = Arc::new(MemoryDatabase::new());
        let mut hook = SyncHook::new(SyncOptions {
            statistics_refresh_interval: Some(Duration::from_secs(60)),
            ..options()
        });
        hook.handle(&database, SyncEvent::Start).await.unwrap();
        hook.handle(&database, SyncEvent::BulkSyncEnd).await.unwrap();
        assert!(hook.is_refreshing_statistics());

        tokio::time::sleep(Duration::from_secs(150)).await;
        hook.shutdown().await;
        let refreshes = database
            .detached_scripts()
            .iter()
            .filter(|script| **script == refresh_statistics_sql())
            .count();
        assert_eq!(refreshes, 3);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(
            database
                .detached_scripts()
                .iter()
                .filter(|script| **script == refresh_statistics_sql())
                .count(),
            refreshes
        );
        assert!(!hook.is_refreshing_statistics());
    }

    #[test]
    fn test_refresh_covers_every_view() {
        let sql = refresh_statistics_sql();
        assert_eq!(sql.lines().count(), STATISTICS_VIEWS.len());
        assert!(sql.starts_with("REFRESH MATERIALIZED VIEW CONCURRENTLY statistic_txn_count_all;"));
    }
}
