// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The batch-replay engine and the callback surface it exposes to the stream consumer.

use std::sync::Arc;

use async_trait::async_trait;
use deso_base::{
    network::NetworkParams,
    state_change::{EncoderType, RecordKind, StateChangeEntry, StateSyncerOperation, SyncEvent},
};
use thiserror::Error;
use tracing::{debug, error, info_span, warn, Instrument as _};

use crate::{
    block::{materialize_blocks, materialize_mempool_transactions},
    cache::EntryCache,
    catalog::{handling, Handling},
    db::{DatabaseError, SinkDatabase},
    materializer::{materialize_rows, BatchError, BatchSummary},
    savepoint::TransactionManager,
    schema::migrations::MigrationError,
    sync::{SyncHook, SyncOptions},
    txindex::index_bundles,
};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot {operation} {kind} batch: {source}")]
    Batch {
        kind: RecordKind,
        operation: StateSyncerOperation,
        #[source]
        source: BatchError,
    },
    #[error(
        "batch mixes {expected_operation} {expected_type} entries with \
         {found_operation} {found_type} entries"
    )]
    HeterogeneousBatch {
        expected_type: EncoderType,
        expected_operation: StateSyncerOperation,
        found_type: EncoderType,
        found_operation: StateSyncerOperation,
    },
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The callbacks through which a stream consumer drives a sink.
#[async_trait]
pub trait StateChangeHandler: Send {
    /// Materializes a batch whose entries share their kind and operation.
    async fn handle_entry_batch(
        &mut self,
        batch: &[StateChangeEntry],
    ) -> Result<BatchSummary, SinkError>;

    async fn handle_sync_event(&mut self, event: SyncEvent) -> Result<(), SinkError>;

    async fn begin_transaction(&mut self) -> Result<(), SinkError>;

    async fn commit_transaction(&mut self) -> Result<(), SinkError>;

    async fn rollback_transaction(&mut self) -> Result<(), SinkError>;
}

/// Owns the process-level state of a sink: the store, the network parameters, the
/// entry cache, the open store transaction and the sync hook.
pub struct SinkEngine<D: ?Sized> {
    params: NetworkParams,
    cache: EntryCache,
    transactions: TransactionManager,
    sync: SyncHook,
    sync_mempool: bool,
    database: Arc<D>,
}

impl<D> SinkEngine<D>
where
    D: SinkDatabase + ?Sized + 'static,
{
    pub fn new(database: Arc<D>, params: NetworkParams) -> Self {
        Self {
            params,
            cache: EntryCache::default(),
            transactions: TransactionManager::new(),
            sync: SyncHook::new(SyncOptions::default()),
            sync_mempool: false,
            database,
        }
    }

    pub fn with_sync_options(mut self, options: SyncOptions) -> Self {
        self.sync = SyncHook::new(options);
        self
    }

    /// Whether mempool transactions are materialized.
    pub fn with_mempool(mut self, sync_mempool: bool) -> Self {
        self.sync_mempool = sync_mempool;
        self
    }

    pub fn with_cache(mut self, cache: EntryCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn database(&self) -> &Arc<D> {
        &self.database
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    pub fn cache(&self) -> &EntryCache {
        &self.cache
    }

    /// Stops the background work started by sync events.
    pub async fn shutdown(&mut self) {
        self.sync.shutdown().await;
    }

    async fn dispatch(
        &mut self,
        kind: RecordKind,
        operation: StateSyncerOperation,
        batch: &[StateChangeEntry],
    ) -> Result<BatchSummary, BatchError> {
        let database = &*self.database;
        match handling(kind) {
            Handling::Rows(descriptor) => {
                materialize_rows(
                    database,
                    &descriptor,
                    operation,
                    batch,
                    &self.params,
                    &mut self.cache,
                )
                .await
            }
            Handling::Block => materialize_blocks(database, operation, batch, &self.params).await,
            Handling::MempoolTransaction if !self.sync_mempool => {
                debug!(entries = batch.len(), "mempool sync is disabled");
                Ok(BatchSummary::default())
            }
            Handling::MempoolTransaction => {
                materialize_mempool_transactions(database, operation, batch, &self.params).await
            }
            Handling::UtxoOperationBundle => {
                index_bundles(database, operation, batch, &self.params).await
            }
        }
    }

    /// Runs a batch in its own scope, so that a failure leaves the store as it was
    /// before the batch.
    async fn process(
        &mut self,
        kind: RecordKind,
        operation: StateSyncerOperation,
        batch: &[StateChangeEntry],
    ) -> Result<BatchSummary, SinkError> {
        let scope = self.transactions.open_scope(&*self.database).await?;
        let result = self.dispatch(kind, operation, batch).await;
        let closed = self
            .transactions
            .close_scope(&*self.database, &scope, result.is_ok())
            .await;
        let result = match (result, closed) {
            (Ok(summary), Ok(())) => Ok(summary),
            (Ok(_), Err(error)) => Err(BatchError::from(error)),
            (Err(batch_error), Ok(())) => Err(batch_error),
            (Err(batch_error), Err(error)) => {
                error!(%error, "cannot discard the writes of a failed batch");
                Err(batch_error)
            }
        };
        self.cache.finish_batch(result.is_ok(), scope.is_nested());
        let summary = result.map_err(|source| SinkError::Batch {
            kind,
            operation,
            source,
        })?;
        debug!(
            entries = summary.entries,
            skipped = summary.skipped,
            rows = summary.rows,
            "materialized batch"
        );
        Ok(summary)
    }
}

#[async_trait]
impl<D> StateChangeHandler for SinkEngine<D>
where
    D: SinkDatabase + ?Sized + 'static,
{
    async fn handle_entry_batch(
        &mut self,
        batch: &[StateChangeEntry],
    ) -> Result<BatchSummary, SinkError> {
        let Some(first) = batch.first() else {
            return Ok(BatchSummary::default());
        };
        if let Some(other) = batch.iter().find(|entry| {
            entry.encoder_type != first.encoder_type || entry.operation != first.operation
        }) {
            return Err(SinkError::HeterogeneousBatch {
                expected_type: first.encoder_type,
                expected_operation: first.operation,
                found_type: other.encoder_type,
                found_operation: other.operation,
            });
        }
        let Some(kind) = first.kind() else {
            warn!(
                encoder_type = first.encoder_type.0,
                entries = batch.len(),
                "skipping batch of an unknown kind"
            );
            return Ok(BatchSummary::default());
        };
        let operation = first.operation;
        let span = info_span!("batch", %kind, %operation, entries = batch.len());
        self.process(kind, operation, batch).instrument(span).await
    }

    async fn handle_sync_event(&mut self, event: SyncEvent) -> Result<(), SinkError> {
        self.sync.handle(&self.database, event).await?;
        Ok(())
    }

    async fn begin_transaction(&mut self) -> Result<(), SinkError> {
        // Updates held for a transaction the upstream abandoned are dropped with it.
        self.cache.rollback();
        self.transactions.begin(&*self.database).await?;
        Ok(())
    }

    async fn commit_transaction(&mut self) -> Result<(), SinkError> {
        match self.transactions.commit(&*self.database).await {
            Ok(()) => {
                self.cache.commit();
                Ok(())
            }
            Err(error) => {
                self.cache.rollback();
                Err(error.into())
            }
        }
    }

    async fn rollback_transaction(&mut self) -> Result<(), SinkError> {
        self.cache.rollback();
        self.transactions.rollback(&*self.database).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "unit_tests/engine_tests.rs"]
mod unit_tests;
