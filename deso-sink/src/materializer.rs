// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bulk materialization of the kinds that map entries to rows one to one.

use std::collections::{hash_map::Entry, HashMap};

use deso_base::{
    network::NetworkParams,
    state_change::{StateChangeEntry, StateSyncerOperation},
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    adapters::AdapterError,
    cache::EntryCache,
    catalog::Descriptor,
    db::{DatabaseError, Filter, InsertMode, SinkDatabase},
    schema::{Row, SqlValue, Table, NATURAL_KEY},
    txindex::IndexError,
};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("cannot adapt entry {natural_key}: {source}")]
    Adapter {
        /// The hex encoded key bytes of the entry.
        natural_key: String,
        #[source]
        source: AdapterError,
    },
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

impl BatchError {
    pub fn adapter(key: &[u8], source: AdapterError) -> Self {
        BatchError::Adapter {
            natural_key: hex::encode(key),
            source,
        }
    }
}

/// What a batch amounted to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Entries left after deduplication.
    pub entries: usize,
    /// Entries skipped because the cache had seen them unchanged.
    pub skipped: usize,
    /// Rows written or deleted.
    pub rows: u64,
}

/// Keeps the last entry per key. Keys appear in the order of their first occurrence.
pub fn dedupe(entries: &[StateChangeEntry]) -> Vec<&StateChangeEntry> {
    let mut positions = HashMap::with_capacity(entries.len());
    let mut unique: Vec<&StateChangeEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        match positions.entry(entry.key_bytes.as_slice()) {
            Entry::Occupied(position) => unique[*position.get()] = entry,
            Entry::Vacant(vacant) => {
                vacant.insert(unique.len());
                unique.push(entry);
            }
        }
    }
    unique
}

pub fn insert_mode(operation: StateSyncerOperation) -> InsertMode {
    match operation {
        StateSyncerOperation::Upsert => InsertMode::Upsert,
        StateSyncerOperation::Insert | StateSyncerOperation::Delete => InsertMode::Insert,
    }
}

/// Drops entries the cache has seen unchanged and stages the others.
fn filter_cached<'a>(
    descriptor: &Descriptor,
    operation: StateSyncerOperation,
    entries: Vec<&'a StateChangeEntry>,
    cache: &mut EntryCache,
    summary: &mut BatchSummary,
) -> Vec<&'a StateChangeEntry> {
    let mut kept = Vec::with_capacity(entries.len());
    for entry in entries {
        if !descriptor.cache.applies_to(&entry.key_bytes) {
            kept.push(entry);
            continue;
        }
        let bytes = match operation {
            StateSyncerOperation::Delete => &[][..],
            _ => entry.encoder_bytes.as_slice(),
        };
        // Empty bytes are never compared, and staging them forgets the key.
        if !bytes.is_empty() && cache.is_unchanged(&entry.key_bytes, bytes) {
            summary.skipped += 1;
            continue;
        }
        cache.stage(&entry.key_bytes, bytes);
        kept.push(entry);
    }
    kept
}

type Partition<'a> = (&'static Table, Vec<&'a StateChangeEntry>);

fn partition<'a>(
    descriptor: &Descriptor,
    entries: Vec<&'a StateChangeEntry>,
) -> Result<Vec<Partition<'a>>, BatchError> {
    let mut partitions: Vec<Partition<'a>> = Vec::new();
    for entry in entries {
        let table = descriptor
            .destination
            .table_for(&entry.key_bytes)
            .map_err(|error| BatchError::adapter(&entry.key_bytes, error))?;
        match partitions.iter_mut().find(|(known, _)| *known == table) {
            Some((_, partition)) => partition.push(entry),
            None => partitions.push((table, vec![entry])),
        }
    }
    Ok(partitions)
}

fn adapt(
    descriptor: &Descriptor,
    entries: &[&StateChangeEntry],
    params: &NetworkParams,
) -> Result<Vec<Row>, BatchError> {
    entries
        .iter()
        .map(|entry| {
            let encoder = entry
                .encoder
                .as_ref()
                .ok_or(AdapterError::MissingEncoder(descriptor.kind))
                .map_err(|error| BatchError::adapter(&entry.key_bytes, error))?;
            (descriptor.adapter)(encoder, &entry.key_bytes, params)
                .map_err(|error| BatchError::adapter(&entry.key_bytes, error))
        })
        .collect()
}

/// Deletes the rows whose natural key is one of `keys`.
pub async fn delete_by_natural_key<D>(
    database: &D,
    table: &'static Table,
    keys: Vec<Vec<u8>>,
) -> Result<u64, DatabaseError>
where
    D: SinkDatabase + ?Sized,
{
    if keys.is_empty() {
        return Ok(0);
    }
    let keys = keys.into_iter().map(SqlValue::Bytes).collect();
    database
        .delete_rows(table, vec![Filter::In(NATURAL_KEY, keys)])
        .await
}

/// Materializes a homogeneous batch of a kind described by `descriptor`.
pub async fn materialize_rows<D>(
    database: &D,
    descriptor: &Descriptor,
    operation: StateSyncerOperation,
    entries: &[StateChangeEntry],
    params: &NetworkParams,
    cache: &mut EntryCache,
) -> Result<BatchSummary, BatchError>
where
    D: SinkDatabase + ?Sized,
{
    let unique = dedupe(entries);
    let mut summary = BatchSummary {
        entries: unique.len(),
        ..BatchSummary::default()
    };
    let kept = filter_cached(descriptor, operation, unique, cache, &mut summary);
    for (table, entries) in partition(descriptor, kept)? {
        if entries.is_empty() {
            continue;
        }
        summary.rows += match operation {
            StateSyncerOperation::Insert | StateSyncerOperation::Upsert => {
                let rows = adapt(descriptor, &entries, params)?;
                database
                    .insert_rows(table, rows, insert_mode(operation))
                    .await?
            }
            StateSyncerOperation::Delete => {
                if !table.has_natural_key() {
                    warn!(
                        kind = %descriptor.kind,
                        table = table.name,
                        entries = entries.len(),
                        "ignoring deletes of a table without natural keys"
                    );
                    continue;
                }
                let keys = entries.iter().map(|entry| entry.key_bytes.clone()).collect();
                delete_by_natural_key(database, table, keys).await?
            }
        };
        debug!(kind = %descriptor.kind, table = table.name, rows = summary.rows, "materialized partition");
    }
    Ok(summary)
}

#[cfg(test)]
#[path = "unit_tests/materializer_tests.rs"]
mod unit_tests;
