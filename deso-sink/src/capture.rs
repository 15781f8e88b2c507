// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A consumer replaying captured state-change streams.
//!
//! A capture is a directory of JSON-lines files, read in file-name order. Each line
//! holds one [`CaptureRecord`]. The number of lines of each file that reached the store
//! is checkpointed in `progress.json`, so a restarted consumer resumes where the last
//! durable write ended.

use std::{
    collections::BTreeMap,
    mem,
    path::{Path, PathBuf},
    time::Duration,
};

use deso_base::state_change::{EncoderType, StateChangeEntry, StateSyncerOperation, SyncEvent};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::engine::{SinkError, StateChangeHandler};

pub const CAPTURE_EXTENSION: &str = "jsonl";
pub const PROGRESS_FILE: &str = "progress.json";

/// One line of a capture file, e.g. `{"entry":{..}}`, `{"sync_event":"bulk_sync_end"}`
/// or `"commit"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureRecord {
    Entry(StateChangeEntry),
    SyncEvent(SyncEvent),
    Begin,
    Commit,
    Rollback,
}

/// Lines consumed so far, per capture file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub files: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    pub lines: u64,
    pub batches: u64,
    pub entries: u64,
}

/// Consecutive entries sharing their type and operation.
#[derive(Default)]
struct PendingBatch {
    entries: Vec<StateChangeEntry>,
    bytes: usize,
}

impl PendingBatch {
    fn accepts(&self, entry: &StateChangeEntry, batch_bytes: usize) -> bool {
        let Some(first) = self.entries.first() else {
            return true;
        };
        let shape = |entry: &StateChangeEntry| -> (EncoderType, StateSyncerOperation) {
            (entry.encoder_type, entry.operation)
        };
        shape(first) == shape(entry) && self.bytes + entry.encoder_bytes.len() <= batch_bytes
    }

    fn push(&mut self, entry: StateChangeEntry) {
        self.bytes += entry.encoder_bytes.len();
        self.entries.push(entry);
    }

    fn take(&mut self) -> Vec<StateChangeEntry> {
        self.bytes = 0;
        mem::take(&mut self.entries)
    }
}

pub struct CaptureConsumer {
    state_change_dir: PathBuf,
    progress_path: PathBuf,
    batch_bytes: usize,
}

impl CaptureConsumer {
    pub fn new(
        state_change_dir: impl Into<PathBuf>,
        consumer_progress_dir: impl AsRef<Path>,
        batch_bytes: usize,
    ) -> Self {
        Self {
            state_change_dir: state_change_dir.into(),
            progress_path: consumer_progress_dir.as_ref().join(PROGRESS_FILE),
            batch_bytes: batch_bytes.max(1),
        }
    }

    pub async fn load_progress(&self) -> Result<Option<Progress>, SinkError> {
        match fs_err::tokio::read_to_string(&self.progress_path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Writes the checkpoint to a staging file first, then moves it over the old one.
    async fn save_progress(&self, progress: &Progress) -> Result<(), SinkError> {
        if let Some(parent) = self.progress_path.parent() {
            fs_err::tokio::create_dir_all(parent).await?;
        }
        let staging = self.progress_path.with_extension("json.new");
        fs_err::tokio::write(&staging, serde_json::to_vec_pretty(progress)?).await?;
        fs_err::tokio::rename(&staging, &self.progress_path).await?;
        Ok(())
    }

    async fn capture_files(&self) -> Result<Vec<(String, PathBuf)>, SinkError> {
        let mut files = Vec::new();
        let mut entries = fs_err::tokio::read_dir(&self.state_change_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|extension| extension.to_str()) != Some(CAPTURE_EXTENSION)
            {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                files.push((name.to_string(), path.clone()));
            }
        }
        files.sort();
        Ok(files)
    }

    /// Replays every complete line not consumed yet.
    pub async fn run<H>(&self, handler: &mut H) -> Result<CaptureSummary, SinkError>
    where
        H: StateChangeHandler + ?Sized,
    {
        let mut progress = match self.load_progress().await? {
            Some(progress) => progress,
            None => {
                info!("no checkpoint found, starting from scratch");
                handler.handle_sync_event(SyncEvent::Start).await?;
                let progress = Progress::default();
                self.save_progress(&progress).await?;
                progress
            }
        };
        let mut replay = Replay {
            handler,
            batch_bytes: self.batch_bytes,
            pending: PendingBatch::default(),
            in_transaction: false,
            carried: Vec::new(),
            settled: Vec::new(),
            summary: CaptureSummary::default(),
        };
        for (name, path) in self.capture_files().await? {
            let consumed = progress.files.get(&name).copied().unwrap_or(0);
            let durable = replay.replay_file(&name, &path, consumed).await?;
            let mut changed = durable != consumed;
            progress.files.insert(name, durable);
            for (name, lines) in replay.settled.drain(..) {
                progress.files.insert(name, lines);
                changed = true;
            }
            if changed {
                self.save_progress(&progress).await?;
            }
        }
        if replay.in_transaction {
            debug!("capture ends inside a transaction, waiting for its end");
        }
        Ok(replay.summary)
    }

    /// Replays new lines every `poll_interval` until cancelled.
    pub async fn follow<H>(
        &self,
        handler: &mut H,
        poll_interval: Duration,
        cancellation_token: CancellationToken,
    ) -> Result<CaptureSummary, SinkError>
    where
        H: StateChangeHandler + ?Sized,
    {
        let mut total = CaptureSummary::default();
        loop {
            let summary = self.run(&mut *handler).await?;
            total.lines += summary.lines;
            total.batches += summary.batches;
            total.entries += summary.entries;
            tokio::select! {
                _ = cancellation_token.cancelled() => break,
                _ = tokio::time::sleep(poll_interval) => (),
            }
        }
        Ok(total)
    }
}

struct Replay<'a, H: ?Sized> {
    handler: &'a mut H,
    batch_bytes: usize,
    pending: PendingBatch,
    in_transaction: bool,
    /// Files read to their end inside the open transaction, with their line counts.
    carried: Vec<(String, u64)>,
    /// Carried files whose transaction ended.
    settled: Vec<(String, u64)>,
    summary: CaptureSummary,
}

impl<H> Replay<'_, H>
where
    H: StateChangeHandler + ?Sized,
{
    async fn flush(&mut self) -> Result<(), SinkError> {
        let batch = self.pending.take();
        if batch.is_empty() {
            return Ok(());
        }
        self.handler.handle_entry_batch(&batch).await?;
        self.summary.batches += 1;
        self.summary.entries += batch.len() as u64;
        Ok(())
    }

    /// Replays the lines of `path` after the first `consumed` ones and returns the
    /// number of lines whose effects are durable.
    async fn replay_file(
        &mut self,
        name: &str,
        path: &Path,
        consumed: u64,
    ) -> Result<u64, SinkError> {
        let file = fs_err::tokio::File::open(path).await?;
        let mut reader = BufReader::new(file);
        let mut line = String::new();
        let mut number = 0;
        let mut durable = consumed;
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 || !line.ends_with('\n') {
                break;
            }
            number += 1;
            if number <= consumed {
                continue;
            }
            let record = match serde_json::from_str::<CaptureRecord>(line.trim_end()) {
                Ok(record) => record,
                Err(source) => {
                    error!(path = %path.display(), line = number, "malformed capture record");
                    return Err(source.into());
                }
            };
            self.summary.lines += 1;
            let opens_transaction = record == CaptureRecord::Begin && !self.in_transaction;
            self.apply(record).await?;
            if opens_transaction {
                durable = number - 1;
            } else if !self.in_transaction && self.pending.entries.is_empty() {
                durable = number;
            }
        }
        if self.in_transaction {
            self.carried.push((name.to_string(), number.max(consumed)));
        } else {
            self.flush().await?;
            durable = number.max(consumed);
        }
        Ok(durable)
    }

    async fn apply(&mut self, record: CaptureRecord) -> Result<(), SinkError> {
        match record {
            CaptureRecord::Entry(entry) => {
                if !self.pending.accepts(&entry, self.batch_bytes) {
                    self.flush().await?;
                }
                self.pending.push(entry);
            }
            CaptureRecord::SyncEvent(SyncEvent::Start) => {
                debug!("ignoring a captured start event")
            }
            CaptureRecord::SyncEvent(event) => {
                self.flush().await?;
                self.handler.handle_sync_event(event).await?;
            }
            CaptureRecord::Begin => {
                self.flush().await?;
                self.handler.begin_transaction().await?;
                self.in_transaction = true;
            }
            CaptureRecord::Commit => {
                self.flush().await?;
                self.handler.commit_transaction().await?;
                self.end_transaction();
            }
            CaptureRecord::Rollback => {
                let dropped = self.pending.take();
                if !dropped.is_empty() {
                    debug!(entries = dropped.len(), "dropping entries of a rolled back transaction");
                }
                self.handler.rollback_transaction().await?;
                self.end_transaction();
            }
        }
        Ok(())
    }

    fn end_transaction(&mut self) {
        self.in_transaction = false;
        self.settled.append(&mut self.carried);
    }
}

#[cfg(test)]
#[path = "unit_tests/capture_tests.rs"]
mod unit_tests;
