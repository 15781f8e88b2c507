// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use deso_base::state_change::{Encoder, RecordKind};
use tempfile::TempDir;

use super::*;
use crate::{materializer::BatchSummary, test_utils::*};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Batch(RecordKind, usize),
    Event(SyncEvent),
    Begin,
    Commit,
    Rollback,
}

#[derive(Default)]
struct Recorder {
    calls: Vec<Call>,
}

#[async_trait]
impl StateChangeHandler for Recorder {
    async fn handle_entry_batch(
        &mut self,
        batch: &[StateChangeEntry],
    ) -> Result<BatchSummary, SinkError> {
        let kind = batch[0].kind().unwrap();
        self.calls.push(Call::Batch(kind, batch.len()));
        Ok(BatchSummary::default())
    }

    async fn handle_sync_event(&mut self, event: SyncEvent) -> Result<(), SinkError> {
        self.calls.push(Call::Event(event));
        Ok(())
    }

    async fn begin_transaction(&mut self) -> Result<(), SinkError> {
        self.calls.push(Call::Begin);
        Ok(())
    }

    async fn commit_transaction(&mut self) -> Result<(), SinkError> {
        self.calls.push(Call::Commit);
        Ok(())
    }

    async fn rollback_transaction(&mut self) -> Result<(), SinkError> {
        self.calls.push(Call::Rollback);
        Ok(())
    }
}

struct Capture {
    streams: TempDir,
    progress: TempDir,
}

impl Capture {
    fn new() -> Self {
        Self {
            streams: TempDir::new().unwrap(),
            progress: TempDir::new().unwrap(),
        }
    }

    fn consumer(&self, batch_bytes: usize) -> CaptureConsumer {
        CaptureConsumer::new(self.streams.path(), self.progress.path(), batch_bytes)
    }

    fn write(&self, name: &str, records: &[CaptureRecord]) {
        let mut contents = String::new();
        for record in records {
            contents.push_str(&serde_json::to_string(record).unwrap());
            contents.push('\n');
        }
        std::fs::write(self.streams.path().join(name), contents).unwrap();
    }
}

fn follow(follower: u8, followed: u8) -> CaptureRecord {
    CaptureRecord::Entry(
        upsert(
            follow_key(follower, followed),
            Encoder::Follow(follow_entry(follower, followed)),
        )
        .with_encoder_bytes(vec![0; 3]),
    )
}

fn unfollow(follower: u8, followed: u8) -> CaptureRecord {
    CaptureRecord::Entry(StateChangeEntry::delete(
        RecordKind::Follow,
        follow_key(follower, followed),
        1,
    ))
}

#[tokio::test]
async fn test_records_are_grouped_into_homogeneous_batches() {
    let capture = Capture::new();
    capture.write(
        "0001.jsonl",
        &[
            CaptureRecord::SyncEvent(SyncEvent::BulkSyncBegin),
            follow(1, 2),
            follow(1, 3),
            unfollow(1, 2),
            follow(1, 4),
            CaptureRecord::SyncEvent(SyncEvent::BulkSyncEnd),
        ],
    );
    let mut recorder = Recorder::default();
    let summary = capture.consumer(1_000).run(&mut recorder).await.unwrap();

    assert_eq!(
        recorder.calls,
        vec![
            Call::Event(SyncEvent::Start),
            Call::Event(SyncEvent::BulkSyncBegin),
            Call::Batch(RecordKind::Follow, 2),
            Call::Batch(RecordKind::Follow, 1),
            Call::Batch(RecordKind::Follow, 1),
            Call::Event(SyncEvent::BulkSyncEnd),
        ]
    );
    assert_eq!(
        summary,
        CaptureSummary {
            lines: 6,
            batches: 3,
            entries: 4,
        }
    );
}

#[tokio::test]
async fn test_batches_are_capped_by_encoder_bytes() {
    let capture = Capture::new();
    capture.write(
        "0001.jsonl",
        &[follow(1, 2), follow(1, 3), follow(1, 4), follow(1, 5), follow(1, 6)],
    );
    let mut recorder = Recorder::default();
    capture.consumer(6).run(&mut recorder).await.unwrap();
    assert_eq!(
        recorder.calls[1..],
        [
            Call::Batch(RecordKind::Follow, 2),
            Call::Batch(RecordKind::Follow, 2),
            Call::Batch(RecordKind::Follow, 1),
        ]
    );
}

#[tokio::test]
async fn test_restarts_resume_after_the_checkpoint() {
    let capture = Capture::new();
    capture.write("0001.jsonl", &[follow(1, 2)]);
    let consumer = capture.consumer(1_000);
    consumer.run(&mut Recorder::default()).await.unwrap();
    assert_eq!(
        consumer.load_progress().await.unwrap().unwrap().files["0001.jsonl"],
        1
    );

    capture.write("0002.jsonl", &[follow(3, 4), follow(3, 5)]);
    let mut recorder = Recorder::default();
    consumer.run(&mut recorder).await.unwrap();
    assert_eq!(recorder.calls, vec![Call::Batch(RecordKind::Follow, 2)]);
}

#[tokio::test]
async fn test_open_transactions_are_not_checkpointed() {
    let capture = Capture::new();
    capture.write(
        "0001.jsonl",
        &[follow(1, 2), CaptureRecord::Begin, follow(1, 3)],
    );
    let consumer = capture.consumer(1_000);
    consumer.run(&mut Recorder::default()).await.unwrap();
    assert_eq!(
        consumer.load_progress().await.unwrap().unwrap().files["0001.jsonl"],
        1
    );

    capture.write("0002.jsonl", &[follow(1, 4), CaptureRecord::Commit]);
    let mut recorder = Recorder::default();
    consumer.run(&mut recorder).await.unwrap();
    assert_eq!(
        recorder.calls,
        vec![
            Call::Begin,
            Call::Batch(RecordKind::Follow, 2),
            Call::Commit,
        ]
    );
    let progress = consumer.load_progress().await.unwrap().unwrap();
    assert_eq!(progress.files["0001.jsonl"], 3);
    assert_eq!(progress.files["0002.jsonl"], 2);
}

#[tokio::test]
async fn test_rollbacks_drop_pending_entries() {
    let capture = Capture::new();
    capture.write(
        "0001.jsonl",
        &[
            CaptureRecord::Begin,
            follow(1, 2),
            CaptureRecord::Rollback,
            follow(1, 3),
        ],
    );
    let mut recorder = Recorder::default();
    capture.consumer(1_000).run(&mut recorder).await.unwrap();
    assert_eq!(
        recorder.calls[1..],
        [
            Call::Begin,
            Call::Rollback,
            Call::Batch(RecordKind::Follow, 1),
        ]
    );
}

#[tokio::test]
async fn test_incomplete_lines_wait_for_their_end() {
    let capture = Capture::new();
    let line = serde_json::to_string(&follow(1, 2)).unwrap();
    let path = capture.streams.path().join("0001.jsonl");
    std::fs::write(&path, &line).unwrap();
    std::fs::write(capture.streams.path().join("notes.txt"), "ignored").unwrap();

    let consumer = capture.consumer(1_000);
    let summary = consumer.run(&mut Recorder::default()).await.unwrap();
    assert_eq!(summary.lines, 0);

    std::fs::write(&path, format!("{line}\n")).unwrap();
    let mut recorder = Recorder::default();
    let summary = consumer.run(&mut recorder).await.unwrap();
    assert_eq!(summary.lines, 1);
    assert_eq!(recorder.calls, vec![Call::Batch(RecordKind::Follow, 1)]);
}

#[tokio::test]
async fn test_malformed_records_stop_the_replay() {
    let capture = Capture::new();
    std::fs::write(capture.streams.path().join("0001.jsonl"), "{\"entry\": 5}\n").unwrap();
    assert!(matches!(
        capture.consumer(1_000).run(&mut Recorder::default()).await,
        Err(SinkError::Json(_))
    ));
}
