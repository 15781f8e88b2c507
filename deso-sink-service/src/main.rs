// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The `deso-sink` binary.

use std::{sync::Arc, time::Duration};

use anyhow::{Context as _, Result};
use deso_sink::{
    capture::CaptureConsumer,
    config::SinkConfig,
    db::{mirror::MirroredDatabase, postgres::PostgresDatabase, SinkDatabase},
    schema::migrations::{all_migrations, MigrationSet, Migrator, RetryPolicy},
    SinkEngine, StateChangeHandler as _,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod util;

/// Materializes the DeSo state-change stream into PostgreSQL.
#[derive(clap::Parser, Debug)]
#[command(name = "deso-sink", version, about)]
struct SinkOptions {
    #[command(flatten)]
    config: SinkConfig,

    #[command(subcommand)]
    command: Option<SinkCommand>,
}

#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
enum SinkCommand {
    /// Replays the captured stream into the store, following new captures until
    /// interrupted. This is the default.
    Run {
        /// Delay between two scans of the capture directory.
        #[arg(
            long = "poll-interval-ms",
            env = "POLL_INTERVAL_MS",
            default_value = "1000",
            value_parser = util::parse_millis
        )]
        poll_interval: Duration,
    },

    /// Applies the pending migrations and exits.
    Migrate {
        /// Reverts every applied migration first.
        #[arg(long)]
        reset: bool,

        /// Also applies the migrations normally run at the end of the bulk sync.
        #[arg(long)]
        post_bulk: bool,
    },

    /// Prints the SQL of every migration, in application order.
    Schema,
}

impl Default for SinkCommand {
    fn default() -> Self {
        SinkCommand::Run {
            poll_interval: Duration::from_secs(1),
        }
    }
}

fn main() -> Result<()> {
    deso_base::tracing::init("deso-sink");
    let options = <SinkOptions as clap::Parser>::parse();
    options.run()
}

impl SinkOptions {
    fn run(self) -> Result<()> {
        let command = self.command.clone().unwrap_or_default();
        if command == SinkCommand::Schema {
            for migration in all_migrations() {
                println!("-- {}\n{}", migration.name, migration.up);
            }
            return Ok(());
        }
        if self.config.datadog_profiler {
            warn!("the Datadog profiler is not available in this build, ignoring it");
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .thread_name("deso-sink-worker")
            .worker_threads(self.config.thread_limit.max(1))
            .enable_all()
            .build()?;

        runtime.block_on(async move {
            let database = connect(&self.config).await?;
            match command {
                SinkCommand::Run { poll_interval } => {
                    run(&self.config, database, poll_interval).await
                }
                SinkCommand::Migrate { reset, post_bulk } => {
                    migrate(database.as_ref(), reset, post_bulk).await
                }
                SinkCommand::Schema => Ok(()),
            }
        })
    }
}

async fn connect(config: &SinkConfig) -> Result<Arc<dyn SinkDatabase>> {
    let primary = PostgresDatabase::connect(config.connect_options(), config.max_connections)
        .await
        .with_context(|| format!("failed to connect to {}:{}", config.db_host, config.db_port))?;
    info!(host = %config.db_host, database = %config.db_name, "connected to the store");
    let Some(options) = config.sub_connect_options() else {
        return Ok(Arc::new(primary));
    };
    let secondary = PostgresDatabase::connect(options, config.max_connections)
        .await
        .context("failed to connect to the secondary store")?;
    info!(host = ?config.sub_db_host, "mirroring writes to a secondary store");
    Ok(Arc::new(MirroredDatabase::new(primary, secondary)))
}

async fn migrate(database: &dyn SinkDatabase, reset: bool, post_bulk: bool) -> Result<()> {
    let mut sets = vec![MigrationSet::Initial];
    if post_bulk {
        sets.push(MigrationSet::PostBulk);
    }
    let mut store = database.migration_store().await?;
    let applied = Migrator::new(RetryPolicy::default())
        .run(store.as_mut(), reset, &sets)
        .await?;
    info!(applied, reset, post_bulk, "migrations done");
    Ok(())
}

async fn run(
    config: &SinkConfig,
    database: Arc<dyn SinkDatabase>,
    poll_interval: Duration,
) -> Result<()> {
    let shutdown_notifier = CancellationToken::new();
    tokio::spawn(util::listen_for_shutdown_signals(shutdown_notifier.clone()));

    let mut engine = SinkEngine::new(database, config.network_params())
        .with_sync_options(config.sync_options())
        .with_mempool(config.sync_mempool);
    let consumer = CaptureConsumer::new(
        &config.state_change_dir,
        &config.consumer_progress_dir,
        config.batch_bytes,
    );
    info!(
        state_change_dir = %config.state_change_dir.display(),
        network = ?engine.params().network,
        sync_mempool = config.sync_mempool,
        "following the state-change capture"
    );

    let result = consumer
        .follow(&mut engine, poll_interval, shutdown_notifier)
        .await;
    if result.is_err() {
        if let Err(error) = engine.rollback_transaction().await {
            error!(%error, "failed to roll back the open transaction");
        }
    }
    engine.shutdown().await;
    let summary = result?;
    info!(
        lines = summary.lines,
        batches = summary.batches,
        entries = summary.entries,
        "sink stopped"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;
    use test_case::test_case;

    use super::*;

    fn parse(args: &[&str]) -> SinkOptions {
        SinkOptions::try_parse_from(std::iter::once("deso-sink").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_run_is_the_default_command() {
        let options = parse(&["--batch-bytes", "10"]);
        assert_eq!(options.config.batch_bytes, 10);
        assert_eq!(options.command.unwrap_or_default(), SinkCommand::default());
    }

    #[test_case(&["migrate"], false, false ; "initial")]
    #[test_case(&["migrate", "--reset"], true, false ; "reset")]
    #[test_case(&["migrate", "--post-bulk"], false, true ; "post bulk")]
    fn test_migrate_flags(args: &[&str], reset: bool, post_bulk: bool) {
        assert_eq!(
            parse(args).command,
            Some(SinkCommand::Migrate { reset, post_bulk })
        );
    }

    #[test]
    fn test_poll_interval_is_in_milliseconds() {
        assert_eq!(
            parse(&["run", "--poll-interval-ms", "250"]).command,
            Some(SinkCommand::Run {
                poll_interval: Duration::from_millis(250)
            })
        );
    }
}
