// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Command-line and environment configuration of a sink.

use std::{path::PathBuf, time::Duration};

use deso_base::network::NetworkParams;
use log::LevelFilter;
use sqlx::{postgres::PgConnectOptions, ConnectOptions as _};

use crate::{schema::migrations::RetryPolicy, sync::SyncOptions};

/// Statements slower than this are logged as warnings.
const SLOW_STATEMENT_THRESHOLD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, clap::Args)]
pub struct SinkConfig {
    /// Host of the PostgreSQL store.
    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    #[arg(long, env = "DB_PORT", default_value = "5432")]
    pub db_port: u16,

    #[arg(long, env = "DB_USERNAME", default_value = "postgres")]
    pub db_username: String,

    #[arg(long, env = "DB_PASSWORD", default_value = "postgres", hide_env_values = true)]
    pub db_password: String,

    #[arg(long, env = "DB_NAME", default_value = "postgres")]
    pub db_name: String,

    /// Host of an optional secondary store receiving every write.
    #[arg(long, env = "SUB_DB_HOST")]
    pub sub_db_host: Option<String>,

    #[arg(long, env = "SUB_DB_PORT", default_value = "5432")]
    pub sub_db_port: u16,

    #[arg(long, env = "SUB_DB_USERNAME", default_value = "postgres")]
    pub sub_db_username: String,

    #[arg(
        long,
        env = "SUB_DB_PASSWORD",
        default_value = "postgres",
        hide_env_values = true
    )]
    pub sub_db_password: String,

    #[arg(long, env = "SUB_DB_NAME", default_value = "postgres")]
    pub sub_db_name: String,

    /// Directory holding the captured state-change stream.
    #[arg(long, env = "STATE_CHANGE_DIR", default_value = "/state-changes")]
    pub state_change_dir: PathBuf,

    /// Directory holding the consumer checkpoint.
    #[arg(long, env = "CONSUMER_PROGRESS_DIR", default_value = "/consumer-progress")]
    pub consumer_progress_dir: PathBuf,

    /// Upper bound on the encoder bytes of a batch.
    #[arg(long, env = "BATCH_BYTES", default_value = "5000000")]
    pub batch_bytes: usize,

    /// Number of Tokio worker threads.
    #[arg(long, env = "THREAD_LIMIT", default_value = "25")]
    pub thread_limit: usize,

    /// Logs every statement at the `INFO` level.
    #[arg(long, env = "LOG_QUERIES")]
    pub log_queries: bool,

    /// Keeps the statistics views fresh after bulk sync.
    #[arg(long, env = "CALCULATE_EXPLORER_STATISTICS")]
    pub calculate_explorer_statistics: bool,

    /// Accepted for compatibility. No profiler is linked in.
    #[arg(long, env = "DATADOG_PROFILER")]
    pub datadog_profiler: bool,

    #[arg(long, env = "IS_TESTNET")]
    pub is_testnet: bool,

    #[arg(long, env = "REGTEST")]
    pub regtest: bool,

    #[arg(long, env = "ACCELERATED_REGTEST")]
    pub accelerated_regtest: bool,

    /// Materializes mempool transactions too.
    #[arg(long, env = "SYNC_MEMPOOL")]
    pub sync_mempool: bool,

    /// Provisions a `readonly` role with this password after bulk sync.
    #[arg(long, env = "READONLY_USER_PASSWORD", hide_env_values = true)]
    pub readonly_user_password: Option<String>,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value = "32")]
    pub max_connections: u32,

    /// Idle connections kept once the bulk sync is over.
    #[arg(long, env = "DB_IDLE_CONNECTIONS_AFTER_SYNC", default_value = "2")]
    pub idle_connections_after_sync: u32,

    #[arg(long, env = "STATISTICS_REFRESH_INTERVAL_SECS", default_value = "300")]
    pub statistics_refresh_interval_secs: u64,
}

impl SinkConfig {
    pub fn network_params(&self) -> NetworkParams {
        if self.accelerated_regtest {
            NetworkParams::regtest(true)
        } else if self.regtest {
            NetworkParams::regtest(false)
        } else if self.is_testnet {
            NetworkParams::testnet()
        } else {
            NetworkParams::mainnet()
        }
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        self.statement_logging(
            PgConnectOptions::new()
                .host(&self.db_host)
                .port(self.db_port)
                .username(&self.db_username)
                .password(&self.db_password)
                .database(&self.db_name),
        )
    }

    /// The options of the secondary store, if one is configured.
    pub fn sub_connect_options(&self) -> Option<PgConnectOptions> {
        let host = self.sub_db_host.as_deref()?;
        Some(
            self.statement_logging(
                PgConnectOptions::new()
                    .host(host)
                    .port(self.sub_db_port)
                    .username(&self.sub_db_username)
                    .password(&self.sub_db_password)
                    .database(&self.sub_db_name),
            ),
        )
    }

    fn statement_logging(&self, options: PgConnectOptions) -> PgConnectOptions {
        let level = if self.log_queries {
            LevelFilter::Info
        } else {
            LevelFilter::Trace
        };
        options
            .log_statements(level)
            .log_slow_statements(LevelFilter::Warn, SLOW_STATEMENT_THRESHOLD)
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            readonly_user_password: self.readonly_user_password.clone(),
            idle_connections_after_sync: self.idle_connections_after_sync,
            statistics_refresh_interval: self
                .calculate_explorer_statistics
                .then(|| Duration::from_secs(self.statistics_refresh_interval_secs.max(1))),
            retry_policy: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use deso_base::network::{Network, MAINNET_PUBLIC_KEY_PREFIX, TESTNET_PUBLIC_KEY_PREFIX};

    use super::*;

    #[derive(Parser)]
    struct Command {
        #[command(flatten)]
        config: SinkConfig,
    }

    fn parse(args: &[&str]) -> SinkConfig {
        Command::try_parse_from(std::iter::once("deso-sink").chain(args.iter().copied()))
            .unwrap()
            .config
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.batch_bytes, 5_000_000);
        assert_eq!(config.thread_limit, 25);
        assert_eq!(config.db_port, 5432);
        assert!(config.sub_connect_options().is_none());
        assert!(!config.sync_mempool);
        assert_eq!(config.network_params().public_key_prefix, MAINNET_PUBLIC_KEY_PREFIX);
        assert_eq!(config.sync_options().statistics_refresh_interval, None);
    }

    #[test_case::test_case(&["--is-testnet"], Network::Testnet, false ; "testnet")]
    #[test_case::test_case(&["--regtest"], Network::Regtest, false ; "regtest")]
    #[test_case::test_case(&["--accelerated-regtest"], Network::Regtest, true ; "accelerated")]
    fn test_test_networks_share_a_prefix(args: &[&str], network: Network, accelerated: bool) {
        let params = parse(args).network_params();
        assert_eq!(params.network, network);
        assert_eq!(params.accelerated, accelerated);
        assert_eq!(params.public_key_prefix, TESTNET_PUBLIC_KEY_PREFIX);
    }

    #[test]
    fn test_explorer_statistics_enable_the_refresher() {
        let config = parse(&[
            "--calculate-explorer-statistics",
            "--statistics-refresh-interval-secs",
            "60",
            "--readonly-user-password",
            "secret",
        ]);
        let options = config.sync_options();
        assert_eq!(
            options.statistics_refresh_interval,
            Some(Duration::from_secs(60))
        );
        assert_eq!(options.readonly_user_password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_secondary_store_needs_a_host() {
        let config = parse(&["--sub-db-host", "mirror", "--sub-db-name", "replica"]);
        let options = config.sub_connect_options().unwrap();
        assert_eq!(options.get_host(), "mirror");
        assert_eq!(options.get_database(), Some("replica"));
    }
}
