// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The destination tables.

use deso_base::transaction::TxnType;

use super::{Column, ColumnType::*, Partitioning, Table, NATURAL_KEY};

const fn key() -> Column {
    Column::new(NATURAL_KEY, Bytes)
}

const fn table(name: &'static str, columns: &'static [Column]) -> Table {
    Table {
        name,
        columns,
        primary_key: &[NATURAL_KEY],
        unique: &[],
        coalesce_on_conflict: &[],
        indexes: &[],
        partitioning: None,
    }
}

pub static PKID: Table = Table {
    indexes: &[&["public_key"]],
    ..table(
        "pkid_entry",
        &[
            Column::new("pkid", Text),
            Column::new("public_key", PublicKey),
            key(),
        ],
    )
};

pub static DESO_BALANCE: Table = table(
    "deso_balance_entry",
    &[
        Column::new("public_key", PublicKey),
        Column::new("balance_nanos", BigInt),
        key(),
    ],
);

pub static DERIVED_KEY: Table = Table {
    indexes: &[&["owner_public_key"]],
    ..table(
        "derived_key_entry",
        &[
            Column::new("owner_public_key", PublicKey),
            Column::new("derived_public_key", PublicKey),
            Column::new("expiration_block", BigInt),
            Column::new("operation_type", SmallInt),
            Column::new("extra_data", Json),
            Column::new("transaction_spending_limit_tracker", Json).nullable(),
            Column::new("transaction_spending_limit_bytes", Bytes).nullable(),
            Column::new("global_deso_limit", BigInt).nullable(),
            Column::new("is_unlimited", Bool).nullable(),
            key(),
        ],
    )
};

pub static PROFILE: Table = Table {
    primary_key: &["public_key"],
    indexes: &[&["username"], &[NATURAL_KEY]],
    ..table(
        "profile_entry",
        &[
            Column::new("public_key", PublicKey),
            Column::new("pkid", Text),
            Column::new("username", Text),
            Column::new("description", Text),
            Column::new("profile_pic", Bytes),
            Column::new("is_hidden", Bool),
            Column::new("creator_basis_points", BigInt),
            Column::new("coin_watermark_nanos", BigInt),
            Column::new("minting_disabled", Bool),
            Column::new("deso_locked_nanos", BigInt),
            Column::new("cc_coins_in_circulation_nanos", Numeric),
            Column::new("number_of_holders", BigInt),
            Column::new("dao_coins_in_circulation_nanos_hex", Text),
            Column::new("dao_coin_number_of_holders", BigInt),
            Column::new("dao_coin_minting_disabled", Bool),
            Column::new("dao_coin_transfer_restriction_status", SmallInt),
            Column::new("extra_data", Json),
            key(),
            Column::new("dao_coins_in_circulation_nanos_numeric", Numeric)
                .generated("hex_to_numeric(dao_coins_in_circulation_nanos_hex)"),
        ],
    )
};

pub static POST: Table = Table {
    primary_key: &["post_hash"],
    indexes: &[&["poster_public_key"], &["parent_post_hash"], &[NATURAL_KEY]],
    ..table(
        "post_entry",
        &[
            Column::new("post_hash", Text),
            Column::new("poster_public_key", PublicKey),
            Column::new("parent_post_hash", Text).nullable(),
            Column::new("body", Text),
            Column::new("image_urls", TextArray),
            Column::new("video_urls", TextArray),
            Column::new("reposted_post_hash", Text).nullable(),
            Column::new("quoted_repost", Bool),
            Column::new("timestamp", Timestamp),
            Column::new("hidden", Bool),
            Column::new("like_count", BigInt),
            Column::new("repost_count", BigInt),
            Column::new("quote_repost_count", BigInt),
            Column::new("diamond_count", BigInt),
            Column::new("comment_count", BigInt),
            Column::new("pinned", Bool),
            Column::new("is_nft", Bool),
            Column::new("num_nft_copies", BigInt),
            Column::new("num_nft_copies_for_sale", BigInt),
            Column::new("num_nft_copies_burned", BigInt),
            Column::new("has_unlockable", Bool),
            Column::new("creator_royalty_basis_points", BigInt),
            Column::new("coin_royalty_basis_points", BigInt),
            Column::new("additional_nft_royalties_to_coins_basis_points", Json),
            Column::new("additional_nft_royalties_to_creators_basis_points", Json),
            Column::new("extra_data", Json),
            Column::new("is_frozen", Bool),
            key(),
        ],
    )
};

pub static LIKE: Table = Table {
    indexes: &[&["post_hash"]],
    ..table(
        "like_entry",
        &[
            Column::new("public_key", PublicKey),
            Column::new("post_hash", Text),
            key(),
        ],
    )
};

pub static DIAMOND: Table = Table {
    indexes: &[&["post_hash"]],
    ..table(
        "diamond_entry",
        &[
            Column::new("sender_pkid", Text),
            Column::new("receiver_pkid", Text),
            Column::new("post_hash", Text),
            Column::new("diamond_level", SmallInt),
            key(),
        ],
    )
};

pub static FOLLOW: Table = Table {
    indexes: &[&["follower_pkid"], &["followed_pkid"]],
    ..table(
        "follow_entry",
        &[
            Column::new("follower_pkid", Text),
            Column::new("followed_pkid", Text),
            key(),
        ],
    )
};

pub static MESSAGE: Table = table(
    "message_entry",
    &[
        Column::new("sender_public_key", PublicKey),
        Column::new("recipient_public_key", PublicKey),
        Column::new("encrypted_text", Bytes),
        Column::new("timestamp", Timestamp),
        Column::new("version", SmallInt),
        Column::new("sender_messaging_public_key", PublicKey).nullable(),
        Column::new("sender_messaging_group_key_name", Text),
        Column::new("recipient_messaging_public_key", PublicKey).nullable(),
        Column::new("recipient_messaging_group_key_name", Text),
        Column::new("extra_data", Json),
        key(),
    ],
);

pub static NEW_MESSAGE: Table = table(
    "new_message_entry",
    &[
        Column::new("sender_access_group_owner_public_key", PublicKey),
        Column::new("sender_access_group_key_name", Text),
        Column::new("sender_access_group_public_key", PublicKey),
        Column::new("recipient_access_group_owner_public_key", PublicKey),
        Column::new("recipient_access_group_key_name", Text),
        Column::new("recipient_access_group_public_key", PublicKey),
        Column::new("encrypted_text", Bytes),
        Column::new("timestamp", Timestamp),
        Column::new("is_group_chat", Bool),
        Column::new("extra_data", Json),
        key(),
    ],
);

pub static ACCESS_GROUP: Table = table(
    "access_group_entry",
    &[
        Column::new("access_group_owner_public_key", PublicKey),
        Column::new("access_group_key_name", Text),
        Column::new("access_group_public_key", PublicKey),
        Column::new("extra_data", Json),
        key(),
    ],
);

pub static ACCESS_GROUP_MEMBER: Table = table(
    "access_group_member_entry",
    &[
        Column::new("access_group_member_public_key", PublicKey),
        Column::new("access_group_owner_public_key", PublicKey),
        Column::new("access_group_key_name", Text),
        Column::new("access_group_member_key_name", Text),
        Column::new("encrypted_key", Bytes),
        Column::new("extra_data", Json),
        key(),
    ],
);

pub static USER_ASSOCIATION: Table = Table {
    indexes: &[&["association_type"], &["target_user_pkid"]],
    ..table(
        "user_association_entry",
        &[
            Column::new("association_id", Text),
            Column::new("transactor_pkid", Text),
            Column::new("target_user_pkid", Text),
            Column::new("app_pkid", Text),
            Column::new("association_type", Text),
            Column::new("association_value", Text),
            Column::new("extra_data", Json),
            Column::new("block_height", BigInt),
            key(),
        ],
    )
};

pub static POST_ASSOCIATION: Table = Table {
    indexes: &[&["association_type"], &["post_hash"]],
    ..table(
        "post_association_entry",
        &[
            Column::new("association_id", Text),
            Column::new("transactor_pkid", Text),
            Column::new("post_hash", Text),
            Column::new("app_pkid", Text),
            Column::new("association_type", Text),
            Column::new("association_value", Text),
            Column::new("extra_data", Json),
            Column::new("block_height", BigInt),
            key(),
        ],
    )
};

pub static NFT: Table = Table {
    indexes: &[&["nft_post_hash"], &["owner_pkid"]],
    ..table(
        "nft_entry",
        &[
            Column::new("last_owner_pkid", Text).nullable(),
            Column::new("owner_pkid", Text),
            Column::new("nft_post_hash", Text),
            Column::new("serial_number", BigInt),
            Column::new("is_for_sale", Bool),
            Column::new("min_bid_amount_nanos", BigInt),
            Column::new("unlockable_text", Text),
            Column::new("last_accepted_bid_amount_nanos", BigInt),
            Column::new("is_pending", Bool),
            Column::new("is_buy_now", Bool),
            Column::new("buy_now_price_nanos", BigInt),
            Column::new("extra_data", Json),
            key(),
        ],
    )
};

pub static NFT_BID: Table = Table {
    indexes: &[&["nft_post_hash"], &["bidder_pkid"]],
    ..table(
        "nft_bid_entry",
        &[
            Column::new("bidder_pkid", Text),
            Column::new("nft_post_hash", Text),
            Column::new("serial_number", BigInt),
            Column::new("bid_amount_nanos", BigInt),
            Column::new("accepted_block_height", BigInt).nullable(),
            key(),
        ],
    )
};

pub static BALANCE: Table = Table {
    indexes: &[&["hodler_pkid"], &["creator_pkid"]],
    ..table(
        "balance_entry",
        &[
            Column::new("hodler_pkid", Text),
            Column::new("creator_pkid", Text),
            Column::new("balance_nanos", Numeric),
            Column::new("has_purchased", Bool),
            Column::new("is_dao_coin", Bool),
            key(),
        ],
    )
};

pub static DAO_COIN_LIMIT_ORDER: Table = Table {
    indexes: &[
        &["transactor_pkid"],
        &["buying_dao_coin_creator_pkid", "selling_dao_coin_creator_pkid"],
    ],
    ..table(
        "dao_coin_limit_order_entry",
        &[
            Column::new("order_id", Text),
            Column::new("transactor_pkid", Text),
            Column::new("buying_dao_coin_creator_pkid", Text),
            Column::new("selling_dao_coin_creator_pkid", Text),
            Column::new("scaled_exchange_rate_hex", Text),
            Column::new("quantity_to_fill_base_units_hex", Text),
            Column::new("operation_type", SmallInt),
            Column::new("fill_type", SmallInt),
            Column::new("block_height", BigInt),
            Column::new("is_dao_coin_const", Bool).default_value("true"),
            key(),
            Column::new("scaled_exchange_rate_numeric", Numeric)
                .generated("hex_to_numeric(scaled_exchange_rate_hex)"),
            Column::new("quantity_to_fill_numeric", Numeric)
                .generated("hex_to_numeric(quantity_to_fill_base_units_hex)"),
        ],
    )
};

pub static VALIDATOR: Table = table(
    "validator_entry",
    &[
        Column::new("validator_pkid", Text),
        Column::new("domains", TextArray),
        Column::new("disable_delegated_stake", Bool),
        Column::new("delegated_stake_commission_basis_points", BigInt),
        Column::new("voting_public_key", Text),
        Column::new("voting_authorization", Text),
        Column::new("total_stake_amount_nanos", Numeric),
        Column::new("last_active_at_epoch_number", BigInt),
        Column::new("jailed_at_epoch_number", BigInt),
        Column::new("extra_data", Json),
        key(),
    ],
);

pub static SNAPSHOT_VALIDATOR: Table = Table {
    indexes: &[&["snapshot_at_epoch_number"]],
    ..table(
        "snapshot_validator_entry",
        &[
            Column::new("validator_pkid", Text),
            Column::new("domains", TextArray),
            Column::new("disable_delegated_stake", Bool),
            Column::new("delegated_stake_commission_basis_points", BigInt),
            Column::new("voting_public_key", Text),
            Column::new("voting_authorization", Text),
            Column::new("total_stake_amount_nanos", Numeric),
            Column::new("last_active_at_epoch_number", BigInt),
            Column::new("jailed_at_epoch_number", BigInt),
            Column::new("extra_data", Json),
            Column::new("snapshot_at_epoch_number", BigInt),
            key(),
        ],
    )
};

pub static STAKE: Table = Table {
    indexes: &[&["validator_pkid"], &["staker_pkid"]],
    ..table(
        "stake_entry",
        &[
            Column::new("staker_pkid", Text),
            Column::new("validator_pkid", Text),
            Column::new("reward_method", SmallInt),
            Column::new("stake_amount_nanos", Numeric),
            Column::new("extra_data", Json),
            key(),
        ],
    )
};

pub static LOCKED_STAKE: Table = table(
    "locked_stake_entry",
    &[
        Column::new("staker_pkid", Text),
        Column::new("validator_pkid", Text),
        Column::new("locked_amount_nanos", Numeric),
        Column::new("locked_at_epoch_number", BigInt),
        Column::new("extra_data", Json),
        key(),
    ],
);

pub static LOCKED_BALANCE: Table = Table {
    indexes: &[&["hodler_pkid"], &["profile_pkid"]],
    ..table(
        "locked_balance_entry",
        &[
            Column::new("hodler_pkid", Text),
            Column::new("profile_pkid", Text),
            Column::new("unlock_timestamp_nano_secs", BigInt),
            Column::new("vesting_end_timestamp_nano_secs", BigInt),
            Column::new("balance_base_units", Numeric),
            key(),
        ],
    )
};

pub static YIELD_CURVE_POINT: Table = table(
    "yield_curve_point",
    &[
        Column::new("profile_pkid", Text),
        Column::new("lockup_duration_nano_secs", BigInt),
        Column::new("lockup_yield_apy_basis_points", BigInt),
        key(),
    ],
);

pub static EPOCH: Table = Table {
    primary_key: &["epoch_number"],
    ..table(
        "epoch_entry",
        &[
            Column::new("epoch_number", BigInt),
            Column::new("initial_block_height", BigInt),
            Column::new("initial_view", BigInt),
            Column::new("final_block_height", BigInt),
            Column::new("initial_leader_index_offset", BigInt),
            Column::new("created_at_block_timestamp_nano_secs", BigInt),
            Column::new("snapshot_at_epoch_number", BigInt),
        ],
    )
};

pub static GLOBAL_PARAMS: Table = table(
    "global_params_entry",
    &[
        Column::new("usd_cents_per_bitcoin", BigInt),
        Column::new("create_profile_fee_nanos", BigInt),
        Column::new("create_nft_fee_nanos", BigInt),
        Column::new("max_copies_per_nft", BigInt),
        Column::new("minimum_network_fee_nanos_per_kb", BigInt),
        Column::new("max_nonce_expiration_block_height_offset", BigInt),
        Column::new("stake_lockup_epoch_duration", BigInt),
        Column::new("validator_jail_epoch_duration", BigInt),
        Column::new("leader_schedule_max_num_validators", BigInt),
        Column::new("validator_set_max_num_validators", BigInt),
        Column::new("staking_rewards_max_num_stakes", BigInt),
        Column::new("staking_rewards_apy_basis_points", BigInt),
        Column::new("epoch_duration_num_blocks", BigInt),
        Column::new("jail_inactive_validator_grace_period_epochs", BigInt),
        Column::new("maximum_vested_intersections_per_lockup_transaction", BigInt),
        Column::new("fee_bucket_growth_rate_basis_points", BigInt),
        Column::new("failing_transaction_bmf_multiplier_basis_points", BigInt),
        Column::new("block_timestamp_drift_nano_secs", BigInt),
        Column::new("mempool_max_size_bytes", BigInt),
        Column::new("mempool_fee_estimator_num_mempool_blocks", BigInt),
        Column::new("mempool_fee_estimator_num_past_blocks", BigInt),
        Column::new("mempool_congestion_factor_basis_points", BigInt),
        Column::new("mempool_priority_percentile_basis_points", BigInt),
        Column::new("past_blocks_congestion_factor_basis_points", BigInt),
        Column::new("past_blocks_priority_percentile_basis_points", BigInt),
        Column::new("max_block_size_bytes_pos", BigInt),
        Column::new("soft_max_block_size_bytes_pos", BigInt),
        Column::new("max_txn_size_bytes_pos", BigInt),
        Column::new("block_production_interval_milliseconds_pos", BigInt),
        Column::new("timeout_interval_milliseconds_pos", BigInt),
        key(),
    ],
);

pub static BLS_PUBLIC_KEY_PKID_PAIR: Table = table(
    "bls_public_key_pkid_pair_entry",
    &[
        Column::new("pkid", Text),
        Column::new("bls_public_key", Text),
        key(),
    ],
);

pub static BLS_PUBLIC_KEY_PKID_PAIR_SNAPSHOT: Table = Table {
    indexes: &[&["snapshot_at_epoch_number"]],
    ..table(
        "bls_public_key_pkid_pair_snapshot_entry",
        &[
            Column::new("pkid", Text),
            Column::new("bls_public_key", Text),
            Column::new("snapshot_at_epoch_number", BigInt),
            key(),
        ],
    )
};

pub static JAILED_HISTORY: Table = Table {
    primary_key: &[
        "validator_pkid",
        "jailed_at_epoch_number",
        "unjailed_at_epoch_number",
    ],
    ..table(
        "jailed_history_event",
        &[
            Column::new("validator_pkid", Text),
            Column::new("jailed_at_epoch_number", BigInt),
            Column::new("unjailed_at_epoch_number", BigInt),
        ],
    )
};

pub static LEADER_SCHEDULE: Table = Table {
    indexes: &[&["snapshot_at_epoch_number", "leader_index"]],
    ..table(
        "leader_schedule_entry",
        &[
            Column::new("validator_pkid", Text),
            Column::new("snapshot_at_epoch_number", BigInt),
            Column::new("leader_index", Int),
            key(),
        ],
    )
};

pub static BLOCK_SIGNER: Table = Table {
    primary_key: &["block_hash", "signer_index"],
    ..table(
        "block_signer",
        &[
            Column::new("block_hash", Text),
            Column::new("signer_index", BigInt),
        ],
    )
};

pub static STAKE_REWARD: Table = Table {
    primary_key: &["block_hash", "utxo_op_index"],
    indexes: &[&["staker_pkid"], &["validator_pkid"]],
    ..table(
        "stake_reward",
        &[
            Column::new("staker_pkid", Text),
            Column::new("validator_pkid", Text),
            Column::new("reward_method", SmallInt),
            Column::new("reward_nanos", BigInt),
            Column::new("is_validator_commission", Bool),
            Column::new("block_hash", Text),
            Column::new("utxo_op_index", BigInt),
        ],
    )
};

pub static BLOCK: Table = Table {
    primary_key: &["block_hash"],
    unique: &["height"],
    ..table(
        "block",
        &[
            Column::new("block_hash", Text),
            Column::new("prev_block_hash", Text),
            Column::new("txn_merkle_root", Text),
            Column::new("timestamp", Timestamp),
            Column::new("height", BigInt),
            Column::new("nonce", BigInt),
            Column::new("extra_nonce", BigInt),
            Column::new("block_version", BigInt),
            Column::new("proposer_voting_public_key", Text),
            Column::new("proposer_random_seed_signature", Text),
            Column::new("proposed_in_view", BigInt),
            Column::new("proposer_vote_partial_signature", Text),
            key(),
        ],
    )
};

/// The empty block hash of mempool transactions.
pub const MEMPOOL_BLOCK_HASH: &str = "";

fn transaction_partitions() -> Vec<(String, i64)> {
    TxnType::ALL
        .iter()
        .map(|txn_type| {
            (
                txn_type.name().to_ascii_lowercase(),
                i64::from(txn_type.as_u8()),
            )
        })
        .collect()
}

pub static TRANSACTION: Table = Table {
    primary_key: &["transaction_hash", "kind_tag"],
    coalesce_on_conflict: &["tx_index_metadata", "tx_index_basic_transfer_metadata"],
    indexes: &[
        &["block_hash", "index_in_block"],
        &["wrapper_transaction_hash"],
        &["public_key"],
        &["block_height"],
    ],
    partitioning: Some(Partitioning {
        column: "kind_tag",
        values: transaction_partitions,
    }),
    ..table(
        "transaction_partitioned",
        &[
            Column::new("transaction_hash", Text),
            Column::new("kind_tag", SmallInt),
            Column::new("block_hash", Text),
            Column::new("version", SmallInt),
            Column::new("inputs", Json),
            Column::new("outputs", Json),
            Column::new("fee_nanos", BigInt).nullable(),
            Column::new("nonce_expiration_block_height", BigInt).nullable(),
            Column::new("nonce_partial_id", BigInt).nullable(),
            Column::new("txn_meta", Json),
            Column::new("tx_index_metadata", Json).nullable(),
            Column::new("tx_index_basic_transfer_metadata", Json).nullable(),
            Column::new("txn_meta_bytes", Bytes),
            Column::new("txn_bytes", Bytes),
            Column::new("public_key", PublicKey).nullable(),
            Column::new("extra_data", Json),
            Column::new("signature", Bytes),
            Column::new("index_in_block", Int).nullable(),
            Column::new("block_height", BigInt),
            Column::new("timestamp", Timestamp).nullable(),
            Column::new("wrapper_transaction_hash", Text).nullable(),
            Column::new("index_in_wrapper_transaction", Int).nullable(),
            Column::new(NATURAL_KEY, Bytes).nullable(),
        ],
    )
};

/// The view unioning every transaction partition.
pub const TRANSACTION_VIEW: &str = "transaction";

pub static UTXO_OPERATION: Table = Table {
    primary_key: &["block_hash", "transaction_index", "utxo_op_index"],
    ..table(
        "utxo_operation",
        &[
            Column::new("block_hash", Text),
            Column::new("transaction_index", Int),
            Column::new("utxo_op_index", Int),
            Column::new("operation_type", Int),
            Column::new("amount_nanos", BigInt).nullable(),
            Column::new("public_key", PublicKey).nullable(),
            Column::new("operation", Json),
        ],
    )
};

pub static AFFECTED_PUBLIC_KEY: Table = Table {
    primary_key: &["public_key", "transaction_hash"],
    indexes: &[&["transaction_hash"]],
    ..table(
        "affected_public_key",
        &[
            Column::new("public_key", PublicKey),
            Column::new("transaction_hash", Text),
            Column::new("metadata", Text),
        ],
    )
};

/// Every public key referenced anywhere, maintained by triggers.
pub static PUBLIC_KEY: Table = Table {
    primary_key: &["public_key"],
    ..table("public_key", &[Column::new("public_key", Text)])
};

/// The PKID of every registered public key; defaults to the key itself.
pub static WALLET: Table = Table {
    primary_key: &["public_key"],
    indexes: &[&["pkid"]],
    ..table(
        "wallet",
        &[Column::new("public_key", Text), Column::new("pkid", Text)],
    )
};

pub static TRANSACTION_TYPE: Table = Table {
    primary_key: &["type"],
    ..table(
        "transaction_type",
        &[Column::new("type", SmallInt), Column::new("name", Text)],
    )
};

/// Every table, in creation order.
pub static ALL: &[&Table] = &[
    &PKID,
    &DESO_BALANCE,
    &DERIVED_KEY,
    &PROFILE,
    &POST,
    &LIKE,
    &DIAMOND,
    &FOLLOW,
    &MESSAGE,
    &NEW_MESSAGE,
    &ACCESS_GROUP,
    &ACCESS_GROUP_MEMBER,
    &USER_ASSOCIATION,
    &POST_ASSOCIATION,
    &NFT,
    &NFT_BID,
    &BALANCE,
    &DAO_COIN_LIMIT_ORDER,
    &VALIDATOR,
    &SNAPSHOT_VALIDATOR,
    &STAKE,
    &LOCKED_STAKE,
    &LOCKED_BALANCE,
    &YIELD_CURVE_POINT,
    &EPOCH,
    &GLOBAL_PARAMS,
    &BLS_PUBLIC_KEY_PKID_PAIR,
    &BLS_PUBLIC_KEY_PKID_PAIR_SNAPSHOT,
    &JAILED_HISTORY,
    &LEADER_SCHEDULE,
    &BLOCK_SIGNER,
    &STAKE_REWARD,
    &BLOCK,
    &TRANSACTION,
    &UTXO_OPERATION,
    &AFFECTED_PUBLIC_KEY,
    &PUBLIC_KEY,
    &WALLET,
    &TRANSACTION_TYPE,
];

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn test_table_names_are_unique_and_keys_exist() {
        let mut names = BTreeSet::new();
        for table in ALL {
            assert!(names.insert(table.name), "{} is listed twice", table.name);
            for column in table.primary_key.iter().chain(table.unique) {
                let column = table
                    .column(column)
                    .unwrap_or_else(|| panic!("{}.{column} is missing", table.name));
                assert!(column.is_insertable());
            }
            for columns in table.indexes {
                for column in *columns {
                    assert!(table.column(column).is_some(), "{}.{column}", table.name);
                }
            }
            for column in table.coalesce_on_conflict {
                assert!(table.column(column).is_some_and(|column| column.nullable));
            }
        }
    }

    #[test]
    fn test_transaction_partitions_cover_every_type() {
        let partitions = transaction_partitions();
        assert_eq!(partitions.len(), TxnType::ALL.len());
        assert!(partitions.contains(&("like".to_string(), 10)));
        assert!(partitions.contains(&("atomic_txns_wrapper".to_string(), 44)));
    }
}
