// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! First bytes of upstream state keys.
//!
//! Several encoders are stored under more than one prefix; the prefix is the only way
//! to tell the flavors apart.

pub const BLOCK_HASH_TO_BLOCK: u8 = 0;
pub const BLOCK_HASH_TO_UTXO_OPERATIONS: u8 = 9;
pub const PUBLIC_KEY_TIMESTAMP_TO_PRIVATE_MESSAGE: u8 = 12;
pub const POST_HASH_TO_POST: u8 = 17;
pub const PKID_TO_PROFILE: u8 = 23;
pub const FOLLOWER_PKID_TO_FOLLOWED_PKID: u8 = 28;
pub const LIKER_PUBLIC_KEY_TO_LIKED_POST_HASH: u8 = 30;
pub const HODLER_PKID_CREATOR_PKID_TO_BALANCE: u8 = 33;
pub const PUBLIC_KEY_TO_PKID: u8 = 36;
pub const MEMPOOL_TXN_HASH_TO_TXN: u8 = 38;
pub const GLOBAL_PARAMS: u8 = 40;
pub const DIAMOND_SENDER_RECEIVER_POST_HASH: u8 = 41;
pub const PUBLIC_KEY_TO_DESO_BALANCE: u8 = 52;
pub const POST_HASH_SERIAL_NUMBER_TO_NFT: u8 = 53;
pub const NFT_POST_HASH_SERIAL_BIDDER_TO_BID: u8 = 55;
pub const OWNER_DERIVED_KEY_TO_DERIVED_KEY: u8 = 59;
pub const HODLER_PKID_CREATOR_PKID_TO_DAO_COIN_BALANCE: u8 = 64;
pub const DAO_COIN_LIMIT_ORDER: u8 = 66;
pub const USER_ASSOCIATION_BY_ID: u8 = 72;
pub const POST_ASSOCIATION_BY_ID: u8 = 78;
pub const ACCESS_GROUP_ENTRY: u8 = 82;
pub const ACCESS_GROUP_MEMBER_ENTRY: u8 = 83;
pub const GROUP_CHAT_MESSAGES_INDEX: u8 = 86;
pub const DM_MESSAGES_INDEX: u8 = 87;
pub const VALIDATOR_BY_PKID: u8 = 89;
pub const STAKE_BY_VALIDATOR_AND_STAKER: u8 = 91;
pub const LOCKED_STAKE_BY_VALIDATOR_STAKER_EPOCH: u8 = 93;
pub const CURRENT_EPOCH: u8 = 95;
pub const SNAPSHOT_VALIDATOR_SET_BY_PKID: u8 = 97;
pub const SNAPSHOT_LEADER_SCHEDULE: u8 = 101;
pub const LOCKED_BALANCE_ENTRY: u8 = 103;
pub const LOCKUP_YIELD_CURVE_POINT: u8 = 104;
pub const VALIDATOR_BLS_PUBLIC_KEY_PKID_PAIR: u8 = 107;
pub const SNAPSHOT_VALIDATOR_BLS_PUBLIC_KEY_PKID_PAIR: u8 = 108;
pub const TXN_HASH_TO_UTXO_OPERATIONS: u8 = 109;

/// Length of the epoch number embedded after the prefix of snapshot keys.
pub const SNAPSHOT_EPOCH_LENGTH: usize = 8;
/// Length of the zero-padded access group key name inside access group keys.
pub const ACCESS_GROUP_KEY_NAME_LENGTH: usize = 32;
