// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The per-kind destination descriptors.

use deso_base::{
    prefixes::SNAPSHOT_VALIDATOR_BLS_PUBLIC_KEY_PKID_PAIR, state_change::RecordKind,
};

use crate::{
    adapters::{self, Adapter, AdapterError, Route},
    schema::{tables, Table},
};

/// Where the rows of a kind land.
#[derive(Clone, Copy)]
pub enum Destination {
    Table(&'static Table),
    /// One encoder backing several tables, told apart by the key prefix.
    Routed(Route),
}

impl Destination {
    pub fn table_for(&self, key: &[u8]) -> Result<&'static Table, AdapterError> {
        match self {
            Destination::Table(table) => Ok(table),
            Destination::Routed(route) => route(key),
        }
    }
}

/// Which entries of a kind are filtered through the entry cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    Off,
    All,
    /// Only entries whose key starts with the given prefix.
    Prefix(u8),
}

impl CachePolicy {
    pub fn applies_to(&self, key: &[u8]) -> bool {
        match self {
            CachePolicy::Off => false,
            CachePolicy::All => true,
            CachePolicy::Prefix(prefix) => key.first() == Some(prefix),
        }
    }
}

/// How the generic materializer handles a kind.
#[derive(Clone, Copy)]
pub struct Descriptor {
    pub kind: RecordKind,
    pub destination: Destination,
    pub adapter: Adapter,
    pub cache: CachePolicy,
}

/// How a batch of a kind is materialized.
#[derive(Clone, Copy)]
pub enum Handling {
    Rows(Descriptor),
    Block,
    MempoolTransaction,
    UtxoOperationBundle,
}

const fn rows(kind: RecordKind, table: &'static Table, adapter: Adapter) -> Handling {
    Handling::Rows(Descriptor {
        kind,
        destination: Destination::Table(table),
        adapter,
        cache: CachePolicy::Off,
    })
}

const fn routed(kind: RecordKind, route: Route, adapter: Adapter, cache: CachePolicy) -> Handling {
    Handling::Rows(Descriptor {
        kind,
        destination: Destination::Routed(route),
        adapter,
        cache,
    })
}

pub fn handling(kind: RecordKind) -> Handling {
    use RecordKind::*;
    match kind {
        UtxoOperationBundle => Handling::UtxoOperationBundle,
        Block => Handling::Block,
        Transaction => Handling::MempoolTransaction,
        Message => rows(kind, &tables::MESSAGE, adapters::message_row),
        Like => rows(kind, &tables::LIKE, adapters::like_row),
        Nft => rows(kind, &tables::NFT, adapters::nft_row),
        NftBid => rows(kind, &tables::NFT_BID, adapters::nft_bid_row),
        DerivedKey => rows(kind, &tables::DERIVED_KEY, adapters::derived_key_row),
        Diamond => rows(kind, &tables::DIAMOND, adapters::diamond_row),
        GlobalParams => rows(kind, &tables::GLOBAL_PARAMS, adapters::global_params_row),
        Post => rows(kind, &tables::POST, adapters::post_row),
        Balance => rows(kind, &tables::BALANCE, adapters::balance_row),
        Pkid => rows(kind, &tables::PKID, adapters::pkid_row),
        Profile => rows(kind, &tables::PROFILE, adapters::profile_row),
        Follow => rows(kind, &tables::FOLLOW, adapters::follow_row),
        DesoBalance => rows(kind, &tables::DESO_BALANCE, adapters::deso_balance_row),
        DaoCoinLimitOrder => rows(
            kind,
            &tables::DAO_COIN_LIMIT_ORDER,
            adapters::dao_coin_limit_order_row,
        ),
        UserAssociation => rows(
            kind,
            &tables::USER_ASSOCIATION,
            adapters::user_association_row,
        ),
        PostAssociation => rows(
            kind,
            &tables::POST_ASSOCIATION,
            adapters::post_association_row,
        ),
        AccessGroup => rows(kind, &tables::ACCESS_GROUP, adapters::access_group_row),
        AccessGroupMember => rows(
            kind,
            &tables::ACCESS_GROUP_MEMBER,
            adapters::access_group_member_row,
        ),
        NewMessage => rows(kind, &tables::NEW_MESSAGE, adapters::new_message_row),
        Validator => routed(
            kind,
            adapters::validator_route,
            adapters::validator_row,
            CachePolicy::All,
        ),
        Stake => rows(kind, &tables::STAKE, adapters::stake_row),
        LockedStake => rows(kind, &tables::LOCKED_STAKE, adapters::locked_stake_row),
        Epoch => rows(kind, &tables::EPOCH, adapters::epoch_row),
        LockedBalance => rows(kind, &tables::LOCKED_BALANCE, adapters::locked_balance_row),
        LockupYieldCurvePoint => rows(
            kind,
            &tables::YIELD_CURVE_POINT,
            adapters::yield_curve_point_row,
        ),
        BlsPublicKeyPkidPair => routed(
            kind,
            adapters::bls_public_key_pkid_pair_route,
            adapters::bls_public_key_pkid_pair_row,
            CachePolicy::Prefix(SNAPSHOT_VALIDATOR_BLS_PUBLIC_KEY_PKID_PAIR),
        ),
        LeaderSchedule => rows(
            kind,
            &tables::LEADER_SCHEDULE,
            adapters::leader_schedule_row,
        ),
        AffectedPublicKey => rows(
            kind,
            &tables::AFFECTED_PUBLIC_KEY,
            adapters::affected_public_key_row,
        ),
    }
}
