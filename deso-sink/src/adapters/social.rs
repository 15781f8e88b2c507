// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use deso_base::{
    crypto::{Pkid, PublicKey},
    network::NetworkParams,
    prefixes::{ACCESS_GROUP_KEY_NAME_LENGTH, GROUP_CHAT_MESSAGES_INDEX},
    state_change::Encoder,
    text::lossy_string,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{
    address, expect_encoder, extra_data_json, hash_hex, key_slice, optional_address,
    pkid_address, text, AdapterError,
};
use crate::schema::{Row, SqlValue};

pub fn profile_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, Profile);
    // Profiles are keyed by PKID, which differs from the public key after a swap.
    let pkid = Pkid::from_slice(key_slice(key, 1..34)?).map_err(|_| AdapterError::KeyTooShort {
        needed: 34,
        actual: key.len(),
    })?;
    let creator_coin = &entry.creator_coin_entry;
    let dao_coin = &entry.dao_coin_entry;
    let mut row = Row::with_capacity(18);
    row.push(address(&entry.public_key, params));
    row.push(pkid_address(&pkid, params));
    row.push(text(&entry.username));
    row.push(text(&entry.description));
    row.push(entry.profile_pic.clone());
    row.push(entry.is_hidden);
    row.push(creator_coin.creator_basis_points);
    row.push(creator_coin.coin_watermark_nanos);
    row.push(creator_coin.minting_disabled);
    row.push(creator_coin.deso_locked_nanos);
    row.push(&creator_coin.coins_in_circulation_nanos);
    row.push(creator_coin.number_of_holders);
    row.push(dao_coin.coins_in_circulation_nanos.to_hex_string());
    row.push(dao_coin.number_of_holders);
    row.push(dao_coin.minting_disabled);
    row.push(dao_coin.transfer_restriction_status);
    row.push(extra_data_json(&entry.extra_data));
    row.push(key.to_vec());
    Ok(row)
}

/// The JSON document held in post bodies.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PostBody {
    #[serde(default)]
    body: String,
    #[serde(default, rename = "ImageURLs")]
    image_urls: Option<Vec<String>>,
    #[serde(default, rename = "VideoURLs")]
    video_urls: Option<Vec<String>>,
}

impl PostBody {
    /// Bodies that are not JSON documents are kept as plain text.
    fn parse(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap_or_else(|_| PostBody {
            body: lossy_string(bytes),
            ..PostBody::default()
        })
    }
}

fn royalties_json(royalties: &BTreeMap<Pkid, u64>, params: &NetworkParams) -> Value {
    Value::Object(
        royalties
            .iter()
            .map(|(pkid, basis_points)| (pkid.to_base58_check(params), Value::from(*basis_points)))
            .collect::<Map<_, _>>(),
    )
}

pub fn post_row(encoder: &Encoder, key: &[u8], params: &NetworkParams) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, Post);
    let body = PostBody::parse(&entry.body);
    let mut row = Row::with_capacity(28);
    row.push(hash_hex(&entry.post_hash));
    row.push(address(&entry.poster_public_key, params));
    row.push(if entry.parent_stake_id.is_empty() {
        SqlValue::Null
    } else {
        SqlValue::Text(hex::encode(&entry.parent_stake_id))
    });
    row.push(body.body);
    row.push(body.image_urls.unwrap_or_default());
    row.push(body.video_urls.unwrap_or_default());
    row.push(entry.reposted_post_hash.as_ref().map_or(SqlValue::Null, hash_hex));
    row.push(entry.is_quoted_repost);
    row.push(SqlValue::timestamp_nanos(entry.timestamp_nanos));
    row.push(entry.is_hidden);
    row.push(entry.like_count);
    row.push(entry.repost_count);
    row.push(entry.quote_repost_count);
    row.push(entry.diamond_count);
    row.push(entry.comment_count);
    row.push(entry.is_pinned);
    row.push(entry.is_nft);
    row.push(entry.num_nft_copies);
    row.push(entry.num_nft_copies_for_sale);
    row.push(entry.num_nft_copies_burned);
    row.push(entry.has_unlockable);
    row.push(entry.nft_royalty_to_creator_basis_points);
    row.push(entry.nft_royalty_to_coin_basis_points);
    row.push(royalties_json(
        &entry.additional_nft_royalties_to_coins_basis_points,
        params,
    ));
    row.push(royalties_json(
        &entry.additional_nft_royalties_to_creators_basis_points,
        params,
    ));
    row.push(extra_data_json(&entry.extra_data));
    row.push(entry.is_frozen);
    row.push(key.to_vec());
    Ok(row)
}

pub fn like_row(encoder: &Encoder, key: &[u8], params: &NetworkParams) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, Like);
    Ok(crate::row![
        address(&entry.liker_public_key, params),
        hash_hex(&entry.liked_post_hash),
        key.to_vec(),
    ])
}

pub fn diamond_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, Diamond);
    Ok(crate::row![
        pkid_address(&entry.sender_pkid, params),
        pkid_address(&entry.receiver_pkid, params),
        hash_hex(&entry.diamond_post_hash),
        entry.diamond_level,
        key.to_vec(),
    ])
}

pub fn follow_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, Follow);
    Ok(crate::row![
        pkid_address(&entry.follower_pkid, params),
        pkid_address(&entry.followed_pkid, params),
        key.to_vec(),
    ])
}

pub fn message_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, Message);
    let mut row = Row::with_capacity(11);
    row.push(address(&entry.sender_public_key, params));
    row.push(address(&entry.recipient_public_key, params));
    row.push(entry.encrypted_text.clone());
    row.push(SqlValue::timestamp_nanos(entry.timestamp_nanos));
    row.push(entry.version);
    row.push(optional_address(
        entry.sender_messaging_public_key.as_ref(),
        params,
    ));
    row.push(text(&entry.sender_messaging_group_key_name));
    row.push(optional_address(
        entry.recipient_messaging_public_key.as_ref(),
        params,
    ));
    row.push(text(&entry.recipient_messaging_group_key_name));
    row.push(extra_data_json(&entry.extra_data));
    row.push(key.to_vec());
    Ok(row)
}

/// Group chat and direct message threads share the encoder and differ by key prefix.
pub fn new_message_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, NewMessage);
    let mut row = Row::with_capacity(11);
    row.push(address(&entry.sender_access_group_owner_public_key, params));
    row.push(text(&entry.sender_access_group_key_name));
    row.push(address(&entry.sender_access_group_public_key, params));
    row.push(address(&entry.recipient_access_group_owner_public_key, params));
    row.push(text(&entry.recipient_access_group_key_name));
    row.push(address(&entry.recipient_access_group_public_key, params));
    row.push(entry.encrypted_text.clone());
    row.push(SqlValue::timestamp_nanos(entry.timestamp_nanos));
    row.push(key.first() == Some(&GROUP_CHAT_MESSAGES_INDEX));
    row.push(extra_data_json(&entry.extra_data));
    row.push(key.to_vec());
    Ok(row)
}

pub fn access_group_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, AccessGroup);
    Ok(crate::row![
        address(&entry.access_group_owner_public_key, params),
        text(&entry.access_group_key_name),
        address(&entry.access_group_public_key, params),
        extra_data_json(&entry.extra_data),
        key.to_vec(),
    ])
}

/// Members do not carry their group: the owner key and the padded group name follow
/// the prefix byte of the key.
pub fn access_group_member_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, AccessGroupMember);
    let owner_end = 34;
    let owner = PublicKey::from_slice(key_slice(key, 1..owner_end)?)
        .map_err(|_| AdapterError::KeyTooShort {
            needed: owner_end,
            actual: key.len(),
        })?;
    let group_name = key_slice(key, owner_end..owner_end + ACCESS_GROUP_KEY_NAME_LENGTH)?;
    let mut row = Row::with_capacity(7);
    row.push(address(&entry.access_group_member_public_key, params));
    row.push(address(&owner, params));
    row.push(text(group_name));
    row.push(text(&entry.access_group_member_key_name));
    row.push(entry.encrypted_key.clone());
    row.push(extra_data_json(&entry.extra_data));
    row.push(key.to_vec());
    Ok(row)
}

pub fn user_association_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, UserAssociation);
    Ok(crate::row![
        hash_hex(&entry.association_id),
        pkid_address(&entry.transactor_pkid, params),
        pkid_address(&entry.target_user_pkid, params),
        pkid_address(&entry.app_pkid, params),
        text(&entry.association_type),
        text(&entry.association_value),
        extra_data_json(&entry.extra_data),
        entry.block_height,
        key.to_vec(),
    ])
}

pub fn post_association_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, PostAssociation);
    Ok(crate::row![
        hash_hex(&entry.association_id),
        pkid_address(&entry.transactor_pkid, params),
        hash_hex(&entry.post_hash),
        pkid_address(&entry.app_pkid, params),
        text(&entry.association_type),
        text(&entry.association_value),
        extra_data_json(&entry.extra_data),
        entry.block_height,
        key.to_vec(),
    ])
}
