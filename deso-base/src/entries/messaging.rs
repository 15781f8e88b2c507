// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::{crypto::PublicKey, data_types::ExtraData, text::utf8_lossy};

/// A legacy private message.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntry {
    pub sender_public_key: PublicKey,
    pub recipient_public_key: PublicKey,
    #[serde_as(as = "Hex")]
    pub encrypted_text: Vec<u8>,
    pub timestamp_nanos: u64,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub version: u8,
    #[serde(default)]
    pub sender_messaging_public_key: Option<PublicKey>,
    #[serde(default, with = "utf8_lossy")]
    pub sender_messaging_group_key_name: Vec<u8>,
    #[serde(default)]
    pub recipient_messaging_public_key: Option<PublicKey>,
    #[serde(default, with = "utf8_lossy")]
    pub recipient_messaging_group_key_name: Vec<u8>,
    #[serde(default)]
    #[serde_as(as = "BTreeMap<_, Hex>")]
    pub extra_data: ExtraData,
}

/// A direct or group-chat message addressed through access groups.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessageEntry {
    pub sender_access_group_owner_public_key: PublicKey,
    #[serde(with = "utf8_lossy")]
    pub sender_access_group_key_name: Vec<u8>,
    pub sender_access_group_public_key: PublicKey,
    pub recipient_access_group_owner_public_key: PublicKey,
    #[serde(with = "utf8_lossy")]
    pub recipient_access_group_key_name: Vec<u8>,
    pub recipient_access_group_public_key: PublicKey,
    #[serde_as(as = "Hex")]
    pub encrypted_text: Vec<u8>,
    pub timestamp_nanos: u64,
    #[serde(default)]
    #[serde_as(as = "BTreeMap<_, Hex>")]
    pub extra_data: ExtraData,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGroupEntry {
    pub access_group_owner_public_key: PublicKey,
    #[serde(with = "utf8_lossy")]
    pub access_group_key_name: Vec<u8>,
    pub access_group_public_key: PublicKey,
    #[serde(default)]
    #[serde_as(as = "BTreeMap<_, Hex>")]
    pub extra_data: ExtraData,
}

/// A member of an access group. The owner and group name live in the entry key.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGroupMemberEntry {
    pub access_group_member_public_key: PublicKey,
    #[serde(with = "utf8_lossy")]
    pub access_group_member_key_name: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub encrypted_key: Vec<u8>,
    #[serde(default)]
    #[serde_as(as = "BTreeMap<_, Hex>")]
    pub extra_data: ExtraData,
}
