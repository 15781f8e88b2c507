// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Serde adapters for byte strings that usually, but not always, hold text.

use serde::{Deserialize, Deserializer, Serializer};

/// Serializes bytes as a (lossy) UTF-8 string and reads them back verbatim.
pub mod utf8_lossy {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Ok(String::deserialize(deserializer)?.into_bytes())
    }
}

/// Same as [`utf8_lossy`] for lists of byte strings.
pub mod utf8_lossy_vec {
    use serde::ser::SerializeSeq as _;

    use super::*;

    pub fn serialize<S: Serializer>(values: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&String::from_utf8_lossy(value))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        Ok(strings.into_iter().map(String::into_bytes).collect())
    }
}

/// Decodes bytes as text, replacing invalid sequences and dropping NUL padding.
pub fn lossy_string(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|byte| *byte != 0)
        .map_or(0, |index| index + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::lossy_string;

    #[test]
    fn test_lossy_string_trims_padding() {
        assert_eq!(lossy_string(b"group\0\0\0"), "group");
        assert_eq!(lossy_string(&[0, 0]), "");
        assert_eq!(lossy_string(&[0x66, 0xff]), "f\u{fffd}");
    }
}
