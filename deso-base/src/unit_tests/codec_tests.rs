// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use assert_matches::assert_matches;
use proptest::prelude::*;
use test_case::test_case;

use super::*;

#[test_case(0, &[0x00]; "zero")]
#[test_case(127, &[0x7f]; "one byte")]
#[test_case(128, &[0x80, 0x01]; "two bytes")]
#[test_case(300, &[0xac, 0x02]; "three hundred")]
#[test_case(u64::MAX, &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]; "max")]
fn test_uvarint_layout(value: u64, expected: &[u8]) {
    let mut out = Vec::new();
    out.put_uvarint(value);
    assert_eq!(out, expected);
    let mut reader = Reader::new(&out);
    assert_eq!(reader.read_uvarint().unwrap(), value);
    reader.finish().unwrap();
}

#[test_case(0, &[0x00])]
#[test_case(-1, &[0x01])]
#[test_case(1, &[0x02])]
#[test_case(-64, &[0x7f])]
fn test_varint_zigzag(value: i64, expected: &[u8]) {
    let mut out = Vec::new();
    out.put_varint(value);
    assert_eq!(out, expected);
    assert_eq!(Reader::new(&out).read_varint().unwrap(), value);
}

#[test]
fn test_uvarint_overflow_is_rejected() {
    let bytes = [0xff; 11];
    assert_matches!(
        Reader::new(&bytes).read_uvarint(),
        Err(EncodingError::VarintOverflow)
    );
    let bytes = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02];
    assert_matches!(
        Reader::new(&bytes).read_uvarint(),
        Err(EncodingError::VarintOverflow)
    );
}

#[test]
fn test_truncated_input() {
    let mut out = Vec::new();
    out.put_var_bytes(b"hello");
    out.truncate(4);
    assert_matches!(
        Reader::new(&out).read_var_bytes(),
        Err(EncodingError::UnexpectedEof {
            needed: 5,
            remaining: 3
        })
    );
}

#[test]
fn test_trailing_bytes_are_reported() {
    let bytes = [0x01, 0x02];
    let mut reader = Reader::new(&bytes);
    reader.read_u8().unwrap();
    assert_matches!(reader.finish(), Err(EncodingError::TrailingBytes(1)));
}

#[test]
fn test_oversized_length_prefix() {
    let mut out = Vec::new();
    out.put_uvarint(MAX_VAR_BYTES_LENGTH + 1);
    assert_matches!(
        Reader::new(&out).read_var_bytes(),
        Err(EncodingError::LengthTooLarge(_))
    );
}

proptest! {
    #[test]
    fn test_any_uvarint_decodes_back(value in any::<u64>(), signed in any::<i64>()) {
        let mut out = Vec::new();
        out.put_uvarint(value);
        out.put_varint(signed);
        let mut reader = Reader::new(&out);
        prop_assert_eq!(reader.read_uvarint().unwrap(), value);
        prop_assert_eq!(reader.read_varint().unwrap(), signed);
        prop_assert!(reader.is_empty());
    }
}
