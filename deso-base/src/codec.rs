// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Variable-length binary framing used by the upstream node encoders.
//!
//! Integers are written as unsigned LEB128 ("uvarint") or zig-zag signed varints,
//! byte strings as a uvarint length followed by the raw bytes.

use thiserror::Error;

/// The largest length prefix accepted for a single byte string.
pub const MAX_VAR_BYTES_LENGTH: u64 = 1 << 26;

/// The maximum number of bytes of a uvarint encoding a `u64`.
const MAX_UVARINT_LENGTH: usize = 10;

/// An error raised while encoding or decoding upstream bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("unexpected end of input: {needed} more bytes needed, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },
    #[error("uvarint overflows 64 bits")]
    VarintOverflow,
    #[error("length prefix {0} is too large")]
    LengthTooLarge(u64),
    #[error("{0} trailing bytes after the encoded value")]
    TrailingBytes(usize),
    #[error("unknown transaction type {0}")]
    UnknownTxnType(u64),
    #[error("expected {expected} bytes for {field}, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{field} is {length} bytes long, at most {max} are allowed")]
    FieldTooLong {
        field: &'static str,
        length: usize,
        max: usize,
    },
    #[error("invalid value {value} for {field}")]
    InvalidValue { field: &'static str, value: u64 },
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),
}

/// A cursor over encoded bytes.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// The number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread suffix of the input, without consuming it.
    pub fn rest(&self) -> &'a [u8] {
        &self.bytes[self.position..]
    }

    /// Fails if any bytes are left unread.
    pub fn finish(self) -> Result<(), EncodingError> {
        match self.remaining() {
            0 => Ok(()),
            count => Err(EncodingError::TrailingBytes(count)),
        }
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], EncodingError> {
        if count > self.remaining() {
            return Err(EncodingError::UnexpectedEof {
                needed: count,
                remaining: self.remaining(),
            });
        }
        let slice = &self.bytes[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], EncodingError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    pub fn read_u8(&mut self) -> Result<u8, EncodingError> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Reads a single byte, treating any non-zero value as `true`.
    pub fn read_bool(&mut self) -> Result<bool, EncodingError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16_be(&mut self) -> Result<u16, EncodingError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, EncodingError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64_be(&mut self) -> Result<u64, EncodingError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_uvarint(&mut self) -> Result<u64, EncodingError> {
        let mut value = 0u64;
        let mut shift = 0;
        for index in 0..MAX_UVARINT_LENGTH {
            let byte = self.read_u8()?;
            if byte < 0x80 {
                if index == MAX_UVARINT_LENGTH - 1 && byte > 1 {
                    return Err(EncodingError::VarintOverflow);
                }
                return Ok(value | (u64::from(byte) << shift));
            }
            value |= u64::from(byte & 0x7f) << shift;
            shift += 7;
        }
        Err(EncodingError::VarintOverflow)
    }

    /// Reads a uvarint that must fit in a `u32`.
    pub fn read_uvarint_u32(&mut self, field: &'static str) -> Result<u32, EncodingError> {
        let value = self.read_uvarint()?;
        u32::try_from(value).map_err(|_| EncodingError::InvalidValue { field, value })
    }

    /// Reads a zig-zag encoded signed varint.
    pub fn read_varint(&mut self) -> Result<i64, EncodingError> {
        let unsigned = self.read_uvarint()?;
        let value = (unsigned >> 1) as i64;
        Ok(if unsigned & 1 != 0 { !value } else { value })
    }

    /// Reads a uvarint length, checked against [`MAX_VAR_BYTES_LENGTH`].
    pub fn read_length(&mut self) -> Result<usize, EncodingError> {
        let length = self.read_uvarint()?;
        if length > MAX_VAR_BYTES_LENGTH {
            return Err(EncodingError::LengthTooLarge(length));
        }
        Ok(length as usize)
    }

    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, EncodingError> {
        let length = self.read_length()?;
        Ok(self.read_bytes(length)?.to_vec())
    }

    pub fn read_string(&mut self, field: &'static str) -> Result<String, EncodingError> {
        String::from_utf8(self.read_var_bytes()?).map_err(|_| EncodingError::InvalidUtf8(field))
    }

    /// Reads a uvarint element count followed by that many elements.
    pub fn read_vec<T>(
        &mut self,
        mut read_element: impl FnMut(&mut Self) -> Result<T, EncodingError>,
    ) -> Result<Vec<T>, EncodingError> {
        let count = self.read_length()?;
        // Each element takes at least one byte.
        let mut elements = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            elements.push(read_element(self)?);
        }
        Ok(elements)
    }

    /// Reads a presence flag followed by the value when present.
    pub fn read_option<T>(
        &mut self,
        read_value: impl FnOnce(&mut Self) -> Result<T, EncodingError>,
    ) -> Result<Option<T>, EncodingError> {
        if self.read_bool()? {
            Ok(Some(read_value(self)?))
        } else {
            Ok(None)
        }
    }
}

/// Writing counterpart of [`Reader`].
pub trait WriteExt {
    fn put_u8(&mut self, value: u8);
    fn put_bool(&mut self, value: bool);
    fn put_slice(&mut self, bytes: &[u8]);
    fn put_uvarint(&mut self, value: u64);
    fn put_varint(&mut self, value: i64);
    fn put_var_bytes(&mut self, bytes: &[u8]);
    fn put_u16_be(&mut self, value: u16);
    fn put_u32_be(&mut self, value: u32);
    fn put_u64_be(&mut self, value: u64);
}

impl WriteExt for Vec<u8> {
    fn put_u8(&mut self, value: u8) {
        self.push(value);
    }

    fn put_bool(&mut self, value: bool) {
        self.push(u8::from(value));
    }

    fn put_slice(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }

    fn put_uvarint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.push((value as u8) | 0x80);
            value >>= 7;
        }
        self.push(value as u8);
    }

    fn put_varint(&mut self, value: i64) {
        let mut unsigned = (value as u64) << 1;
        if value < 0 {
            unsigned = !unsigned;
        }
        self.put_uvarint(unsigned);
    }

    fn put_var_bytes(&mut self, bytes: &[u8]) {
        self.put_uvarint(bytes.len() as u64);
        self.extend_from_slice(bytes);
    }

    fn put_u16_be(&mut self, value: u16) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn put_u32_be(&mut self, value: u32) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn put_u64_be(&mut self, value: u64) {
        self.extend_from_slice(&value.to_be_bytes());
    }
}

/// A value with a canonical upstream byte encoding.
pub trait BinaryCodec: Sized {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError>;

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError>;

    fn to_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        let mut out = Vec::new();
        self.encode_to(&mut out)?;
        Ok(out)
    }

    /// Decodes a value that must span the whole input.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EncodingError> {
        let mut reader = Reader::new(bytes);
        let value = Self::decode_from(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }
}

#[cfg(test)]
#[path = "unit_tests/codec_tests.rs"]
mod unit_tests;
