// This file is part of midnight-rhs.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The algebraic hash every tree participant is addressed by.

pub use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonError, PoseidonHasher};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Debug, Display, Formatter};
use thiserror::Error;

/// The number of bytes in a [`Hash`].
pub const HASH_BYTES: usize = 32;

/// A BN254 scalar field element in canonical little-endian bytes.
///
/// Node hashes, child hashes, tree keys and leaf values are all the same
/// 32-byte shape; only their position in a node distinguishes them. On the
/// wire a hash is a lowercase 64-character hex string.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash(pub [u8; HASH_BYTES]);

/// The all-zero hash, reserved for the empty subtree.
pub const HASH_ZERO: Hash = Hash([0u8; HASH_BYTES]);

impl Hash {
    /// The all-zero hash, reserved for the empty subtree.
    pub const ZERO: Hash = HASH_ZERO;

    /// The field element one, used as the trailing tag of leaf nodes.
    pub const ONE: Hash = {
        let mut bytes = [0u8; HASH_BYTES];
        bytes[0] = 1;
        Hash(bytes)
    };

    /// Whether this is the empty-subtree marker.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// The bytes interpreted modulo the field order.
    pub fn to_fr(&self) -> Fr {
        Fr::from_le_bytes_mod_order(&self.0)
    }

    /// The canonical little-endian encoding of a field element.
    pub fn from_fr(fr: &Fr) -> Self {
        let bytes = fr.into_bigint().to_bytes_le();
        let mut out = [0u8; HASH_BYTES];
        out[..bytes.len()].copy_from_slice(&bytes);
        Hash(out)
    }

    /// Decodes a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, HashParseError> {
        if s.len() != HASH_BYTES * 2 {
            return Err(HashParseError::BadLength(s.len()));
        }
        let mut out = [0u8; HASH_BYTES];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Hash(out))
    }

    /// The lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The `depth`-th least significant bit of the little-endian byte array.
    ///
    /// Bit 0 selects between the root's children; 0 descends left.
    pub fn bit(&self, depth: usize) -> bool {
        debug_assert!(depth < HASH_BYTES * 8);
        (self.0[depth / 8] >> (depth % 8)) & 1 == 1
    }
}

impl From<u64> for Hash {
    fn from(value: u64) -> Self {
        let mut bytes = [0u8; HASH_BYTES];
        bytes[..8].copy_from_slice(&value.to_le_bytes());
        Hash(bytes)
    }
}

impl Display for Hash {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(formatter, "{}", self.to_hex())
    }
}

impl Debug for Hash {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(formatter, "{}", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Failure to read a hash from its hex form.
#[derive(Debug, Error)]
pub enum HashParseError {
    /// The input is not exactly 64 characters.
    #[error("length of hash should be 64, got {0}")]
    BadLength(usize),
    /// The input contains non-hex characters.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
}

/// Poseidon over a non-empty sequence of field elements, with the circom
/// parameter set. Errors on arities the parameter set does not cover.
pub fn poseidon_hash(elems: &[Fr]) -> Result<Fr, PoseidonError> {
    Poseidon::<Fr>::new_circom(elems.len())?.hash(elems)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn hex_round_trip() {
        let h =
            Hash::from_hex("2c32381aebce52c0c5c5a1fb92e726f66d977b58a1c8a0c14bb31ef968187325")
                .unwrap();
        assert_eq!(
            h.to_hex(),
            "2c32381aebce52c0c5c5a1fb92e726f66d977b58a1c8a0c14bb31ef968187325"
        );
    }

    #[test]
    fn hex_rejects_bad_input() {
        assert!(matches!(
            Hash::from_hex("2c32"),
            Err(HashParseError::BadLength(4))
        ));
        let not_hex = "zz32381aebce52c0c5c5a1fb92e726f66d977b58a1c8a0c14bb31ef968187325";
        assert!(matches!(Hash::from_hex(not_hex), Err(HashParseError::Hex(_))));
    }

    #[test]
    fn field_round_trip() {
        let fr = Fr::from_str(
            "16938931282012536952003457515784019977456394464750325752202529629073057526316",
        )
        .unwrap();
        assert_eq!(Hash::from_fr(&fr).to_fr(), fr);
    }

    #[test]
    fn from_u64_is_little_endian() {
        let h = Hash::from(0xb807_04bb_7b4d_7c03u64);
        assert_eq!(
            h.to_hex(),
            "037c4d7bbb0407b8000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn bit_addressing() {
        // 5 = 0b101: bits 0 and 2 set.
        let h = Hash::from(5u64);
        assert!(h.bit(0));
        assert!(!h.bit(1));
        assert!(h.bit(2));
        assert!(!h.bit(8));
        // Bit 8 is the low bit of the second byte.
        let h = Hash::from(256u64);
        assert!(!h.bit(0));
        assert!(h.bit(8));
    }

    #[test]
    fn one_is_the_field_one() {
        assert_eq!(Hash::ONE.to_fr(), Fr::from(1u64));
        assert_eq!(Hash::from(1u64), Hash::ONE);
    }
}
