//! Fixed-width big-endian `bytes32` encoding of unsigned integers, and the
//! [`TradeId`] newtype built on it.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;

use crate::error::{metadata, ClientError, Result};

/// Renders `value` as 32 big-endian bytes, left-padded with zeros.
///
/// ```text
/// encode_uint256(U256::from(100_000)) == [0, .., 0, 1, 134, 160]
/// ```
pub fn encode_uint256(value: U256) -> [u8; 32] {
    value.to_be_bytes::<32>()
}

/// Parses a base-10 integer string and encodes it with [`encode_uint256`].
///
/// Fails when the string is not a non-negative integer or does not fit in 256 bits.
pub fn encode_decimal_uint256(value: &str) -> Result<[u8; 32]> {
    let digits = value.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ClientError::invalid_param(
            "Amount is not a non-negative integer",
            metadata! { "value" => value },
        ));
    }
    let parsed = U256::from_str_radix(digits, 10).map_err(|_| {
        ClientError::invalid_param(
            "Amount does not fit in 256 bits",
            metadata! { "value" => value },
        )
    })?;
    Ok(encode_uint256(parsed))
}

/// Inverse of [`encode_uint256`]. Accepts up to 32 big-endian bytes.
pub fn decode_uint256_bytes(bytes: &[u8]) -> Result<U256> {
    U256::try_from_be_slice(bytes).ok_or_else(|| {
        ClientError::invalid_param(
            "Value does not fit in 256 bits",
            metadata! { "length" => bytes.len(), "maxLength" => 32 },
        )
    })
}

/// The 256-bit identifier binding a session, a solver and the trade terms.
///
/// Every per-trade account is derived from these bytes.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TradeId(pub [u8; 32]);

impl TradeId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_u256(&self) -> U256 {
        U256::from_be_bytes(self.0)
    }
}

impl From<[u8; 32]> for TradeId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<U256> for TradeId {
    fn from(value: U256) -> Self {
        Self(encode_uint256(value))
    }
}

impl AsRef<[u8]> for TradeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TradeId({self})")
    }
}

impl FromStr for TradeId {
    type Err = ClientError;

    /// Accepts `0x`-prefixed or bare hex. Shorter inputs are treated as a
    /// number and left-padded, so ids rendered without leading zeros still parse.
    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > 64 {
            return Err(ClientError::invalid_param(
                "Invalid trade id length",
                metadata! { "tradeId" => s, "maxLength" => 64 },
            ));
        }
        let padded = format!("{digits:0>64}");
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&padded, &mut bytes).map_err(|_| {
            ClientError::invalid_param("Trade id is not hex", metadata! { "tradeId" => s })
        })?;
        Ok(Self(bytes))
    }
}
