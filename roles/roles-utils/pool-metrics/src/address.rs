//! Kaspa wallet address validation.
//!
//! Addresses look like `kaspa:qq…` where the part after the colon is a
//! base32 payload (version byte + public key or script hash) followed by an
//! 8-character, 40-bit checksum computed over the prefix and the payload.

use std::fmt;
use thiserror::Error;

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const CHECKSUM_LENGTH: usize = 8;

/// Network prefixes the dashboard accepts.
pub const KNOWN_PREFIXES: &[&str] = &["kaspa", "kaspatest", "kaspadev", "kaspasim"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address is missing the network prefix")]
    MissingPrefix,

    #[error("Unknown network prefix: {0}")]
    UnknownPrefix(String),

    #[error("Address mixes upper and lower case")]
    MixedCase,

    #[error("Invalid character {0:?} in address")]
    InvalidCharacter(char),

    #[error("Invalid payload length: {0}")]
    InvalidLength(usize),

    #[error("Unknown address version: {0}")]
    UnknownVersion(u8),

    #[error("Checksum mismatch")]
    ChecksumMismatch,
}

/// Address kinds, identified by the payload's version byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressVersion {
    /// Schnorr public key, 32 bytes
    PubKey,
    /// ECDSA public key, 33 bytes
    PubKeyEcdsa,
    /// Pay-to-script-hash, 32 bytes
    ScriptHash,
}

impl AddressVersion {
    fn from_byte(byte: u8) -> Result<Self, AddressError> {
        match byte {
            0 => Ok(Self::PubKey),
            1 => Ok(Self::PubKeyEcdsa),
            8 => Ok(Self::ScriptHash),
            other => Err(AddressError::UnknownVersion(other)),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::PubKey => 0,
            Self::PubKeyEcdsa => 1,
            Self::ScriptHash => 8,
        }
    }

    fn data_length(self) -> usize {
        match self {
            Self::PubKeyEcdsa => 33,
            Self::PubKey | Self::ScriptHash => 32,
        }
    }
}

/// A validated Kaspa address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KaspaAddress {
    pub prefix: String,
    /// Encoded payload including checksum, as it appears after the colon
    pub payload: String,
    pub version: AddressVersion,
}

impl fmt::Display for KaspaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.payload)
    }
}

/// Validate a wallet address and return its canonical (lowercase) form.
pub fn validate_address(input: &str) -> Result<KaspaAddress, AddressError> {
    let input = input.trim();

    let has_lower = input.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = input.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(AddressError::MixedCase);
    }
    let input = input.to_ascii_lowercase();

    let (prefix, payload) = input.split_once(':').ok_or(AddressError::MissingPrefix)?;
    if !KNOWN_PREFIXES.contains(&prefix) {
        return Err(AddressError::UnknownPrefix(prefix.to_string()));
    }

    if payload.len() != 61 && payload.len() != 63 {
        return Err(AddressError::InvalidLength(payload.len()));
    }

    let values = payload
        .chars()
        .map(|c| {
            CHARSET
                .iter()
                .position(|&x| x as char == c)
                .map(|p| p as u8)
                .ok_or(AddressError::InvalidCharacter(c))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    let (data, checksum_values) = values.split_at(values.len() - CHECKSUM_LENGTH);
    let expected = checksum_values
        .iter()
        .fold(0u64, |acc, &v| (acc << 5) | u64::from(v));
    if checksum(prefix, data) != expected {
        return Err(AddressError::ChecksumMismatch);
    }

    let bytes = convert_bits(data, 5, 8, false).ok_or(AddressError::InvalidLength(payload.len()))?;
    let (&version_byte, key) = bytes
        .split_first()
        .ok_or(AddressError::InvalidLength(payload.len()))?;
    let version = AddressVersion::from_byte(version_byte)?;
    if key.len() != version.data_length() {
        return Err(AddressError::InvalidLength(payload.len()));
    }

    Ok(KaspaAddress {
        prefix: prefix.to_string(),
        payload: payload.to_string(),
        version,
    })
}

/// Encode raw key or script-hash bytes as an address string.
pub fn encode_address(prefix: &str, version: AddressVersion, data: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(data.len() + 1);
    bytes.push(version.as_byte());
    bytes.extend_from_slice(data);

    // Padding enabled, so conversion cannot fail
    let values = convert_bits(&bytes, 8, 5, true).unwrap_or_default();
    let checksum = checksum(prefix, &values);

    let mut encoded = String::with_capacity(prefix.len() + 1 + values.len() + CHECKSUM_LENGTH);
    encoded.push_str(prefix);
    encoded.push(':');
    for v in values {
        encoded.push(CHARSET[v as usize] as char);
    }
    for i in (0..CHECKSUM_LENGTH).rev() {
        encoded.push(CHARSET[((checksum >> (5 * i)) & 0x1f) as usize] as char);
    }
    encoded
}

fn checksum(prefix: &str, data: &[u8]) -> u64 {
    polymod(
        prefix
            .bytes()
            .map(|c| c & 0x1f)
            .chain(std::iter::once(0))
            .chain(data.iter().copied())
            .chain([0u8; CHECKSUM_LENGTH]),
    )
}

fn polymod(values: impl Iterator<Item = u8>) -> u64 {
    let mut c = 1u64;
    for d in values {
        let c0 = c >> 35;
        c = ((c & 0x07_ffff_ffff) << 5) ^ u64::from(d);
        if c0 & 0x01 != 0 {
            c ^= 0x98_f2bc_8e61;
        }
        if c0 & 0x02 != 0 {
            c ^= 0x79_b76d_99e2;
        }
        if c0 & 0x04 != 0 {
            c ^= 0xf3_3e5f_b3c4;
        }
        if c0 & 0x08 != 0 {
            c ^= 0xae_2eab_e2a8;
        }
        if c0 & 0x10 != 0 {
            c ^= 0x1e_4f43_e470;
        }
    }
    c ^ 1
}

/// Regroup a bit stream from `from`-bit to `to`-bit values.
fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let max_value: u32 = (1 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);

    for &value in data {
        acc = (acc << from) | u32::from(value);
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & max_value) as u8);
        }
        acc &= (1 << bits) - 1;
    }

    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & max_value) as u8);
        }
    } else if bits >= from || (acc << (to - bits)) & max_value != 0 {
        return None;
    }

    Some(out)
}
