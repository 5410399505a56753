//! Chain-agnostic account addresses
//!
//! An [`Address`] is either a 32-byte Substrate public key or a 20-byte Ethereum-style key.
//! Identity is the raw bytes; SS58 and hex renderings are presentation only.

use crate::error::{Result, SignetError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sp_core::crypto::{AccountId32, Ss58AddressFormat, Ss58Codec};
use sp_crypto_hashing::keccak_256;
use std::fmt;

/// SS58 prefix used when no chain is given
pub const GENERIC_SS58_PREFIX: u16 = 42;

/// Account address on a Substrate-based chain
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Address {
	/// 32-byte public key
	Substrate([u8; 32]),
	/// 20-byte Ethereum-compatible key
	Ethereum([u8; 20]),
}

impl Address {
	/// Parse either a `0x` hex string or an SS58 string.
	///
	/// Hex input must be 32 or 20 bytes long; 20-byte input must be a valid EIP-55 address.
	pub fn from_ss58(input: &str) -> Result<Self> {
		let input = input.trim();
		if let Some(body) = input.strip_prefix("0x") {
			let bytes = hex::decode(body).map_err(|e| {
				SignetError::InvalidAddress(format!("'{input}' is not valid hex: {e}"))
			})?;
			return match bytes.len() {
				32 => Self::from_bytes(&bytes),
				20 => {
					if !is_valid_eth_checksum(body) {
						return Err(SignetError::InvalidAddress(format!(
							"'{input}' fails the Ethereum checksum"
						)));
					}
					Self::from_bytes(&bytes)
				},
				n => Err(SignetError::InvalidAddress(format!(
					"'{input}' decodes to {n} bytes, expected 32 or 20"
				))),
			};
		}

		let (account, _format) = AccountId32::from_ss58check_with_version(input)
			.map_err(|e| SignetError::InvalidAddress(format!("'{input}': {e:?}")))?;
		let raw: [u8; 32] = *account.as_ref();
		Ok(Address::Substrate(raw))
	}

	/// Parse a hex public key. Always exactly 32 bytes.
	pub fn from_pub_key(input: &str) -> Result<Self> {
		let body = input.trim().trim_start_matches("0x");
		let bytes = hex::decode(body)
			.map_err(|e| SignetError::InvalidAddress(format!("'{input}' is not valid hex: {e}")))?;
		if bytes.len() != 32 {
			return Err(SignetError::InvalidAddress(format!(
				"public key '{input}' is {} bytes, expected 32",
				bytes.len()
			)));
		}
		Self::from_bytes(&bytes)
	}

	/// Build from raw bytes decoded from chain data
	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		match bytes.len() {
			32 => {
				let mut raw = [0u8; 32];
				raw.copy_from_slice(bytes);
				Ok(Address::Substrate(raw))
			},
			20 => {
				let mut raw = [0u8; 20];
				raw.copy_from_slice(bytes);
				Ok(Address::Ethereum(raw))
			},
			n => Err(SignetError::InvalidAddress(format!(
				"address is {n} bytes, expected 32 or 20"
			))),
		}
	}

	pub fn as_bytes(&self) -> &[u8] {
		match self {
			Address::Substrate(raw) => raw,
			Address::Ethereum(raw) => raw,
		}
	}

	pub fn is_ethereum(&self) -> bool {
		matches!(self, Address::Ethereum(_))
	}

	/// Byte-wise equality; addresses of different length are never equal
	pub fn is_equal(&self, other: &Address) -> bool {
		self == other
	}

	/// Canonical encoded form. Ethereum addresses always render as checksummed hex.
	pub fn to_ss58(&self, prefix: Option<u16>) -> String {
		match self {
			Address::Substrate(raw) => AccountId32::from(*raw).to_ss58check_with_version(
				Ss58AddressFormat::custom(prefix.unwrap_or(GENERIC_SS58_PREFIX)),
			),
			Address::Ethereum(raw) => to_eth_checksum(raw),
		}
	}

	/// Encoded form truncated to `size` leading and trailing characters
	pub fn to_short_ss58(&self, prefix: Option<u16>, size: usize) -> String {
		let full = self.to_ss58(prefix);
		if full.len() <= size * 2 + 3 {
			return full;
		}
		format!("{}...{}", &full[..size], &full[full.len() - size..])
	}

	/// `0x`-prefixed hex of the raw bytes
	pub fn to_pub_key(&self) -> String {
		format!("0x{}", hex::encode(self.as_bytes()))
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.to_ss58(None))
	}
}

impl fmt::Debug for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Address::Substrate(_) => write!(f, "Substrate({})", self.to_pub_key()),
			Address::Ethereum(_) => write!(f, "Ethereum({})", self.to_pub_key()),
		}
	}
}

impl std::str::FromStr for Address {
	type Err = SignetError;

	fn from_str(s: &str) -> Result<Self> {
		Address::from_ss58(s)
	}
}

// Persisted as the public key hex and re-validated on load.
impl Serialize for Address {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_pub_key())
	}
}

impl<'de> Deserialize<'de> for Address {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		Address::from_ss58(&raw).map_err(serde::de::Error::custom)
	}
}

/// EIP-55 mixed-case rendering
pub fn to_eth_checksum(raw: &[u8; 20]) -> String {
	let lower = hex::encode(raw);
	let hash = keccak_256(lower.as_bytes());
	let mut out = String::with_capacity(42);
	out.push_str("0x");
	for (i, c) in lower.chars().enumerate() {
		let nibble = if i % 2 == 0 { hash[i / 2] >> 4 } else { hash[i / 2] & 0x0f };
		if c.is_ascii_alphabetic() && nibble >= 8 {
			out.push(c.to_ascii_uppercase());
		} else {
			out.push(c);
		}
	}
	out
}

/// Single-case hex is accepted as-is; mixed case must match EIP-55.
fn is_valid_eth_checksum(body: &str) -> bool {
	let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
	let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
	if !(has_lower && has_upper) {
		return true;
	}
	let Ok(bytes) = hex::decode(body) else { return false };
	let Ok(raw) = <[u8; 20]>::try_from(bytes.as_slice()) else { return false };
	to_eth_checksum(&raw)[2..] == *body
}

#[cfg(test)]
mod tests {
	use super::*;

	const ALICE_SS58: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
	const ALICE_PUB: &str = "0xd43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";
	const ETH_CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

	#[test]
	fn test_parse_ss58_and_hex_agree() {
		let from_ss58 = Address::from_ss58(ALICE_SS58).unwrap();
		let from_hex = Address::from_ss58(ALICE_PUB).unwrap();
		assert!(from_ss58.is_equal(&from_hex));
		assert_eq!(from_ss58.to_pub_key(), ALICE_PUB);
	}

	#[test]
	fn test_ss58_round_trip() {
		let alice = Address::from_pub_key(ALICE_PUB).unwrap();
		assert_eq!(alice.to_ss58(None), ALICE_SS58);
		let polkadot = alice.to_ss58(Some(0));
		assert_ne!(polkadot, ALICE_SS58);
		assert_eq!(Address::from_ss58(&polkadot).unwrap(), alice);

		let eth = Address::from_ss58(ETH_CHECKSUMMED).unwrap();
		assert_eq!(Address::from_ss58(&eth.to_ss58(Some(0))).unwrap(), eth);
	}

	#[test]
	fn test_ethereum_renders_as_checksummed_hex() {
		let eth = Address::from_ss58(&ETH_CHECKSUMMED.to_lowercase()).unwrap();
		assert!(eth.is_ethereum());
		assert_eq!(eth.to_ss58(Some(0)), ETH_CHECKSUMMED);
		assert_eq!(eth.to_ss58(None), ETH_CHECKSUMMED);
	}

	#[test]
	fn test_bad_ethereum_checksum_rejected() {
		let bad = "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
		assert!(matches!(Address::from_ss58(bad), Err(SignetError::InvalidAddress(_))));
	}

	#[test]
	fn test_wrong_lengths_rejected() {
		for len in [0usize, 1, 16, 19, 21, 31, 33, 64] {
			let input = format!("0x{}", "ab".repeat(len));
			assert!(
				matches!(Address::from_ss58(&input), Err(SignetError::InvalidAddress(_))),
				"length {len} accepted"
			);
			assert!(Address::from_bytes(&vec![1u8; len]).is_err());
		}
		assert!(Address::from_ss58("not an address").is_err());
	}

	#[test]
	fn test_pub_key_requires_32_bytes() {
		assert!(Address::from_pub_key(ALICE_PUB).is_ok());
		assert!(Address::from_pub_key(&ETH_CHECKSUMMED.to_lowercase()).is_err());
	}

	#[test]
	fn test_different_lengths_never_equal() {
		let short = Address::from_bytes(&[7u8; 20]).unwrap();
		let long = Address::from_bytes(&[7u8; 32]).unwrap();
		assert!(!short.is_equal(&long));
	}

	#[test]
	fn test_short_form() {
		let alice = Address::from_ss58(ALICE_SS58).unwrap();
		assert_eq!(alice.to_short_ss58(None, 6), "5Grwva...GKutQY");
		let short = alice.to_short_ss58(None, 4);
		assert_eq!(short, "5Grw...utQY");
		assert_eq!(alice.to_short_ss58(None, 40), ALICE_SS58);
	}

	#[test]
	fn test_serde_revives_validated_value() {
		let alice = Address::from_ss58(ALICE_SS58).unwrap();
		let json = serde_json::to_string(&alice).unwrap();
		assert_eq!(json, format!("\"{ALICE_PUB}\""));
		let back: Address = serde_json::from_str(&json).unwrap();
		assert_eq!(back, alice);
		assert!(serde_json::from_str::<Address>("\"0x1234\"").is_err());
	}
}
