//! Multisig (team) configuration and multisig address derivation

use crate::{
	chain::storage::ProxyDefinition,
	error::{Result, SignetError},
	vault::address::Address,
};
use codec::{Compact, Encode};
use serde::{Deserialize, Serialize};
use sp_crypto_hashing::blake2_256;

/// Entropy prefix used by the multisig pallet when deriving account ids
const MULTISIG_ENTROPY_PREFIX: &[u8; 16] = b"modlpy/utilisuba";

/// Derive the multisig control address for a signer set and threshold.
///
/// Matches the multisig pallet's `multi_account_id`. Signer order does not matter.
/// Ethereum-style signers are sorted by their checksummed hex form and the result is
/// truncated to 20 bytes.
pub fn derive_multisig_address(signers: &[Address], threshold: u16) -> Result<Address> {
	validate_signers(signers, threshold)?;

	let ethereum = signers[0].is_ethereum();
	let mut sorted = signers.to_vec();
	if ethereum {
		// Mixed-case EIP-55 strings, not lowercase hex: this order decides the derived address
		sorted.sort_by_key(|a| a.to_ss58(None));
	} else {
		sorted.sort();
	}

	let mut entropy = Vec::with_capacity(16 + 5 + sorted.len() * 32 + 2);
	entropy.extend_from_slice(MULTISIG_ENTROPY_PREFIX);
	Compact(sorted.len() as u32).encode_to(&mut entropy);
	for signer in &sorted {
		entropy.extend_from_slice(signer.as_bytes());
	}
	threshold.encode_to(&mut entropy);

	let hash = blake2_256(&entropy);
	if ethereum {
		Address::from_bytes(&hash[..20])
	} else {
		Ok(Address::Substrate(hash))
	}
}

fn validate_signers(signers: &[Address], threshold: u16) -> Result<()> {
	if signers.is_empty() {
		return Err(SignetError::InvalidConfig("at least one signer is required".to_string()));
	}
	if threshold == 0 || threshold as usize > signers.len() {
		return Err(SignetError::InvalidConfig(format!(
			"threshold {threshold} must be between 1 and {}",
			signers.len()
		)));
	}
	let ethereum = signers[0].is_ethereum();
	if signers.iter().any(|s| s.is_ethereum() != ethereum) {
		return Err(SignetError::InvalidConfig(
			"signers mix 32-byte and 20-byte accounts".to_string(),
		));
	}
	let mut unique = signers.to_vec();
	unique.sort();
	unique.dedup();
	if unique.len() != signers.len() {
		return Err(SignetError::InvalidConfig("duplicate signer".to_string()));
	}
	Ok(())
}

/// A vault: a multisig account that controls a proxied account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigConfig {
	pub id: String,
	pub name: String,
	/// Chain id from the configuration
	pub chain: String,
	signers: Vec<Address>,
	threshold: u16,
	multisig_address: Address,
	proxied: Address,
}

impl MultisigConfig {
	pub fn new(
		id: impl Into<String>,
		name: impl Into<String>,
		chain: impl Into<String>,
		signers: Vec<Address>,
		threshold: u16,
		proxied: Address,
	) -> Result<Self> {
		let multisig_address = derive_multisig_address(&signers, threshold)?;
		Ok(Self {
			id: id.into(),
			name: name.into(),
			chain: chain.into(),
			signers,
			threshold,
			multisig_address,
			proxied,
		})
	}

	pub fn signers(&self) -> &[Address] {
		&self.signers
	}

	pub fn threshold(&self) -> u16 {
		self.threshold
	}

	pub fn multisig_address(&self) -> Address {
		self.multisig_address
	}

	pub fn proxied(&self) -> Address {
		self.proxied
	}

	pub fn is_signer(&self, address: &Address) -> bool {
		self.signers.contains(address)
	}

	/// Replace signers and threshold, re-deriving the multisig address
	pub fn set_config(&mut self, signers: Vec<Address>, threshold: u16) -> Result<()> {
		self.multisig_address = derive_multisig_address(&signers, threshold)?;
		self.signers = signers;
		self.threshold = threshold;
		Ok(())
	}

	/// True when the stored multisig address no longer matches signers/threshold
	pub fn is_derivation_stale(&self) -> bool {
		derive_multisig_address(&self.signers, self.threshold)
			.map(|derived| derived != self.multisig_address)
			.unwrap_or(true)
	}

	/// The other signers, sorted the way the multisig pallet requires
	pub fn other_signatories(&self, me: &Address) -> Result<Vec<Address>> {
		if !self.is_signer(me) {
			return Err(SignetError::Generic(format!(
				"{} is not a signer of vault '{}'",
				me.to_pub_key(),
				self.name
			)));
		}
		let mut others: Vec<Address> = self.signers.iter().filter(|s| *s != me).copied().collect();
		others.sort();
		Ok(others)
	}

	/// Compare the cached relationship with the proxied account's on-chain proxies
	pub fn check_proxy_relationship(&self, delegates: &[ProxyDefinition]) -> Result<()> {
		if self.is_derivation_stale() {
			return Err(SignetError::ConfigDriftDetected(format!(
				"vault '{}' has a stale multisig address",
				self.name
			)));
		}
		let controls = delegates
			.iter()
			.any(|d| d.delegate == self.multisig_address && d.delay == 0);
		if !controls {
			return Err(SignetError::ConfigDriftDetected(format!(
				"multisig {} is no longer a proxy of {}",
				self.multisig_address.to_pub_key(),
				self.proxied.to_pub_key()
			)));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn account(seed: u8) -> Address {
		Address::Substrate([seed; 32])
	}

	fn eth(seed: u8) -> Address {
		let mut raw = [seed; 20];
		raw[0] = seed.wrapping_mul(37);
		Address::Ethereum(raw)
	}

	#[test]
	fn test_derivation_is_order_invariant() {
		let a = derive_multisig_address(&[account(1), account(2), account(3)], 2).unwrap();
		let b = derive_multisig_address(&[account(3), account(1), account(2)], 2).unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn test_derivation_depends_on_threshold() {
		let signers = [account(1), account(2), account(3)];
		let two = derive_multisig_address(&signers, 2).unwrap();
		let three = derive_multisig_address(&signers, 3).unwrap();
		assert_ne!(two, three);
	}

	#[test]
	fn test_derivation_matches_pallet_encoding() {
		let signers = [account(2), account(1)];
		let derived = derive_multisig_address(&signers, 2).unwrap();

		let mut sorted = vec![[1u8; 32], [2u8; 32]];
		sorted.sort();
		let expected = (b"modlpy/utilisuba", sorted, 2u16).using_encoded(blake2_256);
		assert_eq!(derived, Address::Substrate(expected));
	}

	#[test]
	fn test_ethereum_derivation_truncates() {
		let derived = derive_multisig_address(&[eth(5), eth(9), eth(11)], 2).unwrap();
		assert!(derived.is_ethereum());
		assert_eq!(derived.as_bytes().len(), 20);
		let reordered = derive_multisig_address(&[eth(11), eth(5), eth(9)], 2).unwrap();
		assert_eq!(derived, reordered);
	}

	#[test]
	fn test_ethereum_signers_sorted_by_checksummed_form() {
		let signers = [eth(5), eth(9), eth(11), eth(200)];
		let mut sorted = signers.to_vec();
		sorted.sort_by_key(|a| a.to_ss58(None));
		let raw: Vec<[u8; 20]> = sorted
			.iter()
			.map(|a| <[u8; 20]>::try_from(a.as_bytes()).unwrap())
			.collect();
		let expected = (b"modlpy/utilisuba", raw, 3u16).using_encoded(blake2_256);
		let derived = derive_multisig_address(&signers, 3).unwrap();
		assert_eq!(derived.as_bytes(), &expected[..20]);
	}

	#[test]
	fn test_invalid_signer_sets() {
		assert!(derive_multisig_address(&[], 1).is_err());
		assert!(derive_multisig_address(&[account(1)], 0).is_err());
		assert!(derive_multisig_address(&[account(1), account(2)], 3).is_err());
		assert!(derive_multisig_address(&[account(1), account(1)], 1).is_err());
		assert!(derive_multisig_address(&[account(1), eth(1)], 1).is_err());
	}

	#[test]
	fn test_set_config_rederives() {
		let mut config =
			MultisigConfig::new("v1", "Treasury", "polkadot", vec![account(1), account(2)], 2, account(9))
				.unwrap();
		let before = config.multisig_address();
		config.set_config(vec![account(1), account(2), account(3)], 2).unwrap();
		assert_ne!(before, config.multisig_address());
		assert!(!config.is_derivation_stale());
	}

	#[test]
	fn test_other_signatories_excludes_self_and_sorts() {
		let config = MultisigConfig::new(
			"v1",
			"Treasury",
			"polkadot",
			vec![account(3), account(1), account(2)],
			2,
			account(9),
		)
		.unwrap();
		assert_eq!(config.other_signatories(&account(2)).unwrap(), vec![account(1), account(3)]);
		assert!(config.other_signatories(&account(7)).is_err());
	}

	#[test]
	fn test_proxy_drift_detection() {
		let config =
			MultisigConfig::new("v1", "Treasury", "polkadot", vec![account(1), account(2)], 1, account(9))
				.unwrap();
		let good = vec![ProxyDefinition { delegate: config.multisig_address(), proxy_type: 0, delay: 0 }];
		assert!(config.check_proxy_relationship(&good).is_ok());

		let other = vec![ProxyDefinition { delegate: account(4), proxy_type: 0, delay: 0 }];
		assert!(matches!(
			config.check_proxy_relationship(&other),
			Err(SignetError::ConfigDriftDetected(_))
		));
	}
}
