//! Storage keys and value decoding for the multisig and proxy pallets

use crate::{
	chain::call::{ProxyType, Timepoint},
	config::AccountKind,
	error::{Result, SignetError},
	vault::address::Address,
};
use codec::{Compact, Decode};
use serde::{Deserialize, Serialize};
use sp_core::{twox_128, twox_64, H256};
use sp_crypto_hashing::blake2_128;

/// One entry of `Proxy.Proxies`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyDefinition {
	pub delegate: Address,
	pub proxy_type: ProxyType,
	pub delay: u32,
}

/// One entry of `Multisig.Multisigs`: a call awaiting approvals
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMultisig {
	pub call_hash: H256,
	pub when: Timepoint,
	pub deposit: u128,
	pub depositor: Address,
	pub approvals: Vec<Address>,
}

/// `twox128(pallet) ++ twox128(item)`
pub fn storage_prefix(pallet: &str, item: &str) -> Vec<u8> {
	let mut key = twox_128(pallet.as_bytes()).to_vec();
	key.extend(&twox_128(item.as_bytes()));
	key
}

fn twox64_concat(data: &[u8]) -> Vec<u8> {
	let mut out = twox_64(data).to_vec();
	out.extend_from_slice(data);
	out
}

fn blake2_128_concat(data: &[u8]) -> Vec<u8> {
	let mut out = blake2_128(data).to_vec();
	out.extend_from_slice(data);
	out
}

/// Prefix of every `Multisig.Multisigs` entry for one multisig account
pub fn multisigs_prefix(multisig: &Address) -> Vec<u8> {
	let mut key = storage_prefix("Multisig", "Multisigs");
	key.extend(twox64_concat(multisig.as_bytes()));
	key
}

/// Full `Multisig.Multisigs` key for one call hash
pub fn multisig_key(multisig: &Address, call_hash: &H256) -> Vec<u8> {
	let mut key = multisigs_prefix(multisig);
	key.extend(blake2_128_concat(call_hash.as_bytes()));
	key
}

/// Recover the call hash from a full `Multisig.Multisigs` key
pub fn call_hash_from_key(multisig: &Address, key: &[u8]) -> Result<H256> {
	let prefix = multisigs_prefix(multisig);
	let rest = key.strip_prefix(prefix.as_slice()).ok_or_else(|| {
		SignetError::Serialization("storage key does not belong to this multisig".to_string())
	})?;
	// blake2_128 hash followed by the 32-byte call hash
	if rest.len() != 16 + 32 {
		return Err(SignetError::Serialization(format!(
			"unexpected multisig storage key suffix length {}",
			rest.len()
		)));
	}
	Ok(H256::from_slice(&rest[16..]))
}

pub fn proxies_key(proxied: &Address) -> Vec<u8> {
	let mut key = storage_prefix("Proxy", "Proxies");
	key.extend(twox64_concat(proxied.as_bytes()));
	key
}

/// `Staking.Nominators` key of a stash
pub fn nominators_key(stash: &Address) -> Vec<u8> {
	let mut key = storage_prefix("Staking", "Nominators");
	key.extend(twox64_concat(stash.as_bytes()));
	key
}

/// `System.Events` key
pub fn events_key() -> Vec<u8> {
	storage_prefix("System", "Events")
}

/// Bonded account of a nomination pool, the account that nominates on the pool's behalf
pub fn pool_bonded_account(pool_id: u32, kind: AccountKind) -> Address {
	let mut raw = [0u8; 32];
	let mut entropy = b"modlpy/nopls".to_vec();
	// AccountType::Bonded
	entropy.push(0);
	entropy.extend_from_slice(&pool_id.to_le_bytes());
	raw[..entropy.len()].copy_from_slice(&entropy);
	match kind {
		AccountKind::Substrate => Address::Substrate(raw),
		AccountKind::Ethereum => {
			let mut truncated = [0u8; 20];
			truncated.copy_from_slice(&raw[..20]);
			Address::Ethereum(truncated)
		},
	}
}

fn decode_account(input: &mut &[u8], kind: AccountKind) -> Result<Address> {
	let account = match kind {
		AccountKind::Substrate => <[u8; 32]>::decode(input).map(Address::Substrate),
		AccountKind::Ethereum => <[u8; 20]>::decode(input).map(Address::Ethereum),
	};
	account.map_err(|e| SignetError::Serialization(format!("failed to decode account: {e}")))
}

fn decode_accounts(input: &mut &[u8], kind: AccountKind) -> Result<Vec<Address>> {
	let len = Compact::<u32>::decode(input)
		.map_err(|e| SignetError::Serialization(format!("failed to decode length: {e}")))?
		.0;
	(0..len).map(|_| decode_account(input, kind)).collect()
}

fn decode_field<T: Decode>(input: &mut &[u8], what: &str) -> Result<T> {
	T::decode(input).map_err(|e| SignetError::Serialization(format!("failed to decode {what}: {e}")))
}

/// Decode a `Multisig.Multisigs` value
pub fn decode_pending_multisig(
	call_hash: H256,
	mut bytes: &[u8],
	kind: AccountKind,
) -> Result<PendingMultisig> {
	let input = &mut bytes;
	let when: Timepoint = decode_field(input, "timepoint")?;
	let deposit: u128 = decode_field(input, "deposit")?;
	let depositor = decode_account(input, kind)?;
	let approvals = decode_accounts(input, kind)?;
	Ok(PendingMultisig { call_hash, when, deposit, depositor, approvals })
}

/// Decode a `Proxy.Proxies` value, dropping the reserved deposit
pub fn decode_proxies(mut bytes: &[u8], kind: AccountKind) -> Result<Vec<ProxyDefinition>> {
	let input = &mut bytes;
	let len = decode_field::<Compact<u32>>(input, "proxy count")?.0;
	// The count comes from the node, so grow as entries actually decode
	let mut proxies = Vec::new();
	for _ in 0..len {
		proxies.push(ProxyDefinition {
			delegate: decode_account(input, kind)?,
			proxy_type: decode_field(input, "proxy type")?,
			delay: decode_field(input, "delay")?,
		});
	}
	let _deposit: u128 = decode_field(input, "proxy deposit")?;
	Ok(proxies)
}

/// Targets of a `Staking.Nominators` value
pub fn decode_nominations(mut bytes: &[u8], kind: AccountKind) -> Result<Vec<Address>> {
	let input = &mut bytes;
	let targets = decode_accounts(input, kind)?;
	let _submitted_in: u32 = decode_field(input, "submitted era")?;
	let _suppressed: bool = decode_field(input, "suppressed flag")?;
	Ok(targets)
}

#[cfg(test)]
mod tests {
	use super::*;
	use codec::Encode;

	#[test]
	fn test_multisig_key_roundtrip_hash() {
		let multisig = Address::Substrate([4u8; 32]);
		let hash = H256::repeat_byte(0xab);
		let key = multisig_key(&multisig, &hash);
		assert_eq!(key.len(), 32 + 8 + 32 + 16 + 32);
		assert_eq!(call_hash_from_key(&multisig, &key).unwrap(), hash);
		assert!(call_hash_from_key(&Address::Substrate([5u8; 32]), &key).is_err());
	}

	#[test]
	fn test_decode_pending_multisig() {
		let depositor = [1u8; 32];
		let approvals = vec![[1u8; 32], [2u8; 32]];
		let bytes = (Timepoint { height: 100, index: 2 }, 5_000u128, depositor, approvals).encode();

		let pending =
			decode_pending_multisig(H256::zero(), &bytes, AccountKind::Substrate).unwrap();
		assert_eq!(pending.when, Timepoint { height: 100, index: 2 });
		assert_eq!(pending.deposit, 5_000);
		assert_eq!(pending.depositor, Address::Substrate(depositor));
		assert_eq!(pending.approvals.len(), 2);
	}

	#[test]
	fn test_decode_proxies() {
		let bytes = (vec![([7u8; 32], 0u8, 0u32), ([8u8; 32], 3u8, 10u32)], 1_000u128).encode();
		let proxies = decode_proxies(&bytes, AccountKind::Substrate).unwrap();
		assert_eq!(proxies.len(), 2);
		assert_eq!(proxies[1], ProxyDefinition {
			delegate: Address::Substrate([8u8; 32]),
			proxy_type: 3,
			delay: 10
		});
	}

	#[test]
	fn test_decode_ethereum_proxies() {
		let bytes = (vec![([7u8; 20], 0u8, 0u32)], 1u128).encode();
		let proxies = decode_proxies(&bytes, AccountKind::Ethereum).unwrap();
		assert_eq!(proxies[0].delegate, Address::Ethereum([7u8; 20]));
		assert!(decode_proxies(&bytes[..5], AccountKind::Ethereum).is_err());
	}

	#[test]
	fn test_decode_nominations() {
		let bytes = (vec![[3u8; 32], [4u8; 32]], 812u32, false).encode();
		let targets = decode_nominations(&bytes, AccountKind::Substrate).unwrap();
		assert_eq!(targets, vec![Address::Substrate([3u8; 32]), Address::Substrate([4u8; 32])]);
		assert!(decode_nominations(&bytes[..40], AccountKind::Substrate).is_err());
	}

	#[test]
	fn test_nominators_key_layout() {
		let stash = Address::Substrate([6u8; 32]);
		let key = nominators_key(&stash);
		assert_eq!(key.len(), 32 + 8 + 32);
		assert!(key.starts_with(&storage_prefix("Staking", "Nominators")));
		assert!(key.ends_with(&[6u8; 32]));
	}

	#[test]
	fn test_pool_bonded_account() {
		let Address::Substrate(raw) = pool_bonded_account(12, AccountKind::Substrate) else {
			panic!("expected a 32-byte account")
		};
		assert_eq!(&raw[..12], b"modlpy/nopls");
		assert_eq!(raw[12], 0);
		assert_eq!(&raw[13..17], &12u32.to_le_bytes());
		assert!(raw[17..].iter().all(|b| *b == 0));
		assert_ne!(pool_bonded_account(13, AccountKind::Substrate), Address::Substrate(raw));
		assert!(pool_bonded_account(12, AccountKind::Ethereum).is_ethereum());
	}

	#[test]
	fn test_huge_proxy_count_is_an_error() {
		let bytes = Compact(u32::MAX).encode();
		assert!(decode_proxies(&bytes, AccountKind::Substrate).is_err());
	}
}
