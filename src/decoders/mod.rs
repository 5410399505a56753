//! Transaction classification
//!
//! A proxy call made for a vault is unwrapped and its inner call is offered to each decoder in
//! [`default_decoders`] order. Every decoder either declines or returns the intent it recognised.
//! Several matches indicate overlapping decoders: a warning is logged and the first one wins.
//! A call no decoder recognises is classified as [`TransactionKind::Advanced`].

mod builders;
mod change_config;
mod contract;
mod multisend;
mod nominate;
mod transfer;
mod vote;

pub use builders::{
	build_change_config, build_multisend, build_transfer, build_vote, TransferRequest,
};
pub use change_config::ChangeConfigDecoder;
pub use contract::{ContractCallDecoder, DeployContractDecoder};
pub use multisend::MultiSendDecoder;
pub use nominate::{
	nominating_account, NominateFromNomPoolDecoder, NominateFromStakingDecoder, ValidatorDiff,
};
pub use transfer::TransferDecoder;
pub use vote::{VoteDecoder, VoteDetails};

use crate::{
	chain::{
		abi::{AbiRegistry, DecodedContractCall},
		call::{Call, CallCodec, VestingInfo},
		calldata::{parse_hex, unwrap_for_vault},
		tokens::{TokenId, TokenRegistry},
	},
	error::{Result, SignetError},
	vault::{address::Address, multisig::MultisigConfig},
};
use serde::{Deserialize, Serialize};
use sp_core::H256;
use sp_crypto_hashing::blake2_256;

/// Signer set and threshold proposed by a ChangeConfig transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedConfig {
	pub signers: Vec<Address>,
	pub threshold: u16,
}

/// Off-chain hints saved alongside a transaction
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMetadata {
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub change_config: Option<ProposedConfig>,
	/// Address of the contract a deployment created
	#[serde(default)]
	pub contract_deployed: Option<Address>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDetails {
	pub recipient: Address,
	pub amount: u128,
	pub token: TokenId,
	#[serde(default)]
	pub vesting: Option<VestingInfo>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotal {
	pub token: TokenId,
	pub amount: u128,
}

/// The intent of a transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransactionKind {
	Transfer(TransferDetails),
	MultiSend {
		sends: Vec<TransferDetails>,
		/// Outgoing amount per token, in token order
		totals: Vec<TokenTotal>,
	},
	Vote {
		poll_index: u32,
		details: VoteDetails,
		/// Balance backing the vote
		weight: u128,
	},
	ChangeConfig {
		new_multisig: Address,
		/// Present when the saved hint matches the new multisig address
		proposed: Option<ProposedConfig>,
	},
	ContractCall {
		contract: Address,
		value: u128,
		decoded: Option<DecodedContractCall>,
	},
	DeployContract {
		value: u128,
		code_hash: H256,
		decoded: Option<DecodedContractCall>,
		deployed: Option<Address>,
	},
	NominateFromStaking {
		validators: Vec<Address>,
		diff: Option<ValidatorDiff>,
	},
	NominateFromNomPool {
		pool_id: u32,
		validators: Vec<Address>,
		diff: Option<ValidatorDiff>,
	},
	Advanced {
		section: String,
		method: String,
	},
}

impl TransactionKind {
	pub fn name(&self) -> &'static str {
		match self {
			TransactionKind::Transfer(_) => "Transfer",
			TransactionKind::MultiSend { .. } => "MultiSend",
			TransactionKind::Vote { .. } => "Vote",
			TransactionKind::ChangeConfig { .. } => "ChangeConfig",
			TransactionKind::ContractCall { .. } => "ContractCall",
			TransactionKind::DeployContract { .. } => "DeployContract",
			TransactionKind::NominateFromStaking { .. } => "NominateFromStaking",
			TransactionKind::NominateFromNomPool { .. } => "NominateFromNomPool",
			TransactionKind::Advanced { .. } => "Advanced",
		}
	}

	pub fn is_change_config(&self) -> bool {
		matches!(self, TransactionKind::ChangeConfig { .. })
	}
}

/// A recognised intent with its human summary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classified {
	pub kind: TransactionKind,
	pub description: String,
}

/// Everything a decoder may look at
pub struct DecoderInput<'a> {
	/// Inner call, already unwrapped from the vault's proxy call
	pub call: &'a Call,
	pub tokens: &'a TokenRegistry,
	pub abis: &'a AbiRegistry,
	pub metadata: Option<&'a TxMetadata>,
	pub multisig: &'a MultisigConfig,
	/// Validators currently nominated by the proxied account or pool
	pub current_nominations: Option<&'a [Address]>,
	pub ss58_prefix: u16,
}

impl DecoderInput<'_> {
	/// Short display form of an address on this chain
	pub fn short(&self, address: &Address) -> String {
		address.to_short_ss58(Some(self.ss58_prefix), 6)
	}

	/// `"5 DOT"`, or the raw amount with the token id when the token is unknown
	pub fn amount(&self, token: TokenId, amount: u128) -> String {
		match self.tokens.get(token) {
			Some(t) => t.format(amount),
			None => format!("{amount} ({token})"),
		}
	}

	/// Saved description if there is one, otherwise `generated`
	pub fn describe(&self, generated: String) -> String {
		self.metadata.and_then(|m| m.description.clone()).unwrap_or(generated)
	}
}

/// A recogniser for one transaction intent
pub trait TxDecoder: Send + Sync {
	fn name(&self) -> &'static str;

	/// `None` when the call is not this intent
	fn decode(&self, input: &DecoderInput) -> Option<Classified>;
}

/// Decoders in priority order
pub fn default_decoders() -> Vec<Box<dyn TxDecoder>> {
	vec![
		Box::new(ChangeConfigDecoder),
		Box::new(MultiSendDecoder),
		Box::new(TransferDecoder),
		Box::new(VoteDecoder),
		Box::new(NominateFromStakingDecoder),
		Box::new(NominateFromNomPoolDecoder),
		Box::new(DeployContractDecoder),
		Box::new(ContractCallDecoder),
	]
}

/// Run every decoder and pick the first match, falling back to `Advanced`
pub fn classify(decoders: &[Box<dyn TxDecoder>], input: &DecoderInput) -> Classified {
	let mut first: Option<Classified> = None;
	let mut matched = Vec::new();
	for decoder in decoders {
		if let Some(result) = decoder.decode(input) {
			matched.push(decoder.name());
			if first.is_none() {
				first = Some(result);
			}
		}
	}

	if matched.len() > 1 {
		let err = SignetError::AmbiguousClassification { call: input.call.name(), matches: matched };
		log::warn!("{err}");
	}

	first.unwrap_or_else(|| Classified {
		kind: TransactionKind::Advanced {
			section: input.call.section().to_string(),
			method: input.call.method().to_string(),
		},
		description: input.describe(input.call.name()),
	})
}

/// Chain and vault state used to decode a transaction
pub struct VaultContext<'a> {
	pub codec: CallCodec<'a>,
	pub multisig: &'a MultisigConfig,
	pub tokens: &'a TokenRegistry,
	pub abis: &'a AbiRegistry,
	pub current_nominations: Option<&'a [Address]>,
	pub ss58_prefix: u16,
}

/// A vault transaction decoded from call data
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedTransaction {
	/// Canonical hash: blake2-256 of the proxy-wrapped call data
	pub hash: H256,
	#[serde(with = "crate::chain::call::hex_bytes")]
	pub call_data: Vec<u8>,
	/// Full proxy-wrapped call
	pub call: Call,
	/// Call dispatched as the proxied account
	pub inner: Call,
	pub kind: TransactionKind,
	pub description: String,
}

/// Decode, check the call belongs to the vault and classify it.
///
/// Fails with `InvalidCalldata` for undecodable bytes and `NotOurs` for calls that are not
/// a proxy call for the vault's proxied account.
pub fn decode_transaction(
	ctx: &VaultContext,
	decoders: &[Box<dyn TxDecoder>],
	hex_data: &str,
	metadata: Option<&TxMetadata>,
) -> Result<DecodedTransaction> {
	let call_data = parse_hex(hex_data)?;
	decode_transaction_bytes(ctx, decoders, call_data, metadata)
}

pub fn decode_transaction_bytes(
	ctx: &VaultContext,
	decoders: &[Box<dyn TxDecoder>],
	call_data: Vec<u8>,
	metadata: Option<&TxMetadata>,
) -> Result<DecodedTransaction> {
	let call = ctx.codec.decode(&call_data)?;
	let inner = unwrap_for_vault(&call, &ctx.multisig.proxied())?.clone();
	let classified = classify(decoders, &DecoderInput {
		call: &inner,
		tokens: ctx.tokens,
		abis: ctx.abis,
		metadata,
		multisig: ctx.multisig,
		current_nominations: ctx.current_nominations,
		ss58_prefix: ctx.ss58_prefix,
	});
	Ok(DecodedTransaction {
		hash: H256(blake2_256(&call_data)),
		call_data,
		call,
		inner,
		kind: classified.kind,
		description: classified.description,
	})
}


#[cfg(test)]
mod tests {
	use super::{test_support::*, *};
	use crate::{
		chain::{
			call::{BalancesCall, SystemCall, UtilityCall},
			calldata::wrap_in_proxy_call,
			metadata::CallIndexTable,
		},
		config::AccountKind,
	};

	struct AlwaysMatches(&'static str);

	impl TxDecoder for AlwaysMatches {
		fn name(&self) -> &'static str {
			self.0
		}

		fn decode(&self, _input: &DecoderInput) -> Option<Classified> {
			Some(Classified {
				kind: TransactionKind::Advanced { section: self.0.into(), method: "x".into() },
				description: self.0.to_string(),
			})
		}
	}

	#[test]
	fn test_unrecognised_call_is_advanced() {
		let fixture = Fixture::new();
		let call = Call::System(SystemCall::Remark { remark: b"hello".to_vec() });
		let classified = classify(&default_decoders(), &fixture.input(&call, None));
		assert_eq!(classified.kind, TransactionKind::Advanced {
			section: "System".into(),
			method: "remark".into()
		});
		assert_eq!(classified.description, "System.remark");
	}

	#[test]
	fn test_first_match_wins() {
		let fixture = Fixture::new();
		let call = Call::System(SystemCall::Remark { remark: vec![] });
		let decoders: Vec<Box<dyn TxDecoder>> =
			vec![Box::new(AlwaysMatches("first")), Box::new(AlwaysMatches("second"))];
		assert_eq!(classify(&decoders, &fixture.input(&call, None)).description, "first");
	}

	#[test]
	fn test_default_decoders_do_not_overlap_on_common_calls() {
		let fixture = Fixture::new();
		let transfer =
			Call::Balances(BalancesCall::TransferKeepAlive { dest: account(9), value: 10 });
		let batch = Call::Utility(UtilityCall::BatchAll {
			calls: vec![transfer.clone(), transfer.clone()],
		});
		for call in [transfer, batch] {
			let input = fixture.input(&call, None);
			let matches =
				default_decoders().iter().filter(|d| d.decode(&input).is_some()).count();
			assert_eq!(matches, 1, "{}", call.name());
		}
	}

	#[test]
	fn test_decode_transaction_end_to_end() {
		let fixture = Fixture::new();
		let table = CallIndexTable::polkadot();
		let codec = CallCodec::new(&table, AccountKind::Substrate);
		let ctx = VaultContext {
			codec,
			multisig: &fixture.vault,
			tokens: &fixture.tokens,
			abis: &fixture.abis,
			current_nominations: None,
			ss58_prefix: 0,
		};
		let inner = Call::Balances(BalancesCall::TransferKeepAlive {
			dest: account(9),
			value: 50_000_000_000,
		});
		let bytes = codec.encode(&wrap_in_proxy_call(account(50), inner.clone())).unwrap();
		let hex_data = format!("0x{}", hex::encode(&bytes));

		let decoded = decode_transaction(&ctx, &default_decoders(), &hex_data, None).unwrap();
		assert_eq!(decoded.inner, inner);
		assert_eq!(decoded.hash, H256(blake2_256(&bytes)));
		let TransactionKind::Transfer(details) = &decoded.kind else { panic!("not a transfer") };
		assert_eq!(details.amount, 50_000_000_000);
		assert!(decoded.description.starts_with("Send 5 DOT to "));

		let foreign = codec.encode(&wrap_in_proxy_call(account(51), decoded.inner)).unwrap();
		let result = decode_transaction_bytes(&ctx, &default_decoders(), foreign, None);
		assert!(matches!(result, Err(SignetError::NotOurs(_))));
	}

	#[test]
	fn test_saved_description_wins() {
		let fixture = Fixture::new();
		let call = Call::Balances(BalancesCall::TransferKeepAlive { dest: account(9), value: 1 });
		let metadata =
			TxMetadata { description: Some("Pay the auditors".into()), ..Default::default() };
		let classified = classify(&default_decoders(), &fixture.input(&call, Some(&metadata)));
		assert_eq!(classified.description, "Pay the auditors");
	}
}
