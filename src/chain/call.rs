//! Typed runtime calls and their SCALE codec
//!
//! Only the call shapes the vault reasons about are modelled. Any other call decodes to
//! [`Call::Opaque`]: its arguments are measured with the runtime's type registry when the call
//! table came from metadata, otherwise it must be the trailing argument of its parent (the top
//! level or the inner call of a proxy).

use crate::{
	chain::metadata::{CallIndex, CallIndexTable},
	config::AccountKind,
	error::{Result, SignetError},
	vault::address::Address,
};
use codec::{Compact, Decode, Encode};
use serde::{Deserialize, Serialize};
use sp_core::H256;

/// Proxy type index. `0` is `Any` on every runtime the vault supports.
pub type ProxyType = u8;

pub const PROXY_TYPE_ANY: ProxyType = 0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Weight {
	#[codec(compact)]
	pub ref_time: u64,
	#[codec(compact)]
	pub proof_size: u64,
}

/// Block height and extrinsic index of a multisig's first approval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Encode, Decode, Serialize, Deserialize)]
pub struct Timepoint {
	pub height: u32,
	pub index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct VestingInfo {
	pub locked: u128,
	pub per_block: u128,
	pub starting_block: u32,
}

/// Conviction-voting ballot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountVote {
	/// `vote` packs aye in the top bit and conviction in the low bits
	Standard { vote: u8, balance: u128 },
	Split { aye: u128, nay: u128 },
	SplitAbstain { aye: u128, nay: u128, abstain: u128 },
}

impl AccountVote {
	pub fn standard(aye: bool, conviction: u8, balance: u128) -> Self {
		AccountVote::Standard { vote: (if aye { 0x80 } else { 0 }) | (conviction & 0x7f), balance }
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SystemCall {
	Remark {
		#[serde(with = "hex_bytes")]
		remark: Vec<u8>,
	},
	RemarkWithEvent {
		#[serde(with = "hex_bytes")]
		remark: Vec<u8>,
	},
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum BalancesCall {
	TransferAllowDeath { dest: Address, value: u128 },
	TransferKeepAlive { dest: Address, value: u128 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AssetsCall {
	Transfer { id: u32, target: Address, amount: u128 },
	TransferKeepAlive { id: u32, target: Address, amount: u128 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum VestingCall {
	VestedTransfer { target: Address, schedule: VestingInfo },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum UtilityCall {
	Batch { calls: Vec<Call> },
	BatchAll { calls: Vec<Call> },
	ForceBatch { calls: Vec<Call> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ProxyCall {
	Proxy { real: Address, force_proxy_type: Option<ProxyType>, call: Box<Call> },
	ProxyAnnounced {
		delegate: Address,
		real: Address,
		force_proxy_type: Option<ProxyType>,
		call: Box<Call>,
	},
	AddProxy { delegate: Address, proxy_type: ProxyType, delay: u32 },
	RemoveProxy { delegate: Address, proxy_type: ProxyType, delay: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MultisigCall {
	AsMultiThreshold1 { other_signatories: Vec<Address>, call: Box<Call> },
	AsMulti {
		threshold: u16,
		other_signatories: Vec<Address>,
		maybe_timepoint: Option<Timepoint>,
		call: Box<Call>,
		max_weight: Weight,
	},
	ApproveAsMulti {
		threshold: u16,
		other_signatories: Vec<Address>,
		maybe_timepoint: Option<Timepoint>,
		call_hash: H256,
		max_weight: Weight,
	},
	CancelAsMulti {
		threshold: u16,
		other_signatories: Vec<Address>,
		timepoint: Timepoint,
		call_hash: H256,
	},
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ConvictionVotingCall {
	Vote { poll_index: u32, vote: AccountVote },
	RemoveVote { class: Option<u16>, index: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum StakingCall {
	Nominate { targets: Vec<Address> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum NominationPoolsCall {
	Nominate { pool_id: u32, validators: Vec<Address> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ContractsCall {
	Call {
		dest: Address,
		value: u128,
		gas_limit: Weight,
		storage_deposit_limit: Option<u128>,
		#[serde(with = "hex_bytes")]
		data: Vec<u8>,
	},
	InstantiateWithCode {
		value: u128,
		gas_limit: Weight,
		storage_deposit_limit: Option<u128>,
		#[serde(with = "hex_bytes")]
		code: Vec<u8>,
		#[serde(with = "hex_bytes")]
		data: Vec<u8>,
		#[serde(with = "hex_bytes")]
		salt: Vec<u8>,
	},
	Instantiate {
		value: u128,
		gas_limit: Weight,
		storage_deposit_limit: Option<u128>,
		code_hash: H256,
		#[serde(with = "hex_bytes")]
		data: Vec<u8>,
		#[serde(with = "hex_bytes")]
		salt: Vec<u8>,
	},
}

/// A call the vault does not model, kept as raw argument bytes
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OpaqueCall {
	pub pallet: String,
	pub method: String,
	#[serde(with = "hex_bytes")]
	pub args: Vec<u8>,
}

/// A decoded runtime call
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "section")]
pub enum Call {
	System(SystemCall),
	Balances(BalancesCall),
	Assets(AssetsCall),
	Vesting(VestingCall),
	Utility(UtilityCall),
	Proxy(ProxyCall),
	Multisig(MultisigCall),
	ConvictionVoting(ConvictionVotingCall),
	Staking(StakingCall),
	NominationPools(NominationPoolsCall),
	Contracts(ContractsCall),
	Opaque(OpaqueCall),
}

impl Call {
	/// Pallet name as it appears in metadata
	pub fn section(&self) -> &str {
		match self {
			Call::System(_) => "System",
			Call::Balances(_) => "Balances",
			Call::Assets(_) => "Assets",
			Call::Vesting(_) => "Vesting",
			Call::Utility(_) => "Utility",
			Call::Proxy(_) => "Proxy",
			Call::Multisig(_) => "Multisig",
			Call::ConvictionVoting(_) => "ConvictionVoting",
			Call::Staking(_) => "Staking",
			Call::NominationPools(_) => "NominationPools",
			Call::Contracts(_) => "Contracts",
			Call::Opaque(c) => &c.pallet,
		}
	}

	/// Call name as it appears in metadata
	pub fn method(&self) -> &str {
		match self {
			Call::System(SystemCall::Remark { .. }) => "remark",
			Call::System(SystemCall::RemarkWithEvent { .. }) => "remark_with_event",
			Call::Balances(BalancesCall::TransferAllowDeath { .. }) => "transfer_allow_death",
			Call::Balances(BalancesCall::TransferKeepAlive { .. }) => "transfer_keep_alive",
			Call::Assets(AssetsCall::Transfer { .. }) => "transfer",
			Call::Assets(AssetsCall::TransferKeepAlive { .. }) => "transfer_keep_alive",
			Call::Vesting(VestingCall::VestedTransfer { .. }) => "vested_transfer",
			Call::Utility(UtilityCall::Batch { .. }) => "batch",
			Call::Utility(UtilityCall::BatchAll { .. }) => "batch_all",
			Call::Utility(UtilityCall::ForceBatch { .. }) => "force_batch",
			Call::Proxy(ProxyCall::Proxy { .. }) => "proxy",
			Call::Proxy(ProxyCall::ProxyAnnounced { .. }) => "proxy_announced",
			Call::Proxy(ProxyCall::AddProxy { .. }) => "add_proxy",
			Call::Proxy(ProxyCall::RemoveProxy { .. }) => "remove_proxy",
			Call::Multisig(MultisigCall::AsMultiThreshold1 { .. }) => "as_multi_threshold_1",
			Call::Multisig(MultisigCall::AsMulti { .. }) => "as_multi",
			Call::Multisig(MultisigCall::ApproveAsMulti { .. }) => "approve_as_multi",
			Call::Multisig(MultisigCall::CancelAsMulti { .. }) => "cancel_as_multi",
			Call::ConvictionVoting(ConvictionVotingCall::Vote { .. }) => "vote",
			Call::ConvictionVoting(ConvictionVotingCall::RemoveVote { .. }) => "remove_vote",
			Call::Staking(StakingCall::Nominate { .. }) => "nominate",
			Call::NominationPools(NominationPoolsCall::Nominate { .. }) => "nominate",
			Call::Contracts(ContractsCall::Call { .. }) => "call",
			Call::Contracts(ContractsCall::InstantiateWithCode { .. }) => "instantiate_with_code",
			Call::Contracts(ContractsCall::Instantiate { .. }) => "instantiate",
			Call::Opaque(c) => &c.method,
		}
	}

	/// `Pallet.method`
	pub fn name(&self) -> String {
		format!("{}.{}", self.section(), self.method())
	}

	/// Sub-calls of a utility batch
	pub fn batch_calls(&self) -> Option<&[Call]> {
		match self {
			Call::Utility(
				UtilityCall::Batch { calls } |
				UtilityCall::BatchAll { calls } |
				UtilityCall::ForceBatch { calls },
			) => Some(calls),
			_ => None,
		}
	}
}

type DecodeResult<T> = std::result::Result<T, String>;

fn read<T: Decode>(input: &mut &[u8], what: &str) -> DecodeResult<T> {
	T::decode(input).map_err(|e| format!("failed to decode {what}: {e}"))
}

fn read_compact_u128(input: &mut &[u8], what: &str) -> DecodeResult<u128> {
	Ok(read::<Compact<u128>>(input, what)?.0)
}

/// Encodes and decodes [`Call`]s for one runtime
#[derive(Clone, Copy, Debug)]
pub struct CallCodec<'a> {
	table: &'a CallIndexTable,
	account_kind: AccountKind,
}

impl<'a> CallCodec<'a> {
	pub fn new(table: &'a CallIndexTable, account_kind: AccountKind) -> Self {
		Self { table, account_kind }
	}

	pub fn table(&self) -> &CallIndexTable {
		self.table
	}

	pub fn account_kind(&self) -> AccountKind {
		self.account_kind
	}

	/// Decode a complete call; trailing bytes are an error
	pub fn decode(&self, bytes: &[u8]) -> Result<Call> {
		let mut input = bytes;
		let call = self
			.decode_call(&mut input, true)
			.map_err(|reason| SignetError::invalid_calldata(bytes, reason))?;
		if !input.is_empty() {
			return Err(SignetError::invalid_calldata(
				bytes,
				format!("{} trailing bytes after {}", input.len(), call.name()),
			));
		}
		Ok(call)
	}

	pub fn encode(&self, call: &Call) -> Result<Vec<u8>> {
		let mut out = Vec::new();
		self.encode_call(call, &mut out)?;
		Ok(out)
	}

	fn decode_call(&self, input: &mut &[u8], trailing: bool) -> DecodeResult<Call> {
		let pallet_index: u8 = read(input, "pallet index")?;
		let call_index: u8 = read(input, "call index")?;
		let (pallet, method) = self
			.table
			.name_of(pallet_index, call_index)
			.ok_or_else(|| format!("unknown call index {pallet_index}:{call_index}"))?;

		let call = match (pallet, method) {
			("System", "remark") => Call::System(SystemCall::Remark { remark: read(input, "remark")? }),
			("System", "remark_with_event") =>
				Call::System(SystemCall::RemarkWithEvent { remark: read(input, "remark")? }),
			("Balances", "transfer_allow_death") => Call::Balances(BalancesCall::TransferAllowDeath {
				dest: self.decode_lookup(input)?,
				value: read_compact_u128(input, "value")?,
			}),
			("Balances", "transfer_keep_alive") => Call::Balances(BalancesCall::TransferKeepAlive {
				dest: self.decode_lookup(input)?,
				value: read_compact_u128(input, "value")?,
			}),
			("Assets", "transfer") => Call::Assets(AssetsCall::Transfer {
				id: read::<Compact<u32>>(input, "asset id")?.0,
				target: self.decode_lookup(input)?,
				amount: read_compact_u128(input, "amount")?,
			}),
			("Assets", "transfer_keep_alive") => Call::Assets(AssetsCall::TransferKeepAlive {
				id: read::<Compact<u32>>(input, "asset id")?.0,
				target: self.decode_lookup(input)?,
				amount: read_compact_u128(input, "amount")?,
			}),
			("Vesting", "vested_transfer") => Call::Vesting(VestingCall::VestedTransfer {
				target: self.decode_lookup(input)?,
				schedule: read(input, "vesting schedule")?,
			}),
			("Utility", "batch") => Call::Utility(UtilityCall::Batch { calls: self.decode_calls(input)? }),
			("Utility", "batch_all") =>
				Call::Utility(UtilityCall::BatchAll { calls: self.decode_calls(input)? }),
			("Utility", "force_batch") =>
				Call::Utility(UtilityCall::ForceBatch { calls: self.decode_calls(input)? }),
			("Proxy", "proxy") => Call::Proxy(ProxyCall::Proxy {
				real: self.decode_lookup(input)?,
				force_proxy_type: read(input, "force proxy type")?,
				call: Box::new(self.decode_call(input, trailing)?),
			}),
			("Proxy", "proxy_announced") => Call::Proxy(ProxyCall::ProxyAnnounced {
				delegate: self.decode_lookup(input)?,
				real: self.decode_lookup(input)?,
				force_proxy_type: read(input, "force proxy type")?,
				call: Box::new(self.decode_call(input, trailing)?),
			}),
			("Proxy", "add_proxy") => Call::Proxy(ProxyCall::AddProxy {
				delegate: self.decode_lookup(input)?,
				proxy_type: read(input, "proxy type")?,
				delay: read(input, "delay")?,
			}),
			("Proxy", "remove_proxy") => Call::Proxy(ProxyCall::RemoveProxy {
				delegate: self.decode_lookup(input)?,
				proxy_type: read(input, "proxy type")?,
				delay: read(input, "delay")?,
			}),
			("Multisig", "as_multi_threshold_1") => Call::Multisig(MultisigCall::AsMultiThreshold1 {
				other_signatories: self.decode_accounts(input)?,
				call: Box::new(self.decode_call(input, trailing)?),
			}),
			("Multisig", "as_multi") => Call::Multisig(MultisigCall::AsMulti {
				threshold: read(input, "threshold")?,
				other_signatories: self.decode_accounts(input)?,
				maybe_timepoint: read(input, "timepoint")?,
				call: Box::new(self.decode_call(input, false)?),
				max_weight: read(input, "max weight")?,
			}),
			("Multisig", "approve_as_multi") => Call::Multisig(MultisigCall::ApproveAsMulti {
				threshold: read(input, "threshold")?,
				other_signatories: self.decode_accounts(input)?,
				maybe_timepoint: read(input, "timepoint")?,
				call_hash: read(input, "call hash")?,
				max_weight: read(input, "max weight")?,
			}),
			("Multisig", "cancel_as_multi") => Call::Multisig(MultisigCall::CancelAsMulti {
				threshold: read(input, "threshold")?,
				other_signatories: self.decode_accounts(input)?,
				timepoint: read(input, "timepoint")?,
				call_hash: read(input, "call hash")?,
			}),
			("ConvictionVoting", "vote") => Call::ConvictionVoting(ConvictionVotingCall::Vote {
				poll_index: read::<Compact<u32>>(input, "poll index")?.0,
				vote: read(input, "vote")?,
			}),
			("ConvictionVoting", "remove_vote") =>
				Call::ConvictionVoting(ConvictionVotingCall::RemoveVote {
					class: read(input, "class")?,
					index: read(input, "poll index")?,
				}),
			("Staking", "nominate") => {
				let len = read::<Compact<u32>>(input, "targets length")?.0;
				let targets =
					(0..len).map(|_| self.decode_lookup(input)).collect::<DecodeResult<Vec<_>>>()?;
				Call::Staking(StakingCall::Nominate { targets })
			},
			("NominationPools", "nominate") => Call::NominationPools(NominationPoolsCall::Nominate {
				pool_id: read(input, "pool id")?,
				validators: self.decode_accounts(input)?,
			}),
			("Contracts", "call") => Call::Contracts(ContractsCall::Call {
				dest: self.decode_lookup(input)?,
				value: read_compact_u128(input, "value")?,
				gas_limit: read(input, "gas limit")?,
				storage_deposit_limit: read::<Option<Compact<u128>>>(input, "storage deposit limit")?
					.map(|c| c.0),
				data: read(input, "data")?,
			}),
			("Contracts", "instantiate_with_code") =>
				Call::Contracts(ContractsCall::InstantiateWithCode {
					value: read_compact_u128(input, "value")?,
					gas_limit: read(input, "gas limit")?,
					storage_deposit_limit: read::<Option<Compact<u128>>>(
						input,
						"storage deposit limit",
					)?
					.map(|c| c.0),
					code: read(input, "code")?,
					data: read(input, "data")?,
					salt: read(input, "salt")?,
				}),
			("Contracts", "instantiate") => Call::Contracts(ContractsCall::Instantiate {
				value: read_compact_u128(input, "value")?,
				gas_limit: read(input, "gas limit")?,
				storage_deposit_limit: read::<Option<Compact<u128>>>(input, "storage deposit limit")?
					.map(|c| c.0),
				code_hash: read(input, "code hash")?,
				data: read(input, "data")?,
				salt: read(input, "salt")?,
			}),
			(pallet, method) => {
				let index = CallIndex { pallet_index, call_index };
				let measured =
					self.table.runtime_types().and_then(|types| types.read_call_args(index, input));
				let args = match measured {
					Some(args) => args.map_err(|e| format!("{pallet}.{method}: {e}"))?,
					None if trailing => {
						let args = input.to_vec();
						*input = &[];
						args
					},
					None =>
						return Err(format!(
							"{pallet}.{method} cannot be decoded inside another call's arguments"
						)),
				};
				Call::Opaque(OpaqueCall { pallet: pallet.to_string(), method: method.to_string(), args })
			},
		};
		Ok(call)
	}

	fn decode_calls(&self, input: &mut &[u8]) -> DecodeResult<Vec<Call>> {
		let len = read::<Compact<u32>>(input, "call count")?.0;
		(0..len).map(|_| self.decode_call(input, false)).collect()
	}

	fn decode_account(&self, input: &mut &[u8]) -> DecodeResult<Address> {
		match self.account_kind {
			AccountKind::Substrate => Ok(Address::Substrate(read(input, "account id")?)),
			AccountKind::Ethereum => Ok(Address::Ethereum(read(input, "account id")?)),
		}
	}

	fn decode_accounts(&self, input: &mut &[u8]) -> DecodeResult<Vec<Address>> {
		let len = read::<Compact<u32>>(input, "account count")?.0;
		(0..len).map(|_| self.decode_account(input)).collect()
	}

	/// `MultiAddress` on Substrate chains, a plain account on Ethereum-style chains
	fn decode_lookup(&self, input: &mut &[u8]) -> DecodeResult<Address> {
		if self.account_kind == AccountKind::Ethereum {
			return self.decode_account(input);
		}
		match read::<u8>(input, "address variant")? {
			0 | 3 => Ok(Address::Substrate(read(input, "account id")?)),
			4 => Ok(Address::Ethereum(read(input, "account id")?)),
			1 => Err("account index lookups are not supported".to_string()),
			2 => Err("raw address lookups are not supported".to_string()),
			other => Err(format!("unknown address variant {other}")),
		}
	}

	fn encode_index(&self, pallet: &str, method: &str, out: &mut Vec<u8>) -> Result<()> {
		let index = self.table.index_of(pallet, method).ok_or_else(|| {
			SignetError::Generic(format!("{pallet}.{method} is not available on this chain"))
		})?;
		out.push(index.pallet_index);
		out.push(index.call_index);
		Ok(())
	}

	fn encode_account(&self, address: &Address, out: &mut Vec<u8>) -> Result<()> {
		match (self.account_kind, address) {
			(AccountKind::Substrate, Address::Substrate(raw)) => raw.encode_to(out),
			(AccountKind::Ethereum, Address::Ethereum(raw)) => raw.encode_to(out),
			_ =>
				return Err(SignetError::InvalidAddress(format!(
					"{} does not match the chain's account format",
					address.to_pub_key()
				))),
		}
		Ok(())
	}

	fn encode_accounts(&self, addresses: &[Address], out: &mut Vec<u8>) -> Result<()> {
		Compact(addresses.len() as u32).encode_to(out);
		for address in addresses {
			self.encode_account(address, out)?;
		}
		Ok(())
	}

	fn encode_lookup(&self, address: &Address, out: &mut Vec<u8>) -> Result<()> {
		match (self.account_kind, address) {
			(AccountKind::Ethereum, _) => self.encode_account(address, out)?,
			(AccountKind::Substrate, Address::Substrate(raw)) => {
				out.push(0);
				raw.encode_to(out);
			},
			(AccountKind::Substrate, Address::Ethereum(raw)) => {
				out.push(4);
				raw.encode_to(out);
			},
		}
		Ok(())
	}

	fn encode_call(&self, call: &Call, out: &mut Vec<u8>) -> Result<()> {
		if let Call::Opaque(opaque) = call {
			self.encode_index(&opaque.pallet, &opaque.method, out)?;
			out.extend_from_slice(&opaque.args);
			return Ok(());
		}
		self.encode_index(call.section(), call.method(), out)?;

		match call {
			Call::System(SystemCall::Remark { remark } | SystemCall::RemarkWithEvent { remark }) =>
				remark.encode_to(out),
			Call::Balances(
				BalancesCall::TransferAllowDeath { dest, value } |
				BalancesCall::TransferKeepAlive { dest, value },
			) => {
				self.encode_lookup(dest, out)?;
				Compact(*value).encode_to(out);
			},
			Call::Assets(
				AssetsCall::Transfer { id, target, amount } |
				AssetsCall::TransferKeepAlive { id, target, amount },
			) => {
				Compact(*id).encode_to(out);
				self.encode_lookup(target, out)?;
				Compact(*amount).encode_to(out);
			},
			Call::Vesting(VestingCall::VestedTransfer { target, schedule }) => {
				self.encode_lookup(target, out)?;
				schedule.encode_to(out);
			},
			Call::Utility(
				UtilityCall::Batch { calls } |
				UtilityCall::BatchAll { calls } |
				UtilityCall::ForceBatch { calls },
			) => {
				Compact(calls.len() as u32).encode_to(out);
				for inner in calls {
					self.encode_call(inner, out)?;
				}
			},
			Call::Proxy(ProxyCall::Proxy { real, force_proxy_type, call }) => {
				self.encode_lookup(real, out)?;
				force_proxy_type.encode_to(out);
				self.encode_call(call, out)?;
			},
			Call::Proxy(ProxyCall::ProxyAnnounced { delegate, real, force_proxy_type, call }) => {
				self.encode_lookup(delegate, out)?;
				self.encode_lookup(real, out)?;
				force_proxy_type.encode_to(out);
				self.encode_call(call, out)?;
			},
			Call::Proxy(
				ProxyCall::AddProxy { delegate, proxy_type, delay } |
				ProxyCall::RemoveProxy { delegate, proxy_type, delay },
			) => {
				self.encode_lookup(delegate, out)?;
				proxy_type.encode_to(out);
				delay.encode_to(out);
			},
			Call::Multisig(MultisigCall::AsMultiThreshold1 { other_signatories, call }) => {
				self.encode_accounts(other_signatories, out)?;
				self.encode_call(call, out)?;
			},
			Call::Multisig(MultisigCall::AsMulti {
				threshold,
				other_signatories,
				maybe_timepoint,
				call,
				max_weight,
			}) => {
				threshold.encode_to(out);
				self.encode_accounts(other_signatories, out)?;
				maybe_timepoint.encode_to(out);
				self.encode_call(call, out)?;
				max_weight.encode_to(out);
			},
			Call::Multisig(MultisigCall::ApproveAsMulti {
				threshold,
				other_signatories,
				maybe_timepoint,
				call_hash,
				max_weight,
			}) => {
				threshold.encode_to(out);
				self.encode_accounts(other_signatories, out)?;
				maybe_timepoint.encode_to(out);
				call_hash.encode_to(out);
				max_weight.encode_to(out);
			},
			Call::Multisig(MultisigCall::CancelAsMulti {
				threshold,
				other_signatories,
				timepoint,
				call_hash,
			}) => {
				threshold.encode_to(out);
				self.encode_accounts(other_signatories, out)?;
				timepoint.encode_to(out);
				call_hash.encode_to(out);
			},
			Call::ConvictionVoting(ConvictionVotingCall::Vote { poll_index, vote }) => {
				Compact(*poll_index).encode_to(out);
				vote.encode_to(out);
			},
			Call::ConvictionVoting(ConvictionVotingCall::RemoveVote { class, index }) => {
				class.encode_to(out);
				index.encode_to(out);
			},
			Call::Staking(StakingCall::Nominate { targets }) => {
				Compact(targets.len() as u32).encode_to(out);
				for target in targets {
					self.encode_lookup(target, out)?;
				}
			},
			Call::NominationPools(NominationPoolsCall::Nominate { pool_id, validators }) => {
				pool_id.encode_to(out);
				self.encode_accounts(validators, out)?;
			},
			Call::Contracts(ContractsCall::Call {
				dest,
				value,
				gas_limit,
				storage_deposit_limit,
				data,
			}) => {
				self.encode_lookup(dest, out)?;
				Compact(*value).encode_to(out);
				gas_limit.encode_to(out);
				storage_deposit_limit.map(Compact).encode_to(out);
				data.encode_to(out);
			},
			Call::Contracts(ContractsCall::InstantiateWithCode {
				value,
				gas_limit,
				storage_deposit_limit,
				code,
				data,
				salt,
			}) => {
				Compact(*value).encode_to(out);
				gas_limit.encode_to(out);
				storage_deposit_limit.map(Compact).encode_to(out);
				code.encode_to(out);
				data.encode_to(out);
				salt.encode_to(out);
			},
			Call::Contracts(ContractsCall::Instantiate {
				value,
				gas_limit,
				storage_deposit_limit,
				code_hash,
				data,
				salt,
			}) => {
				Compact(*value).encode_to(out);
				gas_limit.encode_to(out);
				storage_deposit_limit.map(Compact).encode_to(out);
				code_hash.encode_to(out);
				data.encode_to(out);
				salt.encode_to(out);
			},
			Call::Opaque(_) => {},
		}
		Ok(())
	}
}

/// Serde adapter rendering byte vectors as `0x` hex
pub mod hex_bytes {
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let raw = String::deserialize(deserializer)?;
		hex::decode(raw.trim_start_matches("0x")).map_err(serde::de::Error::custom)
	}
}
