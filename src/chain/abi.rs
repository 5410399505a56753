//! ink! contract ABIs and selector-based argument decoding

use crate::{
	error::{Result, SignetError},
	vault::address::Address,
};
use codec::Decode;
use serde::{Deserialize, Serialize};
use sp_core::H256;
use std::{collections::HashMap, path::Path};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiArg {
	pub label: String,
	pub type_id: u32,
	pub display_name: String,
}

/// A constructor or message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEntry {
	pub label: String,
	pub selector: [u8; 4],
	pub args: Vec<AbiArg>,
	pub payable: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
	Bool,
	Char,
	Str,
	U8,
	U16,
	U32,
	U64,
	U128,
	I8,
	I16,
	I32,
	I64,
	I128,
}

/// Contract ABI reduced to what is needed to label calls
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAbi {
	pub name: String,
	/// Code hash from the bundle's `source.hash`
	#[serde(default)]
	pub code_hash: Option<H256>,
	pub constructors: Vec<AbiEntry>,
	pub messages: Vec<AbiEntry>,
	primitives: HashMap<u32, Primitive>,
	/// Type ids that are 32-byte accounts
	accounts: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedArg {
	pub label: String,
	pub type_name: String,
	pub value: String,
}

/// A message or constructor call matched by selector
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedContractCall {
	pub contract: String,
	pub label: String,
	pub args: Vec<DecodedArg>,
	/// Undecoded argument bytes, when an argument type is not a primitive
	pub remainder: Option<String>,
}

// Raw ink! metadata shapes
#[derive(Deserialize)]
struct RawMetadata {
	#[serde(default)]
	source: Option<RawSource>,
	#[serde(default)]
	contract: Option<RawContract>,
	spec: RawSpec,
	#[serde(default)]
	types: Vec<RawType>,
}

#[derive(Deserialize)]
struct RawSource {
	#[serde(default)]
	hash: Option<String>,
}

#[derive(Deserialize)]
struct RawContract {
	name: String,
}

#[derive(Deserialize)]
struct RawSpec {
	#[serde(default)]
	constructors: Vec<RawEntry>,
	#[serde(default)]
	messages: Vec<RawEntry>,
}

#[derive(Deserialize)]
struct RawEntry {
	label: String,
	selector: String,
	#[serde(default)]
	args: Vec<RawArg>,
	#[serde(default)]
	payable: bool,
}

#[derive(Deserialize)]
struct RawArg {
	label: String,
	#[serde(rename = "type")]
	ty: RawTypeRef,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTypeRef {
	#[serde(rename = "type")]
	id: u32,
	#[serde(default)]
	display_name: Vec<String>,
}

#[derive(Deserialize)]
struct RawType {
	id: u32,
	#[serde(rename = "type")]
	ty: serde_json::Value,
}

fn parse_code_hash(raw: &str) -> Result<H256> {
	let bytes = hex::decode(raw.trim_start_matches("0x"))
		.map_err(|e| SignetError::Serialization(format!("invalid code hash {raw}: {e}")))?;
	if bytes.len() != 32 {
		return Err(SignetError::Serialization(format!("code hash {raw} is not 32 bytes")));
	}
	Ok(H256::from_slice(&bytes))
}

fn parse_selector(raw: &str) -> Result<[u8; 4]> {
	let bytes = hex::decode(raw.trim_start_matches("0x"))
		.map_err(|e| SignetError::Serialization(format!("invalid selector {raw}: {e}")))?;
	bytes
		.try_into()
		.map_err(|_| SignetError::Serialization(format!("selector {raw} is not 4 bytes")))
}

impl ContractAbi {
	/// Parse ink! metadata JSON (`.json` or the `.contract` bundle)
	pub fn from_json(json: &str) -> Result<Self> {
		let raw: RawMetadata = serde_json::from_str(json)?;

		let convert = |entries: Vec<RawEntry>| -> Result<Vec<AbiEntry>> {
			entries
				.into_iter()
				.map(|e| {
					Ok(AbiEntry {
						selector: parse_selector(&e.selector)?,
						label: e.label,
						payable: e.payable,
						args: e
							.args
							.into_iter()
							.map(|a| AbiArg {
								label: a.label,
								type_id: a.ty.id,
								display_name: a.ty.display_name.join("::"),
							})
							.collect(),
					})
				})
				.collect()
		};

		let mut primitives = HashMap::new();
		let mut accounts = Vec::new();
		for t in &raw.types {
			if let Some(p) = t.ty.pointer("/def/primitive") {
				if let Ok(p) = serde_json::from_value::<Primitive>(p.clone()) {
					primitives.insert(t.id, p);
				}
			}
			let is_account = t
				.ty
				.pointer("/path")
				.and_then(|p| p.as_array())
				.and_then(|p| p.last())
				.and_then(|p| p.as_str())
				.is_some_and(|name| name == "AccountId");
			if is_account {
				accounts.push(t.id);
			}
		}

		let code_hash = raw
			.source
			.and_then(|s| s.hash)
			.map(|hash| parse_code_hash(&hash))
			.transpose()?;

		Ok(Self {
			name: raw.contract.map(|c| c.name).unwrap_or_else(|| "contract".to_string()),
			code_hash,
			constructors: convert(raw.spec.constructors)?,
			messages: convert(raw.spec.messages)?,
			primitives,
			accounts,
		})
	}

	pub fn message(&self, selector: [u8; 4]) -> Option<&AbiEntry> {
		self.messages.iter().find(|m| m.selector == selector)
	}

	pub fn constructor(&self, selector: [u8; 4]) -> Option<&AbiEntry> {
		self.constructors.iter().find(|c| c.selector == selector)
	}

	/// Decode `Contracts.call` input data
	pub fn decode_message(&self, data: &[u8]) -> Option<DecodedContractCall> {
		let (selector, args) = split_selector(data)?;
		self.message(selector).map(|entry| self.decode_entry(entry, args))
	}

	/// Decode instantiate input data
	pub fn decode_constructor(&self, data: &[u8]) -> Option<DecodedContractCall> {
		let (selector, args) = split_selector(data)?;
		self.constructor(selector).map(|entry| self.decode_entry(entry, args))
	}

	fn decode_entry(&self, entry: &AbiEntry, mut input: &[u8]) -> DecodedContractCall {
		let mut args = Vec::with_capacity(entry.args.len());
		let mut remainder = None;
		for arg in &entry.args {
			match self.decode_value(arg.type_id, &mut input) {
				Some(value) => args.push(DecodedArg {
					label: arg.label.clone(),
					type_name: arg.display_name.clone(),
					value,
				}),
				None => {
					remainder = Some(format!("0x{}", hex::encode(input)));
					break;
				},
			}
		}
		DecodedContractCall {
			contract: self.name.clone(),
			label: entry.label.clone(),
			args,
			remainder,
		}
	}

	fn decode_value(&self, type_id: u32, input: &mut &[u8]) -> Option<String> {
		if self.accounts.contains(&type_id) {
			return <[u8; 32]>::decode(input).ok().map(|raw| Address::Substrate(raw).to_string());
		}
		let value = match self.primitives.get(&type_id)? {
			Primitive::Bool => bool::decode(input).ok()?.to_string(),
			Primitive::Char => char::from_u32(u32::decode(input).ok()?)?.to_string(),
			Primitive::Str => String::decode(input).ok()?,
			Primitive::U8 => u8::decode(input).ok()?.to_string(),
			Primitive::U16 => u16::decode(input).ok()?.to_string(),
			Primitive::U32 => u32::decode(input).ok()?.to_string(),
			Primitive::U64 => u64::decode(input).ok()?.to_string(),
			Primitive::U128 => u128::decode(input).ok()?.to_string(),
			Primitive::I8 => i8::decode(input).ok()?.to_string(),
			Primitive::I16 => i16::decode(input).ok()?.to_string(),
			Primitive::I32 => i32::decode(input).ok()?.to_string(),
			Primitive::I64 => i64::decode(input).ok()?.to_string(),
			Primitive::I128 => i128::decode(input).ok()?.to_string(),
		};
		Some(value)
	}
}

fn split_selector(data: &[u8]) -> Option<([u8; 4], &[u8])> {
	if data.len() < 4 {
		return None;
	}
	let (selector, rest) = data.split_at(4);
	Some((selector.try_into().ok()?, rest))
}

/// ABIs registered by the user, keyed by contract address and by code hash
#[derive(Clone, Debug, Default)]
pub struct AbiRegistry {
	by_address: HashMap<Address, ContractAbi>,
	by_code_hash: HashMap<H256, ContractAbi>,
}

impl AbiRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register_contract(&mut self, address: Address, abi: ContractAbi) {
		self.by_address.insert(address, abi);
	}

	pub fn register_code(&mut self, code_hash: H256, abi: ContractAbi) {
		self.by_code_hash.insert(code_hash, abi);
	}

	pub fn for_contract(&self, address: &Address) -> Option<&ContractAbi> {
		self.by_address.get(address)
	}

	pub fn for_code(&self, code_hash: &H256) -> Option<&ContractAbi> {
		self.by_code_hash.get(code_hash)
	}

	/// Register an ABI file by its code hash and, when given, by contract address
	pub fn load_file(&mut self, path: &Path, address: Option<Address>) -> Result<()> {
		let json = std::fs::read_to_string(path).map_err(|e| {
			SignetError::InvalidConfig(format!("cannot read ABI {}: {e}", path.display()))
		})?;
		let abi = ContractAbi::from_json(&json)?;
		if abi.code_hash.is_none() && address.is_none() {
			return Err(SignetError::InvalidConfig(format!(
				"ABI {} has no source hash; give the contract address",
				path.display()
			)));
		}
		log::debug!("registered ABI '{}' from {}", abi.name, path.display());
		if let Some(code_hash) = abi.code_hash {
			self.register_code(code_hash, abi.clone());
		}
		if let Some(address) = address {
			self.register_contract(address, abi);
		}
		Ok(())
	}

	pub fn len(&self) -> usize {
		self.by_address.len() + self.by_code_hash.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
