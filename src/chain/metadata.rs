//! Call index table
//!
//! Maps `(pallet, call)` names to their `(pallet_index, call_index)` on a given runtime and back.
//! Built from runtime metadata when a node is reachable, or from configuration otherwise.
//! A metadata-built table also keeps the runtime's type registry, so calls the vault does not
//! model can still be measured and events can be read.

use crate::error::{Result, SignetError};
use codec::Decode;
use frame_metadata::{RuntimeMetadata, RuntimeMetadataPrefixed};
use scale_info::{PortableRegistry, TypeDef};
use std::{
	collections::{BTreeMap, HashMap},
	sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallIndex {
	pub pallet_index: u8,
	pub call_index: u8,
}

/// Bidirectional call name/index table for one runtime
#[derive(Clone, Debug, Default)]
pub struct CallIndexTable {
	by_name: HashMap<(String, String), CallIndex>,
	by_index: HashMap<(u8, u8), (String, String)>,
	types: Option<Arc<RuntimeTypes>>,
}

/// Type information of one runtime, taken from its metadata
#[derive(Debug)]
pub struct RuntimeTypes {
	registry: PortableRegistry,
	/// Argument type ids of every call, by `(pallet_index, call_index)`
	call_args: HashMap<(u8, u8), Vec<u32>>,
	/// Type of the `System.Events` storage value
	events: Option<u32>,
	/// Pallet name and error enum type, by pallet index
	errors: HashMap<u8, (String, u32)>,
}

impl RuntimeTypes {
	pub fn registry(&self) -> &PortableRegistry {
		&self.registry
	}

	pub fn events_type(&self) -> Option<u32> {
		self.events
	}

	/// Consume the arguments of a call and return their raw bytes.
	///
	/// `None` when the runtime has no such call.
	pub fn read_call_args(
		&self,
		index: CallIndex,
		input: &mut &[u8],
	) -> Option<std::result::Result<Vec<u8>, String>> {
		let fields = self.call_args.get(&(index.pallet_index, index.call_index))?;
		let start = *input;
		for ty in fields {
			if let Err(e) = scale_value::scale::decode_as_type(input, *ty, &self.registry) {
				return Some(Err(format!("argument of type {ty}: {e}")));
			}
		}
		Some(Ok(start[..start.len() - input.len()].to_vec()))
	}

	/// `Pallet.Error` name of a module error, when the runtime describes it
	pub fn module_error(&self, pallet_index: u8, error_index: u8) -> Option<String> {
		let (pallet, ty) = self.errors.get(&pallet_index)?;
		let TypeDef::Variant(variant) = &self.registry.resolve(*ty)?.type_def else {
			return None;
		};
		variant
			.variants
			.iter()
			.find(|v| v.index == error_index)
			.map(|v| format!("{pallet}.{}", v.name))
	}
}

/// Pallet facts shared by V14 and V15 metadata
#[derive(Default)]
struct PalletScan {
	calls: Vec<(String, u8, u32)>,
	errors: HashMap<u8, (String, u32)>,
	events: Option<u32>,
}

macro_rules! scan_pallets {
	($meta:expr, $plain:path) => {{
		let mut scan = PalletScan::default();
		for pallet in &$meta.pallets {
			if let Some(calls) = &pallet.calls {
				scan.calls.push((pallet.name.clone(), pallet.index, calls.ty.id));
			}
			if let Some(error) = &pallet.error {
				scan.errors.insert(pallet.index, (pallet.name.clone(), error.ty.id));
			}
			if pallet.name == "System" {
				scan.events = pallet.storage.as_ref().and_then(|storage| {
					storage.entries.iter().find(|e| e.name == "Events").and_then(|e| match &e.ty {
						$plain(ty) => Some(ty.id),
						_ => None,
					})
				});
			}
		}
		scan
	}};
}

impl CallIndexTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, pallet: &str, call: &str, pallet_index: u8, call_index: u8) {
		let index = CallIndex { pallet_index, call_index };
		if let Some(old) = self.by_name.insert((pallet.to_string(), call.to_string()), index) {
			self.by_index.remove(&(old.pallet_index, old.call_index));
		}
		if let Some(previous) = self
			.by_index
			.insert((pallet_index, call_index), (pallet.to_string(), call.to_string()))
		{
			if previous.0 != pallet || previous.1 != call {
				self.by_name.remove(&previous);
			}
		}
	}

	pub fn index_of(&self, pallet: &str, call: &str) -> Option<CallIndex> {
		self.by_name.get(&(pallet.to_string(), call.to_string())).copied()
	}

	pub fn name_of(&self, pallet_index: u8, call_index: u8) -> Option<(&str, &str)> {
		self.by_index
			.get(&(pallet_index, call_index))
			.map(|(p, c)| (p.as_str(), c.as_str()))
	}

	pub fn len(&self) -> usize {
		self.by_name.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_name.is_empty()
	}

	/// Entries sorted by index
	pub fn entries(&self) -> Vec<(CallIndex, &str, &str)> {
		let mut entries: Vec<_> = self
			.by_name
			.iter()
			.map(|((p, c), idx)| (*idx, p.as_str(), c.as_str()))
			.collect();
		entries.sort_by_key(|(idx, _, _)| (idx.pallet_index, idx.call_index));
		entries
	}

	/// Build from a `"Pallet.call" = [pallet_index, call_index]` map
	pub fn from_config(map: &BTreeMap<String, [u8; 2]>) -> Result<Self> {
		let mut table = Self::new();
		for (key, [pallet_index, call_index]) in map {
			let (pallet, call) = key.split_once('.').ok_or_else(|| {
				SignetError::InvalidConfig(format!(
					"call index key '{key}' must look like 'Pallet.call'"
				))
			})?;
			table.insert(pallet, call, *pallet_index, *call_index);
		}
		Ok(table)
	}

	/// Build from SCALE-encoded `RuntimeMetadataPrefixed` (as returned by `state_getMetadata`)
	pub fn from_metadata_bytes(bytes: &[u8]) -> Result<Self> {
		let prefixed = RuntimeMetadataPrefixed::decode(&mut &bytes[..]).map_err(|e| {
			SignetError::Serialization(format!("failed to decode runtime metadata: {e}"))
		})?;

		let (scan, registry) = match prefixed.1 {
			RuntimeMetadata::V14(meta) =>
				(scan_pallets!(meta, frame_metadata::v14::StorageEntryType::Plain), meta.types),
			RuntimeMetadata::V15(meta) =>
				(scan_pallets!(meta, frame_metadata::v15::StorageEntryType::Plain), meta.types),
			other =>
				return Err(SignetError::Serialization(format!(
					"unsupported runtime metadata version {}",
					other.version()
				))),
		};

		let mut table = Self::new();
		let mut call_args = HashMap::new();
		for (pallet, index, ty) in &scan.calls {
			table.add_pallet(&registry, &mut call_args, pallet, *index, *ty)?;
		}
		table.types = Some(Arc::new(RuntimeTypes {
			registry,
			call_args,
			events: scan.events,
			errors: scan.errors,
		}));
		Ok(table)
	}

	/// Runtime type information, present when built from metadata
	pub fn runtime_types(&self) -> Option<&RuntimeTypes> {
		self.types.as_deref()
	}

	fn add_pallet(
		&mut self,
		registry: &PortableRegistry,
		call_args: &mut HashMap<(u8, u8), Vec<u32>>,
		pallet_name: &str,
		pallet_index: u8,
		call_type_id: u32,
	) -> Result<()> {
		let call_type = registry.resolve(call_type_id).ok_or_else(|| {
			SignetError::Serialization(format!(
				"runtime metadata missing call type {call_type_id} for {pallet_name}"
			))
		})?;
		let TypeDef::Variant(variant) = &call_type.type_def else {
			return Err(SignetError::Serialization(format!(
				"runtime metadata call enum for {pallet_name} is not a variant"
			)));
		};
		for call in &variant.variants {
			self.insert(pallet_name, &call.name, pallet_index, call.index);
			call_args.insert((pallet_index, call.index), call.fields.iter().map(|f| f.ty.id).collect());
		}
		Ok(())
	}

	/// Polkadot relay chain indices for the calls the vault understands
	pub fn polkadot() -> Self {
		let mut table = Self::new();
		for (pallet, call, p, c) in POLKADOT_CALLS {
			table.insert(pallet, call, *p, *c);
		}
		table
	}
}

const POLKADOT_CALLS: &[(&str, &str, u8, u8)] = &[
	("System", "remark", 0, 0),
	("System", "remark_with_event", 0, 7),
	("Balances", "transfer_allow_death", 5, 0),
	("Balances", "transfer_keep_alive", 5, 3),
	("Staking", "nominate", 7, 5),
	("ConvictionVoting", "vote", 20, 0),
	("ConvictionVoting", "remove_vote", 20, 4),
	("Vesting", "vested_transfer", 25, 2),
	("Utility", "batch", 26, 0),
	("Utility", "batch_all", 26, 2),
	("Utility", "force_batch", 26, 4),
	("Proxy", "proxy", 29, 0),
	("Proxy", "add_proxy", 29, 1),
	("Proxy", "remove_proxy", 29, 2),
	("Proxy", "proxy_announced", 29, 9),
	("Multisig", "as_multi_threshold_1", 30, 0),
	("Multisig", "as_multi", 30, 1),
	("Multisig", "approve_as_multi", 30, 2),
	("Multisig", "cancel_as_multi", 30, 3),
	("NominationPools", "nominate", 39, 8),
];

/// A small runtime described through genuine V14 metadata
#[cfg(test)]
#[allow(non_camel_case_types, dead_code)]
pub(crate) mod test_runtime {
	use codec::Encode;
	use frame_metadata::{
		v14::{
			ExtrinsicMetadata, PalletCallMetadata, PalletErrorMetadata, PalletMetadata,
			PalletStorageMetadata, RuntimeMetadataV14, StorageEntryMetadata, StorageEntryModifier,
			StorageEntryType,
		},
		RuntimeMetadata, RuntimeMetadataPrefixed, META_RESERVED,
	};
	use scale_info::{meta_type, MetaType, TypeInfo};

	#[derive(TypeInfo)]
	pub enum SystemCall {
		#[codec(index = 0)]
		remark { remark: Vec<u8> },
	}

	#[derive(TypeInfo)]
	pub enum BalancesCall {
		#[codec(index = 3)]
		transfer_keep_alive { dest: Vec<u8>, #[codec(compact)] value: u128 },
	}

	#[derive(TypeInfo)]
	pub enum StakingCall {
		#[codec(index = 1)]
		bond_extra { #[codec(compact)] max_additional: u128 },
		#[codec(index = 5)]
		nominate { targets: Vec<[u8; 32]> },
	}

	#[derive(TypeInfo)]
	pub enum UtilityCall {
		#[codec(index = 0)]
		batch { calls: Vec<u8> },
		#[codec(index = 2)]
		batch_all { calls: Vec<u8> },
	}

	#[derive(TypeInfo)]
	pub enum ProxyCall {
		#[codec(index = 0)]
		proxy { real: [u8; 32] },
	}

	#[derive(TypeInfo)]
	pub enum MultisigCall {
		#[codec(index = 0)]
		as_multi_threshold_1 { call: Vec<u8> },
		#[codec(index = 1)]
		as_multi { call: Vec<u8> },
		#[codec(index = 2)]
		approve_as_multi { call_hash: [u8; 32] },
		#[codec(index = 3)]
		cancel_as_multi { call_hash: [u8; 32] },
	}

	#[derive(TypeInfo)]
	pub enum MultisigError {
		MinimumThreshold,
		AlreadyApproved,
		NoApprovalsNeeded,
	}

	#[derive(TypeInfo)]
	pub enum ProxyError {
		TooMany,
		NotFound,
		NotProxy,
	}

	#[derive(Clone, Encode, TypeInfo)]
	pub struct ModuleError {
		pub index: u8,
		pub error: [u8; 4],
	}

	#[derive(Clone, Encode, TypeInfo)]
	pub enum DispatchError {
		Other,
		CannotLookup,
		BadOrigin,
		Module(ModuleError),
	}

	#[derive(Clone, Encode, TypeInfo)]
	pub struct DispatchInfo {
		pub weight: u64,
		pub pays_fee: bool,
	}

	#[derive(Clone, Encode, TypeInfo)]
	pub enum SystemEvent {
		ExtrinsicSuccess { dispatch_info: DispatchInfo },
		ExtrinsicFailed { dispatch_error: DispatchError, dispatch_info: DispatchInfo },
	}

	#[derive(Clone, Encode, TypeInfo)]
	pub enum ProxyEvent {
		ProxyExecuted { result: Result<(), DispatchError> },
	}

	#[derive(Clone, Encode, TypeInfo)]
	pub enum MultisigEvent {
		NewMultisig { approving: [u8; 32], multisig: [u8; 32], call_hash: [u8; 32] },
		MultisigExecuted {
			approving: [u8; 32],
			multisig: [u8; 32],
			call_hash: [u8; 32],
			result: Result<(), DispatchError>,
		},
	}

	#[derive(Clone, Encode, TypeInfo)]
	pub enum RuntimeEvent {
		#[codec(index = 0)]
		System(SystemEvent),
		#[codec(index = 29)]
		Proxy(ProxyEvent),
		#[codec(index = 30)]
		Multisig(MultisigEvent),
	}

	#[derive(Clone, Encode, TypeInfo)]
	pub enum Phase {
		ApplyExtrinsic(u32),
		Finalization,
		Initialization,
	}

	#[derive(Clone, Encode, TypeInfo)]
	pub struct EventRecord {
		pub phase: Phase,
		pub event: RuntimeEvent,
		pub topics: Vec<[u8; 32]>,
	}

	pub fn success() -> SystemEvent {
		SystemEvent::ExtrinsicSuccess { dispatch_info: DispatchInfo { weight: 1, pays_fee: true } }
	}

	pub fn failed(dispatch_error: DispatchError) -> SystemEvent {
		SystemEvent::ExtrinsicFailed {
			dispatch_error,
			dispatch_info: DispatchInfo { weight: 1, pays_fee: true },
		}
	}

	pub fn record(extrinsic: u32, event: RuntimeEvent) -> EventRecord {
		EventRecord { phase: Phase::ApplyExtrinsic(extrinsic), event, topics: Vec::new() }
	}

	fn pallet(
		name: &'static str,
		index: u8,
		calls: MetaType,
		error: Option<MetaType>,
	) -> PalletMetadata {
		PalletMetadata {
			name,
			storage: None,
			calls: Some(PalletCallMetadata { ty: calls }),
			event: None,
			constants: Vec::new(),
			error: error.map(|ty| PalletErrorMetadata { ty }),
			index,
		}
	}

	/// SCALE-encoded `RuntimeMetadataPrefixed`, as `state_getMetadata` returns it
	pub fn metadata_bytes() -> Vec<u8> {
		let mut system = pallet("System", 0, meta_type::<SystemCall>(), None);
		system.storage = Some(PalletStorageMetadata {
			prefix: "System",
			entries: vec![StorageEntryMetadata {
				name: "Events",
				modifier: StorageEntryModifier::Default,
				ty: StorageEntryType::Plain(meta_type::<Vec<EventRecord>>()),
				default: vec![0],
				docs: Vec::new(),
			}],
		});
		let pallets = vec![
			system,
			pallet("Balances", 5, meta_type::<BalancesCall>(), None),
			pallet("Staking", 7, meta_type::<StakingCall>(), None),
			pallet("Utility", 26, meta_type::<UtilityCall>(), None),
			pallet("Proxy", 29, meta_type::<ProxyCall>(), Some(meta_type::<ProxyError>())),
			pallet("Multisig", 30, meta_type::<MultisigCall>(), Some(meta_type::<MultisigError>())),
		];
		let extrinsic =
			ExtrinsicMetadata { ty: meta_type::<()>(), version: 4, signed_extensions: Vec::new() };
		let metadata = RuntimeMetadataV14::new(pallets, extrinsic, meta_type::<()>());
		RuntimeMetadataPrefixed(META_RESERVED, RuntimeMetadata::V14(metadata)).encode()
	}
}
