use super::{Classified, DecoderInput, TransactionKind, TxDecoder};
use crate::chain::{
	abi::DecodedContractCall,
	call::{Call, ContractsCall},
	tokens::TokenId,
};
use sp_core::H256;
use sp_crypto_hashing::blake2_256;

fn call_label(decoded: Option<&DecodedContractCall>) -> String {
	match decoded {
		Some(d) => {
			let args =
				d.args.iter().map(|a| format!("{}: {}", a.label, a.value)).collect::<Vec<_>>();
			format!("{}::{}({})", d.contract, d.label, args.join(", "))
		},
		None => "unknown message".to_string(),
	}
}

/// `Contracts.call`, decoded against the contract's registered ABI when there is one
pub struct ContractCallDecoder;

impl TxDecoder for ContractCallDecoder {
	fn name(&self) -> &'static str {
		"ContractCall"
	}

	fn decode(&self, input: &DecoderInput) -> Option<Classified> {
		let Call::Contracts(ContractsCall::Call { dest, value, data, .. }) = input.call else {
			return None;
		};
		let decoded = input.abis.for_contract(dest).and_then(|abi| abi.decode_message(data));
		let mut summary = format!("Call {} on {}", call_label(decoded.as_ref()), input.short(dest));
		if *value > 0 {
			summary.push_str(&format!(" with {}", input.amount(TokenId::Native, *value)));
		}
		Some(Classified {
			description: input.describe(summary),
			kind: TransactionKind::ContractCall { contract: *dest, value: *value, decoded },
		})
	}
}

/// `Contracts.instantiate` and `Contracts.instantiate_with_code`
pub struct DeployContractDecoder;

impl TxDecoder for DeployContractDecoder {
	fn name(&self) -> &'static str {
		"DeployContract"
	}

	fn decode(&self, input: &DecoderInput) -> Option<Classified> {
		let (value, code_hash, data) = match input.call {
			Call::Contracts(ContractsCall::InstantiateWithCode { value, code, data, .. }) =>
				(*value, H256(blake2_256(code)), data),
			Call::Contracts(ContractsCall::Instantiate { value, code_hash, data, .. }) =>
				(*value, *code_hash, data),
			_ => return None,
		};
		let decoded = input.abis.for_code(&code_hash).and_then(|abi| abi.decode_constructor(data));
		let deployed = input.metadata.and_then(|m| m.contract_deployed);

		let name = decoded.as_ref().map(|d| d.contract.clone()).unwrap_or_else(|| "contract".into());
		let summary = match &deployed {
			Some(address) => format!("Deploy {name} at {}", input.short(address)),
			None => format!("Deploy {name} (code {code_hash:?})"),
		};
		Some(Classified {
			description: input.describe(summary),
			kind: TransactionKind::DeployContract { value, code_hash, decoded, deployed },
		})
	}
}
