//! Inner calls the vault proposes. Wrap them with `wrap_in_proxy_call` before approval.

use super::{ProposedConfig, TxMetadata};
use crate::{
	chain::{
		call::{
			AccountVote, AssetsCall, BalancesCall, Call, ConvictionVotingCall, ProxyCall,
			UtilityCall, PROXY_TYPE_ANY,
		},
		tokens::TokenId,
	},
	error::{Result, SignetError},
	vault::{address::Address, multisig::{derive_multisig_address, MultisigConfig}},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferRequest {
	pub recipient: Address,
	pub amount: u128,
	pub token: TokenId,
}

/// Keep-alive transfer of native balance or an asset
pub fn build_transfer(request: TransferRequest) -> Call {
	match request.token {
		TokenId::Native => Call::Balances(BalancesCall::TransferKeepAlive {
			dest: request.recipient,
			value: request.amount,
		}),
		TokenId::Asset(id) => Call::Assets(AssetsCall::TransferKeepAlive {
			id,
			target: request.recipient,
			amount: request.amount,
		}),
	}
}

/// All-or-nothing batch of transfers
pub fn build_multisend(requests: &[TransferRequest]) -> Result<Call> {
	if requests.is_empty() {
		return Err(SignetError::Generic("a multi-send needs at least one recipient".to_string()));
	}
	Ok(Call::Utility(UtilityCall::BatchAll {
		calls: requests.iter().copied().map(build_transfer).collect(),
	}))
}

pub fn build_vote(poll_index: u32, vote: AccountVote) -> Call {
	Call::ConvictionVoting(ConvictionVotingCall::Vote { poll_index, vote })
}

/// Move control of the proxied account to the multisig of `signers`/`threshold`.
///
/// Returns the call and the hint that lets other signers see the proposed configuration.
pub fn build_change_config(
	vault: &MultisigConfig,
	signers: Vec<Address>,
	threshold: u16,
) -> Result<(Call, TxMetadata)> {
	let new_multisig = derive_multisig_address(&signers, threshold)?;
	let current = vault.multisig_address();
	if new_multisig == current {
		return Err(SignetError::InvalidConfig(
			"new signers and threshold match the current configuration".to_string(),
		));
	}
	if new_multisig.is_ethereum() != current.is_ethereum() {
		return Err(SignetError::InvalidConfig(
			"new signers use a different account format".to_string(),
		));
	}

	let call = Call::Utility(UtilityCall::BatchAll {
		calls: vec![
			Call::Proxy(ProxyCall::AddProxy {
				delegate: new_multisig,
				proxy_type: PROXY_TYPE_ANY,
				delay: 0,
			}),
			Call::Proxy(ProxyCall::RemoveProxy {
				delegate: current,
				proxy_type: PROXY_TYPE_ANY,
				delay: 0,
			}),
		],
	});
	let metadata = TxMetadata {
		change_config: Some(ProposedConfig { signers, threshold }),
		..Default::default()
	};
	Ok((call, metadata))
}
