use super::{Classified, DecoderInput, TransactionKind, TransferDetails, TxDecoder};
use crate::chain::{
	call::{AssetsCall, BalancesCall, Call, VestingCall},
	tokens::{TokenId, TokenRegistry},
};

/// Read a single balance-moving call. Asset transfers only count for registered tokens.
pub(crate) fn transfer_details(call: &Call, tokens: &TokenRegistry) -> Option<TransferDetails> {
	match call {
		Call::Balances(
			BalancesCall::TransferAllowDeath { dest, value } |
			BalancesCall::TransferKeepAlive { dest, value },
		) => Some(TransferDetails {
			recipient: *dest,
			amount: *value,
			token: TokenId::Native,
			vesting: None,
		}),
		Call::Assets(
			AssetsCall::Transfer { id, target, amount } |
			AssetsCall::TransferKeepAlive { id, target, amount },
		) => {
			let token = TokenId::Asset(*id);
			tokens.get(token)?;
			Some(TransferDetails { recipient: *target, amount: *amount, token, vesting: None })
		},
		Call::Vesting(VestingCall::VestedTransfer { target, schedule }) => Some(TransferDetails {
			recipient: *target,
			amount: schedule.locked,
			token: TokenId::Native,
			vesting: Some(*schedule),
		}),
		_ => None,
	}
}

/// One transfer to one recipient
pub struct TransferDecoder;

impl TxDecoder for TransferDecoder {
	fn name(&self) -> &'static str {
		"Transfer"
	}

	fn decode(&self, input: &DecoderInput) -> Option<Classified> {
		let details = transfer_details(input.call, input.tokens)?;
		let mut summary = format!(
			"Send {} to {}",
			input.amount(details.token, details.amount),
			input.short(&details.recipient)
		);
		if let Some(vesting) = &details.vesting {
			summary.push_str(&format!(", vesting from block {}", vesting.starting_block));
		}
		Some(Classified {
			description: input.describe(summary),
			kind: TransactionKind::Transfer(details),
		})
	}
}
