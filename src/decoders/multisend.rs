use super::{
	transfer::transfer_details, Classified, DecoderInput, TokenTotal, TransactionKind, TxDecoder,
};
use crate::chain::tokens::TokenId;
use std::collections::BTreeMap;

/// A batch made only of transfers
pub struct MultiSendDecoder;

impl TxDecoder for MultiSendDecoder {
	fn name(&self) -> &'static str {
		"MultiSend"
	}

	fn decode(&self, input: &DecoderInput) -> Option<Classified> {
		let calls = input.call.batch_calls()?;
		if calls.is_empty() {
			return None;
		}
		let sends = calls
			.iter()
			.map(|c| transfer_details(c, input.tokens))
			.collect::<Option<Vec<_>>>()?;

		let mut grouped: BTreeMap<TokenId, u128> = BTreeMap::new();
		for send in &sends {
			let total = grouped.entry(send.token).or_default();
			*total = total.saturating_add(send.amount);
		}
		let totals: Vec<TokenTotal> =
			grouped.into_iter().map(|(token, amount)| TokenTotal { token, amount }).collect();

		let amounts = totals
			.iter()
			.map(|t| input.amount(t.token, t.amount))
			.collect::<Vec<_>>()
			.join(", ");
		let summary = format!("Send {} to {} recipients", amounts, sends.len());

		Some(Classified {
			description: input.describe(summary),
			kind: TransactionKind::MultiSend { sends, totals },
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		chain::call::{AssetsCall, BalancesCall, Call, SystemCall, UtilityCall},
		decoders::test_support::{account, Fixture},
	};

	fn native(to: u8, value: u128) -> Call {
		Call::Balances(BalancesCall::TransferKeepAlive { dest: account(to), value })
	}

	fn asset(id: u32, to: u8, amount: u128) -> Call {
		Call::Assets(AssetsCall::TransferKeepAlive { id, target: account(to), amount })
	}

	#[test]
	fn test_totals_grouped_by_token() {
		let fixture = Fixture::new();
		let call = Call::Utility(UtilityCall::BatchAll {
			calls: vec![
				native(7, 10_000_000_000),
				asset(1984, 8, 1_000_000),
				native(9, 20_000_000_000),
			],
		});
		let classified = MultiSendDecoder.decode(&fixture.input(&call, None)).unwrap();
		let TransactionKind::MultiSend { sends, totals } = classified.kind else {
			panic!("not a multisend")
		};
		assert_eq!(sends.len(), 3);
		assert_eq!(totals, vec![
			TokenTotal { token: TokenId::Native, amount: 30_000_000_000 },
			TokenTotal { token: TokenId::Asset(1984), amount: 1_000_000 },
		]);
		assert_eq!(classified.description, "Send 3 DOT, 1 USDt to 3 recipients");
	}

	#[test]
	fn test_mixed_batch_is_not_multisend() {
		let fixture = Fixture::new();
		let call = Call::Utility(UtilityCall::Batch {
			calls: vec![native(7, 1), Call::System(SystemCall::Remark { remark: vec![1] })],
		});
		assert!(MultiSendDecoder.decode(&fixture.input(&call, None)).is_none());

		let empty = Call::Utility(UtilityCall::Batch { calls: vec![] });
		assert!(MultiSendDecoder.decode(&fixture.input(&empty, None)).is_none());
	}
}
