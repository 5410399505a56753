use super::{Classified, DecoderInput, TransactionKind, TxDecoder};
use crate::chain::{
	call::{AccountVote, Call, ConvictionVotingCall},
	tokens::TokenId,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoteDetails {
	Standard { aye: bool, conviction: u8, balance: u128 },
	Split { aye: u128, nay: u128 },
	SplitAbstain { aye: u128, nay: u128, abstain: u128 },
	Remove { class: Option<u16> },
}

impl VoteDetails {
	pub fn from_account_vote(vote: &AccountVote) -> Self {
		match *vote {
			AccountVote::Standard { vote, balance } =>
				VoteDetails::Standard { aye: vote & 0x80 != 0, conviction: vote & 0x7f, balance },
			AccountVote::Split { aye, nay } => VoteDetails::Split { aye, nay },
			AccountVote::SplitAbstain { aye, nay, abstain } =>
				VoteDetails::SplitAbstain { aye, nay, abstain },
		}
	}

	/// Balance committed to the vote. Split votes count both sides, removals count nothing.
	pub fn weight(&self) -> u128 {
		match self {
			VoteDetails::Standard { balance, .. } => *balance,
			VoteDetails::Split { aye, nay } => aye.saturating_add(*nay),
			VoteDetails::SplitAbstain { aye, nay, abstain } =>
				aye.saturating_add(*nay).saturating_add(*abstain),
			VoteDetails::Remove { .. } => 0,
		}
	}
}

fn conviction_label(conviction: u8) -> String {
	match conviction {
		0 => "0.1x".to_string(),
		n => format!("{n}x"),
	}
}

/// Conviction voting
pub struct VoteDecoder;

impl TxDecoder for VoteDecoder {
	fn name(&self) -> &'static str {
		"Vote"
	}

	fn decode(&self, input: &DecoderInput) -> Option<Classified> {
		let (poll_index, details) = match input.call {
			Call::ConvictionVoting(ConvictionVotingCall::Vote { poll_index, vote }) =>
				(*poll_index, VoteDetails::from_account_vote(vote)),
			Call::ConvictionVoting(ConvictionVotingCall::RemoveVote { class, index }) =>
				(*index, VoteDetails::Remove { class: *class }),
			_ => return None,
		};
		let weight = details.weight();
		let amount = input.amount(TokenId::Native, weight);

		let summary = match &details {
			VoteDetails::Standard { aye, conviction, .. } => format!(
				"Vote {} on referendum #{poll_index} with {amount} ({} conviction)",
				if *aye { "Aye" } else { "Nay" },
				conviction_label(*conviction)
			),
			VoteDetails::Split { .. } => format!("Split vote on referendum #{poll_index} with {amount}"),
			VoteDetails::SplitAbstain { .. } =>
				format!("Split/abstain vote on referendum #{poll_index} with {amount}"),
			VoteDetails::Remove { .. } => format!("Remove vote on referendum #{poll_index}"),
		};

		Some(Classified {
			description: input.describe(summary),
			kind: TransactionKind::Vote { poll_index, details, weight },
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::decoders::test_support::Fixture;

	fn vote(vote: AccountVote) -> Call {
		Call::ConvictionVoting(ConvictionVotingCall::Vote { poll_index: 42, vote })
	}

	#[test]
	fn test_standard_vote() {
		let fixture = Fixture::new();
		let call = vote(AccountVote::standard(true, 3, 50_000_000_000));
		let classified = VoteDecoder.decode(&fixture.input(&call, None)).unwrap();
		assert_eq!(classified.description, "Vote Aye on referendum #42 with 5 DOT (3x conviction)");
		let TransactionKind::Vote { weight, details, .. } = classified.kind else { panic!() };
		assert_eq!(weight, 50_000_000_000);
		assert_eq!(details, VoteDetails::Standard { aye: true, conviction: 3, balance: 50_000_000_000 });
	}

	#[test]
	fn test_vote_weights() {
		assert_eq!(VoteDetails::SplitAbstain { aye: 1, nay: 2, abstain: 3 }.weight(), 6);
		assert_eq!(VoteDetails::Split { aye: 4, nay: 5 }.weight(), 9);
		assert_eq!(VoteDetails::Remove { class: Some(0) }.weight(), 0);
	}

	#[test]
	fn test_remove_vote() {
		let fixture = Fixture::new();
		let call =
			Call::ConvictionVoting(ConvictionVotingCall::RemoveVote { class: None, index: 9 });
		let classified = VoteDecoder.decode(&fixture.input(&call, None)).unwrap();
		assert_eq!(classified.description, "Remove vote on referendum #9");
		assert!(matches!(classified.kind, TransactionKind::Vote { weight: 0, .. }));
	}
}
