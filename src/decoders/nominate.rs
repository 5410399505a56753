use super::{Classified, DecoderInput, TransactionKind, TxDecoder};
use crate::{
	chain::{
		call::{Call, NominationPoolsCall, StakingCall},
		storage::pool_bonded_account,
	},
	config::AccountKind,
	vault::address::Address,
};
use serde::{Deserialize, Serialize};

/// Change between the current and the proposed nomination set
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorDiff {
	pub added: Vec<Address>,
	pub removed: Vec<Address>,
	pub kept: Vec<Address>,
}

impl ValidatorDiff {
	pub fn between(current: &[Address], proposed: &[Address]) -> Self {
		let mut diff = ValidatorDiff::default();
		for validator in proposed {
			if current.contains(validator) {
				diff.kept.push(*validator);
			} else {
				diff.added.push(*validator);
			}
		}
		diff.removed = current.iter().filter(|v| !proposed.contains(v)).copied().collect();
		diff
	}

	pub fn is_unchanged(&self) -> bool {
		self.added.is_empty() && self.removed.is_empty()
	}
}

/// Account whose nominations a nominate call replaces: the proxied stash for
/// `Staking.nominate`, the pool's bonded account for `NominationPools.nominate`
pub fn nominating_account(call: &Call, proxied: &Address, kind: AccountKind) -> Option<Address> {
	match call {
		Call::Staking(StakingCall::Nominate { .. }) => Some(*proxied),
		Call::NominationPools(NominationPoolsCall::Nominate { pool_id, .. }) =>
			Some(pool_bonded_account(*pool_id, kind)),
		_ => None,
	}
}

fn summary(validators: &[Address], diff: Option<&ValidatorDiff>) -> String {
	match diff {
		Some(diff) if !diff.is_unchanged() => format!(
			"{} validators (+{} / -{})",
			validators.len(),
			diff.added.len(),
			diff.removed.len()
		),
		_ => format!("{} validators", validators.len()),
	}
}

/// `Staking.nominate` from the proxied account
pub struct NominateFromStakingDecoder;

impl TxDecoder for NominateFromStakingDecoder {
	fn name(&self) -> &'static str {
		"NominateFromStaking"
	}

	fn decode(&self, input: &DecoderInput) -> Option<Classified> {
		let Call::Staking(StakingCall::Nominate { targets }) = input.call else {
			return None;
		};
		let diff = input.current_nominations.map(|current| ValidatorDiff::between(current, targets));
		Some(Classified {
			description: input.describe(format!("Nominate {}", summary(targets, diff.as_ref()))),
			kind: TransactionKind::NominateFromStaking { validators: targets.clone(), diff },
		})
	}
}

/// `NominationPools.nominate` for a pool the proxied account manages
pub struct NominateFromNomPoolDecoder;

impl TxDecoder for NominateFromNomPoolDecoder {
	fn name(&self) -> &'static str {
		"NominateFromNomPool"
	}

	fn decode(&self, input: &DecoderInput) -> Option<Classified> {
		let Call::NominationPools(NominationPoolsCall::Nominate { pool_id, validators }) = input.call
		else {
			return None;
		};
		let diff =
			input.current_nominations.map(|current| ValidatorDiff::between(current, validators));
		Some(Classified {
			description: input.describe(format!(
				"Nominate {} for pool #{pool_id}",
				summary(validators, diff.as_ref())
			)),
			kind: TransactionKind::NominateFromNomPool {
				pool_id: *pool_id,
				validators: validators.clone(),
				diff,
			},
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::decoders::test_support::{account, Fixture};

	#[test]
	fn test_validator_diff() {
		let diff = ValidatorDiff::between(&[account(1), account(2)], &[account(2), account(3)]);
		assert_eq!(diff.added, vec![account(3)]);
		assert_eq!(diff.removed, vec![account(1)]);
		assert_eq!(diff.kept, vec![account(2)]);
		assert!(ValidatorDiff::between(&[account(1)], &[account(1)]).is_unchanged());
	}

	#[test]
	fn test_staking_nomination_with_diff() {
		let fixture = Fixture::new();
		let call = Call::Staking(StakingCall::Nominate { targets: vec![account(2), account(3)] });
		let current = [account(1), account(2)];
		let mut input = fixture.input(&call, None);
		input.current_nominations = Some(&current);

		let classified = NominateFromStakingDecoder.decode(&input).unwrap();
		assert_eq!(classified.description, "Nominate 2 validators (+1 / -1)");
		assert!(NominateFromNomPoolDecoder.decode(&input).is_none());
	}

	#[test]
	fn test_nominating_account() {
		let proxied = account(50);
		let staking = Call::Staking(StakingCall::Nominate { targets: vec![account(2)] });
		assert_eq!(nominating_account(&staking, &proxied, AccountKind::Substrate), Some(proxied));

		let pool = Call::NominationPools(NominationPoolsCall::Nominate { pool_id: 3, validators: vec![] });
		assert_eq!(
			nominating_account(&pool, &proxied, AccountKind::Substrate),
			Some(pool_bonded_account(3, AccountKind::Substrate))
		);

		let remark = Call::System(crate::chain::call::SystemCall::Remark { remark: vec![] });
		assert!(nominating_account(&remark, &proxied, AccountKind::Substrate).is_none());
	}

	#[test]
	fn test_pool_nomination() {
		let fixture = Fixture::new();
		let call = Call::NominationPools(NominationPoolsCall::Nominate {
			pool_id: 12,
			validators: vec![account(5)],
		});
		let classified = NominateFromNomPoolDecoder.decode(&fixture.input(&call, None)).unwrap();
		assert_eq!(classified.description, "Nominate 1 validators for pool #12");
		assert!(matches!(
			classified.kind,
			TransactionKind::NominateFromNomPool { pool_id: 12, diff: None, .. }
		));
	}
}
