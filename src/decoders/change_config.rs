use super::{Classified, DecoderInput, ProposedConfig, TransactionKind, TxDecoder};
use crate::{
	chain::call::{Call, ProxyCall, PROXY_TYPE_ANY},
	vault::{address::Address, multisig::derive_multisig_address},
};

fn added_delegate(call: &Call) -> Option<Address> {
	match call {
		Call::Proxy(ProxyCall::AddProxy { delegate, proxy_type: PROXY_TYPE_ANY, delay: 0 }) =>
			Some(*delegate),
		_ => None,
	}
}

fn removed_delegate(call: &Call) -> Option<Address> {
	match call {
		Call::Proxy(ProxyCall::RemoveProxy { delegate, proxy_type: PROXY_TYPE_ANY, delay: 0 }) =>
			Some(*delegate),
		_ => None,
	}
}

/// Hand control of the proxied account to a new multisig:
/// a batch of `add_proxy(new)` and `remove_proxy(current)`, in either order
pub struct ChangeConfigDecoder;

impl ChangeConfigDecoder {
	/// Accept the saved signer set only if it derives the multisig being added
	fn verified_hint(input: &DecoderInput, new_multisig: &Address) -> Option<ProposedConfig> {
		let hint = input.metadata?.change_config.as_ref()?;
		match derive_multisig_address(&hint.signers, hint.threshold) {
			Ok(derived) if derived == *new_multisig => Some(hint.clone()),
			Ok(derived) => {
				log::warn!(
					"change-config hint derives {} but the call adds {}",
					derived.to_pub_key(),
					new_multisig.to_pub_key()
				);
				None
			},
			Err(e) => {
				log::warn!("ignoring invalid change-config hint: {e}");
				None
			},
		}
	}
}

impl TxDecoder for ChangeConfigDecoder {
	fn name(&self) -> &'static str {
		"ChangeConfig"
	}

	fn decode(&self, input: &DecoderInput) -> Option<Classified> {
		let [first, second] = input.call.batch_calls()? else {
			return None;
		};
		let (added, removed) = match (added_delegate(first), removed_delegate(second)) {
			(Some(added), Some(removed)) => (added, removed),
			_ => (added_delegate(second)?, removed_delegate(first)?),
		};
		let current = input.multisig.multisig_address();
		if removed != current || added == current {
			return None;
		}

		let proposed = Self::verified_hint(input, &added);
		let summary = match &proposed {
			Some(config) => format!(
				"Change signers to {} members with threshold {}",
				config.signers.len(),
				config.threshold
			),
			None => format!("Change vault controller to {}", input.short(&added)),
		};
		Some(Classified {
			description: input.describe(summary),
			kind: TransactionKind::ChangeConfig { new_multisig: added, proposed },
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		chain::call::UtilityCall,
		decoders::{
			test_support::{account, Fixture},
			TxMetadata,
		},
	};

	fn change(add: Address, remove: Address, swap: bool) -> Call {
		let add = Call::Proxy(ProxyCall::AddProxy { delegate: add, proxy_type: 0, delay: 0 });
		let remove = Call::Proxy(ProxyCall::RemoveProxy { delegate: remove, proxy_type: 0, delay: 0 });
		let calls = if swap { vec![remove, add] } else { vec![add, remove] };
		Call::Utility(UtilityCall::BatchAll { calls })
	}

	#[test]
	fn test_change_config_with_hint() {
		let fixture = Fixture::new();
		let signers = vec![account(1), account(2), account(4)];
		let new_multisig = derive_multisig_address(&signers, 2).unwrap();
		let metadata = TxMetadata {
			change_config: Some(ProposedConfig { signers: signers.clone(), threshold: 2 }),
			..Default::default()
		};
		for swap in [false, true] {
			let call = change(new_multisig, fixture.vault.multisig_address(), swap);
			let classified =
				ChangeConfigDecoder.decode(&fixture.input(&call, Some(&metadata))).unwrap();
			assert_eq!(
				classified.kind,
				TransactionKind::ChangeConfig {
					new_multisig,
					proposed: Some(ProposedConfig { signers: signers.clone(), threshold: 2 }),
				}
			);
		}
	}

	#[test]
	fn test_mismatched_hint_is_dropped() {
		let fixture = Fixture::new();
		let metadata = TxMetadata {
			change_config: Some(ProposedConfig { signers: vec![account(7)], threshold: 1 }),
			..Default::default()
		};
		let call = change(account(60), fixture.vault.multisig_address(), false);
		let classified =
			ChangeConfigDecoder.decode(&fixture.input(&call, Some(&metadata))).unwrap();
		assert!(matches!(classified.kind, TransactionKind::ChangeConfig { proposed: None, .. }));
		assert!(classified.description.starts_with("Change vault controller to "));
	}

	#[test]
	fn test_other_proxy_batches_do_not_match() {
		let fixture = Fixture::new();
		let unrelated = change(account(60), account(61), false);
		assert!(ChangeConfigDecoder.decode(&fixture.input(&unrelated, None)).is_none());

		let add_only = Call::Utility(UtilityCall::Batch {
			calls: vec![Call::Proxy(ProxyCall::AddProxy {
				delegate: account(60),
				proxy_type: 0,
				delay: 0,
			})],
		});
		assert!(ChangeConfigDecoder.decode(&fixture.input(&add_only, None)).is_none());
	}
}
